pub mod media_processor;
pub mod media_store;
pub mod upload_service;
