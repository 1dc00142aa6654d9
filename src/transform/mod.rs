//! Preset composition and derived-asset URLs. Pure, no I/O.

pub mod delivery;
pub mod presets;
