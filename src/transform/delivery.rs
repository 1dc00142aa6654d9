//! Derived-asset addressing.
//!
//! Builds `{base}/{cloud}/{image|video}/upload/{transformations/}{public_id}`
//! URLs. The provider renders the variant on first request, so building a
//! URL never touches the network.

use crate::{
    models::upload::MediaKind,
    transform::presets::{Preset, TransformParams, compose},
};

/// Video variants are delivered at automatic quality as mp4.
const VIDEO_DELIVERY: &str = "q_auto,f_mp4";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryUrlBuilder {
    base: String,
    cloud_name: String,
}

impl DeliveryUrlBuilder {
    pub fn new(base: &str, cloud_name: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            cloud_name: cloud_name.to_string(),
        }
    }

    /// URL for `public_id` with each non-empty parameter set chained in order.
    pub fn url(&self, kind: MediaKind, public_id: &str, chain: &[TransformParams]) -> String {
        let mut url = format!("{}/{}/{}/upload/", self.base, self.cloud_name, kind.as_str());
        for params in chain.iter().filter(|p| !p.is_empty()) {
            url.push_str(&params.to_url_component());
            url.push('/');
        }
        url.push_str(public_id.trim_start_matches('/'));
        url
    }

    /// Image URL for the currently selected preset.
    pub fn preset_url(&self, public_id: &str, preset: &Preset) -> String {
        let mut chain = Vec::with_capacity(2);
        if let Some(frame) = preset.display_frame() {
            chain.push(frame);
        }
        chain.push(compose(preset));
        self.url(MediaKind::Image, public_id, &chain)
    }

    /// Playback/download URL for a gallery video.
    pub fn video_url(&self, public_id: &str) -> String {
        format!(
            "{}/{}/video/upload/{}/{}",
            self.base,
            self.cloud_name,
            VIDEO_DELIVERY,
            public_id.trim_start_matches('/')
        )
    }
}
