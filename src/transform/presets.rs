//! Named transformation presets and the pure mapping to provider parameters.
//!
//! Three families are supported:
//! - **effects** (`Effect`): one provider flag each, `None` maps to nothing
//! - **social formats** (`SocialFormat`): fixed width/height/aspect-ratio
//!   triples applied with fill crop and automatic gravity
//! - **background fill**: a social format plus generative background
//!   replacement, optionally steered by a free-text prompt
//!
//! Nothing here performs I/O.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresetError {
    #[error("unknown preset `{0}`")]
    UnknownPreset(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Effect {
    None,
    Sepia,
    Pixelate,
    Blur,
    Opacity50,
    Grayscale,
    Enhance,
    Improve,
    Restore,
}

impl Effect {
    pub const ALL: [Effect; 9] = [
        Effect::None,
        Effect::Sepia,
        Effect::Pixelate,
        Effect::Blur,
        Effect::Opacity50,
        Effect::Grayscale,
        Effect::Enhance,
        Effect::Improve,
        Effect::Restore,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Effect::None => "None",
            Effect::Sepia => "Sepia",
            Effect::Pixelate => "Pixelate",
            Effect::Blur => "Blur",
            Effect::Opacity50 => "Opacity50",
            Effect::Grayscale => "Grayscale",
            Effect::Enhance => "Enhance",
            Effect::Improve => "Improve",
            Effect::Restore => "Restore",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Effect {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Effect::ALL
            .into_iter()
            .find(|effect| effect.name() == s)
            .ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocialFormat {
    InstagramSquare,
    InstagramPortrait,
    TwitterPost,
    TwitterHeader,
    FacebookCover,
}

/// Output size of a social format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDimensions {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: &'static str,
}

impl SocialFormat {
    pub const ALL: [SocialFormat; 5] = [
        SocialFormat::InstagramSquare,
        SocialFormat::InstagramPortrait,
        SocialFormat::TwitterPost,
        SocialFormat::TwitterHeader,
        SocialFormat::FacebookCover,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SocialFormat::InstagramSquare => "Instagram Square (1:1)",
            SocialFormat::InstagramPortrait => "Instagram Portrait (4:5)",
            SocialFormat::TwitterPost => "Twitter Post (16:9)",
            SocialFormat::TwitterHeader => "Twitter Header (3:1)",
            SocialFormat::FacebookCover => "Facebook Cover (205:78)",
        }
    }

    pub fn dimensions(self) -> FormatDimensions {
        let (width, height, aspect_ratio) = match self {
            SocialFormat::InstagramSquare => (1080, 1080, "1:1"),
            SocialFormat::InstagramPortrait => (1080, 1350, "4:5"),
            SocialFormat::TwitterPost => (1200, 675, "16:9"),
            SocialFormat::TwitterHeader => (1500, 500, "3:1"),
            SocialFormat::FacebookCover => (820, 312, "205:78"),
        };
        FormatDimensions {
            width,
            height,
            aspect_ratio,
        }
    }
}

impl fmt::Display for SocialFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SocialFormat {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SocialFormat::ALL
            .into_iter()
            .find(|format| format.name() == s)
            .ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// The user's current transformation choice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Preset {
    Effect(Effect),
    Social(SocialFormat),
    BackgroundFill {
        format: SocialFormat,
        prompt: Option<String>,
    },
}

impl Preset {
    /// Background fill with blank prompts normalized to "no prompt".
    pub fn background_fill(format: SocialFormat, prompt: Option<&str>) -> Self {
        let prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        Preset::BackgroundFill { format, prompt }
    }

    /// Fixed frame the effects page renders every image into.
    pub fn display_frame(&self) -> Option<TransformParams> {
        match self {
            Preset::Effect(_) => Some(TransformParams {
                crop: Some(Crop::Fill),
                width: Some(800),
                height: Some(800),
                ..TransformParams::default()
            }),
            Preset::Social(_) | Preset::BackgroundFill { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Crop {
    Fill,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gravity {
    Auto,
}

/// Parameters handed to the provider's delivery URL.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<Crop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gravity: Option<Gravity>,
    /// Provider effect, e.g. `sepia` or `blur:200`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<u8>,
}

impl TransformParams {
    pub fn is_empty(&self) -> bool {
        *self == TransformParams::default()
    }

    /// Comma-separated provider syntax, e.g. `c_fill,w_1080,h_1080,ar_1:1,g_auto`.
    pub fn to_url_component(&self) -> String {
        let mut parts = Vec::new();
        if let Some(Crop::Fill) = self.crop {
            parts.push("c_fill".to_string());
        }
        if let Some(w) = self.width {
            parts.push(format!("w_{w}"));
        }
        if let Some(h) = self.height {
            parts.push(format!("h_{h}"));
        }
        if let Some(ar) = &self.aspect_ratio {
            parts.push(format!("ar_{ar}"));
        }
        if let Some(Gravity::Auto) = self.gravity {
            parts.push("g_auto".to_string());
        }
        if let Some(effect) = &self.effect {
            parts.push(format!("e_{effect}"));
        }
        if let Some(o) = self.opacity {
            parts.push(format!("o_{o}"));
        }
        parts.join(",")
    }
}

/// Map a preset to the parameters the provider expects.
pub fn compose(preset: &Preset) -> TransformParams {
    match preset {
        Preset::Effect(effect) => compose_effect(*effect),
        Preset::Social(format) => compose_format(*format),
        Preset::BackgroundFill { format, prompt } => {
            let effect = match prompt.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => format!(
                    "gen_background_replace:prompt_{}",
                    utf8_percent_encode(text, NON_ALPHANUMERIC)
                ),
                _ => "gen_background_replace".to_string(),
            };
            TransformParams {
                effect: Some(effect),
                ..compose_format(*format)
            }
        }
    }
}

fn compose_effect(effect: Effect) -> TransformParams {
    let flag = |name: &str| TransformParams {
        effect: Some(name.to_string()),
        ..TransformParams::default()
    };
    match effect {
        Effect::None => TransformParams::default(),
        Effect::Sepia => flag("sepia"),
        Effect::Pixelate => flag("pixelate"),
        Effect::Blur => flag("blur:200"),
        Effect::Opacity50 => TransformParams {
            opacity: Some(50),
            ..TransformParams::default()
        },
        Effect::Grayscale => flag("grayscale"),
        Effect::Enhance => flag("enhance"),
        Effect::Improve => flag("improve"),
        Effect::Restore => flag("gen_restore"),
    }
}

fn compose_format(format: SocialFormat) -> TransformParams {
    let dims = format.dimensions();
    TransformParams {
        crop: Some(Crop::Fill),
        width: Some(dims.width),
        height: Some(dims.height),
        aspect_ratio: Some(dims.aspect_ratio.to_string()),
        gravity: Some(Gravity::Auto),
        ..TransformParams::default()
    }
}

/// Preset tables as served to clients populating their pickers.
#[derive(Debug, Serialize)]
pub struct PresetCatalog {
    pub effects: Vec<&'static str>,
    pub formats: Vec<FormatEntry>,
}

#[derive(Debug, Serialize)]
pub struct FormatEntry {
    pub name: &'static str,
    #[serde(flatten)]
    pub dimensions: FormatDimensions,
}

pub fn catalog() -> PresetCatalog {
    PresetCatalog {
        effects: Effect::ALL.iter().map(|e| e.name()).collect(),
        formats: SocialFormat::ALL
            .iter()
            .map(|f| FormatEntry {
                name: f.name(),
                dimensions: f.dimensions(),
            })
            .collect(),
    }
}
