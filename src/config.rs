use crate::transform::{
    delivery::DeliveryUrlBuilder,
    presets::{Effect, SocialFormat},
};
use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::{env, fmt, path::PathBuf};

/// Default upload ceiling, matching the browser form's limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 70 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_upload_bytes: usize,
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<Secret>,
    pub api_base: String,
    pub delivery_base: String,
    pub auth_secret: Option<Secret>,
}

/// Credentials for the media-processing provider.
#[derive(Clone)]
pub struct ProviderConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: String,
    pub delivery_base: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("delivery_base", &self.delivery_base)
            .finish()
    }
}

/// A string that never shows up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Media upload and transformation studio")]
pub struct Args {
    /// Host to bind to (overrides MEDIA_STUDIO_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MEDIA_STUDIO_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides MEDIA_STUDIO_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Largest accepted upload in bytes (overrides MEDIA_STUDIO_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Provider account name (overrides CLOUDINARY_CLOUD_NAME)
    #[arg(long)]
    pub cloud_name: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Run migrations and exit
    Migrate,
    /// Upload an image and download it with an effect applied
    Effect {
        #[command(flatten)]
        target: ClientArgs,
        #[arg(long, default_value = "None")]
        effect: Effect,
    },
    /// Upload an image and download it cropped for a social platform
    Social {
        #[command(flatten)]
        target: ClientArgs,
        #[arg(long, default_value = "Instagram Square (1:1)")]
        format: SocialFormat,
    },
    /// Upload an image and download it with an AI-generated background
    BgFill {
        #[command(flatten)]
        target: ClientArgs,
        #[arg(long, default_value = "Instagram Square (1:1)")]
        format: SocialFormat,
        /// What the new background should show
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Upload a video to the gallery
    UploadVideo {
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,
        /// Bearer token issued by the identity provider (or MEDIA_STUDIO_TOKEN)
        #[arg(long, env = "MEDIA_STUDIO_TOKEN")]
        token: String,
    },
    /// List gallery videos, newest first
    Videos {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,
        /// Also download every video into this directory
        #[arg(long)]
        download_to: Option<PathBuf>,
    },
}

/// Shared options for the image workflows.
#[derive(ClapArgs, Debug, Clone)]
pub struct ClientArgs {
    /// Image to upload
    pub file: PathBuf,

    /// Base URL of a running studio server
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    pub server: String,

    /// Directory the transformed image is saved into
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the command to run.
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        // Parse CLI once
        let args = Args::parse();
        Self::from_parts(args, |key| env::var(key).ok())
    }

    /// Merge parsed arguments with an environment lookup; CLI values win.
    pub fn from_parts(
        args: Args,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, Command)> {
        // --- Environment fallback ---
        let env_host = lookup("MEDIA_STUDIO_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match lookup("MEDIA_STUDIO_PORT") {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing MEDIA_STUDIO_PORT value `{}`", value))?,
            None => 3000,
        };
        let env_db = lookup("MEDIA_STUDIO_DATABASE_URL")
            .unwrap_or_else(|| "sqlite://./data/media_studio.db".into());
        let env_max_upload = match lookup("MEDIA_STUDIO_MAX_UPLOAD_BYTES") {
            Some(value) => value.parse::<usize>().with_context(|| {
                format!("parsing MEDIA_STUDIO_MAX_UPLOAD_BYTES value `{}`", value)
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            cloud_name: args.cloud_name.or_else(|| lookup("CLOUDINARY_CLOUD_NAME")),
            api_key: lookup("CLOUDINARY_API_KEY"),
            api_secret: lookup("CLOUDINARY_API_SECRET").map(Secret),
            api_base: lookup("CLOUDINARY_API_BASE")
                .unwrap_or_else(|| "https://api.cloudinary.com".into()),
            delivery_base: lookup("CLOUDINARY_DELIVERY_BASE")
                .unwrap_or_else(|| "https://res.cloudinary.com".into()),
            auth_secret: lookup("MEDIA_STUDIO_AUTH_SECRET").map(Secret),
        };

        Ok((cfg, args.command.unwrap_or(Command::Serve)))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Provider credentials; all three must be configured to serve uploads.
    pub fn provider(&self) -> Result<ProviderConfig> {
        let cloud_name = self
            .cloud_name
            .clone()
            .ok_or_else(|| anyhow!("CLOUDINARY_CLOUD_NAME is not set"))?;
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("CLOUDINARY_API_KEY is not set"))?;
        let api_secret = self
            .api_secret
            .as_ref()
            .map(|s| s.expose().to_string())
            .ok_or_else(|| anyhow!("CLOUDINARY_API_SECRET is not set"))?;

        Ok(ProviderConfig {
            cloud_name,
            api_key,
            api_secret,
            api_base: self.api_base.clone(),
            delivery_base: self.delivery_base.clone(),
        })
    }

    /// Public delivery addressing; needs only the account name.
    pub fn delivery(&self) -> Result<DeliveryUrlBuilder> {
        let cloud_name = self
            .cloud_name
            .as_deref()
            .ok_or_else(|| anyhow!("CLOUDINARY_CLOUD_NAME is not set"))?;
        Ok(DeliveryUrlBuilder::new(&self.delivery_base, cloud_name))
    }

    pub fn auth_secret(&self) -> Result<&Secret> {
        self.auth_secret
            .as_ref()
            .ok_or_else(|| anyhow!("MEDIA_STUDIO_AUTH_SECRET is not set"))
    }
}
