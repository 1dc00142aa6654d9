//! Saving derived assets to disk.
//!
//! Bytes are streamed into a hidden temporary file in the target directory
//! and renamed into place once complete, so an interrupted download never
//! leaves a truncated file under the final name.

use crate::transform::presets::Preset;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },
    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File name offered for the current preset's derived image.
///
/// Effects become `effect_<name>.png`. Social and background-fill images are
/// named after the prompt when one is set, otherwise after the format.
pub fn download_filename(preset: &Preset) -> String {
    match preset {
        Preset::Effect(effect) => format!("effect_{}.png", fold(effect.name())),
        Preset::Social(format) => format!("{}.png", fold(format.name())),
        Preset::BackgroundFill { format, prompt } => {
            let stem = prompt.as_deref().unwrap_or(format.name());
            format!("{}.png", fold(stem))
        }
    }
}

/// Gallery videos are saved under their title.
pub fn video_filename(title: &str) -> String {
    let stem = title.trim();
    let stem = if stem.is_empty() { "video" } else { stem };
    format!("{}.mp4", stem.replace(['/', '\\'], "_"))
}

/// Collapse whitespace runs to `_` and lower-case.
fn fold(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace(['/', '\\'], "_")
        .to_lowercase()
}

/// Fetch `url` into `dir/filename`, returning the final path.
#[instrument(skip(http))]
pub async fn download(
    http: &Client,
    url: &str,
    dir: &Path,
    filename: &str,
) -> Result<PathBuf, DownloadError> {
    let http_err = |source| DownloadError::Http {
        url: url.to_string(),
        source,
    };

    let response = http.get(url).send().await.map_err(http_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status,
        });
    }

    fs::create_dir_all(dir).await.map_err(|source| DownloadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let target = dir.join(filename);
    let tmp = dir.join(format!(".{}.{}.part", filename, Uuid::new_v4()));
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| DownloadError::Io { path, source }
    };

    let mut file = fs::File::create(&tmp).await.map_err(io_err(&tmp))?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    let copied = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(http_err)?;
            file.write_all(&chunk).await.map_err(io_err(&tmp))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err(&tmp))?;
        Ok::<(), DownloadError>(())
    }
    .await;

    if let Err(err) = copied {
        let _ = fs::remove_file(&tmp).await;
        return Err(err);
    }
    drop(file);

    if let Err(source) = fs::rename(&tmp, &target).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_err(&target)(source));
    }
    info!("saved {} bytes to {}", written, target.display());
    Ok(target)
}
