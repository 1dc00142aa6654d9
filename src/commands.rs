//! Client subcommands: run a workflow against a studio server.

use crate::{
    client::{
        api::StudioClient,
        download::{download, download_filename, video_filename},
        workflow::{ImageLoad, UploadWorkflow, run_upload},
    },
    config::{AppConfig, ClientArgs, Command},
    transform::presets::Preset,
};
use anyhow::{Result, anyhow, bail};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub async fn run(cfg: &AppConfig, command: Command) -> Result<()> {
    match command {
        Command::Effect { target, effect } => {
            transform_image(cfg, &target, Preset::Effect(effect)).await?;
        }
        Command::Social { target, format } => {
            transform_image(cfg, &target, Preset::Social(format)).await?;
        }
        Command::BgFill {
            target,
            format,
            prompt,
        } => {
            let preset = Preset::background_fill(format, prompt.as_deref());
            transform_image(cfg, &target, preset).await?;
        }
        Command::UploadVideo {
            file,
            title,
            description,
            server,
            token,
        } => {
            let client = studio_client(cfg, &server);
            let record = client
                .upload_video(&file, &title, description.as_deref(), &token)
                .await?;
            info!(
                "uploaded video {} ({} -> {:?} bytes)",
                record.public_id, record.original_size, record.compressed_size
            );
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Videos {
            server,
            download_to,
        } => list_videos(cfg, &server, download_to.as_deref()).await?,
        Command::Serve | Command::Migrate => bail!("not a client command"),
    }
    Ok(())
}

fn studio_client(cfg: &AppConfig, server: &str) -> StudioClient {
    StudioClient::new(Client::new(), server).with_max_upload_bytes(cfg.max_upload_bytes as u64)
}

/// Upload an image, render it with `preset` and save the result.
pub async fn transform_image(cfg: &AppConfig, target: &ClientArgs, preset: Preset) -> Result<PathBuf> {
    let delivery = cfg.delivery()?;
    let client = studio_client(cfg, &target.server);
    let mut workflow = UploadWorkflow::new(preset);

    let public_id = run_upload(&mut workflow, client.upload_image(&target.file), |value| {
        debug!("upload progress {}%", value)
    })
    .await?;
    info!("uploaded {}", public_id);

    let url = workflow
        .display_url(&delivery)
        .ok_or_else(|| anyhow!("no uploaded image to render"))?;
    let filename = download_filename(workflow.preset());
    let saved = download(client.http(), &url, &target.out_dir, &filename).await;

    let outcome = match &saved {
        Ok(_) => ImageLoad::Loaded,
        Err(err) => {
            warn!("derived image unavailable: {}", err);
            ImageLoad::Failed
        }
    };
    workflow.image_settled(outcome)?;

    let path = saved?;
    println!("{}", path.display());
    Ok(path)
}

async fn list_videos(cfg: &AppConfig, server: &str, download_to: Option<&Path>) -> Result<()> {
    let client = studio_client(cfg, server);
    let videos = client.list_videos().await?;
    let delivery = cfg.delivery().ok();

    if videos.is_empty() {
        println!("no videos yet");
    }
    for video in &videos {
        let url = delivery.as_ref().map(|d| d.video_url(&video.public_id));
        println!(
            "{}\t{}\t{}\t{}",
            video.created_at.to_rfc3339(),
            video.title,
            video.public_id,
            url.as_deref().unwrap_or("-")
        );

        if let Some(dir) = download_to {
            let Some(url) = url else {
                bail!("CLOUDINARY_CLOUD_NAME is required to download videos");
            };
            download(client.http(), &url, dir, &video_filename(&video.title)).await?;
        }
    }
    Ok(())
}
