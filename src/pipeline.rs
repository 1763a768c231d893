//! Processing applied to a validated upload: best-effort downscale, model
//! call, data URI encoding.

use crate::{
    Error, Result, encoding, imaging,
    removal::{BackgroundRemover, ModelSession},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

/// A validated image upload. Lives for a single request.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Runs the pipeline, aborting with [`Error::Timeout`] if `timeout` elapses.
///
/// The model session is acquired before the timed section, so a slow first
/// load always completes and is kept. On timeout the blocking work already
/// started finishes in the background and its result is dropped.
pub async fn run(
    upload: Upload,
    session: &ModelSession,
    max_dimension: u32,
    timeout: Option<Duration>,
) -> Result<String> {
    let remover = session.get().await?;

    let work = process(upload, remover, max_dimension);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| Error::Timeout {
                secs: limit.as_secs(),
            })?,
        None => work.await,
    }
}

async fn process(
    upload: Upload,
    remover: Arc<dyn BackgroundRemover>,
    max_dimension: u32,
) -> Result<String> {
    let Upload { filename, bytes } = upload;
    info!("Processing image {}: {} bytes", filename, bytes.len());

    let input = tokio::task::spawn_blocking(move || imaging::downscale_or_original(bytes, max_dimension))
        .await
        .map_err(|e| Error::internal(format!("resize task failed: {}", e)))?;

    tokio::task::spawn_blocking(move || remove_and_encode(remover.as_ref(), input))
        .await
        .map_err(|e| Error::internal(format!("background removal task failed: {}", e)))?
}

/// Invokes the model and wraps its output in a PNG data URI.
pub fn remove_and_encode(remover: &dyn BackgroundRemover, input: Vec<u8>) -> Result<String> {
    debug!("Removing background");
    let output = remover.remove(&input)?;
    drop(input);

    info!("Background removed: {} bytes", output.len());
    if output.is_empty() {
        return Err(Error::EmptyOutput);
    }

    let uri = encoding::png_data_uri(&output)?;
    debug!("Encoded: {} characters", uri.len());
    Ok(uri)
}
