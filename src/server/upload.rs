use crate::{Error, Result, pipeline::Upload};
use axum::{
    extract::{
        Multipart,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use tracing::{debug, warn};

pub const IMAGE_FIELD: &str = "image";

/// Pulls the `image` field out of a multipart body, enforcing the upload
/// checks in order: field present, filename non-empty, size within
/// `max_bytes`, content non-empty.
pub async fn read_image_field(
    multipart: std::result::Result<Multipart, MultipartRejection>,
    max_bytes: usize,
) -> Result<Upload> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Request is not a usable multipart body: {}", e);
        Error::NoFileProvided
    })?;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(Error::NoFileSelected);
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?
        {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(Error::TooLarge {
                    limit_bytes: max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(Error::EmptyFile);
        }

        return Ok(Upload { filename, bytes });
    }

    Err(Error::NoFileProvided)
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Error::TooLarge {
            limit_bytes: max_bytes,
        };
    }
    warn!("Malformed multipart upload: {}", err.body_text());
    Error::InvalidUpload(err.body_text())
}
