use super::{
    types::{ErrorResponse, HealthResponse, RemoveBackgroundResponse},
    upload,
};
use crate::{Error, config::Config, pipeline, removal::ModelSession};
use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{Html, Json},
};
use std::{sync::Arc, time::Duration};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ModelSession>,
    pub config: Arc<Config>,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, HandlerError> {
    tokio::fs::read_to_string(&state.config.server.index_path)
        .await
        .map(Html)
        .map_err(|e| error_response(Error::Io(e)))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn remove_background(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RemoveBackgroundResponse>, HandlerError> {
    let request_id = Uuid::new_v4();

    async move {
        let limits = &state.config.limits;
        let upload = upload::read_image_field(multipart, limits.max_upload_bytes)
            .await
            .map_err(error_response)?;

        let timeout = match state.config.processing.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let image = pipeline::run(upload, &state.session, limits.max_dimension, timeout)
            .await
            .map_err(error_response)?;

        info!("Returning success response");
        Ok(Json(RemoveBackgroundResponse {
            success: true,
            image,
        }))
    }
    .instrument(info_span!("remove_background", %request_id))
    .await
}

fn error_response(err: Error) -> HandlerError {
    if err.is_validation() {
        info!("Rejected upload: {}", err);
    } else {
        error!("Failed to remove background: {:?}", err);
    }

    (
        err.status_code(),
        Json(ErrorResponse {
            success: false,
            error: err.client_message(),
        }),
    )
}
