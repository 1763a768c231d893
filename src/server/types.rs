use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RemoveBackgroundResponse {
    pub success: bool,
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
