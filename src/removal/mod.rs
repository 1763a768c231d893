pub mod matte;
#[cfg(feature = "onnx")]
mod onnx;
mod session;

#[cfg(feature = "onnx")]
pub use onnx::{OnnxLoader, U2NetRemover};
pub use session::ModelSession;

use crate::{Result, config::ModelConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// A loaded segmentation model.
///
/// Takes encoded image bytes and returns PNG bytes with the background made
/// transparent. Implementations must be safe to call from several blocking
/// threads at once.
#[cfg_attr(test, mockall::automock)]
pub trait BackgroundRemover: Send + Sync {
    fn remove(&self, image: &[u8]) -> Result<Vec<u8>>;
}

/// Constructs the process-wide [`BackgroundRemover`]. Called at most once per
/// successful load by [`ModelSession`].
#[async_trait]
pub trait SessionLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn BackgroundRemover>>;
}

pub fn create_session_loader(config: &ModelConfig) -> Box<dyn SessionLoader> {
    #[cfg(feature = "onnx")]
    {
        Box::new(OnnxLoader::new(config.clone()))
    }

    #[cfg(not(feature = "onnx"))]
    {
        Box::new(MissingBackend {
            model: config.name.clone(),
        })
    }
}

#[cfg(not(feature = "onnx"))]
struct MissingBackend {
    model: String,
}

#[cfg(not(feature = "onnx"))]
#[async_trait]
impl SessionLoader for MissingBackend {
    async fn load(&self) -> Result<Arc<dyn BackgroundRemover>> {
        Err(crate::Error::model(format!(
            "cannot load '{}': built without the onnx feature",
            self.model
        )))
    }
}
