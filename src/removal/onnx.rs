use super::{BackgroundRemover, SessionLoader, matte};
use crate::{Error, Result, config::ModelConfig};
use async_trait::async_trait;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use std::{path::Path, sync::Arc, sync::Mutex};
use tracing::{debug, info};

/// Decoder allocation ceiling for images handed to the model.
const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

/// U2-Net family segmentation model (u2net, u2netp, silueta, ...) running on
/// ONNX Runtime.
pub struct U2NetRemover {
    // ort sessions need exclusive access to run
    session: Mutex<Session>,
    input_size: u32,
    name: String,
}

impl U2NetRemover {
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let path = Path::new(&config.path);
        if !path.exists() {
            return Err(Error::model(format!(
                "model file for '{}' not found at {}",
                config.name,
                path.display()
            )));
        }

        info!("Loading {} model from {}", config.name, path.display());

        let mut builder = Session::builder()
            .map_err(|e| runtime_error("Failed to create session builder", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| runtime_error("Failed to set optimization level", e))?;

        if config.intra_threads > 0 {
            builder = builder
                .with_intra_threads(config.intra_threads)
                .map_err(|e| runtime_error("Failed to set intra threads", e))?;
        }

        let session = builder
            .commit_from_file(path)
            .map_err(|e| runtime_error("Failed to create session from model file", e))?;

        Ok(Self {
            session: Mutex::new(session),
            input_size: config.input_size,
            name: config.name.clone(),
        })
    }

    fn predict(&self, input: ndarray::Array4<f32>) -> Result<ndarray::ArrayD<f32>> {
        let input_value =
            Tensor::from_array(input).map_err(|e| runtime_error("Failed to convert input tensor", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::internal("model session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| runtime_error("ONNX inference failed", e))?;

        // First output is the finest-scale saliency map
        let keys: Vec<_> = outputs.keys().collect();
        let first_key = keys
            .first()
            .ok_or_else(|| Error::model("model produced no outputs"))?;
        let prediction = outputs
            .get(first_key)
            .ok_or_else(|| Error::model("first output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| runtime_error("Failed to extract output tensor", e))?
            .to_owned();

        Ok(prediction)
    }
}

impl BackgroundRemover for U2NetRemover {
    fn remove(&self, image: &[u8]) -> Result<Vec<u8>> {
        let source = matte::decode_rgb(image, MAX_DECODE_ALLOC)?;
        let (width, height) = source.dimensions();
        debug!("{}: segmenting {}x{} image", self.name, width, height);

        let start = std::time::Instant::now();
        let prediction = self.predict(matte::prepare_input(&source, self.input_size))?;
        debug!("{}: inference took {:?}", self.name, start.elapsed());

        let mask = matte::prediction_to_mask(prediction.view(), width, height)?;
        drop(prediction);

        let output = matte::cutout(&source, &mask)?;
        drop(source);
        matte::encode_png(&output)
    }
}

/// Loads a [`U2NetRemover`] on the blocking pool.
pub struct OnnxLoader {
    config: ModelConfig,
}

impl OnnxLoader {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionLoader for OnnxLoader {
    async fn load(&self) -> Result<Arc<dyn BackgroundRemover>> {
        let config = self.config.clone();
        let remover = tokio::task::spawn_blocking(move || U2NetRemover::from_config(&config))
            .await
            .map_err(|e| Error::internal(format!("model loading task failed: {}", e)))??;
        let remover: Arc<dyn BackgroundRemover> = Arc::new(remover);
        Ok(remover)
    }
}

/// Maps an ONNX Runtime failure, recognising allocator exhaustion.
fn runtime_error(context: &str, err: impl std::fmt::Display) -> Error {
    let message = err.to_string();
    if is_allocation_failure(&message) {
        return Error::OutOfMemory;
    }
    Error::model(format!("{}: {}", context, message))
}

fn is_allocation_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["bad_alloc", "bad allocation", "failed to allocate", "out of memory"]
        .iter()
        .any(|needle| message.contains(needle))
}
