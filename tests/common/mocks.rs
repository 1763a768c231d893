use async_trait::async_trait;
use cutout_server::{
    Error, Result,
    removal::{BackgroundRemover, SessionLoader},
};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Decode the input and return it as an RGBA PNG
    Cutout,
    Output(Vec<u8>),
    OutOfMemory,
    Fail(String),
    Slow(Duration),
    /// Sleep on the first call only
    SlowFirst(Duration),
}

/// Mock segmentation model that records every input it receives
#[derive(Debug)]
pub struct MockRemover {
    pub calls: Arc<Mutex<Vec<Vec<u8>>>>,
    pub behavior: MockBehavior,
}

impl MockRemover {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            behavior: MockBehavior::Cutout,
        }
    }

    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn get_calls(&self) -> Vec<Vec<u8>> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundRemover for MockRemover {
    fn remove(&self, image: &[u8]) -> Result<Vec<u8>> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(image.to_vec());
            calls.len()
        };

        match &self.behavior {
            MockBehavior::Cutout => Ok(fake_cutout(image)),
            MockBehavior::Output(bytes) => Ok(bytes.clone()),
            MockBehavior::OutOfMemory => Err(Error::OutOfMemory),
            MockBehavior::Fail(message) => Err(Error::model(message.clone())),
            MockBehavior::Slow(delay) => {
                std::thread::sleep(*delay);
                Ok(fake_cutout(image))
            }
            MockBehavior::SlowFirst(delay) => {
                if call_number == 1 {
                    std::thread::sleep(*delay);
                }
                Ok(fake_cutout(image))
            }
        }
    }
}

/// Fully transparent copy of the input, or a 1x1 transparent pixel when the
/// input is not an image
fn fake_cutout(image: &[u8]) -> Vec<u8> {
    let mut rgba = image::load_from_memory(image)
        .map(|decoded| decoded.to_rgba8())
        .unwrap_or_else(|_| RgbaImage::new(1, 1));
    for pixel in rgba.pixels_mut() {
        pixel.0[3] = 0;
    }

    let mut buffer = Cursor::new(Vec::new());
    rgba.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

/// Session loader handing out a shared remover and counting loads
pub struct MockLoader {
    pub remover: Arc<MockRemover>,
    pub loads: Arc<AtomicUsize>,
    pub error: Option<String>,
}

impl MockLoader {
    pub fn new(remover: Arc<MockRemover>) -> Self {
        Self {
            remover,
            loads: Arc::new(AtomicUsize::new(0)),
            error: None,
        }
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLoader for MockLoader {
    async fn load(&self) -> Result<Arc<dyn BackgroundRemover>> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        if let Some(ref error) = self.error {
            return Err(Error::model(error.clone()));
        }

        let remover: Arc<dyn BackgroundRemover> = self.remover.clone();
        Ok(remover)
    }
}
