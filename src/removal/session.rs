use super::{BackgroundRemover, SessionLoader};
use crate::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Holds the single model instance shared by every request.
///
/// The model is constructed on the first call to [`ModelSession::get`] (or up
/// front via the same call at startup). Concurrent first callers wait on one
/// construction. A failed construction leaves the holder empty so the next
/// caller tries again.
pub struct ModelSession {
    loader: Box<dyn SessionLoader>,
    remover: OnceCell<Arc<dyn BackgroundRemover>>,
}

impl ModelSession {
    pub fn new(loader: Box<dyn SessionLoader>) -> Self {
        Self {
            loader,
            remover: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn BackgroundRemover>> {
        let remover = self
            .remover
            .get_or_try_init(|| async {
                info!("Loading segmentation model session");
                let start = std::time::Instant::now();
                let remover = self.loader.load().await?;
                info!("Model session ready in {:?}", start.elapsed());
                Ok::<_, crate::Error>(remover)
            })
            .await?;

        Ok(Arc::clone(remover))
    }

    #[cfg(test)]
    fn is_loaded(&self) -> bool {
        self.remover.initialized()
    }
}
