pub mod config;
pub mod encoding;
pub mod error;
pub mod imaging;
pub mod pipeline;
pub mod removal;
pub mod server;

pub use error::{Error, Result};
