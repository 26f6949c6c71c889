//! Concurrent Stable Diffusion 3 image generation.
//!
//! A [`GenerationRequest`] is fanned out to N simultaneous calls against the
//! generation endpoint by the [`Dispatcher`]; every successful image is then
//! written next to a JSON sidecar of its parameters by the [`Materializer`].
//! [`StabilityClient`] wires the two together, and the `server` feature adds
//! a browser UI on top.

pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod multipart;
pub mod session;
pub mod stability;
pub mod storage;

#[cfg(feature = "server")]
pub mod server;

pub use config::{Config, ServerConfig, StabilityConfig, StorageConfig};
pub use error::{Result, StudioError};
pub use models::*;
pub use session::{GenerationBatch, GenerationSession};
pub use stability::{Dispatcher, ImageClient, StabilityClient};
pub use storage::{ImageStorage, LocalImageStorage, Materializer};
