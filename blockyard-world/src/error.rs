use blockyard_core::UnknownComponent;
use blockyard_gen::GenerationError;
use blockyard_storage::StorageError;

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    UnknownComponent(#[from] UnknownComponent),
    #[error("block ({x}, {y}, {z}) is outside the world")]
    OutOfBounds { x: i32, y: i32, z: i32 },
    #[error("world is shutting down")]
    ShuttingDown,
    #[error("background task failed: {0}")]
    Task(String),
}
