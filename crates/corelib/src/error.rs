//! Core shared errors (renderer-agnostic).

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("Invalid viewport size {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
    #[error("Model already attached to the scene")]
    ModelAlreadyAttached,
    #[error("Node {0} does not exist")]
    UnknownNode(u32),
    #[error("Node {node} references parent {parent} that is not defined before it")]
    DanglingParent { node: usize, parent: usize },
}

pub type CoreResult<T> = Result<T, CoreError>;
