mod record;
mod registry;

pub use record::{Device, DeviceSnapshot, UploadTotals};
pub use registry::DeviceRegistry;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;
