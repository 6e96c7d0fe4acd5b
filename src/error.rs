//! Graphics error types.

use ash::vk;
use thiserror::Error;

/// Errors that can occur while driving the renderer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// WGSL parsing, validation or SPIR-V generation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),
    /// A requested feature is not supported.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// The surface does not offer the required color format.
    #[error("surface format {0:?} not found")]
    SurfaceFormatNotFound(vk::Format),
    /// Out of GPU or host memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// The GPU device was lost.
    #[error("GPU device lost")]
    DeviceLost,
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// More visible instances than the instance buffer can hold.
    #[error("instance buffer overflow: {requested} instances requested, capacity is {capacity}")]
    InstanceCapacityExceeded { requested: usize, capacity: usize },
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
    /// The surface is outdated and needs to be reconfigured.
    #[error("surface outdated, needs reconfiguration")]
    SurfaceOutdated,
    /// The surface was lost and needs to be recreated.
    #[error("surface lost, needs recreation")]
    SurfaceLost,
}

pub type GraphicsResult<T> = Result<T, GraphicsError>;

impl GraphicsError {
    /// Map a raw Vulkan result into an error, keeping memory and device-loss
    /// conditions distinguishable from generic failures.
    pub(crate) fn from_vk(context: &str, result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
                Self::OutOfMemory
            }
            vk::Result::ERROR_DEVICE_LOST => Self::DeviceLost,
            vk::Result::ERROR_SURFACE_LOST_KHR => Self::SurfaceLost,
            vk::Result::ERROR_OUT_OF_DATE_KHR => Self::SurfaceOutdated,
            other => Self::Internal(format!("{context}: {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = GraphicsError::InitializationFailed("no GPU found".to_string());
        assert_eq!(err.to_string(), "initialization failed: no GPU found");

        let err = GraphicsError::InstanceCapacityExceeded {
            requested: 12,
            capacity: 8,
        };
        assert_eq!(
            err.to_string(),
            "instance buffer overflow: 12 instances requested, capacity is 8"
        );
    }

    #[test]
    fn test_vk_result_mapping() {
        assert_eq!(
            GraphicsError::from_vk("submit", vk::Result::ERROR_DEVICE_LOST),
            GraphicsError::DeviceLost
        );
        assert_eq!(
            GraphicsError::from_vk("alloc", vk::Result::ERROR_OUT_OF_HOST_MEMORY),
            GraphicsError::OutOfMemory
        );
        assert!(matches!(
            GraphicsError::from_vk("submit", vk::Result::ERROR_UNKNOWN),
            GraphicsError::Internal(msg) if msg.starts_with("submit")
        ));
    }
}
