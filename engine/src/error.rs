use thiserror::Error;
use vulkanalia::vk;

/// Failures raised while standing up or driving the Vulkan renderer.
///
/// Every variant is fatal for initialization: the renderer never retries a
/// step, it unwinds what was already created and reports the error.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Failed to load the Vulkan library: {0}")]
    Loader(String),

    #[error("Application name `{0}` contains a NUL byte.")]
    InvalidApplicationName(String),

    #[error("Instance does not support required extension `{0}`.")]
    UnsupportedExtension(String),

    #[error("Validation layer `{0}` requested but not available.")]
    UnsupportedLayer(String),

    #[error("Failed to set up debug messenger: {0}")]
    MessengerSetupFailed(vk::ErrorCode),

    #[error("Failed to create a Vulkan surface: {0}")]
    SurfaceCreationFailed(vk::ErrorCode),

    #[error("Failed to find a GPU supporting graphics and presentation.")]
    NoCapableDevice,

    #[error("Failed to create swapchain: {0}")]
    SwapchainCreationFailed(vk::ErrorCode),

    #[error("Failed to create graphics pipeline: {0}")]
    PipelineCreationFailed(vk::ErrorCode),

    #[error("Failed to create shader module: {0}")]
    ShaderModuleCreationFailed(String),

    #[error(transparent)]
    Vulkan(#[from] vk::ErrorCode),
}

pub type Result<T> = std::result::Result<T, RendererError>;
