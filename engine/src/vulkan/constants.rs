use vulkanalia::{vk, Version};

pub const PORTABILITY_MACOS_VERSION: Version = Version::new(1, 3, 216);
pub const VALIDATION_LAYER: vk::ExtensionName =
    vk::ExtensionName::from_bytes(b"VK_LAYER_KHRONOS_validation");
pub const DEVICE_EXTENSIONS: &[vk::ExtensionName] = &[vk::KHR_SWAPCHAIN_EXTENSION.name];

/// Frames the CPU may record ahead of the GPU before blocking on a fence.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

pub const PREFERRED_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;
pub const PREFERRED_COLOR_SPACE: vk::ColorSpaceKHR = vk::ColorSpaceKHR::SRGB_NONLINEAR;

pub const ENGINE_NAME: &[u8] = b"No Engine\0";
