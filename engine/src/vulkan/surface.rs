use log::*;
use vulkanalia::vk::{self, KhrSurfaceExtension};
use vulkanalia::window as vk_window;
use vulkanalia::Instance;
use winit::window::Window;

use super::instance::VulkanInstance;
use crate::error::{RendererError, Result};

/// Presentation surface bound to the window.
///
/// The window must outlive this surface.
#[derive(Debug)]
pub struct VulkanSurface {
    instance: Instance,
    pub handle: vk::SurfaceKHR,
}

impl VulkanSurface {
    pub unsafe fn new(instance: &VulkanInstance, window: &Window) -> Result<VulkanSurface> {
        let handle = vk_window::create_surface(&instance.vk_instance, window, window)
            .map_err(RendererError::SurfaceCreationFailed)?;

        Ok(VulkanSurface {
            instance: instance.vk_instance.clone(),
            handle,
        })
    }
}

impl Drop for VulkanSurface {
    fn drop(&mut self) {
        unsafe { self.instance.destroy_surface_khr(self.handle, None) };
        debug!("Destroyed surface.");
    }
}
