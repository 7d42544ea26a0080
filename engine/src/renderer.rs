use winit::window::Window;

use crate::config::RendererConfig;
use crate::error::Result;
use crate::vulkan::VulkanRenderer;

#[derive(Debug)]
pub struct Renderer {
    pub vk_renderer: VulkanRenderer,
}

impl Renderer {
    /// Stands up the Vulkan context for `window`.
    ///
    /// # Safety
    ///
    /// `window` must outlive the returned renderer.
    pub unsafe fn create(window: &Window, config: &RendererConfig) -> Result<Self> {
        let vk_renderer = VulkanRenderer::new(window, config)?;

        Ok(Self { vk_renderer })
    }

    /// Draws one frame.
    pub fn render(&mut self) -> Result<()> {
        unsafe { self.vk_renderer.render() }
    }

    /// Blocks until the GPU has finished all submitted work.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.vk_renderer.device_wait_idle() }
    }

    pub fn image_count(&self) -> usize {
        self.vk_renderer.image_count()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.vk_renderer.framebuffer_count()
    }

    pub fn command_buffer_count(&self) -> usize {
        self.vk_renderer.command_buffer_count()
    }
}
