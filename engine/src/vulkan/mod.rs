use command_buffer::VulkanCommandBuffer;
use device::VulkanDevice;
use framebuffer::VulkanFramebuffers;
use instance::VulkanInstance;
use log::*;
use pipeline::VulkanPipeline;
use render_pass::VulkanRenderPass;
use surface::VulkanSurface;
use swapchain::VulkanSwapchain;
use sync::{FrameState, FrameSync};
use vulkanalia::{
    loader::{LibloadingLoader, LIBRARY},
    vk::{self, DeviceV1_0, Handle, HasBuilder, KhrSwapchainExtension},
    Entry,
};
use winit::window::Window;

use crate::config::RendererConfig;
use crate::error::{RendererError, Result};

mod command_buffer;
mod constants;
mod device;
mod framebuffer;
mod instance;
mod pipeline;
mod render_pass;
mod shader;
mod surface;
mod swapchain;
mod sync;

pub use constants::MAX_FRAMES_IN_FLIGHT;
pub use instance::validation_error_count;

/// Every Vulkan object the triangle renderer owns.
///
/// Fields are declared in reverse creation order so that dropping the
/// renderer releases them in that order once the device is idle.
#[derive(Debug)]
pub struct VulkanRenderer {
    sync: FrameSync,
    commands: VulkanCommandBuffer,
    framebuffers: VulkanFramebuffers,
    pipeline: VulkanPipeline,
    render_pass: VulkanRenderPass,
    swapchain: VulkanSwapchain,
    device: VulkanDevice,
    surface: VulkanSurface,
    instance: VulkanInstance,
    frame: usize,
    state: FrameState,
}

impl VulkanRenderer {
    /// Runs the whole bootstrap sequence. On failure everything created so
    /// far is released before the error is returned.
    pub unsafe fn new(window: &Window, config: &RendererConfig) -> Result<VulkanRenderer> {
        let loader =
            LibloadingLoader::new(LIBRARY).map_err(|e| RendererError::Loader(e.to_string()))?;
        let entry = Entry::new(loader).map_err(|b| RendererError::Loader(b.to_string()))?;

        let mut instance = VulkanInstance::new(window, entry, config)?;
        instance.setup_debug_messenger()?;
        let surface = VulkanSurface::new(&instance, window)?;
        let device = VulkanDevice::new(&instance, &surface)?;

        let swapchain = VulkanSwapchain::create(window, &instance, &surface, &device)?;

        let render_pass = VulkanRenderPass::create(&device, &swapchain)?;
        let pipeline = VulkanPipeline::create(&device, &swapchain, &render_pass, config)?;

        let framebuffers = VulkanFramebuffers::create(&device, &swapchain, &render_pass)?;
        let mut commands = VulkanCommandBuffer::create_command_pool(&device)?;
        commands.create_command_buffers(&framebuffers)?;
        commands.record_commands(
            &swapchain,
            &render_pass,
            &framebuffers,
            &pipeline,
            config.clear_color,
        )?;

        let sync = FrameSync::create(&device, swapchain.images.len())?;

        info!("Vulkan renderer initialized.");

        Ok(VulkanRenderer {
            sync,
            commands,
            framebuffers,
            pipeline,
            render_pass,
            swapchain,
            device,
            surface,
            instance,
            frame: 0,
            state: FrameState::Idle,
        })
    }

    /// Acquires an image, submits its pre-recorded command buffer and
    /// presents it. Blocks while the current frame slot is still in flight.
    pub unsafe fn render(&mut self) -> Result<()> {
        if let Some(abandoned) = self.state.restart() {
            warn!("Previous frame was abandoned while {:?}.", abandoned);
        }
        let device = &self.device.vk_device;
        let in_flight_fence = self.sync.in_flight_fences[self.frame];

        device.wait_for_fences(&[in_flight_fence], true, u64::MAX)?;

        advance(&mut self.state, self.frame);
        let image_index = device
            .acquire_next_image_khr(
                self.swapchain.handle,
                u64::MAX,
                self.sync.image_available[self.frame],
                vk::Fence::null(),
            )?
            .0 as usize;

        // Another frame slot may still be drawing into this image.
        let image_fence = self.sync.images_in_flight[image_index];
        if !image_fence.is_null() {
            device.wait_for_fences(&[image_fence], true, u64::MAX)?;
        }
        self.sync.images_in_flight[image_index] = in_flight_fence;

        let wait_semaphores = &[self.sync.image_available[self.frame]];
        let wait_stages = &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = &[self.commands.command_buffers[image_index]];
        let signal_semaphores = &[self.sync.render_finished[self.frame]];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(wait_semaphores)
            .wait_dst_stage_mask(wait_stages)
            .command_buffers(command_buffers)
            .signal_semaphores(signal_semaphores);

        device.reset_fences(&[in_flight_fence])?;
        device.queue_submit(self.device.graphics_queue, &[submit_info], in_flight_fence)?;
        advance(&mut self.state, self.frame);

        let swapchains = &[self.swapchain.handle];
        let image_indices = &[image_index as u32];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(signal_semaphores)
            .swapchains(swapchains)
            .image_indices(image_indices);

        advance(&mut self.state, self.frame);
        device.queue_present_khr(self.device.present_queue, &present_info)?;
        advance(&mut self.state, self.frame);

        self.frame = (self.frame + 1) % constants::MAX_FRAMES_IN_FLIGHT;

        Ok(())
    }

    pub unsafe fn device_wait_idle(&self) -> Result<()> {
        Ok(self.device.vk_device.device_wait_idle()?)
    }

    pub fn image_count(&self) -> usize {
        self.swapchain.images.len()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.framebuffers.len()
    }

    pub fn command_buffer_count(&self) -> usize {
        self.commands.command_buffers.len()
    }
}

fn advance(state: &mut FrameState, frame: usize) {
    *state = state.next();
    trace!("Frame {}: {:?}", frame, state);
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        if let Err(error) = unsafe { self.device.vk_device.device_wait_idle() } {
            error!("Failed to wait for device idle before teardown: {}", error);
        }
        debug!("Destroying Vulkan renderer.");
    }
}
