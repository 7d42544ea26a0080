use super::{
    device::VulkanDevice, framebuffer::VulkanFramebuffers, pipeline::VulkanPipeline,
    render_pass::VulkanRenderPass, swapchain::VulkanSwapchain,
};
use crate::error::Result;
use log::*;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};
use vulkanalia::Device;

/// Graphics command pool and the command buffers allocated from it, one per
/// framebuffer. Destroying the pool frees the buffers.
#[derive(Debug)]
pub struct VulkanCommandBuffer {
    device: Device,
    pub command_pool: vk::CommandPool,
    pub command_buffers: Vec<vk::CommandBuffer>,
}

impl VulkanCommandBuffer {
    pub unsafe fn create_command_pool(device: &VulkanDevice) -> Result<VulkanCommandBuffer> {
        let info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::empty())
            .queue_family_index(device.indices.graphics);

        let command_pool = device.vk_device.create_command_pool(&info, None)?;

        Ok(VulkanCommandBuffer {
            device: device.vk_device.clone(),
            command_pool,
            command_buffers: Vec::new(),
        })
    }

    pub unsafe fn create_command_buffers(&mut self, framebuffers: &VulkanFramebuffers) -> Result<()> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(framebuffers.framebuffers.len() as u32);

        self.command_buffers = self.device.allocate_command_buffers(&allocate_info)?;

        Ok(())
    }

    /// Records the triangle draw once into every buffer. The buffers are
    /// resubmitted unchanged each frame.
    pub unsafe fn record_commands(
        &self,
        swapchain: &VulkanSwapchain,
        render_pass: &VulkanRenderPass,
        framebuffers: &VulkanFramebuffers,
        pipeline: &VulkanPipeline,
        clear_color: [f32; 4],
    ) -> Result<()> {
        // Allows resubmission while a previous submission is still pending.
        let begin_info =
            vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::SIMULTANEOUS_USE);

        let render_area = vk::Rect2D::builder()
            .offset(vk::Offset2D::default())
            .extent(swapchain.extent);

        let color_clear_value = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: clear_color,
            },
        };
        let clear_values = &[color_clear_value];

        for (command_buffer, framebuffer) in
            recording_pairs(&self.command_buffers, &framebuffers.framebuffers)
        {
            self.device.begin_command_buffer(command_buffer, &begin_info)?;

            let info = vk::RenderPassBeginInfo::builder()
                .render_pass(render_pass.handle)
                .framebuffer(framebuffer)
                .render_area(render_area)
                .clear_values(clear_values);

            self.device
                .cmd_begin_render_pass(command_buffer, &info, vk::SubpassContents::INLINE);

            self.device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.handle,
            );

            self.device.cmd_draw(command_buffer, 3, 1, 0, 0);
            self.device.cmd_end_render_pass(command_buffer);

            self.device.end_command_buffer(command_buffer)?;
        }

        debug!("Recorded {} command buffers.", self.command_buffers.len());

        Ok(())
    }
}

impl Drop for VulkanCommandBuffer {
    fn drop(&mut self) {
        unsafe { self.device.destroy_command_pool(self.command_pool, None) };
        debug!("Destroyed command pool.");
    }
}

/// Pairs command buffer `i` with framebuffer `i`.
pub fn recording_pairs(
    command_buffers: &[vk::CommandBuffer],
    framebuffers: &[vk::Framebuffer],
) -> Vec<(vk::CommandBuffer, vk::Framebuffer)> {
    command_buffers
        .iter()
        .copied()
        .zip(framebuffers.iter().copied())
        .collect()
}
