use log::*;
use vulkanalia::{
    vk::{self, DeviceV1_0, HasBuilder},
    Device,
};

use super::{device::VulkanDevice, swapchain::VulkanSwapchain};
use crate::error::Result;

/// Single-subpass render pass drawing straight into a swapchain image.
#[derive(Debug)]
pub struct VulkanRenderPass {
    device: Device,
    pub handle: vk::RenderPass,
}

impl VulkanRenderPass {
    pub unsafe fn create(
        device: &VulkanDevice,
        swapchain: &VulkanSwapchain,
    ) -> Result<VulkanRenderPass> {
        let color_attachment = vk::AttachmentDescription::builder()
            .format(swapchain.format)
            .samples(vk::SampleCountFlags::_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

        let color_attachment_ref = vk::AttachmentReference::builder()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let color_attachments = &[color_attachment_ref];
        let subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(color_attachments);

        let attachments = &[color_attachment];
        let subpasses = &[subpass];
        let dependencies = subpass_dependencies();
        let info = vk::RenderPassCreateInfo::builder()
            .attachments(attachments)
            .subpasses(subpasses)
            .dependencies(&dependencies);

        let handle = device.vk_device.create_render_pass(&info, None)?;

        Ok(VulkanRenderPass {
            device: device.vk_device.clone(),
            handle,
        })
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        unsafe { self.device.destroy_render_pass(self.handle, None) };
        debug!("Destroyed render pass.");
    }
}

/// Barriers bracketing subpass 0 so the layout transitions
/// UNDEFINED -> COLOR_ATTACHMENT_OPTIMAL -> PRESENT_SRC_KHR happen after the
/// presentation engine is done reading and before it reads again.
pub fn subpass_dependencies() -> [vk::SubpassDependency; 2] {
    let read_write = vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE;

    let into_subpass = vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .src_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
        .src_access_mask(vk::AccessFlags::MEMORY_READ)
        .dst_subpass(0)
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(read_write)
        .dependency_flags(vk::DependencyFlags::empty())
        .build();

    let out_of_subpass = vk::SubpassDependency::builder()
        .src_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(read_write)
        .dst_subpass(vk::SUBPASS_EXTERNAL)
        .dst_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
        .dst_access_mask(vk::AccessFlags::MEMORY_READ)
        .dependency_flags(vk::DependencyFlags::empty())
        .build();

    [into_subpass, out_of_subpass]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_work_finishes_before_color_output() {
        let [into_subpass, _] = subpass_dependencies();

        assert_eq!(into_subpass.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(into_subpass.dst_subpass, 0);
        assert_eq!(into_subpass.src_stage_mask, vk::PipelineStageFlags::BOTTOM_OF_PIPE);
        assert_eq!(
            into_subpass.dst_stage_mask,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert!(into_subpass
            .dst_access_mask
            .contains(vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE));
    }

    #[test]
    fn color_output_finishes_before_presentation() {
        let [_, out_of_subpass] = subpass_dependencies();

        assert_eq!(out_of_subpass.src_subpass, 0);
        assert_eq!(out_of_subpass.dst_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(
            out_of_subpass.src_stage_mask,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(out_of_subpass.dst_access_mask, vk::AccessFlags::MEMORY_READ);
    }
}
