use super::{
    device::VulkanDevice,
    render_pass::VulkanRenderPass,
    swapchain::{SwapchainImage, VulkanSwapchain},
};
use crate::error::Result;
use log::*;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};
use vulkanalia::Device;

/// One framebuffer per swapchain image view, in swapchain order.
#[derive(Debug)]
pub struct VulkanFramebuffers {
    device: Device,
    pub framebuffers: Vec<vk::Framebuffer>,
}

impl VulkanFramebuffers {
    pub unsafe fn create(
        device: &VulkanDevice,
        swapchain: &VulkanSwapchain,
        render_pass: &VulkanRenderPass,
    ) -> Result<VulkanFramebuffers> {
        let mut framebuffers = VulkanFramebuffers {
            device: device.vk_device.clone(),
            framebuffers: Vec::with_capacity(swapchain.images.len()),
        };

        for attachments in attachment_sets(&swapchain.images) {
            let create_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass.handle)
                .attachments(&attachments)
                .width(swapchain.extent.width)
                .height(swapchain.extent.height)
                .layers(1);

            let framebuffer = device.vk_device.create_framebuffer(&create_info, None)?;
            framebuffers.framebuffers.push(framebuffer);
        }

        Ok(framebuffers)
    }
}

impl Drop for VulkanFramebuffers {
    fn drop(&mut self) {
        unsafe {
            self.framebuffers
                .iter()
                .for_each(|f| self.device.destroy_framebuffer(*f, None));
        }
        debug!("Destroyed {} framebuffers.", self.framebuffers.len());
    }
}

/// The attachments of each framebuffer: entry `i` holds the view of
/// swapchain image `i`.
pub fn attachment_sets(images: &[SwapchainImage]) -> Vec<[vk::ImageView; 1]> {
    images.iter().map(|image| [image.view]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vulkanalia::vk::Handle;

    #[test]
    fn framebuffer_attaches_the_view_at_the_same_index() {
        let images = (1..=3)
            .map(|i| SwapchainImage {
                image: vk::Image::from_raw(i),
                view: vk::ImageView::from_raw(100 + i),
            })
            .collect::<Vec<_>>();

        let sets = attachment_sets(&images);

        assert_eq!(sets.len(), images.len());
        for (set, image) in sets.iter().zip(&images) {
            assert_eq!(set, &[image.view]);
        }
    }

    #[test]
    fn no_images_no_framebuffers() {
        assert!(attachment_sets(&[]).is_empty());
    }
}
