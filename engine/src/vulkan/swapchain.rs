use log::*;
use vulkanalia::{
    vk::{self, DeviceV1_0, Handle, HasBuilder, KhrSurfaceExtension, KhrSwapchainExtension},
    Device, Instance,
};
use winit::window::Window;

use super::{
    constants,
    device::{QueueFamilyIndices, VulkanDevice},
    instance::VulkanInstance,
    surface::VulkanSurface,
};
use crate::error::{RendererError, Result};

/// A swapchain image and the view the render pass draws through.
///
/// The image belongs to the swapchain; only the view is owned here.
#[derive(Copy, Clone, Debug)]
pub struct SwapchainImage {
    pub image: vk::Image,
    pub view: vk::ImageView,
}

#[derive(Debug)]
pub struct VulkanSwapchain {
    device: Device,
    pub handle: vk::SwapchainKHR,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub images: Vec<SwapchainImage>,
}

impl VulkanSwapchain {
    pub unsafe fn create(
        window: &Window,
        instance: &VulkanInstance,
        surface: &VulkanSurface,
        device: &VulkanDevice,
    ) -> Result<VulkanSwapchain> {
        let support =
            SwapchainSupport::get(&instance.vk_instance, surface.handle, device.physical_device)?;

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let size = window.inner_size();
        let extent = choose_swap_extent(&support.capabilities, (size.width, size.height));
        let min_image_count = image_count(&support.capabilities);
        let sharing = SharingConfig::new(device.indices);

        let info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.handle)
            .min_image_count(min_image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing.mode)
            .queue_family_indices(&sharing.queue_family_indices)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let handle = device
            .vk_device
            .create_swapchain_khr(&info, None)
            .map_err(RendererError::SwapchainCreationFailed)?;

        let mut swapchain = VulkanSwapchain {
            device: device.vk_device.clone(),
            handle,
            format: surface_format.format,
            extent,
            images: Vec::new(),
        };

        for image in device.vk_device.get_swapchain_images_khr(handle)? {
            let view = create_image_view(&device.vk_device, image, swapchain.format)?;
            swapchain.images.push(SwapchainImage { image, view });
        }

        info!(
            "Created swapchain: {} images, {:?}, {:?}, {}x{}.",
            swapchain.images.len(),
            swapchain.format,
            present_mode,
            extent.width,
            extent.height
        );

        Ok(swapchain)
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            self.images
                .iter()
                .for_each(|i| self.device.destroy_image_view(i.view, None));
            self.device.destroy_swapchain_khr(self.handle, None);
        }
        debug!("Destroyed swapchain and {} image views.", self.images.len());
    }
}

unsafe fn create_image_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView> {
    let components = vk::ComponentMapping::builder()
        .r(vk::ComponentSwizzle::IDENTITY)
        .g(vk::ComponentSwizzle::IDENTITY)
        .b(vk::ComponentSwizzle::IDENTITY)
        .a(vk::ComponentSwizzle::IDENTITY);

    let subresource_range = vk::ImageSubresourceRange::builder()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1);

    let info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::_2D)
        .format(format)
        .components(components)
        .subresource_range(subresource_range);

    Ok(device.create_image_view(&info, None)?)
}

/// Surface properties the swapchain parameters are chosen from.
#[derive(Clone, Debug)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub unsafe fn get(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        Ok(Self {
            capabilities: instance
                .get_physical_device_surface_capabilities_khr(physical_device, surface)?,
            formats: instance.get_physical_device_surface_formats_khr(physical_device, surface)?,
            present_modes: instance
                .get_physical_device_surface_present_modes_khr(physical_device, surface)?,
        })
    }
}

/// Prefers RGBA8 unorm with the sRGB non-linear color space.
///
/// `formats` must not be empty; device selection rejects devices without formats.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    let preferred = vk::SurfaceFormatKHR::builder()
        .format(constants::PREFERRED_FORMAT)
        .color_space(constants::PREFERRED_COLOR_SPACE)
        .build();

    // A lone UNDEFINED entry means the surface accepts any format.
    if formats.len() == 1 && formats[0].format == vk::Format::UNDEFINED {
        return preferred;
    }

    formats
        .iter()
        .cloned()
        .find(|f| f.format == preferred.format && f.color_space == preferred.color_space)
        .unwrap_or_else(|| formats[0])
}

pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    present_modes
        .iter()
        .cloned()
        .find(|m| *m == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// `framebuffer_size` is only consulted when the surface leaves the extent to us.
pub fn choose_swap_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer_size: (u32, u32),
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let (width, height) = framebuffer_size;
    let clamp = |min: u32, max: u32, v: u32| min.max(max.min(v));
    vk::Extent2D::builder()
        .width(clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
            width,
        ))
        .height(clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
            height,
        ))
        .build()
}

/// One image above the minimum, capped by the maximum (0 means unbounded).
pub fn image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count != 0 && count > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        count
    }
}

/// How swapchain images are shared between the graphics and present queues.
#[derive(Clone, Debug)]
pub struct SharingConfig {
    pub mode: vk::SharingMode,
    pub queue_family_indices: Vec<u32>,
}

impl SharingConfig {
    pub fn new(indices: QueueFamilyIndices) -> Self {
        if indices.graphics != indices.present {
            Self {
                mode: vk::SharingMode::CONCURRENT,
                queue_family_indices: vec![indices.graphics, indices.present],
            }
        } else {
            Self {
                mode: vk::SharingMode::EXCLUSIVE,
                queue_family_indices: vec![],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR::builder()
            .format(format)
            .color_space(color_space)
            .build()
    }

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    fn variable_extent_capabilities() -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: extent(u32::MAX, u32::MAX),
            min_image_extent: extent(64, 64),
            max_image_extent: extent(4096, 4096),
            ..Default::default()
        }
    }

    #[test]
    fn undefined_format_yields_preferred_pair() {
        let chosen = choose_surface_format(&[format(
            vk::Format::UNDEFINED,
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        )]);

        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn exact_format_match_is_found() {
        let formats = [
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        assert_eq!(choose_surface_format(&formats).format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn first_format_is_the_fallback() {
        let formats = [
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
        ];

        assert_eq!(choose_surface_format(&formats).format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn mailbox_preferred_over_fifo() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn fifo_when_mailbox_missing() {
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO_RELAXED];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn fixed_extent_used_verbatim() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: extent(1280, 720),
            min_image_extent: extent(64, 64),
            max_image_extent: extent(4096, 4096),
            ..Default::default()
        };

        assert_eq!(choose_swap_extent(&capabilities, (8000, 8000)), extent(1280, 720));
    }

    #[test]
    fn variable_extent_clamped_to_surface_limits() {
        let capabilities = variable_extent_capabilities();

        assert_eq!(choose_swap_extent(&capabilities, (8000, 8000)), extent(4096, 4096));
        assert_eq!(choose_swap_extent(&capabilities, (10, 10)), extent(64, 64));
        assert_eq!(choose_swap_extent(&capabilities, (800, 10)), extent(800, 64));
    }

    #[test]
    fn image_count_is_one_above_minimum() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(image_count(&capabilities), 3);
    }

    #[test]
    fn image_count_capped_by_maximum() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 3,
            max_image_count: 3,
            ..Default::default()
        };
        assert_eq!(image_count(&capabilities), 3);
    }

    #[test]
    fn distinct_families_share_concurrently() {
        let sharing = SharingConfig::new(QueueFamilyIndices { graphics: 0, present: 1 });
        assert_eq!(sharing.mode, vk::SharingMode::CONCURRENT);
        assert_eq!(sharing.queue_family_indices, vec![0, 1]);
    }

    #[test]
    fn shared_family_is_exclusive() {
        let sharing = SharingConfig::new(QueueFamilyIndices { graphics: 2, present: 2 });
        assert_eq!(sharing.mode, vk::SharingMode::EXCLUSIVE);
        assert!(sharing.queue_family_indices.is_empty());
    }
}
