use log::*;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use thiserror::Error;
use vulkanalia::{
    vk::{self, DeviceV1_0, HasBuilder, InstanceV1_0, KhrSurfaceExtension},
    Device, Instance,
};

use super::{constants, instance::VulkanInstance, surface::VulkanSurface};
use crate::error::{RendererError, Result};

/// The logical device and the queues retrieved from it.
#[derive(Debug)]
pub struct VulkanDevice {
    pub physical_device: vk::PhysicalDevice,
    pub vk_device: Device,
    pub indices: QueueFamilyIndices,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

#[derive(Debug, Error)]
#[error("Missing {0}.")]
pub struct SuitabilityError(pub &'static str);

impl VulkanDevice {
    unsafe fn pick_physical_device(
        instance: &VulkanInstance,
        surface: &VulkanSurface,
    ) -> Result<(vk::PhysicalDevice, QueueFamilyIndices)> {
        let physical_devices = instance.vk_instance.enumerate_physical_devices()?;
        if physical_devices.is_empty() {
            error!("Can't find any GPU that supports Vulkan.");
            return Err(RendererError::NoCapableDevice);
        }

        let candidates = describe_devices(physical_devices, |physical_device| unsafe {
            DeviceSupport::query(&instance.vk_instance, surface.handle, physical_device)
        });

        select_first_suitable(candidates)
    }

    pub unsafe fn new(instance: &VulkanInstance, surface: &VulkanSurface) -> Result<VulkanDevice> {
        let (physical_device, indices) = VulkanDevice::pick_physical_device(instance, surface)?;

        let queue_priorities = &[1.0];
        let queue_infos = indices
            .unique()
            .into_iter()
            .map(|i| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(i)
                    .queue_priorities(queue_priorities)
            })
            .collect::<Vec<_>>();

        // Device layers are ignored by current loaders but older ones still
        // expect them to match the instance layers.
        let layers = if instance.validation {
            vec![constants::VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let mut extensions = constants::DEVICE_EXTENSIONS
            .iter()
            .map(|e| e.as_ptr())
            .collect::<Vec<_>>();

        // Required by Vulkan SDK on macOS since 1.3.216.
        if cfg!(target_os = "macos")
            && instance.entry.version()? >= constants::PORTABILITY_MACOS_VERSION
        {
            extensions.push(vk::KHR_PORTABILITY_SUBSET_EXTENSION.name.as_ptr());
        }

        let features = vk::PhysicalDeviceFeatures::builder();

        let info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = instance
            .vk_instance
            .create_device(physical_device, &info, None)?;

        let graphics_queue = device.get_device_queue(indices.graphics, 0);
        let present_queue = device.get_device_queue(indices.present, 0);
        debug!(
            "Created logical device with {} queue(s) (graphics family {}, present family {}).",
            queue_infos.len(),
            indices.graphics,
            indices.present
        );

        Ok(VulkanDevice {
            physical_device,
            vk_device: device,
            indices,
            graphics_queue,
            present_queue,
        })
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe { self.vk_device.destroy_device(None) };
        debug!("Destroyed logical device.");
    }
}

/// Describes every device; a device whose queries fail is left out.
pub fn describe_devices<T: Copy + fmt::Debug>(
    devices: impl IntoIterator<Item = T>,
    mut query: impl FnMut(T) -> Result<DeviceSupport>,
) -> Vec<(T, DeviceSupport)> {
    devices
        .into_iter()
        .filter_map(|device| match query(device) {
            Ok(support) => Some((device, support)),
            Err(error) => {
                warn!("Skipping physical device ({:?}): {}", device, error);
                None
            }
        })
        .collect()
}

/// Picks the first device able to render and present; later devices are never
/// considered once one matches, regardless of how capable they are.
pub fn select_first_suitable<T>(
    candidates: impl IntoIterator<Item = (T, DeviceSupport)>,
) -> Result<(T, QueueFamilyIndices)> {
    for (device, support) in candidates {
        match support.check() {
            Ok(indices) => {
                info!("Selected physical device (`{}`).", support.name);
                return Ok((device, indices));
            }
            Err(error) => warn!("Skipping physical device (`{}`): {}", support.name, error),
        }
    }

    Err(RendererError::NoCapableDevice)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Presentation stays on the graphics family whenever that family can
    /// present, so a single queue serves both roles on most hardware.
    pub fn find(families: &[QueueFamilySupport]) -> std::result::Result<Self, SuitabilityError> {
        let graphics = families
            .iter()
            .position(|f| f.queue_count > 0 && f.graphics)
            .map(|i| i as u32);

        let present = match graphics {
            Some(g) if families[g as usize].present => Some(g),
            _ => families
                .iter()
                .position(|f| f.queue_count > 0 && f.present)
                .map(|i| i as u32),
        };

        if let (Some(graphics), Some(present)) = (graphics, present) {
            Ok(Self { graphics, present })
        } else {
            Err(SuitabilityError("required queue families"))
        }
    }

    /// Distinct family indices, one queue create-info each.
    pub fn unique(&self) -> Vec<u32> {
        [self.graphics, self.present]
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct QueueFamilySupport {
    pub queue_count: u32,
    pub graphics: bool,
    pub present: bool,
}

/// What a physical device offers for rendering to one particular surface.
#[derive(Clone, Debug, Default)]
pub struct DeviceSupport {
    pub name: String,
    pub queue_families: Vec<QueueFamilySupport>,
    pub extensions: HashSet<vk::ExtensionName>,
    pub format_count: usize,
    pub present_mode_count: usize,
}

impl DeviceSupport {
    pub unsafe fn query(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        let properties = instance.get_physical_device_properties(physical_device);

        let mut queue_families = Vec::new();
        for (index, family) in instance
            .get_physical_device_queue_family_properties(physical_device)
            .iter()
            .enumerate()
        {
            let present = instance.get_physical_device_surface_support_khr(
                physical_device,
                index as u32,
                surface,
            )?;
            queue_families.push(QueueFamilySupport {
                queue_count: family.queue_count,
                graphics: family.queue_flags.contains(vk::QueueFlags::GRAPHICS),
                present,
            });
        }

        let extensions = instance
            .enumerate_device_extension_properties(physical_device, None)?
            .iter()
            .map(|e| e.extension_name)
            .collect::<HashSet<_>>();

        // Surface queries are only valid once the swapchain extension is known to exist.
        let (format_count, present_mode_count) =
            if extensions.contains(&vk::KHR_SWAPCHAIN_EXTENSION.name) {
                (
                    instance
                        .get_physical_device_surface_formats_khr(physical_device, surface)?
                        .len(),
                    instance
                        .get_physical_device_surface_present_modes_khr(physical_device, surface)?
                        .len(),
                )
            } else {
                (0, 0)
            };

        Ok(Self {
            name: properties.device_name.to_string(),
            queue_families,
            extensions,
            format_count,
            present_mode_count,
        })
    }

    pub fn check(&self) -> std::result::Result<QueueFamilyIndices, SuitabilityError> {
        let indices = QueueFamilyIndices::find(&self.queue_families)?;

        if !constants::DEVICE_EXTENSIONS
            .iter()
            .all(|e| self.extensions.contains(e))
        {
            return Err(SuitabilityError("required device extensions"));
        }

        if self.format_count == 0 || self.present_mode_count == 0 {
            return Err(SuitabilityError("sufficient swapchain support"));
        }

        Ok(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(graphics: bool, present: bool) -> QueueFamilySupport {
        QueueFamilySupport {
            queue_count: 1,
            graphics,
            present,
        }
    }

    fn capable(name: &str) -> DeviceSupport {
        DeviceSupport {
            name: name.to_string(),
            queue_families: vec![family(true, true)],
            extensions: constants::DEVICE_EXTENSIONS.iter().copied().collect(),
            format_count: 2,
            present_mode_count: 1,
        }
    }

    #[test]
    fn device_failing_its_queries_is_skipped() {
        let candidates = describe_devices([0, 1], |device| match device {
            0 => Err(RendererError::Vulkan(vk::ErrorCode::DEVICE_LOST)),
            _ => Ok(capable("discrete")),
        });

        assert_eq!(candidates.len(), 1);
        let (selected, _) = select_first_suitable(candidates).unwrap();
        assert_eq!(selected, 1);
    }

    #[test]
    fn first_capable_device_wins() {
        let candidates = vec![
            (0, DeviceSupport::default()),
            (1, capable("integrated")),
            (2, capable("discrete")),
        ];

        let (selected, indices) = select_first_suitable(candidates).unwrap();
        assert_eq!(selected, 1);
        assert_eq!(indices, QueueFamilyIndices { graphics: 0, present: 0 });
    }

    #[test]
    fn empty_device_list_is_rejected() {
        let candidates: Vec<(u32, DeviceSupport)> = vec![];
        assert!(matches!(
            select_first_suitable(candidates),
            Err(RendererError::NoCapableDevice)
        ));
    }

    #[test]
    fn devices_without_swapchain_support_are_skipped() {
        let mut no_extension = capable("no extension");
        no_extension.extensions.clear();
        let mut no_formats = capable("no formats");
        no_formats.format_count = 0;
        let mut no_modes = capable("no present modes");
        no_modes.present_mode_count = 0;

        assert!(no_extension.check().is_err());
        assert!(no_formats.check().is_err());
        assert!(no_modes.check().is_err());
        assert!(matches!(
            select_first_suitable(vec![(0, no_extension), (1, no_formats), (2, no_modes)]),
            Err(RendererError::NoCapableDevice)
        ));
    }

    #[test]
    fn presentation_may_live_on_another_family() {
        let families = [family(false, true), family(true, false)];
        let indices = QueueFamilyIndices::find(&families).unwrap();
        assert_eq!(indices, QueueFamilyIndices { graphics: 1, present: 0 });
    }

    #[test]
    fn graphics_family_preferred_for_presentation() {
        let families = [family(false, true), family(true, true)];
        let indices = QueueFamilyIndices::find(&families).unwrap();
        assert_eq!(indices, QueueFamilyIndices { graphics: 1, present: 1 });
    }

    #[test]
    fn empty_families_are_ignored() {
        let families = [
            QueueFamilySupport {
                queue_count: 0,
                graphics: true,
                present: true,
            },
            family(true, false),
        ];
        assert!(QueueFamilyIndices::find(&families).is_err());
    }

    #[test]
    fn shared_family_creates_one_queue() {
        let indices = QueueFamilyIndices { graphics: 2, present: 2 };
        assert_eq!(indices.unique(), vec![2]);
    }

    #[test]
    fn distinct_families_create_two_queues() {
        let indices = QueueFamilyIndices { graphics: 1, present: 0 };
        assert_eq!(indices.unique(), vec![0, 1]);
    }
}
