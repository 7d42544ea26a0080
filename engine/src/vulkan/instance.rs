use log::*;
use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::{self, ExtDebugUtilsExtension, Handle, HasBuilder};
use vulkanalia::window as vk_window;
use vulkanalia::{Entry, Instance};
use winit::window::Window;

use super::constants;
use crate::config::RendererConfig;
use crate::error::{RendererError, Result};

/// The Vulkan instance together with the optional debug messenger bound to it.
///
/// Keeps the [`Entry`] alive so the loader library outlives every handle.
pub struct VulkanInstance {
    pub entry: Entry,
    pub vk_instance: Instance,
    pub validation: bool,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl VulkanInstance {
    pub unsafe fn new(
        window: &Window,
        entry: Entry,
        config: &RendererConfig,
    ) -> Result<VulkanInstance> {
        // Application Info
        let app_name = application_name(&config.application_name)?;
        let application_info = vk::ApplicationInfo::builder()
            .application_name(app_name.as_bytes_with_nul())
            .application_version(vk::make_version(1, 0, 0))
            .engine_name(constants::ENGINE_NAME)
            .engine_version(vk::make_version(1, 0, 0))
            .api_version(vk::make_version(1, 0, 0));

        // Extensions
        let mut required = vk_window::get_required_instance_extensions(window)
            .iter()
            .map(|e| **e)
            .collect::<Vec<_>>();

        // Required by Vulkan SDK on macOS since 1.3.216.
        let flags = if cfg!(target_os = "macos")
            && entry.version()? >= constants::PORTABILITY_MACOS_VERSION
        {
            info!("Enabling extensions for macOS portability.");
            required.push(vk::KHR_GET_PHYSICAL_DEVICE_PROPERTIES2_EXTENSION.name);
            required.push(vk::KHR_PORTABILITY_ENUMERATION_EXTENSION.name);
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            vk::InstanceCreateFlags::empty()
        };

        if config.validation {
            required.push(vk::EXT_DEBUG_UTILS_EXTENSION.name);
        }

        let available_extensions = entry
            .enumerate_instance_extension_properties(None)?
            .iter()
            .map(|e| e.extension_name)
            .collect::<HashSet<_>>();
        check_extension_support(&available_extensions, &required)?;

        // Layers
        let layers = if config.validation {
            let available_layers = entry
                .enumerate_instance_layer_properties()?
                .iter()
                .map(|l| l.layer_name)
                .collect::<HashSet<_>>();
            check_layer_support(&available_layers, &[constants::VALIDATION_LAYER])?;
            vec![constants::VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };

        let extensions = required.iter().map(|e| e.as_ptr()).collect::<Vec<_>>();

        // Create
        let mut info = vk::InstanceCreateInfo::builder()
            .application_info(&application_info)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .flags(flags);

        // Reports problems in vkCreateInstance / vkDestroyInstance themselves.
        let mut debug_info = debug_messenger_info();
        if config.validation {
            info = info.push_next(&mut debug_info);
        }

        let vk_instance = entry.create_instance(&info, None)?;
        debug!("Created Vulkan instance ({} extensions).", required.len());

        Ok(VulkanInstance {
            entry,
            vk_instance,
            validation: config.validation,
            messenger: vk::DebugUtilsMessengerEXT::null(),
        })
    }

    /// Registers the validation callback. Does nothing when validation is off.
    pub unsafe fn setup_debug_messenger(&mut self) -> Result<()> {
        if !self.validation {
            return Ok(());
        }

        let info = debug_messenger_info();
        self.messenger = self
            .vk_instance
            .create_debug_utils_messenger_ext(&info, None)
            .map_err(RendererError::MessengerSetupFailed)?;

        Ok(())
    }
}

impl fmt::Debug for VulkanInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VulkanInstance")
            .field("vk_instance", &self.vk_instance.handle())
            .field("validation", &self.validation)
            .field("messenger", &self.messenger)
            .finish()
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if !self.messenger.is_null() {
                self.vk_instance
                    .destroy_debug_utils_messenger_ext(self.messenger, None);
            }
            self.vk_instance.destroy_instance(None);
        }
        debug!("Destroyed Vulkan instance.");
    }
}

fn debug_messenger_info() -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .user_callback(Some(debug_callback))
        .build()
}

fn check_extension_support(
    available: &HashSet<vk::ExtensionName>,
    required: &[vk::ExtensionName],
) -> Result<()> {
    match required.iter().find(|e| !available.contains(e)) {
        Some(missing) => Err(RendererError::UnsupportedExtension(missing.to_string())),
        None => Ok(()),
    }
}

fn check_layer_support(
    available: &HashSet<vk::ExtensionName>,
    requested: &[vk::ExtensionName],
) -> Result<()> {
    match requested.iter().find(|l| !available.contains(l)) {
        Some(missing) => Err(RendererError::UnsupportedLayer(missing.to_string())),
        None => Ok(()),
    }
}

fn application_name(name: &str) -> Result<CString> {
    CString::new(name)
        .map_err(|_| RendererError::InvalidApplicationName(name.escape_default().to_string()))
}

static VALIDATION_ERRORS: AtomicUsize = AtomicUsize::new(0);

/// Number of ERROR-severity validation messages reported so far in this process.
pub fn validation_error_count() -> usize {
    VALIDATION_ERRORS.load(Ordering::Relaxed)
}

extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    type_: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _: *mut c_void,
) -> vk::Bool32 {
    let data = unsafe { *data };
    let message = unsafe { CStr::from_ptr(data.message) }.to_string_lossy();

    if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        VALIDATION_ERRORS.fetch_add(1, Ordering::Relaxed);
        error!("({:?}) {}", type_, message);
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        warn!("({:?}) {}", type_, message);
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::INFO {
        debug!("({:?}) {}", type_, message);
    } else {
        trace!("({:?}) {}", type_, message);
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> HashSet<vk::ExtensionName> {
        list.iter()
            .map(|n| vk::ExtensionName::from_bytes(n.as_bytes()))
            .collect()
    }

    #[test]
    fn all_required_extensions_present() {
        let available = names(&["VK_KHR_surface", "VK_KHR_xcb_surface", "VK_EXT_debug_utils"]);
        let required = [
            vk::ExtensionName::from_bytes(b"VK_KHR_surface"),
            vk::EXT_DEBUG_UTILS_EXTENSION.name,
        ];

        assert!(check_extension_support(&available, &required).is_ok());
    }

    #[test]
    fn missing_extension_is_named_in_the_error() {
        let available = names(&["VK_KHR_surface"]);
        let required = [
            vk::ExtensionName::from_bytes(b"VK_KHR_surface"),
            vk::EXT_DEBUG_UTILS_EXTENSION.name,
        ];

        match check_extension_support(&available, &required) {
            Err(RendererError::UnsupportedExtension(name)) => {
                assert_eq!(name, "VK_EXT_debug_utils")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_validation_layer_is_rejected() {
        let available = names(&["VK_LAYER_MESA_device_select"]);

        assert!(matches!(
            check_layer_support(&available, &[constants::VALIDATION_LAYER]),
            Err(RendererError::UnsupportedLayer(_))
        ));
        assert!(check_layer_support(&available, &[]).is_ok());
    }

    #[test]
    fn application_name_with_nul_is_rejected() {
        assert!(matches!(
            application_name("Vulkan\0App"),
            Err(RendererError::InvalidApplicationName(name)) if name == "Vulkan\\u{0}App"
        ));
        assert_eq!(application_name("Vulkan App").unwrap().as_bytes(), b"Vulkan App");
    }
}
