use log::*;
use std::fs;
use std::path::Path;
use vulkanalia::bytecode::Bytecode;
use vulkanalia::{
    vk::{self, DeviceV1_0, HasBuilder},
    Device,
};

use super::device::VulkanDevice;
use crate::error::{RendererError, Result};

/// A shader module that only lives until the pipeline using it is linked.
pub struct ShaderModule {
    device: Device,
    pub handle: vk::ShaderModule,
}

impl ShaderModule {
    pub unsafe fn load(device: &VulkanDevice, path: &Path) -> Result<ShaderModule> {
        let code = read_shader(path)?;
        ShaderModule::create(device, &code)
    }

    pub unsafe fn create(device: &VulkanDevice, bytecode: &[u8]) -> Result<ShaderModule> {
        let bytecode = Bytecode::new(bytecode)
            .map_err(|e| RendererError::ShaderModuleCreationFailed(format!("{:?}", e)))?;
        let info = vk::ShaderModuleCreateInfo::builder()
            .code_size(bytecode.code_size())
            .code(bytecode.code());

        let handle = device
            .vk_device
            .create_shader_module(&info, None)
            .map_err(|e| RendererError::ShaderModuleCreationFailed(e.to_string()))?;

        Ok(ShaderModule {
            device: device.vk_device.clone(),
            handle,
        })
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe { self.device.destroy_shader_module(self.handle, None) };
    }
}

/// Reads SPIR-V from disk. The blob is a sequence of 32-bit words.
pub fn read_shader(path: &Path) -> Result<Vec<u8>> {
    let code = fs::read(path).map_err(|e| {
        RendererError::ShaderModuleCreationFailed(format!("{}: {}", path.display(), e))
    })?;

    if code.is_empty() || code.len() % 4 != 0 {
        return Err(RendererError::ShaderModuleCreationFailed(format!(
            "{}: {} bytes is not a whole number of 32-bit words",
            path.display(),
            code.len()
        )));
    }

    debug!("Loaded shader `{}` ({} bytes).", path.display(), code.len());
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("triangle-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn word_aligned_bytecode_is_accepted() {
        // SPIR-V magic number followed by one more word.
        let path = scratch_file("aligned.spv", &[0x03, 0x02, 0x23, 0x07, 0, 0, 1, 0]);
        assert_eq!(read_shader(&path).unwrap().len(), 8);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn unaligned_bytecode_is_rejected() {
        let path = scratch_file("unaligned.spv", &[0x03, 0x02, 0x23]);
        assert!(matches!(
            read_shader(&path),
            Err(RendererError::ShaderModuleCreationFailed(_))
        ));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_names_the_path() {
        let path = Path::new("shaders/does-not-exist.spv");
        match read_shader(path) {
            Err(RendererError::ShaderModuleCreationFailed(message)) => {
                assert!(message.contains("does-not-exist.spv"))
            }
            other => panic!("unexpected result: {:?}", other.map(|c| c.len())),
        }
    }
}
