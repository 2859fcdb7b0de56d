use anyhow::Result;
use ash::vk;
use std::io::Cursor;

/// Reinterprets raw bytecode as SPIR-V words, checking size and magic.
pub fn spirv_words(bytes: &[u8]) -> Result<Vec<u32>> {
    Ok(ash::util::read_spv(&mut Cursor::new(bytes))?)
}

pub struct ShaderModule {
    shader_module: vk::ShaderModule,
    device: ash::Device,
}

impl ShaderModule {
    pub fn new(code: &[u32], device: ash::Device) -> Result<Self> {
        let shader_module_create_info = vk::ShaderModuleCreateInfo::default().code(code);
        let shader_module =
            unsafe { device.create_shader_module(&shader_module_create_info, None)? };
        Ok(Self {
            shader_module,
            device,
        })
    }

    pub fn vk_shader_module(&self) -> vk::ShaderModule {
        self.shader_module
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.shader_module, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytecode_must_be_word_sized() {
        assert!(spirv_words(&[0x03, 0x02, 0x23]).is_err());
    }

    #[test]
    fn bytecode_becomes_words() {
        let bytes = [0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00];
        let words = spirv_words(&bytes).unwrap();
        assert_eq!(words, vec![0x0723_0203, 0x0001_0000]);
    }
}
