use anyhow::Result;
use ash::vk;

pub const MAX_SAMPLER_LOD: f32 = 5.0;

pub fn sampler_create_info() -> vk::SamplerCreateInfo<'static> {
    vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .anisotropy_enable(false)
        .max_anisotropy(1.0)
        .compare_enable(false)
        .compare_op(vk::CompareOp::NEVER)
        .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE)
        .unnormalized_coordinates(false)
        .min_lod(0.0)
        .max_lod(MAX_SAMPLER_LOD)
}

pub struct TextureSampler {
    sampler: vk::Sampler,
    device: ash::Device,
}

impl TextureSampler {
    pub fn new(device: ash::Device) -> Result<Self> {
        let sampler = unsafe { device.create_sampler(&sampler_create_info(), None)? };
        Ok(Self { sampler, device })
    }

    pub fn vk_sampler(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for TextureSampler {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_horizontally_and_clamps_depth() {
        let info = sampler_create_info();
        assert_eq!(info.address_mode_u, vk::SamplerAddressMode::REPEAT);
        assert_eq!(info.address_mode_v, vk::SamplerAddressMode::REPEAT);
        assert_eq!(info.address_mode_w, vk::SamplerAddressMode::CLAMP_TO_EDGE);
        assert_eq!(info.anisotropy_enable, vk::FALSE);
        assert_eq!(info.max_lod, MAX_SAMPLER_LOD);
    }
}
