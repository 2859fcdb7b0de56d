use crate::{
    common::{
        command_buffer::OneShotCommands,
        image::{
            Image,
            LayoutTransition,
        },
        image_view::ImageView,
        memory::{
            DeviceMemory,
            MemoryProperties,
        },
    },
    error::{
        SetupError,
        Stage,
    },
};
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;

pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;
const BYTES_PER_PIXEL: usize = 4;

/// Copies tightly packed RGBA rows into `dst`, whose rows start every
/// `row_pitch` bytes.
pub fn copy_rows(dst: &mut [u8], row_pitch: usize, pixels: &[u8], width: u32, height: u32) {
    let row_bytes = width as usize * BYTES_PER_PIXEL;
    for (row, src_row) in pixels
        .chunks_exact(row_bytes)
        .take(height as usize)
        .enumerate()
    {
        let start = row * row_pitch;
        dst[start..start + row_bytes].copy_from_slice(src_row);
    }
}

const PREINITIALIZED_TO_SHADER_READ: LayoutTransition = LayoutTransition {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    old_layout: vk::ImageLayout::PREINITIALIZED,
    new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    src_access_mask: vk::AccessFlags::HOST_WRITE,
    dst_access_mask: vk::AccessFlags::SHADER_READ,
    src_stage_mask: vk::PipelineStageFlags::HOST,
    dst_stage_mask: vk::PipelineStageFlags::FRAGMENT_SHADER,
};

fn upload(
    image: &Image,
    memory: &DeviceMemory,
    pixels: &[u8],
    allocation_size: vk::DeviceSize,
    device: &ash::Device,
) -> Result<()> {
    let subresource = vk::ImageSubresource::default()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .mip_level(0)
        .array_layer(0);
    let layout = unsafe { device.get_image_subresource_layout(image.vk_image(), subresource) };
    let extent = image.extent();

    unsafe {
        let mapped = device.map_memory(
            memory.vk_memory(),
            0,
            allocation_size,
            vk::MemoryMapFlags::empty(),
        )? as *mut u8;
        let window = std::slice::from_raw_parts_mut(mapped, allocation_size as usize);
        copy_rows(
            &mut window[layout.offset as usize..],
            layout.row_pitch as usize,
            pixels,
            extent.width,
            extent.height,
        );
        device.unmap_memory(memory.vk_memory());
    }
    Ok(())
}

/// Linear-tiled RGBA8 texture written directly from the host. Fields drop
/// view first, memory last.
pub struct Texture {
    image_view: ImageView,
    _image: Image,
    _memory: DeviceMemory,
}

impl Texture {
    pub fn new(
        width: u32,
        height: u32,
        pixels: &[u8],
        memory_properties: &MemoryProperties,
        setup: &OneShotCommands,
        device: ash::Device,
    ) -> Result<Self> {
        anyhow::ensure!(width > 0 && height > 0, "texture has zero extent");
        anyhow::ensure!(
            pixels.len() == width as usize * height as usize * BYTES_PER_PIXEL,
            "expected {}x{} RGBA pixels, got {} bytes",
            width,
            height,
            pixels.len()
        );

        let image = Image::new_2d(
            TEXTURE_FORMAT,
            vk::Extent2D { width, height },
            vk::ImageUsageFlags::SAMPLED,
            vk::ImageTiling::LINEAR,
            vk::ImageLayout::PREINITIALIZED,
            device.clone(),
        )
        .context(SetupError::resource(Stage::Texture, "texture image", -1))?;

        let requirements = unsafe { device.get_image_memory_requirements(image.vk_image()) };
        let memory_type_index = memory_properties.find_memory_type(
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let memory = DeviceMemory::allocate(requirements.size, memory_type_index, device.clone())
            .context(SetupError::resource(Stage::Texture, "texture memory", -2))?;
        unsafe { device.bind_image_memory(image.vk_image(), memory.vk_memory(), 0) }
            .context(SetupError::resource(Stage::Texture, "texture binding", -3))?;

        upload(&image, &memory, pixels, requirements.size, &device)?;

        setup.submit_and_wait(|device, command_buffer| {
            PREINITIALIZED_TO_SHADER_READ.record(device, command_buffer, image.vk_image());
        })?;

        let image_view = ImageView::new(
            image.vk_image(),
            TEXTURE_FORMAT,
            vk::ImageAspectFlags::COLOR,
            device.clone(),
        )
        .context(SetupError::resource(Stage::Texture, "texture view", -4))?;

        log::debug!("texture {}x{} ready", width, height);
        Ok(Self {
            image_view,
            _image: image,
            _memory: memory,
        })
    }

    pub fn descriptor_info(&self, sampler: vk::Sampler) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo::default()
            .sampler(sampler)
            .image_view(self.image_view.vk_image_view())
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_follow_the_pitch() {
        let pixels = (0u8..16).collect::<Vec<_>>();
        let mut dst = vec![0xFFu8; 24];
        copy_rows(&mut dst, 12, &pixels, 2, 2);

        assert_eq!(&dst[0..8], &pixels[0..8]);
        assert_eq!(&dst[8..12], &[0xFF; 4]);
        assert_eq!(&dst[12..20], &pixels[8..16]);
        assert_eq!(&dst[20..24], &[0xFF; 4]);
    }

    #[test]
    fn tight_pitch_is_a_plain_copy() {
        let pixels = (0u8..24).collect::<Vec<_>>();
        let mut dst = vec![0u8; 24];
        copy_rows(&mut dst, 8, &pixels, 2, 3);
        assert_eq!(dst, pixels);
    }
}
