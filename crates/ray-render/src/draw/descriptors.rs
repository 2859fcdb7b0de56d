use crate::common::consts::MAX_TEXTURES;
use ash::vk;

pub const UNIFORM_BINDING: u32 = 0;
pub const TEXTURE_BINDING: u32 = 1;

pub const INPUT_ATTACHMENT_BINDINGS: [u32; 3] = [0, 1, 2];
pub const CAMERA_BINDING: u32 = 3;
pub const LIGHTING_TEXTURE_BINDING: u32 = 4;

pub const VERTEX_STORAGE_BINDING: u32 = 0;
pub const INDEX_STORAGE_BINDING: u32 = 1;

/// Sets allocated from the pool: geometry, lighting and shared.
pub const MAX_SETS: u32 = 3;

fn binding(
    binding: u32,
    descriptor_type: vk::DescriptorType,
    descriptor_count: u32,
    stage_flags: vk::ShaderStageFlags,
) -> vk::DescriptorSetLayoutBinding<'static> {
    vk::DescriptorSetLayoutBinding::default()
        .binding(binding)
        .descriptor_type(descriptor_type)
        .descriptor_count(descriptor_count)
        .stage_flags(stage_flags)
}

/// First set of the geometry subpass: per-instance uniforms and textures.
pub fn geometry_bindings() -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    vec![
        binding(
            UNIFORM_BINDING,
            vk::DescriptorType::UNIFORM_BUFFER,
            1,
            vk::ShaderStageFlags::VERTEX,
        ),
        binding(
            TEXTURE_BINDING,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            MAX_TEXTURES as u32,
            vk::ShaderStageFlags::FRAGMENT,
        ),
    ]
}

/// First set of the lighting subpass: G-buffer reads, camera and textures.
pub fn lighting_bindings() -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    let mut bindings = INPUT_ATTACHMENT_BINDINGS
        .iter()
        .map(|&index| {
            binding(
                index,
                vk::DescriptorType::INPUT_ATTACHMENT,
                1,
                vk::ShaderStageFlags::FRAGMENT,
            )
        })
        .collect::<Vec<_>>();
    bindings.push(binding(
        CAMERA_BINDING,
        vk::DescriptorType::UNIFORM_BUFFER,
        1,
        vk::ShaderStageFlags::FRAGMENT,
    ));
    bindings.push(binding(
        LIGHTING_TEXTURE_BINDING,
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        MAX_TEXTURES as u32,
        vk::ShaderStageFlags::FRAGMENT,
    ));
    bindings
}

/// Second set of both subpasses: vertex and triangle storage buffers.
pub fn shared_bindings() -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    [VERTEX_STORAGE_BINDING, INDEX_STORAGE_BINDING]
        .iter()
        .map(|&index| {
            binding(
                index,
                vk::DescriptorType::STORAGE_BUFFER,
                1,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            )
        })
        .collect()
}

/// Totals per descriptor type over every binding table.
pub fn pool_sizes() -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    let tables = [geometry_bindings(), lighting_bindings(), shared_bindings()];
    for layout_binding in tables.iter().flatten() {
        match sizes
            .iter_mut()
            .find(|size| size.ty == layout_binding.descriptor_type)
        {
            Some(size) => size.descriptor_count += layout_binding.descriptor_count,
            None => sizes.push(
                vk::DescriptorPoolSize::default()
                    .ty(layout_binding.descriptor_type)
                    .descriptor_count(layout_binding.descriptor_count),
            ),
        }
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_of(ty: vk::DescriptorType) -> u32 {
        pool_sizes()
            .iter()
            .find(|size| size.ty == ty)
            .map_or(0, |size| size.descriptor_count)
    }

    #[test]
    fn geometry_set_layout() {
        let bindings = geometry_bindings();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(bindings[0].stage_flags, vk::ShaderStageFlags::VERTEX);
        assert_eq!(bindings[1].descriptor_count, 8);
        assert_eq!(bindings[1].stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn lighting_set_layout() {
        let bindings = lighting_bindings();
        let summary = bindings
            .iter()
            .map(|b| (b.binding, b.descriptor_type, b.descriptor_count))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (0, vk::DescriptorType::INPUT_ATTACHMENT, 1),
                (1, vk::DescriptorType::INPUT_ATTACHMENT, 1),
                (2, vk::DescriptorType::INPUT_ATTACHMENT, 1),
                (3, vk::DescriptorType::UNIFORM_BUFFER, 1),
                (4, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 8),
            ]
        );
        assert!(bindings
            .iter()
            .all(|b| b.stage_flags == vk::ShaderStageFlags::FRAGMENT));
    }

    #[test]
    fn shared_set_is_visible_to_both_stages() {
        let bindings = shared_bindings();
        assert_eq!(bindings.len(), 2);
        for b in bindings.iter() {
            assert_eq!(b.descriptor_type, vk::DescriptorType::STORAGE_BUFFER);
            assert_eq!(
                b.stage_flags,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
            );
        }
    }

    #[test]
    fn pool_holds_every_binding() {
        assert_eq!(count_of(vk::DescriptorType::UNIFORM_BUFFER), 2);
        assert_eq!(count_of(vk::DescriptorType::COMBINED_IMAGE_SAMPLER), 16);
        assert_eq!(count_of(vk::DescriptorType::INPUT_ATTACHMENT), 3);
        assert_eq!(count_of(vk::DescriptorType::STORAGE_BUFFER), 2);
        assert_eq!(pool_sizes().len(), 4);
    }
}
