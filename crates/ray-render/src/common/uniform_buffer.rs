use super::{
    allocator::{
        align_down,
        align_up,
    },
    buffer::Buffer,
    memory::MemoryProperties,
};
use anyhow::Result;
use ash::vk;
use bytemuck::Pod;

/// Byte range `[align_down(offset), align_up(offset + size))` in units of the
/// non-coherent atom, clipped to `limit`. Returns `(start, len)`.
pub fn atom_aligned_range(
    offset: vk::DeviceSize,
    size: vk::DeviceSize,
    atom_size: vk::DeviceSize,
    limit: vk::DeviceSize,
) -> (vk::DeviceSize, vk::DeviceSize) {
    let start = align_down(offset, atom_size);
    let end = align_up(offset + size, atom_size).min(limit);
    (start, end - start)
}

/// Writes `bytes` at absolute `offset` into `window`, a mapping that begins at
/// absolute `window_start`.
pub fn write_into_window(
    window: &mut [u8],
    window_start: vk::DeviceSize,
    offset: vk::DeviceSize,
    bytes: &[u8],
) {
    let relative = (offset - window_start) as usize;
    window[relative..relative + bytes.len()].copy_from_slice(bytes);
}

/// Host-visible array of `count` uniform elements in a single buffer.
pub struct UniformBuffer<T> {
    buffer: Buffer,
    count: usize,
    atom_size: vk::DeviceSize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Pod> UniformBuffer<T> {
    pub fn new(
        initial: &[T],
        atom_size: vk::DeviceSize,
        memory_properties: &MemoryProperties,
        device: ash::Device,
    ) -> Result<Self> {
        anyhow::ensure!(!initial.is_empty(), "uniform buffer needs at least one element");

        let buffer = Buffer::new(
            std::mem::size_of_val(initial) as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            &[],
            memory_properties,
            device,
        )?;
        let uniform_buffer = Self {
            buffer,
            count: initial.len(),
            atom_size,
            _marker: std::marker::PhantomData,
        };
        uniform_buffer.update_all(initial)?;
        Ok(uniform_buffer)
    }

    pub fn vk_buffer(&self) -> vk::Buffer {
        self.buffer.vk_buffer()
    }

    pub fn byte_size(&self) -> vk::DeviceSize {
        self.buffer.size()
    }

    /// Rewrites every element and flushes the whole allocation.
    pub fn update_all(&self, values: &[T]) -> Result<()> {
        anyhow::ensure!(
            values.len() == self.count,
            "expected {} uniform elements, got {}",
            self.count,
            values.len()
        );
        self.buffer.write(0, bytemuck::cast_slice(values))
    }

    /// Maps and flushes only the atom-aligned range around element `index`.
    pub fn update_single(&self, index: usize, value: &T) -> Result<()> {
        anyhow::ensure!(
            index < self.count,
            "uniform index {} out of range ({} elements)",
            index,
            self.count
        );
        let element_size = std::mem::size_of::<T>() as vk::DeviceSize;
        let offset = index as vk::DeviceSize * element_size;
        let (start, len) = atom_aligned_range(
            offset,
            element_size,
            self.atom_size,
            self.buffer.allocation_size(),
        );

        let mapped = self.buffer.map(start, len)?;
        let window = unsafe { std::slice::from_raw_parts_mut(mapped, len as usize) };
        write_into_window(window, start, offset, bytemuck::bytes_of(value));

        let flushed = self.buffer.flush(start, len);
        self.buffer.unmap();
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    struct Sample {
        values: [f32; 9],
        tag: u32,
    }

    fn sample(seed: f32) -> Sample {
        let mut values = [0.0; 9];
        for (i, value) in values.iter_mut().enumerate() {
            *value = seed + i as f32;
        }
        Sample {
            values,
            tag: seed as u32,
        }
    }

    // Mirrors update_single against plain host memory.
    fn write_single(memory: &mut [u8], index: usize, value: &Sample, atom: u64) -> (u64, u64) {
        let size = std::mem::size_of::<Sample>() as u64;
        let offset = index as u64 * size;
        let (start, len) = atom_aligned_range(offset, size, atom, memory.len() as u64);
        let window = &mut memory[start as usize..(start + len) as usize];
        write_into_window(window, start, offset, bytemuck::bytes_of(value));
        (start, len)
    }

    #[test]
    fn range_covers_the_element() {
        assert_eq!(atom_aligned_range(40, 40, 64, 1024), (0, 128));
        assert_eq!(atom_aligned_range(64, 64, 64, 1024), (64, 64));
        assert_eq!(atom_aligned_range(100, 8, 1, 1024), (100, 8));
    }

    #[test]
    fn range_is_clipped_to_the_allocation() {
        assert_eq!(atom_aligned_range(200, 40, 256, 240), (0, 240));
    }

    #[test]
    fn single_update_round_trips() {
        let size = std::mem::size_of::<Sample>();
        for atom in [1u64, 4, 64, 256] {
            for index in 0..4 {
                let mut memory = vec![0xAAu8; size * 4];
                let value = sample(index as f32 * 10.0 + 1.0);
                write_single(&mut memory, index, &value, atom);

                let offset = index * size;
                let read: Sample = bytemuck::pod_read_unaligned(&memory[offset..offset + size]);
                assert_eq!(read, value);
                assert_eq!(read.values[0], read.tag as f32);
            }
        }
    }

    #[test]
    fn single_update_stays_in_its_range() {
        let size = std::mem::size_of::<Sample>();
        let atom = 64;
        let mut memory = vec![0xAAu8; size * 4];
        let (start, len) = write_single(&mut memory, 1, &sample(3.0), atom);

        assert_eq!(start % atom, 0);
        assert!(start as usize <= size);
        assert!((start + len) as usize >= 2 * size);
        for (i, byte) in memory.iter().enumerate() {
            if i < size || i >= 2 * size {
                assert_eq!(*byte, 0xAA, "byte {i} outside the element changed");
            }
        }
    }
}
