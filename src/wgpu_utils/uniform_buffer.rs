//! Per-draw uniform storage
//!
//! Every draw of a frame gets its own copy of its program's uniform struct.
//! The copies are staged in a [`UniformArena`] at offsets that satisfy the
//! device's dynamic offset alignment, then uploaded in one write to a
//! [`DynamicUniformBuffer`] and selected per draw with a dynamic offset.

/// CPU staging area of fixed-stride uniform slots.
#[derive(Debug, Clone)]
pub struct UniformArena {
    bytes: Vec<u8>,
    slot_size: usize,
    stride: usize,
}

impl UniformArena {
    /// `slot_size` is the largest struct pushed, `alignment` the device's
    /// `min_uniform_buffer_offset_alignment`.
    pub fn new(slot_size: u32, alignment: u32) -> Self {
        let alignment = alignment.max(1) as usize;
        let slot_size = slot_size as usize;
        Self {
            bytes: Vec::new(),
            slot_size,
            stride: slot_size.div_ceil(alignment).max(1) * alignment,
        }
    }

    /// Copies `data` into a fresh slot and returns the slot's byte offset.
    ///
    /// Data longer than the slot size is truncated.
    pub fn push(&mut self, data: &[u8]) -> u32 {
        let offset = self.bytes.len();
        if data.len() > self.slot_size {
            log::warn!(
                "Uniform data of {} bytes exceeds the {} byte slot",
                data.len(),
                self.slot_size
            );
        }
        let len = data.len().min(self.slot_size);
        self.bytes.extend_from_slice(&data[..len]);
        self.bytes.resize(offset + self.stride, 0);
        offset as u32
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn slot_size(&self) -> u32 {
        self.slot_size as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// GPU side of the arena. Grows when a frame needs more slots than ever
/// before; the bind group must be rebuilt whenever it does.
pub struct DynamicUniformBuffer {
    buffer: wgpu::Buffer,
    binding_size: u64,
}

impl DynamicUniformBuffer {
    pub fn new(device: &wgpu::Device, binding_size: u32, capacity: u64) -> Self {
        Self {
            buffer: Self::create_buffer(device, capacity.max(binding_size as u64)),
            binding_size: binding_size as u64,
        }
    }

    fn create_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("DynamicUniformBuffer"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Uploads the arena. Returns `true` if the buffer was reallocated.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, arena: &UniformArena) -> bool {
        let needed = arena.bytes().len() as u64;
        let mut grown = false;
        if needed > self.buffer.size() {
            let size = needed.next_power_of_two();
            log::debug!("Growing dynamic uniform buffer to {} bytes", size);
            self.buffer = Self::create_buffer(device, size);
            grown = true;
        }
        if needed > 0 {
            queue.write_buffer(&self.buffer, 0, arena.bytes());
        }
        grown
    }

    /// Binding covering one slot; the dynamic offset picks which.
    pub fn binding_resource(&self) -> wgpu::BindingResource {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: wgpu::BufferSize::new(self.binding_size),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_respect_alignment() {
        let mut arena = UniformArena::new(320, 256);
        assert_eq!(arena.push(&[1; 128]), 0);
        assert_eq!(arena.push(&[2; 320]), 512);
        assert_eq!(arena.push(&[3; 4]), 1024);
        assert_eq!(arena.bytes().len(), 1536);
    }

    #[test]
    fn test_slot_contents_are_zero_padded() {
        let mut arena = UniformArena::new(16, 16);
        arena.push(&[7; 4]);
        assert_eq!(&arena.bytes()[..16], &[7, 7, 7, 7, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_oversized_data_is_truncated() {
        let mut arena = UniformArena::new(8, 4);
        arena.push(&[9; 12]);
        assert_eq!(arena.bytes(), &[9; 8]);
    }

    #[test]
    fn test_clear_restarts_offsets() {
        let mut arena = UniformArena::new(64, 256);
        arena.push(&[0; 64]);
        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.push(&[0; 64]), 0);
    }
}
