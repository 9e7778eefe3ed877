use bytemuck::{Pod, Zeroable};
use overlay::{PixelRegion, SurfaceSize};

use crate::compile::{UniformSlot, MAX_CUSTOM_UNIFORMS};

/// std140 mirror of the `RegionParams` block injected into every program.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct RegionUniforms {
    /// NDC scale (xy) and offset (zw) placing the triangle on the viewport.
    pub viewport: [f32; 4],
    pub resolution: [f32; 2],
    pub time: f32,
    pub padding0: f32,
    pub custom: [[f32; 4]; MAX_CUSTOM_UNIFORMS / 4],
}

impl Default for RegionUniforms {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl RegionUniforms {
    pub(crate) fn set_scalar(&mut self, slot: UniformSlot, value: f32) {
        match slot {
            UniformSlot::Resolution => self.resolution[0] = value,
            UniformSlot::Time => self.time = value,
            UniformSlot::Custom(index) => self.custom[index / 4][index % 4] = value,
        }
    }

    pub(crate) fn set_pair(&mut self, slot: UniformSlot, x: f32, y: f32) {
        match slot {
            UniformSlot::Resolution => self.resolution = [x, y],
            other => self.set_scalar(other, x),
        }
    }

    /// Maps the fullscreen triangle onto `region` (bottom-left origin) of a
    /// target of `target` pixels.
    pub(crate) fn set_viewport(&mut self, region: PixelRegion, target: SurfaceSize) {
        let width = target.width.max(1) as f32;
        let height = target.height.max(1) as f32;
        self.viewport = [
            region.width / width,
            region.height / height,
            (2.0 * region.x + region.width) / width - 1.0,
            (2.0 * region.y + region.height) / height - 1.0,
        ];
    }
}

/// Rounds the block size up to the device's dynamic-offset alignment.
pub(crate) fn aligned_stride(alignment: u32) -> u64 {
    let size = std::mem::size_of::<RegionUniforms>() as u64;
    let alignment = u64::from(alignment.max(1));
    size.div_ceil(alignment) * alignment
}

/// Packs one block per draw at `stride` byte intervals.
pub(crate) fn pack(blocks: &[RegionUniforms], stride: u64) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; blocks.len() * stride];
    for (index, block) in blocks.iter().enumerate() {
        let start = index * stride;
        let raw = bytemuck::bytes_of(block);
        bytes[start..start + raw.len()].copy_from_slice(raw);
    }
    bytes
}

/// Growable uniform buffer addressed with dynamic offsets, one slot per draw.
pub(crate) struct UniformArena {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl UniformArena {
    const INITIAL_CAPACITY: usize = 16;

    pub(crate) fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let stride = aligned_stride(device.limits().min_uniform_buffer_offset_alignment);
        let capacity = Self::INITIAL_CAPACITY;
        let (buffer, bind_group) = Self::allocate(device, layout, stride, capacity);
        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("region uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("region uniforms bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<RegionUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Uploads `blocks`, growing the buffer first when they do not fit.
    pub(crate) fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        blocks: &[RegionUniforms],
    ) {
        if blocks.is_empty() {
            return;
        }
        if blocks.len() > self.capacity {
            let capacity = blocks.len().next_power_of_two();
            tracing::debug!(from = self.capacity, to = capacity, "growing uniform arena");
            let (buffer, bind_group) = Self::allocate(device, layout, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }
        queue.write_buffer(&self.buffer, 0, &pack(blocks, self.stride));
    }

    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub(crate) fn offset(&self, index: usize) -> u32 {
        (index as u64 * self.stride) as u32
    }
}
