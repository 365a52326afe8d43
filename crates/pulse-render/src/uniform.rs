//! Named uniform blocks and the per-frame ring of per-draw uniform records.
//!
//! Each draw call gets its own record in one uniform buffer, bound with a
//! dynamic offset. Records are pushed while preparing the frame, uploaded
//! once by [`UniformRing::flush`], then referenced by offset while encoding.

use std::num::NonZeroU64;

use glam::{Mat4, Vec4};

use crate::shader::ShaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    Vec4,
    Float,
}

impl UniformKind {
    /// Size in bytes inside a uniform buffer.
    pub const fn size(self) -> u32 {
        match self {
            UniformKind::Mat4 => 64,
            UniformKind::Vec4 => 16,
            UniformKind::Float => 4,
        }
    }

    /// Alignment in the uniform address space.
    pub const fn align(self) -> u32 {
        match self {
            UniformKind::Mat4 | UniformKind::Vec4 => 16,
            UniformKind::Float => 4,
        }
    }

    fn wgsl_type(self) -> &'static str {
        match self {
            UniformKind::Mat4 => "mat4x4<f32>",
            UniformKind::Vec4 => "vec4<f32>",
            UniformKind::Float => "f32",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec4(Vec4),
    Float(f32),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Float(_) => UniformKind::Float,
        }
    }

    fn write(&self, out: &mut [u8]) {
        match self {
            UniformValue::Mat4(m) => out.copy_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
            UniformValue::Vec4(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Float(f) => out.copy_from_slice(&f.to_ne_bytes()),
        }
    }
}

/// Location of one uniform inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Ordered set of named uniforms laid out by WGSL uniform rules.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    fields: Vec<(&'static str, UniformSlot)>,
    size: u32,
}

impl UniformBlock {
    pub fn new(fields: &[(&'static str, UniformKind)]) -> Self {
        let mut offset: u32 = 0;
        let mut laid_out = Vec::with_capacity(fields.len());
        for &(name, kind) in fields {
            debug_assert!(
                laid_out.iter().all(|(n, _)| *n != name),
                "duplicate uniform '{name}'"
            );
            offset = offset.next_multiple_of(kind.align());
            laid_out.push((name, UniformSlot { offset, kind }));
            offset += kind.size();
        }

        Self {
            fields: laid_out,
            size: offset.next_multiple_of(16).max(16),
        }
    }

    /// Record size in bytes, a multiple of 16.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn slot(&self, name: &str) -> Option<UniformSlot> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, slot)| *slot)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(n, _)| *n)
    }

    /// WGSL declaration of the block as a struct named `type_name`.
    pub fn wgsl_struct(&self, type_name: &str) -> String {
        let mut out = format!("struct {type_name} {{\n");
        for (name, slot) in &self.fields {
            out.push_str(&format!("    {name}: {},\n", slot.kind.wgsl_type()));
        }
        out.push_str("};\n");
        out
    }
}

/// Write access to one freshly pushed record.
pub struct UniformWriter<'a> {
    bytes: &'a mut [u8],
    offset: u32,
}

impl UniformWriter<'_> {
    /// Dynamic offset to bind this record with.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn set_uniform(&mut self, slot: UniformSlot, value: UniformValue) -> Result<&mut Self, ShaderError> {
        if slot.kind != value.kind() {
            return Err(ShaderError::UniformType {
                expected: slot.kind,
                found: value.kind(),
            });
        }
        let start = slot.offset as usize;
        let end = start + slot.kind.size() as usize;
        value.write(&mut self.bytes[start..end]);
        Ok(self)
    }
}

/// Growable uniform buffer of fixed-stride records bound through one
/// dynamic-offset bind group.
pub struct UniformRing {
    layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    binding_size: u32,
    stride: u32,
    staging: Vec<u8>,
}

impl UniformRing {
    const INITIAL_RECORDS: u64 = 64;

    /// `binding_size` must cover the largest block that will be pushed.
    pub fn new(device: &wgpu::Device, binding_size: u32) -> Self {
        let binding_size = binding_size.next_multiple_of(16).max(16);
        let alignment = device.limits().min_uniform_buffer_offset_alignment;
        let stride = binding_size.next_multiple_of(alignment);

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw-uniforms-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(binding_size as u64),
                },
                count: None,
            }],
        });

        let buffer = Self::create_buffer(device, stride as u64 * Self::INITIAL_RECORDS);
        let bind_group = Self::create_bind_group(device, &layout, &buffer, binding_size);

        Self {
            layout,
            buffer,
            bind_group,
            binding_size,
            stride,
            staging: Vec::new(),
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Number of records pushed since the last reset.
    pub fn len(&self) -> usize {
        self.staging.len() / self.stride as usize
    }

    pub fn is_empty(&self) -> bool {
        self.staging.is_empty()
    }

    /// Drop all records; called at the start of every frame.
    pub fn reset(&mut self) {
        self.staging.clear();
    }

    /// Append a zeroed record for `block`.
    ///
    /// # Panics
    /// If the block is larger than the ring's binding size.
    pub fn push(&mut self, block: &UniformBlock) -> UniformWriter<'_> {
        assert!(
            block.size() <= self.binding_size,
            "uniform block of {} bytes exceeds binding size {}",
            block.size(),
            self.binding_size
        );
        let start = self.staging.len();
        self.staging.resize(start + self.stride as usize, 0);
        UniformWriter {
            bytes: &mut self.staging[start..start + block.size() as usize],
            offset: start as u32,
        }
    }

    /// Upload every pushed record, growing the GPU buffer when needed.
    pub fn flush(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.staging.is_empty() {
            return;
        }
        let needed = self.staging.len() as u64;
        if needed > self.buffer.size() {
            let size = needed.next_power_of_two();
            log::debug!("Growing uniform ring to {} bytes", size);
            self.buffer = Self::create_buffer(device, size);
            self.bind_group =
                Self::create_bind_group(device, &self.layout, &self.buffer, self.binding_size);
        }
        queue.write_buffer(&self.buffer, 0, &self.staging);
    }

    /// Bind the record at `offset` to group 0.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>, offset: u32) {
        render_pass.set_bind_group(0, &self.bind_group, &[offset]);
    }

    fn create_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw-uniforms"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
        binding_size: u32,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw-uniforms-bind-group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: NonZeroU64::new(binding_size as u64),
                }),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;

    fn connection_block() -> UniformBlock {
        UniformBlock::new(&[
            ("mvp", UniformKind::Mat4),
            ("color", UniformKind::Vec4),
            ("tex_offset", UniformKind::Float),
        ])
    }

    #[test]
    fn test_layout_follows_wgsl_alignment() {
        let block = connection_block();
        assert_eq!(block.slot("mvp").map(|s| s.offset), Some(0));
        assert_eq!(block.slot("color").map(|s| s.offset), Some(64));
        assert_eq!(block.slot("tex_offset").map(|s| s.offset), Some(80));
        assert_eq!(block.size(), 96);
    }

    #[test]
    fn test_float_before_vec4_is_padded() {
        let block = UniformBlock::new(&[("t", UniformKind::Float), ("color", UniformKind::Vec4)]);
        assert_eq!(block.slot("t").map(|s| s.offset), Some(0));
        assert_eq!(block.slot("color").map(|s| s.offset), Some(16));
        assert_eq!(block.size(), 32);
    }

    #[test]
    fn test_unknown_name_has_no_slot() {
        assert!(connection_block().slot("model").is_none());
    }

    #[test]
    fn test_wgsl_struct_lists_fields_in_order() {
        let wgsl = connection_block().wgsl_struct("DrawUniforms");
        assert!(wgsl.starts_with("struct DrawUniforms {"));
        let mvp = wgsl.find("mvp: mat4x4<f32>").unwrap();
        let color = wgsl.find("color: vec4<f32>").unwrap();
        let tex = wgsl.find("tex_offset: f32").unwrap();
        assert!(mvp < color && color < tex);
    }

    #[test]
    fn test_value_bytes() {
        let mut out = [0u8; 16];
        UniformValue::Vec4(Vec4::new(1.0, 2.0, 3.0, 4.0)).write(&mut out);
        let floats: &[f32] = bytemuck::cast_slice(&out);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0]);

        let mut out = [0u8; 64];
        UniformValue::Mat4(Mat4::from_translation(glam::Vec3::new(5.0, 6.0, 7.0))).write(&mut out);
        let floats: &[f32] = bytemuck::cast_slice(&out);
        // Column-major: translation in the last column.
        assert_eq!(&floats[12..15], &[5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_ring_records_are_strided_and_typed() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let block = connection_block();
        let mut ring = UniformRing::new(&device, block.size());
        assert_eq!(ring.stride() % device.limits().min_uniform_buffer_offset_alignment, 0);

        let color = block.slot("color").unwrap();
        let first = ring
            .push(&block)
            .set_uniform(color, UniformValue::Vec4(Vec4::ONE))
            .map(|w| w.offset())
            .unwrap();
        let mut writer = ring.push(&block);
        let second = writer.offset();
        let err = writer.set_uniform(color, UniformValue::Float(1.0));
        assert!(matches!(err, Err(ShaderError::UniformType { .. })));

        assert_eq!(first, 0);
        assert_eq!(second, ring.stride());
        assert_eq!(ring.len(), 2);

        ring.flush(&device, &queue);
        ring.reset();
        assert!(ring.is_empty());
    }

    #[test]
    fn test_ring_grows_past_initial_capacity() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let block = connection_block();
        let mut ring = UniformRing::new(&device, block.size());
        for _ in 0..(UniformRing::INITIAL_RECORDS * 3) {
            ring.push(&block);
        }
        ring.flush(&device, &queue);
        assert!(ring.buffer.size() >= ring.staging.len() as u64);
    }
}
