//! Vertex and index buffers: static meshes, static vertex arenas and a
//! dynamic vertex buffer refilled through a scoped write guard.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut, Range};

use bytemuck::Pod;
use wgpu::util::DeviceExt;

/// Indexed mesh ready for drawing.
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub index_format: wgpu::IndexFormat,
}

impl MeshBuffer {
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), self.index_format);
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count > 0 {
            render_pass.draw_indexed(0..self.index_count, 0, 0..1);
        }
    }
}

/// Index data in either u16 or u32 format.
pub enum IndexData<'a> {
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl IndexData<'_> {
    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            IndexData::U16(_) => wgpu::IndexFormat::Uint16,
            IndexData::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            IndexData::U16(data) => data.len() as u32,
            IndexData::U32(data) => data.len() as u32,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(data) => bytemuck::cast_slice(data),
            IndexData::U32(data) => bytemuck::cast_slice(data),
        }
    }
}

/// Creates GPU buffers from CPU data.
pub struct BufferAllocator<'a> {
    device: &'a wgpu::Device,
}

impl<'a> BufferAllocator<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }

    /// Upload an indexed mesh.
    pub fn create_mesh<T: Pod>(&self, label: &str, vertices: &[T], indices: IndexData) -> MeshBuffer {
        let vertex_buffer =
            self.create_buffer(&format!("{label}-vertices"), bytemuck::cast_slice(vertices), wgpu::BufferUsages::VERTEX);
        let index_buffer =
            self.create_buffer(&format!("{label}-indices"), indices.as_bytes(), wgpu::BufferUsages::INDEX);

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: indices.count(),
            index_format: indices.format(),
        }
    }

    /// Upload a static vertex array.
    pub fn create_vertices<T: Pod>(&self, label: &str, vertices: &[T]) -> VertexBuffer<T> {
        VertexBuffer {
            buffer: self.create_buffer(label, bytemuck::cast_slice(vertices), wgpu::BufferUsages::VERTEX),
            len: vertices.len() as u32,
            _marker: PhantomData,
        }
    }

    /// Allocate a dynamic vertex buffer holding up to `capacity` elements.
    pub fn create_dynamic<T: Pod>(&self, label: &str, capacity: usize) -> DynamicVertexBuffer<T> {
        DynamicVertexBuffer::new(self.device, label, capacity)
    }

    fn create_buffer(&self, label: &str, contents: &[u8], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        // Zero-sized buffers cannot be bound; keep one aligned word instead.
        let padding = [0u8; wgpu::COPY_BUFFER_ALIGNMENT as usize];
        let contents = if contents.is_empty() { &padding[..] } else { contents };
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: usage | wgpu::BufferUsages::COPY_DST,
        })
    }
}

/// Immutable vertex array. Sub-ranges are drawn individually, e.g. one line
/// strip per connection out of a shared arc arena.
pub struct VertexBuffer<T> {
    buffer: wgpu::Buffer,
    len: u32,
    _marker: PhantomData<T>,
}

impl<T: Pod> VertexBuffer<T> {
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>, slot: u32) {
        render_pass.set_vertex_buffer(slot, self.buffer.slice(..));
    }

    /// Draw `range` of the bound buffer. Empty ranges are skipped.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, range: Range<u32>) {
        debug_assert!(range.end <= self.len, "draw range {range:?} past {} vertices", self.len);
        if !range.is_empty() {
            render_pass.draw(range, 0..1);
        }
    }
}

/// Vertex buffer whose contents are rewritten every frame.
///
/// Writes go through [`DynamicVertexBuffer::map_for_write`]. The returned
/// guard borrows the buffer mutably, so nothing can draw from it until the
/// guard is dropped, at which point the written prefix is uploaded.
pub struct DynamicVertexBuffer<T> {
    buffer: wgpu::Buffer,
    staging: Vec<T>,
    draw_count: u32,
}

impl<T: Pod> DynamicVertexBuffer<T> {
    pub fn new(device: &wgpu::Device, label: &str, capacity: usize) -> Self {
        let stride = std::mem::size_of::<T>().max(1);
        let size = (capacity.max(1) * stride) as wgpu::BufferAddress;
        let size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            staging: vec![T::zeroed(); capacity],
            draw_count: 0,
        }
    }

    /// Capacity in elements.
    pub fn capacity(&self) -> usize {
        self.staging.len()
    }

    /// Elements written by the most recently released guard.
    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }

    /// Open the buffer for writing. The previous contents stay visible
    /// through the guard; its length starts at zero.
    pub fn map_for_write<'a>(&'a mut self, queue: &'a wgpu::Queue) -> MappedVertices<'a, T> {
        MappedVertices {
            vertices: &mut self.staging,
            buffer: &self.buffer,
            draw_count: &mut self.draw_count,
            queue,
            len: 0,
        }
    }

    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>, slot: u32) {
        render_pass.set_vertex_buffer(slot, self.buffer.slice(..));
    }
}

/// Write access to a [`DynamicVertexBuffer`]. Dereferences to the full
/// capacity; call [`MappedVertices::set_len`] with the number written.
pub struct MappedVertices<'a, T: Pod> {
    vertices: &'a mut [T],
    buffer: &'a wgpu::Buffer,
    draw_count: &'a mut u32,
    queue: &'a wgpu::Queue,
    len: usize,
}

impl<T: Pod> MappedVertices<'_, T> {
    /// Record how many leading elements are valid.
    ///
    /// # Panics
    /// If `len` exceeds the capacity.
    pub fn set_len(&mut self, len: usize) {
        assert!(
            len <= self.vertices.len(),
            "wrote {len} vertices into a buffer of {}",
            self.vertices.len()
        );
        self.len = len;
    }

    /// Elements recorded so far with [`MappedVertices::set_len`].
    pub fn written(&self) -> usize {
        self.len
    }
}

impl<T: Pod> Deref for MappedVertices<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.vertices
    }
}

impl<T: Pod> DerefMut for MappedVertices<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.vertices
    }
}

impl<T: Pod> Drop for MappedVertices<'_, T> {
    fn drop(&mut self) {
        if self.len > 0 {
            let bytes: &[u8] = bytemuck::cast_slice(&self.vertices[..self.len]);
            // write_buffer needs a multiple of 4 bytes.
            if bytes.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
                self.queue.write_buffer(self.buffer, 0, bytes);
            } else {
                let mut padded = bytes.to_vec();
                padded.resize(
                    (bytes.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT) as usize,
                    0,
                );
                self.queue.write_buffer(self.buffer, 0, &padded);
            }
        }
        *self.draw_count = self.len as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;
    use bytemuck::Zeroable;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    struct Point {
        position: [f32; 3],
        weight: f32,
    }

    fn point(x: f32) -> Point {
        Point {
            position: [x, 0.0, 0.0],
            weight: 1.0,
        }
    }

    #[test]
    fn test_index_data_format_and_count() {
        let u16_data = IndexData::U16(&[0, 1, 2]);
        let u32_data = IndexData::U32(&[0, 1, 2, 2, 3, 0]);

        assert_eq!(u16_data.format(), wgpu::IndexFormat::Uint16);
        assert_eq!(u32_data.format(), wgpu::IndexFormat::Uint32);
        assert_eq!(u16_data.count(), 3);
        assert_eq!(u32_data.count(), 6);
        assert_eq!(u16_data.as_bytes().len(), 6);
        assert_eq!(u32_data.as_bytes().len(), 24);
    }

    #[test]
    fn test_mesh_upload() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let allocator = BufferAllocator::new(&device);
        let mesh = allocator.create_mesh("tri", &[point(0.0), point(1.0), point(2.0)], IndexData::U32(&[0, 1, 2]));

        assert_eq!(mesh.index_count, 3);
        assert_eq!(mesh.index_format, wgpu::IndexFormat::Uint32);
    }

    #[test]
    fn test_empty_uploads_are_valid() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let allocator = BufferAllocator::new(&device);

        let mesh = allocator.create_mesh::<Point>("empty", &[], IndexData::U16(&[]));
        assert_eq!(mesh.index_count, 0);

        let arena = allocator.create_vertices::<Point>("empty-arena", &[]);
        assert!(arena.is_empty());
    }

    #[test]
    fn test_guard_records_written_count() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let mut buffer = BufferAllocator::new(&device).create_dynamic::<Point>("cities", 8);
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.draw_count(), 0);

        {
            let mut mapped = buffer.map_for_write(&queue);
            assert_eq!(mapped.len(), 8);
            assert_eq!(mapped.written(), 0);
            for (i, slot) in mapped.iter_mut().take(5).enumerate() {
                *slot = point(i as f32);
            }
            mapped.set_len(5);
        }
        assert_eq!(buffer.draw_count(), 5);

        // A guard released without writing leaves nothing to draw.
        drop(buffer.map_for_write(&queue));
        assert_eq!(buffer.draw_count(), 0);
    }

    #[test]
    fn test_guard_exposes_previous_contents() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let mut buffer = DynamicVertexBuffer::<Point>::new(&device, "cities", 2);
        {
            let mut mapped = buffer.map_for_write(&queue);
            mapped[1] = point(7.0);
            mapped.set_len(2);
        }
        let mapped = buffer.map_for_write(&queue);
        assert_eq!(mapped[1], point(7.0));
    }

    #[test]
    fn test_zero_capacity() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let mut buffer = DynamicVertexBuffer::<Point>::new(&device, "none", 0);
        {
            let mut mapped = buffer.map_for_write(&queue);
            assert!(mapped.is_empty());
            mapped.set_len(0);
        }
        assert_eq!(buffer.capacity(), 0);
        assert_eq!(buffer.draw_count(), 0);
    }

    #[test]
    #[should_panic(expected = "wrote 3 vertices into a buffer of 2")]
    fn test_overfilling_panics() {
        let Some((device, queue)) = create_test_device() else {
            panic!("wrote 3 vertices into a buffer of 2");
        };
        let mut buffer = DynamicVertexBuffer::<Point>::new(&device, "small", 2);
        buffer.map_for_write(&queue).set_len(3);
    }
}
