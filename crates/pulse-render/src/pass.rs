//! Render pass boilerplate: [`RenderPassBuilder`] for pass descriptors,
//! [`ColorTarget`] for offscreen and multisampled attachments, and
//! [`FrameEncoder`] for one frame's command encoding, readback and present.

/// Attachment settings for one render pass.
#[derive(Debug, Clone)]
pub struct RenderPassBuilder<'a> {
    load: wgpu::LoadOp<wgpu::Color>,
    depth: Option<(&'a wgpu::TextureView, f32)>,
    msaa_resolve_target: Option<&'a wgpu::TextureView>,
    label: Option<&'static str>,
}

impl Default for RenderPassBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RenderPassBuilder<'a> {
    /// Clears to transparent black, no depth, no resolve.
    pub fn new() -> Self {
        Self {
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            depth: None,
            msaa_resolve_target: None,
            label: None,
        }
    }

    pub fn clear_color(mut self, color: wgpu::Color) -> Self {
        self.load = wgpu::LoadOp::Clear(color);
        self
    }

    /// Keep the existing color contents instead of clearing.
    pub fn load(mut self) -> Self {
        self.load = wgpu::LoadOp::Load;
        self
    }

    /// Attach a depth buffer, cleared to `clear_value`.
    pub fn depth(mut self, view: &'a wgpu::TextureView, clear_value: f32) -> Self {
        self.depth = Some((view, clear_value));
        self
    }

    pub fn msaa_resolve(mut self, resolve_target: &'a wgpu::TextureView) -> Self {
        self.msaa_resolve_target = Some(resolve_target);
        self
    }

    pub fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn begin<'encoder>(
        &self,
        encoder: &'encoder mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
    ) -> wgpu::RenderPass<'encoder> {
        let color_attachment = wgpu::RenderPassColorAttachment {
            view: color_view,
            resolve_target: self.msaa_resolve_target,
            ops: wgpu::Operations {
                load: self.load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        };

        let depth_stencil_attachment =
            self.depth
                .map(|(view, clear_value)| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_value),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                });

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: self.label,
            color_attachments: &[Some(color_attachment)],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

/// Color texture used as a render attachment.
pub struct ColorTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl ColorTarget {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        format: wgpu::TextureFormat,
        (width, height): (u32, u32),
        sample_count: u32,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: usage | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }
}

/// Surface pixels copied into a mappable buffer. Rows are padded to
/// `padded_bytes_per_row`.
pub struct SurfaceReadback {
    pub buffer: wgpu::Buffer,
    pub width: u32,
    pub height: u32,
    pub padded_bytes_per_row: u32,
    pub format: wgpu::TextureFormat,
}

/// Padded row pitch for a copy of `width` texels of 4 bytes.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    (width * 4).div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Command encoder and surface texture for one frame.
/// Consumed by [`FrameEncoder::submit`], which also presents.
pub struct FrameEncoder {
    encoder: wgpu::CommandEncoder,
    surface_texture: wgpu::SurfaceTexture,
    surface_view: wgpu::TextureView,
}

impl FrameEncoder {
    pub fn new(device: &wgpu::Device, surface_texture: wgpu::SurfaceTexture) -> Self {
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            encoder,
            surface_texture,
            surface_view,
        }
    }

    /// The encoder together with the view of the surface being drawn.
    pub fn parts(&mut self) -> (&mut wgpu::CommandEncoder, &wgpu::TextureView) {
        (&mut self.encoder, &self.surface_view)
    }

    /// Queue a copy of the surface into a readback buffer. `None` when the
    /// surface was not created with `COPY_SRC` or is not 4 bytes per texel.
    pub fn copy_surface_to_buffer(&mut self, device: &wgpu::Device) -> Option<SurfaceReadback> {
        let texture = &self.surface_texture.texture;
        if !texture.usage().contains(wgpu::TextureUsages::COPY_SRC)
            || texture.format().block_copy_size(None) != Some(4)
        {
            return None;
        }

        let (width, height) = (texture.width(), texture.height());
        let padded = padded_bytes_per_row(width);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame-readback"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        self.encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        Some(SurfaceReadback {
            buffer,
            width,
            height,
            padded_bytes_per_row: padded,
            format: texture.format(),
        })
    }

    /// Submit the recorded commands and present the surface.
    pub fn submit(self, queue: &wgpu::Queue) -> wgpu::SubmissionIndex {
        let index = queue.submit([self.encoder.finish()]);
        self.surface_texture.present();
        index
    }
}
