//! wgpu rendering for Pulse Globe: device and surface setup, buffers, shader
//! programs, the globe mesh, the glow stage and the two-pass frame renderer.

pub mod buffer;
pub mod camera;
pub mod depth;
pub mod globe;
pub mod glow;
pub mod gpu;
pub mod pass;
pub mod pipeline;
pub mod renderer;
pub mod shader;
pub mod uniform;

pub use buffer::{BufferAllocator, DynamicVertexBuffer, IndexData, MappedVertices, MeshBuffer, VertexBuffer};
pub use camera::OrbitCamera;
pub use depth::DepthBuffer;
pub use globe::{GlobeMesh, GlobeVertex, MAX_SUBDIVISIONS};
pub use glow::{GLOW_FORMAT, GlowSettings, GlowStage};
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use pass::{ColorTarget, FrameEncoder, RenderPassBuilder, SurfaceReadback};
pub use pipeline::{Programs, ScenePipelines, TargetDesc};
pub use renderer::{FrameStats, GlobeRenderer, RenderSettings, normalized_msaa};
pub use shader::{ShaderError, ShaderLibrary, ShaderProgram, ShaderStage};
pub use uniform::{UniformBlock, UniformKind, UniformRing, UniformSlot, UniformValue};
