//! WGSL module registry and linked shader programs with named uniforms.

use log::{debug, info};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use wgpu::{ShaderModuleDescriptor, ShaderSource};

use crate::uniform::{UniformBlock, UniformKind, UniformSlot};

/// Name of the per-draw uniform binding every program can read.
pub const DRAW_UNIFORMS: &str = "draw";

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("shader '{name}' failed to compile: {message}")]
    CompilationFailed { name: String, message: String },

    #[error("program '{name}' failed to link: {message}")]
    LinkFailed { name: String, message: String },

    #[error("program '{name}' has no {stage:?} stage")]
    MissingStage { name: String, stage: ShaderStage },

    #[error("program '{name}' is not linked")]
    NotLinked { name: String },

    #[error("unknown uniform '{name}'")]
    UnknownUniform { name: String },

    #[error("uniform expects {expected:?}, got {found:?}")]
    UniformType { expected: UniformKind, found: UniformKind },
}

/// Compiled shader modules by name.
pub struct ShaderLibrary {
    modules: HashMap<String, Arc<wgpu::ShaderModule>>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Compile WGSL `source` and register it as `name`, replacing any
    /// previous module of that name. Validation errors are returned rather
    /// than reaching the device's uncaptured error handler.
    pub fn load_from_source(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        source: &str,
    ) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        debug!("Loading shader '{}' from source", name);

        let error_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(error_scope.pop()) {
            return Err(ShaderError::CompilationFailed {
                name: name.to_string(),
                message: error.to_string(),
            });
        }

        let module = Arc::new(module);
        if self.modules.insert(name.to_string(), module.clone()).is_some() {
            info!("Replaced shader '{}'", name);
        } else {
            info!("Loaded shader '{}'", name);
        }
        Ok(module)
    }

    pub fn get(&self, name: &str) -> Option<Arc<wgpu::ShaderModule>> {
        self.modules.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Entry point each stage must define.
    pub const fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }
}

/// Vertex and fragment WGSL stages sharing one uniform block.
///
/// Linking prepends the block's struct declaration, bound at group 0
/// binding 0 as `draw`, so stage sources refer to `draw.mvp` and so on.
pub struct ShaderProgram {
    name: String,
    uniforms: UniformBlock,
    vertex: Option<String>,
    fragment: Option<String>,
    module: Option<Arc<wgpu::ShaderModule>>,
}

impl ShaderProgram {
    pub fn new(name: impl Into<String>, uniforms: UniformBlock) -> Self {
        Self {
            name: name.into(),
            uniforms,
            vertex: None,
            fragment: None,
            module: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the source of `stage`, replacing an earlier one. Unlinks the program.
    pub fn add_shader(&mut self, stage: ShaderStage, source: &str) -> &mut Self {
        let slot = match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Fragment => &mut self.fragment,
        };
        *slot = Some(source.to_string());
        self.module = None;
        self
    }

    /// Full WGSL text of the program.
    pub fn source(&self) -> Result<String, ShaderError> {
        let mut out = self.uniforms.wgsl_struct("DrawUniforms");
        out.push_str(&format!(
            "@group(0) @binding(0) var<uniform> {DRAW_UNIFORMS}: DrawUniforms;\n\n"
        ));

        for (stage, source) in [
            (ShaderStage::Vertex, &self.vertex),
            (ShaderStage::Fragment, &self.fragment),
        ] {
            let source = source.as_deref().ok_or_else(|| ShaderError::MissingStage {
                name: self.name.clone(),
                stage,
            })?;
            if !source.contains(&format!("fn {}(", stage.entry_point())) {
                return Err(ShaderError::LinkFailed {
                    name: self.name.clone(),
                    message: format!("{stage:?} stage has no `{}` entry point", stage.entry_point()),
                });
            }
            out.push_str(source);
            out.push('\n');
        }
        Ok(out)
    }

    /// Compile both stages into one module registered under the program name.
    pub fn link(&mut self, device: &wgpu::Device, library: &mut ShaderLibrary) -> Result<(), ShaderError> {
        let source = self.source()?;
        let module = library
            .load_from_source(device, &self.name, &source)
            .map_err(|err| match err {
                ShaderError::CompilationFailed { name, message } => ShaderError::LinkFailed { name, message },
                other => other,
            })?;
        self.module = Some(module);
        Ok(())
    }

    pub fn is_linked(&self) -> bool {
        self.module.is_some()
    }

    pub fn module(&self) -> Result<&wgpu::ShaderModule, ShaderError> {
        self.module.as_deref().ok_or_else(|| ShaderError::NotLinked {
            name: self.name.clone(),
        })
    }

    pub fn uniforms(&self) -> &UniformBlock {
        &self.uniforms
    }

    pub fn uniform_location(&self, name: &str) -> Result<UniformSlot, ShaderError> {
        self.uniforms.slot(name).ok_or_else(|| ShaderError::UnknownUniform {
            name: name.to_string(),
        })
    }
}
