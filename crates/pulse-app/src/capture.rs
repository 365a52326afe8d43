//! Dumping presented frames to numbered PNG files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pulse_config::CaptureConfig;
use pulse_render::SurfaceReadback;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error("failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    #[error("readback was dropped before the map completed")]
    MapAborted,

    #[error("surface does not allow copies; frames cannot be captured")]
    SurfaceNotReadable,

    #[error("cannot capture surface format {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),
}

/// Writes `frames` frames as `00000.png`, `00001.png`, ... into a directory.
#[derive(Debug)]
pub struct FrameCapture {
    output_dir: PathBuf,
    frames: u32,
    written: u32,
}

impl FrameCapture {
    /// `None` when capturing is disabled. Creates the output directory.
    pub fn from_config(config: &CaptureConfig) -> Result<Option<Self>, CaptureError> {
        if !config.enabled() {
            return Ok(None);
        }
        std::fs::create_dir_all(&config.output_dir).map_err(|source| CaptureError::Io {
            path: config.output_dir.clone(),
            source,
        })?;
        tracing::info!(
            "Capturing {} frames to {}",
            config.frames,
            config.output_dir.display()
        );
        Ok(Some(Self {
            output_dir: config.output_dir.clone(),
            frames: config.frames,
            written: 0,
        }))
    }

    pub fn written(&self) -> u32 {
        self.written
    }

    /// True once every requested frame is on disk.
    pub fn is_done(&self) -> bool {
        self.written >= self.frames
    }

    pub fn frame_path(&self, index: u32) -> PathBuf {
        self.output_dir.join(format!("{index:05}.png"))
    }

    /// Wait for `readback` to land, then write it as the next frame.
    /// Call after the frame's commands are submitted.
    pub fn save(
        &mut self,
        device: &wgpu::Device,
        readback: &SurfaceReadback,
    ) -> Result<PathBuf, CaptureError> {
        let pixels = read_rgba(device, readback)?;
        let path = self.frame_path(self.written);
        write_png(&path, readback.width, readback.height, &pixels)?;
        self.written += 1;
        Ok(path)
    }
}

/// Block until the readback buffer is mapped and return its pixels as
/// tightly packed RGBA rows.
fn read_rgba(device: &wgpu::Device, readback: &SurfaceReadback) -> Result<Vec<u8>, CaptureError> {
    let slice = readback.buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: None,
    });
    rx.recv().map_err(|_| CaptureError::MapAborted)??;

    let pixels = {
        let mapped = slice.get_mapped_range();
        unpad_rows(
            &mapped,
            readback.width,
            readback.height,
            readback.padded_bytes_per_row,
            readback.format,
        )
    };
    readback.buffer.unmap();
    pixels
}

/// Strip row padding from a texture copy and convert it to RGBA.
pub fn unpad_rows(
    data: &[u8],
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
    format: wgpu::TextureFormat,
) -> Result<Vec<u8>, CaptureError> {
    let is_bgra = match format {
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => true,
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => false,
        other => return Err(CaptureError::UnsupportedFormat(other)),
    };

    let row_bytes = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in data
        .chunks(padded_bytes_per_row as usize)
        .take(height as usize)
    {
        let row = &row[..row_bytes];
        if is_bgra {
            for texel in row.chunks_exact(4) {
                pixels.extend_from_slice(&[texel[2], texel[1], texel[0], texel[3]]);
            }
        } else {
            pixels.extend_from_slice(row);
        }
    }
    Ok(pixels)
}

/// Encode 8-bit RGBA pixels as a PNG image.
pub fn encode_png<W: Write>(
    writer: W,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> Result<(), CaptureError> {
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgba)?;
    writer.finish()?;
    Ok(())
}

fn write_png(path: &Path, width: u32, height: u32, rgba: &[u8]) -> Result<(), CaptureError> {
    let file = File::create(path).map_err(|source| CaptureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    encode_png(BufWriter::new(file), width, height, rgba)
}
