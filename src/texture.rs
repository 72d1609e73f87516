// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;

use glow::HasContext;
use image::ImageFormat;
use thiserror::Error;

/// RGBA, one byte per channel.
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG Decode Error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("GPU Error: {0}")]
    Gpu(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    /// Trilinear.
    #[default]
    LinearMipmapLinear,
}

impl TextureFilter {
    pub fn min_filter(self) -> u32 {
        match self {
            TextureFilter::Nearest => glow::NEAREST,
            TextureFilter::Linear => glow::LINEAR,
            TextureFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
            TextureFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
            TextureFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
            TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
        }
    }

    /// Magnification never samples mip levels, so mipmap filters collapse to
    /// their base filter.
    pub fn mag_filter(self) -> u32 {
        match self {
            TextureFilter::Nearest
            | TextureFilter::NearestMipmapNearest
            | TextureFilter::NearestMipmapLinear => glow::NEAREST,
            TextureFilter::Linear
            | TextureFilter::LinearMipmapNearest
            | TextureFilter::LinearMipmapLinear => glow::LINEAR,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

impl TextureWrap {
    pub fn gl_enum(self) -> u32 {
        match self {
            TextureWrap::Repeat => glow::REPEAT,
            TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
            TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
            TextureWrap::ClampToBorder => glow::CLAMP_TO_BORDER,
        }
    }
}

/// Sampling parameters fixed when the texture is decoded and applied on upload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TextureOptions {
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
}

/// When the decoded pixels reach the GPU.
#[derive(Clone, Copy)]
pub enum UploadPolicy<'gl> {
    /// Upload as part of construction, on the thread owning `gl`.
    Immediate(&'gl glow::Context),
    /// Decode only. Call [`Texture::upload`] later from the GL thread.
    Deferred,
}

#[derive(Debug)]
pub struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    options: TextureOptions,
    gl_tex: Option<glow::Texture>, // GPU handle
}

impl Texture {
    /// Decodes the PNG at `path`.
    pub fn open(
        path: &Path,
        options: TextureOptions,
        policy: UploadPolicy<'_>,
    ) -> Result<Self, TextureError> {
        let file = File::open(path)?;
        let texture = Self::from_reader(BufReader::new(file), options, policy)?;
        log::debug!(
            "Decoded {} ({}x{})",
            path.display(),
            texture.width,
            texture.height
        );
        Ok(texture)
    }

    pub fn from_bytes(
        bytes: &[u8],
        options: TextureOptions,
        policy: UploadPolicy<'_>,
    ) -> Result<Self, TextureError> {
        Self::from_reader(Cursor::new(bytes), options, policy)
    }

    /// Decodes a PNG stream into a tightly packed, top-to-bottom RGBA buffer.
    ///
    /// The reader is dropped before this returns, whatever the outcome.
    pub fn from_reader<R: BufRead + Seek>(
        reader: R,
        options: TextureOptions,
        policy: UploadPolicy<'_>,
    ) -> Result<Self, TextureError> {
        let rgba = image::load(reader, ImageFormat::Png)?.into_rgba8();
        let (width, height) = rgba.dimensions();

        let mut texture = Self {
            width,
            height,
            pixels: rgba.into_raw(),
            options,
            gl_tex: None,
        };

        if let UploadPolicy::Immediate(gl) = policy {
            texture.upload(gl)?;
        }
        Ok(texture)
    }

    /// Creates the GPU texture, uploads the base level and generates the mip chain.
    ///
    /// Uploading twice keeps the existing handle.
    pub fn upload(&mut self, gl: &glow::Context) -> Result<glow::Texture, TextureError> {
        if let Some(tex) = self.gl_tex {
            log::warn!("Texture already uploaded; keeping existing handle");
            return Ok(tex);
        }

        unsafe {
            let tex = gl.create_texture().map_err(TextureError::Gpu)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(tex));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);

            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                self.options.filter.min_filter() as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                self.options.filter.mag_filter() as i32,
            );
            let wrap = self.options.wrap.gl_enum() as i32;
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);

            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                self.width as i32,
                self.height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(&self.pixels)),
            );
            gl.generate_mipmap(glow::TEXTURE_2D);

            self.gl_tex = Some(tex);
            Ok(tex)
        }
    }

    /// Makes this the active 2D texture. Binds nothing if it was never uploaded.
    pub fn bind(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, self.gl_tex);
        }
    }

    /// Releases the GPU texture. The decoded pixels are kept for a later upload.
    pub fn delete(&mut self, gl: &glow::Context) {
        if let Some(tex) = self.gl_tex.take() {
            unsafe {
                gl.delete_texture(tex);
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn options(&self) -> TextureOptions {
        self.options
    }

    pub fn gl_texture(&self) -> Option<glow::Texture> {
        self.gl_tex
    }

    pub fn is_uploaded(&self) -> bool {
        self.gl_tex.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage, RgbaImage};
    use std::fs;
    use tempfile::tempdir;

    // 2x2, row-major, varied alpha
    const CHECKER: [u8; 16] = [
        255, 0, 0, 255, 0, 255, 0, 128, //
        0, 0, 255, 0, 12, 34, 56, 78,
    ];

    fn rgba_png(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
        let image = RgbaImage::from_raw(width, height, pixels.to_vec()).unwrap();
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn decode(bytes: &[u8]) -> Result<Texture, TextureError> {
        Texture::from_bytes(bytes, TextureOptions::default(), UploadPolicy::Deferred)
    }

    #[test]
    fn decodes_rgba_png_byte_exact() {
        let texture = decode(&rgba_png(2, 2, &CHECKER)).unwrap();
        assert_eq!(texture.width(), 2);
        assert_eq!(texture.height(), 2);
        assert_eq!(texture.pixels().len(), 2 * 2 * BYTES_PER_PIXEL);
        assert_eq!(texture.pixels(), &CHECKER);
    }

    #[test]
    fn deferred_decode_has_no_gpu_handle() {
        let texture = decode(&rgba_png(2, 2, &CHECKER)).unwrap();
        assert!(!texture.is_uploaded());
        assert_eq!(texture.gl_texture(), None);
    }

    #[test]
    fn rgb_png_is_expanded_with_opaque_alpha() {
        let image = RgbImage::from_raw(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();

        let texture = decode(bytes.get_ref()).unwrap();
        assert_eq!(texture.pixels(), &[1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn gray_png_is_expanded_to_rgba() {
        let image = GrayImage::from_raw(1, 2, vec![7, 200]).unwrap();
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();

        let texture = decode(bytes.get_ref()).unwrap();
        assert_eq!(texture.pixels(), &[7, 7, 7, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn rows_stay_top_to_bottom() {
        let pixels: Vec<u8> = (0..3u8).flat_map(|row| [row, row, row, 255]).collect();
        let texture = decode(&rgba_png(1, 3, &pixels)).unwrap();
        assert_eq!(&texture.pixels()[0..4], &[0, 0, 0, 255]);
        assert_eq!(&texture.pixels()[8..12], &[2, 2, 2, 255]);
    }

    #[test]
    fn opens_png_from_disk_and_keeps_options() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("checker.png");
        fs::write(&path, rgba_png(2, 2, &CHECKER)).unwrap();

        let options = TextureOptions {
            filter: TextureFilter::Nearest,
            wrap: TextureWrap::ClampToEdge,
        };
        let texture = Texture::open(&path, options, UploadPolicy::Deferred).unwrap();
        assert_eq!(texture.pixels(), &CHECKER);
        assert_eq!(texture.options(), options);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let temp_dir = tempdir().unwrap();
        let result = Texture::open(
            &temp_dir.path().join("missing.png"),
            TextureOptions::default(),
            UploadPolicy::Deferred,
        );
        assert!(matches!(result, Err(TextureError::Io(_))));
    }

    #[test]
    fn non_png_content_is_a_decode_error() {
        let result = decode(b"definitely not a png file");
        assert!(matches!(result, Err(TextureError::Decode(_))));
    }

    #[test]
    fn truncated_png_is_a_decode_error() {
        let bytes = rgba_png(2, 2, &CHECKER);
        let result = decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(TextureError::Decode(_))));
    }

    #[test]
    fn default_options_are_trilinear_repeat() {
        let options = TextureOptions::default();
        assert_eq!(options.filter, TextureFilter::LinearMipmapLinear);
        assert_eq!(options.wrap, TextureWrap::Repeat);
        assert_eq!(options.filter.min_filter(), glow::LINEAR_MIPMAP_LINEAR);
        assert_eq!(options.filter.mag_filter(), glow::LINEAR);
        assert_eq!(options.wrap.gl_enum(), glow::REPEAT);
    }

    #[test]
    fn mipmap_filters_collapse_for_magnification() {
        assert_eq!(TextureFilter::NearestMipmapLinear.mag_filter(), glow::NEAREST);
        assert_eq!(TextureFilter::LinearMipmapNearest.mag_filter(), glow::LINEAR);
        assert_eq!(TextureFilter::Nearest.min_filter(), glow::NEAREST);
    }
}
