//! Texture loading and data structures.
//! Images are decoded to RGBA8; color space and filtering travel with the
//! pixels so the renderer can pick matching GPU formats and samplers.

use std::path::Path;

use anyhow::Context;

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub color_space: ColorSpace,
    pub filter: TextureFilter,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

/// How texel values are interpreted when sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    /// Colors authored in sRGB; decoded to linear on sampling.
    Srgb,
    /// Raw data (normal maps, lookup ramps).
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

impl TextureData {
    /// Create a new texture with given dimensions and RGBA8 format.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> anyhow::Result<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        anyhow::ensure!(
            data.len() == expected,
            "Data size {} doesn't match RGBA8 {}x{} ({} bytes)",
            data.len(),
            width,
            height,
            expected
        );
        Ok(Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
            color_space: ColorSpace::Srgb,
            filter: TextureFilter::Linear,
        })
    }

    /// Load a texture from an image file (PNG or JPEG).
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::info!("Loaded texture {}x{} with {} bytes", width, height, data.len());

        Self::new_rgba8(width, height, data)
    }

    /// Single-texel texture, used when a file is missing.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            data: rgba.to_vec(),
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
            color_space: ColorSpace::Srgb,
            filter: TextureFilter::Linear,
        }
    }

    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    pub fn with_filter(mut self, filter: TextureFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size = (self.width * self.height * self.bytes_per_pixel()) as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn rejects_mismatched_size() {
        assert!(TextureData::new_rgba8(2, 2, vec![0; 15]).is_err());
    }

    #[test]
    fn solid_is_one_texel() {
        let t = TextureData::solid([128, 128, 255, 255]).with_color_space(ColorSpace::Linear);
        assert!(t.is_valid());
        assert_eq!(t.color_space, ColorSpace::Linear);
        assert_eq!(t.data, vec![128, 128, 255, 255]);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = TextureData::load("definitely/not/here.png").unwrap_err();
        assert!(format!("{err:#}").contains("here.png"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.png");
        std::fs::write(&path, png_bytes(4, 1)).unwrap();
        let t = TextureData::load(&path)
            .unwrap()
            .with_filter(TextureFilter::Nearest);
        assert_eq!((t.width, t.height), (4, 1));
        assert!(t.is_valid());
        assert_eq!(&t.data[..4], &[10, 20, 30, 255]);
        assert_eq!(t.filter, TextureFilter::Nearest);
    }
}
