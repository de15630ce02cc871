pub mod tga;

pub use tga::{Origin, TgaError, WriteOptions};

use std::path::Path;

/// Struct, representing one rgba8 color. Channels are handed out in r, g, b, a order, storage
/// order inside an `Image` is the codec's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
pub const BLACK: Color = Color { r: 0,   g: 0,   b: 0,   a: 255 };
/// All channels zero, alpha included. What reads outside of an image return.
pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

/// Raised for a color channel index outside of 0..=3.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("color channel index {0} is out of range 0..=3")]
pub struct ChannelIndexError(pub usize);

impl Color {
    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        return Color { r, g, b, a: 255 };
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        return Color { r, g, b, a };
    }

    /// Channel by index in r, g, b, a order.
    pub fn channel(&self, index: usize) -> Result<u8, ChannelIndexError> {
        return match index {
            0 => Ok(self.r),
            1 => Ok(self.g),
            2 => Ok(self.b),
            3 => Ok(self.a),
            _ => Err(ChannelIndexError(index)),
        };
    }

    /// Mutable channel by index in r, g, b, a order.
    pub fn channel_mut(&mut self, index: usize) -> Result<&mut u8, ChannelIndexError> {
        return match index {
            0 => Ok(&mut self.r),
            1 => Ok(&mut self.g),
            2 => Ok(&mut self.b),
            3 => Ok(&mut self.a),
            _ => Err(ChannelIndexError(index)),
        };
    }

    /// Get convex combination of two colors: t * c_1 + (1 - t) * c_2.
    /// t is unrestricted, the result is clamped per channel.
    pub fn blend(color_1: Color, color_2: Color, t: f64) -> Color {
        let mix = |c_1: u8, c_2: u8| (t * c_1 as f64 + (1.0 - t) * c_2 as f64).clamp(0.0, 255.0) as u8;
        return Color {
            r: mix(color_1.r, color_2.r),
            g: mix(color_1.g, color_2.g),
            b: mix(color_1.b, color_2.b),
            a: mix(color_1.a, color_2.a),
        };
    }
}

/// Number of bytes stored per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Grayscale = 1,
    Rgb = 3,
    Rgba = 4,
}

impl Format {
    pub fn bytes_per_pixel(self) -> usize {
        return self as usize;
    }

    pub fn from_bytes_per_pixel(bytes_per_pixel: usize) -> Option<Format> {
        return match bytes_per_pixel {
            1 => Some(Format::Grayscale),
            3 => Some(Format::Rgb),
            4 => Some(Format::Rgba),
            _ => None,
        };
    }
}

/// Image, holding its width, height, format and private flat array of pixel data.
/// Row 0 is the top row. Channels are stored as b, g, r[, a], the way they go to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pixel_data: Vec<u8>,
}

impl Image {
    /// Generates new black (all zero) image with specified size and format.
    pub fn new(width: u32, height: u32, format: Format) -> Image {
        let capacity = width as usize * height as usize * format.bytes_per_pixel();
        return Image {
            width,
            height,
            format,
            pixel_data: vec![0; capacity],
        };
    }

    /// Generates new image with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, format: Format, color: Color) -> Image {
        let mut image = Image::new(width, height, format);
        image.fill(color);
        return image;
    }

    /// Wraps already stored b, g, r[, a] data. `None` if the length doesn't match.
    pub fn from_raw(width: u32, height: u32, format: Format, pixel_data: Vec<u8>) -> Option<Image> {
        if pixel_data.len() != width as usize * height as usize * format.bytes_per_pixel() {
            return None;
        }
        return Some(Image { width, height, format, pixel_data });
    }

    pub fn bytes_per_pixel(&self) -> usize {
        return self.format.bytes_per_pixel();
    }

    /// Raw pixel data in storage order.
    pub fn as_bytes(&self) -> &[u8] {
        return &self.pixel_data[..];
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        return &mut self.pixel_data[..];
    }

    /// Sets all pixel data to 0.
    pub fn clear(&mut self) {
        self.pixel_data.fill(0);
    }

    pub fn fill(&mut self, color: Color) {
        let pixel = self.encode_pixel(color);
        for chunk in self.pixel_data.chunks_exact_mut(pixel.len()) {
            chunk.copy_from_slice(&pixel);
        }
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        return Some((x as usize + y as usize * self.width as usize) * self.bytes_per_pixel());
    }

    /// Storage bytes for a color in this image's format.
    fn encode_pixel(&self, color: Color) -> Vec<u8> {
        return match self.format {
            Format::Grayscale => vec![color.r],
            Format::Rgb => vec![color.b, color.g, color.r],
            Format::Rgba => vec![color.b, color.g, color.r, color.a],
        };
    }

    /// Color of the pixel at the coordinate. Outside of the image this is `TRANSPARENT`.
    pub fn get(&self, x: i64, y: i64) -> Color {
        let index = match self.index(x, y) {
            Some(index) => index,
            None => return TRANSPARENT,
        };
        let p = &self.pixel_data[index..index + self.bytes_per_pixel()];
        return match self.format {
            Format::Grayscale => Color::rgb(p[0], p[0], p[0]),
            Format::Rgb => Color::rgb(p[2], p[1], p[0]),
            Format::Rgba => Color::rgba(p[2], p[1], p[0], p[3]),
        };
    }

    /// Sets the pixel at the coordinate. Outside of the image it does nothing.
    /// Grayscale images keep the red channel.
    pub fn set(&mut self, x: i64, y: i64, color: Color) {
        if let Some(index) = self.index(x, y) {
            let pixel = self.encode_pixel(color);
            self.pixel_data[index..index + pixel.len()].copy_from_slice(&pixel);
        }
    }

    /// Mirrors the image around its vertical axis.
    pub fn flip_horizontally(&mut self) {
        let bpp = self.bytes_per_pixel();
        let row_len = self.width as usize * bpp;
        if row_len == 0 {
            return;
        }
        for row in self.pixel_data.chunks_exact_mut(row_len) {
            let width = row.len() / bpp;
            for i in 0..width / 2 {
                let j = width - 1 - i;
                for t in 0..bpp {
                    row.swap(i * bpp + t, j * bpp + t);
                }
            }
        }
    }

    /// Mirrors the image around its horizontal axis.
    pub fn flip_vertically(&mut self) {
        let row_len = self.width as usize * self.bytes_per_pixel();
        let height = self.height as usize;
        for i in 0..height / 2 {
            let j = height - 1 - i;
            let (top, bottom) = self.pixel_data.split_at_mut(j * row_len);
            top[i * row_len..(i + 1) * row_len].swap_with_slice(&mut bottom[..row_len]);
        }
    }

    /// Copy of the pixel data as tightly packed r, g, b triples, row 0 first.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                let color = self.get(x, y);
                data.extend_from_slice(&[color.r, color.g, color.b]);
            }
        }
        return data;
    }

    /// Copy of the pixel data as tightly packed r, g, b, a quads, row 0 first.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                let color = self.get(x, y);
                data.extend_from_slice(&[color.r, color.g, color.b, color.a]);
            }
        }
        return data;
    }

    /// Reads an image from a truevision raster file.
    pub fn read_tga<P: AsRef<Path>>(path: P) -> Result<Image, TgaError> {
        let file = std::fs::File::open(path)?;
        return tga::decode(std::io::BufReader::new(file));
    }

    /// Writes the image to a truevision raster file.
    pub fn write_tga<P: AsRef<Path>>(&self, path: P, options: &WriteOptions) -> Result<(), TgaError> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        tga::encode(self, &mut writer, options)?;
        std::io::Write::flush(&mut writer)?;
        return Ok(());
    }
}
