//! Truevision raster (tga) codec.
//!
//! Supports uncompressed (data types 2, 3) and run-length encoded (10, 11) true-color and
//! grayscale images with 8, 24 or 32 bits per pixel. Color-mapped images are not supported; a
//! color map present in a true-color file is skipped.
//!
//! Layout: an 18 byte little-endian header, `id_length` bytes of image id, the color map (if
//! any) and then the pixel data, stored b, g, r[, a].

use std::io::{self, Read, Write};

use super::{Format, Image};

const HEADER_SIZE: usize = 18;
/// Longest packet either kind of rle packet can describe.
const MAX_PACKET_LENGTH: usize = 128;
/// Shortest run that gets its own rle packet, anything shorter stays in a raw packet.
const MIN_RUN_LENGTH: usize = 4;

const DESCRIPTOR_RIGHT_TO_LEFT: u8 = 0x10;
const DESCRIPTOR_TOP_TO_BOTTOM: u8 = 0x20;

const FOOTER_SIGNATURE: &[u8; 18] = b"TRUEVISION-XFILE.\0";

#[derive(thiserror::Error, Debug)]
pub enum TgaError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("stream ended before the image was complete")]
    Truncated,

    #[error("unsupported data type code {0}")]
    UnsupportedDataType(u8),

    #[error("unsupported bits per pixel: {0}")]
    UnsupportedBitsPerPixel(u8),

    #[error("image has zero width or height")]
    ZeroDimensions,

    #[error("image of {width}x{height} does not fit 16 bit dimensions")]
    TooLarge { width: u32, height: u32 },

    #[error("rle packet runs past the end of the image")]
    RleOverflow,
}

/// Where the first stored row sits on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Rows are stored bottom row first, descriptor bit 0x20 is clear.
    BottomLeft,
    /// Rows are stored top row first, descriptor bit 0x20 is set.
    TopLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub rle: bool,
    pub origin: Origin,
}

impl Default for WriteOptions {
    fn default() -> Self {
        return WriteOptions {
            rle: true,
            origin: Origin::BottomLeft,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Header {
    id_length: u8,
    color_map_type: u8,
    data_type: u8,
    color_map_origin: u16,
    color_map_length: u16,
    color_map_depth: u8,
    x_origin: u16,
    y_origin: u16,
    width: u16,
    height: u16,
    bits_per_pixel: u8,
    image_descriptor: u8,
}

impl Header {
    fn from_bytes(b: &[u8; HEADER_SIZE]) -> Header {
        let u16_at = |i: usize| u16::from_le_bytes([b[i], b[i + 1]]);
        return Header {
            id_length: b[0],
            color_map_type: b[1],
            data_type: b[2],
            color_map_origin: u16_at(3),
            color_map_length: u16_at(5),
            color_map_depth: b[7],
            x_origin: u16_at(8),
            y_origin: u16_at(10),
            width: u16_at(12),
            height: u16_at(14),
            bits_per_pixel: b[16],
            image_descriptor: b[17],
        };
    }

    fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut b = [0u8; HEADER_SIZE];
        b[0] = self.id_length;
        b[1] = self.color_map_type;
        b[2] = self.data_type;
        b[3..5].copy_from_slice(&self.color_map_origin.to_le_bytes());
        b[5..7].copy_from_slice(&self.color_map_length.to_le_bytes());
        b[7] = self.color_map_depth;
        b[8..10].copy_from_slice(&self.x_origin.to_le_bytes());
        b[10..12].copy_from_slice(&self.y_origin.to_le_bytes());
        b[12..14].copy_from_slice(&self.width.to_le_bytes());
        b[14..16].copy_from_slice(&self.height.to_le_bytes());
        b[16] = self.bits_per_pixel;
        b[17] = self.image_descriptor;
        return b;
    }
}

/// `read_exact`, with running out of input reported as a truncated image.
fn read_exact_or_truncated<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), TgaError> {
    return reader.read_exact(buf).map_err(|error| match error.kind() {
        io::ErrorKind::UnexpectedEof => TgaError::Truncated,
        _ => TgaError::Io(error),
    });
}

fn skip<R: Read>(reader: &mut R, count: u64) -> Result<(), TgaError> {
    let skipped = io::copy(&mut reader.by_ref().take(count), &mut io::sink())?;
    if skipped < count {
        return Err(TgaError::Truncated);
    }
    return Ok(());
}

/// Decodes a whole image. Row 0 of the result is the top row whatever the stored orientation.
pub fn decode<R: Read>(mut reader: R) -> Result<Image, TgaError> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    read_exact_or_truncated(&mut reader, &mut header_bytes)?;
    let header = Header::from_bytes(&header_bytes);

    if header.bits_per_pixel % 8 != 0 {
        return Err(TgaError::UnsupportedBitsPerPixel(header.bits_per_pixel));
    }
    let format = Format::from_bytes_per_pixel(header.bits_per_pixel as usize / 8)
        .ok_or(TgaError::UnsupportedBitsPerPixel(header.bits_per_pixel))?;
    let rle = match header.data_type {
        2 | 3 => false,
        10 | 11 => true,
        other => return Err(TgaError::UnsupportedDataType(other)),
    };
    if header.width == 0 || header.height == 0 {
        return Err(TgaError::ZeroDimensions);
    }

    skip(&mut reader, header.id_length as u64)?;
    let color_map_size = header.color_map_length as u64 * (header.color_map_depth / 8) as u64;
    skip(&mut reader, color_map_size)?;

    let pixel_count = header.width as usize * header.height as usize;
    let bpp = format.bytes_per_pixel();
    let pixel_data = if rle {
        decode_rle(&mut reader, pixel_count, bpp)?
    } else {
        let mut data = vec![0u8; pixel_count * bpp];
        read_exact_or_truncated(&mut reader, &mut data)?;
        data
    };

    let mut image = Image::from_raw(header.width as u32, header.height as u32, format, pixel_data)
        .ok_or(TgaError::Truncated)?;
    if header.image_descriptor & DESCRIPTOR_TOP_TO_BOTTOM == 0 {
        image.flip_vertically();
    }
    if header.image_descriptor & DESCRIPTOR_RIGHT_TO_LEFT != 0 {
        image.flip_horizontally();
    }
    return Ok(image);
}

/// Reads packets until exactly `pixel_count` pixels have been produced.
fn decode_rle<R: Read>(reader: &mut R, pixel_count: usize, bpp: usize) -> Result<Vec<u8>, TgaError> {
    let mut data = Vec::with_capacity(pixel_count * bpp);
    let mut produced = 0;
    let mut pixel = [0u8; 4];
    while produced < pixel_count {
        let mut packet_header = [0u8; 1];
        read_exact_or_truncated(reader, &mut packet_header)?;
        let packet_header = packet_header[0] as usize;
        if packet_header < 128 {
            // Raw packet, pixels follow verbatim.
            let count = packet_header + 1;
            if produced + count > pixel_count {
                return Err(TgaError::RleOverflow);
            }
            let start = data.len();
            data.resize(start + count * bpp, 0);
            read_exact_or_truncated(reader, &mut data[start..])?;
            produced += count;
        } else {
            // Rle packet, one pixel repeated.
            let count = packet_header - 127;
            if produced + count > pixel_count {
                return Err(TgaError::RleOverflow);
            }
            read_exact_or_truncated(reader, &mut pixel[..bpp])?;
            for _ in 0..count {
                data.extend_from_slice(&pixel[..bpp]);
            }
            produced += count;
        }
    }
    return Ok(data);
}

/// Encodes a whole image, header, pixel data and v2 footer.
pub fn encode<W: Write>(image: &Image, mut writer: W, options: &WriteOptions) -> Result<(), TgaError> {
    if image.width == 0 || image.height == 0 {
        return Err(TgaError::ZeroDimensions);
    }
    if image.width > u16::MAX as u32 || image.height > u16::MAX as u32 {
        return Err(TgaError::TooLarge { width: image.width, height: image.height });
    }

    let grayscale = image.format == Format::Grayscale;
    let header = Header {
        data_type: match (grayscale, options.rle) {
            (true, false) => 3,
            (false, false) => 2,
            (true, true) => 11,
            (false, true) => 10,
        },
        width: image.width as u16,
        height: image.height as u16,
        bits_per_pixel: (image.bytes_per_pixel() * 8) as u8,
        image_descriptor: match options.origin {
            Origin::BottomLeft => 0,
            Origin::TopLeft => DESCRIPTOR_TOP_TO_BOTTOM,
        },
        ..Default::default()
    };
    writer.write_all(&header.to_bytes())?;

    // In memory row 0 is the top, a bottom-left file wants it last.
    let flipped;
    let ordered = match options.origin {
        Origin::TopLeft => image,
        Origin::BottomLeft => {
            let mut copy = image.clone();
            copy.flip_vertically();
            flipped = copy;
            &flipped
        }
    };
    if options.rle {
        encode_rle(&mut writer, ordered.as_bytes(), ordered.bytes_per_pixel())?;
    } else {
        writer.write_all(ordered.as_bytes())?;
    }

    // Extension area offset, developer area offset, signature.
    writer.write_all(&[0u8; 4])?;
    writer.write_all(&[0u8; 4])?;
    writer.write_all(FOOTER_SIGNATURE)?;
    return Ok(());
}

/// Number of identical pixels starting at `start`, looking at no more than `limit` pixels.
fn run_length(data: &[u8], bpp: usize, start: usize, limit: usize) -> usize {
    let pixel_count = data.len() / bpp;
    let first = &data[start * bpp..(start + 1) * bpp];
    let mut length = 1;
    while start + length < pixel_count
        && length < limit
        && &data[(start + length) * bpp..(start + length + 1) * bpp] == first
    {
        length += 1;
    }
    return length;
}

fn encode_rle<W: Write>(writer: &mut W, data: &[u8], bpp: usize) -> io::Result<()> {
    let pixel_count = data.len() / bpp;
    let mut current = 0;
    while current < pixel_count {
        let run = run_length(data, bpp, current, MAX_PACKET_LENGTH);
        if run >= MIN_RUN_LENGTH {
            writer.write_all(&[(128 + run - 1) as u8])?;
            writer.write_all(&data[current * bpp..(current + 1) * bpp])?;
            current += run;
            continue;
        }

        // Raw packet, cut short as soon as a worthwhile run starts.
        let start = current;
        let mut length = 0;
        while current < pixel_count && length < MAX_PACKET_LENGTH {
            if length > 0 && run_length(data, bpp, current, MIN_RUN_LENGTH) >= MIN_RUN_LENGTH {
                break;
            }
            current += 1;
            length += 1;
        }
        writer.write_all(&[(length - 1) as u8])?;
        writer.write_all(&data[start * bpp..current * bpp])?;
    }
    return Ok(());
}
