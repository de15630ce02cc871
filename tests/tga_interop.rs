//! Files written by the codec have to decode the same in an independent decoder.

use soft_raster::image::tga;
use soft_raster::image::{Color, Format, Image, Origin, WriteOptions};

fn gradient(width: u32, height: u32, format: Format) -> Image {
    let mut image = Image::new(width, height, format);
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            // Flat bands for rle runs, noise on the right for raw packets.
            let color = if x < width as i64 / 3 {
                Color::rgb(40, 80, 120)
            } else {
                Color::rgb((x * 7 + y) as u8, (y * 13) as u8, (x * y) as u8)
            };
            image.set(x, y, color);
        }
    }
    return image;
}

fn decode_with_image_crate(bytes: &[u8]) -> Vec<u8> {
    let decoded = ::image::load_from_memory_with_format(bytes, ::image::ImageFormat::Tga).unwrap();
    return decoded.to_rgba8().into_raw();
}

#[test]
fn image_crate_reads_what_we_write() {
    for format in [Format::Rgb, Format::Grayscale] {
        for rle in [false, true] {
            for origin in [Origin::BottomLeft, Origin::TopLeft] {
                let image = gradient(33, 17, format);
                let mut bytes = Vec::new();
                tga::encode(&image, &mut bytes, &WriteOptions { rle, origin }).unwrap();
                assert_eq!(
                    decode_with_image_crate(&bytes),
                    image.to_rgba8(),
                    "{:?} rle={} {:?}",
                    format,
                    rle,
                    origin
                );
            }
        }
    }
}

#[test]
fn we_read_what_image_crate_writes() {
    let source = gradient(21, 9, Format::Rgb);
    let buffer = ::image::RgbImage::from_raw(21, 9, source.to_rgb8()).unwrap();
    let mut bytes = std::io::Cursor::new(Vec::new());
    buffer.write_to(&mut bytes, ::image::ImageOutputFormat::Tga).unwrap();

    let decoded = tga::decode(&bytes.into_inner()[..]).unwrap();
    assert_eq!(decoded.to_rgb8(), source.to_rgb8());
}
