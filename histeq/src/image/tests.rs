use common::test_utils::test_output_path;

use super::*;

fn gradient_rgb(width: usize, height: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            bytes.push((x * 255 / width.max(1)) as u8);
            bytes.push((y * 255 / height.max(1)) as u8);
            bytes.push(((x + y) * 7 % 256) as u8);
        }
    }
    bytes
}

#[test]
fn test_intensity_plane_rejects_wrong_length() {
    assert!(matches!(
        IntensityPlane::new(3, 2, vec![0; 5]),
        Err(Error::InvalidImage(_))
    ));
    let plane = IntensityPlane::new(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(plane.get(2, 1), 6);
    assert_eq!(plane.pixel_count(), 6);
}

#[test]
fn test_empty_plane_is_valid() {
    let plane = IntensityPlane::new(0, 0, Vec::new()).unwrap();
    assert_eq!(plane.pixel_count(), 0);
}

#[test]
fn test_plane_desc_rejects_oversized() {
    let desc = PlaneDesc::new(100_000, 100_000);
    assert!(matches!(desc.validate(), Err(Error::InvalidImage(_))));
    assert!(PlaneDesc::new(4096, 4096).validate().is_ok());
}

#[test]
fn test_gray_pixels_survive_color_split_and_recombine() {
    let mut rgb = Vec::new();
    for v in 0..=255u8 {
        rgb.extend_from_slice(&[v, v, v]);
    }
    let source = SourceImage::from_rgb8(256, 1, &rgb).unwrap();
    assert!(source.is_color());

    let SourceImage::ColorWithCachedChroma { luma, chroma } = &source else {
        panic!("expected a colour image");
    };
    for (x, &y) in luma.pixels().iter().enumerate() {
        assert_eq!(y as usize, x);
    }
    assert!(chroma.cb.pixels().iter().all(|&c| c == 128));
    assert!(chroma.cr.pixels().iter().all(|&c| c == 128));

    let raster = source.recombine(luma).unwrap();
    assert_eq!(raster.layout, ChannelLayout::Rgb);
    assert_eq!(raster.bytes, rgb);
}

#[test]
fn test_color_recombine_is_close_to_original() {
    let rgb = gradient_rgb(16, 8);
    let source = SourceImage::from_rgb8(16, 8, &rgb).unwrap();
    let raster = source.recombine(source.luma()).unwrap();

    assert_eq!(raster.desc, PlaneDesc::new(16, 8));
    for (a, b) in raster.bytes.iter().zip(&rgb) {
        assert!((*a as i32 - *b as i32).abs() <= 3, "{a} vs {b}");
    }
}

#[test]
fn test_recombine_rejects_mismatched_plane() {
    let source = SourceImage::from_gray8(2, 2, vec![0; 4]).unwrap();
    let other = IntensityPlane::filled(3, 1, 0).unwrap();
    assert!(source.recombine(&other).is_err());
}

#[test]
fn test_from_rgb8_rejects_wrong_length() {
    assert!(SourceImage::from_rgb8(2, 2, &[0; 11]).is_err());
}

#[test]
fn test_save_and_load_gray_png() {
    let path = test_output_path("histeq_gray_roundtrip.png");
    let pixels: Vec<u8> = (0..64).map(|v| (v * 4) as u8).collect();
    let source = SourceImage::from_gray8(8, 8, pixels.clone()).unwrap();
    let raster = source.recombine(source.luma()).unwrap();

    io::save(&path, &raster).unwrap();
    let loaded = io::load(&path).unwrap();

    assert!(!loaded.is_color());
    assert_eq!(loaded.luma().pixels(), pixels.as_slice());
}

#[test]
fn test_save_and_load_rgb_png() {
    let path = test_output_path("histeq_rgb_roundtrip.png");
    let rgb = gradient_rgb(10, 6);
    let raster = Raster {
        desc: PlaneDesc::new(10, 6),
        layout: ChannelLayout::Rgb,
        bytes: rgb,
    };

    io::save(&path, &raster).unwrap();
    let loaded = io::load(&path).unwrap();

    assert!(loaded.is_color());
    assert_eq!(loaded.desc(), PlaneDesc::new(10, 6));
}

#[test]
fn test_load_missing_file_is_decode_error() {
    let result = io::load("does/not/exist.pgm");
    assert!(matches!(result, Err(Error::ImageDecode { .. })));
}
