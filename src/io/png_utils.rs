// Copyright @yucwang 2026

use crate::math::bitmap::Bitmap;
use crate::math::constants::Float;

use image::{ ImageResult, Rgb, RgbImage };

const DISPLAY_GAMMA: Float = 2.2;

/// Maps linear radiance to an 8-bit display value.
pub fn to_display_byte(v: Float) -> u8 {
    let v = if v.is_finite() { v.max(0.0).min(1.0) } else { 0.0 };
    (v.powf(1.0 / DISPLAY_GAMMA) * 255.0 + 0.5) as u8
}

pub fn to_rgb_image(image: &Bitmap) -> RgbImage {
    RgbImage::from_fn(image.width() as u32, image.height() as u32, |x, y| {
        let p = image[(x as usize, y as usize)];
        Rgb([to_display_byte(p.x), to_display_byte(p.y), to_display_byte(p.z)])
    })
}

pub fn write_png_to_file(image: &Bitmap, file_path: &str) -> ImageResult<()> {
    log::info!("Starting writing png image: {}.", file_path);
    to_rgb_image(image).save(file_path)?;
    log::info!("PNG written to: {}.", file_path);
    Ok(())
}
