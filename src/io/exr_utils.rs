/* Copyright 2020 @TwoCookingMice */

use crate::math::bitmap::Bitmap;
use crate::math::constants::Vector3f;

use exr::prelude::*;

// Read EXR Image from file
pub fn read_exr_from_file(file_path: &str) -> Result<Bitmap> {
    log::info!("Starting reading OpenEXR image from: {}.", file_path);

    let image = read_first_rgba_layer_from_file(
        file_path,
        |resolution, _| Bitmap::new(resolution.width(), resolution.height()),
        |bitmap: &mut Bitmap, position, (r, g, b, _a): (f32, f32, f32, f32)| {
            bitmap[(position.x(), position.y())] = Vector3f::new(r, g, b);
        },
    )?;

    let bitmap = image.layer_data.channel_data.pixels;
    log::info!("OpenEXR loaded, width = {}, height = {}.", bitmap.width(), bitmap.height());
    Ok(bitmap)
}

// Write EXR Image to file
pub fn write_exr_to_file(image: &Bitmap, file_path: &str) -> Result<()> {
    log::info!("Starting writing openexr images: {}.", file_path);

    write_rgb_file(file_path, image.width(), image.height(), |x, y| {
        let p = image[(x, y)];
        (p.x, p.y, p.z)
    })?;
    log::info!("EXR written to: {}.", file_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exr_write_then_read() {
        let mut image = Bitmap::new(5, 3);
        image[(4, 2)] = Vector3f::new(1.5, 0.25, 8.0);
        image[(0, 1)] = Vector3f::new(0.0, 2.0, 0.5);

        let path = std::env::temp_dir().join(format!("millefeuille-exr-{}.exr", std::process::id()));
        let path = path.to_string_lossy().to_string();
        write_exr_to_file(&image, &path).unwrap();
        let loaded = read_exr_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, image);
    }
}
