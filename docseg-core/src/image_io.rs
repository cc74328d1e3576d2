//! Bridge between image files and the label arrays used by [`crate::labels`].

use crate::error::{DocSegError, LabelError};
use image::{DynamicImage, ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use std::path::Path;

/// 16-bit grayscale image holding one class index per pixel.
pub type ClassMapImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// `[H, W, 3]` view of an RGB image.
pub fn rgb_image_to_array(image: &RgbImage) -> Result<Array3<u8>, LabelError> {
    let (width, height) = image.dimensions();
    Ok(Array3::from_shape_vec(
        (height as usize, width as usize, 3),
        image.as_raw().clone(),
    )?)
}

/// Decode a label image from disk as `[H, W, 3]` RGB.
pub fn load_label_image(path: &Path) -> Result<Array3<u8>, DocSegError> {
    let image = image::open(path)?.to_rgb8();
    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "Loaded label image"
    );
    Ok(rgb_image_to_array(&image)?)
}

/// Build an RGB image from `[H, W, 3]` float colors, rounding and clamping to `0..=255`.
pub fn rgb_array_to_image(colors: ArrayView3<'_, f32>) -> Result<RgbImage, LabelError> {
    let (height, width, channels) = colors.dim();
    if channels != 3 {
        return Err(LabelError::ChannelMismatch { channels });
    }
    let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    Ok(RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([
            to_u8(colors[[y, x, 0]]),
            to_u8(colors[[y, x, 1]]),
            to_u8(colors[[y, x, 2]]),
        ])
    }))
}

/// Store an `[H, W]` class index array as a 16-bit grayscale image.
pub fn class_map_to_image(classes: ArrayView2<'_, usize>) -> Result<ClassMapImage, LabelError> {
    if let Some(&index) = classes.iter().find(|&&i| i > usize::from(u16::MAX)) {
        return Err(LabelError::ClassIndexOutOfRange {
            index: index.to_string(),
            n_classes: usize::from(u16::MAX) + 1,
        });
    }
    let (height, width) = classes.dim();
    Ok(ClassMapImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([classes[[y as usize, x as usize]] as u16])
    }))
}

/// Read a grayscale class map (8 or 16 bit) back into an `[H, W]` array.
pub fn class_map_from_image(path: &Path) -> Result<Array2<usize>, DocSegError> {
    let classes = match image::open(path)? {
        DynamicImage::ImageLuma8(buf) => {
            let (width, height) = buf.dimensions();
            Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
                usize::from(buf.get_pixel(x as u32, y as u32)[0])
            })
        }
        DynamicImage::ImageLuma16(buf) => {
            let (width, height) = buf.dimensions();
            Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
                usize::from(buf.get_pixel(x as u32, y as u32)[0])
            })
        }
        other => {
            return Err(LabelError::UnsupportedClassMap {
                color: format!("{:?}", other.color()),
            }
            .into());
        }
    };
    Ok(classes)
}
