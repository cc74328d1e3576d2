//! Conversion between RGB label images and class index images.
//!
//! Label images are `[H, W, 3]` or `[B, H, W, 3]` arrays of any primitive numeric
//! type. Every pixel is assigned the class of its nearest palette color; the
//! reverse direction looks each class index up in the palette.

use crate::error::{DocSegError, LabelError};
use crate::palette::ColorPalette;
use ndarray::{ArrayBase, ArrayD, Axis, Data, Dimension, IxDyn};
use num_traits::AsPrimitive;
use std::fmt::Display;
use std::path::Path;

/// Map every pixel of a label image to the index of its nearest palette color.
///
/// Returns an `[H, W]` or `[B, H, W]` array. Distances are squared Euclidean in
/// RGB space, compared as `f64`; ties go to the lowest class index.
pub fn image_to_class_indices<S, D, A>(
    image: &ArrayBase<S, D>,
    palette: &ColorPalette,
) -> Result<ArrayD<usize>, LabelError>
where
    S: Data<Elem = A>,
    D: Dimension,
    A: AsPrimitive<f64>,
{
    let image = image.view().into_dyn();
    let rank = image.ndim();
    if rank != 3 && rank != 4 {
        return Err(LabelError::UnsupportedRank { rank });
    }
    let channels = image.shape()[rank - 1];
    if channels != 3 {
        return Err(LabelError::ChannelMismatch { channels });
    }

    Ok(image.map_axis(Axis(rank - 1), |pixel| {
        palette.nearest([pixel[0].as_(), pixel[1].as_(), pixel[2].as_()])
    }))
}

/// Replace every class index with its palette color.
///
/// The result has the input shape plus a trailing axis of 3. Indices outside
/// the palette fail with [`LabelError::ClassIndexOutOfRange`].
pub fn class_indices_to_image<S, D, I>(
    indices: &ArrayBase<S, D>,
    palette: &ColorPalette,
) -> Result<ArrayD<f32>, LabelError>
where
    S: Data<Elem = I>,
    D: Dimension,
    I: Copy + TryInto<usize> + Display,
{
    let mut shape = indices.shape().to_vec();
    shape.push(3);

    let mut data = Vec::with_capacity(indices.len() * 3);
    for &index in indices.iter() {
        let color = TryInto::<usize>::try_into(index)
            .ok()
            .and_then(|i| palette.color(i))
            .ok_or_else(|| LabelError::ClassIndexOutOfRange {
                index: index.to_string(),
                n_classes: palette.len(),
            })?;
        data.extend_from_slice(&color);
    }

    Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
}

/// [`image_to_class_indices`] with the palette read from `classes_file`.
pub fn label_image_to_class<S, D, A>(
    image: &ArrayBase<S, D>,
    classes_file: &Path,
) -> Result<ArrayD<usize>, DocSegError>
where
    S: Data<Elem = A>,
    D: Dimension,
    A: AsPrimitive<f64>,
{
    let palette = ColorPalette::load(classes_file)?;
    Ok(image_to_class_indices(image, &palette)?)
}

/// [`class_indices_to_image`] with the palette read from `classes_file`.
pub fn class_to_label_image<S, D, I>(
    indices: &ArrayBase<S, D>,
    classes_file: &Path,
) -> Result<ArrayD<f32>, DocSegError>
where
    S: Data<Elem = I>,
    D: Dimension,
    I: Copy + TryInto<usize> + Display,
{
    let palette = ColorPalette::load(classes_file)?;
    Ok(class_indices_to_image(indices, &palette)?)
}
