//! # docseg-core: run parameters and label conversion for document segmentation
//!
//! This crate holds the pieces of a segmentation training run that are not the
//! network itself:
//!
//! - **Run parameters**: typed options loaded through `figment`, validated into
//!   [`ModelParams`] and exported as `model_params.json` next to the model.
//! - **Color palettes**: the class color file, one RGB row per class.
//! - **Label conversion**: RGB label images to per-pixel class indices (nearest
//!   palette color) and back, over `ndarray` arrays, plus an `image` bridge for
//!   reading and writing those arrays as files.

pub mod config;
pub mod error;
pub mod image_io;
pub mod labels;
pub mod palette;
pub mod params;

// Re-exports
pub use config::{OPTION_KEYS, OptionOverrides, RunOptions, load_options};
pub use error::{DocSegError, LabelError, PaletteError, ParamsError};
pub use labels::{
    class_indices_to_image, class_to_label_image, image_to_class_indices, label_image_to_class,
};
pub use palette::ColorPalette;
pub use params::{ModelParams, PARAMS_FILE_NAME, PredictionType, PretrainedModel};
