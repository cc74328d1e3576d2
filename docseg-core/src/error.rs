//! Error types for docseg.
//!
//! Uses `thiserror` for one enum per domain (run parameters, palettes, label
//! conversion), all folded into [`DocSegError`] for callers that mix them.

use std::path::PathBuf;

/// Top-level error type for the docseg core library.
#[derive(Debug, thiserror::Error)]
pub enum DocSegError {
    #[error("Parameter error: {0}")]
    Params(#[from] ParamsError),

    #[error("Palette error: {0}")]
    Palette(#[from] PaletteError),

    #[error("Label conversion error: {0}")]
    Label(#[from] LabelError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from building, exporting or reloading run parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Unsupported prediction type: {value}")]
    UnsupportedTaskType { value: String },

    #[error("Classification requires a class file")]
    MissingClassFile,

    #[error("Invalid backbone configuration: {message}")]
    InvalidBackboneConfig { message: String },

    #[error("Unsupported pretrained model: {name}")]
    UnsupportedBackbone { name: String },

    #[error("No output model directory configured")]
    MissingOutputDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from loading a class color file.
#[derive(Debug, thiserror::Error)]
pub enum PaletteError {
    #[error("Class color file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid class color row at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Palette has no colors")]
    NoColors,

    #[error("Class color file has no colors: {path}")]
    Empty { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from converting between label images and class indices.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("Unsupported label image rank {rank}, expected [H,W,3] or [B,H,W,3]")]
    UnsupportedRank { rank: usize },

    #[error("Label image has {channels} channels, expected 3")]
    ChannelMismatch { channels: usize },

    #[error("Class index {index} out of range for {n_classes} classes")]
    ClassIndexOutOfRange { index: String, n_classes: usize },

    #[error("Class map must be a single-channel grayscale image, got {color}")]
    UnsupportedClassMap { color: String },

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl PaletteError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

impl ParamsError {
    pub fn invalid_backbone(message: impl Into<String>) -> Self {
        Self::InvalidBackboneConfig {
            message: message.into(),
        }
    }
}
