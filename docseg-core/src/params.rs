//! Validated run parameters.
//!
//! [`ModelParams`] is built once from [`RunOptions`] at process start and is
//! read-only afterwards. The class count is the only derived field that can be
//! filled in later, and only through [`ModelParams::with_n_classes`], which returns
//! a new value.

use crate::config::RunOptions;
use crate::error::{DocSegError, ParamsError};
use crate::palette::ColorPalette;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// File name of the exported parameters inside the output model directory.
pub const PARAMS_FILE_NAME: &str = "model_params.json";

/// What the network predicts per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PredictionType {
    /// One class out of the palette colors.
    Classification,
    /// A single continuous value.
    Regression,
}

impl FromStr for PredictionType {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLASSIFICATION" => Ok(PredictionType::Classification),
            "REGRESSION" => Ok(PredictionType::Regression),
            other => Err(ParamsError::UnsupportedTaskType {
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PredictionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionType::Classification => write!(f, "CLASSIFICATION"),
            PredictionType::Regression => write!(f, "REGRESSION"),
        }
    }
}

/// Pretrained backbone network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PretrainedModel {
    Vgg16,
}

impl PretrainedModel {
    /// Checkpoint file holding the pretrained weights.
    pub fn checkpoint_file_name(&self) -> &'static str {
        match self {
            PretrainedModel::Vgg16 => "vgg_16.ckpt",
        }
    }
}

impl FromStr for PretrainedModel {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vgg16" => Ok(PretrainedModel::Vgg16),
            other => Err(ParamsError::UnsupportedBackbone {
                name: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PretrainedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PretrainedModel::Vgg16 => write!(f, "vgg16"),
        }
    }
}

/// Fully validated parameters of a training run.
///
/// Serializes flat, derived fields included; this is the `model_params.json`
/// layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    n_epochs: usize,
    evaluate_every_epochs: usize,
    learning_rate: f64,
    exponential_learning: bool,
    batch_size: usize,
    batch_norm: bool,
    weight_decay: f64,
    data_augmentation: bool,
    make_patches: bool,
    patch_shape: [u32; 2],
    input_resized_size: [u32; 2],
    input_dir_train: Option<PathBuf>,
    input_dir_eval: Option<PathBuf>,
    output_model_dir: Option<PathBuf>,
    gpu: String,
    class_file: Option<PathBuf>,
    prediction_type: PredictionType,
    pretrained_model_name: PretrainedModel,
    pretrained_model_file: PathBuf,
    vgg_intermediate_conv: bool,
    vgg_upscale_params: Vec<Vec<u32>>,
    vgg_selected_levels_upscaling: Vec<bool>,
    n_classes: Option<usize>,
}

impl ModelParams {
    /// Validate run options into parameters.
    ///
    /// Checks, in order: prediction type, class file (classification),
    /// backbone name and its upscaling levels. Regression always gets one class.
    pub fn from_options(options: RunOptions) -> Result<Self, ParamsError> {
        let prediction_type: PredictionType = options
            .prediction_type
            .as_deref()
            .unwrap_or("<unset>")
            .parse()?;

        let n_classes = match prediction_type {
            PredictionType::Classification => {
                if options.class_file.is_none() {
                    return Err(ParamsError::MissingClassFile);
                }
                None
            }
            PredictionType::Regression => Some(1),
        };

        let pretrained_model_name: PretrainedModel = options
            .model_name
            .as_deref()
            .unwrap_or("<unset>")
            .parse()?;

        let (vgg_upscale_params, vgg_selected_levels_upscaling) = match pretrained_model_name {
            PretrainedModel::Vgg16 => match (
                options.vgg_upscale_params,
                options.vgg_selected_levels_upscaling,
            ) {
                (Some(upscale), Some(levels)) => {
                    check_upscaling_levels(&upscale, &levels)?;
                    (upscale, levels)
                }
                _ => {
                    return Err(ParamsError::invalid_backbone(
                        "VGG16 upscale params and selected levels must both be set",
                    ));
                }
            },
        };

        let pretrained_model_file = options
            .pretrained_dir
            .join(pretrained_model_name.checkpoint_file_name());

        let params = Self {
            n_epochs: options.n_epochs,
            evaluate_every_epochs: options.evaluate_every_epochs,
            learning_rate: options.learning_rate,
            exponential_learning: options.exponential_learning,
            batch_size: options.batch_size,
            batch_norm: options.batch_norm,
            weight_decay: options.weight_decay,
            data_augmentation: options.data_augmentation,
            make_patches: options.make_patches,
            patch_shape: options.patch_shape,
            input_resized_size: options.resized_size,
            input_dir_train: options.input_dir_train,
            input_dir_eval: options.input_dir_eval,
            output_model_dir: options.output_model_dir,
            gpu: options.gpu,
            class_file: options.class_file,
            prediction_type,
            pretrained_model_name,
            pretrained_model_file,
            vgg_intermediate_conv: options.vgg_intermediate_conv,
            vgg_upscale_params,
            vgg_selected_levels_upscaling,
            n_classes,
        };

        debug!(
            prediction_type = %params.prediction_type,
            backbone = %params.pretrained_model_name,
            levels = params.vgg_upscale_params.len(),
            "Validated run parameters"
        );
        Ok(params)
    }

    /// Same parameters with the class count replaced.
    pub fn with_n_classes(self, n_classes: usize) -> Self {
        Self {
            n_classes: Some(n_classes),
            ..self
        }
    }

    /// Derive the class count from the class color file.
    ///
    /// Classification counts the palette rows; regression keeps its single class.
    pub fn with_class_count_from_palette(self) -> Result<Self, DocSegError> {
        match self.prediction_type {
            PredictionType::Regression => Ok(self),
            PredictionType::Classification => {
                let class_file = self
                    .class_file
                    .as_deref()
                    .ok_or(ParamsError::MissingClassFile)?;
                let n_classes = ColorPalette::load(class_file)?.len();
                Ok(self.with_n_classes(n_classes))
            }
        }
    }

    /// Write every field to `model_params.json` in the output model directory.
    ///
    /// The directory is created if missing, but not its parents. An existing file
    /// is replaced.
    pub fn export_experiment_params(&self) -> Result<PathBuf, ParamsError> {
        let dir = self
            .output_model_dir
            .as_deref()
            .ok_or(ParamsError::MissingOutputDir)?;
        if !dir.is_dir() {
            std::fs::create_dir(dir)?;
        }

        let path = dir.join(PARAMS_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        info!(path = %path.display(), "Exported experiment parameters");
        Ok(path)
    }

    /// Read parameters previously written by [`Self::export_experiment_params`].
    pub fn load_exported(dir: &Path) -> Result<Self, ParamsError> {
        let content = std::fs::read_to_string(dir.join(PARAMS_FILE_NAME))?;
        let params: Self = serde_json::from_str(&content)?;
        params.validate()?;
        Ok(params)
    }

    /// Re-check the invariants that deserialization alone does not enforce.
    fn validate(&self) -> Result<(), ParamsError> {
        if self.prediction_type == PredictionType::Classification && self.class_file.is_none() {
            return Err(ParamsError::MissingClassFile);
        }
        check_upscaling_levels(
            &self.vgg_upscale_params,
            &self.vgg_selected_levels_upscaling,
        )
    }

    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    pub fn evaluate_every_epochs(&self) -> usize {
        self.evaluate_every_epochs
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn exponential_learning(&self) -> bool {
        self.exponential_learning
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn batch_norm(&self) -> bool {
        self.batch_norm
    }

    pub fn weight_decay(&self) -> f64 {
        self.weight_decay
    }

    pub fn data_augmentation(&self) -> bool {
        self.data_augmentation
    }

    pub fn make_patches(&self) -> bool {
        self.make_patches
    }

    /// `[height, width]`
    pub fn patch_shape(&self) -> [u32; 2] {
        self.patch_shape
    }

    /// `[height, width]`
    pub fn input_resized_size(&self) -> [u32; 2] {
        self.input_resized_size
    }

    pub fn input_dir_train(&self) -> Option<&Path> {
        self.input_dir_train.as_deref()
    }

    pub fn input_dir_eval(&self) -> Option<&Path> {
        self.input_dir_eval.as_deref()
    }

    pub fn output_model_dir(&self) -> Option<&Path> {
        self.output_model_dir.as_deref()
    }

    pub fn gpu(&self) -> &str {
        &self.gpu
    }

    pub fn class_file(&self) -> Option<&Path> {
        self.class_file.as_deref()
    }

    pub fn prediction_type(&self) -> PredictionType {
        self.prediction_type
    }

    pub fn pretrained_model_name(&self) -> PretrainedModel {
        self.pretrained_model_name
    }

    pub fn pretrained_model_file(&self) -> &Path {
        &self.pretrained_model_file
    }

    pub fn vgg_intermediate_conv(&self) -> bool {
        self.vgg_intermediate_conv
    }

    pub fn vgg_upscale_params(&self) -> &[Vec<u32>] {
        &self.vgg_upscale_params
    }

    pub fn vgg_selected_levels_upscaling(&self) -> &[bool] {
        &self.vgg_selected_levels_upscaling
    }

    /// `None` until resolved for classification.
    pub fn n_classes(&self) -> Option<usize> {
        self.n_classes
    }
}

fn check_upscaling_levels(upscale: &[Vec<u32>], levels: &[bool]) -> Result<(), ParamsError> {
    if upscale.len() != levels.len() {
        return Err(ParamsError::invalid_backbone(format!(
            "upscaling levels and selection levels must have the same lengths, {} != {}",
            upscale.len(),
            levels.len()
        )));
    }
    Ok(())
}
