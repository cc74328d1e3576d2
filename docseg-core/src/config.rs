//! Run option loading for docseg.
//!
//! Uses `figment` for layered options: defaults -> TOML file -> environment -> CLI overrides.
//! [`RunOptions`] is the flat set of named options a training run is started with;
//! [`crate::params::ModelParams::from_options`] validates it into run parameters.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment variable options (`DOCSEG_BATCH_SIZE=8`, ...).
pub const ENV_PREFIX: &str = "DOCSEG_";

/// Keys of [`RunOptions`]; only these are read from the environment.
pub const OPTION_KEYS: &[&str] = &[
    "n_epochs",
    "evaluate_every_epochs",
    "learning_rate",
    "exponential_learning",
    "batch_size",
    "batch_norm",
    "weight_decay",
    "data_augmentation",
    "make_patches",
    "patch_shape",
    "resized_size",
    "input_dir_train",
    "input_dir_eval",
    "output_model_dir",
    "gpu",
    "class_file",
    "model_name",
    "pretrained_dir",
    "prediction_type",
    "vgg_intermediate_conv",
    "vgg_upscale_params",
    "vgg_selected_levels_upscaling",
];

/// Flat set of named options for a training run.
///
/// Every field carries its default; unknown keys are rejected when loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOptions {
    /// Number of training epochs.
    pub n_epochs: usize,
    /// Run an evaluation every this many epochs.
    pub evaluate_every_epochs: usize,
    pub learning_rate: f64,
    /// Decay the learning rate exponentially.
    pub exponential_learning: bool,
    pub batch_size: usize,
    pub batch_norm: bool,
    pub weight_decay: f64,
    pub data_augmentation: bool,
    /// Train on fixed-size patches instead of whole images.
    pub make_patches: bool,
    /// Patch size as `[height, width]`.
    pub patch_shape: [u32; 2],
    /// Input resize target as `[height, width]`.
    pub resized_size: [u32; 2],
    pub input_dir_train: Option<PathBuf>,
    pub input_dir_eval: Option<PathBuf>,
    pub output_model_dir: Option<PathBuf>,
    /// Device selector handed to the training framework untouched.
    pub gpu: String,
    /// Class color file; required for classification.
    pub class_file: Option<PathBuf>,
    /// Pretrained backbone name.
    pub model_name: Option<String>,
    /// Directory holding pretrained backbone checkpoints.
    pub pretrained_dir: PathBuf,
    /// `CLASSIFICATION` or `REGRESSION`.
    pub prediction_type: Option<String>,
    pub vgg_intermediate_conv: bool,
    /// Per-level upscaling parameters, one entry per selected level.
    pub vgg_upscale_params: Option<Vec<Vec<u32>>>,
    /// Which backbone levels feed the upscaling path.
    pub vgg_selected_levels_upscaling: Option<Vec<bool>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            n_epochs: 20,
            evaluate_every_epochs: 5,
            learning_rate: 1e-5,
            exponential_learning: true,
            batch_size: 5,
            batch_norm: false,
            weight_decay: 1e-5,
            data_augmentation: true,
            make_patches: false,
            patch_shape: [300, 300],
            resized_size: [480, 320],
            input_dir_train: None,
            input_dir_eval: None,
            output_model_dir: None,
            gpu: String::new(),
            class_file: None,
            model_name: None,
            pretrained_dir: PathBuf::from("pretrained_nets"),
            prediction_type: None,
            vgg_intermediate_conv: false,
            vgg_upscale_params: None,
            vgg_selected_levels_upscaling: None,
        }
    }
}

impl RunOptions {
    /// A filled-in classification setup on the VGG16 backbone, used as the
    /// starting template for new option files.
    pub fn example() -> Self {
        Self {
            input_dir_train: Some(PathBuf::from("data/train")),
            input_dir_eval: Some(PathBuf::from("data/eval")),
            output_model_dir: Some(PathBuf::from("model")),
            class_file: Some(PathBuf::from("data/classes.txt")),
            model_name: Some("vgg16".to_string()),
            prediction_type: Some("CLASSIFICATION".to_string()),
            vgg_upscale_params: Some(vec![
                vec![32, 0],
                vec![64, 0],
                vec![128, 0],
                vec![256, 0],
                vec![512, 0],
            ]),
            vgg_selected_levels_upscaling: Some(vec![true; 5]),
            ..Self::default()
        }
    }
}

/// Command-line overrides. Only the fields that are set take part in the merge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OptionOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_model_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
}

/// Load run options from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `DOCSEG_`, other `DOCSEG_*` names are ignored)
/// 3. The TOML option file, when given and present
/// 4. Built-in defaults
pub fn load_options(
    config_file: Option<&Path>,
    overrides: Option<&OptionOverrides>,
) -> Result<RunOptions, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(RunOptions::default()));

    if let Some(path) = config_file {
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        } else {
            tracing::warn!(path = %path.display(), "Option file not found, using defaults");
        }
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).only(OPTION_KEYS));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}
