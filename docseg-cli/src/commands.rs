//! CLI subcommand handlers.

use crate::Commands;
use crate::LabelsAction;
use crate::PaletteAction;
use crate::ParamsAction;
use crate::ParamsOverrides;
use anyhow::Context;
use docseg_core::image_io::{
    class_map_from_image, class_map_to_image, load_label_image, rgb_array_to_image,
};
use docseg_core::{
    ColorPalette, ModelParams, OptionOverrides, RunOptions, class_indices_to_image,
    image_to_class_indices, load_options,
};
use ndarray::{Ix2, Ix3};
use std::path::{Path, PathBuf};

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, config: Option<&Path>) -> anyhow::Result<()> {
    match command {
        Commands::Params { action } => handle_params(action, config),
        Commands::Palette { action } => handle_palette(action),
        Commands::Labels { action } => handle_labels(action),
    }
}

fn handle_params(action: ParamsAction, config: Option<&Path>) -> anyhow::Result<()> {
    match action {
        ParamsAction::Init { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from("params.toml"));
            if path.exists() {
                println!("Option file already exists at: {}", path.display());
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&RunOptions::example())?;
            std::fs::write(&path, toml_str)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Created example option file at: {}", path.display());
            Ok(())
        }
        ParamsAction::Show { overrides } => {
            let params = resolve_params(config, overrides)?;
            let params = match params.clone().with_class_count_from_palette() {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::warn!(error = %e, "Class count left unresolved");
                    params
                }
            };
            println!("{}", serde_json::to_string_pretty(&params)?);
            Ok(())
        }
        ParamsAction::Export { overrides } => {
            let params = resolve_params(config, overrides)?
                .with_class_count_from_palette()
                .context("resolving the class count")?;
            let path = params.export_experiment_params()?;
            println!("Exported parameters to: {}", path.display());
            Ok(())
        }
    }
}

impl From<ParamsOverrides> for OptionOverrides {
    fn from(flags: ParamsOverrides) -> Self {
        Self {
            output_model_dir: flags.output_model_dir,
            class_file: flags.class_file,
            gpu: flags.gpu,
        }
    }
}

fn resolve_params(
    config: Option<&Path>,
    overrides: ParamsOverrides,
) -> anyhow::Result<ModelParams> {
    let overrides = OptionOverrides::from(overrides);
    let options = load_options(config, Some(&overrides))
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    Ok(ModelParams::from_options(options)?)
}

fn handle_palette(action: PaletteAction) -> anyhow::Result<()> {
    match action {
        PaletteAction::Show { path } => {
            let palette = ColorPalette::load(&path)?;
            println!("{} classes in {}", palette.len(), path.display());
            for (index, [r, g, b]) in palette.colors().iter().enumerate() {
                println!("  {index:>3}  {r:>5} {g:>5} {b:>5}");
            }
            Ok(())
        }
    }
}

fn handle_labels(action: LabelsAction) -> anyhow::Result<()> {
    match action {
        LabelsAction::ToClasses {
            image,
            classes_file,
            output,
        } => {
            let palette = ColorPalette::load(&classes_file)?;
            let label = load_label_image(&image)
                .with_context(|| format!("reading label image {}", image.display()))?;
            let classes = image_to_class_indices(&label, &palette)?.into_dimensionality::<Ix2>()?;
            class_map_to_image(classes.view())?
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!(
                input = %image.display(),
                output = %output.display(),
                classes = palette.len(),
                "Converted label image to class map"
            );
            Ok(())
        }
        LabelsAction::ToImage {
            class_map,
            classes_file,
            output,
        } => {
            let palette = ColorPalette::load(&classes_file)?;
            let classes = class_map_from_image(&class_map)
                .with_context(|| format!("reading class map {}", class_map.display()))?;
            let colors = class_indices_to_image(&classes, &palette)?.into_dimensionality::<Ix3>()?;
            rgb_array_to_image(colors.view())?
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!(
                input = %class_map.display(),
                output = %output.display(),
                "Converted class map to label image"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docseg_core::PARAMS_FILE_NAME;
    use ndarray::array;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_classes(dir: &Path) -> PathBuf {
        let path = dir.join("classes.txt");
        std::fs::write(&path, "0 0 0\n255 0 0\n0 0 255\n").unwrap();
        path
    }

    #[test]
    fn test_init_writes_loadable_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("params.toml");

        handle_params(ParamsAction::Init { path: Some(path.clone()) }, None).unwrap();
        let options = load_options(Some(&path), None).unwrap();
        assert_eq!(options, RunOptions::example());
    }

    #[test]
    fn test_init_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("params.toml");
        std::fs::write(&path, "n_epochs = 1\n").unwrap();

        handle_params(ParamsAction::Init { path: Some(path.clone()) }, None).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "n_epochs = 1\n");
    }

    #[test]
    fn test_export_resolves_class_count() {
        let dir = TempDir::new().unwrap();
        let classes_file = write_classes(dir.path());
        let config = dir.path().join("params.toml");
        std::fs::write(
            &config,
            format!(
                "prediction_type = \"CLASSIFICATION\"\nclass_file = \"{}\"\nmodel_name = \"vgg16\"\n\
                 vgg_upscale_params = [[32, 0]]\nvgg_selected_levels_upscaling = [true]\n",
                classes_file.display()
            ),
        )
        .unwrap();
        let output = dir.path().join("model");

        handle_params(
            ParamsAction::Export {
                overrides: ParamsOverrides {
                    output_model_dir: Some(output.clone()),
                    ..Default::default()
                },
            },
            Some(&config),
        )
        .unwrap();

        let params = ModelParams::load_exported(&output).unwrap();
        assert_eq!(params.n_classes(), Some(3));
        assert!(output.join(PARAMS_FILE_NAME).is_file());
    }

    #[test]
    fn test_export_class_file_and_gpu_from_flags() {
        let dir = TempDir::new().unwrap();
        let classes_file = write_classes(dir.path());
        let config = dir.path().join("params.toml");
        std::fs::write(
            &config,
            "prediction_type = \"CLASSIFICATION\"\nmodel_name = \"vgg16\"\ngpu = \"0\"\n\
             vgg_upscale_params = [[32, 0]]\nvgg_selected_levels_upscaling = [true]\n",
        )
        .unwrap();
        let output = dir.path().join("model");

        handle_params(
            ParamsAction::Export {
                overrides: ParamsOverrides {
                    output_model_dir: Some(output.clone()),
                    class_file: Some(classes_file.clone()),
                    gpu: Some("1".to_string()),
                },
            },
            Some(&config),
        )
        .unwrap();

        let params = ModelParams::load_exported(&output).unwrap();
        assert_eq!(params.class_file(), Some(classes_file.as_path()));
        assert_eq!(params.gpu(), "1");
        assert_eq!(params.n_classes(), Some(3));
    }

    #[test]
    fn test_export_without_class_file_fails() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("params.toml");
        std::fs::write(
            &config,
            "prediction_type = \"CLASSIFICATION\"\nmodel_name = \"vgg16\"\n\
             vgg_upscale_params = [[32, 0]]\nvgg_selected_levels_upscaling = [true]\n",
        )
        .unwrap();

        let result = handle_params(
            ParamsAction::Export {
                overrides: ParamsOverrides {
                    output_model_dir: Some(dir.path().join("model")),
                    ..Default::default()
                },
            },
            Some(&config),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_export_rejects_invalid_options() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("params.toml");
        std::fs::write(&config, "prediction_type = \"FOO\"\n").unwrap();

        let result = handle_params(
            ParamsAction::Export {
                overrides: ParamsOverrides {
                    output_model_dir: Some(dir.path().join("model")),
                    ..Default::default()
                },
            },
            Some(&config),
        );
        assert!(result.is_err());
        assert!(!dir.path().join("model").exists());
    }

    #[test]
    fn test_label_conversion_round_trip() {
        let dir = TempDir::new().unwrap();
        let classes_file = write_classes(dir.path());

        let label_path = dir.path().join("label.png");
        let colors = array![[[0.0f32, 0.0, 0.0], [250.0, 5.0, 0.0]], [[0.0, 10.0, 240.0], [0.0, 0.0, 0.0]]];
        rgb_array_to_image(colors.view()).unwrap().save(&label_path).unwrap();

        let class_map = dir.path().join("classes.png");
        handle_labels(LabelsAction::ToClasses {
            image: label_path,
            classes_file: classes_file.clone(),
            output: class_map.clone(),
        })
        .unwrap();
        assert_eq!(
            class_map_from_image(&class_map).unwrap(),
            array![[0usize, 1], [2, 0]]
        );

        let rendered = dir.path().join("rendered.png");
        handle_labels(LabelsAction::ToImage {
            class_map,
            classes_file,
            output: rendered.clone(),
        })
        .unwrap();
        let image = load_label_image(&rendered).unwrap();
        assert_eq!(image[[0, 1, 0]], 255);
        assert_eq!(image[[1, 0, 2]], 255);
        assert_eq!(image[[1, 1, 0]], 0);
    }

    #[test]
    fn test_palette_show_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = handle_palette(PaletteAction::Show {
            path: dir.path().join("missing.txt"),
        });
        assert!(result.is_err());
    }
}
