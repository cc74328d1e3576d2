//! Property-based tests for run parameters and label conversion using proptest.

use ndarray::{Array, Array2};
use proptest::prelude::*;
use std::path::PathBuf;

use docseg_core::{
    ColorPalette, ModelParams, ParamsError, RunOptions, class_indices_to_image,
    image_to_class_indices,
};

/// Distinct palette colors plus a class index grid that only uses valid indices.
fn palette_and_grid() -> impl Strategy<Value = (Vec<[f32; 3]>, usize, usize, Vec<usize>)> {
    prop::collection::hash_set(any::<[u8; 3]>(), 1..16).prop_flat_map(|colors| {
        let n_classes = colors.len();
        let colors: Vec<[f32; 3]> = colors.into_iter().map(|c| c.map(f32::from)).collect();
        (1usize..8, 1usize..8).prop_flat_map(move |(h, w)| {
            (
                Just(colors.clone()),
                Just(h),
                Just(w),
                prop::collection::vec(0..n_classes, h * w),
            )
        })
    })
}

fn vgg_options(prediction_type: &str, levels: usize) -> RunOptions {
    RunOptions {
        prediction_type: Some(prediction_type.to_string()),
        model_name: Some("vgg16".to_string()),
        vgg_upscale_params: Some(vec![vec![32, 0]; levels]),
        vgg_selected_levels_upscaling: Some(vec![true; levels]),
        ..RunOptions::default()
    }
}

// --- Label conversion properties ---

proptest! {
    #[test]
    fn class_colors_map_back_to_same_classes((colors, h, w, flat) in palette_and_grid()) {
        let palette = ColorPalette::new(colors).unwrap();
        let indices = Array2::from_shape_vec((h, w), flat).unwrap();

        let image = class_indices_to_image(&indices, &palette).unwrap();
        prop_assert_eq!(image.shape(), &[h, w, 3]);

        let restored = image_to_class_indices(&image, &palette).unwrap();
        prop_assert_eq!(restored, indices.into_dyn());
    }

    #[test]
    fn batched_round_trip((colors, h, w, flat) in palette_and_grid()) {
        let palette = ColorPalette::new(colors).unwrap();
        let indices = Array::from_shape_vec((1, h, w), flat).unwrap();

        let image = class_indices_to_image(&indices, &palette).unwrap();
        prop_assert_eq!(image.ndim(), 4);

        let restored = image_to_class_indices(&image, &palette).unwrap();
        prop_assert_eq!(restored, indices.into_dyn());
    }

    #[test]
    fn indices_beyond_palette_are_rejected(n_classes in 1usize..10, extra in 0usize..10) {
        let palette = ColorPalette::new(vec![[0.0, 0.0, 0.0]; n_classes]).unwrap();
        let indices = Array2::from_elem((1, 1), n_classes + extra);
        prop_assert!(class_indices_to_image(&indices, &palette).is_err());
    }
}

// --- Run parameter properties ---

proptest! {
    #[test]
    fn regression_always_has_one_class(
        class_file in proptest::option::of("[a-z]{1,8}\\.txt"),
        levels in 0usize..6,
        n_epochs in 1usize..200,
    ) {
        let options = RunOptions {
            class_file: class_file.map(PathBuf::from),
            n_epochs,
            ..vgg_options("REGRESSION", levels)
        };
        let params = ModelParams::from_options(options).unwrap();
        prop_assert_eq!(params.n_classes(), Some(1));
        prop_assert_eq!(params.n_epochs(), n_epochs);
    }

    #[test]
    fn classification_without_class_file_fails(levels in 0usize..6) {
        let options = RunOptions {
            class_file: None,
            ..vgg_options("CLASSIFICATION", levels)
        };
        let err = ModelParams::from_options(options).unwrap_err();
        prop_assert!(matches!(err, ParamsError::MissingClassFile));
    }

    #[test]
    fn unknown_task_types_fail(value in "[A-Z]{1,12}") {
        prop_assume!(value != "CLASSIFICATION" && value != "REGRESSION");
        let err = ModelParams::from_options(vgg_options(&value, 2)).unwrap_err();
        prop_assert!(
            matches!(err, ParamsError::UnsupportedTaskType { .. }),
            "unexpected error for task type {}",
            value
        );
    }

    #[test]
    fn mismatched_levels_fail(upscale in 0usize..8, selected in 0usize..8) {
        prop_assume!(upscale != selected);
        let options = RunOptions {
            vgg_upscale_params: Some(vec![vec![64, 0]; upscale]),
            vgg_selected_levels_upscaling: Some(vec![true; selected]),
            ..vgg_options("REGRESSION", 0)
        };
        let err = ModelParams::from_options(options).unwrap_err();
        prop_assert!(
            matches!(err, ParamsError::InvalidBackboneConfig { .. }),
            "unexpected error for {} vs {} levels",
            upscale,
            selected
        );
    }
}
