//! Class color palettes.
//!
//! A palette file lists one RGB color per line, whitespace separated; the line
//! order is the class order. Blank lines and `#` comments are skipped.

use crate::error::PaletteError;
use ndarray::Array2;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// An RGB color with float components.
pub type Rgb = [f32; 3];

/// Ordered, non-empty list of class colors. Position in the list is the class index.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPalette {
    colors: Vec<Rgb>,
}

impl ColorPalette {
    /// Build a palette from colors in class order.
    pub fn new(colors: Vec<Rgb>) -> Result<Self, PaletteError> {
        if colors.is_empty() {
            return Err(PaletteError::NoColors);
        }
        Ok(Self { colors })
    }

    /// Read a palette from a class color file.
    pub fn load(path: &Path) -> Result<Self, PaletteError> {
        if !path.exists() {
            return Err(PaletteError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let palette = match content.parse::<Self>() {
            Err(PaletteError::NoColors) => {
                return Err(PaletteError::Empty {
                    path: path.to_path_buf(),
                });
            }
            other => other?,
        };
        debug!(path = %path.display(), classes = palette.len(), "Loaded class colors");
        Ok(palette)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false, palettes hold at least one color.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn color(&self, class_index: usize) -> Option<Rgb> {
        self.colors.get(class_index).copied()
    }

    /// Index of the color closest to `pixel` in squared Euclidean distance.
    ///
    /// Ties go to the lowest index.
    pub fn nearest(&self, pixel: [f64; 3]) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (index, color) in self.colors.iter().enumerate() {
            let distance: f64 = pixel
                .iter()
                .zip(color)
                .map(|(p, c)| {
                    let d = p - f64::from(*c);
                    d * d
                })
                .sum();
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }
        best
    }

    /// The palette as a `[C, 3]` array.
    pub fn to_array(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.colors.len(), 3), |(i, c)| self.colors[i][c])
    }
}

impl FromStr for ColorPalette {
    type Err = PaletteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut colors = Vec::new();
        for (number, raw) in s.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let values = line
                .split_whitespace()
                .map(|token| {
                    token.parse::<f32>().map_err(|_| {
                        PaletteError::parse(number + 1, format!("'{token}' is not a number"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            match values.as_slice() {
                [r, g, b] => colors.push([*r, *g, *b]),
                other => {
                    return Err(PaletteError::parse(
                        number + 1,
                        format!("expected 3 RGB columns, found {}", other.len()),
                    ));
                }
            }
        }
        Self::new(colors)
    }
}
