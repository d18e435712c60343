//! Conversion options
//!
//! All fields are defaulted so a partial TOML table (or none at all) yields
//! the legacy converter behavior.

use crate::error::{Result, VoxelizeError};
use crate::labels::UNKNOWN_LABEL;
use serde::{Deserialize, Serialize};

/// Padding added on every side of the mesh bounding box before it is divided
/// into cells. Matches the legacy `grid_boundary_radius`.
pub const DEFAULT_BOUNDARY_PADDING: f64 = 0.05;

/// Which stored color a face carries into the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSource {
    /// Material ambient color (`Ka`), falling back to diffuse (`Kd`)
    #[default]
    Ambient,
    /// Material diffuse color (`Kd`), falling back to ambient (`Ka`)
    Diffuse,
    /// Ignore stored colors and derive one from the face normal
    Normal,
}

/// Which name a face is looked up by in the label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    /// OBJ object or group name (`o` / `g`)
    #[default]
    Object,
    /// Material name (`usemtl`)
    Material,
}

/// Options for a single conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Bounding box padding in world units (>= 0)
    pub boundary_padding: f64,
    pub color_source: ColorSource,
    pub category_source: CategorySource,
    /// Label code for faces whose category is not in the label table
    pub fallback_label: u32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            boundary_padding: DEFAULT_BOUNDARY_PADDING,
            color_source: ColorSource::default(),
            category_source: CategorySource::default(),
            fallback_label: UNKNOWN_LABEL,
        }
    }
}

impl ConvertOptions {
    pub fn with_boundary_padding(mut self, padding: f64) -> Self {
        self.boundary_padding = padding;
        self
    }

    pub fn with_color_source(mut self, source: ColorSource) -> Self {
        self.color_source = source;
        self
    }

    pub fn with_category_source(mut self, source: CategorySource) -> Self {
        self.category_source = source;
        self
    }

    pub fn with_fallback_label(mut self, label: u32) -> Self {
        self.fallback_label = label;
        self
    }

    /// Reject options that cannot describe a bounding box.
    pub fn validate(&self) -> Result<()> {
        if !self.boundary_padding.is_finite() || self.boundary_padding < 0.0 {
            return Err(VoxelizeError::InvalidGridSpec(format!(
                "boundary padding must be a finite value >= 0 (got {})",
                self.boundary_padding
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_legacy() {
        let options = ConvertOptions::default();
        assert_eq!(options.boundary_padding, 0.05);
        assert_eq!(options.color_source, ColorSource::Ambient);
        assert_eq!(options.category_source, CategorySource::Object);
        assert_eq!(options.fallback_label, 0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options: ConvertOptions = toml::from_str(
            r#"
            color_source = "diffuse"
            fallback_label = 41
            "#,
        )
        .unwrap();

        assert_eq!(options.color_source, ColorSource::Diffuse);
        assert_eq!(options.fallback_label, 41);
        assert_eq!(options.boundary_padding, DEFAULT_BOUNDARY_PADDING);
        assert_eq!(options.category_source, CategorySource::Object);
    }

    #[test]
    fn test_negative_padding_rejected() {
        let options = ConvertOptions::default().with_boundary_padding(-1.0);
        assert!(options.validate().unwrap_err().is_invalid_grid());
    }

    #[test]
    fn test_nan_padding_rejected() {
        let options = ConvertOptions::default().with_boundary_padding(f64::NAN);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_zero_padding_allowed() {
        let options = ConvertOptions::default().with_boundary_padding(0.0);
        assert!(options.validate().is_ok());
    }
}
