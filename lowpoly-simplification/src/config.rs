//! Decimation configuration
//!
//! A single plain record carries every option of a simplification or LOD
//! chain run. It is validated eagerly, before any mesh work starts.

use lowpoly_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Collapse strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Method {
    /// Half-edge collapse: the merged vertex stays on one of the endpoints.
    #[default]
    EdgeCollapse,
    /// Full-edge collapse to the position minimising the merged quadric.
    QuadricErrorMetric,
}

/// Parent/child orientation of an LOD chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Hierarchy {
    /// Level k is parented to level k - 1.
    #[default]
    FinerIsParent,
    /// Level k is parented to level k + 1.
    CoarserIsParent,
}

/// Options for simplification and LOD chain generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimationConfig {
    pub method: Method,
    /// Fraction of vertices to keep, in (0, 1]
    pub ratio: f32,
    /// Explicit per-level ratios; one per level when set
    pub level_ratios: Option<Vec<f32>>,
    /// Penalise collapses touching boundaries and creases
    pub preserve_sharp_edges: bool,
    /// Dihedral angle above which an interior edge counts as a crease
    pub feature_angle_degrees: f64,
    /// Penalty per unit of edge length for collapses touching a feature vertex
    pub boundary_weight: f64,
    /// Number of LOD levels, at least 1
    pub levels: usize,
    /// Uniform scale applied to every LOD level, in (0, 1]
    pub level_scale: f32,
    pub hierarchy: Hierarchy,
    /// Fixed penalty for collapses crossing a UV or material seam
    pub attribute_seam_penalty: f64,
    /// Stop once the cheapest collapse costs more than this
    pub max_error: Option<f64>,
    /// Smallest allowed cosine between a face normal before and after a collapse
    pub min_normal_dot: f64,
    pub keep_uvs: bool,
    pub preserve_materials: bool,
    /// Recompute smooth vertex normals on every output
    pub smoothing: bool,
}

impl Default for DecimationConfig {
    fn default() -> Self {
        Self {
            method: Method::EdgeCollapse,
            ratio: 0.5,
            level_ratios: None,
            preserve_sharp_edges: true,
            feature_angle_degrees: 60.0,
            boundary_weight: 100.0,
            levels: 3,
            level_scale: 0.5,
            hierarchy: Hierarchy::FinerIsParent,
            attribute_seam_penalty: 1.0e3,
            max_error: None,
            min_normal_dot: 0.0,
            keep_uvs: true,
            preserve_materials: true,
            smoothing: false,
        }
    }
}

fn check_ratio(name: &str, ratio: f32) -> Result<()> {
    if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
        return Err(Error::InvalidConfig(format!(
            "{name} must be in (0, 1], got {ratio}"
        )));
    }
    Ok(())
}

impl DecimationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_level_ratios(mut self, ratios: Vec<f32>) -> Self {
        self.levels = ratios.len();
        self.level_ratios = Some(ratios);
        self
    }

    pub fn with_preserve_sharp_edges(mut self, preserve: bool) -> Self {
        self.preserve_sharp_edges = preserve;
        self
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_level_scale(mut self, scale: f32) -> Self {
        self.level_scale = scale;
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: Hierarchy) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn with_attribute_seam_penalty(mut self, penalty: f64) -> Self {
        self.attribute_seam_penalty = penalty;
        self
    }

    pub fn with_max_error(mut self, max_error: f64) -> Self {
        self.max_error = Some(max_error);
        self
    }

    pub fn with_smoothing(mut self, smoothing: bool) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Reject out-of-range options before any mesh is touched.
    pub fn validate(&self) -> Result<()> {
        check_ratio("ratio", self.ratio)?;
        if self.levels == 0 {
            return Err(Error::InvalidConfig("levels must be at least 1".to_string()));
        }
        if !self.level_scale.is_finite() || self.level_scale <= 0.0 || self.level_scale > 1.0 {
            return Err(Error::InvalidConfig(format!(
                "level_scale must be in (0, 1], got {}",
                self.level_scale
            )));
        }
        if let Some(ratios) = &self.level_ratios {
            if ratios.len() != self.levels {
                return Err(Error::InvalidConfig(format!(
                    "{} level ratios for {} levels",
                    ratios.len(),
                    self.levels
                )));
            }
            for &r in ratios {
                check_ratio("level ratio", r)?;
            }
        }
        if self.attribute_seam_penalty.is_nan() || self.attribute_seam_penalty < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "attribute_seam_penalty must be >= 0, got {}",
                self.attribute_seam_penalty
            )));
        }
        if self.boundary_weight.is_nan() || self.boundary_weight < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "boundary_weight must be >= 0, got {}",
                self.boundary_weight
            )));
        }
        if !(0.0..=180.0).contains(&self.feature_angle_degrees) {
            return Err(Error::InvalidConfig(format!(
                "feature_angle_degrees must be in [0, 180], got {}",
                self.feature_angle_degrees
            )));
        }
        if !(-1.0..=1.0).contains(&self.min_normal_dot) {
            return Err(Error::InvalidConfig(format!(
                "min_normal_dot must be in [-1, 1], got {}",
                self.min_normal_dot
            )));
        }
        if let Some(max_error) = self.max_error {
            if max_error.is_nan() || max_error < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "max_error must be >= 0, got {max_error}"
                )));
            }
        }
        Ok(())
    }

    /// Ratio used to build level `level` (0-based) from the level before it.
    pub fn ratio_for_level(&self, level: usize) -> f32 {
        self.level_ratios
            .as_ref()
            .and_then(|ratios| ratios.get(level).copied())
            .unwrap_or(self.ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DecimationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.method, Method::EdgeCollapse);
        assert_eq!(config.ratio, 0.5);
        assert_eq!(config.levels, 3);
        assert_eq!(config.level_scale, 0.5);
        assert!(config.preserve_sharp_edges);
        assert!(config.keep_uvs);
        assert!(config.preserve_materials);
        assert!(!config.smoothing);
    }

    #[test]
    fn test_ratio_bounds() {
        for bad in [0.0, -0.5, 1.5, f32::NAN] {
            let config = DecimationConfig::new().with_ratio(bad);
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
        assert!(DecimationConfig::new().with_ratio(1.0).validate().is_ok());
    }

    #[test]
    fn test_zero_levels_rejected() {
        let config = DecimationConfig::new().with_levels(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_level_scale_bounds() {
        assert!(DecimationConfig::new().with_level_scale(0.0).validate().is_err());
        assert!(DecimationConfig::new().with_level_scale(1.2).validate().is_err());
        assert!(DecimationConfig::new().with_level_scale(1.0).validate().is_ok());
    }

    #[test]
    fn test_negative_penalty_rejected() {
        let config = DecimationConfig::new().with_attribute_seam_penalty(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_level_ratios() {
        let config = DecimationConfig::new().with_level_ratios(vec![0.8, 0.5]);
        assert!(config.validate().is_ok());
        assert_eq!(config.levels, 2);
        assert_eq!(config.ratio_for_level(0), 0.8);
        assert_eq!(config.ratio_for_level(1), 0.5);

        let mismatched = config.clone().with_levels(3);
        assert!(mismatched.validate().is_err());

        let out_of_range = DecimationConfig::new().with_level_ratios(vec![0.5, 1.5]);
        assert!(out_of_range.validate().is_err());
    }

    #[test]
    fn test_global_ratio_reused_per_level() {
        let config = DecimationConfig::new().with_ratio(0.25);
        assert_eq!(config.ratio_for_level(0), 0.25);
        assert_eq!(config.ratio_for_level(2), 0.25);
    }

    #[test]
    fn test_serde_partial_record() {
        let json = r#"{ "method": "QuadricErrorMetric", "ratio": 0.3, "levels": 2 }"#;
        let config: DecimationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.method, Method::QuadricErrorMetric);
        assert_eq!(config.ratio, 0.3);
        assert_eq!(config.levels, 2);
        // unspecified fields keep their defaults
        assert_eq!(config.level_scale, 0.5);
        assert!(config.validate().is_ok());
    }
}
