//! Compile configuration
//!
//! Defaults follow the usual Vega-Lite look. Any field can be overridden
//! from the `config` object of the root input spec; absent fields keep
//! their defaults.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Default size and styling of a single view
    pub cell: CellConfig,
    /// Facet-specific configuration
    pub facet: FacetConfig,
    /// Scale defaults
    pub scale: ScaleConfig,
    /// Default color of marks without a color encoding
    pub mark_color: String,
    /// d3-format specifier for quantitative labels
    pub number_format: String,
    /// d3-time-format specifier for temporal labels
    pub time_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cell: CellConfig::default(),
            facet: FacetConfig::default(),
            scale: ScaleConfig::default(),
            mark_color: "#4c78a8".to_string(),
            number_format: "s".to_string(),
            time_format: "%b %d, %Y".to_string(),
        }
    }
}

/// Size and group styling of a single view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    pub width: f64,
    pub height: f64,
    #[serde(flatten)]
    pub style: CellStyle,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 200.0,
            style: CellStyle::default(),
        }
    }
}

/// Group mark styling of a cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<bool>,
}

impl CellStyle {
    /// Overlay `other` on top of this style; properties set in `other` win
    pub fn extend(&self, other: &CellStyle) -> CellStyle {
        CellStyle {
            fill: other.fill.clone().or_else(|| self.fill.clone()),
            stroke: other.stroke.clone().or_else(|| self.stroke.clone()),
            clip: other.clip.or(self.clip),
        }
    }

    /// Encode entry properties (`{"fill": {"value": ...}, ...}`)
    pub fn to_encode_entry(&self) -> Map<String, Value> {
        let mut entry = Map::new();
        if let Some(fill) = &self.fill {
            entry.insert("fill".to_string(), json!({"value": fill}));
        }
        if let Some(stroke) = &self.stroke {
            entry.insert("stroke".to_string(), json!({"value": stroke}));
        }
        if let Some(clip) = self.clip {
            entry.insert("clip".to_string(), json!({"value": clip}));
        }
        entry
    }
}

/// Facet configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetConfig {
    /// Styling applied to every facet cell, and inherited by views inside a facet
    pub cell: CellStyle,
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self {
            cell: CellStyle {
                stroke: Some("#ccc".to_string()),
                ..CellStyle::default()
            },
        }
    }
}

/// Scale defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScaleConfig {
    /// Step size of discrete position scales without an explicit view size
    pub range_step: f64,
    pub band_padding_inner: f64,
    pub band_padding_outer: f64,
    pub point_padding: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            range_step: 21.0,
            band_padding_inner: 0.1,
            band_padding_outer: 0.05,
            point_padding: 0.5,
        }
    }
}
