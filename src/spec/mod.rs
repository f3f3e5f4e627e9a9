//! Input specification types
//!
//! The compiler consumes a tree of view specifications, already normalized
//! by the upstream spec builder:
//!
//! ```text
//! Spec
//! ├─ Unit   { mark, encoding, selection }   (leaf view)
//! ├─ Layer  { layer: [Spec, ...], resolve }  (overlaid views, one coordinate space)
//! └─ Facet  { facet: {row, column}, spec }   (one view replicated over a grid)
//! ```
//!
//! All types deserialize from the usual JSON form with `serde`.

pub mod channel;
pub mod field;

use crate::config::Config;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use channel::{Channel, HeaderChannel, SizeType};
pub use field::{FieldDef, FieldType};

/// A view specification node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Spec {
    Unit(UnitSpec),
    Layer(LayerSpec),
    Facet(FacetSpec),
}

impl TryFrom<Value> for Spec {
    type Error = String;

    /// Dispatch on the property that identifies the view variant
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Some(obj) = value.as_object() else {
            return Err("a view specification must be an object".to_string());
        };

        let result = if obj.contains_key("facet") {
            serde_json::from_value(value).map(Spec::Facet)
        } else if obj.contains_key("layer") {
            serde_json::from_value(value).map(Spec::Layer)
        } else if obj.contains_key("mark") {
            serde_json::from_value(value).map(Spec::Unit)
        } else {
            return Err(
                "a view specification needs one of 'mark', 'layer' or 'facet'".to_string(),
            );
        };

        result.map_err(|e| e.to_string())
    }
}

impl<'de> Deserialize<'de> for Spec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Spec::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl Spec {
    /// Parse a spec from a JSON string
    pub fn from_json(json: &str) -> crate::Result<Spec> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Spec::Unit(s) => s.name.as_deref(),
            Spec::Layer(s) => s.name.as_deref(),
            Spec::Facet(s) => s.name.as_deref(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Spec::Unit(s) => s.title.as_deref(),
            Spec::Layer(s) => s.title.as_deref(),
            Spec::Facet(s) => s.title.as_deref(),
        }
    }

    /// Input data, only meaningful on the root spec
    pub fn data(&self) -> Option<&DataDef> {
        match self {
            Spec::Unit(s) => s.data.as_ref(),
            Spec::Layer(s) => s.data.as_ref(),
            Spec::Facet(s) => s.data.as_ref(),
        }
    }

    /// Configuration, only meaningful on the root spec
    pub fn config(&self) -> Option<&Config> {
        match self {
            Spec::Unit(s) => s.config.as_ref(),
            Spec::Layer(s) => s.config.as_ref(),
            Spec::Facet(s) => s.config.as_ref(),
        }
    }
}

/// Leaf view: one mark with one encoding mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub data: Option<DataDef>,
    pub mark: MarkDef,
    #[serde(default)]
    pub encoding: BTreeMap<Channel, ChannelDef>,
    #[serde(default)]
    pub selection: BTreeMap<String, SelectionDef>,
    #[serde(default)]
    pub config: Option<Config>,
}

/// Overlaid views sharing one coordinate space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub data: Option<DataDef>,
    pub layer: Vec<Spec>,
    #[serde(default)]
    pub resolve: ResolveDef,
    #[serde(default)]
    pub config: Option<Config>,
}

/// One view replicated over a discrete row/column grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub data: Option<DataDef>,
    /// Channel bindings; anything other than `row`/`column` is dropped at compile time
    pub facet: BTreeMap<Channel, FieldDef>,
    pub spec: Box<Spec>,
    #[serde(default)]
    pub resolve: ResolveDef,
    #[serde(default)]
    pub config: Option<Config>,
}

/// Inline or remote input data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
}

// =============================================================================
// Marks
// =============================================================================

/// Mark type of a unit view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Point,
    Circle,
    Square,
    Bar,
    Line,
    Area,
    Rule,
    Text,
    Tick,
    Rect,
}

impl Mark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mark::Point => "point",
            Mark::Circle => "circle",
            Mark::Square => "square",
            Mark::Bar => "bar",
            Mark::Line => "line",
            Mark::Area => "area",
            Mark::Rule => "rule",
            Mark::Text => "text",
            Mark::Tick => "tick",
            Mark::Rect => "rect",
        }
    }
}

/// Mark definition; deserializes from either `"bar"` or `{"type": "bar", ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MarkInput")]
pub struct MarkDef {
    #[serde(rename = "type")]
    pub mark_type: Mark,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MarkInput {
    Type(Mark),
    Def {
        #[serde(rename = "type")]
        mark_type: Mark,
        #[serde(default)]
        filled: Option<bool>,
    },
}

impl From<MarkInput> for MarkDef {
    fn from(input: MarkInput) -> Self {
        match input {
            MarkInput::Type(mark_type) => MarkDef {
                mark_type,
                filled: None,
            },
            MarkInput::Def { mark_type, filled } => MarkDef { mark_type, filled },
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Channel definition: either a constant value or a field mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelDef {
    Value(ValueDef),
    Field(FieldDef),
}

impl ChannelDef {
    pub fn field_def(&self) -> Option<&FieldDef> {
        match self {
            ChannelDef::Field(fd) => Some(fd),
            ChannelDef::Value(_) => None,
        }
    }
}

/// Constant channel value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDef {
    pub value: Value,
}

/// Scale properties specified on a field definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleDef {
    #[serde(rename = "type", default)]
    pub scale_type: Option<ScaleType>,
    #[serde(default)]
    pub domain: Option<Vec<Value>>,
    #[serde(default)]
    pub range: Option<Value>,
    #[serde(default)]
    pub range_step: Option<f64>,
    #[serde(default)]
    pub padding: Option<f64>,
    #[serde(default)]
    pub padding_inner: Option<f64>,
    #[serde(default)]
    pub padding_outer: Option<f64>,
    #[serde(default)]
    pub zero: Option<bool>,
    #[serde(default)]
    pub nice: Option<bool>,
}

/// Output scale type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleType {
    Linear,
    Log,
    Pow,
    Sqrt,
    Time,
    Utc,
    Sequential,
    Ordinal,
    Band,
    Point,
}

impl ScaleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleType::Linear => "linear",
            ScaleType::Log => "log",
            ScaleType::Pow => "pow",
            ScaleType::Sqrt => "sqrt",
            ScaleType::Time => "time",
            ScaleType::Utc => "utc",
            ScaleType::Sequential => "sequential",
            ScaleType::Ordinal => "ordinal",
            ScaleType::Band => "band",
            ScaleType::Point => "point",
        }
    }

    /// Check if scale maps a discrete domain (ordinal, band, point)
    #[inline]
    pub fn has_discrete_domain(&self) -> bool {
        matches!(self, ScaleType::Ordinal | ScaleType::Band | ScaleType::Point)
    }
}

/// Axis orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisOrient {
    Top,
    Bottom,
    Left,
    Right,
}

impl AxisOrient {
    pub fn as_str(&self) -> &'static str {
        match self {
            AxisOrient::Top => "top",
            AxisOrient::Bottom => "bottom",
            AxisOrient::Left => "left",
            AxisOrient::Right => "right",
        }
    }

    pub fn opposite(&self) -> AxisOrient {
        match self {
            AxisOrient::Top => AxisOrient::Bottom,
            AxisOrient::Bottom => AxisOrient::Top,
            AxisOrient::Left => AxisOrient::Right,
            AxisOrient::Right => AxisOrient::Left,
        }
    }
}

/// Axis properties specified on a field definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisDef {
    #[serde(default)]
    pub orient: Option<AxisOrient>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub grid: Option<bool>,
    /// Remaining axis properties, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Legend properties specified on a field definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegendDef {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(rename = "type", default)]
    pub legend_type: Option<String>,
    /// Remaining legend properties, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Header properties of a facet field definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderDef {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

// =============================================================================
// Selections
// =============================================================================

/// Interactive selection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionType {
    Single,
    Multi,
    Interval,
}

/// Interactive selection declaration of a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionDef {
    #[serde(rename = "type")]
    pub selection_type: SelectionType,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub encodings: Option<Vec<Channel>>,
    /// Event stream selector triggering the selection
    #[serde(default)]
    pub on: Option<String>,
}

// =============================================================================
// Resolution
// =============================================================================

/// Whether sibling views share an artifact or keep their own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Shared,
    Independent,
}

/// Explicit resolution overrides of a composite view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolveDef {
    #[serde(default)]
    pub scale: BTreeMap<Channel, Resolution>,
    #[serde(default)]
    pub axis: BTreeMap<Channel, Resolution>,
    #[serde(default)]
    pub legend: BTreeMap<Channel, Resolution>,
}

/// Deserialize a field that distinguishes "absent" (`None`) from "null" (`Some(None)`)
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
