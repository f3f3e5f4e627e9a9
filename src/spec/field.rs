//! Field definitions and field references
//!
//! A field definition binds a data field to a channel. This module owns the
//! field normalizer (default type inference) and the helpers that derive the
//! output field name of a definition (`month_date`, `sum_price`, ...), its
//! default title, and label signal expressions.

use super::{double_option, AxisDef, Channel, HeaderDef, LegendDef, ScaleDef};
use crate::config::Config;
use serde::{Deserialize, Serialize};

/// Measurement type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Nominal,
    Ordinal,
    Quantitative,
    Temporal,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Nominal => "nominal",
            FieldType::Ordinal => "ordinal",
            FieldType::Quantitative => "quantitative",
            FieldType::Temporal => "temporal",
        }
    }

    /// Check if values are unordered or ordered categories
    #[inline]
    pub fn is_discrete(&self) -> bool {
        matches!(self, FieldType::Nominal | FieldType::Ordinal)
    }
}

/// Binding of a data field to a channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: Option<FieldType>,
    #[serde(default)]
    pub aggregate: Option<String>,
    #[serde(default)]
    pub time_unit: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub scale: Option<ScaleDef>,
    /// `None` when absent, `Some(None)` when explicitly disabled with `null`
    #[serde(default, deserialize_with = "double_option")]
    pub axis: Option<Option<AxisDef>>,
    /// `None` when absent, `Some(None)` when explicitly disabled with `null`
    #[serde(default, deserialize_with = "double_option")]
    pub legend: Option<Option<LegendDef>>,
    #[serde(default)]
    pub header: Option<HeaderDef>,
}

/// Expression context a field reference is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldExpr {
    /// The current record (`datum["a"]`)
    Datum,
    /// The enclosing group's record (`parent["a"]`)
    Parent,
}

impl FieldExpr {
    fn as_str(&self) -> &'static str {
        match self {
            FieldExpr::Datum => "datum",
            FieldExpr::Parent => "parent",
        }
    }
}

/// Options for [`field_ref`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRefOption<'a> {
    /// Prefix prepended with an underscore (e.g. `distinct_a`)
    pub prefix: Option<&'a str>,
    /// Wrap the name in an accessor expression
    pub expr: Option<FieldExpr>,
}

impl FieldDef {
    /// Shorthand for a typed field definition
    pub fn new(field: &str, field_type: FieldType) -> Self {
        Self {
            field: Some(field.to_string()),
            field_type: Some(field_type),
            ..Self::default()
        }
    }

    pub fn with_time_unit(mut self, time_unit: &str) -> Self {
        self.time_unit = Some(time_unit.to_string());
        self
    }

    pub fn with_aggregate(mut self, aggregate: &str) -> Self {
        self.aggregate = Some(aggregate.to_string());
        self
    }

    /// Type of the field; nominal until normalized
    pub fn field_type(&self) -> FieldType {
        self.field_type.unwrap_or(FieldType::Nominal)
    }

    pub fn is_count(&self) -> bool {
        self.aggregate.as_deref() == Some("count")
    }

    /// Check if the definition can be resolved to a data field
    pub fn has_field(&self) -> bool {
        self.field.is_some() || self.is_count()
    }

    /// Axis properties, unless the axis was disabled with `null`
    pub fn axis_def(&self) -> Option<AxisDef> {
        match &self.axis {
            None => Some(AxisDef::default()),
            Some(axis) => axis.clone(),
        }
    }

    /// Legend properties, unless the legend was disabled with `null`
    pub fn legend_def(&self) -> Option<LegendDef> {
        match &self.legend {
            None => Some(LegendDef::default()),
            Some(legend) => legend.clone(),
        }
    }
}

/// Normalize a field definition for a channel.
///
/// Fills in a missing measurement type:
/// - aggregated fields are quantitative
/// - fields with a time unit are temporal
/// - everything else, including facet keys, defaults to nominal
pub fn normalize(field_def: &FieldDef, _channel: Channel) -> FieldDef {
    let mut normalized = field_def.clone();
    if normalized.field_type.is_none() {
        let inferred = if normalized.aggregate.is_some() {
            FieldType::Quantitative
        } else if normalized.time_unit.is_some() {
            FieldType::Temporal
        } else {
            FieldType::Nominal
        };
        normalized.field_type = Some(inferred);
    }
    normalized
}

/// Output field name of a definition.
///
/// - `count` aggregates read `count_*`
/// - other aggregates read `<op>_<field>`
/// - time units read `<unit>_<field>`
/// - otherwise the raw field
///
/// ```
/// use vlcompile::spec::field::{field_ref, FieldExpr, FieldRefOption};
/// use vlcompile::spec::{FieldDef, FieldType};
///
/// let fd = FieldDef::new("date", FieldType::Temporal).with_time_unit("month");
/// assert_eq!(field_ref(&fd, FieldRefOption::default()), "month_date");
///
/// let opt = FieldRefOption { expr: Some(FieldExpr::Datum), ..Default::default() };
/// assert_eq!(field_ref(&fd, opt), r#"datum["month_date"]"#);
/// ```
pub fn field_ref(field_def: &FieldDef, opt: FieldRefOption<'_>) -> String {
    let field = field_def.field.as_deref().unwrap_or("");

    let mut name = if field_def.is_count() {
        "count_*".to_string()
    } else if let Some(op) = &field_def.aggregate {
        format!("{}_{}", op, field)
    } else if let Some(unit) = &field_def.time_unit {
        format!("{}_{}", unit, field)
    } else {
        field.to_string()
    };

    if let Some(prefix) = opt.prefix {
        name = format!("{}_{}", prefix, name);
    }

    match opt.expr {
        Some(expr) => accessor(expr.as_str(), &name),
        None => name,
    }
}

/// Bracket accessor for a field name (`datum["a"]`)
pub fn accessor(object: &str, name: &str) -> String {
    format!("{}[{}]", object, string_value(name))
}

/// Quote a string as an expression literal
pub fn string_value(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Default title of a field definition.
///
/// `count` becomes "Number of Records"; aggregates and time units wrap the
/// field name (`SUM(price)`, `MONTH(date)`).
pub fn title(field_def: &FieldDef) -> String {
    if let Some(title) = &field_def.title {
        return title.clone();
    }

    let field = field_def.field.as_deref().unwrap_or("");
    if field_def.is_count() {
        "Number of Records".to_string()
    } else if let Some(op) = &field_def.aggregate {
        format!("{}({})", op.to_uppercase(), field)
    } else if let Some(unit) = &field_def.time_unit {
        format!("{}({})", unit.to_uppercase(), field)
    } else {
        field.to_string()
    }
}

/// Label expression for a field read from `expr`, formatted by field type.
///
/// Quantitative values go through `format`, temporal values through
/// `timeFormat`, everything else is coerced to a string.
pub fn format_signal_ref(
    field_def: &FieldDef,
    specified_format: Option<&str>,
    expr: FieldExpr,
    config: &Config,
) -> String {
    let field = field_ref(
        field_def,
        FieldRefOption {
            expr: Some(expr),
            ..FieldRefOption::default()
        },
    );

    match field_def.field_type() {
        FieldType::Quantitative => format!(
            "format({}, {})",
            field,
            single_quoted(specified_format.unwrap_or(&config.number_format))
        ),
        FieldType::Temporal => format!(
            "timeFormat({}, {})",
            field,
            single_quoted(specified_format.unwrap_or(&config.time_format))
        ),
        FieldType::Nominal | FieldType::Ordinal => format!("''+{}", field),
    }
}

fn single_quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "\\'"))
}
