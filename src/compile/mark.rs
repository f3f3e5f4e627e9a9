//! Mark initialization and unit mark groups
//!
//! - [`init_encoding`] normalizes a unit's encoding for its mark: unsupported
//!   channels and field definitions without a field are dropped, missing
//!   field types are inferred.
//! - [`parse_unit_mark`] builds the output mark of a unit, including the
//!   default visual properties each mark type needs.

use super::model::{ModelTree, NodeId};
use super::unit::{Encoding, UnitModel};
use crate::diagnostics::{message, DiagnosticKind, Diagnostics};
use crate::spec::field::{field_ref, format_signal_ref, normalize, FieldExpr, FieldRefOption};
use crate::spec::{Channel, ChannelDef, FieldDef, Mark, MarkDef, ScaleType};
use crate::Result;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Output (Vega) mark type of a mark
pub fn vega_mark_type(mark: Mark) -> &'static str {
    match mark {
        Mark::Point | Mark::Circle | Mark::Square => "symbol",
        Mark::Bar | Mark::Rect | Mark::Tick => "rect",
        Mark::Line => "line",
        Mark::Area => "area",
        Mark::Rule => "rule",
        Mark::Text => "text",
    }
}

/// Check if color is applied as fill (otherwise as stroke)
pub fn is_filled(mark: &MarkDef) -> bool {
    mark.filled
        .unwrap_or(!matches!(mark.mark_type, Mark::Point | Mark::Line | Mark::Rule))
}

/// Check if a mark type can encode a channel
pub fn supports_channel(mark: Mark, channel: Channel) -> bool {
    match channel {
        Channel::X | Channel::Y | Channel::Color | Channel::Opacity => true,
        Channel::Tooltip | Channel::Detail => true,
        Channel::X2 | Channel::Y2 => {
            matches!(mark, Mark::Rule | Mark::Bar | Mark::Rect | Mark::Area)
        }
        Channel::Size => matches!(
            mark,
            Mark::Point | Mark::Circle | Mark::Square | Mark::Text | Mark::Line | Mark::Rule
        ),
        Channel::Shape => mark == Mark::Point,
        Channel::Text => mark == Mark::Text,
        Channel::Row | Channel::Column => false,
    }
}

/// Normalize a unit encoding for its mark
pub fn init_encoding(
    mark: &MarkDef,
    encoding: &BTreeMap<Channel, ChannelDef>,
    diag: &mut Diagnostics,
) -> Encoding {
    let mut normalized = Encoding::new();

    for (&channel, channel_def) in encoding {
        if !supports_channel(mark.mark_type, channel) {
            diag.warn(
                DiagnosticKind::IncompatibleChannel,
                message::incompatible_channel(channel, mark.mark_type.as_str()),
            );
            continue;
        }

        match channel_def {
            ChannelDef::Field(fd) if !fd.has_field() => {
                diag.warn(
                    DiagnosticKind::EmptyFieldDef,
                    message::empty_field_def(channel),
                );
            }
            ChannelDef::Field(fd) => {
                normalized.insert(channel, ChannelDef::Field(normalize(fd, channel)));
            }
            ChannelDef::Value(_) => {
                normalized.insert(channel, channel_def.clone());
            }
        }
    }

    normalized
}

/// Output mark of a unit
pub fn parse_unit_mark(tree: &ModelTree, id: NodeId, unit: &UnitModel) -> Result<Vec<Value>> {
    let model = tree.node(id);
    let source = model.component.data()?.source.clone();
    let mark_type = unit.mark.mark_type;
    let name = model.get_name("marks");
    let update = encode_entry(tree, id, unit);

    let path_groupby = path_groupby(unit);
    if matches!(mark_type, Mark::Line | Mark::Area) && !path_groupby.is_empty() {
        // One path per series
        let faceted = format!("faceted_path_{}", name);
        return Ok(vec![json!({
            "name": model.get_name("pathgroup"),
            "type": "group",
            "from": {
                "facet": {
                    "name": faceted,
                    "data": source,
                    "groupby": path_groupby
                }
            },
            "encode": {
                "update": {
                    "width": {"field": {"group": "width"}},
                    "height": {"field": {"group": "height"}}
                }
            },
            "marks": [{
                "name": name,
                "type": vega_mark_type(mark_type),
                "style": [mark_type.as_str()],
                "from": {"data": faceted},
                "encode": {"update": update}
            }]
        })]);
    }

    Ok(vec![json!({
        "name": name,
        "type": vega_mark_type(mark_type),
        "style": [mark_type.as_str()],
        "from": {"data": source},
        "encode": {"update": update}
    })])
}

fn path_groupby(unit: &UnitModel) -> Vec<String> {
    let mut groupby: Vec<String> = Vec::new();
    for channel in [Channel::Color, Channel::Detail] {
        if let Some(fd) = unit.field_def(channel) {
            if fd.aggregate.is_some() {
                continue;
            }
            let field = field_ref(fd, FieldRefOption::default());
            if !groupby.contains(&field) {
                groupby.push(field);
            }
        }
    }
    groupby
}

fn encode_entry(tree: &ModelTree, id: NodeId, unit: &UnitModel) -> Map<String, Value> {
    let mut entry = Map::new();
    position(tree, id, unit, Channel::X, &mut entry);
    position(tree, id, unit, Channel::Y, &mut entry);
    color(tree, id, unit, &mut entry);
    nonposition(tree, id, unit, &mut entry);
    text(tree, unit, &mut entry);
    entry
}

fn scaled_field(tree: &ModelTree, id: NodeId, channel: Channel, fd: &FieldDef) -> Value {
    json!({
        "scale": tree.scale_name(id, channel),
        "field": field_ref(fd, FieldRefOption::default())
    })
}

fn position(
    tree: &ModelTree,
    id: NodeId,
    unit: &UnitModel,
    channel: Channel,
    entry: &mut Map<String, Value>,
) {
    let (secondary, size, group_size) = match channel {
        Channel::X => (Channel::X2, "width", "width"),
        _ => (Channel::Y2, "height", "height"),
    };
    let mark_type = unit.mark.mark_type;
    let is_rect = vega_mark_type(mark_type) == "rect";
    let scale_type = tree.scale_component(id, channel).map(|s| s.scale_type);

    match unit.encoding.get(&channel) {
        Some(ChannelDef::Field(fd)) => {
            entry.insert(channel.as_str().into(), scaled_field(tree, id, channel, fd));
            if is_rect {
                match scale_type {
                    Some(ScaleType::Band) => {
                        entry.insert(
                            size.into(),
                            json!({"scale": tree.scale_name(id, channel), "band": true}),
                        );
                    }
                    _ if mark_type == Mark::Tick => {
                        entry.insert(size.into(), json!({"value": 1}));
                    }
                    _ if !unit.encoding.contains_key(&secondary) => {
                        // Zero baseline
                        entry.insert(
                            secondary.as_str().into(),
                            json!({"scale": tree.scale_name(id, channel), "value": 0}),
                        );
                    }
                    _ => {}
                }
            }
        }
        Some(ChannelDef::Value(v)) => {
            entry.insert(channel.as_str().into(), json!({"value": v.value}));
        }
        None => match mark_type {
            Mark::Bar | Mark::Rect | Mark::Rule if !unit.encoding.contains_key(&secondary) => {
                entry.insert(channel.as_str().into(), json!({"value": 0}));
                entry.insert(
                    secondary.as_str().into(),
                    json!({"field": {"group": group_size}}),
                );
            }
            Mark::Line | Mark::Area => {}
            _ => {
                entry.insert(
                    channel.as_str().into(),
                    json!({"field": {"group": group_size}, "mult": 0.5}),
                );
            }
        },
    }

    match unit.encoding.get(&secondary) {
        Some(ChannelDef::Field(fd)) => {
            entry.insert(secondary.as_str().into(), scaled_field(tree, id, channel, fd));
        }
        Some(ChannelDef::Value(v)) => {
            entry.insert(secondary.as_str().into(), json!({"value": v.value}));
        }
        None => {}
    }
}

fn color(tree: &ModelTree, id: NodeId, unit: &UnitModel, entry: &mut Map<String, Value>) {
    let property = if is_filled(&unit.mark) { "fill" } else { "stroke" };
    let value = match unit.encoding.get(&Channel::Color) {
        Some(ChannelDef::Field(fd)) => scaled_field(tree, id, Channel::Color, fd),
        Some(ChannelDef::Value(v)) => json!({"value": v.value}),
        None => json!({"value": tree.config().mark_color}),
    };
    entry.insert(property.into(), value);
}

fn nonposition(tree: &ModelTree, id: NodeId, unit: &UnitModel, entry: &mut Map<String, Value>) {
    let mark_type = unit.mark.mark_type;
    let size_property = match mark_type {
        Mark::Text => "fontSize",
        Mark::Line | Mark::Rule => "strokeWidth",
        _ => "size",
    };

    for (channel, property) in [
        (Channel::Size, size_property),
        (Channel::Shape, "shape"),
        (Channel::Opacity, "opacity"),
    ] {
        match unit.encoding.get(&channel) {
            Some(ChannelDef::Field(fd)) => {
                entry.insert(property.into(), scaled_field(tree, id, channel, fd));
            }
            Some(ChannelDef::Value(v)) => {
                entry.insert(property.into(), json!({"value": v.value}));
            }
            None => {}
        }
    }

    if !entry.contains_key("shape") {
        match mark_type {
            Mark::Circle => {
                entry.insert("shape".into(), json!({"value": "circle"}));
            }
            Mark::Square => {
                entry.insert("shape".into(), json!({"value": "square"}));
            }
            _ => {}
        }
    }
}

fn text(tree: &ModelTree, unit: &UnitModel, entry: &mut Map<String, Value>) {
    for (channel, property) in [(Channel::Text, "text"), (Channel::Tooltip, "tooltip")] {
        match unit.encoding.get(&channel) {
            Some(ChannelDef::Field(fd)) => {
                let signal = format_signal_ref(fd, None, FieldExpr::Datum, tree.config());
                entry.insert(property.into(), json!({ "signal": signal }));
            }
            Some(ChannelDef::Value(v)) => {
                entry.insert(property.into(), json!({"value": v.value}));
            }
            None => {}
        }
    }
}
