//! Unit views
//!
//! A unit binds one mark to one encoding. It is the only node that builds
//! scales, marks, axes, legends and selections from scratch; every other
//! node merges what its units produce.

use super::model::{ModelTree, NodeId};
use super::{axis, legend, mark, scale, selection};
use crate::config::{CellStyle, Config};
use crate::diagnostics::Diagnostics;
use crate::spec::field::{field_ref, FieldRefOption};
use crate::spec::{Channel, ChannelDef, FieldDef, MarkDef, SelectionDef, SizeType, UnitSpec};
use crate::{CompileError, Result};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Channel to definition mapping of a unit, after mark initialization
pub type Encoding = BTreeMap<Channel, ChannelDef>;

#[derive(Debug, Clone)]
pub struct UnitModel {
    pub mark: MarkDef,
    pub encoding: Encoding,
    pub selection: BTreeMap<String, SelectionDef>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Group styling, with the facet cell style applied inside a facet
    pub cell: CellStyle,
}

impl UnitModel {
    pub fn new(spec: &UnitSpec, config: &Config, in_facet: bool, diag: &mut Diagnostics) -> Self {
        let cell = if in_facet {
            config.cell.style.extend(&config.facet.cell)
        } else {
            config.cell.style.clone()
        };

        Self {
            mark: spec.mark.clone(),
            encoding: mark::init_encoding(&spec.mark, &spec.encoding, diag),
            selection: spec.selection.clone(),
            width: spec.width,
            height: spec.height,
            cell,
        }
    }

    pub fn field_def(&self, channel: Channel) -> Option<&FieldDef> {
        self.encoding.get(&channel).and_then(ChannelDef::field_def)
    }

    pub fn channel_has_field(&self, channel: Channel) -> bool {
        self.field_def(channel).is_some()
    }

    /// Output field name of a channel
    pub fn field(&self, channel: Channel, opt: FieldRefOption<'_>) -> Option<String> {
        self.field_def(channel).map(|fd| field_ref(fd, opt))
    }

    pub fn size(&self, size_type: SizeType) -> Option<f64> {
        match size_type {
            SizeType::Width => self.width,
            SizeType::Height => self.height,
        }
    }

    /// Check if any channel aggregates its field
    pub fn is_aggregate(&self) -> bool {
        self.encoding
            .values()
            .filter_map(ChannelDef::field_def)
            .any(|fd| fd.aggregate.is_some())
    }

    /// Field definitions of a channel, plus the secondary one for x and y
    pub fn position_field_def(&self, channel: Channel) -> Option<&FieldDef> {
        self.field_def(channel).or_else(|| match channel {
            Channel::X => self.field_def(Channel::X2),
            Channel::Y => self.field_def(Channel::Y2),
            _ => None,
        })
    }
}

/// Encode entry a unit contributes to its enclosing group
pub fn parent_group_properties(tree: &ModelTree, id: NodeId, cell: &CellStyle) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert(
        "width".to_string(),
        json!({"signal": tree.size_signal(id, SizeType::Width)}),
    );
    entry.insert(
        "height".to_string(),
        json!({"signal": tree.size_signal(id, SizeType::Height)}),
    );
    entry.extend(cell.to_encode_entry());
    entry
}

fn unit(tree: &ModelTree, id: NodeId) -> Result<UnitModel> {
    tree.node(id)
        .as_unit()
        .cloned()
        .ok_or_else(|| CompileError::Structure(format!("node {} is not a unit", id.index())))
}

pub(super) fn parse_scale(tree: &mut ModelTree, id: NodeId) -> Result<()> {
    let unit = unit(tree, id)?;
    let scales = scale::parse_unit_scales(tree, id, &unit)?;
    tree.node_mut(id).component.scales = scales;
    Ok(())
}

pub(super) fn parse_selection(tree: &mut ModelTree, id: NodeId, diag: &mut Diagnostics) -> Result<()> {
    let unit = unit(tree, id)?;
    let selection = selection::parse_unit_selection(tree, id, &unit, diag);
    tree.node_mut(id).component.selection = selection;
    Ok(())
}

pub(super) fn parse_mark_group(tree: &mut ModelTree, id: NodeId) -> Result<()> {
    let unit = unit(tree, id)?;
    let marks = mark::parse_unit_mark(tree, id, &unit)?;
    tree.node_mut(id).component.mark = marks;
    Ok(())
}

pub(super) fn parse_axis_and_header(tree: &mut ModelTree, id: NodeId) -> Result<()> {
    let unit = unit(tree, id)?;
    let axes = axis::parse_unit_axes(tree, id, &unit);
    tree.node_mut(id).component.axes = axes;
    Ok(())
}

pub(super) fn parse_legend(tree: &mut ModelTree, id: NodeId) -> Result<()> {
    let unit = unit(tree, id)?;
    let legends = legend::parse_unit_legends(tree, id, &unit);
    tree.node_mut(id).component.legends = legends;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit_model(value: Value, in_facet: bool) -> (UnitModel, Diagnostics) {
        let spec: UnitSpec = serde_json::from_value(value).unwrap();
        let mut diag = Diagnostics::new();
        let model = UnitModel::new(&spec, &Config::default(), in_facet, &mut diag);
        (model, diag)
    }

    #[test]
    fn test_facet_cell_style_is_inherited() {
        let (outside, _) = unit_model(json!({"mark": "point"}), false);
        assert_eq!(outside.cell.stroke, None);

        let (inside, _) = unit_model(json!({"mark": "point"}), true);
        assert_eq!(inside.cell.stroke.as_deref(), Some("#ccc"));
    }

    #[test]
    fn test_aggregate_and_field_lookup() {
        let (model, _) = unit_model(
            json!({
                "mark": "bar",
                "encoding": {
                    "x": {"field": "a", "type": "nominal"},
                    "y": {"aggregate": "sum", "field": "b"}
                }
            }),
            false,
        );

        assert!(model.is_aggregate());
        assert_eq!(
            model.field(Channel::Y, FieldRefOption::default()).as_deref(),
            Some("sum_b")
        );
        assert!(model.channel_has_field(Channel::X));
        assert!(!model.channel_has_field(Channel::Color));
    }

    #[test]
    fn test_secondary_position_field() {
        let (model, _) = unit_model(
            json!({
                "mark": "rule",
                "encoding": {"x2": {"field": "end", "type": "quantitative"}}
            }),
            false,
        );
        assert_eq!(
            model
                .position_field_def(Channel::X)
                .and_then(|fd| fd.field.as_deref()),
            Some("end")
        );
    }
}
