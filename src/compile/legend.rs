//! Legends of non-positional channels

use super::mark::is_filled;
use super::model::{ModelTree, NodeId};
use super::unit::UnitModel;
use crate::spec::field::title;
use crate::spec::channel::NONSPATIAL_SCALE_CHANNELS;
use crate::spec::{Channel, FieldType, Resolution, ScaleType};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Output legend properties
pub type LegendComponent = Map<String, Value>;

/// Legends owned by a node, keyed by channel
pub type LegendIndex = BTreeMap<Channel, LegendComponent>;

/// Build a unit's legends from its non-positional encoding
pub fn parse_unit_legends(tree: &ModelTree, id: NodeId, unit: &UnitModel) -> LegendIndex {
    let mut legends = LegendIndex::new();

    for &channel in NONSPATIAL_SCALE_CHANNELS {
        let Some(fd) = unit.field_def(channel) else {
            continue;
        };
        let Some(specified) = fd.legend_def() else {
            continue;
        };
        let Some(scale) = tree.scale_component(id, channel) else {
            continue;
        };

        let mut legend = Map::new();
        let property = match channel {
            Channel::Color if is_filled(&unit.mark) => "fill",
            Channel::Color => "stroke",
            _ => channel.as_str(),
        };
        legend.insert(property.to_string(), json!(tree.scale_name(id, channel)));
        legend.insert(
            "title".to_string(),
            json!(specified.title.clone().unwrap_or_else(|| title(fd))),
        );
        if let Some(format) = &specified.format {
            legend.insert("format".to_string(), json!(format));
        }

        let gradient = channel == Channel::Color
            && matches!(fd.field_type(), FieldType::Quantitative | FieldType::Temporal)
            && !matches!(
                scale.scale_type,
                ScaleType::Ordinal | ScaleType::Band | ScaleType::Point
            );
        match (&specified.legend_type, gradient) {
            (Some(legend_type), _) => {
                legend.insert("type".to_string(), json!(legend_type));
            }
            (None, true) => {
                legend.insert("type".to_string(), json!("gradient"));
            }
            (None, false) => {}
        }

        for (key, value) in &specified.extra {
            legend.insert(key.clone(), value.clone());
        }
        legends.insert(channel, legend);
    }

    legends
}

/// Move a child's legend for `channel` into its parent.
///
/// The child's entry is removed; the parent keeps the legend it already has
/// for the channel, so repeating the move changes nothing.
pub fn move_shared_legend_up(parent: &mut LegendIndex, child: &mut LegendIndex, channel: Channel) {
    if let Some(legend) = child.remove(&channel) {
        parent.entry(channel).or_insert(legend);
    }
}

/// Collect shared legends of a composite node's children
pub fn merge_child_legends(tree: &mut ModelTree, id: NodeId) {
    let children = tree.node(id).children.clone();
    let mut legends = LegendIndex::new();

    for child in children {
        let mut child_legends = std::mem::take(&mut tree.node_mut(child).component.legends);
        let channels: Vec<Channel> = child_legends.keys().copied().collect();
        for channel in channels {
            if tree.node(id).resolve.legend(channel) == Resolution::Shared {
                move_shared_legend_up(&mut legends, &mut child_legends, channel);
            }
        }
        tree.node_mut(child).component.legends = child_legends;
    }

    tree.node_mut(id).component.legends = legends;
}

/// Output legends of the group a node renders into
pub fn assemble_legends(tree: &ModelTree, id: NodeId) -> Vec<Value> {
    tree.group_members(id)
        .into_iter()
        .flat_map(|member| {
            tree.node(member)
                .component
                .legends
                .values()
                .map(|legend| Value::Object(legend.clone()))
                .collect::<Vec<_>>()
        })
        .collect()
}
