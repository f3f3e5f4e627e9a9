//! Axes of positional channels

use super::component::AxisIndex;
use super::model::{ModelTree, NodeId};
use super::unit::UnitModel;
use crate::spec::field::title;
use crate::spec::{AxisDef, AxisOrient, Channel};
use serde_json::{json, Map, Value};

/// One axis definition of a channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisComponent {
    /// Output axis properties
    pub main: Map<String, Value>,
}

impl AxisComponent {
    pub fn orient(&self) -> Option<AxisOrient> {
        self.main
            .get("orient")
            .and_then(|orient| serde_json::from_value(orient.clone()).ok())
    }

    pub fn set_orient(&mut self, orient: AxisOrient) {
        self.main
            .insert("orient".to_string(), json!(orient.as_str()));
    }
}

/// Orientation of an axis without an explicit one
pub fn default_orient(channel: Channel) -> AxisOrient {
    match channel.primary() {
        Channel::Y => AxisOrient::Left,
        _ => AxisOrient::Bottom,
    }
}

/// Build a unit's axes from its x and y encoding
pub fn parse_unit_axes(tree: &ModelTree, id: NodeId, unit: &UnitModel) -> AxisIndex {
    let mut axes = AxisIndex::new();

    for channel in [Channel::X, Channel::Y] {
        let Some(fd) = unit.position_field_def(channel) else {
            continue;
        };
        // `axis: null` on the primary channel disables the axis
        let specified = match unit.field_def(channel) {
            Some(primary) => primary.axis_def(),
            None => Some(AxisDef::default()),
        };
        let Some(specified) = specified else {
            continue;
        };

        let mut main = Map::new();
        main.insert("scale".to_string(), json!(tree.scale_name(id, channel)));
        main.insert(
            "orient".to_string(),
            json!(specified
                .orient
                .unwrap_or_else(|| default_orient(channel))
                .as_str()),
        );
        main.insert(
            "title".to_string(),
            json!(specified.title.clone().unwrap_or_else(|| title(fd))),
        );
        if let Some(format) = &specified.format {
            main.insert("format".to_string(), json!(format));
        }

        let continuous = tree
            .scale_component(id, channel)
            .is_some_and(|scale| !scale.scale_type.has_discrete_domain());
        let grid = specified.grid.unwrap_or(continuous);
        if grid {
            main.insert("grid".to_string(), json!(true));
        }
        for (key, value) in &specified.extra {
            main.insert(key.clone(), value.clone());
        }

        axes.insert(channel, vec![AxisComponent { main }]);
    }

    axes
}

/// Output axes of the group a node renders into
pub fn assemble_axes(tree: &ModelTree, id: NodeId) -> Vec<Value> {
    tree.group_members(id)
        .into_iter()
        .flat_map(|member| {
            tree.node(member)
                .component
                .axes
                .values()
                .flatten()
                .map(|axis| Value::Object(axis.main.clone()))
                .collect::<Vec<_>>()
        })
        .collect()
}
