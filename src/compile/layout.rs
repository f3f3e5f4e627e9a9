//! Layout sizes, size signals and the facet grid layout

use super::component::SizeValue;
use super::model::{ModelKind, ModelTree, NodeId};
use super::scale::ScaleRange;
use crate::naming;
use crate::spec::field::{field_ref, string_value, FieldRefOption};
use crate::spec::{Channel, ScaleType, SizeType};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const SIZE_TYPES: [SizeType; 2] = [SizeType::Width, SizeType::Height];

/// Decide how big a node is along each dimension
pub fn parse_layout_size(tree: &mut ModelTree, id: NodeId) {
    let model = tree.node(id);
    let mut sizes = BTreeMap::new();

    match &model.kind {
        ModelKind::Unit(_) => {
            for size_type in SIZE_TYPES {
                let value = if let Some(size) = tree.declared_size(id, size_type) {
                    SizeValue::Fixed(size)
                } else if tree
                    .scale_component(id, size_type.channel())
                    .is_some_and(|scale| scale.is_step_sized())
                {
                    SizeValue::RangeStep
                } else {
                    SizeValue::Fixed(match size_type {
                        SizeType::Width => tree.config().cell.width,
                        SizeType::Height => tree.config().cell.height,
                    })
                };
                sizes.insert(size_type, value);
            }
        }
        ModelKind::Layer(_) => {
            for size_type in SIZE_TYPES {
                sizes.insert(size_type, SizeValue::Merged);
            }
        }
        ModelKind::Facet(_) => {}
    }

    tree.node_mut(id).component.layout_size = sizes;
}

/// Width of `cardinality` band steps.
///
/// ```
/// use vlcompile::compile::layout::bandspace_expr;
///
/// assert_eq!(
///     bandspace_expr("domain('x').length", 0.1, 0.05, 20.0),
///     "bandspace(domain('x').length, 0.1, 0.05) * 20"
/// );
/// ```
pub fn bandspace_expr(cardinality: &str, padding_inner: f64, padding_outer: f64, step: f64) -> String {
    format!(
        "bandspace({}, {}, {}) * {}",
        cardinality, padding_inner, padding_outer, step
    )
}

/// Size expression of a unit along one dimension
pub fn unit_size_expr(tree: &ModelTree, id: NodeId, size_type: SizeType) -> String {
    let channel = size_type.channel();

    if let Some(scale) = tree.scale_component(id, channel) {
        if let (true, ScaleRange::Step(step)) =
            (scale.scale_type.has_discrete_domain(), &scale.range)
        {
            // A scale left inside a facet cell is not visible to this top-level
            // signal; upstream has the same gap (vega-lite#1193)
            let cardinality = format!("domain('{}').length", tree.scale_name(id, channel));
            let padding = scale.padding;
            let padding_outer = scale.padding_outer.or(padding).unwrap_or(0.0);
            let padding_inner = match scale.scale_type {
                // n points have n - 1 steps between them
                ScaleType::Point => 1.0,
                _ => scale.padding_inner.or(padding).unwrap_or(0.0),
            };
            return bandspace_expr(&cardinality, padding_inner, padding_outer, *step);
        }
    }

    match tree.node(id).component.layout_size.get(&size_type) {
        Some(SizeValue::Fixed(size)) => size.to_string(),
        _ => match size_type {
            SizeType::Width => tree.config().cell.width.to_string(),
            SizeType::Height => tree.config().cell.height.to_string(),
        },
    }
}

/// Size expression of a layer: the largest of its children
pub fn layer_size_expr(tree: &ModelTree, id: NodeId, size_type: SizeType) -> String {
    let children: Vec<String> = tree
        .node(id)
        .children
        .iter()
        .map(|child| tree.size_signal(*child, size_type))
        .collect();
    format!("max({})", children.join(", "))
}

/// Layout size signals of a node and everything laid out within it
pub fn assemble_layout_signals(tree: &ModelTree, id: NodeId) -> Vec<Value> {
    let model = tree.node(id);
    match &model.kind {
        ModelKind::Unit(_) => SIZE_TYPES
            .iter()
            .map(|size_type| {
                json!({
                    "name": model.get_name(size_type.as_str()),
                    "update": unit_size_expr(tree, id, *size_type)
                })
            })
            .collect(),
        ModelKind::Layer(_) => {
            let mut signals: Vec<Value> = model
                .children
                .iter()
                .flat_map(|child| assemble_layout_signals(tree, *child))
                .collect();
            for size_type in SIZE_TYPES {
                signals.push(json!({
                    "name": model.get_name(size_type.as_str()),
                    "update": layer_size_expr(tree, id, size_type)
                }));
            }
            signals
        }
        ModelKind::Facet(_) => model
            .children
            .iter()
            .flat_map(|child| assemble_layout_signals(tree, *child))
            .collect(),
    }
}

/// Grid layout of a facet; other nodes have none
pub fn assemble_layout(tree: &ModelTree, id: NodeId) -> Option<Value> {
    let model = tree.node(id);
    let facet = model.as_facet()?;

    let columns = match facet.field_def(Channel::Column) {
        Some(fd) => {
            let layout_data = naming::layout_data(&model.get_name(Channel::Column.as_str()));
            let distinct = field_ref(
                fd,
                FieldRefOption {
                    prefix: Some(naming::DISTINCT_PREFIX),
                    ..FieldRefOption::default()
                },
            );
            json!({
                "signal": format!("data('{}')[0][{}]", layout_data, string_value(&distinct))
            })
        }
        None => json!(1),
    };

    Some(json!({
        "padding": {"row": 10, "column": 10},
        "offset": 10,
        "columns": columns,
        "bounds": "full"
    }))
}
