//! Layered views
//!
//! A layer superimposes its children in one group. It builds nothing of its
//! own: scales, axes, legends and selections are merged up from the
//! children according to the layer's resolution.

use super::component::AxisIndex;
use super::model::{ModelTree, NodeId};
use super::selection;
use crate::spec::{LayerSpec, Resolution, SizeType};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct LayerModel {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl LayerModel {
    pub fn new(spec: &LayerSpec) -> Self {
        Self {
            width: spec.width,
            height: spec.height,
        }
    }

    pub fn size(&self, size_type: SizeType) -> Option<f64> {
        match size_type {
            SizeType::Width => self.width,
            SizeType::Height => self.height,
        }
    }
}

pub(super) fn parse_selection(tree: &mut ModelTree, id: NodeId) {
    let index = selection::union_child_selections(tree, id);
    tree.node_mut(id).component.selection = index;
}

/// Merge the children's axes.
///
/// Shared axes move to the layer, the first child's winning. Independent
/// axes stay with their child; when several land on the same side, later
/// ones flip to the opposite side.
pub(super) fn parse_axis_and_header(tree: &mut ModelTree, id: NodeId) {
    let children = tree.node(id).children.clone();
    let mut axes = AxisIndex::new();
    let mut orient_count: BTreeMap<&'static str, usize> = BTreeMap::new();

    for child in children {
        let mut child_axes = std::mem::take(&mut tree.node_mut(child).component.axes);
        let channels: Vec<_> = child_axes.keys().copied().collect();

        for channel in channels {
            match tree.node(id).resolve.axis(channel) {
                Resolution::Shared => {
                    if let Some(moved) = child_axes.remove(&channel) {
                        axes.entry(channel).or_insert(moved);
                    }
                }
                Resolution::Independent => {
                    for axis in child_axes.get_mut(&channel).into_iter().flatten() {
                        let Some(orient) = axis.orient() else {
                            continue;
                        };
                        let count = orient_count.entry(orient.as_str()).or_insert(0);
                        *count += 1;
                        if *count > 1 {
                            axis.set_orient(orient.opposite());
                        }
                    }
                }
            }
        }

        tree.node_mut(child).component.axes = child_axes;
    }

    tree.node_mut(id).component.axes = axes;
}

#[cfg(test)]
mod tests {
    use crate::compile::model::ModelTree;
    use crate::compile::Compiler;
    use crate::diagnostics::Diagnostics;
    use crate::spec::{AxisOrient, Channel, Spec};
    use serde_json::{json, Value};

    fn parsed(value: Value) -> ModelTree {
        let spec: Spec = serde_json::from_value(value).unwrap();
        let compiler = Compiler::new();
        let mut diag = Diagnostics::new();
        let mut tree = compiler.build(&spec, &mut diag).unwrap();
        compiler.parse(&mut tree, &mut diag).unwrap();
        tree
    }

    #[test]
    fn test_shared_axes_move_to_layer() {
        let tree = parsed(json!({
            "layer": [
                {"mark": "point", "encoding": {"x": {"field": "a", "type": "quantitative"}}},
                {"mark": "line", "encoding": {"x": {"field": "a", "type": "quantitative", "axis": {"title": "Second"}}}}
            ]
        }));
        let root = tree.root();

        let axes = &tree.node(root).component.axes[&Channel::X];
        assert_eq!(axes.len(), 1);
        assert_eq!(axes[0].main["title"], "a");
        for child in &tree.node(root).children {
            assert!(tree.node(*child).component.axes.is_empty());
        }
    }

    #[test]
    fn test_independent_axes_flip_orient() {
        let tree = parsed(json!({
            "layer": [
                {"mark": "line", "encoding": {"y": {"field": "a", "type": "quantitative"}}},
                {"mark": "line", "encoding": {"y": {"field": "b", "type": "quantitative"}}}
            ],
            "resolve": {"scale": {"y": "independent"}}
        }));
        let root = tree.root();
        assert!(tree.node(root).component.axes.is_empty());

        let children = &tree.node(root).children;
        let first = &tree.node(children[0]).component.axes[&Channel::Y][0];
        let second = &tree.node(children[1]).component.axes[&Channel::Y][0];
        assert_eq!(first.orient(), Some(AxisOrient::Left));
        assert_eq!(second.orient(), Some(AxisOrient::Right));
        assert_eq!(second.main["scale"], "layer_1_y");
    }
}
