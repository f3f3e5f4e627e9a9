//! Faceted views
//!
//! A facet replicates its child once per distinct row/column value. The
//! replicated cells become one group mark over the faceted dataset; row
//! and column labels, titles and any axes shared across cells are moved
//! into header groups around the grid.

use super::axis::default_orient;
use super::data::DataPipeline;
use super::header::{merge_title, HeaderComponent, HeaderType, LayoutHeader};
use super::model::{ModelKind, ModelTree, NodeId};
use super::{selection, unit};
use crate::diagnostics::{message, DiagnosticKind, Diagnostics};
use crate::spec::field::{self, field_ref, format_signal_ref, FieldExpr, FieldRefOption};
use crate::spec::{Channel, FieldDef, HeaderChannel, Resolution};
use crate::{CompileError, Result};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct FacetModel {
    /// Row and column bindings, normalized
    pub facet: BTreeMap<Channel, FieldDef>,
}

impl FacetModel {
    /// Keep the row/column bindings that name a field
    pub fn new(facet: &BTreeMap<Channel, FieldDef>, diag: &mut Diagnostics) -> Self {
        let mut normalized = BTreeMap::new();

        for (&channel, fd) in facet {
            if !channel.is_facet() {
                diag.warn(
                    DiagnosticKind::IncompatibleChannel,
                    message::incompatible_channel(channel, "facet"),
                );
                continue;
            }
            if !fd.has_field() {
                diag.warn(
                    DiagnosticKind::EmptyFieldDef,
                    message::empty_field_def(channel),
                );
                continue;
            }
            normalized.insert(channel, field::normalize(fd, channel));
        }

        Self { facet: normalized }
    }

    pub fn field_def(&self, channel: Channel) -> Option<&FieldDef> {
        self.facet.get(&channel)
    }

    pub fn field(&self, channel: Channel, opt: FieldRefOption<'_>) -> Option<String> {
        self.field_def(channel).map(|fd| field_ref(fd, opt))
    }

    /// Check if cells are laid out over both rows and columns
    pub fn is_crossed(&self) -> bool {
        self.facet.contains_key(&Channel::Row) && self.facet.contains_key(&Channel::Column)
    }
}

fn facet(tree: &ModelTree, id: NodeId) -> Result<FacetModel> {
    tree.node(id)
        .as_facet()
        .cloned()
        .ok_or_else(|| CompileError::Structure(format!("node {} is not a facet", id.index())))
}

fn child(tree: &ModelTree, id: NodeId) -> Result<NodeId> {
    tree.node(id)
        .children
        .first()
        .copied()
        .ok_or_else(|| CompileError::Structure(format!("facet {} has no child", id.index())))
}

pub(super) fn parse_selection(tree: &mut ModelTree, id: NodeId) {
    let index = selection::union_child_selections(tree, id);
    tree.node_mut(id).component.selection = index;
}

// =============================================================================
// Cell group
// =============================================================================

/// Encode entry the child contributes to each cell
fn child_group_properties(tree: &ModelTree, child: NodeId) -> Map<String, Value> {
    let model = tree.node(child);
    match &model.kind {
        ModelKind::Unit(unit) => unit::parent_group_properties(tree, child, &unit.cell),
        ModelKind::Layer(_) => {
            unit::parent_group_properties(tree, child, &tree.config().cell.style)
        }
        ModelKind::Facet(_) => Map::new(),
    }
}

/// Build the cell group mark replicating the child
pub(super) fn parse_mark_group(tree: &mut ModelTree, id: NodeId) -> Result<()> {
    let facet = facet(tree, id)?;
    let child = child(tree, id)?;
    let model = tree.node(id);

    let facet_root = model
        .component
        .data()?
        .facet_root
        .clone()
        .ok_or_else(|| CompileError::Phase("facet data missing its faceted dataset".to_string()))?;

    let fields: Vec<String> = [Channel::Row, Channel::Column]
        .into_iter()
        .filter_map(|channel| facet.field(channel, FieldRefOption::default()))
        .collect();

    let mut from_facet = Map::new();
    from_facet.insert("name".to_string(), json!(facet_root.name));
    from_facet.insert("data".to_string(), json!(facet_root.data));
    from_facet.insert("groupby".to_string(), json!(fields));

    let mut mark = Map::new();
    mark.insert("name".to_string(), json!(model.get_name("cell")));
    mark.insert("type".to_string(), json!("group"));

    if facet.is_crossed() {
        // Every row/column combination gets a cell, even without data
        from_facet.insert("aggregate".to_string(), json!({"cross": true}));
    }
    mark.insert("from".to_string(), json!({ "facet": from_facet }));
    if facet.is_crossed() {
        let sort_fields: Vec<String> = fields
            .iter()
            .map(|f| field::accessor("datum", f))
            .collect();
        mark.insert(
            "sort".to_string(),
            json!({"field": sort_fields, "order": ["ascending", "ascending"]}),
        );
    }

    let mut update = child_group_properties(tree, child);
    update.extend(tree.config().facet.cell.to_encode_entry());
    mark.insert("encode".to_string(), json!({ "update": update }));

    tree.node_mut(id).component.mark = vec![Value::Object(mark)];
    Ok(())
}

/// Units whose nearest enclosing facet is `id`
fn cell_units(tree: &ModelTree, id: NodeId) -> Vec<NodeId> {
    tree.units(id)
        .into_iter()
        .filter(|unit| tree.facet_ancestor(*unit) == Some(id))
        .collect()
}

/// Cell group mark with the child's content nested inside
pub fn assemble_marks(
    tree: &ModelTree,
    id: NodeId,
    pipeline: &dyn DataPipeline,
) -> Result<Vec<Value>> {
    let child = child(tree, id)?;
    let model = tree.node(id);
    let facet_root = model.component.data()?.facet_root.clone();

    let Some(Value::Object(mut cell)) = model.component.mark.first().cloned() else {
        return Err(CompileError::Phase("facet cell mark missing".to_string()));
    };

    if let (Some(root), Some(Value::Object(from))) = (facet_root, cell.get_mut("from")) {
        if let Some(Value::Object(from_facet)) = from.get_mut("facet") {
            from_facet.insert("name".to_string(), json!(root.name));
            from_facet.insert("data".to_string(), json!(root.data));
        }
    }

    let mut data = Vec::new();
    for unit in cell_units(tree, id) {
        data.extend(pipeline.assemble_cell(tree.node(unit).component.data()?));
    }
    if !data.is_empty() {
        cell.insert("data".to_string(), Value::Array(data));
    }

    cell.extend(tree.assemble_group(child, pipeline)?);
    Ok(vec![Value::Object(cell)])
}

// =============================================================================
// Headers
// =============================================================================

pub(super) fn parse_axis_and_header(tree: &mut ModelTree, id: NodeId) -> Result<()> {
    for channel in [HeaderChannel::Column, HeaderChannel::Row] {
        parse_header(tree, id, channel)?;
    }
    for channel in [Channel::X, Channel::Y] {
        merge_child_axis(tree, id, channel)?;
    }
    Ok(())
}

fn make_header_component(
    tree: &ModelTree,
    child: NodeId,
    channel: HeaderChannel,
    labels: bool,
) -> HeaderComponent {
    HeaderComponent {
        labels,
        size_signal: tree.size_signal(child, channel.size_type()),
        axes: Vec::new(),
    }
}

fn parse_header(tree: &mut ModelTree, id: NodeId, channel: HeaderChannel) -> Result<()> {
    let facet = facet(tree, id)?;
    let child = child(tree, id)?;
    let Some(fd) = facet.field_def(channel.channel()).cloned() else {
        return Ok(());
    };

    let header = fd.header.clone().unwrap_or_default();
    let mut title = header.title.clone().unwrap_or_else(|| field::title(&fd));
    if let Some(child_header) = tree.node_mut(child).component.layout_headers.get_mut(&channel) {
        title = merge_title(&title, child_header);
    }

    let layout_header = LayoutHeader {
        title: Some(title),
        field_ref: Some(format_signal_ref(
            &fd,
            header.format.as_deref(),
            FieldExpr::Parent,
            tree.config(),
        )),
        field: Some(field_ref(&fd, FieldRefOption::default())),
        header: vec![make_header_component(tree, child, channel, true)],
        footer: Vec::new(),
    };

    tree.node_mut(id)
        .component
        .layout_headers
        .insert(channel, layout_header);
    Ok(())
}

/// Move the child's shared axes for a channel into the facet's headers
fn merge_child_axis(tree: &mut ModelTree, id: NodeId, channel: Channel) -> Result<()> {
    let child = child(tree, id)?;
    if tree.node(id).resolve.axis(channel) != Resolution::Shared {
        return Ok(());
    }
    let Some(header_channel) = HeaderChannel::for_axis(channel) else {
        return Ok(());
    };
    let Some(axes) = tree.node_mut(child).component.axes.remove(&channel) else {
        return Ok(());
    };

    for axis in axes {
        let orient = axis.orient().unwrap_or_else(|| default_orient(channel));
        let header_type = HeaderType::from_orient(orient);
        let proto = make_header_component(tree, child, header_channel, false);

        let layout_header = tree
            .node_mut(id)
            .component
            .layout_headers
            .entry(header_channel)
            .or_default();
        let components = layout_header.components_mut(header_type);
        if components.is_empty() {
            components.push(proto);
        }
        components[0].axes.push(axis.main);
    }

    Ok(())
}
