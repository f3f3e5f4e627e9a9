//! Model tree
//!
//! The input spec is turned into an arena of [`Model`] nodes. Each node owns
//! its children by index and keeps a non-owning `parent` index for ancestor
//! queries (facet cell inheritance, scale name lookup, data scoping).
//!
//! The traversal driver lives here too: [`ModelTree::run_phase`] runs one
//! parse phase over every node, children before their parent (the data phase
//! runs parent first, since a facet decides the data its child reads), and
//! [`ModelTree::assemble`] walks the finished tree from the root.

use super::component::ComponentIndex;
use super::data::DataPipeline;
use super::facet::FacetModel;
use super::layer::LayerModel;
use super::resolve::{init_composite_resolve, ResolveMapping};
use super::scale::ScaleComponent;
use super::unit::UnitModel;
use super::{axis, facet, header, layer, layout, legend, scale, selection, unit, Phase};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::naming::{self, get_name};
use crate::spec::{Channel, DataDef, FieldDef, SizeType, Spec};
use crate::{CompileError, Result};
use serde_json::{json, Map, Value};

/// Index of a node in its [`ModelTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Variant-specific part of a node
#[derive(Debug)]
pub enum ModelKind {
    Unit(UnitModel),
    Layer(LayerModel),
    Facet(FacetModel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Unit,
    Layer,
    Facet,
}

/// One node of the view tree
#[derive(Debug)]
pub struct Model {
    /// Structural name; prefixes every identifier generated for this node
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: ModelKind,
    pub resolve: ResolveMapping,
    pub title: Option<String>,
    pub component: ComponentIndex,
}

impl Model {
    fn new(
        name: String,
        parent: Option<NodeId>,
        kind: ModelKind,
        resolve: ResolveMapping,
        title: Option<String>,
    ) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            kind,
            resolve,
            title,
            component: ComponentIndex::default(),
        }
    }

    fn variant(&self) -> Variant {
        match self.kind {
            ModelKind::Unit(_) => Variant::Unit,
            ModelKind::Layer(_) => Variant::Layer,
            ModelKind::Facet(_) => Variant::Facet,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn as_unit(&self) -> Option<&UnitModel> {
        match &self.kind {
            ModelKind::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn as_layer(&self) -> Option<&LayerModel> {
        match &self.kind {
            ModelKind::Layer(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_facet(&self) -> Option<&FacetModel> {
        match &self.kind {
            ModelKind::Facet(facet) => Some(facet),
            _ => None,
        }
    }

    /// Field definition bound to a channel: the encoding of a unit, the
    /// row/column mapping of a facet
    pub fn field_def(&self, channel: Channel) -> Option<&FieldDef> {
        match &self.kind {
            ModelKind::Unit(unit) => unit.field_def(channel),
            ModelKind::Facet(facet) => facet.field_def(channel),
            ModelKind::Layer(_) => None,
        }
    }

    /// Prefix a local name with this node's name
    pub fn get_name(&self, text: &str) -> String {
        get_name(&self.name, text)
    }
}

/// Arena of model nodes, rooted at index 0
#[derive(Debug)]
pub struct ModelTree {
    nodes: Vec<Model>,
    config: Config,
    data: Option<DataDef>,
    parsed: Option<Phase>,
}

impl ModelTree {
    /// Build the tree for a root spec.
    ///
    /// Fails with [`CompileError::Structure`] on a layer without children or
    /// a facet placed inside a layer.
    pub fn build(spec: &Spec, config: Config, diag: &mut Diagnostics) -> Result<Self> {
        let mut tree = Self {
            nodes: Vec::new(),
            config,
            data: spec.data().cloned(),
            parsed: None,
        };
        tree.add(spec, None, String::new(), diag)?;
        Ok(tree)
    }

    fn add(
        &mut self,
        spec: &Spec,
        parent: Option<NodeId>,
        given_name: String,
        diag: &mut Diagnostics,
    ) -> Result<NodeId> {
        let id = NodeId(self.nodes.len());
        let name = self.unique_name(spec.name().map(str::to_string).unwrap_or(given_name), id);
        let title = spec.title().map(str::to_string);

        match spec {
            Spec::Unit(unit_spec) => {
                let in_facet = parent
                    .map(|p| self.is_facet(p) || self.facet_ancestor(p).is_some())
                    .unwrap_or(false);
                let unit = UnitModel::new(unit_spec, &self.config, in_facet, diag);
                self.nodes.push(Model::new(
                    name,
                    parent,
                    ModelKind::Unit(unit),
                    ResolveMapping::default(),
                    title,
                ));
            }
            Spec::Layer(layer_spec) => {
                if layer_spec.layer.is_empty() {
                    return Err(CompileError::Structure(format!(
                        "layer \"{}\" has no children",
                        name
                    )));
                }
                let resolve = init_composite_resolve(&layer_spec.resolve, diag);
                self.nodes.push(Model::new(
                    name.clone(),
                    parent,
                    ModelKind::Layer(LayerModel::new(layer_spec)),
                    resolve,
                    title,
                ));
                for (i, child_spec) in layer_spec.layer.iter().enumerate() {
                    let child_name = get_name(&name, &naming::layer_child(i));
                    let child = self.add(child_spec, Some(id), child_name, diag)?;
                    self.nodes[id.0].children.push(child);
                }
            }
            Spec::Facet(facet_spec) => {
                if let Some(p) = parent {
                    if self.node(p).as_layer().is_some() {
                        return Err(CompileError::Structure(format!(
                            "facet \"{}\" cannot be placed inside a layer",
                            name
                        )));
                    }
                }
                let facet = FacetModel::new(&facet_spec.facet, diag);
                let resolve = init_composite_resolve(&facet_spec.resolve, diag);
                self.nodes.push(Model::new(
                    name.clone(),
                    parent,
                    ModelKind::Facet(facet),
                    resolve,
                    title,
                ));
                let child_name = get_name(&name, naming::FACET_CHILD);
                let child = self.add(&facet_spec.spec, Some(id), child_name, diag)?;
                self.nodes[id.0].children.push(child);
            }
        }

        Ok(id)
    }

    /// Suffix a name already taken by an earlier node with the node's index.
    ///
    /// Node names prefix every generated identifier, so two nodes sharing one
    /// would emit clashing signals, scales and datasets.
    fn unique_name(&self, mut name: String, id: NodeId) -> String {
        while self.nodes.iter().any(|node| node.name == name) {
            let renamed = get_name(&name, &id.index().to_string());
            tracing::debug!(name = %name, renamed = %renamed, "Renaming duplicate node name");
            name = renamed;
        }
        name
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Model {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Model {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Input data of the root spec
    pub fn data(&self) -> Option<&DataDef> {
        self.data.as_ref()
    }

    /// Last parse phase completed for the whole tree
    pub fn parsed(&self) -> Option<Phase> {
        self.parsed
    }

    fn is_facet(&self, id: NodeId) -> bool {
        self.node(id).as_facet().is_some()
    }

    /// Strict ancestors of a node, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |p| self.node(*p).parent)
    }

    /// Nearest facet strictly above a node
    pub fn facet_ancestor(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|a| self.is_facet(*a))
    }

    /// Facets strictly above a node, nearest first
    pub fn facet_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        self.ancestors(id).filter(|a| self.is_facet(*a)).collect()
    }

    /// Node and all its descendants, parents before children
    pub fn pre_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = vec![id];
        for child in &self.node(id).children {
            order.extend(self.pre_order(*child));
        }
        order
    }

    /// Unit nodes under (and including) a node, in traversal order
    pub fn units(&self, id: NodeId) -> Vec<NodeId> {
        self.pre_order(id)
            .into_iter()
            .filter(|n| self.node(*n).as_unit().is_some())
            .collect()
    }

    /// Nodes whose artifacts are emitted in the same output group as `id`.
    ///
    /// Layers do not open a group of their own, so their children are
    /// flattened into the enclosing one; units and facets stop the walk.
    pub fn group_members(&self, id: NodeId) -> Vec<NodeId> {
        let mut members = vec![id];
        if self.node(id).as_layer().is_some() {
            for child in &self.node(id).children {
                members.extend(self.group_members(*child));
            }
        }
        members
    }

    // =========================================================================
    // Cross-node lookups
    // =========================================================================

    /// Node that holds the scale a node uses for a channel.
    ///
    /// Shared scales are removed from children and held by the resolving
    /// ancestor, so the nearest holder is the owner.
    pub fn scale_owner(&self, id: NodeId, channel: Channel) -> Option<NodeId> {
        let channel = channel.primary();
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.node(*n).component.scales.contains_key(&channel))
    }

    pub fn scale_component(&self, id: NodeId, channel: Channel) -> Option<&ScaleComponent> {
        let owner = self.scale_owner(id, channel)?;
        self.node(owner).component.scales.get(&channel.primary())
    }

    /// Output name of the scale a node uses for a channel
    pub fn scale_name(&self, id: NodeId, channel: Channel) -> String {
        let owner = self.scale_owner(id, channel).unwrap_or(id);
        self.node(owner).get_name(channel.primary().as_str())
    }

    /// Name of the layout size signal of a node
    ///
    /// A facet has no size of its own; it reports the size of its cell.
    pub fn size_signal(&self, id: NodeId, size_type: SizeType) -> String {
        let model = self.node(id);
        match (&model.kind, model.children.first()) {
            (ModelKind::Facet(_), Some(child)) => self.size_signal(*child, size_type),
            _ => model.get_name(size_type.as_str()),
        }
    }

    /// Size declared on a unit, or given to it by enclosing layers
    pub fn declared_size(&self, id: NodeId, size_type: SizeType) -> Option<f64> {
        let own = |model: &Model| match &model.kind {
            ModelKind::Unit(unit) => unit.size(size_type),
            ModelKind::Layer(layer) => layer.size(size_type),
            ModelKind::Facet(_) => None,
        };

        let mut current = Some(id);
        while let Some(n) = current {
            let model = self.node(n);
            if let Some(size) = own(model) {
                return Some(size);
            }
            current = model.parent.filter(|p| self.node(*p).as_layer().is_some());
        }
        None
    }

    // =========================================================================
    // Parse
    // =========================================================================

    /// Run one parse phase over the whole tree.
    ///
    /// Phases must run in [`Phase::ALL`] order, each exactly once.
    pub fn run_phase(
        &mut self,
        phase: Phase,
        pipeline: &dyn DataPipeline,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        let expected = match self.parsed {
            None => Some(Phase::first()),
            Some(done) => done.next(),
        };
        if expected != Some(phase) {
            return Err(CompileError::Phase(format!(
                "cannot run the {:?} phase, expected {:?}",
                phase, expected
            )));
        }

        tracing::debug!(?phase, "Running parse phase");
        self.parse_node(self.root(), phase, pipeline, diag)?;
        self.parsed = Some(phase);
        Ok(())
    }

    fn parse_node(
        &mut self,
        id: NodeId,
        phase: Phase,
        pipeline: &dyn DataPipeline,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        let children = self.node(id).children.clone();

        if phase == Phase::Data {
            self.parse_own(id, phase, pipeline, diag)?;
            for child in children {
                self.parse_node(child, phase, pipeline, diag)?;
            }
        } else {
            for child in children {
                self.parse_node(child, phase, pipeline, diag)?;
            }
            self.parse_own(id, phase, pipeline, diag)?;
        }

        self.node_mut(id).component.complete(phase);
        Ok(())
    }

    fn parse_own(
        &mut self,
        id: NodeId,
        phase: Phase,
        pipeline: &dyn DataPipeline,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        let variant = self.node(id).variant();
        match (phase, variant) {
            (Phase::Data, _) => {
                let data = pipeline.parse(self, id);
                self.node_mut(id).component.data = Some(data);
            }
            (Phase::Scale, Variant::Unit) => unit::parse_scale(self, id)?,
            (Phase::Scale, _) => scale::merge_child_scales(self, id)?,
            (Phase::LayoutSize, _) => layout::parse_layout_size(self, id),
            (Phase::Selection, Variant::Unit) => unit::parse_selection(self, id, diag)?,
            (Phase::Selection, Variant::Layer) => layer::parse_selection(self, id),
            (Phase::Selection, Variant::Facet) => facet::parse_selection(self, id),
            (Phase::MarkGroup, Variant::Unit) => unit::parse_mark_group(self, id)?,
            (Phase::MarkGroup, Variant::Layer) => {}
            (Phase::MarkGroup, Variant::Facet) => facet::parse_mark_group(self, id)?,
            (Phase::AxisAndHeader, Variant::Unit) => unit::parse_axis_and_header(self, id)?,
            (Phase::AxisAndHeader, Variant::Layer) => layer::parse_axis_and_header(self, id),
            (Phase::AxisAndHeader, Variant::Facet) => facet::parse_axis_and_header(self, id)?,
            (Phase::Legend, Variant::Unit) => unit::parse_legend(self, id)?,
            (Phase::Legend, _) => legend::merge_child_legends(self, id),
        }
        Ok(())
    }

    // =========================================================================
    // Assemble
    // =========================================================================

    /// Assemble the output spec from the root.
    ///
    /// Fails with [`CompileError::Phase`] unless every parse phase has run.
    pub fn assemble(&self, pipeline: &dyn DataPipeline) -> Result<Value> {
        if self.parsed != Some(Phase::last()) {
            return Err(CompileError::Phase(
                "assemble requires every parse phase to complete first".to_string(),
            ));
        }

        let root = self.root();
        let mut output = Map::new();
        output.insert("$schema".to_string(), json!(naming::VEGA_SCHEMA));
        if let Some(title) = &self.node(root).title {
            output.insert("title".to_string(), json!(title));
        }
        output.insert("autosize".to_string(), json!("pad"));
        output.insert("padding".to_string(), json!(5));

        let mut data = self.assemble_data(root, pipeline)?;
        data.extend(selection::assemble_selection_data(self, root));
        if !data.is_empty() {
            output.insert("data".to_string(), Value::Array(data));
        }

        let mut signals = layout::assemble_layout_signals(self, root);
        signals.extend(selection::assemble_top_level_signals(self, root));

        let mut group = self.assemble_group(root, pipeline)?;
        if let Some(Value::Array(group_signals)) = group.remove("signals") {
            signals.extend(group_signals);
        }
        if !signals.is_empty() {
            output.insert("signals".to_string(), Value::Array(signals));
        }
        output.extend(group);

        Ok(Value::Object(output))
    }

    /// Root-level data definitions; only the root emits any
    pub fn assemble_data(&self, id: NodeId, pipeline: &dyn DataPipeline) -> Result<Vec<Value>> {
        if !self.node(id).is_root() {
            return Ok(Vec::new());
        }

        let mut data = Vec::new();
        for node in self.pre_order(id) {
            data.extend(pipeline.assemble(self.node(node).component.data()?));
        }
        Ok(data)
    }

    /// Content of the output group a node renders into: layout, header and
    /// content marks, scales, axes, legends and selection signals.
    pub fn assemble_group(
        &self,
        id: NodeId,
        pipeline: &dyn DataPipeline,
    ) -> Result<Map<String, Value>> {
        let mut group = Map::new();

        let signals = selection::assemble_unit_signals(self, id);
        if !signals.is_empty() {
            group.insert("signals".to_string(), Value::Array(signals));
        }

        if let Some(layout) = layout::assemble_layout(self, id) {
            group.insert("layout".to_string(), layout);
        }

        let mut marks = header::assemble_header_marks(self, id);
        marks.extend(self.assemble_marks(id, pipeline)?);
        if !marks.is_empty() {
            group.insert("marks".to_string(), Value::Array(marks));
        }

        let scales = scale::assemble_scales(self, id);
        if !scales.is_empty() {
            group.insert("scales".to_string(), Value::Array(scales));
        }

        let axes = axis::assemble_axes(self, id);
        if !axes.is_empty() {
            group.insert("axes".to_string(), Value::Array(axes));
        }

        let legends = legend::assemble_legends(self, id);
        if !legends.is_empty() {
            group.insert("legends".to_string(), Value::Array(legends));
        }

        Ok(group)
    }

    /// Mark descriptors of a node
    pub fn assemble_marks(&self, id: NodeId, pipeline: &dyn DataPipeline) -> Result<Vec<Value>> {
        let model = self.node(id);
        model.component.ensure(Phase::MarkGroup)?;

        match &model.kind {
            ModelKind::Unit(_) => Ok(model.component.mark.clone()),
            ModelKind::Layer(_) => {
                let mut marks = Vec::new();
                for child in &model.children {
                    marks.extend(self.assemble_marks(*child, pipeline)?);
                }
                Ok(marks)
            }
            ModelKind::Facet(_) => facet::assemble_marks(self, id, pipeline),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(value: Value) -> Result<ModelTree> {
        let spec: Spec = serde_json::from_value(value).unwrap();
        let mut diag = Diagnostics::new();
        ModelTree::build(&spec, Config::default(), &mut diag)
    }

    #[test]
    fn test_names_follow_structure() {
        let tree = build(json!({
            "facet": {"row": {"field": "r", "type": "nominal"}},
            "spec": {"layer": [{"mark": "line"}, {"mark": "point"}]}
        }))
        .unwrap();

        let names: Vec<&str> = tree
            .pre_order(tree.root())
            .into_iter()
            .map(|id| tree.node(id).name.as_str())
            .collect();
        assert_eq!(names, vec!["", "child", "child_layer_0", "child_layer_1"]);
    }

    #[test]
    fn test_parent_links_and_facet_ancestor() {
        let tree = build(json!({
            "facet": {"column": {"field": "c", "type": "nominal"}},
            "spec": {"layer": [{"mark": "line"}]}
        }))
        .unwrap();

        let units = tree.units(tree.root());
        assert_eq!(units.len(), 1);
        let unit = units[0];
        assert_eq!(tree.ancestors(unit).count(), 2);
        assert_eq!(tree.facet_ancestor(unit), Some(tree.root()));
        assert!(tree.node(tree.root()).is_root());
    }

    #[test]
    fn test_explicit_name_wins() {
        let tree = build(json!({
            "layer": [{"name": "points", "mark": "point"}]
        }))
        .unwrap();
        let child = tree.node(tree.root()).children[0];
        assert_eq!(tree.node(child).name, "points");
    }

    #[test]
    fn test_duplicate_names_get_index_suffix() {
        let tree = build(json!({
            "layer": [
                {"name": "v", "mark": "point"},
                {"name": "v", "mark": "line"},
                {"name": "v_2", "mark": "rule"}
            ]
        }))
        .unwrap();

        let names: Vec<&str> = tree
            .pre_order(tree.root())
            .into_iter()
            .map(|id| tree.node(id).name.as_str())
            .collect();
        assert_eq!(names, vec!["", "v", "v_2", "v_2_3"]);
    }

    #[test]
    fn test_empty_layer_is_structural_error() {
        let err = build(json!({"layer": []})).unwrap_err();
        assert!(matches!(err, CompileError::Structure(_)));
    }

    #[test]
    fn test_facet_inside_layer_is_structural_error() {
        let err = build(json!({
            "layer": [{
                "facet": {"row": {"field": "a"}},
                "spec": {"mark": "point"}
            }]
        }))
        .unwrap_err();
        assert!(matches!(err, CompileError::Structure(_)));
    }

    #[test]
    fn test_declared_size_comes_from_enclosing_layer() {
        let tree = build(json!({
            "width": 300,
            "layer": [{"mark": "point"}, {"mark": "line", "width": 50}]
        }))
        .unwrap();
        let children = tree.node(tree.root()).children.clone();

        assert_eq!(tree.declared_size(children[0], SizeType::Width), Some(300.0));
        assert_eq!(tree.declared_size(children[1], SizeType::Width), Some(50.0));
        assert_eq!(tree.declared_size(children[0], SizeType::Height), None);
    }

    #[test]
    fn test_facet_size_signal_is_child_signal() {
        let tree = build(json!({
            "facet": {"row": {"field": "a"}},
            "spec": {"mark": "point"}
        }))
        .unwrap();
        assert_eq!(tree.size_signal(tree.root(), SizeType::Width), "child_width");
    }
}
