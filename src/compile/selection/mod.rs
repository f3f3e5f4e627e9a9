//! Interactive selections
//!
//! Selections are declared on units. Each one produces a store data source,
//! a set of signals that react to input events, and a top-level signal
//! exposing the store. Composite nodes do not copy selection components:
//! they alias their children's, so every node of the tree resolves a
//! selection name to the same component.

pub mod project;

use super::model::{ModelTree, NodeId};
use super::unit::UnitModel;
use crate::diagnostics::Diagnostics;
use crate::naming::{self, var_name};
use crate::spec::field::{accessor, string_value};
use crate::spec::{Channel, SelectionDef, SelectionType, SizeType};
use project::ProjectEntry;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Event stream of a selection without an explicit `on`
const DEFAULT_POINT_EVENTS: &str = "click";
const DEFAULT_INTERVAL_EVENTS: &str = "[mousedown, window:mouseup] > window:mousemove!";

/// Parsed selection
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionComponent {
    /// Signal-safe selection name
    pub name: String,
    pub selection_type: SelectionType,
    /// Name of the unit the selection is declared in
    pub unit: String,
    pub events: String,
    pub project: Vec<ProjectEntry>,
    /// Channel to projected field, for entries projected through a channel
    pub fields: BTreeMap<Channel, String>,
}

/// Selections visible from a node, keyed by declared name
pub type SelectionIndex = BTreeMap<String, Rc<RefCell<SelectionComponent>>>;

/// Build the selections a unit declares
pub fn parse_unit_selection(
    tree: &ModelTree,
    id: NodeId,
    unit: &UnitModel,
    diag: &mut Diagnostics,
) -> SelectionIndex {
    let mut index = SelectionIndex::new();

    for (name, declared) in &unit.selection {
        let mut def = declared.clone();
        if !project::has(&def) {
            match def.selection_type {
                SelectionType::Interval => def.encodings = Some(vec![Channel::X, Channel::Y]),
                SelectionType::Single | SelectionType::Multi => {
                    def.fields = Some(vec![naming::SELECTION_ID.to_string()])
                }
            }
        }

        let mut component = SelectionComponent {
            name: var_name(name),
            selection_type: def.selection_type,
            unit: tree.node(id).name.clone(),
            events: def.on.clone().unwrap_or_else(|| default_events(&def).to_string()),
            project: Vec::new(),
            fields: BTreeMap::new(),
        };
        project::parse(|channel| unit.field_def(channel), &def, &mut component, diag);

        tracing::debug!(selection = %component.name, unit = %component.unit, "Parsed selection");
        index.insert(name.clone(), Rc::new(RefCell::new(component)));
    }

    index
}

fn default_events(def: &SelectionDef) -> &'static str {
    match def.selection_type {
        SelectionType::Interval => DEFAULT_INTERVAL_EVENTS,
        SelectionType::Single | SelectionType::Multi => DEFAULT_POINT_EVENTS,
    }
}

/// Union of the children's selections, sharing the same components
pub fn union_child_selections(tree: &ModelTree, id: NodeId) -> SelectionIndex {
    let mut index = SelectionIndex::new();
    for child in &tree.node(id).children {
        for (name, component) in &tree.node(*child).component.selection {
            index
                .entry(name.clone())
                .or_insert_with(|| Rc::clone(component));
        }
    }
    index
}

// =============================================================================
// Assemble
// =============================================================================

/// Signals of the selections declared by units in a node's output group
pub fn assemble_unit_signals(tree: &ModelTree, id: NodeId) -> Vec<Value> {
    let mut signals = Vec::new();

    for member in tree.group_members(id) {
        let model = tree.node(member);
        if model.as_unit().is_none() {
            continue;
        }
        for component in model.component.selection.values() {
            let component = component.borrow();
            if component.unit != model.name {
                continue;
            }
            match component.selection_type {
                SelectionType::Single | SelectionType::Multi => {
                    signals.extend(point_signals(&component))
                }
                SelectionType::Interval => signals.extend(interval_signals(tree, member, &component)),
            }
        }
    }

    signals
}

fn point_signals(component: &SelectionComponent) -> Vec<Value> {
    let name = &component.name;
    let tuple = naming::selection_tuple(name);
    let store = string_value(&naming::selection_store(name));

    let fields: Vec<&str> = component.project.iter().map(|e| e.field.as_str()).collect();
    let encodings: Vec<&str> = component
        .project
        .iter()
        .map(|e| e.encoding.map(|c| c.as_str()).unwrap_or(""))
        .collect();
    let values: Vec<String> = fields.iter().map(|f| accessor("datum", f)).collect();

    let tuple_update = format!(
        "datum && item().mark.marktype !== 'group' ? {{unit: {}, encodings: {}, fields: {}, values: [{}]}} : null",
        string_value(&component.unit),
        json!(encodings),
        json!(fields),
        values.join(", ")
    );

    let mut signals = vec![json!({
        "name": tuple,
        "value": {},
        "on": [{"events": component.events, "update": tuple_update, "force": true}]
    })];

    let modify_update = match component.selection_type {
        SelectionType::Multi => {
            let toggle = naming::selection_toggle(name);
            signals.push(json!({
                "name": toggle,
                "value": false,
                "on": [{"events": component.events, "update": "event.shiftKey"}]
            }));
            format!(
                "modify({store}, {toggle} ? null : {tuple}, {toggle} ? null : true, {toggle} ? {tuple} : null)",
                store = store,
                toggle = toggle,
                tuple = tuple
            )
        }
        _ => format!("modify({}, {}, true)", store, tuple),
    };

    signals.push(json!({
        "name": naming::selection_modify(name),
        "on": [{"events": {"signal": tuple}, "update": modify_update}]
    }));
    signals
}

fn interval_signals(tree: &ModelTree, unit: NodeId, component: &SelectionComponent) -> Vec<Value> {
    let name = &component.name;
    let tuple = naming::selection_tuple(name);
    let mut signals = Vec::new();
    let mut field_signals = Vec::new();
    let mut intervals = Vec::new();

    for entry in &component.project {
        let Some(channel @ (Channel::X | Channel::Y)) = entry.encoding else {
            continue;
        };
        let size_type = match channel {
            Channel::X => SizeType::Width,
            _ => SizeType::Height,
        };
        let pixels = format!("{}_{}", name, channel.as_str());
        let field_signal = format!("{}_{}", name, var_name(&entry.field));

        signals.push(json!({
            "name": pixels,
            "value": [],
            "on": [
                {
                    "events": "mousedown",
                    "update": format!("[{c}(unit), {c}(unit)]", c = channel.as_str())
                },
                {
                    "events": component.events,
                    "update": format!(
                        "[{}[0], clamp({}(unit), 0, {})]",
                        pixels,
                        channel.as_str(),
                        tree.size_signal(unit, size_type)
                    )
                }
            ]
        }));
        signals.push(json!({
            "name": field_signal,
            "on": [{
                "events": {"signal": pixels},
                "update": format!(
                    "invert({}, {})",
                    string_value(&tree.scale_name(unit, channel)),
                    pixels
                )
            }]
        }));

        intervals.push(format!(
            "{{encoding: {}, field: {}, extent: {}}}",
            string_value(channel.as_str()),
            string_value(&entry.field),
            field_signal
        ));
        field_signals.push(json!({"signal": field_signal}));
    }

    signals.push(json!({
        "name": tuple,
        "on": [{
            "events": field_signals,
            "update": format!(
                "{{unit: {}, intervals: [{}]}}",
                string_value(&component.unit),
                intervals.join(", ")
            )
        }]
    }));
    signals.push(json!({
        "name": naming::selection_modify(name),
        "on": [{
            "events": {"signal": tuple},
            "update": format!(
                "modify({}, {}, true)",
                string_value(&naming::selection_store(name)),
                tuple
            )
        }]
    }));
    signals
}

/// Signals the root exposes for every selection in the tree
pub fn assemble_top_level_signals(tree: &ModelTree, id: NodeId) -> Vec<Value> {
    let index = &tree.node(id).component.selection;
    let mut signals = Vec::new();

    let has_interval = index
        .values()
        .any(|c| c.borrow().selection_type == SelectionType::Interval);
    if has_interval {
        signals.push(json!({
            "name": naming::UNIT_SIGNAL,
            "value": {},
            "on": [{"events": "mousemove", "update": "isTuple(group()) ? group() : unit"}]
        }));
    }

    for component in index.values() {
        let component = component.borrow();
        signals.push(json!({
            "name": component.name,
            "update": format!("data({})", string_value(&naming::selection_store(&component.name)))
        }));
    }

    signals
}

/// Store data sources of every selection in the tree
pub fn assemble_selection_data(tree: &ModelTree, id: NodeId) -> Vec<Value> {
    tree.node(id)
        .component
        .selection
        .values()
        .map(|component| json!({"name": naming::selection_store(&component.borrow().name)}))
        .collect()
}
