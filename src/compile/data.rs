//! Data pipeline
//!
//! The engine only needs two things from the data pipeline: which dataset
//! each node reads from, and the dataset definitions to emit. Both go
//! through the [`DataPipeline`] trait so the transform builder can be
//! replaced. [`DefaultPipeline`] emits:
//!
//! - `source_0`: the raw input
//! - `main`: the input plus time-unit formulas (and selection identifiers)
//! - `<unit>_aggregate`: aggregated records of a unit
//! - `<facet>_row` / `<facet>_column`: distinct header values of a facet
//! - `<facet>_column_layout`: distinct count of column values
//! - `<unit>_cell_aggregate`: aggregated records of a unit inside one facet cell
//!
//! A facet always splits `main` (or the cell of an enclosing facet), so every
//! unit in a cell sees raw records. An aggregated unit in a facet aggregates
//! its cell again inside the cell group; its root-level aggregate stays
//! around for scale domains shared across cells. Every other dataset is
//! emitted once, by the root.

use super::model::{ModelKind, ModelTree, NodeId};
use super::unit::UnitModel;
use crate::naming;
use crate::spec::field::{accessor, field_ref, FieldRefOption};
use crate::spec::{Channel, ChannelDef, DataDef, FieldDef, SelectionType};
use serde_json::{json, Map, Value};

/// Data pipeline builder
pub trait DataPipeline {
    /// Build the data description of one node
    ///
    /// # Arguments
    ///
    /// * `tree` - The model tree; ancestors of `id` have already been parsed
    /// * `id` - The node to describe
    fn parse(&self, tree: &ModelTree, id: NodeId) -> DataComponent;

    /// Turn a node's data description into root-level data definitions
    fn assemble(&self, component: &DataComponent) -> Vec<Value>;

    /// Data definitions a node adds to the cell group of its enclosing facet
    fn assemble_cell(&self, component: &DataComponent) -> Vec<Value> {
        component.cell_sources.iter().map(DataSource::assemble).collect()
    }
}

/// Data description of one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataComponent {
    /// Dataset the node's marks read from
    pub source: String,
    /// Root-scope dataset holding the node's records; scale domains read it
    pub input: String,
    /// Root-scope datasets introduced by this node, in emission order
    pub sources: Vec<DataSource>,
    /// Datasets derived from the facet cell the node sits in
    pub cell_sources: Vec<DataSource>,
    /// Faceted dataset of a facet node
    pub facet_root: Option<FacetRoot>,
}

/// The dataset a facet splits into cells
#[derive(Debug, Clone, PartialEq)]
pub struct FacetRoot {
    /// Name of the per-cell dataset
    pub name: String,
    /// Dataset being split
    pub data: String,
}

/// One output dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSource {
    pub name: String,
    pub source: Option<String>,
    pub input: Option<DataDef>,
    pub transform: Vec<Value>,
}

impl DataSource {
    fn derived(name: String, source: &str, transform: Vec<Value>) -> Self {
        Self {
            name,
            source: Some(source.to_string()),
            input: None,
            transform,
        }
    }

    pub fn assemble(&self) -> Value {
        let mut data = Map::new();
        data.insert("name".to_string(), json!(self.name));
        if let Some(input) = &self.input {
            if let Value::Object(fields) = json!(input) {
                data.extend(fields);
            }
        }
        if let Some(source) = &self.source {
            data.insert("source".to_string(), json!(source));
        }
        if !self.transform.is_empty() {
            data.insert("transform".to_string(), Value::Array(self.transform.clone()));
        }
        Value::Object(data)
    }
}

/// Built-in pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPipeline;

impl DataPipeline for DefaultPipeline {
    fn parse(&self, tree: &ModelTree, id: NodeId) -> DataComponent {
        let model = tree.node(id);
        let mut component = match &model.kind {
            ModelKind::Unit(unit) => parse_unit(tree, id, unit),
            ModelKind::Layer(_) => DataComponent {
                source: cell_source(tree, id).unwrap_or_else(|| naming::MAIN.to_string()),
                input: naming::MAIN.to_string(),
                ..DataComponent::default()
            },
            ModelKind::Facet(_) => parse_facet(tree, id),
        };

        if model.is_root() {
            let mut sources = root_sources(tree);
            sources.append(&mut component.sources);
            component.sources = sources;
        }

        component
    }

    fn assemble(&self, component: &DataComponent) -> Vec<Value> {
        component.sources.iter().map(DataSource::assemble).collect()
    }
}

/// Per-cell dataset of the nearest enclosing facet
fn cell_source(tree: &ModelTree, id: NodeId) -> Option<String> {
    tree.facet_ancestor(id)
        .map(|facet| tree.node(facet).get_name("facet"))
}

/// Root-scope dataset a unit's records live in
fn unit_input(tree: &ModelTree, id: NodeId, unit: &UnitModel) -> String {
    if unit.is_aggregate() {
        naming::aggregate_data(&tree.node(id).name)
    } else {
        naming::MAIN.to_string()
    }
}

fn parse_unit(tree: &ModelTree, id: NodeId, unit: &UnitModel) -> DataComponent {
    let input = unit_input(tree, id, unit);
    let cell = cell_source(tree, id);
    let mut component = DataComponent {
        source: input.clone(),
        input: input.clone(),
        ..DataComponent::default()
    };

    if !unit.is_aggregate() {
        if let Some(cell) = cell {
            component.source = cell;
        }
        return component;
    }

    let facet_fields: Vec<String> = tree
        .facet_ancestors(id)
        .into_iter()
        .flat_map(|f| facet_fields(tree, f))
        .collect();
    let aggregate = aggregate_transform(unit, &facet_fields);

    component.sources.push(DataSource::derived(
        input,
        naming::MAIN,
        vec![aggregate.clone()],
    ));
    if let Some(cell) = cell {
        let name = naming::cell_aggregate_data(&tree.node(id).name);
        component
            .cell_sources
            .push(DataSource::derived(name.clone(), &cell, vec![aggregate]));
        component.source = name;
    }

    component
}

fn facet_fields(tree: &ModelTree, id: NodeId) -> Vec<String> {
    [Channel::Row, Channel::Column]
        .into_iter()
        .filter_map(|ch| tree.node(id).field_def(ch))
        .map(|fd| field_ref(fd, FieldRefOption::default()))
        .collect()
}

fn aggregate_transform(unit: &UnitModel, extra_groupby: &[String]) -> Value {
    let mut groupby: Vec<String> = Vec::new();
    let mut ops = Vec::new();
    let mut fields = Vec::new();
    let mut outputs: Vec<String> = Vec::new();

    for fd in unit.encoding.values().filter_map(ChannelDef::field_def) {
        let output = field_ref(fd, FieldRefOption::default());
        match &fd.aggregate {
            Some(op) => {
                if outputs.contains(&output) {
                    continue;
                }
                ops.push(json!(op));
                fields.push(if fd.is_count() {
                    Value::Null
                } else {
                    json!(fd.field)
                });
                outputs.push(output);
            }
            None => {
                if !groupby.contains(&output) {
                    groupby.push(output);
                }
            }
        }
    }

    for field in extra_groupby {
        if !groupby.contains(field) {
            groupby.push(field.clone());
        }
    }

    json!({
        "type": "aggregate",
        "groupby": groupby,
        "ops": ops,
        "fields": fields,
        "as": outputs
    })
}

fn parse_facet(tree: &ModelTree, id: NodeId) -> DataComponent {
    let model = tree.node(id);

    let input = naming::MAIN.to_string();
    let split = cell_source(tree, id).unwrap_or_else(|| input.clone());

    let mut sources = Vec::new();
    for channel in [Channel::Row, Channel::Column] {
        let Some(fd) = model.field_def(channel) else {
            continue;
        };
        let field = field_ref(fd, FieldRefOption::default());
        let header_data = model.get_name(channel.as_str());

        sources.push(DataSource::derived(
            header_data.clone(),
            &input,
            vec![json!({"type": "aggregate", "groupby": [field]})],
        ));

        if channel == Channel::Column {
            sources.push(DataSource::derived(
                naming::layout_data(&header_data),
                &header_data,
                vec![json!({
                    "type": "aggregate",
                    "ops": ["distinct"],
                    "fields": [field]
                })],
            ));
        }
    }

    DataComponent {
        source: split.clone(),
        input,
        sources,
        cell_sources: Vec::new(),
        facet_root: Some(FacetRoot {
            name: model.get_name("facet"),
            data: split,
        }),
    }
}

fn root_sources(tree: &ModelTree) -> Vec<DataSource> {
    let raw = DataSource {
        name: naming::SOURCE.to_string(),
        input: tree.data().cloned(),
        ..DataSource::default()
    };

    let mut transform = Vec::new();
    if needs_identifier(tree) {
        transform.push(json!({"type": "identifier", "as": naming::SELECTION_ID}));
    }
    let mut formulas: Vec<String> = Vec::new();
    for id in tree.pre_order(tree.root()) {
        for fd in time_unit_fields(tree, id) {
            let output = field_ref(fd, FieldRefOption::default());
            if formulas.contains(&output) {
                continue;
            }
            if let (Some(unit), Some(field)) = (&fd.time_unit, &fd.field) {
                transform.push(json!({
                    "type": "formula",
                    "as": output,
                    "expr": time_unit_expr(unit, field)
                }));
                formulas.push(output);
            }
        }
    }

    vec![
        raw,
        DataSource::derived(naming::MAIN.to_string(), naming::SOURCE, transform),
    ]
}

fn time_unit_fields(tree: &ModelTree, id: NodeId) -> Vec<&FieldDef> {
    let model = tree.node(id);
    let defs: Vec<&FieldDef> = match &model.kind {
        ModelKind::Unit(unit) => unit
            .encoding
            .values()
            .filter_map(ChannelDef::field_def)
            .collect(),
        ModelKind::Facet(facet) => facet.facet.values().collect(),
        ModelKind::Layer(_) => Vec::new(),
    };
    defs.into_iter()
        .filter(|fd| fd.time_unit.is_some() && fd.aggregate.is_none())
        .collect()
}

fn needs_identifier(tree: &ModelTree) -> bool {
    tree.units(tree.root()).into_iter().any(|id| {
        tree.node(id).as_unit().is_some_and(|unit| {
            unit.selection
                .values()
                .any(|sel| sel.selection_type != SelectionType::Interval)
        })
    })
}

/// Expression truncating a date field to a time unit.
///
/// ```
/// use vlcompile::compile::data::time_unit_expr;
///
/// assert_eq!(
///     time_unit_expr("yearmonth", "date"),
///     r#"datetime(year(datum["date"]), month(datum["date"]), 1, 0, 0, 0, 0)"#
/// );
/// ```
pub fn time_unit_expr(time_unit: &str, field: &str) -> String {
    let datum = accessor("datum", field);
    let mut rest = time_unit.to_string();
    let mut take = |part: &str| {
        if rest.contains(part) {
            rest = rest.replacen(part, "", 1);
            true
        } else {
            false
        }
    };

    // Longer names first: "milliseconds" contains "seconds"
    let milliseconds = take("milliseconds");
    let seconds = take("seconds");
    let minutes = take("minutes");
    let hours = take("hours");
    let quarter = take("quarter");
    let month = take("month");
    let year = take("year");
    let date = take("date");
    let day = take("day") && !(year || quarter || month || date || hours || minutes || seconds);

    let part = |present: bool, func: &str, default: &str| {
        if present {
            format!("{}({})", func, datum)
        } else {
            default.to_string()
        }
    };

    let year_expr = if year {
        part(true, "year", "")
    } else if day {
        "2006".to_string()
    } else {
        "0".to_string()
    };
    let month_expr = if month {
        part(true, "month", "")
    } else if quarter {
        format!("(quarter({})-1)*3", datum)
    } else {
        "0".to_string()
    };
    let date_expr = if date {
        part(true, "date", "")
    } else if day {
        format!("day({})+1", datum)
    } else {
        "1".to_string()
    };

    format!(
        "datetime({}, {}, {}, {}, {}, {}, {})",
        year_expr,
        month_expr,
        date_expr,
        part(hours, "hours", "0"),
        part(minutes, "minutes", "0"),
        part(seconds, "seconds", "0"),
        part(milliseconds, "milliseconds", "0"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::diagnostics::Diagnostics;
    use crate::spec::Spec;
    use serde_json::json;

    fn tree(value: Value) -> ModelTree {
        let spec: Spec = serde_json::from_value(value).unwrap();
        let mut diag = Diagnostics::new();
        ModelTree::build(&spec, Config::default(), &mut diag).unwrap()
    }

    fn names(component: &DataComponent) -> Vec<String> {
        component.sources.iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn test_time_unit_expr() {
        assert_eq!(
            time_unit_expr("month", "date"),
            r#"datetime(0, month(datum["date"]), 1, 0, 0, 0, 0)"#
        );
        assert_eq!(
            time_unit_expr("day", "d"),
            r#"datetime(2006, 0, day(datum["d"])+1, 0, 0, 0, 0)"#
        );
        assert_eq!(
            time_unit_expr("hoursminutes", "t"),
            r#"datetime(0, 0, 1, hours(datum["t"]), minutes(datum["t"]), 0, 0)"#
        );
        assert_eq!(
            time_unit_expr("milliseconds", "t"),
            r#"datetime(0, 0, 1, 0, 0, 0, milliseconds(datum["t"]))"#
        );
    }

    #[test]
    fn test_root_unit_data() {
        let tree = tree(json!({
            "data": {"values": [{"date": "2020-01-01"}]},
            "mark": "point",
            "encoding": {"x": {"field": "date", "timeUnit": "month", "type": "temporal"}}
        }));
        let component = DefaultPipeline.parse(&tree, tree.root());

        assert_eq!(component.source, "main");
        assert_eq!(names(&component), vec!["source_0", "main"]);

        let assembled = DefaultPipeline.assemble(&component);
        assert_eq!(
            assembled[0],
            json!({"name": "source_0", "values": [{"date": "2020-01-01"}]})
        );
        assert_eq!(
            assembled[1],
            json!({
                "name": "main",
                "source": "source_0",
                "transform": [{
                    "type": "formula",
                    "as": "month_date",
                    "expr": "datetime(0, month(datum[\"date\"]), 1, 0, 0, 0, 0)"
                }]
            })
        );
    }

    #[test]
    fn test_aggregate_under_facet_groups_by_facet_fields() {
        let tree = tree(json!({
            "facet": {"column": {"field": "c", "type": "nominal"}},
            "spec": {
                "mark": "bar",
                "encoding": {
                    "x": {"field": "a", "type": "nominal"},
                    "y": {"aggregate": "sum", "field": "b", "type": "quantitative"}
                }
            }
        }));
        let child = tree.node(tree.root()).children[0];

        let facet = DefaultPipeline.parse(&tree, tree.root());
        assert_eq!(
            facet.facet_root,
            Some(FacetRoot {
                name: "facet".to_string(),
                data: "main".to_string()
            })
        );
        assert_eq!(
            names(&facet),
            vec!["source_0", "main", "column", "column_layout"]
        );

        let unit = DefaultPipeline.parse(&tree, child);
        assert_eq!(unit.source, "child_cell_aggregate");
        assert_eq!(unit.input, "child_aggregate");

        let aggregate = json!({
            "type": "aggregate",
            "groupby": ["a", "c"],
            "ops": ["sum"],
            "fields": ["b"],
            "as": ["sum_b"]
        });
        assert_eq!(
            DefaultPipeline.assemble(&unit),
            vec![json!({"name": "child_aggregate", "source": "main", "transform": [aggregate]})]
        );
        assert_eq!(
            DefaultPipeline.assemble_cell(&unit),
            vec![json!({
                "name": "child_cell_aggregate",
                "source": "facet",
                "transform": [aggregate]
            })]
        );
    }

    #[test]
    fn test_layer_in_facet_mixes_raw_and_aggregated_units() {
        let tree = tree(json!({
            "facet": {"column": {"field": "c", "type": "nominal"}},
            "spec": {
                "layer": [
                    {"mark": "point", "encoding": {"y": {"field": "b", "type": "quantitative"}}},
                    {
                        "mark": "line",
                        "encoding": {"y": {"aggregate": "mean", "field": "b", "type": "quantitative"}}
                    }
                ]
            }
        }));
        let layer = tree.node(tree.root()).children[0];
        let units = tree.node(layer).children.clone();

        let facet = DefaultPipeline.parse(&tree, tree.root());
        assert_eq!(facet.facet_root.map(|root| root.data), Some("main".to_string()));

        let raw = DefaultPipeline.parse(&tree, units[0]);
        assert_eq!(raw.source, "facet");
        assert!(raw.cell_sources.is_empty());

        let mean = DefaultPipeline.parse(&tree, units[1]);
        assert_eq!(mean.source, "child_layer_1_cell_aggregate");
        assert_eq!(
            DefaultPipeline.assemble_cell(&mean)[0],
            json!({
                "name": "child_layer_1_cell_aggregate",
                "source": "facet",
                "transform": [{
                    "type": "aggregate",
                    "groupby": ["c"],
                    "ops": ["mean"],
                    "fields": ["b"],
                    "as": ["mean_b"]
                }]
            })
        );
    }

    #[test]
    fn test_column_layout_data() {
        let tree = tree(json!({
            "facet": {"column": {"field": "c", "type": "nominal"}},
            "spec": {"mark": "point"}
        }));
        let facet = DefaultPipeline.parse(&tree, tree.root());
        let assembled = DefaultPipeline.assemble(&facet);

        assert_eq!(
            assembled[3],
            json!({
                "name": "column_layout",
                "source": "column",
                "transform": [{"type": "aggregate", "ops": ["distinct"], "fields": ["c"]}]
            })
        );
    }

    #[test]
    fn test_count_aggregate() {
        let tree = tree(json!({
            "mark": "bar",
            "encoding": {
                "x": {"field": "a", "type": "nominal"},
                "y": {"aggregate": "count", "type": "quantitative"}
            }
        }));
        let component = DefaultPipeline.parse(&tree, tree.root());
        let assembled = DefaultPipeline.assemble(&component);

        assert_eq!(component.source, "aggregate");
        assert_eq!(assembled[2]["transform"][0]["as"], json!(["count_*"]));
        assert_eq!(assembled[2]["transform"][0]["fields"], json!([null]));
    }
}
