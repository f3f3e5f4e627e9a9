use serde_json::{json, Value};
use std::rc::Rc;
use vlcompile::compile::Compiler;
use vlcompile::{compile_str, CompileError, DiagnosticKind, Diagnostics, Spec};

fn compile(value: Value) -> vlcompile::Compiled {
    Compiler::new().compile_value(value).unwrap()
}

fn find_named<'a>(items: &'a Value, name: &str) -> Option<&'a Value> {
    items
        .as_array()?
        .iter()
        .find(|item| item["name"] == name)
}

fn names(items: &Value) -> Vec<&str> {
    items
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["name"].as_str()).collect())
        .unwrap_or_default()
}

#[test]
fn test_bar_chart() {
    let compiled = compile(json!({
        "data": {"values": [{"a": "A", "b": 28}, {"a": "B", "b": 55}]},
        "mark": "bar",
        "encoding": {
            "x": {"field": "a", "type": "ordinal"},
            "y": {"field": "b", "type": "quantitative"}
        }
    }));
    let spec = &compiled.spec;

    assert!(compiled.diagnostics.is_empty());
    assert_eq!(names(&spec["data"]), vec!["source_0", "main"]);
    assert_eq!(
        spec["data"][0]["values"],
        json!([{"a": "A", "b": 28}, {"a": "B", "b": 55}])
    );
    assert_eq!(
        find_named(&spec["signals"], "width"),
        Some(&json!({"name": "width", "update": "bandspace(domain('x').length, 0.1, 0.05) * 21"}))
    );
    assert_eq!(
        find_named(&spec["signals"], "height"),
        Some(&json!({"name": "height", "update": "200"}))
    );
    assert_eq!(names(&spec["scales"]), vec!["x", "y"]);
    assert_eq!(spec["marks"][0]["name"], "marks");
    assert_eq!(spec["marks"][0]["from"], json!({"data": "main"}));
}

#[test]
fn test_crossed_facet_cell() {
    let compiled = compile(json!({
        "facet": {
            "row": {"field": "r", "type": "nominal"},
            "column": {"field": "c", "type": "nominal"}
        },
        "spec": {
            "mark": "point",
            "encoding": {"x": {"field": "a", "type": "quantitative"}}
        }
    }));
    let spec = &compiled.spec;

    assert_eq!(
        names(&spec["data"]),
        vec!["source_0", "main", "row", "column", "column_layout"]
    );
    let cell = find_named(&spec["marks"], "cell").unwrap();
    assert_eq!(cell["from"]["facet"]["aggregate"], json!({"cross": true}));
    assert_eq!(cell["from"]["facet"]["groupby"], json!(["r", "c"]));
    assert_eq!(cell["sort"]["order"], json!(["ascending", "ascending"]));

    // The cell contains the replicated unit
    assert_eq!(cell["marks"][0]["name"], "child_marks");
    assert_eq!(cell["marks"][0]["from"], json!({"data": "facet"}));
}

#[test]
fn test_single_channel_facet_is_not_crossed() {
    let compiled = compile(json!({
        "facet": {"row": {"field": "r", "type": "nominal"}},
        "spec": {"mark": "point"}
    }));
    let cell = find_named(&compiled.spec["marks"], "cell").unwrap();

    assert!(cell["from"]["facet"].get("aggregate").is_none());
    assert!(cell.get("sort").is_none());
    assert_eq!(compiled.spec["layout"]["columns"], json!(1));
}

#[test]
fn test_shared_axes_move_to_headers() {
    let compiled = compile(json!({
        "facet": {"row": {"field": "r", "type": "nominal"}},
        "spec": {
            "mark": "point",
            "encoding": {
                "x": {"field": "a", "type": "quantitative"},
                "y": {"field": "b", "type": "quantitative"}
            }
        }
    }));
    let marks = &compiled.spec["marks"];

    let cell = find_named(marks, "cell").unwrap();
    assert!(cell.get("axes").is_none());

    let footer = find_named(marks, "column_footer").unwrap();
    assert_eq!(footer["role"], "column-footer");
    assert_eq!(footer["axes"].as_array().map(Vec::len), Some(1));
    assert_eq!(footer["axes"][0]["scale"], "x");
    assert_eq!(footer["axes"][0]["orient"], "bottom");
    assert_eq!(footer["encode"]["update"]["width"], json!({"signal": "child_width"}));

    let header = find_named(marks, "row_header").unwrap();
    assert_eq!(header["axes"][0]["orient"], "left");
    assert_eq!(header["from"], json!({"data": "row"}));
    assert_eq!(header["title"]["text"], json!({"signal": "''+parent[\"r\"]"}));

    // One scale per channel, owned by the facet and spanning every cell
    assert_eq!(names(&compiled.spec["scales"]), vec!["x", "y"]);
    assert_eq!(compiled.spec["scales"][0]["domain"]["data"], "main");
}

#[test]
fn test_independent_scale_stays_in_cell() {
    let compiled = compile(json!({
        "facet": {"column": {"field": "c", "type": "nominal"}},
        "spec": {
            "mark": "point",
            "encoding": {
                "x": {"field": "a", "type": "quantitative"},
                "y": {"field": "b", "type": "quantitative"}
            }
        },
        "resolve": {"scale": {"y": "independent"}}
    }));
    let spec = &compiled.spec;
    assert!(compiled.diagnostics.is_empty());

    assert_eq!(names(&spec["scales"]), vec!["x"]);
    let cell = find_named(&spec["marks"], "cell").unwrap();
    assert_eq!(names(&cell["scales"]), vec!["child_y"]);
    assert_eq!(cell["scales"][0]["domain"]["data"], "facet");
    assert_eq!(cell["axes"][0]["scale"], "child_y");
}

#[test]
fn test_shared_axis_over_independent_scale_is_reported() {
    let compiled = compile(json!({
        "layer": [
            {"mark": "line", "encoding": {"y": {"field": "a", "type": "quantitative"}}},
            {"mark": "line", "encoding": {"y": {"field": "b", "type": "quantitative"}}}
        ],
        "resolve": {"scale": {"y": "independent"}, "axis": {"y": "shared"}}
    }));

    let kinds: Vec<DiagnosticKind> = compiled.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::IndependentScaleMeansIndependentGuide]);

    let orients: Vec<&str> = compiled.spec["axes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|axis| axis["orient"].as_str())
        .collect();
    assert_eq!(orients, vec!["left", "right"]);
}

#[test]
fn test_nested_facet_title() {
    let compiled = compile(json!({
        "facet": {"row": {"field": "a", "type": "nominal", "header": {"title": "A"}}},
        "spec": {
            "facet": {"row": {"field": "b", "type": "nominal", "header": {"title": "B"}}},
            "spec": {"mark": "point"}
        }
    }));
    let title = find_named(&compiled.spec["marks"], "row_title").unwrap();

    assert_eq!(title["marks"][0]["encode"]["update"]["text"], json!({"value": "A / B"}));

    let cell = find_named(&compiled.spec["marks"], "cell").unwrap();
    assert!(find_named(&cell["marks"], "child_row_title").is_none());
    assert!(find_named(&cell["marks"], "child_row_header").is_some());
}

#[test]
fn test_layer_shares_one_legend() {
    let compiled = compile(json!({
        "layer": [
            {"mark": "point", "encoding": {"color": {"field": "c", "type": "nominal"}}},
            {"mark": "point", "encoding": {"color": {"field": "c", "type": "nominal"}}}
        ]
    }));

    assert_eq!(compiled.spec["legends"].as_array().map(Vec::len), Some(1));
    assert_eq!(compiled.spec["legends"][0]["stroke"], "color");
}

#[test]
fn test_interval_projection_over_time_unit() {
    let compiled = compile(json!({
        "mark": "point",
        "selection": {"brush": {"type": "interval"}},
        "encoding": {
            "x": {"field": "date", "type": "temporal", "timeUnit": "month"},
            "y": {"field": "b", "type": "quantitative"}
        }
    }));
    let signals = &compiled.spec["signals"];

    assert!(compiled.diagnostics.is_empty());
    assert!(find_named(signals, "brush_month_date").is_some());
    assert!(find_named(signals, "brush_b").is_some());
    assert!(find_named(signals, "unit").is_some());
    assert_eq!(
        find_named(signals, "brush"),
        Some(&json!({"name": "brush", "update": "data(\"brush_store\")"}))
    );

    let tuple = find_named(signals, "brush_tuple").unwrap();
    assert_eq!(
        tuple["on"][0]["update"],
        "{unit: \"\", intervals: [{encoding: \"x\", field: \"month_date\", extent: brush_month_date}, {encoding: \"y\", field: \"b\", extent: brush_b}]}"
    );
    assert!(find_named(&compiled.spec["data"], "brush_store").is_some());
}

#[test]
fn test_point_selection_adds_identifier() {
    let compiled = compile(json!({
        "mark": "point",
        "selection": {"pick": {"type": "single"}},
        "encoding": {"x": {"field": "a", "type": "quantitative"}}
    }));
    let main = find_named(&compiled.spec["data"], "main").unwrap();

    assert_eq!(main["transform"][0], json!({"type": "identifier", "as": "_vgsid_"}));
}

#[test]
fn test_facet_aliases_child_selections() {
    let spec: Spec = serde_json::from_value(json!({
        "facet": {"row": {"field": "r", "type": "nominal"}},
        "spec": {
            "layer": [
                {"mark": "point", "selection": {"s": {"type": "single"}}},
                {"mark": "line"}
            ]
        }
    }))
    .unwrap();
    let compiler = Compiler::new();
    let mut diag = Diagnostics::new();
    let mut tree = compiler.build(&spec, &mut diag).unwrap();
    compiler.parse(&mut tree, &mut diag).unwrap();

    let root = tree.root();
    let layer = tree.node(root).children[0];
    let unit = tree.node(layer).children[0];

    let at_root = &tree.node(root).component.selection["s"];
    let at_layer = &tree.node(layer).component.selection["s"];
    let at_unit = &tree.node(unit).component.selection["s"];
    assert!(Rc::ptr_eq(at_root, at_layer));
    assert!(Rc::ptr_eq(at_root, at_unit));

    // A change through one handle is seen through all of them
    at_unit.borrow_mut().events = "dblclick".to_string();
    assert_eq!(at_root.borrow().events, "dblclick");
}

#[test]
fn test_compile_is_deterministic() {
    let value = json!({
        "data": {"url": "data/cars.json"},
        "facet": {
            "row": {"field": "Origin", "type": "nominal"},
            "column": {"field": "Cylinders", "type": "ordinal"}
        },
        "spec": {
            "layer": [
                {
                    "mark": "point",
                    "selection": {"brush": {"type": "interval"}},
                    "encoding": {
                        "x": {"field": "Horsepower", "type": "quantitative"},
                        "y": {"field": "Miles_per_Gallon", "type": "quantitative"},
                        "color": {"field": "Origin", "type": "nominal"}
                    }
                },
                {
                    "mark": "rule",
                    "encoding": {"y": {"aggregate": "mean", "field": "Miles_per_Gallon"}}
                }
            ]
        }
    });

    let first = serde_json::to_string(&compile(value.clone()).spec).unwrap();
    let second = serde_json::to_string(&compile(value).spec).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_layered_facet_aggregates_inside_each_cell() {
    let compiled = compile(json!({
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
    let spec = &compiled.spec;

    let cell = find_named(&spec["marks"], "cell").unwrap();
    assert_eq!(cell["from"]["facet"]["data"], "main");
    assert_eq!(
        cell["data"],
        json!([{
            "name": "child_layer_1_cell_aggregate",
            "source": "facet",
            "transform": [{
                "type": "aggregate",
                "groupby": ["c"],
                "ops": ["mean"],
                "fields": ["b"],
                "as": ["mean_b"]
            }]
        }])
    );

    let points = find_named(&cell["marks"], "child_layer_0_marks").unwrap();
    assert_eq!(points["from"], json!({"data": "facet"}));
    let line = find_named(&cell["marks"], "child_layer_1_marks").unwrap();
    assert_eq!(line["from"], json!({"data": "child_layer_1_cell_aggregate"}));

    // The root-level aggregate feeds the y scale shared across cells
    assert!(find_named(&spec["data"], "child_layer_1_aggregate").is_some());
    assert_eq!(names(&spec["scales"]), vec!["y"]);
    assert!(spec["scales"][0]["domain"]
        .to_string()
        .contains("child_layer_1_aggregate"));
}

#[test]
fn test_independent_scale_in_cell_reads_cell_aggregate() {
    let compiled = compile(json!({
        "facet": {"column": {"field": "c", "type": "nominal"}},
        "spec": {
            "mark": "bar",
            "encoding": {
                "x": {"field": "a", "type": "nominal"},
                "y": {"aggregate": "sum", "field": "b", "type": "quantitative"}
            }
        },
        "resolve": {"scale": {"y": "independent"}}
    }));
    let cell = find_named(&compiled.spec["marks"], "cell").unwrap();

    assert_eq!(names(&cell["data"]), vec!["child_cell_aggregate"]);
    assert_eq!(names(&cell["scales"]), vec!["child_y"]);
    assert_eq!(cell["scales"][0]["domain"]["data"], "child_cell_aggregate");
}

#[test]
fn test_sibling_views_with_the_same_name_emit_distinct_identifiers() {
    let compiled = compile(json!({
        "layer": [
            {"name": "v", "mark": "point", "encoding": {"x": {"field": "a", "type": "quantitative"}}},
            {"name": "v", "mark": "point", "encoding": {"x": {"field": "b", "type": "quantitative"}}}
        ],
        "resolve": {"scale": {"x": "independent"}}
    }));
    let spec = &compiled.spec;

    assert_eq!(names(&spec["scales"]), vec!["v_x", "v_2_x"]);

    let signals = names(&spec["signals"]);
    let mut unique = signals.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), signals.len());
    assert!(signals.contains(&"v_2_width"));
}

#[test]
fn test_diagnostics_do_not_abort() {
    let compiled = compile(json!({
        "mark": "bar",
        "encoding": {
            "x": {"field": "a", "type": "nominal"},
            "shape": {"field": "s", "type": "nominal"},
            "color": {"type": "nominal"}
        }
    }));

    let kinds: Vec<DiagnosticKind> = compiled.diagnostics.iter().map(|d| d.kind).collect();
    assert!(kinds.contains(&DiagnosticKind::IncompatibleChannel));
    assert!(kinds.contains(&DiagnosticKind::EmptyFieldDef));
    assert_eq!(names(&compiled.spec["scales"]), vec!["x"]);
}

#[test]
fn test_invalid_input() {
    assert!(matches!(
        Compiler::new().compile_value(json!([1, 2])),
        Err(CompileError::InvalidSpec(_))
    ));
    assert!(matches!(compile_str("{\"data\": {}}"), Err(CompileError::Json(_))));
    assert!(compile_str("{").is_err());
    assert!(matches!(
        Compiler::new().compile_value(json!({"layer": []})),
        Err(CompileError::Structure(_))
    ));
}

#[test]
fn test_assemble_requires_parse() {
    let spec: Spec = serde_json::from_value(json!({"mark": "point"})).unwrap();
    let compiler = Compiler::new();
    let mut diag = Diagnostics::new();
    let tree = compiler.build(&spec, &mut diag).unwrap();

    assert!(matches!(compiler.assemble(&tree), Err(CompileError::Phase(_))));
}
