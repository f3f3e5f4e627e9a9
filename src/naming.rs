//! Generated identifier conventions
//!
//! Every data source, signal, scale and mark name the compiler emits is
//! derived here from a node's structural name. Other stages of the rendering
//! pipeline look these names up verbatim, so the formats are contracts.
//!
//! Names never depend on counters tied to call order, which keeps compiling
//! the same tree twice byte-identical.

/// Name of the raw input data source
pub const SOURCE: &str = "source_0";

/// Name of the root-level derived data source every view reads from
pub const MAIN: &str = "main";

/// Prefix of the distinct-count field in a layout-cardinality data source
pub const DISTINCT_PREFIX: &str = "distinct";

/// Field holding the per-datum identifier used by point selections
pub const SELECTION_ID: &str = "_vgsid_";

/// Signal tracking the group under the pointer during interval selection
pub const UNIT_SIGNAL: &str = "unit";

/// Vega schema the assembled output conforms to
pub const VEGA_SCHEMA: &str = "https://vega.github.io/schema/vega/v3.0.json";

/// Prefix a node-local name with the node's name.
///
/// The root node is usually unnamed, in which case the local name is used as-is.
///
/// ```
/// use vlcompile::naming::get_name;
///
/// assert_eq!(get_name("", "width"), "width");
/// assert_eq!(get_name("child", "width"), "child_width");
/// ```
pub fn get_name(node_name: &str, text: &str) -> String {
    if node_name.is_empty() {
        text.to_string()
    } else {
        format!("{}_{}", node_name, text)
    }
}

/// Local name of the i-th child of a layer
pub fn layer_child(index: usize) -> String {
    format!("layer_{}", index)
}

/// Local name of the single child of a facet
pub const FACET_CHILD: &str = "child";

/// Per-node layout-cardinality data source, derived from the node's
/// `<name>_column` header data.
pub fn layout_data(channel_name: &str) -> String {
    format!("{}_layout", channel_name)
}

/// Dataset holding a unit's aggregated records
pub fn aggregate_data(node_name: &str) -> String {
    get_name(node_name, "aggregate")
}

/// Dataset holding a unit's aggregated records within one facet cell
pub fn cell_aggregate_data(node_name: &str) -> String {
    get_name(node_name, "cell_aggregate")
}

/// Store data source of a selection
pub fn selection_store(selection: &str) -> String {
    format!("{}_store", selection)
}

/// Signal carrying the tuple a selection event produced
pub fn selection_tuple(selection: &str) -> String {
    format!("{}_tuple", selection)
}

/// Signal applying a selection tuple to its store
pub fn selection_modify(selection: &str) -> String {
    format!("{}_modify", selection)
}

/// Signal recording whether a multi selection toggles
pub fn selection_toggle(selection: &str) -> String {
    format!("{}_toggle", selection)
}

/// Convert an arbitrary string (field name) into a valid signal identifier
pub fn var_name(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
