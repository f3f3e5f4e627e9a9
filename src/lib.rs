/*!
# vlcompile - view composition compiler

Compiles a hierarchical, declarative visualization specification into a
single low-level Vega rendering specification.

## Example

```rust
use vlcompile::compile_str;

let compiled = compile_str(r#"{
    "data": {"values": [{"a": "x", "b": 1}, {"a": "y", "b": 2}]},
    "facet": {"column": {"field": "a", "type": "nominal"}},
    "spec": {
        "mark": "point",
        "encoding": {"y": {"field": "b", "type": "quantitative"}}
    }
}"#).unwrap();

assert_eq!(compiled.spec["layout"]["columns"]["signal"],
           r#"data('column_layout')[0]["distinct_a"]"#);
```

## Architecture

Views nest: unit views (one mark, one encoding) are composed by layering
and faceting. The compiler builds a tree of model nodes and runs it through
two phases:

- **Parse** (bottom-up, phase by phase across the whole tree): data, scales,
  layout sizes, selections, marks, axes and headers, legends. Composite nodes
  resolve per channel whether their children share a scale, axis or legend,
  and promote shared artifacts to themselves.
- **Assemble** (top-down from the root): the populated components are turned
  into the output `data`, `signals`, `layout`, `marks`, `scales`, `axes` and
  `legends`.

## Core Components

- [`spec`] - Input specification types
- [`compile`] - Model tree, traversal driver and per-variant compile logic
- [`naming`] - Generated identifier conventions
- [`diagnostics`] - Non-fatal compile problems
- [`config`] - Compile configuration
*/

pub mod compile;
pub mod config;
pub mod diagnostics;
pub mod naming;
pub mod spec;

pub use compile::{compile, compile_str, Compiled, Compiler, DataPipeline};
pub use config::Config;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use spec::{Channel, Spec};

/// Main library error type
///
/// User-input problems are reported as [`Diagnostic`]s instead; these errors
/// mean the input could not be read or the compiler was driven incorrectly.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error("Invalid specification: {0}")]
    InvalidSpec(String),

    #[error("Malformed view tree: {0}")]
    Structure(String),

    #[error("Compile phase error: {0}")]
    Phase(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
