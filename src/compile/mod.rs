//! View composition compiler
//!
//! Turns an input [`Spec`] tree into a single Vega specification.
//!
//! # Architecture
//!
//! - [`ModelTree`] owns every model node in an arena; nodes refer to their
//!   parent through a non-owning [`NodeId`].
//! - Parsing runs phase by phase over the whole tree (see [`Phase`]); each
//!   phase completes for every node before the next begins.
//! - Assembly walks top-down from the root once every phase has run.
//!
//! # Example
//!
//! ```rust
//! use vlcompile::{Compiler, Spec};
//!
//! let spec = Spec::from_json(r#"{
//!     "data": {"values": [{"a": "x", "b": 3}]},
//!     "mark": "bar",
//!     "encoding": {
//!         "x": {"field": "a", "type": "nominal"},
//!         "y": {"field": "b", "type": "quantitative"}
//!     }
//! }"#).unwrap();
//!
//! let compiled = Compiler::new().compile(&spec).unwrap();
//! assert_eq!(compiled.spec["marks"][0]["type"], "rect");
//! assert!(compiled.diagnostics.is_empty());
//! ```

pub mod axis;
pub mod component;
pub mod data;
pub mod facet;
pub mod header;
pub mod layer;
pub mod layout;
pub mod legend;
pub mod mark;
pub mod model;
pub mod resolve;
pub mod scale;
pub mod selection;
pub mod unit;

pub use component::ComponentIndex;
pub use data::{DataComponent, DataPipeline, DefaultPipeline};
pub use model::{Model, ModelKind, ModelTree, NodeId};

use crate::config::Config;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::spec::Spec;
use crate::{CompileError, Result};
use serde_json::Value;

/// Parse phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Data,
    Scale,
    LayoutSize,
    Selection,
    MarkGroup,
    AxisAndHeader,
    Legend,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Data,
        Phase::Scale,
        Phase::LayoutSize,
        Phase::Selection,
        Phase::MarkGroup,
        Phase::AxisAndHeader,
        Phase::Legend,
    ];

    /// Phase that must run after this one
    pub fn next(self) -> Option<Phase> {
        let index = Phase::ALL.iter().position(|p| *p == self)?;
        Phase::ALL.get(index + 1).copied()
    }

    pub fn first() -> Phase {
        Phase::Data
    }

    pub fn last() -> Phase {
        Phase::Legend
    }
}

/// Result of a compile
#[derive(Debug, Clone)]
pub struct Compiled {
    /// Assembled Vega specification
    pub spec: Value,
    /// Non-fatal problems found while compiling, in the order they were found
    pub diagnostics: Vec<Diagnostic>,
}

/// Compiler driver
///
/// Holds the pluggable data pipeline and the fallback configuration used
/// when the input spec carries none.
pub struct Compiler {
    pipeline: Box<dyn DataPipeline>,
    config: Config,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            pipeline: Box::new(DefaultPipeline),
            config: Config::default(),
        }
    }

    /// Replace the data pipeline builder
    pub fn with_pipeline(mut self, pipeline: impl DataPipeline + 'static) -> Self {
        self.pipeline = Box::new(pipeline);
        self
    }

    /// Configuration used when the root spec has no `config`
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Build the model tree of a spec without parsing it
    pub fn build(&self, spec: &Spec, diag: &mut Diagnostics) -> Result<ModelTree> {
        let config = spec.config().cloned().unwrap_or_else(|| self.config.clone());
        ModelTree::build(spec, config, diag)
    }

    /// Run every remaining parse phase over the tree
    pub fn parse(&self, tree: &mut ModelTree, diag: &mut Diagnostics) -> Result<()> {
        let mut phase = match tree.parsed() {
            None => Some(Phase::first()),
            Some(done) => done.next(),
        };
        while let Some(current) = phase {
            tree.run_phase(current, self.pipeline.as_ref(), diag)?;
            phase = current.next();
        }
        Ok(())
    }

    /// Assemble a fully parsed tree
    pub fn assemble(&self, tree: &ModelTree) -> Result<Value> {
        tree.assemble(self.pipeline.as_ref())
    }

    /// Compile a spec into a Vega specification
    pub fn compile(&self, spec: &Spec) -> Result<Compiled> {
        let mut diag = Diagnostics::new();

        let mut tree = self.build(spec, &mut diag)?;
        tracing::debug!(nodes = tree.len(), "Built model tree");

        self.parse(&mut tree, &mut diag)?;
        let output = self.assemble(&tree)?;

        Ok(Compiled {
            spec: output,
            diagnostics: diag.into_vec(),
        })
    }

    /// Compile a spec given as a JSON value
    pub fn compile_value(&self, value: Value) -> Result<Compiled> {
        let spec = Spec::try_from(value).map_err(CompileError::InvalidSpec)?;
        self.compile(&spec)
    }
}

/// Compile a spec with the default compiler
pub fn compile(spec: &Spec) -> Result<Compiled> {
    Compiler::new().compile(spec)
}

/// Parse and compile a JSON spec with the default compiler
pub fn compile_str(json: &str) -> Result<Compiled> {
    let spec = Spec::from_json(json)?;
    compile(&spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_phase_order() {
        assert_eq!(Phase::first().next(), Some(Phase::Scale));
        assert_eq!(Phase::AxisAndHeader.next(), Some(Phase::Legend));
        assert_eq!(Phase::last().next(), None);
        assert!(Phase::Data < Phase::Legend);
    }

    #[test]
    fn test_compile_value_rejects_unknown_view() {
        let err = Compiler::new()
            .compile_value(json!({"encoding": {}}))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidSpec(_)));
    }

    #[test]
    fn test_assemble_before_parse_fails() {
        let compiler = Compiler::new();
        let spec: Spec = serde_json::from_value(json!({"mark": "point"})).unwrap();
        let mut diag = Diagnostics::new();
        let mut tree = compiler.build(&spec, &mut diag).unwrap();

        assert!(matches!(
            compiler.assemble(&tree),
            Err(CompileError::Phase(_))
        ));

        // A partially parsed tree is still rejected
        tree.run_phase(Phase::Data, &DefaultPipeline, &mut diag)
            .unwrap();
        assert!(compiler.assemble(&tree).is_err());

        compiler.parse(&mut tree, &mut diag).unwrap();
        assert!(compiler.assemble(&tree).is_ok());
    }

    #[test]
    fn test_phases_cannot_be_skipped() {
        let spec: Spec = serde_json::from_value(json!({"mark": "point"})).unwrap();
        let mut diag = Diagnostics::new();
        let mut tree = Compiler::new().build(&spec, &mut diag).unwrap();

        let err = tree
            .run_phase(Phase::Scale, &DefaultPipeline, &mut diag)
            .unwrap_err();
        assert!(matches!(err, CompileError::Phase(_)));
    }

    #[test]
    fn test_config_from_spec_wins() {
        let compiled = compile_str(
            r#"{
                "mark": "point",
                "config": {"cell": {"width": 320}}
            }"#,
        )
        .unwrap();
        let signals = compiled.spec["signals"].as_array().unwrap();
        let width = signals.iter().find(|s| s["name"] == "width").unwrap();
        assert_eq!(width["update"], "320");
    }
}
