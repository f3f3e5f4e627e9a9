//! Per-node component index
//!
//! Each model node owns one [`ComponentIndex`] that the parse phases fill
//! in incrementally. A field is only meaningful once the phase that owns it
//! has run for the node; [`ComponentIndex::ensure`] checks that before
//! assembly reads it.

use super::axis::AxisComponent;
use super::data::DataComponent;
use super::header::LayoutHeaders;
use super::legend::LegendIndex;
use super::scale::ScaleComponent;
use super::selection::SelectionIndex;
use super::Phase;
use crate::spec::{Channel, SizeType};
use crate::{CompileError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Scales owned by a node, keyed by channel
pub type ScaleIndex = BTreeMap<Channel, ScaleComponent>;

/// Axes owned by a node, keyed by positional channel
pub type AxisIndex = BTreeMap<Channel, Vec<AxisComponent>>;

/// Size of a view along one dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeValue {
    /// Declared or configured size in pixels
    Fixed(f64),
    /// Derived from the step of a discrete position scale
    RangeStep,
    /// Derived from the sizes of layered children
    Merged,
}

/// Computed artifacts of one model node
#[derive(Debug, Default)]
pub struct ComponentIndex {
    pub data: Option<DataComponent>,
    pub scales: ScaleIndex,
    pub layout_size: BTreeMap<SizeType, SizeValue>,
    pub selection: SelectionIndex,
    pub mark: Vec<Value>,
    pub axes: AxisIndex,
    pub layout_headers: LayoutHeaders,
    pub legends: LegendIndex,
    completed: Option<Phase>,
}

impl ComponentIndex {
    /// Last parse phase completed for this node
    pub fn completed(&self) -> Option<Phase> {
        self.completed
    }

    pub(crate) fn complete(&mut self, phase: Phase) {
        self.completed = Some(phase);
    }

    /// Fail unless `phase` has been completed for this node
    pub fn ensure(&self, phase: Phase) -> Result<()> {
        match self.completed {
            Some(done) if done >= phase => Ok(()),
            _ => Err(CompileError::Phase(format!(
                "component read before the {:?} phase completed",
                phase
            ))),
        }
    }

    /// Data component, available after the data phase
    pub fn data(&self) -> Result<&DataComponent> {
        self.ensure(Phase::Data)?;
        self.data
            .as_ref()
            .ok_or_else(|| CompileError::Phase("data component missing".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_tracks_phase_order() {
        let mut component = ComponentIndex::default();
        assert!(component.ensure(Phase::Data).is_err());

        component.complete(Phase::Data);
        assert!(component.ensure(Phase::Data).is_ok());
        assert!(component.ensure(Phase::Legend).is_err());

        component.complete(Phase::Legend);
        assert!(component.ensure(Phase::Scale).is_ok());
    }

    #[test]
    fn test_data_requires_data_phase() {
        let component = ComponentIndex::default();
        let err = component.data().unwrap_err();
        assert!(err.to_string().contains("Data"));
    }
}
