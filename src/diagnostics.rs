//! Compile diagnostics
//!
//! User-input problems never abort a compile. They are recorded in a
//! [`Diagnostics`] collector that is threaded explicitly through the compile
//! call, and mirrored as `tracing` warnings.

use crate::spec::Channel;
use serde::Serialize;
use std::fmt;

/// Category of a non-fatal compile problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// A channel bound where it cannot be used (e.g. `x` on a facet)
    IncompatibleChannel,
    /// A field definition without a field name
    EmptyFieldDef,
    /// A selection projecting onto a channel with no field
    CannotProjectOnChannelWithoutField,
    /// A shared guide requested over an independent scale
    IndependentScaleMeansIndependentGuide,
}

/// One recorded problem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Collector for diagnostics produced during one compile
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning
    pub fn warn(&mut self, kind: DiagnosticKind, message: String) {
        tracing::warn!(kind = ?kind, "{}", message);
        self.items.push(Diagnostic { kind, message });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of recorded diagnostics of the given kind
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// Diagnostic message text
pub mod message {
    use super::Channel;

    pub fn incompatible_channel(channel: Channel, target: &str) -> String {
        format!(
            "{} dropped as it is incompatible with \"{}\".",
            channel, target
        )
    }

    pub fn empty_field_def(channel: Channel) -> String {
        format!(
            "Dropping field definition for channel \"{}\" since it has no field.",
            channel
        )
    }

    pub fn cannot_project_on_channel_without_field(channel: Channel) -> String {
        format!(
            "Cannot project a selection on encoding channel \"{}\", which has no field.",
            channel
        )
    }

    pub fn independent_scale_means_independent_guide(channel: Channel) -> String {
        format!(
            "Setting the scale to be independent for \"{}\" means we also have to set the guide (axis or legend) to be independent.",
            channel
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_records_in_order() {
        let mut diag = Diagnostics::new();
        diag.warn(
            DiagnosticKind::IncompatibleChannel,
            message::incompatible_channel(Channel::X, "facet"),
        );
        diag.warn(
            DiagnosticKind::EmptyFieldDef,
            message::empty_field_def(Channel::Row),
        );

        assert_eq!(diag.len(), 2);
        assert_eq!(diag.count(DiagnosticKind::EmptyFieldDef), 1);
        let first = diag.iter().next().unwrap();
        assert_eq!(first.kind, DiagnosticKind::IncompatibleChannel);
        assert!(first.message.contains("\"facet\""));
    }
}
