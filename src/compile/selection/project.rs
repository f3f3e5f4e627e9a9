//! Selection projections
//!
//! A projection lists the data fields a selection's tuples record. Fields
//! come either straight from `fields` or from the field bound to each
//! channel in `encodings`; the latter also remember their channel so
//! interval selections can map pixel extents back through the scale.

use super::SelectionComponent;
use crate::diagnostics::{message, DiagnosticKind, Diagnostics};
use crate::spec::field::{field_ref, FieldRefOption};
use crate::spec::{Channel, FieldDef, SelectionDef};

/// One projected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectEntry {
    pub field: String,
    /// Channel the field was projected through, if any
    pub encoding: Option<Channel>,
}

/// Check if a selection names what it projects over
pub fn has(def: &SelectionDef) -> bool {
    def.fields.is_some() || def.encodings.is_some()
}

/// Field a channel projects over: the derived name for time units, the raw
/// field otherwise.
fn projected_field(fd: &FieldDef) -> String {
    match (&fd.time_unit, &fd.field) {
        (None, Some(field)) => field.clone(),
        _ => field_ref(fd, FieldRefOption::default()),
    }
}

/// Append the projection of `def` to a selection component.
///
/// Entries are keyed by field; a field named twice keeps its first position
/// and the channel of its last mention. Channels without a field are
/// reported and skipped.
pub fn parse<'a>(
    field_def: impl Fn(Channel) -> Option<&'a FieldDef>,
    def: &SelectionDef,
    component: &mut SelectionComponent,
    diag: &mut Diagnostics,
) {
    let mut entries: Vec<ProjectEntry> = Vec::new();
    let mut upsert = |field: String, encoding: Option<Channel>| {
        match entries.iter_mut().find(|entry| entry.field == field) {
            Some(entry) => entry.encoding = encoding.or(entry.encoding),
            None => entries.push(ProjectEntry { field, encoding }),
        }
    };

    for field in def.fields.iter().flatten() {
        upsert(field.clone(), None);
    }

    for &channel in def.encodings.iter().flatten() {
        match field_def(channel) {
            Some(fd) => upsert(projected_field(fd), Some(channel)),
            None => diag.warn(
                DiagnosticKind::CannotProjectOnChannelWithoutField,
                message::cannot_project_on_channel_without_field(channel),
            ),
        }
    }

    component.project.extend(entries);
    component.fields = component
        .project
        .iter()
        .filter_map(|entry| entry.encoding.map(|channel| (channel, entry.field.clone())))
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{FieldType, SelectionType};
    use std::collections::BTreeMap;

    fn component() -> SelectionComponent {
        SelectionComponent {
            name: "brush".to_string(),
            selection_type: SelectionType::Interval,
            unit: String::new(),
            events: String::new(),
            project: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    fn selection(value: serde_json::Value) -> SelectionDef {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_project_encodings() {
        let mut encoding = BTreeMap::new();
        encoding.insert(
            Channel::X,
            FieldDef::new("date", FieldType::Temporal).with_time_unit("month"),
        );
        encoding.insert(Channel::Y, FieldDef::new("b", FieldType::Quantitative));

        let def = selection(serde_json::json!({"type": "interval", "encodings": ["x", "y"]}));
        let mut cmpt = component();
        let mut diag = Diagnostics::new();
        parse(|ch| encoding.get(&ch), &def, &mut cmpt, &mut diag);

        assert!(diag.is_empty());
        assert_eq!(
            cmpt.project,
            vec![
                ProjectEntry {
                    field: "month_date".to_string(),
                    encoding: Some(Channel::X)
                },
                ProjectEntry {
                    field: "b".to_string(),
                    encoding: Some(Channel::Y)
                },
            ]
        );
        assert_eq!(cmpt.fields[&Channel::X], "month_date");
        assert_eq!(cmpt.fields[&Channel::Y], "b");
    }

    #[test]
    fn test_project_channel_without_field() {
        let encoding: BTreeMap<Channel, FieldDef> = BTreeMap::new();
        let def = selection(serde_json::json!({"type": "single", "fields": ["a"], "encodings": ["color"]}));
        let mut cmpt = component();
        let mut diag = Diagnostics::new();
        parse(|ch| encoding.get(&ch), &def, &mut cmpt, &mut diag);

        assert_eq!(
            diag.count(DiagnosticKind::CannotProjectOnChannelWithoutField),
            1
        );
        assert_eq!(
            cmpt.project,
            vec![ProjectEntry {
                field: "a".to_string(),
                encoding: None
            }]
        );
        assert!(cmpt.fields.is_empty());
    }

    #[test]
    fn test_field_named_twice_keeps_position() {
        let mut encoding = BTreeMap::new();
        encoding.insert(Channel::Color, FieldDef::new("a", FieldType::Nominal));

        let def = selection(serde_json::json!({"type": "multi", "fields": ["a", "b"], "encodings": ["color"]}));
        let mut cmpt = component();
        let mut diag = Diagnostics::new();
        parse(|ch| encoding.get(&ch), &def, &mut cmpt, &mut diag);

        let fields: Vec<&str> = cmpt.project.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "b"]);
        assert_eq!(cmpt.project[0].encoding, Some(Channel::Color));
        assert_eq!(cmpt.fields[&Channel::Color], "a");
    }
}
