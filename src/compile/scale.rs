//! Scales
//!
//! Units build one scale per scale channel they encode. Layer and facet
//! nodes then resolve each channel:
//!
//! - `shared`: the child scales are removed from the children and merged
//!   into one scale held by the resolving node. The first child's
//!   properties win; data domains of later children are unioned in.
//! - `independent`: children keep their own scales. Inside a facet, their
//!   domains are redirected to the per-cell dataset.
//!
//! Nodes find the scale they use by walking up to the nearest holder (see
//! [`ModelTree::scale_name`]).

use super::component::ScaleIndex;
use super::model::{ModelTree, NodeId};
use super::resolve::Resolution;
use super::unit::UnitModel;
use crate::config::Config;
use crate::spec::channel::SCALE_CHANNELS;
use crate::spec::field::{field_ref, FieldRefOption};
use crate::spec::{Channel, FieldDef, FieldType, Mark, ScaleDef, ScaleType, SizeType};
use crate::Result;
use serde_json::{json, Map, Value};

/// Field of a dataset used as (part of) a scale domain
#[derive(Debug, Clone, PartialEq)]
pub struct DataRef {
    pub data: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleDomain {
    /// Explicit domain values
    Values(Vec<Value>),
    /// Union of dataset fields
    Data(Vec<DataRef>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleRange {
    /// Fixed step per domain value; the view size follows the domain
    Step(f64),
    /// Spans the width or height of the owning view
    Size(SizeType),
    /// Named scheme range (`category`, `ordinal`, `ramp`, `symbol`)
    Named(&'static str),
    /// Explicit range
    Values(Value),
}

/// A scale being built for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleComponent {
    pub scale_type: ScaleType,
    pub domain: ScaleDomain,
    pub range: ScaleRange,
    pub padding: Option<f64>,
    pub padding_inner: Option<f64>,
    pub padding_outer: Option<f64>,
    pub zero: Option<bool>,
    pub nice: Option<bool>,
}

impl ScaleComponent {
    /// Union another scale's data domain into this one
    pub fn union_domain(&mut self, other: &ScaleComponent) {
        if let (ScaleDomain::Data(refs), ScaleDomain::Data(other_refs)) =
            (&mut self.domain, &other.domain)
        {
            for data_ref in other_refs {
                if !refs.contains(data_ref) {
                    refs.push(data_ref.clone());
                }
            }
        }
    }

    /// Point domain references at a different dataset
    pub fn rename_data(&mut self, from: &str, to: &str) {
        if let ScaleDomain::Data(refs) = &mut self.domain {
            for data_ref in refs.iter_mut().filter(|r| r.data == from) {
                data_ref.data = to.to_string();
            }
        }
    }

    /// Check if the view size along this scale follows its domain
    pub fn is_step_sized(&self) -> bool {
        self.scale_type.has_discrete_domain() && matches!(self.range, ScaleRange::Step(_))
    }

    /// Output scale definition
    ///
    /// # Arguments
    ///
    /// * `name` - Output name of the scale
    /// * `size_signal` - Size signal of the view holding the scale, per dimension
    pub fn assemble(&self, name: &str, size_signal: impl Fn(SizeType) -> String) -> Value {
        let mut scale = Map::new();
        scale.insert("name".to_string(), json!(name));
        scale.insert("type".to_string(), json!(self.scale_type.as_str()));
        scale.insert("domain".to_string(), self.assemble_domain());

        let range = match &self.range {
            ScaleRange::Step(step) => json!({ "step": step }),
            ScaleRange::Size(SizeType::Width) => {
                json!([0, {"signal": size_signal(SizeType::Width)}])
            }
            ScaleRange::Size(SizeType::Height) => {
                json!([{"signal": size_signal(SizeType::Height)}, 0])
            }
            ScaleRange::Named(scheme) => json!(scheme),
            ScaleRange::Values(values) => values.clone(),
        };
        scale.insert("range".to_string(), range);

        let numbers = [
            ("padding", self.padding),
            ("paddingInner", self.padding_inner),
            ("paddingOuter", self.padding_outer),
        ];
        for (key, value) in numbers {
            if let Some(value) = value {
                scale.insert(key.to_string(), json!(value));
            }
        }
        for (key, value) in [("zero", self.zero), ("nice", self.nice)] {
            if let Some(value) = value {
                scale.insert(key.to_string(), json!(value));
            }
        }

        Value::Object(scale)
    }

    fn assemble_domain(&self) -> Value {
        let refs = match &self.domain {
            ScaleDomain::Values(values) => return json!(values),
            ScaleDomain::Data(refs) => refs,
        };

        let mut domain = match refs.as_slice() {
            [single] => json!({"data": single.data, "field": single.field}),
            [first, ..] if refs.iter().all(|r| r.data == first.data) => json!({
                "data": first.data,
                "fields": refs.iter().map(|r| r.field.clone()).collect::<Vec<_>>()
            }),
            _ => json!({
                "fields": refs
                    .iter()
                    .map(|r| json!({"data": r.data, "field": r.field}))
                    .collect::<Vec<_>>()
            }),
        };
        if self.scale_type.has_discrete_domain() {
            if let Value::Object(obj) = &mut domain {
                obj.insert("sort".to_string(), json!(true));
            }
        }
        domain
    }
}

/// Default scale type of a channel
pub fn default_type(channel: Channel, field_type: FieldType, mark: Mark) -> ScaleType {
    match channel.primary() {
        Channel::X | Channel::Y => match field_type {
            FieldType::Nominal | FieldType::Ordinal => {
                if matches!(mark, Mark::Bar | Mark::Rect) {
                    ScaleType::Band
                } else {
                    ScaleType::Point
                }
            }
            FieldType::Quantitative => ScaleType::Linear,
            FieldType::Temporal => ScaleType::Time,
        },
        Channel::Color if field_type.is_discrete() => ScaleType::Ordinal,
        Channel::Color => ScaleType::Sequential,
        Channel::Size | Channel::Opacity if field_type.is_discrete() => ScaleType::Point,
        Channel::Shape => ScaleType::Ordinal,
        _ => ScaleType::Linear,
    }
}

/// Build a unit's scales from its encoding
pub fn parse_unit_scales(tree: &ModelTree, id: NodeId, unit: &UnitModel) -> Result<ScaleIndex> {
    let input = tree.node(id).component.data()?.input.clone();
    let mut scales = ScaleIndex::new();

    for &channel in SCALE_CHANNELS {
        let Some(fd) = unit.position_field_def(channel) else {
            continue;
        };
        let specified = fd.scale.clone().unwrap_or_default();
        let scale_type = specified
            .scale_type
            .unwrap_or_else(|| default_type(channel, fd.field_type(), unit.mark.mark_type));

        let domain = match &specified.domain {
            Some(values) => ScaleDomain::Values(values.clone()),
            None => ScaleDomain::Data(domain_refs(unit, channel, fd, &input)),
        };

        let range = match &specified.range {
            Some(range) => ScaleRange::Values(range.clone()),
            None => default_range(tree, id, channel, scale_type, fd, &specified),
        };

        let mut scale = ScaleComponent {
            scale_type,
            domain,
            range,
            padding: None,
            padding_inner: None,
            padding_outer: None,
            zero: specified.zero,
            nice: specified.nice,
        };
        if channel.is_positional() {
            apply_padding(&mut scale, &specified, tree.config());
        }

        scales.insert(channel, scale);
    }

    Ok(scales)
}

fn domain_refs(unit: &UnitModel, channel: Channel, fd: &FieldDef, input: &str) -> Vec<DataRef> {
    let mut refs = vec![DataRef {
        data: input.to_string(),
        field: field_ref(fd, FieldRefOption::default()),
    }];

    let secondary = match channel {
        Channel::X => unit.field_def(Channel::X2),
        Channel::Y => unit.field_def(Channel::Y2),
        _ => None,
    };
    if let Some(secondary) = secondary {
        let data_ref = DataRef {
            data: input.to_string(),
            field: field_ref(secondary, FieldRefOption::default()),
        };
        if !refs.contains(&data_ref) {
            refs.push(data_ref);
        }
    }
    refs
}

fn default_range(
    tree: &ModelTree,
    id: NodeId,
    channel: Channel,
    scale_type: ScaleType,
    fd: &FieldDef,
    specified: &ScaleDef,
) -> ScaleRange {
    match channel {
        Channel::X | Channel::Y => {
            let size_type = channel.size_type().unwrap_or(SizeType::Width);
            if scale_type.has_discrete_domain() && tree.declared_size(id, size_type).is_none() {
                ScaleRange::Step(specified.range_step.unwrap_or(tree.config().scale.range_step))
            } else {
                ScaleRange::Size(size_type)
            }
        }
        Channel::Color => match (scale_type, fd.field_type()) {
            (ScaleType::Sequential, _) => ScaleRange::Named("ramp"),
            (_, FieldType::Ordinal) => ScaleRange::Named("ordinal"),
            _ => ScaleRange::Named("category"),
        },
        Channel::Shape => ScaleRange::Named("symbol"),
        Channel::Size => ScaleRange::Values(json!([9, 361])),
        Channel::Opacity => ScaleRange::Values(json!([0.3, 0.8])),
        _ => ScaleRange::Size(SizeType::Width),
    }
}

fn apply_padding(scale: &mut ScaleComponent, specified: &ScaleDef, config: &Config) {
    match scale.scale_type {
        ScaleType::Band => {
            scale.padding_inner = specified
                .padding_inner
                .or(specified.padding)
                .or(Some(config.scale.band_padding_inner));
            scale.padding_outer = specified
                .padding_outer
                .or(specified.padding)
                .or(Some(config.scale.band_padding_outer));
        }
        ScaleType::Point => {
            scale.padding = specified.padding.or(Some(config.scale.point_padding));
            scale.padding_outer = specified.padding_outer;
        }
        _ => {
            scale.padding = specified.padding;
        }
    }
}

/// Resolve child scales of a layer or facet node
pub fn merge_child_scales(tree: &mut ModelTree, id: NodeId) -> Result<()> {
    let children = tree.node(id).children.clone();
    let mut merged = ScaleIndex::new();

    for child in &children {
        let channels: Vec<Channel> = tree
            .node(*child)
            .component
            .scales
            .keys()
            .copied()
            .collect();

        for channel in channels {
            if tree.node(id).resolve.scale(channel) != Resolution::Shared {
                continue;
            }
            let Some(scale) = tree.node_mut(*child).component.scales.remove(&channel) else {
                continue;
            };
            match merged.get_mut(&channel) {
                Some(existing) => existing.union_domain(&scale),
                None => {
                    merged.insert(channel, scale);
                }
            }
        }
    }

    // Scales left inside a facet cell read the cell's records
    let facet_root = tree
        .node(id)
        .as_facet()
        .map(|_| tree.node(id).component.data())
        .transpose()?
        .and_then(|data| data.facet_root.clone());
    if let Some(root) = facet_root {
        let mut renames = vec![(root.data, root.name)];
        for unit in tree.units(id) {
            if tree.facet_ancestor(unit) != Some(id) {
                continue;
            }
            let data = tree.node(unit).component.data()?;
            let rename = (data.input.clone(), data.source.clone());
            if !renames.contains(&rename) {
                renames.push(rename);
            }
        }
        for child in &children {
            for node in tree.pre_order(*child) {
                for scale in tree.node_mut(node).component.scales.values_mut() {
                    for (from, to) in &renames {
                        scale.rename_data(from, to);
                    }
                }
            }
        }
    }

    tree.node_mut(id).component.scales = merged;
    Ok(())
}

/// Output scales of the group a node renders into
pub fn assemble_scales(tree: &ModelTree, id: NodeId) -> Vec<Value> {
    let mut scales = Vec::new();
    for member in tree.group_members(id) {
        let model = tree.node(member);
        for (channel, scale) in &model.component.scales {
            let name = model.get_name(channel.as_str());
            scales.push(scale.assemble(&name, |size| tree.size_signal(member, size)));
        }
    }
    scales
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn band() -> ScaleComponent {
        ScaleComponent {
            scale_type: ScaleType::Band,
            domain: ScaleDomain::Data(vec![DataRef {
                data: "main".to_string(),
                field: "a".to_string(),
            }]),
            range: ScaleRange::Step(21.0),
            padding: None,
            padding_inner: Some(0.1),
            padding_outer: Some(0.05),
            zero: None,
            nice: None,
        }
    }

    #[test]
    fn test_default_types() {
        assert_eq!(
            default_type(Channel::X, FieldType::Nominal, Mark::Bar),
            ScaleType::Band
        );
        assert_eq!(
            default_type(Channel::X, FieldType::Ordinal, Mark::Point),
            ScaleType::Point
        );
        assert_eq!(
            default_type(Channel::Y, FieldType::Temporal, Mark::Line),
            ScaleType::Time
        );
        assert_eq!(
            default_type(Channel::Color, FieldType::Quantitative, Mark::Point),
            ScaleType::Sequential
        );
        assert_eq!(
            default_type(Channel::Size, FieldType::Nominal, Mark::Point),
            ScaleType::Point
        );
    }

    #[test]
    fn test_assemble_band_scale() {
        let scale = band().assemble("x", |size| size.as_str().to_string());
        assert_eq!(
            scale,
            json!({
                "name": "x",
                "type": "band",
                "domain": {"data": "main", "field": "a", "sort": true},
                "range": {"step": 21.0},
                "paddingInner": 0.1,
                "paddingOuter": 0.05
            })
        );
    }

    #[test]
    fn test_union_domain() {
        let mut first = band();
        let mut second = band();
        second.domain = ScaleDomain::Data(vec![
            DataRef {
                data: "main".to_string(),
                field: "a".to_string(),
            },
            DataRef {
                data: "main".to_string(),
                field: "b".to_string(),
            },
        ]);
        first.union_domain(&second);

        let assembled = first.assemble("x", |size| size.as_str().to_string());
        assert_eq!(
            assembled["domain"],
            json!({"data": "main", "fields": ["a", "b"], "sort": true})
        );

        // Different datasets need per-field references
        let mut third = band();
        third.rename_data("main", "layer_1_aggregate");
        first.union_domain(&third);
        let assembled = first.assemble("x", |size| size.as_str().to_string());
        assert_eq!(
            assembled["domain"]["fields"][2],
            json!({"data": "layer_1_aggregate", "field": "a"})
        );
    }

    #[test]
    fn test_continuous_range_spans_view() {
        let mut scale = band();
        scale.scale_type = ScaleType::Linear;
        scale.range = ScaleRange::Size(SizeType::Height);
        scale.padding_inner = None;
        scale.padding_outer = None;

        let assembled = scale.assemble("child_y", |size| format!("child_{}", size.as_str()));
        assert_eq!(assembled["range"], json!([{"signal": "child_height"}, 0]));
        assert_eq!(assembled["domain"], json!({"data": "main", "field": "a"}));
        assert!(!scale.is_step_sized());
    }
}
