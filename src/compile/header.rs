//! Facet headers
//!
//! A facet lays out a title, a header and a footer along each of its row
//! and column channels. The header carries the facet value labels; shared
//! child axes are moved into the header (top/left) or footer
//! (bottom/right) so they are drawn once per row or column instead of once
//! per cell.

use super::model::{ModelTree, NodeId};
use crate::spec::field::accessor;
use crate::spec::{AxisOrient, HeaderChannel};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Header slot along a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderType {
    Header,
    Footer,
}

impl HeaderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderType::Header => "header",
            HeaderType::Footer => "footer",
        }
    }

    /// Slot an axis of the given orientation is drawn in
    pub fn from_orient(orient: AxisOrient) -> Self {
        match orient {
            AxisOrient::Top | AxisOrient::Left => HeaderType::Header,
            AxisOrient::Bottom | AxisOrient::Right => HeaderType::Footer,
        }
    }
}

/// One header or footer region
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderComponent {
    /// Whether facet value labels are drawn
    pub labels: bool,
    /// Size signal of the replicated view along the header
    pub size_signal: String,
    /// Axes promoted from the facet's child
    pub axes: Vec<Map<String, Value>>,
}

/// Title, labels and header/footer regions of one facet channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutHeader {
    pub title: Option<String>,
    /// Label expression of a facet value, read from `parent`
    pub field_ref: Option<String>,
    /// Output field of the facet channel
    pub field: Option<String>,
    pub header: Vec<HeaderComponent>,
    pub footer: Vec<HeaderComponent>,
}

impl LayoutHeader {
    pub fn components(&self, header_type: HeaderType) -> &[HeaderComponent] {
        match header_type {
            HeaderType::Header => &self.header,
            HeaderType::Footer => &self.footer,
        }
    }

    pub fn components_mut(&mut self, header_type: HeaderType) -> &mut Vec<HeaderComponent> {
        match header_type {
            HeaderType::Header => &mut self.header,
            HeaderType::Footer => &mut self.footer,
        }
    }
}

pub type LayoutHeaders = BTreeMap<HeaderChannel, LayoutHeader>;

/// Combine a facet title with the title its child computed for the same
/// channel; the child's title is cleared.
pub fn merge_title(title: &str, child: &mut LayoutHeader) -> String {
    match child.title.take() {
        Some(child_title) if !child_title.is_empty() => format!("{} / {}", title, child_title),
        _ => title.to_string(),
    }
}

/// Title, header and footer group marks of a node
pub fn assemble_header_marks(tree: &ModelTree, id: NodeId) -> Vec<Value> {
    let model = tree.node(id);
    let mut marks = Vec::new();

    for channel in [HeaderChannel::Row, HeaderChannel::Column] {
        let Some(layout_header) = model.component.layout_headers.get(&channel) else {
            continue;
        };

        if let Some(title) = &layout_header.title {
            marks.push(title_group(&model.get_name(&format!("{}_title", channel.as_str())), channel, title));
        }

        for header_type in [HeaderType::Header, HeaderType::Footer] {
            for component in layout_header.components(header_type) {
                marks.push(header_group(
                    tree,
                    id,
                    channel,
                    header_type,
                    layout_header,
                    component,
                ));
            }
        }
    }

    marks
}

fn title_group(name: &str, channel: HeaderChannel, title: &str) -> Value {
    let mut update = Map::new();
    update.insert("text".to_string(), json!({"value": title}));
    update.insert("align".to_string(), json!({"value": "center"}));
    if channel == HeaderChannel::Row {
        update.insert("angle".to_string(), json!({"value": 270}));
    }

    json!({
        "name": name,
        "type": "group",
        "role": format!("{}-title", channel.as_str()),
        "marks": [{
            "type": "text",
            "role": format!("{}-title-text", channel.as_str()),
            "style": "guide-title",
            "encode": {"update": update}
        }]
    })
}

fn header_group(
    tree: &ModelTree,
    id: NodeId,
    channel: HeaderChannel,
    header_type: HeaderType,
    layout_header: &LayoutHeader,
    component: &HeaderComponent,
) -> Value {
    let model = tree.node(id);
    let mut group = Map::new();
    group.insert(
        "name".to_string(),
        json!(model.get_name(&format!("{}_{}", channel.as_str(), header_type.as_str()))),
    );
    group.insert("type".to_string(), json!("group"));
    group.insert(
        "role".to_string(),
        json!(format!("{}-{}", channel.as_str(), header_type.as_str())),
    );

    if let Some(field) = &layout_header.field {
        group.insert("from".to_string(), json!({"data": model.get_name(channel.as_str())}));
        group.insert(
            "sort".to_string(),
            json!({"field": accessor("datum", field), "order": "ascending"}),
        );
    }

    if let (true, Some(field_ref)) = (component.labels, &layout_header.field_ref) {
        let mut title = Map::new();
        title.insert("text".to_string(), json!({"signal": field_ref}));
        title.insert("offset".to_string(), json!(10));
        title.insert(
            "orient".to_string(),
            json!(match channel {
                HeaderChannel::Row => "left",
                HeaderChannel::Column => "top",
            }),
        );
        title.insert("style".to_string(), json!("guide-label"));
        if channel == HeaderChannel::Row {
            title.insert(
                "encode".to_string(),
                json!({"update": {"angle": {"value": 0}}}),
            );
        }
        group.insert("title".to_string(), Value::Object(title));
    }

    if !component.size_signal.is_empty() {
        let mut update = Map::new();
        update.insert(
            channel.size_type().as_str().to_string(),
            json!({"signal": component.size_signal}),
        );
        group.insert("encode".to_string(), json!({ "update": update }));
    }

    if !component.axes.is_empty() {
        let axes: Vec<Value> = component.axes.iter().cloned().map(Value::Object).collect();
        group.insert("axes".to_string(), Value::Array(axes));
    }

    Value::Object(group)
}
