//! Encoding channel classification
//!
//! Channels are the visual properties a view can bind data fields to.
//! They fall into a few overlapping groups that drive compilation:
//!
//! - **Positional**: `x`, `y` and their secondary variants `x2`, `y2`. These map to axes.
//! - **Non-positional scale channels**: `color`, `size`, `shape`, `opacity`. These map to legends.
//! - **Facet channels**: `row`, `column`. Only valid on a facet node, they map to headers.
//! - **Plain channels**: `text`, `tooltip`, `detail`. Encoded on marks without a scale.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A visual encoding channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    X,
    Y,
    X2,
    Y2,
    Row,
    Column,
    Color,
    Size,
    Shape,
    Opacity,
    Text,
    Tooltip,
    Detail,
}

/// Primary positional channels (the ones that own scales and axes)
pub const POSITION_SCALE_CHANNELS: &[Channel] = &[Channel::X, Channel::Y];

/// Non-positional channels that own a scale and are shown in legends
pub const NONSPATIAL_SCALE_CHANNELS: &[Channel] = &[
    Channel::Color,
    Channel::Size,
    Channel::Shape,
    Channel::Opacity,
];

/// Every channel that owns a scale, in resolution order
pub const SCALE_CHANNELS: &[Channel] = &[
    Channel::X,
    Channel::Y,
    Channel::Color,
    Channel::Size,
    Channel::Shape,
    Channel::Opacity,
];

/// Channels a facet node may bind
pub const FACET_CHANNELS: &[Channel] = &[Channel::Row, Channel::Column];

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::X => "x",
            Channel::Y => "y",
            Channel::X2 => "x2",
            Channel::Y2 => "y2",
            Channel::Row => "row",
            Channel::Column => "column",
            Channel::Color => "color",
            Channel::Size => "size",
            Channel::Shape => "shape",
            Channel::Opacity => "opacity",
            Channel::Text => "text",
            Channel::Tooltip => "tooltip",
            Channel::Detail => "detail",
        }
    }

    /// Check if channel owns a scale (x, y, color, size, shape, opacity)
    #[inline]
    pub fn is_scale_channel(&self) -> bool {
        SCALE_CHANNELS.contains(self)
    }

    /// Check if channel maps to an axis position (x, y, x2, y2)
    #[inline]
    pub fn is_positional(&self) -> bool {
        matches!(self, Channel::X | Channel::Y | Channel::X2 | Channel::Y2)
    }

    /// Check if channel is a facet channel (row, column)
    #[inline]
    pub fn is_facet(&self) -> bool {
        FACET_CHANNELS.contains(self)
    }

    /// Get the primary channel for a secondary positional channel.
    ///
    /// `x2` shares the `x` scale and `y2` shares the `y` scale. Every other
    /// channel is its own primary.
    #[inline]
    pub fn primary(&self) -> Channel {
        match self {
            Channel::X2 => Channel::X,
            Channel::Y2 => Channel::Y,
            other => *other,
        }
    }

    /// Layout size dimension driven by a positional channel
    pub fn size_type(&self) -> Option<SizeType> {
        match self.primary() {
            Channel::X => Some(SizeType::Width),
            Channel::Y => Some(SizeType::Height),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header channels of a facet grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderChannel {
    Row,
    Column,
}

impl HeaderChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderChannel::Row => "row",
            HeaderChannel::Column => "column",
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            HeaderChannel::Row => Channel::Row,
            HeaderChannel::Column => Channel::Column,
        }
    }

    /// Size of a cell along the header: rows span the cell height, columns its width
    pub fn size_type(&self) -> SizeType {
        match self {
            HeaderChannel::Row => SizeType::Height,
            HeaderChannel::Column => SizeType::Width,
        }
    }

    /// Header that collects axes of the given positional channel
    ///
    /// x axes line up along columns, y axes along rows.
    pub fn for_axis(channel: Channel) -> Option<HeaderChannel> {
        match channel.primary() {
            Channel::X => Some(HeaderChannel::Column),
            Channel::Y => Some(HeaderChannel::Row),
            _ => None,
        }
    }
}

/// Layout size dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SizeType {
    Width,
    Height,
}

impl SizeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeType::Width => "width",
            SizeType::Height => "height",
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            SizeType::Width => Channel::X,
            SizeType::Height => Channel::Y,
        }
    }
}
