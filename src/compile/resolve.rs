//! Resolution registry
//!
//! Per node, per channel decision of whether children share a scale, axis
//! or legend (`shared`) or keep their own (`independent`).
//!
//! Defaults:
//! - a bare registry (unit views) resolves scales `independent` and guides `shared`
//! - layer and facet nodes resolve scales `shared` unless overridden
//! - guides follow their scale: an `independent` scale forces an
//!   `independent` axis or legend on the same channel

use crate::diagnostics::{message, DiagnosticKind, Diagnostics};
use crate::spec::channel::{NONSPATIAL_SCALE_CHANNELS, POSITION_SCALE_CHANNELS, SCALE_CHANNELS};
use crate::spec::{Channel, ResolveDef};
use std::collections::BTreeMap;

pub use crate::spec::Resolution;

/// Resolvable aspect of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResolveAspect {
    Scale,
    Axis,
    Legend,
}

/// Decision table of one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveMapping {
    entries: BTreeMap<(ResolveAspect, Channel), Resolution>,
}

impl ResolveMapping {
    /// Look up a decision, falling back to the registry default
    pub fn get(&self, aspect: ResolveAspect, channel: Channel) -> Resolution {
        let channel = channel.primary();
        if let Some(resolution) = self.entries.get(&(aspect, channel)) {
            return *resolution;
        }
        match aspect {
            ResolveAspect::Scale => Resolution::Independent,
            ResolveAspect::Axis | ResolveAspect::Legend => Resolution::Shared,
        }
    }

    pub fn set(&mut self, aspect: ResolveAspect, channel: Channel, resolution: Resolution) {
        self.entries.insert((aspect, channel.primary()), resolution);
    }

    pub fn scale(&self, channel: Channel) -> Resolution {
        self.get(ResolveAspect::Scale, channel)
    }

    pub fn axis(&self, channel: Channel) -> Resolution {
        self.get(ResolveAspect::Axis, channel)
    }

    pub fn legend(&self, channel: Channel) -> Resolution {
        self.get(ResolveAspect::Legend, channel)
    }
}

/// Registry of a layer or facet node, from explicit overrides plus structural defaults
pub fn init_composite_resolve(def: &ResolveDef, diag: &mut Diagnostics) -> ResolveMapping {
    let mut mapping = ResolveMapping::default();

    for &channel in SCALE_CHANNELS {
        let scale = def
            .scale
            .get(&channel)
            .copied()
            .unwrap_or(Resolution::Shared);
        mapping.set(ResolveAspect::Scale, channel, scale);

        let (aspect, specified) = if POSITION_SCALE_CHANNELS.contains(&channel) {
            (ResolveAspect::Axis, def.axis.get(&channel).copied())
        } else if NONSPATIAL_SCALE_CHANNELS.contains(&channel) {
            (ResolveAspect::Legend, def.legend.get(&channel).copied())
        } else {
            continue;
        };

        let guide = match (scale, specified) {
            (Resolution::Independent, Some(Resolution::Shared)) => {
                diag.warn(
                    DiagnosticKind::IndependentScaleMeansIndependentGuide,
                    message::independent_scale_means_independent_guide(channel),
                );
                Resolution::Independent
            }
            (Resolution::Independent, _) => Resolution::Independent,
            (Resolution::Shared, specified) => specified.unwrap_or(Resolution::Shared),
        };
        mapping.set(aspect, channel, guide);
    }

    mapping
}
