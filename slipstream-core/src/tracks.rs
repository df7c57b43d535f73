//! Track selection adapter.
//!
//! Maps the engine's group/stream layout to externally-visible stream
//! descriptors and resolves descriptors back to engine selectors. All
//! functions here are pure; the session actor applies the results to the
//! engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Identifier of the implicit adaptive video pseudo-track.
pub const AUTO_STREAM_ID: &str = "auto";

/// Content kind of a stream group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    Video,
    Audio,
    Subtitle,
}

impl ContentKind {
    fn label(self) -> &'static str {
        match self {
            ContentKind::Video => "Video",
            ContentKind::Audio => "Audio",
            ContentKind::Subtitle => "Subtitle",
        }
    }
}

/// A single stream as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFormat {
    pub id: String,
    pub label: Option<String>,
    pub language: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub channel_count: Option<u32>,
    /// Engine marks one stream per group as the main role
    pub main_role: bool,
}

impl StreamFormat {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            language: None,
            width: None,
            height: None,
            channel_count: None,
            main_role: false,
        }
    }
}

/// Alternative streams of one content kind, in engine order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamGroup {
    pub kind: ContentKind,
    pub streams: Vec<StreamFormat>,
}

/// Engine rule choosing which stream within a group is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamSelector {
    /// Pin one stream by index within its group
    Fixed(usize),
    /// Throughput-history-driven adaptive selection
    Adaptive,
}

/// Externally-visible description of a selectable stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub kind: ContentKind,
    pub id: String,
    pub description: String,
    pub default: bool,
    /// Group the stream lives in; `None` lets resolution fall back to the
    /// first group of the kind
    pub group_index: Option<usize>,
}

impl StreamDescriptor {
    /// Returns true for the implicit adaptive pseudo-track.
    pub fn is_auto(&self) -> bool {
        self.id == AUTO_STREAM_ID
    }
}

fn describe(format: &StreamFormat, kind: ContentKind) -> String {
    let label = format.label.as_deref().unwrap_or("");
    let description = match kind {
        ContentKind::Video => match (format.width, format.height) {
            (Some(w), Some(h)) => format!("{w}x{h} {label}"),
            _ => label.to_string(),
        },
        ContentKind::Audio => {
            let language = format.language.as_deref().unwrap_or("");
            let channels = format
                .channel_count
                .map(|c| c.to_string())
                .unwrap_or_default();
            format!("{language} {channels} {label}")
        }
        ContentKind::Subtitle => label.to_string(),
    };

    let description = description.trim().to_string();
    if description.is_empty() {
        format!("{} {}", kind.label(), format.id)
    } else {
        description
    }
}

/// Derives descriptors for every stream of `kind`, in engine order.
///
/// For video with more than one concrete stream, an implicit "Auto"
/// pseudo-track is appended; it is the default when the group's current
/// selector is adaptive.
pub fn stream_descriptions(
    groups: &[StreamGroup],
    selectors: &[StreamSelector],
    kind: ContentKind,
) -> Vec<StreamDescriptor> {
    let mut descriptors = Vec::new();

    for (group_index, group) in groups.iter().enumerate() {
        if group.kind != kind {
            continue;
        }
        for format in &group.streams {
            descriptors.push(StreamDescriptor {
                kind,
                id: format.id.clone(),
                description: describe(format, kind),
                default: format.main_role,
                group_index: Some(group_index),
            });
        }
    }

    if kind == ContentKind::Video {
        let video_group = groups
            .iter()
            .enumerate()
            .find(|(_, group)| group.kind == ContentKind::Video);
        if let Some((group_index, group)) = video_group {
            if group.streams.len() > 1 {
                let adaptive = selectors.get(group_index) == Some(&StreamSelector::Adaptive);
                descriptors.push(StreamDescriptor {
                    kind,
                    id: AUTO_STREAM_ID.to_string(),
                    description: "Auto".to_string(),
                    default: adaptive,
                    group_index: Some(group_index),
                });
            }
        }
    }

    descriptors
}

/// Resolves a descriptor back to its group index and selector.
///
/// Returns `None` when no stream with the descriptor's id exists in the
/// layout; callers treat that as a fail-soft no-op, not an error.
pub fn resolve_selector(
    groups: &[StreamGroup],
    descriptor: &StreamDescriptor,
) -> Option<(usize, StreamSelector)> {
    let group_index = descriptor
        .group_index
        .filter(|&index| {
            groups
                .get(index)
                .is_some_and(|group| group.kind == descriptor.kind)
        })
        .or_else(|| {
            groups
                .iter()
                .position(|group| group.kind == descriptor.kind)
        })?;
    let group = &groups[group_index];

    if descriptor.is_auto() {
        return Some((group_index, StreamSelector::Adaptive));
    }

    let unique: HashSet<&str> = group.streams.iter().map(|s| s.id.as_str()).collect();
    if unique.len() != group.streams.len() {
        warn!("stream format ids are not unique; stream selection may not be accurate");
    }

    group
        .streams
        .iter()
        .position(|stream| stream.id == descriptor.id)
        .map(|index| (group_index, StreamSelector::Fixed(index)))
}

/// Replaces the selector of one group, yielding the pair to hand to the
/// engine's `set_stream_groups`.
pub fn apply_selection(
    groups: Vec<StreamGroup>,
    mut selectors: Vec<StreamSelector>,
    group_index: usize,
    selector: StreamSelector,
) -> (Vec<StreamGroup>, Vec<StreamSelector>) {
    if let Some(slot) = selectors.get_mut(group_index) {
        *slot = selector;
    } else {
        warn!("selector index {group_index} out of range for {} groups", groups.len());
    }
    (groups, selectors)
}
