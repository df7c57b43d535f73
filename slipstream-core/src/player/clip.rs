//! Clip descriptors and DRM scheme mapping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// DRM descriptor attached to a clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrmDescription {
    /// Scheme name as published in clip catalogs ("playready", "widevine")
    pub scheme: Option<String>,
    pub license_url: String,
    /// Extra headers forwarded with license requests
    #[serde(default)]
    pub key_request_properties: HashMap<String, String>,
}

/// Immutable description of a playable clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipDefinition {
    pub title: Option<String>,
    pub url: String,
    /// Ordered DRM descriptors; the first one selects the scheme,
    /// an empty list means clear content
    #[serde(default)]
    pub drm: Vec<DrmDescription>,
}

impl ClipDefinition {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            title: None,
            url: url.into(),
            drm: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_drm(mut self, drm: DrmDescription) -> Self {
        self.drm.push(drm);
        self
    }

    /// First DRM descriptor, the one an engine build uses.
    pub fn drm_info(&self) -> Option<&DrmDescription> {
        self.drm.first()
    }
}

/// Maps a catalog DRM scheme name to the engine key-system identifier.
///
/// Unknown schemes pass through unchanged so new key systems keep working
/// without a mapping entry; `None` means clear content.
pub fn scheme_to_key_system(scheme: Option<&str>) -> Option<String> {
    match scheme {
        Some("playready") => Some("com.microsoft.playready".to_string()),
        Some("widevine") => Some("com.widevine.alpha".to_string()),
        Some(other) => {
            warn!("no key system conversion defined for scheme {other}");
            Some(other.to_string())
        }
        None => None,
    }
}
