// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Screen data structures.
//!
//! This module defines the screens that make up a mockup: their identity,
//! their world-space geometry on the canvas, and their generation status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a screen, derived from the backend's numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenId(String);

impl ScreenId {
    pub fn from_server_id(server_id: i64) -> Self {
        Self(format!("screen-{}", server_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Geometry {
    /// Create a geometry, or `None` if either dimension is not positive.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Option<Self> {
        let geometry = Self { x, y, w, h };
        geometry.is_valid().then_some(geometry)
    }

    pub fn is_valid(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.x as i64 + self.w as i64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.h as i64
    }

    /// True if the two rectangles share any area.
    pub fn overlaps(&self, other: &Geometry) -> bool {
        (self.x as i64) < other.right()
            && (other.x as i64) < self.right()
            && (self.y as i64) < other.bottom()
            && (other.y as i64) < self.bottom()
    }
}

/// Generation lifecycle of a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenStatus {
    Pending,
    Generating,
    Ready,
    Failed,
}

impl ScreenStatus {
    /// Whether the lifecycle table allows `self -> to` through a plain
    /// status update. Resetting for a retry is a separate operation.
    pub fn can_transition_to(self, to: ScreenStatus) -> bool {
        matches!(
            (self, to),
            (ScreenStatus::Pending, ScreenStatus::Generating)
                | (ScreenStatus::Generating, ScreenStatus::Ready)
                | (ScreenStatus::Generating, ScreenStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ScreenStatus::Ready | ScreenStatus::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            ScreenStatus::Pending => "Pending",
            ScreenStatus::Generating => "Generating",
            ScreenStatus::Ready => "Ready",
            ScreenStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for ScreenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Generated markup for a ready screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenContent {
    /// Component source as returned by the backend.
    pub code: String,
    /// Self-contained preview document, passed to the renderer unmodified.
    pub html_preview: String,
}

/// Validated description of one screen from the config response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenConfig {
    pub server_id: i64,
    pub name: String,
    pub purpose: String,
    pub description: String,
}

impl ScreenConfig {
    pub fn new(server_id: i64, name: impl Into<String>) -> Self {
        Self {
            server_id,
            name: name.into(),
            purpose: String::new(),
            description: String::new(),
        }
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A screen on the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screen {
    pub id: ScreenId,
    pub server_id: i64,
    pub name: String,
    pub purpose: String,
    pub description: String,
    pub geometry: Geometry,
    pub status: ScreenStatus,
    pub content: Option<ScreenContent>,
}

impl Screen {
    /// Create a pending screen from its config at the given geometry.
    pub fn pending(config: ScreenConfig, geometry: Geometry) -> Self {
        Self {
            id: ScreenId::from_server_id(config.server_id),
            server_id: config.server_id,
            name: config.name,
            purpose: config.purpose,
            description: config.description,
            geometry,
            status: ScreenStatus::Pending,
            content: None,
        }
    }

    /// The config this screen was created from.
    pub fn config(&self) -> ScreenConfig {
        ScreenConfig {
            server_id: self.server_id,
            name: self.name.clone(),
            purpose: self.purpose.clone(),
            description: self.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_rejects_non_positive_size() {
        assert!(Geometry::new(0, 0, 0, 10).is_none());
        assert!(Geometry::new(0, 0, 10, -1).is_none());
        assert!(Geometry::new(-50, -50, 1, 1).is_some());
    }

    #[test]
    fn test_geometry_overlap_is_half_open() {
        let a = Geometry::new(0, 0, 400, 812).unwrap();
        let touching = Geometry::new(400, 0, 400, 812).unwrap();
        let inside = Geometry::new(399, 0, 400, 812).unwrap();
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
    }

    #[test]
    fn test_lifecycle_table() {
        use ScreenStatus::*;
        assert!(Pending.can_transition_to(Generating));
        assert!(Generating.can_transition_to(Ready));
        assert!(Generating.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Generating));
        assert!(!Ready.can_transition_to(Failed));
    }

    #[test]
    fn test_screen_id_is_derived_from_server_id() {
        assert_eq!(ScreenId::from_server_id(7).as_str(), "screen-7");
        let screen = Screen::pending(
            ScreenConfig::new(3, "Login"),
            Geometry::new(0, 0, 400, 812).unwrap(),
        );
        assert_eq!(screen.id, ScreenId::from_server_id(3));
        assert_eq!(screen.status, ScreenStatus::Pending);
        assert!(screen.content.is_none());
    }
}
