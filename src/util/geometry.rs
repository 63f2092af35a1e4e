// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Coordinate transformations between world and render space.
//!
//! Screens are stored in world coordinates, which have no notion of where
//! the canvas surface puts its origin. The canvas surface draws in render
//! coordinates, which are world coordinates shifted by a fixed centering
//! offset so the working region sits in the middle of the surface.

use crate::models::{Geometry, ScreenId};
use serde::{Deserialize, Serialize};

/// Default centering offset, placing world (0, 0) in the middle of a
/// 4000 x 4000 render surface.
pub const DEFAULT_OFFSET: i32 = 2000;

/// An integer point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Fixed additive offset between world and render coordinates.
///
/// Arithmetic wraps, so `to_world(to_render(p)) == p` for every point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateSpace {
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Default for CoordinateSpace {
    fn default() -> Self {
        Self::new(DEFAULT_OFFSET, DEFAULT_OFFSET)
    }
}

impl CoordinateSpace {
    pub fn new(offset_x: i32, offset_y: i32) -> Self {
        Self { offset_x, offset_y }
    }

    /// Convert a world point to render coordinates.
    pub fn to_render(&self, world: Point) -> Point {
        Point {
            x: world.x.wrapping_add(self.offset_x),
            y: world.y.wrapping_add(self.offset_y),
        }
    }

    /// Convert a render point back to world coordinates.
    pub fn to_world(&self, render: Point) -> Point {
        Point {
            x: render.x.wrapping_sub(self.offset_x),
            y: render.y.wrapping_sub(self.offset_y),
        }
    }

    /// Render-space rectangle for a stored geometry. Size is unaffected.
    pub fn to_render_geometry(&self, world: &Geometry) -> Geometry {
        let origin = self.to_render(Point::new(world.x, world.y));
        Geometry {
            x: origin.x,
            y: origin.y,
            ..*world
        }
    }

    /// World-space geometry for a drag/resize report.
    ///
    /// Returns `None` when the reported size is not positive.
    pub fn to_world_geometry(&self, report: &DragReport) -> Option<Geometry> {
        let origin = self.to_world(Point::new(report.render_x, report.render_y));
        Geometry::new(origin.x, origin.y, report.render_w, report.render_h)
    }
}

/// Position and size reported by the drag/resize collaborator, in render
/// coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragReport {
    pub id: ScreenId,
    pub render_x: i32,
    pub render_y: i32,
    pub render_w: i32,
    pub render_h: i32,
}
