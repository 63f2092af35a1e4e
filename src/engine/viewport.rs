// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Zoom and pan state of the canvas view.
//!
//! The transform maps render coordinates onto the widget:
//! `screen = origin + render * scale`. Pan is unbounded; scale is clamped
//! to the configured range.

use serde::{Deserialize, Serialize};

/// Zoom limits and initial view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Relative change per zoom step.
    pub step: f32,
    pub initial_scale: f32,
    pub initial_origin_x: f32,
    pub initial_origin_y: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.4,
            max_scale: 4.0,
            step: 0.1,
            initial_scale: 0.7,
            initial_origin_x: 0.0,
            initial_origin_y: 0.0,
        }
    }
}

impl ViewportConfig {
    /// Bounds are finite with `0 < min_scale <= max_scale` and the step
    /// is positive.
    pub fn is_valid(&self) -> bool {
        let finite = [
            self.min_scale,
            self.max_scale,
            self.step,
            self.initial_scale,
            self.initial_origin_x,
            self.initial_origin_y,
        ]
        .iter()
        .all(|v| v.is_finite());
        finite && self.min_scale > 0.0 && self.min_scale <= self.max_scale && self.step > 0.0
    }

    fn clamp_scale(&self, scale: f32) -> f32 {
        if scale.is_finite() {
            scale.clamp(self.min_scale, self.max_scale)
        } else {
            self.initial_scale.clamp(self.min_scale, self.max_scale)
        }
    }
}

/// Current transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub scale: f32,
    pub origin_x: f32,
    pub origin_y: f32,
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    config: ViewportConfig,
    state: ViewportState,
    /// Widget size, used to pin button zooms to the view center.
    viewport_size: (f32, f32),
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportController {
    /// Create a controller; an invalid config falls back to the defaults.
    pub fn new(config: ViewportConfig) -> Self {
        let config = if config.is_valid() {
            config
        } else {
            log::warn!("Invalid viewport settings {:?}, using defaults", config);
            ViewportConfig::default()
        };
        Self {
            state: Self::initial_state(&config),
            config,
            viewport_size: (0.0, 0.0),
        }
    }

    fn initial_state(config: &ViewportConfig) -> ViewportState {
        ViewportState {
            scale: config.clamp_scale(config.initial_scale),
            origin_x: config.initial_origin_x,
            origin_y: config.initial_origin_y,
        }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn scale(&self) -> f32 {
        self.state.scale
    }

    pub fn set_viewport_size(&mut self, width: f32, height: f32) {
        self.viewport_size = (width.max(0.0), height.max(0.0));
    }

    /// Zoom in one step around the view center.
    pub fn zoom_in(&mut self) {
        let (cx, cy) = self.center();
        self.zoom_at(1.0 + self.config.step, cx, cy);
    }

    /// Zoom out one step around the view center.
    pub fn zoom_out(&mut self) {
        let (cx, cy) = self.center();
        self.zoom_at(1.0 / (1.0 + self.config.step), cx, cy);
    }

    /// Multiply the scale by `factor`, keeping the render point under
    /// `(focal_x, focal_y)` fixed on screen.
    pub fn zoom_at(&mut self, factor: f32, focal_x: f32, focal_y: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let (anchor_x, anchor_y) = self.screen_to_render(focal_x, focal_y);
        let scale = self.config.clamp_scale(self.state.scale * factor);

        self.state.scale = scale;
        self.state.origin_x = focal_x - anchor_x * scale;
        self.state.origin_y = focal_y - anchor_y * scale;
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.state.origin_x += dx;
        self.state.origin_y += dy;
    }

    /// Accept a raw transform from the pan/zoom collaborator.
    pub fn set_transform(&mut self, scale: f32, origin_x: f32, origin_y: f32) {
        self.state = ViewportState {
            scale: self.config.clamp_scale(scale),
            origin_x,
            origin_y,
        };
    }

    /// Restore the configured initial view.
    pub fn reset(&mut self) {
        self.state = Self::initial_state(&self.config);
    }

    pub fn screen_to_render(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.state.origin_x) / self.state.scale,
            (y - self.state.origin_y) / self.state.scale,
        )
    }

    pub fn render_to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.state.origin_x + x * self.state.scale,
            self.state.origin_y + y * self.state.scale,
        )
    }

    fn center(&self) -> (f32, f32) {
        (self.viewport_size.0 / 2.0, self.viewport_size.1 / 2.0)
    }
}
