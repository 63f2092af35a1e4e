// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pannable, zoomable canvas showing the generated screens.
//!
//! Screens are stored in world coordinates. The canvas converts them to
//! render coordinates with the [`CoordinateSpace`] and then to widget
//! pixels with the [`ViewportController`]. Dragging a screen or its resize
//! handle produces [`DragReport`]s in render coordinates, which the app
//! hands back to the registry.

use crate::engine::{RegistrySnapshot, ViewportController};
use crate::models::{Geometry, Screen, ScreenId, ScreenStatus};
use crate::util::geometry::{CoordinateSpace, DragReport};

/// Smallest width or height a resize can produce, in render units.
const MIN_SCREEN_SIZE: f32 = 50.0;

/// Side of the resize handle, in pixels.
const HANDLE_SIZE: f32 = 12.0;

/// Result of canvas interaction.
pub enum CanvasAction {
    None,
    Select(ScreenId),
    Deselect,
    Drag(DragReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Move,
    Resize,
}

/// A screen being moved or resized. Position and size are kept as floats
/// in render units so slow drags at high zoom still accumulate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenDrag {
    pub id: ScreenId,
    pub mode: DragMode,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

impl ScreenDrag {
    pub fn start(id: ScreenId, mode: DragMode, render: &Geometry) -> Self {
        Self {
            id,
            mode,
            x: render.x as f32,
            y: render.y as f32,
            w: render.w as f32,
            h: render.h as f32,
        }
    }

    /// Apply a pointer delta already divided by the zoom scale.
    pub fn apply(&mut self, dx: f32, dy: f32) {
        match self.mode {
            DragMode::Move => {
                self.x += dx;
                self.y += dy;
            }
            DragMode::Resize => {
                self.w = (self.w + dx).max(MIN_SCREEN_SIZE);
                self.h = (self.h + dy).max(MIN_SCREEN_SIZE);
            }
        }
    }

    pub fn report(&self) -> DragReport {
        DragReport {
            id: self.id.clone(),
            render_x: self.x.round() as i32,
            render_y: self.y.round() as i32,
            render_w: self.w.round() as i32,
            render_h: self.h.round() as i32,
        }
    }
}

/// Display the canvas and handle pan, zoom, selection and drags.
pub fn show(
    ui: &mut egui::Ui,
    snapshot: &RegistrySnapshot,
    space: &CoordinateSpace,
    viewport: &mut ViewportController,
    selected: Option<&ScreenId>,
    drag: &mut Option<ScreenDrag>,
) -> CanvasAction {
    let mut action = CanvasAction::None;

    let (rect, background) = ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
    viewport.set_viewport_size(rect.width(), rect.height());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, egui::Color32::from_gray(40));

    // Render surface bounds
    let surface = Geometry {
        x: 0,
        y: 0,
        w: space.offset_x.saturating_mul(2),
        h: space.offset_y.saturating_mul(2),
    };
    painter.rect_filled(
        screen_rect(viewport, rect.min, &surface),
        0.0,
        egui::Color32::from_gray(48),
    );

    if snapshot.project.is_none() && snapshot.screens.is_empty() {
        draw_welcome(&painter, rect);
    }

    for screen in &snapshot.screens {
        let render = space.to_render_geometry(&screen.geometry);
        let body = screen_rect(viewport, rect.min, &render);
        if !body.intersects(rect) {
            continue;
        }

        draw_screen(&painter, screen, body, selected == Some(&screen.id));

        let body_response = ui.interact(
            body,
            egui::Id::new(("screen", screen.id.as_str())),
            egui::Sense::click_and_drag(),
        );
        let handle = egui::Rect::from_min_size(
            body.max - egui::vec2(HANDLE_SIZE, HANDLE_SIZE),
            egui::vec2(HANDLE_SIZE, HANDLE_SIZE),
        );
        let handle_response = ui.interact(
            handle,
            egui::Id::new(("resize", screen.id.as_str())),
            egui::Sense::drag(),
        );
        if selected == Some(&screen.id) {
            painter.rect_filled(handle, 2.0, egui::Color32::LIGHT_BLUE);
        }
        if handle_response.hovered() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeNwSe);
        }

        if handle_response.drag_started() {
            *drag = Some(ScreenDrag::start(screen.id.clone(), DragMode::Resize, &render));
            action = CanvasAction::Select(screen.id.clone());
        } else if body_response.drag_started() {
            *drag = Some(ScreenDrag::start(screen.id.clone(), DragMode::Move, &render));
            action = CanvasAction::Select(screen.id.clone());
        } else if body_response.clicked() {
            action = CanvasAction::Select(screen.id.clone());
        }

        let delta = if handle_response.dragged() {
            handle_response.drag_delta()
        } else if body_response.dragged() {
            body_response.drag_delta()
        } else {
            egui::Vec2::ZERO
        };
        if let Some(active) = drag.as_mut().filter(|d| d.id == screen.id) {
            if delta != egui::Vec2::ZERO {
                let scale = viewport.scale();
                active.apply(delta.x / scale, delta.y / scale);
                action = CanvasAction::Drag(active.report());
            }
        }
        if handle_response.drag_stopped() || body_response.drag_stopped() {
            *drag = None;
        }
    }

    // Background interactions: pan, zoom, deselect
    if background.dragged() && drag.is_none() {
        let delta = background.drag_delta();
        viewport.pan_by(delta.x, delta.y);
    }
    if background.clicked() {
        action = CanvasAction::Deselect;
    }
    if let Some(pointer) = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p)) {
        let scroll = ui.input(|i| i.smooth_scroll_delta.y);
        let pinch = ui.input(|i| i.zoom_delta());
        let factor = if pinch != 1.0 {
            pinch
        } else if scroll > 0.0 {
            1.0 + viewport.config().step
        } else if scroll < 0.0 {
            1.0 / (1.0 + viewport.config().step)
        } else {
            1.0
        };
        if factor != 1.0 {
            let focal = pointer - rect.min;
            viewport.zoom_at(factor, focal.x, focal.y);
        }
    }

    action
}

/// Widget-space rectangle for a render-space geometry.
fn screen_rect(viewport: &ViewportController, min: egui::Pos2, render: &Geometry) -> egui::Rect {
    let (x0, y0) = viewport.render_to_screen(render.x as f32, render.y as f32);
    let (x1, y1) = viewport.render_to_screen(render.right() as f32, render.bottom() as f32);
    egui::Rect::from_min_max(min + egui::vec2(x0, y0), min + egui::vec2(x1, y1))
}

fn status_color(status: ScreenStatus) -> egui::Color32 {
    match status {
        ScreenStatus::Pending => egui::Color32::from_gray(90),
        ScreenStatus::Generating => egui::Color32::from_rgb(70, 110, 170),
        ScreenStatus::Ready => egui::Color32::from_rgb(80, 160, 100),
        ScreenStatus::Failed => egui::Color32::from_rgb(190, 70, 70),
    }
}

/// Draw one screen frame with its title and a preview of its markup.
fn draw_screen(painter: &egui::Painter, screen: &Screen, body: egui::Rect, is_selected: bool) {
    let fill = match screen.status {
        ScreenStatus::Ready => egui::Color32::from_gray(235),
        _ => egui::Color32::from_gray(60),
    };
    painter.rect_filled(body, 6.0, fill);

    let stroke = if is_selected {
        egui::Stroke::new(3.0, egui::Color32::LIGHT_BLUE)
    } else {
        egui::Stroke::new(2.0, status_color(screen.status))
    };
    painter.rect_stroke(body, 6.0, stroke);

    painter.text(
        body.left_top() - egui::vec2(0.0, 4.0),
        egui::Align2::LEFT_BOTTOM,
        format!("{}  ·  {}", screen.name, screen.status),
        egui::FontId::proportional(14.0),
        egui::Color32::from_gray(210),
    );

    let inner = body.shrink(8.0);
    let clipped = painter.with_clip_rect(inner.intersect(painter.clip_rect()));
    match (&screen.status, &screen.content) {
        (ScreenStatus::Ready, Some(content)) => {
            let preview: String = content.html_preview.lines().take(60).collect::<Vec<_>>().join("\n");
            clipped.text(
                inner.left_top(),
                egui::Align2::LEFT_TOP,
                preview,
                egui::FontId::monospace(10.0),
                egui::Color32::from_gray(40),
            );
        }
        (status, _) => {
            let text = match status {
                ScreenStatus::Pending => "Waiting...",
                ScreenStatus::Generating => "Generating...",
                ScreenStatus::Failed => "Generation failed",
                ScreenStatus::Ready => "",
            };
            clipped.text(
                inner.center(),
                egui::Align2::CENTER_CENTER,
                text,
                egui::FontId::proportional(16.0),
                status_color(*status),
            );
        }
    }
}

/// Show welcome message when no project exists.
fn draw_welcome(painter: &egui::Painter, rect: egui::Rect) {
    let center = rect.center();
    painter.text(
        center - egui::vec2(0.0, 30.0),
        egui::Align2::CENTER_CENTER,
        "Mockup Canvas",
        egui::FontId::proportional(32.0),
        egui::Color32::from_gray(200),
    );
    painter.text(
        center + egui::vec2(0.0, 10.0),
        egui::Align2::CENTER_CENTER,
        "Describe an app in the toolbar and press Generate",
        egui::FontId::proportional(14.0),
        egui::Color32::from_gray(150),
    );
}
