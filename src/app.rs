// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait. It owns the tokio runtime that drives generation
//! runs, reads a registry snapshot every frame and routes panel actions
//! to the orchestrator and registry.

use crate::config::AppConfig;
use crate::engine::{
    DeviceChange, GenerationEvent, GenerationOrchestrator, RegistrySnapshot, ScreenRegistry,
    SharedRegistry, ViewportController,
};
use crate::io::api;
use crate::io::client::HttpBackend;
use crate::models::{DeviceClass, ScreenConfig, ScreenId};
use crate::ui::{canvas, progress, properties, toolbar};
use crate::util::geometry::CoordinateSpace;
use anyhow::{Context, Result};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, MutexGuard};
use std::time::Duration;

/// Gap between the widget's top-left corner and world (0, 0) after a view
/// reset, in pixels.
const VIEW_MARGIN: f32 = 40.0;

/// Main application state.
pub struct MockupApp {
    /// Runtime for backend requests
    runtime: tokio::runtime::Runtime,

    orchestrator: Arc<GenerationOrchestrator<HttpBackend>>,

    registry: SharedRegistry,

    /// Progress events from the orchestrator
    events: Receiver<GenerationEvent>,

    /// Errors reported by background tasks
    notices: Receiver<String>,
    notice_sender: Sender<String>,

    viewport: ViewportController,

    space: CoordinateSpace,

    /// Prompt text being edited
    prompt: String,

    /// Device class for the next run
    device: DeviceClass,

    selected: Option<ScreenId>,

    /// Screen currently being moved or resized
    drag: Option<canvas::ScreenDrag>,

    /// Outcome of the last run
    status_message: Option<String>,

    /// Error shown until dismissed
    banner: Option<String>,
}

impl MockupApp {
    /// Create the application from loaded settings.
    pub fn new(config: AppConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("mockup-canvas-worker")
            .build()
            .context("Failed to start async runtime")?;

        let backend = HttpBackend::new(config.backend.clone()).context("Invalid backend settings")?;
        log::info!("Using backend at {}", backend.base_url());

        let registry = ScreenRegistry::shared();
        let (event_sender, events) = channel();
        let orchestrator = Arc::new(
            GenerationOrchestrator::new(Arc::new(backend), Arc::clone(&registry), config.generation)
                .with_events(event_sender),
        );
        let (notice_sender, notices) = channel();

        let mut app = Self {
            runtime,
            orchestrator,
            registry,
            events,
            notices,
            notice_sender,
            viewport: ViewportController::new(config.viewport),
            space: config.canvas,
            prompt: String::new(),
            device: DeviceClass::default(),
            selected: None,
            drag: None,
            status_message: None,
            banner: None,
        };
        app.reset_view();
        app.check_backend();
        Ok(app)
    }

    fn lock_registry(&self) -> MutexGuard<'_, ScreenRegistry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Restore the configured zoom and bring world (0, 0) near the
    /// top-left corner.
    fn reset_view(&mut self) {
        self.viewport.reset();
        let scale = self.viewport.scale();
        self.viewport.pan_by(
            VIEW_MARGIN - self.space.offset_x as f32 * scale,
            VIEW_MARGIN - self.space.offset_y as f32 * scale,
        );
    }

    /// Report an unreachable backend once at startup.
    fn check_backend(&self) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let notices = self.notice_sender.clone();
        self.runtime.spawn(async move {
            match orchestrator.check_health().await {
                Ok(()) => log::info!("Backend is healthy"),
                Err(e) => {
                    log::warn!("Backend health check failed: {}", e);
                    let _ = notices.send(format!("Backend unavailable: {}", e));
                }
            }
        });
    }

    /// Start a generation run for the current prompt in the background.
    fn start_generation(&mut self) {
        if let Err(len) = api::validate_prompt(&self.prompt) {
            self.banner = Some(format!(
                "Prompt must be {} to {} characters (got {})",
                api::MIN_PROMPT_CHARS,
                api::MAX_PROMPT_CHARS,
                len
            ));
            return;
        }

        self.banner = None;
        self.status_message = None;
        self.selected = None;
        self.drag = None;

        let orchestrator = Arc::clone(&self.orchestrator);
        let prompt = self.prompt.clone();
        let device = self.device;
        self.runtime.spawn(async move {
            // Outcomes are reported through progress events
            if let Err(e) = orchestrator.generate(&prompt, device).await {
                log::debug!("Generation ended early: {}", e);
            }
        });
    }

    /// Generate one screen outside a full run.
    fn generate_screen(&self, id: ScreenId) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let notices = self.notice_sender.clone();
        self.runtime.spawn(async move {
            match orchestrator.retry_screen(&id).await {
                Ok(status) => log::info!("Generation of {} finished as {}", id, status),
                Err(e) => {
                    log::warn!("Generation of {} failed: {}", id, e);
                    let _ = notices.send(format!("Could not generate {}: {}", id, e));
                }
            }
        });
    }

    fn change_device(&mut self, device: DeviceClass) {
        if self.lock_registry().project().is_none() {
            self.device = device;
            return;
        }
        match self.orchestrator.change_device(device) {
            DeviceChange::Applied => {
                self.device = device;
                log::info!("Device changed to {}", device);
            }
            DeviceChange::Rejected => {
                self.banner = Some("Device cannot change while screens are generating".to_string());
            }
        }
    }

    fn add_blank_screen(&mut self) {
        let result = {
            let mut registry = self.lock_registry();
            let next = registry.len() as i64 + 1;
            let project_name = registry.project().map(|p| p.name.clone()).unwrap_or_default();
            let config = ScreenConfig::new(next, format!("Screen {}", next))
                .with_purpose("Additional screen")
                .with_description(format!("Another screen for {}", project_name));
            registry.add_screen(config, None)
        };
        match result {
            Ok(id) => self.selected = Some(id),
            Err(e) => self.banner = Some(format!("Could not add screen: {}", e)),
        }
    }

    fn duplicate_screen(&mut self, source: &ScreenId) {
        let result = {
            let mut registry = self.lock_registry();
            match registry.get(source).map(|s| s.config()) {
                Some(original) => {
                    let config = ScreenConfig::new(original.server_id, format!("{} copy", original.name))
                        .with_purpose(original.purpose)
                        .with_description(original.description);
                    registry.add_screen(config, Some(source))
                }
                None => return,
            }
        };
        match result {
            Ok(id) => self.selected = Some(id),
            Err(e) => self.banner = Some(format!("Could not duplicate screen: {}", e)),
        }
    }

    fn new_project(&mut self) {
        self.orchestrator.reset_project();
        self.selected = None;
        self.drag = None;
        self.status_message = None;
        self.banner = None;
        log::info!("Project cleared");
    }

    /// Fold pending progress events and notices into the status line.
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                GenerationEvent::ConfigFetching => {
                    self.status_message = None;
                }
                GenerationEvent::ConfigFailed { message } => {
                    self.banner = Some(format!("Could not plan screens: {}", message));
                }
                GenerationEvent::ConfigReady { project_name, total } => {
                    log::info!("Planned {} screens for {}", total, project_name);
                    self.reset_view();
                }
                GenerationEvent::ScreenStarted { .. } => {}
                GenerationEvent::ScreenFinished { id, status, .. } => {
                    log::debug!("{} finished as {}", id, status);
                }
                GenerationEvent::Finished(summary) => {
                    self.status_message = Some(format!(
                        "{}: {} of {} screens ready",
                        summary.project_name, summary.ready, summary.total
                    ));
                    if summary.failed > 0 {
                        self.banner = Some(format!(
                            "{} screen(s) failed to generate. Select one and retry.",
                            summary.failed
                        ));
                    }
                }
                GenerationEvent::Cancelled => {
                    self.status_message = Some("Generation cancelled".to_string());
                }
            }
        }
        while let Ok(notice) = self.notices.try_recv() {
            self.banner = Some(notice);
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.selected = None;
            self.drag = None;
        }
        if ctx.wants_keyboard_input() {
            return;
        }
        if ctx.input(|i| i.modifiers.command && (i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals))) {
            self.viewport.zoom_in();
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Minus)) {
            self.viewport.zoom_out();
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Num0)) {
            self.reset_view();
        }
    }
}

impl eframe::App for MockupApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        let snapshot: RegistrySnapshot = self.lock_registry().snapshot();
        let phase = self.orchestrator.phase();
        let busy = self.orchestrator.is_busy();

        if let Some(project) = &snapshot.project {
            self.device = project.device_class;
        }
        if self
            .selected
            .as_ref()
            .is_some_and(|id| !snapshot.screens.iter().any(|s| &s.id == id))
        {
            self.selected = None;
        }

        // Keep polling while a run is in flight
        if busy {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        self.handle_shortcuts(ctx);

        // Toolbar
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                toolbar::show(ui, &mut self.prompt, self.device, busy, self.viewport.scale())
            })
            .inner;

        match toolbar_action {
            toolbar::ToolbarAction::Generate => self.start_generation(),
            toolbar::ToolbarAction::Cancel => {
                self.orchestrator.cancel();
                log::info!("Cancel requested");
            }
            toolbar::ToolbarAction::ChangeDevice(device) => self.change_device(device),
            toolbar::ToolbarAction::NewProject => self.new_project(),
            toolbar::ToolbarAction::ZoomIn => self.viewport.zoom_in(),
            toolbar::ToolbarAction::ZoomOut => self.viewport.zoom_out(),
            toolbar::ToolbarAction::ResetView => self.reset_view(),
            toolbar::ToolbarAction::None => {}
        }

        // Status bar
        let progress_action = egui::TopBottomPanel::bottom("progress")
            .show(ctx, |ui| {
                progress::show(
                    ui,
                    phase,
                    &snapshot,
                    self.status_message.as_deref(),
                    self.banner.as_deref(),
                )
            })
            .inner;

        if let progress::ProgressAction::DismissBanner = progress_action {
            self.banner = None;
        }

        // Properties panel (right side)
        let properties_action = egui::SidePanel::right("properties")
            .default_width(260.0)
            .show(ctx, |ui| properties::show(ui, &snapshot, self.selected.as_ref(), busy))
            .inner;

        match properties_action {
            properties::PropertiesAction::Select(id) => self.selected = Some(id),
            properties::PropertiesAction::Generate(id) => self.generate_screen(id),
            properties::PropertiesAction::AddBlank => self.add_blank_screen(),
            properties::PropertiesAction::Duplicate(id) => self.duplicate_screen(&id),
            properties::PropertiesAction::None => {}
        }

        // Main canvas (center)
        let canvas_action = egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                canvas::show(
                    ui,
                    &snapshot,
                    &self.space,
                    &mut self.viewport,
                    self.selected.as_ref(),
                    &mut self.drag,
                )
            })
            .inner;

        match canvas_action {
            canvas::CanvasAction::Select(id) => self.selected = Some(id),
            canvas::CanvasAction::Deselect => self.selected = None,
            canvas::CanvasAction::Drag(report) => {
                let space = self.space;
                if let Err(e) = self.lock_registry().apply_drag_report(&space, &report) {
                    log::debug!("Drag of {} not applied: {}", report.id, e);
                }
            }
            canvas::CanvasAction::None => {}
        }
    }
}
