// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Ordered store of the active project's screens.
//!
//! The registry is the single source of truth for screen geometry and
//! lifecycle status. It is the only place status and content change, and
//! it enforces the lifecycle table from [`ScreenStatus::can_transition_to`].
//!
//! Every `initialize` or `clear` bumps an epoch counter. Writes made on
//! behalf of a generation run carry the epoch the run started under, and
//! are discarded once the registry has moved on to a newer epoch.

use crate::models::{
    DeviceClass, Geometry, Project, Screen, ScreenConfig, ScreenContent, ScreenId, ScreenStatus,
};
use crate::util::geometry::{CoordinateSpace, DragReport};
use crate::util::layout;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Registry shared between the UI thread and the generation task.
pub type SharedRegistry = Arc<Mutex<ScreenRegistry>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: ScreenId,
        from: ScreenStatus,
        to: ScreenStatus,
    },
    #[error("unknown screen {0}")]
    UnknownScreen(ScreenId),
    #[error("geometry update rejected for {0}")]
    GeometryRejected(ScreenId),
    #[error("no active project")]
    NoProject,
}

/// Outcome of a device class change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChange {
    Applied,
    Rejected,
}

/// Outcome of a write made on behalf of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunWrite {
    Applied,
    /// The registry was re-initialized since the run started.
    Stale,
}

/// Owned copy of the registry state, used for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub project: Option<Project>,
    pub screens: Vec<Screen>,
    pub epoch: u64,
    pub run_active: bool,
}

impl RegistrySnapshot {
    pub fn count(&self, status: ScreenStatus) -> usize {
        self.screens.iter().filter(|s| s.status == status).count()
    }
}

#[derive(Debug, Default)]
pub struct ScreenRegistry {
    project: Option<Project>,
    screens: Vec<Screen>,
    epoch: u64,
    run_active: bool,
}

impl ScreenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn get(&self, id: &ScreenId) -> Option<&Screen> {
        self.screens.iter().find(|s| &s.id == id)
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_run_active(&self) -> bool {
        self.run_active
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            project: self.project.clone(),
            screens: self.screens.clone(),
            epoch: self.epoch,
            run_active: self.run_active,
        }
    }

    /// Replace all screens with pending ones laid out for the project's
    /// device class. Any run started under an earlier epoch loses its
    /// right to write. Returns the new epoch.
    pub fn initialize(&mut self, project: Project, configs: Vec<ScreenConfig>) -> u64 {
        let device = project.device_class;
        let mut seen = HashSet::new();
        let mut screens = Vec::with_capacity(configs.len());

        for config in configs {
            if !seen.insert(config.server_id) {
                log::warn!("Skipping duplicate screen id {}", config.server_id);
                continue;
            }
            let geometry = layout::plan(screens.len(), device);
            screens.push(Screen::pending(config, geometry));
        }

        self.screens = screens;
        self.project = Some(project);
        self.epoch += 1;
        self.run_active = false;

        log::info!(
            "Registry initialized with {} screens (epoch {})",
            self.screens.len(),
            self.epoch
        );
        self.epoch
    }

    /// Drop the project and all screens.
    pub fn clear(&mut self) {
        self.project = None;
        self.screens.clear();
        self.epoch += 1;
        self.run_active = false;
        log::info!("Registry cleared (epoch {})", self.epoch);
    }

    /// Accept a new geometry for a single screen.
    ///
    /// Unknown ids and non-positive sizes are logged and ignored.
    pub fn set_geometry(&mut self, id: &ScreenId, geometry: Geometry) -> Result<(), RegistryError> {
        if !geometry.is_valid() {
            log::warn!("Ignoring geometry with non-positive size for {}: {:?}", id, geometry);
            return Err(RegistryError::GeometryRejected(id.clone()));
        }
        match self.screens.iter_mut().find(|s| &s.id == id) {
            Some(screen) => {
                screen.geometry = geometry;
                Ok(())
            }
            None => {
                log::warn!("Ignoring geometry update for unknown screen {}", id);
                Err(RegistryError::GeometryRejected(id.clone()))
            }
        }
    }

    /// Convert a drag/resize report to world space and store it.
    pub fn apply_drag_report(
        &mut self,
        space: &CoordinateSpace,
        report: &DragReport,
    ) -> Result<(), RegistryError> {
        match space.to_world_geometry(report) {
            Some(geometry) => self.set_geometry(&report.id, geometry),
            None => {
                log::warn!("Ignoring drag report with non-positive size for {}", report.id);
                Err(RegistryError::GeometryRejected(report.id.clone()))
            }
        }
    }

    /// Move a screen along the lifecycle.
    ///
    /// `content` must be present exactly when moving to `Ready`.
    pub fn set_status(
        &mut self,
        id: &ScreenId,
        status: ScreenStatus,
        content: Option<ScreenContent>,
    ) -> Result<(), RegistryError> {
        let screen = self
            .screens
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| RegistryError::UnknownScreen(id.clone()))?;

        let content_matches = (status == ScreenStatus::Ready) == content.is_some();
        if !screen.status.can_transition_to(status) || !content_matches {
            return Err(RegistryError::InvalidTransition {
                id: id.clone(),
                from: screen.status,
                to: status,
            });
        }

        log::debug!("{}: {} -> {}", id, screen.status, status);
        screen.status = status;
        screen.content = content;
        Ok(())
    }

    /// Explicitly put a finished screen back to `Pending` so it can be
    /// generated again. Content is cleared.
    pub fn reset_for_retry(&mut self, id: &ScreenId) -> Result<(), RegistryError> {
        let screen = self
            .screens
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| RegistryError::UnknownScreen(id.clone()))?;

        if !screen.status.is_terminal() {
            return Err(RegistryError::InvalidTransition {
                id: id.clone(),
                from: screen.status,
                to: ScreenStatus::Pending,
            });
        }

        screen.status = ScreenStatus::Pending;
        screen.content = None;
        Ok(())
    }

    /// Append a screen at the end of the row.
    ///
    /// With `inherit_from` naming a ready screen, the new screen starts
    /// ready with a copy of that content; otherwise it starts pending. A
    /// server id that is already taken is replaced with the next free one.
    pub fn add_screen(
        &mut self,
        mut config: ScreenConfig,
        inherit_from: Option<&ScreenId>,
    ) -> Result<ScreenId, RegistryError> {
        let device = self
            .project
            .as_ref()
            .map(|p| p.device_class)
            .ok_or(RegistryError::NoProject)?;

        let inherited = match inherit_from {
            Some(source) => self
                .get(source)
                .ok_or_else(|| RegistryError::UnknownScreen(source.clone()))?
                .content
                .clone(),
            None => None,
        };

        if self.screens.iter().any(|s| s.server_id == config.server_id) {
            let next = self.screens.iter().map(|s| s.server_id).max().unwrap_or(0) + 1;
            log::debug!("Screen id {} taken, using {}", config.server_id, next);
            config.server_id = next;
        }

        let geometry = layout::plan(self.screens.len(), device);
        let mut screen = Screen::pending(config, geometry);
        if let Some(content) = inherited {
            screen.status = ScreenStatus::Ready;
            screen.content = Some(content);
        }

        let id = screen.id.clone();
        log::info!("Added screen {} ({}) as {}", id, screen.name, screen.status);
        self.screens.push(screen);
        Ok(id)
    }

    /// Switch the project to another device class and re-plan every
    /// screen. Rejected while a generation run is in flight.
    pub fn change_device(&mut self, device: DeviceClass) -> DeviceChange {
        let generating = self.screens.iter().any(|s| s.status == ScreenStatus::Generating);
        if self.run_active || generating {
            log::info!("Device change to {} rejected: generation in progress", device);
            return DeviceChange::Rejected;
        }

        let Some(project) = self.project.as_mut() else {
            return DeviceChange::Rejected;
        };
        project.device_class = device;

        let geometries = layout::plan_all(self.screens.len(), device);
        for (screen, geometry) in self.screens.iter_mut().zip(geometries) {
            screen.geometry = geometry;
        }
        log::info!("Re-planned {} screens for {}", self.screens.len(), device);
        DeviceChange::Applied
    }

    /// Mark a run as in flight. Returns false if `epoch` is stale.
    pub fn begin_run(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.run_active = true;
        true
    }

    /// Mark the run started under `epoch` as finished.
    pub fn finish_run(&mut self, epoch: u64) {
        if epoch == self.epoch {
            self.run_active = false;
        }
    }

    /// Status update on behalf of the run started under `epoch`.
    pub fn apply_for_run(
        &mut self,
        epoch: u64,
        id: &ScreenId,
        status: ScreenStatus,
        content: Option<ScreenContent>,
    ) -> Result<RunWrite, RegistryError> {
        if epoch != self.epoch {
            log::debug!("Discarding stale {} for {} (epoch {} < {})", status, id, epoch, self.epoch);
            return Ok(RunWrite::Stale);
        }
        self.set_status(id, status, content)?;
        Ok(RunWrite::Applied)
    }
}
