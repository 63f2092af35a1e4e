// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Two-phase generation pipeline.
//!
//! A run first asks the backend for a screen configuration (phase 1) and
//! seeds the registry from it. It then generates the screens one at a time,
//! in order (phase 2). Screens are never requested concurrently: screen
//! `i` is only requested once the outcome of screen `i - 1` has been
//! written to the registry. A failing screen is marked failed and the run
//! moves on to the next one.
//!
//! Cancellation is cooperative. Submitting a new prompt cancels the
//! previous run's token, which is checked before each screen. Results of a
//! request that was already in flight are written only if the registry has
//! not been re-initialized in the meantime.

use crate::engine::registry::{DeviceChange, RegistryError, RunWrite, ScreenRegistry, SharedRegistry};
use crate::io::api::{self, ConfigRequest, ScreenRequest, MAX_SCREENS};
use crate::io::client::{ClientError, GenerationBackend};
use crate::models::{DeviceClass, Project, ScreenConfig, ScreenContent, ScreenId, ScreenStatus, Theme};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("prompt must be between {} and {} characters (got {len})", api::MIN_PROMPT_CHARS, api::MAX_PROMPT_CHARS)]
    InvalidPrompt { len: usize },
    #[error("could not fetch screen configuration: {0}")]
    ConfigFetch(String),
    #[error("a generation run is already in progress")]
    Busy,
    #[error("generation was cancelled")]
    Cancelled,
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Backend(#[from] ClientError),
}

/// Timeouts and limits for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub config_timeout_ms: u64,
    pub screen_timeout_ms: u64,
    pub max_screens: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            config_timeout_ms: 120_000,
            screen_timeout_ms: 120_000,
            max_screens: MAX_SCREENS,
        }
    }
}

impl GenerationSettings {
    pub fn config_timeout(&self) -> Duration {
        Duration::from_millis(self.config_timeout_ms.max(1))
    }

    pub fn screen_timeout(&self) -> Duration {
        Duration::from_millis(self.screen_timeout_ms.max(1))
    }

    pub fn max_screens(&self) -> usize {
        self.max_screens.clamp(1, MAX_SCREENS)
    }
}

/// Cooperative cancellation flag shared with a run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Where the current run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    ConfigFetching,
    ConfigFetchFailed,
    ConfigReady,
    ScreenLoop { index: usize, total: usize },
}

/// Result of a run that got past phase 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub project_name: String,
    pub total: usize,
    pub ready: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Progress notifications for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    ConfigFetching,
    ConfigFailed { message: String },
    ConfigReady { project_name: String, total: usize },
    ScreenStarted { index: usize, total: usize, id: ScreenId, name: String },
    ScreenFinished { index: usize, total: usize, id: ScreenId, status: ScreenStatus },
    Finished(RunSummary),
    Cancelled,
}

#[derive(Debug)]
struct CurrentRun {
    token: CancelToken,
    phase: RunPhase,
}

/// Why a single screen step did not produce a terminal status.
enum StepError {
    /// The registry moved to a newer epoch; the run must stop.
    Stale,
    Registry(RegistryError),
}

/// Position of one Phase 2 request within its run.
#[derive(Debug, Clone, Copy)]
struct ScreenStep {
    epoch: u64,
    index: usize,
    total: usize,
    device: DeviceClass,
    theme: Theme,
}

pub struct GenerationOrchestrator<B: GenerationBackend> {
    backend: Arc<B>,
    registry: SharedRegistry,
    settings: GenerationSettings,
    current: Mutex<CurrentRun>,
    events: Option<Sender<GenerationEvent>>,
}

impl<B: GenerationBackend> GenerationOrchestrator<B> {
    pub fn new(backend: Arc<B>, registry: SharedRegistry, settings: GenerationSettings) -> Self {
        Self {
            backend,
            registry,
            settings,
            current: Mutex::new(CurrentRun {
                token: CancelToken::new(),
                phase: RunPhase::Idle,
            }),
            events: None,
        }
    }

    /// Send progress events to `sender`.
    pub fn with_events(mut self, sender: Sender<GenerationEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Phase of the most recently submitted run.
    pub fn phase(&self) -> RunPhase {
        self.lock_current().phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase() != RunPhase::Idle || self.lock_registry().is_run_active()
    }

    /// Ask the current run to stop before its next screen.
    pub fn cancel(&self) {
        self.lock_current().token.cancel();
    }

    /// Cancel the current run and drop the project.
    pub fn reset_project(&self) {
        self.cancel();
        self.lock_registry().clear();
    }

    /// Switch device class; rejected while a run is in flight.
    pub fn change_device(&self, device: DeviceClass) -> DeviceChange {
        if self.phase() != RunPhase::Idle {
            log::info!("Device change to {} rejected: run in progress", device);
            return DeviceChange::Rejected;
        }
        self.lock_registry().change_device(device)
    }

    pub async fn check_health(&self) -> Result<(), GenerationError> {
        self.backend.health().await?;
        Ok(())
    }

    /// Run both phases for `prompt`, superseding any run in progress.
    pub async fn generate(
        &self,
        prompt: &str,
        device: DeviceClass,
    ) -> Result<RunSummary, GenerationError> {
        let prompt = api::validate_prompt(prompt)
            .map_err(|len| GenerationError::InvalidPrompt { len })?
            .to_string();

        let token = self.supersede();
        log::info!("Starting generation for {} ({} chars)", device, prompt.chars().count());
        self.set_phase(&token, RunPhase::ConfigFetching);
        self.emit(GenerationEvent::ConfigFetching);

        let request = ConfigRequest {
            prompt,
            device_type: device,
        };
        let fetched = self.fetch_config(&request).await;

        if token.is_cancelled() {
            log::info!("Configuration request cancelled, discarding result");
            self.set_phase(&token, RunPhase::Idle);
            self.emit(GenerationEvent::Cancelled);
            return Err(GenerationError::Cancelled);
        }

        let (project, configs) = match fetched {
            Ok(plan) => plan,
            Err(message) => {
                log::error!("Configuration request failed: {}", message);
                self.set_phase(&token, RunPhase::ConfigFetchFailed);
                self.emit(GenerationEvent::ConfigFailed {
                    message: message.clone(),
                });
                self.set_phase(&token, RunPhase::Idle);
                return Err(GenerationError::ConfigFetch(message));
            }
        };

        let project_name = project.name.clone();
        let theme = project.theme;
        let (epoch, screens) = {
            let mut registry = self.lock_registry();
            let epoch = registry.initialize(project, configs);
            registry.begin_run(epoch);
            let screens: Vec<(ScreenId, ScreenConfig)> = registry
                .screens()
                .iter()
                .map(|s| (s.id.clone(), s.config()))
                .collect();
            (epoch, screens)
        };

        self.set_phase(&token, RunPhase::ConfigReady);
        self.emit(GenerationEvent::ConfigReady {
            project_name: project_name.clone(),
            total: screens.len(),
        });

        let total = screens.len();
        let mut summary = RunSummary {
            project_name,
            total,
            ready: 0,
            failed: 0,
            cancelled: false,
        };

        for (index, (id, config)) in screens.iter().enumerate() {
            if token.is_cancelled() {
                log::info!("Generation cancelled before screen {} of {}", index + 1, total);
                summary.cancelled = true;
                break;
            }
            self.set_phase(&token, RunPhase::ScreenLoop { index, total });

            let step = ScreenStep {
                epoch,
                index,
                total,
                device,
                theme,
            };
            match self.generate_screen(step, id, config).await {
                Ok(ScreenStatus::Ready) => summary.ready += 1,
                Ok(_) => summary.failed += 1,
                Err(StepError::Stale) => {
                    log::info!("Registry re-initialized, stopping stale run");
                    summary.cancelled = true;
                    break;
                }
                Err(StepError::Registry(error)) => {
                    log::error!("Skipping {}: {}", id, error);
                }
            }
        }

        self.lock_registry().finish_run(epoch);
        self.set_phase(&token, RunPhase::Idle);

        log::info!(
            "Generation of {:?} finished: {} ready, {} failed{}",
            summary.project_name,
            summary.ready,
            summary.failed,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        if summary.cancelled {
            self.emit(GenerationEvent::Cancelled);
        } else {
            self.emit(GenerationEvent::Finished(summary.clone()));
        }
        Ok(summary)
    }

    /// Generate a single screen on its own: a finished screen again, or a
    /// pending one that no run has reached.
    pub async fn retry_screen(&self, id: &ScreenId) -> Result<ScreenStatus, GenerationError> {
        if self.phase() != RunPhase::Idle {
            return Err(GenerationError::Busy);
        }

        let (epoch, config, project, index, total) = {
            let mut registry = self.lock_registry();
            if registry.is_run_active() {
                return Err(GenerationError::Busy);
            }
            let project: Project = registry.project().cloned().ok_or(RegistryError::NoProject)?;
            let index = registry
                .screens()
                .iter()
                .position(|s| &s.id == id)
                .ok_or_else(|| RegistryError::UnknownScreen(id.clone()))?;
            if registry.screens()[index].status != ScreenStatus::Pending {
                registry.reset_for_retry(id)?;
            }
            let config = registry.screens()[index].config();
            let epoch = registry.epoch();
            registry.begin_run(epoch);
            (epoch, config, project, index, registry.len())
        };

        log::info!("Generating {} on its own", id);
        let step = ScreenStep {
            epoch,
            index,
            total,
            device: project.device_class,
            theme: project.theme,
        };
        let outcome = self.generate_screen(step, id, &config).await;
        self.lock_registry().finish_run(epoch);

        match outcome {
            Ok(status) => Ok(status),
            Err(StepError::Stale) => Err(GenerationError::Cancelled),
            Err(StepError::Registry(error)) => Err(error.into()),
        }
    }

    async fn fetch_config(
        &self,
        request: &ConfigRequest,
    ) -> Result<(Project, Vec<ScreenConfig>), String> {
        let timeout = self.settings.config_timeout();
        let response = match tokio::time::timeout(timeout, self.backend.generate_config(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => return Err(error.to_string()),
            Err(_) => return Err(format!("timed out after {:?}", timeout)),
        };
        response
            .into_plan(request.device_type, self.settings.max_screens())
            .map_err(|error| error.to_string())
    }

    async fn generate_screen(
        &self,
        step: ScreenStep,
        id: &ScreenId,
        config: &ScreenConfig,
    ) -> Result<ScreenStatus, StepError> {
        let ScreenStep {
            epoch,
            index,
            total,
            device,
            theme,
        } = step;
        self.write(epoch, id, ScreenStatus::Generating, None)?;
        self.emit(GenerationEvent::ScreenStarted {
            index,
            total,
            id: id.clone(),
            name: config.name.clone(),
        });
        log::info!("Generating screen {} of {}: {}", index + 1, total, config.name);

        let request = ScreenRequest::for_screen(config, device, Some(theme));
        let timeout = self.settings.screen_timeout();
        let (status, content) =
            match tokio::time::timeout(timeout, self.backend.generate_screen(&request)).await {
                Ok(Ok(response)) if response.success => (
                    ScreenStatus::Ready,
                    Some(ScreenContent {
                        code: response.code,
                        html_preview: response.html_preview,
                    }),
                ),
                Ok(Ok(_)) => {
                    log::warn!("Backend reported failure for {}", id);
                    (ScreenStatus::Failed, None)
                }
                Ok(Err(error)) => {
                    log::warn!("Request for {} failed: {}", id, error);
                    (ScreenStatus::Failed, None)
                }
                Err(_) => {
                    log::warn!("Request for {} timed out after {:?}", id, timeout);
                    (ScreenStatus::Failed, None)
                }
            };

        self.write(epoch, id, status, content)?;
        self.emit(GenerationEvent::ScreenFinished {
            index,
            total,
            id: id.clone(),
            status,
        });
        Ok(status)
    }

    fn write(
        &self,
        epoch: u64,
        id: &ScreenId,
        status: ScreenStatus,
        content: Option<ScreenContent>,
    ) -> Result<(), StepError> {
        let write = self.lock_registry().apply_for_run(epoch, id, status, content);
        match write {
            Ok(RunWrite::Applied) => Ok(()),
            Ok(RunWrite::Stale) => Err(StepError::Stale),
            Err(error) => Err(StepError::Registry(error)),
        }
    }

    fn supersede(&self) -> CancelToken {
        let mut current = self.lock_current();
        current.token.cancel();
        current.token = CancelToken::new();
        current.phase = RunPhase::Idle;
        current.token.clone()
    }

    /// Publish `phase` unless a newer run has taken over.
    fn set_phase(&self, token: &CancelToken, phase: RunPhase) {
        let mut current = self.lock_current();
        if current.token.same_as(token) {
            current.phase = phase;
        }
    }

    fn emit(&self, event: GenerationEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }

    fn lock_registry(&self) -> MutexGuard<'_, ScreenRegistry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_current(&self) -> MutexGuard<'_, CurrentRun> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::api::{ConfigResponse, ScreenConfigWire, ScreenResponse};
    use crate::util::layout;
    use async_trait::async_trait;
    use rand::Rng;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::{channel, Receiver};
    use tokio::sync::Notify;

    /// Backend with per-screen scripted outcomes.
    #[derive(Default)]
    struct ScriptedBackend {
        config: Mutex<Option<Result<ConfigResponse, ClientError>>>,
        config_calls: AtomicUsize,
        failing: Mutex<HashSet<i64>>,
        unsuccessful: HashSet<i64>,
        hanging: HashSet<i64>,
        max_latency_ms: u64,
        gate: Option<(i64, Arc<Notify>)>,
        requests: Mutex<Vec<i64>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedBackend {
        fn with_screens(project_name: &str, n: i64) -> Self {
            let backend = Self::default();
            backend.set_config(Ok(config_response(project_name, n)));
            backend
        }

        fn set_config(&self, config: Result<ConfigResponse, ClientError>) {
            *self.config.lock().unwrap() = Some(config);
        }

        fn requests(&self) -> Vec<i64> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate_config(&self, _request: &ConfigRequest) -> Result<ConfigResponse, ClientError> {
            self.config_calls.fetch_add(1, Ordering::SeqCst);
            self.config
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(Err(ClientError::BaseUrlMissing))
        }

        async fn generate_screen(&self, request: &ScreenRequest) -> Result<ScreenResponse, ClientError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.screen_id);

            if self.max_latency_ms > 0 {
                let delay = rand::rng().random_range(0..=self.max_latency_ms);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if let Some((gated, notify)) = &self.gate {
                if *gated == request.screen_id {
                    notify.notified().await;
                }
            }
            if self.hanging.contains(&request.screen_id) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.lock().unwrap().contains(&request.screen_id) {
                return Err(ClientError::Request {
                    message: "connection reset".to_string(),
                });
            }
            Ok(ScreenResponse {
                code: format!("// screen {}", request.screen_id),
                html_preview: format!("<html>{}</html>", request.screen_id),
                success: !self.unsuccessful.contains(&request.screen_id),
            })
        }
    }

    fn config_response(project_name: &str, n: i64) -> ConfigResponse {
        ConfigResponse {
            project_name: project_name.to_string(),
            theme: "light".to_string(),
            screens: (1..=n)
                .map(|i| ScreenConfigWire {
                    screen_id: i,
                    screen_name: format!("Screen {}", i),
                    purpose: "purpose".to_string(),
                    screen_description: "description".to_string(),
                })
                .collect(),
        }
    }

    fn orchestrator(
        backend: ScriptedBackend,
        settings: GenerationSettings,
    ) -> (Arc<GenerationOrchestrator<ScriptedBackend>>, Arc<ScriptedBackend>, Receiver<GenerationEvent>) {
        let backend = Arc::new(backend);
        let (tx, rx) = channel();
        let orchestrator =
            GenerationOrchestrator::new(Arc::clone(&backend), ScreenRegistry::shared(), settings)
                .with_events(tx);
        (Arc::new(orchestrator), backend, rx)
    }

    fn statuses(orchestrator: &GenerationOrchestrator<ScriptedBackend>) -> Vec<ScreenStatus> {
        let registry = orchestrator.registry();
        let registry = registry.lock().unwrap();
        registry.screens().iter().map(|s| s.status).collect()
    }

    async fn wait_until(
        orchestrator: &GenerationOrchestrator<ScriptedBackend>,
        what: &str,
        condition: impl Fn(&ScreenRegistry) -> bool,
    ) {
        for _ in 0..500 {
            if condition(&orchestrator.registry().lock().unwrap()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {what}");
    }

    async fn wait_for_status(
        orchestrator: &GenerationOrchestrator<ScriptedBackend>,
        index: usize,
        status: ScreenStatus,
    ) {
        wait_until(orchestrator, "screen status", |registry| {
            registry.screens().get(index).map(|s| s.status) == Some(status)
        })
        .await;
    }

    const PROMPT: &str = "Budget tracker app";

    #[tokio::test]
    async fn test_all_screens_become_ready() {
        let (orchestrator, backend, rx) =
            orchestrator(ScriptedBackend::with_screens("Budget Tracker", 3), GenerationSettings::default());

        let summary = orchestrator.generate(PROMPT, DeviceClass::Mobile).await.unwrap();
        assert_eq!(summary.ready, 3);
        assert_eq!(summary.failed, 0);
        assert!(!summary.cancelled);
        assert_eq!(statuses(&orchestrator), vec![ScreenStatus::Ready; 3]);
        assert_eq!(backend.requests(), vec![1, 2, 3]);
        assert_eq!(orchestrator.phase(), RunPhase::Idle);

        let events: Vec<GenerationEvent> = rx.try_iter().collect();
        assert_eq!(events.first(), Some(&GenerationEvent::ConfigFetching));
        assert!(matches!(events.last(), Some(GenerationEvent::Finished(s)) if s.ready == 3));

        let registry = orchestrator.registry();
        let registry = registry.lock().unwrap();
        let screen = &registry.screens()[1];
        assert_eq!(screen.content.as_ref().unwrap().html_preview, "<html>2</html>");
        assert!(!registry.is_run_active());
    }

    #[tokio::test]
    async fn test_screens_are_generated_strictly_in_order() {
        let mut backend = ScriptedBackend::with_screens("Sequenced", 8);
        backend.max_latency_ms = 15;
        let (orchestrator, backend, rx) = orchestrator(backend, GenerationSettings::default());

        orchestrator.generate(PROMPT, DeviceClass::Web).await.unwrap();

        let started: Vec<usize> = rx
            .try_iter()
            .filter_map(|event| match event {
                GenerationEvent::ScreenStarted { index, .. } => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(started, (0..8).collect::<Vec<_>>());
        assert_eq!(backend.requests(), (1..=8).collect::<Vec<_>>());
        assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_one_screen() {
        let backend = ScriptedBackend::with_screens("Isolated", 4);
        backend.failing.lock().unwrap().insert(2);
        let (orchestrator, _backend, _rx) = orchestrator(backend, GenerationSettings::default());

        let summary = orchestrator.generate(PROMPT, DeviceClass::Mobile).await.unwrap();
        assert_eq!((summary.ready, summary.failed), (3, 1));
        assert_eq!(
            statuses(&orchestrator),
            vec![ScreenStatus::Ready, ScreenStatus::Failed, ScreenStatus::Ready, ScreenStatus::Ready]
        );

        let registry = orchestrator.registry();
        let registry = registry.lock().unwrap();
        assert!(registry.screens()[1].content.is_none());
    }

    #[tokio::test]
    async fn test_unsuccessful_response_and_timeout_are_failures() {
        let mut backend = ScriptedBackend::with_screens("Flaky", 3);
        backend.unsuccessful.insert(1);
        backend.hanging.insert(2);
        let settings = GenerationSettings {
            screen_timeout_ms: 50,
            ..GenerationSettings::default()
        };
        let (orchestrator, _backend, _rx) = orchestrator(backend, settings);

        let summary = orchestrator.generate(PROMPT, DeviceClass::Tablet).await.unwrap();
        assert_eq!((summary.ready, summary.failed), (1, 2));
        assert_eq!(
            statuses(&orchestrator),
            vec![ScreenStatus::Failed, ScreenStatus::Failed, ScreenStatus::Ready]
        );
    }

    #[tokio::test]
    async fn test_config_failure_leaves_registry_untouched() {
        let (orchestrator, backend, rx) =
            orchestrator(ScriptedBackend::with_screens("First", 2), GenerationSettings::default());
        orchestrator.generate(PROMPT, DeviceClass::Mobile).await.unwrap();
        let before = orchestrator.registry().lock().unwrap().snapshot();
        let _ = rx.try_iter().count();

        backend.set_config(Err(ClientError::Request {
            message: "offline".to_string(),
        }));
        let err = orchestrator.generate(PROMPT, DeviceClass::Mobile).await.unwrap_err();
        assert!(matches!(err, GenerationError::ConfigFetch(_)));
        assert_eq!(orchestrator.registry().lock().unwrap().snapshot(), before);
        assert_eq!(orchestrator.phase(), RunPhase::Idle);

        let failures = rx
            .try_iter()
            .filter(|event| matches!(event, GenerationEvent::ConfigFailed { .. }))
            .count();
        assert_eq!(failures, 1);
    }

    #[tokio::test]
    async fn test_config_shape_violation_is_a_config_failure() {
        let backend = ScriptedBackend::default();
        backend.set_config(Ok(config_response("Empty", 0)));
        let (orchestrator, backend, _rx) = orchestrator(backend, GenerationSettings::default());

        let err = orchestrator.generate(PROMPT, DeviceClass::Mobile).await.unwrap_err();
        assert!(matches!(err, GenerationError::ConfigFetch(_)));
        assert!(orchestrator.registry().lock().unwrap().is_empty());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_prompt_sends_nothing() {
        let (orchestrator, backend, _rx) =
            orchestrator(ScriptedBackend::with_screens("Unused", 1), GenerationSettings::default());

        let err = orchestrator.generate("short", DeviceClass::Mobile).await.unwrap_err();
        assert_eq!(err, GenerationError::InvalidPrompt { len: 5 });
        assert_eq!(backend.config_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scenario_budget_tracker_layout_before_phase_two_completes() {
        let notify = Arc::new(Notify::new());
        let mut backend = ScriptedBackend::with_screens("Budget Tracker", 3);
        backend.gate = Some((1, Arc::clone(&notify)));
        let (orchestrator, _backend, _rx) = orchestrator(backend, GenerationSettings::default());

        let run = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate(PROMPT, DeviceClass::Mobile).await })
        };
        wait_for_status(&orchestrator, 0, ScreenStatus::Generating).await;

        {
            let registry = orchestrator.registry();
            let registry = registry.lock().unwrap();
            let xs: Vec<i32> = registry.screens().iter().map(|s| s.geometry.x).collect();
            assert_eq!(xs, vec![0, 430, 860]);
            for screen in registry.screens() {
                assert_eq!((screen.geometry.y, screen.geometry.w, screen.geometry.h), (0, 400, 812));
                assert!(screen.content.is_none());
            }
            let statuses: Vec<ScreenStatus> = registry.screens().iter().map(|s| s.status).collect();
            assert_eq!(
                statuses,
                vec![ScreenStatus::Generating, ScreenStatus::Pending, ScreenStatus::Pending]
            );
        }
        assert_eq!(orchestrator.phase(), RunPhase::ScreenLoop { index: 0, total: 3 });

        notify.notify_one();
        let summary = run.await.unwrap().unwrap();
        assert_eq!(summary.ready, 3);
    }

    #[tokio::test]
    async fn test_initialize_mid_run_discards_stale_writes() {
        let notify = Arc::new(Notify::new());
        let mut backend = ScriptedBackend::with_screens("Stale", 3);
        backend.gate = Some((2, Arc::clone(&notify)));
        let (orchestrator, backend, _rx) = orchestrator(backend, GenerationSettings::default());

        let run = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate(PROMPT, DeviceClass::Mobile).await })
        };
        wait_for_status(&orchestrator, 1, ScreenStatus::Generating).await;

        let fresh = Project::new("Fresh".to_string(), Theme::Apple, DeviceClass::Mobile);
        let fresh_configs = vec![ScreenConfig::new(1, "A"), ScreenConfig::new(2, "B"), ScreenConfig::new(3, "C")];
        orchestrator.registry().lock().unwrap().initialize(fresh, fresh_configs);

        notify.notify_one();
        let summary = run.await.unwrap().unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.ready, 1);

        assert_eq!(statuses(&orchestrator), vec![ScreenStatus::Pending; 3]);
        assert_eq!(backend.requests(), vec![1, 2]);
        let registry = orchestrator.registry();
        assert!(!registry.lock().unwrap().is_run_active());
    }

    #[tokio::test]
    async fn test_new_prompt_supersedes_running_generation() {
        let notify = Arc::new(Notify::new());
        let mut backend = ScriptedBackend::with_screens("Old", 4);
        backend.gate = Some((1, Arc::clone(&notify)));
        let (orchestrator, backend, _rx) = orchestrator(backend, GenerationSettings::default());

        let old_run = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate(PROMPT, DeviceClass::Mobile).await })
        };
        wait_for_status(&orchestrator, 0, ScreenStatus::Generating).await;

        backend.set_config(Ok(config_response("New", 2)));
        let new_run = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate("A recipe sharing app", DeviceClass::Mobile).await })
        };
        // Both runs end up parked on screen 1's request; release them.
        wait_until(&orchestrator, "new project", |registry| {
            registry.project().map(|p| p.name.as_str()) == Some("New")
                && registry.screens().first().map(|s| s.status) == Some(ScreenStatus::Generating)
        })
        .await;
        notify.notify_one();
        notify.notify_one();

        let old = old_run.await.unwrap().unwrap();
        assert!(old.cancelled);
        let new = new_run.await.unwrap().unwrap();

        assert_eq!((new.ready, new.total), (2, 2));
        let registry = orchestrator.registry();
        let registry = registry.lock().unwrap();
        assert_eq!(registry.project().unwrap().name, "New");
        assert!(registry.screens().iter().all(|s| s.status == ScreenStatus::Ready));
        assert_eq!(orchestrator.phase(), RunPhase::Idle);
    }

    #[tokio::test]
    async fn test_device_change_is_gated_during_run() {
        let notify = Arc::new(Notify::new());
        let mut backend = ScriptedBackend::with_screens("Devices", 3);
        backend.gate = Some((2, Arc::clone(&notify)));
        let (orchestrator, _backend, _rx) = orchestrator(backend, GenerationSettings::default());

        let run = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate(PROMPT, DeviceClass::Mobile).await })
        };
        wait_for_status(&orchestrator, 1, ScreenStatus::Generating).await;

        let before = orchestrator.registry().lock().unwrap().snapshot();
        assert_eq!(orchestrator.change_device(DeviceClass::Web), DeviceChange::Rejected);
        let after = orchestrator.registry().lock().unwrap().snapshot();
        let geometry = |s: &crate::engine::registry::RegistrySnapshot| {
            s.screens.iter().map(|screen| screen.geometry).collect::<Vec<_>>()
        };
        assert_eq!(geometry(&before), geometry(&after));

        notify.notify_one();
        run.await.unwrap().unwrap();

        assert_eq!(orchestrator.change_device(DeviceClass::Web), DeviceChange::Applied);
        let registry = orchestrator.registry();
        let registry = registry.lock().unwrap();
        for (index, screen) in registry.screens().iter().enumerate() {
            assert_eq!(screen.geometry, layout::plan(index, DeviceClass::Web));
        }
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_screen() {
        let notify = Arc::new(Notify::new());
        let mut backend = ScriptedBackend::with_screens("Cancelled", 3);
        backend.gate = Some((1, Arc::clone(&notify)));
        let (orchestrator, backend, rx) = orchestrator(backend, GenerationSettings::default());

        let run = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate(PROMPT, DeviceClass::Mobile).await })
        };
        wait_for_status(&orchestrator, 0, ScreenStatus::Generating).await;
        orchestrator.cancel();
        notify.notify_one();

        let summary = run.await.unwrap().unwrap();
        assert!(summary.cancelled);
        // The in-flight screen keeps its outcome; the rest stay pending.
        assert_eq!(
            statuses(&orchestrator),
            vec![ScreenStatus::Ready, ScreenStatus::Pending, ScreenStatus::Pending]
        );
        assert_eq!(backend.requests(), vec![1]);
        assert!(rx.try_iter().any(|event| event == GenerationEvent::Cancelled));
    }

    #[tokio::test]
    async fn test_retry_failed_screen() {
        let backend = ScriptedBackend::with_screens("Retry", 2);
        backend.failing.lock().unwrap().insert(2);
        let (orchestrator, backend, _rx) = orchestrator(backend, GenerationSettings::default());

        orchestrator.generate(PROMPT, DeviceClass::Mobile).await.unwrap();
        assert_eq!(statuses(&orchestrator), vec![ScreenStatus::Ready, ScreenStatus::Failed]);

        backend.failing.lock().unwrap().clear();
        let status = orchestrator
            .retry_screen(&ScreenId::from_server_id(2))
            .await
            .unwrap();
        assert_eq!(status, ScreenStatus::Ready);
        assert_eq!(statuses(&orchestrator), vec![ScreenStatus::Ready, ScreenStatus::Ready]);
        assert_eq!(backend.requests(), vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn test_added_blank_screen_can_be_generated() {
        let (orchestrator, backend, _rx) =
            orchestrator(ScriptedBackend::with_screens("Blank", 1), GenerationSettings::default());
        orchestrator.generate(PROMPT, DeviceClass::Mobile).await.unwrap();

        let id = orchestrator
            .registry()
            .lock()
            .unwrap()
            .add_screen(ScreenConfig::new(2, "Blank"), None)
            .unwrap();
        assert_eq!(statuses(&orchestrator), vec![ScreenStatus::Ready, ScreenStatus::Pending]);

        let status = orchestrator.retry_screen(&id).await.unwrap();
        assert_eq!(status, ScreenStatus::Ready);
        assert_eq!(statuses(&orchestrator), vec![ScreenStatus::Ready, ScreenStatus::Ready]);
        assert_eq!(backend.requests(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_pending_screen_left_by_cancel_can_be_generated() {
        let notify = Arc::new(Notify::new());
        let mut backend = ScriptedBackend::with_screens("Cancelled", 3);
        backend.gate = Some((1, Arc::clone(&notify)));
        let (orchestrator, backend, _rx) = orchestrator(backend, GenerationSettings::default());

        let run = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate(PROMPT, DeviceClass::Mobile).await })
        };
        wait_for_status(&orchestrator, 0, ScreenStatus::Generating).await;
        orchestrator.cancel();
        notify.notify_one();
        assert!(run.await.unwrap().unwrap().cancelled);
        assert_eq!(
            statuses(&orchestrator),
            vec![ScreenStatus::Ready, ScreenStatus::Pending, ScreenStatus::Pending]
        );

        let status = orchestrator
            .retry_screen(&ScreenId::from_server_id(3))
            .await
            .unwrap();
        assert_eq!(status, ScreenStatus::Ready);
        assert_eq!(
            statuses(&orchestrator),
            vec![ScreenStatus::Ready, ScreenStatus::Pending, ScreenStatus::Ready]
        );
        assert_eq!(backend.requests(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_retry_is_rejected_while_running() {
        let notify = Arc::new(Notify::new());
        let mut backend = ScriptedBackend::with_screens("Busy", 2);
        backend.gate = Some((2, Arc::clone(&notify)));
        let (orchestrator, _backend, _rx) = orchestrator(backend, GenerationSettings::default());

        let run = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate(PROMPT, DeviceClass::Mobile).await })
        };
        wait_for_status(&orchestrator, 1, ScreenStatus::Generating).await;

        let err = orchestrator
            .retry_screen(&ScreenId::from_server_id(1))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::Busy);

        notify.notify_one();
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_reset_project_clears_registry() {
        let (orchestrator, _backend, _rx) =
            orchestrator(ScriptedBackend::with_screens("Reset", 2), GenerationSettings::default());
        orchestrator.generate(PROMPT, DeviceClass::Mobile).await.unwrap();

        orchestrator.reset_project();
        let registry = orchestrator.registry();
        let registry = registry.lock().unwrap();
        assert!(registry.is_empty());
        assert!(registry.project().is_none());
    }
}
