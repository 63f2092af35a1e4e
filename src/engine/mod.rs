// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Screen registry, generation pipeline and canvas view state.

pub mod orchestrator;
pub mod registry;
pub mod viewport;

pub use orchestrator::{GenerationEvent, GenerationOrchestrator, GenerationSettings, RunPhase, RunSummary};
pub use registry::{DeviceChange, RegistrySnapshot, ScreenRegistry, SharedRegistry};
pub use viewport::{ViewportConfig, ViewportController};
