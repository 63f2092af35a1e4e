// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application settings.
//!
//! Settings come from a YAML or JSON file named by `MOCKUP_CANVAS_CONFIG`,
//! or `mockup-canvas.yaml` in the working directory when present. Every
//! field has a default, so a partial file (or no file) is fine.
//! `MOCKUP_CANVAS_BACKEND_URL` overrides the backend address.

use crate::engine::orchestrator::GenerationSettings;
use crate::engine::viewport::ViewportConfig;
use crate::io::client::BackendConfig;
use crate::io::serialization;
use crate::util::geometry::CoordinateSpace;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_ENV: &str = "MOCKUP_CANVAS_CONFIG";
pub const BACKEND_URL_ENV: &str = "MOCKUP_CANVAS_BACKEND_URL";
pub const DEFAULT_CONFIG_FILE: &str = "mockup-canvas.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub generation: GenerationSettings,
    /// World to render offset of the canvas surface.
    pub canvas: CoordinateSpace,
    pub viewport: ViewportConfig,
}

impl AppConfig {
    /// Load settings from the environment-selected file and apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let explicit = env_non_empty(CONFIG_ENV);
        let config = Self::load_from(explicit.as_deref().map(Path::new), Path::new(DEFAULT_CONFIG_FILE))?;
        Ok(config.with_backend_url(env_non_empty(BACKEND_URL_ENV)))
    }

    /// Load `explicit` (which must exist), else `fallback` if it exists,
    /// else defaults.
    pub fn load_from(explicit: Option<&Path>, fallback: &Path) -> Result<Self> {
        let config: Self = match explicit {
            Some(path) => {
                log::info!("Loading settings from {}", path.display());
                serialization::import(path)
                    .with_context(|| format!("{} points at an unreadable settings file", CONFIG_ENV))
            }
            None if fallback.exists() => {
                log::info!("Loading settings from {}", fallback.display());
                serialization::import(fallback)
            }
            None => {
                log::debug!("No settings file, using defaults");
                Ok(Self::default())
            }
        }?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let viewport = &self.viewport;
        ensure!(
            viewport.is_valid(),
            "viewport settings need finite values with 0 < min_scale <= max_scale and step > 0 \
             (got min_scale {}, max_scale {}, step {})",
            viewport.min_scale,
            viewport.max_scale,
            viewport.step
        );
        Ok(())
    }

    /// Replace the backend base URL when an override is given.
    pub fn with_backend_url(mut self, base_url: Option<String>) -> Self {
        if let Some(base_url) = base_url {
            log::info!("Backend URL overridden: {}", base_url);
            self.backend.base_url = base_url;
        }
        self
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
