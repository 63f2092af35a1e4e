// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Request and response bodies of the generation backend.
//!
//! Two calls make up a generation run: `generate-config` turns a prompt
//! into a project name, theme and an ordered list of screens, and
//! `generate-screen-ui` produces the markup for one of those screens.

use crate::models::{DeviceClass, Project, ScreenConfig, Theme};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub const MIN_PROMPT_CHARS: usize = 10;
pub const MAX_PROMPT_CHARS: usize = 500;
pub const MAX_SCREENS: usize = 10;

/// Body of `POST /api/generate-config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRequest {
    pub prompt: String,
    pub device_type: DeviceClass,
}

/// One entry of the `screens` array in a config response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenConfigWire {
    pub screen_id: i64,
    pub screen_name: String,
    pub purpose: String,
    pub screen_description: String,
}

/// Response of `POST /api/generate-config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub project_name: String,
    pub theme: String,
    pub screens: Vec<ScreenConfigWire>,
}

/// Body of `POST /api/generate-screen-ui`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRequest {
    pub screen_id: i64,
    pub screen_name: String,
    pub purpose: String,
    pub screen_description: String,
    pub device_type: DeviceClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

/// Response of `POST /api/generate-screen-ui`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenResponse {
    pub code: String,
    pub html_preview: String,
    pub success: bool,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Ways a config response can violate the contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigShapeError {
    #[error("project name is empty")]
    EmptyProjectName,
    #[error("response contains no screens")]
    NoScreens,
    #[error("screen id {0} appears more than once")]
    DuplicateScreenId(i64),
}

/// Trimmed prompt, or its length in characters if out of range.
pub fn validate_prompt(prompt: &str) -> Result<&str, usize> {
    let trimmed = prompt.trim();
    let len = trimmed.chars().count();
    if (MIN_PROMPT_CHARS..=MAX_PROMPT_CHARS).contains(&len) {
        Ok(trimmed)
    } else {
        Err(len)
    }
}

impl From<ScreenConfigWire> for ScreenConfig {
    fn from(wire: ScreenConfigWire) -> Self {
        ScreenConfig {
            server_id: wire.screen_id,
            name: wire.screen_name,
            purpose: wire.purpose,
            description: wire.screen_description,
        }
    }
}

impl ConfigResponse {
    /// Validate the response and turn it into a project plus the screens
    /// to create, clipped to `max_screens`.
    pub fn into_plan(
        self,
        device: DeviceClass,
        max_screens: usize,
    ) -> Result<(Project, Vec<ScreenConfig>), ConfigShapeError> {
        let name = self.project_name.trim();
        if name.is_empty() {
            return Err(ConfigShapeError::EmptyProjectName);
        }
        if self.screens.is_empty() {
            return Err(ConfigShapeError::NoScreens);
        }

        let mut seen = HashSet::new();
        for screen in &self.screens {
            if !seen.insert(screen.screen_id) {
                return Err(ConfigShapeError::DuplicateScreenId(screen.screen_id));
            }
        }

        let mut screens = self.screens;
        if screens.len() > max_screens {
            log::warn!(
                "Backend returned {} screens, keeping the first {}",
                screens.len(),
                max_screens
            );
            screens.truncate(max_screens);
        }

        let project = Project::new(name.to_string(), Theme::from_wire(&self.theme), device);
        Ok((project, screens.into_iter().map(ScreenConfig::from).collect()))
    }
}

impl ScreenRequest {
    pub fn for_screen(config: &ScreenConfig, device: DeviceClass, theme: Option<Theme>) -> Self {
        Self {
            screen_id: config.server_id,
            screen_name: config.name.clone(),
            purpose: config.purpose.clone(),
            screen_description: config.description.clone(),
            device_type: device,
            theme: theme.map(|t| t.as_str().to_string()),
        }
    }
}
