// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project state management.
//!
//! A project is created when the backend returns a screen configuration
//! for a prompt. It carries the name and visual theme the backend picked
//! and the device class every screen is laid out for.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target device for the generated screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Mobile,
    Tablet,
    Web,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 3] = [DeviceClass::Mobile, DeviceClass::Tablet, DeviceClass::Web];

    /// Wire name used in `device_type` request fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
            DeviceClass::Web => "web",
        }
    }

    /// Human readable label for menus.
    pub fn label(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "Mobile",
            DeviceClass::Tablet => "Tablet",
            DeviceClass::Web => "Web",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual theme chosen by the backend for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Netflix,
    Spotify,
    Amazon,
    Apple,
    Custom,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Netflix => "netflix",
            Theme::Spotify => "spotify",
            Theme::Amazon => "amazon",
            Theme::Apple => "apple",
            Theme::Custom => "custom",
        }
    }

    /// Parse the backend's free-form theme string.
    ///
    /// Matching is case-insensitive; anything unrecognised becomes
    /// [`Theme::Custom`].
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Theme::Light,
            "netflix" => Theme::Netflix,
            "spotify" => Theme::Spotify,
            "amazon" => Theme::Amazon,
            "apple" => Theme::Apple,
            "custom" => Theme::Custom,
            other => {
                log::debug!("Unrecognised theme {:?}, using custom", other);
                Theme::Custom
            }
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The active project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub theme: Theme,
    pub device_class: DeviceClass,
}

impl Project {
    /// Create a new project with the given name, theme and device class.
    pub fn new(name: String, theme: Theme, device_class: DeviceClass) -> Self {
        Self {
            name,
            theme,
            device_class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_from_wire_is_case_insensitive() {
        assert_eq!(Theme::from_wire("Netflix"), Theme::Netflix);
        assert_eq!(Theme::from_wire(" SPOTIFY "), Theme::Spotify);
        assert_eq!(Theme::from_wire("light"), Theme::Light);
    }

    #[test]
    fn test_unknown_theme_is_custom() {
        assert_eq!(Theme::from_wire("cyberpunk"), Theme::Custom);
        assert_eq!(Theme::from_wire(""), Theme::Custom);
    }

    #[test]
    fn test_device_class_wire_names() {
        assert_eq!(DeviceClass::Mobile.as_str(), "mobile");
        assert_eq!(DeviceClass::Tablet.as_str(), "tablet");
        assert_eq!(DeviceClass::Web.as_str(), "web");

        let json = serde_json::to_string(&DeviceClass::Tablet).unwrap();
        assert_eq!(json, "\"tablet\"");
    }
}
