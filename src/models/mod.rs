// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: projects and the screens they contain.

pub mod project;
pub mod screen;

pub use project::{DeviceClass, Project, Theme};
pub use screen::{Geometry, Screen, ScreenConfig, ScreenContent, ScreenId, ScreenStatus};
