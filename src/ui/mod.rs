// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the Mockup Canvas application.

pub mod canvas;
pub mod progress;
pub mod properties;
pub mod toolbar;
