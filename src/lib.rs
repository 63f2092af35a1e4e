// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Mockup Canvas
//!
//! Turns a natural-language app description into a row of generated
//! screens on a pannable, zoomable canvas. The backend is asked for a
//! screen list first, then for each screen's markup, one screen at a time.

pub mod app;
pub mod config;
pub mod engine;
pub mod io;
pub mod models;
pub mod ui;
pub mod util;
