// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O: the generation backend contract and transport, and settings files.

pub mod api;
pub mod client;
pub mod serialization;
