// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Canvas geometry helpers: coordinate spaces and screen placement.

pub mod geometry;
pub mod layout;
