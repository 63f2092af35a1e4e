// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Initial placement of screens on the canvas.
//!
//! Screens are packed left to right in a single row, in the order they
//! were created. Each device class has a fixed frame size and gap.

use crate::models::{DeviceClass, Geometry};

/// Frame size and horizontal spacing for one device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePreset {
    pub width: i32,
    pub height: i32,
    pub gap: i32,
}

impl DevicePreset {
    pub const fn for_device(device: DeviceClass) -> Self {
        match device {
            DeviceClass::Mobile => Self { width: 400, height: 812, gap: 30 },
            DeviceClass::Tablet => Self { width: 768, height: 1024, gap: 60 },
            DeviceClass::Web => Self { width: 1280, height: 800, gap: 100 },
        }
    }

    /// Horizontal distance between the left edges of neighbouring screens.
    pub const fn stride(&self) -> i32 {
        self.width + self.gap
    }
}

/// Geometry of the screen at `index` for the given device class.
///
/// `x = index * (w + gap)`, `y = 0`. Indices beyond what fits in `i32`
/// saturate at the far right edge; real projects hold at most a handful.
pub fn plan(index: usize, device: DeviceClass) -> Geometry {
    let preset = DevicePreset::for_device(device);
    let x = i32::try_from(index)
        .ok()
        .and_then(|i| i.checked_mul(preset.stride()))
        .unwrap_or(i32::MAX - preset.width);

    Geometry {
        x,
        y: 0,
        w: preset.width,
        h: preset.height,
    }
}

/// Geometries for indices `0..count`.
pub fn plan_all(count: usize, device: DeviceClass) -> Vec<Geometry> {
    (0..count).map(|index| plan(index, device)).collect()
}
