// SPDX-License-Identifier: MIT OR Apache-2.0
//! The three user-tunable routing scalars.

use serde::{Deserialize, Serialize};

/// One of the adjustable routing scalars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdjustParam {
    /// Moves the middle segment of direct routes, or the detour distance
    PathOffset,
    /// Lengthens or shortens the stub leaving the start port
    StartAdjust,
    /// Lengthens or shortens the stub entering the end port
    EndAdjust,
}

impl AdjustParam {
    /// All parameters, in probing order
    pub const ALL: [AdjustParam; 3] = [
        AdjustParam::PathOffset,
        AdjustParam::StartAdjust,
        AdjustParam::EndAdjust,
    ];

    /// Field name used in saved documents
    pub fn name(&self) -> &'static str {
        match self {
            Self::PathOffset => "pathOffset",
            Self::StartAdjust => "startAdjust",
            Self::EndAdjust => "endAdjust",
        }
    }
}

/// Persisted routing adjustments of a connection
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustments {
    /// Offset of the middle segment / detour
    pub path_offset: f32,
    /// Start stub adjustment
    pub start_adjust: f32,
    /// End stub adjustment
    pub end_adjust: f32,
}

impl Adjustments {
    /// Read one parameter
    pub fn get(&self, param: AdjustParam) -> f32 {
        match param {
            AdjustParam::PathOffset => self.path_offset,
            AdjustParam::StartAdjust => self.start_adjust,
            AdjustParam::EndAdjust => self.end_adjust,
        }
    }

    /// Overwrite one parameter
    pub fn set(&mut self, param: AdjustParam, value: f32) {
        match param {
            AdjustParam::PathOffset => self.path_offset = value,
            AdjustParam::StartAdjust => self.start_adjust = value,
            AdjustParam::EndAdjust => self.end_adjust = value,
        }
    }

    /// Copy with one parameter shifted by `delta`
    pub fn nudged(&self, param: AdjustParam, delta: f32) -> Self {
        let mut copy = *self;
        copy.set(param, self.get(param) + delta);
        copy
    }
}
