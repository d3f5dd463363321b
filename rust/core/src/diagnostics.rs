// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Non-fatal conditions recorded on a mapping result.

use serde::{Deserialize, Serialize};

/// Catalog quantity that was substituted by its nearest stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuantity {
    HeightRatio,
    DepthRatio,
    Pitch,
    Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Diagnostic {
    /// Nearest catalog value used instead of the requested one
    NoExactMatch {
        quantity: MatchQuantity,
        requested: f64,
        selected: f64,
    },
    /// Tap could not be assigned to any sub-element
    UnmappedTap { tap: usize, surface: u8 },
    /// Tap left without a tributary region
    DegenerateTessellation {
        tap: usize,
        surface: u8,
        reason: String,
    },
}

/// Ordered diagnostic log of one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and emit it as a warning event
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::NoExactMatch {
                quantity,
                requested,
                selected,
            } => tracing::warn!(
                ?quantity,
                requested = *requested,
                selected = *selected,
                "No exact catalog match, using nearest value"
            ),
            Diagnostic::UnmappedTap { tap, surface } => tracing::warn!(
                tap = *tap,
                surface = *surface,
                "Tap not assigned to any sub-element"
            ),
            Diagnostic::DegenerateTessellation {
                tap,
                surface,
                reason,
            } => tracing::warn!(
                tap = *tap,
                surface = *surface,
                reason = %reason,
                "Tap has no tributary region"
            ),
        }
        self.0.push(diagnostic);
    }

    /// Append diagnostics already emitted by another log
    pub fn append(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}
