//! One independent batch of detector data.

use crate::hit::Hit;
use crate::track::Track;
use crate::truth::TrueBlip;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hits, tracks and optional truth for one readout event.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Run number.
    #[cfg_attr(feature = "serde", serde(default))]
    pub run: u32,
    /// Event number within the run.
    #[cfg_attr(feature = "serde", serde(default))]
    pub event: u32,
    /// Reconstructed hits.
    #[cfg_attr(feature = "serde", serde(default))]
    pub hits: Vec<Hit>,
    /// Reconstructed tracks.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tracks: Vec<Track>,
    /// Simulated depositions (empty for data).
    #[cfg_attr(feature = "serde", serde(default))]
    pub true_blips: Vec<TrueBlip>,
}

impl Event {
    /// Creates an event with hits only.
    #[must_use]
    pub fn from_hits(hits: Vec<Hit>) -> Self {
        Self {
            hits,
            ..Default::default()
        }
    }

    /// Adds tracks.
    #[must_use]
    pub fn with_tracks(mut self, tracks: Vec<Track>) -> Self {
        self.tracks = tracks;
        self
    }

    /// Adds true depositions.
    #[must_use]
    pub fn with_true_blips(mut self, true_blips: Vec<TrueBlip>) -> Self {
        self.true_blips = true_blips;
        self
    }

    /// Returns true if the event carries simulation truth.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        !self.true_blips.is_empty() || self.hits.iter().any(|h| h.truth.is_some())
    }
}
