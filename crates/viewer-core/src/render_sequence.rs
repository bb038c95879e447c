//! Render request bookkeeping for background rasterization.
//!
//! Every request gets a monotonically increasing sequence number. A newer
//! request for a page supersedes older ones, so a raster produced for a zoom
//! the user has already left is discarded when it arrives (last zoom wins).

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTicket {
    pub page_index: u32,
    pub zoom: f32,
    pub effective_dpi: f32,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Newest request for the page; the raster should be shown.
    Current,
    /// Superseded or unknown; the raster must be dropped.
    Stale,
}

#[derive(Debug, Default)]
pub struct RenderSequencer {
    sequence: u64,
    in_flight: HashMap<u32, u64>,
}

impl RenderSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, page_index: u32, zoom: f32, effective_dpi: f32) -> RenderTicket {
        self.sequence += 1;
        if let Some(previous) = self.in_flight.insert(page_index, self.sequence) {
            log::debug!(
                "render #{previous} of page {page_index} superseded by #{}",
                self.sequence
            );
        }

        RenderTicket { page_index, zoom, effective_dpi, sequence: self.sequence }
    }

    pub fn finish(&mut self, ticket: &RenderTicket) -> RenderOutcome {
        match self.in_flight.get(&ticket.page_index) {
            Some(latest) if *latest == ticket.sequence => {
                self.in_flight.remove(&ticket.page_index);
                RenderOutcome::Current
            }
            _ => RenderOutcome::Stale,
        }
    }

    /// Drops the pending request for a page, e.g. when its render failed.
    pub fn abandon(&mut self, ticket: &RenderTicket) {
        if self.in_flight.get(&ticket.page_index) == Some(&ticket.sequence) {
            self.in_flight.remove(&ticket.page_index);
        }
    }

    pub fn is_in_flight(&self, page_index: u32) -> bool {
        self.in_flight.contains_key(&page_index)
    }

    pub fn latest_sequence(&self) -> u64 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_request_is_current() {
        let mut sequencer = RenderSequencer::new();
        let ticket = sequencer.begin(0, 1.0, 300.0);

        assert!(sequencer.is_in_flight(0));
        assert_eq!(sequencer.finish(&ticket), RenderOutcome::Current);
        assert!(!sequencer.is_in_flight(0));
    }

    #[test]
    fn newer_zoom_for_same_page_wins() {
        let mut sequencer = RenderSequencer::new();
        let slow = sequencer.begin(3, 1.0, 300.0);
        let fast = sequencer.begin(3, 1.1, 330.0);

        assert!(fast.sequence > slow.sequence);
        assert_eq!(sequencer.finish(&fast), RenderOutcome::Current);
        assert_eq!(sequencer.finish(&slow), RenderOutcome::Stale);
    }

    #[test]
    fn stale_result_arriving_first_keeps_newer_request_pending() {
        let mut sequencer = RenderSequencer::new();
        let slow = sequencer.begin(1, 1.0, 300.0);
        let fast = sequencer.begin(1, 0.9, 270.0);

        assert_eq!(sequencer.finish(&slow), RenderOutcome::Stale);
        assert!(sequencer.is_in_flight(1));
        assert_eq!(sequencer.finish(&fast), RenderOutcome::Current);
    }

    #[test]
    fn pages_are_tracked_independently() {
        let mut sequencer = RenderSequencer::new();
        let first = sequencer.begin(0, 1.0, 300.0);
        let second = sequencer.begin(1, 1.0, 300.0);

        assert_eq!(sequencer.finish(&second), RenderOutcome::Current);
        assert_eq!(sequencer.finish(&first), RenderOutcome::Current);
    }

    #[test]
    fn abandon_only_clears_matching_request() {
        let mut sequencer = RenderSequencer::new();
        let old = sequencer.begin(0, 1.0, 300.0);
        let new = sequencer.begin(0, 2.0, 600.0);

        sequencer.abandon(&old);
        assert!(sequencer.is_in_flight(0));

        sequencer.abandon(&new);
        assert!(!sequencer.is_in_flight(0));
    }
}
