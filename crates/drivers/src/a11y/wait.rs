//! Suspending waits: content change, text appearance, screen stability.

use std::time::Duration;

use redress_types::ScreenState;
use tokio::time::{sleep, Instant};

use super::AccessibilityEngine;

/// Poll cadence for the content-change flag.
const CONTENT_POLL_MS: u64 = 100;

/// Capture cadence of the stability protocol.
const STABILITY_POLL_MS: u64 = 500;

impl AccessibilityEngine {
    /// Clears the content-change flag and waits until a new change event
    /// flips it, polling every 100 ms. `false` on deadline.
    pub async fn wait_for_content_change(&self, timeout_ms: u64) -> bool {
        self.take_content_changed();

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.content_changed() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(Duration::from_millis(CONTENT_POLL_MS)).await;
        }
    }

    /// Waits until some node matches `text`. Intermediate matches are
    /// released each poll.
    pub async fn wait_for_text(&self, text: &str, timeout_ms: u64, poll_ms: u64) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if !self.find_nodes_by_text(text).is_empty() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(Duration::from_millis(poll_ms)).await;
        }
    }

    /// Captures until two consecutive fingerprints match or the deadline
    /// passes, and returns the last captured state.
    ///
    /// Animations and progressive loads trip the change flag repeatedly;
    /// this converges on a settled screen instead of the first change.
    pub async fn wait_for_screen_stability(&self, timeout_ms: u64) -> ScreenState {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        sleep(Duration::from_millis(STABILITY_POLL_MS)).await;

        let mut last = self.capture_screen_state();
        let mut last_fingerprint = last.fingerprint();

        while Instant::now() < deadline {
            sleep(Duration::from_millis(STABILITY_POLL_MS)).await;
            let next = self.capture_screen_state();
            let fingerprint = next.fingerprint();
            if fingerprint == last_fingerprint {
                return next;
            }
            last = next;
            last_fingerprint = fingerprint;
        }

        last
    }
}
