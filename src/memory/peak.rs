//! Per-thread rolling average of recently released contexts' peak usage.
//!
//! This is the "piggybacking" half of the feedback loop described in
//! spec.md §4.4: a thread that mostly frees contexts produced by another
//! thread never allocates anything itself, so it has no local history to
//! size its own pool from. `record_peak` is driven by both paths —
//! `Context::new` stamping a peak hint onto a freshly vended context, and
//! `Context::drop` feeding its own peak back into the releasing thread's
//! window — whichever thread actually tears a context down learns from it.

use std::cell::RefCell;
use std::collections::VecDeque;

use super::config;

struct PeakWindow {
    samples: VecDeque<usize>,
    sum: usize,
}

impl PeakWindow {
    fn new() -> Self {
        Self {
            samples: VecDeque::new(),
            sum: 0,
        }
    }

    fn push(&mut self, peak: usize, capacity: usize) {
        self.samples.push_back(peak);
        self.sum += peak;
        while self.samples.len() > capacity {
            if let Some(evicted) = self.samples.pop_front() {
                self.sum -= evicted;
            }
        }
    }

    fn average(&self) -> usize {
        if self.samples.is_empty() {
            0
        } else {
            self.sum / self.samples.len()
        }
    }
}

thread_local! {
    static WINDOW: RefCell<PeakWindow> = RefCell::new(PeakWindow::new());
}

/// Feeds one more peak-usage sample (bytes) into this thread's window.
pub(crate) fn record_peak(peak_bytes: usize) {
    let capacity = config::config().peak_history_length;
    WINDOW.with(|w| w.borrow_mut().push(peak_bytes, capacity));
}

/// This thread's rolling average of recent peak usage, zero if empty.
pub(crate) fn rolling_average() -> usize {
    WINDOW.with(|w| w.borrow().average())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_tracks_recent_samples_only() {
        config::configure(config::ArenaConfig {
            peak_history_length: 2,
            ..config::ArenaConfig::default()
        });
        record_peak(100);
        record_peak(200);
        record_peak(300);
        // window holds only the last two: 200, 300
        assert_eq!(rolling_average(), 250);
    }

    #[test]
    fn empty_window_averages_to_zero() {
        // fresh thread-local state since each test runs on its own thread
        assert_eq!(rolling_average(), 0);
    }
}
