//! Single-line progress indicator for the download phase.
//!
//! Drawn on stderr and only when stderr is a terminal, so piped output and
//! test runs stay clean.

use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

pub struct ProgressBar {
    total: u64,
    current: u64,
    start_time: Instant,
    last_update: Instant,
    message: String,
    enabled: bool,
}

impl ProgressBar {
    pub fn new(total: u64, message: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            total,
            current: 0,
            start_time: now,
            last_update: now,
            message: message.into(),
            enabled: total > 0 && io::stderr().is_terminal(),
        }
    }

    pub fn advance(&mut self, n: u64) {
        self.current = (self.current + n).min(self.total);
        let now = Instant::now();

        // Redraw at most every 100ms
        if now.duration_since(self.last_update) > Duration::from_millis(100) {
            self.display();
            self.last_update = now;
        }
    }

    pub fn position(&self) -> u64 {
        self.current
    }

    /// Draw the final state and clear the line
    pub fn finish(&self) {
        if !self.enabled {
            return;
        }
        self.display();
        eprint!("\r\x1b[2K");
        let _ = io::stderr().flush();
    }

    fn display(&self) {
        if !self.enabled {
            return;
        }
        let percentage = (self.current * 100) / self.total.max(1);
        let secs = self.start_time.elapsed().as_secs_f64();
        let rate = if secs > 0.0 { self.current as f64 / secs } else { 0.0 };

        eprint!(
            "\r{} [{}/{}] {}% ({:.1}/s)",
            self.message, self.current, self.total, percentage, rate
        );
        let _ = io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_clamped() {
        let mut bar = ProgressBar::new(3, "Downloading");
        bar.advance(2);
        bar.advance(5);
        assert_eq!(bar.position(), 3);
        bar.finish();
    }
}
