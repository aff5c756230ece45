//! Cosmetic progress bar driver. It is not tied to real transfer progress.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub text: String,
}

/// Hands out tickers; starting a new one supersedes whichever is still running.
#[derive(Debug, Clone, Default)]
pub struct ProgressBar {
    generation: Arc<AtomicU64>,
}

impl ProgressBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, from: u8, to: u8, text: &str) -> ProgressTicker {
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        ProgressTicker {
            generation: Arc::clone(&self.generation),
            id,
            current: from.min(100),
            target: to.min(100),
            text: text.to_string(),
        }
    }

    /// Stop any running ticker and report a final position.
    pub fn finish(&self, percent: u8, text: &str) -> ProgressUpdate {
        self.generation.fetch_add(1, Ordering::SeqCst);
        ProgressUpdate {
            percent: percent.min(100),
            text: text.to_string(),
        }
    }
}

pub struct ProgressTicker {
    generation: Arc<AtomicU64>,
    id: u64,
    current: u8,
    target: u8,
    text: String,
}

impl ProgressTicker {
    pub fn is_superseded(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.id
    }

    /// Next step, or `None` once the target is reached or a newer ticker started.
    pub fn step(&mut self) -> Option<ProgressUpdate> {
        if self.current >= self.target || self.is_superseded() {
            return None;
        }
        self.current += 1;
        Some(ProgressUpdate {
            percent: self.current,
            text: self.text.clone(),
        })
    }

    /// Emit one step per `interval` until done.
    pub fn run(mut self, interval: Duration, mut emit: impl FnMut(ProgressUpdate)) {
        while let Some(update) = self.step() {
            emit(update);
            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }
    }
}
