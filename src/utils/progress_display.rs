/// Terminal progress display for barcode runs
///
/// Redraws a single line on stderr so JSON written to stdout stays clean.
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::pipeline::ProgressListener;

const BAR_WIDTH: usize = 40;

struct DisplayState {
    last_update: Option<Instant>,
    fraction: f64,
}

/// Progress bar fed by the pipeline's overall fraction
pub struct TerminalProgress {
    width: usize,
    start_time: Instant,
    update_interval: Duration,
    finished: AtomicBool,
    state: Mutex<DisplayState>,
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            width: BAR_WIDTH,
            start_time: Instant::now(),
            update_interval: Duration::from_millis(100),
            finished: AtomicBool::new(false),
            state: Mutex::new(DisplayState {
                last_update: None,
                fraction: 0.0,
            }),
        }
    }

    /// Estimated time remaining at `fraction` complete
    pub fn eta(&self, fraction: f64) -> Option<Duration> {
        eta(self.start_time.elapsed(), fraction)
    }

    /// Draw the final state and move to the next line
    pub fn finish(&self, message: &str) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "\r\x1b[2K{} [{}] 100.0% - {}",
            message,
            render_bar(1.0, self.width),
            format_duration(self.start_time.elapsed())
        );
    }
}

impl ProgressListener for TerminalProgress {
    fn report(&self, fraction: f64, message: &str) {
        if self.finished.load(Ordering::Relaxed) {
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        // Progress can arrive out of order from worker threads
        state.fraction = state.fraction.max(fraction.clamp(0.0, 1.0));
        let now = Instant::now();
        if let Some(last) = state.last_update {
            if now.duration_since(last) < self.update_interval {
                return;
            }
        }
        state.last_update = Some(now);

        let eta = self
            .eta(state.fraction)
            .map(format_duration)
            .unwrap_or_else(|| "calculating...".to_string());
        let mut stderr = io::stderr().lock();
        let _ = write!(
            stderr,
            "\r\x1b[2K{} [{}] {:.1}% | ETA: {}",
            message,
            render_bar(state.fraction, self.width),
            state.fraction * 100.0,
            eta
        );
        let _ = stderr.flush();
    }
}

/// `█` for the done part, `░` for the rest
pub fn render_bar(fraction: f64, width: usize) -> String {
    let filled = ((width as f64) * fraction.clamp(0.0, 1.0)).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn eta(elapsed: Duration, fraction: f64) -> Option<Duration> {
    if fraction <= 0.0 || fraction >= 1.0 {
        return None;
    }
    let total = elapsed.as_secs_f64() / fraction;
    Some(Duration::from_secs_f64(total - elapsed.as_secs_f64()))
}

/// `1h 02m 03s`, `2m 03s` or `3.4s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
