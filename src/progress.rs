use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

/// Receives batch progress. Calls to [`ProgressReporter::advance`] carry a strictly increasing
/// completion count, whatever order the workers finish in.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, _total: u64) {}

    fn advance(&self, done: u64, name: &str, ok: bool);

    fn finish(&self) {}
}

/// Discards all progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn advance(&self, _done: u64, _name: &str, _ok: bool) {}
}

/// Terminal progress bar.
pub struct IndicatifReporter {
    bar: ProgressBar,
}

impl IndicatifReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let template = "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
        if let Ok(style) = ProgressStyle::with_template(template) {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for IndicatifReporter {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn advance(&self, done: u64, name: &str, ok: bool) {
        self.bar.set_position(done);
        let status = if ok { "done" } else { "failed" };
        self.bar.set_message(format!("{name}: {status}"));
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Serializes completions so the reporter sees counts in order.
pub(crate) struct CompletionCounter<'a> {
    done: Mutex<u64>,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> CompletionCounter<'a> {
    pub(crate) fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            done: Mutex::new(0),
            reporter,
        }
    }

    pub(crate) fn complete(&self, name: &str, ok: bool) -> u64 {
        let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
        *done += 1;
        self.reporter.advance(*done, name, ok);
        *done
    }
}
