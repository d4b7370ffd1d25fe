// file: src/pipeline/progress.rs
// description: progress tracking and statistics reporting for pipeline runs
// reference: uses indicatif for progress bars and tracks per-step counters

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::cell::Cell;
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    pub steps_total: usize,
    pub steps_executed: usize,
    pub steps_skipped: usize,
    pub duration_secs: f64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps that never ran because the pipeline halted or failed first.
    pub fn steps_pending(&self) -> usize {
        self.steps_total
            .saturating_sub(self.steps_executed + self.steps_skipped)
    }

    pub fn skip_rate(&self) -> f64 {
        let seen = self.steps_executed + self.steps_skipped;
        if seen == 0 {
            return 0.0;
        }
        (self.steps_skipped as f64 / seen as f64) * 100.0
    }
}

pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    steps_total: usize,
    steps_executed: Cell<usize>,
    steps_skipped: Cell<usize>,
    start_time: Instant,
}

impl ProgressTracker {
    /// Tracker that counts but never draws.
    pub fn hidden(total_steps: usize) -> Self {
        Self::build(total_steps, None)
    }

    pub fn with_color(total_steps: usize, colored: bool) -> Self {
        Self::build(total_steps, Some(colored))
    }

    fn build(total_steps: usize, visible: Option<bool>) -> Self {
        let (main_bar, detail_bar) = match visible {
            Some(colored) => {
                let multi_progress = MultiProgress::new();
                (
                    create_progress_bar(&multi_progress, total_steps as u64, colored),
                    create_detail_bar(&multi_progress),
                )
            }
            None => {
                let multi_progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
                (
                    multi_progress.add(ProgressBar::new(total_steps as u64)),
                    multi_progress.add(ProgressBar::new(0)),
                )
            }
        };

        Self {
            main_bar,
            detail_bar,
            steps_total: total_steps,
            steps_executed: Cell::new(0),
            steps_skipped: Cell::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn start_step(&self, name: &str) {
        self.main_bar.set_message(name.to_string());
    }

    pub fn inc_steps_executed(&self) {
        self.steps_executed.set(self.steps_executed.get() + 1);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn inc_steps_skipped(&self) {
        self.steps_skipped.set(self.steps_skipped.get() + 1);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    /// Idempotent; dropping an unfinished tracker finishes it.
    pub fn finish(&self) {
        if self.main_bar.is_finished() {
            return;
        }
        self.main_bar.finish_with_message("Pipeline finished");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            steps_total: self.steps_total,
            steps_executed: self.steps_executed.get(),
            steps_skipped: self.steps_skipped.get(),
            duration_secs: self.start_time.elapsed().as_secs_f64(),
        }
    }

    fn update_detail_bar(&self) {
        let message = format!(
            "Executed: {} | Reused: {}",
            self.steps_executed.get(),
            self.steps_skipped.get()
        );

        self.detail_bar.set_message(message);
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64, colored: bool) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    if colored {
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Failed to create progress bar template")
                .progress_chars("█▓▒░"),
        );
    } else {
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}")
                .expect("Failed to create progress bar template")
                .progress_chars("=>-"),
        );
    }
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    let style = ProgressStyle::default_bar()
        .template("{msg}")
        .expect("Failed to create detail bar template");
    bar.set_style(style);
    bar
}
