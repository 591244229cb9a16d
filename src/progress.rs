//! Progress reports emitted by the reconstruction engines.
//!
//! The engines themselves do no I/O: after every iteration (ML-EM) or
//! sub-iteration (OSEM) they hand a `Progress` to an `Observer`, which may
//! print it, draw a progress bar, or ignore it.

use std::time::Duration;

use indicatif::ProgressStyle;

/// Which kind of step has just been completed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// A full ML-EM iteration
    Iteration,
    /// One subset of an OSEM iteration. All indices are 1-based.
    SubIteration { iteration: usize, subset: usize, subsets: usize },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    pub step: Step,
    /// 1-based position of this step among all the steps of the run
    pub index: usize,
    /// Number of steps the run will perform
    pub total: usize,
    /// Time since the run started
    pub elapsed: Duration,
}

impl Progress {
    pub fn is_last(&self) -> bool { self.index == self.total }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.step {
            Step::Iteration =>
                write!(f, "iteration {}/{}", self.index, self.total),
            Step::SubIteration { iteration, subset, subsets } =>
                write!(f, "sub-iteration {}/{} (iteration {iteration}, subset {subset}/{subsets})",
                       self.index, self.total),
        }
    }
}

pub trait Observer {
    fn report(&mut self, progress: &Progress);
}

/// Observer which ignores all reports
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Observer for Silent {
    fn report(&mut self, _: &Progress) {}
}

impl<F: FnMut(&Progress)> Observer for F {
    fn report(&mut self, progress: &Progress) { self(progress) }
}

/// Observer which drives a terminal progress bar
pub struct ProgressBar(indicatif::ProgressBar);

impl ProgressBar {

    pub fn new(total: usize, label: &str) -> Self {
        let bar = indicatif::ProgressBar::new(total as u64).with_prefix(label.to_string());
        bar.set_style(ProgressStyle::default_bar()
                      .template("{prefix}: [{elapsed_precise}] {wide_bar} {pos}/{len} {msg}")
                      .unwrap_or_else(|_| ProgressStyle::default_bar())
        );
        bar.tick();
        Self(bar)
    }

    /// A bar which is never drawn, for runs without a terminal
    pub fn hidden() -> Self { Self(indicatif::ProgressBar::hidden()) }
}

impl Observer for ProgressBar {
    fn report(&mut self, progress: &Progress) {
        self.0.set_position(progress.index as u64);
        if let Step::SubIteration { iteration, subset, subsets } = progress.step {
            self.0.set_message(format!("iteration {iteration}, subset {subset}/{subsets}"));
        }
        if progress.is_last() { self.0.finish() }
    }
}
