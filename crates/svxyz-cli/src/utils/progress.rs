use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use svxyz::engine::progress::{Progress, ProgressCallback, ProgressReporter};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Renders workflow [`Progress`] events as a spinner per phase and a bar per counted task.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    /// A handler drawing to stderr, or drawing nothing when `hidden`.
    pub fn new(hidden: bool) -> Self {
        let target = if hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        let pb = ProgressBar::with_draw_target(Some(0), target).with_style(Self::spinner_style());
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn reporter(&self) -> ProgressReporter<'static> {
        ProgressReporter::with_callback(self.get_callback())
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(bar) = pb.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };
            Self::apply(&bar, progress);
        })
    }

    fn apply(bar: &ProgressBar, progress: Progress) {
        match progress {
            Progress::PhaseStart { name } => {
                bar.reset();
                bar.set_length(0);
                bar.set_style(Self::spinner_style());
                bar.set_message(name);
                bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
            }
            Progress::PhaseFinish => {
                bar.disable_steady_tick();
                let phase = bar.message();
                bar.finish_with_message(format!("✓ {}", phase));
            }
            Progress::TaskStart { total_steps } => {
                bar.disable_steady_tick();
                bar.reset();
                bar.set_style(Self::bar_style());
                bar.set_length(total_steps);
                bar.set_position(0);
            }
            Progress::TaskIncrement => bar.inc(1),
            Progress::TaskFinish => {
                let total = bar.length().unwrap_or(0);
                bar.set_position(total.max(bar.position()));
                bar.set_style(Self::spinner_style());
                bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
            }
            Progress::Message(msg) => bar.println(format!("  {}", msg)),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<22} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            })
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new(true);
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert!(pb.is_finished());
    }

    #[test]
    fn phases_and_tasks_drive_the_bar() {
        let handler = CliProgressHandler::new(true);
        let reporter = handler.reporter();

        reporter.report(Progress::PhaseStart {
            name: "Filtering frames",
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.message(), "Filtering frames");
            assert!(!pb.is_finished());
        }

        reporter.report(Progress::TaskStart { total_steps: 40 });
        reporter.report(Progress::TaskIncrement);
        reporter.report(Progress::TaskIncrement);
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.length(), Some(40));
            assert_eq!(pb.position(), 2);
        }

        reporter.report(Progress::TaskFinish);
        assert_eq!(handler.pb.lock().unwrap().position(), 40);

        reporter.report(Progress::PhaseFinish);
        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✓ Filtering frames");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new(true);
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart {
                name: "Reading inputs",
            });
            callback(Progress::Message("3 files".into()));
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✓ Reading inputs");
    }
}
