use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use propest::engine::progress::{Progress, ProgressCallback};
use std::time::Duration;

const SPINNER_TICK_MS: u64 = 80;

/// Renders workflow progress on stderr. Phases show as a spinner; tasks (one step per
/// property) as a bar whose message carries the request status.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: ProgressBar,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr())
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.finish_and_clear();
        Self { pb }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();
        Box::new(move |progress: Progress| Self::apply(&pb, progress))
    }

    fn apply(pb: &ProgressBar, progress: Progress) {
        match progress {
            Progress::PhaseStart { name } => {
                pb.reset();
                pb.set_length(0);
                pb.set_style(Self::spinner_style());
                pb.set_message(name);
                pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
            }
            Progress::PhaseFinish => {
                pb.disable_steady_tick();
                pb.finish_with_message("✓ Done");
            }
            Progress::TaskStart { total_steps } => {
                pb.disable_steady_tick();
                pb.reset();
                pb.set_style(Self::bar_style());
                pb.set_length(total_steps);
                pb.set_position(0);
            }
            // Polls report absolute counts; a stale snapshot must not rewind the bar.
            Progress::TaskProgress { completed } if completed > pb.position() => {
                pb.set_position(completed);
            }
            Progress::TaskProgress { .. } => {}
            Progress::TaskFinish => {
                let length = pb.length().unwrap_or(0);
                pb.set_position(pb.position().max(length));
                pb.finish();
            }
            Progress::StatusUpdate { text } => pb.set_message(text),
            Progress::Message(msg) if pb.is_finished() => pb.set_message(msg),
            Progress::Message(msg) => pb.println(format!("  {}", msg)),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
            .expect("Failed to create spinner style template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{msg:<12} [{bar:40.cyan/blue}] {pos}/{len} properties ({elapsed_precise})",
        )
        .expect("Failed to create bar style template")
        .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> (CliProgressHandler, ProgressCallback<'static>) {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();
        (handler, callback)
    }

    #[test]
    fn new_handler_is_idle() {
        let handler = CliProgressHandler::new();
        assert_eq!(handler.pb.length(), Some(0));
        assert!(handler.pb.is_finished());
    }

    #[test]
    fn estimation_events_drive_the_bar() {
        let (handler, callback) = handler();

        callback(Progress::PhaseStart {
            name: "Estimating Properties",
        });
        assert_eq!(handler.pb.message(), "Estimating Properties");
        assert!(!handler.pb.is_finished());

        callback(Progress::TaskStart { total_steps: 10 });
        assert_eq!(handler.pb.length(), Some(10));
        assert_eq!(handler.pb.position(), 0);

        callback(Progress::TaskProgress { completed: 4 });
        callback(Progress::StatusUpdate {
            text: "running".to_string(),
        });
        assert_eq!(handler.pb.position(), 4);
        assert_eq!(handler.pb.message(), "running");

        callback(Progress::TaskFinish);
        assert!(handler.pb.is_finished());
        assert_eq!(handler.pb.position(), 10);

        callback(Progress::PhaseFinish);
        assert_eq!(handler.pb.message(), "✓ Done");
    }

    #[test]
    fn stale_progress_does_not_rewind() {
        let (handler, callback) = handler();

        callback(Progress::TaskStart { total_steps: 5 });
        callback(Progress::TaskProgress { completed: 3 });
        callback(Progress::TaskProgress { completed: 2 });

        assert_eq!(handler.pb.position(), 3);
    }

    #[test]
    fn messages_after_a_phase_replace_the_final_text() {
        let (handler, callback) = handler();

        callback(Progress::PhaseStart { name: "Merging" });
        callback(Progress::PhaseFinish);
        callback(Progress::Message("3 of 10 properties could not be estimated".to_string()));

        assert_eq!(
            handler.pb.message(),
            "3 of 10 properties could not be estimated"
        );
    }

    #[test]
    fn callback_can_be_used_from_a_worker_thread() {
        let (handler, callback) = handler();

        std::thread::spawn(move || {
            callback(Progress::PhaseStart {
                name: "Thread Test",
            });
            callback(Progress::TaskProgress { completed: 1 });
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        assert!(handler.pb.is_finished());
        assert_eq!(handler.pb.message(), "✓ Done");
    }
}
