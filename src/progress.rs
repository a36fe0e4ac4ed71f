use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

/// Status reported by the engine for one progress update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Downloading,
    Finished,
    Other(String),
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s {
            "downloading" => Status::Downloading,
            "finished" => Status::Finished,
            other => Status::Other(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Status::from(s.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressEvent {
    pub status: Status,
    #[serde(default, deserialize_with = "deserialize_byte_count")]
    pub downloaded_bytes: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_byte_count")]
    pub total_bytes: Option<u64>,
}

impl ProgressEvent {
    pub fn downloading(downloaded_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            status: Status::Downloading,
            downloaded_bytes: Some(downloaded_bytes),
            total_bytes,
        }
    }

    pub fn finished() -> Self {
        Self {
            status: Status::Finished,
            downloaded_bytes: None,
            total_bytes: None,
        }
    }
}

// yt-dlp reports byte counts as ints, but floats and nulls show up for
// estimated sizes.
fn deserialize_byte_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let n: Option<serde_json::Number> = Option::deserialize(deserializer)?;
    Ok(n.and_then(|n| {
        n.as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Downloading,
    Finished,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    pub total_bytes: Option<u64>,
    pub downloaded_bytes: u64,
    pub phase: Phase,
}

/// A progress display for one download.
pub trait ProgressWidget {
    fn advance(&mut self, delta: u64);
    /// Turns an unbounded counter into a bar of `total` bytes.
    fn set_total(&mut self, total: u64);
    fn finish(self);
    fn abandon(self, reason: &str);
}

pub trait WidgetFactory {
    type Widget: ProgressWidget;

    /// `None` asks for an unbounded counter.
    fn create(&self, total: Option<u64>) -> Self::Widget;
}

/// Turns engine status events into widget updates.
///
/// The widget is created lazily on the first downloading event, since the
/// engine may report before it knows the total size. Dropping the tracker
/// abandons a widget that is still open.
pub struct ProgressTracker<F: WidgetFactory> {
    factory: F,
    widget: Option<F::Widget>,
    state: ProgressState,
}

impl<F: WidgetFactory> ProgressTracker<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            widget: None,
            state: ProgressState {
                total_bytes: None,
                downloaded_bytes: 0,
                phase: Phase::Idle,
            },
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    fn is_done(&self) -> bool {
        matches!(self.state.phase, Phase::Finished | Phase::Aborted)
    }

    pub fn handle(&mut self, event: ProgressEvent) {
        if self.is_done() {
            debug!("Ignoring {:?} after {:?}", event, self.state.phase);
            return;
        }

        match event.status {
            Status::Downloading => self.on_downloading(event.downloaded_bytes, event.total_bytes),
            Status::Finished => self.finish(),
            Status::Other(status) => debug!("Ignoring progress status {:?}", status),
        }
    }

    fn on_downloading(&mut self, downloaded: Option<u64>, total: Option<u64>) {
        let new_total = match (self.state.total_bytes, total) {
            (None, Some(total)) => {
                self.state.total_bytes = Some(total);
                Some(total)
            }
            (Some(known), Some(total)) if known != total => {
                debug!("Keeping total of {} bytes, engine now reports {}", known, total);
                None
            }
            _ => None,
        };

        match self.widget.as_mut() {
            None => {
                self.widget = Some(self.factory.create(self.state.total_bytes));
                self.state.phase = Phase::Downloading;
            }
            Some(widget) => {
                if let Some(total) = new_total {
                    widget.set_total(total);
                }
            }
        }

        if let Some(downloaded) = downloaded {
            let delta = downloaded.saturating_sub(self.state.downloaded_bytes);
            if downloaded < self.state.downloaded_bytes {
                warn!(
                    "Engine went back from {} to {} bytes",
                    self.state.downloaded_bytes, downloaded
                );
            }
            self.state.downloaded_bytes += delta;

            if let Some(widget) = self.widget.as_mut() {
                widget.advance(delta);
            }
        }
    }

    /// Releases the widget, if any. Later events are ignored.
    pub fn finish(&mut self) {
        if self.is_done() {
            return;
        }
        if let Some(widget) = self.widget.take() {
            widget.finish();
        }
        self.state.phase = Phase::Finished;
    }

    /// Abandons the widget, if any. Later events are ignored.
    pub fn abort(&mut self, reason: &str) {
        if self.is_done() {
            return;
        }
        if let Some(widget) = self.widget.take() {
            widget.abandon(reason);
        }
        self.state.phase = Phase::Aborted;
    }
}

impl<F: WidgetFactory> Drop for ProgressTracker<F> {
    fn drop(&mut self) {
        if let Some(widget) = self.widget.take() {
            widget.abandon("interrupted");
        }
    }
}

/// Renders progress as an indicatif bar on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBars;

pub struct TerminalBar {
    pb: ProgressBar,
}

fn bounded_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({binary_bytes_per_sec}) ETA {eta}",
    )
    .map(|s| s.progress_chars("=>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn counter_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg} {bytes} ({binary_bytes_per_sec})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl WidgetFactory for TerminalBars {
    type Widget = TerminalBar;

    fn create(&self, total: Option<u64>) -> TerminalBar {
        let pb = match total {
            Some(total) => ProgressBar::new(total).with_style(bounded_style()),
            None => {
                let pb = ProgressBar::new_spinner().with_style(counter_style());
                pb.enable_steady_tick(Duration::from_millis(120));
                pb
            }
        };
        pb.set_message("Downloading");

        TerminalBar { pb }
    }
}

impl ProgressWidget for TerminalBar {
    fn advance(&mut self, delta: u64) {
        self.pb.inc(delta);
    }

    fn set_total(&mut self, total: u64) {
        self.pb.disable_steady_tick();
        self.pb.set_style(bounded_style());
        self.pb.set_length(total);
    }

    fn finish(self) {
        self.pb
            .finish_with_message("Done downloading, now post-processing ...");
    }

    fn abandon(self, reason: &str) {
        self.pb.abandon_with_message(format!("Failed: {}", reason));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::{ProgressWidget, WidgetFactory};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Create(Option<u64>),
        Advance(u64),
        SetTotal(u64),
        Finish,
        Abandon(String),
    }

    /// Records every widget call in order.
    #[derive(Clone, Default)]
    pub struct Recorder {
        pub calls: Arc<Mutex<Vec<Call>>>,
    }

    impl Recorder {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls().iter().filter(|c| pred(c)).count()
        }

        pub fn released(&self) -> usize {
            self.count(|c| matches!(c, Call::Finish | Call::Abandon(_)))
        }
    }

    pub struct RecordedWidget {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl WidgetFactory for Recorder {
        type Widget = RecordedWidget;

        fn create(&self, total: Option<u64>) -> RecordedWidget {
            self.calls.lock().unwrap().push(Call::Create(total));
            RecordedWidget {
                calls: self.calls.clone(),
            }
        }
    }

    impl ProgressWidget for RecordedWidget {
        fn advance(&mut self, delta: u64) {
            self.calls.lock().unwrap().push(Call::Advance(delta));
        }

        fn set_total(&mut self, total: u64) {
            self.calls.lock().unwrap().push(Call::SetTotal(total));
        }

        fn finish(self) {
            self.calls.lock().unwrap().push(Call::Finish);
        }

        fn abandon(self, reason: &str) {
            self.calls.lock().unwrap().push(Call::Abandon(reason.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Call, Recorder};
    use super::*;

    #[test]
    fn duplicate_event_advances_by_zero() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(recorder.clone());

        tracker.handle(ProgressEvent::downloading(200, Some(1000)));
        tracker.handle(ProgressEvent::downloading(200, Some(1000)));
        tracker.handle(ProgressEvent::finished());

        assert_eq!(
            recorder.calls(),
            vec![
                Call::Create(Some(1000)),
                Call::Advance(200),
                Call::Advance(0),
                Call::Finish,
            ]
        );
        assert_eq!(tracker.state().phase, Phase::Finished);
    }

    #[test]
    fn advanced_total_matches_last_event() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(recorder.clone());

        for downloaded in [0, 10, 10, 512, 4000, 4096] {
            tracker.handle(ProgressEvent::downloading(downloaded, Some(4096)));
        }

        let advanced: u64 = recorder
            .calls()
            .iter()
            .map(|c| match c {
                Call::Advance(n) => *n,
                _ => 0,
            })
            .sum();
        assert_eq!(advanced, 4096);
        assert_eq!(recorder.count(|c| matches!(c, Call::Create(_))), 1);
        assert_eq!(tracker.state().downloaded_bytes, 4096);
        assert_eq!(tracker.state().phase, Phase::Downloading);
    }

    #[test]
    fn backwards_event_is_clamped() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(recorder.clone());

        tracker.handle(ProgressEvent::downloading(500, Some(1000)));
        tracker.handle(ProgressEvent::downloading(300, Some(1000)));
        tracker.handle(ProgressEvent::downloading(600, Some(1000)));

        assert_eq!(
            recorder.calls()[1..],
            [Call::Advance(500), Call::Advance(0), Call::Advance(100)]
        );
        assert_eq!(tracker.state().downloaded_bytes, 600);
    }

    #[test]
    fn unknown_total_degrades_to_counter() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(recorder.clone());

        tracker.handle(ProgressEvent::downloading(100, None));
        tracker.handle(ProgressEvent::downloading(300, None));
        tracker.handle(ProgressEvent::downloading(400, Some(2000)));
        tracker.handle(ProgressEvent::downloading(500, Some(9999)));

        assert_eq!(
            recorder.calls(),
            vec![
                Call::Create(None),
                Call::Advance(100),
                Call::Advance(200),
                Call::SetTotal(2000),
                Call::Advance(100),
                Call::Advance(100),
            ]
        );
        assert_eq!(tracker.state().total_bytes, Some(2000));
    }

    #[test]
    fn finished_without_downloading_is_safe() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(recorder.clone());

        tracker.handle(ProgressEvent::finished());
        tracker.handle(ProgressEvent::downloading(10, Some(10)));
        drop(tracker);

        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn abort_before_any_event_is_noop() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(recorder.clone());

        tracker.abort("network down");
        tracker.abort("again");
        assert_eq!(tracker.state().phase, Phase::Aborted);
        drop(tracker);

        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn abort_releases_once() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(recorder.clone());

        tracker.handle(ProgressEvent::downloading(1, Some(10)));
        tracker.abort("network down");
        tracker.finish();
        drop(tracker);

        assert_eq!(recorder.released(), 1);
        assert_eq!(
            recorder.calls().last(),
            Some(&Call::Abandon("network down".to_string()))
        );
    }

    #[test]
    fn drop_abandons_open_widget() {
        let recorder = Recorder::default();
        {
            let mut tracker = ProgressTracker::new(recorder.clone());
            tracker.handle(ProgressEvent::downloading(1, Some(10)));
        }

        assert_eq!(
            recorder.calls().last(),
            Some(&Call::Abandon("interrupted".to_string()))
        );
        assert_eq!(recorder.released(), 1);
    }

    #[test]
    fn other_status_is_ignored() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(recorder.clone());

        tracker.handle(ProgressEvent {
            status: Status::Other("error".to_string()),
            downloaded_bytes: Some(5),
            total_bytes: Some(10),
        });

        assert!(recorder.calls().is_empty());
        assert_eq!(tracker.state().phase, Phase::Idle);
    }

    #[test]
    fn parses_engine_json() {
        let event: ProgressEvent = serde_json::from_str(
            r#"{"status": "downloading", "downloaded_bytes": 1024, "total_bytes": null, "total_bytes_estimate": 4096.5, "eta": 3}"#,
        )
        .unwrap();
        assert_eq!(event, ProgressEvent::downloading(1024, None));

        let event: ProgressEvent =
            serde_json::from_str(r#"{"status": "finished", "total_bytes": 2048.0}"#).unwrap();
        assert_eq!(event.status, Status::Finished);
        assert_eq!(event.total_bytes, Some(2048));
        assert_eq!(event.downloaded_bytes, None);
    }
}
