use crate::event::{Progress, StartInfo};

/// Receives non-terminal events while a session is open.
///
/// Every method defaults to a no-op so callers only implement what they
/// render. No method is called after the session settles or is cancelled.
pub trait EventSink {
    /// Progress update for the running operation.
    fn on_progress(&mut self, _progress: &Progress) {}

    /// Answer metadata (mode and backing sources).
    fn on_start(&mut self, _start: &StartInfo) {}

    /// Incremental answer text, in arrival order. Empty fragments are
    /// forwarded as received.
    fn on_delta(&mut self, _text: &str) {}
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn on_progress(&mut self, progress: &Progress) {
        (**self).on_progress(progress);
    }

    fn on_start(&mut self, start: &StartInfo) {
        (**self).on_start(start);
    }

    fn on_delta(&mut self, text: &str) {
        (**self).on_delta(text);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn on_progress(&mut self, progress: &Progress) {
        (**self).on_progress(progress);
    }

    fn on_start(&mut self, start: &StartInfo) {
        (**self).on_start(start);
    }

    fn on_delta(&mut self, text: &str) {
        (**self).on_delta(text);
    }
}

/// Sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {}

type ProgressFn = Box<dyn FnMut(&Progress) + Send>;
type StartFn = Box<dyn FnMut(&StartInfo) + Send>;
type DeltaFn = Box<dyn FnMut(&str) + Send>;

/// Closure-backed sink.
///
/// ```
/// use docqa_stream::sink::FnSink;
///
/// let sink = FnSink::new()
///     .progress(|p| println!("{:>3}% {}", p.percent, p.stage))
///     .delta(|text| print!("{text}"));
/// # drop(sink);
/// ```
#[derive(Default)]
pub struct FnSink {
    progress: Option<ProgressFn>,
    start: Option<StartFn>,
    delta: Option<DeltaFn>,
}

impl FnSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(mut self, f: impl FnMut(&Progress) + Send + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn start(mut self, f: impl FnMut(&StartInfo) + Send + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    pub fn delta(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.delta = Some(Box::new(f));
        self
    }
}

impl EventSink for FnSink {
    fn on_progress(&mut self, progress: &Progress) {
        if let Some(f) = self.progress.as_mut() {
            f(progress);
        }
    }

    fn on_start(&mut self, start: &StartInfo) {
        if let Some(f) = self.start.as_mut() {
            f(start);
        }
    }

    fn on_delta(&mut self, text: &str) {
        if let Some(f) = self.delta.as_mut() {
            f(text);
        }
    }
}

/// Sink that records every call; handy for tests and transcripts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordingSink {
    pub progress: Vec<Progress>,
    pub starts: Vec<StartInfo>,
    pub deltas: Vec<String>,
}

impl EventSink for RecordingSink {
    fn on_progress(&mut self, progress: &Progress) {
        self.progress.push(progress.clone());
    }

    fn on_start(&mut self, start: &StartInfo) {
        self.starts.push(start.clone());
    }

    fn on_delta(&mut self, text: &str) {
        self.deltas.push(text.to_string());
    }
}
