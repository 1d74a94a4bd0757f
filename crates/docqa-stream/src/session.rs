use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::completion::{Completion, Transcript};
use crate::config::StreamConfig;
use crate::consume::AbortSignal;
use crate::errors::{FramingError, StreamError, TransportError};
use crate::event::Event;
use crate::framer::{LineFramer, LineRecord};
use crate::sink::EventSink;

/// Terminal flag of a session. Leaves `Open` at most once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Completed,
    Failed,
}

/// Per-call state for one streamed response.
///
/// A session owns its framer buffer, answer accumulator and terminal flag. It
/// settles exactly once, either with the completion mapping's output or with a
/// [`StreamError`]; nothing reaches the sink afterwards. Sessions are not
/// reusable: start a new one for every response.
pub struct StreamSession<S, C: Completion> {
    id: uuid::Uuid,
    framer: LineFramer,
    sink: S,
    completion: C,
    transcript: Transcript,
    state: SessionState,
    outcome: Option<Result<C::Output, StreamError>>,
    progress_events: u64,
    abort: Option<AbortSignal>,
    cancelled: bool,
}

impl<S: EventSink, C: Completion> StreamSession<S, C> {
    pub fn new(sink: S, completion: C) -> Self {
        Self::with_config(sink, completion, &StreamConfig::default())
    }

    pub fn with_config(sink: S, completion: C, config: &StreamConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            framer: LineFramer::new().with_max_line_bytes(config.max_line_bytes),
            sink,
            completion,
            transcript: Transcript::default(),
            state: SessionState::Open,
            outcome: None,
            progress_events: 0,
            abort: None,
            cancelled: false,
        }
    }

    /// Stops all dispatch as soon as `signal` reports an abort.
    pub fn with_abort(mut self, signal: AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }

    /// Session id used in logs.
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.state != SessionState::Open
    }

    /// True once consumption was aborted. A cancelled session never settles.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Answer text and start metadata seen so far.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Number of progress events forwarded to the sink.
    pub fn progress_count(&self) -> u64 {
        self.progress_events
    }

    /// Label of the completion mapping (`upload`, `query`).
    pub fn kind(&self) -> &'static str {
        self.completion.kind()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Stops the session without settling it.
    pub fn cancel(&mut self) {
        if !self.cancelled && !self.is_settled() {
            debug!(session_id = %self.id, "session cancelled");
        }
        self.cancelled = true;
    }

    /// Frames, classifies and dispatches every line completed by `chunk`.
    ///
    /// Stops at the first terminal event; bytes arriving after settlement are
    /// dropped unread.
    pub fn feed(&mut self, chunk: &[u8]) {
        if !self.accepting() {
            debug!(session_id = %self.id, bytes = chunk.len(), "dropping chunk after session ended");
            return;
        }
        self.framer.push(chunk);
        while self.accepting() {
            let Some(line) = self.framer.next_line() else {
                break;
            };
            self.handle_line(line);
        }
    }

    /// End of stream: flushes the trailing fragment and fails the session if
    /// no terminal event was seen.
    pub fn finish(&mut self) {
        while self.accepting() {
            let Some(line) = self.framer.next_line() else {
                break;
            };
            self.handle_line(line);
        }
        if !self.accepting() {
            return;
        }
        match self.framer.flush() {
            Ok(Some(line)) => self.handle_line(Ok(line)),
            Ok(None) => {}
            Err(err) => self.handle_line(Err(err)),
        }
        if self.accepting() {
            warn!(
                session_id = %self.id,
                kind = self.completion.kind(),
                deltas = self.transcript.delta_count(),
                "stream ended without a completion signal"
            );
            self.settle(Err(StreamError::incomplete_stream()));
        }
    }

    /// The byte source failed before a terminal event.
    pub fn fail_transport(&mut self, err: TransportError) {
        if self.accepting() {
            self.settle(Err(StreamError::Transport(err)));
        }
    }

    /// Applies one event to the session.
    pub fn dispatch(&mut self, event: Event) {
        if !self.accepting() {
            if self.is_settled() {
                warn!(session_id = %self.id, event = event.kind(), "ignoring event after settlement");
            }
            return;
        }
        debug!(session_id = %self.id, event = event.kind(), "dispatching event");
        match event {
            Event::Progress(progress) => {
                self.progress_events += 1;
                self.sink.on_progress(&progress);
            }
            Event::Start(start) => {
                self.sink.on_start(&start);
                self.transcript.set_start(start);
            }
            Event::Delta { text } => {
                self.transcript.push_delta(&text);
                self.sink.on_delta(&text);
            }
            Event::Complete(payload) => {
                let output = self.completion.complete(payload, &self.transcript);
                self.settle(Ok(output));
            }
            Event::Error { message } => {
                self.settle(Err(StreamError::Application { message }));
            }
            Event::Done => match self.completion.done(&self.transcript) {
                Some(output) => self.settle(Ok(output)),
                None => debug!(session_id = %self.id, "done marker is informational for this stream"),
            },
            Event::Unknown { kind } => {
                debug!(session_id = %self.id, event = %kind, "ignoring unknown event type");
            }
        }
    }

    /// Removes the settled outcome. `None` while open, after cancellation, or
    /// once taken.
    pub fn take_outcome(&mut self) -> Option<Result<C::Output, StreamError>> {
        self.outcome.take()
    }

    /// Consumes the session, returning its settled outcome if any.
    pub fn into_outcome(self) -> Option<Result<C::Output, StreamError>> {
        self.outcome
    }

    fn handle_line(&mut self, line: Result<LineRecord, FramingError>) {
        let classified = line.and_then(|line| classify(&line));
        match classified {
            Ok(Some(event)) => self.dispatch(event),
            Ok(None) => {}
            Err(err) => {
                warn!(session_id = %self.id, error = %err, "malformed line record");
                self.settle(Err(StreamError::Framing(err)));
            }
        }
    }

    /// Open, not cancelled, and no abort requested.
    fn accepting(&mut self) -> bool {
        if !self.cancelled && self.abort.as_ref().is_some_and(AbortSignal::is_aborted) {
            self.cancel();
        }
        !self.cancelled && self.state == SessionState::Open
    }

    fn settle(&mut self, outcome: Result<C::Output, StreamError>) {
        if self.state != SessionState::Open || self.cancelled {
            return;
        }
        match &outcome {
            Ok(_) => {
                self.state = SessionState::Completed;
                info!(
                    session_id = %self.id,
                    kind = self.completion.kind(),
                    deltas = self.transcript.delta_count(),
                    progress = self.progress_events,
                    "stream session completed"
                );
            }
            Err(err) => {
                self.state = SessionState::Failed;
                info!(session_id = %self.id, kind = self.completion.kind(), error = %err, "stream session failed");
            }
        }
        self.outcome = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{QueryCompletion, UploadCompletion};
    use crate::consume::abort_pair;
    use crate::event::{CompletePayload, Progress};
    use crate::sink::{FnSink, RecordingSink};

    fn upload_session() -> StreamSession<RecordingSink, UploadCompletion> {
        StreamSession::new(RecordingSink::default(), UploadCompletion)
    }

    fn complete_event(added_chunks: u64) -> Event {
        Event::Complete(CompletePayload {
            added_chunks,
            files: vec![],
            errors: vec![],
        })
    }

    #[test]
    fn first_terminal_event_wins() {
        let mut session = upload_session();
        session.dispatch(complete_event(1));
        session.dispatch(Event::Error {
            message: "late".into(),
        });
        session.dispatch(complete_event(2));
        session.dispatch(Event::Delta {
            text: "after".into(),
        });
        assert_eq!(session.state(), SessionState::Completed);
        assert!(session.sink().deltas.is_empty());
        let summary = session.into_outcome().expect("settled").expect("success");
        assert_eq!(summary.added_count, 1);
    }

    #[test]
    fn error_then_complete_stays_failed() {
        let mut session = upload_session();
        session.dispatch(Event::Error {
            message: "boom".into(),
        });
        session.dispatch(complete_event(3));
        assert_eq!(session.state(), SessionState::Failed);
        let err = session.into_outcome().expect("settled").expect_err("failure");
        assert!(matches!(err, StreamError::Application { message } if message == "boom"));
    }

    #[test]
    fn events_in_the_same_chunk_after_terminal_reach_no_sink() {
        let mut session = upload_session();
        session.feed(
            concat!(
                r#"{"type":"complete","added_chunks":1,"files":[],"errors":[]}"#,
                "\n",
                r#"{"type":"progress","progress":99,"stage":"late"}"#,
                "\n",
            )
            .as_bytes(),
        );
        assert_eq!(session.state(), SessionState::Completed);
        assert!(session.sink().progress.is_empty());
    }

    #[test]
    fn unknown_and_done_leave_upload_session_open() {
        let mut session = upload_session();
        session.feed(b"{\"type\":\"heartbeat\"}\n{\"type\":\"done\"}\n\n");
        assert_eq!(session.state(), SessionState::Open);
        session.finish();
        assert_eq!(session.state(), SessionState::Failed);
        assert!(matches!(
            session.into_outcome(),
            Some(Err(StreamError::ProtocolViolation { .. }))
        ));
    }

    #[test]
    fn done_resolves_query_session_with_accumulated_answer() {
        let mut session = StreamSession::new(RecordingSink::default(), QueryCompletion);
        session.feed(b"{\"type\":\"start\",\"mode\":\"llm\",\"sources\":[]}\n");
        session.feed(b"{\"type\":\"stream\",\"data\":\"Hi \"}\n{\"type\":\"stream\",\"data\":\"there\"}\n");
        session.feed(b"{\"type\":\"done\"}\n");
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.sink().deltas, vec!["Hi ", "there"]);
        assert_eq!(session.sink().starts.len(), 1);
        let answer = session.into_outcome().expect("settled").expect("answer");
        assert_eq!(answer.text, "Hi there");
    }

    #[test]
    fn empty_delta_is_forwarded_in_order() {
        let mut session = StreamSession::new(RecordingSink::default(), QueryCompletion);
        session.feed(b"{\"type\":\"stream\",\"data\":\"a\"}\n{\"type\":\"stream\",\"data\":\"\"}\n");
        session.feed(b"{\"type\":\"stream\",\"data\":\"b\"}\n{\"type\":\"done\"}\n");
        assert_eq!(session.sink().deltas, vec!["a", "", "b"]);
        assert_eq!(session.transcript().delta_count(), 3);
        let answer = session.into_outcome().expect("settled").expect("answer");
        assert_eq!(answer.text, "ab");
    }

    #[test]
    fn later_start_overwrites_stored_metadata() {
        let mut session = StreamSession::new(RecordingSink::default(), QueryCompletion);
        session.feed(b"{\"type\":\"start\",\"mode\":\"kb\",\"sources\":[\"a\"]}\n");
        session.feed(b"{\"type\":\"start\",\"mode\":\"llm\",\"sources\":[\"b\"]}\n");
        let start = session.transcript().start().expect("start");
        assert_eq!(start.mode, crate::event::QueryMode::Llm);
        assert_eq!(session.sink().starts.len(), 2);
    }

    #[test]
    fn malformed_line_fails_and_stops_processing() {
        let mut session = upload_session();
        session.feed(b"{\"type\":\"progress\",\"progress\":5,\"stage\":\"a\"}\nnot json\n{\"type\":\"progress\",\"progress\":6,\"stage\":\"b\"}\n");
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.progress_count(), 1);
        assert!(matches!(
            session.into_outcome(),
            Some(Err(StreamError::Framing(FramingError::Malformed { .. })))
        ));
    }

    #[test]
    fn unterminated_final_line_is_flushed_at_end() {
        let mut session = upload_session();
        session.feed(br#"{"type":"complete","added_chunks":7,"files":[],"errors":[]}"#);
        assert_eq!(session.state(), SessionState::Open);
        session.finish();
        let summary = session.into_outcome().expect("settled").expect("success");
        assert_eq!(summary.added_count, 7);
    }

    #[test]
    fn transport_failure_settles_with_transport_cause() {
        let mut session = upload_session();
        session.fail_transport(TransportError::new("connection reset"));
        session.fail_transport(TransportError::new("second"));
        assert!(matches!(
            session.into_outcome(),
            Some(Err(StreamError::Transport(err))) if err.message() == "connection reset"
        ));
    }

    #[test]
    fn abort_requested_from_a_sink_stops_the_remaining_lines() {
        let (handle, signal) = abort_pair();
        let sink = FnSink::new().progress(move |_: &Progress| handle.abort());
        let mut session = StreamSession::new(sink, UploadCompletion).with_abort(signal);
        session.feed(concat!(
            r#"{"type":"progress","progress":1,"stage":"a"}"#,
            "\n",
            r#"{"type":"complete","added_chunks":1,"files":[],"errors":[]}"#,
            "\n",
        ).as_bytes());
        session.finish();
        assert!(session.is_cancelled());
        assert_eq!(session.state(), SessionState::Open);
        assert!(session.into_outcome().is_none());
    }
}
