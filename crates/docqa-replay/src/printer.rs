use std::io::{self, Stdout, Write};

use docqa_stream::{EventSink, Progress, StartInfo};

/// Writes sink events as they arrive, to stdout unless told otherwise.
pub struct PrintSink<W: Write = Stdout> {
    out: W,
    in_answer: bool,
}

impl Default for PrintSink {
    fn default() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> PrintSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            in_answer: false,
        }
    }

    /// Ends a partially printed answer line.
    pub fn finish_line(&mut self) {
        if self.in_answer {
            let _ = writeln!(self.out);
            self.in_answer = false;
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for PrintSink<W> {
    fn on_progress(&mut self, progress: &Progress) {
        self.finish_line();
        let _ = match progress.message.as_deref() {
            Some(message) => writeln!(self.out, "[{:>5.1}%] {}: {message}", progress.percent, progress.stage),
            None => writeln!(self.out, "[{:>5.1}%] {}", progress.percent, progress.stage),
        };
    }

    fn on_start(&mut self, start: &StartInfo) {
        self.finish_line();
        let labels: Vec<String> = start.sources.iter().map(|s| s.label()).collect();
        let _ = match start.mode.label() {
            Some(label) => writeln!(self.out, "[{label}] sources: {}", labels.join(", ")),
            None => writeln!(self.out, "[mode {}] sources: {}", start.mode, labels.join(", ")),
        };
    }

    fn on_delta(&mut self, text: &str) {
        let _ = write!(self.out, "{text}");
        let _ = self.out.flush();
        self.in_answer = true;
    }
}
