use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::chat::{ChatAdapter, FAILURE_MARKER};
use crate::providers::ProviderSelection;

pub const PROMPT: &str = "👤 You: ";

/// Compared case-insensitively after trimming.
pub const EXIT_TOKENS: [&str; 4] = ["quit", "exit", "退出", "q"];

/// Input errors in a row before the loop gives up on the terminal.
const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// One line of user input, classified.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Exit,
    Empty,
    Message(&'a str),
}

/// Exit tokens are checked before emptiness; messages come back trimmed.
pub fn classify(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    let lowered = trimmed.to_lowercase();
    if EXIT_TOKENS.contains(&lowered.as_str()) {
        Input::Exit
    } else if trimmed.is_empty() {
        Input::Empty
    } else {
        Input::Message(trimmed)
    }
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Exited,
    EndOfInput,
    Interrupted,
    InputFailed,
}

/// Source of interactive lines. Implemented for rustyline's editor; tests script it.
pub trait LineEditor {
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadlineError>;

    /// Offer a sent line to in-session recall. Default: no history.
    fn remember(&mut self, _line: &str) {}
}

impl LineEditor for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadlineError> {
        self.readline(prompt)
    }

    fn remember(&mut self, line: &str) {
        if let Err(e) = self.add_history_entry(line) {
            debug!(error = %e, "history entry not recorded");
        }
    }
}

/// Ctrl-C listener shared by the whole loop.
///
/// A request in flight is cancelled by the signal. At the prompt a blocking
/// read cannot be raced, so the signal runs the `on_idle` callback instead.
#[derive(Clone, Default)]
pub struct Interrupt {
    in_flight: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Interrupt {
    /// Subscribe to SIGINT once for the rest of the process.
    pub fn install(on_idle: impl Fn() + Send + 'static) -> Self {
        let interrupt = Self::default();
        let listener = interrupt.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !listener.trigger() {
                    on_idle();
                }
            }
            warn!("Ctrl-C listener unavailable");
        });
        interrupt
    }

    /// Cancel the request in flight. Returns `false` when there is none.
    pub fn trigger(&self) -> bool {
        if self.in_flight.load(Ordering::SeqCst) {
            self.notify.notify_waiters();
            true
        } else {
            false
        }
    }

    /// `None` if interrupted before `fut` finished.
    async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        self.in_flight.store(true, Ordering::SeqCst);

        let output = tokio::select! {
            output = fut => Some(output),
            () = notified => None,
        };

        self.in_flight.store(false, Ordering::SeqCst);
        output
    }
}

/// Read-print loop. Each message is one request; the loop waits for its reply
/// before reading again. Ctrl-C at the prompt or during a request ends it.
///
/// Errors writing to `out` end the loop: with the transcript gone there is
/// nowhere left to report them.
pub async fn run<E, W>(
    editor: &mut E,
    adapter: &ChatAdapter,
    selection: &ProviderSelection,
    interrupt: &Interrupt,
    out: &mut W,
) -> io::Result<Outcome>
where
    E: LineEditor,
    W: Write,
{
    let provider = selection.provider();
    let mut consecutive_errors = 0;

    loop {
        let line = match editor.read_line(PROMPT) {
            Ok(line) => {
                consecutive_errors = 0;
                line
            }
            Err(ReadlineError::Interrupted) => {
                writeln!(out, "👋 Interrupted, goodbye!")?;
                return Ok(Outcome::Interrupted);
            }
            Err(ReadlineError::Eof) => {
                writeln!(out, "👋 Goodbye!")?;
                return Ok(Outcome::EndOfInput);
            }
            Err(e) => {
                consecutive_errors += 1;
                warn!(error = %e, consecutive_errors, "failed to read input");
                writeln!(out, "{FAILURE_MARKER}Error: {e}")?;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    return Ok(Outcome::InputFailed);
                }
                writeln!(out, "Please try again...\n")?;
                continue;
            }
        };

        let message = match classify(&line) {
            Input::Exit => {
                writeln!(out, "👋 Goodbye!")?;
                return Ok(Outcome::Exited);
            }
            Input::Empty => {
                writeln!(out, "Please type something...")?;
                continue;
            }
            Input::Message(message) => message,
        };

        editor.remember(message);
        writeln!(out, "🤖 {provider} is thinking...")?;
        out.flush()?;

        let Some(reply) = interrupt.guard(adapter.send(selection, message)).await else {
            writeln!(out, "\n👋 Interrupted, goodbye!")?;
            return Ok(Outcome::Interrupted);
        };

        writeln!(out, "🤖 AI: {reply}\n")?;
        out.flush()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_tokens_any_case() {
        for line in ["quit", "QUIT", "Exit", "eXiT", "q", "Q", "退出", "  quit  ", "exit\n"] {
            assert_eq!(classify(line), Input::Exit, "line {line:?}");
        }
    }

    #[test]
    fn empty_and_whitespace() {
        for line in ["", " ", "\t", "\n", "   \r\n"] {
            assert_eq!(classify(line), Input::Empty, "line {line:?}");
        }
    }

    #[test]
    fn messages_are_trimmed() {
        assert_eq!(classify("  hello there \n"), Input::Message("hello there"));
    }

    #[test]
    fn trigger_without_request_is_ignored() {
        let interrupt = Interrupt::default();
        assert!(!interrupt.trigger());
    }

    #[tokio::test]
    async fn trigger_cancels_guarded_future() {
        let interrupt = Interrupt::default();
        let remote = interrupt.clone();
        let pending = std::future::pending::<()>();

        let cancel = async {
            while !remote.trigger() {
                tokio::task::yield_now().await;
            }
        };
        let (output, ()) = tokio::join!(interrupt.guard(pending), cancel);

        assert_eq!(output, None);
        assert!(!interrupt.trigger());
    }

    #[tokio::test]
    async fn guard_passes_output_through() {
        let interrupt = Interrupt::default();
        assert_eq!(interrupt.guard(async { 7 }).await, Some(7));
        assert!(!interrupt.trigger());
    }

    #[test]
    fn exit_token_must_be_whole_line() {
        assert_eq!(classify("quit now"), Input::Message("quit now"));
        assert_eq!(classify("qq"), Input::Message("qq"));
        assert_eq!(classify("exiting"), Input::Message("exiting"));
    }
}
