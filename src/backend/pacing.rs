//! Auto-poll pacing
//!
//! The backend does not always answer a command with a status line, so after
//! commands that change its state the bridge sends a status poll of its own.
//! Which commands do that, and how long to wait first, is decided by a single
//! lookup table.

use crate::config::PacingConfig;
use crate::protocol::Command;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What to do after forwarding a client command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPolicy {
    /// No follow-up poll
    Never,
    /// Poll after the short delay
    AfterShort,
    /// Poll after the long delay
    AfterLong,
}

/// How a table entry matches command text
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Whole command equals the text
    Exact(&'static str),
    /// First whitespace-separated word equals the text
    Verb(&'static str),
    /// Command starts with the text
    Prefix(&'static str),
}

impl Pattern {
    fn matches(&self, text: &str) -> bool {
        match *self {
            Pattern::Exact(s) => text == s,
            Pattern::Verb(s) => text.split_whitespace().next() == Some(s),
            Pattern::Prefix(s) => text.starts_with(s),
        }
    }
}

/// First match wins
const POLL_TABLE: &[(Pattern, PollPolicy)] = &[
    (Pattern::Exact("get_status"), PollPolicy::Never),
    (Pattern::Exact("help"), PollPolicy::Never),
    (Pattern::Prefix("play"), PollPolicy::Never),
    (Pattern::Exact("start_program"), PollPolicy::AfterLong),
    (Pattern::Verb("mode"), PollPolicy::AfterShort),
    (Pattern::Verb("tempo"), PollPolicy::AfterShort),
    (Pattern::Verb("volume"), PollPolicy::AfterShort),
    (Pattern::Exact("stop"), PollPolicy::AfterShort),
];

/// Anything the table does not name is assumed to change state
const DEFAULT_POLICY: PollPolicy = PollPolicy::AfterShort;

/// Look up the poll policy for a command
pub fn classify(command: &Command) -> PollPolicy {
    let text = command.as_str();
    POLL_TABLE
        .iter()
        .find(|(pattern, _)| pattern.matches(text))
        .map(|(_, policy)| *policy)
        .unwrap_or(DEFAULT_POLICY)
}

/// Schedules deferred status polls.
///
/// Each scheduled poll is an independent one-shot timer. When it fires the
/// poll command is pushed onto the channel returned by [`Pacer::new`]; the
/// reactor drains that channel and does the actual send.
#[derive(Debug, Clone)]
pub struct Pacer {
    short_delay: Duration,
    long_delay: Duration,
    poll_command: Command,
    due: mpsc::UnboundedSender<Command>,
}

impl Pacer {
    pub fn new(config: &PacingConfig) -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (due, due_rx) = mpsc::unbounded_channel();
        let pacer = Self {
            short_delay: config.short_delay(),
            long_delay: config.long_delay(),
            poll_command: Command::new(config.poll_command.clone()),
            due,
        };
        (pacer, due_rx)
    }

    /// The command used to request status from the backend
    pub fn poll_command(&self) -> &Command {
        &self.poll_command
    }

    pub fn delay_for(&self, policy: PollPolicy) -> Option<Duration> {
        match policy {
            PollPolicy::Never => None,
            PollPolicy::AfterShort => Some(self.short_delay),
            PollPolicy::AfterLong => Some(self.long_delay),
        }
    }

    /// Schedule the follow-up poll for a forwarded command, if it needs one
    pub fn after_command(&self, command: &Command) -> Option<JoinHandle<()>> {
        let policy = classify(command);
        let delay = self.delay_for(policy)?;
        tracing::trace!(%command, ?policy, ?delay, "Scheduling status poll");
        Some(self.schedule(delay))
    }

    fn schedule(&self, delay: Duration) -> JoinHandle<()> {
        let due = self.due.clone();
        let poll = self.poll_command.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver is gone only during shutdown
            let _ = due.send(poll);
        })
    }
}
