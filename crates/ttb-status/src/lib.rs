// this_file: crates/ttb-status/src/lib.rs

//! Status reporting for hosts and engine drivers.
//!
//! A [`StatusBackend`] receives notes, warnings and errors (optionally with
//! an [`anyhow::Error`] cause chain) and decides how to show them. Hosts
//! forward engine diagnostics here; drivers use it to dump engine output
//! after a failure.

mod color;

pub use color::TermcolorStatusBackend;

use anyhow::anyhow;
use log::{error, info, warn};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Note,
    Warning,
    Error,
}

impl MessageKind {
    pub fn prefix(self) -> &'static str {
        match self {
            MessageKind::Note => "note:",
            MessageKind::Warning => "warning:",
            MessageKind::Error => "error:",
        }
    }
}

/// How much non-essential output to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ChatterLevel {
    /// Only warnings and errors
    Minimal,
    #[default]
    Normal,
}

impl FromStr for ChatterLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" | "normal" => Ok(ChatterLevel::Normal),
            "minimal" => Ok(ChatterLevel::Minimal),
            other => Err(anyhow!("unsupported chatter level {other:?}")),
        }
    }
}

/// Receiver of status messages.
pub trait StatusBackend {
    /// Report a message, with an optional error whose cause chain follows it.
    fn report(&mut self, kind: MessageKind, args: fmt::Arguments<'_>, err: Option<&anyhow::Error>);

    /// Report one `caused by:` line beneath the previous error.
    fn report_cause(&mut self, cause: fmt::Arguments<'_>);

    /// Report an error and every cause beneath it.
    fn report_error(&mut self, err: &anyhow::Error) {
        let mut chain = err.chain();
        if let Some(top) = chain.next() {
            self.report(MessageKind::Error, format_args!("{top}"), None);
        }
        for cause in chain {
            self.report_cause(format_args!("{cause}"));
        }
    }

    /// A note with one emphasized span.
    fn note_highlighted(&mut self, before: &str, highlighted: &str, after: &str) {
        self.report(
            MessageKind::Note,
            format_args!("{before}{highlighted}{after}"),
            None,
        );
    }

    /// Show raw log output from a failed engine run.
    fn dump_error_logs(&mut self, output: &[u8]);
}

/// Lines a report renders to: the prefixed message, then one line per cause.
pub fn render_report(
    kind: MessageKind,
    args: fmt::Arguments<'_>,
    err: Option<&anyhow::Error>,
) -> Vec<String> {
    let mut lines = vec![format!("{} {}", kind.prefix(), args)];
    if let Some(err) = err {
        lines.extend(err.chain().map(|cause| render_cause(format_args!("{cause}"))));
    }
    lines
}

/// The line a single cause renders to.
pub fn render_cause(cause: fmt::Arguments<'_>) -> String {
    format!("{CAUSE_PREFIX} {cause}")
}

const CAUSE_PREFIX: &str = "caused by:";

const DUMP_RULE: &str =
    "===============================================================================";

/// Plain-text backend: notes go to stdout, everything else to stderr.
#[derive(Debug, Default)]
pub struct PlainStatusBackend {
    chatter: ChatterLevel,
}

impl PlainStatusBackend {
    pub fn new(chatter: ChatterLevel) -> Self {
        Self { chatter }
    }

    pub fn chatter(&self) -> ChatterLevel {
        self.chatter
    }
}

impl StatusBackend for PlainStatusBackend {
    fn report(&mut self, kind: MessageKind, args: fmt::Arguments<'_>, err: Option<&anyhow::Error>) {
        if kind == MessageKind::Note && self.chatter <= ChatterLevel::Minimal {
            return;
        }

        let mut to_stdout = kind == MessageKind::Note;
        for line in render_report(kind, args, err) {
            if to_stdout {
                println!("{line}");
            } else {
                eprintln!("{line}");
            }
            // Causes always go to stderr.
            to_stdout = false;
        }
    }

    fn report_cause(&mut self, cause: fmt::Arguments<'_>) {
        eprintln!("{}", render_cause(cause));
    }

    fn dump_error_logs(&mut self, output: &[u8]) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{DUMP_RULE}");
        let _ = stderr.write_all(output);
        let _ = writeln!(stderr, "{DUMP_RULE}");
    }
}

/// Backend routing every message through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusBackend;

impl StatusBackend for LogStatusBackend {
    fn report(&mut self, kind: MessageKind, args: fmt::Arguments<'_>, err: Option<&anyhow::Error>) {
        for line in render_report(kind, args, err) {
            match kind {
                MessageKind::Note => info!(target: "ttb::status", "{line}"),
                MessageKind::Warning => warn!(target: "ttb::status", "{line}"),
                MessageKind::Error => error!(target: "ttb::status", "{line}"),
            }
        }
    }

    fn report_cause(&mut self, cause: fmt::Arguments<'_>) {
        error!(target: "ttb::status", "{}", render_cause(cause));
    }

    fn dump_error_logs(&mut self, output: &[u8]) {
        for line in String::from_utf8_lossy(output).lines() {
            error!(target: "ttb::status", "| {line}");
        }
    }
}

/// Backend that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatusBackend;

impl StatusBackend for NoopStatusBackend {
    fn report(&mut self, _kind: MessageKind, _args: fmt::Arguments<'_>, _err: Option<&anyhow::Error>) {}

    fn report_cause(&mut self, _cause: fmt::Arguments<'_>) {}

    fn dump_error_logs(&mut self, _output: &[u8]) {}
}

/// Backend that keeps every message in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectStatusBackend {
    messages: Vec<(MessageKind, String)>,
    dumped: Vec<u8>,
}

impl CollectStatusBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered lines in arrival order, each with its kind.
    pub fn messages(&self) -> &[(MessageKind, String)] {
        &self.messages
    }

    pub fn count(&self, kind: MessageKind) -> usize {
        self.messages.iter().filter(|(k, _)| *k == kind).count()
    }

    /// Everything passed to `dump_error_logs`.
    pub fn dumped(&self) -> &[u8] {
        &self.dumped
    }
}

impl StatusBackend for CollectStatusBackend {
    fn report(&mut self, kind: MessageKind, args: fmt::Arguments<'_>, err: Option<&anyhow::Error>) {
        self.messages
            .extend(render_report(kind, args, err).into_iter().map(|line| (kind, line)));
    }

    fn report_cause(&mut self, cause: fmt::Arguments<'_>) {
        self.messages.push((MessageKind::Error, render_cause(cause)));
    }

    fn dump_error_logs(&mut self, output: &[u8]) {
        self.dumped.extend_from_slice(output);
    }
}

impl<B: StatusBackend + ?Sized> StatusBackend for Box<B> {
    fn report(&mut self, kind: MessageKind, args: fmt::Arguments<'_>, err: Option<&anyhow::Error>) {
        (**self).report(kind, args, err)
    }

    fn report_cause(&mut self, cause: fmt::Arguments<'_>) {
        (**self).report_cause(cause)
    }

    fn report_error(&mut self, err: &anyhow::Error) {
        (**self).report_error(err)
    }

    fn note_highlighted(&mut self, before: &str, highlighted: &str, after: &str) {
        (**self).note_highlighted(before, highlighted, after)
    }

    fn dump_error_logs(&mut self, output: &[u8]) {
        (**self).dump_error_logs(output)
    }
}

/// Report a note: `tt_note!(status, "fmt", args...)`, optionally followed by
/// `; err` to attach an [`anyhow::Error`].
#[macro_export]
macro_rules! tt_note {
    ($dest:expr, $( $fmt_args:expr ),*) => {
        $dest.report($crate::MessageKind::Note, format_args!($( $fmt_args ),*), None)
    };
    ($dest:expr, $( $fmt_args:expr ),* ; $err:expr) => {
        $dest.report($crate::MessageKind::Note, format_args!($( $fmt_args ),*), Some(&$err))
    };
}

/// Report a warning; same forms as [`tt_note!`].
#[macro_export]
macro_rules! tt_warning {
    ($dest:expr, $( $fmt_args:expr ),*) => {
        $dest.report($crate::MessageKind::Warning, format_args!($( $fmt_args ),*), None)
    };
    ($dest:expr, $( $fmt_args:expr ),* ; $err:expr) => {
        $dest.report($crate::MessageKind::Warning, format_args!($( $fmt_args ),*), Some(&$err))
    };
}

/// Report an error; same forms as [`tt_note!`].
#[macro_export]
macro_rules! tt_error {
    ($dest:expr, $( $fmt_args:expr ),*) => {
        $dest.report($crate::MessageKind::Error, format_args!($( $fmt_args ),*), None)
    };
    ($dest:expr, $( $fmt_args:expr ),* ; $err:expr) => {
        $dest.report($crate::MessageKind::Error, format_args!($( $fmt_args ),*), Some(&$err))
    };
}
