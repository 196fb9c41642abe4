// this_file: crates/ttb-status/src/color.rs

//! Colorized terminal backend.

use crate::{ChatterLevel, MessageKind, StatusBackend, CAUSE_PREFIX, DUMP_RULE};
use log::debug;
use std::fmt;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Backend writing bold colored prefixes: notes in green on stdout, warnings
/// in yellow and errors in red on stderr.
pub struct TermcolorStatusBackend<W = StandardStream> {
    chatter: ChatterLevel,
    stdout: W,
    stderr: W,
    note_spec: ColorSpec,
    highlight_spec: ColorSpec,
    warning_spec: ColorSpec,
    error_spec: ColorSpec,
}

impl TermcolorStatusBackend<StandardStream> {
    /// Write to the process streams, coloring only when they are terminals.
    pub fn new(chatter: ChatterLevel) -> Self {
        Self::with_writers(
            chatter,
            StandardStream::stdout(ColorChoice::Auto),
            StandardStream::stderr(ColorChoice::Auto),
        )
    }
}

impl<W: WriteColor> TermcolorStatusBackend<W> {
    pub fn with_writers(chatter: ChatterLevel, stdout: W, stderr: W) -> Self {
        let mut note_spec = ColorSpec::new();
        note_spec.set_fg(Some(Color::Green)).set_bold(true);

        let mut highlight_spec = ColorSpec::new();
        highlight_spec.set_bold(true);

        let mut warning_spec = ColorSpec::new();
        warning_spec.set_fg(Some(Color::Yellow)).set_bold(true);

        let mut error_spec = ColorSpec::new();
        error_spec.set_fg(Some(Color::Red)).set_bold(true);

        Self {
            chatter,
            stdout,
            stderr,
            note_spec,
            highlight_spec,
            warning_spec,
            error_spec,
        }
    }

    pub fn chatter(&self) -> ChatterLevel {
        self.chatter
    }

    pub fn stdout(&self) -> &W {
        &self.stdout
    }

    pub fn stderr(&self) -> &W {
        &self.stderr
    }

    fn suppressed(&self, kind: MessageKind) -> bool {
        kind == MessageKind::Note && self.chatter <= ChatterLevel::Minimal
    }

    /// Styled `prefix`, then the plain message, on the stream for `kind`.
    fn message(&mut self, kind: MessageKind, prefix: &str, args: fmt::Arguments<'_>) -> io::Result<()> {
        let (spec, stream) = match kind {
            MessageKind::Note => (&self.note_spec, &mut self.stdout),
            MessageKind::Warning => (&self.warning_spec, &mut self.stderr),
            MessageKind::Error => (&self.error_spec, &mut self.stderr),
        };
        stream.set_color(spec)?;
        write!(stream, "{prefix}")?;
        stream.reset()?;
        writeln!(stream, " {args}")
    }

    fn highlighted(&mut self, before: &str, highlighted: &str, after: &str) -> io::Result<()> {
        write!(self.stdout, "{before}")?;
        self.stdout.set_color(&self.highlight_spec)?;
        write!(self.stdout, "{highlighted}")?;
        self.stdout.reset()?;
        writeln!(self.stdout, "{after}")
    }

    fn dump(&mut self, output: &[u8]) -> io::Result<()> {
        self.stderr.set_color(&self.error_spec)?;
        writeln!(self.stderr, "{DUMP_RULE}")?;
        self.stderr.reset()?;
        self.stderr.write_all(output)?;
        self.stderr.set_color(&self.error_spec)?;
        writeln!(self.stderr, "{DUMP_RULE}")?;
        self.stderr.reset()
    }
}

fn log_write_failure(result: io::Result<()>) {
    if let Err(err) = result {
        debug!(target: "ttb::status", "cannot write status output: {err}");
    }
}

impl<W: WriteColor> StatusBackend for TermcolorStatusBackend<W> {
    fn report(&mut self, kind: MessageKind, args: fmt::Arguments<'_>, err: Option<&anyhow::Error>) {
        if self.suppressed(kind) {
            return;
        }
        log_write_failure(self.message(kind, kind.prefix(), args));
        if let Some(err) = err {
            for cause in err.chain() {
                self.report_cause(format_args!("{cause}"));
            }
        }
    }

    fn report_cause(&mut self, cause: fmt::Arguments<'_>) {
        log_write_failure(self.message(MessageKind::Error, CAUSE_PREFIX, cause));
    }

    fn note_highlighted(&mut self, before: &str, highlighted: &str, after: &str) {
        if self.suppressed(MessageKind::Note) {
            return;
        }
        log_write_failure(self.highlighted(before, highlighted, after));
    }

    fn dump_error_logs(&mut self, output: &[u8]) {
        log_write_failure(self.dump(output));
    }
}
