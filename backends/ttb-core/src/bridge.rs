// this_file: backends/ttb-core/src/bridge.rs

//! Stub functions: the engine-facing side of the capability table.
//!
//! A [`Bridge`] is built by a trampoline for exactly one engine run and
//! dropped when the run ends. Each method forwards to the [`Host`] unchanged,
//! with two exceptions: input `seek` and `close` turn a severe host failure
//! into an abort, and the formatted helpers render into a bounded buffer
//! before forwarding plain text or bytes.

use crate::channel::{BoundedMessage, ErrorChannel};
use crate::error::{Abort, Fallible, HostError};
use crate::traits::Host;
use crate::types::{DiagnosticHandle, Digest, FormatCode, InputHandle, OutputHandle};
use log::trace;
use std::fmt;
use std::io::{self, SeekFrom};

/// Counters kept over one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    pub inputs_opened: usize,
    pub inputs_missing: usize,
    pub outputs_opened: usize,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub warnings: usize,
    pub errors: usize,
}

/// The active capability table of one engine run.
pub struct Bridge<'a> {
    host: &'a mut dyn Host,
    channel: ErrorChannel,
    stats: CallStats,
}

impl<'a> Bridge<'a> {
    pub fn new(host: &'a mut dyn Host) -> Self {
        Self {
            host,
            channel: ErrorChannel::new(),
            stats: CallStats::default(),
        }
    }

    /// Record an abort for this run and return it for propagation.
    ///
    /// Prefer [`tt_abort!`](crate::tt_abort), which also returns from the
    /// calling function.
    pub fn abort(&mut self, args: fmt::Arguments<'_>) -> Abort {
        self.channel.raise(args)
    }

    /// Whether an abort has been raised during this run.
    pub fn is_aborted(&self) -> bool {
        self.channel.is_raised()
    }

    /// Text of the most recent abort of this run.
    pub fn last_error_message(&self) -> Option<&str> {
        self.channel.last_error_message()
    }

    pub fn stats(&self) -> CallStats {
        self.stats
    }

    /// Tear down the bridge, yielding any abort still on record.
    pub(crate) fn finish(mut self) -> (Option<Abort>, CallStats) {
        (self.channel.take(), self.stats)
    }

    // Diagnostics

    pub fn warn_begin(&mut self) -> DiagnosticHandle {
        self.stats.warnings += 1;
        self.host.warn_begin()
    }

    pub fn error_begin(&mut self) -> DiagnosticHandle {
        self.stats.errors += 1;
        self.host.error_begin()
    }

    pub fn diag_append(&mut self, diag: &DiagnosticHandle, text: &str) {
        self.host.diag_append(diag, text)
    }

    /// Render `args` into a bounded buffer and append it to `diag`.
    pub fn diag_printf(&mut self, diag: &DiagnosticHandle, args: fmt::Arguments<'_>) {
        let message = BoundedMessage::render(args);
        self.host.diag_append(diag, message.as_str())
    }

    pub fn diag_finish(&mut self, diag: DiagnosticHandle) {
        self.host.diag_finish(diag)
    }

    /// Render `args` into a bounded buffer and issue it as a warning.
    pub fn issue_warning(&mut self, args: fmt::Arguments<'_>) {
        let message = BoundedMessage::render(args);
        self.stats.warnings += 1;
        self.host.issue_warning(message.as_str())
    }

    /// Render `args` into a bounded buffer and issue it as an error.
    pub fn issue_error(&mut self, args: fmt::Arguments<'_>) {
        let message = BoundedMessage::render(args);
        self.stats.errors += 1;
        self.host.issue_error(message.as_str())
    }

    // Hashing

    pub fn get_file_digest(&mut self, path: &str) -> io::Result<Digest> {
        self.host.get_file_digest(path)
    }

    pub fn get_data_digest(&mut self, data: &[u8]) -> Digest {
        self.host.get_data_digest(data)
    }

    // Output

    pub fn output_open(&mut self, path: &str, is_gz: bool) -> Option<OutputHandle> {
        let handle = self.host.output_open(path, is_gz);
        trace!(target: "ttb::bridge", "output_open {path:?} gz={is_gz} -> {:?}", handle.as_ref().map(OutputHandle::raw));
        if handle.is_some() {
            self.stats.outputs_opened += 1;
        }
        handle
    }

    pub fn output_open_stdout(&mut self) -> Option<OutputHandle> {
        let handle = self.host.output_open_stdout();
        if handle.is_some() {
            self.stats.outputs_opened += 1;
        }
        handle
    }

    pub fn output_putc(&mut self, handle: &OutputHandle, byte: u8) -> io::Result<()> {
        self.host.output_putc(handle, byte)?;
        self.stats.bytes_written += 1;
        Ok(())
    }

    pub fn output_write(&mut self, handle: &OutputHandle, data: &[u8]) -> io::Result<usize> {
        let written = self.host.output_write(handle, data)?;
        self.stats.bytes_written += written as u64;
        Ok(written)
    }

    /// Render `args` into a bounded buffer and write it to `handle`.
    ///
    /// Returns the number of bytes forwarded, which never exceeds
    /// [`BoundedMessage::CAPACITY`].
    pub fn output_printf(
        &mut self,
        handle: &OutputHandle,
        args: fmt::Arguments<'_>,
    ) -> io::Result<usize> {
        let message = BoundedMessage::render(args);
        self.output_write(handle, message.as_bytes())?;
        Ok(message.len())
    }

    pub fn output_flush(&mut self, handle: &OutputHandle) -> io::Result<()> {
        self.host.output_flush(handle)
    }

    pub fn output_close(&mut self, handle: OutputHandle) -> io::Result<()> {
        self.host.output_close(handle)
    }

    // Input

    pub fn input_open(
        &mut self,
        path: &str,
        format: FormatCode,
        is_gz: bool,
    ) -> Option<InputHandle> {
        let handle = self.host.input_open(path, format, is_gz);
        trace!(target: "ttb::bridge", "input_open {path:?} format={format} gz={is_gz} -> {:?}", handle.as_ref().map(InputHandle::raw));
        match handle {
            Some(_) => self.stats.inputs_opened += 1,
            None => self.stats.inputs_missing += 1,
        }
        handle
    }

    pub fn input_open_primary(&mut self) -> Option<InputHandle> {
        let handle = self.host.input_open_primary();
        match handle {
            Some(_) => self.stats.inputs_opened += 1,
            None => self.stats.inputs_missing += 1,
        }
        handle
    }

    pub fn input_get_size(&mut self, handle: &InputHandle) -> io::Result<u64> {
        self.host.input_get_size(handle)
    }

    pub fn input_get_mtime(&mut self, handle: &InputHandle) -> io::Result<i64> {
        self.host.input_get_mtime(handle)
    }

    /// Reposition an input.
    ///
    /// An ordinary failure comes back as the inner `io::Result`. A severe
    /// host failure is recorded as this run's abort and returned as `Err`;
    /// the run ends with the fatal status even if the caller drops it.
    pub fn input_seek(&mut self, handle: &InputHandle, pos: SeekFrom) -> Fallible<io::Result<u64>> {
        match self.host.input_seek(handle, pos) {
            Ok(offset) => Ok(Ok(offset)),
            Err(HostError::Io(err)) => Ok(Err(err)),
            Err(HostError::Internal(detail)) => Err(self.abort(format_args!(
                "serious internal error while seeking input {}: {detail}",
                handle.raw()
            ))),
        }
    }

    pub fn input_read(&mut self, handle: &InputHandle, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.host.input_read(handle, buf)?;
        self.stats.bytes_read += read as u64;
        Ok(read)
    }

    pub fn input_getc(&mut self, handle: &InputHandle) -> io::Result<Option<u8>> {
        let byte = self.host.input_getc(handle)?;
        if byte.is_some() {
            self.stats.bytes_read += 1;
        }
        Ok(byte)
    }

    pub fn input_ungetc(&mut self, handle: &InputHandle, byte: u8) -> io::Result<()> {
        self.host.input_ungetc(handle, byte)
    }

    /// Release an input. Any host failure is recorded as this run's abort.
    pub fn input_close(&mut self, handle: InputHandle) -> Fallible<()> {
        let id = handle.raw();
        self.host
            .input_close(handle)
            .map_err(|err| self.channel.raise(format_args!("failed to close input {id}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;

    #[test]
    fn test_issue_warning_forwards_rendered_text() {
        let mut host = RecordingHost::default();
        let mut bridge = Bridge::new(&mut host);
        bridge.issue_warning(format_args!("font {} not found", "cmr10"));
        bridge.issue_error(format_args!("missing $ inserted"));
        assert_eq!(bridge.stats().warnings, 1);
        assert_eq!(bridge.stats().errors, 1);
        drop(bridge);
        assert_eq!(
            host.texts,
            vec![
                "warning: font cmr10 not found".to_string(),
                "error: missing $ inserted".to_string()
            ]
        );
    }

    #[test]
    fn test_issue_warning_truncates_long_text() {
        let mut host = RecordingHost::default();
        let mut bridge = Bridge::new(&mut host);
        let long = "w".repeat(4096);
        bridge.issue_warning(format_args!("{long}"));
        drop(bridge);
        let forwarded = host.texts[0].strip_prefix("warning: ").unwrap();
        assert_eq!(forwarded.len(), BoundedMessage::CAPACITY);
    }

    #[test]
    fn test_output_printf_truncates_and_reports_length() {
        let mut host = RecordingHost::default();
        let mut bridge = Bridge::new(&mut host);
        let out = bridge.output_open_stdout().unwrap();
        let short = bridge.output_printf(&out, format_args!("page {}\n", 3)).unwrap();
        assert_eq!(short, 7);
        let long = "p".repeat(2000);
        let len = bridge.output_printf(&out, format_args!("{long}")).unwrap();
        assert_eq!(len, BoundedMessage::CAPACITY);
        assert_eq!(bridge.stats().bytes_written, (7 + BoundedMessage::CAPACITY) as u64);
        drop(bridge);
        assert_eq!(host.written.len(), 7 + BoundedMessage::CAPACITY);
    }

    #[test]
    fn test_diag_printf_appends_to_open_diagnostic() {
        let mut host = RecordingHost::default();
        let mut bridge = Bridge::new(&mut host);
        let diag = bridge.warn_begin();
        bridge.diag_printf(&diag, format_args!("overfull \\hbox ({}pt too wide)", 1.5));
        bridge.diag_append(&diag, " in paragraph");
        bridge.diag_finish(diag);
        drop(bridge);
        assert_eq!(
            host.texts,
            vec!["warning: overfull \\hbox (1.5pt too wide) in paragraph".to_string()]
        );
    }

    #[test]
    fn test_missing_input_is_ordinary() {
        let mut host = RecordingHost::default();
        let mut bridge = Bridge::new(&mut host);
        assert!(bridge.input_open("absent", FormatCode::Tex, false).is_none());
        assert!(bridge.input_open("present", FormatCode::Tex, false).is_some());
        assert!(!bridge.is_aborted());
        assert_eq!(bridge.stats().inputs_missing, 1);
        assert_eq!(bridge.stats().inputs_opened, 1);
    }

    #[test]
    fn test_ordinary_seek_failure_is_a_value() {
        let mut host = RecordingHost::default();
        let mut bridge = Bridge::new(&mut host);
        let input = bridge.input_open("present", FormatCode::Tex, false).unwrap();
        let result = bridge.input_seek(&input, SeekFrom::End(0)).unwrap();
        assert!(result.is_err());
        assert!(!bridge.is_aborted());
    }

    #[test]
    fn test_severe_seek_failure_aborts() {
        let mut host = RecordingHost {
            severe_seek: true,
            ..Default::default()
        };
        let mut bridge = Bridge::new(&mut host);
        let input = bridge.input_open("present", FormatCode::Tex, false).unwrap();
        let abort = bridge.input_seek(&input, SeekFrom::Start(0)).unwrap_err();
        assert!(abort.message().contains("backing store vanished"));
        assert!(bridge.is_aborted());
    }

    #[test]
    fn test_failed_close_aborts() {
        let mut host = RecordingHost::default();
        let mut bridge = Bridge::new(&mut host);
        assert!(bridge.input_close(InputHandle::from_raw(7)).is_ok());
        let abort = bridge.input_close(InputHandle::from_raw(8)).unwrap_err();
        assert!(abort.message().contains("failed to close input 8"));
        assert_eq!(bridge.last_error_message(), Some(abort.message()));
    }

    #[test]
    fn test_pushback_round_trip_through_bridge() {
        let mut host = RecordingHost {
            input: b"ab".to_vec(),
            ..Default::default()
        };
        let mut bridge = Bridge::new(&mut host);
        let input = bridge.input_open("present", FormatCode::Tex, false).unwrap();
        assert_eq!(bridge.input_getc(&input).unwrap(), Some(b'a'));
        bridge.input_ungetc(&input, b'a').unwrap();
        assert_eq!(bridge.input_getc(&input).unwrap(), Some(b'a'));
        assert_eq!(bridge.input_getc(&input).unwrap(), Some(b'b'));
        assert_eq!(bridge.input_getc(&input).unwrap(), None);
    }

    #[test]
    fn test_digest_requests_are_forwarded() {
        let mut host = RecordingHost::default();
        let mut bridge = Bridge::new(&mut host);
        assert_eq!(bridge.get_data_digest(b"abc").as_bytes(), &[3]);
        assert!(bridge.get_file_digest("nothing").is_err());
    }
}
