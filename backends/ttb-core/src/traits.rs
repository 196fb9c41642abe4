// this_file: backends/ttb-core/src/traits.rs

//! The capability table an engine run is given, and the engine entry point.

use crate::bridge::Bridge;
use crate::error::{Fallible, HostError};
use crate::types::{DiagnosticHandle, Digest, FormatCode, InputHandle, OutputHandle};
use std::io::{self, SeekFrom};

/// Host-side implementation of every operation an engine may request.
///
/// The implementing value is the opaque host context: the bridge passes it to
/// each operation and never looks inside. Handles are minted and resolved by
/// the host alone. The bridge keeps no record of them, so a host must expect
/// handles to be left open after an aborted run and release them itself.
///
/// The method order is the order of the capability table and must not
/// change without a coordinated version bump.
pub trait Host {
    // Diagnostics

    fn warn_begin(&mut self) -> DiagnosticHandle;

    fn error_begin(&mut self) -> DiagnosticHandle;

    fn diag_append(&mut self, diag: &DiagnosticHandle, text: &str);

    /// Emit a diagnostic and release its handle.
    fn diag_finish(&mut self, diag: DiagnosticHandle);

    fn issue_warning(&mut self, text: &str) {
        let diag = self.warn_begin();
        self.diag_append(&diag, text);
        self.diag_finish(diag);
    }

    fn issue_error(&mut self, text: &str) {
        let diag = self.error_begin();
        self.diag_append(&diag, text);
        self.diag_finish(diag);
    }

    // Hashing

    fn get_file_digest(&mut self, path: &str) -> io::Result<Digest>;

    fn get_data_digest(&mut self, data: &[u8]) -> Digest;

    // Output

    /// Open a named output. `None` is an ordinary failure.
    fn output_open(&mut self, path: &str, is_gz: bool) -> Option<OutputHandle>;

    fn output_open_stdout(&mut self) -> Option<OutputHandle>;

    fn output_putc(&mut self, handle: &OutputHandle, byte: u8) -> io::Result<()> {
        self.output_write(handle, &[byte]).map(|_| ())
    }

    fn output_write(&mut self, handle: &OutputHandle, data: &[u8]) -> io::Result<usize>;

    fn output_flush(&mut self, handle: &OutputHandle) -> io::Result<()>;

    fn output_close(&mut self, handle: OutputHandle) -> io::Result<()>;

    // Input

    /// Open a named input of the given category. `None` is an ordinary
    /// failure.
    fn input_open(&mut self, path: &str, format: FormatCode, is_gz: bool) -> Option<InputHandle>;

    /// Open the document under processing.
    fn input_open_primary(&mut self) -> Option<InputHandle>;

    fn input_get_size(&mut self, handle: &InputHandle) -> io::Result<u64>;

    /// Modification time in Unix seconds.
    fn input_get_mtime(&mut self, handle: &InputHandle) -> io::Result<i64>;

    /// Reposition an input. [`HostError::Internal`] ends the engine run.
    fn input_seek(&mut self, handle: &InputHandle, pos: SeekFrom) -> Result<u64, HostError>;

    fn input_read(&mut self, handle: &InputHandle, buf: &mut [u8]) -> io::Result<usize>;

    /// Next byte, or `None` at end of input.
    fn input_getc(&mut self, handle: &InputHandle) -> io::Result<Option<u8>>;

    /// Push one byte back; the next `input_getc` or `input_read` returns it
    /// first.
    fn input_ungetc(&mut self, handle: &InputHandle, byte: u8) -> io::Result<()>;

    /// Release an input. Any error ends the engine run.
    fn input_close(&mut self, handle: InputHandle) -> Result<(), HostError>;
}

/// Internal entry point of a bridged engine.
///
/// Implementations do all of their I/O through `bridge` and report a fatal
/// condition by returning an [`Abort`](crate::Abort), usually via
/// [`tt_abort!`](crate::tt_abort) and `?`.
pub trait Engine {
    /// Engine-specific positional arguments
    type Args;

    /// Normal return value, convertible to the wire status code
    type Output: Into<i32>;

    fn run(&mut self, bridge: &mut Bridge<'_>, args: &Self::Args) -> Fallible<Self::Output>;
}
