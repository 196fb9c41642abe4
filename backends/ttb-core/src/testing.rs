// this_file: backends/ttb-core/src/testing.rs

//! Host double shared by the unit tests of this crate.

use crate::error::HostError;
use crate::traits::Host;
use crate::types::{DiagnosticHandle, Digest, FormatCode, InputHandle, OutputHandle};
use std::collections::HashMap;
use std::io::{self, SeekFrom};

/// Minimal host recording the calls the bridge forwards.
#[derive(Default)]
pub(crate) struct RecordingHost {
    pub(crate) texts: Vec<String>,
    pub(crate) written: Vec<u8>,
    pub(crate) input: Vec<u8>,
    pub(crate) pos: usize,
    pub(crate) pushback: Option<u8>,
    pub(crate) open_diags: HashMap<u32, String>,
    pub(crate) next_id: u32,
    pub(crate) severe_seek: bool,
}

impl Host for RecordingHost {
    fn warn_begin(&mut self) -> DiagnosticHandle {
        self.next_id += 1;
        self.open_diags.insert(self.next_id, String::from("warning: "));
        DiagnosticHandle::from_raw(self.next_id)
    }

    fn error_begin(&mut self) -> DiagnosticHandle {
        self.next_id += 1;
        self.open_diags.insert(self.next_id, String::from("error: "));
        DiagnosticHandle::from_raw(self.next_id)
    }

    fn diag_append(&mut self, diag: &DiagnosticHandle, text: &str) {
        if let Some(buf) = self.open_diags.get_mut(&diag.raw()) {
            buf.push_str(text);
        }
    }

    fn diag_finish(&mut self, diag: DiagnosticHandle) {
        if let Some(text) = self.open_diags.remove(&diag.raw()) {
            self.texts.push(text);
        }
    }

    fn get_file_digest(&mut self, _path: &str) -> io::Result<Digest> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no files"))
    }

    fn get_data_digest(&mut self, data: &[u8]) -> Digest {
        Digest::from_bytes(vec![data.len() as u8])
    }

    fn output_open(&mut self, _path: &str, _is_gz: bool) -> Option<OutputHandle> {
        Some(OutputHandle::from_raw(1))
    }

    fn output_open_stdout(&mut self) -> Option<OutputHandle> {
        Some(OutputHandle::from_raw(0))
    }

    fn output_write(&mut self, _handle: &OutputHandle, data: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(data);
        Ok(data.len())
    }

    fn output_flush(&mut self, _handle: &OutputHandle) -> io::Result<()> {
        Ok(())
    }

    fn output_close(&mut self, _handle: OutputHandle) -> io::Result<()> {
        Ok(())
    }

    fn input_open(&mut self, path: &str, _format: FormatCode, _is_gz: bool) -> Option<InputHandle> {
        (path == "present").then(|| InputHandle::from_raw(7))
    }

    fn input_open_primary(&mut self) -> Option<InputHandle> {
        None
    }

    fn input_get_size(&mut self, _handle: &InputHandle) -> io::Result<u64> {
        Ok(self.input.len() as u64)
    }

    fn input_get_mtime(&mut self, _handle: &InputHandle) -> io::Result<i64> {
        Ok(0)
    }

    fn input_seek(&mut self, _handle: &InputHandle, pos: SeekFrom) -> Result<u64, HostError> {
        if self.severe_seek {
            return Err(HostError::internal("backing store vanished"));
        }
        match pos {
            SeekFrom::Start(offset) => {
                self.pos = offset as usize;
                Ok(offset)
            }
            _ => Err(io::Error::new(io::ErrorKind::Unsupported, "start only").into()),
        }
    }

    fn input_read(&mut self, _handle: &InputHandle, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.input.len() - self.pos);
        buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn input_getc(&mut self, _handle: &InputHandle) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pushback.take() {
            return Ok(Some(byte));
        }
        let byte = self.input.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    fn input_ungetc(&mut self, _handle: &InputHandle, byte: u8) -> io::Result<()> {
        self.pushback = Some(byte);
        Ok(())
    }

    fn input_close(&mut self, handle: InputHandle) -> Result<(), HostError> {
        if handle.raw() == 7 {
            Ok(())
        } else {
            Err(HostError::internal("double close"))
        }
    }
}
