// this_file: backends/ttb-memory/src/lib.rs

//! In-memory host backend.
//!
//! Every file lives in a name-keyed map, outputs are buffered and committed
//! back to that map on close, and stdout and diagnostics are captured for
//! inspection. Useful for tests and for embedding an engine with no
//! filesystem access at all.

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::io::{self, SeekFrom, Write};
use ttb_core::io::{gunzip, is_gzip};
use ttb_core::utils::sha256_digest;
use ttb_core::{
    DiagnosticHandle, DiagnosticKind, Digest, FormatCode, HandleTable, Host, HostError,
    InputHandle, InputStream, OutputHandle,
};

/// A finished diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone)]
struct FileEntry {
    data: Vec<u8>,
    mtime: i64,
}

#[derive(Debug)]
enum OutputSink {
    File {
        name: String,
        is_gz: bool,
        data: Vec<u8>,
    },
    Stdout,
}

/// Host backed entirely by memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    files: HashMap<String, FileEntry>,
    primary: Option<Vec<u8>>,
    hidden: HashSet<String>,
    stdout: Vec<u8>,
    emitted: Vec<Diagnostic>,
    mtime: i64,
    inputs: HandleTable<InputStream>,
    outputs: HandleTable<OutputSink>,
    diagnostics: HandleTable<Diagnostic>,
}

fn unknown_handle(what: &str, id: u32) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("unknown {what} handle {id}"),
    )
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryHost::add_file`].
    pub fn with_file(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.add_file(name, data);
        self
    }

    /// Builder form of [`MemoryHost::set_primary_input`].
    pub fn with_primary_input(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.set_primary_input(data);
        self
    }

    /// Add or replace a file. Its modification time is the host clock.
    pub fn add_file(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        let entry = FileEntry {
            data: data.into(),
            mtime: self.mtime,
        };
        self.files.insert(name.into(), entry);
    }

    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(|entry| entry.data.as_slice())
    }

    pub fn remove_file(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name).map(|entry| entry.data)
    }

    pub fn file_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.files.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn set_primary_input(&mut self, data: impl Into<Vec<u8>>) {
        self.primary = Some(data.into());
    }

    /// Make `name` behave as missing even if it is present.
    pub fn hide(&mut self, name: impl Into<String>) {
        self.hidden.insert(name.into());
    }

    /// Set the modification time stamped on files added or written from now on.
    pub fn set_clock(&mut self, mtime: i64) {
        self.mtime = mtime;
    }

    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.emitted
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.emitted.iter().filter(|d| d.kind == kind).count()
    }

    /// Handles still open: inputs, outputs and unfinished diagnostics.
    pub fn open_handles(&self) -> usize {
        self.inputs.len() + self.outputs.len() + self.diagnostics.len()
    }

    /// Release every open handle. Uncommitted output is discarded.
    ///
    /// Returns how many handles were released.
    pub fn close_all(&mut self) -> usize {
        let released = self.inputs.drain().len()
            + self.outputs.drain().len()
            + self.diagnostics.drain().len();
        if released > 0 {
            debug!(target: "ttb::memory", "released {released} leftover handles");
        }
        released
    }

    fn lookup(&self, name: &str, format: FormatCode) -> Option<(String, &FileEntry)> {
        format
            .candidate_names(name)
            .into_iter()
            .filter(|candidate| !self.hidden.contains(candidate))
            .find_map(|candidate| {
                let entry = self.files.get(&candidate)?;
                Some((candidate, entry))
            })
    }

    fn begin(&mut self, kind: DiagnosticKind) -> DiagnosticHandle {
        let id = self.diagnostics.insert(Diagnostic {
            kind,
            message: String::new(),
        });
        DiagnosticHandle::from_raw(id)
    }

    fn input(&mut self, handle: &InputHandle) -> io::Result<&mut InputStream> {
        self.inputs
            .get_mut(handle.raw())
            .ok_or_else(|| unknown_handle("input", handle.raw()))
    }
}

impl Host for MemoryHost {
    fn warn_begin(&mut self) -> DiagnosticHandle {
        self.begin(DiagnosticKind::Warning)
    }

    fn error_begin(&mut self) -> DiagnosticHandle {
        self.begin(DiagnosticKind::Error)
    }

    fn diag_append(&mut self, diag: &DiagnosticHandle, text: &str) {
        match self.diagnostics.get_mut(diag.raw()) {
            Some(pending) => pending.message.push_str(text),
            None => debug!(target: "ttb::memory", "append to unknown diagnostic {}", diag.raw()),
        }
    }

    fn diag_finish(&mut self, diag: DiagnosticHandle) {
        if let Some(finished) = self.diagnostics.remove(diag.raw()) {
            trace!(target: "ttb::memory", "{:?}: {}", finished.kind, finished.message);
            self.emitted.push(finished);
        }
    }

    fn get_file_digest(&mut self, path: &str) -> io::Result<Digest> {
        if self.hidden.contains(path) {
            return Err(io::Error::new(io::ErrorKind::NotFound, path.to_string()));
        }
        self.files
            .get(path)
            .map(|entry| sha256_digest(&entry.data))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    fn get_data_digest(&mut self, data: &[u8]) -> Digest {
        sha256_digest(data)
    }

    fn output_open(&mut self, path: &str, is_gz: bool) -> Option<OutputHandle> {
        if path.is_empty() {
            return None;
        }
        let id = self.outputs.insert(OutputSink::File {
            name: path.to_string(),
            is_gz,
            data: Vec::new(),
        });
        Some(OutputHandle::from_raw(id))
    }

    fn output_open_stdout(&mut self) -> Option<OutputHandle> {
        let id = self.outputs.insert(OutputSink::Stdout);
        Some(OutputHandle::from_raw(id))
    }

    fn output_write(&mut self, handle: &OutputHandle, data: &[u8]) -> io::Result<usize> {
        match self.outputs.get_mut(handle.raw()) {
            Some(OutputSink::File { data: buf, .. }) => buf.extend_from_slice(data),
            Some(OutputSink::Stdout) => self.stdout.extend_from_slice(data),
            None => return Err(unknown_handle("output", handle.raw())),
        }
        Ok(data.len())
    }

    fn output_flush(&mut self, handle: &OutputHandle) -> io::Result<()> {
        if self.outputs.contains(handle.raw()) {
            Ok(())
        } else {
            Err(unknown_handle("output", handle.raw()))
        }
    }

    fn output_close(&mut self, handle: OutputHandle) -> io::Result<()> {
        match self.outputs.remove(handle.raw()) {
            Some(OutputSink::File { name, is_gz, data }) => {
                let data = if is_gz {
                    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                    encoder.write_all(&data)?;
                    encoder.finish()?
                } else {
                    data
                };
                debug!(target: "ttb::memory", "committed {name:?} ({} bytes)", data.len());
                let mtime = self.mtime;
                self.files.insert(name, FileEntry { data, mtime });
                Ok(())
            }
            Some(OutputSink::Stdout) => Ok(()),
            None => Err(unknown_handle("output", handle.raw())),
        }
    }

    fn input_open(&mut self, path: &str, format: FormatCode, is_gz: bool) -> Option<InputHandle> {
        let (name, entry) = self.lookup(path, format)?;
        let data = if is_gz && is_gzip(&entry.data) {
            match gunzip(&entry.data) {
                Ok(decoded) => decoded,
                Err(err) => {
                    debug!(target: "ttb::memory", "cannot decompress {name:?}: {err}");
                    return None;
                }
            }
        } else {
            entry.data.clone()
        };
        let stream = InputStream::from_bytes(name, data, entry.mtime);
        Some(InputHandle::from_raw(self.inputs.insert(stream)))
    }

    fn input_open_primary(&mut self) -> Option<InputHandle> {
        let data = self.primary.clone()?;
        let stream = InputStream::from_bytes("<primary>", data, self.mtime);
        Some(InputHandle::from_raw(self.inputs.insert(stream)))
    }

    fn input_get_size(&mut self, handle: &InputHandle) -> io::Result<u64> {
        Ok(self.input(handle)?.size())
    }

    fn input_get_mtime(&mut self, handle: &InputHandle) -> io::Result<i64> {
        Ok(self.input(handle)?.mtime())
    }

    fn input_seek(&mut self, handle: &InputHandle, pos: SeekFrom) -> Result<u64, HostError> {
        let stream = self
            .inputs
            .get_mut(handle.raw())
            .ok_or_else(|| HostError::internal(format!("seek on unknown input handle {}", handle.raw())))?;
        Ok(stream.seek(pos)?)
    }

    fn input_read(&mut self, handle: &InputHandle, buf: &mut [u8]) -> io::Result<usize> {
        self.input(handle)?.read(buf)
    }

    fn input_getc(&mut self, handle: &InputHandle) -> io::Result<Option<u8>> {
        self.input(handle)?.getc()
    }

    fn input_ungetc(&mut self, handle: &InputHandle, byte: u8) -> io::Result<()> {
        self.input(handle)?.ungetc(byte)
    }

    fn input_close(&mut self, handle: InputHandle) -> Result<(), HostError> {
        match self.inputs.remove(handle.raw()) {
            Some(_) => Ok(()),
            None => Err(HostError::internal(format!(
                "close of unknown input handle {}",
                handle.raw()
            ))),
        }
    }
}
