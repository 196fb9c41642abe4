// this_file: backends/ttb-fs/src/lib.rs

//! Filesystem host backend.
//!
//! Inputs are resolved against the output directory and then each search
//! path, memory-mapped when uncompressed. Outputs are written under the
//! output directory. Engine diagnostics are forwarded to a
//! [`StatusBackend`] and engine stdout is captured so a driver can dump it
//! after a failure.

pub mod cache;
pub mod config;

pub use cache::{DigestCache, DigestCacheStats};
pub use config::FsHostConfig;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, trace};
use memmap2::Mmap;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Cursor, Read, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ttb_core::io::{gunzip, is_gzip};
use ttb_core::utils::{sha256_digest, unix_seconds};
use ttb_core::{
    DiagnosticHandle, DiagnosticKind, Digest, FormatCode, HandleTable, Host, HostError,
    InputHandle, InputStream, OutputHandle,
};
use ttb_status::{MessageKind, StatusBackend};

enum OutputWriter {
    Plain(BufWriter<File>),
    Gz(GzEncoder<BufWriter<File>>),
}

impl OutputWriter {
    fn finish(self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(mut w) => w.flush(),
            OutputWriter::Gz(w) => w.finish()?.flush(),
        }
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Plain(w) => w.write(buf),
            OutputWriter::Gz(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(w) => w.flush(),
            OutputWriter::Gz(w) => w.flush(),
        }
    }
}

enum OpenOutput {
    File { path: PathBuf, writer: OutputWriter },
    Stdout,
}

struct PendingDiagnostic {
    kind: DiagnosticKind,
    message: String,
}

/// Host backed by the local filesystem.
pub struct FsHost {
    config: FsHostConfig,
    hidden: HashSet<String>,
    status: Box<dyn StatusBackend>,
    digests: Arc<DigestCache>,
    inputs: HandleTable<InputStream>,
    outputs: HandleTable<OpenOutput>,
    diagnostics: HandleTable<PendingDiagnostic>,
    stdout: Vec<u8>,
    warnings: usize,
    errors: usize,
}

fn unknown_handle(what: &str, id: u32) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("unknown {what} handle {id}"),
    )
}

fn mtime_of(meta: &fs::Metadata) -> i64 {
    meta.modified().map(unix_seconds).unwrap_or(0)
}

impl FsHost {
    pub fn new(config: FsHostConfig, status: Box<dyn StatusBackend>) -> Self {
        let digests = Arc::new(DigestCache::new(config.digest_cache_size));
        Self::with_digest_cache(config, status, digests)
    }

    /// Create a host sharing an existing digest cache.
    pub fn with_digest_cache(
        config: FsHostConfig,
        status: Box<dyn StatusBackend>,
        digests: Arc<DigestCache>,
    ) -> Self {
        Self {
            hidden: config.hidden.iter().cloned().collect(),
            config,
            status,
            digests,
            inputs: HandleTable::new(),
            outputs: HandleTable::new(),
            diagnostics: HandleTable::new(),
            stdout: Vec::new(),
            warnings: 0,
            errors: 0,
        }
    }

    pub fn config(&self) -> &FsHostConfig {
        &self.config
    }

    pub fn digest_cache(&self) -> &Arc<DigestCache> {
        &self.digests
    }

    pub fn status(&mut self) -> &mut dyn StatusBackend {
        self.status.as_mut()
    }

    /// Everything the engine wrote to stdout.
    pub fn captured_stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Warnings finished since the host was created.
    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// Errors finished since the host was created.
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn open_handles(&self) -> usize {
        self.inputs.len() + self.outputs.len() + self.diagnostics.len()
    }

    /// Release every open handle. Outputs are flushed where possible.
    pub fn close_all(&mut self) -> usize {
        let mut released = self.inputs.drain().len() + self.diagnostics.drain().len();
        for (_, output) in self.outputs.drain() {
            if let OpenOutput::File { path, writer } = output {
                if let Err(err) = writer.finish() {
                    debug!(target: "ttb::fs", "failed to finish {}: {err}", path.display());
                }
                self.digests.invalidate(&path);
            }
            released += 1;
        }
        released
    }

    /// Locate `name` on disk, trying the format's default extensions.
    pub fn resolve(&self, name: &str, format: FormatCode) -> Option<PathBuf> {
        let candidates: Vec<String> = format
            .candidate_names(name)
            .into_iter()
            .filter(|candidate| !self.is_hidden(candidate))
            .collect();

        for dir in self.config.input_dirs() {
            for candidate in &candidates {
                let path = dir.join(candidate);
                if path.is_file() {
                    trace!(target: "ttb::fs", "resolved {name:?} to {}", path.display());
                    return Some(path);
                }
            }
        }
        None
    }

    fn is_hidden(&self, name: &str) -> bool {
        if self.hidden.contains(name) {
            return true;
        }
        Path::new(name)
            .file_name()
            .and_then(|base| base.to_str())
            .is_some_and(|base| self.hidden.contains(base))
    }

    fn open_stream(&self, path: &Path, is_gz: bool) -> io::Result<InputStream> {
        let file = File::open(path)?;
        let meta = file.metadata()?;
        let mtime = mtime_of(&meta);
        let name = path.display().to_string();

        if is_gz {
            let mut raw = Vec::with_capacity(meta.len() as usize);
            (&file).read_to_end(&mut raw)?;
            let data = if is_gzip(&raw) { gunzip(&raw)? } else { raw };
            return Ok(InputStream::from_bytes(name, data, mtime));
        }

        if meta.len() == 0 {
            return Ok(InputStream::from_bytes(name, Vec::new(), mtime));
        }

        // The mapping stays valid while the stream lives; inputs are not
        // expected to change underneath an engine run.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(InputStream::new(name, Cursor::new(mmap), meta.len(), mtime))
    }

    fn input(&mut self, handle: &InputHandle) -> io::Result<&mut InputStream> {
        self.inputs
            .get_mut(handle.raw())
            .ok_or_else(|| unknown_handle("input", handle.raw()))
    }

    fn begin(&mut self, kind: DiagnosticKind) -> DiagnosticHandle {
        let id = self.diagnostics.insert(PendingDiagnostic {
            kind,
            message: String::new(),
        });
        DiagnosticHandle::from_raw(id)
    }
}

impl Host for FsHost {
    fn warn_begin(&mut self) -> DiagnosticHandle {
        self.begin(DiagnosticKind::Warning)
    }

    fn error_begin(&mut self) -> DiagnosticHandle {
        self.begin(DiagnosticKind::Error)
    }

    fn diag_append(&mut self, diag: &DiagnosticHandle, text: &str) {
        if let Some(pending) = self.diagnostics.get_mut(diag.raw()) {
            pending.message.push_str(text);
        }
    }

    fn diag_finish(&mut self, diag: DiagnosticHandle) {
        let Some(finished) = self.diagnostics.remove(diag.raw()) else {
            return;
        };
        let kind = match finished.kind {
            DiagnosticKind::Warning => {
                self.warnings += 1;
                MessageKind::Warning
            }
            DiagnosticKind::Error => {
                self.errors += 1;
                MessageKind::Error
            }
        };
        self.status
            .report(kind, format_args!("{}", finished.message), None);
    }

    fn get_file_digest(&mut self, path: &str) -> io::Result<Digest> {
        let resolved = self
            .resolve(path, FormatCode::Binary)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))?;
        self.digests.file_digest(&resolved)
    }

    fn get_data_digest(&mut self, data: &[u8]) -> Digest {
        sha256_digest(data)
    }

    fn output_open(&mut self, path: &str, is_gz: bool) -> Option<OutputHandle> {
        let full = self.config.output_dir.join(path);
        self.digests.invalidate(&full);
        let opened = full
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| File::create(&full));
        let file = match opened {
            Ok(file) => file,
            Err(err) => {
                debug!(target: "ttb::fs", "cannot create {}: {err}", full.display());
                return None;
            }
        };

        let writer = if is_gz {
            OutputWriter::Gz(GzEncoder::new(BufWriter::new(file), Compression::default()))
        } else {
            OutputWriter::Plain(BufWriter::new(file))
        };
        let id = self.outputs.insert(OpenOutput::File { path: full, writer });
        Some(OutputHandle::from_raw(id))
    }

    fn output_open_stdout(&mut self) -> Option<OutputHandle> {
        Some(OutputHandle::from_raw(self.outputs.insert(OpenOutput::Stdout)))
    }

    fn output_write(&mut self, handle: &OutputHandle, data: &[u8]) -> io::Result<usize> {
        match self.outputs.get_mut(handle.raw()) {
            Some(OpenOutput::File { writer, .. }) => {
                writer.write_all(data)?;
            }
            Some(OpenOutput::Stdout) => {
                self.stdout.extend_from_slice(data);
                if self.config.print_stdout {
                    io::stdout().write_all(data)?;
                }
            }
            None => return Err(unknown_handle("output", handle.raw())),
        }
        Ok(data.len())
    }

    fn output_flush(&mut self, handle: &OutputHandle) -> io::Result<()> {
        match self.outputs.get_mut(handle.raw()) {
            Some(OpenOutput::File { writer, .. }) => writer.flush(),
            Some(OpenOutput::Stdout) if self.config.print_stdout => io::stdout().flush(),
            Some(OpenOutput::Stdout) => Ok(()),
            None => Err(unknown_handle("output", handle.raw())),
        }
    }

    fn output_close(&mut self, handle: OutputHandle) -> io::Result<()> {
        match self.outputs.remove(handle.raw()) {
            Some(OpenOutput::File { path, writer }) => {
                let finished = writer.finish();
                self.digests.invalidate(&path);
                finished?;
                debug!(target: "ttb::fs", "wrote {}", path.display());
                Ok(())
            }
            Some(OpenOutput::Stdout) => Ok(()),
            None => Err(unknown_handle("output", handle.raw())),
        }
    }

    fn input_open(&mut self, path: &str, format: FormatCode, is_gz: bool) -> Option<InputHandle> {
        let resolved = self.resolve(path, format)?;
        match self.open_stream(&resolved, is_gz) {
            Ok(stream) => Some(InputHandle::from_raw(self.inputs.insert(stream))),
            Err(err) => {
                debug!(target: "ttb::fs", "cannot open {}: {err}", resolved.display());
                None
            }
        }
    }

    fn input_open_primary(&mut self) -> Option<InputHandle> {
        let stream = match self.config.primary_input.clone() {
            Some(path) => self.open_stream(&path, false),
            None => {
                let mut data = Vec::new();
                io::stdin()
                    .lock()
                    .read_to_end(&mut data)
                    .map(|_| InputStream::from_bytes("<stdin>", data, 0))
            }
        };
        match stream {
            Ok(stream) => Some(InputHandle::from_raw(self.inputs.insert(stream))),
            Err(err) => {
                debug!(target: "ttb::fs", "cannot open primary input: {err}");
                None
            }
        }
    }

    fn input_get_size(&mut self, handle: &InputHandle) -> io::Result<u64> {
        Ok(self.input(handle)?.size())
    }

    fn input_get_mtime(&mut self, handle: &InputHandle) -> io::Result<i64> {
        Ok(self.input(handle)?.mtime())
    }

    fn input_seek(&mut self, handle: &InputHandle, pos: SeekFrom) -> Result<u64, HostError> {
        let stream = self.inputs.get_mut(handle.raw()).ok_or_else(|| {
            HostError::internal(format!("seek on unknown input handle {}", handle.raw()))
        })?;
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
        self.inputs.remove(handle.raw()).map(drop).ok_or_else(|| {
            HostError::internal(format!("close of unknown input handle {}", handle.raw()))
        })
    }
}
