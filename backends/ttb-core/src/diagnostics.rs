// this_file: backends/ttb-core/src/diagnostics.rs

//! Run diagnostics used by the trampolines for structured debug logging.

use crate::bridge::CallStats;
use crate::types::EngineKind;
use log::{debug, log_enabled, warn, Level};

/// Lightweight snapshot of one finished engine run.
#[derive(Debug)]
pub struct RunDiagnostics<'a> {
    engine: EngineKind,
    subject: &'a str,
    code: i32,
    abort: Option<&'a str>,
    stats: CallStats,
}

impl<'a> RunDiagnostics<'a> {
    /// Capture the snapshot for a run on `subject` (the primary file name).
    pub fn new(
        engine: EngineKind,
        subject: &'a str,
        code: i32,
        abort: Option<&'a str>,
        stats: CallStats,
    ) -> Self {
        Self {
            engine,
            subject,
            code,
            abort,
            stats,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.code == self.engine.fatal_code()
    }

    /// Emit the snapshot at debug level when logging is enabled, and the
    /// abort text at warn level.
    pub fn log(&self) {
        if let Some(message) = self.abort {
            warn!(
                target: "ttb::trampoline",
                "{engine} run on {subject:?} aborted: {message}",
                engine = self.engine,
                subject = self.subject,
            );
        }

        if log_enabled!(target: "ttb::trampoline", Level::Debug) {
            debug!(
                target: "ttb::trampoline",
                "engine={engine} subject={subject:?} code={code} fatal={fatal} inputs={inputs} missing={missing} outputs={outputs} read={read} written={written} warnings={warnings} errors={errors}",
                engine = self.engine,
                subject = self.subject,
                code = self.code,
                fatal = self.is_fatal(),
                inputs = self.stats.inputs_opened,
                missing = self.stats.inputs_missing,
                outputs = self.stats.outputs_opened,
                read = self.stats.bytes_read,
                written = self.stats.bytes_written,
                warnings = self.stats.warnings,
                errors = self.stats.errors,
            );
        }
    }
}
