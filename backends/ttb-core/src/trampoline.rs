// this_file: backends/ttb-core/src/trampoline.rs

//! Entry trampolines.
//!
//! Each trampoline builds a fresh [`Bridge`] over the caller's host, runs the
//! engine inside it and folds every way the run can end into one status code:
//!
//! * a normal return yields the engine's own code;
//! * an [`Abort`] propagated out of the engine yields the engine's fatal code;
//! * an abort raised by a stub but swallowed by the engine still yields the
//!   fatal code;
//! * a panic is caught here and treated as an abort.
//!
//! The bridge is dropped before the trampoline returns, so nothing from one
//! run is visible to the next.

use crate::bridge::{Bridge, CallStats};
use crate::channel::BoundedMessage;
use crate::diagnostics::RunDiagnostics;
use crate::error::{Abort, Fallible};
use crate::traits::{Engine, Host};
use crate::types::{BibtexArgs, DvipdfmxArgs, EngineKind, History, TexArgs};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// How an engine run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineExit {
    kind: EngineKind,
    code: i32,
    abort: Option<Abort>,
    stats: CallStats,
}

impl EngineExit {
    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    /// The status code an external caller sees.
    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn is_fatal(&self) -> bool {
        self.code == self.kind.fatal_code()
    }

    /// The abort that ended the run, if any.
    pub fn abort(&self) -> Option<&Abort> {
        self.abort.as_ref()
    }

    /// Message of the abort that ended the run.
    pub fn error_message(&self) -> Option<&str> {
        self.abort.as_ref().map(Abort::message)
    }

    /// The code read as a typesetting outcome, when it is one.
    pub fn history(&self) -> Option<History> {
        History::from_code(self.code)
    }

    pub fn stats(&self) -> CallStats {
        self.stats
    }
}

/// Run the typesetting engine.
///
/// Returns 0, 1 or 2 from a normal run and 3 when the run aborts.
pub fn tex_simple_main<E>(host: &mut dyn Host, engine: &mut E, args: &TexArgs) -> EngineExit
where
    E: Engine<Args = TexArgs> + ?Sized,
{
    run_trampoline(EngineKind::Tex, &args.input_name, host, engine, args)
}

/// Run the page-conversion engine.
///
/// Returns the engine's own code from a normal run and 99 when the run
/// aborts.
pub fn dvipdfmx_simple_main<E>(host: &mut dyn Host, engine: &mut E, args: &DvipdfmxArgs) -> EngineExit
where
    E: Engine<Args = DvipdfmxArgs> + ?Sized,
{
    run_trampoline(EngineKind::Dvipdfmx, &args.dvi_path, host, engine, args)
}

/// Run the bibliography engine.
///
/// Returns the engine's own code from a normal run and 99 when the run
/// aborts.
pub fn bibtex_simple_main<E>(host: &mut dyn Host, engine: &mut E, args: &BibtexArgs) -> EngineExit
where
    E: Engine<Args = BibtexArgs> + ?Sized,
{
    run_trampoline(EngineKind::Bibtex, &args.aux_file_name, host, engine, args)
}

fn run_trampoline<E>(
    kind: EngineKind,
    subject: &str,
    host: &mut dyn Host,
    engine: &mut E,
    args: &E::Args,
) -> EngineExit
where
    E: Engine + ?Sized,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut bridge = Bridge::new(host);
        let result: Fallible<i32> = engine.run(&mut bridge, args).map(Into::into);
        let (pending, stats) = bridge.finish();
        (result, pending, stats)
    }));

    let (code, abort, stats) = match outcome {
        Ok((Ok(code), None, stats)) => (code, None, stats),
        Ok((Ok(_), Some(pending), stats)) => (kind.fatal_code(), Some(pending), stats),
        Ok((Err(returned), pending, stats)) => {
            (kind.fatal_code(), Some(pending.unwrap_or(returned)), stats)
        }
        Err(payload) => {
            let message = BoundedMessage::render(format_args!(
                "{kind} engine panicked: {}",
                panic_message(payload.as_ref())
            ));
            (kind.fatal_code(), Some(Abort::from(message)), CallStats::default())
        }
    };

    RunDiagnostics::new(kind, subject, code, abort.as_ref().map(Abort::message), stats).log();

    EngineExit {
        kind,
        code,
        abort,
        stats,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        *text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "unknown panic payload"
    }
}
