// this_file: crates/ttb-engines/src/bibtex.rs

//! Bibliography engine driver.

use crate::tex::TexResult;
use crate::{abort_message, check_name, ENGINE_LOCK};
use log::debug;
use ttb_core::{
    bibtex_simple_main, BibtexArgs, BridgeError, Engine, EngineKind, History, Host, Result,
    HARD_FAILURE,
};

/// Driver for bibliography runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BibtexEngine;

impl BibtexEngine {
    pub fn new() -> Self {
        Self
    }

    /// Process the auxiliary file `aux_file_name`.
    ///
    /// The engine's own fatal history (3) carries no message; an abort
    /// through the bridge (99) carries the abort text.
    pub fn process<E>(
        &mut self,
        host: &mut dyn Host,
        engine: &mut E,
        aux_file_name: &str,
    ) -> Result<TexResult>
    where
        E: Engine<Args = BibtexArgs> + ?Sized,
    {
        check_name("aux file name", aux_file_name)?;
        let args = BibtexArgs {
            aux_file_name: aux_file_name.to_string(),
        };

        let _guard = ENGINE_LOCK.lock();
        debug!(target: "ttb::engines", "running BibTeX on {aux_file_name:?}");
        let exit = bibtex_simple_main(host, engine, &args);

        match exit.code() {
            code if code == History::FatalError.code() => Err(BridgeError::fatal(
                EngineKind::Bibtex,
                "unspecified fatal bibtex error",
            )),
            HARD_FAILURE => Err(BridgeError::fatal(
                EngineKind::Bibtex,
                abort_message(&exit, "unspecified fatal bibtex error"),
            )),
            code => TexResult::from_code(code).ok_or(BridgeError::UnexpectedStatus {
                engine: EngineKind::Bibtex,
                code,
            }),
        }
    }
}
