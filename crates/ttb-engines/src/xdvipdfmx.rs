// this_file: crates/ttb-engines/src/xdvipdfmx.rs

//! Page-conversion engine driver.

use crate::{abort_message, check_name, unix_build_date, ENGINE_LOCK};
use log::debug;
use std::time::{SystemTime, UNIX_EPOCH};
use ttb_core::{
    dvipdfmx_simple_main, BridgeError, DvipdfmxArgs, Engine, EngineKind, Host, Result,
    HARD_FAILURE,
};

/// Builder and driver for page-conversion runs.
#[derive(Debug, Clone)]
pub struct XdvipdfmxEngine {
    enable_compression: bool,
    deterministic_tags: bool,
    build_date: SystemTime,
}

impl Default for XdvipdfmxEngine {
    fn default() -> Self {
        Self {
            enable_compression: true,
            deterministic_tags: false,
            build_date: UNIX_EPOCH,
        }
    }
}

impl XdvipdfmxEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_compression(&mut self, enabled: bool) -> &mut Self {
        self.enable_compression = enabled;
        self
    }

    /// Derive font subset tags from content rather than at random, so
    /// identical inputs give identical output.
    pub fn enable_deterministic_tags(&mut self, enabled: bool) -> &mut Self {
        self.deterministic_tags = enabled;
        self
    }

    pub fn build_date(&mut self, date: SystemTime) -> &mut Self {
        self.build_date = date;
        self
    }

    /// Convert `dvi` to `pdf`, returning the engine's own status code.
    pub fn process<E>(
        &mut self,
        host: &mut dyn Host,
        engine: &mut E,
        dvi: &str,
        pdf: &str,
    ) -> Result<i32>
    where
        E: Engine<Args = DvipdfmxArgs> + ?Sized,
    {
        check_name("input file name", dvi)?;
        check_name("output file name", pdf)?;
        let args = DvipdfmxArgs {
            dvi_path: dvi.to_string(),
            pdf_path: pdf.to_string(),
            compress: self.enable_compression,
            deterministic_tags: self.deterministic_tags,
            build_date: unix_build_date(self.build_date)?,
        };

        let _guard = ENGINE_LOCK.lock();
        debug!(target: "ttb::engines", "running xdvipdfmx on {dvi:?} -> {pdf:?}");
        let exit = dvipdfmx_simple_main(host, engine, &args);

        match exit.code() {
            HARD_FAILURE => Err(BridgeError::fatal(
                EngineKind::Dvipdfmx,
                abort_message(&exit, "unspecified fatal xdvipdfmx error"),
            )),
            code => Ok(code),
        }
    }
}
