// this_file: crates/ttb-engines/src/lib.rs

//! Drivers for the bridged engines.
//!
//! A driver validates its arguments, takes the process-wide engine lock,
//! runs the engine through its trampoline and maps the status code to a
//! typed result. The engines keep global state, so only one of them may run
//! at a time; calling a driver from inside a host callback deadlocks.

mod bibtex;
mod tex;
mod xdvipdfmx;

pub use bibtex::BibtexEngine;
pub use tex::{TexEngine, TexResult};
pub use xdvipdfmx::XdvipdfmxEngine;

use parking_lot::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use ttb_core::{BridgeError, EngineExit, Result};
use ttb_status::{tt_error, StatusBackend};

static ENGINE_LOCK: Mutex<()> = parking_lot::const_mutex(());

fn check_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BridgeError::invalid_argument(format!("{what} is empty")));
    }
    if name.contains('\0') {
        return Err(BridgeError::invalid_argument(format!(
            "{what} {name:?} contains a NUL byte"
        )));
    }
    Ok(())
}

fn unix_build_date(date: SystemTime) -> Result<i64> {
    date.duration_since(UNIX_EPOCH)
        .map(|since| since.as_secs() as i64)
        .map_err(|_| BridgeError::invalid_argument("build date precedes the Unix epoch"))
}

fn abort_message(exit: &EngineExit, fallback: &str) -> String {
    exit.error_message().unwrap_or(fallback).to_string()
}

/// Report a failed engine run, followed by whatever the engine printed.
pub fn report_engine_failure(status: &mut dyn StatusBackend, err: &BridgeError, output: &[u8]) {
    tt_error!(status, "{}", err);
    if output.is_empty() {
        return;
    }
    let engine = err.engine().map_or("the engine", |kind| kind.name());
    tt_error!(
        status,
        "something bad happened inside {}; its output follows:",
        engine
    );
    status.dump_error_logs(output);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttb_core::EngineKind;
    use ttb_status::{CollectStatusBackend, MessageKind};

    #[test]
    fn test_name_checks() {
        assert!(check_name("input name", "doc.tex").is_ok());
        let err = check_name("input name", "").unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid argument: input name is empty");
        let err = check_name("format name", "plain\0.fmt").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }

    #[test]
    fn test_build_date_conversion() {
        assert_eq!(unix_build_date(UNIX_EPOCH).unwrap(), 0);
        let before = UNIX_EPOCH - std::time::Duration::from_secs(1);
        assert!(matches!(
            unix_build_date(before),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_report_engine_failure_dumps_output() {
        let mut status = CollectStatusBackend::new();
        let err = BridgeError::fatal(EngineKind::Tex, "emergency stop");
        report_engine_failure(&mut status, &err, b"! Emergency stop.\n");
        let lines: Vec<_> = status.messages().iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(
            lines,
            vec![
                "error: TeX failed: emergency stop",
                "error: something bad happened inside TeX; its output follows:",
            ]
        );
        assert_eq!(status.dumped(), b"! Emergency stop.\n");
        assert_eq!(status.count(MessageKind::Error), 2);
    }

    #[test]
    fn test_report_engine_failure_without_output() {
        let mut status = CollectStatusBackend::new();
        let err = BridgeError::invalid_argument("input name is empty");
        report_engine_failure(&mut status, &err, b"");
        assert_eq!(status.messages().len(), 1);
        assert!(status.dumped().is_empty());
    }
}
