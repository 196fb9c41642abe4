// this_file: crates/ttb-engines/src/tex.rs

//! Typesetting engine driver.

use crate::{abort_message, check_name, unix_build_date, ENGINE_LOCK};
use log::debug;
use std::time::{SystemTime, UNIX_EPOCH};
use ttb_core::{
    tex_simple_main, BridgeError, Engine, EngineKind, History, Host, Result, TexArgs, TexOptions,
};

/// Outcome of a successful typesetting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexResult {
    Spotless,
    Warnings,
    Errors,
}

impl TexResult {
    /// Map a non-fatal history code.
    pub(crate) fn from_code(code: i32) -> Option<Self> {
        match History::from_code(code)? {
            History::Spotless => Some(TexResult::Spotless),
            History::WarningIssued => Some(TexResult::Warnings),
            History::ErrorIssued => Some(TexResult::Errors),
            History::FatalError => None,
        }
    }
}

/// Builder and driver for typesetting runs.
#[derive(Debug, Clone)]
pub struct TexEngine {
    options: TexOptions,
    build_date: SystemTime,
}

impl Default for TexEngine {
    fn default() -> Self {
        Self {
            options: TexOptions::default(),
            build_date: UNIX_EPOCH,
        }
    }
}

impl TexEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn halt_on_error_mode(&mut self, halt_on_error: bool) -> &mut Self {
        self.options.halt_on_error = halt_on_error;
        self
    }

    /// Configure the engine to run in "initex" mode, producing a format dump.
    pub fn initex_mode(&mut self, initex: bool) -> &mut Self {
        self.options.initex_mode = initex;
        self
    }

    pub fn synctex(&mut self, enabled: bool) -> &mut Self {
        self.options.synctex = enabled;
        self
    }

    /// Emit top-level boxes directly instead of running the page builder.
    pub fn semantic_pagination(&mut self, enabled: bool) -> &mut Self {
        self.options.semantic_pagination = enabled;
        self
    }

    pub fn shell_escape(&mut self, enabled: bool) -> &mut Self {
        self.options.shell_escape = enabled;
        self
    }

    /// Date reported by the engine for `\today` and the like.
    pub fn build_date(&mut self, date: SystemTime) -> &mut Self {
        self.build_date = date;
        self
    }

    pub fn options(&self) -> &TexOptions {
        &self.options
    }

    /// Typeset `input_name` after loading the format `format_name`.
    pub fn process<E>(
        &mut self,
        host: &mut dyn Host,
        engine: &mut E,
        format_name: &str,
        input_name: &str,
    ) -> Result<TexResult>
    where
        E: Engine<Args = TexArgs> + ?Sized,
    {
        check_name("format name", format_name)?;
        check_name("input name", input_name)?;
        let args = TexArgs {
            dump_name: format_name.to_string(),
            input_name: input_name.to_string(),
            build_date: unix_build_date(self.build_date)?,
            options: self.options.clone(),
        };

        let _guard = ENGINE_LOCK.lock();
        debug!(target: "ttb::engines", "running TeX on {input_name:?} with format {format_name:?}");
        let exit = tex_simple_main(host, engine, &args);

        match exit.code() {
            3 => Err(BridgeError::fatal(
                EngineKind::Tex,
                abort_message(&exit, "unspecified fatal TeX error"),
            )),
            code => TexResult::from_code(code).ok_or(BridgeError::UnexpectedStatus {
                engine: EngineKind::Tex,
                code,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use ttb_core::{tt_abort, Bridge, Fallible, FormatCode};
    use ttb_memory::MemoryHost;

    /// Reads the primary input and reports what it finds.
    #[derive(Default)]
    struct EchoTex {
        seen: Option<TexArgs>,
    }

    impl Engine for EchoTex {
        type Args = TexArgs;
        type Output = History;

        fn run(&mut self, bridge: &mut Bridge<'_>, args: &TexArgs) -> Fallible<History> {
            self.seen = Some(args.clone());
            let Some(format) = bridge.input_open(&args.dump_name, FormatCode::Format, false) else {
                tt_abort!(bridge, "cannot open the format file {:?}", args.dump_name);
            };
            bridge.input_close(format)?;
            let Some(input) = bridge.input_open(&args.input_name, FormatCode::Tex, false) else {
                tt_abort!(bridge, "cannot open {:?}", args.input_name);
            };
            let mut text = Vec::new();
            while let Ok(Some(byte)) = bridge.input_getc(&input) {
                text.push(byte);
            }
            bridge.input_close(input)?;

            if text.is_empty() {
                bridge.issue_warning(format_args!("empty document"));
                return Ok(History::WarningIssued);
            }
            if text.contains(&b'$') {
                bridge.issue_error(format_args!("missing $ inserted"));
                return Ok(History::ErrorIssued);
            }
            Ok(History::Spotless)
        }
    }

    struct Returns(i32);

    impl Engine for Returns {
        type Args = TexArgs;
        type Output = i32;

        fn run(&mut self, _bridge: &mut Bridge<'_>, _args: &TexArgs) -> Fallible<i32> {
            Ok(self.0)
        }
    }

    fn host() -> MemoryHost {
        MemoryHost::new()
            .with_file("plain.fmt", b"dump".to_vec())
            .with_file("clean.tex", b"Hello".to_vec())
            .with_file("empty.tex", Vec::new())
            .with_file("math.tex", b"x$y".to_vec())
    }

    #[test]
    fn test_histories_map_to_results() {
        let mut host = host();
        let mut tex = TexEngine::new();
        let mut engine = EchoTex::default();
        assert_eq!(
            tex.process(&mut host, &mut engine, "plain", "clean").unwrap(),
            TexResult::Spotless
        );
        assert_eq!(
            tex.process(&mut host, &mut engine, "plain", "empty").unwrap(),
            TexResult::Warnings
        );
        assert_eq!(
            tex.process(&mut host, &mut engine, "plain", "math").unwrap(),
            TexResult::Errors
        );
        assert_eq!(host.open_handles(), 0);
    }

    #[test]
    fn test_abort_becomes_engine_fatal() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut host = host();
        let err = TexEngine::new()
            .process(&mut host, &mut EchoTex::default(), "plain", "missing")
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @r#"TeX failed: cannot open "missing""#);
        assert_eq!(err.engine(), Some(EngineKind::Tex));
    }

    #[test]
    fn test_fatal_without_message_uses_fallback() {
        let mut host = host();
        let err = TexEngine::new()
            .process(&mut host, &mut Returns(3), "plain", "clean")
            .unwrap_err();
        assert_eq!(err.to_string(), "TeX failed: unspecified fatal TeX error");
    }

    #[test]
    fn test_unexpected_status() {
        let mut host = host();
        let err = TexEngine::new()
            .process(&mut host, &mut Returns(99), "plain", "clean")
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::UnexpectedStatus {
                engine: EngineKind::Tex,
                code: 99
            }
        ));
    }

    #[test]
    fn test_options_and_build_date_reach_engine() {
        let mut host = host();
        let mut engine = EchoTex::default();
        TexEngine::new()
            .halt_on_error_mode(false)
            .initex_mode(true)
            .synctex(true)
            .semantic_pagination(true)
            .shell_escape(true)
            .build_date(UNIX_EPOCH + Duration::from_secs(1_000))
            .process(&mut host, &mut engine, "plain", "clean")
            .unwrap();

        let seen = engine.seen.unwrap();
        assert_eq!(seen.build_date, 1_000);
        assert_eq!(seen.dump_name, "plain");
        assert!(!seen.options.halt_on_error);
        assert!(seen.options.initex_mode);
        assert!(seen.options.synctex);
        assert!(seen.options.semantic_pagination);
        assert!(seen.options.shell_escape);
    }

    #[test]
    fn test_invalid_arguments_are_rejected_before_running() {
        let mut host = host();
        let mut engine = EchoTex::default();
        let mut tex = TexEngine::new();
        assert!(matches!(
            tex.process(&mut host, &mut engine, "", "clean"),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            tex.process(&mut host, &mut engine, "plain", "a\0b"),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            tex.build_date(UNIX_EPOCH - Duration::from_secs(60))
                .process(&mut host, &mut engine, "plain", "clean"),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(engine.seen.is_none());
    }
}
