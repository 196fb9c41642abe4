// this_file: src/lib.rs

//! Call bridge and error unification for embedded typesetting engines.
//!
//! This crate re-exports the workspace members:
//!
//! * [`ttb_core`]: the capability contract, abort channel and entry trampolines;
//! * [`ttb_memory`] and [`ttb_fs`]: ready-made host backends;
//! * [`ttb_status`]: status reporting;
//! * [`ttb_engines`]: typed drivers for the three engines.
//!
//! ```
//! use ttbridge::{tt_abort, Bridge, Engine, Fallible, FormatCode, History, TexArgs};
//! use ttbridge::{MemoryHost, TexEngine, TexResult};
//!
//! struct Hello;
//!
//! impl Engine for Hello {
//!     type Args = TexArgs;
//!     type Output = History;
//!
//!     fn run(&mut self, bridge: &mut Bridge<'_>, args: &TexArgs) -> Fallible<History> {
//!         let Some(input) = bridge.input_open(&args.input_name, FormatCode::Tex, false) else {
//!             tt_abort!(bridge, "cannot find {}", args.input_name);
//!         };
//!         bridge.input_close(input)?;
//!         Ok(History::Spotless)
//!     }
//! }
//!
//! let mut host = MemoryHost::new().with_file("hello.tex", b"Hello".to_vec());
//! let result = TexEngine::new().process(&mut host, &mut Hello, "plain", "hello");
//! assert_eq!(result.unwrap(), TexResult::Spotless);
//! ```

pub use ttb_core;
pub use ttb_engines;
pub use ttb_fs;
pub use ttb_memory;
pub use ttb_status;

pub use ttb_core::{
    bibtex_simple_main, dvipdfmx_simple_main, tex_simple_main, tt_abort, Abort, BibtexArgs,
    Bridge, BridgeError, DvipdfmxArgs, Engine, EngineExit, EngineKind, Fallible, FormatCode,
    History, Host, Result, TexArgs, HARD_FAILURE,
};
pub use ttb_engines::{BibtexEngine, TexEngine, TexResult, XdvipdfmxEngine};
pub use ttb_fs::{FsHost, FsHostConfig};
pub use ttb_memory::MemoryHost;
