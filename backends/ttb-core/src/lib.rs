// this_file: backends/ttb-core/src/lib.rs

//! Core contract for running bridged engines inside a host process.
//!
//! An engine never touches files, diagnostics or hashes directly. Every such
//! request goes through a [`Bridge`], which forwards it to the [`Host`]
//! supplied for that one invocation. The entry trampolines in [`trampoline`]
//! turn whatever happens inside the engine (a normal return, an explicit
//! abort, a severe host error or a panic) into a single status code.

pub mod arena;
pub mod bridge;
pub mod channel;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod trampoline;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod testing;

pub use arena::HandleTable;
pub use bridge::{Bridge, CallStats};
pub use channel::{BoundedMessage, ErrorChannel, ERROR_BUF_SIZE};
pub use diagnostics::RunDiagnostics;
pub use error::{Abort, BridgeError, Fallible, HostError};
pub use io::InputStream;
pub use trampoline::{bibtex_simple_main, dvipdfmx_simple_main, tex_simple_main, EngineExit};
pub use traits::{Engine, Host};
pub use types::{
    BibtexArgs, DiagnosticHandle, DiagnosticKind, Digest, DvipdfmxArgs, EngineKind, FormatCode,
    History, InputHandle, OutputHandle, TexArgs, TexOptions, HARD_FAILURE,
};

/// Result type for bridge-level operations
pub type Result<T> = std::result::Result<T, BridgeError>;
