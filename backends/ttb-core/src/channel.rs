// this_file: backends/ttb-core/src/channel.rs

//! The abort channel.
//!
//! Every formatted message the bridge produces (abort text, one-shot
//! warnings and errors, formatted output) is rendered into a
//! [`BoundedMessage`] first, so no message can exceed the buffer capacity the
//! engines were written against. The [`ErrorChannel`] belongs to a single
//! [`Bridge`](crate::Bridge) and remembers the most recent abort of that run.

use crate::error::Abort;
use log::debug;
use std::fmt;

/// Size of the message buffer, terminator included.
pub const ERROR_BUF_SIZE: usize = 1024;

/// Text rendered into a fixed-capacity buffer.
///
/// Holds at most [`BoundedMessage::CAPACITY`] bytes. Anything past that is
/// dropped, cutting on a `char` boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundedMessage {
    text: String,
    truncated: bool,
}

impl BoundedMessage {
    /// Usable bytes; one slot of the buffer is reserved for the terminator.
    pub const CAPACITY: usize = ERROR_BUF_SIZE - 1;

    pub fn new() -> Self {
        Self::default()
    }

    /// Render `args`, truncating at capacity.
    pub fn render(args: fmt::Arguments<'_>) -> Self {
        let mut message = Self::new();
        // write_str never fails; truncation is recorded instead.
        let _ = fmt::write(&mut message, args);
        message
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Write for BoundedMessage {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = Self::CAPACITY - self.text.len();
        if s.len() <= room {
            self.text.push_str(s);
            return Ok(());
        }

        let mut cut = room;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&s[..cut]);
        self.truncated = true;
        Ok(())
    }
}

impl fmt::Display for BoundedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Per-invocation record of aborts.
#[derive(Debug, Default)]
pub struct ErrorChannel {
    last: Option<Abort>,
}

impl ErrorChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render an abort, remember it as the most recent one and hand it back
    /// for propagation.
    pub fn raise(&mut self, args: fmt::Arguments<'_>) -> Abort {
        let abort = Abort::from(BoundedMessage::render(args));
        debug!(target: "ttb::bridge", "abort raised: {}", abort.message());
        self.last = Some(abort.clone());
        abort
    }

    pub fn is_raised(&self) -> bool {
        self.last.is_some()
    }

    /// Text of the most recent abort of this run.
    pub fn last_error_message(&self) -> Option<&str> {
        self.last.as_ref().map(Abort::message)
    }

    pub fn take(&mut self) -> Option<Abort> {
        self.last.take()
    }
}

/// Abort the current engine run.
///
/// Expands to an early `return` of `Err` from the enclosing function, so
/// every frame between here and the trampoline unwinds normally.
///
/// ```
/// use ttb_core::{tt_abort, Bridge, Fallible};
///
/// fn load_font(bridge: &mut Bridge<'_>, name: &str) -> Fallible<()> {
///     if name.is_empty() {
///         tt_abort!(bridge, "empty font name");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! tt_abort {
    ($bridge:expr, $($arg:tt)+) => {
        return ::core::result::Result::Err(::core::convert::From::from(
            $bridge.abort(::core::format_args!($($arg)+)),
        ))
    };
}
