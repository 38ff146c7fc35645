//! Process exit statuses of the `fencefmt` binary.
//!
//! `fencefmt hook` always ends with [`SUCCESS`]; only `fmt` and `init` use the others.

/// Every file was formatted, or there was nothing to do
pub const SUCCESS: i32 = 0;

/// `fmt --check` saw at least one document whose blocks would be rewritten
pub const CHANGES_NEEDED: i32 = 1;

/// fencefmt could not do its job: unreadable config, no Markdown inputs, bad aliases
pub const TOOL_ERROR: i32 = 2;

pub mod exit {
    use super::TOOL_ERROR;

    /// Terminate after a fatal `fmt`/`init` error.
    pub fn tool_error() -> ! {
        std::process::exit(TOOL_ERROR);
    }
}
