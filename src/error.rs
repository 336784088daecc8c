//! Exit codes and top-level error reporting.

/// Exit codes for the favscan binary.
///
/// - 0: Success (scan finished and both reports were written)
/// - 1: General error (fatal startup error, aborted walk, or a failed report)
///
/// Usage errors are reported by clap with its own exit code 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Scan completed and both reports were written.
    Success = 0,
    /// Something failed.
    GeneralError = 1,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "FS000",
            Self::GeneralError => "FS001",
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        // Both discriminants fit in a u8
        std::process::ExitCode::from(code as u8)
    }
}

/// Render an error chain on one line for stderr.
#[must_use]
pub fn format_error(err: &anyhow::Error, code: ExitCode) -> String {
    format!("[{}] Error: {:#}", code.code_prefix(), err)
}
