// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use ::libc::{
    c_int,
    EIO,
};
use ::std::{
    error,
    fmt,
    io,
    process,
};

//==============================================================================
// Constants
//==============================================================================

/// Prefix for diagnostics caused by the caller (bad id, bad priority, ...).
const LIB_ERROR_PREFIX: &str = "thread library error: ";

/// Prefix for diagnostics caused by a host facility (signal, timer, ...).
const SYS_ERROR_PREFIX: &str = "system error: ";

//==============================================================================
// Structures
//==============================================================================

/// Failure
#[derive(Clone)]
pub struct Fail {
    /// Error code.
    pub errno: c_int,
    /// Cause.
    pub cause: String,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Failures
impl Fail {
    /// Creates a new Failure
    pub fn new(errno: i32, cause: &str) -> Self {
        Self {
            errno,
            cause: cause.to_string(),
        }
    }
}

//==============================================================================
// Standalone Functions
//==============================================================================

/// Emits the diagnostic for a caller error on the standard error stream.
pub fn report_caller_error(cause: &str) {
    eprintln!("{}{}", LIB_ERROR_PREFIX, cause);
}

/// Emits the diagnostic for an unrecoverable condition and terminates the
/// process. Host-facility failures and scheduling with no runnable thread
/// land here; neither is retried.
pub fn fatal(cause: &str) -> ! {
    eprintln!("{}{}", SYS_ERROR_PREFIX, cause);
    process::exit(1);
}

//==============================================================================
// Trait Implementations
//==============================================================================

/// Display Trait Implementation for Failures
impl fmt::Display for Fail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {:?}: {:?}", self.errno, self.cause)
    }
}

/// Debug Trait Implementation for Failures
impl fmt::Debug for Fail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {:?}: {:?}", self.errno, self.cause)
    }
}

/// Error Trait Implementation for Failures
impl error::Error for Fail {}

/// Conversion Trait Implementation for Failures
impl From<io::Error> for Fail {
    fn from(_: io::Error) -> Self {
        Self {
            errno: EIO,
            cause: "I/O error".to_string(),
        }
    }
}
