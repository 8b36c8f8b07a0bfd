//! Error handling for the multibar library.
//!
//! Progress-update operations never return errors: reporting progress must
//! not affect the correctness of the work being reported. The variants here
//! surface only from the terminal writer and from bar format validation.

use std::io;
use thiserror::Error;

/// Errors that can happen when using multibar.
#[derive(Error, Debug)]
pub enum Error {
    /// A bar format string did not contain exactly five glyphs
    /// (`left`, `fill`, `tip`, `empty`, `right`).
    #[error("invalid bar format {0:?}: expected exactly 5 glyphs")]
    InvalidFormat(String),

    /// I/O error from the terminal writer.
    #[error("terminal I/O error")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// Result type alias for operations that can fail with a multibar error.
pub type Result<T> = std::result::Result<T, Error>;
