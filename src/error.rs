//! The error type shared by every fallible operation in this crate.

use crate::storage::ReadError;

use core::fmt;

/// What went wrong.
///
/// Mount, open, and seek operations return these directly. Reads do not:
/// a device error mid-stream surfaces as a short count instead (see
/// [`File::read`](crate::fat::file::File::read)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
    /// A required argument was unusable (an empty file name, a zero element
    /// size).
    BadArgument,
    /// The image file or the named directory entry does not exist.
    NotFound,
    /// The boot sector signature is wrong or the derived geometry is
    /// impossible.
    InvalidFormat,
    /// The named entry is a directory or a volume label, not a file.
    IsDirectory,
    /// A seek target outside `[0, size]`, or a sector beyond the medium.
    OutOfRange,
    /// The FAT names a bad cluster, a free/reserved cluster mid-chain, or
    /// loops.
    Corrupt,
    /// A buffer for the FAT image or a cluster chain could not be allocated.
    OutOfMemory,
    /// The underlying device failed.
    Io,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::BadArgument => "bad argument",
            Error::NotFound => "not found",
            Error::InvalidFormat => "not a FAT16 volume",
            Error::IsDirectory => "is a directory",
            Error::OutOfRange => "out of range",
            Error::Corrupt => "corrupt file allocation table",
            Error::OutOfMemory => "out of memory",
            Error::Io => "device read failed",
        };

        write!(fmt, "{}", msg)
    }
}

impl<T> From<ReadError<T>> for Error {
    fn from(e: ReadError<T>) -> Self {
        match e {
            ReadError::OutOfRange { .. } => Error::OutOfRange,
            ReadError::Other(_) => Error::Io,
        }
    }
}

using_std! {
    impl std::error::Error for Error { }
}
