
// Mark the crate as no_std if the feature is enabled (and only)
#![cfg_attr(all(feature = "no_std", not(test)), no_std)]

#[cfg(feature = "no_std")]
extern crate alloc;

macro_rules! using_std { ($($i:item)*) => ($(#[cfg(not(feature = "no_std"))]$i)*) }

pub mod error;
pub mod storage;

pub mod fat;

pub use error::Error;
pub use storage::{RamStorage, ReadError, Storage};

using_std! {
    pub use storage::FileBackedStorage;
}

pub use fat::FatFs;
pub use fat::dir::{Dir, DirEntry};
pub use fat::file::{File, SeekFrom};
