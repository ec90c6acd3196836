
use core::fmt::Debug;

use generic_array::{ArrayLength, GenericArray};
use typenum::consts::U512;
use typenum::marker_traits::Unsigned;

#[cfg(feature = "no_std")]
use alloc::vec::Vec;

/// The fixed addressing unit of a medium, in bytes.
///
/// This matches conventional MBR-style disk addressing; volumes with larger
/// logical sectors multiply on top of it.
pub const SECTOR_BYTES: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ReadError<T> {
    /// For calls to `read_sector` that fall outside of the medium's space.
    OutOfRange { requested_sector: usize, sector_count: usize },
    Other(T),
}

impl<T> From<T> for ReadError<T> {
    fn from(other: T) -> Self {
        ReadError::Other(other)
    }
}

/// Implementors of this trait provide random access to a sector based
/// storage medium.
///
/// Reads are absolute; implementations must not depend on any prior
/// position. There is no write half: this crate only ever reads.
pub trait Storage {
    type Word;
    #[allow(non_camel_case_types)]
    type SECTOR_SIZE: ArrayLength<Self::Word>;

    type ReadErr: Debug;

    /// Returns the number of sectors on the medium.
    fn capacity(&self) -> usize;

    /// Reads in an entire sector.
    ///
    /// This function should never panic but can return errors for the
    /// appropriate cases (i.e. `sector_idx` >= `self.capacity()`).
    fn read_sector(
        &mut self,
        sector_idx: usize,
        buffer: &mut GenericArray<Self::Word, Self::SECTOR_SIZE>,
    ) -> Result<(), ReadError<Self::ReadErr>>;

    /// Returns one greater than the largest valid offset for the medium.
    fn byte_count(&self) -> usize {
        self.capacity() * <Self::SECTOR_SIZE as Unsigned>::to_usize()
    }
}

/// A medium backed by a byte vector.
///
/// Handy for tests and for `no_std` callers that already have the image in
/// memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamStorage {
    data: Vec<u8>,
}

impl RamStorage {
    /// The vector's length must be a multiple of 512.
    pub fn new(data: Vec<u8>) -> Result<Self, crate::Error> {
        if data.len() % SECTOR_BYTES != 0 {
            return Err(crate::Error::InvalidFormat);
        }

        Ok(Self { data })
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Storage for RamStorage {
    type Word = u8;
    type SECTOR_SIZE = U512;

    type ReadErr = core::convert::Infallible;

    fn capacity(&self) -> usize {
        self.data.len() / SECTOR_BYTES
    }

    fn read_sector(
        &mut self,
        sector_idx: usize,
        buffer: &mut GenericArray<u8, U512>,
    ) -> Result<(), ReadError<Self::ReadErr>> {
        if sector_idx >= self.capacity() {
            return Err(ReadError::OutOfRange {
                requested_sector: sector_idx,
                sector_count: self.capacity(),
            });
        }

        let offset = sector_idx * SECTOR_BYTES;
        buffer
            .as_mut_slice()
            .copy_from_slice(&self.data[offset..offset + SECTOR_BYTES]);

        Ok(())
    }
}

using_std! {
    use std::fs;
    use std::io::{Read, Seek};
    use std::path::Path;

    /// A medium backed by a read-only file handle on a disk image.
    #[derive(Debug)]
    pub struct FileBackedStorage {
        file: fs::File,
        sectors: usize,
    }

    impl FileBackedStorage {
        /// Opens the image read-only. The image length must be a multiple
        /// of 512.
        pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, crate::Error> {
            let file = fs::File::open(path).map_err(|_| crate::Error::NotFound)?;
            let len = file.metadata().map_err(|_| crate::Error::Io)?.len();

            if len % (SECTOR_BYTES as u64) != 0 {
                return Err(crate::Error::InvalidFormat);
            }

            Ok(Self { file, sectors: (len / (SECTOR_BYTES as u64)) as usize })
        }

        /// For media whose metadata does not report a useful length (block
        /// devices, mostly).
        pub fn from_file_with_explicit_size<P: AsRef<Path>>(
            path: P,
            sectors: usize,
        ) -> Result<Self, crate::Error> {
            let file = fs::File::open(path).map_err(|_| crate::Error::NotFound)?;

            Ok(Self { file, sectors })
        }
    }

    impl Storage for FileBackedStorage {
        type Word = u8;
        type SECTOR_SIZE = U512;

        type ReadErr = std::io::Error;

        fn capacity(&self) -> usize {
            self.sectors
        }

        fn read_sector(
            &mut self,
            sector_idx: usize,
            buffer: &mut GenericArray<u8, U512>,
        ) -> Result<(), ReadError<Self::ReadErr>> {
            if sector_idx >= self.sectors {
                return Err(ReadError::OutOfRange {
                    requested_sector: sector_idx,
                    sector_count: self.sectors,
                });
            }

            self.file
                .seek(std::io::SeekFrom::Start((sector_idx * SECTOR_BYTES) as u64))?;
            self.file.read_exact(buffer.as_mut_slice())?;

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_storage_rejects_unaligned_images() {
        assert_eq!(
            RamStorage::new(vec![0; 513]).unwrap_err(),
            crate::Error::InvalidFormat,
        );
    }

    #[test]
    fn ram_storage_reads_are_absolute() {
        let mut data = vec![0u8; 3 * SECTOR_BYTES];
        data[SECTOR_BYTES] = 0xAB;
        let mut s = RamStorage::new(data).unwrap();

        let mut sector = GenericArray::default();
        s.read_sector(1, &mut sector).unwrap();
        assert_eq!(sector[0], 0xAB);

        // same read again; no implicit cursor
        s.read_sector(1, &mut sector).unwrap();
        assert_eq!(sector[0], 0xAB);
    }

    #[test]
    fn ram_storage_bounds() {
        let mut s = RamStorage::new(vec![0; 2 * SECTOR_BYTES]).unwrap();

        let mut sector = GenericArray::default();
        assert!(matches!(
            s.read_sector(2, &mut sector),
            Err(ReadError::OutOfRange { requested_sector: 2, sector_count: 2 }),
        ));
    }
}
