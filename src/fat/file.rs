//! File handles: cluster-streamed reads and seeking.

use super::dir::DirEntry;
use super::table::ClusterChain;
use super::FatFs;
use crate::error::Error;
use crate::storage::Storage;

use typenum::consts::U512;

use core::cmp::min;

#[cfg(feature = "no_std")]
use alloc::{vec, vec::Vec};

/// Where a seek is measured from.
///
/// (`std::io::SeekFrom` would do, but it is out of reach under `no_std`.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    Start(i64),
    Current(i64),
    End(i64),
}

/// An open file.
///
/// Holds the directory entry's metadata, the resolved cluster chain, and a
/// cursor. One cluster of payload is kept in a scratch buffer that is
/// reused across reads; the chain never changes after open.
///
/// The cursor is `(chain_index, cluster_offset)`; the logical byte offset
/// is always `chain_index * cluster_bytes + cluster_offset`.
#[derive(Debug)]
pub struct File<'v, S: Storage<Word = u8, SECTOR_SIZE = U512>> {
    fs: &'v FatFs<S>,

    entry: DirEntry,
    chain: ClusterChain,

    chain_index: usize,
    cluster_offset: usize,
    end_of_file: bool,

    scratch: Vec<u8>,
    /// Chain index of the cluster sitting in `scratch`, if any.
    loaded: Option<usize>,
}

impl<'v, S: Storage<Word = u8, SECTOR_SIZE = U512>> File<'v, S> {
    pub(super) fn new(fs: &'v FatFs<S>, entry: DirEntry, chain: ClusterChain) -> Self {
        Self {
            fs,
            entry,
            chain,
            chain_index: 0,
            cluster_offset: 0,
            end_of_file: false,
            scratch: vec![0; fs.bytes_per_cluster()],
            loaded: None,
        }
    }

    /// The directory entry this handle was opened from.
    pub fn entry(&self) -> &DirEntry {
        &self.entry
    }

    pub fn size(&self) -> u32 {
        self.entry.file_size()
    }

    /// Current logical byte offset.
    pub fn position(&self) -> u32 {
        (self.chain_index * self.fs.bytes_per_cluster() + self.cluster_offset) as u32
    }

    pub fn is_at_end(&self) -> bool {
        self.end_of_file
    }

    /// Reads up to `buf.len() / elem_size` elements of `elem_size` bytes
    /// each, returning how many whole elements were delivered.
    ///
    /// Elements are atomic with respect to end-of-file: when fewer than
    /// `elem_size` bytes remain, those bytes are still copied out but the
    /// trailing partial element is not counted, and the handle sticks at
    /// end-of-file (seek below the end to unstick it). Elements straddle
    /// cluster boundaries transparently.
    ///
    /// A device error mid-stream stops the read; whatever was already
    /// delivered is reported (possibly 0 elements) and no error surfaces
    /// here.
    pub fn read(&mut self, storage: &mut S, buf: &mut [u8], elem_size: usize) -> Result<usize, Error> {
        if elem_size == 0 {
            return Err(Error::BadArgument);
        }

        let elem_count = buf.len() / elem_size;
        if self.end_of_file || elem_count == 0 {
            return Ok(0);
        }

        let cluster_bytes = self.fs.bytes_per_cluster();
        let size = self.size() as usize;

        let mut copied = 0; // bytes placed in `buf`
        let mut elements = 0;

        for _ in 0..elem_count {
            let remaining = size - self.position() as usize;
            if remaining == 0 {
                self.end_of_file = true;
                break;
            }

            let want = min(elem_size, remaining);
            let mut left = want;

            while left > 0 {
                if self.cluster_offset == cluster_bytes {
                    self.chain_index += 1;
                    self.cluster_offset = 0;
                }

                if self.fetch_cluster(storage).is_err() {
                    // Mid-stream device failure: keep what was delivered.
                    return Ok(elements);
                }

                let n = min(left, cluster_bytes - self.cluster_offset);
                buf[copied..copied + n]
                    .copy_from_slice(&self.scratch[self.cluster_offset..self.cluster_offset + n]);

                self.cluster_offset += n;
                copied += n;
                left -= n;
            }

            if want < elem_size {
                // Trailing partial element: bytes delivered, not counted.
                self.end_of_file = true;
                break;
            }

            elements += 1;

            if self.position() as usize == size {
                self.end_of_file = true;
                break;
            }
        }

        Ok(elements)
    }

    /// Moves the cursor to an absolute offset in `[0, size]`.
    ///
    /// Landing strictly below the end clears the end-of-file flag; landing
    /// exactly on `size` leaves it alone (the next read returns 0 either
    /// way). Returns the new offset.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u32, Error> {
        let size = self.size() as i64;

        let target = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::End(offset) => size + offset,
            SeekFrom::Current(offset) => self.position() as i64 + offset,
        };

        if target < 0 || target > size {
            return Err(Error::OutOfRange);
        }

        let cluster_bytes = self.fs.bytes_per_cluster() as i64;
        self.chain_index = (target / cluster_bytes) as usize;
        self.cluster_offset = (target % cluster_bytes) as usize;

        if target < size {
            self.end_of_file = false;
        }

        Ok(target as u32)
    }

    /// Makes sure the cluster at `chain_index` is in the scratch buffer.
    fn fetch_cluster(&mut self, storage: &mut S) -> Result<(), Error> {
        if self.loaded == Some(self.chain_index) {
            return Ok(());
        }

        let cluster = self.chain.get(self.chain_index).ok_or(Error::Corrupt)?;
        let first_sector = self.fs.cluster_to_sector(cluster);

        self.fs.read_sectors(
            storage,
            first_sector,
            self.fs.sectors_per_cluster() as u32,
            &mut self.scratch,
        )?;

        self.loaded = Some(self.chain_index);

        Ok(())
    }
}
