
use super::FatFs;
use crate::error::Error;
use crate::storage::Storage;

use typenum::consts::U512;

use core::convert::TryInto;

#[cfg(feature = "no_std")]
use alloc::vec::Vec;

pub type Cluster = u32;

/// FAT cells at or above this value terminate a chain.
pub const END_OF_CHAIN: u16 = 0xFFF8;

/// A cluster marked unusable by the formatter.
pub const BAD_CLUSTER: u16 = 0xFFF7;

/// First cluster number the data region can contain.
pub const FIRST_DATA_CLUSTER: Cluster = 2;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatEntry {
    pub next: u16,
}

impl FatEntry {
    pub const fn from(next: u16) -> Self {
        Self { next }
    }

    pub fn is_end_of_chain(&self) -> bool {
        self.next >= END_OF_CHAIN
    }

    pub fn is_bad(&self) -> bool {
        self.next == BAD_CLUSTER
    }

    /// Free or reserved; never legal in the middle of a live chain.
    pub fn is_unallocated(&self) -> bool {
        (self.next as Cluster) < FIRST_DATA_CLUSTER
    }
}

/// One File Allocation Table, held in memory.
///
/// Only the first of the volume's FAT copies is ever read. Legal FAT16
/// tables top out at 128 KiB so pulling the whole thing in at once is
/// cheap, and it turns the chain walk into pure array chasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fat {
    raw: Vec<u8>,
}

impl Fat {
    /// Reads the first FAT copy off the medium.
    pub fn load<S: Storage<Word = u8, SECTOR_SIZE = U512>>(
        fs: &FatFs<S>,
        storage: &mut S,
    ) -> Result<Self, Error> {
        let bytes = (fs.sectors_per_fat() as usize) * (fs.bytes_per_sector() as usize);

        let mut raw = Vec::new();
        raw.try_reserve_exact(bytes).map_err(|_| Error::OutOfMemory)?;
        raw.resize(bytes, 0);

        fs.read_sectors(storage, fs.first_fat_sector(), fs.sectors_per_fat() as u32, &mut raw)?;

        Ok(Self { raw })
    }

    /// The cell for `cluster`, or `None` when the table is too small to
    /// contain it.
    pub fn entry(&self, cluster: Cluster) -> Option<FatEntry> {
        let offset = (cluster as usize).checked_mul(2)?;
        let cell = self.raw.get(offset..offset + 2)?;

        Some(FatEntry::from(u16::from_le_bytes(cell.try_into().unwrap())))
    }

    #[cfg(test)]
    pub(crate) fn from_cells(cells: &[u16]) -> Self {
        let mut raw = Vec::with_capacity(cells.len() * 2);
        for c in cells {
            raw.extend_from_slice(&c.to_le_bytes());
        }

        Self { raw }
    }
}

/// The ordered clusters making up one file, first to last.
///
/// Computed once at open time; immutable afterwards. The end-of-chain
/// sentinel itself is never a member.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterChain {
    clusters: Vec<Cluster>,
}

impl ClusterChain {
    /// The chain of a zero-length file.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Walks the FAT from `first_cluster` up to (and not including) the
    /// end-of-chain sentinel.
    ///
    /// A walk longer than `total_clusters` steps can only mean the table
    /// loops; that, a bad-cluster cell, an unallocated cell, or a cluster
    /// outside `[2, total_clusters + 1]` is [`Error::Corrupt`].
    pub fn resolve(fat: &Fat, total_clusters: u32, first_cluster: Cluster) -> Result<Self, Error> {
        if first_cluster == 0 {
            // Directory entries of empty files store no cluster at all.
            return Ok(Self::empty());
        }

        let in_range = |c: Cluster| (FIRST_DATA_CLUSTER..=total_clusters + 1).contains(&c);

        if !in_range(first_cluster) {
            log::warn!("chain starts at impossible cluster {}", first_cluster);
            return Err(Error::Corrupt);
        }

        let mut clusters = Vec::new();
        let mut current = first_cluster;

        loop {
            clusters.push(current);
            if clusters.len() > total_clusters as usize {
                log::warn!("FAT chain from cluster {} loops", first_cluster);
                return Err(Error::Corrupt);
            }

            let entry = fat.entry(current).ok_or(Error::Corrupt)?;

            if entry.is_end_of_chain() {
                break;
            }
            if entry.is_bad() {
                log::warn!("FAT chain from cluster {} hits a bad cluster", first_cluster);
                return Err(Error::Corrupt);
            }
            if entry.is_unallocated() {
                log::warn!(
                    "FAT chain from cluster {} runs into a free cell",
                    first_cluster
                );
                return Err(Error::Corrupt);
            }

            let next = entry.next as Cluster;
            if !in_range(next) {
                return Err(Error::Corrupt);
            }

            current = next;
        }

        Ok(Self { clusters })
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Cluster> {
        self.clusters.get(index).copied()
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cells 0 and 1 are the media descriptor and the dirty flags; chains
    // never touch them.
    fn fat(cells: &[u16]) -> Fat {
        Fat::from_cells(cells)
    }

    #[test]
    fn a_straight_chain_resolves_in_order() {
        let f = fat(&[0xFFF8, 0xFFFF, 3, 4, 7, 0xFFFF, 0, 0xFFF8]);

        let chain = ClusterChain::resolve(&f, 16, 2).unwrap();
        assert_eq!(chain.clusters(), &[2, 3, 4, 7]);
    }

    #[test]
    fn the_sentinel_is_not_a_member() {
        let f = fat(&[0xFFF8, 0xFFFF, 0xFFF8]);

        let chain = ClusterChain::resolve(&f, 16, 2).unwrap();
        assert_eq!(chain.clusters(), &[2]);
    }

    #[test]
    fn every_end_of_chain_marker_value_terminates() {
        for marker in &[0xFFF8u16, 0xFFF9, 0xFFFE, 0xFFFF] {
            let f = fat(&[0xFFF8, 0xFFFF, *marker]);
            assert_eq!(ClusterChain::resolve(&f, 16, 2).unwrap().len(), 1);
        }
    }

    #[test]
    fn bad_cluster_cells_are_corrupt() {
        let f = fat(&[0xFFF8, 0xFFFF, 3, 0xFFF7]);

        assert_eq!(ClusterChain::resolve(&f, 16, 2), Err(Error::Corrupt));
    }

    #[test]
    fn free_cells_mid_chain_are_corrupt() {
        let f = fat(&[0xFFF8, 0xFFFF, 3, 0x0000]);

        assert_eq!(ClusterChain::resolve(&f, 16, 2), Err(Error::Corrupt));
    }

    #[test]
    fn cycles_are_detected() {
        // 2 -> 3 -> 2 -> ...
        let f = fat(&[0xFFF8, 0xFFFF, 3, 2]);

        assert_eq!(ClusterChain::resolve(&f, 16, 2), Err(Error::Corrupt));
    }

    #[test]
    fn chains_may_not_start_below_two() {
        let f = fat(&[0xFFF8, 0xFFFF, 0xFFFF]);

        assert_eq!(ClusterChain::resolve(&f, 16, 1), Err(Error::Corrupt));
    }

    #[test]
    fn cluster_zero_means_no_chain() {
        let f = fat(&[0xFFF8, 0xFFFF]);

        assert!(ClusterChain::resolve(&f, 16, 0).unwrap().is_empty());
    }

    #[test]
    fn members_stay_within_the_volume() {
        // cell points at cluster 40 on a 16-cluster volume
        let f = fat(&[0xFFF8, 0xFFFF, 40]);

        assert_eq!(ClusterChain::resolve(&f, 16, 2), Err(Error::Corrupt));
    }

    #[test]
    fn a_truncated_table_is_corrupt() {
        let f = fat(&[0xFFF8, 0xFFFF, 9]);

        assert_eq!(ClusterChain::resolve(&f, 16, 2), Err(Error::Corrupt));
    }
}
