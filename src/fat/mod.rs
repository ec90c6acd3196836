//! FAT filesystem things!

use crate::error::Error;
use crate::storage::{Storage, SECTOR_BYTES};

use boot_sector::BootSector;
use dir::{Dir, DirEntry, State};
use file::File;
use table::{Cluster, ClusterChain, Fat};

use generic_array::GenericArray;
use typenum::consts::U512;

use core::marker::PhantomData;

#[cfg(feature = "no_std")]
use alloc::vec::Vec;

pub mod boot_sector;
pub mod dir;
pub mod file;
pub mod table;

/// A mounted FAT16 volume: the decoded boot sector plus every piece of
/// geometry derived from it.
///
/// The volume does not hold on to the medium; every operation that touches
/// it takes `&mut S`, so a caller can never have two handles mid-read on
/// one device at once. Handles (`File`, `Dir`) borrow the volume and so
/// cannot outlive it.
///
/// All sector numbers below are logical (volume-relative, in units of
/// `bytes_per_sector`); `read_sectors` translates to the device's fixed
/// 512-byte sectors.
#[derive(Debug)]
pub struct FatFs<S: Storage<Word = u8, SECTOR_SIZE = U512>> {
    first_device_sector: u64,

    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    fat_count: u8,
    sectors_per_fat: u16,
    max_root_entries: u16,
    total_sectors: u32,

    first_fat_sector: u32,
    root_dir_sectors: u32,
    first_root_sector: u32,
    first_data_sector: u32,
    total_clusters: u32,

    boot_sector: BootSector,

    _s: PhantomData<S>,
}

impl<S: Storage<Word = u8, SECTOR_SIZE = U512>> FatFs<S> {
    /// Reads and validates the boot sector at `first_sector` (a device
    /// sector number; 0 for a partition-less image) and derives the
    /// volume's geometry.
    ///
    /// Anything wrong with the boot sector, including failing to read it
    /// at all, is [`Error::InvalidFormat`].
    pub fn mount(storage: &mut S, first_sector: u64) -> Result<Self, Error> {
        let mut sector = GenericArray::default();
        storage
            .read_sector(first_sector as usize, &mut sector)
            .map_err(|_| Error::InvalidFormat)?;

        let boot_sector = BootSector::read(&sector);
        boot_sector.validate()?;

        let bpb = &boot_sector.bpb;

        let bytes_per_sector = bpb.bytes_per_logical_sector;
        let sectors_per_cluster = bpb.logical_sectors_per_cluster;
        let reserved_sectors = bpb.num_reserved_logical_sectors;
        let fat_count = bpb.num_file_alloc_tables;
        let sectors_per_fat = bpb.logical_sectors_per_fat;
        let max_root_entries = bpb.max_root_dir_entries;
        let total_sectors = boot_sector.total_sector_count();

        let first_fat_sector = reserved_sectors as u32;
        let root_dir_sectors = ((max_root_entries as u32) * (dir::DirEntry::SIZE as u32)
            + (bytes_per_sector as u32 - 1))
            / bytes_per_sector as u32;
        let first_root_sector =
            reserved_sectors as u32 + (fat_count as u32) * (sectors_per_fat as u32);
        let first_data_sector = first_root_sector + root_dir_sectors;
        let total_clusters = total_sectors / sectors_per_cluster as u32;

        if first_data_sector >= total_sectors {
            return Err(Error::InvalidFormat);
        }

        log::debug!(
            "mounted FAT16 volume at device sector {}: {} B/sector, {} sectors/cluster",
            first_sector,
            bytes_per_sector,
            sectors_per_cluster,
        );
        log::debug!(
            "  FAT at {} ({} x {} sectors), root dir at {} ({} sectors), data at {}, {} clusters",
            first_fat_sector,
            fat_count,
            sectors_per_fat,
            first_root_sector,
            root_dir_sectors,
            first_data_sector,
            total_clusters,
        );

        Ok(Self {
            first_device_sector: first_sector,

            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            fat_count,
            sectors_per_fat,
            max_root_entries,
            total_sectors,

            first_fat_sector,
            root_dir_sectors,
            first_root_sector,
            first_data_sector,
            total_clusters,

            boot_sector,

            _s: PhantomData,
        })
    }

    pub fn boot_sector(&self) -> &BootSector {
        &self.boot_sector
    }

    pub fn bytes_per_sector(&self) -> u16 {
        self.bytes_per_sector
    }

    pub fn sectors_per_cluster(&self) -> u8 {
        self.sectors_per_cluster
    }

    pub fn reserved_sectors(&self) -> u16 {
        self.reserved_sectors
    }

    pub fn fat_count(&self) -> u8 {
        self.fat_count
    }

    pub fn sectors_per_fat(&self) -> u16 {
        self.sectors_per_fat
    }

    pub fn max_root_entries(&self) -> u16 {
        self.max_root_entries
    }

    pub fn total_sectors(&self) -> u32 {
        self.total_sectors
    }

    pub fn first_fat_sector(&self) -> u32 {
        self.first_fat_sector
    }

    pub fn root_dir_sectors(&self) -> u32 {
        self.root_dir_sectors
    }

    pub fn first_root_sector(&self) -> u32 {
        self.first_root_sector
    }

    pub fn first_data_sector(&self) -> u32 {
        self.first_data_sector
    }

    pub fn total_clusters(&self) -> u32 {
        self.total_clusters
    }

    pub fn bytes_per_cluster(&self) -> usize {
        (self.sectors_per_cluster as usize) * (self.bytes_per_sector as usize)
    }

    /// First logical sector of a data cluster.
    pub fn cluster_to_sector(&self, cluster: Cluster) -> u32 {
        self.first_data_sector + (cluster - 2) * self.sectors_per_cluster as u32
    }

    /// Reads `count` logical sectors starting at `logical_sector` into
    /// `buf`, translating to the device's fixed 512-byte sectors.
    ///
    /// `buf` must hold at least `count * bytes_per_sector` bytes.
    pub(crate) fn read_sectors(
        &self,
        storage: &mut S,
        logical_sector: u32,
        count: u32,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        let per_logical = (self.bytes_per_sector as u64) / (SECTOR_BYTES as u64);
        let first = self.first_device_sector + (logical_sector as u64) * per_logical;
        let device_sectors = (count as u64) * per_logical;

        let mut sector = GenericArray::default();
        for i in 0..device_sectors {
            storage.read_sector((first + i) as usize, &mut sector)?;

            let offset = (i as usize) * SECTOR_BYTES;
            buf[offset..offset + SECTOR_BYTES].copy_from_slice(sector.as_slice());
        }

        Ok(())
    }

    /// The root directory region, read in full.
    fn load_root_dir(&self, storage: &mut S) -> Result<Vec<u8>, Error> {
        let bytes = (self.root_dir_sectors as usize) * (self.bytes_per_sector as usize);

        let mut image = Vec::new();
        image.try_reserve_exact(bytes).map_err(|_| Error::OutOfMemory)?;
        image.resize(bytes, 0);

        self.read_sectors(storage, self.first_root_sector, self.root_dir_sectors, &mut image)?;

        Ok(image)
    }

    /// Opens the named file from the root directory.
    ///
    /// `name` is matched byte-for-byte against each entry's decoded 8.3
    /// name; stored case counts. Directories and volume labels refuse
    /// with [`Error::IsDirectory`]. Zero-length files open fine and carry
    /// an empty chain.
    pub fn open_file<'v>(&'v self, storage: &mut S, name: &str) -> Result<File<'v, S>, Error> {
        if name.is_empty() {
            return Err(Error::BadArgument);
        }

        let image = self.load_root_dir(storage)?;

        for slot in image
            .chunks_exact(DirEntry::SIZE)
            .take(self.max_root_entries as usize)
        {
            let mut arr = [0u8; DirEntry::SIZE];
            arr.copy_from_slice(slot);
            let entry = DirEntry::from_arr(arr);

            match entry.state() {
                State::Exists => {}
                State::End | State::Deleted | State::Dot => continue,
            }

            if entry.short_name().as_bytes() != name.as_bytes() {
                continue;
            }

            let attrs = entry.attributes();
            if attrs.is_dir() || attrs.is_volume_label() {
                return Err(Error::IsDirectory);
            }

            let chain = if entry.file_size() == 0 {
                ClusterChain::empty()
            } else {
                let fat = Fat::load(self, storage)?;
                ClusterChain::resolve(
                    &fat,
                    self.total_clusters,
                    entry.first_cluster_fat16() as Cluster,
                )?
            };

            return Ok(File::new(self, entry, chain));
        }

        Err(Error::NotFound)
    }

    /// Opens the root directory.
    ///
    /// The only path this reader understands is the root itself, a single
    /// backslash; anything else is [`Error::NotFound`].
    pub fn open_root_dir<'v>(&'v self, storage: &mut S, path: &str) -> Result<Dir<'v, S>, Error> {
        if path != "\\" {
            return Err(Error::NotFound);
        }

        let image = self.load_root_dir(storage)?;

        Ok(Dir::new(self, image))
    }
}
