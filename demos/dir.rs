// Lists the root directory of a FAT16 image.
//
// Usage: dir <image>

use fat16::{FatFs, FileBackedStorage};

fn main() {
    let path = std::env::args().nth(1).expect("usage: dir <image>");

    let mut s = FileBackedStorage::from_file(&path).unwrap();
    let fs = FatFs::mount(&mut s, 0).unwrap();

    println!("{:#?}", fs.boot_sector());

    let mut dir = fs.open_root_dir(&mut s, "\\").unwrap();
    while let Some(entry) = dir.read() {
        let kind = if entry.is_dir() { "<DIR>" } else { "     " };
        println!("{:>10} {} {}", entry.file_size(), kind, entry.short_name());
    }
}
