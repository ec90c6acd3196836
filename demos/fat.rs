// Streams one file out of a FAT16 image to stdout.
//
// Usage: fat <image> <NAME.EXT>

use fat16::{FatFs, FileBackedStorage};

use std::io::Write;

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args.next().expect("usage: fat <image> <NAME.EXT>");
    let name = args.next().expect("usage: fat <image> <NAME.EXT>");

    let mut s = FileBackedStorage::from_file(&path).unwrap();
    let fs = FatFs::mount(&mut s, 0).unwrap();

    let mut f = fs.open_file(&mut s, &name).unwrap();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let mut buf = [0u8; 4096];
    loop {
        let n = f.read(&mut s, &mut buf, 1).unwrap();
        if n == 0 {
            break;
        }

        out.write_all(&buf[..n]).unwrap();
    }
}
