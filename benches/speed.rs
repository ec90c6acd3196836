//! A read benchmark that tries to measure read speed.

use criterion::{
    criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion, PlotConfiguration,
    Throughput,
};

use fat16::{FatFs, RamStorage, SeekFrom};

const FILE_LEN: usize = 1 << 20;

// 512 B sectors, 8 sectors per cluster, one 1 MiB file laid out
// contiguously from cluster 2.
fn build_image() -> Vec<u8> {
    const SECTORS_PER_CLUSTER: usize = 8;
    const CLUSTER_BYTES: usize = SECTORS_PER_CLUSTER * 512;
    const RESERVED: usize = 1;
    const SECTORS_PER_FAT: usize = 4;
    const ROOT_ENTRIES: usize = 512;
    const FIRST_ROOT: usize = RESERVED + 2 * SECTORS_PER_FAT;
    const FIRST_DATA: usize = FIRST_ROOT + ROOT_ENTRIES * 32 / 512;

    let clusters = FILE_LEN / CLUSTER_BYTES;
    let total_sectors = FIRST_DATA + (clusters + 4) * SECTORS_PER_CLUSTER;

    let mut img = vec![0u8; total_sectors * 512];

    img[0x00B..0x00D].copy_from_slice(&512u16.to_le_bytes());
    img[0x00D] = SECTORS_PER_CLUSTER as u8;
    img[0x00E..0x010].copy_from_slice(&(RESERVED as u16).to_le_bytes());
    img[0x010] = 2;
    img[0x011..0x013].copy_from_slice(&(ROOT_ENTRIES as u16).to_le_bytes());
    img[0x013..0x015].copy_from_slice(&(total_sectors as u16).to_le_bytes());
    img[0x015] = 0xF8;
    img[0x016..0x018].copy_from_slice(&(SECTORS_PER_FAT as u16).to_le_bytes());
    img[0x1FE] = 0x55;
    img[0x1FF] = 0xAA;

    for copy in 0..2 {
        let base = (RESERVED + copy * SECTORS_PER_FAT) * 512;
        img[base..base + 2].copy_from_slice(&0xFFF8u16.to_le_bytes());
        img[base + 2..base + 4].copy_from_slice(&0xFFFFu16.to_le_bytes());

        for c in 2..2 + clusters {
            let next = if c == clusters + 1 { 0xFFFF } else { (c + 1) as u16 };
            img[base + c * 2..base + c * 2 + 2].copy_from_slice(&next.to_le_bytes());
        }
    }

    let base = FIRST_ROOT * 512;
    img[base..base + 8].copy_from_slice(b"SPEED   ");
    img[base + 8..base + 11].copy_from_slice(b"BIN");
    img[base + 11] = 0x20;
    img[base + 26..base + 28].copy_from_slice(&2u16.to_le_bytes());
    img[base + 28..base + 32].copy_from_slice(&(FILE_LEN as u32).to_le_bytes());

    for i in 0..FILE_LEN {
        img[FIRST_DATA * 512 + i] = (i % 251) as u8;
    }

    img
}

fn bench_read_speed(c: &mut Criterion) {
    let mut group = c.benchmark_group("read speed");

    let plot_config = PlotConfiguration::default()
        .summary_scale(AxisScale::Logarithmic);
    group.plot_config(plot_config);

    let mut s = RamStorage::new(build_image()).unwrap();
    let fs = FatFs::mount(&mut s, 0).unwrap();

    let mut buf = vec![0u8; FILE_LEN];

    for elem_size in &[1usize, 512, 4096] {
        group.throughput(Throughput::Bytes(FILE_LEN as u64));

        group.bench_with_input(
            BenchmarkId::new("sequential read", elem_size),
            elem_size,
            |b, &elem_size| {
                let mut f = fs.open_file(&mut s, "SPEED.BIN").unwrap();

                b.iter(|| {
                    f.seek(SeekFrom::Start(0)).unwrap();

                    let n = f.read(&mut s, &mut buf, elem_size).unwrap();
                    assert_eq!(n, FILE_LEN / elem_size);
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_read_speed);
criterion_main!(benches);
