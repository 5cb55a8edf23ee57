//! Throughput benchmarks for sequential write and read against an
//! in-memory device, the same shape of workload `original_source`'s
//! firmware puts on the log/event files.

extern crate criterion;

use criterion::{criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion, PlotConfiguration, Throughput};

use kfs::{BlockDevice, Event, Kfs, MountPolicy, OpenFlags, SectorBuf, SECTOR_SIZE};

struct MemoryDevice {
    sectors: Vec<SectorBuf>,
}

impl MemoryDevice {
    fn new(sector_count: usize) -> Self {
        Self { sectors: vec![[0u8; SECTOR_SIZE]; sector_count] }
    }
}

impl BlockDevice for MemoryDevice {
    type Error = ();

    fn sector_count(&mut self) -> u32 {
        self.sectors.len() as u32
    }

    fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read_sector(&mut self, buf: &mut [u8], sector: u32, _count: u32) -> Result<(), Self::Error> {
        buf.copy_from_slice(&self.sectors[sector as usize]);
        Ok(())
    }

    fn write_sector(&mut self, buf: &[u8], sector: u32, _count: u32) -> Result<(), Self::Error> {
        self.sectors[sector as usize].copy_from_slice(buf);
        Ok(())
    }

    fn media_present(&mut self) -> bool {
        true
    }

    fn uptime_ms(&mut self) -> u32 {
        0
    }

    fn log_event(&mut self, _event: Event) {}
}

const DEVICE_SECTORS: usize = 2_097_152;
const CHUNK_SIZES: &[usize] = &[64, 512, 4096, 65536];

fn bench_write_speed(c: &mut Criterion) {
    let mut group = c.benchmark_group("write speed");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &chunk_size in CHUNK_SIZES {
        let chunk = vec![0xA5u8; chunk_size];
        group.throughput(Throughput::Bytes(chunk_size as u64));

        group.bench_with_input(BenchmarkId::new("log file write", chunk_size), &chunk, |b, chunk| {
            b.iter(|| {
                let mut kfs = Kfs::new(MemoryDevice::new(DEVICE_SECTORS), MountPolicy::default());
                kfs.format();
                kfs.init();
                kfs.open(3, OpenFlags::default()).unwrap();

                let mut written = 0u64;
                while written + chunk.len() as u64 <= kfs.file_allocated_size(3).unwrap() - 1 {
                    written += kfs.write(3, chunk).unwrap() as u64;
                }
            })
        });
    }
}

fn bench_read_speed(c: &mut Criterion) {
    let mut group = c.benchmark_group("read speed");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &chunk_size in CHUNK_SIZES {
        group.throughput(Throughput::Bytes(chunk_size as u64));

        group.bench_with_input(BenchmarkId::new("log file read", chunk_size), &chunk_size, |b, &chunk_size| {
            let mut kfs = Kfs::new(MemoryDevice::new(DEVICE_SECTORS), MountPolicy::default());
            kfs.format();
            kfs.init();
            kfs.open(3, OpenFlags::default()).unwrap();
            let payload = vec![0x5Au8; chunk_size];
            while kfs.write(3, &payload).unwrap() > 0 {}
            kfs.open(3, OpenFlags::default()).unwrap();

            b.iter(|| {
                let mut buf = vec![0u8; chunk_size];
                if kfs.read(3, &mut buf).unwrap() == 0 {
                    kfs.seek(3, kfs::SeekFrom::Absolute(0)).unwrap();
                }
            })
        });
    }
}

criterion_group!(benches, bench_write_speed, bench_read_speed);
criterion_main!(benches);
