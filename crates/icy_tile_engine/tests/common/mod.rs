#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use icy_tile_engine::{BackingStore, ColorRgba32, DataFile, DataFileRef, FileBitAddress, MemoryStore, Palette, PaletteRef, Result};

/// Deterministic byte pattern.
pub fn pattern_bytes(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

/// Fresh directory below the system temp dir, unique per process and test.
pub fn temp_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("icy_tile_{test}_{}", std::process::id()));
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Memory store that counts flushes in a shared counter.
pub struct CountingStore {
    inner: MemoryStore,
    flushes: Arc<AtomicUsize>,
}

impl BackingStore for CountingStore {
    fn len_bits(&self) -> u64 {
        self.inner.len_bits()
    }

    fn read_bits(&mut self, address: FileBitAddress, bits: usize, dest: &mut [u8]) -> Result<()> {
        self.inner.read_bits(address, bits, dest)
    }

    fn write_bits(&mut self, address: FileBitAddress, bits: usize, src: &[u8]) -> Result<()> {
        self.inner.write_bits(address, bits, src)
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.inner.flush()
    }
}

pub fn counting_file(name: &str, data: Vec<u8>) -> (DataFileRef, Arc<AtomicUsize>) {
    let flushes = Arc::new(AtomicUsize::new(0));
    let store = CountingStore {
        inner: MemoryStore::new(data),
        flushes: flushes.clone(),
    };
    (DataFile::with_store(name, PathBuf::new(), Box::new(store)).into_ref(), flushes)
}

/// 16 entry grayscale palette, index 0 transparent.
pub fn gray_palette() -> PaletteRef {
    let colors = (0..16u8).map(|i| ColorRgba32::opaque(i * 16, i * 16, i * 16)).collect();
    Palette::from_colors("Gray", colors, true).unwrap().into_ref()
}
