use std::{
    fmt::Display,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    bit_stream::{bytes_for_bits, copy_bits_unshifted, BitReader, BitWriter},
    EngineError, ResourceRef, Result,
};

/// Address of a single bit inside a data file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileBitAddress {
    pub file_offset: u64,
    #[serde(default)]
    pub bit_offset: u8,
}

impl FileBitAddress {
    pub fn new(file_offset: u64, bit_offset: u8) -> Self {
        let extra = (bit_offset / 8) as u64;
        Self {
            file_offset: file_offset + extra,
            bit_offset: bit_offset % 8,
        }
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            file_offset: bits / 8,
            bit_offset: (bits % 8) as u8,
        }
    }

    pub fn bits(self) -> u64 {
        self.file_offset * 8 + self.bit_offset as u64
    }

    /// Returns the address moved by `bits`, clamped at the start of the file.
    pub fn offset_by(self, bits: i64) -> Self {
        let target = self.bits() as i64 + bits;
        Self::from_bits(target.max(0) as u64)
    }
}

impl From<u64> for FileBitAddress {
    fn from(file_offset: u64) -> Self {
        Self { file_offset, bit_offset: 0 }
    }
}

impl Display for FileBitAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.bit_offset == 0 {
            write!(f, "0x{:X}", self.file_offset)
        } else {
            write!(f, "0x{:X}.{}", self.file_offset, self.bit_offset)
        }
    }
}

/// Random access storage behind a data file.
pub trait BackingStore: Send {
    fn len_bits(&self) -> u64;

    /// Reads `bits` bits starting at `address` into `dest`. The first bit read becomes the most
    /// significant bit of `dest[0]`.
    fn read_bits(&mut self, address: FileBitAddress, bits: usize, dest: &mut [u8]) -> Result<()>;

    /// Writes the first `bits` bits of `src` (msb first) at `address`. Neighbouring bits of
    /// partially covered bytes are preserved.
    fn write_bits(&mut self, address: FileBitAddress, bits: usize, src: &[u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// Byte level access shared by the store implementations.
trait ByteAccess {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;
}

impl ByteAccess for File {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(buf)?;
        Ok(())
    }
}

impl ByteAccess for Vec<u8> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = offset as usize;
        buf.copy_from_slice(&self[start..start + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        let start = offset as usize;
        self[start..start + buf.len()].copy_from_slice(buf);
        Ok(())
    }
}

fn check_buffer(len: usize, bits: usize) -> Result<()> {
    if len * 8 < bits {
        return Err(EngineError::BitStreamTooLong { length: bits, capacity: len * 8 });
    }
    Ok(())
}

fn read_bits_with(access: &mut impl ByteAccess, len_bits: u64, address: FileBitAddress, bits: usize, dest: &mut [u8]) -> Result<()> {
    if address.bits() + bits as u64 > len_bits {
        return Err(EngineError::ReadPastEnd {
            address: address.bits(),
            bits,
            length: len_bits,
        });
    }
    if bits == 0 {
        return Ok(());
    }
    check_buffer(dest.len(), bits)?;
    if address.bit_offset == 0 {
        let needed = bytes_for_bits(bits);
        access.read_at(address.file_offset, &mut dest[..needed])?;
        if bits & 7 != 0 {
            dest[needed - 1] &= 0xFF << (8 - (bits & 7));
        }
        return Ok(());
    }
    let mut raw = vec![0; bytes_for_bits(address.bit_offset as usize + bits)];
    access.read_at(address.file_offset, &mut raw)?;
    copy_bits_unshifted(&raw, address.bit_offset as usize, bits, dest)
}

fn write_bits_with(access: &mut impl ByteAccess, len_bits: u64, address: FileBitAddress, bits: usize, src: &[u8]) -> Result<()> {
    if address.bits() + bits as u64 > len_bits {
        return Err(EngineError::WritePastEnd {
            address: address.bits(),
            bits,
            length: len_bits,
        });
    }
    if bits == 0 {
        return Ok(());
    }
    check_buffer(src.len(), bits)?;
    if address.bit_offset == 0 && bits & 7 == 0 {
        return access.write_at(address.file_offset, &src[..bits / 8]);
    }

    let start = address.bit_offset as usize;
    let mut raw = vec![0; bytes_for_bits(start + bits)];
    access.read_at(address.file_offset, &mut raw)?;
    for pos in start..start + bits {
        raw[pos >> 3] &= !(0x80 >> (pos & 7));
    }
    let raw_len = raw.len() * 8;
    let mut writer = BitWriter::open(&mut raw, raw_len)?;
    writer.seek_absolute(start)?;
    let mut reader = BitReader::open(src, bits)?;
    let mut remaining = bits;
    while remaining > 0 {
        let chunk = remaining.min(8);
        writer.write_bits(reader.read_bits(chunk)?, chunk)?;
        remaining -= chunk;
    }
    access.write_at(address.file_offset, &raw)
}

/// File system backed store.
pub struct FileStore {
    file: File,
    len: u64,
}

impl FileStore {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EngineError::FileNotFound { path: path.to_path_buf() });
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl BackingStore for FileStore {
    fn len_bits(&self) -> u64 {
        self.len * 8
    }

    fn read_bits(&mut self, address: FileBitAddress, bits: usize, dest: &mut [u8]) -> Result<()> {
        let len_bits = self.len_bits();
        read_bits_with(&mut self.file, len_bits, address, bits, dest)
    }

    fn write_bits(&mut self, address: FileBitAddress, bits: usize, src: &[u8]) -> Result<()> {
        let len_bits = self.len_bits();
        write_bits_with(&mut self.file, len_bits, address, bits, src)
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

/// In-memory store, used for imported buffers and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Vec<u8>,
    flush_count: usize,
}

impl MemoryStore {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, flush_count: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn flush_count(&self) -> usize {
        self.flush_count
    }
}

impl BackingStore for MemoryStore {
    fn len_bits(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    fn read_bits(&mut self, address: FileBitAddress, bits: usize, dest: &mut [u8]) -> Result<()> {
        let len_bits = self.len_bits();
        read_bits_with(&mut self.data, len_bits, address, bits, dest)
    }

    fn write_bits(&mut self, address: FileBitAddress, bits: usize, src: &[u8]) -> Result<()> {
        let len_bits = self.len_bits();
        write_bits_with(&mut self.data, len_bits, address, bits, src)
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_count += 1;
        Ok(())
    }
}

/// A binary file (typically a ROM image) that arrangers and palettes read from.
pub struct DataFile {
    name: String,
    location: PathBuf,
    store: Box<dyn BackingStore>,
}

pub type DataFileRef = ResourceRef<DataFile>;

impl DataFile {
    /// Opens the file at `location`. Fails with [`EngineError::FileNotFound`] when it does not exist.
    pub fn open(name: impl Into<String>, location: impl Into<PathBuf>) -> Result<Self> {
        let location = location.into();
        let store = FileStore::open(&location)?;
        Ok(Self {
            name: name.into(),
            location,
            store: Box::new(store),
        })
    }

    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::with_store(name, PathBuf::new(), Box::new(MemoryStore::new(data)))
    }

    pub fn with_store(name: impl Into<String>, location: PathBuf, store: Box<dyn BackingStore>) -> Self {
        Self {
            name: name.into(),
            location,
            store,
        }
    }

    pub fn into_ref(self) -> DataFileRef {
        ResourceRef::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn len_bits(&self) -> u64 {
        self.store.len_bits()
    }

    pub fn read_bits(&mut self, address: FileBitAddress, bits: usize, dest: &mut [u8]) -> Result<()> {
        self.store.read_bits(address, bits, dest)
    }

    pub fn write_bits(&mut self, address: FileBitAddress, bits: usize, src: &[u8]) -> Result<()> {
        self.store.write_bits(address, bits, src)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.store.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unaligned_write_preserves_neighbours() {
        let mut store = MemoryStore::new(vec![0xFF, 0xFF]);
        store.write_bits(FileBitAddress::new(0, 4), 8, &[0x00]).unwrap();
        assert_eq!(&[0xF0, 0x0F], store.as_bytes());

        let mut out = [0u8; 1];
        store.read_bits(FileBitAddress::new(0, 2), 4, &mut out).unwrap();
        assert_eq!(0b1100_0000, out[0]);
    }

    #[test]
    fn test_read_past_end() {
        let mut store = MemoryStore::new(vec![0; 2]);
        let mut out = [0u8; 2];
        assert!(matches!(
            store.read_bits(FileBitAddress::new(1, 1), 8, &mut out),
            Err(EngineError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn test_address_arithmetic() {
        let address = FileBitAddress::new(2, 3);
        assert_eq!(19, address.bits());
        assert_eq!(FileBitAddress::new(3, 0), address.offset_by(5));
        assert_eq!(FileBitAddress::default(), address.offset_by(-100));
        assert_eq!(FileBitAddress::new(3, 1), FileBitAddress::new(2, 9));
    }
}
