//! Pixel format transcoding.
//!
//! Every codec converts between the on-disk ("foreign") representation of one arranger
//! element and an in-memory ("native") pixel buffer. Indexed codecs produce one palette index
//! per pixel, direct codecs one [`ColorRgba32`] per pixel. Native buffers are flat and row major.
//!
//! Codecs own their scratch buffers and hand out borrowed views of them. A view returned by
//! `decode_element` or `encode_element` is invalidated by the next call on the same codec, and a
//! codec instance must not be shared between elements that are processed concurrently.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{bit_stream::bytes_for_bits, ColorRgba32, DataFileRef, EngineError, FileBitAddress, Result};

mod bitplane;
pub use bitplane::*;

mod packed;
pub use packed::*;

mod direct;
pub use direct::*;

mod blank;
pub use blank::*;

mod factory;
pub use factory::*;

bitflags! {
    /// Operations a codec supports.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CodecCapabilities: u32 {
        const DECODE = 1 << 0;
        const ENCODE = 1 << 1;
        /// Can fetch its encoded bytes from a data file
        const READ_RAW = 1 << 2;
        /// Can store its encoded bytes into a data file
        const WRITE_RAW = 1 << 3;
        const RESIZE = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelColorType {
    #[default]
    Indexed,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageLayout {
    /// Small fixed size cells that are arranged freely
    #[default]
    Tiled,
    /// Pixels stored row after row without tile structure
    Linear,
    /// One element covers the whole arranger
    Single,
}

/// Attributes and raw I/O shared by indexed and direct codecs.
pub trait GraphicsCodec: Send {
    fn name(&self) -> &str;
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn layout(&self) -> ImageLayout;
    fn color_type(&self) -> PixelColorType;
    /// Bits per pixel.
    fn color_depth(&self) -> usize;

    /// Encoded size of one element in bits.
    fn storage_size(&self) -> usize {
        self.width() * self.height() * self.color_depth()
    }

    fn default_width(&self) -> usize {
        self.width()
    }

    fn default_height(&self) -> usize {
        self.height()
    }

    fn width_resize_increment(&self) -> usize {
        1
    }

    fn height_resize_increment(&self) -> usize {
        1
    }

    fn can_resize(&self) -> bool {
        false
    }

    fn capabilities(&self) -> CodecCapabilities {
        let mut caps = CodecCapabilities::DECODE | CodecCapabilities::ENCODE | CodecCapabilities::READ_RAW | CodecCapabilities::WRITE_RAW;
        if self.can_resize() {
            caps |= CodecCapabilities::RESIZE;
        }
        caps
    }

    /// Changes the element dimensions. Scratch buffers are reallocated on the next decode/encode.
    fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        let _ = (width, height);
        Err(EngineError::CodecNotResizable { codec: self.name().to_string() })
    }

    /// Fetches the encoded bytes of an element from `data_file` at `address` into `buffer`.
    fn read_element(&self, data_file: Option<&DataFileRef>, address: FileBitAddress, buffer: &mut Vec<u8>) -> Result<()> {
        let Some(data_file) = data_file else {
            return Err(EngineError::NoDataFile { codec: self.name().to_string() });
        };
        let bits = self.storage_size();
        buffer.clear();
        buffer.resize(bytes_for_bits(bits), 0);
        data_file.lock().read_bits(address, bits, buffer)
    }

    /// Stores `encoded` into `data_file` at `address`. The caller flushes the file.
    fn write_element(&self, data_file: Option<&DataFileRef>, address: FileBitAddress, encoded: &[u8]) -> Result<()> {
        let Some(data_file) = data_file else {
            return Err(EngineError::NoDataFile { codec: self.name().to_string() });
        };
        data_file.lock().write_bits(address, self.storage_size(), encoded)
    }
}

pub trait IndexedCodec: GraphicsCodec {
    /// Decodes `encoded` into a `width * height` buffer of palette indices.
    fn decode_element(&mut self, encoded: &[u8]) -> Result<&[u8]>;

    /// Encodes a `width * height` buffer of palette indices. The returned view is only valid
    /// until the next call on this codec.
    fn encode_element(&mut self, native: &[u8]) -> Result<&[u8]>;

    fn clone_codec(&self) -> Box<dyn IndexedCodec>;
}

pub trait DirectCodec: GraphicsCodec {
    fn decode_element(&mut self, encoded: &[u8]) -> Result<&[ColorRgba32]>;

    fn encode_element(&mut self, native: &[ColorRgba32]) -> Result<&[u8]>;

    fn clone_codec(&self) -> Box<dyn DirectCodec>;
}

/// Codec bound to an arranger element, resolved once when the element is created.
pub enum ElementCodec {
    Indexed(Box<dyn IndexedCodec>),
    Direct(Box<dyn DirectCodec>),
}

macro_rules! dispatch {
    ($self:ident, $codec:ident => $body:expr) => {
        match $self {
            ElementCodec::Indexed($codec) => $body,
            ElementCodec::Direct($codec) => $body,
        }
    };
}

impl ElementCodec {
    pub fn name(&self) -> &str {
        dispatch!(self, c => c.name())
    }

    pub fn width(&self) -> usize {
        dispatch!(self, c => c.width())
    }

    pub fn height(&self) -> usize {
        dispatch!(self, c => c.height())
    }

    pub fn layout(&self) -> ImageLayout {
        dispatch!(self, c => c.layout())
    }

    pub fn color_type(&self) -> PixelColorType {
        match self {
            ElementCodec::Indexed(_) => PixelColorType::Indexed,
            ElementCodec::Direct(_) => PixelColorType::Direct,
        }
    }

    pub fn color_depth(&self) -> usize {
        dispatch!(self, c => c.color_depth())
    }

    pub fn storage_size(&self) -> usize {
        dispatch!(self, c => c.storage_size())
    }

    pub fn capabilities(&self) -> CodecCapabilities {
        dispatch!(self, c => c.capabilities())
    }

    pub fn can_resize(&self) -> bool {
        dispatch!(self, c => c.can_resize())
    }

    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        dispatch!(self, c => c.resize(width, height))
    }

    pub fn read_element(&self, data_file: Option<&DataFileRef>, address: FileBitAddress, buffer: &mut Vec<u8>) -> Result<()> {
        dispatch!(self, c => c.read_element(data_file, address, buffer))
    }

    pub fn write_element(&self, data_file: Option<&DataFileRef>, address: FileBitAddress, encoded: &[u8]) -> Result<()> {
        dispatch!(self, c => c.write_element(data_file, address, encoded))
    }
}

impl Clone for ElementCodec {
    fn clone(&self) -> Self {
        match self {
            ElementCodec::Indexed(c) => ElementCodec::Indexed(c.clone_codec()),
            ElementCodec::Direct(c) => ElementCodec::Direct(c.clone_codec()),
        }
    }
}

impl std::fmt::Debug for ElementCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}x{})", self.name(), self.width(), self.height())
    }
}

/// Scratch buffers reused across decode/encode calls of one codec instance.
#[derive(Debug, Clone, Default)]
pub struct CodecBuffers<N: Copy + Default> {
    pub foreign: Vec<u8>,
    pub native: Vec<N>,
}

impl<N: Copy + Default> CodecBuffers<N> {
    /// Sizes the buffers for `pixels` native entries and `bits` encoded bits, reallocating
    /// only when the size changed.
    pub fn ensure(&mut self, pixels: usize, bits: usize) {
        if self.native.len() != pixels {
            self.native = vec![N::default(); pixels];
        }
        let bytes = bytes_for_bits(bits);
        if self.foreign.len() != bytes {
            self.foreign = vec![0; bytes];
        }
    }
}

pub(crate) fn check_encoded(codec: &str, encoded: &[u8], storage_size: usize) -> Result<()> {
    if encoded.len() * 8 < storage_size {
        return Err(EngineError::EncodedSizeMismatch {
            codec: codec.to_string(),
            expected: storage_size,
            actual: encoded.len() * 8,
        });
    }
    Ok(())
}

pub(crate) fn check_native<N>(codec: &str, native: &[N], width: usize, height: usize) -> Result<()> {
    if native.len() != width * height {
        return Err(EngineError::NativeSizeMismatch {
            codec: codec.to_string(),
            width,
            height,
            actual: native.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_indices(codec: &str, native: &[u8], color_depth: usize) -> Result<()> {
    if color_depth >= 8 {
        return Ok(());
    }
    let max = 1usize << color_depth;
    if let Some(index) = native.iter().find(|&&i| i as usize >= max) {
        return Err(EngineError::IndexOutOfCodecRange {
            codec: codec.to_string(),
            index: *index,
            max,
        });
    }
    Ok(())
}

pub(crate) fn check_resize(codec: &dyn GraphicsCodec, width: usize, height: usize) -> Result<()> {
    if !codec.can_resize() {
        return Err(EngineError::CodecNotResizable { codec: codec.name().to_string() });
    }
    let (wi, hi) = (codec.width_resize_increment(), codec.height_resize_increment());
    if width == 0 || height == 0 || width % wi != 0 || height % hi != 0 {
        return Err(EngineError::InvalidCodecSize {
            codec: codec.name().to_string(),
            width,
            height,
            width_increment: wi,
            height_increment: hi,
        });
    }
    Ok(())
}
