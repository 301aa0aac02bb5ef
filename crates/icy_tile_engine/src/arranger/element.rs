use crate::{codec::CodecCapabilities, ColorRgba32, DataFileRef, ElementCodec, EngineError, FileBitAddress, PaletteRef, PixelColorType, ResourceId, Result};

/// One codec bound cell of an arranger.
///
/// Elements are values: the builders return modified copies. Cloning an element clones its
/// codec, so every element always owns its own decode/encode scratch buffers.
#[derive(Debug, Clone)]
pub struct ArrangerElement {
    x1: usize,
    y1: usize,
    data_file: Option<DataFileRef>,
    address: FileBitAddress,
    codec: ElementCodec,
    palette: Option<PaletteRef>,
}

impl ArrangerElement {
    pub fn new(x1: usize, y1: usize, data_file: Option<DataFileRef>, address: FileBitAddress, codec: ElementCodec, palette: Option<PaletteRef>) -> Self {
        Self {
            x1,
            y1,
            data_file,
            address,
            codec,
            palette,
        }
    }

    pub fn with_location(mut self, x1: usize, y1: usize) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self
    }

    pub fn x1(&self) -> usize {
        self.x1
    }

    pub fn y1(&self) -> usize {
        self.y1
    }

    /// Last pixel column covered by the element (inclusive).
    pub fn x2(&self) -> usize {
        self.x1 + self.width() - 1
    }

    /// Last pixel row covered by the element (inclusive).
    pub fn y2(&self) -> usize {
        self.y1 + self.height() - 1
    }

    pub fn width(&self) -> usize {
        self.codec.width()
    }

    pub fn height(&self) -> usize {
        self.codec.height()
    }

    pub fn data_file(&self) -> Option<&DataFileRef> {
        self.data_file.as_ref()
    }

    pub fn address(&self) -> FileBitAddress {
        self.address
    }

    pub fn codec(&self) -> &ElementCodec {
        &self.codec
    }

    pub fn palette(&self) -> Option<&PaletteRef> {
        self.palette.as_ref()
    }

    pub fn color_type(&self) -> PixelColorType {
        self.codec.color_type()
    }

    /// True when the element has something to read: either a bound data file or a codec
    /// that needs no storage.
    pub fn has_data_source(&self) -> bool {
        self.data_file.is_some() || !self.codec.capabilities().contains(CodecCapabilities::READ_RAW)
    }

    pub fn linked_resources(&self) -> Vec<ResourceId> {
        self.data_file.iter().map(DataFileRef::id).chain(self.palette.iter().map(PaletteRef::id)).collect()
    }

    /// Drops the link to `id`. Returns true if the element referenced it.
    pub fn unlink_resource(&mut self, id: ResourceId) -> bool {
        let mut changed = false;
        if self.data_file.as_ref().is_some_and(|df| df.id() == id) {
            self.data_file = None;
            changed = true;
        }
        if self.palette.as_ref().is_some_and(|pal| pal.id() == id) {
            self.palette = None;
            changed = true;
        }
        changed
    }

    /// Reads the element from its data file and decodes it into palette indices.
    ///
    /// `scratch` receives the encoded bytes. The returned view borrows the codec buffers.
    pub fn decode_indexed(&mut self, scratch: &mut Vec<u8>) -> Result<&[u8]> {
        let ElementCodec::Indexed(codec) = &mut self.codec else {
            return Err(EngineError::ColorTypeMismatch {
                expected: PixelColorType::Indexed,
                actual: PixelColorType::Direct,
            });
        };
        codec.read_element(self.data_file.as_ref(), self.address, scratch)?;
        codec.decode_element(scratch)
    }

    /// Encodes `native` and writes it to the data file. The caller flushes the file.
    pub fn encode_indexed(&mut self, native: &[u8], scratch: &mut Vec<u8>) -> Result<()> {
        let ElementCodec::Indexed(codec) = &mut self.codec else {
            return Err(EngineError::ColorTypeMismatch {
                expected: PixelColorType::Indexed,
                actual: PixelColorType::Direct,
            });
        };
        scratch.clear();
        scratch.extend_from_slice(codec.encode_element(native)?);
        codec.write_element(self.data_file.as_ref(), self.address, scratch)
    }

    pub fn decode_direct(&mut self, scratch: &mut Vec<u8>) -> Result<&[ColorRgba32]> {
        let ElementCodec::Direct(codec) = &mut self.codec else {
            return Err(EngineError::ColorTypeMismatch {
                expected: PixelColorType::Direct,
                actual: PixelColorType::Indexed,
            });
        };
        codec.read_element(self.data_file.as_ref(), self.address, scratch)?;
        codec.decode_element(scratch)
    }

    pub fn encode_direct(&mut self, native: &[ColorRgba32], scratch: &mut Vec<u8>) -> Result<()> {
        let ElementCodec::Direct(codec) = &mut self.codec else {
            return Err(EngineError::ColorTypeMismatch {
                expected: PixelColorType::Direct,
                actual: PixelColorType::Indexed,
            });
        };
        scratch.clear();
        scratch.extend_from_slice(codec.encode_element(native)?);
        codec.write_element(self.data_file.as_ref(), self.address, scratch)
    }
}
