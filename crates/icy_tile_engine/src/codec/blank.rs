//! Placeholder codecs for elements that have no backing storage.

use super::{check_native, CodecBuffers, CodecCapabilities, DirectCodec, GraphicsCodec, ImageLayout, IndexedCodec, PixelColorType};
use crate::{ColorRgba32, DataFileRef, FileBitAddress, Result};

pub const BLANK_INDEXED_NAME: &str = "Blank Indexed";
pub const BLANK_DIRECT_NAME: &str = "Blank Direct";

/// Decodes every element to a single fill index and discards writes.
#[derive(Debug, Clone)]
pub struct BlankIndexedCodec {
    width: usize,
    height: usize,
    fill_index: u8,
    buffers: CodecBuffers<u8>,
}

impl Default for BlankIndexedCodec {
    fn default() -> Self {
        Self::new(8, 8)
    }
}

impl BlankIndexedCodec {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            fill_index: 0,
            buffers: CodecBuffers::default(),
        }
    }

    pub fn with_fill_index(mut self, fill_index: u8) -> Self {
        self.fill_index = fill_index;
        self
    }
}

impl GraphicsCodec for BlankIndexedCodec {
    fn name(&self) -> &str {
        BLANK_INDEXED_NAME
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn layout(&self) -> ImageLayout {
        ImageLayout::Tiled
    }

    fn color_type(&self) -> PixelColorType {
        PixelColorType::Indexed
    }

    fn color_depth(&self) -> usize {
        0
    }

    fn capabilities(&self) -> CodecCapabilities {
        CodecCapabilities::DECODE | CodecCapabilities::ENCODE
    }

    fn read_element(&self, _data_file: Option<&DataFileRef>, _address: FileBitAddress, buffer: &mut Vec<u8>) -> Result<()> {
        buffer.clear();
        Ok(())
    }

    fn write_element(&self, _data_file: Option<&DataFileRef>, _address: FileBitAddress, _encoded: &[u8]) -> Result<()> {
        Ok(())
    }
}

impl IndexedCodec for BlankIndexedCodec {
    fn decode_element(&mut self, _encoded: &[u8]) -> Result<&[u8]> {
        self.buffers.ensure(self.width * self.height, 0);
        self.buffers.native.fill(self.fill_index);
        Ok(&self.buffers.native)
    }

    fn encode_element(&mut self, native: &[u8]) -> Result<&[u8]> {
        check_native(BLANK_INDEXED_NAME, native, self.width, self.height)?;
        Ok(&[])
    }

    fn clone_codec(&self) -> Box<dyn IndexedCodec> {
        Box::new(self.clone())
    }
}

/// Decodes every element to a single fill color and discards writes.
#[derive(Debug, Clone)]
pub struct BlankDirectCodec {
    width: usize,
    height: usize,
    fill_color: ColorRgba32,
    buffers: CodecBuffers<ColorRgba32>,
}

impl Default for BlankDirectCodec {
    fn default() -> Self {
        Self::new(8, 8)
    }
}

impl BlankDirectCodec {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            fill_color: ColorRgba32::TRANSPARENT,
            buffers: CodecBuffers::default(),
        }
    }

    pub fn with_fill_color(mut self, fill_color: ColorRgba32) -> Self {
        self.fill_color = fill_color;
        self
    }
}

impl GraphicsCodec for BlankDirectCodec {
    fn name(&self) -> &str {
        BLANK_DIRECT_NAME
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn layout(&self) -> ImageLayout {
        ImageLayout::Tiled
    }

    fn color_type(&self) -> PixelColorType {
        PixelColorType::Direct
    }

    fn color_depth(&self) -> usize {
        0
    }

    fn capabilities(&self) -> CodecCapabilities {
        CodecCapabilities::DECODE | CodecCapabilities::ENCODE
    }

    fn read_element(&self, _data_file: Option<&DataFileRef>, _address: FileBitAddress, buffer: &mut Vec<u8>) -> Result<()> {
        buffer.clear();
        Ok(())
    }

    fn write_element(&self, _data_file: Option<&DataFileRef>, _address: FileBitAddress, _encoded: &[u8]) -> Result<()> {
        Ok(())
    }
}

impl DirectCodec for BlankDirectCodec {
    fn decode_element(&mut self, _encoded: &[u8]) -> Result<&[ColorRgba32]> {
        self.buffers.ensure(self.width * self.height, 0);
        self.buffers.native.fill(self.fill_color);
        Ok(&self.buffers.native)
    }

    fn encode_element(&mut self, native: &[ColorRgba32]) -> Result<&[u8]> {
        check_native(BLANK_DIRECT_NAME, native, self.width, self.height)?;
        Ok(&[])
    }

    fn clone_codec(&self) -> Box<dyn DirectCodec> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_read_ignores_missing_file() {
        let codec = BlankIndexedCodec::default();
        let mut buffer = vec![1, 2, 3];
        codec.read_element(None, FileBitAddress::default(), &mut buffer).unwrap();
        assert!(buffer.is_empty());
        codec.write_element(None, FileBitAddress::default(), &[1]).unwrap();
    }

    #[test]
    fn test_blank_decodes_fill_index() {
        let mut codec = BlankIndexedCodec::new(2, 2).with_fill_index(3);
        assert_eq!(codec.decode_element(&[]).unwrap(), &[3, 3, 3, 3]);
        assert!(codec.encode_element(&[0, 0, 0, 0]).unwrap().is_empty());
        assert!(!codec.capabilities().contains(CodecCapabilities::READ_RAW));
    }

    #[test]
    fn test_blank_has_no_storage() {
        let indexed = BlankIndexedCodec::new(8, 8);
        assert_eq!((indexed.color_depth(), indexed.storage_size()), (0, 0));
        let direct = BlankDirectCodec::new(8, 8);
        assert_eq!((direct.color_depth(), direct.storage_size()), (0, 0));

        let red = ColorRgba32::opaque(255, 0, 0);
        let mut direct = BlankDirectCodec::new(1, 2).with_fill_color(red);
        assert_eq!(direct.decode_element(&[]).unwrap(), &[red, red]);
    }
}
