//! Packed pixel codecs: 4 or 8 bits per pixel stored row major with no plane structure.

use serde::{Deserialize, Serialize};

use super::{check_encoded, check_indices, check_native, check_resize, CodecBuffers, GraphicsCodec, ImageLayout, IndexedCodec, PixelColorType};
use crate::{
    bit_stream::{BitReader, BitWriter},
    EngineError, Result,
};

/// Which nibble of a byte holds the left pixel of a 4 bit pair.
///
/// This is part of the format: decoding with the wrong order swaps every pixel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NibbleOrder {
    LowFirst,
    HighFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedFormat {
    pub name: String,
    /// 4 or 8
    pub bits_per_pixel: usize,
    pub nibble_order: NibbleOrder,
    pub layout: ImageLayout,
    pub default_width: usize,
    pub default_height: usize,
    pub width_increment: usize,
    pub height_increment: usize,
    pub resizable: bool,
}

pub fn builtin_packed_formats() -> Vec<PackedFormat> {
    vec![
        PackedFormat {
            name: "PSX 4bpp".into(),
            bits_per_pixel: 4,
            nibble_order: NibbleOrder::LowFirst,
            layout: ImageLayout::Single,
            default_width: 64,
            default_height: 64,
            width_increment: 2,
            height_increment: 1,
            resizable: true,
        },
        PackedFormat {
            name: "PSX 8bpp".into(),
            bits_per_pixel: 8,
            nibble_order: NibbleOrder::HighFirst,
            layout: ImageLayout::Single,
            default_width: 64,
            default_height: 64,
            width_increment: 1,
            height_increment: 1,
            resizable: true,
        },
        PackedFormat {
            name: "GBA 4bpp".into(),
            bits_per_pixel: 4,
            nibble_order: NibbleOrder::LowFirst,
            layout: ImageLayout::Tiled,
            default_width: 8,
            default_height: 8,
            width_increment: 8,
            height_increment: 8,
            resizable: false,
        },
        PackedFormat {
            name: "GBA 8bpp".into(),
            bits_per_pixel: 8,
            nibble_order: NibbleOrder::HighFirst,
            layout: ImageLayout::Tiled,
            default_width: 8,
            default_height: 8,
            width_increment: 8,
            height_increment: 8,
            resizable: false,
        },
        PackedFormat {
            name: "Genesis 4bpp".into(),
            bits_per_pixel: 4,
            nibble_order: NibbleOrder::HighFirst,
            layout: ImageLayout::Tiled,
            default_width: 8,
            default_height: 8,
            width_increment: 8,
            height_increment: 8,
            resizable: false,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct PackedIndexedCodec {
    format: PackedFormat,
    width: usize,
    height: usize,
    buffers: CodecBuffers<u8>,
}

impl PackedIndexedCodec {
    pub fn new(format: PackedFormat) -> Result<Self> {
        let (width, height) = (format.default_width, format.default_height);
        Self::with_size(format, width, height)
    }

    pub fn with_size(format: PackedFormat, width: usize, height: usize) -> Result<Self> {
        if format.bits_per_pixel != 4 && format.bits_per_pixel != 8 {
            return Err(EngineError::resolution(format!(
                "Packed format '{}' uses {} bits per pixel, expected 4 or 8",
                format.name, format.bits_per_pixel
            )));
        }
        let codec = Self {
            format,
            width,
            height,
            buffers: CodecBuffers::default(),
        };
        let size_ok = width > 0 && height > 0 && width % codec.format.width_increment == 0 && height % codec.format.height_increment == 0;
        let fixed_ok = codec.format.resizable || (width == codec.format.default_width && height == codec.format.default_height);
        if !size_ok || !fixed_ok {
            return Err(EngineError::InvalidCodecSize {
                codec: codec.format.name.clone(),
                width,
                height,
                width_increment: codec.format.width_increment,
                height_increment: codec.format.height_increment,
            });
        }
        Ok(codec)
    }

    pub fn format(&self) -> &PackedFormat {
        &self.format
    }
}

impl GraphicsCodec for PackedIndexedCodec {
    fn name(&self) -> &str {
        &self.format.name
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn layout(&self) -> ImageLayout {
        self.format.layout
    }

    fn color_type(&self) -> PixelColorType {
        PixelColorType::Indexed
    }

    fn color_depth(&self) -> usize {
        self.format.bits_per_pixel
    }

    fn default_width(&self) -> usize {
        self.format.default_width
    }

    fn default_height(&self) -> usize {
        self.format.default_height
    }

    fn width_resize_increment(&self) -> usize {
        self.format.width_increment
    }

    fn height_resize_increment(&self) -> usize {
        self.format.height_increment
    }

    fn can_resize(&self) -> bool {
        self.format.resizable
    }

    fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        check_resize(&*self, width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }
}

impl IndexedCodec for PackedIndexedCodec {
    fn decode_element(&mut self, encoded: &[u8]) -> Result<&[u8]> {
        let storage = self.storage_size();
        check_encoded(&self.format.name, encoded, storage)?;
        self.buffers.ensure(self.width * self.height, storage);

        let mut reader = BitReader::open(encoded, storage)?;
        if self.format.bits_per_pixel == 8 {
            for pixel in self.buffers.native.iter_mut() {
                *pixel = reader.read_byte()?;
            }
            return Ok(&self.buffers.native);
        }

        for pair in self.buffers.native.chunks_exact_mut(2) {
            let high = reader.read_bits(4)? as u8;
            let low = reader.read_bits(4)? as u8;
            match self.format.nibble_order {
                NibbleOrder::LowFirst => {
                    pair[0] = low;
                    pair[1] = high;
                }
                NibbleOrder::HighFirst => {
                    pair[0] = high;
                    pair[1] = low;
                }
            }
        }
        Ok(&self.buffers.native)
    }

    fn encode_element(&mut self, native: &[u8]) -> Result<&[u8]> {
        check_native(&self.format.name, native, self.width, self.height)?;
        check_indices(&self.format.name, native, self.color_depth())?;
        let storage = self.storage_size();
        self.buffers.ensure(self.width * self.height, storage);
        self.buffers.foreign.fill(0);

        let mut writer = BitWriter::open(&mut self.buffers.foreign, storage)?;
        if self.format.bits_per_pixel == 8 {
            for index in native {
                writer.write_byte(*index)?;
            }
            return Ok(&self.buffers.foreign);
        }

        for pair in native.chunks_exact(2) {
            let (high, low) = match self.format.nibble_order {
                NibbleOrder::LowFirst => (pair[1], pair[0]),
                NibbleOrder::HighFirst => (pair[0], pair[1]),
            };
            writer.write_bits(high as u32, 4)?;
            writer.write_bits(low as u32, 4)?;
        }
        Ok(&self.buffers.foreign)
    }

    fn clone_codec(&self) -> Box<dyn IndexedCodec> {
        Box::new(self.clone())
    }
}
