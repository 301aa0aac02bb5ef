//! Table driven planar codecs.
//!
//! A planar format stores each bit of a pixel index in a separate plane. The planes of the
//! supported console formats only differ in where each plane row starts, so a format is fully
//! described by one [`PlaneDescriptor`] per index bit.

use serde::{Deserialize, Serialize};

use super::{check_encoded, check_indices, check_native, CodecBuffers, GraphicsCodec, ImageLayout, IndexedCodec, PixelColorType};
use crate::{
    bit_stream::{BitReader, BitWriter},
    EngineError, Result,
};

/// Location of one bitplane inside an encoded element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneDescriptor {
    /// Byte offset of the first row of this plane.
    pub byte_offset: usize,
    /// Distance in bytes between the starts of two consecutive rows.
    pub row_stride: usize,
    /// Bit of the final palette index this plane contributes.
    pub merge_bit: u8,
}

impl PlaneDescriptor {
    pub const fn new(byte_offset: usize, row_stride: usize, merge_bit: u8) -> Self {
        Self {
            byte_offset,
            row_stride,
            merge_bit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitplaneFormat {
    pub name: String,
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub layout: ImageLayout,
    pub planes: Vec<PlaneDescriptor>,
}

impl BitplaneFormat {
    pub fn new(name: impl Into<String>, width: usize, height: usize, planes: Vec<PlaneDescriptor>) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            layout: ImageLayout::Tiled,
            planes,
        }
    }

    pub fn color_depth(&self) -> usize {
        self.planes.len()
    }

    pub fn storage_size(&self) -> usize {
        self.width * self.height * self.color_depth()
    }

    /// Checks that every plane row lies inside the storage size and every index bit is
    /// produced by exactly one plane.
    pub fn validate(&self) -> Result<()> {
        let depth = self.color_depth();
        if self.width == 0 || self.height == 0 || self.width % 8 != 0 {
            return Err(EngineError::invalid_dimensions(
                self.width,
                self.height,
                format!("bitplane format '{}' needs a positive width that is a multiple of 8", self.name),
            ));
        }
        if depth == 0 || depth > 8 {
            return Err(EngineError::resolution(format!("Bitplane format '{}' has {depth} planes, expected 1..=8", self.name)));
        }

        let mut seen = 0u16;
        let row_bytes = self.width / 8;
        let storage_bytes = self.storage_size() / 8;
        for plane in &self.planes {
            if plane.merge_bit as usize >= depth || seen & (1 << plane.merge_bit) != 0 {
                return Err(EngineError::resolution(format!(
                    "Bitplane format '{}' maps index bit {} more than once or out of range",
                    self.name, plane.merge_bit
                )));
            }
            seen |= 1 << plane.merge_bit;

            let last_row_end = plane.byte_offset + (self.height - 1) * plane.row_stride + row_bytes;
            if plane.row_stride < row_bytes || last_row_end > storage_bytes {
                return Err(EngineError::resolution(format!(
                    "Bitplane format '{}' has a plane exceeding the {storage_bytes} byte element",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Formats available out of the box.
pub fn builtin_bitplane_formats() -> Vec<BitplaneFormat> {
    let p = PlaneDescriptor::new;
    vec![
        BitplaneFormat::new("1bpp", 8, 8, vec![p(0, 1, 0)]),
        BitplaneFormat::new("NES 2bpp", 8, 8, vec![p(0, 1, 0), p(8, 1, 1)]),
        BitplaneFormat::new("SNES 2bpp", 8, 8, vec![p(0, 2, 0), p(1, 2, 1)]),
        BitplaneFormat::new("SNES 3bpp", 8, 8, vec![p(0, 2, 0), p(1, 2, 1), p(16, 1, 2)]),
        BitplaneFormat::new("SNES 4bpp", 8, 8, vec![p(0, 2, 0), p(1, 2, 1), p(16, 2, 2), p(17, 2, 3)]),
        BitplaneFormat::new(
            "SNES 8bpp",
            8,
            8,
            vec![
                p(0, 2, 0),
                p(1, 2, 1),
                p(16, 2, 2),
                p(17, 2, 3),
                p(32, 2, 4),
                p(33, 2, 5),
                p(48, 2, 6),
                p(49, 2, 7),
            ],
        ),
        BitplaneFormat::new("SMS 4bpp", 8, 8, vec![p(0, 4, 0), p(1, 4, 1), p(2, 4, 2), p(3, 4, 3)]),
    ]
}

#[derive(Debug, Clone)]
pub struct BitplaneCodec {
    format: BitplaneFormat,
    buffers: CodecBuffers<u8>,
}

impl BitplaneCodec {
    pub fn new(format: BitplaneFormat) -> Result<Self> {
        format.validate()?;
        Ok(Self {
            format,
            buffers: CodecBuffers::default(),
        })
    }

    pub fn format(&self) -> &BitplaneFormat {
        &self.format
    }
}

impl GraphicsCodec for BitplaneCodec {
    fn name(&self) -> &str {
        &self.format.name
    }

    fn width(&self) -> usize {
        self.format.width
    }

    fn height(&self) -> usize {
        self.format.height
    }

    fn layout(&self) -> ImageLayout {
        self.format.layout
    }

    fn color_type(&self) -> PixelColorType {
        PixelColorType::Indexed
    }

    fn color_depth(&self) -> usize {
        self.format.color_depth()
    }
}

impl IndexedCodec for BitplaneCodec {
    fn decode_element(&mut self, encoded: &[u8]) -> Result<&[u8]> {
        let storage = self.storage_size();
        check_encoded(&self.format.name, encoded, storage)?;
        let (width, height) = (self.format.width, self.format.height);
        self.buffers.ensure(width * height, storage);
        self.buffers.native.fill(0);

        let mut reader = BitReader::open(encoded, storage)?;
        // one pass per plane, merged into the index buffer as it goes
        for plane in &self.format.planes {
            for y in 0..height {
                reader.seek_absolute((plane.byte_offset + y * plane.row_stride) * 8)?;
                let row = &mut self.buffers.native[y * width..(y + 1) * width];
                for pixel in row.iter_mut() {
                    *pixel |= (reader.read_bits(1)? as u8) << plane.merge_bit;
                }
            }
        }
        Ok(&self.buffers.native)
    }

    fn encode_element(&mut self, native: &[u8]) -> Result<&[u8]> {
        let (width, height) = (self.format.width, self.format.height);
        check_native(&self.format.name, native, width, height)?;
        check_indices(&self.format.name, native, self.color_depth())?;
        let storage = self.storage_size();
        self.buffers.ensure(width * height, storage);
        self.buffers.foreign.fill(0);

        let mut writer = BitWriter::open(&mut self.buffers.foreign, storage)?;
        for plane in &self.format.planes {
            for y in 0..height {
                writer.seek_absolute((plane.byte_offset + y * plane.row_stride) * 8)?;
                for index in &native[y * width..(y + 1) * width] {
                    writer.write_bits(((index >> plane.merge_bit) & 1) as u32, 1)?;
                }
            }
        }
        Ok(&self.buffers.foreign)
    }

    fn clone_codec(&self) -> Box<dyn IndexedCodec> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_formats_are_valid() {
        for format in builtin_bitplane_formats() {
            format.validate().unwrap_or_else(|e| panic!("{}: {e}", format.name));
        }
    }

    #[test]
    fn test_overlapping_merge_bits_rejected() {
        let format = BitplaneFormat::new("bad", 8, 8, vec![PlaneDescriptor::new(0, 2, 0), PlaneDescriptor::new(1, 2, 0)]);
        assert!(format.validate().is_err());
    }

    #[test]
    fn test_plane_outside_element_rejected() {
        let format = BitplaneFormat::new("bad", 8, 8, vec![PlaneDescriptor::new(4, 1, 0)]);
        assert!(format.validate().is_err());
    }
}
