//! Linear direct color codecs.
//!
//! Each pixel is one fixed width color in a [`ColorModel`], so a pixel can also be read or
//! written in place against the data file without going through the element buffers.

use super::{check_encoded, check_native, check_resize, CodecBuffers, DirectCodec, GraphicsCodec, ImageLayout, PixelColorType};
use crate::{ColorModel, ColorRgba32, DataFileRef, EngineError, FileBitAddress, Result};

#[derive(Debug, Clone)]
pub struct LinearDirectCodec {
    name: String,
    model: ColorModel,
    width: usize,
    height: usize,
    buffers: CodecBuffers<ColorRgba32>,
}

impl LinearDirectCodec {
    pub fn new(name: impl Into<String>, model: ColorModel, width: usize, height: usize) -> Result<Self> {
        let name = name.into();
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidCodecSize {
                codec: name,
                width,
                height,
                width_increment: 1,
                height_increment: 1,
            });
        }
        Ok(Self {
            name,
            model,
            width,
            height,
            buffers: CodecBuffers::default(),
        })
    }

    pub fn rgba32(width: usize, height: usize) -> Result<Self> {
        Self::new("RGBA32", ColorModel::Rgba32, width, height)
    }

    pub fn bgr15(width: usize, height: usize) -> Result<Self> {
        Self::new("BGR15", ColorModel::Bgr15, width, height)
    }

    pub fn color_model(&self) -> ColorModel {
        self.model
    }

    fn pixel_address(&self, element_address: FileBitAddress, x: usize, y: usize) -> Result<FileBitAddress> {
        if x >= self.width || y >= self.height {
            return Err(EngineError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        let offset = ((y * self.width + x) * self.model.size_bytes() * 8) as i64;
        Ok(element_address.offset_by(offset))
    }

    /// Reads a single pixel of the element at `element_address` straight from the file.
    pub fn read_pixel(&self, data_file: &DataFileRef, element_address: FileBitAddress, x: usize, y: usize) -> Result<ColorRgba32> {
        let address = self.pixel_address(element_address, x, y)?;
        let mut bytes = [0u8; 4];
        let size = self.model.size_bytes();
        data_file.lock().read_bits(address, size * 8, &mut bytes[..size])?;
        Ok(self.model.decode_color(&bytes))
    }

    /// Writes a single pixel in place. The caller flushes the file.
    pub fn write_pixel(&self, data_file: &DataFileRef, element_address: FileBitAddress, x: usize, y: usize, color: ColorRgba32) -> Result<()> {
        let address = self.pixel_address(element_address, x, y)?;
        let mut bytes = [0u8; 4];
        let size = self.model.size_bytes();
        self.model.encode_color(color, &mut bytes);
        data_file.lock().write_bits(address, size * 8, &bytes[..size])
    }
}

impl GraphicsCodec for LinearDirectCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn layout(&self) -> ImageLayout {
        ImageLayout::Linear
    }

    fn color_type(&self) -> PixelColorType {
        PixelColorType::Direct
    }

    fn color_depth(&self) -> usize {
        self.model.size_bytes() * 8
    }

    fn can_resize(&self) -> bool {
        true
    }

    fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        check_resize(&*self, width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }
}

impl DirectCodec for LinearDirectCodec {
    fn decode_element(&mut self, encoded: &[u8]) -> Result<&[ColorRgba32]> {
        let storage = self.storage_size();
        check_encoded(&self.name, encoded, storage)?;
        self.buffers.ensure(self.width * self.height, storage);

        let size = self.model.size_bytes();
        for (pixel, bytes) in self.buffers.native.iter_mut().zip(encoded.chunks_exact(size)) {
            *pixel = self.model.decode_color(bytes);
        }
        Ok(&self.buffers.native)
    }

    fn encode_element(&mut self, native: &[ColorRgba32]) -> Result<&[u8]> {
        check_native(&self.name, native, self.width, self.height)?;
        let storage = self.storage_size();
        self.buffers.ensure(self.width * self.height, storage);

        let size = self.model.size_bytes();
        for (color, bytes) in native.iter().zip(self.buffers.foreign.chunks_exact_mut(size)) {
            self.model.encode_color(*color, bytes);
        }
        Ok(&self.buffers.foreign)
    }

    fn clone_codec(&self) -> Box<dyn DirectCodec> {
        Box::new(self.clone())
    }
}
