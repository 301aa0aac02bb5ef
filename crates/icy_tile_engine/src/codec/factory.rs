use super::{
    builtin_bitplane_formats, builtin_packed_formats, BitplaneCodec, BitplaneFormat, BlankDirectCodec, BlankIndexedCodec, ElementCodec, LinearDirectCodec,
    PackedFormat, PackedIndexedCodec, BLANK_DIRECT_NAME, BLANK_INDEXED_NAME,
};
use crate::{EngineError, Result, Size};

/// Resolves a codec by name for a requested element size.
pub trait CodecFactory: Send + Sync {
    fn get_codec(&self, name: &str, size: Size) -> Result<ElementCodec>;

    fn codec_names(&self) -> Vec<String>;
}

/// Knows every built in codec. Names are matched case insensitively.
#[derive(Debug, Clone)]
pub struct DefaultCodecFactory {
    bitplane_formats: Vec<BitplaneFormat>,
    packed_formats: Vec<PackedFormat>,
}

impl Default for DefaultCodecFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCodecFactory {
    pub fn new() -> Self {
        Self {
            bitplane_formats: builtin_bitplane_formats(),
            packed_formats: builtin_packed_formats(),
        }
    }

    /// Adds a bitplane format. A format with the same name replaces the existing one.
    pub fn register_bitplane_format(&mut self, format: BitplaneFormat) -> Result<()> {
        format.validate()?;
        log::debug!("registering bitplane format '{}' ({} planes)", format.name, format.color_depth());
        self.bitplane_formats.retain(|f| !f.name.eq_ignore_ascii_case(&format.name));
        self.bitplane_formats.push(format);
        Ok(())
    }

    /// Native element size of codec `name`. Codecs without one report 8x8.
    pub fn default_size(&self, name: &str) -> Option<Size> {
        if let Some(format) = self.bitplane_formats.iter().find(|f| f.name.eq_ignore_ascii_case(name)) {
            return Some(Size::new(format.width, format.height));
        }
        if let Some(format) = self.packed_formats.iter().find(|f| f.name.eq_ignore_ascii_case(name)) {
            return Some(Size::new(format.default_width, format.default_height));
        }
        self.codec_names().iter().any(|n| n.eq_ignore_ascii_case(name)).then_some(Size::new(8, 8))
    }
}

impl CodecFactory for DefaultCodecFactory {
    fn get_codec(&self, name: &str, size: Size) -> Result<ElementCodec> {
        if let Some(format) = self.bitplane_formats.iter().find(|f| f.name.eq_ignore_ascii_case(name)) {
            if size.width != format.width || size.height != format.height {
                return Err(EngineError::InvalidCodecSize {
                    codec: format.name.clone(),
                    width: size.width,
                    height: size.height,
                    width_increment: format.width,
                    height_increment: format.height,
                });
            }
            return Ok(ElementCodec::Indexed(Box::new(BitplaneCodec::new(format.clone())?)));
        }

        if let Some(format) = self.packed_formats.iter().find(|f| f.name.eq_ignore_ascii_case(name)) {
            return Ok(ElementCodec::Indexed(Box::new(PackedIndexedCodec::with_size(format.clone(), size.width, size.height)?)));
        }

        match name.to_ascii_uppercase().as_str() {
            "RGBA32" => Ok(ElementCodec::Direct(Box::new(LinearDirectCodec::rgba32(size.width, size.height)?))),
            "BGR15" => Ok(ElementCodec::Direct(Box::new(LinearDirectCodec::bgr15(size.width, size.height)?))),
            "BLANK INDEXED" => Ok(ElementCodec::Indexed(Box::new(BlankIndexedCodec::new(size.width, size.height)))),
            "BLANK DIRECT" => Ok(ElementCodec::Direct(Box::new(BlankDirectCodec::new(size.width, size.height)))),
            _ => Err(EngineError::UnknownCodec { name: name.to_string() }),
        }
    }

    fn codec_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bitplane_formats.iter().map(|f| f.name.clone()).collect();
        names.extend(self.packed_formats.iter().map(|f| f.name.clone()));
        names.extend(["RGBA32", "BGR15", BLANK_INDEXED_NAME, BLANK_DIRECT_NAME].into_iter().map(String::from));
        names
    }
}
