use std::fmt::Display;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

/// Native color used by palettes and direct-color images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorRgba32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Display for ColorRgba32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl ColorRgba32 {
    pub const TRANSPARENT: ColorRgba32 = ColorRgba32::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Squared euclidean distance over all four channels.
    pub fn distance_sq(self, other: ColorRgba32) -> u32 {
        let d = |a: u8, b: u8| {
            let v = a as i32 - b as i32;
            (v * v) as u32
        };
        d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b) + d(self.a, other.a)
    }

    /// Parses `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let parse = |i: usize| {
            digits
                .get(i..i + 2)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| EngineError::resolution(format!("Invalid hex color: {hex}")))
        };
        match digits.len() {
            6 => Ok(Self::opaque(parse(0)?, parse(2)?, parse(4)?)),
            8 => Ok(Self::new(parse(0)?, parse(2)?, parse(4)?, parse(6)?)),
            _ => Err(EngineError::resolution(format!("Invalid hex color: {hex}"))),
        }
    }
}

impl From<(u8, u8, u8)> for ColorRgba32 {
    fn from(value: (u8, u8, u8)) -> Self {
        ColorRgba32::opaque(value.0, value.1, value.2)
    }
}

impl From<[u8; 4]> for ColorRgba32 {
    fn from(value: [u8; 4]) -> Self {
        ColorRgba32::new(value[0], value[1], value[2], value[3])
    }
}

impl From<ColorRgba32> for [u8; 4] {
    fn from(value: ColorRgba32) -> [u8; 4] {
        [value.r, value.g, value.b, value.a]
    }
}

/// Foreign (on-disk) color encodings a palette can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorModel {
    #[default]
    Rgba32,
    Rgb24,
    /// 15 bit color, red in the low bits (SNES, GBA)
    Bgr15,
    /// 15 bit color, blue in the low bits
    Rgb15,
    /// 16 bit color with a 1 bit alpha in the top bit
    Abgr16,
}

/// Expands a 5 bit channel to 8 bits.
fn expand5(v: u32) -> u8 {
    let v = (v & 0x1F) as u8;
    (v << 3) | (v >> 2)
}

impl ColorModel {
    pub fn size_bytes(self) -> usize {
        match self {
            ColorModel::Rgba32 => 4,
            ColorModel::Rgb24 => 3,
            ColorModel::Bgr15 | ColorModel::Rgb15 | ColorModel::Abgr16 => 2,
        }
    }

    /// Decodes one color from the first `size_bytes()` bytes of `bytes` (little endian).
    pub fn decode_color(self, bytes: &[u8]) -> ColorRgba32 {
        match self {
            ColorModel::Rgba32 => ColorRgba32::new(bytes[0], bytes[1], bytes[2], bytes[3]),
            ColorModel::Rgb24 => ColorRgba32::opaque(bytes[0], bytes[1], bytes[2]),
            ColorModel::Bgr15 => {
                let v = LittleEndian::read_u16(bytes) as u32;
                ColorRgba32::opaque(expand5(v), expand5(v >> 5), expand5(v >> 10))
            }
            ColorModel::Rgb15 => {
                let v = LittleEndian::read_u16(bytes) as u32;
                ColorRgba32::opaque(expand5(v >> 10), expand5(v >> 5), expand5(v))
            }
            ColorModel::Abgr16 => {
                let v = LittleEndian::read_u16(bytes) as u32;
                let a = if v & 0x8000 != 0 { 255 } else { 0 };
                ColorRgba32::new(expand5(v), expand5(v >> 5), expand5(v >> 10), a)
            }
        }
    }

    /// Encodes `color` into the first `size_bytes()` bytes of `dest` (little endian).
    pub fn encode_color(self, color: ColorRgba32, dest: &mut [u8]) {
        let c5 = |v: u8| (v >> 3) as u16;
        match self {
            ColorModel::Rgba32 => dest[..4].copy_from_slice(&[color.r, color.g, color.b, color.a]),
            ColorModel::Rgb24 => dest[..3].copy_from_slice(&[color.r, color.g, color.b]),
            ColorModel::Bgr15 => LittleEndian::write_u16(dest, c5(color.r) | (c5(color.g) << 5) | (c5(color.b) << 10)),
            ColorModel::Rgb15 => LittleEndian::write_u16(dest, c5(color.b) | (c5(color.g) << 5) | (c5(color.r) << 10)),
            ColorModel::Abgr16 => {
                let a = if color.a >= 128 { 0x8000 } else { 0 };
                LittleEndian::write_u16(dest, c5(color.r) | (c5(color.g) << 5) | (c5(color.b) << 10) | a);
            }
        }
    }

    /// Reduces `color` to the precision this model can store.
    pub fn quantize(self, color: ColorRgba32) -> ColorRgba32 {
        let mut buf = [0u8; 4];
        self.encode_color(color, &mut buf);
        self.decode_color(&buf)
    }
}
