#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::too_many_lines,
    clippy::cast_lossless,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]
//! Tile graphics engine: bit level codecs, palettes, arrangers and the project resource tree.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub mod bit_stream;

mod error;
pub use error::*;

mod resource_ref;
pub use resource_ref::*;

mod colors;
pub use colors::*;

mod data_file;
pub use data_file::*;

mod palette;
pub use palette::*;

pub mod codec;
pub use codec::{CodecFactory, DefaultCodecFactory, ElementCodec, ImageLayout, PixelColorType};

mod arranger;
pub use arranger::*;

mod image;
pub use image::*;

pub mod project;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn area(self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(usize, usize)> for Size {
    fn from((width, height): (usize, usize)) -> Self {
        Self { width, height }
    }
}
