//! Plain data records a project is built from.
//!
//! Every record names its parent by path key; an empty key is the project root. The records are
//! serde types so front ends can read them from any format.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ColorModel, FileBitAddress, ImageLayout, PaletteStorageSource, PixelColorType, Size};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageProjectModel {
    pub name: String,
    /// Base directory for data file locations and descriptor files.
    #[serde(default)]
    pub root: PathBuf,
    #[serde(default)]
    pub folders: Vec<ResourceFolderModel>,
    #[serde(default)]
    pub data_files: Vec<DataFileModel>,
    #[serde(default)]
    pub palettes: Vec<PaletteModel>,
    #[serde(default)]
    pub arrangers: Vec<ArrangerModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceFolderModel {
    pub name: String,
    #[serde(default)]
    pub parent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFileModel {
    pub name: String,
    #[serde(default)]
    pub parent: String,
    /// Relative paths are resolved against the project root.
    pub location: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaletteModel {
    pub name: String,
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub color_model: ColorModel,
    #[serde(default)]
    pub storage_source: PaletteStorageSource,
    /// Path key of the backing data file.
    #[serde(default)]
    pub data_file: String,
    #[serde(default)]
    pub address: FileBitAddress,
    #[serde(default)]
    pub entries: usize,
    #[serde(default)]
    pub zero_index_transparent: bool,
    /// `#rrggbb` or `#rrggbbaa` colors of an inline palette.
    #[serde(default)]
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrangerModel {
    pub name: String,
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub color_type: PixelColorType,
    #[serde(default)]
    pub layout: ImageLayout,
    /// Grid dimensions in elements.
    pub grid_size: Size,
    /// Element dimensions in pixels.
    pub element_size: Size,
    /// Assigned cells. Cells without a record stay empty.
    #[serde(default)]
    pub elements: Vec<ArrangerElementModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrangerElementModel {
    pub x: usize,
    pub y: usize,
    pub codec: String,
    #[serde(default)]
    pub data_file: String,
    #[serde(default)]
    pub address: FileBitAddress,
    /// Path key of the palette. Empty selects the default palette.
    #[serde(default)]
    pub palette: String,
}
