//! Indexed color palettes.
//!
//! A palette is either stored inside a data file (typically a ROM) or carried inline by the
//! project. File backed palettes load lazily: entries are only read on the first indexed
//! access and re-read after the tree reports a change of the backing file.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ColorModel, ColorRgba32, DataFileRef, EngineError, FileBitAddress, ResourceId, ResourceRef, Result};

/// Largest palette addressable by an 8 bit index.
pub const MAX_PALETTE_ENTRIES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaletteStorageSource {
    #[default]
    DataFile,
    /// Colors are stored with the project definition itself.
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteState {
    /// Entries have not been read yet.
    Unloaded,
    Loaded,
    /// The backing data file changed or went away since the entries were read.
    Stale,
}

pub struct Palette {
    name: String,
    color_model: ColorModel,
    data_file: Option<DataFileRef>,
    address: FileBitAddress,
    entries: usize,
    zero_index_transparent: bool,
    storage_source: PaletteStorageSource,
    state: PaletteState,
    colors: Vec<ColorRgba32>,
    reverse: HashMap<ColorRgba32, u8>,
    /// Stored alpha of entry 0 before transparency was applied.
    zero_alpha: u8,
}

pub type PaletteRef = ResourceRef<Palette>;

fn check_entries(name: &str, entries: usize) -> Result<()> {
    if entries > MAX_PALETTE_ENTRIES {
        return Err(EngineError::TooManyPaletteEntries {
            palette: name.to_string(),
            entries,
        });
    }
    Ok(())
}

impl Palette {
    /// Creates an unloaded, file backed palette. Bind the data file with [`Palette::lazy_load_palette`].
    pub fn new(name: impl Into<String>, color_model: ColorModel, address: FileBitAddress, entries: usize, zero_index_transparent: bool) -> Result<Self> {
        let name = name.into();
        check_entries(&name, entries)?;
        Ok(Self {
            name,
            color_model,
            data_file: None,
            address,
            entries,
            zero_index_transparent,
            storage_source: PaletteStorageSource::DataFile,
            state: PaletteState::Unloaded,
            colors: Vec::new(),
            reverse: HashMap::new(),
            zero_alpha: 255,
        })
    }

    /// Creates a loaded palette whose colors are carried inline.
    pub fn from_colors(name: impl Into<String>, colors: Vec<ColorRgba32>, zero_index_transparent: bool) -> Result<Self> {
        let name = name.into();
        check_entries(&name, colors.len())?;
        let mut palette = Self {
            name,
            color_model: ColorModel::Rgba32,
            data_file: None,
            address: FileBitAddress::default(),
            entries: colors.len(),
            zero_index_transparent,
            storage_source: PaletteStorageSource::Inline,
            state: PaletteState::Loaded,
            colors,
            reverse: HashMap::new(),
            zero_alpha: 255,
        };
        palette.apply_transparency();
        palette.rebuild_reverse();
        Ok(palette)
    }

    pub fn into_ref(self) -> PaletteRef {
        ResourceRef::new(self)
    }

    /// Binds the palette to `data_file`. Entries are read on the first indexed access.
    pub fn lazy_load_palette(
        &mut self,
        data_file: DataFileRef,
        address: FileBitAddress,
        color_model: ColorModel,
        zero_index_transparent: bool,
        entries: usize,
    ) -> Result<()> {
        check_entries(&self.name, entries)?;
        self.data_file = Some(data_file);
        self.address = address;
        self.color_model = color_model;
        self.zero_index_transparent = zero_index_transparent;
        self.entries = entries;
        self.storage_source = PaletteStorageSource::DataFile;
        self.state = PaletteState::Unloaded;
        self.colors.clear();
        self.reverse.clear();
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn color_model(&self) -> ColorModel {
        self.color_model
    }

    pub fn address(&self) -> FileBitAddress {
        self.address
    }

    pub fn zero_index_transparent(&self) -> bool {
        self.zero_index_transparent
    }

    pub fn storage_source(&self) -> PaletteStorageSource {
        self.storage_source
    }

    pub fn state(&self) -> PaletteState {
        self.state
    }

    pub fn data_file(&self) -> Option<&DataFileRef> {
        self.data_file.as_ref()
    }

    pub fn linked_resources(&self) -> Vec<ResourceId> {
        self.data_file.iter().map(|df| df.id()).collect()
    }

    /// Drops the link to `id` if it is the backing data file. The palette becomes stale.
    pub fn unlink_resource(&mut self, id: ResourceId) -> bool {
        if self.data_file.as_ref().is_some_and(|df| df.id() == id) {
            self.data_file = None;
            self.mark_stale();
            return true;
        }
        false
    }

    /// Called when the backing file changed; the next access re-reads the entries.
    pub fn mark_stale(&mut self) {
        if self.storage_source == PaletteStorageSource::DataFile && self.state == PaletteState::Loaded {
            self.state = PaletteState::Stale;
        }
    }

    /// Makes sure the entries are loaded, reading them from the data file if needed.
    pub fn load(&mut self) -> Result<()> {
        if self.state == PaletteState::Loaded {
            return Ok(());
        }
        let Some(data_file) = &self.data_file else {
            return Err(EngineError::PaletteWithoutDataFile { palette: self.name.clone() });
        };

        let size = self.color_model.size_bytes();
        let mut raw = vec![0u8; self.entries * size];
        data_file.lock().read_bits(self.address, raw.len() * 8, &mut raw)?;

        self.colors = raw.chunks_exact(size).map(|chunk| self.color_model.decode_color(chunk)).collect();
        self.apply_transparency();
        self.rebuild_reverse();
        if self.state == PaletteState::Stale {
            log::debug!("Reloaded stale palette '{}'", self.name);
        }
        self.state = PaletteState::Loaded;
        Ok(())
    }

    fn apply_transparency(&mut self) {
        if self.zero_index_transparent {
            if let Some(first) = self.colors.first_mut() {
                if first.a != 0 {
                    self.zero_alpha = first.a;
                }
                first.a = 0;
            }
        }
    }

    fn rebuild_reverse(&mut self) {
        self.reverse.clear();
        for (i, color) in self.colors.iter().enumerate() {
            self.reverse.entry(*color).or_insert(i as u8);
        }
    }

    pub fn colors(&mut self) -> Result<&[ColorRgba32]> {
        self.load()?;
        Ok(&self.colors)
    }

    pub fn get(&mut self, index: usize) -> Result<ColorRgba32> {
        self.load()?;
        self.colors.get(index).copied().ok_or_else(|| EngineError::PaletteIndexOutOfRange {
            palette: self.name.clone(),
            index,
            entries: self.entries,
        })
    }

    /// Returns the index of `color`.
    ///
    /// With `exact_match_required` a missing color is an error, otherwise the nearest entry is
    /// returned. A fully transparent color maps to index 0 on palettes with a transparent zero index.
    pub fn get_index_by_native_color(&mut self, color: ColorRgba32, exact_match_required: bool) -> Result<u8> {
        self.load()?;
        if let Some(index) = self.reverse.get(&color) {
            return Ok(*index);
        }
        if self.zero_index_transparent && color.a == 0 && !self.colors.is_empty() {
            return Ok(0);
        }
        if exact_match_required || self.colors.is_empty() {
            return Err(EngineError::ColorNotInPalette {
                palette: self.name.clone(),
                color: color.to_string(),
            });
        }

        let nearest = self
            .colors
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| c.distance_sq(color))
            .map_or(0, |(i, _)| i);
        Ok(nearest as u8)
    }

    /// Existence probe that never fails; unloadable palettes contain nothing.
    pub fn contains_native_color(&mut self, color: ColorRgba32) -> bool {
        if self.load().is_err() {
            return false;
        }
        self.reverse.contains_key(&color) || (self.zero_index_transparent && color.a == 0 && !self.colors.is_empty())
    }

    /// Replaces an entry. File backed palettes store the color at the precision of their color model.
    pub fn set_native_color(&mut self, index: usize, color: ColorRgba32) -> Result<()> {
        self.load()?;
        if index >= self.colors.len() {
            return Err(EngineError::PaletteIndexOutOfRange {
                palette: self.name.clone(),
                index,
                entries: self.entries,
            });
        }
        let color = match self.storage_source {
            PaletteStorageSource::DataFile => self.color_model.quantize(color),
            PaletteStorageSource::Inline => color,
        };
        self.colors[index] = color;
        self.apply_transparency();
        self.rebuild_reverse();
        Ok(())
    }

    /// Writes all entries back to the data file. Inline palettes have nothing to write.
    pub fn save_palette(&mut self) -> Result<()> {
        if self.storage_source == PaletteStorageSource::Inline {
            return Ok(());
        }
        self.load()?;
        let Some(data_file) = &self.data_file else {
            return Err(EngineError::PaletteWithoutDataFile { palette: self.name.clone() });
        };

        let size = self.color_model.size_bytes();
        let mut raw = vec![0u8; self.colors.len() * size];
        for (i, (color, chunk)) in self.colors.iter().zip(raw.chunks_exact_mut(size)).enumerate() {
            let mut color = *color;
            if i == 0 && self.zero_index_transparent {
                color.a = self.zero_alpha;
            }
            self.color_model.encode_color(color, chunk);
        }
        let mut df = data_file.lock();
        df.write_bits(self.address, raw.len() * 8, &raw)?;
        df.flush()
    }
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Palette")
            .field("name", &self.name)
            .field("color_model", &self.color_model)
            .field("entries", &self.entries)
            .field("state", &self.state)
            .finish()
    }
}
