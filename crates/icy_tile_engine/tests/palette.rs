mod common;

use common::gray_palette;
use icy_tile_engine::{ColorModel, ColorRgba32, DataFile, DataFileRef, EngineError, FileBitAddress, Palette, PaletteState};
use pretty_assertions::assert_eq;

/// 8 RGBA32 entries starting at byte 4.
fn palette_file() -> DataFileRef {
    let mut bytes = vec![0xEE; 4];
    for i in 0..8u8 {
        bytes.extend_from_slice(&[i * 30, 255 - i * 30, i, 0xFF]);
    }
    DataFile::from_bytes("pal.bin", bytes).into_ref()
}

fn file_palette(df: &DataFileRef) -> Palette {
    let mut palette = Palette::new("Sprites", ColorModel::Rgba32, FileBitAddress::default(), 0, false).unwrap();
    palette
        .lazy_load_palette(df.clone(), FileBitAddress::new(4, 0), ColorModel::Rgba32, true, 8)
        .unwrap();
    palette
}

#[test]
fn exact_lookup_round_trips_every_index() {
    let palette = gray_palette();
    let mut palette = palette.lock();
    for index in 0..16 {
        let color = palette.get(index).unwrap();
        assert_eq!(palette.get_index_by_native_color(color, true).unwrap() as usize, index);
    }
}

#[test]
fn missing_color_lookup() {
    let palette = gray_palette();
    let mut palette = palette.lock();
    let missing = ColorRgba32::opaque(33, 30, 31);

    assert!(!palette.contains_native_color(missing));
    assert!(matches!(
        palette.get_index_by_native_color(missing, true),
        Err(EngineError::ColorNotInPalette { .. })
    ));
    assert_eq!(palette.get_index_by_native_color(missing, false).unwrap(), 2);
    // any fully transparent color maps to the transparent entry
    assert_eq!(palette.get_index_by_native_color(ColorRgba32::new(9, 9, 9, 0), true).unwrap(), 0);
}

#[test]
fn lazy_palette_loads_on_first_access() {
    let df = palette_file();
    let mut palette = file_palette(&df);
    assert_eq!(palette.state(), PaletteState::Unloaded);

    assert_eq!(palette.get(2).unwrap(), ColorRgba32::opaque(60, 195, 2));
    assert_eq!(palette.state(), PaletteState::Loaded);
    assert_eq!(palette.get(0).unwrap().a, 0);
    assert!(matches!(palette.get(8), Err(EngineError::PaletteIndexOutOfRange { index: 8, .. })));
}

#[test]
fn stale_palette_reloads_from_file() {
    let df = palette_file();
    let mut palette = file_palette(&df);
    palette.load().unwrap();

    df.lock().write_bits(FileBitAddress::new(8, 0), 32, &[1, 2, 3, 4]).unwrap();
    assert_eq!(palette.get(1).unwrap(), ColorRgba32::opaque(30, 225, 1));

    palette.mark_stale();
    assert_eq!(palette.state(), PaletteState::Stale);
    assert_eq!(palette.get(1).unwrap(), ColorRgba32::new(1, 2, 3, 4));
    assert_eq!(palette.state(), PaletteState::Loaded);
}

#[test]
fn unlinked_palette_cannot_load() {
    let df = palette_file();
    let mut palette = file_palette(&df);
    palette.load().unwrap();

    assert!(palette.unlink_resource(df.id()));
    assert_eq!(palette.state(), PaletteState::Stale);
    assert!(palette.linked_resources().is_empty());
    assert!(matches!(palette.get(0), Err(EngineError::PaletteWithoutDataFile { .. })));
    assert!(!palette.contains_native_color(ColorRgba32::TRANSPARENT));
}

#[test]
fn save_palette_writes_entries() {
    let df = palette_file();
    let mut palette = file_palette(&df);
    palette.set_native_color(3, ColorRgba32::opaque(255, 0, 0)).unwrap();
    palette.save_palette().unwrap();

    let mut raw = [0u8; 36];
    df.lock().read_bits(FileBitAddress::default(), 36 * 8, &mut raw).unwrap();
    assert_eq!(&raw[..4], &[0xEE; 4]);
    // entry 0 keeps its stored alpha
    assert_eq!(&raw[4..8], &[0, 255, 0, 0xFF]);
    assert_eq!(&raw[16..20], &[255, 0, 0, 0xFF]);
}

#[test]
fn bgr15_palette_quantizes_colors() {
    let df = DataFile::from_bytes("snes.pal", vec![0; 8]).into_ref();
    let mut palette = Palette::new("Snes", ColorModel::Bgr15, FileBitAddress::default(), 4, false).unwrap();
    palette.lazy_load_palette(df.clone(), FileBitAddress::default(), ColorModel::Bgr15, false, 4).unwrap();

    palette.set_native_color(1, ColorRgba32::opaque(255, 0, 0)).unwrap();
    palette.save_palette().unwrap();

    let mut raw = [0u8; 4];
    df.lock().read_bits(FileBitAddress::default(), 32, &mut raw).unwrap();
    assert_eq!(&raw[2..4], &[0x1F, 0x00]);
}

#[test]
fn too_many_entries() {
    let colors = vec![ColorRgba32::opaque(1, 1, 1); 257];
    assert!(matches!(Palette::from_colors("Big", colors, false), Err(EngineError::TooManyPaletteEntries { .. })));
}
