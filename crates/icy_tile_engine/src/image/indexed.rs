use crate::{ArrangerRef, ColorRgba32, DataFileRef, EngineError, PaletteRef, PixelColorType, Result, Size};

use super::{blit, check_bounds, check_rendered_size, checked_pixel_size, copy_out, flush_distinct, is_renderable};

/// Palette index image of an indexed arranger.
pub struct IndexedImage {
    arranger: ArrangerRef,
    default_palette: Option<PaletteRef>,
    size: Size,
    image: Vec<u8>,
}

impl IndexedImage {
    /// Creates the image and renders it once.
    pub fn new(arranger: ArrangerRef, default_palette: Option<PaletteRef>) -> Result<Self> {
        let color_type = arranger.lock().color_type();
        if color_type != PixelColorType::Indexed {
            return Err(EngineError::ColorTypeMismatch {
                expected: PixelColorType::Indexed,
                actual: color_type,
            });
        }
        let mut image = Self {
            arranger,
            default_palette,
            size: Size::default(),
            image: Vec::new(),
        };
        image.render()?;
        Ok(image)
    }

    pub fn arranger(&self) -> &ArrangerRef {
        &self.arranger
    }

    pub fn width(&self) -> usize {
        self.size.width
    }

    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Flat row major palette indices.
    pub fn pixels(&self) -> &[u8] {
        &self.image
    }

    /// Decodes every element of the arranger into the image.
    pub fn render(&mut self) -> Result<()> {
        let mut arranger = self.arranger.lock();
        let size = checked_pixel_size(&arranger)?;
        if size.area() != self.image.len() {
            self.image = vec![0; size.area()];
        }
        self.size = size;

        let mut scratch = Vec::new();
        for element in arranger.elements_mut() {
            if !is_renderable(element) {
                continue;
            }
            let (x1, y1, width) = (element.x1(), element.y1(), element.width());
            let decoded = element.decode_indexed(&mut scratch)?;
            blit(&mut self.image, size, x1, y1, width, decoded)?;
        }
        Ok(())
    }

    /// Encodes every element back into its data file, then flushes each file once.
    pub fn save_image(&mut self) -> Result<()> {
        let mut arranger = self.arranger.lock();
        check_rendered_size(&arranger, self.size)?;
        let mut native = Vec::new();
        let mut scratch = Vec::new();
        for element in arranger.elements_mut() {
            if !is_renderable(element) {
                continue;
            }
            copy_out(&self.image, self.size, element, &mut native)?;
            element.encode_indexed(&native, &mut scratch)?;
        }
        let files: Vec<DataFileRef> = arranger.enumerate_elements().filter_map(|el| el.data_file().cloned()).collect();
        flush_distinct(files.iter())
    }

    fn element_palette(&self, x: usize, y: usize) -> Result<Option<PaletteRef>> {
        let arranger = self.arranger.lock();
        let Some(element) = arranger.get_element_at_pixel(x, y)? else {
            return Err(EngineError::NoElement { x, y });
        };
        let palette = element.palette().or(self.default_palette.as_ref()).cloned();
        Ok(palette)
    }

    /// Stores palette `index` at (`x`, `y`).
    pub fn set_pixel(&mut self, x: usize, y: usize, index: u8) -> Result<()> {
        check_bounds(x, y, self.size)?;
        let Some(palette) = self.element_palette(x, y)? else {
            return Err(EngineError::NoPalette { x, y });
        };
        let palette = palette.lock();
        if index as usize >= palette.entries() {
            return Err(EngineError::PaletteIndexOutOfRange {
                palette: palette.name().to_string(),
                index: index as usize,
                entries: palette.entries(),
            });
        }
        self.image[y * self.size.width + x] = index;
        Ok(())
    }

    /// Stores the palette index of `color` at (`x`, `y`).
    ///
    /// Returns false without touching the image when the position has no indexed element, no
    /// palette can be resolved or the palette does not contain `color`.
    pub fn try_set_pixel(&mut self, x: usize, y: usize, color: ColorRgba32) -> bool {
        if check_bounds(x, y, self.size).is_err() {
            return false;
        }
        let palette = {
            let arranger = self.arranger.lock();
            let Ok(Some(element)) = arranger.get_element_at_pixel(x, y) else {
                return false;
            };
            if element.color_type() != PixelColorType::Indexed {
                return false;
            }
            let palette = element.palette().or(self.default_palette.as_ref()).cloned();
            palette
        };
        let Some(palette) = palette else {
            return false;
        };
        let mut palette = palette.lock();
        if !palette.contains_native_color(color) {
            return false;
        }
        match palette.get_index_by_native_color(color, true) {
            Ok(index) => {
                self.image[y * self.size.width + x] = index;
                true
            }
            Err(err) => {
                log::debug!("try_set_pixel at ({x}, {y}): {err}");
                false
            }
        }
    }

    pub fn get_pixel_index(&self, x: usize, y: usize) -> Result<u8> {
        check_bounds(x, y, self.size)?;
        Ok(self.image[y * self.size.width + x])
    }

    /// Color at (`x`, `y`) through the element palette, or the default palette when the
    /// element has none.
    pub fn get_pixel(&self, x: usize, y: usize) -> Result<ColorRgba32> {
        let index = self.get_pixel_index(x, y)?;
        let palette = {
            let arranger = self.arranger.lock();
            let element_palette = arranger.get_element_at_pixel(x, y)?.and_then(|el| el.palette().cloned());
            element_palette.or_else(|| self.default_palette.clone())
        };
        let Some(palette) = palette else {
            return Err(EngineError::NoPalette { x, y });
        };
        let color = palette.lock().get(index as usize)?;
        Ok(color)
    }

    /// Flat RGBA bytes of the image. Pixels without an element or palette are transparent.
    pub fn export_rgba(&self) -> Result<Vec<u8>> {
        let mut rgba = vec![0u8; self.image.len() * 4];
        let arranger = self.arranger.lock();
        check_rendered_size(&arranger, self.size)?;
        for element in arranger.enumerate_elements() {
            let Some(palette) = element.palette().or(self.default_palette.as_ref()) else {
                continue;
            };
            let mut palette = palette.lock();
            let colors = palette.colors()?.to_vec();
            for y in element.y1()..=element.y2() {
                for x in element.x1()..=element.x2() {
                    let offset = y * self.size.width + x;
                    let color = colors.get(self.image[offset] as usize).copied().unwrap_or_default();
                    rgba[offset * 4..offset * 4 + 4].copy_from_slice(&<[u8; 4]>::from(color));
                }
            }
        }
        Ok(rgba)
    }
}

impl std::fmt::Debug for IndexedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedImage").field("arranger", &self.arranger).field("size", &self.size).finish()
    }
}
