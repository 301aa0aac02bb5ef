use crate::{ArrangerRef, ColorRgba32, DataFileRef, EngineError, PixelColorType, Result, Size};

use super::{blit, check_bounds, check_rendered_size, checked_pixel_size, copy_out, flush_distinct, is_renderable};

/// Color image of a direct color arranger.
pub struct DirectImage {
    arranger: ArrangerRef,
    size: Size,
    image: Vec<ColorRgba32>,
}

impl DirectImage {
    pub fn new(arranger: ArrangerRef) -> Result<Self> {
        let color_type = arranger.lock().color_type();
        if color_type != PixelColorType::Direct {
            return Err(EngineError::ColorTypeMismatch {
                expected: PixelColorType::Direct,
                actual: color_type,
            });
        }
        let mut image = Self {
            arranger,
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

    pub fn pixels(&self) -> &[ColorRgba32] {
        &self.image
    }

    pub fn render(&mut self) -> Result<()> {
        let mut arranger = self.arranger.lock();
        let size = checked_pixel_size(&arranger)?;
        if size.area() != self.image.len() {
            self.image = vec![ColorRgba32::TRANSPARENT; size.area()];
        }
        self.size = size;

        let mut scratch = Vec::new();
        for element in arranger.elements_mut() {
            if !is_renderable(element) {
                continue;
            }
            let (x1, y1, width) = (element.x1(), element.y1(), element.width());
            let decoded = element.decode_direct(&mut scratch)?;
            blit(&mut self.image, size, x1, y1, width, decoded)?;
        }
        Ok(())
    }

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
            element.encode_direct(&native, &mut scratch)?;
        }
        let files: Vec<DataFileRef> = arranger.enumerate_elements().filter_map(|el| el.data_file().cloned()).collect();
        flush_distinct(files.iter())
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: ColorRgba32) -> Result<()> {
        check_bounds(x, y, self.size)?;
        self.image[y * self.size.width + x] = color;
        Ok(())
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Result<ColorRgba32> {
        check_bounds(x, y, self.size)?;
        Ok(self.image[y * self.size.width + x])
    }

    pub fn export_rgba(&self) -> Vec<u8> {
        self.image.iter().flat_map(|color| <[u8; 4]>::from(*color)).collect()
    }
}

impl std::fmt::Debug for DirectImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectImage").field("arranger", &self.arranger).field("size", &self.size).finish()
    }
}
