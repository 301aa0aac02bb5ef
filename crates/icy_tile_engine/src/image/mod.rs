//! Flat pixel buffers covering a whole arranger.

use std::collections::HashSet;

use crate::{Arranger, ArrangerElement, DataFileRef, EngineError, Result, Size};

mod indexed;
pub use indexed::*;

mod direct;
pub use direct::*;

fn checked_pixel_size(arranger: &Arranger) -> Result<Size> {
    let size = arranger.pixel_size();
    if size.is_empty() {
        return Err(EngineError::InvalidArrangerState {
            arranger: arranger.name().to_string(),
            message: format!("dimensions are too small to render ({size})"),
        });
    }
    Ok(size)
}

fn check_bounds(x: usize, y: usize, size: Size) -> Result<()> {
    if x >= size.width || y >= size.height {
        return Err(EngineError::OutOfBounds {
            x,
            y,
            width: size.width,
            height: size.height,
        });
    }
    Ok(())
}

/// Elements that cannot be read are left out of render and save.
fn is_renderable(element: &ArrangerElement) -> bool {
    if element.has_data_source() {
        return true;
    }
    log::debug!("skipping element at ({}, {}) without a data file", element.x1(), element.y1());
    false
}

/// Fails when the arranger no longer has the pixel size of the last render.
fn check_rendered_size(arranger: &Arranger, rendered: Size) -> Result<()> {
    let size = arranger.pixel_size();
    if size != rendered {
        return Err(EngineError::InvalidArrangerState {
            arranger: arranger.name().to_string(),
            message: format!("image was rendered at {rendered} but the arranger is now {size}"),
        });
    }
    Ok(())
}

fn element_out_of_image(x1: usize, y1: usize, width: usize, height: usize, size: Size) -> EngineError {
    EngineError::OutOfBounds {
        x: x1 + width.saturating_sub(1),
        y: y1 + height.saturating_sub(1),
        width: size.width,
        height: size.height,
    }
}

fn blit<T: Copy>(image: &mut [T], size: Size, x1: usize, y1: usize, width: usize, pixels: &[T]) -> Result<()> {
    if width == 0 {
        return Ok(());
    }
    let height = pixels.len() / width;
    if x1 + width > size.width || y1 + height > size.height || image.len() < size.area() {
        return Err(element_out_of_image(x1, y1, width, height, size));
    }
    for (row, line) in pixels.chunks_exact(width).enumerate() {
        let start = (y1 + row) * size.width + x1;
        image[start..start + width].copy_from_slice(line);
    }
    Ok(())
}

fn copy_out<T: Copy>(image: &[T], size: Size, element: &ArrangerElement, dest: &mut Vec<T>) -> Result<()> {
    let (x1, y1, width, height) = (element.x1(), element.y1(), element.width(), element.height());
    if x1 + width > size.width || y1 + height > size.height || image.len() < size.area() {
        return Err(element_out_of_image(x1, y1, width, height, size));
    }
    dest.clear();
    for row in 0..height {
        let start = (y1 + row) * size.width + x1;
        dest.extend_from_slice(&image[start..start + width]);
    }
    Ok(())
}

/// Flushes every file exactly once, however many elements share it.
fn flush_distinct<'a>(files: impl Iterator<Item = &'a DataFileRef>) -> Result<()> {
    let mut flushed = HashSet::new();
    for file in files {
        if flushed.insert(file.id()) {
            file.lock().flush()?;
        }
    }
    Ok(())
}
