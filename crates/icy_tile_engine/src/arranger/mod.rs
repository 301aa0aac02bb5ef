//! Arrangers lay out codec bound elements on a grid to form one image.

use std::collections::BTreeSet;

use crate::{DataFileRef, ElementCodec, EngineError, FileBitAddress, ImageLayout, PaletteRef, PixelColorType, ResourceId, ResourceRef, Result, Size};

mod element;
pub use element::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrangerMode {
    /// Every cell is assigned individually.
    Scattered,
    /// Cells read consecutive ranges of a single data file.
    Sequential,
}

/// Source of a sequential arranger: all cells share file, codec and palette and take
/// consecutive addresses starting at `address`.
#[derive(Debug, Clone)]
struct SequentialSource {
    data_file: DataFileRef,
    address: FileBitAddress,
    codec: ElementCodec,
    palette: Option<PaletteRef>,
}

#[derive(Debug)]
pub struct Arranger {
    name: String,
    mode: ArrangerMode,
    layout: ImageLayout,
    color_type: PixelColorType,
    grid_size: Size,
    element_size: Size,
    /// Row major, `grid_size.width * grid_size.height` cells.
    elements: Vec<Option<ArrangerElement>>,
    sequential: Option<SequentialSource>,
}

pub type ArrangerRef = ResourceRef<Arranger>;

fn check_grid(layout: ImageLayout, grid: Size, element: Size) -> Result<()> {
    if grid.is_empty() {
        return Err(EngineError::invalid_dimensions(grid.width, grid.height, "arranger grid must not be empty"));
    }
    if element.is_empty() {
        return Err(EngineError::invalid_dimensions(element.width, element.height, "element size must be positive"));
    }
    if layout == ImageLayout::Single && (grid.width != 1 || grid.height != 1) {
        return Err(EngineError::invalid_dimensions(grid.width, grid.height, "a single layout arranger has exactly one element"));
    }
    Ok(())
}

impl Arranger {
    /// Creates an empty scattered arranger.
    pub fn new(name: impl Into<String>, color_type: PixelColorType, layout: ImageLayout, grid_size: Size, element_size: Size) -> Result<Self> {
        check_grid(layout, grid_size, element_size)?;
        Ok(Self {
            name: name.into(),
            mode: ArrangerMode::Scattered,
            layout,
            color_type,
            grid_size,
            element_size,
            elements: vec![None; grid_size.area()],
            sequential: None,
        })
    }

    /// Creates an arranger whose cells cover consecutive ranges of `data_file`, starting at `address`.
    pub fn new_sequential(
        name: impl Into<String>,
        grid_size: Size,
        data_file: DataFileRef,
        address: FileBitAddress,
        codec: ElementCodec,
        palette: Option<PaletteRef>,
    ) -> Result<Self> {
        let layout = match codec.layout() {
            ImageLayout::Single => ImageLayout::Single,
            _ => ImageLayout::Tiled,
        };
        let element_size = Size::new(codec.width(), codec.height());
        check_grid(layout, grid_size, element_size)?;
        let mut arranger = Self {
            name: name.into(),
            mode: ArrangerMode::Sequential,
            layout,
            color_type: codec.color_type(),
            grid_size,
            element_size,
            elements: Vec::new(),
            sequential: Some(SequentialSource {
                data_file,
                address,
                codec,
                palette,
            }),
        };
        arranger.fill_sequential();
        Ok(arranger)
    }

    pub fn into_ref(self) -> ArrangerRef {
        ResourceRef::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn mode(&self) -> ArrangerMode {
        self.mode
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    pub fn color_type(&self) -> PixelColorType {
        self.color_type
    }

    pub fn grid_size(&self) -> Size {
        self.grid_size
    }

    pub fn element_size(&self) -> Size {
        self.element_size
    }

    pub fn pixel_size(&self) -> Size {
        Size::new(self.grid_size.width * self.element_size.width, self.grid_size.height * self.element_size.height)
    }

    fn cell_index(&self, x: usize, y: usize) -> Result<usize> {
        if x >= self.grid_size.width || y >= self.grid_size.height {
            return Err(EngineError::OutOfBounds {
                x,
                y,
                width: self.grid_size.width,
                height: self.grid_size.height,
            });
        }
        Ok(y * self.grid_size.width + x)
    }

    /// Element at grid cell (`x`, `y`). `None` marks an unassigned cell.
    pub fn get_element(&self, x: usize, y: usize) -> Result<Option<&ArrangerElement>> {
        let index = self.cell_index(x, y)?;
        Ok(self.elements[index].as_ref())
    }

    /// Element covering pixel (`x`, `y`).
    pub fn get_element_at_pixel(&self, x: usize, y: usize) -> Result<Option<&ArrangerElement>> {
        let size = self.pixel_size();
        if x >= size.width || y >= size.height {
            return Err(EngineError::OutOfBounds {
                x,
                y,
                width: size.width,
                height: size.height,
            });
        }
        self.get_element(x / self.element_size.width, y / self.element_size.height)
    }

    /// Assigns `element` to grid cell (`x`, `y`), moving it to the cell's pixel origin.
    pub fn set_element(&mut self, x: usize, y: usize, element: ArrangerElement) -> Result<()> {
        let index = self.cell_index(x, y)?;
        if element.color_type() != self.color_type {
            return Err(EngineError::ColorTypeMismatch {
                expected: self.color_type,
                actual: element.color_type(),
            });
        }
        if element.width() != self.element_size.width || element.height() != self.element_size.height {
            return Err(EngineError::InvalidArrangerState {
                arranger: self.name.clone(),
                message: format!(
                    "element codec '{}' is {}x{} but the arranger uses {} elements",
                    element.codec().name(),
                    element.width(),
                    element.height(),
                    self.element_size
                ),
            });
        }
        let element = element.with_location(x * self.element_size.width, y * self.element_size.height);
        self.elements[index] = Some(element);
        Ok(())
    }

    /// Clears grid cell (`x`, `y`).
    pub fn reset_element(&mut self, x: usize, y: usize) -> Result<()> {
        let index = self.cell_index(x, y)?;
        self.elements[index] = None;
        Ok(())
    }

    /// Assigned elements in row major order.
    pub fn enumerate_elements(&self) -> impl Iterator<Item = &ArrangerElement> {
        self.elements.iter().flatten()
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut ArrangerElement> {
        self.elements.iter_mut().flatten()
    }

    /// Data files and palettes referenced by any element, each listed once.
    pub fn linked_resources(&self) -> Vec<ResourceId> {
        let mut ids: BTreeSet<ResourceId> = self.enumerate_elements().flat_map(ArrangerElement::linked_resources).collect();
        if let Some(source) = &self.sequential {
            ids.insert(source.data_file.id());
            ids.extend(source.palette.iter().map(PaletteRef::id));
        }
        ids.into_iter().collect()
    }

    /// Removes every reference to `id` from the elements. Returns true if anything changed.
    ///
    /// A sequential arranger that loses its data file becomes scattered.
    pub fn unlink_resource(&mut self, id: ResourceId) -> bool {
        let mut changed = false;
        for element in self.elements_mut() {
            changed |= element.unlink_resource(id);
        }
        let mut lost_source = false;
        if let Some(source) = &mut self.sequential {
            if source.palette.as_ref().is_some_and(|pal| pal.id() == id) {
                source.palette = None;
                changed = true;
            }
            lost_source = source.data_file.id() == id;
        }
        if lost_source {
            log::debug!("arranger '{}' lost its sequential source", self.name);
            self.sequential = None;
            self.mode = ArrangerMode::Scattered;
            changed = true;
        }
        changed
    }

    /// Changes the grid dimensions. Scattered arrangers keep the elements inside the new grid,
    /// sequential arrangers are refilled from their current address.
    pub fn resize_grid(&mut self, width: usize, height: usize) -> Result<()> {
        let grid = Size::new(width, height);
        check_grid(self.layout, grid, self.element_size)?;
        if self.sequential.is_some() {
            self.grid_size = grid;
            self.fill_sequential();
            return Ok(());
        }

        let mut elements = vec![None; grid.area()];
        for y in 0..height.min(self.grid_size.height) {
            for x in 0..width.min(self.grid_size.width) {
                elements[y * width + x] = self.elements[y * self.grid_size.width + x].take();
            }
        }
        self.elements = elements;
        self.grid_size = grid;
        Ok(())
    }

    /// Start address of a sequential arranger.
    pub fn address(&self) -> Option<FileBitAddress> {
        self.sequential.as_ref().map(|source| source.address)
    }

    /// Moves a sequential arranger to `address`, clamped so the whole grid stays inside the file.
    /// Returns the address actually used.
    pub fn move_to(&mut self, address: FileBitAddress) -> Result<FileBitAddress> {
        let total_bits = (self.grid_size.area() * self.storage_size()) as u64;
        let Some(source) = &mut self.sequential else {
            return Err(EngineError::InvalidArrangerState {
                arranger: self.name.clone(),
                message: "only sequential arrangers can be moved".to_string(),
            });
        };
        let file_bits = source.data_file.lock().len_bits();
        let last = file_bits.saturating_sub(total_bits);
        source.address = FileBitAddress::from_bits(address.bits().min(last));
        let moved = source.address;
        self.fill_sequential();
        Ok(moved)
    }

    /// Moves a sequential arranger by a signed number of bits.
    pub fn move_by(&mut self, bits: i64) -> Result<FileBitAddress> {
        let current = self.address().unwrap_or_default();
        self.move_to(current.offset_by(bits))
    }

    /// Encoded bits of one element.
    fn storage_size(&self) -> usize {
        self.sequential
            .as_ref()
            .map(|source| source.codec.storage_size())
            .or_else(|| self.enumerate_elements().next().map(|el| el.codec().storage_size()))
            .unwrap_or_default()
    }

    fn fill_sequential(&mut self) {
        let Some(source) = &self.sequential else {
            return;
        };
        let step = source.codec.storage_size() as i64;
        let mut elements = Vec::with_capacity(self.grid_size.area());
        let mut address = source.address;
        for y in 0..self.grid_size.height {
            for x in 0..self.grid_size.width {
                let element = ArrangerElement::new(
                    x * self.element_size.width,
                    y * self.element_size.height,
                    Some(source.data_file.clone()),
                    address,
                    source.codec.clone(),
                    source.palette.clone(),
                );
                elements.push(Some(element));
                address = address.offset_by(step);
            }
        }
        self.elements = elements;
    }
}
