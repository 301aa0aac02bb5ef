use std::path::Path;

use super::{ArrangerElementModel, ArrangerModel, DataFileModel, ImageProject, ImageProjectModel, NodeId, PaletteModel, ProjectTree, ResourceFolder, ResourceFolderModel};
use crate::{
    Arranger, ArrangerElement, CodecFactory, ColorRgba32, DataFile, EngineError, Palette, PaletteRef, PaletteStorageSource, PixelColorType, Result,
};

/// A built tree together with every failure met while building it.
#[derive(Debug)]
pub struct ProjectBuild {
    pub tree: ProjectTree,
    pub failures: Vec<EngineError>,
}

impl ProjectBuild {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Materializes a [`ProjectTree`] from [`ImageProjectModel`] records.
///
/// Resources are added folders first, then data files, palettes and arrangers so every key an
/// arranger refers to already resolves. A resource that fails is left out and the failure is
/// recorded; building continues with the next record.
pub struct ProjectTreeBuilder<'a> {
    codec_factory: &'a dyn CodecFactory,
    global_palettes: Vec<PaletteRef>,
}

fn parent_node(tree: &ProjectTree, parent: &str, name: &str) -> Result<NodeId> {
    tree.find_node(parent)
        .ok_or_else(|| EngineError::resolution(format!("Parent '{parent}' of resource '{name}' does not exist")))
}

fn key_depth(key: &str) -> usize {
    key.split('/').filter(|segment| !segment.is_empty()).count()
}

impl<'a> ProjectTreeBuilder<'a> {
    /// `global_palettes` are used when an element names no palette or one the project does not
    /// have. The first one is the default palette.
    pub fn new(codec_factory: &'a dyn CodecFactory, global_palettes: Vec<PaletteRef>) -> Self {
        Self {
            codec_factory,
            global_palettes,
        }
    }

    pub fn default_palette(&self) -> Option<&PaletteRef> {
        self.global_palettes.first()
    }

    pub fn build(&self, model: &ImageProjectModel) -> ProjectBuild {
        let mut tree = ProjectTree::new(ImageProject::new(model.name.clone(), model.root.clone()));
        let mut failures = Vec::new();

        let mut folders: Vec<&ResourceFolderModel> = model.folders.iter().collect();
        folders.sort_by_key(|folder| key_depth(&folder.parent));
        for folder in folders {
            record(&mut failures, self.add_folder(&mut tree, folder));
        }
        for data_file in &model.data_files {
            record(&mut failures, self.add_data_file(&mut tree, &model.root, data_file));
        }
        for palette in &model.palettes {
            record(&mut failures, self.add_palette(&mut tree, palette));
        }
        for arranger in &model.arrangers {
            record(&mut failures, self.add_arranger(&mut tree, arranger));
        }

        if !failures.is_empty() {
            log::warn!("project '{}' loaded with {} failures", model.name, failures.len());
        }
        ProjectBuild { tree, failures }
    }

    fn add_folder(&self, tree: &mut ProjectTree, model: &ResourceFolderModel) -> Result<()> {
        let parent = parent_node(tree, &model.parent, &model.name)?;
        tree.add_resource(parent, ResourceFolder::new(model.name.clone()))?;
        Ok(())
    }

    fn add_data_file(&self, tree: &mut ProjectTree, root: &Path, model: &DataFileModel) -> Result<()> {
        let parent = parent_node(tree, &model.parent, &model.name)?;
        let location = if model.location.is_absolute() { model.location.clone() } else { root.join(&model.location) };
        let data_file = DataFile::open(model.name.clone(), location)?;
        tree.add_resource(parent, data_file.into_ref())?;
        Ok(())
    }

    fn add_palette(&self, tree: &mut ProjectTree, model: &PaletteModel) -> Result<()> {
        let parent = parent_node(tree, &model.parent, &model.name)?;
        let palette = match model.storage_source {
            PaletteStorageSource::Inline => {
                let colors = model.colors.iter().map(|hex| ColorRgba32::from_hex(hex)).collect::<Result<Vec<_>>>()?;
                Palette::from_colors(model.name.clone(), colors, model.zero_index_transparent)?
            }
            PaletteStorageSource::DataFile => {
                let Some(data_file) = tree.get_data_file(&model.data_file) else {
                    return Err(EngineError::resolution(format!(
                        "Palette '{}' could not locate DataFile with key '{}'",
                        model.name, model.data_file
                    )));
                };
                let mut palette = Palette::new(model.name.clone(), model.color_model, model.address, model.entries, model.zero_index_transparent)?;
                palette.lazy_load_palette(data_file, model.address, model.color_model, model.zero_index_transparent, model.entries)?;
                palette
            }
        };
        tree.add_resource(parent, palette.into_ref())?;
        Ok(())
    }

    fn add_arranger(&self, tree: &mut ProjectTree, model: &ArrangerModel) -> Result<()> {
        let parent = parent_node(tree, &model.parent, &model.name)?;
        let mut arranger = Arranger::new(model.name.clone(), model.color_type, model.layout, model.grid_size, model.element_size)?;
        for element_model in &model.elements {
            let element = self.create_element(tree, model, element_model)?;
            arranger.set_element(element_model.x, element_model.y, element)?;
        }
        tree.add_resource(parent, arranger.into_ref())?;
        Ok(())
    }

    /// Looks up `key` in the tree, then among the global palettes by name. An empty key selects
    /// the default palette.
    fn resolve_palette(&self, tree: &ProjectTree, key: &str) -> Option<PaletteRef> {
        if key.is_empty() {
            return self.default_palette().cloned();
        }
        if let Some(palette) = tree.get_palette(key) {
            return Some(palette);
        }
        let name = key.rsplit('/').next().unwrap_or(key);
        self.global_palettes.iter().find(|pal| pal.lock().name().eq_ignore_ascii_case(name)).cloned()
    }

    fn create_element(&self, tree: &ProjectTree, arranger: &ArrangerModel, model: &ArrangerElementModel) -> Result<ArrangerElement> {
        let data_file = if model.data_file.trim().is_empty() {
            None
        } else {
            let data_file = tree.get_data_file(&model.data_file).ok_or_else(|| {
                EngineError::resolution(format!(
                    "Could not resolve data file '{}' referenced by arranger '{}'",
                    model.data_file, arranger.name
                ))
            })?;
            Some(data_file)
        };

        let palette = match arranger.color_type {
            PixelColorType::Indexed => {
                let palette = self.resolve_palette(tree, &model.palette).ok_or_else(|| {
                    EngineError::resolution(format!("Could not resolve palette '{}' referenced by arranger '{}'", model.palette, arranger.name))
                })?;
                Some(palette)
            }
            PixelColorType::Direct => None,
        };

        let codec = self.codec_factory.get_codec(&model.codec, arranger.element_size)?;
        Ok(ArrangerElement::new(
            model.x * arranger.element_size.width,
            model.y * arranger.element_size.height,
            data_file,
            model.address,
            codec,
            palette,
        ))
    }
}

fn record(failures: &mut Vec<EngineError>, result: Result<()>) {
    if let Err(err) = result {
        log::error!("{err}");
        failures.push(err);
    }
}
