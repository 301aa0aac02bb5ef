//! Project resource tree.
//!
//! The tree owns every resource of a project through its nodes. Cross references between
//! resources (arranger to palette, arranger to data file, palette to data file) are not part of
//! the tree: each resource reports them by [`ResourceId`] through `linked_resources`.

use std::{fmt::Display, path::PathBuf};

use crate::{ArrangerRef, DataFileRef, PaletteRef, ResourceId};

mod tree;
pub use tree::*;

mod removal;
pub use removal::*;

mod model;
pub use model::*;

mod builder;
pub use builder::*;

/// Root resource of a tree.
#[derive(Debug, Clone)]
pub struct ImageProject {
    id: ResourceId,
    pub name: String,
    /// Directory holding the resource descriptor files.
    pub root: PathBuf,
}

impl ImageProject {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: ResourceId::next(),
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct ResourceFolder {
    id: ResourceId,
    pub name: String,
}

impl ResourceFolder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::next(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Project,
    Folder,
    DataFile,
    Palette,
    Arranger,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Project => "Project",
            ResourceKind::Folder => "Folder",
            ResourceKind::DataFile => "DataFile",
            ResourceKind::Palette => "Palette",
            ResourceKind::Arranger => "Arranger",
        };
        write!(f, "{name}")
    }
}

/// Resource owned by a tree node.
#[derive(Debug, Clone)]
pub enum Resource {
    Project(ImageProject),
    Folder(ResourceFolder),
    DataFile(DataFileRef),
    Palette(PaletteRef),
    Arranger(ArrangerRef),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Project(_) => ResourceKind::Project,
            Resource::Folder(_) => ResourceKind::Folder,
            Resource::DataFile(_) => ResourceKind::DataFile,
            Resource::Palette(_) => ResourceKind::Palette,
            Resource::Arranger(_) => ResourceKind::Arranger,
        }
    }

    pub fn id(&self) -> ResourceId {
        match self {
            Resource::Project(project) => project.id(),
            Resource::Folder(folder) => folder.id(),
            Resource::DataFile(df) => df.id(),
            Resource::Palette(pal) => pal.id(),
            Resource::Arranger(arranger) => arranger.id(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Resource::Project(project) => project.name.clone(),
            Resource::Folder(folder) => folder.name.clone(),
            Resource::DataFile(df) => df.lock().name().to_string(),
            Resource::Palette(pal) => pal.lock().name().to_string(),
            Resource::Arranger(arranger) => arranger.lock().name().to_string(),
        }
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        match self {
            Resource::Project(project) => project.name = name.to_string(),
            Resource::Folder(folder) => folder.name = name.to_string(),
            Resource::DataFile(df) => df.lock().set_name(name),
            Resource::Palette(pal) => pal.lock().set_name(name),
            Resource::Arranger(arranger) => arranger.lock().set_name(name),
        }
    }

    pub fn can_contain_children(&self) -> bool {
        matches!(self, Resource::Project(_) | Resource::Folder(_))
    }

    /// Resources this one depends on.
    pub fn linked_resources(&self) -> Vec<ResourceId> {
        match self {
            Resource::Palette(pal) => pal.lock().linked_resources(),
            Resource::Arranger(arranger) => arranger.lock().linked_resources(),
            Resource::Project(_) | Resource::Folder(_) | Resource::DataFile(_) => Vec::new(),
        }
    }

    /// Drops every link to `id`. Returns true if a link was removed.
    pub fn unlink_resource(&self, id: ResourceId) -> bool {
        match self {
            Resource::Palette(pal) => pal.lock().unlink_resource(id),
            Resource::Arranger(arranger) => arranger.lock().unlink_resource(id),
            Resource::Project(_) | Resource::Folder(_) | Resource::DataFile(_) => false,
        }
    }

    pub fn as_data_file(&self) -> Option<&DataFileRef> {
        match self {
            Resource::DataFile(df) => Some(df),
            _ => None,
        }
    }

    pub fn as_palette(&self) -> Option<&PaletteRef> {
        match self {
            Resource::Palette(pal) => Some(pal),
            _ => None,
        }
    }

    pub fn as_arranger(&self) -> Option<&ArrangerRef> {
        match self {
            Resource::Arranger(arranger) => Some(arranger),
            _ => None,
        }
    }
}

impl From<ResourceFolder> for Resource {
    fn from(folder: ResourceFolder) -> Self {
        Resource::Folder(folder)
    }
}

impl From<DataFileRef> for Resource {
    fn from(df: DataFileRef) -> Self {
        Resource::DataFile(df)
    }
}

impl From<PaletteRef> for Resource {
    fn from(pal: PaletteRef) -> Self {
        Resource::Palette(pal)
    }
}

impl From<ArrangerRef> for Resource {
    fn from(arranger: ArrangerRef) -> Self {
        Resource::Arranger(arranger)
    }
}
