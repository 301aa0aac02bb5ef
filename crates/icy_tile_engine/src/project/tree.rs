use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};

use super::{ImageProject, Resource, ResourceFolder, ResourceKind};
use crate::{ArrangerRef, DataFileRef, EngineError, PaletteRef, ResourceId, Result};

/// Highest suffix tried when looking for a free "Name (n)".
const MAX_NAME_SUFFIX: usize = 999;

/// Handle to a tree node. Handles of removed nodes are rejected, even if the slot was reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node {}.{}", self.index, self.generation)
    }
}

#[derive(Debug)]
pub struct ResourceNode {
    name: String,
    resource: Resource,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    file_location: PathBuf,
}

impl ResourceNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Descriptor file of the resource (`<project root>/<parent path>/<name>.xml`).
    pub fn file_location(&self) -> &Path {
        &self.file_location
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<ResourceNode>,
}

/// Named, ordered resource hierarchy rooted at an [`ImageProject`].
///
/// Nodes live in an arena and are addressed by [`NodeId`] or by path key. Path keys exclude
/// the project root: a palette `Pal` inside folder `Graphics` has the key `/Graphics/Pal`, the
/// root itself has the empty key.
#[derive(Debug)]
pub struct ProjectTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    base_path: PathBuf,
}

fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['/', '\\'])
}

fn key_segments(key: &str) -> impl Iterator<Item = &str> {
    key.split('/').filter(|segment| !segment.is_empty())
}

impl ProjectTree {
    pub fn new(project: ImageProject) -> Self {
        let base_path = project.root.clone();
        let root_node = ResourceNode {
            name: project.name.clone(),
            file_location: base_path.clone(),
            resource: Resource::Project(project),
            parent: None,
            children: Vec::new(),
        };
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId { index: 0, generation: 0 },
            base_path,
        };
        tree.root = tree.alloc(root_node);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn name(&self) -> &str {
        self.node(self.root).map_or("", ResourceNode::name)
    }

    pub fn project(&self) -> Option<&ImageProject> {
        match self.node(self.root).map(ResourceNode::resource) {
            Some(Resource::Project(project)) => Some(project),
            _ => None,
        }
    }

    /// Directory the descriptor files are laid out in.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn node(&self, id: NodeId) -> Option<&ResourceNode> {
        self.slots.get(id.index as usize).filter(|slot| slot.generation == id.generation).and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut ResourceNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Node for a handle that already passed a containment check.
    fn existing(&self, id: NodeId) -> Result<&ResourceNode> {
        self.node(id).ok_or_else(|| self.not_in_tree(id))
    }

    fn not_in_tree(&self, id: NodeId) -> EngineError {
        EngineError::NodeNotInTree {
            name: id.to_string(),
            project: self.name().to_string(),
        }
    }

    fn alloc(&mut self, node: ResourceNode) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    /// Number of nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// True if `id` is alive and its ancestor chain ends at the project root.
    pub fn contains_node(&self, id: NodeId) -> bool {
        let mut current = id;
        for _ in 0..=self.slots.len() {
            let Some(node) = self.node(current) else {
                return false;
            };
            match node.parent {
                Some(parent) => current = parent,
                None => return current == self.root,
            }
        }
        false
    }

    pub fn contains_resource(&self, id: ResourceId) -> bool {
        self.find_node_by_resource(id).is_some()
    }

    pub fn find_node_by_resource(&self, id: ResourceId) -> Option<NodeId> {
        self.enumerate_depth_first()
            .into_iter()
            .find(|node| self.node(*node).is_some_and(|n| n.resource.id() == id))
    }

    /// Every node in pre-order, starting with the root.
    pub fn enumerate_depth_first(&self) -> Vec<NodeId> {
        self.self_and_descendants(self.root)
    }

    /// `id` followed by all of its descendants in pre-order.
    pub fn self_and_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            result.push(current);
            stack.extend(node.children.iter().rev());
        }
        result
    }

    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.node(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            if result.len() > self.slots.len() {
                break;
            }
            result.push(parent);
            current = self.node(parent).and_then(|n| n.parent);
        }
        result
    }

    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let node = self.node(parent)?;
        node.children.iter().copied().find(|child| self.node(*child).is_some_and(|c| c.name == name))
    }

    /// Path key of `id`, e.g. `/Folder/Sprite`. The root has the empty key.
    pub fn path_key(&self, id: NodeId) -> Option<String> {
        let node = self.node(id)?;
        if id == self.root {
            return Some(String::new());
        }
        let mut names = vec![node.name.as_str()];
        for ancestor in self.ancestors(id) {
            if ancestor == self.root {
                break;
            }
            names.push(self.node(ancestor)?.name.as_str());
        }
        Some(names.iter().rev().fold(String::new(), |mut key, name| {
            key.push('/');
            key.push_str(name);
            key
        }))
    }

    pub fn find_node(&self, key: &str) -> Option<NodeId> {
        let mut current = self.root;
        for segment in key_segments(key) {
            current = self.child_by_name(current, segment)?;
        }
        Some(current)
    }

    pub fn get_resource(&self, key: &str) -> Option<&Resource> {
        self.find_node(key).and_then(|id| self.node(id)).map(ResourceNode::resource)
    }

    pub fn get_data_file(&self, key: &str) -> Option<DataFileRef> {
        self.get_resource(key).and_then(Resource::as_data_file).cloned()
    }

    pub fn get_palette(&self, key: &str) -> Option<PaletteRef> {
        self.get_resource(key).and_then(Resource::as_palette).cloned()
    }

    pub fn get_arranger(&self, key: &str) -> Option<ArrangerRef> {
        self.get_resource(key).and_then(Resource::as_arranger).cloned()
    }

    fn descriptor_location(&self, parent_key: &str, name: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        path.extend(key_segments(parent_key));
        path.push(format!("{name}.xml"));
        path
    }

    fn folder_directory(&self, key: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        path.extend(key_segments(key));
        path
    }

    /// Adds `resource` as the last child of `parent`.
    pub fn add_resource(&mut self, parent: NodeId, resource: impl Into<Resource>) -> Result<NodeId> {
        let resource = resource.into();
        if !self.contains_node(parent) {
            return Err(self.not_in_tree(parent));
        }
        let name = resource.name();
        let parent_node = self.existing(parent)?;
        if self.child_by_name(parent, &name).is_some() {
            return Err(EngineError::NameCollision {
                parent: parent_node.name.clone(),
                name,
            });
        }
        if !parent_node.resource.can_contain_children() {
            return Err(EngineError::CannotContainChildren {
                parent: parent_node.name.clone(),
            });
        }
        if resource.kind() == ResourceKind::Project {
            return Err(EngineError::UnsupportedResource {
                kind: resource.kind().to_string(),
            });
        }
        if !is_valid_name(&name) {
            return Err(EngineError::InvalidResourceName { name });
        }

        let parent_key = self.path_key(parent).unwrap_or_default();
        let file_location = self.descriptor_location(&parent_key, &name);
        log::debug!("adding {} '{name}' under '{parent_key}'", resource.kind());
        let id = self.alloc(ResourceNode {
            name,
            resource,
            parent: Some(parent),
            children: Vec::new(),
            file_location,
        });
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(id);
        }
        Ok(id)
    }

    /// First name of the form `base`, `base (1)`, `base (2)`, ... that no child of `parent` uses.
    pub fn find_first_free_child_name(&self, parent: NodeId, base: &str) -> Option<String> {
        std::iter::once(base.to_string())
            .chain((1..=MAX_NAME_SUFFIX).map(|n| format!("{base} ({n})")))
            .find(|candidate| self.child_by_name(parent, candidate).is_none())
    }

    /// Creates a folder under `parent`, renaming it to the first free "Name (n)" on collision.
    pub fn create_new_folder(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        if !self.contains_node(parent) {
            return Err(self.not_in_tree(parent));
        }
        let parent_node = self.existing(parent)?;
        if !parent_node.resource.can_contain_children() {
            return Err(EngineError::CannotContainChildren {
                parent: parent_node.name.clone(),
            });
        }
        let Some(free_name) = self.find_first_free_child_name(parent, name) else {
            return Err(EngineError::NoFreeName { name: name.to_string() });
        };
        self.add_resource(parent, ResourceFolder::new(free_name))
    }

    /// Checks whether `node` may become a child of `parent`. Pure: nothing is changed.
    pub fn can_move_node(&self, node: NodeId, parent: NodeId) -> Result<()> {
        if !self.contains_node(node) {
            return Err(self.not_in_tree(node));
        }
        if !self.contains_node(parent) {
            return Err(self.not_in_tree(parent));
        }
        let moved = self.existing(node)?;
        let target = self.existing(parent)?;
        let Some(current_parent) = moved.parent else {
            return Err(EngineError::NoParent { name: moved.name.clone() });
        };
        if node == parent || current_parent == parent {
            return Err(EngineError::MoveOntoSelf { name: moved.name.clone() });
        }
        if self.child_by_name(parent, &moved.name).is_some() {
            return Err(EngineError::NameCollision {
                parent: target.name.clone(),
                name: moved.name.clone(),
            });
        }
        if !target.resource.can_contain_children() {
            return Err(EngineError::CannotContainChildren { parent: target.name.clone() });
        }
        if self.ancestors(parent).contains(&node) {
            return Err(EngineError::MoveUnderDescendant {
                name: target.name.clone(),
                parent: moved.name.clone(),
            });
        }
        Ok(())
    }

    /// Moves `node` under `parent`.
    ///
    /// Descriptor files (and folder directories) are relocated on disk first. If that fails the
    /// tree is left untouched.
    pub fn move_node(&mut self, node: NodeId, parent: NodeId) -> Result<()> {
        self.can_move_node(node, parent)?;
        let moved = self.existing(node)?;
        let name = moved.name.clone();
        let old_file = moved.file_location.clone();
        let old_key = self.path_key(node).unwrap_or_default();
        let parent_key = self.path_key(parent).unwrap_or_default();
        let new_file = self.descriptor_location(&parent_key, &name);
        let directories = (moved.kind() == ResourceKind::Folder).then(|| (self.folder_directory(&old_key), self.folder_directory(&format!("{parent_key}/{name}"))));

        relocate(&old_file, &new_file, directories.as_ref())?;

        let old_parent = moved.parent;
        if let Some(old_parent) = old_parent.and_then(|p| self.node_mut(p)) {
            old_parent.children.retain(|child| *child != node);
        }
        if let Some(new_parent) = self.node_mut(parent) {
            new_parent.children.push(node);
        }
        if let Some(moved) = self.node_mut(node) {
            moved.parent = Some(parent);
        }
        self.update_locations(node);
        log::info!("moved '{old_key}' to '{parent_key}/{name}'");
        Ok(())
    }

    /// Renames `node`, relocating its descriptor file (and folder directory).
    pub fn rename_node(&mut self, node: NodeId, new_name: &str) -> Result<()> {
        if !self.contains_node(node) {
            return Err(self.not_in_tree(node));
        }
        if !is_valid_name(new_name) {
            return Err(EngineError::InvalidResourceName { name: new_name.to_string() });
        }
        let current = self.existing(node)?;
        if current.name == new_name {
            return Ok(());
        }

        if let Some(parent) = current.parent {
            if self.child_by_name(parent, new_name).is_some() {
                return Err(EngineError::NameCollision {
                    parent: self.existing(parent)?.name.clone(),
                    name: new_name.to_string(),
                });
            }
            let old_key = self.path_key(node).unwrap_or_default();
            let parent_key = self.path_key(parent).unwrap_or_default();
            let new_file = self.descriptor_location(&parent_key, new_name);
            let directories = (current.kind() == ResourceKind::Folder)
                .then(|| (self.folder_directory(&old_key), self.folder_directory(&format!("{parent_key}/{new_name}"))));
            relocate(&current.file_location, &new_file, directories.as_ref())?;
        }

        if let Some(current) = self.node_mut(node) {
            current.name = new_name.to_string();
            current.resource.set_name(new_name);
        }
        self.update_locations(node);
        Ok(())
    }

    fn update_locations(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        for node in self.self_and_descendants(id) {
            let Some(parent) = self.node(node).and_then(|n| n.parent) else {
                continue;
            };
            let parent_key = self.path_key(parent).unwrap_or_default();
            let name = self.node(node).map(|n| n.name.clone()).unwrap_or_default();
            let location = self.descriptor_location(&parent_key, &name);
            if let Some(node) = self.node_mut(node) {
                node.file_location = location;
            }
        }
    }

    /// Removes `id` and its subtree from the tree. Handles to the removed nodes become invalid.
    pub(crate) fn detach(&mut self, id: NodeId) -> Result<()> {
        if !self.contains_node(id) {
            return Err(self.not_in_tree(id));
        }
        let node = self.existing(id)?;
        let Some(parent) = node.parent else {
            return Err(EngineError::NoParent { name: node.name.clone() });
        };
        let removed = self.self_and_descendants(id);
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|child| *child != id);
        }
        for node in removed {
            let slot = &mut self.slots[node.index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index);
        }
        Ok(())
    }

    /// Marks every palette backed by data file `id` as stale. Returns the number of palettes marked.
    pub fn notify_data_file_changed(&self, id: ResourceId) -> usize {
        let mut marked = 0;
        for node in self.enumerate_depth_first() {
            let Some(Resource::Palette(palette)) = self.node(node).map(ResourceNode::resource) else {
                continue;
            };
            let mut palette = palette.lock();
            if palette.data_file().is_some_and(|df| df.id() == id) {
                palette.mark_stale();
                marked += 1;
            }
        }
        marked
    }
}

fn relocation_error(from: &Path, to: &Path, err: &std::io::Error) -> EngineError {
    EngineError::RelocationFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        message: err.to_string(),
    }
}

/// Moves a descriptor file and, for folders, the folder directory. Either both moves happen or
/// neither does.
fn relocate(old_file: &Path, new_file: &Path, directories: Option<&(PathBuf, PathBuf)>) -> Result<()> {
    let moved_file = if old_file.exists() {
        if let Some(dir) = new_file.parent() {
            fs::create_dir_all(dir).map_err(|err| relocation_error(old_file, new_file, &err))?;
        }
        fs::rename(old_file, new_file).map_err(|err| relocation_error(old_file, new_file, &err))?;
        true
    } else {
        log::debug!("no descriptor at {} to relocate", old_file.display());
        false
    };

    if let Some((old_dir, new_dir)) = directories {
        if old_dir.is_dir() {
            if let Err(err) = fs::rename(old_dir, new_dir) {
                if moved_file {
                    if let Err(rollback) = fs::rename(new_file, old_file) {
                        log::error!("could not restore {}: {rollback}", old_file.display());
                    }
                }
                return Err(relocation_error(old_dir, new_dir, &err));
            }
        }
    }
    Ok(())
}
