use std::collections::{HashMap, HashSet};

use super::{NodeId, ProjectTree, Resource, ResourceKind};
use crate::{EngineError, ResourceId, Result};

/// Effect of a pending removal on one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceChange {
    pub node: NodeId,
    pub resource: ResourceId,
    pub kind: ResourceKind,
    pub path_key: String,
    pub removed: bool,
    pub lost_palette: bool,
    pub lost_elements: bool,
}

impl ResourceChange {
    fn new(tree: &ProjectTree, node: NodeId, resource: ResourceId, kind: ResourceKind) -> Self {
        Self {
            node,
            resource,
            kind,
            path_key: tree.path_key(node).unwrap_or_default(),
            removed: false,
            lost_palette: false,
            lost_elements: false,
        }
    }

    pub fn is_changed(&self) -> bool {
        self.removed || self.lost_palette || self.lost_elements
    }
}

impl ProjectTree {
    /// Computes what removing `node` does to the rest of the tree without changing anything.
    ///
    /// The result holds one record for `node` and each of its descendants, one for every
    /// palette whose data file goes away, and one for every other node that loses a link.
    /// An arranger is removed as well when none of its elements keeps a data file.
    pub fn get_secondary_resource_removal_changes(&self, node: NodeId) -> Result<Vec<ResourceChange>> {
        if !self.contains_node(node) {
            return Err(EngineError::NodeNotInTree {
                name: node.to_string(),
                project: self.name().to_string(),
            });
        }
        if node == self.root() {
            return Err(EngineError::NoParent { name: self.name().to_string() });
        }

        let mut changes = Vec::new();
        let mut removed: HashSet<ResourceId> = HashSet::new();
        for id in self.self_and_descendants(node) {
            let Some(resource) = self.node(id).map(|n| n.resource()) else {
                continue;
            };
            let mut change = ResourceChange::new(self, id, resource.id(), resource.kind());
            change.removed = true;
            removed.insert(change.resource);
            changes.push(change);
        }

        // palettes first, arrangers depend on them being known as removed
        let nodes = self.enumerate_depth_first();
        for id in &nodes {
            let Some(Resource::Palette(palette)) = self.node(*id).map(|n| n.resource()) else {
                continue;
            };
            if removed.contains(&palette.id()) {
                continue;
            }
            let backed_by_removed = palette.lock().data_file().is_some_and(|df| removed.contains(&df.id()));
            if backed_by_removed {
                let mut change = ResourceChange::new(self, *id, palette.id(), ResourceKind::Palette);
                change.removed = true;
                removed.insert(change.resource);
                changes.push(change);
            }
        }

        let kinds: HashMap<ResourceId, ResourceKind> = nodes
            .iter()
            .filter_map(|id| self.node(*id))
            .map(|n| (n.resource().id(), n.kind()))
            .collect();

        for id in &nodes {
            let Some(resource) = self.node(*id).map(|n| n.resource()) else {
                continue;
            };
            if removed.contains(&resource.id()) {
                continue;
            }
            let Resource::Arranger(arranger) = resource else {
                continue;
            };

            let mut change = ResourceChange::new(self, *id, resource.id(), ResourceKind::Arranger);
            for link in resource.linked_resources().into_iter().filter(|link| removed.contains(link)) {
                match kinds.get(&link) {
                    Some(ResourceKind::Palette) => change.lost_palette = true,
                    Some(ResourceKind::DataFile) => change.lost_elements = true,
                    _ => {}
                }
            }
            if change.lost_elements {
                let arranger = arranger.lock();
                change.removed = arranger.enumerate_elements().all(|el| el.data_file().is_none_or(|df| removed.contains(&df.id())));
            }
            if change.is_changed() {
                changes.push(change);
            }
        }
        Ok(changes)
    }

    /// Applies changes computed by [`ProjectTree::get_secondary_resource_removal_changes`].
    ///
    /// Every changed resource first drops its links to the removed ones, then the removed nodes
    /// are detached from the tree.
    pub fn apply_removal_changes(&mut self, changes: &[ResourceChange]) -> Result<()> {
        for change in changes {
            if !self.contains_node(change.node) {
                return Err(EngineError::NodeNotInTree {
                    name: change.path_key.clone(),
                    project: self.name().to_string(),
                });
            }
        }

        let removed: Vec<ResourceId> = changes.iter().filter(|c| c.removed).map(|c| c.resource).collect();
        for change in changes.iter().filter(|c| c.is_changed()) {
            let Some(node) = self.node(change.node) else {
                continue;
            };
            for id in &removed {
                node.resource().unlink_resource(*id);
            }
        }

        for change in changes.iter().filter(|c| c.removed) {
            // descendants of an already detached node are gone with it
            if self.contains_node(change.node) {
                log::info!("removing {} '{}'", change.kind, change.path_key);
                self.detach(change.node)?;
            }
        }
        Ok(())
    }
}
