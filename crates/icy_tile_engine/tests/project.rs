mod common;

use std::path::Path;

use common::{gray_palette, pattern_bytes, temp_dir};
use icy_tile_engine::{
    project::{ImageProject, ImageProjectModel, NodeId, ProjectTree, ProjectTreeBuilder, ResourceChange, ResourceFolder, ResourceKind},
    Arranger, ArrangerElement, CodecFactory, ColorModel, DataFile, DataFileRef, DefaultCodecFactory, EngineError, FileBitAddress, ImageLayout, Palette,
    PaletteRef, PaletteState, PixelColorType, Size,
};
use pretty_assertions::assert_eq;

fn data_file(name: &str) -> DataFileRef {
    DataFile::from_bytes(name, pattern_bytes(128, 3)).into_ref()
}

fn file_palette(name: &str, df: &DataFileRef) -> PaletteRef {
    let mut palette = Palette::new(name, ColorModel::Bgr15, FileBitAddress::default(), 4, true).unwrap();
    palette.lazy_load_palette(df.clone(), FileBitAddress::default(), ColorModel::Bgr15, true, 4).unwrap();
    palette.into_ref()
}

/// Arranger with one NES tile per file in `files`.
fn arranger(name: &str, files: &[&DataFileRef], palette: &PaletteRef) -> Arranger {
    let factory = DefaultCodecFactory::new();
    let mut arranger = Arranger::new(name, PixelColorType::Indexed, ImageLayout::Tiled, Size::new(files.len(), 1), Size::new(8, 8)).unwrap();
    for (x, df) in files.iter().enumerate() {
        let codec = factory.get_codec("NES 2bpp", Size::new(8, 8)).unwrap();
        let element = ArrangerElement::new(0, 0, Some((*df).clone()), FileBitAddress::new(16, 0), codec, Some(palette.clone()));
        arranger.set_element(x, 0, element).unwrap();
    }
    arranger
}

fn named_palette(name: &str) -> PaletteRef {
    let palette = gray_palette();
    palette.lock().set_name(name);
    palette
}

fn tree_at(base: &Path) -> ProjectTree {
    ProjectTree::new(ImageProject::new("Demo", base))
}

fn memory_tree() -> ProjectTree {
    tree_at(&std::env::temp_dir().join("icy_tile_memory_only"))
}

fn change_for(changes: &[ResourceChange], node: NodeId) -> &ResourceChange {
    changes.iter().find(|c| c.node == node).unwrap()
}

#[test]
fn removing_data_file_cascades_to_palette() {
    let mut tree = memory_tree();
    let root = tree.root();
    let rom = data_file("rom");
    let gfx = data_file("gfx");
    let rom_node = tree.add_resource(root, rom.clone()).unwrap();
    tree.add_resource(root, gfx.clone()).unwrap();
    let palette = file_palette("Pal", &rom);
    let palette_node = tree.add_resource(root, palette.clone()).unwrap();
    let sprites = arranger("Sprites", &[&gfx, &gfx], &palette).into_ref();
    let sprites_node = tree.add_resource(root, sprites.clone()).unwrap();

    let changes = tree.get_secondary_resource_removal_changes(rom_node).unwrap();
    assert_eq!(changes.len(), 3);
    assert!(change_for(&changes, rom_node).removed);
    assert!(change_for(&changes, palette_node).removed);
    let sprites_change = change_for(&changes, sprites_node);
    assert!(sprites_change.lost_palette);
    assert!(!sprites_change.lost_elements);
    assert!(!sprites_change.removed);
    assert_eq!(sprites_change.path_key, "/Sprites");

    // computing the changes does not touch the tree
    assert_eq!(tree.node_count(), 5);

    tree.apply_removal_changes(&changes).unwrap();
    assert_eq!(tree.node_count(), 3);
    assert!(!tree.contains_node(rom_node));
    assert!(!tree.contains_node(palette_node));
    assert!(tree.contains_node(sprites_node));
    assert!(!tree.contains_resource(palette.id()));
    assert!(tree.contains_resource(gfx.id()));
    assert!(sprites.lock().enumerate_elements().all(|el| el.palette().is_none()));
    assert!(palette.lock().data_file().is_none());
}

#[test]
fn arranger_without_remaining_data_is_removed() {
    let mut tree = memory_tree();
    let root = tree.root();
    let gfx = data_file("gfx");
    let other = data_file("other");
    let gfx_node = tree.add_resource(root, gfx.clone()).unwrap();
    tree.add_resource(root, other.clone()).unwrap();
    let palette = gray_palette();
    tree.add_resource(root, palette.clone()).unwrap();
    let gone = tree.add_resource(root, arranger("Gone", &[&gfx, &gfx], &palette).into_ref()).unwrap();
    let mixed = arranger("Mixed", &[&gfx, &other], &palette).into_ref();
    let mixed_node = tree.add_resource(root, mixed.clone()).unwrap();

    let changes = tree.get_secondary_resource_removal_changes(gfx_node).unwrap();
    let gone_change = change_for(&changes, gone);
    assert!(gone_change.lost_elements && gone_change.removed);
    assert!(!gone_change.lost_palette);
    let mixed_change = change_for(&changes, mixed_node);
    assert!(mixed_change.lost_elements && !mixed_change.removed);

    tree.apply_removal_changes(&changes).unwrap();
    assert!(!tree.contains_node(gone));
    let mixed = mixed.lock();
    assert!(mixed.get_element(0, 0).unwrap().unwrap().data_file().is_none());
    assert!(mixed.get_element(1, 0).unwrap().unwrap().data_file().is_some());
}

#[test]
fn removing_folder_removes_subtree() {
    let mut tree = memory_tree();
    let root = tree.root();
    let folder = tree.add_resource(root, ResourceFolder::new("Graphics")).unwrap();
    let inner = tree.add_resource(folder, ResourceFolder::new("Inner")).unwrap();
    let rom = data_file("rom");
    let rom_node = tree.add_resource(inner, rom.clone()).unwrap();
    let palette = file_palette("Pal", &rom);
    let palette_node = tree.add_resource(root, palette).unwrap();

    let changes = tree.get_secondary_resource_removal_changes(folder).unwrap();
    let removed: Vec<NodeId> = changes.iter().filter(|c| c.removed).map(|c| c.node).collect();
    assert_eq!(removed, vec![folder, inner, rom_node, palette_node]);
    assert_eq!(changes[0].kind, ResourceKind::Folder);

    tree.apply_removal_changes(&changes).unwrap();
    assert_eq!(tree.node_count(), 1);
    // the same changes cannot be applied twice
    assert!(matches!(tree.apply_removal_changes(&changes), Err(EngineError::NodeNotInTree { .. })));
}

#[test]
fn root_cannot_be_removed() {
    let tree = memory_tree();
    assert!(matches!(tree.get_secondary_resource_removal_changes(tree.root()), Err(EngineError::NoParent { .. })));
}

#[test]
fn move_prevents_cycles() {
    let mut tree = memory_tree();
    let root = tree.root();
    let outer = tree.add_resource(root, ResourceFolder::new("Outer")).unwrap();
    let inner = tree.add_resource(outer, ResourceFolder::new("Inner")).unwrap();
    let deepest = tree.add_resource(inner, ResourceFolder::new("Deepest")).unwrap();

    assert!(matches!(tree.can_move_node(outer, deepest), Err(EngineError::MoveUnderDescendant { .. })));
    assert!(matches!(tree.can_move_node(outer, outer), Err(EngineError::MoveOntoSelf { .. })));
    assert!(matches!(tree.can_move_node(inner, outer), Err(EngineError::MoveOntoSelf { .. })));
    assert!(matches!(tree.can_move_node(root, outer), Err(EngineError::NoParent { .. })));
    assert!(matches!(tree.move_node(outer, inner), Err(EngineError::MoveUnderDescendant { .. })));
    assert_eq!(tree.path_key(deepest).unwrap(), "/Outer/Inner/Deepest");
}

#[test]
fn name_collision_leaves_tree_unchanged() {
    let mut tree = memory_tree();
    let root = tree.root();
    let folder = tree.add_resource(root, ResourceFolder::new("Folder")).unwrap();
    tree.add_resource(root, named_palette("Sprite")).unwrap();
    let inner = tree.add_resource(folder, named_palette("Sprite")).unwrap();
    let count = tree.node_count();

    assert!(matches!(tree.add_resource(root, named_palette("Sprite")), Err(EngineError::NameCollision { .. })));
    assert!(matches!(tree.move_node(inner, root), Err(EngineError::NameCollision { .. })));
    assert_eq!(tree.node_count(), count);
    assert_eq!(tree.path_key(inner).unwrap(), "/Folder/Sprite");
}

#[test]
fn move_relocates_descriptor_files() {
    let base = temp_dir("move_node");
    let mut tree = tree_at(&base);
    let root = tree.root();
    let graphics = tree.add_resource(root, ResourceFolder::new("Graphics")).unwrap();
    let archive = tree.add_resource(root, ResourceFolder::new("Archive")).unwrap();
    let palette = tree.add_resource(graphics, named_palette("Pal")).unwrap();

    std::fs::create_dir_all(base.join("Graphics")).unwrap();
    std::fs::write(base.join("Graphics.xml"), "folder").unwrap();
    std::fs::write(base.join("Graphics/Pal.xml"), "palette").unwrap();

    tree.move_node(palette, root).unwrap();
    assert!(base.join("Pal.xml").exists());
    assert!(!base.join("Graphics/Pal.xml").exists());
    assert_eq!(tree.node(palette).unwrap().file_location(), base.join("Pal.xml"));

    tree.move_node(palette, graphics).unwrap();
    tree.move_node(graphics, archive).unwrap();
    assert!(base.join("Archive/Graphics.xml").exists());
    assert!(base.join("Archive/Graphics/Pal.xml").exists());
    assert_eq!(tree.path_key(palette).unwrap(), "/Archive/Graphics/Pal");
    assert_eq!(tree.node(palette).unwrap().file_location(), base.join("Archive/Graphics/Pal.xml"));

    std::fs::remove_dir_all(base).unwrap();
}

#[test]
fn failed_relocation_keeps_tree() {
    let base = temp_dir("move_fail");
    let mut tree = tree_at(&base);
    let root = tree.root();
    let graphics = tree.add_resource(root, ResourceFolder::new("Graphics")).unwrap();
    let blocked = tree.add_resource(root, ResourceFolder::new("Blocked")).unwrap();
    let palette = tree.add_resource(graphics, named_palette("Pal")).unwrap();

    std::fs::create_dir_all(base.join("Graphics")).unwrap();
    std::fs::write(base.join("Graphics/Pal.xml"), "palette").unwrap();
    // a plain file where the folder directory would be
    std::fs::write(base.join("Blocked"), "not a directory").unwrap();

    assert!(matches!(tree.move_node(palette, blocked), Err(EngineError::RelocationFailed { .. })));
    assert_eq!(tree.node(palette).unwrap().parent(), Some(graphics));
    assert_eq!(tree.path_key(palette).unwrap(), "/Graphics/Pal");
    assert!(base.join("Graphics/Pal.xml").exists());

    std::fs::remove_dir_all(base).unwrap();
}

#[test]
fn rename_moves_descriptor() {
    let base = temp_dir("rename_node");
    let mut tree = tree_at(&base);
    let root = tree.root();
    let palette_ref = named_palette("Pal");
    let palette = tree.add_resource(root, palette_ref.clone()).unwrap();
    std::fs::write(base.join("Pal.xml"), "palette").unwrap();

    tree.rename_node(palette, "Sprites").unwrap();
    assert!(base.join("Sprites.xml").exists());
    assert_eq!(palette_ref.lock().name(), "Sprites");
    assert_eq!(tree.find_node("/Sprites"), Some(palette));

    let other = tree.add_resource(root, named_palette("Other")).unwrap();
    assert!(matches!(tree.rename_node(other, "Sprites"), Err(EngineError::NameCollision { .. })));
    assert!(matches!(tree.rename_node(other, ""), Err(EngineError::InvalidResourceName { .. })));

    // the root has no descriptor to move
    tree.rename_node(root, "Renamed").unwrap();
    assert_eq!(tree.name(), "Renamed");

    std::fs::remove_dir_all(base).unwrap();
}

#[test]
fn notify_marks_dependent_palettes_stale() {
    let mut tree = memory_tree();
    let root = tree.root();
    let rom = data_file("rom");
    tree.add_resource(root, rom.clone()).unwrap();
    let palette = file_palette("Pal", &rom);
    tree.add_resource(root, palette.clone()).unwrap();
    tree.add_resource(root, gray_palette()).unwrap();

    palette.lock().load().unwrap();
    assert_eq!(tree.notify_data_file_changed(rom.id()), 1);
    assert_eq!(palette.lock().state(), PaletteState::Stale);
}

const PROJECT: &str = r##"
name = "Demo"

[[folders]]
name = "Graphics"

[[data_files]]
name = "rom"
location = "rom.bin"

[[data_files]]
name = "missing"
location = "missing.bin"

[[palettes]]
name = "Pal"
parent = "/Graphics"
color_model = "Bgr15"
storage_source = "DataFile"
data_file = "/rom"
address = { file_offset = 0 }
entries = 4
zero_index_transparent = true

[[palettes]]
name = "Inline"
storage_source = "Inline"
colors = ["#000000", "#ff0000", "#00ff00", "#0000ff"]

[[arrangers]]
name = "Sprites"
parent = "/Graphics"
grid_size = { width = 2, height = 1 }
element_size = { width = 8, height = 8 }

[[arrangers.elements]]
x = 0
y = 0
codec = "NES 2bpp"
data_file = "/rom"
address = { file_offset = 16 }
palette = "/Graphics/Pal"

[[arrangers.elements]]
x = 1
y = 0
codec = "NES 2bpp"
data_file = "/rom"
address = { file_offset = 32 }
palette = "Global"

[[arrangers]]
name = "Broken"
grid_size = { width = 1, height = 1 }
element_size = { width = 8, height = 8 }

[[arrangers.elements]]
x = 0
y = 0
codec = "NES 2bpp"
data_file = "/rom"
palette = "/Nope"
"##;

#[test]
fn builder_reports_failures_and_keeps_going() {
    let base = temp_dir("builder");
    std::fs::write(base.join("rom.bin"), pattern_bytes(64, 12)).unwrap();
    let mut model: ImageProjectModel = toml::from_str(PROJECT).unwrap();
    model.root = base.clone();

    let factory = DefaultCodecFactory::new();
    let global = named_palette("Global");
    let builder = ProjectTreeBuilder::new(&factory, vec![global.clone()]);
    let build = builder.build(&model);

    assert!(!build.is_complete());
    assert_eq!(build.failures.len(), 2);
    assert!(build.failures.iter().any(|err| matches!(err, EngineError::FileNotFound { .. })));
    assert!(build.failures.iter().any(|err| matches!(err, EngineError::Resolution(_))));

    let tree = build.tree;
    assert!(tree.get_arranger("/Broken").is_none());
    assert!(tree.get_data_file("/missing").is_none());
    assert_eq!(tree.get_palette("/Inline").unwrap().lock().get(1).unwrap().r, 255);

    let sprites = tree.get_arranger("/Graphics/Sprites").unwrap();
    {
        let sprites = sprites.lock();
        let first = sprites.get_element(0, 0).unwrap().unwrap();
        assert!(first.palette().unwrap().ptr_eq(&tree.get_palette("/Graphics/Pal").unwrap()));
        let second = sprites.get_element(1, 0).unwrap().unwrap();
        assert!(second.palette().unwrap().ptr_eq(&global));
        assert_eq!((second.x1(), second.address()), (8, FileBitAddress::new(32, 0)));
    }

    // removing the rom takes the file backed palette and the arranger with it
    let rom = tree.find_node("/rom").unwrap();
    let changes = tree.get_secondary_resource_removal_changes(rom).unwrap();
    let sprites_change = changes.iter().find(|c| c.path_key == "/Graphics/Sprites").unwrap();
    assert!(sprites_change.removed && sprites_change.lost_palette && sprites_change.lost_elements);
    assert!(changes.iter().any(|c| c.path_key == "/Graphics/Pal" && c.removed));

    std::fs::remove_dir_all(base).unwrap();
}
