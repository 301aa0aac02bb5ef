use std::{fs, path::Path};

use anyhow::Context;
use icy_tile_engine::{
    project::{ImageProjectModel, NodeId, ProjectBuild, ProjectTree, ProjectTreeBuilder},
    CodecFactory, DefaultCodecFactory, DirectImage, IndexedImage, PixelColorType,
};

use crate::{png_export, Options};

/// Reads a project definition. A relative or missing root is resolved against the file's directory.
pub fn load_project(path: &Path) -> anyhow::Result<ImageProjectModel> {
    let text = fs::read_to_string(path).with_context(|| format!("reading project {}", path.display()))?;
    let mut model: ImageProjectModel = toml::from_str(&text).with_context(|| format!("parsing project {}", path.display()))?;
    if model.root.is_relative() {
        if let Some(dir) = path.parent() {
            model.root = dir.join(&model.root);
        }
    }
    Ok(model)
}

fn build_project(path: &Path, options: &Options) -> anyhow::Result<ProjectBuild> {
    let model = load_project(path)?;
    let factory = DefaultCodecFactory::new();
    let builder = ProjectTreeBuilder::new(&factory, options.default_palette().into_iter().collect());
    let build = builder.build(&model);
    for failure in &build.failures {
        eprintln!("warning: {failure}");
    }
    Ok(build)
}

fn print_node(tree: &ProjectTree, node: NodeId, depth: usize) {
    let Some(resource_node) = tree.node(node) else {
        return;
    };
    println!("{}{} [{}]", "  ".repeat(depth), resource_node.name(), resource_node.kind());
    for child in resource_node.children() {
        print_node(tree, *child, depth + 1);
    }
}

pub fn info(path: &Path, options: &Options) -> anyhow::Result<()> {
    let build = build_project(path, options)?;
    print_node(&build.tree, build.tree.root(), 0);
    println!("{} resources, {} failures", build.tree.node_count() - 1, build.failures.len());
    Ok(())
}

pub fn codecs() {
    let factory = DefaultCodecFactory::new();
    for name in factory.codec_names() {
        let Some(size) = factory.default_size(&name) else {
            continue;
        };
        match factory.get_codec(&name, size) {
            Ok(codec) => println!(
                "{:<16} {:>3} bpp  {:<8} {:?}{}",
                codec.name(),
                codec.color_depth(),
                size.to_string(),
                codec.layout(),
                if codec.can_resize() { "  resizable" } else { "" }
            ),
            Err(err) => log::warn!("codec '{name}' unavailable: {err}"),
        }
    }
}

pub fn render(path: &Path, arranger_key: &str, output: &Path, scale: Option<u32>, options: &Options) -> anyhow::Result<()> {
    let build = build_project(path, options)?;
    let arranger = build
        .tree
        .get_arranger(arranger_key)
        .with_context(|| format!("no arranger '{arranger_key}' in project '{}'", build.tree.name()))?;

    let color_type = arranger.lock().color_type();
    let (width, height, rgba) = match color_type {
        PixelColorType::Indexed => {
            let image = IndexedImage::new(arranger, options.default_palette())?;
            (image.width(), image.height(), image.export_rgba()?)
        }
        PixelColorType::Direct => {
            let image = DirectImage::new(arranger)?;
            (image.width(), image.height(), image.export_rgba())
        }
    };

    let scale = scale.unwrap_or(options.png_scale).max(1) as usize;
    let scaled = png_export::scale_rgba(&rgba, width, height, scale);
    png_export::write_png(output, width * scale, height * scale, &scaled)?;
    log::info!("exported '{arranger_key}' ({width}x{height}) to {}", output.display());
    Ok(())
}

pub fn remove_preview(path: &Path, node_key: &str, options: &Options) -> anyhow::Result<()> {
    let build = build_project(path, options)?;
    let tree = &build.tree;
    let node = tree
        .find_node(node_key)
        .with_context(|| format!("no resource '{node_key}' in project '{}'", tree.name()))?;
    let changes = tree.get_secondary_resource_removal_changes(node)?;

    println!("{:<40} {:<10} {:>8} {:>13} {:>14}", "Resource", "Kind", "Removed", "Lost palette", "Lost elements");
    for change in changes {
        println!(
            "{:<40} {:<10} {:>8} {:>13} {:>14}",
            change.path_key,
            change.kind.to_string(),
            change.removed,
            change.lost_palette,
            change.lost_elements
        );
    }
    Ok(())
}
