//! `workbench tree`: file tree viewer over [`PathTree`].
//!
//! The directory listing plays the external hierarchy source; collapse and
//! selection flags are applied as tree transitions before rendering.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use clap::Args;
use tracing::debug;

use workbench_core::tree::COLLAPSED;
use workbench_core::{AttrValue, Node, PathTree, TreePath};

/// Default cap on listed filesystem entries.
pub const DEFAULT_MAX_ENTRIES: usize = 5_000;

/// Arguments for the tree subcommand.
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Directory to list
    pub dir: std::path::PathBuf,
    /// Collapse a directory, relative to DIR (repeatable)
    #[arg(long = "collapse", value_name = "PATH")]
    pub collapse: Vec<String>,
    /// Mark a path as selected, relative to DIR
    #[arg(long, value_name = "PATH")]
    pub select: Option<String>,
    /// Stop listing after this many entries
    #[arg(long, default_value_t = DEFAULT_MAX_ENTRIES)]
    pub max_entries: usize,
    /// Print the resulting tree as JSON instead of rows
    #[arg(long)]
    pub json: bool,
}

/// Execute the tree subcommand.
pub fn run(args: &TreeArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let root = build_tree(&args.dir, args.max_entries)?;
    let root_name = root.name().to_string();

    let mut tree = PathTree::from_root(root);
    for rel in &args.collapse {
        tree = tree.set_attribute(&resolve(&root_name, rel), COLLAPSED, true);
    }
    if let Some(rel) = &args.select {
        tree = tree.select(resolve(&root_name, rel));
    }

    if args.json {
        serde_json::to_writer_pretty(&mut *out, tree.roots())?;
        writeln!(out)?;
    } else {
        render(&tree, out)?;
    }
    Ok(())
}

/// Path of `rel` (slash separated, relative to the listed directory).
pub fn resolve(root_name: &str, rel: &str) -> TreePath {
    TreePath::parse(rel)
        .segments()
        .iter()
        .fold(TreePath::new([root_name]), |path, segment| {
            path.join(segment.clone())
        })
}

/// Print visible rows, indented by depth.
///
/// `+` marks a collapsed directory, `-` an expanded one and `>` the selected
/// row.
pub fn render(tree: &PathTree, out: &mut impl Write) -> std::io::Result<()> {
    let selected = tree.selected_path();
    for row in tree.visible() {
        let cursor = if selected == Some(&row.path) { '>' } else { ' ' };
        let marker = if row.node.is_leaf() {
            ' '
        } else if row.node.attr(COLLAPSED).is_some_and(AttrValue::is_truthy) {
            '+'
        } else {
            '-'
        };
        let indent = "  ".repeat(row.depth);
        writeln!(out, "{cursor}{indent}{marker} {}", row.node.name())?;
    }
    Ok(())
}

/// List `root` into a node hierarchy. Directories become branches, files and
/// symlinks leaves; entries are sorted by name.
pub fn build_tree(root: &Path, max_entries: usize) -> anyhow::Result<Node> {
    let name = root
        .file_name()
        .map_or_else(|| root.display().to_string(), |n| n.to_string_lossy().into_owned());
    let mut count = 0;
    let children = walk_dir(root, max_entries, &mut count)?;
    debug!(root = %root.display(), entries = count, "Listed directory");
    Ok(Node::branch(name, children))
}

fn walk_dir(dir: &Path, max_entries: usize, count: &mut usize) -> anyhow::Result<Vec<Node>> {
    let read_dir = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;
    let mut entries: Vec<_> = read_dir.flatten().collect();
    entries.sort_by_key(std::fs::DirEntry::file_name);

    let mut nodes = Vec::new();
    for entry in entries {
        if *count >= max_entries {
            break;
        }
        *count += 1;

        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let children = walk_dir(&entry.path(), max_entries, count)?;
            nodes.push(Node::branch(name, children));
        } else {
            nodes.push(Node::leaf(name));
        }
    }
    Ok(nodes)
}
