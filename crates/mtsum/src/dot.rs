//! DOT rendering of the finished task graph
//!
//! Mirrors the dataflow that built the tree: a synthetic `setup` task (the
//! buffer-pool initialization) precedes the root task, and every tree node
//! appears as the task that computed it, labeled with its digest hex. Node
//! ids are sequential because identical blocks produce identical digests.

use std::fmt::Write;

use crate::tree::{MerkleTree, Node};

/// Render the tree's task graph as a DOT document.
pub fn render(tree: &MerkleTree) -> String {
    let mut out = String::from("digraph merkle_tree {\n");
    out.push_str("  setup [shape=box];\n");

    if let Some(root) = &tree.root {
        out.push_str("  setup -> n0;\n");
        let mut next_id = 0;
        render_node(&mut out, root, &mut next_id);
    }

    out.push_str("}\n");
    out
}

fn render_node(out: &mut String, node: &Node, next_id: &mut usize) -> usize {
    let id = *next_id;
    *next_id += 1;
    writeln!(out, "  n{} [label=\"{}\"];", id, node.hex()).unwrap();

    if let (Some(left), Some(right)) = (&node.left, &node.right) {
        let left_id = render_node(out, left, next_id);
        writeln!(out, "  n{id} -> n{left_id};").unwrap();
        let right_id = render_node(out, right, next_id);
        writeln!(out, "  n{id} -> n{right_id};").unwrap();
    }

    id
}
