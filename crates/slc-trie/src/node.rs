//! The owned-graph node arena and insertion (`spec.md` §4.10).
//!
//! Nodes live in a flat `Vec`, addressed by index rather than pointer, so
//! `finalize` can mutate offsets in place without fighting the borrow
//! checker over a tree of boxed nodes. Index 0 is always the root.

/// An export symbol's terminal payload: flags plus the address it resolves
/// to relative to the image's load address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminal {
    pub flags: u64,
    pub vmaddr_offset: u64,
}

/// An owned edge: a label (a slice of the inserted symbol name) plus the
/// index of the child node it leads to.
#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub label: Vec<u8>,
    pub child: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    pub terminal: Option<Terminal>,
    pub edges: Vec<Edge>,
    /// Byte offset of this node in the serialized stream, assigned by
    /// `finalize`. Stale (or zero, before the first `finalize`) otherwise.
    pub offset: u64,
    /// Set whenever this node's payload or edges change; cleared once a
    /// `finalize` pass leaves it untouched.
    pub dirty: bool,
}

/// `EXPORT_SYMBOL_FLAGS_REEXPORT` (from Mach-O's `nlist.h`): the symbol is a
/// re-export of a symbol from another image. Not supported (`spec.md` §9).
pub const EXPORT_SYMBOL_FLAGS_REEXPORT: u64 = 0x08;

/// `EXPORT_SYMBOL_FLAGS_STUB_AND_RESOLVER`: the symbol is a stub with a
/// resolver function. Not supported (`spec.md` §9).
pub const EXPORT_SYMBOL_FLAGS_STUB_AND_RESOLVER: u64 = 0x10;

const UNSUPPORTED_FLAGS: u64 = EXPORT_SYMBOL_FLAGS_REEXPORT | EXPORT_SYMBOL_FLAGS_STUB_AND_RESOLVER;

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// An export trie: a radix tree over symbol name bytes, with an optional
/// export payload at each node that terminates a name.
#[derive(Debug)]
pub struct ExportTrie {
    pub(crate) nodes: Vec<Node>,
    /// DFS preorder over `nodes`, populated by `finalize`; `write` walks
    /// this order.
    pub(crate) dfs_order: Vec<usize>,
    pub(crate) size: u64,
    pub(crate) dirty: bool,
}

impl Default for ExportTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportTrie {
    /// An empty trie: a single root node with no edges or payload. `dirty`
    /// starts `true` so `write` still requires a `finalize` call first, even
    /// with no symbols inserted yet.
    pub fn new() -> Self {
        ExportTrie { nodes: vec![Node::default()], dfs_order: Vec::new(), size: 0, dirty: true }
    }

    /// Number of nodes currently in the trie, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total size in bytes of the last `finalize`d layout. Stale until the
    /// first `finalize` call.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether an insertion has happened since the last `finalize`.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reconstructs every inserted symbol and its terminal payload by
    /// walking each root-to-terminal path and concatenating edge labels.
    /// Not part of the binary format; this is purely for introspection
    /// (used by `slc-cli`'s `trie dump`).
    pub fn symbols(&self) -> Vec<(Vec<u8>, Terminal)> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        self.collect_symbols(0, &mut prefix, &mut out);
        out
    }

    fn collect_symbols(&self, idx: usize, prefix: &mut Vec<u8>, out: &mut Vec<(Vec<u8>, Terminal)>) {
        if let Some(t) = self.nodes[idx].terminal {
            out.push((prefix.clone(), t));
        }
        for edge in &self.nodes[idx].edges {
            let before = prefix.len();
            prefix.extend_from_slice(&edge.label);
            self.collect_symbols(edge.child, prefix, out);
            prefix.truncate(before);
        }
    }

    /// Inserts `name` with the given export payload, splicing edges as
    /// needed (`spec.md` §4.10). Re-inserting an identical name updates its
    /// payload without allocating a new node.
    pub fn put(&mut self, name: &[u8], flags: u64, vmaddr_offset: u64) {
        assert!(flags & UNSUPPORTED_FLAGS == 0, "REEXPORT/STUB_AND_RESOLVER export flags are not supported");
        let idx = self.insert_label(0, name);
        self.nodes[idx].terminal = Some(Terminal { flags, vmaddr_offset });
        self.nodes[idx].dirty = true;
        self.dirty = true;
    }

    fn alloc_node(&mut self) -> usize {
        self.nodes.push(Node { dirty: true, ..Node::default() });
        self.nodes.len() - 1
    }

    fn insert_label(&mut self, node_idx: usize, remaining: &[u8]) -> usize {
        let matched = self.nodes[node_idx]
            .edges
            .iter()
            .position(|edge| common_prefix_len(&edge.label, remaining) > 0);

        let Some(i) = matched else {
            let leaf = self.alloc_node();
            self.nodes[node_idx].edges.push(Edge { label: remaining.to_vec(), child: leaf });
            self.nodes[node_idx].dirty = true;
            return leaf;
        };

        let edge_label = self.nodes[node_idx].edges[i].label.clone();
        let shared = common_prefix_len(&edge_label, remaining);

        if shared == edge_label.len() && shared == remaining.len() {
            // Exact match: the symbol already has an edge ending here.
            return self.nodes[node_idx].edges[i].child;
        }

        if shared == edge_label.len() {
            // The edge label is a prefix of what's left to insert; descend.
            let child = self.nodes[node_idx].edges[i].child;
            return self.insert_label(child, &remaining[shared..]);
        }

        // Edge and remaining share a prefix shorter than the edge label:
        // splice in a new intermediate node.
        let old_child = self.nodes[node_idx].edges[i].child;
        let mid = self.alloc_node();
        self.nodes[node_idx].edges[i].label = edge_label[..shared].to_vec();
        self.nodes[node_idx].edges[i].child = mid;
        self.nodes[node_idx].dirty = true;
        self.nodes[mid].edges.push(Edge { label: edge_label[shared..].to_vec(), child: old_child });
        self.nodes[mid].dirty = true;

        if shared == remaining.len() {
            mid
        } else {
            let leaf = self.alloc_node();
            self.nodes[mid].edges.push(Edge { label: remaining[shared..].to_vec(), child: leaf });
            leaf
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinserting_identical_symbol_does_not_grow_node_count() {
        let mut trie = ExportTrie::new();
        trie.put(b"_main", 0, 0x1000);
        let count = trie.node_count();
        trie.put(b"_main", 0, 0x1000);
        assert_eq!(trie.node_count(), count);
    }

    #[test]
    fn splicing_a_shared_prefix_adds_exactly_one_node() {
        let mut trie = ExportTrie::new();
        trie.put(b"_st", 0, 0);
        let before = trie.node_count();
        trie.put(b"_start", 0, 1);
        assert_eq!(trie.node_count(), before + 1);

        // root -> "_st" -> (terminal, edge "art" -> terminal)
        let root = &trie.nodes[0];
        assert_eq!(root.edges.len(), 1);
        assert_eq!(root.edges[0].label, b"_st");
        let mid = &trie.nodes[root.edges[0].child];
        assert!(mid.terminal.is_some());
        assert_eq!(mid.edges.len(), 1);
        assert_eq!(mid.edges[0].label, b"art");
    }

    #[test]
    fn disjoint_symbols_each_get_their_own_root_edge() {
        let mut trie = ExportTrie::new();
        trie.put(b"_foo", 0, 0);
        trie.put(b"_bar", 0, 0);
        // "_foo" and "_bar" share only the leading "_".
        assert_eq!(trie.nodes[0].edges.len(), 1);
        let mid = trie.nodes[0].edges[0].child;
        assert_eq!(trie.nodes[mid].edges.len(), 2);
    }

    #[test]
    fn symbols_reconstructs_full_names_from_edge_labels() {
        let mut trie = ExportTrie::new();
        trie.put(b"_main", 0, 0x1000);
        trie.put(b"__mh_execute_header", 0, 0x0);
        let mut symbols = trie.symbols();
        symbols.sort();
        assert_eq!(
            symbols,
            vec![
                (b"__mh_execute_header".to_vec(), Terminal { flags: 0, vmaddr_offset: 0x0 }),
                (b"_main".to_vec(), Terminal { flags: 0, vmaddr_offset: 0x1000 }),
            ]
        );
    }

    #[test]
    #[should_panic]
    fn reexport_flag_is_rejected() {
        let mut trie = ExportTrie::new();
        trie.put(b"_weird", EXPORT_SYMBOL_FLAGS_REEXPORT, 0);
    }

    #[test]
    fn dropping_a_large_trie_does_not_panic() {
        // Ownership is a plain `Vec`, so dropping this releases every
        // label buffer and node in one pass; nothing here is reference
        // counted or leaked through an `unsafe` escape hatch.
        let mut trie = ExportTrie::new();
        for i in 0..5000u32 {
            trie.put(format!("_sym_{i}").as_bytes(), 0, i as u64);
        }
        drop(trie);
    }
}
