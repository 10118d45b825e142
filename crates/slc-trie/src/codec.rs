//! Binary format (`spec.md` §4.12, §6): per node, a terminal-info prefix,
//! an edge count, then one `label NUL child_offset` triple per edge.

use crate::node::{Edge, ExportTrie, Node, Terminal, EXPORT_SYMBOL_FLAGS_REEXPORT, EXPORT_SYMBOL_FLAGS_STUB_AND_RESOLVER};
use std::io::Cursor;

/// Sink the writer abstraction used by `ExportTrie::write` (`spec.md` §6).
pub trait ByteWriter {
    fn write_byte(&mut self, byte: u8);
    fn write_all(&mut self, bytes: &[u8]);
    fn write_uleb128(&mut self, value: u64);
    fn bytes_written(&self) -> usize;
}

impl ByteWriter for Vec<u8> {
    fn write_byte(&mut self, byte: u8) {
        self.push(byte);
    }

    fn write_all(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn write_uleb128(&mut self, value: u64) {
        slc_base::uleb128::encode(value, self);
    }

    fn bytes_written(&self) -> usize {
        self.len()
    }
}

/// Errors surfaced while reading a trie from a byte stream (`spec.md` §7).
/// Unrecoverable: the caller gets `Err` and the read is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    UnexpectedEof,
    Overflow,
    /// The stream's flags set the `REEXPORT` or `STUB_AND_RESOLVER` bit,
    /// which this implementation does not support in either direction
    /// (`spec.md` §9).
    UnsupportedFlags,
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::UnexpectedEof => write!(f, "unexpected end of stream while reading export trie"),
            ReadError::Overflow => write!(f, "uleb128 value overflows u64 while reading export trie"),
            ReadError::UnsupportedFlags => write!(f, "export trie uses unsupported REEXPORT/STUB_AND_RESOLVER flags"),
        }
    }
}

impl std::error::Error for ReadError {}

impl From<slc_base::uleb128::DecodeError> for ReadError {
    fn from(e: slc_base::uleb128::DecodeError) -> Self {
        match e {
            slc_base::uleb128::DecodeError::UnexpectedEof => ReadError::UnexpectedEof,
            slc_base::uleb128::DecodeError::Overflow => ReadError::Overflow,
        }
    }
}

/// Source abstraction used by `ExportTrie::read` (`spec.md` §6).
pub trait ByteReader {
    fn read_byte(&mut self) -> Result<u8, ReadError>;
    fn read_uleb128(&mut self) -> Result<u64, ReadError>;
    fn get_position(&self) -> u64;
    fn seek_to(&mut self, pos: u64);
}

impl<'a> ByteReader for Cursor<&'a [u8]> {
    fn read_byte(&mut self) -> Result<u8, ReadError> {
        let pos = self.position() as usize;
        let byte = *self.get_ref().get(pos).ok_or(ReadError::UnexpectedEof)?;
        self.set_position(pos as u64 + 1);
        Ok(byte)
    }

    fn read_uleb128(&mut self) -> Result<u64, ReadError> {
        let pos = self.position() as usize;
        let slice = self.get_ref().get(pos..).ok_or(ReadError::UnexpectedEof)?;
        let (value, consumed) = slc_base::uleb128::decode(slice)?;
        self.set_position((pos + consumed) as u64);
        Ok(value)
    }

    fn get_position(&self) -> u64 {
        self.position()
    }

    fn seek_to(&mut self, pos: u64) {
        self.set_position(pos);
    }
}

fn read_label<R: ByteReader>(reader: &mut R) -> Result<Vec<u8>, ReadError> {
    let mut label = Vec::new();
    loop {
        let byte = reader.read_byte()?;
        if byte == 0 {
            return Ok(label);
        }
        label.push(byte);
    }
}

impl ExportTrie {
    /// Serializes the finalized layout in DFS order. Panics if `finalize`
    /// hasn't run since the last `put` (`spec.md` §5: any `finalize`/`write`
    /// pair must execute without intervening insertions).
    pub fn write<W: ByteWriter>(&self, writer: &mut W) {
        assert!(!self.dirty, "write called on a trie with insertions since the last finalize");
        for &idx in &self.dfs_order {
            write_node(&self.nodes, idx, writer);
        }
    }

    /// Reads a trie previously produced by `write`, rebuilding an
    /// equivalent (but freshly indexed) node arena.
    pub fn read<R: ByteReader>(reader: &mut R) -> Result<ExportTrie, ReadError> {
        let mut nodes = Vec::new();
        read_node(reader, &mut nodes)?;
        Ok(ExportTrie { nodes, dfs_order: Vec::new(), size: 0, dirty: true })
    }
}

fn write_node<W: ByteWriter>(nodes: &[Node], idx: usize, writer: &mut W) {
    let node = &nodes[idx];
    match node.terminal {
        Some(Terminal { flags, vmaddr_offset }) => {
            assert!(
                flags & (EXPORT_SYMBOL_FLAGS_REEXPORT | EXPORT_SYMBOL_FLAGS_STUB_AND_RESOLVER) == 0,
                "REEXPORT/STUB_AND_RESOLVER export flags are not supported"
            );
            let inner = slc_base::uleb128::encoded_len(flags) + slc_base::uleb128::encoded_len(vmaddr_offset);
            writer.write_uleb128(inner as u64);
            writer.write_uleb128(flags);
            writer.write_uleb128(vmaddr_offset);
        }
        None => writer.write_byte(0),
    }

    assert!(node.edges.len() <= 255, "export trie node has more than 255 outgoing edges");
    writer.write_byte(node.edges.len() as u8);
    for edge in &node.edges {
        write_edge(nodes, edge, writer);
    }
}

fn write_edge<W: ByteWriter>(nodes: &[Node], edge: &Edge, writer: &mut W) {
    writer.write_all(&edge.label);
    writer.write_byte(0);
    writer.write_uleb128(nodes[edge.child].offset);
}

fn read_node<R: ByteReader>(reader: &mut R, nodes: &mut Vec<Node>) -> Result<usize, ReadError> {
    let size = reader.read_uleb128()?;
    let terminal = if size != 0 {
        let flags = reader.read_uleb128()?;
        if flags & (EXPORT_SYMBOL_FLAGS_REEXPORT | EXPORT_SYMBOL_FLAGS_STUB_AND_RESOLVER) != 0 {
            return Err(ReadError::UnsupportedFlags);
        }
        let vmaddr_offset = reader.read_uleb128()?;
        Some(Terminal { flags, vmaddr_offset })
    } else {
        None
    };

    let idx = nodes.len();
    nodes.push(Node { terminal, edges: Vec::new(), offset: 0, dirty: false });

    let edge_count = reader.read_byte()?;
    for _ in 0..edge_count {
        let label = read_label(reader)?;
        let child_offset = reader.read_uleb128()?;
        let resume_at = reader.get_position();
        reader.seek_to(child_offset);
        let child = read_node(reader, nodes)?;
        reader.seek_to(resume_at);
        nodes[idx].edges.push(Edge { label, child });
    }

    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ExportTrie;

    #[test]
    fn round_trips_through_write_and_read() {
        let mut trie = ExportTrie::new();
        trie.put(b"_foo", 0, 10);
        trie.put(b"_foobar", 0, 20);
        trie.put(b"_baz", 0, 30);
        trie.finalize();

        let mut bytes = Vec::new();
        trie.write(&mut bytes);

        let mut read_back = ExportTrie::read(&mut Cursor::new(bytes.as_slice())).unwrap();
        read_back.finalize();

        let mut bytes_again = Vec::new();
        read_back.write(&mut bytes_again);
        assert_eq!(bytes, bytes_again);
    }

    #[test]
    fn rejects_truncated_streams() {
        let err = ExportTrie::read(&mut Cursor::new(&[0x80u8][..])).unwrap_err();
        assert_eq!(err, ReadError::UnexpectedEof);
    }

    #[test]
    fn matches_the_literal_two_symbol_scenario() {
        // `spec.md` §8: insert `__mh_execute_header@0x0` and `_main@0x1000`.
        let mut trie = ExportTrie::new();
        trie.put(b"__mh_execute_header", 0, 0x0);
        trie.put(b"_main", 0, 0x1000);
        trie.finalize();

        let mut bytes = Vec::new();
        trie.write(&mut bytes);

        #[rustfmt::skip]
        let expected: [u8; 42] = [
            0x00, 0x01, 0x5F, 0x00, 0x05, 0x00, 0x02, 0x5F, 0x6D, 0x68,
            0x5F, 0x65, 0x78, 0x65, 0x63, 0x75, 0x74, 0x65, 0x5F, 0x68,
            0x65, 0x61, 0x64, 0x65, 0x72, 0x00, 0x21, 0x6D, 0x61, 0x69,
            0x6E, 0x00, 0x25, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x80,
            0x20, 0x00,
        ];
        assert_eq!(bytes, expected);
    }
}
