//! A Mach-O style export trie: insertion (`put`), fixed-point layout
//! (`finalize`), and a ULEB128 binary codec (`write`/`read`).
//!
//! No thread ever shares an `ExportTrie`; insertion, layout, and
//! serialization are all synchronous, ordinary procedure calls.

mod codec;
mod finalize;
mod node;

pub use codec::{ByteReader, ByteWriter, ReadError};
pub use node::{ExportTrie, Terminal, EXPORT_SYMBOL_FLAGS_REEXPORT, EXPORT_SYMBOL_FLAGS_STUB_AND_RESOLVER};
