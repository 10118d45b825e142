//! Typed views over [`crate::ast::Ast::extra_data`].
//!
//! `spec.md` §3 specifies the extra arena as a flat `u32` vector holding
//! node-index lists (`SubRange`) and packed per-tag structs. This module is
//! the tag→layout table the spec requires implementers to document,
//! transcribed directly into one encode/decode pair per struct.

use crate::ast::{Ast, NodeIndex, OptionalNodeIndex, SubRange};

/// Encodes a fixed-size record of `u32` words into the extra arena,
/// returning the start index other nodes reference.
pub trait ExtraRecord: Sized {
    const LEN: u32;
    fn encode(&self) -> Vec<u32>;
    fn decode(words: &[u32]) -> Self;
}

macro_rules! extra_struct {
    ($name:ident { $($field:ident: $ty:ty),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: $ty),+
        }

        impl ExtraRecord for $name {
            const LEN: u32 = extra_struct!(@count $($field),+);

            fn encode(&self) -> Vec<u32> {
                vec![$(extra_struct!(@to_word self.$field)),+]
            }

            #[allow(unused_assignments)]
            fn decode(words: &[u32]) -> Self {
                let mut i = 0;
                $(
                    let $field = extra_struct!(@from_word $ty, words[i]);
                    i += 1;
                )+
                $name { $($field),+ }
            }
        }
    };
    (@count $first:ident $(, $rest:ident)*) => {
        1u32 $(+ extra_struct!(@count_one $rest))*
    };
    (@count_one $_:ident) => { 1u32 };
    (@to_word $expr:expr) => {
        ExtraField::to_word($expr)
    };
    (@from_word $ty:ty, $word:expr) => {
        <$ty as ExtraField>::from_word($word)
    };
}

/// A value that fits in one extra-arena word: a plain `u32`, an optional
/// node index, or a required node index.
pub trait ExtraField: Copy {
    fn to_word(self) -> u32;
    fn from_word(word: u32) -> Self;
}

impl ExtraField for u32 {
    fn to_word(self) -> u32 {
        self
    }
    fn from_word(word: u32) -> Self {
        word
    }
}

impl ExtraField for NodeIndex {
    fn to_word(self) -> u32 {
        self.0
    }
    fn from_word(word: u32) -> Self {
        NodeIndex(word)
    }
}

impl ExtraField for OptionalNodeIndex {
    fn to_word(self) -> u32 {
        self.raw()
    }
    fn from_word(word: u32) -> Self {
        OptionalNodeIndex::from_raw(word)
    }
}

extra_struct!(If { then_expr: NodeIndex, else_expr: NodeIndex });
extra_struct!(While { cont_expr: OptionalNodeIndex, then_expr: NodeIndex, else_expr: NodeIndex });
extra_struct!(WhileCont { cont_expr: NodeIndex, then_expr: NodeIndex });
extra_struct!(FnProtoOne {
    param: OptionalNodeIndex,
    align_expr: OptionalNodeIndex,
    addrspace_expr: OptionalNodeIndex,
    section_expr: OptionalNodeIndex,
    callconv_expr: OptionalNodeIndex,
});
extra_struct!(FnProto {
    params_start: u32,
    params_end: u32,
    align_expr: OptionalNodeIndex,
    addrspace_expr: OptionalNodeIndex,
    section_expr: OptionalNodeIndex,
    callconv_expr: OptionalNodeIndex,
});
extra_struct!(GlobalVarDecl {
    type_expr: OptionalNodeIndex,
    align_expr: OptionalNodeIndex,
    addrspace_expr: OptionalNodeIndex,
    section_expr: OptionalNodeIndex,
});
extra_struct!(LocalVarDecl { type_expr: NodeIndex, align_expr: NodeIndex });
extra_struct!(PtrType {
    sentinel: OptionalNodeIndex,
    align_expr: OptionalNodeIndex,
    addrspace_expr: OptionalNodeIndex,
});
extra_struct!(PtrTypeBitRange {
    sentinel: OptionalNodeIndex,
    align_expr: NodeIndex,
    addrspace_expr: OptionalNodeIndex,
    bit_range_start: NodeIndex,
    bit_range_end: NodeIndex,
});
extra_struct!(Slice { start: NodeIndex, end: NodeIndex });
extra_struct!(SliceSentinel { start: NodeIndex, end: OptionalNodeIndex, sentinel: NodeIndex });
extra_struct!(ArrayTypeSentinel { sentinel: NodeIndex, elem_type: NodeIndex });
extra_struct!(ContainerField { align_expr: NodeIndex, value_expr: NodeIndex });
extra_struct!(Asm { items_start: u32, items_end: u32, rparen: u32 });
extra_struct!(ParamRange { start: u32, end: u32 });

/// The packed `{input_count: u31, has_else: u1}` word following a `for`
/// node's input-list start index (`spec.md` §3 table, `for`'s raw
/// sub-range encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForPayload {
    pub input_count: u32,
    pub has_else: bool,
}

impl ForPayload {
    const HAS_ELSE_BIT: u32 = 1 << 31;

    pub fn pack(self) -> u32 {
        debug_assert!(self.input_count < Self::HAS_ELSE_BIT, "for loop has too many inputs to pack");
        self.input_count | if self.has_else { Self::HAS_ELSE_BIT } else { 0 }
    }

    pub fn unpack(word: u32) -> Self {
        ForPayload { input_count: word & !Self::HAS_ELSE_BIT, has_else: word & Self::HAS_ELSE_BIT != 0 }
    }
}

impl<'s> Ast<'s> {
    /// Pushes an [`ExtraRecord`] and returns its start index.
    pub(crate) fn add_extra_record<T: ExtraRecord>(&mut self, record: T) -> u32 {
        self.add_extra(&record.encode())
    }

    pub fn extra_record<T: ExtraRecord>(&self, start: u32) -> T {
        T::decode(&self.extra_data[start as usize..(start + T::LEN) as usize])
    }

    /// Pushes a list of node indices and returns the `SubRange` that spans
    /// them.
    pub(crate) fn add_extra_node_list(&mut self, nodes: &[NodeIndex]) -> SubRange {
        let start = self.extra_data.len() as u32;
        self.extra_data.extend(nodes.iter().map(|n| n.0));
        let end = self.extra_data.len() as u32;
        SubRange { start, end }
    }

    pub fn extra_node_list(&self, range: SubRange) -> impl Iterator<Item = NodeIndex> + '_ {
        self.extra_sub_range(range).iter().map(|&w| NodeIndex(w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn if_record_round_trips() {
        let mut ast = Ast::new("", &[]);
        let rec = If { then_expr: NodeIndex(3), else_expr: NodeIndex(7) };
        let start = ast.add_extra_record(rec);
        assert_eq!(ast.extra_record::<If>(start), rec);
    }

    #[test]
    fn for_payload_packs_count_and_flag() {
        let p = ForPayload { input_count: 3, has_else: true };
        let word = p.pack();
        assert_eq!(ForPayload::unpack(word), p);

        let p2 = ForPayload { input_count: 0, has_else: false };
        assert_eq!(ForPayload::unpack(p2.pack()), p2);
    }

    #[test]
    fn node_list_round_trips() {
        let mut ast = Ast::new("", &[]);
        let range = ast.add_extra_node_list(&[NodeIndex(1), NodeIndex(4), NodeIndex(9)]);
        let collected: Vec<_> = ast.extra_node_list(range).collect();
        assert_eq!(collected, vec![NodeIndex(1), NodeIndex(4), NodeIndex(9)]);
    }
}
