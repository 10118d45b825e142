//! The compact, index-based AST the parser produces.
//!
//! Three parallel arenas make up a tree: a flat [`Node`] array, an "extra"
//! `u32` arena for variable-length side data, and (transiently, only during
//! parsing) a scratch stack used while accumulating list members. Once
//! parsing returns, the arenas are read-only.

use slc_lexer::Token;

/// An index into [`Ast::nodes`]. Node 0 is always the `root` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const ROOT: NodeIndex = NodeIndex(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An optional [`NodeIndex`] represented without the overhead of
/// `Option<NodeIndex>` in packed extra-data records.
///
/// Uses `u32::MAX` as its reserved "absent" sentinel — distinct from any
/// real node index, since `Ast::nodes` can never grow that large in
/// practice and the value is never handed out by `push_node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalNodeIndex(u32);

impl OptionalNodeIndex {
    pub const NONE: OptionalNodeIndex = OptionalNodeIndex(u32::MAX);

    pub fn some(index: NodeIndex) -> Self {
        debug_assert_ne!(index.0, u32::MAX, "node index collides with the optional sentinel");
        OptionalNodeIndex(index.0)
    }

    pub fn from_raw(raw: u32) -> Self {
        OptionalNodeIndex(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn get(self) -> Option<NodeIndex> {
        if self.0 == u32::MAX {
            None
        } else {
            Some(NodeIndex(self.0))
        }
    }
}

impl From<Option<NodeIndex>> for OptionalNodeIndex {
    fn from(value: Option<NodeIndex>) -> Self {
        match value {
            Some(idx) => OptionalNodeIndex::some(idx),
            None => OptionalNodeIndex::NONE,
        }
    }
}

/// The ~120-variant grammar-production discriminant. Every tag has exactly
/// one interpretation of [`Node::data`] — see the doc comment on each
/// variant group and the accessors in [`crate::extra`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum NodeTag {
    /// Placeholder written by `Ast::reserve_node`; never observed once
    /// parsing completes successfully. `data` is unused.
    Undefined,

    /// `data`: extra-range over the top-level member list.
    Root,

    // --- Function prototypes / declarations ---------------------------
    /// `data`: (opt return_type, opt_fn_token_unused) — zero-parameter,
    /// no align/addrspace/section/callconv.
    FnProtoSimple,
    /// `data`: (extra(ParamRange { start, end }), return_type) — many
    /// parameters, no align/addrspace/section/callconv.
    FnProtoMulti,
    /// `data`: (extra(FnProtoOne), return_type) — zero or one parameter,
    /// at least one of align/addrspace/section/callconv present.
    FnProtoOne,
    /// `data`: (extra(FnProto), return_type) — general case.
    FnProto,
    /// `data`: (fn_proto_node, body_block) — body attached to a prototype.
    FnDecl,

    // --- Variable declarations -----------------------------------------
    /// `data`: (opt_init_expr, _) — no type, no align/addrspace/section.
    SimpleVarDecl,
    /// `data`: (align_expr, opt_init_expr) — type omitted, align present.
    AlignedVarDecl,
    /// `data`: (extra(LocalVarDecl), opt_init_expr) — type + align, no
    /// addrspace/section (used inside function bodies).
    LocalVarDecl,
    /// `data`: (extra(GlobalVarDecl), opt_init_expr) — full shape, used at
    /// container scope.
    GlobalVarDecl,

    // --- Containers ------------------------------------------------------
    /// `data`: (type_expr, opt value_expr) for `name: Type = value`.
    ContainerFieldInit,
    /// `data`: (extra(ContainerField), _) for `name: Type align(x) = value`.
    ContainerFieldAlign,
    /// `data`: (type_expr, _) for `name: Type` with no default value.
    ContainerField,

    /// `data`: (opt_stmt, opt_stmt) — zero or one statements, no trailing
    /// semicolon significance beyond what each statement owns.
    BlockTwo,
    /// Same shape as `BlockTwo` but the block's last statement had a
    /// trailing semicolon recorded for formatting-neutral round-tripping.
    BlockTwoSemicolon,
    /// `data`: extra-range over statement list.
    Block,
    BlockSemicolon,

    // --- Assignment ------------------------------------------------------
    /// `data`: (lhs, rhs).
    Assign,
    AssignMul,
    AssignDiv,
    AssignMod,
    AssignAdd,
    AssignSub,
    AssignShl,
    AssignShlSat,
    AssignShr,
    AssignBitAnd,
    AssignBitXor,
    AssignBitOr,
    AssignMulWrap,
    AssignAddWrap,
    AssignSubWrap,
    AssignMulSat,
    AssignAddSat,
    AssignSubSat,
    /// `data`: (extra(first word = count, following `count` node indices
    /// are the LHS items), rhs) — destructuring assignment.
    AssignDestructure,

    // --- Binary operators --------------------------------------------------
    BoolOr,
    BoolAnd,
    EqualEqual,
    BangEqual,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    BitAnd,
    BitXor,
    BitOr,
    OrElse,
    /// `data`: (lhs, rhs); `main_token` is `catch`; an optional
    /// `|payload|` is recovered by looking at the token immediately after
    /// `catch`.
    Catch,
    Shl,
    ShlSat,
    Shr,
    Add,
    AddWrap,
    AddSat,
    Sub,
    SubWrap,
    SubSat,
    ArrayCat,
    MergeErrorSets,
    Mul,
    MulWrap,
    MulSat,
    ArrayMult,
    Div,
    Mod,

    // --- Prefix operators -------------------------------------------------
    BoolNot,
    Negation,
    NegationWrap,
    BitNot,
    AddressOf,
    Try,
    OptionalType,
    AnyframeType,

    // --- Pointer / array / slice type syntax -------------------------------
    /// `data`: (opt_align_expr, child_type) — bare `*T`/`[*]T`, or with a
    /// lone `align(x)` modifier and nothing else.
    PtrTypeAligned,
    /// `data`: (sentinel, child_type) — a sentinel and no other modifier;
    /// the sentinel is a direct node index, no extra-arena record needed.
    PtrTypeSentinel,
    /// `data`: (extra(PtrType), child_type) — general case.
    PtrType,
    /// `data`: (extra(PtrTypeBitRange), child_type).
    PtrTypeBitRange,
    /// `data`: (len_expr, elem_type).
    ArrayType,
    /// `data`: (len_expr, extra(ArrayTypeSentinel { sentinel, elem_type })).
    ArrayTypeSentinel,

    // --- Suffix operators ---------------------------------------------------
    /// `data`: (lhs, start_index_expr) — `a[e..]`.
    SliceOpen,
    /// `data`: (lhs, extra(Slice)) — `a[e..e]`.
    Slice,
    /// `data`: (lhs, extra(SliceSentinel)) — `a[e..e:s]`.
    SliceSentinel,
    /// `data`: (operand, _).
    Deref,
    /// `data`: (lhs, field_name_token).
    FieldAccess,
    /// `data`: (operand, _) — `.?`.
    UnwrapOptional,
    /// `data`: (lhs, index_expr).
    ArrayAccess,
    /// `data`: (callee, opt_single_arg).
    CallOne,
    CallOneComma,
    /// `data`: (callee, extra(SubRange)).
    Call,
    CallComma,

    // --- Builtin calls -------------------------------------------------------
    /// `data`: (opt_arg0, opt_arg1).
    BuiltinCallTwo,
    BuiltinCallTwoComma,
    /// `data`: extra-range over argument list.
    BuiltinCall,
    BuiltinCallComma,

    // --- Struct / array init -------------------------------------------------
    /// `data`: (lhs_type, opt_field0) — `T{.a = x}` shorthand for one field.
    StructInitOne,
    StructInitOneComma,
    /// `data`: (lhs_type, extra(SubRange)).
    StructInit,
    StructInitComma,
    /// `data`: (opt_field0, opt_field1) — `.{.a = x}` anonymous form.
    StructInitDotTwo,
    StructInitDotTwoComma,
    /// `data`: extra-range, anonymous form.
    StructInitDot,
    StructInitDotComma,

    /// `data`: (lhs_type, opt_elem0).
    ArrayInitOne,
    ArrayInitOneComma,
    ArrayInit,
    ArrayInitComma,
    /// `data`: (opt_elem0, opt_elem1) — `.{x, y}` anonymous form.
    ArrayInitDotTwo,
    ArrayInitDotTwoComma,
    ArrayInitDot,
    ArrayInitDotComma,

    // --- Errors --------------------------------------------------------------
    /// `data`: (error_set_type, payload_type) — `E!T`.
    ErrorUnion,
    /// `data`: extra-range over member identifiers.
    ErrorSetDecl,
    /// `data`: (_, name_token) — `error.Foo`.
    ErrorValue,

    // --- Atoms -----------------------------------------------------------------
    /// `data`: (inner_expr, _).
    GroupedExpression,
    StringLiteral,
    MultilineStringLiteral,
    NumberLiteral,
    CharLiteral,
    UnreachableLiteral,
    Identifier,
    /// `data`: (_, tag_name_token) — `.Foo`.
    EnumLiteral,
    AnyframeLiteral,

    // --- Control flow as values/statements --------------------------------------
    /// `data`: (condition, then_expr) — no `else`.
    IfSimple,
    /// `data`: (condition, extra(If)).
    If,
    /// `data`: (input_node, then_expr) — exactly one input, no `else`.
    ForSimple,
    /// `data`: (extra-range-start-of-inputs, packed { input_count: u31,
    /// has_else: u1 }) — the packed word lives directly in `data.rhs` (see
    /// `crate::extra::ForPayload`), since decoding it is what tells a reader
    /// how many inputs to read starting at `data.lhs`. `then_expr` (and
    /// `else_expr`, if `has_else`) follow the inputs in the extra arena.
    For,
    /// `data`: (start_expr, opt_end_expr) — one `for` input written as a
    /// range `e..e?`.
    ForRange,
    /// `data`: (condition, then_expr) — no continue-expr, no `else`.
    WhileSimple,
    /// `data`: (condition, extra(WhileCont)).
    WhileCont,
    /// `data`: (condition, extra(While)).
    While,

    /// `data`: (switch_operand, extra(SubRange over prongs)).
    Switch,
    SwitchComma,
    /// `data`: (item_expr, prong_body) — exactly one item, no `inline`.
    SwitchCaseOne,
    SwitchCaseOneInline,
    /// `data`: (extra(SubRange over items), prong_body).
    SwitchCase,
    SwitchCaseInline,
    /// `data`: (start_expr, end_expr) — a `low...high` switch item.
    SwitchRange,

    // --- Inline assembly ---------------------------------------------------------
    /// `data`: (template_expr, extra(Asm)).
    Asm,
    /// `data`: (template_expr, _) — no outputs/inputs/clobbers.
    AsmSimple,
    /// `data`: (type_or_value_expr, _) — one asm input item.
    AsmInput,
    /// `data`: (_, _) — one asm output item (no expr when it binds `-> T`).
    AsmOutput,

    // --- Block-like keywords --------------------------------------------------------
    Comptime,
    Nosuspend,
    Suspend,
    /// `data`: (_, deferred_expr).
    Defer,
    /// `data`: (opt_payload_token_unused, deferred_expr).
    Errdefer,
    /// `data`: (opt_label_token_unused, opt_value_expr).
    Break,
    Continue,
    /// `data`: (opt_value_expr, _).
    Return,
    Resume,

    /// `data`: (opt_name_token_unused, body_block).
    TestDecl,

    // --- Container declarations --------------------------------------------------------
    /// `data`: extra-range over member list, `main_token` is
    /// `struct`/`union`/`enum`/`opaque`.
    ContainerDecl,
    ContainerDeclTrailing,
    /// `data`: (opt_member0, opt_member1).
    ContainerDeclTwo,
    ContainerDeclTwoTrailing,
    /// `data`: (arg_expr, extra(SubRange)) — `union(enum)`/`enum(u8)` etc.
    ContainerDeclArg,
    ContainerDeclArgTrailing,

    /// `data`: (_, extra(SubRange)) — `union(enum) { ... }` sugar.
    TaggedUnion,
    TaggedUnionTrailing,
    TaggedUnionTwo,
    TaggedUnionTwoTrailing,
    /// `data`: (enum_tag_type_expr, extra(SubRange)).
    TaggedUnionEnumTag,
    TaggedUnionEnumTagTrailing,
}

/// The 2×u32 payload of a [`Node`]. Interpretation is fixed per `tag` for
/// the program's lifetime (`spec.md` §3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeData {
    pub lhs: u32,
    pub rhs: u32,
}

impl NodeData {
    pub fn new(lhs: u32, rhs: u32) -> Self {
        NodeData { lhs, rhs }
    }
}

/// A single AST node: a tag, the token that anchors it in source, and its
/// tag-specific payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub tag: NodeTag,
    pub main_token: u32,
    pub data: NodeData,
}

/// A `(start, end)` pair of indices into [`Ast::extra_data`] denoting a
/// slice of node indices — `spec.md`'s "sub-range".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRange {
    pub start: u32,
    pub end: u32,
}

/// The three parallel arenas plus the diagnostics list `spec.md` §2
/// requires: node array, extra `u32` arena, and diagnostics. The scratch
/// stack is transient parsing state and does not outlive `Ast::build`.
pub struct Ast<'s> {
    pub source: &'s str,
    pub tokens: &'s [Token],
    pub nodes: Vec<Node>,
    pub extra_data: Vec<u32>,
    pub errors: Vec<crate::diagnostics::Diagnostic>,
}

impl<'s> Ast<'s> {
    pub(crate) fn new(source: &'s str, tokens: &'s [Token]) -> Self {
        Ast { source, tokens, nodes: Vec::new(), extra_data: Vec::new(), errors: Vec::new() }
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    /// Appends a new, fully-formed node and returns its index.
    pub(crate) fn push_node(&mut self, tag: NodeTag, main_token: u32, data: NodeData) -> NodeIndex {
        self.nodes.push(Node { tag, main_token, data });
        NodeIndex((self.nodes.len() - 1) as u32)
    }

    /// Reserves a node slot for later filling (used so a `fn_decl` node can
    /// be allocated with an index preceding its prototype's — see
    /// `spec.md` §4.3).
    pub(crate) fn reserve_node(&mut self) -> NodeIndex {
        self.nodes.push(Node { tag: NodeTag::Undefined, main_token: 0, data: NodeData::default() });
        NodeIndex((self.nodes.len() - 1) as u32)
    }

    pub(crate) fn set_node(&mut self, index: NodeIndex, tag: NodeTag, main_token: u32, data: NodeData) {
        self.nodes[index.index()] = Node { tag, main_token, data };
    }

    /// Reverses a `reserve_node` that turned out not to be needed.
    ///
    /// Idempotent: if `index` is the last node, it is popped (shrinking the
    /// array); otherwise something else may already reference it, so it is
    /// overwritten with a harmless `unreachable_literal` rather than
    /// leaving a dangling `Undefined` tag (`spec.md` §8 parser invariant 2).
    pub(crate) fn unreserve_node(&mut self, index: NodeIndex) {
        if index.index() + 1 == self.nodes.len() {
            self.nodes.pop();
        } else {
            self.nodes[index.index()] = Node {
                tag: NodeTag::UnreachableLiteral,
                main_token: self.nodes[index.index()].main_token,
                data: NodeData::default(),
            };
        }
    }

    /// Appends raw `u32` words to the extra arena and returns the start
    /// index. The extra arena is append-only; once emitted, a sub-range is
    /// immutable.
    pub(crate) fn add_extra(&mut self, words: &[u32]) -> u32 {
        let start = self.extra_data.len() as u32;
        self.extra_data.extend_from_slice(words);
        start
    }

    pub fn extra_sub_range(&self, range: SubRange) -> &[u32] {
        &self.extra_data[range.start as usize..range.end as usize]
    }
}
