//! Parser invariants from `spec.md` §8. Each test is named after the
//! property it checks, not the feature it happens to exercise.

use super::{parse_root, parse_zon};
use crate::ast::NodeTag;
use crate::diagnostics::DiagnosticTag;
use slc_lexer::lex;

macro_rules! parsed {
    ($src:expr) => {{
        let tokens = lex($src);
        parse_root($src, &tokens)
    }};
}

#[test]
fn well_formed_program_has_no_diagnostics_and_root_is_node_zero() {
    let ast = parsed!("const x = 1;\nfn f() void {}\n");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    assert_eq!(ast.node(crate::ast::NodeIndex::ROOT).tag, NodeTag::Root);
}

#[test]
fn or_binds_looser_than_and() {
    // `a or b and c` must parse as `or(a, and(b, c))`.
    let ast = parsed!("const x = a or b and c;\n");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    let or_node = ast.nodes.iter().find(|n| n.tag == NodeTag::BoolOr).expect("no bool_or node");
    let rhs = ast.node(crate::ast::NodeIndex(or_node.data.rhs));
    assert_eq!(rhs.tag, NodeTag::BoolAnd);
}

#[test]
fn chained_comparison_operators_are_rejected_but_recovered() {
    let ast = parsed!("const x = a == b == c;\n");
    let chained: Vec<_> =
        ast.errors.iter().filter(|d| d.tag == DiagnosticTag::ChainedComparisonOperators).collect();
    assert_eq!(chained.len(), 1, "{:?}", ast.errors);
    // Still produced a var decl with some init expression.
    assert!(ast.nodes.iter().any(|n| n.tag == NodeTag::SimpleVarDecl));
}

#[test]
fn destructure_assignment_shape() {
    let ast = parsed!("fn f() void { a, b = x; }\n");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    let destructure = ast.nodes.iter().find(|n| n.tag == NodeTag::AssignDestructure).expect("no assign_destructure");
    let extra = ast.extra_data[destructure.data.lhs as usize..];
    assert_eq!(extra[0], 2);
    let idx_a = extra[1];
    let idx_b = extra[2];
    assert_eq!(ast.node(crate::ast::NodeIndex(idx_a)).tag, NodeTag::Identifier);
    assert_eq!(ast.node(crate::ast::NodeIndex(idx_b)).tag, NodeTag::Identifier);
    let rhs = ast.node(crate::ast::NodeIndex(destructure.data.rhs));
    assert_eq!(rhs.tag, NodeTag::Identifier);
}

#[test]
fn wrong_equal_var_decl_still_produces_a_var_decl_with_init() {
    let ast = parsed!("const x == 1;\n");
    assert!(ast.errors.iter().any(|d| d.tag == DiagnosticTag::WrongEqualVarDecl));
    let decl = ast.nodes.iter().find(|n| n.tag == NodeTag::SimpleVarDecl).expect("no simple_var_decl");
    let init = crate::ast::OptionalNodeIndex::from_raw(decl.data.lhs).get().expect("no init expr");
    assert_eq!(ast.node(init).tag, NodeTag::NumberLiteral);
}

#[test]
fn declaration_between_fields_is_diagnosed_with_previous_and_next_field_notes() {
    let ast = parsed!("const S = struct { a: i32, fn f() void {} b: i32 };\n");
    let decl_between: Vec<_> = ast.errors.iter().filter(|d| d.tag == DiagnosticTag::DeclBetweenFields).collect();
    assert_eq!(decl_between.len(), 1, "{:?}", ast.errors);
    assert!(ast.errors.iter().any(|d| d.tag == DiagnosticTag::PreviousField && d.is_note));
    assert!(ast.errors.iter().any(|d| d.tag == DiagnosticTag::NextField && d.is_note));
}

#[test]
fn labeled_loop_with_break_succeeds_and_label_is_two_tokens_before_for() {
    let src = "fn f() void { outer: for (xs) |x| { break :outer x; } }\n";
    let tokens = lex(src);
    let ast = parse_root(src, &tokens);
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    let for_node = ast.nodes.iter().find(|n| matches!(n.tag, NodeTag::ForSimple | NodeTag::For)).expect("no for node");
    let for_main = for_node.main_token;
    assert_eq!(tokens[for_main as usize].tag, slc_lexer::TokenTag::KeywordFor);
    assert_eq!(tokens[for_main as usize - 1].tag, slc_lexer::TokenTag::Colon);
    assert_eq!(tokens[for_main as usize - 2].tag, slc_lexer::TokenTag::Identifier);
}

#[test]
fn c_style_container_is_recovered_with_notes() {
    let ast = parsed!("struct Foo {};\n");
    assert!(ast.errors.iter().any(|d| d.tag == DiagnosticTag::CStyleContainer));
    assert!(ast.errors.iter().any(|d| d.tag == DiagnosticTag::UnnamedContainerStyle && d.is_note));
    // Parsing continued to end-of-input without a spurious expected-eof error.
    assert!(!ast.errors.iter().any(|d| d.tag == DiagnosticTag::ExpectedToken && d.extra == Some(slc_lexer::TokenTag::Eof)));
}

#[test]
fn never_leaves_a_dangling_undefined_node() {
    // Exercises the fn_decl reserve/unreserve path with a prototype that
    // fails mid-parse (missing return type).
    let ast = parsed!("fn f(");
    assert!(!ast.nodes.iter().any(|n| n.tag == NodeTag::Undefined));
}

#[test]
fn zon_root_accepts_a_single_expression() {
    let src = ".{ .a = 1, .b = 2 }";
    let tokens = lex(src);
    let ast = parse_zon(src, &tokens);
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    let root = ast.node(crate::ast::NodeIndex::ROOT);
    assert_eq!(root.tag, NodeTag::Root);
    let value = ast.node(crate::ast::NodeIndex(root.data.lhs));
    assert!(matches!(value.tag, NodeTag::StructInitDotTwo | NodeTag::StructInitDot));
}

#[test]
fn ampersand_ampersand_adjacency_is_diagnosed() {
    let ast = parsed!("const x = a&&b;\n");
    assert!(ast.errors.iter().any(|d| d.tag == DiagnosticTag::InvalidAmpersandAmpersand));
}

#[test]
fn mismatched_binary_op_whitespace_is_diagnosed() {
    let ast = parsed!("const x = a +b;\n");
    assert!(ast.errors.iter().any(|d| d.tag == DiagnosticTag::MismatchedBinaryOpWhitespace));
}

#[test]
fn container_decl_picks_two_field_shape_for_small_structs() {
    let ast = parsed!("const S = struct { a: i32, b: i32 };\n");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    assert!(ast.nodes.iter().any(|n| matches!(n.tag, NodeTag::ContainerDeclTwo | NodeTag::ContainerDeclTwoTrailing)));
}

#[test]
fn container_decl_picks_extra_range_shape_for_larger_structs() {
    let ast = parsed!("const S = struct { a: i32, b: i32, c: i32 };\n");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    assert!(ast.nodes.iter().any(|n| matches!(n.tag, NodeTag::ContainerDecl | NodeTag::ContainerDeclTrailing)));
}

#[test]
fn tagged_union_sugar_produces_tagged_union_tag() {
    let ast = parsed!("const U = union(enum) { a: i32, b: i32 };\n");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    assert!(ast.nodes.iter().any(|n| matches!(n.tag, NodeTag::TaggedUnionTwo | NodeTag::TaggedUnionTwoTrailing)));
}

#[test]
fn tagged_union_with_explicit_tag_type_records_it() {
    let ast = parsed!("const U = union(enum(u8)) { a: i32, b: i32, c: i32 };\n");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    assert!(ast.nodes.iter().any(|n| matches!(n.tag, NodeTag::TaggedUnionEnumTag | NodeTag::TaggedUnionEnumTagTrailing)));
}

#[test]
fn container_decl_arg_records_union_tag_type() {
    let ast = parsed!("const U = union(Tag) { a: i32, b: i32, c: i32 };\n");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    assert!(ast.nodes.iter().any(|n| matches!(n.tag, NodeTag::ContainerDeclArg | NodeTag::ContainerDeclArgTrailing)));
}

#[test]
fn pointer_type_shapes_collapse_to_smallest_variant() {
    let ast = parsed!("const T = *u8;\n");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    assert!(ast.nodes.iter().any(|n| n.tag == NodeTag::PtrTypeAligned));
}

#[test]
fn ptr_type_with_bit_range_and_align_packs_bit_range_extra() {
    let ast = parsed!("const T = *align(4:0:8) u8;\n");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    let node = ast.nodes.iter().find(|n| n.tag == NodeTag::PtrTypeBitRange).expect("no ptr_type_bit_range");
    let rec = ast.extra_record::<crate::extra::PtrTypeBitRange>(node.data.lhs);
    assert_eq!(ast.node(rec.align_expr).tag, NodeTag::NumberLiteral);
    assert_eq!(ast.node(rec.bit_range_start).tag, NodeTag::NumberLiteral);
    assert_eq!(ast.node(rec.bit_range_end).tag, NodeTag::NumberLiteral);
}

#[test]
fn asm_with_missing_comma_is_recoverable() {
    let src = r#"fn f() void { asm volatile ("nop" : [a] "r" (1) [b] "r" (2)); }"#;
    let tokens = lex(src);
    let ast = parse_root(src, &tokens);
    assert!(ast.errors.iter().any(|d| d.tag == DiagnosticTag::ExpectedToken && d.extra == Some(slc_lexer::TokenTag::Comma)));
    assert!(ast.nodes.iter().any(|n| n.tag == NodeTag::Asm));
}
