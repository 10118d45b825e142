//! Expressions, operator precedence, and type syntax (`spec.md` §4.4).
//!
//! Three layers, outside-in: [`Parser::expect_expr`] does precedence
//! climbing over the binary-operator table; [`Parser::parse_prefix_expr`]
//! peels off unary operators; [`Parser::parse_primary_expr`] dispatches on
//! the head token, and [`Parser::parse_suffix_chain`] applies postfix
//! operators (`.field`, `[index]`, `(call)`, `.?`, `.*`) to whatever the
//! primary expression produced. [`Parser::expect_type_expr`] is the
//! separate grammar for pointer/array/slice/optional type syntax, which
//! falls back to the ordinary expression grammar for everything it
//! doesn't own.

use super::Parser;
use crate::ast::{NodeData, NodeIndex, NodeTag, OptionalNodeIndex};
use crate::diagnostics::{Diagnostic, DiagnosticTag};
use crate::error::{ParseError, PResult};
use slc_lexer::TokenTag;

fn opt_raw(opt: Option<NodeIndex>) -> u32 {
    OptionalNodeIndex::from(opt).raw()
}

/// One entry in the precedence-climbing table (`spec.md` §4.4).
struct BinOp {
    tag: TokenTag,
    node_tag: NodeTag,
    prec: u8,
    assoc: Assoc,
}

#[derive(PartialEq, Eq)]
enum Assoc {
    Left,
    /// Comparison operators: chaining (`a == b == c`) is rejected.
    None,
}

const BIN_OPS: &[BinOp] = &[
    BinOp { tag: TokenTag::KeywordOr, node_tag: NodeTag::BoolOr, prec: 10, assoc: Assoc::Left },
    BinOp { tag: TokenTag::KeywordAnd, node_tag: NodeTag::BoolAnd, prec: 20, assoc: Assoc::Left },
    BinOp { tag: TokenTag::EqualEqual, node_tag: NodeTag::EqualEqual, prec: 30, assoc: Assoc::None },
    BinOp { tag: TokenTag::BangEqual, node_tag: NodeTag::BangEqual, prec: 30, assoc: Assoc::None },
    BinOp { tag: TokenTag::AngleBracketLeft, node_tag: NodeTag::LessThan, prec: 30, assoc: Assoc::None },
    BinOp { tag: TokenTag::AngleBracketRight, node_tag: NodeTag::GreaterThan, prec: 30, assoc: Assoc::None },
    BinOp { tag: TokenTag::AngleBracketLeftEqual, node_tag: NodeTag::LessOrEqual, prec: 30, assoc: Assoc::None },
    BinOp { tag: TokenTag::AngleBracketRightEqual, node_tag: NodeTag::GreaterOrEqual, prec: 30, assoc: Assoc::None },
    BinOp { tag: TokenTag::Ampersand, node_tag: NodeTag::BitAnd, prec: 40, assoc: Assoc::Left },
    BinOp { tag: TokenTag::Caret, node_tag: NodeTag::BitXor, prec: 40, assoc: Assoc::Left },
    BinOp { tag: TokenTag::Pipe, node_tag: NodeTag::BitOr, prec: 40, assoc: Assoc::Left },
    BinOp { tag: TokenTag::KeywordOrelse, node_tag: NodeTag::OrElse, prec: 40, assoc: Assoc::Left },
    BinOp { tag: TokenTag::KeywordCatch, node_tag: NodeTag::Catch, prec: 40, assoc: Assoc::Left },
    BinOp { tag: TokenTag::AngleBracketAngleBracketLeft, node_tag: NodeTag::Shl, prec: 50, assoc: Assoc::Left },
    BinOp { tag: TokenTag::AngleBracketAngleBracketLeftPipe, node_tag: NodeTag::ShlSat, prec: 50, assoc: Assoc::Left },
    BinOp { tag: TokenTag::AngleBracketAngleBracketRight, node_tag: NodeTag::Shr, prec: 50, assoc: Assoc::Left },
    BinOp { tag: TokenTag::Plus, node_tag: NodeTag::Add, prec: 60, assoc: Assoc::Left },
    BinOp { tag: TokenTag::Minus, node_tag: NodeTag::Sub, prec: 60, assoc: Assoc::Left },
    BinOp { tag: TokenTag::PlusPlus, node_tag: NodeTag::ArrayCat, prec: 60, assoc: Assoc::Left },
    BinOp { tag: TokenTag::PlusPercent, node_tag: NodeTag::AddWrap, prec: 60, assoc: Assoc::Left },
    BinOp { tag: TokenTag::MinusPercent, node_tag: NodeTag::SubWrap, prec: 60, assoc: Assoc::Left },
    BinOp { tag: TokenTag::PlusPipe, node_tag: NodeTag::AddSat, prec: 60, assoc: Assoc::Left },
    BinOp { tag: TokenTag::MinusPipe, node_tag: NodeTag::SubSat, prec: 60, assoc: Assoc::Left },
    BinOp { tag: TokenTag::PipePipe, node_tag: NodeTag::MergeErrorSets, prec: 70, assoc: Assoc::Left },
    BinOp { tag: TokenTag::Asterisk, node_tag: NodeTag::Mul, prec: 70, assoc: Assoc::Left },
    BinOp { tag: TokenTag::Slash, node_tag: NodeTag::Div, prec: 70, assoc: Assoc::Left },
    BinOp { tag: TokenTag::Percent, node_tag: NodeTag::Mod, prec: 70, assoc: Assoc::Left },
    BinOp { tag: TokenTag::AsteriskAsterisk, node_tag: NodeTag::ArrayMult, prec: 70, assoc: Assoc::Left },
    BinOp { tag: TokenTag::AsteriskPercent, node_tag: NodeTag::MulWrap, prec: 70, assoc: Assoc::Left },
    BinOp { tag: TokenTag::AsteriskPipe, node_tag: NodeTag::MulSat, prec: 70, assoc: Assoc::Left },
];

fn lookup_bin_op(tag: TokenTag) -> Option<&'static BinOp> {
    BIN_OPS.iter().find(|op| op.tag == tag)
}

/// Assignment-operator spellings → node tags (`spec.md` §4.4).
const ASSIGN_OPS: &[(TokenTag, NodeTag)] = &[
    (TokenTag::AsteriskEqual, NodeTag::AssignMul),
    (TokenTag::SlashEqual, NodeTag::AssignDiv),
    (TokenTag::PercentEqual, NodeTag::AssignMod),
    (TokenTag::PlusEqual, NodeTag::AssignAdd),
    (TokenTag::MinusEqual, NodeTag::AssignSub),
    (TokenTag::AngleBracketAngleBracketLeftEqual, NodeTag::AssignShl),
    (TokenTag::AngleBracketAngleBracketLeftPipeEqual, NodeTag::AssignShlSat),
    (TokenTag::AngleBracketAngleBracketRightEqual, NodeTag::AssignShr),
    (TokenTag::AmpersandEqual, NodeTag::AssignBitAnd),
    (TokenTag::CaretEqual, NodeTag::AssignBitXor),
    (TokenTag::PipeEqual, NodeTag::AssignBitOr),
    (TokenTag::AsteriskPercentEqual, NodeTag::AssignMulWrap),
    (TokenTag::PlusPercentEqual, NodeTag::AssignAddWrap),
    (TokenTag::MinusPercentEqual, NodeTag::AssignSubWrap),
    (TokenTag::AsteriskPipeEqual, NodeTag::AssignMulSat),
    (TokenTag::PlusPipeEqual, NodeTag::AssignAddSat),
    (TokenTag::MinusPipeEqual, NodeTag::AssignSubSat),
    (TokenTag::Equal, NodeTag::Assign),
];

pub(super) fn assign_op_tag(tag: TokenTag) -> Option<NodeTag> {
    ASSIGN_OPS.iter().find(|(t, _)| *t == tag).map(|(_, n)| *n)
}

const PREC_MIN: u8 = 10;

impl<'s> Parser<'s> {
    /// Entry point for a general expression (`spec.md` §4.4). Does not
    /// consume assignment operators — that unification lives in
    /// [`Parser::parse_possibly_assign`], used by statement-level callers.
    pub(crate) fn expect_expr(&mut self) -> PResult<NodeIndex> {
        self.parse_bin_expr(PREC_MIN)
    }

    /// Parses `lhs` then, if the next token is an assignment operator or a
    /// comma (destructure), builds the appropriate `assign_*` /
    /// `assign_destructure` node. Returns the plain expression unchanged
    /// otherwise. Used by statement contexts and switch-prong bodies.
    pub(crate) fn parse_possibly_assign(&mut self) -> PResult<NodeIndex> {
        let lhs = self.expect_expr()?;
        self.finish_possibly_assign(lhs)
    }

    /// Continuation of [`Parser::parse_possibly_assign`] for callers that
    /// already have `lhs` (the destructure-statement path in `stmt.rs`,
    /// which must look ahead for a comma before committing to a plain
    /// expression).
    pub(crate) fn finish_possibly_assign(&mut self, lhs: NodeIndex) -> PResult<NodeIndex> {
        if let Some(node_tag) = assign_op_tag(self.current_tag()) {
            let op_tok = self.advance();
            let rhs = self.expect_expr()?;
            return Ok(self.ast.push_node(node_tag, op_tok, NodeData::new(lhs.0, rhs.0)));
        }
        if self.current_tag() == TokenTag::EqualEqual {
            // `==` where a plain `=` was probably meant; accept as recovery.
            self.push_diag(Diagnostic::new(DiagnosticTag::WrongEqualVarDecl, self.pos));
            let op_tok = self.advance();
            let rhs = self.expect_expr()?;
            return Ok(self.ast.push_node(NodeTag::Assign, op_tok, NodeData::new(lhs.0, rhs.0)));
        }
        Ok(lhs)
    }

    fn parse_bin_expr(&mut self, min_prec: u8) -> PResult<NodeIndex> {
        let mut lhs = self.parse_prefix_expr()?;
        let mut last_op_prec: Option<u8> = None;

        loop {
            let tag = self.current_tag();
            let Some(op) = lookup_bin_op(tag) else { break };
            if op.prec < min_prec {
                break;
            }
            if op.assoc == Assoc::None {
                if let Some(prev) = last_op_prec {
                    if prev == op.prec {
                        self.push_diag(Diagnostic::new(DiagnosticTag::ChainedComparisonOperators, self.pos));
                    }
                }
            }

            if tag == TokenTag::Ampersand && self.ampersand_immediately_followed_by_ampersand() {
                self.push_diag(Diagnostic::new(DiagnosticTag::InvalidAmpersandAmpersand, self.pos));
            }
            self.check_binary_op_whitespace(tag);

            let op_tok = self.advance();

            if tag == TokenTag::KeywordCatch {
                self.parse_optional_payload()?;
            }

            let next_min = op.prec + 1;
            let rhs = self.parse_bin_expr(next_min)?;
            lhs = self.ast.push_node(op.node_tag, op_tok, NodeData::new(lhs.0, rhs.0));
            last_op_prec = Some(op.prec);
        }
        Ok(lhs)
    }

    /// `spec.md` §4.4: `&` immediately followed (no byte gap) by another
    /// `&` is almost certainly a mistyped `&&`.
    fn ampersand_immediately_followed_by_ampersand(&self) -> bool {
        if self.peek_tag(1) != TokenTag::Ampersand {
            return false;
        }
        self.token_end(self.pos) == self.ast.tokens[self.pos as usize + 1].start as usize
    }

    /// `spec.md` §4.4: asymmetric whitespace around a binary operator
    /// (`a +b`, `a+ b`) is diagnosed without blocking the parse.
    fn check_binary_op_whitespace(&mut self, _tag: TokenTag) {
        if self.pos == 0 {
            return;
        }
        let op_start = self.ast.tokens[self.pos as usize].start as usize;
        let lhs_end = self.token_end(self.pos - 1);
        let op_end = self.token_end(self.pos);
        let rhs_start = self.ast.tokens.get(self.pos as usize + 1).map(|t| t.start as usize).unwrap_or(self.ast.source.len());
        let before = op_start > lhs_end;
        let after = rhs_start > op_end;
        if before != after {
            self.push_diag(Diagnostic::new(DiagnosticTag::MismatchedBinaryOpWhitespace, self.pos));
        }
    }

    /// Optional `|payload|` after `catch` (`spec.md` §4.4). Consumed and
    /// discarded — no node payload in this AST models captures (`spec.md`
    /// §3 data model has no field for them); the binding is recoverable by
    /// a consumer re-scanning tokens around `main_token`, same as labels.
    fn parse_optional_payload(&mut self) -> PResult<()> {
        if self.eat_token(TokenTag::Pipe).is_none() {
            return Ok(());
        }
        self.eat_token(TokenTag::Asterisk);
        self.expect_token(TokenTag::Identifier)?;
        self.expect_token(TokenTag::Pipe)?;
        Ok(())
    }

    /// `!`, `-`, `~`, `-%`, `&`, `try` — each wraps a recursively parsed
    /// prefix expression (`spec.md` §4.4).
    fn parse_prefix_expr(&mut self) -> PResult<NodeIndex> {
        let (tag, node_tag) = match self.current_tag() {
            TokenTag::Bang => (TokenTag::Bang, NodeTag::BoolNot),
            TokenTag::Minus => (TokenTag::Minus, NodeTag::Negation),
            TokenTag::MinusPercent => (TokenTag::MinusPercent, NodeTag::NegationWrap),
            TokenTag::Tilde => (TokenTag::Tilde, NodeTag::BitNot),
            TokenTag::Ampersand => (TokenTag::Ampersand, NodeTag::AddressOf),
            TokenTag::KeywordTry => (TokenTag::KeywordTry, NodeTag::Try),
            _ => return self.parse_suffix_chain(),
        };
        let tok = self.advance();
        debug_assert_eq!(self.ast.tokens[tok as usize].tag, tag);
        let operand = self.parse_prefix_expr()?;
        Ok(self.ast.push_node(node_tag, tok, NodeData::new(operand.0, 0)))
    }

    /// Applies postfix operators to a primary expression: `[index]`,
    /// `[start..]`, `[start..end]`, `[start..end:sentinel]`, `.field`,
    /// `.?`, `.*`, `(args)` (`spec.md` §4.4).
    fn parse_suffix_chain(&mut self) -> PResult<NodeIndex> {
        let mut lhs = self.parse_primary_expr()?;
        loop {
            match self.current_tag() {
                TokenTag::LBracket => lhs = self.parse_index_or_slice(lhs)?,
                TokenTag::PeriodQuestionMark => {
                    let tok = self.advance();
                    lhs = self.ast.push_node(NodeTag::UnwrapOptional, tok, NodeData::new(lhs.0, 0));
                }
                TokenTag::PeriodAsterisk => {
                    let tok = self.advance();
                    if self.current_tag() == TokenTag::Asterisk {
                        self.advance();
                    }
                    lhs = self.ast.push_node(NodeTag::Deref, tok, NodeData::new(lhs.0, 0));
                }
                TokenTag::Period => {
                    let period = self.advance();
                    match self.current_tag() {
                        TokenTag::Identifier | TokenTag::KeywordError => {
                            let name = self.advance();
                            lhs = self.ast.push_node(NodeTag::FieldAccess, period, NodeData::new(lhs.0, name));
                        }
                        TokenTag::QuestionMark => {
                            self.advance();
                            lhs = self.ast.push_node(NodeTag::UnwrapOptional, period, NodeData::new(lhs.0, 0));
                        }
                        TokenTag::Asterisk => {
                            self.advance();
                            if self.current_tag() == TokenTag::Asterisk {
                                self.push_diag(
                                    Diagnostic::new(DiagnosticTag::ExpectedPeriodAsteriskAsterisk, self.pos)
                                        .with_expected(TokenTag::Identifier),
                                );
                                self.advance();
                            }
                            lhs = self.ast.push_node(NodeTag::Deref, period, NodeData::new(lhs.0, 0));
                        }
                        TokenTag::PeriodQuestionMark => {
                            self.advance();
                            lhs = self.ast.push_node(NodeTag::UnwrapOptional, period, NodeData::new(lhs.0, 0));
                        }
                        TokenTag::PeriodAsterisk => {
                            self.advance();
                            lhs = self.ast.push_node(NodeTag::Deref, period, NodeData::new(lhs.0, 0));
                        }
                        _ => {
                            self.push_expected_token(TokenTag::Identifier);
                            return Err(ParseError);
                        }
                    }
                }
                TokenTag::LParen => lhs = self.parse_call_args(lhs)?,
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_index_or_slice(&mut self, lhs: NodeIndex) -> PResult<NodeIndex> {
        let lbracket = self.advance();
        let start = self.expect_expr()?;
        if self.eat_token(TokenTag::Ellipsis2).is_none() {
            self.expect_token(TokenTag::RBracket)?;
            return Ok(self.ast.push_node(NodeTag::ArrayAccess, lbracket, NodeData::new(lhs.0, start.0)));
        }
        if self.current_tag() == TokenTag::RBracket {
            self.advance();
            return Ok(self.ast.push_node(NodeTag::SliceOpen, lbracket, NodeData::new(lhs.0, start.0)));
        }
        if self.eat_token(TokenTag::Colon).is_some() {
            // `a[start.. :sentinel]` — open-ended slice with a sentinel,
            // no end expression.
            let sentinel = self.expect_expr()?;
            self.expect_token(TokenTag::RBracket)?;
            let extra =
                self.ast.add_extra_record(crate::extra::SliceSentinel { start, end: None.into(), sentinel });
            return Ok(self.ast.push_node(NodeTag::SliceSentinel, lbracket, NodeData::new(lhs.0, extra)));
        }
        let end = self.expect_expr()?;
        if self.eat_token(TokenTag::Colon).is_some() {
            let sentinel = self.expect_expr()?;
            self.expect_token(TokenTag::RBracket)?;
            let extra = self.ast.add_extra_record(crate::extra::SliceSentinel {
                start,
                end: Some(end).into(),
                sentinel,
            });
            return Ok(self.ast.push_node(NodeTag::SliceSentinel, lbracket, NodeData::new(lhs.0, extra)));
        }
        self.expect_token(TokenTag::RBracket)?;
        let extra = self.ast.add_extra_record(crate::extra::Slice { start, end });
        Ok(self.ast.push_node(NodeTag::Slice, lbracket, NodeData::new(lhs.0, extra)))
    }

    fn parse_call_args(&mut self, callee: NodeIndex) -> PResult<NodeIndex> {
        let lparen = self.advance();
        let mark = self.scratch_top();
        let mut trailing_comma = false;
        if self.current_tag() != TokenTag::RParen {
            loop {
                let arg = self.expect_expr()?;
                self.scratch_push(arg);
                trailing_comma = self.eat_token(TokenTag::Comma).is_some();
                if !trailing_comma || self.current_tag() == TokenTag::RParen {
                    break;
                }
            }
        }
        self.expect_token(TokenTag::RParen)?;
        let count = self.scratch_top() - mark;
        Ok(match count {
            0 => self.ast.push_node(NodeTag::CallOne, lparen, NodeData::new(callee.0, 0)),
            1 => {
                let arg = self.scratch_slice_from(mark)[0];
                self.scratch.truncate(mark);
                let tag = if trailing_comma { NodeTag::CallOneComma } else { NodeTag::CallOne };
                self.ast.push_node(tag, lparen, NodeData::new(callee.0, arg.0))
            }
            _ => {
                let range = self.extra_range_from_scratch(mark);
                let extra = self.ast.add_extra_record(crate::extra::ParamRange { start: range.start, end: range.end });
                let tag = if trailing_comma { NodeTag::CallComma } else { NodeTag::Call };
                self.ast.push_node(tag, lparen, NodeData::new(callee.0, extra))
            }
        })
    }

    /// Dispatches on the head token: literals, `@builtin(...)`, `fn`,
    /// `if`/`switch`/`for`/`while` in value position, blocks (optionally
    /// labeled), container decls, `.` initializer lists, `error{...}`,
    /// `(expr)` (`spec.md` §4.4).
    pub(crate) fn parse_primary_expr(&mut self) -> PResult<NodeIndex> {
        match self.current_tag() {
            TokenTag::NumberLiteral => {
                let tok = self.advance();
                Ok(self.ast.push_node(NodeTag::NumberLiteral, tok, NodeData::default()))
            }
            TokenTag::StringLiteral => {
                let tok = self.advance();
                Ok(self.ast.push_node(NodeTag::StringLiteral, tok, NodeData::default()))
            }
            TokenTag::MultilineStringLiteralLine => {
                let tok = self.advance();
                while self.current_tag() == TokenTag::MultilineStringLiteralLine {
                    self.advance();
                }
                Ok(self.ast.push_node(NodeTag::MultilineStringLiteral, tok, NodeData::default()))
            }
            TokenTag::CharLiteral => {
                let tok = self.advance();
                Ok(self.ast.push_node(NodeTag::CharLiteral, tok, NodeData::default()))
            }
            TokenTag::KeywordUnreachable => {
                let tok = self.advance();
                Ok(self.ast.push_node(NodeTag::UnreachableLiteral, tok, NodeData::default()))
            }
            TokenTag::KeywordNull | TokenTag::KeywordUndefined => {
                // Neither `spec.md` nor this grammar's keyword set carries a
                // dedicated literal tag for these; they resolve the same way
                // a bare identifier does, anchored at the keyword token.
                let tok = self.advance();
                Ok(self.ast.push_node(NodeTag::Identifier, tok, NodeData::default()))
            }
            TokenTag::KeywordAnyframe => self.parse_anyframe(),
            TokenTag::Identifier => {
                if self.peek_tag(1) == TokenTag::Colon && self.labelable_after_colon(2) {
                    return self.parse_labeled(true);
                }
                let tok = self.advance();
                Ok(self.ast.push_node(NodeTag::Identifier, tok, NodeData::default()))
            }
            TokenTag::Builtin => self.parse_builtin_call(),
            TokenTag::KeywordFn => self.expect_fn_proto(),
            TokenTag::KeywordIf => self.expect_if_expr(),
            TokenTag::KeywordSwitch => self.expect_switch_expr(),
            TokenTag::KeywordFor => self.expect_for_expr(),
            TokenTag::KeywordWhile => self.expect_while_expr(),
            TokenTag::LBrace => self.expect_block(),
            TokenTag::KeywordComptime => {
                let tok = self.advance();
                let operand = self.expect_expr()?;
                Ok(self.ast.push_node(NodeTag::Comptime, tok, NodeData::new(operand.0, 0)))
            }
            TokenTag::KeywordNosuspend => {
                let tok = self.advance();
                let operand = self.expect_expr()?;
                Ok(self.ast.push_node(NodeTag::Nosuspend, tok, NodeData::new(operand.0, 0)))
            }
            TokenTag::KeywordSuspend => {
                let tok = self.advance();
                Ok(self.ast.push_node(NodeTag::Suspend, tok, NodeData::default()))
            }
            TokenTag::KeywordResume => {
                let tok = self.advance();
                let operand = self.expect_expr()?;
                Ok(self.ast.push_node(NodeTag::Resume, tok, NodeData::new(operand.0, 0)))
            }
            TokenTag::KeywordBreak => {
                let tok = self.advance();
                self.eat_token(TokenTag::Colon).map(|_| self.expect_token(TokenTag::Identifier)).transpose()?;
                let value = if self.can_start_expr() { Some(self.expect_expr()?) } else { None };
                Ok(self.ast.push_node(NodeTag::Break, tok, NodeData::new(0, opt_raw(value))))
            }
            TokenTag::KeywordContinue => {
                let tok = self.advance();
                self.eat_token(TokenTag::Colon).map(|_| self.expect_token(TokenTag::Identifier)).transpose()?;
                Ok(self.ast.push_node(NodeTag::Continue, tok, NodeData::default()))
            }
            TokenTag::KeywordReturn => {
                let tok = self.advance();
                let value = if self.can_start_expr() { Some(self.expect_expr()?) } else { None };
                Ok(self.ast.push_node(NodeTag::Return, tok, NodeData::new(opt_raw(value), 0)))
            }
            TokenTag::KeywordStruct | TokenTag::KeywordUnion | TokenTag::KeywordEnum | TokenTag::KeywordOpaque => {
                self.expect_container_decl()
            }
            TokenTag::Period => self.parse_dot_expr(),
            TokenTag::KeywordError => self.parse_error_expr(),
            TokenTag::LParen => {
                let lparen = self.advance();
                let inner = self.expect_expr()?;
                self.expect_token(TokenTag::RParen)?;
                Ok(self.ast.push_node(NodeTag::GroupedExpression, lparen, NodeData::new(inner.0, 0)))
            }
            TokenTag::KeywordAsm => self.expect_asm(),
            _ => {
                self.push_diag(Diagnostic::new(DiagnosticTag::ExpectedExpr, self.pos));
                Err(ParseError)
            }
        }
    }

    /// Whether the token at `self.pos + offset` begins a construct that can
    /// carry a label (`{`, `for`, `while`, `switch`) — used to decide
    /// whether `ident:` ahead is a label or just an identifier expression
    /// (`spec.md` §4.7).
    fn labelable_after_colon(&self, offset: u32) -> bool {
        matches!(
            self.peek_tag(offset),
            TokenTag::LBrace | TokenTag::KeywordFor | TokenTag::KeywordWhile | TokenTag::KeywordSwitch
        )
    }

    pub(crate) fn can_start_expr(&self) -> bool {
        !matches!(
            self.current_tag(),
            TokenTag::Semicolon
                | TokenTag::RBrace
                | TokenTag::RParen
                | TokenTag::RBracket
                | TokenTag::Comma
                | TokenTag::Colon
                | TokenTag::Eof
        )
    }

    fn parse_anyframe(&mut self) -> PResult<NodeIndex> {
        let tok = self.advance();
        if self.eat_token(TokenTag::MinusAngleBracketRight).is_some() {
            let child = self.expect_type_expr()?;
            return Ok(self.ast.push_node(NodeTag::AnyframeType, tok, NodeData::new(0, child.0)));
        }
        Ok(self.ast.push_node(NodeTag::AnyframeLiteral, tok, NodeData::default()))
    }

    /// `@name(args...)` (`spec.md` §4.4).
    fn parse_builtin_call(&mut self) -> PResult<NodeIndex> {
        let builtin = self.advance();
        self.expect_token(TokenTag::LParen)?;
        let mark = self.scratch_top();
        let mut trailing_comma = false;
        if self.current_tag() != TokenTag::RParen {
            loop {
                let arg = self.expect_expr()?;
                self.scratch_push(arg);
                trailing_comma = self.eat_token(TokenTag::Comma).is_some();
                if !trailing_comma || self.current_tag() == TokenTag::RParen {
                    break;
                }
            }
        }
        self.expect_token(TokenTag::RParen)?;
        let count = self.scratch_top() - mark;
        Ok(if count <= 2 {
            let items: Vec<NodeIndex> = self.scratch.drain(mark..).collect();
            let mut it = items.into_iter();
            let a = it.next();
            let b = it.next();
            let tag = if trailing_comma { NodeTag::BuiltinCallTwoComma } else { NodeTag::BuiltinCallTwo };
            self.ast.push_node(tag, builtin, NodeData::new(opt_raw(a), opt_raw(b)))
        } else {
            let range = self.extra_range_from_scratch(mark);
            let tag = if trailing_comma { NodeTag::BuiltinCallComma } else { NodeTag::BuiltinCall };
            self.ast.push_node(tag, builtin, NodeData::new(range.start, range.end))
        })
    }

    /// `struct`/`union`/`enum`/`opaque`, optionally `(arg)`, then a
    /// `{ members }` body (`spec.md` §4.2, §4.4). `union(enum)` and
    /// `union(enum(Tag))` are the tagged-union sugar and get their own
    /// node-tag family rather than treating `enum`/`enum(Tag)` as an
    /// ordinary arg expression.
    pub(crate) fn expect_container_decl(&mut self) -> PResult<NodeIndex> {
        let main_tok = self.advance();
        let is_union = self.tok_tag(main_tok) == TokenTag::KeywordUnion;

        let mut arg_expr = None;
        let mut tagged_union = false;
        let mut enum_tag_type_expr = None;

        if self.eat_token(TokenTag::LParen).is_some() {
            if is_union && self.current_tag() == TokenTag::KeywordEnum {
                self.advance();
                if self.eat_token(TokenTag::LParen).is_some() {
                    enum_tag_type_expr = Some(self.expect_expr()?);
                    self.expect_token(TokenTag::RParen)?;
                }
                tagged_union = true;
            } else {
                arg_expr = Some(self.expect_expr()?);
            }
            self.expect_token(TokenTag::RParen)?;
        }

        self.expect_token(TokenTag::LBrace)?;
        let members = self.parse_container_members(false);
        self.expect_token(TokenTag::RBrace)?;

        let count = members.len(self);
        let trailing = members.trailing;

        if tagged_union {
            if let Some(tag_ty) = enum_tag_type_expr {
                let range = members.into_range(self);
                let extra = self.ast.add_extra_record(crate::extra::ParamRange { start: range.start, end: range.end });
                let tag = if trailing { NodeTag::TaggedUnionEnumTagTrailing } else { NodeTag::TaggedUnionEnumTag };
                return Ok(self.ast.push_node(tag, main_tok, NodeData::new(tag_ty.0, extra)));
            }
            return Ok(if count <= 2 {
                let (a, b) = members.pop_up_to_two(self);
                let tag = if trailing { NodeTag::TaggedUnionTwoTrailing } else { NodeTag::TaggedUnionTwo };
                self.ast.push_node(tag, main_tok, NodeData::new(opt_raw(a), opt_raw(b)))
            } else {
                let range = members.into_range(self);
                let tag = if trailing { NodeTag::TaggedUnionTrailing } else { NodeTag::TaggedUnion };
                self.ast.push_node(tag, main_tok, NodeData::new(range.start, range.end))
            });
        }

        if let Some(arg) = arg_expr {
            let range = members.into_range(self);
            let extra = self.ast.add_extra_record(crate::extra::ParamRange { start: range.start, end: range.end });
            let tag = if trailing { NodeTag::ContainerDeclArgTrailing } else { NodeTag::ContainerDeclArg };
            return Ok(self.ast.push_node(tag, main_tok, NodeData::new(arg.0, extra)));
        }

        Ok(if count <= 2 {
            let (a, b) = members.pop_up_to_two(self);
            let tag = if trailing { NodeTag::ContainerDeclTwoTrailing } else { NodeTag::ContainerDeclTwo };
            self.ast.push_node(tag, main_tok, NodeData::new(opt_raw(a), opt_raw(b)))
        } else {
            let range = members.into_range(self);
            let tag = if trailing { NodeTag::ContainerDeclTrailing } else { NodeTag::ContainerDecl };
            self.ast.push_node(tag, main_tok, NodeData::new(range.start, range.end))
        })
    }

    /// `.{ ... }` (anonymous struct/array init) or `.Foo` (enum literal)
    /// (`spec.md` §4.4).
    fn parse_dot_expr(&mut self) -> PResult<NodeIndex> {
        let period = self.advance();
        match self.current_tag() {
            TokenTag::LBrace => self.parse_init_list(period, None),
            TokenTag::Identifier => {
                let name = self.advance();
                Ok(self.ast.push_node(NodeTag::EnumLiteral, period, NodeData::new(0, name)))
            }
            _ => {
                self.push_diag(Diagnostic::new(DiagnosticTag::ExpectedExpr, self.pos));
                Err(ParseError)
            }
        }
    }

    /// `error{ A, B }` or `error.Foo` (`spec.md` §4.4).
    fn parse_error_expr(&mut self) -> PResult<NodeIndex> {
        let error_tok = self.advance();
        if self.current_tag() != TokenTag::LBrace {
            self.expect_token(TokenTag::Period)?;
            let name = self.expect_token(TokenTag::Identifier)?;
            return Ok(self.ast.push_node(NodeTag::ErrorValue, error_tok, NodeData::new(0, name)));
        }
        self.advance(); // `{`
        let mark = self.scratch_top();
        loop {
            if self.current_tag() == TokenTag::RBrace {
                break;
            }
            let name = self.expect_token(TokenTag::Identifier)?;
            let ident = self.ast.push_node(NodeTag::Identifier, name, NodeData::default());
            self.scratch_push(ident);
            if self.eat_token(TokenTag::Comma).is_none() {
                break;
            }
        }
        self.expect_token(TokenTag::RBrace)?;
        let range = self.extra_range_from_scratch(mark);
        Ok(self.ast.push_node(NodeTag::ErrorSetDecl, error_tok, NodeData::new(range.start, range.end)))
    }

    /// `T{ ... }` (struct/array initializer bound to a type) called from
    /// the suffix chain once a `.` following a primary resolves to `{`.
    /// Also used for the anonymous `.{ ... }` form with `lhs_type = None`.
    fn parse_init_list(&mut self, main_token: u32, lhs_type: Option<NodeIndex>) -> PResult<NodeIndex> {
        self.expect_token(TokenTag::LBrace)?;
        if self.current_tag() == TokenTag::RBrace {
            self.advance();
            return Ok(match lhs_type {
                Some(ty) => self.ast.push_node(NodeTag::StructInitOne, main_token, NodeData::new(ty.0, 0)),
                None => self.ast.push_node(NodeTag::StructInitDotTwo, main_token, NodeData::default()),
            });
        }

        // Disambiguate struct-init (`.field = value`) from array-init (bare
        // expressions) by inspecting the first element.
        let is_struct = self.current_tag() == TokenTag::Period && self.peek_tag(1) == TokenTag::Identifier && self.peek_tag(2) == TokenTag::Equal;

        let mark = self.scratch_top();
        let mut trailing_comma = false;
        loop {
            if self.current_tag() == TokenTag::RBrace {
                break;
            }
            let item = if is_struct {
                self.expect_token(TokenTag::Period)?;
                let name = self.expect_token(TokenTag::Identifier)?;
                self.expect_token(TokenTag::Equal)?;
                let value = self.expect_expr()?;
                self.ast.push_node(NodeTag::ContainerFieldInit, name, NodeData::new(0, value.0))
            } else {
                self.expect_expr()?
            };
            self.scratch_push(item);
            trailing_comma = self.eat_token(TokenTag::Comma).is_some();
            if !trailing_comma {
                break;
            }
        }
        self.expect_token(TokenTag::RBrace)?;
        let count = self.scratch_top() - mark;

        Ok(match (lhs_type, is_struct, count <= 2) {
            (Some(ty), true, true) => {
                let item = self.scratch_slice_from(mark).first().copied();
                self.scratch.truncate(mark);
                let tag = if trailing_comma { NodeTag::StructInitOneComma } else { NodeTag::StructInitOne };
                self.ast.push_node(tag, main_token, NodeData::new(ty.0, opt_raw(item)))
            }
            (Some(ty), true, false) => {
                let range = self.extra_range_from_scratch(mark);
                let tag = if trailing_comma { NodeTag::StructInitComma } else { NodeTag::StructInit };
                let extra = self.ast.add_extra_record(crate::extra::ParamRange { start: range.start, end: range.end });
                self.ast.push_node(tag, main_token, NodeData::new(ty.0, extra))
            }
            (Some(ty), false, true) => {
                let item = self.scratch_slice_from(mark).first().copied();
                self.scratch.truncate(mark);
                let tag = if trailing_comma { NodeTag::ArrayInitOneComma } else { NodeTag::ArrayInitOne };
                self.ast.push_node(tag, main_token, NodeData::new(ty.0, opt_raw(item)))
            }
            (Some(ty), false, false) => {
                let range = self.extra_range_from_scratch(mark);
                let tag = if trailing_comma { NodeTag::ArrayInitComma } else { NodeTag::ArrayInit };
                let extra = self.ast.add_extra_record(crate::extra::ParamRange { start: range.start, end: range.end });
                self.ast.push_node(tag, main_token, NodeData::new(ty.0, extra))
            }
            (None, true, true) => {
                let items: Vec<NodeIndex> = self.scratch.drain(mark..).collect();
                let mut it = items.into_iter();
                let a = it.next();
                let b = it.next();
                let tag = if trailing_comma { NodeTag::StructInitDotTwoComma } else { NodeTag::StructInitDotTwo };
                self.ast.push_node(tag, main_token, NodeData::new(opt_raw(a), opt_raw(b)))
            }
            (None, true, false) => {
                let range = self.extra_range_from_scratch(mark);
                let tag = if trailing_comma { NodeTag::StructInitDotComma } else { NodeTag::StructInitDot };
                self.ast.push_node(tag, main_token, NodeData::new(range.start, range.end))
            }
            (None, false, true) => {
                let items: Vec<NodeIndex> = self.scratch.drain(mark..).collect();
                let mut it = items.into_iter();
                let a = it.next();
                let b = it.next();
                let tag = if trailing_comma { NodeTag::ArrayInitDotTwoComma } else { NodeTag::ArrayInitDotTwo };
                self.ast.push_node(tag, main_token, NodeData::new(opt_raw(a), opt_raw(b)))
            }
            (None, false, false) => {
                let range = self.extra_range_from_scratch(mark);
                let tag = if trailing_comma { NodeTag::ArrayInitDotComma } else { NodeTag::ArrayInitDot };
                self.ast.push_node(tag, main_token, NodeData::new(range.start, range.end))
            }
        })
    }

    // --- Type expressions (`spec.md` §4.4) ---------------------------------

    /// `?T`, `anyframe->T`, pointer/array/slice heads with modifier suites,
    /// falling back to the ordinary expression grammar (plus a trailing
    /// `!T` error-union) for everything else.
    pub(crate) fn expect_type_expr(&mut self) -> PResult<NodeIndex> {
        match self.current_tag() {
            TokenTag::QuestionMark => {
                let tok = self.advance();
                let child = self.expect_type_expr()?;
                Ok(self.ast.push_node(NodeTag::OptionalType, tok, NodeData::new(child.0, 0)))
            }
            TokenTag::KeywordAnyframe if self.peek_tag(1) == TokenTag::MinusAngleBracketRight => self.parse_anyframe(),
            TokenTag::Asterisk | TokenTag::AsteriskAsterisk => self.parse_pointer_type(),
            TokenTag::LBracket => self.parse_bracket_type(),
            _ => {
                let lhs = self.expect_expr()?;
                if let Some(bang) = self.eat_token(TokenTag::Bang) {
                    let rhs = self.expect_type_expr()?;
                    return Ok(self.ast.push_node(NodeTag::ErrorUnion, bang, NodeData::new(lhs.0, rhs.0)));
                }
                Ok(lhs)
            }
        }
    }

    /// `*T`, `**T` (sugar for `*(*T)`), with an optional modifier suite
    /// (`align`, `addrspace`, `const`, `volatile`, `allowzero`) collapsing
    /// to the smallest node shape the modifiers need (`spec.md` §4.4).
    fn parse_pointer_type(&mut self) -> PResult<NodeIndex> {
        let star_tok = self.advance();
        if self.tok_tag(star_tok) == TokenTag::AsteriskAsterisk {
            // `**T` desugars to `*(*T)`; the inner pointer reuses the same
            // token as its main_token since there is only one `**` token.
            let inner_child = self.parse_pointer_type_modifiers_and_child(star_tok)?;
            return Ok(self.ast.push_node(NodeTag::PtrTypeAligned, star_tok, NodeData::new(OptionalNodeIndex::NONE.raw(), inner_child.0)));
        }
        self.parse_pointer_type_modifiers_and_child(star_tok)
    }

    fn parse_pointer_type_modifiers_and_child(&mut self, main_tok: u32) -> PResult<NodeIndex> {
        let mods = self.parse_ptr_modifiers()?;
        let child = self.expect_type_expr()?;
        Ok(self.pack_ptr_type(main_tok, None, mods, child))
    }

    struct_ptr_mods!();

    fn parse_bracket_type(&mut self) -> PResult<NodeIndex> {
        let lbracket = self.advance();
        if self.eat_token(TokenTag::Asterisk).is_some() {
            // `[*]T`, `[*:s]T` — many-item pointer.
            let sentinel = if self.eat_token(TokenTag::Colon).is_some() { Some(self.expect_expr()?) } else { None };
            self.expect_token(TokenTag::RBracket)?;
            let mods = self.parse_ptr_modifiers()?;
            let child = self.expect_type_expr()?;
            return Ok(self.pack_ptr_type(lbracket, sentinel, mods, child));
        }
        if self.eat_token(TokenTag::Colon).is_some() {
            // `[:s]T` — sentinel-terminated slice.
            let sentinel = self.expect_expr()?;
            self.expect_token(TokenTag::RBracket)?;
            let mods = self.parse_ptr_modifiers()?;
            let child = self.expect_type_expr()?;
            return Ok(self.pack_ptr_type(lbracket, Some(sentinel), mods, child));
        }
        if self.eat_token(TokenTag::RBracket).is_some() {
            // `[]T` — slice.
            let mods = self.parse_ptr_modifiers()?;
            let child = self.expect_type_expr()?;
            return Ok(self.pack_ptr_type(lbracket, None, mods, child));
        }
        // `[n]T` or `[n:s]T` — array type.
        let len = self.expect_expr()?;
        if self.eat_token(TokenTag::Colon).is_some() {
            let sentinel = self.expect_expr()?;
            self.expect_token(TokenTag::RBracket)?;
            let elem = self.expect_type_expr()?;
            let extra = self.ast.add_extra_record(crate::extra::ArrayTypeSentinel { sentinel, elem_type: elem });
            return Ok(self.ast.push_node(NodeTag::ArrayTypeSentinel, lbracket, NodeData::new(len.0, extra)));
        }
        self.expect_token(TokenTag::RBracket)?;
        let elem = self.expect_type_expr()?;
        Ok(self.ast.push_node(NodeTag::ArrayType, lbracket, NodeData::new(len.0, elem.0)))
    }

    fn pack_ptr_type(&mut self, main_tok: u32, sentinel: Option<NodeIndex>, mods: PtrModifiers, child: NodeIndex) -> NodeIndex {
        if let (Some(bit_start), Some(bit_end)) = (mods.bit_range_start, mods.bit_range_end) {
            if matches!(self.ast.node(child).tag, NodeTag::ArrayType | NodeTag::ArrayTypeSentinel) {
                self.push_diag(Diagnostic::new(DiagnosticTag::PtrModOnArrayChildType, main_tok));
            }
            let extra = self.ast.add_extra_record(crate::extra::PtrTypeBitRange {
                sentinel: sentinel.into(),
                align_expr: mods.align_expr.unwrap_or(NodeIndex::ROOT),
                addrspace_expr: mods.addrspace_expr.into(),
                bit_range_start: bit_start,
                bit_range_end: bit_end,
            });
            return self.ast.push_node(NodeTag::PtrTypeBitRange, main_tok, NodeData::new(extra, child.0));
        }
        if mods.align_expr.is_none() && mods.addrspace_expr.is_none() && !mods.is_const && !mods.is_volatile && !mods.is_allowzero {
            if let Some(s) = sentinel {
                return self.ast.push_node(NodeTag::PtrTypeSentinel, main_tok, NodeData::new(s.0, child.0));
            }
            return self.ast.push_node(NodeTag::PtrTypeAligned, main_tok, NodeData::new(OptionalNodeIndex::NONE.raw(), child.0));
        }
        if sentinel.is_none() && mods.addrspace_expr.is_none() && !mods.is_const && !mods.is_volatile && !mods.is_allowzero {
            if let Some(a) = mods.align_expr {
                return self.ast.push_node(NodeTag::PtrTypeAligned, main_tok, NodeData::new(OptionalNodeIndex::some(a).raw(), child.0));
            }
        }
        let extra = self.ast.add_extra_record(crate::extra::PtrType {
            sentinel: sentinel.into(),
            align_expr: mods.align_expr.into(),
            addrspace_expr: mods.addrspace_expr.into(),
        });
        self.ast.push_node(NodeTag::PtrType, main_tok, NodeData::new(extra, child.0))
    }
}

#[derive(Default)]
struct PtrModifiers {
    align_expr: Option<NodeIndex>,
    addrspace_expr: Option<NodeIndex>,
    bit_range_start: Option<NodeIndex>,
    bit_range_end: Option<NodeIndex>,
    is_const: bool,
    is_volatile: bool,
    is_allowzero: bool,
}

/// Parses the `align(e[:s:e])? addrspace(e)? const? volatile? allowzero?`
/// suite in any order (`spec.md` §4.4), diagnosing duplicates and an
/// align-less bit-range.
macro_rules! struct_ptr_mods {
    () => {
        fn parse_ptr_modifiers(&mut self) -> PResult<PtrModifiers> {
            let mut m = PtrModifiers::default();
            loop {
                match self.current_tag() {
                    TokenTag::KeywordAlign => {
                        self.advance();
                        self.expect_token(TokenTag::LParen)?;
                        let align_expr = self.expect_expr()?;
                        if self.eat_token(TokenTag::Colon).is_some() {
                            let start = self.expect_expr()?;
                            self.expect_token(TokenTag::Colon)?;
                            let end = self.expect_expr()?;
                            m.bit_range_start = Some(start);
                            m.bit_range_end = Some(end);
                        }
                        self.expect_token(TokenTag::RParen)?;
                        if m.align_expr.replace(align_expr).is_some() {
                            self.push_diag(Diagnostic::new(DiagnosticTag::ExtraAlignQualifier, self.pos));
                        }
                    }
                    TokenTag::KeywordAddrspace => {
                        self.advance();
                        let e = self.parse_paren_expr()?;
                        if m.addrspace_expr.replace(e).is_some() {
                            self.push_diag(Diagnostic::new(DiagnosticTag::ExtraAddrspaceQualifier, self.pos));
                        }
                    }
                    TokenTag::KeywordConst => {
                        self.advance();
                        if m.is_const {
                            self.push_diag(Diagnostic::new(DiagnosticTag::ExtraConstQualifier, self.pos));
                        }
                        m.is_const = true;
                    }
                    TokenTag::KeywordVolatile => {
                        self.advance();
                        if m.is_volatile {
                            self.push_diag(Diagnostic::new(DiagnosticTag::ExtraVolatileQualifier, self.pos));
                        }
                        m.is_volatile = true;
                    }
                    TokenTag::KeywordAllowzero => {
                        self.advance();
                        if m.is_allowzero {
                            self.push_diag(Diagnostic::new(DiagnosticTag::ExtraAllowzeroQualifier, self.pos));
                        }
                        m.is_allowzero = true;
                    }
                    _ => break,
                }
            }
            if (m.bit_range_start.is_some() || m.bit_range_end.is_some()) && m.align_expr.is_none() {
                self.push_diag(Diagnostic::new(DiagnosticTag::InvalidBitRange, self.pos));
            }
            Ok(m)
        }
    };
}
use struct_ptr_mods;
