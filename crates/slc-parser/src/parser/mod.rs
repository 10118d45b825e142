//! The recursive-descent engine (`spec.md` §2, §4, §9).
//!
//! Grammar productions are mutually recursive methods on [`Parser`], split
//! across submodules by grammar area the way the teacher repo splits its
//! own parser by sentence category: this module owns the token cursor,
//! top-level entry points, container-member parsing, and recovery
//! scanning; [`expr`] owns expressions and type syntax; [`stmt`] owns
//! statements; [`control`] owns `if`/`for`/`while`/`switch`; [`decl`] owns
//! function prototypes and variable declarations; [`asm`] owns inline
//! assembly.

mod asm;
mod control;
mod decl;
mod expr;
mod stmt;

#[cfg(test)]
mod tests;

use crate::ast::{Ast, NodeData, NodeIndex, NodeTag, SubRange};
use crate::diagnostics::{Diagnostic, DiagnosticTag};
use crate::error::{ParseError, PResult};
use slc_lexer::{Token, TokenTag};

/// Owns the parser's cursor over an immutable token array and builds an
/// [`Ast`]. One instance parses exactly one token stream.
pub struct Parser<'s> {
    pub(crate) ast: Ast<'s>,
    pub(crate) pos: u32,
    pub(crate) scratch: Vec<NodeIndex>,
}

/// Parses `source`/`tokens` as a full program (`spec.md` §4.1
/// `parse_root`). Node 0 is allocated as `root`; members are parsed until
/// end-of-input, which is required to follow the last member.
pub fn parse_root<'s>(source: &'s str, tokens: &'s [Token]) -> Ast<'s> {
    let mut parser = Parser::new(source, tokens);
    let root = parser.ast.reserve_node();
    debug_assert_eq!(root, NodeIndex::ROOT);

    let members = parser.parse_container_members(true);
    let range = parser.extra_range_from_scratch(members.mark);

    if parser.current_tag() != TokenTag::Eof {
        parser.push_expected_token(TokenTag::Eof);
    }

    parser.ast.set_node(root, NodeTag::Root, 0, NodeData::new(range.start, range.end));
    parser.ast
}

/// Parses `source`/`tokens` as a single "object notation" value (`spec.md`
/// §4.1 `parse_zon`). Enforcement that the expression belongs to a
/// restricted literal-value subset is deferred — see `DESIGN.md` Open
/// Question 1.
// TODO: once a restricted-literal-subset flag exists, validate `expr` here
// instead of accepting any expression.
pub fn parse_zon<'s>(source: &'s str, tokens: &'s [Token]) -> Ast<'s> {
    let mut parser = Parser::new(source, tokens);
    let root = parser.ast.reserve_node();
    debug_assert_eq!(root, NodeIndex::ROOT);

    let expr = parser.expect_expr().unwrap_or(NodeIndex::ROOT);

    if parser.current_tag() != TokenTag::Eof {
        parser.push_expected_token(TokenTag::Eof);
    }

    parser.ast.set_node(root, NodeTag::Root, 0, NodeData::new(expr.0, 0));
    parser.ast
}

impl<'s> Parser<'s> {
    fn new(source: &'s str, tokens: &'s [Token]) -> Self {
        Parser { ast: Ast::new(source, tokens), pos: 0, scratch: Vec::new() }
    }

    // --- Token cursor ----------------------------------------------------

    pub(crate) fn tok_tag(&self, index: u32) -> TokenTag {
        self.ast.tokens[index as usize].tag
    }

    pub(crate) fn current_tag(&self) -> TokenTag {
        self.tok_tag(self.pos)
    }

    pub(crate) fn peek_tag(&self, ahead: u32) -> TokenTag {
        let idx = (self.pos + ahead) as usize;
        if idx < self.ast.tokens.len() {
            self.ast.tokens[idx].tag
        } else {
            TokenTag::Eof
        }
    }

    /// Byte offset just past the last byte of token `index`.
    pub(crate) fn token_end(&self, index: u32) -> usize {
        let next = index as usize + 1;
        if next < self.ast.tokens.len() {
            self.ast.tokens[next].start as usize
        } else {
            self.ast.source.len()
        }
    }

    /// Whether there is a `\n` byte between the end of token `index - 1`
    /// and the start of token `index` — used by the look-back adjustment
    /// described in `spec.md` §9.
    fn starts_new_line(&self, index: u32) -> bool {
        if index == 0 {
            return false;
        }
        let prev_end = self.token_end(index - 1);
        let this_start = self.ast.tokens[index as usize].start as usize;
        self.ast.source.as_bytes()[prev_end..this_start].contains(&b'\n')
    }

    /// Advances past the current token, returning its index.
    pub(crate) fn advance(&mut self) -> u32 {
        let idx = self.pos;
        if self.tok_tag(idx) != TokenTag::Eof {
            self.pos += 1;
        }
        idx
    }

    /// Consumes the current token if it matches `tag`.
    pub(crate) fn eat_token(&mut self, tag: TokenTag) -> Option<u32> {
        if self.current_tag() == tag {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consumes the current token if it matches `tag`; otherwise pushes an
    /// `expected_token` diagnostic (with the look-back adjustment applied)
    /// and raises [`ParseError`] without consuming.
    pub(crate) fn expect_token(&mut self, tag: TokenTag) -> PResult<u32> {
        if let Some(idx) = self.eat_token(tag) {
            return Ok(idx);
        }
        self.push_expected_token(tag);
        Err(ParseError)
    }

    pub(crate) fn push_expected_token(&mut self, expected: TokenTag) {
        let (token, token_is_prev) = self.lookback_target();
        self.push_diag(
            Diagnostic::new(DiagnosticTag::ExpectedToken, token)
                .with_expected(expected)
                .with_token_is_prev(token_is_prev),
        );
    }

    /// A missing separator (comma, colon in a list) is diagnosed but never
    /// fatal: the caller keeps parsing the list from the current token.
    pub(crate) fn expect_comma_recoverable(&mut self, tag: DiagnosticTag) {
        if self.eat_token(TokenTag::Comma).is_some() {
            return;
        }
        self.push_diag(Diagnostic::new(tag, self.pos).with_expected(TokenTag::Comma));
    }

    fn lookback_target(&self) -> (u32, bool) {
        if self.pos > 0 && self.starts_new_line(self.pos) {
            (self.pos - 1, true)
        } else {
            (self.pos, false)
        }
    }

    pub(crate) fn push_diag(&mut self, diag: Diagnostic) {
        self.ast.errors.push(diag);
    }

    pub(crate) fn main_token_of(&self, node: NodeIndex) -> u32 {
        self.ast.node(node).main_token
    }

    // --- Scratch stack -----------------------------------------------------

    pub(crate) fn scratch_top(&self) -> usize {
        self.scratch.len()
    }

    pub(crate) fn scratch_push(&mut self, node: NodeIndex) {
        self.scratch.push(node);
    }

    pub(crate) fn scratch_slice_from(&self, mark: usize) -> &[NodeIndex] {
        &self.scratch[mark..]
    }

    /// Pops everything pushed since `mark`, writing it into the extra
    /// arena as a sub-range.
    pub(crate) fn extra_range_from_scratch(&mut self, mark: usize) -> SubRange {
        let items: Vec<NodeIndex> = self.scratch.drain(mark..).collect();
        self.ast.add_extra_node_list(&items)
    }

    // --- Container members (spec.md §4.2) -----------------------------------

    /// Accumulates members onto the scratch stack until end-of-input or a
    /// closing brace. `top_level` suppresses the `}` terminator.
    pub(crate) fn parse_container_members(&mut self, top_level: bool) -> MemberList {
        let mark = self.scratch_top();
        let mut field_state = FieldState::None;
        let mut trailing = false;

        loop {
            let doc_comment_start = self.eat_doc_comments();

            match self.current_tag() {
                TokenTag::KeywordTest => {
                    if doc_comment_start.is_some() {
                        self.push_diag(Diagnostic::new(DiagnosticTag::TestDocComment, self.pos));
                    }
                    match self.expect_test_decl() {
                        Ok(node) => {
                            self.scratch_push(node);
                            trailing = false;
                        }
                        Err(ParseError) => self.recover_to_next_member(),
                    }
                    continue;
                }
                TokenTag::KeywordComptime if self.peek_tag(1) == TokenTag::LBrace => {
                    if doc_comment_start.is_some() {
                        self.push_diag(Diagnostic::new(DiagnosticTag::ComptimeDocComment, self.pos));
                    }
                    let tok = self.advance();
                    match self.expect_block() {
                        Ok(block) => {
                            let node = self.ast.push_node(NodeTag::Comptime, tok, NodeData::new(block.0, 0));
                            self.scratch_push(node);
                            trailing = false;
                        }
                        Err(ParseError) => self.recover_to_next_member(),
                    }
                    continue;
                }
                TokenTag::RBrace if !top_level => break,
                TokenTag::Eof => break,
                _ => {}
            }

            match self.parse_top_level_item() {
                TopLevelOutcome::Decl(node) => {
                    let tok = self.main_token_of(node);
                    self.scratch_push(node);
                    trailing = false;
                    field_state.saw_decl(self, tok);
                }
                TopLevelOutcome::Field(node, has_comma) => {
                    let tok = self.main_token_of(node);
                    self.scratch_push(node);
                    trailing = has_comma;
                    field_state.saw_field(self, tok);
                    if !has_comma && !matches!(self.current_tag(), TokenTag::RBrace | TokenTag::Eof) {
                        self.push_diag(Diagnostic::new(DiagnosticTag::ExpectedCommaAfterField, self.pos));
                        self.recover_to_next_member();
                    }
                }
                TopLevelOutcome::Skip => self.recover_to_next_member(),
                TopLevelOutcome::End => break,
            }
        }

        MemberList { mark, trailing }
    }

    /// Returns the token index of the first doc-comment line if any were
    /// consumed (used for the "doc comment on the wrong kind of member"
    /// diagnostics).
    fn eat_doc_comments(&mut self) -> Option<u32> {
        let mut first = None;
        while self.current_tag() == TokenTag::DocComment {
            if self.peek_tag(1) != TokenTag::DocComment
                && !matches!(
                    self.peek_tag(1),
                    TokenTag::KeywordPub
                        | TokenTag::KeywordExport
                        | TokenTag::KeywordExtern
                        | TokenTag::KeywordInline
                        | TokenTag::KeywordNoinline
                        | TokenTag::KeywordThreadlocal
                        | TokenTag::KeywordConst
                        | TokenTag::KeywordVar
                        | TokenTag::KeywordFn
                        | TokenTag::KeywordTest
                        | TokenTag::KeywordComptime
                        | TokenTag::Identifier
                )
            {
                self.push_diag(Diagnostic::new(DiagnosticTag::UnattachedDocComment, self.pos));
            }
            first.get_or_insert(self.pos);
            self.advance();
        }
        first
    }

    fn parse_top_level_item(&mut self) -> TopLevelOutcome {
        match self.current_tag() {
            TokenTag::KeywordPub => {
                self.advance();
                match self.expect_top_level_decl() {
                    Ok(node) => TopLevelOutcome::Decl(node),
                    Err(ParseError) => TopLevelOutcome::Skip,
                }
            }
            TokenTag::KeywordExport
            | TokenTag::KeywordExtern
            | TokenTag::KeywordInline
            | TokenTag::KeywordNoinline
            | TokenTag::KeywordConst
            | TokenTag::KeywordVar
            | TokenTag::KeywordThreadlocal
            | TokenTag::KeywordFn => match self.expect_top_level_decl() {
                Ok(node) => TopLevelOutcome::Decl(node),
                Err(ParseError) => TopLevelOutcome::Skip,
            },
            TokenTag::KeywordStruct | TokenTag::KeywordUnion | TokenTag::KeywordEnum
                if self.looks_like_c_style_container() =>
            {
                self.recover_c_style_container();
                TopLevelOutcome::Skip
            }
            // `comptime` not followed by `{` is the `comptime` field modifier,
            // not a comptime block; the block form is intercepted earlier in
            // `parse_container_members`.
            TokenTag::KeywordComptime => {
                self.advance();
                match self.expect_container_field() {
                    Ok((node, has_comma)) => TopLevelOutcome::Field(node, has_comma),
                    Err(ParseError) => TopLevelOutcome::Skip,
                }
            }
            TokenTag::Identifier => match self.expect_container_field() {
                Ok((node, has_comma)) => TopLevelOutcome::Field(node, has_comma),
                Err(ParseError) => TopLevelOutcome::Skip,
            },
            TokenTag::RBrace | TokenTag::Eof => TopLevelOutcome::End,
            _ => {
                self.push_expected_token(TokenTag::Identifier);
                TopLevelOutcome::Skip
            }
        }
    }

    /// Detects the erroneous `struct IDENT { ... };` shape so it can be
    /// recovered with a targeted diagnostic instead of falling through to
    /// the generic "expected identifier" path.
    fn looks_like_c_style_container(&self) -> bool {
        self.peek_tag(1) == TokenTag::Identifier && self.peek_tag(2) == TokenTag::LBrace
    }

    fn recover_c_style_container(&mut self) {
        let kw = self.pos;
        self.push_diag(Diagnostic::new(DiagnosticTag::CStyleContainer, kw));
        self.push_diag(Diagnostic::note(DiagnosticTag::UnnamedContainerStyle, kw));
        self.advance(); // struct/union/enum
        self.advance(); // identifier
        self.skip_balanced_braces();
        self.eat_token(TokenTag::Semicolon);
    }

    fn skip_balanced_braces(&mut self) {
        if self.eat_token(TokenTag::LBrace).is_none() {
            return;
        }
        let mut depth = 1i32;
        loop {
            match self.current_tag() {
                TokenTag::LBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenTag::RBrace => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        break;
                    }
                }
                TokenTag::Eof => break,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// `name: Type align(x)? = value?` (`spec.md` §4.2).
    fn expect_container_field(&mut self) -> PResult<(NodeIndex, bool)> {
        let name = self.expect_token(TokenTag::Identifier)?;
        self.expect_token(TokenTag::Colon)?;
        let ty = self.expect_type_expr()?;

        let align_expr = if self.eat_token(TokenTag::KeywordAlign).is_some() {
            self.expect_token(TokenTag::LParen)?;
            let e = self.expect_expr()?;
            self.expect_token(TokenTag::RParen)?;
            Some(e)
        } else {
            None
        };

        let value_expr = if self.eat_token(TokenTag::Equal).is_some() { Some(self.expect_expr()?) } else { None };

        let node = match (align_expr, value_expr) {
            (None, None) => self.ast.push_node(NodeTag::ContainerField, name, NodeData::new(ty.0, 0)),
            (None, Some(v)) => self.ast.push_node(NodeTag::ContainerFieldInit, name, NodeData::new(ty.0, v.0)),
            (Some(a), v) => {
                let extra = self.ast.add_extra_record(crate::extra::ContainerField {
                    align_expr: a,
                    value_expr: v.unwrap_or(NodeIndex::ROOT),
                });
                self.ast.push_node(NodeTag::ContainerFieldAlign, name, NodeData::new(ty.0, extra))
            }
        };

        let has_comma = self.eat_token(TokenTag::Comma).is_some();
        Ok((node, has_comma))
    }

    /// `test "name"? { ... }` (`spec.md` §4.2).
    fn expect_test_decl(&mut self) -> PResult<NodeIndex> {
        let test_tok = self.advance();
        if self.eat_token(TokenTag::StringLiteral).is_none() {
            self.eat_token(TokenTag::Identifier);
        }
        let block = self.expect_block()?;
        Ok(self.ast.push_node(NodeTag::TestDecl, test_tok, NodeData::new(0, block.0)))
    }

    /// Skips forward looking for the next plausible start of a container
    /// member, tracking bracket depth so nested braces/parens don't fool
    /// the scanner (`spec.md` §4.2 `find_next_container_member`, §4.9).
    pub(crate) fn recover_to_next_member(&mut self) {
        log::trace!("recover_to_next_member: starting at token {}", self.pos);
        let mut depth = 0i32;
        loop {
            match self.current_tag() {
                TokenTag::LBrace | TokenTag::LParen | TokenTag::LBracket => {
                    depth += 1;
                    self.advance();
                }
                TokenTag::RBrace | TokenTag::RParen | TokenTag::RBracket => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.advance();
                }
                TokenTag::Semicolon | TokenTag::Comma if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenTag::KeywordTest
                | TokenTag::KeywordComptime
                | TokenTag::KeywordPub
                | TokenTag::KeywordExport
                | TokenTag::KeywordExtern
                | TokenTag::KeywordInline
                | TokenTag::KeywordNoinline
                | TokenTag::KeywordThreadlocal
                | TokenTag::KeywordConst
                | TokenTag::KeywordVar
                | TokenTag::KeywordFn
                    if depth == 0 =>
                {
                    return;
                }
                TokenTag::Identifier if depth == 0 && self.peek_tag(1) == TokenTag::Comma => return,
                TokenTag::Eof => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Scans for the next `;` at bracket depth zero — the statement-level
    /// counterpart of `recover_to_next_member` (`spec.md` §4.9).
    pub(crate) fn recover_to_next_statement(&mut self) {
        log::trace!("recover_to_next_statement: starting at token {}", self.pos);
        let mut depth = 0i32;
        loop {
            match self.current_tag() {
                TokenTag::LBrace | TokenTag::LParen | TokenTag::LBracket => {
                    depth += 1;
                    self.advance();
                }
                TokenTag::RBrace | TokenTag::RParen | TokenTag::RBracket => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.advance();
                }
                TokenTag::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenTag::Eof => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    pub(crate) fn expect_block(&mut self) -> PResult<NodeIndex> {
        control::expect_block(self)
    }
}

/// Result of one iteration of the top-level member loop.
enum TopLevelOutcome {
    Decl(NodeIndex),
    Field(NodeIndex, bool),
    /// Consumed via targeted recovery already; caller should keep looping
    /// without also invoking the generic scanner.
    Skip,
    /// `}` (nested) or end-of-input: stop the loop.
    End,
}

/// A span of members accumulated on the scratch stack, ready to be packed
/// into a container's payload once the caller decides between the
/// two-node-fields and extra-range encodings (`spec.md` §3 "if members <=
/// 2, data is opt_node_and_opt_node; otherwise extra-range").
pub(crate) struct MemberList {
    mark: usize,
    pub(crate) trailing: bool,
}

impl MemberList {
    pub(crate) fn len(&self, parser: &Parser) -> usize {
        parser.scratch.len() - self.mark
    }

    pub(crate) fn items<'p>(&self, parser: &'p Parser) -> &'p [NodeIndex] {
        parser.scratch_slice_from(self.mark)
    }

    pub(crate) fn into_range(self, parser: &mut Parser) -> SubRange {
        parser.extra_range_from_scratch(self.mark)
    }

    /// Consumes at most the first two accumulated members (there must be
    /// exactly that many, checked by the caller via `len`).
    pub(crate) fn pop_up_to_two(self, parser: &mut Parser) -> (Option<NodeIndex>, Option<NodeIndex>) {
        let items: Vec<NodeIndex> = parser.scratch.drain(self.mark..).collect();
        let mut it = items.into_iter();
        (it.next(), it.next())
    }
}

/// The four-state field tracker from `spec.md` §4.2: detects a
/// declaration appearing between two fields and reports it once, pointing
/// at the declaration with "previous field"/"next field" notes bracketing
/// it.
enum FieldState {
    None,
    SeenField(u32),
    DeclSinceField(u32, u32),
    Reported,
}

impl FieldState {
    fn saw_field(&mut self, parser: &mut Parser, field_token: u32) {
        match *self {
            FieldState::None | FieldState::SeenField(_) => *self = FieldState::SeenField(field_token),
            FieldState::DeclSinceField(prev_field, decl_token) => {
                parser.push_diag(Diagnostic::new(DiagnosticTag::DeclBetweenFields, decl_token));
                parser.push_diag(Diagnostic::note(DiagnosticTag::PreviousField, prev_field));
                parser.push_diag(Diagnostic::note(DiagnosticTag::NextField, field_token));
                *self = FieldState::Reported;
            }
            FieldState::Reported => {}
        }
    }

    fn saw_decl(&mut self, _parser: &mut Parser, decl_token: u32) {
        if let FieldState::SeenField(field_token) = *self {
            *self = FieldState::DeclSinceField(field_token, decl_token);
        }
    }
}
