//! Statements (`spec.md` §4.5): `comptime`/`nosuspend`/`defer`/`errdefer`
//! prefixes, the block-like forms reused from [`super::control`], and the
//! unifying var-decl/expression/destructure-assignment statement.

use super::Parser;
use crate::ast::{NodeData, NodeIndex, NodeTag};
use crate::error::PResult;
use slc_lexer::TokenTag;

impl<'s> Parser<'s> {
    /// Parses one statement, returning the node and whether it ended with
    /// an explicit trailing `;` consumed here — used by
    /// [`super::control::expect_block`] to choose between the plain and
    /// `_semicolon` block tag variants.
    pub(crate) fn parse_statement(&mut self) -> PResult<(NodeIndex, bool)> {
        match self.current_tag() {
            TokenTag::KeywordComptime if self.peek_tag(1) == TokenTag::LBrace => {
                let tok = self.advance();
                let block = self.expect_block()?;
                Ok((self.ast.push_node(NodeTag::Comptime, tok, NodeData::new(block.0, 0)), false))
            }
            TokenTag::KeywordComptime => {
                let tok = self.advance();
                let (inner, ends_semi) = self.parse_statement()?;
                Ok((self.ast.push_node(NodeTag::Comptime, tok, NodeData::new(inner.0, 0)), ends_semi))
            }
            TokenTag::KeywordNosuspend => {
                let tok = self.advance();
                let body = self.parse_block_or_expr()?;
                let was_block = self.tok_tag(self.main_token_of(body)) == TokenTag::LBrace;
                let ends_semi = if was_block { false } else { self.eat_optional_semicolon() };
                Ok((self.ast.push_node(NodeTag::Nosuspend, tok, NodeData::new(body.0, 0)), ends_semi))
            }
            TokenTag::KeywordDefer => {
                let tok = self.advance();
                let body = self.parse_block_or_expr()?;
                let was_block = self.tok_tag(self.main_token_of(body)) == TokenTag::LBrace;
                let ends_semi = if was_block { false } else { self.eat_optional_semicolon() };
                Ok((self.ast.push_node(NodeTag::Defer, tok, NodeData::new(0, body.0)), ends_semi))
            }
            TokenTag::KeywordErrdefer => {
                let tok = self.advance();
                self.parse_optional_errdefer_payload()?;
                let body = self.parse_block_or_expr()?;
                let was_block = self.tok_tag(self.main_token_of(body)) == TokenTag::LBrace;
                let ends_semi = if was_block { false } else { self.eat_optional_semicolon() };
                Ok((self.ast.push_node(NodeTag::Errdefer, tok, NodeData::new(0, body.0)), ends_semi))
            }
            TokenTag::KeywordIf => {
                let node = self.expect_if_expr()?;
                Ok((node, self.eat_optional_semicolon()))
            }
            TokenTag::KeywordWhile => {
                let node = self.expect_while_expr()?;
                Ok((node, self.eat_optional_semicolon()))
            }
            TokenTag::KeywordFor => {
                let node = self.expect_for_expr()?;
                Ok((node, self.eat_optional_semicolon()))
            }
            TokenTag::KeywordSwitch => {
                let node = self.expect_switch_expr()?;
                Ok((node, self.eat_optional_semicolon()))
            }
            TokenTag::LBrace => {
                let node = self.expect_block()?;
                Ok((node, self.eat_optional_semicolon()))
            }
            TokenTag::Identifier if self.peek_tag(1) == TokenTag::Colon && self.next_is_labelable(2) => {
                let node = self.parse_labeled(false)?;
                Ok((node, self.eat_optional_semicolon()))
            }
            TokenTag::KeywordConst | TokenTag::KeywordVar => {
                let node = self.expect_var_decl_proto(true)?;
                Ok((node, true))
            }
            _ => self.expect_var_decl_expr_statement(),
        }
    }

    fn next_is_labelable(&self, offset: u32) -> bool {
        matches!(
            self.peek_tag(offset),
            TokenTag::LBrace | TokenTag::KeywordFor | TokenTag::KeywordWhile | TokenTag::KeywordSwitch
        )
    }

    fn eat_optional_semicolon(&mut self) -> bool {
        self.eat_token(TokenTag::Semicolon).is_some()
    }

    /// `errdefer (|name|)?` — discarded like every other capture form.
    fn parse_optional_errdefer_payload(&mut self) -> PResult<()> {
        if self.eat_token(TokenTag::Pipe).is_none() {
            return Ok(());
        }
        self.expect_token(TokenTag::Identifier)?;
        self.expect_token(TokenTag::Pipe)?;
        Ok(())
    }

    /// The statement grammar's fallback production (`spec.md` §4.5
    /// `expectVarDeclExprStatement`): a plain expression statement, an
    /// assignment, or — if a comma follows the first expression — a
    /// destructuring assignment `a, b = pair();`. Always semicolon
    /// terminated.
    fn expect_var_decl_expr_statement(&mut self) -> PResult<(NodeIndex, bool)> {
        let mark = self.scratch_top();
        let first = self.expect_expr()?;

        if self.current_tag() != TokenTag::Comma {
            let node = self.finish_possibly_assign(first)?;
            self.expect_token(TokenTag::Semicolon)?;
            return Ok((node, true));
        }

        self.scratch_push(first);
        loop {
            self.advance(); // comma
            let item = self.expect_expr()?;
            self.scratch_push(item);
            if self.current_tag() != TokenTag::Comma {
                break;
            }
        }
        self.expect_token(TokenTag::Equal)?;
        let rhs = self.expect_expr()?;

        let items: Vec<NodeIndex> = self.scratch.drain(mark..).collect();
        let main_tok = self.main_token_of(items[0]);
        let mut words = Vec::with_capacity(items.len() + 1);
        words.push(items.len() as u32);
        words.extend(items.iter().map(|n| n.0));
        let extra_start = self.ast.add_extra(&words);

        let node = self.ast.push_node(NodeTag::AssignDestructure, main_tok, NodeData::new(extra_start, rhs.0));
        self.expect_token(TokenTag::Semicolon)?;
        Ok((node, true))
    }
}
