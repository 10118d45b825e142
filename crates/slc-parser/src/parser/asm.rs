//! Inline assembly (`spec.md` §4.4, §4.8): `asm volatile? (template :
//! outputs : inputs : clobbers)`. Each section is optional and only
//! meaningful once the previous one's `:` has been seen; clobbers (a plain
//! comma list of string literals) carry no grammar-relevant structure of
//! their own and are scanned past rather than stored.

use super::Parser;
use crate::ast::{NodeData, NodeTag};
use crate::diagnostics::{Diagnostic, DiagnosticTag};
use crate::error::PResult;
use crate::extra;
use slc_lexer::TokenTag;

impl<'s> Parser<'s> {
    pub(crate) fn expect_asm(&mut self) -> PResult<crate::ast::NodeIndex> {
        let asm_tok = self.advance();
        self.eat_token(TokenTag::KeywordVolatile);
        self.expect_token(TokenTag::LParen)?;
        let template = self.expect_expr()?;

        if self.eat_token(TokenTag::Colon).is_none() {
            self.expect_token(TokenTag::RParen)?;
            return Ok(self.ast.push_node(NodeTag::AsmSimple, asm_tok, NodeData::new(template.0, 0)));
        }

        let mark = self.scratch_top();
        if !matches!(self.current_tag(), TokenTag::Colon | TokenTag::RParen) {
            loop {
                let item = self.parse_asm_output()?;
                self.scratch_push(item);
                if matches!(self.current_tag(), TokenTag::Colon | TokenTag::RParen) {
                    break;
                }
                self.expect_asm_item_comma()?;
            }
        }

        if self.eat_token(TokenTag::Colon).is_some() {
            if !matches!(self.current_tag(), TokenTag::Colon | TokenTag::RParen) {
                loop {
                    let item = self.parse_asm_input()?;
                    self.scratch_push(item);
                    if matches!(self.current_tag(), TokenTag::Colon | TokenTag::RParen) {
                        break;
                    }
                    self.expect_asm_item_comma()?;
                }
            }
            if self.eat_token(TokenTag::Colon).is_some() {
                self.skip_clobber_list()?;
            }
        }

        let rparen = self.expect_token(TokenTag::RParen)?;
        let range = self.extra_range_from_scratch(mark);
        let extra_idx =
            self.ast.add_extra_record(extra::Asm { items_start: range.start, items_end: range.end, rparen });
        Ok(self.ast.push_node(NodeTag::Asm, asm_tok, NodeData::new(template.0, extra_idx)))
    }

    /// A missing comma between two asm-list items is diagnosed but
    /// non-fatal (`spec.md` §4.8): parsing continues at the next item.
    fn expect_asm_item_comma(&mut self) -> PResult<()> {
        if self.eat_token(TokenTag::Comma).is_some() {
            return Ok(());
        }
        self.push_diag(Diagnostic::new(DiagnosticTag::ExpectedToken, self.pos).with_expected(TokenTag::Comma));
        Ok(())
    }

    /// `[symbol] "constraint" (-> Type | ident)`.
    fn parse_asm_output(&mut self) -> PResult<crate::ast::NodeIndex> {
        let lbracket = self.expect_token(TokenTag::LBracket)?;
        self.expect_token(TokenTag::Identifier)?;
        self.expect_token(TokenTag::RBracket)?;
        self.expect_token(TokenTag::StringLiteral)?;
        self.expect_token(TokenTag::LParen)?;
        if self.eat_token(TokenTag::MinusAngleBracketRight).is_some() {
            self.expect_type_expr()?;
        } else {
            self.expect_token(TokenTag::Identifier)?;
        }
        self.expect_token(TokenTag::RParen)?;
        Ok(self.ast.push_node(NodeTag::AsmOutput, lbracket, NodeData::default()))
    }

    /// `[symbol] "constraint" (expr)`.
    fn parse_asm_input(&mut self) -> PResult<crate::ast::NodeIndex> {
        let lbracket = self.expect_token(TokenTag::LBracket)?;
        self.expect_token(TokenTag::Identifier)?;
        self.expect_token(TokenTag::RBracket)?;
        self.expect_token(TokenTag::StringLiteral)?;
        self.expect_token(TokenTag::LParen)?;
        let value = self.expect_expr()?;
        self.expect_token(TokenTag::RParen)?;
        Ok(self.ast.push_node(NodeTag::AsmInput, lbracket, NodeData::new(value.0, 0)))
    }

    fn skip_clobber_list(&mut self) -> PResult<()> {
        if matches!(self.current_tag(), TokenTag::RParen) {
            return Ok(());
        }
        loop {
            self.expect_token(TokenTag::StringLiteral)?;
            if self.eat_token(TokenTag::Comma).is_none() || self.current_tag() == TokenTag::RParen {
                break;
            }
        }
        Ok(())
    }
}
