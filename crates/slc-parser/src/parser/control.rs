//! Blocks, labels, and the `if`/`for`/`while`/`switch` family — used both
//! as statements and as expressions (`spec.md` §4.6, §4.7).

use super::Parser;
use crate::ast::{NodeData, NodeIndex, NodeTag, OptionalNodeIndex};
use crate::diagnostics::{Diagnostic, DiagnosticTag};
use crate::error::{ParseError, PResult};
use crate::extra;
use slc_lexer::TokenTag;

fn opt_raw(opt: Option<NodeIndex>) -> u32 {
    OptionalNodeIndex::from(opt).raw()
}

/// Entry point `parser::mod` wraps as `Parser::expect_block`.
pub(super) fn expect_block(parser: &mut Parser) -> PResult<NodeIndex> {
    let lbrace = parser.expect_token(TokenTag::LBrace)?;
    let mark = parser.scratch_top();
    let mut last_semicolon = false;
    loop {
        if parser.eat_token(TokenTag::RBrace).is_some() {
            break;
        }
        if parser.current_tag() == TokenTag::Eof {
            parser.push_expected_token(TokenTag::RBrace);
            break;
        }
        match parser.parse_statement() {
            Ok((node, ends_semi)) => {
                parser.scratch_push(node);
                last_semicolon = ends_semi;
            }
            Err(ParseError) => {
                parser.recover_to_next_statement();
                last_semicolon = false;
            }
        }
    }
    let count = parser.scratch_top() - mark;
    Ok(match count {
        0 => {
            let tag = if last_semicolon { NodeTag::BlockTwoSemicolon } else { NodeTag::BlockTwo };
            parser.ast.push_node(tag, lbrace, NodeData::default())
        }
        1 | 2 => {
            let items: Vec<NodeIndex> = parser.scratch.drain(mark..).collect();
            let mut it = items.into_iter();
            let a = it.next();
            let b = it.next();
            let tag = if last_semicolon { NodeTag::BlockTwoSemicolon } else { NodeTag::BlockTwo };
            parser.ast.push_node(tag, lbrace, NodeData::new(opt_raw(a), opt_raw(b)))
        }
        _ => {
            let range = parser.extra_range_from_scratch(mark);
            let tag = if last_semicolon { NodeTag::BlockSemicolon } else { NodeTag::Block };
            parser.ast.push_node(tag, lbrace, NodeData::new(range.start, range.end))
        }
    })
}

impl<'s> Parser<'s> {
    /// `ident:` ahead of a `{`/`for`/`while`/`switch` (`spec.md` §4.7).
    /// Labels are not modeled as node payload — a consumer recovers one by
    /// reading the two tokens immediately before the resulting node's
    /// `main_token` (label identifier, then `:`).
    pub(crate) fn parse_labeled(&mut self, _value_position: bool) -> PResult<NodeIndex> {
        self.advance(); // label identifier
        self.advance(); // `:`
        match self.current_tag() {
            TokenTag::LBrace => self.expect_block(),
            TokenTag::KeywordFor => self.expect_for_expr(),
            TokenTag::KeywordWhile => self.expect_while_expr(),
            TokenTag::KeywordSwitch => self.expect_switch_expr(),
            _ => {
                self.push_diag(Diagnostic::new(DiagnosticTag::ExpectedLabelable, self.pos));
                Err(ParseError)
            }
        }
    }

    /// Optional `|[*]name|` before a block body — if/while condition
    /// capture, `catch`/`else` error capture. Consumed and discarded; see
    /// `expr::parse_optional_payload` for the rationale.
    fn parse_optional_capture(&mut self) -> PResult<bool> {
        if self.eat_token(TokenTag::Pipe).is_none() {
            return Ok(false);
        }
        self.eat_token(TokenTag::Asterisk);
        self.expect_token(TokenTag::Identifier)?;
        self.expect_token(TokenTag::Pipe)?;
        Ok(true)
    }

    /// `if (cond) [|payload|] then_body (else [|payload|] else_body)?`
    /// (`spec.md` §4.6).
    pub(crate) fn expect_if_expr(&mut self) -> PResult<NodeIndex> {
        let if_tok = self.advance();
        let condition = self.parse_paren_expr()?;
        self.parse_optional_capture()?;
        let then_expr = self.parse_block_or_expr()?;

        if self.eat_token(TokenTag::KeywordElse).is_none() {
            return Ok(self.ast.push_node(NodeTag::IfSimple, if_tok, NodeData::new(condition.0, then_expr.0)));
        }
        self.parse_optional_capture()?;
        let else_expr = self.parse_block_or_expr()?;
        let rec = extra::If { then_expr, else_expr };
        let extra_idx = self.ast.add_extra_record(rec);
        Ok(self.ast.push_node(NodeTag::If, if_tok, NodeData::new(condition.0, extra_idx)))
    }

    /// A block is parsed directly; anything else falls back to a single
    /// (possibly assignment) expression — shared by `if`/`while` bodies and
    /// `for` bodies.
    pub(crate) fn parse_block_or_expr(&mut self) -> PResult<NodeIndex> {
        if self.current_tag() == TokenTag::LBrace {
            self.expect_block()
        } else {
            self.expect_expr()
        }
    }

    /// `while (cond) (|payload|)? (: (cont_expr))? body (else (|payload|)?
    /// else_body)?` (`spec.md` §4.6).
    pub(crate) fn expect_while_expr(&mut self) -> PResult<NodeIndex> {
        let while_tok = self.advance();
        let condition = self.parse_paren_expr()?;
        self.parse_optional_capture()?;

        let cont_expr = if self.eat_token(TokenTag::Colon).is_some() {
            Some(self.parse_paren_expr()?)
        } else {
            None
        };
        let then_expr = self.parse_block_or_expr()?;

        if self.eat_token(TokenTag::KeywordElse).is_none() {
            return Ok(match cont_expr {
                None => self.ast.push_node(NodeTag::WhileSimple, while_tok, NodeData::new(condition.0, then_expr.0)),
                Some(cont) => {
                    let extra_idx = self.ast.add_extra_record(extra::WhileCont { cont_expr: cont, then_expr });
                    self.ast.push_node(NodeTag::WhileCont, while_tok, NodeData::new(condition.0, extra_idx))
                }
            });
        }
        self.parse_optional_capture()?;
        let else_expr = self.parse_block_or_expr()?;
        let extra_idx = self.ast.add_extra_record(extra::While { cont_expr: cont_expr.into(), then_expr, else_expr });
        Ok(self.ast.push_node(NodeTag::While, while_tok, NodeData::new(condition.0, extra_idx)))
    }

    /// `for (input (, input)*) (|[*]cap (, [*]cap)*|)? body (else body)?`
    /// (`spec.md` §4.6). Each input is an expression or a `start..end?`
    /// range; capture count must match input count.
    pub(crate) fn expect_for_expr(&mut self) -> PResult<NodeIndex> {
        let for_tok = self.advance();
        self.expect_token(TokenTag::LParen)?;
        let mark = self.scratch_top();
        loop {
            let input = self.parse_for_input()?;
            self.scratch_push(input);
            if self.eat_token(TokenTag::Comma).is_none() || self.current_tag() == TokenTag::RParen {
                break;
            }
        }
        self.expect_token(TokenTag::RParen)?;
        let input_count = self.scratch_top() - mark;

        let capture_count = self.parse_for_captures()?;
        if capture_count > input_count {
            self.push_diag(Diagnostic::new(DiagnosticTag::ExtraForCapture, self.pos));
        } else if capture_count < input_count {
            self.push_diag(Diagnostic::new(DiagnosticTag::ForInputNotCaptured, self.pos));
        }

        let then_expr = self.parse_block_or_expr()?;
        let has_else = self.eat_token(TokenTag::KeywordElse).is_some();
        let else_expr = if has_else { Some(self.parse_block_or_expr()?) } else { None };

        if input_count == 1 && !has_else {
            let input = self.scratch_slice_from(mark)[0];
            self.scratch.truncate(mark);
            return Ok(self.ast.push_node(NodeTag::ForSimple, for_tok, NodeData::new(input.0, then_expr.0)));
        }

        let range = self.extra_range_from_scratch(mark);
        self.ast.add_extra(&[then_expr.0]);
        if let Some(else_expr) = else_expr {
            self.ast.add_extra(&[else_expr.0]);
        }
        let packed = extra::ForPayload { input_count: input_count as u32, has_else }.pack();
        Ok(self.ast.push_node(NodeTag::For, for_tok, NodeData::new(range.start, packed)))
    }

    /// One parenthesized `for` input: a bare expression, or `start..end?`.
    fn parse_for_input(&mut self) -> PResult<NodeIndex> {
        let start = self.expect_expr()?;
        if let Some(tok) = self.eat_token(TokenTag::Ellipsis2) {
            let end = if matches!(self.current_tag(), TokenTag::RParen | TokenTag::Comma) {
                None
            } else {
                Some(self.expect_expr()?)
            };
            return Ok(self.ast.push_node(NodeTag::ForRange, tok, NodeData::new(start.0, opt_raw(end))));
        }
        Ok(start)
    }

    /// `|[*]cap (, [*]cap)*|`, returning how many captures were found.
    /// Captures are not stored — only their count, for the mismatch
    /// diagnostics in `expect_for_expr`.
    fn parse_for_captures(&mut self) -> PResult<usize> {
        if self.eat_token(TokenTag::Pipe).is_none() {
            return Ok(0);
        }
        let mut count = 0;
        loop {
            self.eat_token(TokenTag::Asterisk);
            self.expect_token(TokenTag::Identifier)?;
            count += 1;
            if self.eat_token(TokenTag::Comma).is_none() {
                break;
            }
        }
        self.expect_token(TokenTag::Pipe)?;
        Ok(count)
    }

    /// `switch (operand) { prong (, prong)* (,)? }` (`spec.md` §4.6).
    pub(crate) fn expect_switch_expr(&mut self) -> PResult<NodeIndex> {
        let switch_tok = self.advance();
        let operand = self.parse_paren_expr()?;
        self.expect_token(TokenTag::LBrace)?;

        let mark = self.scratch_top();
        let mut trailing_comma = false;
        loop {
            if self.current_tag() == TokenTag::RBrace {
                break;
            }
            match self.parse_switch_prong() {
                Ok(prong) => {
                    self.scratch_push(prong);
                    trailing_comma = self.eat_token(TokenTag::Comma).is_some();
                    if !trailing_comma {
                        break;
                    }
                }
                Err(ParseError) => {
                    // Prongs are comma-separated, not semicolon-terminated;
                    // scan to the next plausible prong boundary, which also
                    // consumes the separating comma itself.
                    self.recover_to_next_member();
                    trailing_comma = true;
                }
            }
        }
        self.expect_token(TokenTag::RBrace)?;
        let range = self.extra_range_from_scratch(mark);
        let extra_idx = self.ast.add_extra_record(extra::ParamRange { start: range.start, end: range.end });
        let tag = if trailing_comma { NodeTag::SwitchComma } else { NodeTag::Switch };
        Ok(self.ast.push_node(tag, switch_tok, NodeData::new(operand.0, extra_idx)))
    }

    /// One `(inline)? (else | item (, item)*) => (|[*]cap (, idx)?|)? body`
    /// prong. An empty item list marks the `else` prong.
    fn parse_switch_prong(&mut self) -> PResult<NodeIndex> {
        let is_inline = self.eat_token(TokenTag::KeywordInline).is_some();
        let main_tok = self.pos;

        let items_mark = self.scratch_top();
        if self.eat_token(TokenTag::KeywordElse).is_none() {
            loop {
                let item = self.parse_switch_item()?;
                self.scratch_push(item);
                if self.eat_token(TokenTag::Comma).is_none() {
                    break;
                }
                if self.current_tag() == TokenTag::EqualAngleBracketRight {
                    break;
                }
            }
        }
        self.expect_token(TokenTag::EqualAngleBracketRight)?;
        self.parse_switch_capture()?;
        let body = self.parse_possibly_assign()?;

        let count = self.scratch_top() - items_mark;
        Ok(match (count, is_inline) {
            (1, false) => {
                let item = self.scratch_slice_from(items_mark)[0];
                self.scratch.truncate(items_mark);
                self.ast.push_node(NodeTag::SwitchCaseOne, main_tok, NodeData::new(item.0, body.0))
            }
            (1, true) => {
                let item = self.scratch_slice_from(items_mark)[0];
                self.scratch.truncate(items_mark);
                self.ast.push_node(NodeTag::SwitchCaseOneInline, main_tok, NodeData::new(item.0, body.0))
            }
            (_, inline) => {
                let range = self.extra_range_from_scratch(items_mark);
                let extra_idx = self.ast.add_extra_record(extra::ParamRange { start: range.start, end: range.end });
                let tag = if inline { NodeTag::SwitchCaseInline } else { NodeTag::SwitchCase };
                self.ast.push_node(tag, main_tok, NodeData::new(extra_idx, body.0))
            }
        })
    }

    fn parse_switch_item(&mut self) -> PResult<NodeIndex> {
        let low = self.expect_expr()?;
        if let Some(tok) = self.eat_token(TokenTag::Ellipsis3) {
            let high = self.expect_expr()?;
            return Ok(self.ast.push_node(NodeTag::SwitchRange, tok, NodeData::new(low.0, high.0)));
        }
        Ok(low)
    }

    /// `|[*]payload (, index)?|` after a prong's `=>`; discarded like other
    /// captures (`spec.md` §4.6).
    fn parse_switch_capture(&mut self) -> PResult<()> {
        if self.eat_token(TokenTag::Pipe).is_none() {
            return Ok(());
        }
        self.eat_token(TokenTag::Asterisk);
        self.expect_token(TokenTag::Identifier)?;
        if self.eat_token(TokenTag::Comma).is_some() {
            self.expect_token(TokenTag::Identifier)?;
        }
        self.expect_token(TokenTag::Pipe)?;
        Ok(())
    }
}
