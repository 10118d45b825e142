//! Top-level declarations: function prototypes and variable declarations
//! (`spec.md` §4.3).

use super::Parser;
use crate::ast::{NodeData, NodeIndex, NodeTag, OptionalNodeIndex};
use crate::diagnostics::{Diagnostic, DiagnosticTag};
use crate::error::{ParseError, PResult};
use slc_lexer::TokenTag;

fn opt_raw(opt: Option<NodeIndex>) -> u32 {
    OptionalNodeIndex::from(opt).raw()
}

/// `align(expr)` / `addrspace(expr)` / `section(expr)` / `callconv(expr)`,
/// in any order, at most one of each (`spec.md` §4.4 modifier suites).
#[derive(Default)]
pub(super) struct ParenModifiers {
    pub(super) align_expr: Option<NodeIndex>,
    pub(super) addrspace_expr: Option<NodeIndex>,
    pub(super) section_expr: Option<NodeIndex>,
    pub(super) callconv_expr: Option<NodeIndex>,
}

impl<'s> Parser<'s> {
    pub(super) fn parse_paren_expr(&mut self) -> PResult<NodeIndex> {
        self.expect_token(TokenTag::LParen)?;
        let e = self.expect_expr()?;
        self.expect_token(TokenTag::RParen)?;
        Ok(e)
    }

    pub(super) fn parse_fn_modifiers(&mut self) -> PResult<ParenModifiers> {
        let mut m = ParenModifiers::default();
        loop {
            match self.current_tag() {
                TokenTag::KeywordAlign => {
                    self.advance();
                    let e = self.parse_paren_expr()?;
                    if m.align_expr.replace(e).is_some() {
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
                TokenTag::KeywordSection => {
                    self.advance();
                    let e = self.parse_paren_expr()?;
                    if m.section_expr.replace(e).is_some() {
                        self.push_diag(Diagnostic::new(DiagnosticTag::ExtraSectionQualifier, self.pos));
                    }
                }
                TokenTag::KeywordCallconv => {
                    self.advance();
                    let e = self.parse_paren_expr()?;
                    if m.callconv_expr.replace(e).is_some() {
                        self.push_diag(Diagnostic::new(DiagnosticTag::ExtraCallconvQualifier, self.pos));
                    }
                }
                _ => break,
            }
        }
        Ok(m)
    }

    /// Peeks `extern`/`export`/`inline`/`noinline`, consumes whichever are
    /// present (the combination is recoverable later by scanning tokens
    /// backward from the decl's `main_token`, so none of it is stored
    /// here), then dispatches to a function prototype or a `threadlocal`?
    /// global var-decl (`spec.md` §4.3).
    pub(crate) fn expect_top_level_decl(&mut self) -> PResult<NodeIndex> {
        let is_extern = self.current_tag() == TokenTag::KeywordExtern;
        loop {
            match self.current_tag() {
                TokenTag::KeywordExport | TokenTag::KeywordInline | TokenTag::KeywordNoinline => {
                    self.advance();
                }
                TokenTag::KeywordExtern => {
                    self.advance();
                    self.eat_token(TokenTag::StringLiteral);
                }
                _ => break,
            }
        }

        if self.current_tag() == TokenTag::KeywordFn {
            return self.expect_fn_decl(is_extern);
        }

        self.eat_token(TokenTag::KeywordThreadlocal);

        match self.current_tag() {
            TokenTag::KeywordConst | TokenTag::KeywordVar => self.expect_var_decl_proto(false),
            _ => {
                self.push_expected_token(TokenTag::KeywordFn);
                Err(ParseError)
            }
        }
    }

    /// `fn` name? `(` params `)` modifiers return-type (`;` | block).
    fn expect_fn_decl(&mut self, is_extern: bool) -> PResult<NodeIndex> {
        let fn_decl_slot = self.ast.reserve_node();

        let proto = match self.expect_fn_proto() {
            Ok(p) => p,
            Err(e) => {
                self.ast.unreserve_node(fn_decl_slot);
                return Err(e);
            }
        };

        if self.eat_token(TokenTag::Semicolon).is_some() {
            self.ast.unreserve_node(fn_decl_slot);
            return Ok(proto);
        }

        if is_extern {
            self.push_diag(Diagnostic::new(DiagnosticTag::ExpectedToken, self.pos).with_expected(TokenTag::Semicolon));
        }

        let body = match self.expect_block() {
            Ok(b) => b,
            Err(e) => {
                self.ast.unreserve_node(fn_decl_slot);
                return Err(e);
            }
        };
        let main_tok = self.main_token_of(proto);
        self.ast.set_node(fn_decl_slot, NodeTag::FnDecl, main_tok, NodeData::new(proto.0, body.0));
        Ok(fn_decl_slot)
    }

    pub(super) fn expect_fn_proto(&mut self) -> PResult<NodeIndex> {
        let fn_tok = self.expect_token(TokenTag::KeywordFn)?;
        self.eat_token(TokenTag::Identifier);
        self.expect_token(TokenTag::LParen)?;

        let params_mark = self.scratch_top();
        if self.current_tag() != TokenTag::RParen {
            loop {
                if self.eat_token(TokenTag::Ellipsis3).is_some() {
                    if self.current_tag() != TokenTag::RParen {
                        self.push_diag(Diagnostic::new(DiagnosticTag::VarargsNonfinal, self.pos));
                    }
                    break;
                }
                self.eat_token(TokenTag::KeywordComptime);
                if self.current_tag() == TokenTag::Identifier && self.peek_tag(1) == TokenTag::Colon {
                    self.advance();
                    self.advance();
                }
                let ty = self.expect_type_expr()?;
                self.scratch_push(ty);
                if self.eat_token(TokenTag::Comma).is_none() || self.current_tag() == TokenTag::RParen {
                    break;
                }
            }
        }
        self.expect_token(TokenTag::RParen)?;

        let modifiers = self.parse_fn_modifiers()?;
        let return_type = self.expect_type_expr()?;

        let param_count = self.scratch_top() - params_mark;
        let no_modifiers = modifiers.align_expr.is_none()
            && modifiers.addrspace_expr.is_none()
            && modifiers.section_expr.is_none()
            && modifiers.callconv_expr.is_none();

        let node = if param_count == 0 && no_modifiers {
            self.ast.push_node(NodeTag::FnProtoSimple, fn_tok, NodeData::new(0, return_type.0))
        } else if param_count <= 1 {
            let param = self.scratch_slice_from(params_mark).first().copied();
            self.scratch.truncate(params_mark);
            let extra = self.ast.add_extra_record(crate::extra::FnProtoOne {
                param: param.into(),
                align_expr: modifiers.align_expr.into(),
                addrspace_expr: modifiers.addrspace_expr.into(),
                section_expr: modifiers.section_expr.into(),
                callconv_expr: modifiers.callconv_expr.into(),
            });
            self.ast.push_node(NodeTag::FnProtoOne, fn_tok, NodeData::new(extra, return_type.0))
        } else if no_modifiers {
            let range = self.extra_range_from_scratch(params_mark);
            let extra = self.ast.add_extra_record(crate::extra::ParamRange { start: range.start, end: range.end });
            self.ast.push_node(NodeTag::FnProtoMulti, fn_tok, NodeData::new(extra, return_type.0))
        } else {
            let range = self.extra_range_from_scratch(params_mark);
            let extra = self.ast.add_extra_record(crate::extra::FnProto {
                params_start: range.start,
                params_end: range.end,
                align_expr: modifiers.align_expr.into(),
                addrspace_expr: modifiers.addrspace_expr.into(),
                section_expr: modifiers.section_expr.into(),
                callconv_expr: modifiers.callconv_expr.into(),
            });
            self.ast.push_node(NodeTag::FnProto, fn_tok, NodeData::new(extra, return_type.0))
        };
        Ok(node)
    }

    /// `const|var` IDENT (`: Type`)? (`align(e)`)? (`addrspace(e)`)?
    /// (`section(e)`)? (`= init`)? `;`, dispatching to one of the four
    /// var-decl shapes (`spec.md` §4.3).
    ///
    /// `in_function_body` selects `local_var_decl` over `global_var_decl`
    /// when a type is present without addrspace/section — see
    /// `DESIGN.md` for the index-0 align sentinel this shape relies on.
    pub(crate) fn expect_var_decl_proto(&mut self, in_function_body: bool) -> PResult<NodeIndex> {
        let mut_tok = self.advance();
        self.expect_token(TokenTag::Identifier)?;

        let type_expr = if self.eat_token(TokenTag::Colon).is_some() { Some(self.expect_type_expr()?) } else { None };
        let align_expr =
            if self.eat_token(TokenTag::KeywordAlign).is_some() { Some(self.parse_paren_expr()?) } else { None };
        let addrspace_expr =
            if self.eat_token(TokenTag::KeywordAddrspace).is_some() { Some(self.parse_paren_expr()?) } else { None };
        let section_expr =
            if self.eat_token(TokenTag::KeywordSection).is_some() { Some(self.parse_paren_expr()?) } else { None };

        let init_expr = if self.eat_token(TokenTag::Equal).is_some() {
            Some(self.expect_expr()?)
        } else if self.eat_token(TokenTag::EqualEqual).is_some() {
            self.push_diag(Diagnostic::new(DiagnosticTag::WrongEqualVarDecl, self.pos));
            Some(self.expect_expr()?)
        } else {
            None
        };

        let node = self.pack_var_decl(mut_tok, type_expr, align_expr, addrspace_expr, section_expr, init_expr, in_function_body);
        self.expect_token(TokenTag::Semicolon)?;
        Ok(node)
    }

    #[allow(clippy::too_many_arguments)]
    fn pack_var_decl(
        &mut self,
        mut_tok: u32,
        type_expr: Option<NodeIndex>,
        align_expr: Option<NodeIndex>,
        addrspace_expr: Option<NodeIndex>,
        section_expr: Option<NodeIndex>,
        init_expr: Option<NodeIndex>,
        in_function_body: bool,
    ) -> NodeIndex {
        match (type_expr, align_expr, addrspace_expr, section_expr) {
            (None, None, None, None) => {
                self.ast.push_node(NodeTag::SimpleVarDecl, mut_tok, NodeData::new(opt_raw(init_expr), 0))
            }
            (None, Some(a), None, None) => {
                self.ast.push_node(NodeTag::AlignedVarDecl, mut_tok, NodeData::new(a.0, opt_raw(init_expr)))
            }
            (Some(ty), align, None, None) if in_function_body => {
                let extra = self.ast.add_extra_record(crate::extra::LocalVarDecl {
                    type_expr: ty,
                    align_expr: align.unwrap_or(NodeIndex::ROOT),
                });
                self.ast.push_node(NodeTag::LocalVarDecl, mut_tok, NodeData::new(extra, opt_raw(init_expr)))
            }
            (ty, align, addrspace, section) => {
                let extra = self.ast.add_extra_record(crate::extra::GlobalVarDecl {
                    type_expr: ty.into(),
                    align_expr: align.into(),
                    addrspace_expr: addrspace.into(),
                    section_expr: section.into(),
                });
                self.ast.push_node(NodeTag::GlobalVarDecl, mut_tok, NodeData::new(extra, opt_raw(init_expr)))
            }
        }
    }
}
