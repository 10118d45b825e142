//! The append-only diagnostic sink (`spec.md` §2, §3).

use slc_lexer::TokenTag;

/// A named syntactic condition. One diagnostic tag never implies a fixed
/// message string on its own — `extra` and `token` carry the specifics a
/// renderer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DiagnosticTag {
    ExpectedToken,
    ExpectedExpr,
    ExpectedSemiAfterStmt,
    ExpectedCommaAfterField,
    DeclBetweenFields,
    PreviousField,
    NextField,
    ChainedComparisonOperators,
    InvalidAmpersandAmpersand,
    MismatchedBinaryOpWhitespace,
    WrongEqualVarDecl,
    ExtraConstQualifier,
    ExtraAlignQualifier,
    ExtraAddrspaceQualifier,
    ExtraSectionQualifier,
    ExtraCallconvQualifier,
    ExtraAllowzeroQualifier,
    ExtraVolatileQualifier,
    VarargsNonfinal,
    ExtraForCapture,
    ForInputNotCaptured,
    CStyleContainer,
    /// Note paired with `CStyleContainer`, pointing at the idiomatic
    /// anonymous-container-bound-to-a-declaration spelling.
    UnnamedContainerStyle,
    SameLineDocComment,
    TestDocComment,
    ComptimeDocComment,
    UnattachedDocComment,
    PtrModOnArrayChildType,
    InvalidBitRange,
    ExpectedLabelable,
    ExpectedVarConst,
    ExpectedPeriodAsteriskAsterisk,
}

/// One diagnostic: `{tag, token, is_note, token_is_prev, extra?}`
/// (`spec.md` §3). `extra`, when present, is usually an expected
/// [`TokenTag`] for `ExpectedToken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    pub tag: DiagnosticTag,
    pub token: u32,
    pub is_note: bool,
    /// When `true`, `token` was retargeted from the token that was actually
    /// being inspected to the one immediately before it, because the
    /// original token started a new source line (`spec.md` §9 "Diagnostics
    /// with look-back adjustment").
    pub token_is_prev: bool,
    pub extra: Option<TokenTag>,
}

impl Diagnostic {
    pub fn new(tag: DiagnosticTag, token: u32) -> Self {
        Diagnostic { tag, token, is_note: false, token_is_prev: false, extra: None }
    }

    pub fn note(tag: DiagnosticTag, token: u32) -> Self {
        Diagnostic { tag, token, is_note: true, token_is_prev: false, extra: None }
    }

    pub fn with_expected(mut self, expected: TokenTag) -> Self {
        self.extra = Some(expected);
        self
    }

    pub fn with_token_is_prev(mut self, prev: bool) -> Self {
        self.token_is_prev = prev;
        self
    }
}

/// Turns one diagnostic into a human-readable, single-line message. This is
/// the minimum rendering `slc-cli` needs; a full source-excerpt renderer is
/// a consumer's responsibility (`spec.md` §6), not this crate's.
pub fn render_diagnostic(source: &str, tokens: &[slc_lexer::Token], diag: &Diagnostic) -> String {
    let token = &tokens[diag.token as usize];
    let (line, col) = line_col(source, token.start as usize);
    let prefix = if diag.is_note { "note" } else { "error" };
    let detail = match diag.extra {
        Some(expected) => format!("{:?}: expected {}", diag.tag, expected.describe()),
        None => format!("{:?}", diag.tag),
    };
    format!("{}:{}:{}: {}", prefix, line, col, detail)
}

fn line_col(source: &str, byte_offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, b) in source.as_bytes().iter().enumerate() {
        if i >= byte_offset {
            break;
        }
        if *b == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}
