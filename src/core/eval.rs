// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Expression evaluation over token ranges.
//!
//! The operand matchers speculate over raw token slices, so the evaluator
//! folds a half-open token range directly instead of building a tree first.
//! A result is always a single [`ParseToken`] plus the index one past the
//! last consumed token; expressions that reference a symbol the current
//! pass cannot resolve are still consumed in full, with the `unsolved`
//! flag set, so cursor movement is identical on both passes.

use crate::core::tokenizer::{ParseToken, TokenKind};

/// Services the evaluator and the operand gate need from the assembler.
pub trait AssemblerContext {
    /// Look up a symbol's value by name.
    fn lookup_symbol(&self, name: &str) -> Option<i32>;

    /// The current assembly address (`$`).
    fn current_address(&self) -> u16;

    /// True while the sizing pass runs.
    fn is_first_pass(&self) -> bool;
}

/// Where an evaluation must stop.
#[derive(Debug, Clone, Copy)]
pub enum EvalStop {
    /// Stop at the first token that cannot extend the expression.
    Auto,
    /// Hard terminator: never consume the token at this index.
    Before(usize),
}

/// Result of one evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Folded result. Kind `Unknown` marks a malformed expression.
    pub token: ParseToken,
    /// Index one past the last consumed token.
    pub next: usize,
}

impl Evaluation {
    /// True when the result can be read with `as_number`.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.token.kind.is_numeric()
    }
}

/// Expression evaluator with a default result conversion.
///
/// The operand gate owns three instances: numeric for operands, string for
/// data directives, boolean for conditional directives.
pub struct Evaluator {
    conversion: TokenKind,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            conversion: TokenKind::DecNumber,
        }
    }

    /// Select the result coercion: `DecNumber`, `String` or `Bool`.
    pub fn set_default_conversion(&mut self, kind: TokenKind) {
        self.conversion = kind;
    }

    /// Fold the expression starting at `start`.
    pub fn evaluate(
        &self,
        tokens: &[ParseToken],
        start: usize,
        stop: EvalStop,
        ctx: &dyn AssemblerContext,
    ) -> Evaluation {
        let limit = match stop {
            EvalStop::Auto => tokens.len(),
            EvalStop::Before(index) => index.min(tokens.len()),
        };
        if start >= limit {
            return Evaluation {
                token: ParseToken::new(TokenKind::Unknown, ""),
                next: start,
            };
        }

        let mut parser = ExprParser {
            tokens,
            pos: start,
            limit,
            ctx,
            unsolved: false,
            failed: false,
        };
        let val = parser.parse_expr(1);
        let next = parser.pos;

        if parser.failed {
            return Evaluation {
                token: ParseToken::new(TokenKind::Unknown, ""),
                next,
            };
        }

        let mut token = match (self.conversion, &val.text) {
            (TokenKind::Bool, _) => ParseToken::new(
                TokenKind::Bool,
                if val.num != 0 { "true" } else { "false" },
            ),
            (_, Some(text)) => ParseToken::new(TokenKind::String, text.clone()),
            _ => ParseToken::with_number(val.num),
        };
        token.unsolved = parser.unsolved;
        Evaluation { token, next }
    }
}

/// Intermediate value during folding. `text` survives only for a bare
/// string primary so data directives can emit its bytes.
struct Val {
    num: i32,
    text: Option<String>,
}

impl Val {
    fn num(num: i32) -> Self {
        Self { num, text: None }
    }
}

struct ExprParser<'a> {
    tokens: &'a [ParseToken],
    pos: usize,
    limit: usize,
    ctx: &'a dyn AssemblerContext,
    unsolved: bool,
    failed: bool,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&ParseToken> {
        if self.pos < self.limit {
            self.tokens.get(self.pos)
        } else {
            None
        }
    }

    fn parse_expr(&mut self, min_prec: u8) -> Val {
        let mut lhs = self.parse_primary();
        loop {
            let Some(op) = self.peek().map(|t| t.kind) else {
                break;
            };
            let prec = binary_precedence(op);
            if prec == 0 || prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.parse_expr(prec + 1);
            lhs = Val::num(self.apply_binary(op, lhs.num, rhs.num));
        }
        lhs
    }

    fn parse_primary(&mut self) -> Val {
        let Some(token) = self.peek().cloned() else {
            self.failed = true;
            return Val::num(0);
        };
        match token.kind {
            TokenKind::OpPlus => {
                self.pos += 1;
                Val::num(self.parse_primary().num)
            }
            TokenKind::OpMinus => {
                self.pos += 1;
                Val::num(self.parse_primary().num.wrapping_neg())
            }
            TokenKind::OpNot => {
                self.pos += 1;
                Val::num(!self.parse_primary().num)
            }
            TokenKind::ParOpen => {
                self.pos += 1;
                let inner = self.parse_expr(1);
                if self.peek().is_some_and(|t| t.kind == TokenKind::ParClose) {
                    self.pos += 1;
                } else {
                    self.failed = true;
                }
                Val::num(inner.num)
            }
            TokenKind::DecNumber
            | TokenKind::HexNumber
            | TokenKind::BinNumber
            | TokenKind::OctNumber
            | TokenKind::Bool => {
                self.pos += 1;
                Val::num(token.as_number())
            }
            TokenKind::String => {
                self.pos += 1;
                Val {
                    num: token.as_number(),
                    text: Some(token.source),
                }
            }
            TokenKind::Dollar => {
                self.pos += 1;
                Val::num(self.ctx.current_address() as i32)
            }
            TokenKind::Letters => {
                self.pos += 1;
                match self.ctx.lookup_symbol(&token.source) {
                    Some(value) => Val::num(value),
                    None => {
                        self.unsolved = true;
                        Val::num(0)
                    }
                }
            }
            _ => {
                self.failed = true;
                Val::num(0)
            }
        }
    }

    fn apply_binary(&mut self, op: TokenKind, l: i32, r: i32) -> i32 {
        match op {
            TokenKind::OpPlus => l.wrapping_add(r),
            TokenKind::OpMinus => l.wrapping_sub(r),
            TokenKind::OpMul => l.wrapping_mul(r),
            TokenKind::OpDiv => {
                if r == 0 {
                    // an unsolved operand folded to 0; the result is
                    // discarded anyway
                    if !self.unsolved {
                        self.failed = true;
                    }
                    0
                } else {
                    l / r
                }
            }
            TokenKind::OpMod => {
                if r == 0 {
                    if !self.unsolved {
                        self.failed = true;
                    }
                    0
                } else {
                    l % r
                }
            }
            TokenKind::OpShl => l.wrapping_shl((r & 0x1f) as u32),
            TokenKind::OpShr => ((l as u32) >> (r & 0x1f)) as i32,
            TokenKind::OpAnd => l & r,
            TokenKind::OpOr => l | r,
            TokenKind::OpXor => l ^ r,
            _ => {
                self.failed = true;
                0
            }
        }
    }
}

/// Binding power of a binary operator; 0 for non-operators.
fn binary_precedence(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::OpMul | TokenKind::OpDiv | TokenKind::OpMod => 6,
        TokenKind::OpPlus | TokenKind::OpMinus => 5,
        TokenKind::OpShl | TokenKind::OpShr => 4,
        TokenKind::OpAnd => 3,
        TokenKind::OpXor => 2,
        TokenKind::OpOr => 1,
        _ => 0,
    }
}
