// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Speculative operand recognition.
//!
//! Z80 syntax is ambiguous at the token level: `A` is a register or a
//! label, `(HL)` is register-indirect while `(HL+1)` is nothing, `(5)` is
//! absolute-indirect while `(IX+5)` is indexed, and a bare `3` is a bit
//! number in a `BIT` context but an immediate in `LD A,3`. Encoders
//! therefore try shapes one after another; every low-level matcher here
//! either consumes a definite match or leaves the cursor untouched so the
//! next hypothesis starts clean.
//!
//! The `get_*` wrappers add the two-pass policy: a syntactically valid
//! operand whose value hangs on a not-yet-defined symbol reports
//! [`OperandError::Unsolved`], which pass 1 rewrites into success with a
//! neutral value (0, or bit 0) so instruction sizes match across passes.
//! Pass 2 surfaces `Unsolved` to the caller as a real error.

use crate::core::codeline::CodeLine;
use crate::core::eval::{AssemblerContext, EvalStop, Evaluator};
use crate::core::tokenizer::{ParseToken, TokenKind};

use super::operands::{
    bit_operand, lookup_condition, lookup_reg16, lookup_reg8, reg_accept, OperandError,
    OperandType,
};

/// Operand recognizer shared by all instruction encoders of one run.
pub struct OperandTools {
    eval_number: Evaluator,
    eval_string: Evaluator,
    eval_bool: Evaluator,
}

impl Default for OperandTools {
    fn default() -> Self {
        Self::new()
    }
}

impl OperandTools {
    #[must_use]
    pub fn new() -> Self {
        let eval_number = Evaluator::new();
        let mut eval_string = Evaluator::new();
        eval_string.set_default_conversion(TokenKind::String);
        let mut eval_bool = Evaluator::new();
        eval_bool.set_default_conversion(TokenKind::Bool);
        Self {
            eval_number,
            eval_string,
            eval_bool,
        }
    }

    /// Numeric evaluator, for directives that must see the raw
    /// unsolved flag instead of the gate's pass-1 rewrite.
    #[must_use]
    pub fn number_evaluator(&self) -> &Evaluator {
        &self.eval_number
    }

    /// String-coercing evaluator, for data directives.
    #[must_use]
    pub fn string_evaluator(&self) -> &Evaluator {
        &self.eval_string
    }

    /// Bool-coercing evaluator, for conditional directives.
    #[must_use]
    pub fn bool_evaluator(&self) -> &Evaluator {
        &self.eval_bool
    }

    // ---- low-level matchers -------------------------------------------

    /// 8-bit register at the cursor; advances by one on a hit.
    pub fn reg8(&self, tokens: &[ParseToken], cursor: &mut usize) -> Option<OperandType> {
        let token = tokens.get(*cursor)?;
        if token.kind != TokenKind::Letters {
            return None;
        }
        let reg = lookup_reg8(&token.source.to_ascii_uppercase())?;
        *cursor += 1;
        Some(reg)
    }

    /// 16-bit register at the cursor; advances by one on a hit.
    pub fn reg16(&self, tokens: &[ParseToken], cursor: &mut usize) -> Option<OperandType> {
        let token = tokens.get(*cursor)?;
        if token.kind != TokenKind::Letters {
            return None;
        }
        let reg = lookup_reg16(&token.source.to_ascii_uppercase())?;
        *cursor += 1;
        Some(reg)
    }

    /// Fixed `( NAME )` shape. The register name is compared against the
    /// source as written, so only the upper-case spelling matches.
    pub fn indirect_reg(&self, tokens: &[ParseToken], cursor: &mut usize, name: &str) -> bool {
        if *cursor + 2 >= tokens.len() {
            return false;
        }
        if tokens[*cursor].kind != TokenKind::ParOpen {
            return false;
        }
        let reg = &tokens[*cursor + 1];
        if reg.kind != TokenKind::Letters || reg.source != name {
            return false;
        }
        if tokens[*cursor + 2].kind != TokenKind::ParClose {
            return false;
        }
        *cursor += 3;
        true
    }

    /// `(IX+d)` / `(IY+d)` with an arbitrary displacement expression.
    ///
    /// The cursor is unchanged for `TokenNumber`, `MissingParOpen`,
    /// `RegisterName` and `WrongOp`. Once the shape is structurally valid
    /// the cursor moves past the closing parenthesis for `Ok` AND
    /// `Unsolved`, so both passes walk the line identically.
    pub fn indirect_x(
        &self,
        tokens: &[ParseToken],
        cursor: &mut usize,
        reg: &mut OperandType,
        value: &mut i32,
        ctx: &dyn AssemblerContext,
    ) -> OperandError {
        if *cursor + 4 >= tokens.len() {
            return OperandError::TokenNumber;
        }
        if tokens[*cursor].kind != TokenKind::ParOpen {
            return OperandError::MissingParOpen;
        }
        let mut index = *cursor + 1;
        let Some(base) = self.reg16(tokens, &mut index) else {
            return OperandError::RegisterName;
        };
        if base != OperandType::Ix && base != OperandType::Iy {
            return OperandError::RegisterName;
        }
        *reg = base;
        if tokens[*cursor + 2].kind != TokenKind::OpPlus {
            return OperandError::WrongOp;
        }

        // locate the balancing close; the displacement may nest parens
        let mut close = tokens.len();
        let mut level = 1;
        for idx in *cursor + 3..tokens.len() {
            match tokens[idx].kind {
                TokenKind::ParOpen => level += 1,
                TokenKind::ParClose => {
                    level -= 1;
                    if level == 0 {
                        close = idx;
                        break;
                    }
                }
                _ => {}
            }
        }

        let eval = self
            .eval_number
            .evaluate(tokens, *cursor + 3, EvalStop::Before(close), ctx);
        *cursor = (close + 1).min(tokens.len());
        if eval.token.unsolved {
            *value = 0;
            return OperandError::Unsolved;
        }
        *value = eval.token.as_number();
        OperandError::Ok
    }

    /// Bit number 0..=7 for BIT/SET/RES.
    pub fn bit_number(
        &self,
        tokens: &[ParseToken],
        cursor: &mut usize,
        bit: &mut OperandType,
        ctx: &dyn AssemblerContext,
    ) -> OperandError {
        let eval = self
            .eval_number
            .evaluate(tokens, *cursor, EvalStop::Auto, ctx);
        if eval.token.unsolved {
            *bit = OperandType::Bit0;
            *cursor = eval.next;
            return OperandError::Unsolved;
        }
        if !eval.is_numeric() {
            return OperandError::NotBit;
        }
        match bit_operand(eval.token.as_number()) {
            Some(tag) => {
                *bit = tag;
                *cursor = eval.next;
                OperandError::Ok
            }
            None => OperandError::NotBit,
        }
    }

    /// Condition code at the cursor. No case normalization: the catalog
    /// holds upper-case names only (see `lookup_condition`).
    pub fn condition(
        &self,
        tokens: &[ParseToken],
        cursor: &mut usize,
        cond: &mut OperandType,
    ) -> OperandError {
        let Some(token) = tokens.get(*cursor) else {
            return OperandError::NotString;
        };
        if token.kind != TokenKind::Letters {
            return OperandError::NotString;
        }
        match lookup_condition(&token.source) {
            Some(found) => {
                *cond = found;
                *cursor += 1;
                OperandError::Ok
            }
            None => OperandError::NotCondition,
        }
    }

    /// 8-bit numeric expression; values over 255 are `TooBig`.
    pub fn number8(
        &self,
        tokens: &[ParseToken],
        cursor: &mut usize,
        value: &mut i32,
        ctx: &dyn AssemblerContext,
    ) -> OperandError {
        self.number_up_to(tokens, cursor, value, 255, ctx)
    }

    /// 16-bit numeric expression; values over 65535 are `TooBig`.
    pub fn number16(
        &self,
        tokens: &[ParseToken],
        cursor: &mut usize,
        value: &mut i32,
        ctx: &dyn AssemblerContext,
    ) -> OperandError {
        self.number_up_to(tokens, cursor, value, 65535, ctx)
    }

    fn number_up_to(
        &self,
        tokens: &[ParseToken],
        cursor: &mut usize,
        value: &mut i32,
        max: i32,
        ctx: &dyn AssemblerContext,
    ) -> OperandError {
        let eval = self
            .eval_number
            .evaluate(tokens, *cursor, EvalStop::Auto, ctx);
        if eval.token.unsolved {
            *value = 0;
            *cursor = eval.next;
            return OperandError::Unsolved;
        }
        if !eval.is_numeric() {
            return OperandError::NotNumber;
        }
        *value = eval.token.as_number();
        if *value > max {
            // cursor stays on the offending expression
            return OperandError::TooBig;
        }
        *cursor = eval.next;
        OperandError::Ok
    }

    /// Absolute-indirect `(nn)`.
    ///
    /// Does not touch a cursor: the index just past the closing
    /// parenthesis comes back through `lasttoken` and the caller decides
    /// whether to commit it.
    pub fn indirect16(
        &self,
        tokens: &[ParseToken],
        cursor: usize,
        value: &mut i32,
        lasttoken: &mut usize,
        ctx: &dyn AssemblerContext,
    ) -> OperandError {
        if cursor + 2 >= tokens.len() {
            return OperandError::TokenNumber;
        }
        if tokens[cursor].kind != TokenKind::ParOpen {
            return OperandError::MissingParOpen;
        }
        let mut close = None;
        let mut level = 1;
        for idx in cursor + 1..tokens.len() {
            match tokens[idx].kind {
                TokenKind::ParOpen => level += 1,
                TokenKind::ParClose => {
                    level -= 1;
                    if level == 0 {
                        close = Some(idx);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(close) = close else {
            return OperandError::MissingParClose;
        };

        let eval = self
            .eval_number
            .evaluate(tokens, cursor + 1, EvalStop::Before(close), ctx);
        *lasttoken = close + 1;
        if eval.token.unsolved {
            *value = 0;
            return OperandError::Unsolved;
        }
        if !eval.is_numeric() {
            return OperandError::NotNumber;
        }
        *value = eval.token.as_number();
        OperandError::Ok
    }

    // ---- pass-aware entry points --------------------------------------

    /// 8-bit register constrained by an accept mask.
    pub fn get_reg8(
        &self,
        line: &mut CodeLine,
        reg: &mut OperandType,
        regs: u64,
    ) -> OperandError {
        if !line.has_tokens_left(1) {
            return OperandError::TokenNumber;
        }
        let mut worktoken = line.curtoken;
        if let Some(found) = self.reg8(&line.tokens, &mut worktoken) {
            if reg_accept(regs, found) {
                *reg = found;
                line.curtoken = worktoken;
                return OperandError::Ok;
            }
            return OperandError::WrongRegister;
        }
        OperandError::NotRegister
    }

    /// 16-bit register constrained by an accept mask.
    pub fn get_reg16(
        &self,
        line: &mut CodeLine,
        reg: &mut OperandType,
        regs: u64,
    ) -> OperandError {
        if !line.has_tokens_left(1) {
            return OperandError::TokenNumber;
        }
        let mut worktoken = line.curtoken;
        if let Some(found) = self.reg16(&line.tokens, &mut worktoken) {
            if reg_accept(regs, found) {
                *reg = found;
                line.curtoken = worktoken;
                return OperandError::Ok;
            }
            return OperandError::WrongRegister;
        }
        OperandError::NotRegister
    }

    pub fn get_ind_c(&self, line: &mut CodeLine) -> OperandError {
        self.get_ind_reg(line, "C")
    }

    pub fn get_ind_hl(&self, line: &mut CodeLine) -> OperandError {
        self.get_ind_reg(line, "HL")
    }

    pub fn get_ind_bc(&self, line: &mut CodeLine) -> OperandError {
        self.get_ind_reg(line, "BC")
    }

    pub fn get_ind_de(&self, line: &mut CodeLine) -> OperandError {
        self.get_ind_reg(line, "DE")
    }

    pub fn get_ind_sp(&self, line: &mut CodeLine) -> OperandError {
        self.get_ind_reg(line, "SP")
    }

    fn get_ind_reg(&self, line: &mut CodeLine, name: &str) -> OperandError {
        if !line.has_tokens_left(3) {
            return OperandError::TokenNumber;
        }
        if self.indirect_reg(&line.tokens, &mut line.curtoken, name) {
            return OperandError::Ok;
        }
        OperandError::WrongRegister
    }

    /// Indexed `(IX+d)` / `(IY+d)`; pass 1 neutralizes an unresolved
    /// displacement to 0.
    pub fn get_ind_x(
        &self,
        line: &mut CodeLine,
        reg: &mut OperandType,
        value: &mut i32,
        ctx: &dyn AssemblerContext,
    ) -> OperandError {
        if !line.has_tokens_left(5) {
            return OperandError::TokenNumber;
        }
        match self.indirect_x(&line.tokens, &mut line.curtoken, reg, value, ctx) {
            OperandError::Ok => OperandError::Ok,
            OperandError::Unsolved => {
                if ctx.is_first_pass() {
                    *value = 0;
                    OperandError::Ok
                } else {
                    OperandError::Unsolved
                }
            }
            _ => OperandError::WrongRegister,
        }
    }

    /// Bit number; a register name at the cursor is refused before the
    /// expression is even tried, on a scratch cursor so nothing moves.
    pub fn get_bit_number(
        &self,
        line: &mut CodeLine,
        bit: &mut OperandType,
        ctx: &dyn AssemblerContext,
    ) -> OperandError {
        if !line.has_tokens_left(1) {
            return OperandError::TokenNumber;
        }
        let mut worktoken = line.curtoken;
        if self.reg8(&line.tokens, &mut worktoken).is_some() {
            return OperandError::WrongRegister;
        }
        if self.reg16(&line.tokens, &mut worktoken).is_some() {
            return OperandError::WrongRegister;
        }
        match self.bit_number(&line.tokens, &mut line.curtoken, bit, ctx) {
            OperandError::Ok => OperandError::Ok,
            OperandError::Unsolved if ctx.is_first_pass() => {
                *bit = OperandType::Bit0;
                OperandError::Ok
            }
            other => other,
        }
    }

    /// Condition code.
    pub fn get_cond(&self, line: &mut CodeLine, cond: &mut OperandType) -> OperandError {
        if !line.has_tokens_left(1) {
            return OperandError::TokenNumber;
        }
        if self.condition(&line.tokens, &mut line.curtoken, cond) == OperandError::Ok {
            return OperandError::Ok;
        }
        OperandError::NotCondition
    }

    /// 8-bit immediate; register names are refused, and any numeric
    /// failure (including `TooBig`) reports as `NotNumber`.
    pub fn get_num8(
        &self,
        line: &mut CodeLine,
        value: &mut i32,
        ctx: &dyn AssemblerContext,
    ) -> OperandError {
        if !line.has_tokens_left(1) {
            return OperandError::TokenNumber;
        }
        let mut worktoken = line.curtoken;
        if self.reg8(&line.tokens, &mut worktoken).is_some() {
            return OperandError::WrongRegister;
        }
        if self.reg16(&line.tokens, &mut worktoken).is_some() {
            return OperandError::WrongRegister;
        }
        match self.number8(&line.tokens, &mut line.curtoken, value, ctx) {
            OperandError::Ok => OperandError::Ok,
            OperandError::Unsolved => {
                if ctx.is_first_pass() {
                    *value = 0;
                    OperandError::Ok
                } else {
                    OperandError::Unsolved
                }
            }
            _ => OperandError::NotNumber,
        }
    }

    /// 16-bit immediate; same exclusions as [`Self::get_num8`].
    pub fn get_num16(
        &self,
        line: &mut CodeLine,
        value: &mut i32,
        ctx: &dyn AssemblerContext,
    ) -> OperandError {
        if !line.has_tokens_left(1) {
            return OperandError::TokenNumber;
        }
        let mut worktoken = line.curtoken;
        if self.reg8(&line.tokens, &mut worktoken).is_some() {
            return OperandError::WrongRegister;
        }
        if self.reg16(&line.tokens, &mut worktoken).is_some() {
            return OperandError::WrongRegister;
        }
        match self.number16(&line.tokens, &mut line.curtoken, value, ctx) {
            OperandError::Ok => OperandError::Ok,
            OperandError::Unsolved => {
                if ctx.is_first_pass() {
                    *value = 0;
                    OperandError::Ok
                } else {
                    OperandError::Unsolved
                }
            }
            _ => OperandError::NotNumber,
        }
    }

    /// Absolute-indirect `(nn)`; commits the cursor past the closing
    /// parenthesis on success and on an unresolved-but-valid expression.
    pub fn get_ind16(
        &self,
        line: &mut CodeLine,
        value: &mut i32,
        ctx: &dyn AssemblerContext,
    ) -> OperandError {
        if !line.has_tokens_left(3) {
            return OperandError::TokenNumber;
        }
        let mut lasttoken = line.curtoken;
        match self.indirect16(&line.tokens, line.curtoken, value, &mut lasttoken, ctx) {
            OperandError::Ok => {
                line.curtoken = lasttoken;
                OperandError::Ok
            }
            OperandError::Unsolved => {
                line.curtoken = lasttoken;
                if ctx.is_first_pass() {
                    *value = 0;
                    OperandError::Ok
                } else {
                    OperandError::Unsolved
                }
            }
            _ => OperandError::NotNumber,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tokenizer::tokenize;
    use crate::z80::operands::REGS_ANY;
    use std::collections::HashMap;

    struct TestCtx {
        symbols: HashMap<String, i32>,
        first_pass: bool,
    }

    impl TestCtx {
        fn pass1() -> Self {
            Self {
                symbols: HashMap::new(),
                first_pass: true,
            }
        }

        fn pass2() -> Self {
            Self {
                symbols: HashMap::new(),
                first_pass: false,
            }
        }

        fn with_symbol(mut self, name: &str, value: i32) -> Self {
            self.symbols.insert(name.to_string(), value);
            self
        }
    }

    impl AssemblerContext for TestCtx {
        fn lookup_symbol(&self, name: &str) -> Option<i32> {
            self.symbols.get(name).copied()
        }

        fn current_address(&self) -> u16 {
            0
        }

        fn is_first_pass(&self) -> bool {
            self.first_pass
        }
    }

    fn line(source: &str) -> CodeLine {
        CodeLine::new(tokenize(source).unwrap())
    }

    #[test]
    fn reg8_matches_and_advances() {
        let tools = OperandTools::new();
        let mut l = line("A");
        let mut reg = OperandType::B;
        assert_eq!(tools.get_reg8(&mut l, &mut reg, REGS_ANY), OperandError::Ok);
        assert_eq!(reg, OperandType::A);
        assert_eq!(l.curtoken, 1);
    }

    #[test]
    fn reg8_upper_cases_the_source() {
        let tools = OperandTools::new();
        let mut l = line("a");
        let mut reg = OperandType::B;
        assert_eq!(tools.get_reg8(&mut l, &mut reg, REGS_ANY), OperandError::Ok);
        assert_eq!(reg, OperandType::A);
        assert_eq!(l.curtoken, 1);
    }

    #[test]
    fn reg8_mask_rejection_rolls_back() {
        let tools = OperandTools::new();
        let mut l = line("A");
        let mut reg = OperandType::B;
        let mask = !crate::z80::operands::operand_bit(OperandType::A);
        assert_eq!(
            tools.get_reg8(&mut l, &mut reg, mask),
            OperandError::WrongRegister
        );
        assert_eq!(l.curtoken, 0);
    }

    #[test]
    fn reg8_rejects_labels_without_moving() {
        let tools = OperandTools::new();
        let mut l = line("LOOP");
        let mut reg = OperandType::B;
        assert_eq!(
            tools.get_reg8(&mut l, &mut reg, REGS_ANY),
            OperandError::NotRegister
        );
        assert_eq!(l.curtoken, 0);
    }

    #[test]
    fn reg16_matches_and_advances() {
        let tools = OperandTools::new();
        let mut l = line("HL");
        let mut reg = OperandType::B;
        assert_eq!(
            tools.get_reg16(&mut l, &mut reg, REGS_ANY),
            OperandError::Ok
        );
        assert_eq!(reg, OperandType::Hl);
        assert_eq!(l.curtoken, 1);
    }

    #[test]
    fn reg16_matches_shadow_pair() {
        let tools = OperandTools::new();
        let mut l = line("AF'");
        let mut reg = OperandType::B;
        assert_eq!(
            tools.get_reg16(&mut l, &mut reg, REGS_ANY),
            OperandError::Ok
        );
        assert_eq!(reg, OperandType::AfShadow);
    }

    #[test]
    fn indirect_hl_consumes_three_tokens() {
        let tools = OperandTools::new();
        let mut l = line("(HL)");
        assert_eq!(tools.get_ind_hl(&mut l), OperandError::Ok);
        assert_eq!(l.curtoken, 3);
    }

    #[test]
    fn indirect_register_names_are_case_sensitive() {
        let tools = OperandTools::new();
        let mut l = line("(hl)");
        assert_eq!(tools.get_ind_hl(&mut l), OperandError::WrongRegister);
        assert_eq!(l.curtoken, 0);
    }

    #[test]
    fn indirect_register_rejects_wrong_pair() {
        let tools = OperandTools::new();
        let mut l = line("(DE)");
        assert_eq!(tools.get_ind_hl(&mut l), OperandError::WrongRegister);
        assert_eq!(l.curtoken, 0);
        assert_eq!(tools.get_ind_de(&mut l), OperandError::Ok);
        assert_eq!(l.curtoken, 3);
    }

    #[test]
    fn indexed_with_literal_displacement() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut l = line("(IX+5)");
        let mut reg = OperandType::B;
        let mut value = -1;
        assert_eq!(
            tools.get_ind_x(&mut l, &mut reg, &mut value, &ctx),
            OperandError::Ok
        );
        assert_eq!(reg, OperandType::Ix);
        assert_eq!(value, 5);
        assert_eq!(l.curtoken, 5);
    }

    #[test]
    fn indexed_with_expression_displacement() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1().with_symbol("OFS", 2);
        let mut l = line("(IY+(OFS*2)+1)");
        let mut reg = OperandType::B;
        let mut value = -1;
        assert_eq!(
            tools.get_ind_x(&mut l, &mut reg, &mut value, &ctx),
            OperandError::Ok
        );
        assert_eq!(reg, OperandType::Iy);
        assert_eq!(value, 5);
        assert!(l.exhausted());
    }

    #[test]
    fn indexed_unresolved_on_pass_one_is_neutral_success() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut l = line("(IX+LABEL)");
        let mut reg = OperandType::B;
        let mut value = -1;
        assert_eq!(
            tools.get_ind_x(&mut l, &mut reg, &mut value, &ctx),
            OperandError::Ok
        );
        assert_eq!(value, 0);
        assert_eq!(l.curtoken, 5);
    }

    #[test]
    fn indexed_unresolved_on_pass_two_surfaces() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass2();
        let mut l = line("(IX+LABEL)");
        let mut reg = OperandType::B;
        let mut value = -1;
        assert_eq!(
            tools.get_ind_x(&mut l, &mut reg, &mut value, &ctx),
            OperandError::Unsolved
        );
        assert_eq!(value, 0);
        // the shape was valid, so the cursor moved in lockstep with pass 1
        assert_eq!(l.curtoken, 5);
    }

    #[test]
    fn indexed_structural_failures_leave_the_cursor() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        for source in ["(HL+5)", "A+5)x", "(IX-5)"] {
            let mut l = line(source);
            let mut reg = OperandType::B;
            let mut value = -1;
            assert_eq!(
                tools.get_ind_x(&mut l, &mut reg, &mut value, &ctx),
                OperandError::WrongRegister,
                "{source}"
            );
            assert_eq!(l.curtoken, 0, "{source}");
        }

        // too short for the shape at all
        let mut l = line("(IX");
        let mut reg = OperandType::B;
        let mut value = -1;
        assert_eq!(
            tools.get_ind_x(&mut l, &mut reg, &mut value, &ctx),
            OperandError::TokenNumber
        );
        assert_eq!(l.curtoken, 0);
    }

    #[test]
    fn bit_number_in_range() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut l = line("3");
        let mut bit = OperandType::Bit0;
        assert_eq!(
            tools.get_bit_number(&mut l, &mut bit, &ctx),
            OperandError::Ok
        );
        assert_eq!(bit, OperandType::Bit3);
        assert_eq!(l.curtoken, 1);
    }

    #[test]
    fn bit_number_out_of_range_keeps_cursor() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut l = line("9");
        let mut bit = OperandType::Bit0;
        assert_eq!(
            tools.get_bit_number(&mut l, &mut bit, &ctx),
            OperandError::NotBit
        );
        assert_eq!(l.curtoken, 0);
    }

    #[test]
    fn bit_number_refuses_register_names_without_consuming() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        for source in ["A", "HL"] {
            let mut l = line(source);
            let mut bit = OperandType::Bit0;
            assert_eq!(
                tools.get_bit_number(&mut l, &mut bit, &ctx),
                OperandError::WrongRegister,
                "{source}"
            );
            assert_eq!(l.curtoken, 0, "{source}");
        }
    }

    #[test]
    fn bit_number_unresolved_defaults_to_bit_zero_on_pass_one() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut l = line("BITPOS");
        let mut bit = OperandType::Bit5;
        assert_eq!(
            tools.get_bit_number(&mut l, &mut bit, &ctx),
            OperandError::Ok
        );
        assert_eq!(bit, OperandType::Bit0);
        assert_eq!(l.curtoken, 1);
    }

    #[test]
    fn bit_number_expression_folds() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1().with_symbol("N", 2);
        let mut l = line("N+1");
        let mut bit = OperandType::Bit0;
        assert_eq!(
            tools.get_bit_number(&mut l, &mut bit, &ctx),
            OperandError::Ok
        );
        assert_eq!(bit, OperandType::Bit3);
        assert_eq!(l.curtoken, 3);
    }

    #[test]
    fn absolute_indirect_value() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut l = line("(0x1234)");
        let mut value = -1;
        assert_eq!(tools.get_ind16(&mut l, &mut value, &ctx), OperandError::Ok);
        assert_eq!(value, 0x1234);
        assert_eq!(l.curtoken, 3);
    }

    #[test]
    fn absolute_indirect_missing_close() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut l = line("(1+2");
        let mut value = -1;
        assert_eq!(
            tools.get_ind16(&mut l, &mut value, &ctx),
            OperandError::NotNumber
        );
        assert_eq!(l.curtoken, 0);
    }

    #[test]
    fn absolute_indirect_unresolved_still_commits_cursor() {
        let tools = OperandTools::new();
        let mut l = line("(TARGET)");
        let mut value = -1;
        assert_eq!(
            tools.get_ind16(&mut l, &mut value, &TestCtx::pass1()),
            OperandError::Ok
        );
        assert_eq!(value, 0);
        assert_eq!(l.curtoken, 3);

        let mut l = line("(TARGET)");
        assert_eq!(
            tools.get_ind16(&mut l, &mut value, &TestCtx::pass2()),
            OperandError::Unsolved
        );
        assert_eq!(l.curtoken, 3);
    }

    #[test]
    fn condition_codes_match_uppercase_only() {
        let tools = OperandTools::new();
        let mut l = line("NZ");
        let mut cond = OperandType::CondZ;
        assert_eq!(tools.get_cond(&mut l, &mut cond), OperandError::Ok);
        assert_eq!(cond, OperandType::CondNz);
        assert_eq!(l.curtoken, 1);

        let mut l = line("nz");
        assert_eq!(
            tools.get_cond(&mut l, &mut cond),
            OperandError::NotCondition
        );
        assert_eq!(l.curtoken, 0);
    }

    #[test]
    fn num8_range_and_collapse() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut l = line("200");
        let mut value = -1;
        assert_eq!(tools.get_num8(&mut l, &mut value, &ctx), OperandError::Ok);
        assert_eq!(value, 200);
        assert_eq!(l.curtoken, 1);

        // the matcher reports the precise failure, the gate a generic one
        let mut l = line("256");
        let mut cursor = 0;
        assert_eq!(
            tools.number8(&l.tokens, &mut cursor, &mut value, &ctx),
            OperandError::TooBig
        );
        assert_eq!(cursor, 0);
        assert_eq!(
            tools.get_num8(&mut l, &mut value, &ctx),
            OperandError::NotNumber
        );
        assert_eq!(l.curtoken, 0);
    }

    #[test]
    fn num16_refuses_registers() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut l = line("HL");
        let mut value = -1;
        assert_eq!(
            tools.get_num16(&mut l, &mut value, &ctx),
            OperandError::WrongRegister
        );
        assert_eq!(l.curtoken, 0);
    }

    #[test]
    fn num16_upper_bound() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut l = line("65536");
        let mut value = -1;
        assert_eq!(
            tools.get_num16(&mut l, &mut value, &ctx),
            OperandError::NotNumber
        );

        let mut l = line("65535");
        assert_eq!(tools.get_num16(&mut l, &mut value, &ctx), OperandError::Ok);
        assert_eq!(value, 65535);
    }

    #[test]
    fn pass_one_never_reports_unsolved() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut value = -1;
        let mut reg = OperandType::B;
        let mut bit = OperandType::Bit0;

        let mut l = line("(IX+FWD)");
        assert_eq!(
            tools.get_ind_x(&mut l, &mut reg, &mut value, &ctx),
            OperandError::Ok
        );
        let mut l = line("FWD");
        assert_eq!(tools.get_bit_number(&mut l, &mut bit, &ctx), OperandError::Ok);
        let mut l = line("FWD");
        assert_eq!(tools.get_num8(&mut l, &mut value, &ctx), OperandError::Ok);
        let mut l = line("FWD");
        assert_eq!(tools.get_num16(&mut l, &mut value, &ctx), OperandError::Ok);
        let mut l = line("(FWD)");
        assert_eq!(tools.get_ind16(&mut l, &mut value, &ctx), OperandError::Ok);
    }

    #[test]
    fn pass_two_surfaces_unsolved() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass2();
        let mut value = -1;

        let mut l = line("FWD");
        assert_eq!(
            tools.get_num16(&mut l, &mut value, &ctx),
            OperandError::Unsolved
        );
        // resolved on pass 2 once the symbol exists
        let ctx = TestCtx::pass2().with_symbol("FWD", 0x1234);
        let mut l = line("FWD");
        assert_eq!(tools.get_num16(&mut l, &mut value, &ctx), OperandError::Ok);
        assert_eq!(value, 0x1234);
    }

    #[test]
    fn immediate_expression_advances_past_all_tokens() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1().with_symbol("BASE", 0x40);
        let mut l = line("BASE+2*8");
        let mut value = -1;
        assert_eq!(tools.get_num16(&mut l, &mut value, &ctx), OperandError::Ok);
        assert_eq!(value, 0x50);
        assert!(l.exhausted());
    }

    #[test]
    fn empty_line_reports_token_number() {
        let tools = OperandTools::new();
        let ctx = TestCtx::pass1();
        let mut l = line("");
        let mut reg = OperandType::B;
        let mut value = -1;
        assert_eq!(
            tools.get_reg8(&mut l, &mut reg, REGS_ANY),
            OperandError::TokenNumber
        );
        assert_eq!(tools.get_ind_hl(&mut l), OperandError::TokenNumber);
        assert_eq!(
            tools.get_ind_x(&mut l, &mut reg, &mut value, &ctx),
            OperandError::TokenNumber
        );
        assert_eq!(
            tools.get_ind16(&mut l, &mut value, &ctx),
            OperandError::TokenNumber
        );
    }
}
