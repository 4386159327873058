// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Z80 instruction encoding.
//!
//! The encoder drives the operand recognizer: for each mnemonic it asks
//! the gate "is the next operand one of these shapes?" and commits to the
//! first hypothesis that sticks. The instruction set covered here is the
//! representative core — the 8-bit load and ALU groups with their indexed
//! and undocumented-half forms, 16-bit loads, stack, exchange, jumps and
//! calls with conditions, the CB bit group, I/O, and the implied-operand
//! group.

use crate::core::codeline::CodeLine;
use crate::core::eval::AssemblerContext;
use crate::core::tokenizer::TokenKind;

use super::operands::{
    operand_bit, prefix, reg_accept, subcode, OperandError, OperandType, REGS_BC_DE_HL_SP,
    REGS_HALVES, REGS_PUSHPOP, REGS_STD8,
};
use super::tools::OperandTools;

/// Result of one encode attempt.
#[derive(Debug, Clone)]
pub enum EncodeResult<T> {
    /// Successfully encoded.
    Ok(T),
    /// Mnemonic not in this handler's table.
    NotFound,
    /// The mnemonic matched but its operands are wrong.
    Error(String),
}

impl<T> EncodeResult<T> {
    pub fn error(message: impl Into<String>) -> Self {
        EncodeResult::Error(message.into())
    }
}

/// Index-register pairs accepted where HL is.
const REGS_HL_IX_IY: u64 =
    operand_bit(OperandType::Hl) | operand_bit(OperandType::Ix) | operand_bit(OperandType::Iy);

/// An 8-bit read/write location after recognition.
enum Operand8 {
    Reg(OperandType),
    IndHl,
    Indexed(OperandType, i32),
    Imm(i32),
}

/// Instructions without operands, CB/ED prefixed forms included.
struct SimpleEntry {
    mnemonic: &'static str,
    bytes: &'static [u8],
}

static SIMPLE_TABLE: &[SimpleEntry] = &[
    SimpleEntry { mnemonic: "NOP", bytes: &[0x00] },
    SimpleEntry { mnemonic: "RLCA", bytes: &[0x07] },
    SimpleEntry { mnemonic: "RRCA", bytes: &[0x0F] },
    SimpleEntry { mnemonic: "RLA", bytes: &[0x17] },
    SimpleEntry { mnemonic: "RRA", bytes: &[0x1F] },
    SimpleEntry { mnemonic: "DAA", bytes: &[0x27] },
    SimpleEntry { mnemonic: "CPL", bytes: &[0x2F] },
    SimpleEntry { mnemonic: "SCF", bytes: &[0x37] },
    SimpleEntry { mnemonic: "CCF", bytes: &[0x3F] },
    SimpleEntry { mnemonic: "HALT", bytes: &[0x76] },
    SimpleEntry { mnemonic: "EXX", bytes: &[0xD9] },
    SimpleEntry { mnemonic: "DI", bytes: &[0xF3] },
    SimpleEntry { mnemonic: "EI", bytes: &[0xFB] },
    SimpleEntry { mnemonic: "NEG", bytes: &[0xED, 0x44] },
    SimpleEntry { mnemonic: "RETN", bytes: &[0xED, 0x45] },
    SimpleEntry { mnemonic: "RETI", bytes: &[0xED, 0x4D] },
    SimpleEntry { mnemonic: "RRD", bytes: &[0xED, 0x67] },
    SimpleEntry { mnemonic: "RLD", bytes: &[0xED, 0x6F] },
    SimpleEntry { mnemonic: "LDI", bytes: &[0xED, 0xA0] },
    SimpleEntry { mnemonic: "CPI", bytes: &[0xED, 0xA1] },
    SimpleEntry { mnemonic: "INI", bytes: &[0xED, 0xA2] },
    SimpleEntry { mnemonic: "OUTI", bytes: &[0xED, 0xA3] },
    SimpleEntry { mnemonic: "LDD", bytes: &[0xED, 0xA8] },
    SimpleEntry { mnemonic: "CPD", bytes: &[0xED, 0xA9] },
    SimpleEntry { mnemonic: "IND", bytes: &[0xED, 0xAA] },
    SimpleEntry { mnemonic: "OUTD", bytes: &[0xED, 0xAB] },
    SimpleEntry { mnemonic: "LDIR", bytes: &[0xED, 0xB0] },
    SimpleEntry { mnemonic: "CPIR", bytes: &[0xED, 0xB1] },
    SimpleEntry { mnemonic: "INIR", bytes: &[0xED, 0xB2] },
    SimpleEntry { mnemonic: "OTIR", bytes: &[0xED, 0xB3] },
    SimpleEntry { mnemonic: "LDDR", bytes: &[0xED, 0xB8] },
    SimpleEntry { mnemonic: "CPDR", bytes: &[0xED, 0xB9] },
    SimpleEntry { mnemonic: "INDR", bytes: &[0xED, 0xBA] },
    SimpleEntry { mnemonic: "OTDR", bytes: &[0xED, 0xBB] },
];

/// ALU group: (mnemonic, register-form base, immediate opcode).
static ALU_TABLE: &[(&str, u8, u8)] = &[
    ("ADD", 0x80, 0xC6),
    ("ADC", 0x88, 0xCE),
    ("SUB", 0x90, 0xD6),
    ("SBC", 0x98, 0xDE),
    ("AND", 0xA0, 0xE6),
    ("XOR", 0xA8, 0xEE),
    ("OR", 0xB0, 0xF6),
    ("CP", 0xB8, 0xFE),
];

/// Encoder for the Z80 instruction set.
pub struct Z80Handler {
    tools: OperandTools,
}

impl Default for Z80Handler {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80Handler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: OperandTools::new(),
        }
    }

    /// The operand gate, shared with directive processing.
    #[must_use]
    pub fn tools(&self) -> &OperandTools {
        &self.tools
    }

    /// Encode one instruction. The cursor stands after the mnemonic and
    /// is consumed up to the end of the operands on success.
    pub fn encode(
        &self,
        line: &mut CodeLine,
        mnemonic: &str,
        ctx: &dyn AssemblerContext,
    ) -> EncodeResult<Vec<u8>> {
        let upper = mnemonic.to_ascii_uppercase();

        if let Some(entry) = SIMPLE_TABLE.iter().find(|e| e.mnemonic == upper) {
            return EncodeResult::Ok(entry.bytes.to_vec());
        }
        if let Some((_, base, imm)) = ALU_TABLE.iter().find(|(name, _, _)| *name == upper) {
            return self.encode_alu(line, &upper, *base, *imm, ctx);
        }

        match upper.as_str() {
            "LD" => self.encode_ld(line, ctx),
            "PUSH" => self.encode_stack(line, 0xC5),
            "POP" => self.encode_stack(line, 0xC1),
            "INC" => self.encode_inc_dec(line, 0x04, 0x03, ctx),
            "DEC" => self.encode_inc_dec(line, 0x05, 0x0B, ctx),
            "JP" => self.encode_jp(line, ctx),
            "JR" => self.encode_relative(line, 0x18, true, ctx),
            "DJNZ" => self.encode_relative(line, 0x10, false, ctx),
            "CALL" => self.encode_call(line, ctx),
            "RET" => self.encode_ret(line),
            "RST" => self.encode_rst(line, ctx),
            "IM" => self.encode_im(line, ctx),
            "BIT" => self.encode_bit_op(line, 0x40, ctx),
            "RES" => self.encode_bit_op(line, 0x80, ctx),
            "SET" => self.encode_bit_op(line, 0xC0, ctx),
            "IN" => self.encode_in(line, ctx),
            "OUT" => self.encode_out(line, ctx),
            "EX" => self.encode_ex(line),
            _ => EncodeResult::NotFound,
        }
    }

    /// Recognize an 8-bit location: register, `(HL)`, `(IX+d)`, or an
    /// immediate. Errors are final — the caller already committed to the
    /// mnemonic.
    fn operand8(
        &self,
        line: &mut CodeLine,
        ctx: &dyn AssemblerContext,
    ) -> Result<Operand8, String> {
        if self.tools.get_ind_hl(line) == OperandError::Ok {
            return Ok(Operand8::IndHl);
        }
        let mut reg = OperandType::A;
        let mut value = 0;
        match self.tools.get_ind_x(line, &mut reg, &mut value, ctx) {
            OperandError::Ok => return Ok(Operand8::Indexed(reg, value)),
            OperandError::Unsolved => return Err("Unresolved expression".to_string()),
            _ => {}
        }
        if self.tools.get_reg8(line, &mut reg, REGS_STD8 | REGS_HALVES) == OperandError::Ok {
            return Ok(Operand8::Reg(reg));
        }
        match self.tools.get_num8(line, &mut value, ctx) {
            OperandError::Ok => Ok(Operand8::Imm(value)),
            OperandError::Unsolved => Err("Unresolved expression".to_string()),
            _ => Err("Invalid 8-bit operand".to_string()),
        }
    }

    fn expect_comma(&self, line: &mut CodeLine) -> Result<(), String> {
        if line.accept(TokenKind::Comma) {
            Ok(())
        } else {
            Err("Missing comma between operands".to_string())
        }
    }

    /// Signed 8-bit displacement check for `(IX+d)` forms.
    fn index_byte(value: i32) -> Result<u8, String> {
        if !(-128..=127).contains(&value) {
            return Err(format!("Index offset {value} out of range (-128..127)"));
        }
        Ok(value as u8)
    }

    /// Relative branch displacement from the running address; pass 1
    /// substitutes 0 for out-of-range forward guesses so the size holds.
    fn branch_displacement(
        target: i32,
        ctx: &dyn AssemblerContext,
    ) -> Result<u8, String> {
        let disp = target - (ctx.current_address() as i32 + 2);
        if (-128..=127).contains(&disp) {
            Ok(disp as u8)
        } else if ctx.is_first_pass() {
            Ok(0)
        } else {
            Err(format!("Branch target out of range: offset {disp}"))
        }
    }

    fn join_prefix(a: u8, b: u8) -> Result<u8, String> {
        match (a, b) {
            (0, p) | (p, 0) => Ok(p),
            (p, q) if p == q => Ok(p),
            _ => Err("Cannot mix IX and IY operands".to_string()),
        }
    }

    fn encode_ld(&self, line: &mut CodeLine, ctx: &dyn AssemblerContext) -> EncodeResult<Vec<u8>> {
        match self.encode_ld_inner(line, ctx) {
            Ok(bytes) => EncodeResult::Ok(bytes),
            Err(msg) => EncodeResult::Error(msg),
        }
    }

    fn encode_ld_inner(
        &self,
        line: &mut CodeLine,
        ctx: &dyn AssemblerContext,
    ) -> Result<Vec<u8>, String> {
        let tools = &self.tools;
        let mut reg = OperandType::A;
        let mut value = 0;

        // (HL) destination
        if tools.get_ind_hl(line) == OperandError::Ok {
            self.expect_comma(line)?;
            match self.operand8(line, ctx)? {
                Operand8::Reg(src) if reg_accept(REGS_STD8, src) => {
                    return Ok(vec![0x70 | subcode(src)]);
                }
                Operand8::Imm(n) => return Ok(vec![0x36, n as u8]),
                _ => return Err("Invalid source for LD (HL)".to_string()),
            }
        }
        // (BC) / (DE) destination: accumulator only
        if tools.get_ind_bc(line) == OperandError::Ok {
            self.expect_comma(line)?;
            return self.expect_reg_a(line, vec![0x02]);
        }
        if tools.get_ind_de(line) == OperandError::Ok {
            self.expect_comma(line)?;
            return self.expect_reg_a(line, vec![0x12]);
        }
        // (IX+d) / (IY+d) destination
        match tools.get_ind_x(line, &mut reg, &mut value, ctx) {
            OperandError::Ok => {
                let p = prefix(reg);
                let d = Self::index_byte(value)?;
                self.expect_comma(line)?;
                match self.operand8(line, ctx)? {
                    Operand8::Reg(src) if reg_accept(REGS_STD8, src) => {
                        return Ok(vec![p, 0x70 | subcode(src), d]);
                    }
                    Operand8::Imm(n) => return Ok(vec![p, 0x36, d, n as u8]),
                    _ => return Err("Invalid source for indexed LD".to_string()),
                }
            }
            OperandError::Unsolved => return Err("Unresolved expression".to_string()),
            _ => {}
        }
        // (nn) destination
        match tools.get_ind16(line, &mut value, ctx) {
            OperandError::Ok => {
                let [lo, hi] = (value as u16).to_le_bytes();
                self.expect_comma(line)?;
                if tools.get_reg8(line, &mut reg, operand_bit(OperandType::A)) == OperandError::Ok {
                    return Ok(vec![0x32, lo, hi]);
                }
                let wide = REGS_BC_DE_HL_SP
                    | operand_bit(OperandType::Ix)
                    | operand_bit(OperandType::Iy);
                if tools.get_reg16(line, &mut reg, wide) == OperandError::Ok {
                    return Ok(match reg {
                        OperandType::Hl => vec![0x22, lo, hi],
                        OperandType::Ix | OperandType::Iy => vec![prefix(reg), 0x22, lo, hi],
                        OperandType::Bc => vec![0xED, 0x43, lo, hi],
                        OperandType::De => vec![0xED, 0x53, lo, hi],
                        _ => vec![0xED, 0x73, lo, hi],
                    });
                }
                return Err("Invalid source for LD (nn)".to_string());
            }
            OperandError::Unsolved => return Err("Unresolved expression".to_string()),
            _ => {}
        }
        // 8-bit register destination
        if tools.get_reg8(line, &mut reg, REGS_STD8 | REGS_HALVES | operand_bit(OperandType::I)
            | operand_bit(OperandType::R)) == OperandError::Ok
        {
            let dst = reg;
            self.expect_comma(line)?;
            return self.encode_ld_r8(line, dst, ctx);
        }
        // 16-bit register destination
        let wide = REGS_BC_DE_HL_SP | operand_bit(OperandType::Ix) | operand_bit(OperandType::Iy);
        if tools.get_reg16(line, &mut reg, wide) == OperandError::Ok {
            let dst = reg;
            self.expect_comma(line)?;
            return self.encode_ld_r16(line, dst, ctx);
        }
        Err("Invalid LD destination".to_string())
    }

    fn encode_ld_r8(
        &self,
        line: &mut CodeLine,
        dst: OperandType,
        ctx: &dyn AssemblerContext,
    ) -> Result<Vec<u8>, String> {
        let tools = &self.tools;
        let mut value = 0;

        // interrupt/refresh registers pair only with A
        if dst == OperandType::I || dst == OperandType::R {
            let opcode = if dst == OperandType::I { 0x47 } else { 0x4F };
            return self
                .expect_reg_a(line, vec![0xED, opcode])
                .map_err(|_| "Only A can be loaded into I or R".to_string());
        }
        if dst == OperandType::A {
            let mut reg = OperandType::A;
            if tools.get_ind_bc(line) == OperandError::Ok {
                return Ok(vec![0x0A]);
            }
            if tools.get_ind_de(line) == OperandError::Ok {
                return Ok(vec![0x1A]);
            }
            if tools.get_reg8(
                line,
                &mut reg,
                operand_bit(OperandType::I) | operand_bit(OperandType::R),
            ) == OperandError::Ok
            {
                let opcode = if reg == OperandType::I { 0x57 } else { 0x5F };
                return Ok(vec![0xED, opcode]);
            }
            // (nn) loses against (HL) and (IX+d), which the common path
            // below recognizes; only a plain absolute lands here
            if line.current().map(|t| t.kind) == Some(TokenKind::ParOpen)
                && !self.next_is_register_indirect(line, ctx)
            {
                match tools.get_ind16(line, &mut value, ctx) {
                    OperandError::Ok => {
                        let [lo, hi] = (value as u16).to_le_bytes();
                        return Ok(vec![0x3A, lo, hi]);
                    }
                    OperandError::Unsolved => return Err("Unresolved expression".to_string()),
                    _ => {}
                }
            }
        }

        match self.operand8(line, ctx)? {
            Operand8::Reg(src) => {
                let p = Self::join_prefix(prefix(dst), prefix(src))?;
                // H and L cannot meet an index half in one instruction
                if p != 0
                    && (reg_accept(operand_bit(OperandType::H) | operand_bit(OperandType::L), dst)
                        || reg_accept(
                            operand_bit(OperandType::H) | operand_bit(OperandType::L),
                            src,
                        ))
                {
                    return Err("Cannot mix H or L with index halves".to_string());
                }
                let opcode = 0x40 | (subcode(dst) << 3) | subcode(src);
                if p != 0 {
                    Ok(vec![p, opcode])
                } else {
                    Ok(vec![opcode])
                }
            }
            Operand8::IndHl if reg_accept(REGS_STD8, dst) => Ok(vec![0x46 | (subcode(dst) << 3)]),
            Operand8::IndHl => Err("Invalid destination for LD r,(HL)".to_string()),
            Operand8::Indexed(base, d) if reg_accept(REGS_STD8, dst) => Ok(vec![
                prefix(base),
                0x46 | (subcode(dst) << 3),
                Self::index_byte(d)?,
            ]),
            Operand8::Indexed(..) => Err("Invalid destination for indexed LD".to_string()),
            Operand8::Imm(n) => {
                let p = prefix(dst);
                let opcode = 0x06 | (subcode(dst) << 3);
                if p != 0 {
                    Ok(vec![p, opcode, n as u8])
                } else {
                    Ok(vec![opcode, n as u8])
                }
            }
        }
    }

    /// Peek on a scratch line: true when the parenthesized operand ahead
    /// is `(HL)` or `(IX+d)` rather than an absolute `(nn)`.
    fn next_is_register_indirect(&self, line: &CodeLine, ctx: &dyn AssemblerContext) -> bool {
        let mut probe = line.clone();
        if self.tools.get_ind_hl(&mut probe) == OperandError::Ok {
            return true;
        }
        let mut reg = OperandType::A;
        let mut value = 0;
        !matches!(
            self.tools.get_ind_x(&mut probe, &mut reg, &mut value, ctx),
            OperandError::WrongRegister | OperandError::TokenNumber
        )
    }

    fn encode_ld_r16(
        &self,
        line: &mut CodeLine,
        dst: OperandType,
        ctx: &dyn AssemblerContext,
    ) -> Result<Vec<u8>, String> {
        let tools = &self.tools;
        let mut value = 0;
        let mut reg = OperandType::A;

        if dst == OperandType::Sp
            && tools.get_reg16(line, &mut reg, REGS_HL_IX_IY) == OperandError::Ok
        {
            let p = prefix(reg);
            return Ok(if p != 0 { vec![p, 0xF9] } else { vec![0xF9] });
        }

        match tools.get_ind16(line, &mut value, ctx) {
            OperandError::Ok => {
                let [lo, hi] = (value as u16).to_le_bytes();
                return Ok(match dst {
                    OperandType::Hl => vec![0x2A, lo, hi],
                    OperandType::Ix | OperandType::Iy => vec![prefix(dst), 0x2A, lo, hi],
                    OperandType::Bc => vec![0xED, 0x4B, lo, hi],
                    OperandType::De => vec![0xED, 0x5B, lo, hi],
                    _ => vec![0xED, 0x7B, lo, hi],
                });
            }
            OperandError::Unsolved => return Err("Unresolved expression".to_string()),
            _ => {}
        }

        match tools.get_num16(line, &mut value, ctx) {
            OperandError::Ok => {
                let [lo, hi] = (value as u16).to_le_bytes();
                let p = prefix(dst);
                let opcode = 0x01 | subcode(dst);
                Ok(if p != 0 {
                    vec![p, opcode, lo, hi]
                } else {
                    vec![opcode, lo, hi]
                })
            }
            OperandError::Unsolved => Err("Unresolved expression".to_string()),
            _ => Err("Invalid source for 16-bit LD".to_string()),
        }
    }

    fn expect_reg_a(&self, line: &mut CodeLine, bytes: Vec<u8>) -> Result<Vec<u8>, String> {
        let mut reg = OperandType::A;
        if self.tools.get_reg8(line, &mut reg, operand_bit(OperandType::A)) == OperandError::Ok {
            Ok(bytes)
        } else {
            Err("Only A is valid here".to_string())
        }
    }

    fn encode_alu(
        &self,
        line: &mut CodeLine,
        mnemonic: &str,
        base: u8,
        imm_opcode: u8,
        ctx: &dyn AssemblerContext,
    ) -> EncodeResult<Vec<u8>> {
        let tools = &self.tools;
        let mut reg = OperandType::A;

        // 16-bit forms: ADD HL,rr / ADC HL,rr / SBC HL,rr
        if matches!(mnemonic, "ADD" | "ADC" | "SBC")
            && tools.get_reg16(line, &mut reg, REGS_HL_IX_IY) == OperandError::Ok
        {
            let dst = reg;
            if self.expect_comma(line).is_err() {
                return EncodeResult::error("Missing comma between operands");
            }
            let pair_mask = if dst == OperandType::Hl {
                REGS_BC_DE_HL_SP
            } else {
                // ADD IX,rr accepts BC DE IX SP
                operand_bit(OperandType::Bc)
                    | operand_bit(OperandType::De)
                    | operand_bit(dst)
                    | operand_bit(OperandType::Sp)
            };
            if tools.get_reg16(line, &mut reg, pair_mask) != OperandError::Ok {
                return EncodeResult::error("Invalid register pair");
            }
            let sub = subcode(reg);
            return match mnemonic {
                "ADD" => {
                    let p = prefix(dst);
                    if p != 0 {
                        EncodeResult::Ok(vec![p, 0x09 | sub])
                    } else {
                        EncodeResult::Ok(vec![0x09 | sub])
                    }
                }
                "ADC" if dst == OperandType::Hl => EncodeResult::Ok(vec![0xED, 0x4A | sub]),
                "SBC" if dst == OperandType::Hl => EncodeResult::Ok(vec![0xED, 0x42 | sub]),
                _ => EncodeResult::error("Only HL accepts ADC/SBC with a register pair"),
            };
        }

        // optional accumulator spelling: ADD A,x
        let mut probe = line.curtoken;
        if self.tools.reg8(&line.tokens, &mut probe) == Some(OperandType::A)
            && line.tokens.get(probe).map(|t| t.kind) == Some(TokenKind::Comma)
        {
            line.curtoken = probe + 1;
        }

        match self.operand8(line, ctx) {
            Ok(Operand8::Reg(src)) => {
                let p = prefix(src);
                let opcode = base | subcode(src);
                if p != 0 {
                    EncodeResult::Ok(vec![p, opcode])
                } else {
                    EncodeResult::Ok(vec![opcode])
                }
            }
            Ok(Operand8::IndHl) => EncodeResult::Ok(vec![base | 6]),
            Ok(Operand8::Indexed(basereg, d)) => match Self::index_byte(d) {
                Ok(d) => EncodeResult::Ok(vec![prefix(basereg), base | 6, d]),
                Err(msg) => EncodeResult::Error(msg),
            },
            Ok(Operand8::Imm(n)) => EncodeResult::Ok(vec![imm_opcode, n as u8]),
            Err(msg) => EncodeResult::Error(msg),
        }
    }

    fn encode_stack(&self, line: &mut CodeLine, base: u8) -> EncodeResult<Vec<u8>> {
        let mut reg = OperandType::A;
        let mask =
            REGS_PUSHPOP | operand_bit(OperandType::Ix) | operand_bit(OperandType::Iy);
        match self.tools.get_reg16(line, &mut reg, mask) {
            OperandError::Ok => {
                let p = prefix(reg);
                let opcode = base | subcode(reg);
                if p != 0 {
                    EncodeResult::Ok(vec![p, opcode])
                } else {
                    EncodeResult::Ok(vec![opcode])
                }
            }
            _ => EncodeResult::error("PUSH/POP need BC, DE, HL, AF, IX or IY"),
        }
    }

    fn encode_inc_dec(
        &self,
        line: &mut CodeLine,
        base8: u8,
        base16: u8,
        ctx: &dyn AssemblerContext,
    ) -> EncodeResult<Vec<u8>> {
        let mut reg = OperandType::A;
        let wide = REGS_BC_DE_HL_SP | operand_bit(OperandType::Ix) | operand_bit(OperandType::Iy);
        if self.tools.get_reg16(line, &mut reg, wide) == OperandError::Ok {
            let p = prefix(reg);
            let opcode = base16 | subcode(reg);
            return if p != 0 {
                EncodeResult::Ok(vec![p, opcode])
            } else {
                EncodeResult::Ok(vec![opcode])
            };
        }
        match self.operand8(line, ctx) {
            Ok(Operand8::Reg(src)) => {
                let p = prefix(src);
                let opcode = base8 | (subcode(src) << 3);
                if p != 0 {
                    EncodeResult::Ok(vec![p, opcode])
                } else {
                    EncodeResult::Ok(vec![opcode])
                }
            }
            Ok(Operand8::IndHl) => EncodeResult::Ok(vec![base8 | (6 << 3)]),
            Ok(Operand8::Indexed(basereg, d)) => match Self::index_byte(d) {
                Ok(d) => EncodeResult::Ok(vec![prefix(basereg), base8 | (6 << 3), d]),
                Err(msg) => EncodeResult::Error(msg),
            },
            Ok(Operand8::Imm(_)) => EncodeResult::error("INC/DEC need a register or memory"),
            Err(msg) => EncodeResult::Error(msg),
        }
    }

    fn encode_jp(&self, line: &mut CodeLine, ctx: &dyn AssemblerContext) -> EncodeResult<Vec<u8>> {
        let tools = &self.tools;
        let mut cond = OperandType::CondNz;
        let mut value = 0;

        if tools.get_ind_hl(line) == OperandError::Ok {
            return EncodeResult::Ok(vec![0xE9]);
        }
        for name in ["IX", "IY"] {
            if tools.indirect_reg(&line.tokens, &mut line.curtoken, name) {
                let p = if name == "IX" { 0xDD } else { 0xFD };
                return EncodeResult::Ok(vec![p, 0xE9]);
            }
        }

        if tools.get_cond(line, &mut cond) == OperandError::Ok {
            if self.expect_comma(line).is_err() {
                return EncodeResult::error("Missing comma after condition");
            }
            return match tools.get_num16(line, &mut value, ctx) {
                OperandError::Ok => {
                    let [lo, hi] = (value as u16).to_le_bytes();
                    EncodeResult::Ok(vec![0xC2 | subcode(cond), lo, hi])
                }
                OperandError::Unsolved => EncodeResult::error("Unresolved expression"),
                _ => EncodeResult::error("Invalid jump target"),
            };
        }

        match tools.get_num16(line, &mut value, ctx) {
            OperandError::Ok => {
                let [lo, hi] = (value as u16).to_le_bytes();
                EncodeResult::Ok(vec![0xC3, lo, hi])
            }
            OperandError::Unsolved => EncodeResult::error("Unresolved expression"),
            _ => EncodeResult::error("Invalid jump target"),
        }
    }

    fn encode_relative(
        &self,
        line: &mut CodeLine,
        opcode: u8,
        allow_cond: bool,
        ctx: &dyn AssemblerContext,
    ) -> EncodeResult<Vec<u8>> {
        let tools = &self.tools;
        let mut cond = OperandType::CondNz;
        let mut opcode = opcode;

        if allow_cond && tools.get_cond(line, &mut cond) == OperandError::Ok {
            let sub = subcode(cond);
            // JR only exists for NZ, Z, NC, C
            if sub > 0x18 {
                return EncodeResult::error("Invalid condition for JR");
            }
            if self.expect_comma(line).is_err() {
                return EncodeResult::error("Missing comma after condition");
            }
            opcode = 0x20 | sub;
        }

        let mut value = 0;
        match tools.get_num16(line, &mut value, ctx) {
            OperandError::Ok => match Self::branch_displacement(value, ctx) {
                Ok(disp) => EncodeResult::Ok(vec![opcode, disp]),
                Err(msg) => EncodeResult::Error(msg),
            },
            OperandError::Unsolved => EncodeResult::error("Unresolved expression"),
            _ => EncodeResult::error("Invalid branch target"),
        }
    }

    fn encode_call(
        &self,
        line: &mut CodeLine,
        ctx: &dyn AssemblerContext,
    ) -> EncodeResult<Vec<u8>> {
        let tools = &self.tools;
        let mut cond = OperandType::CondNz;
        let mut value = 0;
        let opcode = if tools.get_cond(line, &mut cond) == OperandError::Ok {
            if self.expect_comma(line).is_err() {
                return EncodeResult::error("Missing comma after condition");
            }
            0xC4 | subcode(cond)
        } else {
            0xCD
        };
        match tools.get_num16(line, &mut value, ctx) {
            OperandError::Ok => {
                let [lo, hi] = (value as u16).to_le_bytes();
                EncodeResult::Ok(vec![opcode, lo, hi])
            }
            OperandError::Unsolved => EncodeResult::error("Unresolved expression"),
            _ => EncodeResult::error("Invalid call target"),
        }
    }

    fn encode_ret(&self, line: &mut CodeLine) -> EncodeResult<Vec<u8>> {
        let mut cond = OperandType::CondNz;
        if self.tools.get_cond(line, &mut cond) == OperandError::Ok {
            return EncodeResult::Ok(vec![0xC0 | subcode(cond)]);
        }
        EncodeResult::Ok(vec![0xC9])
    }

    fn encode_rst(&self, line: &mut CodeLine, ctx: &dyn AssemblerContext) -> EncodeResult<Vec<u8>> {
        let mut value = 0;
        if self.tools.get_num8(line, &mut value, ctx) != OperandError::Ok {
            return EncodeResult::error("RST needs a vector (0-7 or 00h-38h)");
        }
        let vector = if (0..=7).contains(&value) {
            value as u8
        } else if value % 8 == 0 && (8..=0x38).contains(&value) {
            (value / 8) as u8
        } else {
            return EncodeResult::error(format!("RST vector {value} invalid"));
        };
        EncodeResult::Ok(vec![0xC7 | (vector << 3)])
    }

    fn encode_im(&self, line: &mut CodeLine, ctx: &dyn AssemblerContext) -> EncodeResult<Vec<u8>> {
        let mut value = 0;
        if self.tools.get_num8(line, &mut value, ctx) != OperandError::Ok {
            return EncodeResult::error("IM needs a mode (0, 1 or 2)");
        }
        let opcode = match value {
            0 => 0x46,
            1 => 0x56,
            2 => 0x5E,
            _ => return EncodeResult::error(format!("Invalid interrupt mode {value}")),
        };
        EncodeResult::Ok(vec![0xED, opcode])
    }

    fn encode_bit_op(
        &self,
        line: &mut CodeLine,
        base: u8,
        ctx: &dyn AssemblerContext,
    ) -> EncodeResult<Vec<u8>> {
        let tools = &self.tools;
        let mut bit = OperandType::Bit0;
        match tools.get_bit_number(line, &mut bit, ctx) {
            OperandError::Ok => {}
            OperandError::WrongRegister => {
                return EncodeResult::error("Bit number expected, found a register")
            }
            OperandError::Unsolved => return EncodeResult::error("Unresolved expression"),
            _ => return EncodeResult::error("Bit number must be 0-7"),
        }
        if self.expect_comma(line).is_err() {
            return EncodeResult::error("Missing comma after bit number");
        }
        let bitsub = subcode(bit);

        match self.operand8(line, ctx) {
            Ok(Operand8::Reg(reg)) if reg_accept(REGS_STD8, reg) => {
                EncodeResult::Ok(vec![0xCB, base | bitsub | subcode(reg)])
            }
            Ok(Operand8::IndHl) => EncodeResult::Ok(vec![0xCB, base | bitsub | 6]),
            Ok(Operand8::Indexed(basereg, d)) => match Self::index_byte(d) {
                Ok(d) => EncodeResult::Ok(vec![prefix(basereg), 0xCB, d, base | bitsub | 6]),
                Err(msg) => EncodeResult::Error(msg),
            },
            Ok(_) => EncodeResult::error("Invalid operand for a bit instruction"),
            Err(msg) => EncodeResult::Error(msg),
        }
    }

    fn encode_in(&self, line: &mut CodeLine, ctx: &dyn AssemblerContext) -> EncodeResult<Vec<u8>> {
        let tools = &self.tools;
        let mut reg = OperandType::A;
        if tools.get_reg8(line, &mut reg, REGS_STD8) != OperandError::Ok {
            return EncodeResult::error("IN needs a destination register");
        }
        if self.expect_comma(line).is_err() {
            return EncodeResult::error("Missing comma between operands");
        }
        if tools.get_ind_c(line) == OperandError::Ok {
            return EncodeResult::Ok(vec![0xED, 0x40 | (subcode(reg) << 3)]);
        }
        let mut value = 0;
        match tools.get_ind16(line, &mut value, ctx) {
            OperandError::Ok if reg == OperandType::A => {
                if !(0..=255).contains(&value) {
                    return EncodeResult::error(format!("Port {value} out of range"));
                }
                EncodeResult::Ok(vec![0xDB, value as u8])
            }
            OperandError::Ok => EncodeResult::error("Only IN A,(n) takes a port number"),
            OperandError::Unsolved => EncodeResult::error("Unresolved expression"),
            _ => EncodeResult::error("IN needs (C) or (n)"),
        }
    }

    fn encode_out(&self, line: &mut CodeLine, ctx: &dyn AssemblerContext) -> EncodeResult<Vec<u8>> {
        let tools = &self.tools;
        let mut reg = OperandType::A;
        if tools.get_ind_c(line) == OperandError::Ok {
            if self.expect_comma(line).is_err() {
                return EncodeResult::error("Missing comma between operands");
            }
            if tools.get_reg8(line, &mut reg, REGS_STD8) != OperandError::Ok {
                return EncodeResult::error("OUT (C) needs a source register");
            }
            return EncodeResult::Ok(vec![0xED, 0x41 | (subcode(reg) << 3)]);
        }
        let mut value = 0;
        match tools.get_ind16(line, &mut value, ctx) {
            OperandError::Ok => {
                if !(0..=255).contains(&value) {
                    return EncodeResult::error(format!("Port {value} out of range"));
                }
                if self.expect_comma(line).is_err() {
                    return EncodeResult::error("Missing comma between operands");
                }
                match self.expect_reg_a(line, vec![0xD3, value as u8]) {
                    Ok(bytes) => EncodeResult::Ok(bytes),
                    Err(msg) => EncodeResult::Error(msg),
                }
            }
            OperandError::Unsolved => EncodeResult::error("Unresolved expression"),
            _ => EncodeResult::error("OUT needs (C) or (n)"),
        }
    }

    fn encode_ex(&self, line: &mut CodeLine) -> EncodeResult<Vec<u8>> {
        let tools = &self.tools;
        let mut reg = OperandType::A;

        if tools.get_ind_sp(line) == OperandError::Ok {
            if self.expect_comma(line).is_err() {
                return EncodeResult::error("Missing comma between operands");
            }
            if tools.get_reg16(line, &mut reg, REGS_HL_IX_IY) != OperandError::Ok {
                return EncodeResult::error("EX (SP) pairs with HL, IX or IY");
            }
            let p = prefix(reg);
            return if p != 0 {
                EncodeResult::Ok(vec![p, 0xE3])
            } else {
                EncodeResult::Ok(vec![0xE3])
            };
        }

        if tools.get_reg16(line, &mut reg, operand_bit(OperandType::De)) == OperandError::Ok {
            if self.expect_comma(line).is_err() {
                return EncodeResult::error("Missing comma between operands");
            }
            if tools.get_reg16(line, &mut reg, operand_bit(OperandType::Hl)) != OperandError::Ok {
                return EncodeResult::error("EX DE pairs with HL");
            }
            return EncodeResult::Ok(vec![0xEB]);
        }

        if tools.get_reg16(line, &mut reg, operand_bit(OperandType::Af)) == OperandError::Ok {
            if self.expect_comma(line).is_err() {
                return EncodeResult::error("Missing comma between operands");
            }
            if tools.get_reg16(line, &mut reg, operand_bit(OperandType::AfShadow))
                != OperandError::Ok
            {
                return EncodeResult::error("EX AF pairs with AF'");
            }
            return EncodeResult::Ok(vec![0x08]);
        }

        EncodeResult::error("Invalid EX operands")
    }
}

#[cfg(test)]
mod tests {
    use super::{EncodeResult, Z80Handler};
    use crate::core::codeline::CodeLine;
    use crate::core::eval::AssemblerContext;
    use crate::core::tokenizer::tokenize;
    use std::collections::HashMap;

    struct TestCtx {
        symbols: HashMap<String, i32>,
        address: u16,
        first_pass: bool,
    }

    impl Default for TestCtx {
        fn default() -> Self {
            Self {
                symbols: HashMap::new(),
                address: 0,
                first_pass: false,
            }
        }
    }

    impl AssemblerContext for TestCtx {
        fn lookup_symbol(&self, name: &str) -> Option<i32> {
            self.symbols.get(name).copied()
        }

        fn current_address(&self) -> u16 {
            self.address
        }

        fn is_first_pass(&self) -> bool {
            self.first_pass
        }
    }

    fn encode(source: &str) -> Vec<u8> {
        encode_with(source, &TestCtx::default())
    }

    fn encode_with(source: &str, ctx: &TestCtx) -> Vec<u8> {
        let handler = Z80Handler::new();
        let mut line = CodeLine::new(tokenize(source).unwrap());
        let mut mnemonic = String::new();
        if let Some(token) = line.current() {
            mnemonic = token.source.clone();
            line.curtoken += 1;
        }
        match handler.encode(&mut line, &mnemonic, ctx) {
            EncodeResult::Ok(bytes) => {
                assert!(line.exhausted(), "leftover tokens in '{source}'");
                bytes
            }
            EncodeResult::NotFound => panic!("mnemonic not found for '{source}'"),
            EncodeResult::Error(msg) => panic!("encode failed for '{source}': {msg}"),
        }
    }

    fn encode_err(source: &str) -> String {
        let handler = Z80Handler::new();
        let ctx = TestCtx::default();
        let mut line = CodeLine::new(tokenize(source).unwrap());
        let mnemonic = line.current().unwrap().source.clone();
        line.curtoken += 1;
        match handler.encode(&mut line, &mnemonic, &ctx) {
            EncodeResult::Error(msg) => msg,
            other => panic!("expected an error for '{source}', got {other:?}"),
        }
    }

    #[test]
    fn encodes_simple_instructions() {
        assert_eq!(encode("NOP"), vec![0x00]);
        assert_eq!(encode("HALT"), vec![0x76]);
        assert_eq!(encode("EXX"), vec![0xD9]);
        assert_eq!(encode("LDIR"), vec![0xED, 0xB0]);
        assert_eq!(encode("NEG"), vec![0xED, 0x44]);
    }

    #[test]
    fn encodes_ld_register_forms() {
        assert_eq!(encode("LD A,B"), vec![0x78]);
        assert_eq!(encode("LD B,C"), vec![0x41]);
        assert_eq!(encode("LD A,5"), vec![0x3E, 0x05]);
        assert_eq!(encode("LD (HL),A"), vec![0x77]);
        assert_eq!(encode("LD A,(HL)"), vec![0x7E]);
        assert_eq!(encode("LD (HL),42"), vec![0x36, 42]);
    }

    #[test]
    fn encodes_ld_undocumented_halves() {
        assert_eq!(encode("LD IXH,7"), vec![0xDD, 0x26, 0x07]);
        assert_eq!(encode("LD A,IXH"), vec![0xDD, 0x7C]);
        assert_eq!(encode("LD IYL,B"), vec![0xFD, 0x68]);
    }

    #[test]
    fn rejects_mixed_index_families() {
        assert_eq!(encode_err("LD IXH,IYL"), "Cannot mix IX and IY operands");
        assert_eq!(encode_err("LD H,IXL"), "Cannot mix H or L with index halves");
    }

    #[test]
    fn encodes_ld_indexed_forms() {
        assert_eq!(encode("LD A,(IX+5)"), vec![0xDD, 0x7E, 0x05]);
        assert_eq!(encode("LD (IY+2),B"), vec![0xFD, 0x70, 0x02]);
        assert_eq!(encode("LD (IX+1),9"), vec![0xDD, 0x36, 0x01, 0x09]);
        assert_eq!(encode("LD B,(IX+-2)"), vec![0xDD, 0x46, 0xFE]);
    }

    #[test]
    fn encodes_ld_accumulator_indirect_forms() {
        assert_eq!(encode("LD A,(BC)"), vec![0x0A]);
        assert_eq!(encode("LD A,(DE)"), vec![0x1A]);
        assert_eq!(encode("LD (BC),A"), vec![0x02]);
        assert_eq!(encode("LD (DE),A"), vec![0x12]);
        assert_eq!(encode("LD A,(0x1234)"), vec![0x3A, 0x34, 0x12]);
        assert_eq!(encode("LD (0x1234),A"), vec![0x32, 0x34, 0x12]);
    }

    #[test]
    fn encodes_ld_special_registers() {
        assert_eq!(encode("LD I,A"), vec![0xED, 0x47]);
        assert_eq!(encode("LD R,A"), vec![0xED, 0x4F]);
        assert_eq!(encode("LD A,I"), vec![0xED, 0x57]);
        assert_eq!(encode("LD A,R"), vec![0xED, 0x5F]);
    }

    #[test]
    fn encodes_ld_sixteen_bit_forms() {
        assert_eq!(encode("LD HL,0x4000"), vec![0x21, 0x00, 0x40]);
        assert_eq!(encode("LD BC,0x1234"), vec![0x01, 0x34, 0x12]);
        assert_eq!(encode("LD IX,0x8000"), vec![0xDD, 0x21, 0x00, 0x80]);
        assert_eq!(encode("LD SP,HL"), vec![0xF9]);
        assert_eq!(encode("LD SP,IX"), vec![0xDD, 0xF9]);
        assert_eq!(encode("LD HL,(0x4000)"), vec![0x2A, 0x00, 0x40]);
        assert_eq!(encode("LD (0x4000),HL"), vec![0x22, 0x00, 0x40]);
        assert_eq!(encode("LD BC,(0x4000)"), vec![0xED, 0x4B, 0x00, 0x40]);
        assert_eq!(encode("LD (0x4000),SP"), vec![0xED, 0x73, 0x00, 0x40]);
    }

    #[test]
    fn encodes_alu_forms() {
        assert_eq!(encode("ADD A,B"), vec![0x80]);
        assert_eq!(encode("ADD A,5"), vec![0xC6, 0x05]);
        assert_eq!(encode("SUB 5"), vec![0xD6, 0x05]);
        assert_eq!(encode("XOR A"), vec![0xAF]);
        assert_eq!(encode("CP (HL)"), vec![0xBE]);
        assert_eq!(encode("OR (IX+3)"), vec![0xDD, 0xB6, 0x03]);
        assert_eq!(encode("ADC A,IXL"), vec![0xDD, 0x8D]);
    }

    #[test]
    fn encodes_sixteen_bit_arithmetic() {
        assert_eq!(encode("ADD HL,BC"), vec![0x09]);
        assert_eq!(encode("ADD HL,SP"), vec![0x39]);
        assert_eq!(encode("ADD IX,DE"), vec![0xDD, 0x19]);
        assert_eq!(encode("ADC HL,DE"), vec![0xED, 0x5A]);
        assert_eq!(encode("SBC HL,BC"), vec![0xED, 0x42]);
    }

    #[test]
    fn encodes_stack_group() {
        assert_eq!(encode("PUSH BC"), vec![0xC5]);
        assert_eq!(encode("PUSH AF"), vec![0xF5]);
        assert_eq!(encode("POP HL"), vec![0xE1]);
        assert_eq!(encode("PUSH IX"), vec![0xDD, 0xE5]);
        assert_eq!(encode_err("PUSH SP"), "PUSH/POP need BC, DE, HL, AF, IX or IY");
    }

    #[test]
    fn encodes_inc_dec() {
        assert_eq!(encode("INC A"), vec![0x3C]);
        assert_eq!(encode("DEC B"), vec![0x05]);
        assert_eq!(encode("INC HL"), vec![0x23]);
        assert_eq!(encode("DEC SP"), vec![0x3B]);
        assert_eq!(encode("INC (HL)"), vec![0x34]);
        assert_eq!(encode("DEC (IX+1)"), vec![0xDD, 0x35, 0x01]);
        assert_eq!(encode("INC IX"), vec![0xDD, 0x23]);
    }

    #[test]
    fn encodes_jumps_and_calls() {
        assert_eq!(encode("JP 0x1234"), vec![0xC3, 0x34, 0x12]);
        assert_eq!(encode("JP NZ,0x1234"), vec![0xC2, 0x34, 0x12]);
        assert_eq!(encode("JP M,0x1234"), vec![0xFA, 0x34, 0x12]);
        assert_eq!(encode("JP (HL)"), vec![0xE9]);
        assert_eq!(encode("JP (IX)"), vec![0xDD, 0xE9]);
        assert_eq!(encode("CALL 0x1234"), vec![0xCD, 0x34, 0x12]);
        assert_eq!(encode("CALL Z,0x1234"), vec![0xCC, 0x34, 0x12]);
        assert_eq!(encode("RET"), vec![0xC9]);
        assert_eq!(encode("RET NC"), vec![0xD0]);
    }

    #[test]
    fn encodes_relative_branches() {
        let ctx = TestCtx {
            address: 0x100,
            ..TestCtx::default()
        };
        // disp = 0x110 - (0x100 + 2)
        assert_eq!(encode_with("JR 0x110", &ctx), vec![0x18, 0x0E]);
        assert_eq!(encode_with("JR Z,0x100", &ctx), vec![0x28, 0xFE]);
        assert_eq!(encode_with("DJNZ 0x100", &ctx), vec![0x10, 0xFE]);
        assert_eq!(encode_err("JR PO,0x100"), "Invalid condition for JR");
    }

    #[test]
    fn branch_range_is_enforced_on_pass_two() {
        let ctx = TestCtx {
            address: 0,
            ..TestCtx::default()
        };
        let handler = Z80Handler::new();
        let mut line = CodeLine::new(tokenize("JR 0x500").unwrap());
        line.curtoken = 1;
        assert!(matches!(
            handler.encode(&mut line, "JR", &ctx),
            EncodeResult::Error(_)
        ));

        // pass 1 keeps the two-byte size with a placeholder
        let ctx = TestCtx {
            address: 0,
            first_pass: true,
            ..TestCtx::default()
        };
        let mut line = CodeLine::new(tokenize("JR 0x500").unwrap());
        line.curtoken = 1;
        assert!(matches!(
            handler.encode(&mut line, "JR", &ctx),
            EncodeResult::Ok(bytes) if bytes.len() == 2
        ));
    }

    #[test]
    fn encodes_rst_and_im() {
        assert_eq!(encode("RST 0x28"), vec![0xEF]);
        assert_eq!(encode("RST 5"), vec![0xEF]);
        assert_eq!(encode("IM 1"), vec![0xED, 0x56]);
        assert!(encode_err("RST 0x29").contains("invalid"));
        assert!(encode_err("IM 3").contains("Invalid interrupt mode"));
    }

    #[test]
    fn encodes_bit_group() {
        assert_eq!(encode("BIT 7,A"), vec![0xCB, 0x7F]);
        assert_eq!(encode("BIT 0,(HL)"), vec![0xCB, 0x46]);
        assert_eq!(encode("SET 3,B"), vec![0xCB, 0xD8]);
        assert_eq!(encode("RES 1,(IX+4)"), vec![0xDD, 0xCB, 0x04, 0x8E]);
        assert_eq!(
            encode_err("BIT A,B"),
            "Bit number expected, found a register"
        );
        assert_eq!(encode_err("BIT 8,A"), "Bit number must be 0-7");
    }

    #[test]
    fn encodes_io_group() {
        assert_eq!(encode("IN A,(0x10)"), vec![0xDB, 0x10]);
        assert_eq!(encode("IN B,(C)"), vec![0xED, 0x40]);
        assert_eq!(encode("OUT (0x10),A"), vec![0xD3, 0x10]);
        assert_eq!(encode("OUT (C),E"), vec![0xED, 0x59]);
    }

    #[test]
    fn encodes_exchange_group() {
        assert_eq!(encode("EX DE,HL"), vec![0xEB]);
        assert_eq!(encode("EX AF,AF'"), vec![0x08]);
        assert_eq!(encode("EX (SP),HL"), vec![0xE3]);
        assert_eq!(encode("EX (SP),IX"), vec![0xDD, 0xE3]);
    }

    #[test]
    fn symbols_resolve_in_operands() {
        let mut ctx = TestCtx::default();
        ctx.symbols.insert("PORT".to_string(), 0x10);
        ctx.symbols.insert("TARGET".to_string(), 0x4000);
        assert_eq!(encode_with("OUT (PORT),A", &ctx), vec![0xD3, 0x10]);
        assert_eq!(encode_with("JP TARGET", &ctx), vec![0xC3, 0x00, 0x40]);
        assert_eq!(
            encode_with("LD A,(TARGET+1)", &ctx),
            vec![0x3A, 0x01, 0x40]
        );
    }

    #[test]
    fn unknown_mnemonic_is_not_found() {
        let handler = Z80Handler::new();
        let ctx = TestCtx::default();
        let mut line = CodeLine::new(tokenize("MOV A,B").unwrap());
        line.curtoken = 1;
        assert!(matches!(
            handler.encode(&mut line, "MOV", &ctx),
            EncodeResult::NotFound
        ));
    }
}
