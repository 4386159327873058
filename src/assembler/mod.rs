// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Two-pass Z80 assembler - main entry point.
//!
//! Pass 1 walks every line to size instructions and assign label
//! addresses; forward references fold to neutral values so the byte count
//! is already final. Pass 2 re-walks the lines with the full symbol
//! table, emits bytes into the image store and writes the listing.

pub mod cli;


use std::fs::{self, File};
use std::io::{self, Write};

use clap::Parser;

use crate::core::codeline::CodeLine;
use crate::core::error::{
    AsmError, AsmErrorKind, AsmRunError, AsmRunReport, Diagnostic, LineStatus, PassCounts,
    Severity,
};
use crate::core::eval::{AssemblerContext, EvalStop};
use crate::core::imagestore::ImageStore;
use crate::core::listing::{ListingLine, ListingWriter};
use crate::core::symbol_table::{SymbolTable, SymbolTableResult};
use crate::core::tokenizer::{parse_number, tokenize, TokenKind};
use crate::z80::handler::{EncodeResult, Z80Handler};
use crate::z80::is_register;
use crate::z80::operands::OperandError;

use cli::{
    input_base_from_path, resolve_bin_path, resolve_output_path, validate_cli, Cli, CliConfig,
};

pub use cli::VERSION;

/// Run the assembler with command-line arguments.
pub fn run() -> Result<Vec<AsmRunReport>, AsmRunError> {
    let cli = Cli::parse();
    let config = validate_cli(&cli)?;

    let mut reports = Vec::new();
    for asm_path in &cli.infiles {
        let (asm_name, input_base) = input_base_from_path(asm_path)?;
        let out_base = if let Some(dir) = &config.out_dir {
            dir.join(&input_base).to_string_lossy().to_string()
        } else {
            cli.outfile.as_deref().unwrap_or(&input_base).to_string()
        };
        let report = run_one(&cli, &asm_name, &out_base, &config)?;
        reports.push(report);
    }

    Ok(reports)
}

fn io_error(msg: &str, param: Option<&str>) -> AsmError {
    AsmError::new(AsmErrorKind::Io, msg, param)
}

fn run_one(
    cli: &Cli,
    asm_name: &str,
    out_base: &str,
    config: &CliConfig,
) -> Result<AsmRunReport, AsmRunError> {
    let list_path = resolve_output_path(out_base, cli.list_name.clone(), "lst");
    let hex_path = resolve_output_path(out_base, cli.hex_name.clone(), "hex");

    let contents = fs::read_to_string(asm_name).map_err(|err| {
        AsmRunError::new(
            io_error(&err.to_string(), Some(asm_name)),
            Vec::new(),
            Vec::new(),
        )
    })?;
    let src_lines: Vec<String> = contents.lines().map(str::to_string).collect();

    let mut assembler = Assembler::new();
    for def in &cli.defines {
        if let Some((name, value)) = def.split_once('=') {
            assembler.define(name, parse_number(value).unwrap_or(0) as u32);
        } else {
            assembler.define(def, 1);
        }
    }

    let pass1 = assembler.pass1(&src_lines);
    if pass1.errors > 0 {
        return Err(AsmRunError::new(
            AsmError::new(
                AsmErrorKind::Assembler,
                "Errors detected in source. No output created.",
                None,
            ),
            assembler.take_diagnostics(),
            src_lines,
        ));
    }

    let mut list_output: Box<dyn Write> = if let Some(path) = &list_path {
        Box::new(File::create(path).map_err(|_| {
            AsmRunError::new(
                io_error("Error opening file for write", Some(path)),
                Vec::new(),
                src_lines.clone(),
            )
        })?)
    } else {
        Box::new(io::sink())
    };
    let mut listing = ListingWriter::new(&mut *list_output);
    let run_err = |assembler: &mut Assembler, lines: &[String], err: &dyn std::fmt::Display| {
        AsmRunError::new(
            io_error(&err.to_string(), None),
            assembler.take_diagnostics(),
            lines.to_vec(),
        )
    };
    listing
        .header(&format!("z80forge Z80 Assembler v{VERSION}"))
        .map_err(|err| run_err(&mut assembler, &src_lines, &err))?;
    let pass2 = assembler
        .pass2(&src_lines, &mut listing)
        .map_err(|err| run_err(&mut assembler, &src_lines, &err))?;
    listing
        .footer(&pass2, assembler.symbols(), assembler.image().num_entries())
        .map_err(|err| run_err(&mut assembler, &src_lines, &err))?;

    if pass2.errors > 0 {
        return Err(AsmRunError::new(
            AsmError::new(
                AsmErrorKind::Assembler,
                "Errors detected in source. No output created.",
                None,
            ),
            assembler.take_diagnostics(),
            src_lines,
        ));
    }

    if let Some(hex_path) = &hex_path {
        let mut hex_file = File::create(hex_path).map_err(|_| {
            AsmRunError::new(
                io_error("Error opening file for write", Some(hex_path)),
                assembler.take_diagnostics(),
                src_lines.clone(),
            )
        })?;
        assembler
            .image()
            .write_hex_file(&mut hex_file, config.go_addr.as_deref())
            .map_err(|err| run_err(&mut assembler, &src_lines, &err))?;
    }

    let bin_count = config.bin_specs.len();
    for spec in &config.bin_specs {
        let bin_name = resolve_bin_path(out_base, spec.name.as_deref(), &spec.range, bin_count);
        let mut bin_file = File::create(&bin_name).map_err(|_| {
            AsmRunError::new(
                io_error("Error opening file for write", Some(&bin_name)),
                assembler.take_diagnostics(),
                src_lines.clone(),
            )
        })?;
        assembler
            .image()
            .write_bin_file(&mut bin_file, spec.range.start, spec.range.end, config.fill_byte)
            .map_err(|err| run_err(&mut assembler, &src_lines, &err))?;
    }

    Ok(AsmRunReport::new(assembler.take_diagnostics(), src_lines))
}

/// Pass-local view handed to the evaluator and the operand gate.
struct PassContext<'a> {
    symbols: &'a SymbolTable,
    address: u16,
    first_pass: bool,
}

impl AssemblerContext for PassContext<'_> {
    fn lookup_symbol(&self, name: &str) -> Option<i32> {
        self.symbols.lookup(name).map(|v| v as i32)
    }

    fn current_address(&self) -> u16 {
        self.address
    }

    fn is_first_pass(&self) -> bool {
        self.first_pass
    }
}

/// One open IF block.
struct CondFrame {
    /// Lines in the current branch are assembled.
    active: bool,
    /// A branch of this block already assembled; ELSE must stay off.
    taken: bool,
    seen_else: bool,
}

/// Result of processing one source line.
struct LineOutcome {
    status: LineStatus,
    addr: u16,
    bytes: Vec<u8>,
    aux: u16,
}

impl LineOutcome {
    fn new(status: LineStatus, addr: u16) -> Self {
        Self {
            status,
            addr,
            bytes: Vec::new(),
            aux: 0,
        }
    }
}

/// The two-pass assembler state.
pub struct Assembler {
    symbols: SymbolTable,
    image: ImageStore,
    diagnostics: Vec<Diagnostic>,
    handler: Z80Handler,
    cond_stack: Vec<CondFrame>,
    address: u16,
    first_pass: bool,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            image: ImageStore::new(),
            diagnostics: Vec::new(),
            handler: Z80Handler::new(),
            cond_stack: Vec::new(),
            address: 0,
            first_pass: true,
        }
    }

    /// Predefine a redefinable symbol (command-line `-D`).
    pub fn define(&mut self, name: &str, value: u32) {
        let _ = self.symbols.add(name, value, true);
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn image(&self) -> &ImageStore {
        &self.image
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Sizing pass: assign labels, no byte output.
    pub fn pass1(&mut self, lines: &[String]) -> PassCounts {
        self.first_pass = true;
        self.address = 0;
        self.cond_stack.clear();
        let mut counts = PassCounts::new();
        for (idx, source) in lines.iter().enumerate() {
            counts.lines += 1;
            let outcome = self.process_line(source, idx as u32 + 1);
            if outcome.status == LineStatus::Error {
                counts.errors += 1;
            }
        }
        if !self.cond_stack.is_empty() {
            let _ = self.report_error(
                counts.lines,
                AsmErrorKind::Conditional,
                "Unterminated IF block",
                None,
            );
            counts.errors += 1;
        }
        counts
    }

    /// Emitting pass: encode bytes, write the listing.
    pub fn pass2<W: Write>(
        &mut self,
        lines: &[String],
        listing: &mut ListingWriter<W>,
    ) -> io::Result<PassCounts> {
        self.first_pass = false;
        self.address = 0;
        self.cond_stack.clear();
        let mut counts = PassCounts::new();
        for (idx, source) in lines.iter().enumerate() {
            let line_num = idx as u32 + 1;
            counts.lines += 1;
            let outcome = self.process_line(source, line_num);
            listing.write_line(ListingLine {
                addr: outcome.addr,
                bytes: &outcome.bytes,
                status: outcome.status,
                aux: outcome.aux,
                line_num,
                source,
            })?;
            if outcome.status == LineStatus::Error {
                counts.errors += 1;
                if let Some(diag) = self.diagnostics.last() {
                    listing.write_diagnostic(
                        "ERROR",
                        diag.format().as_str(),
                        line_num,
                        None,
                        lines,
                    )?;
                }
            }
        }
        if !self.cond_stack.is_empty() {
            let _ = self.report_error(
                counts.lines,
                AsmErrorKind::Conditional,
                "Unterminated IF block",
                None,
            );
            counts.errors += 1;
        }
        Ok(counts)
    }

    fn report_error(
        &mut self,
        line_num: u32,
        kind: AsmErrorKind,
        msg: &str,
        param: Option<&str>,
    ) -> LineStatus {
        self.diagnostics.push(Diagnostic::new(
            line_num,
            Severity::Error,
            AsmError::new(kind, msg, param),
        ));
        LineStatus::Error
    }

    fn skipping(&self) -> bool {
        self.cond_stack.iter().any(|frame| !frame.active)
    }

    fn pass_ctx(&self, address: u16) -> PassContext<'_> {
        PassContext {
            symbols: &self.symbols,
            address,
            first_pass: self.first_pass,
        }
    }

    fn process_line(&mut self, source: &str, line_num: u32) -> LineOutcome {
        let addr = self.address;
        let tokens = match tokenize(source) {
            Ok(tokens) => tokens,
            Err(err) => {
                let status =
                    self.report_error(line_num, AsmErrorKind::Tokenizer, &err.message, None);
                return LineOutcome::new(status, addr);
            }
        };
        if tokens.is_empty() {
            return LineOutcome::new(LineStatus::NothingDone, addr);
        }
        let mut line = CodeLine::new(tokens);

        // conditional directives act even inside a skipped branch
        if let Some(directive) = leading_word(&line, &["IF", "ELSE", "ENDIF"]) {
            line.curtoken = 1;
            return self.process_conditional(&directive, line, line_num, addr);
        }
        if self.skipping() {
            return LineOutcome::new(LineStatus::Skip, addr);
        }

        // NAME EQU expr
        if line.tokens.len() >= 2
            && line.tokens[0].kind == TokenKind::Letters
            && line.tokens[1].kind == TokenKind::Letters
            && line.tokens[1].source.eq_ignore_ascii_case("EQU")
        {
            return self.process_equ(line, line_num, addr);
        }

        // NAME: label definition
        if line.tokens.len() >= 2
            && line.tokens[0].kind == TokenKind::Letters
            && line.tokens[1].kind == TokenKind::Colon
        {
            let name = line.tokens[0].source.clone();
            if let Err(status) = self.define_label(&name, addr, line_num) {
                return LineOutcome::new(status, addr);
            }
            line.curtoken = 2;
        }

        let Some(token) = line.current() else {
            // label-only line
            return LineOutcome::new(LineStatus::Ok, addr);
        };
        if token.kind != TokenKind::Letters {
            let status = self.report_error(
                line_num,
                AsmErrorKind::Assembler,
                "Mnemonic expected",
                Some(&token.source),
            );
            return LineOutcome::new(status, addr);
        }
        let mnemonic = token.source.clone();
        line.curtoken += 1;

        match mnemonic.to_ascii_uppercase().as_str() {
            "ORG" => self.process_org(line, line_num),
            "DB" | "DEFB" => self.process_db(line, line_num, addr),
            "DW" | "DEFW" => self.process_dw(line, line_num, addr),
            "DS" | "DEFS" => self.process_ds(line, line_num, addr),
            "EQU" => {
                let status = self.report_error(
                    line_num,
                    AsmErrorKind::Directive,
                    "EQU needs a name in front",
                    None,
                );
                LineOutcome::new(status, addr)
            }
            _ => self.process_instruction(line, &mnemonic, line_num, addr),
        }
    }

    fn process_conditional(
        &mut self,
        directive: &str,
        mut line: CodeLine,
        line_num: u32,
        addr: u16,
    ) -> LineOutcome {
        match directive {
            "IF" => {
                if self.skipping() {
                    // nested inside a dead branch: never activates
                    self.cond_stack.push(CondFrame {
                        active: false,
                        taken: true,
                        seen_else: false,
                    });
                    return LineOutcome::new(LineStatus::Skip, addr);
                }
                let ctx = self.pass_ctx(addr);
                let eval = self.handler.tools().bool_evaluator().evaluate(
                    &line.tokens,
                    line.curtoken,
                    EvalStop::Auto,
                    &ctx,
                );
                line.curtoken = eval.next;
                let unsolved = eval.token.unsolved;
                let malformed = eval.token.kind == TokenKind::Unknown || !line.exhausted();
                let value = eval.token.as_number();
                if unsolved {
                    let status = self.report_error(
                        line_num,
                        AsmErrorKind::Conditional,
                        "IF needs a value known on both passes",
                        None,
                    );
                    return LineOutcome::new(status, addr);
                }
                if malformed {
                    let status = self.report_error(
                        line_num,
                        AsmErrorKind::Conditional,
                        "Invalid IF expression",
                        None,
                    );
                    return LineOutcome::new(status, addr);
                }
                self.cond_stack.push(CondFrame {
                    active: value != 0,
                    taken: value != 0,
                    seen_else: false,
                });
                LineOutcome::new(LineStatus::NothingDone, addr)
            }
            "ELSE" => {
                let Some(frame) = self.cond_stack.last_mut() else {
                    let status = self.report_error(
                        line_num,
                        AsmErrorKind::Conditional,
                        "ELSE without IF",
                        None,
                    );
                    return LineOutcome::new(status, addr);
                };
                if frame.seen_else {
                    let status = self.report_error(
                        line_num,
                        AsmErrorKind::Conditional,
                        "Duplicate ELSE",
                        None,
                    );
                    return LineOutcome::new(status, addr);
                }
                frame.seen_else = true;
                frame.active = !frame.taken;
                frame.taken = true;
                LineOutcome::new(LineStatus::NothingDone, addr)
            }
            _ => {
                if self.cond_stack.pop().is_none() {
                    let status = self.report_error(
                        line_num,
                        AsmErrorKind::Conditional,
                        "ENDIF without IF",
                        None,
                    );
                    return LineOutcome::new(status, addr);
                }
                LineOutcome::new(LineStatus::NothingDone, addr)
            }
        }
    }

    fn define_label(&mut self, name: &str, addr: u16, line_num: u32) -> Result<(), LineStatus> {
        if is_register(name) {
            return Err(self.report_error(
                line_num,
                AsmErrorKind::Symbol,
                "Register name cannot be a label",
                Some(name),
            ));
        }
        let result = if self.first_pass {
            self.symbols.add(name, addr as u32, false)
        } else {
            match self.symbols.update(name, addr as u32) {
                SymbolTableResult::NotFound => self.symbols.add(name, addr as u32, false),
                other => other,
            }
        };
        match result {
            SymbolTableResult::Ok => Ok(()),
            SymbolTableResult::Duplicate => Err(self.report_error(
                line_num,
                AsmErrorKind::Symbol,
                "Duplicate label",
                Some(name),
            )),
            _ => Err(self.report_error(
                line_num,
                AsmErrorKind::Symbol,
                "Symbol table full",
                Some(name),
            )),
        }
    }

    fn process_equ(&mut self, mut line: CodeLine, line_num: u32, addr: u16) -> LineOutcome {
        let name = line.tokens[0].source.clone();
        if is_register(&name) {
            let status = self.report_error(
                line_num,
                AsmErrorKind::Symbol,
                "Register name cannot be a symbol",
                Some(&name),
            );
            return LineOutcome::new(status, addr);
        }
        line.curtoken = 2;
        let mut value = 0;
        let result = {
            let ctx = self.pass_ctx(addr);
            self.handler.tools().get_num16(&mut line, &mut value, &ctx)
        };
        match result {
            OperandError::Ok => {}
            OperandError::Unsolved => {
                let status = self.report_error(
                    line_num,
                    AsmErrorKind::Expression,
                    "Unresolved expression",
                    Some(&name),
                );
                return LineOutcome::new(status, addr);
            }
            _ => {
                let status = self.report_error(
                    line_num,
                    AsmErrorKind::Directive,
                    "Invalid EQU expression",
                    Some(&name),
                );
                return LineOutcome::new(status, addr);
            }
        }
        if !line.exhausted() {
            let status = self.report_error(
                line_num,
                AsmErrorKind::Directive,
                "Extra characters after expression",
                None,
            );
            return LineOutcome::new(status, addr);
        }

        let result = if self.first_pass {
            self.symbols.add(&name, value as u32, false)
        } else {
            self.symbols.update(&name, value as u32)
        };
        if result == SymbolTableResult::Duplicate {
            let status =
                self.report_error(line_num, AsmErrorKind::Symbol, "Duplicate symbol", Some(&name));
            return LineOutcome::new(status, addr);
        }
        let mut outcome = LineOutcome::new(LineStatus::DirEqu, addr);
        outcome.aux = value as u16;
        outcome
    }

    fn process_org(&mut self, mut line: CodeLine, line_num: u32) -> LineOutcome {
        // the location counter must be known immediately, even on pass 1,
        // so this bypasses the gate's neutral-value rewrite
        let (value, unsolved, numeric) = {
            let ctx = self.pass_ctx(self.address);
            let eval = self.handler.tools().number_evaluator().evaluate(
                &line.tokens,
                line.curtoken,
                EvalStop::Auto,
                &ctx,
            );
            line.curtoken = eval.next;
            (eval.token.as_number(), eval.token.unsolved, eval.is_numeric())
        };
        if unsolved {
            let status = self.report_error(
                line_num,
                AsmErrorKind::Directive,
                "ORG address must be known on pass 1",
                None,
            );
            return LineOutcome::new(status, self.address);
        }
        if !numeric || !line.exhausted() || !(0..=0xffff).contains(&value) {
            let status = self.report_error(
                line_num,
                AsmErrorKind::Directive,
                "Invalid ORG address",
                None,
            );
            return LineOutcome::new(status, self.address);
        }
        self.address = value as u16;
        LineOutcome::new(LineStatus::Ok, self.address)
    }

    fn process_db(&mut self, mut line: CodeLine, line_num: u32, addr: u16) -> LineOutcome {
        let mut bytes = Vec::new();
        let mut failure: Option<(AsmErrorKind, String)> = None;
        {
            let ctx = PassContext {
                symbols: &self.symbols,
                address: addr,
                first_pass: self.first_pass,
            };
            loop {
                let eval = self.handler.tools().string_evaluator().evaluate(
                    &line.tokens,
                    line.curtoken,
                    EvalStop::Auto,
                    &ctx,
                );
                if eval.token.kind == TokenKind::String {
                    bytes.extend_from_slice(eval.token.source.as_bytes());
                    line.curtoken = eval.next;
                } else if eval.token.unsolved {
                    if !ctx.first_pass {
                        failure = Some((
                            AsmErrorKind::Expression,
                            "Unresolved expression".to_string(),
                        ));
                        break;
                    }
                    bytes.push(0);
                    line.curtoken = eval.next;
                } else if eval.token.kind.is_numeric() {
                    let value = eval.token.as_number();
                    if !(-128..=255).contains(&value) {
                        failure = Some((
                            AsmErrorKind::Directive,
                            format!("Value {value} too big for a byte"),
                        ));
                        break;
                    }
                    bytes.push(value as u8);
                    line.curtoken = eval.next;
                } else {
                    failure = Some((AsmErrorKind::Directive, "Invalid DB operand".to_string()));
                    break;
                }
                if !line.accept(TokenKind::Comma) {
                    break;
                }
            }
        }
        if failure.is_none() && !line.exhausted() {
            failure = Some((
                AsmErrorKind::Directive,
                "Extra characters after operands".to_string(),
            ));
        }
        if let Some((kind, msg)) = failure {
            let status = self.report_error(line_num, kind, &msg, None);
            return LineOutcome::new(status, addr);
        }
        self.commit_bytes(addr, bytes)
    }

    fn process_dw(&mut self, mut line: CodeLine, line_num: u32, addr: u16) -> LineOutcome {
        let mut bytes = Vec::new();
        let mut failure: Option<String> = None;
        loop {
            let mut value = 0;
            let result = {
                let ctx = self.pass_ctx(addr);
                self.handler.tools().get_num16(&mut line, &mut value, &ctx)
            };
            match result {
                OperandError::Ok => bytes.extend_from_slice(&(value as u16).to_le_bytes()),
                OperandError::Unsolved => {
                    failure = Some("Unresolved expression".to_string());
                    break;
                }
                _ => {
                    failure = Some("Invalid DW operand".to_string());
                    break;
                }
            }
            if !line.accept(TokenKind::Comma) {
                break;
            }
        }
        if failure.is_none() && !line.exhausted() {
            failure = Some("Extra characters after operands".to_string());
        }
        if let Some(msg) = failure {
            let status = self.report_error(line_num, AsmErrorKind::Directive, &msg, None);
            return LineOutcome::new(status, addr);
        }
        self.commit_bytes(addr, bytes)
    }

    fn process_ds(&mut self, mut line: CodeLine, line_num: u32, addr: u16) -> LineOutcome {
        let mut value = 0;
        let result = {
            let ctx = self.pass_ctx(addr);
            self.handler.tools().get_num16(&mut line, &mut value, &ctx)
        };
        if result != OperandError::Ok || !line.exhausted() || value < 0 {
            let status =
                self.report_error(line_num, AsmErrorKind::Directive, "Invalid DS size", None);
            return LineOutcome::new(status, addr);
        }
        self.address = self.address.wrapping_add(value as u16);
        let mut outcome = LineOutcome::new(LineStatus::DirDs, addr);
        outcome.aux = value as u16;
        outcome
    }

    fn process_instruction(
        &mut self,
        mut line: CodeLine,
        mnemonic: &str,
        line_num: u32,
        addr: u16,
    ) -> LineOutcome {
        let result = {
            let ctx = PassContext {
                symbols: &self.symbols,
                address: addr,
                first_pass: self.first_pass,
            };
            self.handler.encode(&mut line, mnemonic, &ctx)
        };
        match result {
            EncodeResult::Ok(bytes) => {
                if !line.exhausted() {
                    let status = self.report_error(
                        line_num,
                        AsmErrorKind::Instruction,
                        "Extra characters after operands",
                        None,
                    );
                    return LineOutcome::new(status, addr);
                }
                self.commit_bytes(addr, bytes)
            }
            EncodeResult::NotFound => {
                let status = self.report_error(
                    line_num,
                    AsmErrorKind::Instruction,
                    "Unknown mnemonic",
                    Some(mnemonic),
                );
                LineOutcome::new(status, addr)
            }
            EncodeResult::Error(msg) => {
                let status =
                    self.report_error(line_num, AsmErrorKind::Instruction, &msg, Some(mnemonic));
                LineOutcome::new(status, addr)
            }
        }
    }

    fn commit_bytes(&mut self, addr: u16, bytes: Vec<u8>) -> LineOutcome {
        self.address = addr.wrapping_add(bytes.len() as u16);
        if !self.first_pass {
            self.image.store_slice(addr, &bytes);
        }
        let mut outcome = LineOutcome::new(LineStatus::Ok, addr);
        outcome.bytes = bytes;
        outcome
    }
}

/// First token's upper-cased text when it is one of the given words.
fn leading_word(line: &CodeLine, words: &[&str]) -> Option<String> {
    let token = line.tokens.first()?;
    if token.kind != TokenKind::Letters {
        return None;
    }
    let upper = token.source.to_ascii_uppercase();
    words.contains(&upper.as_str()).then_some(upper)
}
