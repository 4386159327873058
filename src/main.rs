// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for z80forge.

use std::process::ExitCode;

use z80forge::error::Diagnostic;

fn main() -> ExitCode {
    let use_color = std::env::var_os("NO_COLOR").is_none();
    match z80forge::assembler::run() {
        Ok(reports) => {
            for report in &reports {
                print_diagnostics(report.diagnostics(), report.source_lines(), use_color);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_diagnostics(err.diagnostics(), err.source_lines(), use_color);
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn print_diagnostics(diagnostics: &[Diagnostic], source_lines: &[String], use_color: bool) {
    for diag in diagnostics {
        eprintln!("{}", diag.format_with_context(Some(source_lines), use_color));
    }
}
