// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Listing file generation.

use std::io::Write;

use crate::core::error::{build_context_lines, LineStatus, PassCounts};
use crate::core::symbol_table::SymbolTable;

/// Data for a single listing line.
pub struct ListingLine<'a> {
    pub addr: u16,
    pub bytes: &'a [u8],
    pub status: LineStatus,
    /// EQU value or DS size, depending on `status`.
    pub aux: u16,
    pub line_num: u32,
    pub source: &'a str,
}

/// Writer for listing file output.
pub struct ListingWriter<W: Write> {
    out: W,
}

impl<W: Write> ListingWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn header(&mut self, title: &str) -> std::io::Result<()> {
        writeln!(self.out, "{title}")?;
        writeln!(self.out, "ADDR    BYTES                    LINE  SOURCE")?;
        writeln!(self.out, "------  -----------------------  ----  ------")?;
        Ok(())
    }

    pub fn write_line(&mut self, line: ListingLine<'_>) -> std::io::Result<()> {
        let (loc, bytes_col) = match line.status {
            LineStatus::DirEqu => (String::new(), format!("EQU {:04X}", line.aux)),
            LineStatus::DirDs => (format!("{:04X}", line.addr), format!("+{:04X}", line.aux)),
            _ => {
                if line.bytes.is_empty() {
                    (String::new(), String::new())
                } else {
                    (format!("{:04X}", line.addr), format_bytes(line.bytes))
                }
            }
        };

        let loc = if loc.is_empty() {
            "----".to_string()
        } else {
            loc
        };
        writeln!(
            self.out,
            "{:<6}  {:<23}  {:>4}  {}",
            loc, bytes_col, line.line_num, line.source
        )
    }

    pub fn write_diagnostic(
        &mut self,
        kind: &str,
        msg: &str,
        line_num: u32,
        column: Option<usize>,
        source_lines: &[String],
    ) -> std::io::Result<()> {
        for line in build_context_lines(line_num, column, Some(source_lines), true) {
            writeln!(self.out, "{line}")?;
        }
        writeln!(self.out, "{kind}: {msg}")
    }

    pub fn footer(
        &mut self,
        counts: &PassCounts,
        symbols: &SymbolTable,
        total_mem: usize,
    ) -> std::io::Result<()> {
        writeln!(
            self.out,
            "\nLines: {}  Errors: {}  Warnings: {}",
            counts.lines, counts.errors, counts.warnings
        )?;
        writeln!(self.out, "\nSYMBOL TABLE\n")?;
        symbols.dump(&mut self.out)?;
        writeln!(self.out, "\nTotal memory is {} bytes", total_mem)?;
        Ok(())
    }
}

/// Format bytes as hex string for listing.
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{format_bytes, ListingLine, ListingWriter};
    use crate::core::error::LineStatus;

    #[test]
    fn formats_byte_column() {
        assert_eq!(format_bytes(&[0x3e, 0x05]), "3E 05");
        assert_eq!(format_bytes(&[]), "");
    }

    #[test]
    fn writes_code_line_with_address() {
        let mut out = Vec::new();
        let mut listing = ListingWriter::new(&mut out);
        listing
            .write_line(ListingLine {
                addr: 0x0100,
                bytes: &[0x3e, 0x05],
                status: LineStatus::Ok,
                aux: 0,
                line_num: 3,
                source: "        LD A,5",
            })
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("0100    3E 05"));
        assert!(text.contains("LD A,5"));
    }

    #[test]
    fn equ_lines_show_value_without_address() {
        let mut out = Vec::new();
        let mut listing = ListingWriter::new(&mut out);
        listing
            .write_line(ListingLine {
                addr: 0,
                bytes: &[],
                status: LineStatus::DirEqu,
                aux: 0x1234,
                line_num: 1,
                source: "VALUE EQU 1234h",
            })
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("----    EQU 1234"));
    }
}
