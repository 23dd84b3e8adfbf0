//! Textual front-end for the program builder.
//!
//! Parses line-oriented assembly into a [`Program`] and hands it to the
//! two-pass [`assembler`](crate::virtual_machine::assembler).
//!
//! # Syntax
//!
//! ```text
//! # comment
//! main:                  # opens a procedure
//!     set 100, A
//!     dis A              # commas between operands are optional
//!     fmt hello
//!     halt
//! [ data ]
//! hello: "Hello, world!"
//! answer: 42
//! ```
//!
//! - `name:` opens a procedure; an instruction may follow on the same line
//! - Mnemonics are case-insensitive, register names (`PC SP R A B C`) are not
//! - Operands are decimal integers, register names or label identifiers
//! - `[ data ]` switches to the data section, `[ code ]` switches back
//! - Data entries are `name: value` where value is an integer or a
//!   double-quoted string
//! - Comments start with `#`

use crate::error;
use crate::virtual_machine::assembler;
use crate::virtual_machine::builder::ProgramBuilder;
use crate::virtual_machine::cell::Value;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instruction, Opcode};
use crate::virtual_machine::operand::{Operand, is_identifier};
use crate::virtual_machine::program::{AssembledProgram, Program};
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = '#';
const LABEL_SUFFIX: char = ':';
const SECTION_CODE: &str = "[ code ]";
const SECTION_DATA: &str = "[ data ]";

/// Return the line/column/message triple for errors that carry a location.
fn assembly_error_location(err: &VMError) -> Option<(usize, usize, String)> {
    match err {
        VMError::AssemblyError {
            line,
            offset,
            source,
        } => Some((*line, *offset, source.clone())),
        VMError::ParseError {
            line,
            offset,
            message,
        } => Some((*line, *offset, message.to_string())),
        _ => None,
    }
}

/// Formats a compiler-style diagnostic.
pub(crate) fn render_assembly_diagnostic(
    file: &str,
    source: &str,
    line: usize,
    offset: usize,
    message: &str,
) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{offset}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(offset.saturating_sub(1));
        let _ = writeln!(diag, "     |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = write!(diag, "     | {}^", underline);
    }

    diag
}

fn log_assembly_error(file: &str, source: &str, err: &VMError) {
    if let Some((line, offset, message)) = assembly_error_location(err) {
        error!(
            "{}",
            render_assembly_diagnostic(file, source, line, offset, &message)
        );
    } else {
        error!("{file}: {err}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Code,
    Data,
}

#[derive(Debug, Clone)]
struct Token<'a> {
    text: &'a str,
    /// 1-based column in the line.
    offset: usize,
}

/// Tokenize a single line.
///
/// `#` starts a comment, commas and whitespace separate tokens, and a
/// double-quoted string is one token.
fn tokenize(line_no: usize, line: &str) -> Result<Vec<Token<'_>>, VMError> {
    let mut out = Vec::with_capacity(4);
    // Byte index and 1-based character column of the token being read.
    let mut start: Option<(usize, usize)> = None;
    let mut in_str = false;

    for (col, (i, c)) in line.char_indices().enumerate() {
        match c {
            '"' => {
                start.get_or_insert((i, col + 1));
                in_str = !in_str;
            }
            COMMENT_CHAR if !in_str => {
                if let Some((s, offset)) = start.take() {
                    out.push(Token {
                        text: &line[s..i],
                        offset,
                    });
                }
                return Ok(out);
            }
            ',' | ' ' | '\t' | '\r' if !in_str => {
                if let Some((s, offset)) = start.take() {
                    out.push(Token {
                        text: &line[s..i],
                        offset,
                    });
                }
            }
            _ => {
                start.get_or_insert((i, col + 1));
            }
        }
    }

    if in_str {
        return Err(VMError::ParseError {
            line: line_no,
            offset: start.map_or(1, |(_, offset)| offset),
            message: "unterminated string literal (missing closing quote)",
        });
    }
    if let Some((s, offset)) = start {
        out.push(Token {
            text: &line[s..],
            offset,
        });
    }
    Ok(out)
}

fn parse_section_marker(line: &str) -> Option<Section> {
    let trimmed = line.trim();
    if trimmed.eq_ignore_ascii_case(SECTION_CODE) {
        Some(Section::Code)
    } else if trimmed.eq_ignore_ascii_case(SECTION_DATA) {
        Some(Section::Data)
    } else {
        None
    }
}

/// Returns the label name if `tok` is a label definition (`name:`).
fn label_def(tok: &str) -> Option<&str> {
    tok.strip_suffix(LABEL_SUFFIX)
}

/// Checks a label definition and returns its name.
fn parse_label_def<'a>(line_no: usize, tok: &Token<'a>) -> Result<Option<&'a str>, VMError> {
    match label_def(tok.text) {
        Some(name) if is_identifier(name) => Ok(Some(name)),
        Some(_) => Err(VMError::ParseError {
            line: line_no,
            offset: tok.offset,
            message: "invalid label name",
        }),
        None => Ok(None),
    }
}

/// Parses an integer or a double-quoted string literal.
fn parse_value(line_no: usize, tok: &Token<'_>) -> Result<Value, VMError> {
    if let Some(inner) = tok.text.strip_prefix('"') {
        return match inner.strip_suffix('"') {
            Some(text) if !text.contains('"') => Ok(Value::from(text)),
            _ => Err(VMError::ParseError {
                line: line_no,
                offset: tok.offset,
                message: "malformed string literal",
            }),
        };
    }
    tok.text
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|_| VMError::ParseError {
            line: line_no,
            offset: tok.offset,
            message: "data value must be an integer or a string literal",
        })
}

/// Wraps an error with the source location it was raised at.
fn located(line: usize, offset: usize) -> impl FnOnce(VMError) -> VMError {
    move |e| VMError::AssemblyError {
        line,
        offset,
        source: e.to_string(),
    }
}

/// Parses `mnemonic operand...` into an instruction.
fn parse_instruction(line_no: usize, tokens: &[Token<'_>]) -> Result<Instruction, VMError> {
    let (head, rest) = tokens.split_first().ok_or(VMError::ParseError {
        line: line_no,
        offset: 1,
        message: "expected an instruction",
    })?;
    let opcode = Opcode::from_mnemonic(head.text).map_err(located(line_no, head.offset))?;
    let operands = rest
        .iter()
        .map(|tok| Operand::parse(tok.text).map_err(located(line_no, tok.offset)))
        .collect::<Result<Vec<_>, _>>()?;
    Instruction::from_operands(opcode, operands).map_err(located(line_no, head.offset))
}

/// Parses assembly source into a symbolic program.
pub fn parse_source(source: &str) -> Result<Program, VMError> {
    let mut builder = ProgramBuilder::new();
    let mut section = Section::Code;

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        if let Some(marker) = parse_section_marker(line) {
            section = marker;
            continue;
        }

        let tokens = tokenize(line_no, line)?;
        let Some(first) = tokens.first() else {
            continue;
        };

        match section {
            Section::Code => {
                let body = match parse_label_def(line_no, first)? {
                    Some(name) => {
                        builder.open_procedure(name);
                        &tokens[1..]
                    }
                    None => &tokens[..],
                };
                if body.is_empty() {
                    continue;
                }
                let instr = parse_instruction(line_no, body)?;
                builder
                    .current()
                    .map_err(located(line_no, body[0].offset))?
                    .instruction(instr);
            }
            Section::Data => {
                let Some(name) = parse_label_def(line_no, first)? else {
                    return Err(VMError::ParseError {
                        line: line_no,
                        offset: first.offset,
                        message: "expected `name: value` in data section",
                    });
                };
                let value = match tokens.get(1) {
                    Some(tok) => parse_value(line_no, tok)?,
                    None => {
                        return Err(VMError::ParseError {
                            line: line_no,
                            offset: first.offset + first.text.chars().count(),
                            message: "data entry is missing a value",
                        });
                    }
                };
                if let Some(extra) = tokens.get(2) {
                    return Err(VMError::ParseError {
                        line: line_no,
                        offset: extra.offset,
                        message: "unexpected token after data value",
                    });
                }
                builder.data(name, value);
            }
        }
    }

    Ok(builder.build())
}

/// Parses and assembles `source`.
///
/// Failures are also logged as a compiler-style diagnostic.
pub fn assemble_source(source: &str) -> Result<AssembledProgram, VMError> {
    assemble_source_with_name(source, "<source>")
}

fn assemble_source_with_name(source: &str, source_name: &str) -> Result<AssembledProgram, VMError> {
    let result = parse_source(source).and_then(|program| assembler::assemble(&program));
    if let Err(err) = &result {
        log_assembly_error(source_name, source, err);
    }
    result
}

/// Convenience: assemble directly from a file path.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<AssembledProgram, VMError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| VMError::IoError {
        path: path_ref.display().to_string(),
        source: e.to_string(),
    })?;
    assemble_source_with_name(&source, &path_ref.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::operand::Register;

    fn texts<'a>(tokens: &[Token<'a>]) -> Vec<&'a str> {
        tokens.iter().map(|t| t.text).collect()
    }

    #[test]
    fn tokenize_commas_and_comments() {
        let tokens = tokenize(1, "  add A, 1,B # bump").unwrap();
        assert_eq!(texts(&tokens), vec!["add", "A", "1", "B"]);
        assert_eq!(tokens[0].offset, 3);
        assert_eq!(tokens[3].offset, 12);
    }

    #[test]
    fn tokenize_keeps_strings_whole() {
        let tokens = tokenize(1, "hello: \"Hello, world! # not a comment\"").unwrap();
        assert_eq!(
            texts(&tokens),
            vec!["hello:", "\"Hello, world! # not a comment\""]
        );
    }

    #[test]
    fn tokenize_counts_columns_in_characters() {
        let tokens = tokenize(1, "héllo: \"día\", 1x").unwrap();
        assert_eq!(texts(&tokens), vec!["héllo:", "\"día\"", "1x"]);
        assert_eq!(tokens[1].offset, 8);
        assert_eq!(tokens[2].offset, 15);
    }

    #[test]
    fn non_ascii_line_underlines_the_right_column() {
        let source = "[ data ]\nx: \"ñé\" 2\n";
        let err = parse_source(source).unwrap_err();
        let VMError::ParseError { line, offset, .. } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!((line, offset), (2, 9));
        let diag = render_assembly_diagnostic("prog.hasm", source, line, offset, "bad");
        assert!(diag.ends_with("   2 | x: \"ñé\" 2\n     |         ^"));
    }

    #[test]
    fn tokenize_unterminated_string() {
        let err = tokenize(4, "msg: \"oops").unwrap_err();
        assert!(matches!(
            err,
            VMError::ParseError {
                line: 4,
                offset: 6,
                ..
            }
        ));
    }

    #[test]
    fn parse_empty_and_comment_only_source() {
        let program = parse_source("\n# nothing here\n   \n").unwrap();
        assert_eq!(program, Program::default());
    }

    #[test]
    fn parse_procedures_and_data() {
        let source = "\
main:
    fmt hello
    SET 7, A      # mnemonics ignore case
helper: halt
[ data ]
hello: \"Hello, world!\"
answer: -42
";
        let program = parse_source(source).unwrap();
        assert_eq!(program.procedures.len(), 2);
        assert_eq!(program.procedures[0].name, "main");
        assert_eq!(
            program.procedures[0].instructions,
            vec![
                Instruction::Noop {},
                Instruction::Fmt {
                    addr: Operand::label("hello")
                },
                Instruction::Set {
                    src: Operand::Imm(7),
                    dst: Register::A,
                },
            ]
        );
        assert_eq!(
            program.procedures[1].instructions,
            vec![Instruction::Noop {}, Instruction::Halt {}]
        );
        assert_eq!(program.data[0].value, Value::from("Hello, world!"));
        assert_eq!(program.data[1].value, Value::Int(-42));
    }

    #[test]
    fn code_section_can_resume_after_data() {
        let source = "[ data ]\nx: 1\n[ code ]\nmain:\n  halt\n";
        let program = parse_source(source).unwrap();
        assert_eq!(program.data.len(), 1);
        assert_eq!(program.procedures[0].instructions.len(), 2);
    }

    #[test]
    fn instruction_before_label_is_rejected() {
        let err = parse_source("  halt\n").unwrap_err();
        assert!(matches!(
            err,
            VMError::AssemblyError { line: 1, offset: 3, .. }
        ));
    }

    #[test]
    fn unknown_mnemonic_is_reported_at_its_column() {
        let err = parse_source("main:\n    jmp main\n").unwrap_err();
        match err {
            VMError::AssemblyError {
                line,
                offset,
                source,
            } => {
                assert_eq!((line, offset), (2, 5));
                assert!(source.contains("jmp"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_arity_and_register_slots() {
        let err = parse_source("main:\n  add A, 1\n").unwrap_err();
        assert!(matches!(err, VMError::AssemblyError { line: 2, .. }));

        let err = parse_source("main:\n  set 1, 2\n").unwrap_err();
        match err {
            VMError::AssemblyError { source, .. } => assert!(source.contains("register")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_operand_points_at_operand() {
        let err = parse_source("main:\n  dis 1x\n").unwrap_err();
        assert!(matches!(
            err,
            VMError::AssemblyError { line: 2, offset: 7, .. }
        ));
    }

    #[test]
    fn malformed_data_lines() {
        for (source, offset) in [
            ("[ data ]\nx 1\n", 1),
            ("[ data ]\nx:\n", 3),
            ("[ data ]\nx: 1 2\n", 6),
            ("[ data ]\nx: A\n", 4),
            ("[ data ]\n1x: 5\n", 1),
        ] {
            let err = parse_source(source).unwrap_err();
            assert!(
                matches!(err, VMError::ParseError { line: 2, offset: o, .. } if o == offset),
                "{source:?}: {err}"
            );
        }
    }

    #[test]
    fn assemble_resolves_text_labels() {
        let assembled = assemble_source("main:\n  fmt msg\n  halt\n[ data ]\nmsg: \"hi\"\n").unwrap();
        assert_eq!(assembled.symbols.lookup("msg"), Some(3));
        assert_eq!(
            assembled.image[1],
            crate::virtual_machine::cell::Cell::Instruction(Instruction::Fmt {
                addr: Operand::Imm(3)
            })
        );
    }

    #[test]
    fn assemble_reports_undefined_label() {
        let err = assemble_source("main:\n  set nowhere, PC\n").unwrap_err();
        assert!(matches!(err, VMError::UndefinedLabel { address: 1, .. }));
    }

    #[test]
    fn assemble_missing_file() {
        let err = assemble_file("/definitely/not/here.hasm").unwrap_err();
        assert!(matches!(err, VMError::IoError { .. }));
    }

    #[test]
    fn diagnostic_underlines_the_column() {
        let diag = render_assembly_diagnostic("prog.hasm", "main:\n  jmp x\n", 2, 3, "bad");
        assert_eq!(
            diag,
            "error: bad\n --> prog.hasm:2:3\n     |\n   2 |   jmp x\n     |   ^"
        );
    }
}
