//! Line-oriented lexer for TEAL source.
//!
//! # Rules
//!
//! - One token per non-blank line, carrying the 1-based line number
//! - `//` starts a comment anywhere outside a quoted string
//! - `#` starts a comment too, except on lines that begin with `#pragma`
//! - Fragments are separated by spaces or tabs; a double-quoted string is
//!   kept as a single fragment even if it contains whitespace
//! - The first fragment is the mnemonic, the rest are operands
//!
//! No opcode validation happens here.

const LINE_COMMENT: &[u8] = b"//";
const DIRECTIVE_CHAR: u8 = b'#';
const PRAGMA_PREFIX: &str = "#pragma";

/// One source line split into mnemonic and operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// 1-based source line.
    pub line: usize,
    pub opcode: &'a str,
    pub operands: Vec<&'a str>,
}

/// Splits source into tokens, dropping blank and comment-only lines.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| tokenize_line(i + 1, line))
        .collect()
}

fn tokenize_line(line_no: usize, line: &str) -> Option<Token<'_>> {
    let fragments = split_fragments(line.trim());
    let (opcode, operands) = fragments.split_first()?;
    Some(Token {
        line: line_no,
        opcode: *opcode,
        operands: operands.to_vec(),
    })
}

fn split_fragments(line: &str) -> Vec<&str> {
    let directive_comments = !line.starts_with(PRAGMA_PREFIX);
    let bytes = line.as_bytes();
    let mut out = Vec::with_capacity(4);
    let mut start: Option<usize> = None;
    let mut in_str = false;
    let mut escaped = false;
    let mut end = bytes.len();

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_str {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_str = false,
                _ => {}
            }
            i += 1;
            continue;
        }

        if bytes[i..].starts_with(LINE_COMMENT) || (directive_comments && b == DIRECTIVE_CHAR) {
            end = i;
            break;
        }

        match b {
            b' ' | b'\t' => {
                if let Some(s) = start.take() {
                    out.push(&line[s..i]);
                }
            }
            b'"' => {
                in_str = true;
                start.get_or_insert(i);
            }
            _ => {
                start.get_or_insert(i);
            }
        }
        i += 1;
    }

    if let Some(s) = start {
        let text = line[s..end].trim_end();
        if !text.is_empty() {
            out.push(text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_and_comment_lines() {
        let tokens = tokenize("\n   \n// comment\n# directive comment\nint 1\n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].line, 5);
        assert_eq!(tokens[0].opcode, "int");
        assert_eq!(tokens[0].operands, vec!["1"]);
    }

    #[test]
    fn strips_trailing_comments() {
        let tokens = tokenize("int 1 // one\nint 2 # two\nint 3//three");
        let operands: Vec<_> = tokens.iter().map(|t| t.operands.clone()).collect();
        assert_eq!(operands, vec![vec!["1"], vec!["2"], vec!["3"]]);
    }

    #[test]
    fn pragma_keeps_leading_hash() {
        let tokens = tokenize("#pragma version 2 // v2");
        assert_eq!(tokens[0].opcode, "#pragma");
        assert_eq!(tokens[0].operands, vec!["version", "2"]);
    }

    #[test]
    fn collapses_repeated_whitespace() {
        let tokens = tokenize("  byte   base64\t aGk=  ");
        assert_eq!(tokens[0].opcode, "byte");
        assert_eq!(tokens[0].operands, vec!["base64", "aGk="]);
    }

    #[test]
    fn quoted_string_is_one_fragment() {
        let tokens = tokenize(r#"byte "hello world // not a comment" // comment"#);
        assert_eq!(tokens[0].operands, vec![r#""hello world // not a comment""#]);
    }

    #[test]
    fn escaped_quote_stays_inside_string() {
        let tokens = tokenize(r#"byte "say \"hi\" #1""#);
        assert_eq!(tokens[0].operands, vec![r#""say \"hi\" #1""#]);
    }

    #[test]
    fn label_and_instruction_on_one_line() {
        let tokens = tokenize("done: int 7");
        assert_eq!(tokens[0].opcode, "done:");
        assert_eq!(tokens[0].operands, vec!["int", "7"]);
    }

    #[test]
    fn line_numbers_count_skipped_lines() {
        let tokens = tokenize("#pragma version 1\n\n\nint 1\n// end\nreturn");
        let lines: Vec<_> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 4, 6]);
    }
}
