use crate::error::ParseError;
use crate::intermediate::OperandPrefix;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct FieldParser;

/// The syntactic content of one non-comment line, before its mnemonic has
/// been resolved against the opcode table. Resolution can fail with a
/// semantic error (unknown mnemonic), which is why it happens one layer
/// up, in pass 1, rather than here.
#[derive(Clone, Debug)]
pub struct Fields {
    pub label: Option<String>,
    pub extended: bool,
    pub mnemonic: String,
    pub operand_prefix: Option<OperandPrefix>,
    pub operand_text: String,
    pub indexed: bool,
}

/// Splits one physical source line into a label (present iff column 0 is
/// non-blank) and the rest of the line. The SIC/XE convention is
/// positional, not grammar-driven: the character in column 0 decides
/// whether a label is there at all, before any tokenizing happens.
fn split_label(line: &str) -> (Option<&str>, &str) {
    if line.starts_with(|c: char| c.is_whitespace()) || line.is_empty() {
        (None, line.trim_start())
    } else {
        let mut parts = line.splitn(2, char::is_whitespace);
        let label = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim_start();
        (Some(label), rest)
    }
}

/// Parses one non-comment source line's label, mnemonic, and operand
/// fields. Does not look anything up in the opcode table.
pub fn parse_fields(line: &str) -> Result<Fields, ParseError> {
    let (label, rest) = split_label(line);
    let mut pairs = FieldParser::parse(Rule::fields, rest)?;
    let fields = pairs.next().unwrap();

    let mut extended = false;
    let mut mnemonic = String::new();
    let mut operand_prefix = None;
    let mut operand_text = String::new();
    let mut indexed = false;

    for field in fields.into_inner() {
        match field.as_rule() {
            Rule::mnemonic_field => {
                for inner in field.into_inner() {
                    match inner.as_rule() {
                        Rule::extended_flag => extended = true,
                        Rule::ident => mnemonic = inner.as_str().to_uppercase(),
                        _ => {}
                    }
                }
            }
            Rule::operand_field => {
                for inner in field.into_inner() {
                    match inner.as_rule() {
                        Rule::operand_prefix => {
                            operand_prefix = Some(if inner.as_str() == "#" {
                                OperandPrefix::Immediate
                            } else {
                                OperandPrefix::Indirect
                            });
                        }
                        Rule::bare_operand => operand_text = inner.as_str().to_string(),
                        Rule::indexed_suffix => indexed = true,
                        _ => {}
                    }
                }
            }
            Rule::EOI => {}
            _ => {}
        }
    }

    Ok(Fields {
        label: label.map(|s| s.to_string()),
        extended,
        mnemonic,
        operand_prefix,
        operand_text,
        indexed,
    })
}

/// Parses a `BYTE` operand's literal: `C'...'` yields its character
/// bytes, `X'...'` yields its decoded hex bytes (an odd digit count is a
/// caller-detected error, not a grammar one).
pub fn parse_byte_literal(text: &str) -> Result<Vec<u8>, ParseError> {
    let mut pairs = FieldParser::parse(Rule::byte_literal, text)?;
    let literal = pairs.next().unwrap().into_inner().next().unwrap();
    match literal.as_rule() {
        Rule::char_literal => {
            let body = literal.into_inner().next().unwrap().as_str();
            Ok(body.bytes().collect())
        }
        Rule::hex_literal => {
            let digits = literal.into_inner().next().unwrap().as_str();
            if digits.len() % 2 != 0 {
                return Err(ParseError::Number(format!(
                    "hex literal \"{}\" has an odd digit count",
                    digits
                )));
            }
            let mut bytes = Vec::with_capacity(digits.len() / 2);
            for i in (0..digits.len()).step_by(2) {
                bytes.push(u8::from_str_radix(&digits[i..i + 2], 16).unwrap());
            }
            Ok(bytes)
        }
        _ => unreachable!(),
    }
}

/// Parses a Format-2 register operand list (`reg1[,reg2]`).
pub fn parse_register_list(text: &str) -> Result<Vec<String>, ParseError> {
    let mut pairs = FieldParser::parse(Rule::register_list, text)?;
    let list = pairs.next().unwrap();
    Ok(list
        .into_inner()
        .filter(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str().to_uppercase())
        .collect())
}

/// Parses a number per the assembler's two conventions: `START`'s operand
/// is hexadecimal; every other directive's integer operand is decimal.
pub fn parse_integer(text: &str, hex: bool) -> Result<i64, ParseError> {
    let radix = if hex { 16 } else { 10 };
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = i64::from_str_radix(digits, radix)
        .map_err(|_| ParseError::Number(text.to_string()))?;
    Ok(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_present_iff_column_zero_is_non_blank() {
        assert_eq!(split_label("FIRST STL RETADR").0, Some("FIRST"));
        assert_eq!(split_label("    STL RETADR").0, None);
    }

    #[test]
    fn parses_a_labeled_instruction_line() {
        let parsed = parse_fields("FIRST STL RETADR").unwrap();
        assert_eq!(parsed.label.as_deref(), Some("FIRST"));
        assert_eq!(parsed.operand_text, "RETADR");
        assert!(!parsed.extended);
    }

    #[test]
    fn parses_extended_and_immediate_operand() {
        let parsed = parse_fields("      +LDA   #5").unwrap();
        assert!(parsed.extended);
        assert_eq!(parsed.operand_prefix, Some(OperandPrefix::Immediate));
        assert_eq!(parsed.operand_text, "5");
    }

    #[test]
    fn parses_indexed_operand() {
        let parsed = parse_fields("      LDA   BUFFER,X").unwrap();
        assert!(parsed.indexed);
        assert_eq!(parsed.operand_text, "BUFFER");
    }

    #[test]
    fn byte_literal_decodes_characters_and_hex() {
        assert_eq!(parse_byte_literal("C'EOF'").unwrap(), b"EOF".to_vec());
        assert_eq!(parse_byte_literal("X'F1'").unwrap(), vec![0xF1]);
        assert!(parse_byte_literal("X'F'").is_err());
    }

    #[test]
    fn integer_parses_hex_or_decimal() {
        assert_eq!(parse_integer("1000", true).unwrap(), 0x1000);
        assert_eq!(parse_integer("-5", false).unwrap(), -5);
    }
}
