use crate::intermediate::{OpRef, OperandPrefix, ParsedLine};

/// One rendered listing line: `lineno*5`, a 4-digit hex address, the
/// label/mnemonic/operand fields, and the emitted object code in hex.
#[derive(Clone, Debug)]
pub struct ListingLine {
    pub line_no: usize,
    pub text: String,
}

fn pad(field: &str, width: usize) -> String {
    let mut out = field.to_string();
    while out.len() < width {
        out.push(' ');
    }
    out
}

impl ListingLine {
    pub fn comment(line_no: usize, raw: &str) -> ListingLine {
        ListingLine {
            line_no,
            text: format!("{:<6}{}", line_no * 5, raw),
        }
    }

    pub fn line(line_no: usize, address: u32, line: &ParsedLine, object_code: &[u8]) -> ListingLine {
        let label = pad(line.label.as_deref().unwrap_or(""), 10);

        let mnemonic = match line.op_ref {
            Some(OpRef::Directive(directive)) => format!("{:?}", directive).to_uppercase(),
            Some(OpRef::Opcode(_)) => {
                // The original mnemonic text isn't retained on OpcodeEntry;
                // the raw line always carries it, so fall back to it. Skip
                // the label token (if any) to land on the mnemonic itself.
                let mut tokens = line.raw.split_whitespace();
                if line.label.is_some() {
                    tokens.next();
                }
                tokens
                    .next()
                    .unwrap_or("")
                    .trim_start_matches('+')
                    .to_string()
            }
            None => String::new(),
        };
        let extended_marker = if line.extended { "+" } else { " " };
        let mnemonic_field = pad(&format!("{}{}", extended_marker, mnemonic), 10);

        let prefix_marker = match line.operand_prefix {
            Some(OperandPrefix::Immediate) => "#",
            Some(OperandPrefix::Indirect) => "@",
            None => "",
        };
        let indexed = if line.indexed { ",X" } else { "" };
        let operand_field = pad(
            &format!("{}{}{}", prefix_marker, line.operand_text, indexed),
            20,
        );

        let mut hex = String::new();
        for byte in object_code {
            hex.push_str(&format!("{:02X}", byte));
        }

        let text = format!(
            "{:<6}{:04X}  {}{}{}{}",
            line_no * 5,
            address,
            label,
            mnemonic_field,
            operand_field,
            hex
        );
        ListingLine { line_no, text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intermediate::ParsedLine;
    use sicvm::opcode::OpcodeTable;

    #[test]
    fn instruction_line_carries_label_mnemonic_operand_and_code() {
        let opcodes = OpcodeTable::default();
        let entry = opcodes.lookup("STL").unwrap();
        let parsed = ParsedLine {
            label: Some("FIRST".to_string()),
            extended: false,
            op_ref: Some(OpRef::Opcode(entry)),
            operand_prefix: None,
            operand_text: "RETADR".to_string(),
            indexed: false,
            raw: "FIRST STL RETADR".to_string(),
        };
        let rendered = ListingLine::line(2, 0x1000, &parsed, &[0x17, 0x20, 0x00]);
        assert!(rendered.text.contains("1000"));
        assert!(rendered.text.contains("STL"));
        assert!(rendered.text.contains("RETADR"));
        assert!(rendered.text.contains("172000"));
    }

    #[test]
    fn comment_line_passes_through_verbatim() {
        let rendered = ListingLine::comment(1, ".a remark");
        assert!(rendered.text.ends_with(".a remark"));
    }
}
