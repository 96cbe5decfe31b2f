//! Parse command: shows what the agenda parser makes of a text block.

use std::io::Write;

use anyhow::Result;
use ct_core::{ParsedAgenda, parse_agenda};

use super::util::format_entry;

/// Parses `text` and prints items and validation errors.
///
/// Returns the parse so the caller can decide the exit status.
pub fn run<W: Write>(writer: &mut W, text: &str, json: bool) -> Result<ParsedAgenda> {
    let parsed = parse_agenda(text);
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&parsed)?)?;
        return Ok(parsed);
    }

    writeln!(writer, "Parsed {} items", parsed.entries.len())?;
    for (index, entry) in parsed.entries.iter().enumerate() {
        writeln!(writer, "{:>2}. {}", index + 1, format_entry(entry))?;
    }
    if !parsed.errors.is_empty() {
        writeln!(writer, "Errors:")?;
        for error in &parsed.errors {
            writeln!(writer, "- {error}")?;
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    const AGENDA: &str = "时间\t环节\t时长\t负责人
19:20\t备稿演讲\t6'\t陈演讲者 CC
19:27\t个人评估\t2-3分钟\t李评估
休息\t10'
";

    fn render(text: &str, json: bool) -> (String, ParsedAgenda) {
        let mut output = Vec::new();
        let parsed = run(&mut output, text, json).unwrap();
        (String::from_utf8(output).unwrap(), parsed)
    }

    #[test]
    fn lists_parsed_items() {
        let (output, parsed) = render(AGENDA, false);
        assert!(parsed.is_valid());
        assert_snapshot!(output, @r"
        Parsed 3 items
         1. 19:20:00  备稿演讲  6'  Prepared speech  陈演讲者 (CC)
         2. 19:27:00  个人评估  3'  Short evaluation / impromptu  李评估
         3. 休息  10'  Other
        ");
    }

    #[test]
    fn shows_validation_errors() {
        let (output, parsed) = render("备稿演讲\t7'\n开场致辞\t0\n", false);
        assert!(!parsed.is_valid());
        assert!(output.ends_with("Errors:\n- item 2: invalid duration (0s)\n"));
    }

    #[test]
    fn json_output_has_entries_and_errors() {
        let (output, _) = render(AGENDA, true);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["entries"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["entries"][0]["category"], "prepared_speech");
        assert_eq!(value["entries"][1]["duration_secs"], 180);
        assert_eq!(value["errors"].as_array().map(Vec::len), Some(0));
    }
}
