//! Delimited-text reading and writing for lead import and export.
//!
//! Deliberately simpler than RFC 4180: a double quote toggles literal mode and
//! never appears in a parsed value, so `""` escapes collapse to nothing.

/// Field delimiter for import and export files.
pub const DELIMITER: char = ',';

const QUOTE: char = '"';

/// Split one record into its field values.
///
/// The delimiter is literal inside quotes. The last field is always emitted,
/// so `a,` yields `["a", ""]` and an empty line yields `[""]`.
pub fn parse_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        if ch == QUOTE {
            in_quotes = !in_quotes;
        } else if ch == delimiter && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);

    fields
}

/// Split a text blob into records on newlines that are outside quotes.
///
/// A quote still open at the end of the input does not swallow the rest of
/// the file: that record stops at its own line end and splitting resumes on
/// the next line. A trailing `\r` is dropped from each record. Blank records
/// are kept; the caller decides what to skip.
pub fn split_records(text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let mut in_quotes = false;
        let mut end = None;
        for (i, ch) in rest.char_indices() {
            match ch {
                QUOTE => in_quotes = !in_quotes,
                '\n' if !in_quotes => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }

        let end = match end {
            Some(i) => i,
            None if in_quotes => rest.find('\n').unwrap_or(rest.len()),
            None => rest.len(),
        };
        let record = &rest[..end];
        records.push(record.strip_suffix('\r').unwrap_or(record).to_string());
        rest = rest.get(end + 1..).unwrap_or("");
    }

    records
}

/// True when a record opens a quote it never closes.
pub fn has_unterminated_quote(record: &str) -> bool {
    record.matches(QUOTE).count() % 2 == 1
}

/// Wrap a value in double quotes, doubling any embedded quote.
pub fn quote_field(value: &str) -> String {
    format!("{QUOTE}{}{QUOTE}", value.replace(QUOTE, "\"\""))
}

/// Serialize one record with every field quoted.
pub fn serialize_row<S: AsRef<str>>(fields: &[S], delimiter: char) -> String {
    fields
        .iter()
        .map(|f| quote_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields() {
        assert_eq!(
            parse_line("Jane Doe,555-0100,jane@x.com", DELIMITER),
            vec!["Jane Doe", "555-0100", "jane@x.com"]
        );
    }

    #[test]
    fn test_quoted_delimiter_is_literal() {
        assert_eq!(
            parse_line(r#""Doe, Jane",555,"CA Final, Law""#, DELIMITER),
            vec!["Doe, Jane", "555", "CA Final, Law"]
        );
    }

    #[test]
    fn test_quotes_are_stripped_not_escaped() {
        assert_eq!(parse_line(r#"say ""hi"""#, DELIMITER), vec!["say hi"]);
        assert_eq!(parse_line(r#"a"b"c"#, DELIMITER), vec!["abc"]);
    }

    #[test]
    fn test_final_field_always_emitted() {
        assert_eq!(parse_line("a,", DELIMITER), vec!["a", ""]);
        assert_eq!(parse_line("", DELIMITER), vec![""]);
        assert_eq!(parse_line(",,,", DELIMITER), vec!["", "", "", ""]);
    }

    #[test]
    fn test_split_records_keeps_quoted_newlines() {
        let text = "Name,Query\r\nJane,\"line one\nline two\"\r\n\n";
        let records = split_records(text);
        assert_eq!(
            records,
            vec!["Name,Query", "Jane,\"line one\nline two\"", ""]
        );
        assert_eq!(
            parse_line(&records[1], DELIMITER),
            vec!["Jane", "line one\nline two"]
        );
    }

    #[test]
    fn test_split_records_without_trailing_newline() {
        assert_eq!(split_records("a\nb"), vec!["a", "b"]);
        assert!(split_records("").is_empty());
    }

    #[test]
    fn test_unterminated_quote_stops_at_line_end() {
        let text = "A,\"x\ny\"\r\nB,says \"hi\r\nC,3\nD,4";
        let records = split_records(text);
        assert_eq!(records, vec!["A,\"x\ny\"", "B,says \"hi", "C,3", "D,4"]);
        assert!(!has_unterminated_quote(&records[0]));
        assert!(has_unterminated_quote(&records[1]));
        assert!(!has_unterminated_quote(&records[2]));
    }

    #[test]
    fn test_serialize_row_quotes_everything() {
        assert_eq!(
            serialize_row(&["a", "", "b,c"], DELIMITER),
            r#""a","","b,c""#
        );
    }

    #[test]
    fn test_parse_inverts_serialize_for_printable_ascii() {
        let records: Vec<Vec<String>> = vec![
            vec!["Jane Doe".into(), "555-0100".into(), "jane@x.com".into()],
            vec!["".into(), "  padded  ".into(), "a,b,c".into()],
            vec!["~!@#$%^&*()_+{}|:<>?".into(), "'single'".into()],
            vec!["".into()],
        ];

        for record in records {
            let line = serialize_row(&record, DELIMITER);
            assert_eq!(parse_line(&line, DELIMITER), record, "line: {}", line);
        }
    }

    #[test]
    fn test_embedded_quotes_are_lost_on_round_trip() {
        let line = serialize_row(&["say \"hi\""], DELIMITER);
        assert_eq!(parse_line(&line, DELIMITER), vec!["say hi"]);
    }
}
