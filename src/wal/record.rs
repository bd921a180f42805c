//! WAL record format
//!
//! One line per operation, pipe-delimited, newline-terminated. The writer
//! appends a delimiter after every field, so a Put line splits into four
//! fields (the last one empty) and a Delete line into three:
//!
//! ```text
//! +|<key>|<value>|\n       (Put)
//! -|<key>|\n               (Delete)
//! ```

/// Operation code for a Put record
const OP_PUT: &str = "+";
/// Operation code for a Delete record
const OP_DELETE: &str = "-";

/// A single mutation recorded in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Insert or overwrite a key
    Put { key: String, value: String },

    /// Delete a key
    Delete { key: String },
}

impl Record {
    /// Encode the record as one pipe-delimited, newline-terminated line.
    pub fn encode(&self) -> String {
        match self {
            Record::Put { key, value } => format!("{}|{}|{}|\n", OP_PUT, key, value),
            Record::Delete { key } => format!("{}|{}|\n", OP_DELETE, key),
        }
    }

    /// Parse one WAL line (without its trailing newline).
    ///
    /// Returns `None` for malformed lines: wrong field count, unknown
    /// operation code, or an empty line. Callers skip these silently.
    pub fn parse(line: &str) -> Option<Record> {
        if line.is_empty() {
            return None;
        }

        let fields: Vec<&str> = line.split('|').collect();

        match fields[0] {
            OP_PUT if fields.len() == 4 => Some(Record::Put {
                key: fields[1].to_string(),
                value: fields[2].to_string(),
            }),
            OP_DELETE if fields.len() == 3 => Some(Record::Delete {
                key: fields[1].to_string(),
            }),
            _ => None,
        }
    }

    /// The key this record mutates
    pub fn key(&self) -> &str {
        match self {
            Record::Put { key, .. } => key,
            Record::Delete { key } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_encodes_with_trailing_delimiter() {
        let rec = Record::Put {
            key: "foo".to_string(),
            value: "bar".to_string(),
        };
        assert_eq!(rec.encode(), "+|foo|bar|\n");
    }

    #[test]
    fn delete_encodes_with_trailing_delimiter() {
        let rec = Record::Delete {
            key: "foo".to_string(),
        };
        assert_eq!(rec.encode(), "-|foo|\n");
    }

    #[test]
    fn parse_round_trips_encode() {
        let put = Record::Put {
            key: "k".to_string(),
            value: "v".to_string(),
        };
        let del = Record::Delete { key: "k".to_string() };

        assert_eq!(Record::parse(put.encode().trim_end_matches('\n')), Some(put));
        assert_eq!(Record::parse(del.encode().trim_end_matches('\n')), Some(del));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!(Record::parse(""), None);
        assert_eq!(Record::parse("garbage"), None);
        assert_eq!(Record::parse("?|k|v|"), None);
        // Wrong field counts for the op code
        assert_eq!(Record::parse("+|only-key|"), None);
        assert_eq!(Record::parse("-|key|extra|"), None);
    }
}
