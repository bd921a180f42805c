//! Command definitions
//!
//! Parses the line-oriented text protocol into commands.

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a value under a key
    Put { key: String, value: String },

    /// Fetch the value for a key
    Get { key: String },

    /// Delete a key
    Del { key: String },
}

impl Command {
    /// Parse one command line (or datagram). Tokens are whitespace-separated;
    /// the verb is case-sensitive. Returns `None` for empty input, unknown
    /// verbs, or wrong arity — all of which the caller reports as
    /// `Invalid command`.
    pub fn parse(input: &str) -> Option<Command> {
        let tokens: Vec<&str> = input.split_whitespace().collect();

        match tokens.as_slice() {
            ["PUT", key, value] => Some(Command::Put {
                key: key.to_string(),
                value: value.to_string(),
            }),
            ["GET", key] => Some(Command::Get {
                key: key.to_string(),
            }),
            ["DEL", key] => Some(Command::Del {
                key: key.to_string(),
            }),
            _ => None,
        }
    }
}
