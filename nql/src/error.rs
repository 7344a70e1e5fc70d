//! Error types for NQL parsing

use thiserror::Error;

/// What stage of parsing rejected the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input too short to carry a command prefix
    InvalidQuery,
    /// The command prefix is not one of select/delete/insert/update
    UnrecognizedCommand,
    /// Tokenizer or grammar violation
    Syntax,
    /// A method name that follows no known naming convention
    UnrecognizedMethod,
}

/// Error that occurred during parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", location(.fragment, .position))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub fragment: Option<String>,
    pub position: Option<usize>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fragment: None,
            position: None,
        }
    }

    pub fn invalid_query(query: &str) -> Self {
        Self::new(ParseErrorKind::InvalidQuery, format!("The query {} is invalid", query))
    }

    pub fn unrecognized_command(query: &str) -> Self {
        Self::new(
            ParseErrorKind::UnrecognizedCommand,
            format!("The command was not recognized at the query {}", query),
        )
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Syntax, message)
    }

    pub fn unrecognized_method(method: &str, reason: &str) -> Self {
        Self::new(
            ParseErrorKind::UnrecognizedMethod,
            format!("The method {} is not a valid query method: {}", method, reason),
        )
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    pub fn with_position(mut self, pos: usize) -> Self {
        self.position = Some(pos);
        self
    }
}

fn location(fragment: &Option<String>, position: &Option<usize>) -> String {
    match (fragment, position) {
        (Some(fragment), Some(pos)) => format!(" near '{}' at position {}", fragment, pos),
        (None, Some(pos)) => format!(" at position {}", pos),
        (Some(fragment), None) => format!(" near '{}'", fragment),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location() {
        let err = ParseError::syntax("unknown operator")
            .with_fragment("!")
            .with_position(14);
        assert_eq!(err.to_string(), "unknown operator near '!' at position 14");
    }

    #[test]
    fn test_display_command_errors() {
        assert_eq!(
            ParseError::invalid_query("sel").to_string(),
            "The query sel is invalid"
        );
        let err = ParseError::unrecognized_command("foobar God (x=1)");
        assert_eq!(err.kind, ParseErrorKind::UnrecognizedCommand);
        assert!(err.to_string().contains("foobar God (x=1)"));
    }
}
