use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    IdeaNotFound,
    PostNotFound,
    ValidationRejected,
    UnknownIdea,
    AmbiguousId,
    InvalidEnumValue,
    AllocationConflict,
    CorruptRecord,
    StorageFailure,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::IdeaNotFound => "E2001",
            Self::PostNotFound => "E2002",
            Self::ValidationRejected => "E2003",
            Self::UnknownIdea => "E2004",
            Self::AmbiguousId => "E2005",
            Self::InvalidEnumValue => "E2006",
            Self::AllocationConflict => "E3001",
            Self::CorruptRecord => "E3002",
            Self::StorageFailure => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Board not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::IdeaNotFound => "Idea not found",
            Self::PostNotFound => "Post not found",
            Self::ValidationRejected => "Post failed validation",
            Self::UnknownIdea => "Linked idea does not exist",
            Self::AmbiguousId => "Ambiguous post ID",
            Self::InvalidEnumValue => "Invalid lane/status/sort value",
            Self::AllocationConflict => "Sequence allocation conflict",
            Self::CorruptRecord => "Corrupt stored record",
            Self::StorageFailure => "Storage write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `lb init` to create a board in this directory."),
            Self::ConfigParseError => Some("Fix syntax in .laneboard/config.toml and retry."),
            Self::IdeaNotFound | Self::PostNotFound => None,
            Self::ValidationRejected => Some("Correct the named field and save again."),
            Self::UnknownIdea => Some("Link to an existing idea, or save as a direct entry."),
            Self::AmbiguousId => Some("Use the full post ID instead of a prefix."),
            Self::InvalidEnumValue => Some("Use one of the documented lane/status/sort values."),
            Self::AllocationConflict => {
                Some("Another session saved at the same time. Retry the save.")
            }
            Self::CorruptRecord => Some("Inspect the board database for hand-edited rows."),
            Self::StorageFailure => Some("Check disk space and write permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::IdeaNotFound,
            ErrorCode::PostNotFound,
            ErrorCode::ValidationRejected,
            ErrorCode::UnknownIdea,
            ErrorCode::AmbiguousId,
            ErrorCode::InvalidEnumValue,
            ErrorCode::AllocationConflict,
            ErrorCode::CorruptRecord,
            ErrorCode::StorageFailure,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::AllocationConflict.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }
}
