use std::fmt;

/// Failures at the data source boundary. None of these escape `SnapshotLoader::load`.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Network error, timeout or non-2xx status.
    Transport { source: String, detail: String },
    /// Body was not valid JSON.
    Parse { source: String, detail: String },
    /// Primary and fallback both failed.
    Fallback {
        primary: Box<SourceError>,
        fallback: Box<SourceError>,
    },
}

impl SourceError {
    pub fn transport(source: impl Into<String>, detail: impl ToString) -> Self {
        SourceError::Transport {
            source: source.into(),
            detail: detail.to_string(),
        }
    }

    pub fn parse(source: impl Into<String>, detail: impl ToString) -> Self {
        SourceError::Parse {
            source: source.into(),
            detail: detail.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Transport { .. } => "transport",
            SourceError::Parse { .. } => "parse",
            SourceError::Fallback { .. } => "fallback",
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Transport { source, detail } => {
                write!(f, "transport failure from {}: {}", source, detail)
            }
            SourceError::Parse { source, detail } => {
                write!(f, "malformed snapshot from {}: {}", source, detail)
            }
            SourceError::Fallback { primary, fallback } => {
                write!(f, "no data source available ({}; {})", primary, fallback)
            }
        }
    }
}

impl std::error::Error for SourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_nests_both_failures() {
        let err = SourceError::Fallback {
            primary: Box::new(SourceError::transport("http://api/dashboard", "503 Service Unavailable")),
            fallback: Box::new(SourceError::parse("file:///demo.json", "EOF while parsing")),
        };
        let text = err.to_string();
        assert!(text.contains("503 Service Unavailable"));
        assert!(text.contains("EOF while parsing"));
        assert_eq!(err.kind(), "fallback");
    }
}
