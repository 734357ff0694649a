use serde::{Deserialize, Serialize};

/// Incident severity levels, highest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Lenient parse for model output: unrecognized text yields `None` and the
    /// caller keeps its default rather than failing the run.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incident categories. `Info` doubles as the fallback bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Error,
    Warning,
    Performance,
    Security,
    Info,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Performance => "performance",
            Self::Security => "security",
            Self::Info => "info",
        }
    }

    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "performance" => Some(Self::Performance),
            "security" => Some(Self::Security),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    /// Title-cased label used in the rendered incident report.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Performance => "Performance",
            Self::Security => "Security",
            Self::Info => "Info",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, Severity};

    #[test]
    fn severity_parse_is_case_insensitive() {
        assert_eq!(Severity::parse_lenient(" HIGH "), Some(Severity::High));
        assert_eq!(Severity::parse_lenient("Critical"), Some(Severity::Critical));
    }

    #[test]
    fn unrecognized_values_yield_none() {
        assert_eq!(Severity::parse_lenient("catastrophic"), None);
        assert_eq!(Category::parse_lenient("network"), None);
    }

    #[test]
    fn category_titles_match_labels() {
        assert_eq!(Category::Performance.title(), "Performance");
        assert_eq!(Category::Info.as_str(), "info");
    }
}
