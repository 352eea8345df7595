use serde::{Deserialize, Serialize};

/// Whether keyword queries are scoped to national coverage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    National,
    #[default]
    International,
}

impl std::str::FromStr for Edition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "national" | "nasional" => Ok(Edition::National),
            "international" => Ok(Edition::International),
            other => Err(format!("Unknown edition: {}", other)),
        }
    }
}

/// Filter inputs that define one paging generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParameters {
    pub query: String,
    pub category: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub language: Option<String>,
    pub edition: Edition,
}

impl QueryParameters {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = non_blank(language);
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = non_blank(category);
        self
    }
}

/// Treat empty and whitespace-only optionals as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
