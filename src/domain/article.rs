use chrono::{DateTime, Utc};
use html_escape::decode_html_entities;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// One article as delivered by the upstream API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub source: Option<Source>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    /// ISO-8601 timestamp, kept as received
    pub published_at: Option<String>,
    pub content: Option<String>,
}

impl Article {
    /// Identity key used for de-duplication. Blank URLs have no identity.
    pub fn key(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn has_link(&self) -> bool {
        self.key().is_some()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.name.as_deref())
    }

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("(Untitled)")
    }

    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.published_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Decode HTML entities the upstream leaves in human-readable fields.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| decode_html_entities(&t).to_string());
        self.description = self
            .description
            .map(|d| decode_html_entities(&d).to_string());
        self
    }
}

/// Response envelope shared by both endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub status: String,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub articles: Vec<Article>,
    /// Present only on error envelopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NewsResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Article>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Article>>::deserialize(deserializer)?.unwrap_or_default())
}
