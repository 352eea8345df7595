//! Keyword queries used when a category has to be searched instead of filtered.

use crate::domain::Edition;

const CATEGORY_QUERIES: &[(&str, &str)] = &[
    ("business", "(ekonomi OR bisnis OR finance OR business)"),
    ("technology", "(teknologi OR technology OR tech)"),
    ("science", "(sains OR science OR riset OR research)"),
];

const DEFAULT_CATEGORY_QUERY: &str = "(ekonomi OR bisnis OR technology OR tech OR sains OR science)";

const FALLBACK_QUERIES: &[(&str, &str)] = &[
    ("business", "(business OR economy)"),
    ("technology", "(technology OR tech)"),
    ("science", "(science OR research)"),
];

const DEFAULT_FALLBACK_QUERY: &str = "(business OR technology OR science)";

const NATIONAL_SCOPE: &str = "indonesia";

/// Primary keyword-OR query for a category.
pub fn category_query(category: Option<&str>, edition: Edition) -> String {
    scoped(lookup(CATEGORY_QUERIES, category).unwrap_or(DEFAULT_CATEGORY_QUERY), edition)
}

/// Broader query tried once when the primary one yields nothing.
pub fn fallback_query(category: Option<&str>, edition: Edition) -> String {
    scoped(lookup(FALLBACK_QUERIES, category).unwrap_or(DEFAULT_FALLBACK_QUERY), edition)
}

fn lookup(table: &[(&str, &'static str)], category: Option<&str>) -> Option<&'static str> {
    let category = category?.trim();
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, query)| *query)
}

fn scoped(query: &str, edition: Edition) -> String {
    match edition {
        Edition::National => format!("{} AND {}", query, NATIONAL_SCOPE),
        Edition::International => query.to_string(),
    }
}
