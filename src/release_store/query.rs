use crate::release::ReleaseRecord;
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

/// Result ordering for release listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest posting first; rows without a posting time use their creation time.
    #[default]
    Date,
    Artist,
    /// Cheapest first, unpriced rows last.
    Price,
    /// Highest Reddit score first, rows without a score last.
    Popularity,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Date => "date",
            SortOrder::Artist => "artist",
            SortOrder::Price => "price",
            SortOrder::Popularity => "popularity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "date" => Some(SortOrder::Date),
            "artist" => Some(SortOrder::Artist),
            "price" => Some(SortOrder::Price),
            "popularity" | "reddit" => Some(SortOrder::Popularity),
            _ => None,
        }
    }

    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            SortOrder::Date => "COALESCE(posted_at, created_at) DESC, id DESC",
            SortOrder::Artist => "artist COLLATE NOCASE ASC, album COLLATE NOCASE ASC, id ASC",
            SortOrder::Price => "price ASC NULLS LAST, id DESC",
            SortOrder::Popularity => "reddit_score DESC NULLS LAST, id DESC",
        }
    }
}

/// Filters and paging for a release listing. `"all"` or blank filters are ignored.
#[derive(Debug, Clone, Default)]
pub struct ReleaseQuery {
    /// Exact genre tag.
    pub genre: Option<String>,
    /// Case-insensitive substring of any format token.
    pub format: Option<String>,
    /// Case-insensitive substring of artist, album or label.
    pub search: Option<String>,
    pub sort: SortOrder,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ReleaseQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// `WHERE` clause and its parameters, shared by the page and count queries.
    pub(crate) fn where_clause(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions: Vec<&'static str> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(genre) = active_filter(&self.genre) {
            conditions.push(
                "EXISTS (SELECT 1 FROM json_each(releases.genres) WHERE json_each.value = ?)",
            );
            params.push(Box::new(genre.to_string()));
        }
        if let Some(format) = active_filter(&self.format) {
            conditions.push(
                "EXISTS (SELECT 1 FROM json_each(releases.formats) WHERE json_each.value LIKE ? ESCAPE '\\')",
            );
            params.push(Box::new(like_pattern(format)));
        }
        if let Some(search) = active_filter(&self.search) {
            conditions.push(
                "(artist LIKE ? ESCAPE '\\' OR album LIKE ? ESCAPE '\\' OR label LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(search);
            for _ in 0..3 {
                params.push(Box::new(pattern.clone()));
            }
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), params)
        }
    }
}

fn active_filter(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// `%value%` with LIKE wildcards in `value` escaped.
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// One page of a release listing.
#[derive(Debug, Clone, Serialize)]
pub struct ReleasePage {
    pub releases: Vec<ReleaseRecord>,
    /// Matching rows across all pages.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

/// Aggregate figures over the whole store.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseStats {
    pub total_releases: usize,
    pub total_artists: usize,
    pub with_price: usize,
    pub with_cover: usize,
    pub avg_reddit_score: Option<f64>,
    pub top_genres: Vec<GenreCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_parses_known_names() {
        assert_eq!(SortOrder::parse("price"), Some(SortOrder::Price));
        assert_eq!(SortOrder::parse("reddit"), Some(SortOrder::Popularity));
        assert_eq!(SortOrder::parse("newest"), None);
    }

    #[test]
    fn limit_is_clamped() {
        let mut query = ReleaseQuery::default();
        assert_eq!(query.effective_limit(), DEFAULT_PAGE_SIZE);
        query.limit = Some(0);
        assert_eq!(query.effective_limit(), 1);
        query.limit = Some(10_000);
        assert_eq!(query.effective_limit(), MAX_PAGE_SIZE);
    }

    #[test]
    fn all_and_blank_filters_are_ignored() {
        let query = ReleaseQuery {
            genre: Some("all".to_string()),
            format: Some("  ".to_string()),
            ..Default::default()
        };
        let (clause, params) = query.where_clause();
        assert!(clause.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn search_binds_one_pattern_per_column() {
        let query = ReleaseQuery {
            genre: Some("Rock".to_string()),
            search: Some("50%_off".to_string()),
            ..Default::default()
        };
        let (clause, params) = query.where_clause();
        assert!(clause.starts_with(" WHERE EXISTS"));
        assert_eq!(params.len(), 4);
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
