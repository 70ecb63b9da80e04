use crate::release::CandidateRecord;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Community counters that are replaced on every touch, even by lower values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Popularity {
    pub score: i64,
    pub num_comments: i64,
}

/// Field changes for an existing release.
///
/// A `None` field leaves the stored value untouched; a `Some` field replaces
/// it. Empty strings and empty lists never become `Some`, so weaker data can
/// not erase what a previous run stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillOnlyUpdate {
    pub label: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub preorder_date: Option<NaiveDate>,
    pub genres: Option<BTreeSet<String>>,
    pub formats: Option<Vec<String>>,
    pub price: Option<f64>,
    pub cover_url: Option<String>,
    pub purchase_url: Option<String>,
    pub description: Option<String>,
    pub subreddit: Option<String>,
    pub popularity: Option<Popularity>,
}

impl FillOnlyUpdate {
    /// Every enrichable field of `candidate`, plus popularity for Reddit postings.
    ///
    /// A defaulted `["Vinyl"]` format list carries no information and is skipped.
    pub fn from_candidate(candidate: &CandidateRecord) -> Self {
        let formats = if candidate.formats_inferred {
            None
        } else {
            non_empty_list(&candidate.formats)
        };

        Self {
            label: non_empty(&candidate.label),
            release_date: candidate.release_date,
            preorder_date: candidate.preorder_date,
            genres: (!candidate.genres.is_empty()).then(|| candidate.genres.clone()),
            formats,
            price: candidate.price.filter(|p| p.is_finite()),
            cover_url: non_empty(&candidate.cover_url),
            purchase_url: non_empty(&candidate.purchase_url),
            description: non_empty(&candidate.description),
            subreddit: candidate
                .reddit
                .as_ref()
                .map(|r| r.subreddit.trim().to_string())
                .filter(|s| !s.is_empty()),
            popularity: candidate.reddit.as_ref().map(|r| Popularity {
                score: r.score,
                num_comments: r.num_comments,
            }),
        }
    }

    /// The subset a lookup service may contribute to a row it did not create:
    /// artwork, price, label, genres, formats and release date.
    pub fn for_enrichment(candidate: &CandidateRecord) -> Self {
        let full = Self::from_candidate(candidate);
        Self {
            cover_url: full.cover_url,
            price: full.price,
            label: full.label,
            genres: full.genres,
            formats: full.formats,
            release_date: full.release_date,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_empty_list(values: &[String]) -> Option<Vec<String>> {
    let cleaned: Vec<String> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{RedditExtras, Source};

    fn reddit_candidate() -> CandidateRecord {
        let mut candidate = CandidateRecord::new(
            "Tame Impala",
            "Currents",
            Source::Reddit,
            "abc",
            "https://www.reddit.com/r/x/abc",
        );
        candidate.reddit = Some(RedditExtras {
            subreddit: "VinylReleases".to_string(),
            score: 3,
            num_comments: 1,
            author: None,
            flair: None,
            posted_at: None,
        });
        candidate
    }

    #[test]
    fn blank_values_do_not_become_updates() {
        let mut candidate = reddit_candidate();
        candidate.label = Some("   ".to_string());
        candidate.cover_url = Some(String::new());
        candidate.price = Some(f64::NAN);

        let update = FillOnlyUpdate::from_candidate(&candidate);
        assert_eq!(update.label, None);
        assert_eq!(update.cover_url, None);
        assert_eq!(update.price, None);
        assert_eq!(update.genres, None);
    }

    #[test]
    fn inferred_formats_are_not_an_update() {
        let candidate = reddit_candidate();
        assert!(candidate.formats_inferred);
        assert_eq!(FillOnlyUpdate::from_candidate(&candidate).formats, None);

        let candidate = candidate.with_formats(vec!["2LP".to_string()]);
        assert_eq!(
            FillOnlyUpdate::from_candidate(&candidate).formats,
            Some(vec!["2LP".to_string()])
        );
    }

    #[test]
    fn reddit_candidates_carry_popularity() {
        let update = FillOnlyUpdate::from_candidate(&reddit_candidate());
        assert_eq!(
            update.popularity,
            Some(Popularity {
                score: 3,
                num_comments: 1
            })
        );
        assert_eq!(update.subreddit.as_deref(), Some("VinylReleases"));
    }

    #[test]
    fn enrichment_update_excludes_popularity_and_provenance() {
        let mut candidate = reddit_candidate();
        candidate.description = Some("notes".to_string());
        candidate.purchase_url = Some("https://www.discogs.com/release/1".to_string());
        candidate.label = Some("Modular".to_string());

        let update = FillOnlyUpdate::for_enrichment(&candidate);
        assert_eq!(update.label.as_deref(), Some("Modular"));
        assert_eq!(update.popularity, None);
        assert_eq!(update.subreddit, None);
        assert_eq!(update.description, None);
        assert_eq!(update.purchase_url, None);
        assert!(!update.is_empty());
        assert!(FillOnlyUpdate::default().is_empty());
    }
}
