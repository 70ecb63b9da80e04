use super::query::{GenreCount, ReleasePage, ReleaseQuery, ReleaseStats};
use super::schema::RELEASE_VERSIONED_SCHEMAS;
use super::{InsertOutcome, ReleaseStore, StoreError};
use crate::merge::FillOnlyUpdate;
use crate::release::{CandidateRecord, ReleaseIdentity, ReleaseRecord, Source};
use crate::sqlite_persistence::open_versioned;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const RELEASE_COLUMNS: &str = "id, artist, album, label, release_date, preorder_date, genres, \
     formats, price, cover_url, purchase_url, description, source, source_id, source_url, \
     subreddit, reddit_score, num_comments, posted_at, posted_by, flair, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteReleaseStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReleaseStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, RELEASE_VERSIONED_SCHEMAS, "releases")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    fn format_date(date: &NaiveDate) -> String {
        date.format(DATE_FORMAT).to_string()
    }

    fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    fn json_column<T: serde::de::DeserializeOwned>(
        row: &rusqlite::Row,
        name: &str,
    ) -> rusqlite::Result<T> {
        let raw: String = row.get(name)?;
        let index = row.as_ref().column_index(name)?;
        serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
    }

    fn datetime_column(row: &rusqlite::Row, name: &str) -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(name)?;
        let index = row.as_ref().column_index(name)?;
        Self::parse_datetime(&raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                Type::Text,
                format!("invalid timestamp '{}' in {}", raw, name).into(),
            )
        })
    }

    fn row_to_release(row: &rusqlite::Row) -> rusqlite::Result<ReleaseRecord> {
        let source_str: String = row.get("source")?;
        let source = Source::parse(&source_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                12,
                Type::Text,
                format!("unknown source '{}'", source_str).into(),
            )
        })?;

        let release_date: Option<String> = row.get("release_date")?;
        let preorder_date: Option<String> = row.get("preorder_date")?;
        let posted_at: Option<String> = row.get("posted_at")?;

        Ok(ReleaseRecord {
            id: row.get("id")?,
            artist: row.get("artist")?,
            album: row.get("album")?,
            label: row.get("label")?,
            release_date: release_date
                .and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok()),
            preorder_date: preorder_date
                .and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok()),
            genres: Self::json_column::<BTreeSet<String>>(row, "genres")?,
            formats: Self::json_column::<Vec<String>>(row, "formats")?,
            price: row.get("price")?,
            cover_url: row.get("cover_url")?,
            purchase_url: row.get("purchase_url")?,
            description: row.get("description")?,
            source,
            source_id: row.get("source_id")?,
            source_url: row.get("source_url")?,
            subreddit: row.get("subreddit")?,
            reddit_score: row.get("reddit_score")?,
            num_comments: row.get("num_comments")?,
            posted_at: posted_at.as_deref().and_then(Self::parse_datetime),
            posted_by: row.get("posted_by")?,
            flair: row.get("flair")?,
            created_at: Self::datetime_column(row, "created_at")?,
            updated_at: Self::datetime_column(row, "updated_at")?,
        })
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
        serde_json::to_string(value).map_err(|e| StoreError::Malformed(e.to_string()))
    }

    fn release_by_id(conn: &Connection, id: i64) -> Result<Option<ReleaseRecord>, StoreError> {
        let sql = format!("SELECT {} FROM releases WHERE id = ?1", RELEASE_COLUMNS);
        Ok(conn
            .query_row(&sql, params![id], Self::row_to_release)
            .optional()?)
    }
}

impl ReleaseStore for SqliteReleaseStore {
    fn find_by_identity(
        &self,
        identity: &ReleaseIdentity,
    ) -> Result<Option<ReleaseRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM releases WHERE artist_key = ?1 AND album_key = ?2 AND source = ?3",
            RELEASE_COLUMNS
        );
        Ok(conn
            .query_row(
                &sql,
                params![
                    identity.artist_key,
                    identity.album_key,
                    identity.source.as_str()
                ],
                Self::row_to_release,
            )
            .optional()?)
    }

    fn insert(&self, candidate: &CandidateRecord) -> Result<InsertOutcome, StoreError> {
        let identity = candidate.identity();
        let genres = Self::to_json(&candidate.genres)?;
        let formats = Self::to_json(&candidate.formats)?;
        let now = Self::format_datetime(&Utc::now());
        let reddit = candidate.reddit.as_ref();

        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT INTO releases (
                artist, album, artist_key, album_key, label, release_date, preorder_date,
                genres, formats, price, cover_url, purchase_url, description,
                source, source_id, source_url, subreddit, reddit_score, num_comments,
                posted_at, posted_by, flair, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                      ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?23)
            ON CONFLICT(artist_key, album_key, source) DO NOTHING",
            params![
                candidate.artist.trim(),
                candidate.album.trim(),
                identity.artist_key,
                identity.album_key,
                candidate.label,
                candidate.release_date.as_ref().map(Self::format_date),
                candidate.preorder_date.as_ref().map(Self::format_date),
                genres,
                formats,
                candidate.price,
                candidate.cover_url,
                candidate.purchase_url,
                candidate.description,
                candidate.source.as_str(),
                candidate.source_id,
                candidate.source_url,
                reddit.map(|r| r.subreddit.as_str()),
                reddit.map(|r| r.score),
                reddit.map(|r| r.num_comments),
                reddit
                    .and_then(|r| r.posted_at.as_ref())
                    .map(Self::format_datetime),
                reddit.and_then(|r| r.author.as_deref()),
                reddit.and_then(|r| r.flair.as_deref()),
                now,
            ],
        )?;

        if changed == 0 {
            return Ok(InsertOutcome::IdentityConflict);
        }
        let id = conn.last_insert_rowid();
        let record = Self::release_by_id(&conn, id)?.ok_or(StoreError::NotFound(id))?;
        Ok(InsertOutcome::Inserted(record))
    }

    fn update_fill_only(
        &self,
        id: i64,
        update: &FillOnlyUpdate,
    ) -> Result<ReleaseRecord, StoreError> {
        let genres = update.genres.as_ref().map(Self::to_json).transpose()?;
        let formats = update.formats.as_ref().map(Self::to_json).transpose()?;
        let now = Self::format_datetime(&Utc::now());

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE releases SET
                label = COALESCE(?1, label),
                release_date = COALESCE(?2, release_date),
                preorder_date = COALESCE(?3, preorder_date),
                genres = COALESCE(?4, genres),
                formats = COALESCE(?5, formats),
                price = COALESCE(?6, price),
                cover_url = COALESCE(?7, cover_url),
                purchase_url = COALESCE(?8, purchase_url),
                description = COALESCE(?9, description),
                subreddit = COALESCE(?10, subreddit),
                reddit_score = COALESCE(?11, reddit_score),
                num_comments = COALESCE(?12, num_comments),
                updated_at = ?13
            WHERE id = ?14",
            params![
                update.label,
                update.release_date.as_ref().map(Self::format_date),
                update.preorder_date.as_ref().map(Self::format_date),
                genres,
                formats,
                update.price,
                update.cover_url,
                update.purchase_url,
                update.description,
                update.subreddit,
                update.popularity.map(|p| p.score),
                update.popularity.map(|p| p.num_comments),
                now,
                id,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Self::release_by_id(&conn, id)?.ok_or(StoreError::NotFound(id))
    }

    fn releases_needing_enrichment(&self, limit: usize) -> Result<Vec<ReleaseRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM releases
             WHERE source = ?1
               AND (cover_url IS NULL OR cover_url LIKE '%thumb%' OR price IS NULL OR label IS NULL)
             ORDER BY reddit_score DESC NULLS LAST, id ASC
             LIMIT ?2",
            RELEASE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let releases = stmt
            .query_map(
                params![Source::Reddit.as_str(), limit as i64],
                Self::row_to_release,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(releases)
    }

    fn query_releases(&self, query: &ReleaseQuery) -> Result<ReleasePage, StoreError> {
        let limit = query.effective_limit();
        let total = self.count_releases(query)?;

        let (where_clause, mut params) = query.where_clause();
        let sql = format!(
            "SELECT {} FROM releases{} ORDER BY {} LIMIT ? OFFSET ?",
            RELEASE_COLUMNS,
            where_clause,
            query.sort.order_by()
        );
        params.push(Box::new(limit as i64));
        params.push(Box::new(query.offset as i64));
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let releases = stmt
            .query_map(param_refs.as_slice(), Self::row_to_release)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ReleasePage {
            releases,
            total,
            limit,
            offset: query.offset,
        })
    }

    fn count_releases(&self, query: &ReleaseQuery) -> Result<usize, StoreError> {
        let (where_clause, params) = query.where_clause();
        let sql = format!("SELECT COUNT(*) FROM releases{}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let conn = self.conn()?;
        let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn release_stats(&self) -> Result<ReleaseStats, StoreError> {
        let conn = self.conn()?;
        let (total_releases, total_artists, with_price, with_cover, avg_reddit_score) = conn
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT artist_key), COUNT(price), COUNT(cover_url), AVG(reddit_score)
                 FROM releases",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                    ))
                },
            )?;

        let mut stmt = conn.prepare(
            "SELECT json_each.value AS genre, COUNT(*) AS count
             FROM releases, json_each(releases.genres)
             GROUP BY genre
             ORDER BY count DESC, genre ASC
             LIMIT 10",
        )?;
        let top_genres = stmt
            .query_map([], |row| {
                Ok(GenreCount {
                    genre: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ReleaseStats {
            total_releases: total_releases as usize,
            total_artists: total_artists as usize,
            with_price: with_price as usize,
            with_cover: with_cover as usize,
            avg_reddit_score,
            top_genres,
        })
    }
}
