//! SQLite schema for the releases database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1 - Releases
// =============================================================================

const RELEASES_TABLE_V1: Table = Table {
    name: "releases",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text, non_null = true),
        sqlite_column!("artist_key", &SqlType::Text, non_null = true),
        sqlite_column!("album_key", &SqlType::Text, non_null = true),
        sqlite_column!("label", &SqlType::Text),
        sqlite_column!("release_date", &SqlType::Text),
        sqlite_column!("preorder_date", &SqlType::Text),
        // JSON arrays
        sqlite_column!("genres", &SqlType::Text, non_null = true),
        sqlite_column!("formats", &SqlType::Text, non_null = true),
        sqlite_column!("price", &SqlType::Real),
        sqlite_column!("cover_url", &SqlType::Text),
        sqlite_column!("purchase_url", &SqlType::Text),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("source", &SqlType::Text, non_null = true),
        sqlite_column!("source_id", &SqlType::Text, non_null = true),
        sqlite_column!("source_url", &SqlType::Text, non_null = true),
        sqlite_column!("reddit_score", &SqlType::Integer),
        sqlite_column!("num_comments", &SqlType::Integer),
        sqlite_column!("posted_at", &SqlType::Text),
        sqlite_column!("posted_by", &SqlType::Text),
        sqlite_column!("flair", &SqlType::Text),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_releases_source", "source"),
        ("idx_releases_posted_at", "posted_at DESC"),
        ("idx_releases_reddit_score", "reddit_score DESC"),
    ],
    unique_constraints: &[&["artist_key", "album_key", "source"]],
};

// =============================================================================
// Version 2 - Originating subreddit
// =============================================================================

const RELEASES_TABLE_V2: Table = Table {
    name: "releases",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text, non_null = true),
        sqlite_column!("artist_key", &SqlType::Text, non_null = true),
        sqlite_column!("album_key", &SqlType::Text, non_null = true),
        sqlite_column!("label", &SqlType::Text),
        sqlite_column!("release_date", &SqlType::Text),
        sqlite_column!("preorder_date", &SqlType::Text),
        sqlite_column!("genres", &SqlType::Text, non_null = true),
        sqlite_column!("formats", &SqlType::Text, non_null = true),
        sqlite_column!("price", &SqlType::Real),
        sqlite_column!("cover_url", &SqlType::Text),
        sqlite_column!("purchase_url", &SqlType::Text),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("source", &SqlType::Text, non_null = true),
        sqlite_column!("source_id", &SqlType::Text, non_null = true),
        sqlite_column!("source_url", &SqlType::Text, non_null = true),
        sqlite_column!("reddit_score", &SqlType::Integer),
        sqlite_column!("num_comments", &SqlType::Integer),
        sqlite_column!("posted_at", &SqlType::Text),
        sqlite_column!("posted_by", &SqlType::Text),
        sqlite_column!("flair", &SqlType::Text),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
        // Added in V2, so it sits after the V1 columns
        sqlite_column!("subreddit", &SqlType::Text),
    ],
    indices: &[
        ("idx_releases_source", "source"),
        ("idx_releases_posted_at", "posted_at DESC"),
        ("idx_releases_reddit_score", "reddit_score DESC"),
        ("idx_releases_subreddit", "subreddit"),
    ],
    unique_constraints: &[&["artist_key", "album_key", "source"]],
};

fn migrate_v1_to_v2(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    conn.execute("ALTER TABLE releases ADD COLUMN subreddit TEXT", [])?;
    conn.execute(
        "CREATE INDEX idx_releases_subreddit ON releases(subreddit)",
        [],
    )?;
    Ok(())
}

pub const RELEASE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[RELEASES_TABLE_V1],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[RELEASES_TABLE_V2],
        migration: Some(migrate_v1_to_v2),
    },
];
