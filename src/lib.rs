//! Aggregates new vinyl releases from Reddit and Discogs into one SQLite store.

pub mod config;
pub mod ingestion;
pub mod merge;
pub mod normalizer;
pub mod release;
pub mod release_store;
pub mod runner;
pub mod sources;
pub mod sqlite_persistence;
