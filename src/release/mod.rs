//! Release data model shared by sources, the merge engine and the store.

mod models;

pub use models::{
    identity_key, CandidateRecord, RedditExtras, ReleaseIdentity, ReleaseRecord, Source,
    DEFAULT_FORMAT, UNKNOWN_ALBUM, UNKNOWN_ARTIST,
};
