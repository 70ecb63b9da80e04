//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.

mod fixtures;
mod reddit;

#[allow(unused_imports)]
pub use fixtures::{reddit_candidate, TestStore};
#[allow(unused_imports)]
pub use reddit::{mount_listing, mount_status, reddit_post, reddit_source};
