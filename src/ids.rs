//! Identifier generation.
//!
//! Project and snapshot ids carry a UTC date prefix so they sort roughly
//! chronologically. The random suffix is alphanumeric: six characters give
//! about 35.7 bits of entropy.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

const RANDOM_SUFFIX_LEN: usize = 6;
const SEARCH_SET_ID_LEN: usize = 9;

/// Random ASCII alphanumeric id of the given length.
pub fn make_random_id(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn generate_project_id() -> String {
    project_id_at(Utc::now())
}

pub fn generate_snapshot_id() -> String {
    snapshot_id_at(Utc::now())
}

pub fn generate_search_set_id() -> String {
    make_random_id(SEARCH_SET_ID_LEN)
}

pub(crate) fn project_id_at(now: DateTime<Utc>) -> String {
    format!("{}{}", now.format("%y%m%d"), make_random_id(RANDOM_SUFFIX_LEN))
}

pub(crate) fn snapshot_id_at(now: DateTime<Utc>) -> String {
    format!(
        "{}{}",
        now.format("%y%m%d%H%M%S"),
        make_random_id(RANDOM_SUFFIX_LEN)
    )
}
