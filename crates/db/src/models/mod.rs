//! Row types for the `users`, `videos` and `orphaned_assets` tables.

pub mod orphan;
pub mod user;
pub mod video;
