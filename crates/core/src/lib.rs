//! Domain types, error taxonomy and collaborator traits shared by the
//! vidshare crates.

pub mod accounts;
pub mod assets;
pub mod clock;
pub mod duration;
pub mod error;
pub mod gateway;
pub mod media;
pub mod orphans;
pub mod types;
pub mod validation;
