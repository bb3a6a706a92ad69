//! Remote asset lifecycle and the multipart boundary that feeds it.

pub mod lifecycle;
pub mod multipart;

pub use lifecycle::{AssetLifecycleManager, ReplacedAsset, StagedAssets};
