//! Asset slots, remote asset references, and the local file map handed from
//! the upload boundary to the lifecycle manager.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Kinds and slots
// ---------------------------------------------------------------------------

/// Resource type understood by the remote asset gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Video,
    Image,
}

impl AssetKind {
    /// Database / gateway name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
        }
    }

    /// Parse from the database `kind` column.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named place an uploaded file can occupy on a record.
///
/// The names match the multipart field names accepted at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetSlot {
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "thumbnail")]
    Thumbnail,
    #[serde(rename = "avatar")]
    Avatar,
    #[serde(rename = "coverImage")]
    CoverImage,
}

impl AssetSlot {
    pub const ALL: [AssetSlot; 4] = [
        AssetSlot::Video,
        AssetSlot::Thumbnail,
        AssetSlot::Avatar,
        AssetSlot::CoverImage,
    ];

    /// Multipart field name for this slot.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Thumbnail => "thumbnail",
            Self::Avatar => "avatar",
            Self::CoverImage => "coverImage",
        }
    }

    /// Resolve a multipart field name to a slot, if it names one.
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.field_name() == name)
    }

    /// Resource type the gateway should store this slot as.
    pub fn kind(self) -> AssetKind {
        match self {
            Self::Video => AssetKind::Video,
            Self::Thumbnail | Self::Avatar | Self::CoverImage => AssetKind::Image,
        }
    }
}

impl fmt::Display for AssetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

// ---------------------------------------------------------------------------
// Remote references
// ---------------------------------------------------------------------------

/// A remotely stored file confirmed by a successful gateway upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub remote_id: String,
    pub url: String,
    pub kind: AssetKind,
}

// ---------------------------------------------------------------------------
// Upload plans
// ---------------------------------------------------------------------------

/// Which slots an upload operation requires and which it merely accepts.
#[derive(Debug, Clone, Copy)]
pub struct UploadPlan {
    pub required: &'static [AssetSlot],
    pub optional: &'static [AssetSlot],
}

impl UploadPlan {
    /// Publishing a video: the media file is mandatory, the thumbnail is not.
    pub const VIDEO: UploadPlan = UploadPlan {
        required: &[AssetSlot::Video],
        optional: &[AssetSlot::Thumbnail],
    };

    /// Registering an account: avatar is mandatory, cover image is not.
    pub const PROFILE: UploadPlan = UploadPlan {
        required: &[AssetSlot::Avatar],
        optional: &[AssetSlot::CoverImage],
    };

    /// Whether `slot` is part of this plan at all.
    pub fn accepts(&self, slot: AssetSlot) -> bool {
        self.required.contains(&slot) || self.optional.contains(&slot)
    }
}

// ---------------------------------------------------------------------------
// Local files
// ---------------------------------------------------------------------------

/// A temporary file written to local disk by the upload boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub size: u64,
    /// Original client-supplied file name, if any.
    pub file_name: Option<String>,
}

impl LocalFile {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Remove the file from disk. A file that is already gone is not an error.
    pub async fn remove(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Files received for one request, keyed by slot.
///
/// Built once at the multipart boundary; the lifecycle manager consumes it.
#[derive(Debug, Default)]
pub struct IncomingFiles {
    files: BTreeMap<AssetSlot, LocalFile>,
}

impl IncomingFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `file` under `slot`, returning any file it displaced.
    ///
    /// The displaced file still exists on disk; the caller must remove it.
    pub fn insert(&mut self, slot: AssetSlot, file: LocalFile) -> Option<LocalFile> {
        self.files.insert(slot, file)
    }

    pub fn get(&self, slot: AssetSlot) -> Option<&LocalFile> {
        self.files.get(&slot)
    }

    pub fn take(&mut self, slot: AssetSlot) -> Option<LocalFile> {
        self.files.remove(&slot)
    }

    pub fn contains(&self, slot: AssetSlot) -> bool {
        self.files.contains_key(&slot)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Drain every remaining file in slot order.
    pub fn drain(&mut self) -> Vec<(AssetSlot, LocalFile)> {
        std::mem::take(&mut self.files).into_iter().collect()
    }
}
