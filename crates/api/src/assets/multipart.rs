//! Multipart boundary: streams file fields to the temp directory and hands
//! them on as [`IncomingFiles`].

use std::collections::HashMap;
use std::path::PathBuf;

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use vidshare_core::assets::{AssetSlot, IncomingFiles, LocalFile, UploadPlan};

use crate::assets::lifecycle::{remove_all, remove_local};
use crate::config::UploadConfig;
use crate::error::{AppError, AppResult};

/// Text fields and staged files from one multipart request.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub files: IncomingFiles,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// Remove every staged file from disk.
    pub async fn discard(mut self) {
        remove_all(&mut self.files).await;
    }
}

/// Read the whole request. File fields must name a slot in `plan`.
///
/// On error every file already written is removed before returning.
pub async fn read_form(
    mut multipart: Multipart,
    plan: &UploadPlan,
    config: &UploadConfig,
) -> AppResult<MultipartForm> {
    let mut form = MultipartForm::default();
    match fill(&mut multipart, &mut form, plan, config).await {
        Ok(()) => Ok(form),
        Err(e) => {
            form.discard().await;
            Err(e)
        }
    }
}

async fn fill(
    multipart: &mut Multipart,
    form: &mut MultipartForm,
    plan: &UploadPlan,
    config: &UploadConfig,
) -> AppResult<()> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        let slot = AssetSlot::from_field_name(&name).filter(|slot| plan.accepts(*slot));

        match slot {
            Some(slot) => {
                let file = write_field(field, &name, config).await?;
                if let Some(displaced) = form.files.insert(slot, file) {
                    remove_local(&displaced).await;
                }
            }
            None if field.file_name().is_some() => {
                return Err(AppError::BadRequest(format!(
                    "Unexpected file field '{name}'"
                )));
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.insert(name, text);
            }
        }
    }
    Ok(())
}

/// Stream one field to a uniquely named file under the temp directory.
async fn write_field(
    mut field: Field<'_>,
    name: &str,
    config: &UploadConfig,
) -> AppResult<LocalFile> {
    let file_name = field.file_name().map(str::to_string);
    let path = config
        .tmp_dir
        .join(temp_name(file_name.as_deref()));

    let mut out = tokio::fs::File::create(&path)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create temp file: {e}")))?;

    let mut size: u64 = 0;
    let result: AppResult<()> = async {
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            size += chunk.len() as u64;
            if size > config.max_file_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "File '{name}' exceeds the {} byte limit",
                    config.max_file_bytes
                )));
            }
            out.write_all(&chunk)
                .await
                .map_err(|e| AppError::InternalError(format!("Failed to write temp file: {e}")))?;
        }
        out.flush()
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to write temp file: {e}")))
    }
    .await;

    drop(out);
    let local = LocalFile {
        path,
        size,
        file_name,
    };
    match result {
        Ok(()) => Ok(local),
        Err(e) => {
            remove_local(&local).await;
            Err(e)
        }
    }
}

/// Random file name that keeps a short alphanumeric extension from the
/// client's name so the gateway can infer the format.
fn temp_name(client_name: Option<&str>) -> PathBuf {
    let ext = client_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match ext {
        Some(ext) => PathBuf::from(format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase())),
        None => PathBuf::from(Uuid::new_v4().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_name_keeps_safe_extension() {
        let name = temp_name(Some("Holiday Clip.MP4"));
        assert_eq!(name.extension().and_then(|e| e.to_str()), Some("mp4"));
    }

    #[test]
    fn temp_name_drops_suspicious_extension() {
        assert!(temp_name(Some("x.../../etc")).extension().is_none());
        assert!(temp_name(Some("noext")).extension().is_none());
        assert!(temp_name(None).extension().is_none());
    }

    #[tokio::test]
    async fn discard_keeps_going_when_one_removal_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stuck = dir.path().join("stuck");
        std::fs::create_dir(&stuck).expect("mkdir");
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"video").expect("write");

        let mut files = IncomingFiles::new();
        // A directory cannot be removed as a file; the error is logged only.
        files.insert(
            AssetSlot::Thumbnail,
            LocalFile {
                path: stuck.clone(),
                size: 1,
                file_name: None,
            },
        );
        files.insert(
            AssetSlot::Video,
            LocalFile {
                path: clip.clone(),
                size: 5,
                file_name: Some("clip.mp4".into()),
            },
        );
        let form = MultipartForm {
            fields: HashMap::new(),
            files,
        };

        form.discard().await;

        assert!(!clip.exists());
        assert!(stuck.exists());
    }
}
