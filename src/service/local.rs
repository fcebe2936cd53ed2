/// Directory-backed photo store for offline use.
///
/// Photo ids are file names inside the library directory and URLs are
/// `file://` paths. Uploads land next to the originals.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{PhotoInfo, PhotoService, PhotoSummary};
use crate::error::{EditorError, EditorResult};

const FILE_SCHEME: &str = "file://";

/// Extensions the library lists (lowercase)
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff"];

#[derive(Debug, Clone)]
pub struct LocalPhotoService {
    root: PathBuf,
}

impl LocalPhotoService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an id to a path, refusing anything that escapes the root
    fn resolve(&self, name: &str) -> EditorResult<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(|c: char| c == '/' || c == '\\');
        if !valid {
            return Err(EditorError::load(format!("Invalid photo id: {:?}", name)));
        }
        Ok(self.root.join(name))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn file_url(path: &Path) -> String {
    format!("{}{}", FILE_SCHEME, path.display())
}

#[async_trait]
impl PhotoService for LocalPhotoService {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list_photos(&self) -> EditorResult<Vec<PhotoSummary>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| EditorError::load(format!("{}: {}", self.root.display(), e)))?;

        let mut photos = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() || !is_image(&path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            photos.push(PhotoSummary {
                id: name.to_string(),
                filename: name.to_string(),
                thumbnail_url: Some(file_url(&path)),
                created_at: None,
            });
        }
        photos.sort_by(|a, b| a.filename.cmp(&b.filename));
        tracing::debug!(root = %self.root.display(), count = photos.len(), "listed library");
        Ok(photos)
    }

    async fn get_photo(&self, id: &str) -> EditorResult<PhotoInfo> {
        let path = self.resolve(id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(EditorError::load(format!("Photo not found: {}", id)));
        }
        Ok(PhotoInfo {
            id: id.to_string(),
            filename: id.to_string(),
            original_url: file_url(&path),
        })
    }

    async fn fetch_bytes(&self, url: &str) -> EditorResult<Vec<u8>> {
        let path = url
            .strip_prefix(FILE_SCHEME)
            .ok_or_else(|| EditorError::load(format!("Not a file URL: {}", url)))?;
        tokio::fs::read(path)
            .await
            .map_err(|e| EditorError::load(format!("{}: {}", path, e)))
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> EditorResult<()> {
        let path = self.resolve(filename).map_err(|e| EditorError::upload(e.to_string()))?;
        let size = bytes.len();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| EditorError::upload(format!("{}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), size, "saved edited photo");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::derived_filename;

    #[tokio::test]
    async fn test_lists_only_images_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.PNG"), b"x").unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let service = LocalPhotoService::new(dir.path());
        let photos = service.list_photos().await.unwrap();
        let names: Vec<_> = photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(names, ["a.jpg", "b.PNG"]);
    }

    #[tokio::test]
    async fn test_get_fetch_upload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cat.jpg"), b"original").unwrap();
        let service = LocalPhotoService::new(dir.path());

        let info = service.get_photo("cat.jpg").await.unwrap();
        assert!(info.original_url.starts_with("file://"));
        assert_eq!(service.fetch_bytes(&info.original_url).await.unwrap(), b"original");

        let name = derived_filename(&info.filename);
        service.upload(&name, b"edited".to_vec()).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("edited_cat.jpg")).unwrap(), b"edited");
    }

    #[tokio::test]
    async fn test_missing_and_escaping_ids_are_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let service = LocalPhotoService::new(dir.path());

        let missing = service.get_photo("nope.jpg").await.unwrap_err();
        assert!(matches!(missing, EditorError::Load { .. }));

        let escaping = service.get_photo("../secret.jpg").await.unwrap_err();
        assert!(matches!(escaping, EditorError::Load { .. }));

        let upload = service.upload("../x.jpg", vec![1]).await.unwrap_err();
        assert!(matches!(upload, EditorError::Upload { .. }));
    }
}
