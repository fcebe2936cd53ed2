/// Photo store collaborators.
///
/// The editor only needs four things from a photo store: the list shown
/// before editing, a photo's metadata, the bytes behind its URL, and an
/// upload endpoint for the exported JPEG. `HttpPhotoService` talks to the
/// REST backend; `LocalPhotoService` treats a directory as the store.

pub mod http;
pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::EditorResult;

pub use http::HttpPhotoService;
pub use local::LocalPhotoService;

/// Prefix of the filename an edited photo is uploaded under
pub const EDITED_PREFIX: &str = "edited_";

/// Photo metadata needed to open the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoInfo {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub filename: String,
    pub original_url: String,
}

/// One entry of the photo list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSummary {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Async photo store used by the editor session
#[async_trait]
pub trait PhotoService: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn list_photos(&self) -> EditorResult<Vec<PhotoSummary>>;

    async fn get_photo(&self, id: &str) -> EditorResult<PhotoInfo>;

    /// Download the bytes behind a photo URL
    async fn fetch_bytes(&self, url: &str) -> EditorResult<Vec<u8>>;

    /// Store an exported JPEG under `filename`
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> EditorResult<()>;
}

/// Filename the edited copy of `original` is uploaded as
pub fn derived_filename(original: &str) -> String {
    format!("{}{}", EDITED_PREFIX, original)
}

/// Backends send ids as numbers or strings
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
