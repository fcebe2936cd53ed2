/// Editor session: one opened photo, its edits and the save lifecycle
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{EditorError, EditorResult};
use crate::render::export;
use crate::service::{derived_filename, PhotoInfo, PhotoService};
use crate::state::{EditController, EditState, SourceImage};

/// A fetched and decoded photo, ready to open
#[derive(Debug, Clone)]
pub struct LoadedPhoto {
    pub info: PhotoInfo,
    pub source: Arc<SourceImage>,
}

/// Fetch a photo's metadata and bytes, then decode off the async runtime.
///
/// Every failure on this path is reported as `EditorError::Load`.
pub async fn load_photo(service: Arc<dyn PhotoService>, id: String) -> EditorResult<LoadedPhoto> {
    let result: EditorResult<LoadedPhoto> = async {
        let info = service.get_photo(&id).await?;
        let bytes = service.fetch_bytes(&info.original_url).await?;
        let photo_id = info.id.clone();
        let source = tokio::task::spawn_blocking(move || SourceImage::decode(photo_id, &bytes))
            .await
            .map_err(|e| EditorError::load(format!("Decode task failed: {}", e)))??;
        Ok(LoadedPhoto {
            info,
            source: Arc::new(source),
        })
    }
    .await;

    match result {
        Ok(loaded) => {
            let (width, height) = loaded.source.dimensions();
            tracing::info!(id = %id, width, height, service = service.name(), "photo loaded");
            Ok(loaded)
        }
        Err(e) => {
            let e = e.into_load();
            tracing::error!(id = %id, error = %e, "photo load failed");
            Err(e)
        }
    }
}

/// What a finished save reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub filename: String,
    pub bytes: usize,
    pub width: u32,
    pub height: u32,
}

/// Sessions are numbered so late results can be matched to their editor
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Snapshot of everything a save needs, detached from the session
pub struct SaveJob {
    session_id: u64,
    service: Arc<dyn PhotoService>,
    source: Arc<SourceImage>,
    state: EditState,
    filename: String,
    quality: u8,
}

impl std::fmt::Debug for SaveJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveJob")
            .field("session_id", &self.session_id)
            .field("service", &self.service.name())
            .field("filename", &self.filename)
            .field("quality", &self.quality)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SaveJob {
    /// The session that started this save
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Rasterize and encode on a blocking thread, then upload
    pub async fn run(self) -> EditorResult<SaveReceipt> {
        let SaveJob {
            session_id,
            service,
            source,
            state,
            filename,
            quality,
        } = self;

        match state.to_json() {
            Ok(recipe) => tracing::debug!(session_id, %recipe, filename = %filename, "export started"),
            Err(e) => tracing::warn!(error = %e, "could not serialize edit recipe"),
        }
        let exported = tokio::task::spawn_blocking(move || export::export(&source, &state, quality))
            .await
            .map_err(|e| EditorError::encode(format!("Export task failed: {}", e)))??;

        let receipt = SaveReceipt {
            filename: filename.clone(),
            bytes: exported.bytes.len(),
            width: exported.width,
            height: exported.height,
        };
        service
            .upload(&filename, exported.bytes)
            .await
            .map_err(EditorError::into_upload)?;
        Ok(receipt)
    }
}

/// The editor's state for one opened photo
#[derive(Debug)]
pub struct EditorSession {
    id: u64,
    info: PhotoInfo,
    source: Arc<SourceImage>,
    controller: EditController,
    saving: bool,
}

impl EditorSession {
    pub fn new(loaded: LoadedPhoto) -> Self {
        let (width, height) = loaded.source.dimensions();
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            info: loaded.info,
            source: loaded.source,
            controller: EditController::with_source_size(width, height),
            saving: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn info(&self) -> &PhotoInfo {
        &self.info
    }

    pub fn source(&self) -> &Arc<SourceImage> {
        &self.source
    }

    pub fn controller(&self) -> &EditController {
        &self.controller
    }

    /// Edits made during a save do not affect the snapshot being uploaded
    pub fn controller_mut(&mut self) -> &mut EditController {
        &mut self.controller
    }

    /// Reset all edits. Refused while a save is in flight.
    pub fn reset(&mut self) -> bool {
        if self.saving {
            return false;
        }
        self.controller.reset();
        true
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Start a save. Returns `None` while another save is in flight.
    pub fn begin_save(&mut self, service: Arc<dyn PhotoService>, quality: u8) -> Option<SaveJob> {
        if self.saving {
            tracing::debug!("save already in flight, ignoring");
            return None;
        }
        self.saving = true;
        Some(SaveJob {
            session_id: self.id,
            service,
            source: Arc::clone(&self.source),
            state: *self.controller.state(),
            filename: derived_filename(&self.info.filename),
            quality,
        })
    }

    /// Clear the in-flight flag. Edits are left as they were either way.
    pub fn finish_save<E: std::fmt::Display>(&mut self, result: &Result<SaveReceipt, E>) {
        self.saving = false;
        match result {
            Ok(receipt) => tracing::info!(
                filename = %receipt.filename,
                bytes = receipt.bytes,
                width = receipt.width,
                height = receipt.height,
                "save complete"
            ),
            Err(e) => tracing::warn!(error = %e, "save failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::PhotoSummary;
    use crate::state::Adjustment;
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;

    /// In-memory store that records uploads
    #[derive(Default)]
    struct MockService {
        photo: Vec<u8>,
        uploads: Mutex<Vec<(String, Vec<u8>)>>,
        fail_upload: bool,
    }

    impl MockService {
        fn with_png(width: u32, height: u32) -> Self {
            let img = RgbaImage::from_pixel(width, height, Rgba([120, 60, 30, 255]));
            let mut photo = Vec::new();
            img.write_to(&mut std::io::Cursor::new(&mut photo), image::ImageFormat::Png)
                .unwrap();
            Self {
                photo,
                ..Self::default()
            }
        }

        fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PhotoService for MockService {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn list_photos(&self) -> EditorResult<Vec<PhotoSummary>> {
            Ok(Vec::new())
        }

        async fn get_photo(&self, id: &str) -> EditorResult<PhotoInfo> {
            Ok(PhotoInfo {
                id: id.to_string(),
                filename: "beach.png".to_string(),
                original_url: "mem://beach".to_string(),
            })
        }

        async fn fetch_bytes(&self, _url: &str) -> EditorResult<Vec<u8>> {
            Ok(self.photo.clone())
        }

        async fn upload(&self, filename: &str, bytes: Vec<u8>) -> EditorResult<()> {
            if self.fail_upload {
                return Err(EditorError::upload("503 Service Unavailable"));
            }
            self.uploads.lock().unwrap().push((filename.to_string(), bytes));
            Ok(())
        }
    }

    async fn open(service: &Arc<MockService>) -> EditorSession {
        let dyn_service: Arc<dyn PhotoService> = service.clone();
        EditorSession::new(load_photo(dyn_service, "7".to_string()).await.unwrap())
    }

    #[tokio::test]
    async fn test_load_decodes_source() {
        let service = Arc::new(MockService::with_png(12, 8));
        let session = open(&service).await;
        assert_eq!(session.source().dimensions(), (12, 8));
        assert_eq!(session.info().id, "7");
        assert!(!session.is_saving());
    }

    #[tokio::test]
    async fn test_undecodable_bytes_are_a_load_error() {
        let service: Arc<dyn PhotoService> = Arc::new(MockService {
            photo: b"not an image".to_vec(),
            ..MockService::default()
        });
        let err = load_photo(service, "1".to_string()).await.unwrap_err();
        assert!(matches!(err, EditorError::Load { .. }));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_double_save_uploads_once() {
        let service = Arc::new(MockService::with_png(10, 10));
        let mut session = open(&service).await;

        let first = session.begin_save(service.clone(), 92);
        let second = session.begin_save(service.clone(), 92);
        assert!(first.is_some());
        assert!(second.is_none());
        assert!(!session.reset());

        let result = first.unwrap().run().await;
        session.finish_save(&result);

        let receipt = result.unwrap();
        assert_eq!(receipt.filename, "edited_beach.png");
        assert_eq!((receipt.width, receipt.height), (10, 10));
        assert_eq!(service.upload_count(), 1);
        assert!(!session.is_saving());
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_edits_and_allows_retry() {
        let service = Arc::new(MockService {
            fail_upload: true,
            ..MockService::with_png(10, 10)
        });
        let mut session = open(&service).await;
        session
            .controller_mut()
            .set_adjustment(Adjustment::Brightness, 140.0);
        let before = *session.controller().state();

        let job = session.begin_save(service.clone(), 92).unwrap();
        let result = job.run().await;
        let err = result.as_ref().unwrap_err();
        assert!(matches!(err, EditorError::Upload { .. }));
        assert!(err.is_recoverable());

        session.finish_save(&result);
        assert_eq!(*session.controller().state(), before);
        assert!(session.begin_save(service.clone(), 92).is_some());
    }

    #[tokio::test]
    async fn test_save_job_carries_its_session() {
        let service = Arc::new(MockService::with_png(4, 4));
        let mut first = open(&service).await;
        let second = open(&service).await;
        assert_ne!(first.id(), second.id());

        let job = first.begin_save(service.clone(), 92).unwrap();
        assert_eq!(job.session_id(), first.id());
    }
}
