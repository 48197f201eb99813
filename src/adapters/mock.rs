use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{adapters, model, presign, transfer};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PresignUrlCall {
    pub method: String,
    pub bucket: String,
    pub key: String,
    pub expires_in: u64,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UploadCall {
    pub bucket: String,
    pub key: String,
    pub source: PathBuf,
    pub tuning: model::object::TransferTuning,
}

#[derive(Clone, Debug, Default)]
pub struct RecordedCalls {
    pub page_requests: Vec<model::listing::PageRequest>,
    pub head_requests: Vec<(String, String)>,
    pub downloads: Vec<(String, String, PathBuf)>,
    pub uploads: Vec<UploadCall>,
    pub deletes: Vec<(String, String)>,
    pub presign_urls: Vec<PresignUrlCall>,
    pub post_policies: Vec<(String, presign::PostPolicy)>,
}

#[derive(Default)]
struct MockState {
    buckets: Vec<String>,
    bucket_error: Option<String>,
    pages: Vec<Result<model::listing::PageResponse, String>>,
    head_response: Option<model::object::HeadObjectResponse>,
    head_error: Option<String>,
    transfer_chunks: Vec<u64>,
    transfer_error: Option<String>,
    download_body: Option<Vec<u8>>,
    presigned_url: Option<String>,
    post_url: Option<String>,
    recorded: RecordedCalls,
}

#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buckets(self, buckets: Vec<&str>) -> Self {
        self.state().buckets = buckets.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_bucket_error(self, message: &str) -> Self {
        self.state().bucket_error = Some(message.to_string());
        self
    }

    pub fn with_page(self, page: Result<model::listing::PageResponse, String>) -> Self {
        self.state().pages.push(page);
        self
    }

    pub fn with_pages(self, pages: Vec<Result<model::listing::PageResponse, String>>) -> Self {
        self.state().pages.extend(pages);
        self
    }

    pub fn with_head_response(self, response: model::object::HeadObjectResponse) -> Self {
        self.state().head_response = Some(response);
        self
    }

    pub fn with_head_error(self, message: &str) -> Self {
        self.state().head_error = Some(message.to_string());
        self
    }

    pub fn with_transfer_chunks(self, chunks: Vec<u64>) -> Self {
        self.state().transfer_chunks = chunks;
        self
    }

    pub fn with_transfer_error(self, message: &str) -> Self {
        self.state().transfer_error = Some(message.to_string());
        self
    }

    pub fn with_download_body(self, body: &[u8]) -> Self {
        self.state().download_body = Some(body.to_vec());
        self
    }

    pub fn with_presigned_url(self, url: &str) -> Self {
        self.state().presigned_url = Some(url.to_string());
        self
    }

    pub fn with_post_url(self, url: &str) -> Self {
        self.state().post_url = Some(url.to_string());
        self
    }

    pub fn recorded(&self) -> RecordedCalls {
        self.state().recorded.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("failed to acquire `state` guard")
    }

    fn record_presign(&self, method: &str, request: &presign::PresignRequest) {
        self.state().recorded.presign_urls.push(PresignUrlCall {
            method: method.to_string(),
            bucket: request.bucket.clone(),
            key: request.key.clone(),
            expires_in: request.expires_in.as_secs(),
            content_type: request.content_type.clone(),
            content_disposition: request.content_disposition.clone(),
        });
    }
}

impl adapters::ObjectStore for MockStore {
    fn list_buckets(&self) -> Result<Vec<String>, model::BrowseError> {
        let state = self.state();
        if let Some(message) = &state.bucket_error {
            return Err(model::BrowseError::Transport(message.clone()));
        }
        Ok(state.buckets.clone())
    }

    fn list_objects_page(
        &self,
        request: &model::listing::PageRequest,
    ) -> Result<model::listing::PageResponse, model::BrowseError> {
        let mut state = self.state();
        state.recorded.page_requests.push(request.clone());

        if state.pages.is_empty() {
            return Ok(model::listing::PageResponse::default());
        }
        match state.pages.remove(0) {
            Ok(page) => Ok(page),
            Err(message) => Err(model::BrowseError::Transport(message)),
        }
    }

    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<model::object::HeadObjectResponse, model::BrowseError> {
        let mut state = self.state();
        state
            .recorded
            .head_requests
            .push((bucket.to_string(), key.to_string()));

        if let Some(message) = &state.head_error {
            return Err(model::BrowseError::Transport(message.clone()));
        }
        Ok(state.head_response.clone().unwrap_or_default())
    }

    fn download_file(
        &self,
        bucket: &str,
        key: &str,
        destination: &Path,
        mut on_chunk: Option<&mut transfer::ChunkFn>,
    ) -> Result<(), model::BrowseError> {
        let (chunks, error, body) = {
            let mut state = self.state();
            state.recorded.downloads.push((
                bucket.to_string(),
                key.to_string(),
                destination.to_path_buf(),
            ));
            (
                state.transfer_chunks.clone(),
                state.transfer_error.clone(),
                state.download_body.clone(),
            )
        };

        if let Some(body) = body {
            fs::write(destination, body).map_err(|err| {
                model::BrowseError::Transport(format!(
                    "failed to write to: {}, {}",
                    destination.display(),
                    err
                ))
            })?;
        }

        for chunk in chunks {
            if let Some(on_chunk) = on_chunk.as_mut() {
                on_chunk(chunk)?;
            }
        }

        if let Some(message) = error {
            return Err(model::BrowseError::Transport(message));
        }
        Ok(())
    }

    fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        tuning: model::object::TransferTuning,
        mut on_chunk: Option<&mut transfer::ChunkFn>,
    ) -> Result<(), model::BrowseError> {
        let (chunks, error) = {
            let mut state = self.state();
            state.recorded.uploads.push(UploadCall {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: source.to_path_buf(),
                tuning,
            });
            (state.transfer_chunks.clone(), state.transfer_error.clone())
        };

        for chunk in chunks {
            if let Some(on_chunk) = on_chunk.as_mut() {
                on_chunk(chunk)?;
            }
        }

        if let Some(message) = error {
            return Err(model::BrowseError::Transport(message));
        }
        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), model::BrowseError> {
        self.state()
            .recorded
            .deletes
            .push((bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn presign_get_object(
        &self,
        request: &presign::PresignRequest,
    ) -> Result<String, model::BrowseError> {
        self.record_presign("GET", request);
        Ok(self
            .state()
            .presigned_url
            .clone()
            .unwrap_or_else(|| "https://mock.example/presigned".to_string()))
    }

    fn presign_put_object(
        &self,
        request: &presign::PresignRequest,
    ) -> Result<String, model::BrowseError> {
        self.record_presign("PUT", request);
        Ok(self
            .state()
            .presigned_url
            .clone()
            .unwrap_or_else(|| "https://mock.example/presigned".to_string()))
    }

    fn presign_post_form(
        &self,
        bucket: &str,
        policy: &presign::PostPolicy,
    ) -> Result<presign::PresignedPost, model::BrowseError> {
        let mut state = self.state();
        state
            .recorded
            .post_policies
            .push((bucket.to_string(), policy.clone()));

        let url = state
            .post_url
            .clone()
            .unwrap_or_else(|| format!("https://mock.example/{}", bucket));
        let mut fields = HashMap::new();
        for (name, value) in &policy.fields {
            fields.insert(name.clone(), value.clone());
        }

        Ok(presign::PresignedPost { url, fields })
    }
}
