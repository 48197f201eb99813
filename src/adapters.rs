use std::path::Path;

use crate::{model, presign, transfer};

pub mod mock;
pub mod s3;

pub trait ObjectStore {
    fn list_buckets(&self) -> Result<Vec<String>, model::BrowseError>;

    fn list_objects_page(
        &self,
        request: &model::listing::PageRequest,
    ) -> Result<model::listing::PageResponse, model::BrowseError>;

    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<model::object::HeadObjectResponse, model::BrowseError>;

    fn download_file(
        &self,
        bucket: &str,
        key: &str,
        destination: &Path,
        on_chunk: Option<&mut transfer::ChunkFn>,
    ) -> Result<(), model::BrowseError>;

    fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        tuning: model::object::TransferTuning,
        on_chunk: Option<&mut transfer::ChunkFn>,
    ) -> Result<(), model::BrowseError>;

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), model::BrowseError>;

    fn presign_get_object(
        &self,
        request: &presign::PresignRequest,
    ) -> Result<String, model::BrowseError>;

    fn presign_put_object(
        &self,
        request: &presign::PresignRequest,
    ) -> Result<String, model::BrowseError>;

    fn presign_post_form(
        &self,
        bucket: &str,
        policy: &presign::PostPolicy,
    ) -> Result<presign::PresignedPost, model::BrowseError>;
}
