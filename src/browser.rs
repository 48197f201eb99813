use std::collections::HashMap;
use std::path::Path;

use tracing::{error, info, span, Level};

use crate::{adapters, model, presign, transfer};

pub const PAGE_SIZE: i64 = 50;

pub type ClientFactory = dyn Fn(
        &model::object::ConnectionParams,
    ) -> Result<Box<dyn adapters::ObjectStore>, model::BrowseError>
    + Send
    + Sync;

pub struct S3Browser {
    client_factory: Box<ClientFactory>,
}

impl S3Browser {
    pub fn new() -> Self {
        Self {
            client_factory: Box::new(|params| {
                let store = adapters::s3::S3Store::connect(params)?;
                Ok(Box::new(store))
            }),
        }
    }

    pub fn with_factory(client_factory: Box<ClientFactory>) -> Self {
        Self { client_factory }
    }

    fn connect(
        &self,
        params: &model::object::ConnectionParams,
    ) -> Result<Box<dyn adapters::ObjectStore>, model::BrowseError> {
        (self.client_factory)(params).map_err(|err| {
            error!(error_message=%err, error_group="connect");
            err
        })
    }

    pub fn list_buckets(
        &self,
        params: &model::object::ConnectionParams,
    ) -> Result<Vec<String>, model::BrowseError> {
        let span = span!(Level::INFO, "list_buckets", context = "list_buckets");
        let _e = span.enter();
        info!("called");

        let client = self.connect(params)?;
        match client.list_buckets() {
            Ok(buckets) => Ok(buckets),
            Err(err) => {
                error!(error_message=%err, error_group="list_buckets");
                Err(err)
            }
        }
    }

    pub fn list_objects(
        &self,
        params: &model::object::ConnectionParams,
        bucket: &str,
        options: &model::listing::ListOptions,
    ) -> Result<model::listing::BucketListing, model::BrowseError> {
        let span = span!(Level::INFO, "list_objects", context = "list_objects");
        let _e = span.enter();
        info!(bucket = bucket, max_keys = options.max_keys, "called");

        let client = self.connect(params)?;

        Ok(build_bucket_listing(client.as_ref(), bucket, options))
    }

    pub fn list_buckets_with_objects(
        &self,
        params: &model::object::ConnectionParams,
        options: &model::listing::ListOptions,
    ) -> Result<Vec<model::listing::BucketListing>, model::BrowseError> {
        let span = span!(
            Level::INFO,
            "list_buckets_with_objects",
            context = "list_buckets_with_objects"
        );
        let _e = span.enter();
        info!(max_keys = options.max_keys, "called");

        let client = self.connect(params)?;
        let buckets = match client.list_buckets() {
            Ok(buckets) => buckets,
            Err(err) => {
                error!(error_message=%err, error_group="list_buckets");
                return Err(err);
            }
        };

        // A resume token only makes sense for the bucket it came from.
        let mut per_bucket = options.clone();
        per_bucket.continuation_token = None;

        let mut listings = Vec::new();
        for bucket in buckets {
            listings.push(build_bucket_listing(client.as_ref(), &bucket, &per_bucket));
        }

        Ok(listings)
    }

    pub fn get_object_details(
        &self,
        params: &model::object::ConnectionParams,
        bucket: &str,
        key: &str,
    ) -> Result<model::object::ObjectDetails, model::BrowseError> {
        let span = span!(
            Level::INFO,
            "get_object_details",
            context = "get_object_details"
        );
        let _e = span.enter();
        info!(bucket = bucket, key = key, "called");

        let client = self.connect(params)?;
        let ho = match client.head_object(bucket, key) {
            Ok(ho) => ho,
            Err(err) => {
                error!(error_message=%err, error_group="head_object");
                return Err(err);
            }
        };

        let mut checksums = HashMap::new();
        if let Some(sum) = ho.checksum_crc32 {
            checksums.insert("CRC32".to_string(), sum);
        }
        if let Some(sum) = ho.checksum_crc32c {
            checksums.insert("CRC32C".to_string(), sum);
        }
        if let Some(sum) = ho.checksum_sha1 {
            checksums.insert("SHA1".to_string(), sum);
        }
        if let Some(sum) = ho.checksum_sha256 {
            checksums.insert("SHA256".to_string(), sum);
        }

        Ok(model::object::ObjectDetails {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: ho.content_length,
            last_modified: ho.last_modified,
            storage_class: ho.storage_class,
            etag: ho.etag,
            content_type: ho.content_type,
            metadata: ho.metadata,
            checksums,
        })
    }

    pub fn download_object(
        &self,
        params: &model::object::ConnectionParams,
        bucket: &str,
        key: &str,
        destination: &Path,
        progress: Option<&mut transfer::ProgressFn>,
        cancel: Option<&transfer::CancelFn>,
    ) -> Result<(), model::BrowseError> {
        let span = span!(Level::INFO, "download_object", context = "download_object");
        let _e = span.enter();
        info!(bucket = bucket, key = key, destination = %destination.display(), "called");

        let client = self.connect(params)?;
        let mut callback = transfer::transfer_callback(progress, cancel);

        if let Err(err) = client.download_file(
            bucket,
            key,
            destination,
            callback.as_mut().map(|cb| cb as &mut transfer::ChunkFn),
        ) {
            error!(error_message=%err, error_group="download_file");
            return Err(err);
        }

        Ok(())
    }

    pub fn upload_object(
        &self,
        params: &model::object::ConnectionParams,
        bucket: &str,
        key: &str,
        source: &Path,
        tuning: Option<model::object::TransferTuning>,
        progress: Option<&mut transfer::ProgressFn>,
        cancel: Option<&transfer::CancelFn>,
    ) -> Result<(), model::BrowseError> {
        let span = span!(Level::INFO, "upload_object", context = "upload_object");
        let _e = span.enter();
        info!(bucket = bucket, key = key, source = %source.display(), "called");

        let client = self.connect(params)?;
        let tuning = tuning.unwrap_or_default().sanitized();
        let mut callback = transfer::transfer_callback(progress, cancel);

        if let Err(err) = client.upload_file(
            bucket,
            key,
            source,
            tuning,
            callback.as_mut().map(|cb| cb as &mut transfer::ChunkFn),
        ) {
            error!(error_message=%err, error_group="upload_file");
            return Err(err);
        }

        Ok(())
    }

    pub fn delete_object(
        &self,
        params: &model::object::ConnectionParams,
        bucket: &str,
        key: &str,
    ) -> Result<(), model::BrowseError> {
        let span = span!(Level::INFO, "delete_object", context = "delete_object");
        let _e = span.enter();
        info!(bucket = bucket, key = key, "called");

        let client = self.connect(params)?;
        if let Err(err) = client.delete_object(bucket, key) {
            error!(error_message=%err, error_group="delete_object");
            return Err(err);
        }

        Ok(())
    }

    pub fn generate_presigned_access(
        &self,
        params: &model::object::ConnectionParams,
        request: &presign::PresignRequest,
    ) -> Result<presign::PresignedResult, model::BrowseError> {
        let span = span!(
            Level::INFO,
            "generate_presigned_access",
            context = "generate_presigned_access"
        );
        let _e = span.enter();
        info!(bucket = %request.bucket, key = %request.key, "called");

        if let Err(err) = presign::validate(request) {
            error!(error_message=%err, error_group="validate");
            return Err(err);
        }

        let client = self.connect(params)?;
        let result = match request.method {
            presign::PresignMethod::Get => client
                .presign_get_object(request)
                .map(presign::PresignedResult::Url),
            presign::PresignMethod::Put => client
                .presign_put_object(request)
                .map(presign::PresignedResult::Url),
            presign::PresignMethod::Post => {
                let policy = presign::build_post_policy(request);
                client
                    .presign_post_form(&request.bucket, &policy)
                    .map(presign::PresignedResult::Form)
            }
        };

        match result {
            Ok(result) => Ok(result),
            Err(err) => {
                error!(error_message=%err, error_group="presign");
                Err(err)
            }
        }
    }
}

impl Default for S3Browser {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_bucket_listing(
    client: &dyn adapters::ObjectStore,
    bucket: &str,
    options: &model::listing::ListOptions,
) -> model::listing::BucketListing {
    let mut listing = model::listing::BucketListing {
        name: bucket.to_string(),
        prefix: options.prefix.clone(),
        delimiter: options.delimiter.clone(),
        pages: Vec::new(),
        error: None,
        has_more: false,
        continuation_token: None,
    };

    let mut remaining = options.max_keys;
    let mut continuation_token = options.continuation_token.clone();
    let mut page_number: u32 = 0;

    while remaining > 0 {
        let request = model::listing::PageRequest {
            bucket: bucket.to_string(),
            max_keys: remaining.min(PAGE_SIZE) as i32,
            prefix: if options.prefix.is_empty() {
                None
            } else {
                Some(options.prefix.clone())
            },
            delimiter: if options.delimiter.is_empty() {
                None
            } else {
                Some(options.delimiter.clone())
            },
            continuation_token: continuation_token.clone(),
        };

        let response = match client.list_objects_page(&request) {
            Ok(response) => response,
            Err(err) => {
                let message = err.to_string();
                page_number += 1;
                listing.pages.push(model::listing::ObjectPage {
                    page_number,
                    keys: Vec::new(),
                    prefixes: Vec::new(),
                    error: Some(message.clone()),
                });
                listing.error = Some(message);
                break;
            }
        };

        let next_token = response.next_continuation_token.clone();
        let is_truncated = response.is_truncated;
        let item_count = (response.keys.len() + response.prefixes.len()) as i64;

        page_number += 1;
        listing.pages.push(model::listing::ObjectPage {
            page_number,
            keys: response.keys,
            prefixes: response.prefixes,
            error: None,
        });

        if item_count == 0 {
            // An empty page can still carry a token pointing at later results.
            if is_truncated && next_token.is_some() {
                continuation_token = next_token;
                continue;
            }
            break;
        }

        remaining -= item_count;

        if !is_truncated {
            break;
        }

        if remaining > 0 {
            continuation_token = next_token;
            continue;
        }

        // Limit reached while the service still has results.
        listing.continuation_token = next_token;
        break;
    }

    listing.has_more = listing
        .continuation_token
        .as_ref()
        .is_some_and(|token| !token.is_empty());

    listing
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::adapters::mock::MockStore;
    use crate::model::listing::{ListOptions, PageResponse};
    use crate::model::object::{ConnectionParams, HeadObjectResponse, TransferTuning};
    use crate::presign::{PostCondition, PostKeyMode, PresignMethod, PresignRequest};

    fn params() -> ConnectionParams {
        ConnectionParams::new("http://localhost:9000", "access", "secret")
    }

    fn browser_for(store: MockStore) -> S3Browser {
        S3Browser::with_factory(Box::new(move |_| Ok(Box::new(store.clone()))))
    }

    fn page(
        keys: Vec<&str>,
        prefixes: Vec<&str>,
        is_truncated: bool,
        token: Option<&str>,
    ) -> Result<PageResponse, String> {
        Ok(PageResponse {
            keys: keys.into_iter().map(str::to_string).collect(),
            prefixes: prefixes.into_iter().map(str::to_string).collect(),
            is_truncated,
            next_continuation_token: token.map(str::to_string),
        })
    }

    fn counted_page(
        count: usize,
        is_truncated: bool,
        token: Option<&str>,
    ) -> Result<PageResponse, String> {
        Ok(PageResponse {
            keys: (0..count).map(|i| format!("key-{}", i)).collect(),
            prefixes: Vec::new(),
            is_truncated,
            next_continuation_token: token.map(str::to_string),
        })
    }

    #[test]
    fn test_list_buckets() {
        let store = MockStore::new().with_buckets(vec!["alpha", "beta"]);
        let browser = browser_for(store);

        let buckets = browser.list_buckets(&params()).unwrap();

        assert_eq!(buckets, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_list_buckets_error() {
        let store = MockStore::new().with_bucket_error("connection refused");
        let browser = browser_for(store);

        assert!(matches!(
            browser.list_buckets(&params()),
            Err(model::BrowseError::Transport(_))
        ));
    }

    #[test]
    fn test_list_objects_single_page() {
        let store =
            MockStore::new().with_page(page(vec!["a.txt", "b.txt"], vec!["docs/"], false, None));
        let inspect = store.clone();
        let browser = browser_for(store);

        let listing = browser
            .list_objects(&params(), "bucket", &ListOptions::new())
            .unwrap();

        assert_eq!(listing.name, "bucket");
        assert_eq!(listing.delimiter, "/");
        assert_eq!(listing.pages.len(), 1);
        assert_eq!(listing.pages[0].page_number, 1);
        assert_eq!(listing.pages[0].keys, vec!["a.txt", "b.txt"]);
        assert_eq!(listing.pages[0].prefixes, vec!["docs/"]);
        assert!(listing.error.is_none());
        assert!(!listing.has_more);
        assert!(listing.continuation_token.is_none());

        let recorded = inspect.recorded();
        assert_eq!(recorded.page_requests.len(), 1);
        assert_eq!(recorded.page_requests[0].bucket, "bucket");
        assert_eq!(recorded.page_requests[0].max_keys, 10);
        assert_eq!(recorded.page_requests[0].prefix, None);
        assert_eq!(recorded.page_requests[0].delimiter, Some("/".to_string()));
        assert_eq!(recorded.page_requests[0].continuation_token, None);
    }

    #[test]
    fn test_list_objects_passes_prefix() {
        let store = MockStore::new().with_page(page(
            vec!["folder/a.txt"],
            vec!["folder/sub/"],
            false,
            None,
        ));
        let inspect = store.clone();
        let browser = browser_for(store);

        let listing = browser
            .list_objects(
                &params(),
                "bucket",
                &ListOptions::new().with_prefix("folder/"),
            )
            .unwrap();

        assert_eq!(listing.prefix, "folder/");
        assert_eq!(listing.pages[0].keys, vec!["folder/a.txt"]);
        assert_eq!(listing.pages[0].prefixes, vec!["folder/sub/"]);

        let recorded = inspect.recorded();
        assert_eq!(recorded.page_requests[0].prefix, Some("folder/".to_string()));
        assert_eq!(recorded.page_requests[0].delimiter, Some("/".to_string()));
    }

    #[test]
    fn test_list_objects_caps_page_size() {
        let store = MockStore::new().with_pages(vec![
            counted_page(50, true, Some("t1")),
            counted_page(50, true, Some("t2")),
            counted_page(20, false, None),
        ]);
        let inspect = store.clone();
        let browser = browser_for(store);

        let listing = browser
            .list_objects(
                &params(),
                "bucket",
                &ListOptions::new().with_max_keys(120),
            )
            .unwrap();

        assert_eq!(listing.pages.len(), 3);
        assert_eq!(listing.pages[2].page_number, 3);
        assert!(!listing.has_more);

        let recorded = inspect.recorded();
        let max_keys: Vec<i32> = recorded
            .page_requests
            .iter()
            .map(|request| request.max_keys)
            .collect();
        assert_eq!(max_keys, vec![50, 50, 20]);

        let tokens: Vec<Option<String>> = recorded
            .page_requests
            .iter()
            .map(|request| request.continuation_token.clone())
            .collect();
        assert_eq!(
            tokens,
            vec![None, Some("t1".to_string()), Some("t2".to_string())]
        );
    }

    #[test]
    fn test_list_objects_limit_reached_with_more_results() {
        let store = MockStore::new().with_pages(vec![
            page(vec!["a.txt"], vec![], true, Some("t1")),
            page(vec!["b.txt"], vec![], true, Some("t2")),
        ]);
        let inspect = store.clone();
        let browser = browser_for(store);

        let listing = browser
            .list_objects(&params(), "bucket", &ListOptions::new().with_max_keys(2))
            .unwrap();

        assert_eq!(listing.pages.len(), 2);
        assert!(listing.has_more);
        assert_eq!(listing.continuation_token, Some("t2".to_string()));

        let recorded = inspect.recorded();
        let max_keys: Vec<i32> = recorded
            .page_requests
            .iter()
            .map(|request| request.max_keys)
            .collect();
        assert_eq!(max_keys, vec![2, 1]);
    }

    #[test]
    fn test_list_objects_error_preserves_partial_results() {
        let store = MockStore::new().with_pages(vec![
            page(vec!["a.txt", "b.txt"], vec![], true, Some("t1")),
            Err("timeout".to_string()),
        ]);
        let browser = browser_for(store);

        let listing = browser
            .list_objects(&params(), "bucket", &ListOptions::new())
            .unwrap();

        assert_eq!(listing.pages.len(), 2);
        assert_eq!(listing.pages[0].keys, vec!["a.txt", "b.txt"]);
        assert!(listing.pages[0].error.is_none());
        assert_eq!(listing.pages[1].page_number, 2);
        assert!(listing.pages[1].keys.is_empty());
        assert_eq!(listing.pages[1].error, Some("timeout".to_string()));
        assert_eq!(listing.error, Some("timeout".to_string()));
        assert!(!listing.has_more);
    }

    #[test]
    fn test_list_objects_resumes_from_token() {
        let store = MockStore::new().with_page(page(vec!["z.txt"], vec![], false, None));
        let inspect = store.clone();
        let browser = browser_for(store);

        browser
            .list_objects(
                &params(),
                "bucket",
                &ListOptions::new().with_continuation_token("resume-here"),
            )
            .unwrap();

        let recorded = inspect.recorded();
        assert_eq!(
            recorded.page_requests[0].continuation_token,
            Some("resume-here".to_string())
        );
    }

    #[test]
    fn test_list_objects_records_empty_truncated_pages() {
        let store = MockStore::new().with_pages(vec![
            page(vec!["a.txt"], vec![], true, Some("t1")),
            page(vec![], vec![], true, Some("t2")),
            page(vec!["b.txt"], vec![], false, None),
        ]);
        let inspect = store.clone();
        let browser = browser_for(store);

        let listing = browser
            .list_objects(&params(), "bucket", &ListOptions::new())
            .unwrap();

        assert_eq!(listing.pages.len(), 3);
        assert_eq!(listing.pages[0].keys, vec!["a.txt"]);
        assert!(listing.pages[1].keys.is_empty());
        assert!(listing.pages[1].prefixes.is_empty());
        assert!(listing.pages[1].error.is_none());
        assert_eq!(listing.pages[1].page_number, 2);
        assert_eq!(listing.pages[2].keys, vec!["b.txt"]);
        assert_eq!(listing.pages[2].page_number, 3);

        let recorded = inspect.recorded();
        assert_eq!(recorded.page_requests.len(), 3);
        assert_eq!(
            recorded.page_requests[2].continuation_token,
            Some("t2".to_string())
        );
    }

    #[test]
    fn test_list_objects_empty_truncated_page_without_token_stops() {
        let store = MockStore::new().with_page(page(vec![], vec![], true, None));
        let inspect = store.clone();
        let browser = browser_for(store);

        let listing = browser
            .list_objects(&params(), "bucket", &ListOptions::new())
            .unwrap();

        assert_eq!(listing.pages.len(), 1);
        assert!(listing.pages[0].keys.is_empty());
        assert_eq!(listing.pages[0].page_number, 1);
        assert!(!listing.has_more);
        assert_eq!(inspect.recorded().page_requests.len(), 1);
    }

    #[test]
    fn test_list_objects_empty_bucket_records_one_page() {
        let store = MockStore::new().with_page(page(vec![], vec![], false, None));
        let inspect = store.clone();
        let browser = browser_for(store);

        let listing = browser
            .list_objects(&params(), "bucket", &ListOptions::new())
            .unwrap();

        assert_eq!(listing.pages.len(), 1);
        assert_eq!(listing.pages[0].page_number, 1);
        assert!(listing.pages[0].keys.is_empty());
        assert!(listing.pages[0].prefixes.is_empty());
        assert!(listing.pages[0].error.is_none());
        assert!(!listing.has_more);
        assert_eq!(inspect.recorded().page_requests.len(), 1);
    }

    #[test]
    fn test_list_objects_non_positive_limit_makes_no_calls() {
        for max_keys in [0, -5] {
            let store = MockStore::new().with_page(page(vec!["a.txt"], vec![], false, None));
            let inspect = store.clone();
            let browser = browser_for(store);

            let listing = browser
                .list_objects(
                    &params(),
                    "bucket",
                    &ListOptions::new().with_max_keys(max_keys),
                )
                .unwrap();

            assert!(
                listing.pages.is_empty(),
                "failed for case: {}",
                max_keys
            );
            assert!(inspect.recorded().page_requests.is_empty());
        }
    }

    #[test]
    fn test_list_objects_is_repeatable() {
        let scripts = || {
            vec![
                page(vec!["a.txt"], vec!["docs/"], true, Some("t1")),
                page(vec!["b.txt"], vec![], false, None),
            ]
        };

        let first = browser_for(MockStore::new().with_pages(scripts()))
            .list_objects(&params(), "bucket", &ListOptions::new())
            .unwrap();
        let second = browser_for(MockStore::new().with_pages(scripts()))
            .list_objects(&params(), "bucket", &ListOptions::new())
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_list_buckets_with_objects_clears_resume_token() {
        let store = MockStore::new()
            .with_buckets(vec!["first", "second"])
            .with_pages(vec![
                page(vec!["a.txt"], vec![], false, None),
                page(vec!["b.txt"], vec![], false, None),
            ]);
        let inspect = store.clone();
        let browser = browser_for(store);

        let listings = browser
            .list_buckets_with_objects(
                &params(),
                &ListOptions::new().with_continuation_token("stale"),
            )
            .unwrap();

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].name, "first");
        assert_eq!(listings[0].pages[0].keys, vec!["a.txt"]);
        assert_eq!(listings[1].name, "second");
        assert_eq!(listings[1].pages[0].keys, vec!["b.txt"]);

        let recorded = inspect.recorded();
        assert_eq!(recorded.page_requests.len(), 2);
        assert_eq!(recorded.page_requests[0].continuation_token, None);
        assert_eq!(recorded.page_requests[1].continuation_token, None);
    }

    #[test]
    fn test_get_object_details() {
        let store = MockStore::new().with_head_response(HeadObjectResponse {
            content_length: Some(1536),
            etag: Some("\"abc123\"".to_string()),
            content_type: Some("text/plain".to_string()),
            storage_class: Some("STANDARD".to_string()),
            metadata: [("s3browse-upload".to_string(), "true".to_string())]
                .into_iter()
                .collect(),
            checksum_sha256: Some("n4bQgYhMfWWaL+qgxVrQFaO/TxsrC4Is0V1sFbDwCgg=".to_string()),
            ..HeadObjectResponse::default()
        });
        let inspect = store.clone();
        let browser = browser_for(store);

        let details = browser
            .get_object_details(&params(), "bucket", "docs/report.txt")
            .unwrap();

        assert_eq!(details.bucket, "bucket");
        assert_eq!(details.key, "docs/report.txt");
        assert_eq!(details.size, Some(1536));
        assert_eq!(details.content_type, Some("text/plain".to_string()));
        assert_eq!(details.metadata["s3browse-upload"], "true");
        assert_eq!(details.checksums.len(), 1);
        assert_eq!(
            details.checksums["SHA256"],
            "n4bQgYhMfWWaL+qgxVrQFaO/TxsrC4Is0V1sFbDwCgg="
        );

        let recorded = inspect.recorded();
        assert_eq!(
            recorded.head_requests,
            vec![("bucket".to_string(), "docs/report.txt".to_string())]
        );
    }

    #[test]
    fn test_get_object_details_error() {
        let store = MockStore::new().with_head_error("no such key");
        let browser = browser_for(store);

        assert!(matches!(
            browser.get_object_details(&params(), "bucket", "missing.txt"),
            Err(model::BrowseError::Transport(_))
        ));
    }

    #[test]
    fn test_download_object_writes_destination() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("report.txt");

        let store = MockStore::new()
            .with_download_body(b"hello world")
            .with_transfer_chunks(vec![11]);
        let inspect = store.clone();
        let browser = browser_for(store);

        let reported = RefCell::new(Vec::new());
        let mut progress = |total: u64| reported.borrow_mut().push(total);

        browser
            .download_object(
                &params(),
                "bucket",
                "docs/report.txt",
                &destination,
                Some(&mut progress),
                None,
            )
            .unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"hello world");
        assert_eq!(reported.into_inner(), vec![11]);

        let recorded = inspect.recorded();
        assert_eq!(recorded.downloads.len(), 1);
        assert_eq!(recorded.downloads[0].1, "docs/report.txt");
        assert_eq!(recorded.downloads[0].2, destination);
    }

    #[test]
    fn test_download_object_cancelled_mid_transfer() {
        let store = MockStore::new().with_transfer_chunks(vec![1024, 2048, 1024]);
        let browser = browser_for(store);

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("big.bin");

        let reported = RefCell::new(Vec::new());
        let mut progress = |total: u64| reported.borrow_mut().push(total);
        let cancel = || reported.borrow().len() >= 2;

        let result = browser.download_object(
            &params(),
            "bucket",
            "big.bin",
            &destination,
            Some(&mut progress),
            Some(&cancel),
        );

        assert!(matches!(result, Err(model::BrowseError::Cancelled)));
        assert_eq!(reported.into_inner(), vec![1024, 3072]);
    }

    #[test]
    fn test_download_object_transport_error() {
        let store = MockStore::new()
            .with_transfer_chunks(vec![512])
            .with_transfer_error("connection reset");
        let browser = browser_for(store);

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("partial.bin");

        let result =
            browser.download_object(&params(), "bucket", "partial.bin", &destination, None, None);

        assert!(matches!(result, Err(model::BrowseError::Transport(_))));
    }

    #[test]
    fn test_upload_object_reports_progress() {
        let store = MockStore::new().with_transfer_chunks(vec![512, 512, 256]);
        let inspect = store.clone();
        let browser = browser_for(store);

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        std::fs::write(&source, b"contents").unwrap();

        let reported = RefCell::new(Vec::new());
        let mut progress = |total: u64| reported.borrow_mut().push(total);

        browser
            .upload_object(
                &params(),
                "bucket",
                "notes.txt",
                &source,
                None,
                Some(&mut progress),
                None,
            )
            .unwrap();

        assert_eq!(reported.into_inner(), vec![512, 1024, 1280]);

        let recorded = inspect.recorded();
        assert_eq!(recorded.uploads.len(), 1);
        assert_eq!(recorded.uploads[0].key, "notes.txt");
        assert_eq!(recorded.uploads[0].tuning, TransferTuning::default());
    }

    #[test]
    fn test_upload_object_sanitizes_tuning() {
        let store = MockStore::new();
        let inspect = store.clone();
        let browser = browser_for(store);

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        std::fs::write(&source, b"contents").unwrap();

        browser
            .upload_object(
                &params(),
                "bucket",
                "notes.txt",
                &source,
                Some(TransferTuning {
                    multipart_threshold: 0,
                    multipart_chunk_size: -1,
                    max_concurrency: 0,
                }),
                None,
                None,
            )
            .unwrap();
        browser
            .upload_object(
                &params(),
                "bucket",
                "notes.txt",
                &source,
                Some(TransferTuning {
                    multipart_threshold: 1024,
                    multipart_chunk_size: 2048,
                    max_concurrency: 2,
                }),
                None,
                None,
            )
            .unwrap();

        let recorded = inspect.recorded();
        assert_eq!(recorded.uploads[0].tuning, TransferTuning::default());
        assert_eq!(
            recorded.uploads[1].tuning,
            TransferTuning {
                multipart_threshold: 1024,
                multipart_chunk_size: 2048,
                max_concurrency: 2,
            }
        );
    }

    #[test]
    fn test_upload_object_cancelled_before_first_chunk() {
        let store = MockStore::new().with_transfer_chunks(vec![512, 512]);
        let inspect = store.clone();
        let browser = browser_for(store);

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        std::fs::write(&source, b"contents").unwrap();

        let reported = RefCell::new(Vec::new());
        let mut progress = |total: u64| reported.borrow_mut().push(total);
        let cancel = || true;

        let result = browser.upload_object(
            &params(),
            "bucket",
            "notes.txt",
            &source,
            None,
            Some(&mut progress),
            Some(&cancel),
        );

        assert!(matches!(result, Err(model::BrowseError::Cancelled)));
        assert!(reported.into_inner().is_empty());
        assert_eq!(inspect.recorded().uploads.len(), 1);
    }

    #[test]
    fn test_delete_object() {
        let store = MockStore::new();
        let inspect = store.clone();
        let browser = browser_for(store);

        browser
            .delete_object(&params(), "bucket", "old/file.txt")
            .unwrap();

        assert_eq!(
            inspect.recorded().deletes,
            vec![("bucket".to_string(), "old/file.txt".to_string())]
        );
    }

    #[test]
    fn test_presign_get_url() {
        let store = MockStore::new().with_presigned_url("https://example.com/signed?sig=1");
        let inspect = store.clone();
        let browser = browser_for(store);

        let request = PresignRequest::new("bucket", "docs/report.txt", PresignMethod::Get)
            .with_expires_in(Duration::from_secs(600))
            .with_content_disposition("attachment");

        let result = browser
            .generate_presigned_access(&params(), &request)
            .unwrap();

        assert_eq!(result.url(), "https://example.com/signed?sig=1");

        let recorded = inspect.recorded();
        assert_eq!(recorded.presign_urls.len(), 1);
        assert_eq!(recorded.presign_urls[0].method, "GET");
        assert_eq!(recorded.presign_urls[0].expires_in, 600);
        assert_eq!(
            recorded.presign_urls[0].content_disposition,
            Some("attachment".to_string())
        );
    }

    #[test]
    fn test_presign_put_url() {
        let store = MockStore::new();
        let inspect = store.clone();
        let browser = browser_for(store);

        let request = PresignRequest::new("bucket", "incoming/data.bin", PresignMethod::Put)
            .with_content_type("application/octet-stream");

        browser
            .generate_presigned_access(&params(), &request)
            .unwrap();

        let recorded = inspect.recorded();
        assert_eq!(recorded.presign_urls[0].method, "PUT");
        assert_eq!(
            recorded.presign_urls[0].content_type,
            Some("application/octet-stream".to_string())
        );
    }

    #[test]
    fn test_presign_post_form() {
        let store = MockStore::new().with_post_url("https://example.com/bucket");
        let inspect = store.clone();
        let browser = browser_for(store);

        let request = PresignRequest::new("bucket", "uploads/", PresignMethod::Post)
            .with_post_key_mode(PostKeyMode::Prefix)
            .with_max_size(10485760);

        let result = browser
            .generate_presigned_access(&params(), &request)
            .unwrap();

        let form = match result {
            presign::PresignedResult::Form(form) => form,
            presign::PresignedResult::Url(url) => panic!("expected form, got url: {}", url),
        };
        assert_eq!(form.url, "https://example.com/bucket");
        assert_eq!(form.fields["key"], "uploads/${filename}");

        let recorded = inspect.recorded();
        assert_eq!(recorded.post_policies.len(), 1);
        assert_eq!(recorded.post_policies[0].0, "bucket");
        assert!(recorded.post_policies[0]
            .1
            .conditions
            .contains(&PostCondition::StartsWith {
                field: "key".to_string(),
                prefix: "uploads/".to_string(),
            }));
        assert!(recorded.post_policies[0]
            .1
            .conditions
            .contains(&PostCondition::ContentLengthRange {
                min: 0,
                max: 10485760,
            }));
    }

    #[test]
    fn test_presign_validates_before_connect() {
        let connected = Arc::new(AtomicBool::new(false));
        let flag = connected.clone();
        let browser = S3Browser::with_factory(Box::new(move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(Box::new(MockStore::new()))
        }));

        let request = PresignRequest::new("", "file.txt", PresignMethod::Get);
        let result = browser.generate_presigned_access(&params(), &request);

        assert!(matches!(result, Err(model::BrowseError::Validation(_))));
        assert!(!connected.load(Ordering::SeqCst));
    }
}
