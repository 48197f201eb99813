use std::{collections::HashMap, time::SystemTime};

use serde::{Deserialize, Serialize};

pub const DEFAULT_MULTIPART_THRESHOLD: i64 = 8 * 1024 * 1024;
pub const DEFAULT_MULTIPART_CHUNK_SIZE: i64 = 8 * 1024 * 1024;
pub const DEFAULT_MAX_CONCURRENCY: i64 = 10;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ConnectionParams {
    pub endpoint_url: String,
    pub access_key: String,
    pub secret_key: String,
}

impl ConnectionParams {
    pub fn new(endpoint_url: &str, access_key: &str, secret_key: &str) -> Self {
        Self {
            endpoint_url: endpoint_url.to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ObjectDetails {
    pub bucket: String,
    pub key: String,
    pub size: Option<i64>,
    pub last_modified: Option<SystemTime>,
    pub storage_class: Option<String>,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
    pub checksums: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadObjectResponse {
    pub content_length: Option<i64>,
    pub last_modified: Option<SystemTime>,
    pub storage_class: Option<String>,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
    pub checksum_crc32: Option<String>,
    pub checksum_crc32c: Option<String>,
    pub checksum_sha1: Option<String>,
    pub checksum_sha256: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct TransferTuning {
    pub multipart_threshold: i64,
    pub multipart_chunk_size: i64,
    pub max_concurrency: i64,
}

impl TransferTuning {
    pub fn sanitized(&self) -> TransferTuning {
        TransferTuning {
            multipart_threshold: positive_or(self.multipart_threshold, DEFAULT_MULTIPART_THRESHOLD),
            multipart_chunk_size: positive_or(
                self.multipart_chunk_size,
                DEFAULT_MULTIPART_CHUNK_SIZE,
            ),
            max_concurrency: positive_or(self.max_concurrency, DEFAULT_MAX_CONCURRENCY),
        }
    }
}

impl Default for TransferTuning {
    fn default() -> Self {
        Self {
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
            multipart_chunk_size: DEFAULT_MULTIPART_CHUNK_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

fn positive_or(value: i64, fallback: i64) -> i64 {
    if value > 0 {
        value
    } else {
        fallback
    }
}
