use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ChecksumAlgorithm, ChecksumMode, CompletedMultipartUpload, CompletedPart};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::pin_mut;
use futures::stream::TryStreamExt;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::io::AsyncReadExt;

use crate::{adapters, model, presign, transfer};

pub const SIGNING_REGION: &str = "us-east-1";
pub const UPLOAD_MARKER_KEY: &str = "s3browse-upload";

const AMZ_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");
const DATE_STAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]");
const EXPIRATION_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

type HmacSha256 = Hmac<Sha256>;

pub struct S3Store {
    client: aws_sdk_s3::Client,
    runtime: tokio::runtime::Runtime,
    endpoint_url: String,
    access_key: String,
    secret_key: String,
}

impl S3Store {
    pub fn connect(
        params: &model::object::ConnectionParams,
    ) -> Result<S3Store, model::BrowseError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| {
                model::BrowseError::Transport(format!("failed to start runtime, {}", err))
            })?;

        let credentials = aws_sdk_s3::config::Credentials::new(
            &params.access_key,
            &params.secret_key,
            None,
            None,
            "s3browse",
        );
        let config = runtime.block_on(
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .endpoint_url(&params.endpoint_url)
                .region(aws_config::Region::new(SIGNING_REGION))
                .credentials_provider(credentials)
                .load(),
        );
        let client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::config::Builder::from(&config)
                .force_path_style(true)
                .build(),
        );

        Ok(S3Store {
            client,
            runtime,
            endpoint_url: params.endpoint_url.trim_end_matches('/').to_string(),
            access_key: params.access_key.clone(),
            secret_key: params.secret_key.clone(),
        })
    }

    fn upload_single(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        size: u64,
        mut on_chunk: Option<&mut transfer::ChunkFn>,
    ) -> Result<(), model::BrowseError> {
        let body = self
            .runtime
            .block_on(ByteStream::from_path(source))
            .map_err(|err| {
                model::BrowseError::Transport(format!(
                    "failed to open file at: {}, {}",
                    source.display(),
                    err
                ))
            })?;

        let req = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .checksum_algorithm(ChecksumAlgorithm::Sha256)
            .metadata(UPLOAD_MARKER_KEY, "true");

        self.runtime.block_on(req.send()).map_err(|err| {
            model::BrowseError::Transport(format!(
                "failed to put_object at: {}, {}",
                key,
                err.to_string()
            ))
        })?;

        if let Some(on_chunk) = on_chunk.as_mut() {
            on_chunk(size)?;
        }

        Ok(())
    }

    fn upload_multipart(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        size: u64,
        tuning: model::object::TransferTuning,
        mut on_chunk: Option<&mut transfer::ChunkFn>,
    ) -> Result<(), model::BrowseError> {
        let create = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .checksum_algorithm(ChecksumAlgorithm::Sha256)
            .metadata(UPLOAD_MARKER_KEY, "true");

        let cmu = self.runtime.block_on(create.send()).map_err(|err| {
            model::BrowseError::Transport(format!(
                "failed to create_multipart_upload at: {}, {}",
                key,
                err.to_string()
            ))
        })?;

        let upload_id = match cmu.upload_id() {
            Some(id) => id.to_string(),
            None => {
                return Err(model::BrowseError::Transport(format!(
                    "failed to create_multipart_upload at: {}, missing upload id",
                    key
                )))
            }
        };

        match self.upload_parts(bucket, key, &upload_id, source, size, tuning, &mut on_chunk) {
            Ok(parts) => {
                let completed = CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build();
                let req = self
                    .client
                    .complete_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(completed);

                self.runtime.block_on(req.send()).map_err(|err| {
                    model::BrowseError::Transport(format!(
                        "failed to complete_multipart_upload at: {}, {}",
                        key,
                        err.to_string()
                    ))
                })?;

                Ok(())
            }
            Err(err) => {
                let abort = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id);
                let _ = self.runtime.block_on(abort.send());

                Err(err)
            }
        }
    }

    fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        source: &Path,
        size: u64,
        tuning: model::object::TransferTuning,
        on_chunk: &mut Option<&mut transfer::ChunkFn>,
    ) -> Result<Vec<CompletedPart>, model::BrowseError> {
        let chunk_size = tuning.multipart_chunk_size as u64;
        let concurrency = tuning.max_concurrency as usize;

        self.runtime.block_on(async {
            let file = tokio::fs::File::open(source).await.map_err(|err| {
                model::BrowseError::Transport(format!(
                    "failed to open file at: {}, {}",
                    source.display(),
                    err
                ))
            })?;

            let chunks = futures::stream::try_unfold(
                (file, 1_i32, 0_u64),
                move |(mut file, part_number, offset)| async move {
                    if offset >= size {
                        return Ok(None);
                    }

                    let len = chunk_size.min(size - offset) as usize;
                    let mut buf = vec![0_u8; len];
                    file.read_exact(&mut buf).await.map_err(|err| {
                        model::BrowseError::Transport(format!(
                            "failed to read part {}, {}",
                            part_number, err
                        ))
                    })?;

                    Ok(Some((
                        (part_number, buf),
                        (file, part_number + 1, offset + len as u64),
                    )))
                },
            );

            let uploads = chunks.map_ok(|(part_number, buf)| {
                let client = self.client.clone();
                let bucket = bucket.to_string();
                let key = key.to_string();
                let upload_id = upload_id.to_string();

                async move {
                    let len = buf.len() as u64;
                    let up = client
                        .upload_part()
                        .bucket(&bucket)
                        .key(&key)
                        .upload_id(&upload_id)
                        .part_number(part_number)
                        .checksum_algorithm(ChecksumAlgorithm::Sha256)
                        .body(ByteStream::from(buf))
                        .send()
                        .await
                        .map_err(|err| {
                            model::BrowseError::Transport(format!(
                                "failed to upload_part {} at: {}, {}",
                                part_number,
                                key,
                                err.to_string()
                            ))
                        })?;

                    Ok::<(i32, u64, Option<String>, Option<String>), model::BrowseError>((
                        part_number,
                        len,
                        up.e_tag().map(|tag| tag.to_string()),
                        up.checksum_sha256().map(|sum| sum.to_string()),
                    ))
                }
            });

            let completed = uploads.try_buffered(concurrency);
            pin_mut!(completed);

            let mut parts = Vec::new();
            while let Some((part_number, len, e_tag, checksum)) = completed.try_next().await? {
                if let Some(on_chunk) = on_chunk.as_mut() {
                    on_chunk(len)?;
                }

                let mut part = CompletedPart::builder().part_number(part_number);
                if let Some(tag) = e_tag {
                    part = part.e_tag(tag);
                }
                if let Some(sum) = checksum {
                    part = part.checksum_sha256(sum);
                }
                parts.push(part.build());
            }

            Ok(parts)
        })
    }
}

impl adapters::ObjectStore for S3Store {
    fn list_buckets(&self) -> Result<Vec<String>, model::BrowseError> {
        let req = self.client.list_buckets();

        let lb = self.runtime.block_on(req.send()).map_err(|err| {
            model::BrowseError::Transport(format!("failed to list_buckets, {}", err.to_string()))
        })?;

        let mut buckets = Vec::new();
        for b in lb.buckets() {
            if let Some(name) = b.name() {
                buckets.push(name.to_string());
            }
        }

        Ok(buckets)
    }

    fn list_objects_page(
        &self,
        request: &model::listing::PageRequest,
    ) -> Result<model::listing::PageResponse, model::BrowseError> {
        let mut req = self
            .client
            .list_objects_v2()
            .bucket(&request.bucket)
            .max_keys(request.max_keys);

        if let Some(prefix) = &request.prefix {
            req = req.prefix(prefix);
        }
        if let Some(delimiter) = &request.delimiter {
            req = req.delimiter(delimiter);
        }
        if let Some(tok) = &request.continuation_token {
            req = req.continuation_token(tok);
        }

        let lo = self.runtime.block_on(req.send()).map_err(|err| {
            model::BrowseError::Transport(format!(
                "failed to list_objects at: {}, {}",
                request.bucket,
                err.to_string()
            ))
        })?;

        let mut keys = Vec::new();
        for o in lo.contents() {
            if let Some(key) = o.key() {
                keys.push(key.to_string());
            }
        }

        let mut prefixes = Vec::new();
        for p in lo.common_prefixes() {
            if let Some(prefix) = p.prefix() {
                prefixes.push(prefix.to_string());
            }
        }

        Ok(model::listing::PageResponse {
            keys,
            prefixes,
            is_truncated: lo.is_truncated().unwrap_or(false),
            next_continuation_token: lo.next_continuation_token().map(|tok| tok.to_string()),
        })
    }

    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<model::object::HeadObjectResponse, model::BrowseError> {
        let req = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .checksum_mode(ChecksumMode::Enabled);

        let ho = self.runtime.block_on(req.send()).map_err(|err| {
            model::BrowseError::Transport(format!(
                "failed to head_object: {}, {}",
                key,
                err.to_string()
            ))
        })?;

        Ok(model::object::HeadObjectResponse {
            content_length: ho.content_length(),
            last_modified: ho.last_modified().map(to_system_time),
            storage_class: ho.storage_class().map(|sc| sc.as_str().to_string()),
            etag: ho.e_tag().map(|tag| tag.to_string()),
            content_type: ho.content_type().map(|ct| ct.to_string()),
            metadata: ho.metadata().cloned().unwrap_or_default(),
            checksum_crc32: ho.checksum_crc32().map(|sum| sum.to_string()),
            checksum_crc32c: ho.checksum_crc32_c().map(|sum| sum.to_string()),
            checksum_sha1: ho.checksum_sha1().map(|sum| sum.to_string()),
            checksum_sha256: ho.checksum_sha256().map(|sum| sum.to_string()),
        })
    }

    fn download_file(
        &self,
        bucket: &str,
        key: &str,
        destination: &Path,
        mut on_chunk: Option<&mut transfer::ChunkFn>,
    ) -> Result<(), model::BrowseError> {
        let req = self.client.get_object().bucket(bucket).key(key);

        let mut o = self.runtime.block_on(req.send()).map_err(|err| {
            model::BrowseError::Transport(format!(
                "failed to get_object: {}, {}",
                key,
                err.to_string()
            ))
        })?;

        let file = File::create(destination).map_err(|err| {
            model::BrowseError::Transport(format!(
                "failed to create file at: {}, {}",
                destination.display(),
                err
            ))
        })?;
        let mut writer = BufWriter::new(file);

        while let Some(bytes) = self.runtime.block_on(o.body.try_next()).map_err(|err| {
            model::BrowseError::Transport(format!(
                "failed to read body: {}, {}",
                key,
                err.to_string()
            ))
        })? {
            writer.write_all(&bytes).map_err(|err| {
                model::BrowseError::Transport(format!(
                    "failed to write to: {}, {}",
                    destination.display(),
                    err
                ))
            })?;

            if let Some(on_chunk) = on_chunk.as_mut() {
                on_chunk(bytes.len() as u64)?;
            }
        }

        writer.flush().map_err(|err| {
            model::BrowseError::Transport(format!(
                "failed to write to: {}, {}",
                destination.display(),
                err
            ))
        })?;

        Ok(())
    }

    fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        tuning: model::object::TransferTuning,
        on_chunk: Option<&mut transfer::ChunkFn>,
    ) -> Result<(), model::BrowseError> {
        let size = std::fs::metadata(source)
            .map_err(|err| {
                model::BrowseError::Transport(format!(
                    "failed to read metadata at: {}, {}",
                    source.display(),
                    err
                ))
            })?
            .len();

        if (size as i64) < tuning.multipart_threshold {
            self.upload_single(bucket, key, source, size, on_chunk)
        } else {
            self.upload_multipart(bucket, key, source, size, tuning, on_chunk)
        }
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), model::BrowseError> {
        let req = self.client.delete_object().bucket(bucket).key(key);

        self.runtime.block_on(req.send()).map_err(|err| {
            model::BrowseError::Transport(format!(
                "failed to delete_object at: {}, {}",
                key,
                err.to_string()
            ))
        })?;

        Ok(())
    }

    fn presign_get_object(
        &self,
        request: &presign::PresignRequest,
    ) -> Result<String, model::BrowseError> {
        let config = PresigningConfig::expires_in(request.expires_in).map_err(|err| {
            model::BrowseError::Validation(format!("failed to build presigning config, {}", err))
        })?;

        let mut req = self
            .client
            .get_object()
            .bucket(&request.bucket)
            .key(&request.key);

        if let Some(content_type) = &request.content_type {
            req = req.response_content_type(content_type);
        }
        if let Some(content_disposition) = &request.content_disposition {
            req = req.response_content_disposition(content_disposition);
        }

        let presigned = self.runtime.block_on(req.presigned(config)).map_err(|err| {
            model::BrowseError::Transport(format!(
                "failed to presign get_object at: {}, {}",
                request.key,
                err.to_string()
            ))
        })?;

        Ok(presigned.uri().to_string())
    }

    fn presign_put_object(
        &self,
        request: &presign::PresignRequest,
    ) -> Result<String, model::BrowseError> {
        let config = PresigningConfig::expires_in(request.expires_in).map_err(|err| {
            model::BrowseError::Validation(format!("failed to build presigning config, {}", err))
        })?;

        let mut req = self
            .client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key);

        if let Some(content_type) = &request.content_type {
            req = req.content_type(content_type);
        }
        if let Some(content_disposition) = &request.content_disposition {
            req = req.content_disposition(content_disposition);
        }

        let presigned = self.runtime.block_on(req.presigned(config)).map_err(|err| {
            model::BrowseError::Transport(format!(
                "failed to presign put_object at: {}, {}",
                request.key,
                err.to_string()
            ))
        })?;

        Ok(presigned.uri().to_string())
    }

    fn presign_post_form(
        &self,
        bucket: &str,
        policy: &presign::PostPolicy,
    ) -> Result<presign::PresignedPost, model::BrowseError> {
        let url = format!("{}/{}", self.endpoint_url, bucket);

        build_post_form(
            &url,
            bucket,
            policy,
            &self.access_key,
            &self.secret_key,
            OffsetDateTime::now_utc(),
        )
    }
}

fn to_system_time(ts: &aws_sdk_s3::primitives::DateTime) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::new(ts.secs() as u64, ts.subsec_nanos())
}

fn build_post_form(
    url: &str,
    bucket: &str,
    policy: &presign::PostPolicy,
    access_key: &str,
    secret_key: &str,
    now: OffsetDateTime,
) -> Result<presign::PresignedPost, model::BrowseError> {
    let amz_date = now.format(AMZ_DATE_FORMAT).map_err(|err| {
        model::BrowseError::Transport(format!("failed to format timestamp, {}", err))
    })?;
    let date_stamp = now.format(DATE_STAMP_FORMAT).map_err(|err| {
        model::BrowseError::Transport(format!("failed to format timestamp, {}", err))
    })?;
    let expiration = (now + policy.expires_in)
        .format(EXPIRATION_FORMAT)
        .map_err(|err| {
            model::BrowseError::Transport(format!("failed to format timestamp, {}", err))
        })?;

    let credential = format!(
        "{}/{}/{}/s3/aws4_request",
        access_key, date_stamp, SIGNING_REGION
    );

    let mut conditions = vec![json!({ "bucket": bucket })];
    for condition in &policy.conditions {
        conditions.push(condition.to_policy_value());
    }
    conditions.push(json!({ "x-amz-algorithm": "AWS4-HMAC-SHA256" }));
    conditions.push(json!({ "x-amz-credential": credential }));
    conditions.push(json!({ "x-amz-date": amz_date }));

    let document = json!({
        "expiration": expiration,
        "conditions": conditions,
    });
    let encoded = STANDARD.encode(document.to_string());
    let signature = sign_policy(secret_key, &date_stamp, &encoded)?;

    let mut fields = HashMap::new();
    for (name, value) in &policy.fields {
        fields.insert(name.clone(), value.clone());
    }
    fields.insert("policy".to_string(), encoded);
    fields.insert(
        "x-amz-algorithm".to_string(),
        "AWS4-HMAC-SHA256".to_string(),
    );
    fields.insert("x-amz-credential".to_string(), credential);
    fields.insert("x-amz-date".to_string(), amz_date);
    fields.insert("x-amz-signature".to_string(), signature);

    Ok(presign::PresignedPost {
        url: url.to_string(),
        fields,
    })
}

fn sign_policy(
    secret_key: &str,
    date_stamp: &str,
    encoded_policy: &str,
) -> Result<String, model::BrowseError> {
    let mut key = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes())?;
    key = hmac_sha256(&key, SIGNING_REGION.as_bytes())?;
    key = hmac_sha256(&key, b"s3")?;
    key = hmac_sha256(&key, b"aws4_request")?;

    let signature = hmac_sha256(&key, encoded_policy.as_bytes())?;
    Ok(hex::encode(signature))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, model::BrowseError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|err| {
        model::BrowseError::Transport(format!("failed to build signing key, {}", err))
    })?;
    mac.update(data);

    Ok(mac.finalize().into_bytes().to_vec())
}
