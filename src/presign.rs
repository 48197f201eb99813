use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

use crate::model;

pub const DEFAULT_EXPIRES_IN: Duration = Duration::from_secs(3600);
pub const MAX_EXPIRES_IN: Duration = Duration::from_secs(7 * 24 * 3600);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PresignMethod {
    Get,
    Put,
    Post,
}

impl FromStr for PresignMethod {
    type Err = model::BrowseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(PresignMethod::Get),
            "put" => Ok(PresignMethod::Put),
            "post" => Ok(PresignMethod::Post),
            other => Err(model::BrowseError::Validation(format!(
                "unsupported presign method: {}",
                other
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PostKeyMode {
    SingleObject,
    Prefix,
}

impl FromStr for PostKeyMode {
    type Err = model::BrowseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "object" => Ok(PostKeyMode::SingleObject),
            "prefix" => Ok(PostKeyMode::Prefix),
            other => Err(model::BrowseError::Validation(format!(
                "unsupported post key mode: {}",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PresignRequest {
    pub bucket: String,
    pub key: String,
    pub method: PresignMethod,
    pub expires_in: Duration,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub post_key_mode: PostKeyMode,
    pub max_size: Option<i64>,
}

impl PresignRequest {
    pub fn new(bucket: &str, key: &str, method: PresignMethod) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            method,
            expires_in: DEFAULT_EXPIRES_IN,
            content_type: None,
            content_disposition: None,
            post_key_mode: PostKeyMode::SingleObject,
            max_size: None,
        }
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in;
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_content_disposition(mut self, content_disposition: &str) -> Self {
        self.content_disposition = Some(content_disposition.to_string());
        self
    }

    pub fn with_post_key_mode(mut self, post_key_mode: PostKeyMode) -> Self {
        self.post_key_mode = post_key_mode;
        self
    }

    pub fn with_max_size(mut self, max_size: i64) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PostCondition {
    Exact { field: String, value: String },
    StartsWith { field: String, prefix: String },
    ContentLengthRange { min: i64, max: i64 },
}

impl PostCondition {
    pub fn to_policy_value(&self) -> Value {
        match self {
            PostCondition::Exact { field, value } => {
                json!(["eq", format!("${}", field), value])
            }
            PostCondition::StartsWith { field, prefix } => {
                json!(["starts-with", format!("${}", field), prefix])
            }
            PostCondition::ContentLengthRange { min, max } => {
                json!(["content-length-range", min, max])
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PostPolicy {
    pub fields: Vec<(String, String)>,
    pub conditions: Vec<PostCondition>,
    pub expires_in: Duration,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PresignedPost {
    pub url: String,
    pub fields: HashMap<String, String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PresignedResult {
    Url(String),
    Form(PresignedPost),
}

impl PresignedResult {
    pub fn url(&self) -> &str {
        match self {
            PresignedResult::Url(url) => url,
            PresignedResult::Form(form) => &form.url,
        }
    }
}

pub fn validate(request: &PresignRequest) -> Result<(), model::BrowseError> {
    if request.bucket.trim().is_empty() {
        return Err(model::BrowseError::Validation(
            "bucket name must not be empty".to_string(),
        ));
    }
    if request.expires_in.is_zero() {
        return Err(model::BrowseError::Validation(
            "expiry must be positive".to_string(),
        ));
    }
    if request.expires_in > MAX_EXPIRES_IN {
        return Err(model::BrowseError::Validation(
            "expiry must not exceed seven days".to_string(),
        ));
    }

    let key_optional =
        request.method == PresignMethod::Post && request.post_key_mode == PostKeyMode::Prefix;
    if request.key.trim().is_empty() && !key_optional {
        return Err(model::BrowseError::Validation(
            "object key must not be empty".to_string(),
        ));
    }

    if request.method == PresignMethod::Post && request.max_size.unwrap_or(0) <= 0 {
        return Err(model::BrowseError::Validation(
            "max size must be positive".to_string(),
        ));
    }

    Ok(())
}

pub fn build_post_policy(request: &PresignRequest) -> PostPolicy {
    let mut fields = Vec::new();
    let mut conditions = Vec::new();

    match request.post_key_mode {
        PostKeyMode::SingleObject => {
            let key = request.key.trim().to_string();
            conditions.push(PostCondition::Exact {
                field: "key".to_string(),
                value: key.clone(),
            });
            fields.push(("key".to_string(), key));
        }
        PostKeyMode::Prefix => {
            let trimmed = request.key.trim().trim_end_matches('/');
            let (key, prefix) = if trimmed.is_empty() {
                ("${filename}".to_string(), String::new())
            } else {
                (format!("{}/${{filename}}", trimmed), format!("{}/", trimmed))
            };
            conditions.push(PostCondition::StartsWith {
                field: "key".to_string(),
                prefix,
            });
            fields.push(("key".to_string(), key));
        }
    }

    if let Some(content_type) = &request.content_type {
        conditions.push(PostCondition::Exact {
            field: "Content-Type".to_string(),
            value: content_type.clone(),
        });
        fields.push(("Content-Type".to_string(), content_type.clone()));
    }

    if let Some(max_size) = request.max_size {
        conditions.push(PostCondition::ContentLengthRange {
            min: 0,
            max: max_size,
        });
    }

    PostPolicy {
        fields,
        conditions,
        expires_in: request.expires_in,
    }
}
