use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ObjectPage {
    pub page_number: u32,
    pub keys: Vec<String>,
    pub prefixes: Vec<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BucketListing {
    pub name: String,
    pub prefix: String,
    pub delimiter: String,
    pub pages: Vec<ObjectPage>,
    pub error: Option<String>,
    pub has_more: bool,
    pub continuation_token: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListOptions {
    pub max_keys: i64,
    pub prefix: String,
    pub delimiter: String,
    pub continuation_token: Option<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self {
            max_keys: 10,
            prefix: String::new(),
            delimiter: "/".to_string(),
            continuation_token: None,
        }
    }

    pub fn with_max_keys(mut self, max_keys: i64) -> Self {
        self.max_keys = max_keys;
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = delimiter.to_string();
        self
    }

    pub fn with_continuation_token(mut self, token: &str) -> Self {
        self.continuation_token = Some(token.to_string());
        self
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageRequest {
    pub bucket: String,
    pub max_keys: i32,
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub continuation_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageResponse {
    pub keys: Vec<String>,
    pub prefixes: Vec<String>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}
