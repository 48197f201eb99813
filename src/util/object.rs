use crate::model;

pub fn compose_key(prefix: &str, name: &str) -> Result<String, model::BrowseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(model::BrowseError::Validation(
            "object name must not be empty".to_string(),
        ));
    }

    let prefix = prefix.trim().trim_start_matches('/');
    if prefix.is_empty() {
        return Ok(name.to_string());
    }

    return if prefix.ends_with('/') {
        Ok(format!("{}{}", prefix, name))
    } else {
        Ok(format!("{}/{}", prefix, name))
    };
}

pub fn suggest_download_filename(key: &str) -> String {
    let trimmed = key.trim().trim_end_matches('/');
    let candidate = trimmed.rsplit('/').next().unwrap_or("");

    if candidate.is_empty() {
        "local-file".to_string()
    } else {
        candidate.to_string()
    }
}
