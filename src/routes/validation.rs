use url::Url;

use crate::error::ServiceError;

pub fn validate_http_url(raw: &str) -> Result<Url, ServiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation("url must not be empty".to_string()));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|err| ServiceError::Validation(format!("invalid url: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ServiceError::Validation(format!(
            "unsupported url scheme: {scheme}"
        ))),
    }
}
