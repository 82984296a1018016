use thiserror::Error;

/// Errors returned by remote API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-success status.
    #[error("HTTP {code} from {url}: {message}")]
    Status {
        code: u16,
        url: String,
        message: String,
    },

    /// The request never got a response (DNS, TLS, timeout, ...).
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The response body was not the JSON we expected.
    #[error("invalid response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { code: 404, .. })
    }

    pub(crate) fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => {
                let message = response
                    .into_json::<serde_json::Value>()
                    .ok()
                    .and_then(|body| body.get("message")?.as_str().map(str::to_string))
                    .unwrap_or_else(|| "no message".to_string());
                ApiError::Status {
                    code,
                    url: url.to_string(),
                    message,
                }
            }
            ureq::Error::Transport(e) => ApiError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            },
        }
    }
}
