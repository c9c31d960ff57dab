use leon::{ParseError, RenderError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Terminal error: {}", _0)]
    Stdio(#[from] std::io::Error),

    #[error("Error {} {} file at `{}`: {}", .action, .file_description, .path, .original)]
    Yaml {
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    },

    #[error("IO error with {} file at path `{}`: {}", .file_description, .path, .original)]
    Io {
        file_description: String,
        path: String,
        original: std::io::Error,
    },

    #[error("Error parsing path template: {}", .0)]
    Parse(#[from] ParseError),

    #[error("Error rendering path template: {}", .0)]
    Render(#[from] RenderError),

    #[error("HTTP error: {}", .0)]
    Http(#[from] reqwest::Error),

    #[error("API error ({}): {}", .status, .body)]
    Api { status: u16, body: String },

    #[error("Invalid JSON: {}", .0)]
    Json(#[from] serde_json::Error),

    #[error("No organization configured. Set `api.org` in the config or pass `--org`.")]
    MissingOrg,

    #[error("{}", .0)]
    Cancelled(String),

    #[error("EOF")]
    Eof,

    #[error("no items to select from")]
    NoItemsToSelect,

    #[error("no {} available", .0)]
    NoItems(String),

    #[error("no {} matching {:?} found", .resource, .query)]
    NoMatch { resource: String, query: String },

    #[error("selected item not found")]
    SelectedNotFound,

    #[error("no fetcher registered for {}", .0)]
    NoFetcher(String),

    #[error("Unknown resource kind: `{}`", .0)]
    UnknownResourceKind(String),

    #[error("no login method configured (set auth.oidc or auth.api_key in the config)")]
    LoginUnavailable,

    #[error("login failed: {}", .0)]
    Login(String),

    #[error("Misc error: {}", .0)]
    Misc(String),
}

impl Error {
    pub fn yaml_error(
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    ) -> Self {
        Self::Yaml {
            action,
            file_description,
            path,
            original,
        }
    }

    pub fn io_error(file_description: String, path: String, original: std::io::Error) -> Self {
        Self::Io {
            file_description,
            path,
            original,
        }
    }

    pub fn no_match(resource: &str, query: &str) -> Self {
        Self::NoMatch {
            resource: resource.to_string(),
            query: query.to_string(),
        }
    }

    /// True for errors produced by the user aborting a prompt or widget.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_) | Self::Eof)
    }

    /// HTTP status of an upstream API failure, if this is one.
    #[must_use]
    pub fn api_status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_messages() {
        assert_eq!(Error::NoItemsToSelect.to_string(), "no items to select from");
        assert_eq!(Error::NoItems("VPC".into()).to_string(), "no VPC available");
        assert_eq!(
            Error::no_match("vpc", "prod").to_string(),
            "no vpc matching \"prod\" found"
        );
        assert_eq!(
            Error::SelectedNotFound.to_string(),
            "selected item not found"
        );
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(Error::Cancelled("selection cancelled".into()).is_cancellation());
        assert!(Error::Eof.is_cancellation());
        assert!(!Error::SelectedNotFound.is_cancellation());
    }

    #[test]
    fn test_api_status() {
        let e = Error::Api {
            status: 400,
            body: "bad".into(),
        };
        assert_eq!(e.api_status(), Some(400));
        assert_eq!(Error::Eof.api_status(), None);
    }
}
