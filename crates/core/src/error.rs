use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not logged in")]
    NotLoggedIn,

    #[error("unknown catalog: {0}")]
    UnknownCatalog(String),

    #[error("unknown album: {0}")]
    UnknownAlbum(String),

    #[error("unknown tag: {0}")]
    UnknownTag(String),

    #[error("unknown person: {0}")]
    UnknownPerson(String),

    #[error("unknown saved search: {0}")]
    UnknownSearch(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Discriminant of an [`Error`], for callers that branch on the failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    NotLoggedIn,
    UnknownCatalog,
    UnknownAlbum,
    UnknownTag,
    UnknownPerson,
    UnknownSearch,
    InvalidQuery,
    Json,
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotLoggedIn => ErrorCode::NotLoggedIn,
            Error::UnknownCatalog(_) => ErrorCode::UnknownCatalog,
            Error::UnknownAlbum(_) => ErrorCode::UnknownAlbum,
            Error::UnknownTag(_) => ErrorCode::UnknownTag,
            Error::UnknownPerson(_) => ErrorCode::UnknownPerson,
            Error::UnknownSearch(_) => ErrorCode::UnknownSearch,
            Error::InvalidQuery(_) => ErrorCode::InvalidQuery,
            Error::Json(_) => ErrorCode::Json,
        }
    }

    /// True for the failures `safe_from_state` turns into `None`.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Error::NotLoggedIn
                | Error::UnknownCatalog(_)
                | Error::UnknownAlbum(_)
                | Error::UnknownTag(_)
                | Error::UnknownPerson(_)
                | Error::UnknownSearch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
