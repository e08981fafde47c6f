//! Opaque page tokens.
//!
//! A token is `base64(json({offset, filter}))`. The offset counts scanned
//! rows, matching or not, so resuming never loses a sparse match. The filter
//! is bound into the token so a caller cannot change it mid-listing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Paging parameters of a List request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageOptions {
    /// 0 selects the default size; negative sizes are rejected.
    pub page_size: i32,
    /// Empty for the first page.
    pub page_token: String,
    /// Empty matches everything.
    pub filter: String,
}

impl PageOptions {
    /// First-page options; a `page_size` of 0 means the configured default.
    pub fn new(page_size: i32) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Set the filter expression.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Continue from a previous page token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = token.into();
        self
    }
}

/// One page of results. An empty `next_page_token` means there are no more.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: String,
}

impl<T> Page<T> {
    /// Convert the items, keeping the token.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_page_token: self.next_page_token,
        }
    }

    /// True when no further page follows.
    pub fn is_last(&self) -> bool {
        self.next_page_token.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Cursor {
    pub offset: i64,
    pub filter: String,
}

impl Cursor {
    /// Resume position for a request: offset 0 for an empty token, otherwise
    /// the decoded token, which must carry the request's filter.
    pub fn apply(token: &str, filter: &str) -> RegistryResult<Self> {
        if token.is_empty() {
            return Ok(Self {
                offset: 0,
                filter: filter.to_string(),
            });
        }
        let cursor = Self::decode(token)
            .ok_or_else(|| RegistryError::InvalidArgument("invalid page token".into()))?;
        if cursor.filter != filter {
            return Err(RegistryError::InvalidArgument(
                "filter must match for subsequent pages".into(),
            ));
        }
        Ok(cursor)
    }

    fn decode(token: &str) -> Option<Self> {
        let bytes = STANDARD.decode(token).ok()?;
        let cursor: Self = serde_json::from_slice(&bytes).ok()?;
        (cursor.offset >= 0).then_some(cursor)
    }

    /// Encode as an opaque page token.
    pub fn encode(&self) -> RegistryResult<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| RegistryError::Internal(format!("encoding page token: {e}")))?;
        Ok(STANDARD.encode(json))
    }
}
