//! Wire DTOs for the backend REST endpoints.
//!
//! Every field decodes defensively: a missing `data` array degrades to an
//! empty page and a missing count to zero rather than failing the whole
//! response.

use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Paginated list envelope. The backend also sends a `pagination` block;
/// the client paginates on row counts alone, so it is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PageDto<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl<T: DeserializeOwned> PageDto<T> {
    pub(super) fn into_rows(self) -> Vec<T> {
        self.data
    }
}

/// Count envelope returned by the pending-count endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct CountDto {
    #[serde(default)]
    pub(super) count: u64,
}
