//! Reqwest-backed REST gateway.
//!
//! This adapter owns transport details only: URL construction, timeout and
//! HTTP error mapping, and JSON decoding into domain entities. One instance
//! serves both gateway ports because the backend exposes notifications and
//! friend requests on the same API surface.

mod dto;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use self::dto::{CountDto, PageDto};
use crate::domain::friend_request::{FriendRequest, FriendRequestId};
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::ports::rest::{FriendRequestGateway, GatewayError, NotificationGateway};

/// REST gateway for notification and friend request endpoints.
pub struct BackendHttpGateway {
    client: Client,
    base: Url,
}

impl BackendHttpGateway {
    /// Build a gateway using a reqwest client with an explicit request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: ensure_trailing_slash(base),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path)
            .map_err(|error| GatewayError::invalid_request(format!("invalid endpoint: {error}")))
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        serde_json::from_slice(body.as_ref())
            .map_err(|error| GatewayError::decode(format!("invalid JSON payload: {error}")))
    }

    /// Send a mutation whose response body carries nothing the client needs.
    async fn confirm(&self, request: RequestBuilder) -> Result<(), GatewayError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(())
    }

    async fn fetch_page_of<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        limit: usize,
    ) -> Result<Vec<T>, GatewayError> {
        let url = self.endpoint(path)?;
        let request = self
            .client
            .get(url)
            .query(&[("page", page.to_string()), ("limit", limit.to_string())]);
        let envelope: PageDto<T> = self.fetch_json(request).await?;
        Ok(envelope.into_rows())
    }
}

#[async_trait]
impl NotificationGateway for BackendHttpGateway {
    async fn fetch_page(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Notification>, GatewayError> {
        self.fetch_page_of("notifications", page, limit).await
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("mark-notification-read/{id}"))?;
        self.confirm(self.client.patch(url)).await
    }

    async fn mark_all_read(&self) -> Result<(), GatewayError> {
        let url = self.endpoint("mark-all-read")?;
        self.confirm(self.client.patch(url)).await
    }
}

#[async_trait]
impl FriendRequestGateway for BackendHttpGateway {
    async fn fetch_page(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<FriendRequest>, GatewayError> {
        self.fetch_page_of("friend-requests", page, limit).await
    }

    async fn fetch_pending_count(&self) -> Result<u64, GatewayError> {
        let url = self.endpoint("friend-request-count")?;
        let envelope: CountDto = self.fetch_json(self.client.get(url)).await?;
        Ok(envelope.count)
    }

    async fn accept(&self, id: &FriendRequestId) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("friend-request/{id}/accept"))?;
        self.confirm(self.client.post(url)).await
    }

    async fn decline(&self, id: &FriendRequestId) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("friend-request/{id}/decline"))?;
        self.confirm(self.client.post(url)).await
    }
}

fn ensure_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::timeout(error.to_string())
    } else {
        GatewayError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> GatewayError {
    let excerpt = body_excerpt(body);
    let message = if excerpt.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {excerpt}", status.as_u16())
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GatewayError::timeout(message),
        _ if status.is_client_error() => GatewayError::invalid_request(message),
        _ => GatewayError::transport(message),
    }
}

fn body_excerpt(body: &[u8]) -> String {
    const EXCERPT_CHAR_LIMIT: usize = 120;

    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.chars().count() <= EXCERPT_CHAR_LIMIT {
        return trimmed.to_owned();
    }
    let cut: String = trimmed.chars().take(EXCERPT_CHAR_LIMIT).collect();
    format!("{cut}...")
}
