//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id
//! - [`PageParams`]: `page` and `size` query parameters
//! - [`ApiJson`], [`ApiQuery`], [`ApiPath`]: the stock extractors with
//!   rejections rendered as [`AppError`] envelopes

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use serde::Deserialize;
use shopfront_core::paging::PageRequest;
use std::fmt;
use uuid::Uuid;

const MAX_CORRELATION_ID_LEN: usize = 128;

/// Correlation ID for request tracing.
///
/// Reads the id stored by [`correlation_id_layer`](crate::correlation_id_layer),
/// falling back to the `X-Correlation-ID` header, then to a fresh UUID v4.
///
/// # Example
///
/// ```
/// use shopfront_web::CorrelationId;
///
/// async fn handler(correlation_id: CorrelationId) -> String {
///     format!("Request ID: {correlation_id}")
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// Take the id from `X-Correlation-ID`, or generate one.
    ///
    /// Header values that are empty, longer than 128 bytes or contain
    /// non-printable characters are replaced.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| {
                !id.is_empty()
                    && id.len() <= MAX_CORRELATION_ID_LEN
                    && id.bytes().all(|b| b.is_ascii_graphic())
            })
            .map_or_else(Self::generate, |id| Self(id.to_string()))
    }

    /// A fresh UUID v4 id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or_else(|| Self::from_headers(&parts.headers)))
    }
}

/// Page query parameters, zero-based.
///
/// Missing values fall back to page 0 and size 20; size is clamped to
/// 1..=100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    /// Zero-based page number
    pub page: Option<u32>,
    /// Page size
    pub size: Option<u32>,
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        let default = Self::default();
        Self::new(
            params.page.unwrap_or(default.page()),
            params.size.unwrap_or(default.size()),
        )
    }
}

/// JSON body extractor that rejects with an [`AppError`].
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor that rejects with an [`AppError`].
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path extractor that rejects with an [`AppError`].
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> CorrelationId {
        let (mut parts, ()) = req.into_parts();
        CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract")
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, "order-flow-7")
            .body(())
            .expect("Valid request");

        assert_eq!(extract(req).await.as_str(), "order-flow-7");
    }

    #[tokio::test]
    async fn test_correlation_id_generates_new() {
        let req = Request::builder().body(()).expect("Valid request");
        let id = extract(req).await;
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let mut req = Request::builder()
            .header(CORRELATION_ID_HEADER, "from-header")
            .body(())
            .expect("Valid request");
        req.extensions_mut()
            .insert(CorrelationId("from-layer".to_string()));

        assert_eq!(extract(req).await.as_str(), "from-layer");
    }

    #[test]
    fn unusable_header_values_are_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(CORRELATION_ID_HEADER, "has space".parse().unwrap());
        let id = CorrelationId::from_headers(&headers);
        assert!(Uuid::parse_str(id.as_str()).is_ok());

        headers.insert(CORRELATION_ID_HEADER, "x".repeat(200).parse().unwrap());
        assert_ne!(CorrelationId::from_headers(&headers).as_str().len(), 200);
    }

    #[test]
    fn page_params_defaults_and_clamping() {
        let request = PageRequest::from(PageParams::default());
        assert_eq!((request.page(), request.size()), (0, 20));

        let request = PageRequest::from(PageParams {
            page: Some(3),
            size: Some(500),
        });
        assert_eq!((request.page(), request.size()), (3, 100));
    }
}
