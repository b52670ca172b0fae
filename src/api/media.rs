use super::error::*;
use crate::application_impl::{RangePolicy, StreamPump};
use crate::application_port::RangeError;
use crate::domain_model::{ByteWindow, Identity, MediaKind, RangeHeaders};
use crate::domain_port::MediaCatalog;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use warp::http::{Response, StatusCode, header};
use warp::hyper::Body;
use warp::reject;

/// One percent-decoded path segment of a media route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSegment(String);

impl MediaSegment {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
#[error("path segment is not valid percent-encoded UTF-8")]
pub struct InvalidSegment;

impl FromStr for MediaSegment {
    type Err = InvalidSegment;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let bytes = raw.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' {
                let hi = bytes.get(i + 1).copied().and_then(from_hex);
                let lo = bytes.get(i + 2).copied().and_then(from_hex);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 3;
                        continue;
                    }
                    _ => return Err(InvalidSegment),
                }
            }
            out.push(bytes[i]);
            i += 1;
        }
        String::from_utf8(out)
            .map(MediaSegment)
            .map_err(|_| InvalidSegment)
    }
}

fn from_hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub kind: MediaKind,
    pub segments: Vec<MediaSegment>,
}

/// Serves a catalog file: 206 for a satisfiable Range, 200 with the whole
/// file when the header is absent or unusable, 416 when the start lies past
/// the end of the file.
pub async fn stream_media(
    request: MediaRequest,
    range: Option<String>,
    identity: Identity,
    catalog: Arc<dyn MediaCatalog>,
    range_policy: Arc<RangePolicy>,
    pump: Arc<StreamPump>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let segments: Vec<&str> = request.segments.iter().map(MediaSegment::as_str).collect();
    let file = catalog
        .resolve(request.kind, &segments)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    debug!(subject = %identity.subject_id, path = %file.path.display(), range = ?range, "media request");

    if file.size == 0 {
        return build(
            Response::builder()
                .status(StatusCode::OK)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_TYPE, file.content_type)
                .header(header::CONTENT_LENGTH, 0),
            Body::empty(),
        );
    }

    let (status, window, content_range) =
        match range_policy.compute_window(range.as_deref(), file.size) {
            Ok(window) => {
                let headers = RangeHeaders::for_window(window, file.size, file.content_type);
                (StatusCode::PARTIAL_CONTENT, window, Some(headers.content_range))
            }
            Err(RangeError::Unsatisfiable { size }) => {
                return build(
                    Response::builder()
                        .status(StatusCode::RANGE_NOT_SATISFIABLE)
                        .header(header::CONTENT_RANGE, format!("bytes */{}", size))
                        .header(header::CONTENT_TYPE, "application/json"),
                    Body::from(r#"{"message":"Range not satisfiable"}"#),
                );
            }
            Err(e @ (RangeError::MissingRange | RangeError::MalformedRange)) => {
                debug!("serving full file: {}", e);
                let whole = ByteWindow {
                    start: 0,
                    end: file.size - 1,
                };
                (StatusCode::OK, whole, None)
            }
        };

    let stream = pump
        .open(&file.path, window)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let mut builder = Response::builder()
        .status(status)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_TYPE, file.content_type)
        .header(header::CONTENT_LENGTH, window.len());
    if let Some(content_range) = content_range {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }
    build(builder, Body::wrap_stream(stream))
}

fn build(
    builder: warp::http::response::Builder,
    body: Body,
) -> Result<warp::reply::Response, warp::Rejection> {
    builder
        .body(body)
        .map_err(ApiErrorCode::internal)
        .map_err(reject::custom)
}
