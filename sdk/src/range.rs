//! HTTP range boundary for a gateway that serves decrypted files.

use {
    crate::{
        client::{Client, Download, DownloadOptions, NodeInfo},
        error::{Error, Result},
        transport::Transport,
    },
    regex::Regex,
    reqwest::{
        StatusCode,
        header::{
            CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, DATE, ETAG, EXPIRES,
            HeaderMap, HeaderName, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE,
            LAST_MODIFIED, RANGE, USER_AGENT,
        },
    },
    std::sync::LazyLock,
    tracing::{debug, warn},
    url::form_urlencoded,
};

/// Request headers forwarded to the storage server.
pub const PASSTHROUGH_REQUEST_HEADERS: [HeaderName; 4] =
    [IF_NONE_MATCH, IF_MODIFIED_SINCE, IF_RANGE, USER_AGENT];

/// Response headers copied back from the storage server.
pub const PASSTHROUGH_RESPONSE_HEADERS: [HeaderName; 4] = [DATE, ETAG, EXPIRES, LAST_MODIFIED];

/// Parses `bytes=<start>-[<end>]`. Multiple ranges and suffix ranges are rejected.
#[inline]
pub fn parse_range_header(value: &str) -> Result<(i64, Option<i64>)> {
    static REGEX: LazyLock<Regex> = LazyLock::new(|| {
        #[expect(clippy::unwrap_used, reason = "constant regex")]
        Regex::new(r"^bytes=(\d+)-(\d*)$").unwrap()
    });
    let captures = REGEX
        .captures(value.trim())
        .ok_or(Error::RangeNotSatisfiable)?;
    let start = captures
        .get(1)
        .and_then(|start| start.as_str().parse().ok())
        .ok_or(Error::RangeNotSatisfiable)?;
    let end = match captures.get(2).map(|end| end.as_str()) {
        None | Some("") => None,
        Some(end) => Some(end.parse().map_err(|_| Error::RangeNotSatisfiable)?),
    };
    Ok((start, end))
}

/// `attachment; filename*=UTF-8''<name>` with the name percent-encoded.
#[must_use]
#[inline]
pub fn content_disposition(name: &str) -> HeaderValue {
    let encoded: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
    let value = format!("attachment; filename*=UTF-8''{}", encoded.replace('+', "%20"));
    HeaderValue::try_from(value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Decrypted download together with the headers a gateway should answer with.
#[derive(Debug)]
pub struct RangedDownload {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Download,
}

impl<T: Transport> Client<T> {
    /// Opens a download on behalf of an incoming HTTP request.
    ///
    /// The `Range` header and [`PASSTHROUGH_REQUEST_HEADERS`] of `request_headers`
    /// are forwarded upstream.
    #[inline]
    pub async fn open_ranged(
        &self,
        info: &NodeInfo,
        request_headers: &HeaderMap,
    ) -> Result<RangedDownload> {
        let mut options = DownloadOptions::new();
        if let Some(value) = request_headers.get(RANGE) {
            let value = value.to_str().map_err(|_| Error::RangeNotSatisfiable)?;
            let (start, end) = parse_range_header(value)?;
            options = options.range(start, end);
        }
        for name in PASSTHROUGH_REQUEST_HEADERS {
            if let Some(value) = request_headers.get(&name) {
                options = options.header(name, value.clone());
            }
        }

        let body = self.download(info, &options).await?;
        let mut headers = HeaderMap::new();
        for name in PASSTHROUGH_RESPONSE_HEADERS {
            if let Some(value) = body.headers.get(&name) {
                headers.insert(name, value.clone());
            }
        }
        if body.status == StatusCode::PARTIAL_CONTENT {
            match HeaderValue::try_from(body.range.content_range()) {
                Ok(value) => {
                    headers.insert(CONTENT_RANGE, value);
                }
                Err(err) => warn!(?err, "failed to build Content-Range"),
            }
        }
        if matches!(body.status, StatusCode::OK | StatusCode::PARTIAL_CONTENT) {
            headers.insert(CONTENT_LENGTH, body.range.len().into());
        }
        let mime = mime_guess::from_path(&info.attribute.name).first_or_octet_stream();
        if let Ok(value) = HeaderValue::from_str(mime.essence_str()) {
            headers.insert(CONTENT_TYPE, value);
        }
        if !info.attribute.name.is_empty() {
            headers.insert(CONTENT_DISPOSITION, content_disposition(&info.attribute.name));
        }
        debug!(status = %body.status, range = ?body.range, "serving download");

        Ok(RangedDownload {
            status: body.status,
            headers,
            body,
        })
    }
}
