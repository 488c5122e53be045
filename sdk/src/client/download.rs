use {
    super::{Client, NodeInfo},
    crate::{
        crypto::{Aes128Ctr, ctr_seek},
        error::{Error, ErrorContext, Result},
        transport::{BodyStream, HttpRequest, Transport},
    },
    bytes::{Bytes, BytesMut},
    cadd::ops::Cadd,
    ctr::cipher::StreamCipher,
    derivative::Derivative,
    futures::{Stream, StreamExt, ready},
    regex::Regex,
    reqwest::{
        StatusCode,
        header::{CONTENT_RANGE, HeaderMap, HeaderName, HeaderValue, RANGE},
    },
    std::{
        pin::Pin,
        sync::LazyLock,
        task::{Context, Poll},
    },
    tracing::{debug, instrument},
};

/// Adjusts the outgoing download request. Modifiers are applied in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestModifier {
    /// Byte range starting at `start`. `end` is inclusive; `None` means until the end.
    Range { start: i64, end: Option<i64> },
    /// Extra request header. Never overrides `Range`.
    Header { name: HeaderName, value: HeaderValue },
}

impl RequestModifier {
    fn apply(&self, request: &mut HttpRequest) -> Result<()> {
        match self {
            Self::Range { start, end } => {
                if *start < 0 || end.is_some_and(|end| end < *start) {
                    return Err(Error::RangeNotSatisfiable);
                }
                let value = match end {
                    Some(end) => format!("bytes={start}-{end}"),
                    None => format!("bytes={start}-"),
                };
                let value = HeaderValue::try_from(value)
                    .map_err(|err| Error::MalformedResponse(err.to_string()))?;
                request.headers.insert(RANGE, value);
            }
            Self::Header { name, value } => {
                if *name != RANGE {
                    request.headers.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOptions {
    modifiers: Vec<RequestModifier>,
}

impl DownloadOptions {
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    #[inline]
    pub fn range(mut self, start: i64, end: Option<i64>) -> Self {
        self.modifiers.push(RequestModifier::Range { start, end });
        self
    }

    #[must_use]
    #[inline]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.modifiers.push(RequestModifier::Header { name, value });
        self
    }

    #[must_use]
    #[inline]
    pub fn modifiers(&self) -> &[RequestModifier] {
        &self.modifiers
    }

    fn apply(&self, request: &mut HttpRequest) -> Result<()> {
        for modifier in &self.modifiers {
            modifier.apply(request)?;
        }
        Ok(())
    }
}

/// Byte range of the file covered by a download body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServedRange {
    pub start: u64,
    /// Exclusive.
    pub end: u64,
    pub total: u64,
}

impl ServedRange {
    #[must_use]
    #[inline]
    pub fn full(size: u64) -> Self {
        Self {
            start: 0,
            end: size,
            total: size,
        }
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of the `Content-Range` header, e.g. `bytes 50-99/100`.
    #[must_use]
    #[inline]
    pub fn content_range(&self) -> String {
        format!(
            "bytes {}-{}/{}",
            self.start,
            self.end.saturating_sub(1),
            self.total
        )
    }

    /// Parses `bytes <start>-<end>/<total>`.
    #[must_use]
    #[inline]
    pub fn parse_content_range(value: &str) -> Option<Self> {
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            #[expect(clippy::unwrap_used, reason = "constant regex")]
            Regex::new(r"^bytes (\d+)-(\d+)/(\d+)$").unwrap()
        });
        let captures = REGEX.captures(value.trim())?;
        let number = |index| captures.get(index)?.as_str().parse::<u64>().ok();
        let start = number(1)?;
        let last = number(2)?;
        let total = number(3)?;
        if last < start {
            return None;
        }
        Some(Self {
            start,
            end: last.cadd(1_u64).ok()?,
            total,
        })
    }
}

/// Decrypted content of a file, or of a byte range of it.
///
/// Dropping it releases the underlying connection.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Download {
    pub status: StatusCode,
    /// Response headers as sent by the storage server.
    pub headers: HeaderMap,
    pub range: ServedRange,
    #[derivative(Debug = "ignore")]
    body: BodyStream,
    #[derivative(Debug = "ignore")]
    cipher: Aes128Ctr,
}

impl Download {
    /// Returns the next decrypted chunk or `None` at the end of the body.
    #[inline]
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        self.next().await.transpose()
    }
}

impl Stream for Download {
    type Item = Result<Bytes>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let item = ready!(this.body.poll_next_unpin(cx)).map(|chunk| -> Result<Bytes> {
            let mut data = BytesMut::from(chunk.context("failed to read download body")?);
            this.cipher.apply_keystream(&mut data);
            Ok(data.freeze())
        });
        Poll::Ready(item)
    }
}

impl<T: Transport> Client<T> {
    /// Starts downloading a file resolved with [`Client::open_file`] or
    /// [`crate::FolderManager::get_file_node_info`].
    ///
    /// Decryption starts at the first byte actually served, which is taken from
    /// `Content-Range` for a partial response.
    #[instrument(skip_all, fields(size = info.size))]
    #[inline]
    pub async fn download(&self, info: &NodeInfo, options: &DownloadOptions) -> Result<Download> {
        let mut request = HttpRequest::get(info.url.clone());
        options
            .apply(&mut request)
            .context("invalid download option")?;
        let response = self
            .transport
            .send(request)
            .await
            .context("download request failed")?;
        let status = response.status;
        if status.is_client_error() || status.is_server_error() {
            drop(response);
            return Err(Error::HttpStatus(status).context("download request failed"));
        }

        let range = if status == StatusCode::PARTIAL_CONTENT {
            let value = response
                .headers
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok());
            value
                .and_then(ServedRange::parse_content_range)
                .ok_or_else(|| {
                    Error::MalformedResponse(format!("invalid Content-Range: {value:?}"))
                })?
        } else {
            ServedRange::full(info.size)
        };
        debug!(%status, ?range, "download started");

        Ok(Download {
            status,
            headers: response.headers,
            range,
            body: response.body,
            cipher: ctr_seek(&info.key.key, &info.key.ctr_iv(), range.start),
        })
    }
}
