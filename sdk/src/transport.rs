//! HTTP seam of the client. Production code goes through [`ReqwestTransport`];
//! tests plug in their own [`Transport`] implementation.

use {
    crate::{
        config::ClientConfig,
        error::{Error, Result},
    },
    bytes::{Bytes, BytesMut},
    futures::{
        StreamExt, TryStreamExt,
        stream::{self, BoxStream},
    },
    reqwest::{
        Method, StatusCode, Url,
        header::{CONTENT_TYPE, HeaderMap, HeaderValue},
    },
    std::future::Future,
};

pub type BodyStream = BoxStream<'static, Result<Bytes>>;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    #[must_use]
    #[inline]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    #[inline]
    pub fn post_json(url: Url, body: Vec<u8>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            method: Method::POST,
            url,
            headers,
            body: Some(body.into()),
        }
    }
}

/// Response with a streaming body. Dropping it releases the connection.
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl HttpResponse {
    /// Response with the whole body available at once.
    #[must_use]
    #[inline]
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self {
            status,
            headers,
            body: stream::once(async move { Ok(body) }).boxed(),
        }
    }

    #[inline]
    pub async fn bytes(self) -> Result<Bytes> {
        let buf = self
            .body
            .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await?;
        Ok(buf.freeze())
    }
}

pub trait Transport: Send + Sync + 'static {
    /// Sends the request and returns as soon as the response head is available.
    ///
    /// Non-success statuses are returned as responses, not as errors.
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// Reuse created transport or clone it in order to reuse a connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    reqwest: reqwest::Client,
}

impl ReqwestTransport {
    #[inline]
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let reqwest = builder
            .build()
            .map_err(|err| Error::network(err).context("failed to build http client"))?;
        Ok(Self { reqwest })
    }
}

impl Transport for ReqwestTransport {
    #[inline]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .reqwest
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await.map_err(Error::network)?;
        Ok(HttpResponse {
            status: response.status(),
            headers: response.headers().clone(),
            body: response.bytes_stream().map_err(Error::network).boxed(),
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use {
        super::*,
        std::sync::{Arc, Mutex},
    };

    type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync;

    /// Answers requests with a closure and records every request it saw.
    #[derive(Clone)]
    pub(crate) struct MockTransport {
        handler: Arc<Handler>,
        pub(crate) requests: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl MockTransport {
        pub(crate) fn new(
            handler: impl Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
        ) -> Self {
            Self {
                handler: Arc::new(handler),
                requests: Arc::default(),
            }
        }

        #[expect(clippy::unwrap_used, reason = "test")]
        pub(crate) fn recorded(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        #[expect(clippy::unwrap_used, reason = "test")]
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            let response = (self.handler)(&request);
            self.requests.lock().unwrap().push(request);
            response
        }
    }

    pub(crate) fn json_response(body: &str) -> HttpResponse {
        HttpResponse::from_bytes(StatusCode::OK, HeaderMap::new(), body.to_owned())
    }
}
