mod download;

pub use self::download::{Download, DownloadOptions, RequestModifier, ServedRange};

use {
    crate::{
        config::ClientConfig,
        crypto::{Attribute, NodeKey, decrypt_attribute},
        error::{Error, ErrorContext, Result},
        fm::FolderManager,
        transport::{HttpRequest, ReqwestTransport, Transport},
    },
    derivative::Derivative,
    megalink_protocol::{
        ApiError, Handle,
        endpoints::{Command, GetDownloadUrl, RequestToResponse},
        link::{FileLink, FolderLink, parse_handle},
    },
    serde::{Serialize, de::DeserializeOwned},
    std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    tracing::{debug, instrument},
    url::Url,
};

/// Everything needed to download and decrypt one file.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub size: u64,
    pub attribute: Attribute,
    pub key: NodeKey,
    /// Temporary download URL.
    pub url: Url,
}

/// Reuse created client or clone it in order to reuse a connection pool.
///
/// Clones share the request sequence counter.
#[derive(Derivative)]
#[derivative(Debug(bound = ""), Clone(bound = ""))]
pub struct Client<T = ReqwestTransport> {
    #[derivative(Debug = "ignore")]
    transport: Arc<T>,
    api_url: Url,
    seq: Arc<AtomicU64>,
}

impl Client<ReqwestTransport> {
    #[inline]
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(
            ReqwestTransport::new(config)?,
            config.api_url.clone(),
        ))
    }
}

impl<T: Transport> Client<T> {
    #[must_use]
    #[inline]
    pub fn with_transport(transport: T, api_url: Url) -> Self {
        Self {
            transport: Arc::new(transport),
            api_url,
            seq: Arc::default(),
        }
    }

    #[must_use]
    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Sends a single API command.
    ///
    /// `query` is appended to the URL after the `id` sequence parameter. Bare integer
    /// replies are reported as [`Error::Api`]. Nothing is retried.
    #[instrument(skip_all, fields(action = R::ACTION))]
    #[inline(never)]
    pub async fn request<R>(&self, request: &R, query: &[(&str, &str)]) -> Result<R::Response>
    where
        R: RequestToResponse + Serialize + Sync,
        R::Response: DeserializeOwned,
    {
        let body = serde_json::to_vec(&[Command::new(request)])
            .map_err(Error::Encode)
            .context("failed to encode request")?;
        let seq = self.next_seq();
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("id", &seq.to_string())
            .extend_pairs(query);
        debug!(seq, "sending api request");

        let response = self
            .transport
            .send(HttpRequest::post_json(url, body))
            .await
            .context("api request failed")?;
        if response.status.is_client_error() || response.status.is_server_error() {
            return Err(Error::HttpStatus(response.status).context("api request failed"));
        }
        let data = response
            .bytes()
            .await
            .context("failed to read api response")?;
        decode_response(&data).with_context(|| format!("{} request failed", R::ACTION))
    }

    /// Requests a download URL and decrypts the attributes of a file.
    ///
    /// For a standalone public file `handle` equals `public_handle`. For a file inside
    /// a public folder `public_handle` is the folder handle.
    #[instrument(skip(self, key))]
    pub(crate) async fn get_file_node_info(
        &self,
        public_handle: &Handle,
        handle: &Handle,
        key: &NodeKey,
    ) -> Result<NodeInfo> {
        let response = if public_handle == handle {
            self.request(&GetDownloadUrl::public_file(handle.clone()), &[])
                .await?
        } else {
            self.request(
                &GetDownloadUrl::folder_node(handle.clone()),
                &[("n", public_handle.as_str())],
            )
            .await?
        };
        let attribute = decrypt_attribute(&response.attributes, &key.key)
            .context("failed to decrypt attributes")?;
        let url = Url::parse(&response.url)
            .map_err(|err| Error::MalformedResponse(format!("invalid download url: {err}")))?;
        debug!(size = response.size, name = %attribute.name, "resolved file");
        Ok(NodeInfo {
            size: response.size,
            attribute,
            key: key.clone(),
            url,
        })
    }

    /// Resolves a public file given its handle and the 43-character key.
    #[inline]
    pub async fn open_file(&self, handle: &Handle, key: &str) -> Result<NodeInfo> {
        let key = NodeKey::from_file_link_key(key).context("invalid file key")?;
        self.get_file_node_info(handle, handle, &key).await
    }

    /// Resolves a file link, `<handle>!<key>` or `!!<handle>!<key>`.
    #[inline]
    pub async fn resolve_file_link(&self, link: &str) -> Result<NodeInfo> {
        let link: FileLink = link.parse()?;
        self.open_file(&link.handle, &link.key).await
    }

    /// Fetches and decrypts the full listing of a public folder.
    #[inline]
    pub async fn open_public_folder(&self, handle: &Handle, key: &str) -> Result<FolderManager<T>> {
        FolderManager::open(self, handle.clone(), key).await
    }

    #[inline]
    pub async fn open_folder_link(&self, link: &str) -> Result<FolderManager<T>> {
        let link: FolderLink = link.parse()?;
        self.open_public_folder(&link.handle, &link.key).await
    }

    /// Resolves a file inside a public folder link by its node handle.
    #[inline]
    pub async fn resolve_folder_file(&self, link: &str, handle: &str) -> Result<NodeInfo> {
        let handle = parse_handle(handle)?;
        let fm = self.open_folder_link(link).await?;
        let node = fm
            .lookup(handle.as_str())
            .ok_or_else(|| Error::NotFound(format!("node {handle}")))?;
        fm.get_file_node_info(node).await
    }
}

fn decode_response<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    let data = data.trim_ascii();
    let data = data
        .strip_prefix(b"[")
        .and_then(|data| data.strip_suffix(b"]"))
        .unwrap_or(data);
    serde_json::from_slice(data).or_else(|err| match serde_json::from_slice::<i64>(data) {
        Ok(code) => Err(ApiError::from_code(code).into()),
        Err(_) => Err(Error::Decode(err)),
    })
}
