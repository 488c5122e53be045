use {
    crate::{EncryptedNode, Handle},
    serde::{Deserialize, Serialize},
};

pub trait RequestToResponse {
    type Response;
    /// Value of the `a` field selecting the API action.
    const ACTION: &'static str;
}
macro_rules! response_type {
    ($request:ty, $response:ty, $action:literal) => {
        impl RequestToResponse for $request {
            type Response = $response;
            const ACTION: &'static str = $action;
        }
    };
}

pub type Response<Request> = <Request as RequestToResponse>::Response;

/// A request object as it appears inside the batch array sent to the API.
#[derive(Debug, Serialize)]
pub struct Command<'a, R> {
    pub a: &'static str,
    #[serde(flatten)]
    pub request: &'a R,
}

impl<'a, R: RequestToResponse> Command<'a, R> {
    #[inline]
    pub fn new(request: &'a R) -> Self {
        Self {
            a: R::ACTION,
            request,
        }
    }
}

/// Lists all nodes of a public folder. The folder handle is passed
/// as the `n` query parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchNodes {
    pub c: u8,
    /// Recursive listing.
    pub r: u8,
    pub ca: u8,
}
response_type!(FetchNodes, FetchNodesResponse, "f");

impl FetchNodes {
    #[must_use]
    #[inline]
    pub fn recursive() -> Self {
        Self { c: 1, r: 1, ca: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchNodesResponse {
    #[serde(rename = "f", default)]
    pub nodes: Vec<EncryptedNode>,
    #[serde(default)]
    pub sn: String,
}

/// Requests a temporary download URL for a file.
///
/// Exactly one of `p` (public file handle) and `n` (node handle inside
/// the folder named by the `n` query parameter) is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDownloadUrl {
    pub g: u8,
    pub ssl: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<Handle>,
}
response_type!(GetDownloadUrl, DownloadUrlResponse, "g");

impl GetDownloadUrl {
    #[must_use]
    #[inline]
    pub fn public_file(handle: Handle) -> Self {
        Self {
            g: 1,
            ssl: 1,
            p: Some(handle),
            n: None,
        }
    }

    #[must_use]
    #[inline]
    pub fn folder_node(handle: Handle) -> Self {
        Self {
            g: 1,
            ssl: 1,
            p: None,
            n: Some(handle),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadUrlResponse {
    #[serde(rename = "s")]
    pub size: u64,
    /// Encrypted attributes.
    #[serde(rename = "at", default)]
    pub attributes: String,
    /// Temporary download URL.
    #[serde(rename = "g")]
    pub url: String,
}
