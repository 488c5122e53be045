pub mod endpoints;
mod error;
pub mod link;

pub use crate::error::ApiError;
use {
    derive_more::{Display, From, Into},
    serde::{Deserialize, Serialize},
    std::borrow::Borrow,
};

/// Endpoint of the provider's batched JSON API.
pub const API_URL: &str = "https://g.api.mega.co.nz/cs";

/// Length of a node handle or a public handle.
pub const HANDLE_LEN: usize = 8;
/// Length of the base64 key component of a folder link (16 bytes).
pub const FOLDER_KEY_B64_LEN: usize = 22;
/// Length of the base64 key component of a file link (32 bytes).
pub const FILE_KEY_B64_LEN: usize = 43;

/// Identifier of a node within one public link.
///
/// Handles are only unique in the scope of the link they were obtained from.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    From,
    Into,
    Display,
)]
pub struct Handle(String);

impl Handle {
    #[must_use]
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for Handle {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Handle {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Handle {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl PartialEq<str> for Handle {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum NodeType {
    File,
    Folder,
    CloudDriveRoot,
    Inbox,
    TrashBin,
}

impl TryFrom<i32> for NodeType {
    type Error = String;

    #[inline]
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::File),
            1 => Ok(Self::Folder),
            2 => Ok(Self::CloudDriveRoot),
            3 => Ok(Self::Inbox),
            4 => Ok(Self::TrashBin),
            _ => Err(format!("invalid value for NodeType: {value}")),
        }
    }
}

impl From<NodeType> for i32 {
    #[inline]
    fn from(value: NodeType) -> Self {
        match value {
            NodeType::File => 0,
            NodeType::Folder => 1,
            NodeType::CloudDriveRoot => 2,
            NodeType::Inbox => 3,
            NodeType::TrashBin => 4,
        }
    }
}

/// A node as listed by the API, before any decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedNode {
    #[serde(rename = "h")]
    pub handle: Handle,
    #[serde(rename = "p", default)]
    pub parent: Handle,
    #[serde(rename = "u", default)]
    pub owner: String,
    /// `<owner-or-sharer-handle>:<base64 ciphertext>`.
    #[serde(rename = "k", default)]
    pub key: String,
    #[serde(rename = "ts", default)]
    pub timestamp: i64,
    #[serde(rename = "s", default)]
    pub size: u64,
    #[serde(rename = "a", default)]
    pub attributes: String,
    #[serde(rename = "t")]
    pub node_type: NodeType,
}
