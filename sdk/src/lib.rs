//! Read-only client for MEGA public file and folder links.
//!
//! [`Client`] talks to the JSON API through a [`Transport`]. Public files are resolved
//! with [`Client::open_file`], public folders are fetched into a [`FolderManager`],
//! and file content is streamed and decrypted by [`Client::download`].

pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fm;
pub mod range;
pub mod transport;

pub use crate::{
    client::{Client, Download, DownloadOptions, NodeInfo},
    config::ClientConfig,
    error::{Error, Result},
    fm::{FolderManager, Node},
    range::RangedDownload,
    transport::{ReqwestTransport, Transport},
};
pub use megalink_protocol as protocol;
