//! Decrypted node tree of a public folder.
//!
//! Nodes are stored in an arena and refer to each other by [`NodeId`]. A node listed
//! before its parent is attached to a placeholder parent, which is filled in place when
//! the real record arrives, so listing order doesn't matter except for the first node.

use {
    crate::{
        client::{Client, NodeInfo},
        crypto::{Attribute, BASE64, MasterKey, NodeKey, decrypt_attribute},
        error::{Error, ErrorContext, Result},
        transport::{ReqwestTransport, Transport},
    },
    base64::Engine,
    derivative::Derivative,
    megalink_protocol::{ApiError, EncryptedNode, Handle, NodeType, endpoints::FetchNodes},
    std::{
        collections::{HashMap, HashSet},
        ops::ControlFlow,
    },
    tracing::{debug, instrument, warn},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Synthetic root. It holds the top-level nodes of the listing.
const ROOT: NodeId = NodeId(0);

#[derive(Debug, Clone)]
pub struct Node {
    pub handle: Handle,
    /// Empty for the synthetic root.
    pub parent: Handle,
    pub owner: String,
    pub node_type: NodeType,
    pub timestamp: i64,
    pub size: u64,
    pub attribute: Attribute,
    pub key: NodeKey,
    children: Vec<NodeId>,
    placeholder: bool,
}

impl Node {
    fn placeholder(handle: Handle) -> Self {
        Self {
            handle,
            parent: Handle::default(),
            owner: String::new(),
            node_type: NodeType::Folder,
            timestamp: 0,
            size: 0,
            attribute: Attribute::default(),
            key: NodeKey::default(),
            children: Vec::new(),
            placeholder: true,
        }
    }

    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.attribute.name
    }

    #[must_use]
    #[inline]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Referenced as a parent but never listed.
    #[must_use]
    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct FolderManager<T = ReqwestTransport> {
    #[derivative(Debug = "ignore")]
    client: Client<T>,
    handle: Handle,
    #[derivative(Debug = "ignore")]
    master_key: MasterKey,
    nodes: Vec<Node>,
    lookup: HashMap<Handle, NodeId>,
}

impl<T: Transport> FolderManager<T> {
    /// Fetches the recursive listing of a public folder and builds the tree.
    #[instrument(skip(client, key))]
    #[inline]
    pub async fn open(client: &Client<T>, handle: Handle, key: &str) -> Result<Self> {
        let master_key = MasterKey::from_folder_link_key(key).context("invalid folder key")?;
        let response = client
            .request(&FetchNodes::recursive(), &[("n", handle.as_str())])
            .await
            .context("failed to fetch nodes")?;
        debug!(count = response.nodes.len(), "fetched nodes");
        Self::from_nodes(client.clone(), handle, master_key, &response.nodes)
    }

    /// Builds the tree from an already fetched listing.
    ///
    /// The first accepted node becomes the child of the synthetic root. Nodes with an
    /// unsupported key format are skipped. Any other decoding failure is fatal.
    #[inline]
    pub fn from_nodes(
        client: Client<T>,
        handle: Handle,
        master_key: MasterKey,
        nodes: &[EncryptedNode],
    ) -> Result<Self> {
        let mut fm = Self {
            client,
            handle,
            master_key,
            nodes: vec![Node {
                placeholder: false,
                ..Node::placeholder(Handle::default())
            }],
            lookup: HashMap::with_capacity(nodes.len()),
        };
        let listed: HashSet<&Handle> = nodes.iter().map(|node| &node.handle).collect();
        for node in nodes {
            fm.add_node(node, &listed)?;
        }
        let placeholders = fm.nodes.iter().filter(|node| node.placeholder).count();
        if placeholders > 0 {
            warn!(placeholders, "some parent nodes are missing from the listing");
        }
        Ok(fm)
    }

    fn add_node(&mut self, encrypted: &EncryptedNode, listed: &HashSet<&Handle>) -> Result<()> {
        let handle = &encrypted.handle;
        let Some((_, encoded_key)) = encrypted.key.split_once(':') else {
            warn!(%handle, "skipping node with unsupported key format");
            return Ok(());
        };
        let raw_key = BASE64
            .decode(encoded_key)
            .map_err(Error::from)
            .and_then(|data| {
                self.master_key
                    .decrypt_node_key(&data)
                    .map_err(Error::from)
            })
            .with_context(|| format!("failed to decrypt key of node {handle}"))?;
        let key = match encrypted.node_type {
            NodeType::File => NodeKey::from_file_bytes(&raw_key),
            NodeType::Folder | NodeType::CloudDriveRoot | NodeType::Inbox | NodeType::TrashBin => {
                NodeKey::from_folder_bytes(&raw_key)
            }
        }
        .with_context(|| format!("invalid key of node {handle}"))?;
        let attribute = if encrypted.attributes.is_empty() {
            Attribute::default()
        } else {
            decrypt_attribute(&encrypted.attributes, &key.key)
                .with_context(|| format!("failed to decrypt attributes of node {handle}"))?
        };

        let id = self.node_id_or_placeholder(handle);
        let first = !self.node(ROOT).has_children();
        let node = self.node_mut(id);
        node.parent = encrypted.parent.clone();
        node.owner = encrypted.owner.clone();
        node.node_type = encrypted.node_type;
        node.timestamp = encrypted.timestamp;
        node.size = encrypted.size;
        node.attribute = attribute;
        node.key = key;
        node.placeholder = false;

        let parent = if encrypted.parent.is_empty() || first {
            if first && !encrypted.parent.is_empty() && listed.contains(&encrypted.parent) {
                return Err(Error::RootOutOfOrder {
                    root: handle.clone(),
                    parent: encrypted.parent.clone(),
                });
            }
            ROOT
        } else {
            self.node_id_or_placeholder(&encrypted.parent)
        };
        self.node_mut(parent).children.push(id);
        Ok(())
    }

    fn node_id_or_placeholder(&mut self, handle: &Handle) -> NodeId {
        if let Some(&id) = self.lookup.get(handle) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::placeholder(handle.clone()));
        self.lookup.insert(handle.clone(), id);
        id
    }

    #[expect(clippy::indexing_slicing, reason = "ids are only created by push")]
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[expect(clippy::indexing_slicing, reason = "ids are only created by push")]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Handle of the public folder.
    #[must_use]
    #[inline]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Synthetic root. Its children are the top-level nodes.
    #[must_use]
    #[inline]
    pub fn root(&self) -> &Node {
        self.node(ROOT)
    }

    #[inline]
    pub fn children<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> {
        node.children.iter().map(|&id| self.node(id))
    }

    /// Finds a node by handle. Placeholders are found too.
    #[must_use]
    #[inline]
    pub fn lookup(&self, handle: &str) -> Option<&Node> {
        self.lookup.get(handle).map(|&id| self.node(id))
    }

    /// Resolves a `/`-separated path of node handles starting at the synthetic root.
    /// Each segment must name a child of the node resolved so far.
    ///
    /// Empty and `.` segments are ignored. `..` is not supported and never matches.
    #[must_use]
    #[inline]
    pub fn lookup_path(&self, path: &str) -> Option<&Node> {
        let mut current = self.root();
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            }
            current = self
                .children(current)
                .find(|child| child.handle == *segment)?;
        }
        Some(current)
    }

    /// Visits every node below the synthetic root in pre-order.
    ///
    /// Returns [`ControlFlow::Break`] if the visitor stopped the walk.
    #[inline]
    pub fn walk<F>(&self, mut visitor: F) -> ControlFlow<()>
    where
        F: FnMut(&Node) -> ControlFlow<()>,
    {
        self.walk_children(ROOT, &mut visitor)
    }

    fn walk_children<F>(&self, id: NodeId, visitor: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&Node) -> ControlFlow<()>,
    {
        for &child in &self.node(id).children {
            visitor(self.node(child))?;
            if self.node(child).has_children() {
                self.walk_children(child, visitor)?;
            }
        }
        ControlFlow::Continue(())
    }

    /// Requests a download URL for a file node of this folder.
    #[instrument(skip_all, fields(handle = %node.handle))]
    #[inline]
    pub async fn get_file_node_info(&self, node: &Node) -> Result<NodeInfo> {
        if node.node_type != NodeType::File {
            return Err(Error::InvalidNodeType {
                expected: NodeType::File,
                actual: node.node_type,
            });
        }
        let node = self
            .lookup(node.handle.as_str())
            .ok_or(Error::Api(ApiError::NotFound))?;
        self.client
            .get_file_node_info(&self.handle, &node.handle, &node.key)
            .await
    }
}
