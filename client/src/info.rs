use {
    crate::{Ctx, cli::Link},
    anyhow::{Context as _, Result, bail},
    megalink_protocol::NodeType,
    megalink_sdk::{FolderManager, Node, NodeInfo},
    std::ops::ControlFlow,
    tracing::info,
};

#[expect(clippy::print_stdout, reason = "command output")]
pub fn print_file_info(info: &NodeInfo) {
    println!("name: {}", info.attribute.name);
    println!("size: {}", info.size);
    println!("url:  {}", info.url);
}

fn format_node(node: &Node) -> String {
    let kind = match node.node_type {
        NodeType::File => "file",
        NodeType::Folder => "dir",
        NodeType::CloudDriveRoot | NodeType::Inbox | NodeType::TrashBin => "special",
    };
    format!("{}  {kind:<7}  {:>12}  {}", node.handle, node.size, node.name())
}

async fn open_folder(ctx: &Ctx, link: &Link) -> Result<FolderManager> {
    let Link::Folder(link) = link else {
        bail!("expected a folder link");
    };
    Ok(ctx
        .client
        .open_public_folder(&link.handle, &link.key)
        .await?)
}

#[expect(clippy::print_stdout, reason = "command output")]
pub async fn ls(ctx: &Ctx, link: &Link, path: &str) -> Result<()> {
    let fm = open_folder(ctx, link).await?;
    let node = fm
        .lookup_path(path)
        .with_context(|| format!("path not found: {path}"))?;
    for child in fm.children(node) {
        println!("{}", format_node(child));
    }
    Ok(())
}

#[expect(clippy::print_stdout, reason = "command output")]
pub async fn tree(ctx: &Ctx, link: &Link) -> Result<()> {
    let fm = open_folder(ctx, link).await?;
    let mut count = 0_usize;
    let flow = fm.walk(|node| {
        println!("{}", format_node(node));
        count = count.saturating_add(1);
        ControlFlow::Continue(())
    });
    debug_assert!(flow.is_continue());
    info!("{count} nodes");
    Ok(())
}
