pub mod cli;
pub mod config;
mod download;
mod info;

use {
    crate::{
        cli::{Cli, Command, Link},
        config::Config,
    },
    anyhow::{Context as _, Result, bail},
    derivative::Derivative,
    megalink_sdk::{Client, NodeInfo},
    std::io,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Ctx {
    #[derivative(Debug = "ignore")]
    pub client: Client,
}

/// Logs go to stderr so that `get -o -` can write file content to stdout.
///
/// `RUST_LOG` takes precedence over `log_filter` from the config.
pub fn setup_logger(log_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_filter)?,
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
    Ok(())
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let ctx = Ctx {
        client: Client::new(&config.client)?,
    };
    match cli.command {
        Command::Info { link, node } => {
            let info = resolve_file(&ctx, &link, node.as_deref()).await?;
            info::print_file_info(&info);
        }
        Command::Ls { link, path } => info::ls(&ctx, &link, &path).await?,
        Command::Tree { link } => info::tree(&ctx, &link).await?,
        Command::Get {
            link,
            node,
            output,
            range,
        } => {
            let info = resolve_file(&ctx, &link, node.as_deref()).await?;
            download::get(&ctx, &info, output.as_deref(), range.as_deref()).await?;
        }
    }
    Ok(())
}

/// Resolves a file link, or a file inside a folder link given by handle or handle path.
async fn resolve_file(ctx: &Ctx, link: &Link, node: Option<&str>) -> Result<NodeInfo> {
    match (link, node) {
        (Link::File(link), None) => Ok(ctx.client.open_file(&link.handle, &link.key).await?),
        (Link::File(_), Some(_)) => bail!("--node can only be used with a folder link"),
        (Link::Folder(_), None) => bail!("--node is required for a folder link"),
        (Link::Folder(link), Some(node)) => {
            let fm = ctx
                .client
                .open_public_folder(&link.handle, &link.key)
                .await?;
            let found = fm
                .lookup(node)
                .or_else(|| fm.lookup_path(node))
                .with_context(|| format!("node not found: {node}"))?;
            Ok(fm.get_file_node_info(found).await?)
        }
    }
}
