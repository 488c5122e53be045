use {
    crate::Ctx,
    anyhow::{Context as _, Result, bail},
    cadd::ops::Cadd,
    megalink_sdk::{DownloadOptions, NodeInfo, range::parse_range_header},
    std::path::{Path, PathBuf},
    tokio::{
        fs::File,
        io::{self, AsyncWrite, AsyncWriteExt},
    },
    tracing::{info, instrument, warn},
};

/// Parses `<start>-[<end>]`.
fn parse_range(range: &str) -> Result<DownloadOptions> {
    let (start, end) = parse_range_header(&format!("bytes={range}"))
        .with_context(|| format!("invalid range: {range:?}"))?;
    Ok(DownloadOptions::new().range(start, end))
}

fn default_output(info: &NodeInfo) -> Result<PathBuf> {
    let name = &info.attribute.name;
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        bail!("cannot use file name {name:?} as output path, specify --output");
    }
    Ok(PathBuf::from(name))
}

#[instrument(skip_all, fields(name = %info.attribute.name))]
pub async fn get(
    ctx: &Ctx,
    info: &NodeInfo,
    output: Option<&Path>,
    range: Option<&str>,
) -> Result<()> {
    let options = match range {
        Some(range) => parse_range(range)?,
        None => DownloadOptions::new(),
    };
    let output = match output {
        Some(output) => output.to_path_buf(),
        None => default_output(info)?,
    };
    let mut download = ctx.client.download(info, &options).await?;

    let mut writer: Box<dyn AsyncWrite + Send + Unpin> = if output == Path::new("-") {
        Box::new(io::stdout())
    } else {
        Box::new(
            File::create(&output)
                .await
                .with_context(|| format!("failed to create {}", output.display()))?,
        )
    };
    let mut written = 0_u64;
    while let Some(chunk) = download.chunk().await? {
        writer.write_all(&chunk).await?;
        written = written.cadd(u64::try_from(chunk.len())?)?;
    }
    writer.flush().await?;

    if written != download.range.len() {
        warn!(
            written,
            expected = download.range.len(),
            "download ended early"
        );
    }
    info!(
        written,
        range = %download.range.content_range(),
        "saved to {}",
        output.display()
    );
    Ok(())
}
