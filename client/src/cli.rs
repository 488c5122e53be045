use {
    anyhow::{Error, Result, bail},
    clap::{Parser, Subcommand},
    megalink_protocol::link::{FileLink, FolderLink},
    std::{path::PathBuf, str::FromStr},
};

#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file. Defaults to `megalink.json5` in the user config dir.
    #[clap(long)]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Print name, size and temporary download URL of a file.
    Info {
        link: Link,
        /// Handle or handle path of a file inside a folder link.
        #[arg(short, long)]
        node: Option<String>,
    },
    /// List children of a folder node.
    Ls {
        link: Link,
        /// Path of node handles, e.g. `/AbCdEfGh/12345678`.
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print every node of a folder link.
    Tree { link: Link },
    /// Download and decrypt a file.
    Get {
        link: Link,
        #[arg(short, long)]
        node: Option<String>,
        /// Output file, `-` for stdout. Defaults to the file name.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Byte range, e.g. `100-` or `0-1023`.
        #[arg(short, long)]
        range: Option<String>,
    },
}

/// Public link as typed by the user: `<handle>!<key>` or `!!<handle>!<key>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    File(FileLink),
    Folder(FolderLink),
}

impl FromStr for Link {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        if let Ok(link) = input.parse() {
            return Ok(Self::File(link));
        }
        if let Ok(link) = input.parse() {
            return Ok(Self::Folder(link));
        }
        bail!("unrecognized link: {input:?}")
    }
}
