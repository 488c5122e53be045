use {
    anyhow::{Context as _, Result, anyhow},
    megalink_sdk::ClientConfig,
    serde::{Deserialize, Serialize},
    std::path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(flatten)]
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            client: ClientConfig::default(),
        }
    }
}

fn default_log_filter() -> String {
    "info".into()
}

pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| anyhow!("cannot find config dir"))?;
    Ok(config_dir.join("megalink.json5"))
}

impl Config {
    /// Loads the config from `path`, or from the default location if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let path = default_config_path()?;
                if !path.try_exists()? {
                    return Ok(Self::default());
                }
                path
            }
        };
        let text = fs_err::read_to_string(&path)?;
        json5::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
    }
}
