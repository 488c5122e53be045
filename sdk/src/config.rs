use {
    megalink_protocol::API_URL,
    serde::{Deserialize, Serialize},
    std::time::Duration,
    url::Url,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_url: Url,
    /// Applied to every HTTP request by the transport. The client itself never
    /// retries or times out.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    #[inline]
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout: None,
            user_agent: None,
        }
    }
}

#[expect(clippy::expect_used, reason = "constant URL")]
fn default_api_url() -> Url {
    Url::parse(API_URL).expect("invalid API URL")
}
