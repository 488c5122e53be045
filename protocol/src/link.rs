//! Public link forms accepted by the client.
//!
//! - file: `<handle>!<43-char key>` or `!!<handle>!<43-char key>`
//! - folder: `<handle>!<22-char key>`

use {
    crate::Handle,
    regex::Regex,
    std::{str::FromStr, sync::LazyLock},
    thiserror::Error,
};

static FILE_LINK_REGEXES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        build_regex(r"^!!([a-zA-Z\d_-]{8})!([a-zA-Z\d_-]{43})$"),
        build_regex(r"^([a-zA-Z\d_-]{8})!([a-zA-Z\d_-]{43})$"),
    ]
});
static FOLDER_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| build_regex(r"^([a-zA-Z\d_-]{8})!([a-zA-Z\d_-]{22})$"));
static HANDLE_REGEX: LazyLock<Regex> = LazyLock::new(|| build_regex(r"^[a-zA-Z\d_-]{8}$"));

#[expect(clippy::expect_used, reason = "patterns are constant")]
fn build_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid link pattern")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} link: `{link}`")]
pub struct LinkError {
    pub kind: &'static str,
    pub link: String,
}

/// Checks that `value` is a well-formed node handle.
#[inline]
pub fn parse_handle(value: &str) -> Result<Handle, LinkError> {
    if HANDLE_REGEX.is_match(value) {
        Ok(Handle::from(value))
    } else {
        Err(LinkError {
            kind: "node handle",
            link: value.to_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    pub handle: Handle,
    /// Base64 encoded 32-byte file key.
    pub key: String,
}

impl FromStr for FileLink {
    type Err = LinkError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FILE_LINK_REGEXES
            .iter()
            .find_map(|regex| regex.captures(s))
            .and_then(|captures| {
                Some(Self {
                    handle: captures.get(1)?.as_str().into(),
                    key: captures.get(2)?.as_str().to_owned(),
                })
            })
            .ok_or_else(|| LinkError {
                kind: "file",
                link: s.to_owned(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLink {
    pub handle: Handle,
    /// Base64 encoded 16-byte folder key.
    pub key: String,
}

impl FromStr for FolderLink {
    type Err = LinkError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FOLDER_LINK_REGEX
            .captures(s)
            .and_then(|captures| {
                Some(Self {
                    handle: captures.get(1)?.as_str().into(),
                    key: captures.get(2)?.as_str().to_owned(),
                })
            })
            .ok_or_else(|| LinkError {
                kind: "folder",
                link: s.to_owned(),
            })
    }
}
