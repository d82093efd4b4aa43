//! Platform table
//!
//! Platforms share structure and differ only in data: display labels, the
//! accepted profile hosts, the handle prefix used in profile URLs, the
//! username alphabet and whether job creation is enabled for them.

use crate::errors::{AppError, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Supported social platforms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Instagram,
    Threads,
    Tiktok,
    X,
}

/// Static per-platform configuration
#[derive(Debug)]
pub struct PlatformSpec {
    pub platform: Platform,
    /// Stored value (`instagram`, `threads`, ...)
    pub key: &'static str,
    /// Short display name
    pub label: &'static str,
    /// Long display name
    pub display_label: &'static str,
    /// Hosts whose profile URLs are accepted
    pub hosts: &'static [&'static str],
    /// Path prefix in front of the handle in profile URLs
    pub handle_prefix: &'static str,
    /// Character class of usernames inside profile URLs
    pub url_username_class: &'static str,
    /// Job list route
    pub route: &'static str,
    /// Available for new jobs
    pub enabled: bool,
}

static PLATFORMS: [PlatformSpec; 4] = [
    PlatformSpec {
        platform: Platform::Instagram,
        key: "instagram",
        label: "Instagram",
        display_label: "Instagram",
        hosts: &["instagram.com"],
        handle_prefix: "",
        url_username_class: "a-zA-Z0-9._",
        route: "/instagram-jobs",
        enabled: true,
    },
    PlatformSpec {
        platform: Platform::Threads,
        key: "threads",
        label: "Threads",
        display_label: "Threads",
        hosts: &["threads.net"],
        handle_prefix: "@",
        url_username_class: "a-zA-Z0-9._",
        route: "/threads-jobs",
        enabled: true,
    },
    PlatformSpec {
        platform: Platform::Tiktok,
        key: "tiktok",
        label: "TikTok",
        display_label: "TikTok",
        hosts: &["tiktok.com"],
        handle_prefix: "@",
        url_username_class: "a-zA-Z0-9._",
        route: "/tiktok-jobs",
        enabled: false,
    },
    PlatformSpec {
        platform: Platform::X,
        key: "x",
        label: "X",
        display_label: "X (Twitter)",
        hosts: &["x.com", "twitter.com"],
        handle_prefix: "",
        url_username_class: "a-zA-Z0-9_",
        route: "/x-jobs",
        enabled: false,
    },
];

static BARE_USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@?[a-zA-Z0-9._]+$").expect("username pattern"));

static PROFILE_URLS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PLATFORMS
        .iter()
        .map(|spec| {
            let hosts = spec
                .hosts
                .iter()
                .map(|h| h.replace('.', r"\."))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(
                r"^https?://(?:www\.)?(?:{})/{}([{}]+)/?(?:\?.*)?$",
                hosts, spec.handle_prefix, spec.url_username_class
            );
            Regex::new(&pattern).expect("profile url pattern")
        })
        .collect()
});

impl Platform {
    pub const ALL: [Platform; 4] = [Platform::Instagram, Platform::Threads, Platform::Tiktok, Platform::X];

    fn index(self) -> usize {
        match self {
            Platform::Instagram => 0,
            Platform::Threads => 1,
            Platform::Tiktok => 2,
            Platform::X => 3,
        }
    }

    pub fn spec(self) -> &'static PlatformSpec {
        &PLATFORMS[self.index()]
    }

    pub fn as_str(self) -> &'static str {
        self.spec().key
    }

    pub fn label(self) -> &'static str {
        self.spec().label
    }

    pub fn is_enabled(self) -> bool {
        self.spec().enabled
    }

    /// Platforms offered by the create-job form
    pub fn enabled() -> impl Iterator<Item = Platform> {
        Self::ALL.into_iter().filter(|p| p.is_enabled())
    }

    /// Resolve a job list route segment such as `instagram-jobs`
    pub fn from_route(segment: &str) -> Option<Platform> {
        let segment = segment.trim_start_matches('/');
        Self::ALL
            .into_iter()
            .find(|p| p.spec().route.trim_start_matches('/') == segment)
    }

    /// Normalize free-text input (bare handle or profile URL) to a bare username
    pub fn extract_username(self, input: &str) -> Option<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.starts_with("http") {
            let lowered = trimmed.to_lowercase();
            if !self.spec().hosts.iter().any(|host| lowered.contains(host)) {
                return None;
            }
            return PROFILE_URLS[self.index()]
                .captures(trimmed)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string());
        }

        if BARE_USERNAME.is_match(trimmed) {
            let bare = trimmed.trim_start_matches('@');
            if !bare.is_empty() {
                return Some(bare.to_string());
            }
        }
        None
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == needle || p.label().to_lowercase() == needle)
            .ok_or_else(|| AppError::InvalidFormat {
                message: format!("Unknown platform: {}", s),
            })
    }
}
