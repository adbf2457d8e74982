use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Path prefix under which every article lives
pub const ARTICLE_PATH_PREFIX: &str = "/wiki/";

/// Canonical MediaWiki namespaces plus the aliases English Wikipedia links use
pub const NAMESPACES: &[&str] = &[
    "Media", "Special", "Talk", "User", "User_talk", "Wikipedia", "Wikipedia_talk",
    "WP", "Project", "Project_talk", "File", "File_talk", "Image", "Image_talk",
    "MediaWiki", "MediaWiki_talk", "Template", "Template_talk", "Help", "Help_talk",
    "Category", "Category_talk", "Portal", "Portal_talk", "Draft", "Draft_talk",
    "TimedText", "TimedText_talk", "Module", "Module_talk",
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("`{0}` does not name an article")]
pub struct InvalidArticleId(pub String);

/// Normalized slug naming one article.
///
/// Slugs are stored percent-decoded with spaces turned into underscores, so
/// `Quantum chromodynamics`, `Quantum_chromodynamics` and
/// `https://en.wikipedia.org/wiki/Quantum_chromodynamics` all compare equal.
/// Ordering is plain byte order on the slug and is what the selector uses to
/// break ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    /// Accepts a bare slug, a human title, a `/wiki/<slug>` href or a full article URL.
    pub fn parse(input: &str) -> Result<Self, InvalidArticleId> {
        let trimmed = input.trim();

        let slug = match Url::parse(trimmed) {
            Ok(url) if url.host().is_some() => {
                let path = url.path();
                match path.strip_prefix(ARTICLE_PATH_PREFIX) {
                    Some(rest) => rest.to_string(),
                    None => path.rsplit('/').next().unwrap_or_default().to_string(),
                }
            }
            _ => trimmed
                .strip_prefix(ARTICLE_PATH_PREFIX)
                .unwrap_or(trimmed)
                .to_string(),
        };

        let normalized = normalize_slug(&slug);
        if normalized.is_empty() {
            return Err(InvalidArticleId(input.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Identifier behind an in-body `href`, or `None` when the link does not
    /// point at an article (external links, section anchors, empty targets).
    pub fn from_href(href: &str) -> Option<Self> {
        let rest = href.strip_prefix(ARTICLE_PATH_PREFIX)?;
        if rest.contains('#') {
            return None;
        }
        let normalized = normalize_slug(rest);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human readable title fed to the similarity model
    pub fn title(&self) -> String {
        self.0.replace('_', " ")
    }

    /// MediaWiki namespace prefix such as `Category` or `Help_talk`.
    /// Colons in ordinary titles (`Star_Wars:_Episode_IV`) are not namespaces.
    pub fn namespace(&self) -> Option<&str> {
        let (prefix, _) = self.0.split_once(':')?;
        NAMESPACES
            .iter()
            .any(|ns| ns.eq_ignore_ascii_case(prefix))
            .then_some(prefix)
    }

    /// Absolute URL of the rendered article page under `base`.
    pub fn url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .clear()
            .push("wiki")
            .push(&self.0);
        Ok(url)
    }
}

fn normalize_slug(raw: &str) -> String {
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    decoded.trim().replace(' ', "_")
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ArticleId {
    type Err = InvalidArticleId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
