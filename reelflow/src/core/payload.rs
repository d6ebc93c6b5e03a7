//! Content item references passed between stages.
//!
//! Items are opaque references to files or URIs. The orchestrator never looks
//! inside them; it only counts and correlates them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Path or URI of a raw or processed video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoRef(String);

impl VideoRef {
    /// Creates a new video reference.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Creates a reference from a filesystem path.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self(path.as_ref().to_string_lossy().into_owned())
    }

    /// Returns the raw location string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the location as a filesystem path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Returns the final path component, or the whole location if there is none.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.as_path()
            .file_name()
            .map_or_else(|| self.0.clone(), |name| name.to_string_lossy().into_owned())
    }

    /// Returns the file name without its extension.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.as_path()
            .file_stem()
            .map_or_else(|| self.0.clone(), |stem| stem.to_string_lossy().into_owned())
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for VideoRef {
    fn from(path: PathBuf) -> Self {
        Self::from_path(path)
    }
}

/// Location of a transcript, together with the video it was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRef {
    /// The processed video this transcript belongs to.
    pub source: VideoRef,
    /// Path of the transcript text file.
    pub location: PathBuf,
}

impl TranscriptRef {
    /// Creates a new transcript reference.
    #[must_use]
    pub fn new(source: VideoRef, location: impl Into<PathBuf>) -> Self {
        Self {
            source,
            location: location.into(),
        }
    }
}

/// Publish-ready caption text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Caption(String);

impl Caption {
    /// Creates a caption from text, trimming surrounding whitespace.
    #[must_use]
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(text.as_ref().trim().to_string())
    }

    /// Returns the caption text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the caption has no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized hashtag: `#` followed by lowercase word characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hashtag(String);

impl Hashtag {
    /// Normalizes raw text into a hashtag.
    ///
    /// Leading `#` marks are stripped, characters other than letters, digits
    /// and `_` are removed, and the rest is lowercased. Returns `None` when
    /// nothing is left.
    ///
    /// ```
    /// use reelflow::core::Hashtag;
    ///
    /// assert_eq!(Hashtag::parse("#Travel,").unwrap().as_str(), "#travel");
    /// assert!(Hashtag::parse("#").is_none());
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let word: String = raw
            .trim()
            .trim_start_matches('#')
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .flat_map(char::to_lowercase)
            .collect();

        if word.is_empty() {
            None
        } else {
            Some(Self(format!("#{word}")))
        }
    }

    /// Returns the hashtag including its leading `#`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hashtag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ordered set of hashtags without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashtagSet(Vec<Hashtag>);

impl HashtagSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hashtag, returning false if it was already present.
    pub fn insert(&mut self, tag: Hashtag) -> bool {
        if self.0.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    /// Keeps only the first `max` hashtags.
    pub fn truncate(&mut self, max: usize) {
        self.0.truncate(max);
    }

    /// Returns the number of hashtags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the hashtags in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Hashtag> {
        self.0.iter()
    }
}

impl FromIterator<Hashtag> for HashtagSet {
    fn from_iter<I: IntoIterator<Item = Hashtag>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl fmt::Display for HashtagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(tag.as_str())?;
        }
        Ok(())
    }
}

/// Output of the Caption stage for one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionResult {
    /// The processed video that was captioned.
    pub video: VideoRef,
    /// The generated caption.
    pub caption: Caption,
    /// The generated hashtags.
    pub hashtags: HashtagSet,
}

impl CaptionResult {
    /// Drops the echoed video reference, leaving the metadata pair.
    #[must_use]
    pub fn into_metadata(self) -> (Caption, HashtagSet) {
        (self.caption, self.hashtags)
    }
}

/// Input of the Publish stage for one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishItem {
    /// The processed video to publish.
    pub video: VideoRef,
    /// Caption text.
    pub caption: Caption,
    /// Hashtags to attach.
    pub hashtags: HashtagSet,
}

/// Platform confirmation for one published video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// The published video.
    pub video: VideoRef,
    /// Confirmation text reported by the publish helper.
    pub confirmation: String,
}

/// Seed for the Acquire stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireQuery {
    /// Free-text search queries for stock footage.
    #[serde(default)]
    pub search_queries: Vec<String>,
    /// Channel identifiers to download the latest upload from.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Maximum results per search query.
    #[serde(default = "default_per_query_limit")]
    pub per_query_limit: usize,
}

fn default_per_query_limit() -> usize {
    1
}

impl AcquireQuery {
    /// Creates an empty query with the default per-query limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            per_query_limit: default_per_query_limit(),
            ..Self::default()
        }
    }

    /// Adds a search query.
    #[must_use]
    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search_queries.push(query.into());
        self
    }

    /// Adds a channel identifier.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channels.push(channel.into());
        self
    }

    /// Sets the per-query result limit.
    #[must_use]
    pub fn with_per_query_limit(mut self, limit: usize) -> Self {
        self.per_query_limit = limit;
        self
    }

    /// Number of seed entries (queries plus channels).
    #[must_use]
    pub fn len(&self) -> usize {
        self.search_queries.len() + self.channels.len()
    }

    /// Returns true if there is nothing to acquire.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_video_ref_names() {
        let video = VideoRef::new("content/processed/processed_clip.mp4");
        assert_eq!(video.file_name(), "processed_clip.mp4");
        assert_eq!(video.file_stem(), "processed_clip");
    }

    #[test]
    fn test_hashtag_normalization() {
        assert_eq!(Hashtag::parse("#Travel").unwrap().as_str(), "#travel");
        assert_eq!(Hashtag::parse("##beach_life!").unwrap().as_str(), "#beach_life");
        assert_eq!(Hashtag::parse("sunset").unwrap().as_str(), "#sunset");
        assert!(Hashtag::parse("  ").is_none());
    }

    #[test]
    fn test_hashtag_set_dedup_and_order() {
        let set: HashtagSet = ["#b", "#A", "#a", "#c"]
            .iter()
            .filter_map(|raw| Hashtag::parse(raw))
            .collect();

        assert_eq!(set.len(), 3);
        assert_eq!(set.to_string(), "#b #a #c");
    }

    #[test]
    fn test_hashtag_set_truncate() {
        let mut set: HashtagSet = (0..8).filter_map(|i| Hashtag::parse(&format!("tag{i}"))).collect();
        set.truncate(5);
        assert_eq!(set.len(), 5);
        assert_eq!(set.iter().last().unwrap().as_str(), "#tag4");
    }

    #[test]
    fn test_caption_trims() {
        let caption = Caption::new("  hello world \n");
        assert_eq!(caption.as_str(), "hello world");
        assert!(Caption::new("   ").is_empty());
    }

    #[test]
    fn test_acquire_query_len() {
        let query = AcquireQuery::new()
            .with_search("nature")
            .with_search("city")
            .with_channel("@somechannel");
        assert_eq!(query.len(), 3);
        assert_eq!(query.per_query_limit, 1);
        assert!(AcquireQuery::new().is_empty());
    }

    #[test]
    fn test_acquire_query_deserialize_defaults() {
        let query: AcquireQuery = serde_json::from_str(r#"{"search_queries": ["ocean"]}"#).unwrap();
        assert_eq!(query.search_queries, vec!["ocean".to_string()]);
        assert!(query.channels.is_empty());
        assert_eq!(query.per_query_limit, 1);
    }
}
