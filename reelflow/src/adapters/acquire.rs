//! Acquire adapters: stock search, channel download, local directory, and a
//! chain that merges several sources.

use super::command::{run_command, CommandSpec};
use crate::core::{AcquireQuery, VideoRef};
use crate::errors::StageFault;
use crate::stages::{AcquireStage, BatchRunner};
use anyhow::{bail, Context};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// File extensions treated as video.
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "mkv", "webm", "m4v"];

/// Deterministic local file name for a downloaded stock clip.
///
/// ```
/// use reelflow::adapters::stock_file_name;
///
/// let name = stock_file_name("https://videos.example/1.mp4");
/// assert!(name.starts_with("stock_") && name.ends_with(".mp4"));
/// assert_eq!(name, stock_file_name("https://videos.example/1.mp4"));
/// ```
#[must_use]
pub fn stock_file_name(link: &str) -> String {
    let digest = hex::encode(Sha256::digest(link.as_bytes()));
    format!("stock_{}.mp4", &digest[..16])
}

async fn ensure_dir(dir: &Path) -> Result<(), StageFault> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        StageFault::new(format!("cannot create {}", dir.display())).with_source(e)
    })
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[cfg(feature = "http")]
pub use stock::StockVideoAcquirer;

#[cfg(feature = "http")]
mod stock {
    use super::{ensure_dir, stock_file_name};
    use crate::adapters::transport_error;
    use crate::core::{AcquireQuery, VideoRef};
    use crate::errors::StageFault;
    use crate::stages::{AcquireStage, BatchRunner};
    use anyhow::Context;
    use async_trait::async_trait;
    use reqwest::header::AUTHORIZATION;
    use serde::Deserialize;
    use std::collections::HashSet;
    use std::fmt;
    use std::path::{Path, PathBuf};
    use tokio::io::AsyncWriteExt;
    use tracing::debug;

    #[derive(Debug, Deserialize)]
    struct SearchResponse {
        #[serde(default)]
        videos: Vec<SearchHit>,
    }

    #[derive(Debug, Deserialize)]
    struct SearchHit {
        #[serde(default)]
        video_files: Vec<VideoFile>,
    }

    #[derive(Debug, Deserialize)]
    struct VideoFile {
        link: String,
    }

    /// Searches a stock footage API and downloads the first file of each hit.
    ///
    /// Searches and downloads are items: a failed query or link contributes
    /// nothing, the rest still do. A link returned by several queries is
    /// downloaded once. Downloads are written to a `.part` file and renamed
    /// when complete.
    #[derive(Clone)]
    pub struct StockVideoAcquirer {
        client: reqwest::Client,
        search_url: String,
        api_key: String,
        content_dir: PathBuf,
        runner: BatchRunner,
    }

    impl fmt::Debug for StockVideoAcquirer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("StockVideoAcquirer")
                .field("search_url", &self.search_url)
                .field("content_dir", &self.content_dir)
                .field("runner", &self.runner)
                .finish_non_exhaustive()
        }
    }

    impl StockVideoAcquirer {
        /// Creates an acquirer writing into `content_dir`.
        #[must_use]
        pub fn new(
            search_url: impl Into<String>,
            api_key: impl Into<String>,
            content_dir: impl Into<PathBuf>,
        ) -> Self {
            Self {
                client: reqwest::Client::new(),
                search_url: search_url.into(),
                api_key: api_key.into(),
                content_dir: content_dir.into(),
                runner: BatchRunner::default(),
            }
        }

        /// Sets the batch runner.
        #[must_use]
        pub fn with_runner(mut self, runner: BatchRunner) -> Self {
            self.runner = runner;
            self
        }

        /// Uses a preconfigured HTTP client.
        #[must_use]
        pub fn with_client(mut self, client: reqwest::Client) -> Self {
            self.client = client;
            self
        }

        async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<String>> {
            let per_page = limit.to_string();
            let response = self
                .client
                .get(&self.search_url)
                .header(AUTHORIZATION, &self.api_key)
                .query(&[("query", query), ("per_page", per_page.as_str())])
                .send()
                .await
                .map_err(|err| transport_error("stock video search", err))
                .with_context(|| format!("search for '{query}' failed"))?;

            let status = response.status();
            if !status.is_success() {
                anyhow::bail!("search for '{query}' returned HTTP {}", status.as_u16());
            }

            let body: SearchResponse = response.json().await.context("malformed search response")?;
            Ok(body
                .videos
                .into_iter()
                .filter_map(|hit| hit.video_files.into_iter().next().map(|file| file.link))
                .take(limit)
                .collect())
        }

        async fn download(&self, link: &str) -> anyhow::Result<VideoRef> {
            let path = self.content_dir.join(stock_file_name(link));
            let mut partial = PartialDownload::new(path.with_extension("part"));
            self.fetch(link, &partial.path).await?;

            tokio::fs::rename(&partial.path, &path)
                .await
                .with_context(|| format!("cannot move download to {}", path.display()))?;
            partial.completed = true;

            debug!(link, path = %path.display(), "downloaded stock clip");
            Ok(VideoRef::from_path(path))
        }

        async fn fetch(&self, link: &str, dest: &Path) -> anyhow::Result<()> {
            let mut response = self
                .client
                .get(link)
                .send()
                .await
                .map_err(|err| transport_error("stock video download", err))
                .and_then(|response| response.error_for_status().map_err(anyhow::Error::from))
                .with_context(|| format!("download of {link} failed"))?;

            let mut file = tokio::fs::File::create(dest)
                .await
                .with_context(|| format!("cannot create {}", dest.display()))?;
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        }

        /// Directory downloads are written to.
        #[must_use]
        pub fn content_dir(&self) -> &Path {
            &self.content_dir
        }
    }

    #[async_trait]
    impl AcquireStage for StockVideoAcquirer {
        fn name(&self) -> &str {
            "stock_video"
        }

        async fn run_batch(&self, query: &AcquireQuery) -> Result<Vec<VideoRef>, StageFault> {
            if query.search_queries.is_empty() {
                return Ok(Vec::new());
            }
            ensure_dir(&self.content_dir).await?;

            let limit = query.per_query_limit;
            let found = self
                .runner
                .try_survivors(self.name(), query.search_queries.iter(), |q| self.search(q, limit))
                .await?;

            let links = unique_links(found);
            self.runner
                .try_survivors(self.name(), links.iter(), |link| self.download(link))
                .await
        }
    }

    /// Flattens per-query links, keeping the first occurrence of each.
    fn unique_links(found: Vec<Vec<String>>) -> Vec<String> {
        let mut seen = HashSet::new();
        found.into_iter().flatten().filter(|link| seen.insert(link.clone())).collect()
    }

    /// A download target that is removed on drop unless marked completed.
    struct PartialDownload {
        path: PathBuf,
        completed: bool,
    }

    impl PartialDownload {
        fn new(path: PathBuf) -> Self {
            Self { path, completed: false }
        }
    }

    impl Drop for PartialDownload {
        fn drop(&mut self) {
            if !self.completed {
                std::fs::remove_file(&self.path).ok();
            }
        }
    }
}

/// Downloads the latest upload of each channel with an external downloader.
///
/// The downloader must print the final file path as its last stdout line.
#[derive(Debug, Clone)]
pub struct ChannelDownloadAcquirer {
    command: CommandSpec,
    channel_url: String,
    content_dir: PathBuf,
    runner: BatchRunner,
}

impl ChannelDownloadAcquirer {
    /// Creates an acquirer. `channel_url` contains a `{channel}` placeholder.
    #[must_use]
    pub fn new(command: CommandSpec, channel_url: impl Into<String>, content_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            channel_url: channel_url.into(),
            content_dir: content_dir.into(),
            runner: BatchRunner::default(),
        }
    }

    /// Sets the batch runner.
    #[must_use]
    pub fn with_runner(mut self, runner: BatchRunner) -> Self {
        self.runner = runner;
        self
    }

    async fn download(&self, channel: &str) -> anyhow::Result<VideoRef> {
        let url = self.channel_url.replace("{channel}", channel);
        let template = self.content_dir.join("%(title)s.%(ext)s");
        let template = template.to_string_lossy();

        let output = run_command(
            &self.command,
            &[("channel_url", url.as_str()), ("output_template", template.as_ref())],
            &[],
        )
        .await?;

        let Some(line) = output.last_line() else {
            bail!("downloader printed no file path for {url}");
        };
        let path = PathBuf::from(line);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            bail!("downloaded file {} does not exist", path.display());
        }
        Ok(VideoRef::from_path(path))
    }
}

#[async_trait]
impl AcquireStage for ChannelDownloadAcquirer {
    fn name(&self) -> &str {
        "channel_download"
    }

    async fn run_batch(&self, query: &AcquireQuery) -> Result<Vec<VideoRef>, StageFault> {
        if query.channels.is_empty() {
            return Ok(Vec::new());
        }
        ensure_dir(&self.content_dir).await?;

        self
            .runner
            .try_survivors(self.name(), query.channels.iter(), |channel| self.download(channel))
            .await
    }
}

/// Picks up video files already present in a directory, sorted by name.
#[derive(Debug, Clone)]
pub struct LocalDirAcquirer {
    dir: PathBuf,
    limit: Option<usize>,
}

impl LocalDirAcquirer {
    /// Creates an acquirer over `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            limit: None,
        }
    }

    /// Returns at most `limit` files.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    async fn list(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("cannot read {}", self.dir.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && is_video(&path) {
                files.push(path);
            }
        }
        files.sort();
        if let Some(limit) = self.limit {
            files.truncate(limit);
        }
        Ok(files)
    }
}

#[async_trait]
impl AcquireStage for LocalDirAcquirer {
    fn name(&self) -> &str {
        "local_dir"
    }

    async fn run_batch(&self, _query: &AcquireQuery) -> Result<Vec<VideoRef>, StageFault> {
        let files = self.list().await.map_err(StageFault::from)?;
        Ok(files.into_iter().map(VideoRef::from_path).collect())
    }
}

/// Runs several acquirers in order and concatenates what they return.
///
/// A failing source is logged and skipped. The chain faults when it found
/// nothing and at least one source faulted, so an idle source cannot hide an
/// unreachable one.
#[derive(Debug, Clone, Default)]
pub struct ChainedAcquirer {
    sources: Vec<Arc<dyn AcquireStage>>,
}

impl ChainedAcquirer {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a source.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn AcquireStage>) -> Self {
        self.sources.push(source);
        self
    }

    /// Number of sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the chain has no sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl AcquireStage for ChainedAcquirer {
    fn name(&self) -> &str {
        "chained"
    }

    async fn run_batch(&self, query: &AcquireQuery) -> Result<Vec<VideoRef>, StageFault> {
        let mut videos = Vec::new();
        let mut last_fault = None;

        for source in &self.sources {
            match source.run_batch(query).await {
                Ok(found) => {
                    info!(source = source.name(), count = found.len(), "source acquired");
                    videos.extend(found);
                }
                Err(fault) => {
                    warn!(source = source.name(), error = %fault, "source failed");
                    last_fault = Some(fault);
                }
            }
        }

        match last_fault {
            Some(fault) if videos.is_empty() => Err(fault),
            _ => Ok(videos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Script, ScriptedStage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stock_file_name_is_stable() {
        let a = stock_file_name("https://videos.example/a.mp4");
        let b = stock_file_name("https://videos.example/b.mp4");
        assert_eq!(a.len(), "stock_".len() + 16 + ".mp4".len());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_local_dir_lists_sorted_videos() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.MOV", "notes.txt", "c.webm"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let videos = LocalDirAcquirer::new(dir.path())
            .run_batch(&AcquireQuery::new())
            .await
            .unwrap();
        let names: Vec<String> = videos.iter().map(VideoRef::file_name).collect();
        assert_eq!(names, vec!["a.MOV", "b.mp4", "c.webm"]);

        let limited = LocalDirAcquirer::new(dir.path())
            .with_limit(1)
            .run_batch(&AcquireQuery::new())
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_local_dir_missing_is_fault() {
        let dir = tempfile::tempdir().unwrap();
        let fault = LocalDirAcquirer::new(dir.path().join("absent"))
            .run_batch(&AcquireQuery::new())
            .await
            .unwrap_err();
        assert!(fault.message().contains("cannot read"));
    }

    #[tokio::test]
    async fn test_chain_tolerates_one_failing_source() {
        let chain = ChainedAcquirer::new()
            .with_source(Arc::new(ScriptedStage::new("broken").faulting("offline")))
            .with_source(Arc::new(ScriptedStage::new("ok").with_items(2)));

        let videos = chain.run_batch(&AcquireQuery::new().with_search("sea")).await.unwrap();
        assert_eq!(videos.len(), 2);
    }

    #[tokio::test]
    async fn test_chain_faults_when_all_fail() {
        let chain = ChainedAcquirer::new()
            .with_source(Arc::new(ScriptedStage::new("one").faulting("first")))
            .with_source(Arc::new(ScriptedStage::new("two").with_script(Script::Fault("second".into()))));

        let fault = chain.run_batch(&AcquireQuery::new()).await.unwrap_err();
        assert_eq!(fault.message(), "second");
    }

    #[tokio::test]
    async fn test_chain_faults_when_only_idle_sources_answer() {
        let chain = ChainedAcquirer::new()
            .with_source(Arc::new(ScriptedStage::new("idle").with_items(0)))
            .with_source(Arc::new(ScriptedStage::new("search").faulting("search offline")));

        let fault = chain.run_batch(&AcquireQuery::new().with_search("sea")).await.unwrap_err();
        assert_eq!(fault.message(), "search offline");
    }

    #[tokio::test]
    async fn test_empty_chain_returns_nothing() {
        let videos = ChainedAcquirer::new().run_batch(&AcquireQuery::new()).await.unwrap();
        assert!(videos.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_channel_download_uses_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("latest.mp4");
        std::fs::write(&clip, b"x").unwrap();

        let script = format!("echo progress; echo {{channel_url}} >/dev/null; echo {}", clip.display());
        let command = CommandSpec::new("sh").with_args(["-c".to_string(), script]);
        let acquirer = ChannelDownloadAcquirer::new(command, "https://channels.example/{channel}", dir.path());

        let query = AcquireQuery::new().with_channel("alpha").with_channel("beta");
        let videos = acquirer.run_batch(&query).await.unwrap();
        assert_eq!(videos, vec![VideoRef::from_path(&clip), VideoRef::from_path(&clip)]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_channel_download_missing_file_drops_item() {
        let dir = tempfile::tempdir().unwrap();
        let command = CommandSpec::new("sh").with_args(["-c", "echo /nonexistent/clip.mp4"]);
        let acquirer = ChannelDownloadAcquirer::new(command, "{channel}", dir.path());

        let videos = acquirer
            .run_batch(&AcquireQuery::new().with_channel("alpha"))
            .await
            .unwrap();
        assert!(videos.is_empty());
    }

    #[cfg(feature = "http")]
    mod stock {
        use super::*;
        use pretty_assertions::assert_eq;
        use crate::core::{RunStatus, StageName};
        use crate::errors::ReelflowError;
        use crate::pipeline::Orchestrator;
        use crate::testing::MockPipeline;
        use serde_json::json;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use wiremock::matchers::{header, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn hits(links: &[String]) -> serde_json::Value {
            json!({
                "videos": links
                    .iter()
                    .map(|link| json!({"video_files": [{"link": link}]}))
                    .collect::<Vec<_>>()
            })
        }

        fn files_in(dir: &Path) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(dir)
                .unwrap()
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }

        #[tokio::test]
        async fn test_unreachable_search_faults_stage() {
            let dir = tempfile::tempdir().unwrap();
            let acquirer = StockVideoAcquirer::new("http://127.0.0.1:9/search", "key", dir.path());

            let fault = acquirer
                .run_batch(&AcquireQuery::new().with_search("waves").with_search("dunes"))
                .await
                .unwrap_err();
            assert!(fault.message().starts_with("all 2 items failed"));
            assert!(fault.message().contains("stock video search is unavailable"));
        }

        #[tokio::test]
        async fn test_unreachable_search_fails_run() {
            let dir = tempfile::tempdir().unwrap();
            let pipeline = MockPipeline::new(2);
            let mut stages = pipeline.stage_set();
            stages.acquire = Arc::new(StockVideoAcquirer::new("http://127.0.0.1:9/search", "key", dir.path()));
            let orchestrator = Orchestrator::new(stages, pipeline.seed().clone(), Arc::clone(&pipeline.events));

            let err = orchestrator.run().await.unwrap_err();
            assert!(matches!(err, ReelflowError::StageFatal { stage: StageName::Acquire, .. }));
            assert_eq!(err.summary().unwrap().status, RunStatus::Failed);
            assert_eq!(pipeline.transform.call_count(), 0);
        }

        #[tokio::test]
        async fn test_overlapping_queries_download_once() {
            let server = MockServer::start().await;
            let shared = format!("{}/clips/shared.mp4", server.uri());
            let only_forest = format!("{}/clips/forest.mp4", server.uri());

            Mock::given(method("GET"))
                .and(path("/search"))
                .and(query_param("query", "nature"))
                .and(header("authorization", "key"))
                .respond_with(ResponseTemplate::new(200).set_body_json(hits(&[shared.clone()])))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/search"))
                .and(query_param("query", "forest"))
                .respond_with(ResponseTemplate::new(200).set_body_json(hits(&[shared.clone(), only_forest.clone()])))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/clips/shared.mp4"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"shared clip".to_vec()))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/clips/forest.mp4"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"forest clip".to_vec()))
                .expect(1)
                .mount(&server)
                .await;

            let dir = tempfile::tempdir().unwrap();
            let acquirer = StockVideoAcquirer::new(format!("{}/search", server.uri()), "key", dir.path())
                .with_runner(BatchRunner::new(4));
            let videos = acquirer
                .run_batch(&AcquireQuery::new().with_search("nature").with_search("forest"))
                .await
                .unwrap();

            let expected_shared = dir.path().join(stock_file_name(&shared));
            assert_eq!(
                videos,
                vec![
                    VideoRef::from_path(&expected_shared),
                    VideoRef::from_path(dir.path().join(stock_file_name(&only_forest))),
                ]
            );
            assert_eq!(std::fs::read(&expected_shared).unwrap(), b"shared clip");
        }

        #[tokio::test]
        async fn test_interrupted_download_leaves_no_file() {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let clip = format!("http://{}/clip.mp4", listener.local_addr().unwrap());
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let mut request = [0u8; 1024];
                    let _ = socket.read(&mut request).await;
                    let _ = socket
                        .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 1000\r\n\r\npartial")
                        .await;
                }
            });

            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/search"))
                .respond_with(ResponseTemplate::new(200).set_body_json(hits(&[clip])))
                .mount(&server)
                .await;

            let dir = tempfile::tempdir().unwrap();
            let acquirer = StockVideoAcquirer::new(format!("{}/search", server.uri()), "key", dir.path());
            let videos = acquirer
                .run_batch(&AcquireQuery::new().with_search("waves"))
                .await
                .unwrap();

            assert!(videos.is_empty());
            assert!(files_in(dir.path()).is_empty());
        }

        #[tokio::test]
        async fn test_failed_download_is_item_failure() {
            let server = MockServer::start().await;
            let good = format!("{}/clips/good.mp4", server.uri());
            let gone = format!("{}/clips/gone.mp4", server.uri());
            Mock::given(method("GET"))
                .and(path("/search"))
                .respond_with(ResponseTemplate::new(200).set_body_json(hits(&[gone, good.clone()])))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/clips/good.mp4"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"good".to_vec()))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/clips/gone.mp4"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let dir = tempfile::tempdir().unwrap();
            let acquirer = StockVideoAcquirer::new(format!("{}/search", server.uri()), "key", dir.path());
            let videos = acquirer
                .run_batch(&AcquireQuery::new().with_search("waves"))
                .await
                .unwrap();

            assert_eq!(videos, vec![VideoRef::from_path(dir.path().join(stock_file_name(&good)))]);
            assert_eq!(files_in(dir.path()), vec![stock_file_name(&good)]);
        }
    }
}
