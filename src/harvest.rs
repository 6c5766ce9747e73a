//! Clip harvesting.
//!
//! Walks a channel's feed sequentially, downloading clips into a fresh
//! timestamped folder until the duration budget is spent. Candidates that
//! are not videos, have no reported duration, or run longer than the
//! per-clip ceiling are skipped; the first candidate the budget cannot
//! absorb ends the run.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rf_core::{DurationBudget, Error, Result, RetryPolicy};

use crate::feed::FeedSource;
use crate::manifest::Manifest;

/// Fetches clip durations and downloads clips.
#[async_trait]
pub trait ClipAcquirer: Send + Sync {
    /// Reported duration of the clip at `url`, in whole seconds. Sources
    /// that cannot determine a duration report 0.
    async fn duration(&self, url: &str) -> Result<u64>;

    /// Download the clip at `url` to `dest`.
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

#[async_trait]
impl ClipAcquirer for rf_av::YtDlp {
    async fn duration(&self, url: &str) -> Result<u64> {
        rf_av::YtDlp::duration(self, url).await
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        rf_av::YtDlp::download(self, url, dest).await
    }
}

/// Outcome of one harvest run.
#[derive(Debug)]
pub struct HarvestReport {
    /// Folder the clips were written into.
    pub folder: PathBuf,
    /// Number of clips downloaded.
    pub clips: usize,
    /// Seconds of footage accepted against the budget.
    pub consumed_seconds: u64,
}

pub struct Harvester<F, A> {
    feed: F,
    acquirer: A,
    output_dir: PathBuf,
    max_clip_seconds: u64,
    pause: Duration,
    retry: RetryPolicy,
}

impl<F: FeedSource, A: ClipAcquirer> Harvester<F, A> {
    pub fn new(feed: F, acquirer: A, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            feed,
            acquirer,
            output_dir: output_dir.into(),
            max_clip_seconds: 30,
            pause: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_max_clip_seconds(mut self, seconds: u64) -> Self {
        self.max_clip_seconds = seconds;
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Harvest `channel` until `budget_seconds` of footage is collected or
    /// the feed runs out.
    pub async fn run(&self, channel: &str, budget_seconds: u64) -> Result<HarvestReport> {
        if channel.is_empty() {
            return Err(Error::invalid("channel name must not be empty"));
        }
        if budget_seconds == 0 {
            return Err(Error::invalid("duration budget must be positive"));
        }

        let folder = self.create_run_folder(channel)?;
        tracing::info!(channel, budget_seconds, folder = %folder.display(), "starting harvest");

        let candidates = self.feed.list_ranked(channel).await?;
        let mut budget = DurationBudget::new(budget_seconds);
        let mut manifest = Manifest::new(&folder);
        let mut seq = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for candidate in candidates {
            if !candidate.is_video {
                tracing::debug!(id = %candidate.id, url = %candidate.url, "skipping non-video candidate");
                skipped += 1;
                continue;
            }
            let duration = match self.acquirer.duration(&candidate.url).await {
                Ok(duration) => duration,
                Err(err) => {
                    tracing::warn!(url = %candidate.url, error = %err, "duration lookup failed, skipping");
                    failed += 1;
                    continue;
                }
            };
            if duration == 0 || duration > self.max_clip_seconds {
                tracing::debug!(url = %candidate.url, duration, "skipping clip outside length bounds");
                skipped += 1;
                continue;
            }
            if duration > budget.remaining() {
                tracing::info!(
                    url = %candidate.url,
                    duration,
                    remaining = budget.remaining(),
                    "budget exhausted, stopping harvest"
                );
                break;
            }

            let filename = format!("{seq}.mp4");
            let dest = folder.join(&filename);
            let downloaded = self
                .retry
                .run("clip download", || {
                    let url = candidate.url.clone();
                    let dest = dest.clone();
                    async move { self.acquirer.download(&url, &dest).await }
                })
                .await;
            if let Err(err) = downloaded {
                // The slot stays free: neither budget nor sequence advance.
                tracing::warn!(url = %candidate.url, error = %err, "clip download failed, skipping");
                let _ = std::fs::remove_file(&dest);
                failed += 1;
                self.pace().await;
                continue;
            }

            budget.try_accept(duration);
            manifest.record(&filename, &candidate.title)?;
            tracing::info!(
                clip = %filename,
                title = %candidate.title,
                duration,
                consumed = budget.consumed(),
                "clip harvested"
            );
            seq += 1;

            self.pace().await;
        }

        tracing::info!(
            channel,
            clips = seq,
            skipped,
            failed,
            consumed = budget.consumed(),
            "harvest finished"
        );
        Ok(HarvestReport {
            folder,
            clips: seq,
            consumed_seconds: budget.consumed(),
        })
    }

    /// Rate-limit pause between candidates; runs after every download
    /// attempt, successful or not.
    async fn pace(&self) {
        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }
    }

    fn create_run_folder(&self, channel: &str) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S");
        let folder = self.output_dir.join(channel).join(stamp.to_string());
        std::fs::create_dir_all(&folder)?;
        Ok(folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::CandidateItem;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeFeed {
        items: Vec<CandidateItem>,
    }

    #[async_trait]
    impl FeedSource for FakeFeed {
        async fn list_ranked(&self, _channel: &str) -> Result<Vec<CandidateItem>> {
            Ok(self.items.clone())
        }
    }

    struct FakeAcquirer {
        durations: HashMap<String, u64>,
        duration_errors: Vec<String>,
        downloads: Mutex<Vec<String>>,
        failures_before_success: AtomicUsize,
    }

    impl FakeAcquirer {
        fn new(durations: &[(&str, u64)]) -> Self {
            Self {
                durations: durations
                    .iter()
                    .map(|(url, d)| (url.to_string(), *d))
                    .collect(),
                duration_errors: Vec::new(),
                downloads: Mutex::new(Vec::new()),
                failures_before_success: AtomicUsize::new(0),
            }
        }

        fn failing_first(self, failures: usize) -> Self {
            self.failures_before_success.store(failures, Ordering::SeqCst);
            self
        }

        fn failing_duration(mut self, urls: &[&str]) -> Self {
            self.duration_errors = urls.iter().map(|u| u.to_string()).collect();
            self
        }
    }

    #[async_trait]
    impl ClipAcquirer for FakeAcquirer {
        async fn duration(&self, url: &str) -> Result<u64> {
            if self.duration_errors.iter().any(|u| u == url) {
                return Err(Error::tool("yt-dlp", "duration lookup failed"));
            }
            Ok(*self.durations.get(url).unwrap_or(&0))
        }

        async fn download(&self, url: &str, dest: &Path) -> Result<()> {
            let remaining = self.failures_before_success.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_before_success.store(remaining - 1, Ordering::SeqCst);
                return Err(Error::tool("yt-dlp", "transient network failure"));
            }
            std::fs::write(dest, b"clip")?;
            self.downloads.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn video(url: &str, title: &str) -> CandidateItem {
        CandidateItem {
            id: url.trim_start_matches("u/").into(),
            url: url.into(),
            title: title.into(),
            is_video: true,
        }
    }

    fn harvester(feed: FakeFeed, acquirer: FakeAcquirer, dir: &Path) -> Harvester<FakeFeed, FakeAcquirer> {
        Harvester::new(feed, acquirer, dir)
            .with_pause(Duration::ZERO)
            .with_retry(RetryPolicy {
                max_attempts: 3,
                backoff: Duration::ZERO,
            })
    }

    #[tokio::test]
    async fn stops_at_the_first_unaffordable_clip() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed {
            items: vec![video("u/a", "A"), video("u/b", "B"), video("u/c", "C")],
        };
        let acquirer = FakeAcquirer::new(&[("u/a", 10), ("u/b", 25), ("u/c", 5)]);

        let report = harvester(feed, acquirer, dir.path())
            .run("funny", 30)
            .await
            .unwrap();

        // 10 fits, 25 would overflow 30 and ends the run even though 5 would fit.
        assert_eq!(report.clips, 1);
        assert_eq!(report.consumed_seconds, 10);
        assert!(report.folder.join("0.mp4").exists());
        assert!(!report.folder.join("1.mp4").exists());
    }

    #[tokio::test]
    async fn skips_non_videos_and_out_of_bounds_durations() {
        let dir = tempfile::tempdir().unwrap();
        let mut items = vec![video("u/long", "Long"), video("u/zero", "Zero"), video("u/ok", "Ok")];
        items.insert(
            0,
            CandidateItem {
                id: "img".into(),
                url: "u/img".into(),
                title: "Image".into(),
                is_video: false,
            },
        );
        let feed = FakeFeed { items };
        let acquirer = FakeAcquirer::new(&[("u/long", 31), ("u/zero", 0), ("u/ok", 12)]);

        let report = harvester(feed, acquirer, dir.path())
            .run("funny", 60)
            .await
            .unwrap();

        assert_eq!(report.clips, 1);
        assert_eq!(report.consumed_seconds, 12);

        let manifest = Manifest::load(&report.folder).unwrap();
        assert_eq!(manifest.title_for("0.mp4"), "Ok");
    }

    #[tokio::test]
    async fn retries_transient_download_failures() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed {
            items: vec![video("u/a", "A")],
        };
        let acquirer = FakeAcquirer::new(&[("u/a", 10)]).failing_first(2);

        let report = harvester(feed, acquirer, dir.path())
            .run("funny", 30)
            .await
            .unwrap();

        assert_eq!(report.clips, 1);
    }

    #[tokio::test]
    async fn duration_failure_skips_only_that_item() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed {
            items: vec![video("u/bad", "Bad"), video("u/good", "Good")],
        };
        let acquirer = FakeAcquirer::new(&[("u/good", 10)]).failing_duration(&["u/bad"]);

        let report = harvester(feed, acquirer, dir.path())
            .run("funny", 30)
            .await
            .unwrap();

        assert_eq!(report.clips, 1);
        assert_eq!(report.consumed_seconds, 10);
        let manifest = Manifest::load(&report.folder).unwrap();
        assert_eq!(manifest.title_for("0.mp4"), "Good");
    }

    #[tokio::test]
    async fn exhausted_retries_skip_the_item_without_spending_budget() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed {
            items: vec![video("u/a", "A"), video("u/b", "B")],
        };
        // Three failures exhaust all attempts for the first clip; the second
        // then succeeds and takes over its sequence slot.
        let acquirer = FakeAcquirer::new(&[("u/a", 10), ("u/b", 7)]).failing_first(3);

        let report = harvester(feed, acquirer, dir.path())
            .run("funny", 30)
            .await
            .unwrap();

        assert_eq!(report.clips, 1);
        assert_eq!(report.consumed_seconds, 7);
        let manifest = Manifest::load(&report.folder).unwrap();
        assert_eq!(manifest.title_for("0.mp4"), "B");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_downloads_still_pace_the_feed() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed {
            items: vec![video("u/a", "A"), video("u/b", "B")],
        };
        // First item burns all three attempts, second succeeds; both must
        // be followed by the inter-item pause.
        let acquirer = FakeAcquirer::new(&[("u/a", 10), ("u/b", 7)]).failing_first(3);
        let harvester = Harvester::new(feed, acquirer, dir.path())
            .with_pause(Duration::from_secs(2))
            .with_retry(RetryPolicy {
                max_attempts: 3,
                backoff: Duration::ZERO,
            });

        let start = tokio::time::Instant::now();
        let report = harvester.run("funny", 30).await.unwrap();

        assert_eq!(report.clips, 1);
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test]
    async fn empty_feed_yields_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        let feed = FakeFeed { items: Vec::new() };
        let acquirer = FakeAcquirer::new(&[]);

        let report = harvester(feed, acquirer, dir.path())
            .run("funny", 30)
            .await
            .unwrap();

        assert_eq!(report.clips, 0);
        assert!(report.folder.exists());
    }

    #[tokio::test]
    async fn rejects_empty_channel_and_zero_budget() {
        let dir = tempfile::tempdir().unwrap();
        let make = || {
            harvester(
                FakeFeed { items: Vec::new() },
                FakeAcquirer::new(&[]),
                dir.path(),
            )
        };

        assert!(matches!(
            make().run("", 30).await.unwrap_err(),
            Error::InvalidArgument(_)
        ));
        assert!(matches!(
            make().run("funny", 0).await.unwrap_err(),
            Error::InvalidArgument(_)
        ));
    }
}
