//! End-to-end pipeline orchestration.
//!
//! Wires configuration into the concrete harvest, transform and publish
//! stages. One channel failing its harvest or compile never stops the
//! others; the publish queue is dispatched once per run, after every
//! channel has been processed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, Utc};
use chrono_tz::Tz;

use rf_av::{EncodeProfile, ToolRegistry, YtDlp};
use rf_core::{Error, Result, RetryPolicy};

use crate::batch::{BatchQueue, PublishRecord};
use crate::config::{ChannelStore, Config};
use crate::feed::RedditFeed;
use crate::harvest::{Harvester, HarvestReport};
use crate::publish::{Dispatcher, TubeClient};
use crate::store::HttpObjectStore;
use crate::transform::{FfmpegTranscoder, TransformEngine};

/// Shared handles for one invocation.
pub struct Pipeline {
    config: Config,
    registry: ToolRegistry,
    channels: ChannelStore,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let overrides: HashMap<&str, Option<&Path>> = HashMap::from([
            ("ffmpeg", config.tools.ffmpeg_path.as_deref()),
            ("ffprobe", config.tools.ffprobe_path.as_deref()),
            ("yt-dlp", config.tools.ytdlp_path.as_deref()),
        ]);
        let registry =
            ToolRegistry::discover(&overrides, Duration::from_secs(config.tools.timeout_secs));
        let channels = ChannelStore::new(&config.publish.channels_path);
        Self {
            config,
            registry,
            channels,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Harvest one channel using its configured duration budget, or
    /// `budget_override` when given.
    pub async fn harvest(&self, channel: &str, budget_override: Option<u64>) -> Result<HarvestReport> {
        let budget = match budget_override {
            Some(seconds) => seconds,
            None => self.channels.get(channel)?.duration_in_seconds,
        };

        let feed = RedditFeed::new(self.config.harvest.feed_mode.clone())?;
        let tool = self.registry.require("yt-dlp")?.clone();
        let mut acquirer = YtDlp::new(tool);
        if let Some(cookies) = &self.config.harvest.cookies_file {
            acquirer = acquirer.with_cookies(cookies.clone());
        }

        let harvester = Harvester::new(feed, acquirer, &self.config.harvest.output_dir)
            .with_max_clip_seconds(self.config.harvest.max_clip_seconds)
            .with_pause(Duration::from_secs(self.config.harvest.pause_secs))
            .with_retry(RetryPolicy {
                max_attempts: self.config.harvest.retry_attempts,
                backoff: Duration::from_secs(self.config.harvest.retry_backoff_secs),
            });
        harvester.run(channel, budget).await
    }

    /// Compile a harvest folder into a single artifact.
    pub async fn compile(&self, folder: &Path) -> Result<PathBuf> {
        let transcoder = FfmpegTranscoder::new(
            self.registry.require("ffmpeg")?.clone(),
            self.registry.require("ffprobe")?.clone(),
        );
        let profile = EncodeProfile {
            width: self.config.transform.width,
            height: self.config.transform.height,
            frame_rate: self.config.transform.frame_rate,
        };
        let mut engine = TransformEngine::new(transcoder)
            .with_profile(profile)
            .with_workers(self.config.transform.workers);

        if self.config.storage.enabled {
            let store = HttpObjectStore::new(
                &self.config.storage.endpoint,
                &self.config.storage.bucket,
                self.config.storage.token.clone(),
            )?;
            engine = engine.with_store(Arc::new(store), &self.config.harvest.output_dir);
        }
        engine.compile(folder).await
    }

    /// Queue a compiled artifact for the channel's next episode.
    pub fn enqueue(&self, channel: &str, artifact: PathBuf) -> Result<()> {
        let publish_time = self.publish_time()?;
        let tz = self.timezone()?;
        let details = self
            .channels
            .next_upload_details(channel, publish_time, tz, Utc::now())?;
        let queue = BatchQueue::new(&self.config.publish.batch_path);
        queue.enqueue(PublishRecord {
            artifact_path: artifact,
            details,
        })
    }

    /// Publish everything waiting in the batch queue.
    pub async fn dispatch(&self) -> Result<usize> {
        let api = TubeClient::new(
            &self.config.publish.api_base,
            self.config.publish.token.clone(),
        )?;
        let dispatcher = Dispatcher::new(api)
            .with_workers(self.config.publish.workers)
            .with_keep_local(self.config.publish.keep_local);

        let queue = BatchQueue::new(&self.config.publish.batch_path);
        let outcomes = dispatcher.dispatch_queue(&queue).await?;
        Ok(outcomes.iter().filter(|o| o.result.is_ok()).count())
    }

    /// Run the whole pipeline for the given channels, or every configured
    /// channel when `channels` is empty.
    pub async fn run(&self, channels: &[String]) -> Result<()> {
        let selected: Vec<String> = if channels.is_empty() {
            self.channels.load()?.into_keys().collect()
        } else {
            channels.to_vec()
        };
        if selected.is_empty() {
            return Err(Error::invalid("no channels configured"));
        }

        let mut produced = 0usize;
        for channel in &selected {
            match self.run_channel(channel).await {
                Ok(()) => produced += 1,
                Err(err) => {
                    tracing::error!(%channel, error = %err, "channel run failed, continuing");
                }
            }
        }
        tracing::info!(produced, total = selected.len(), "all channels processed");

        let published = self.dispatch().await?;
        tracing::info!(published, "pipeline run finished");
        Ok(())
    }

    async fn run_channel(&self, channel: &str) -> Result<()> {
        let report = self.harvest(channel, None).await?;
        if report.clips == 0 {
            return Err(Error::NoValidClips {
                folder: report.folder,
            });
        }
        let artifact = self.compile(&report.folder).await?;
        self.enqueue(channel, artifact)
    }

    fn publish_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.config.publish.publish_time, "%H:%M:%S")
            .map_err(|e| Error::Config(format!("invalid publish_time: {e}")))
    }

    fn timezone(&self) -> Result<Tz> {
        self.config
            .publish
            .timezone
            .parse::<Tz>()
            .map_err(|_| Error::Config(format!("unknown timezone {}", self.config.publish.timezone)))
    }
}
