//! Batch publication to the hosting service.
//!
//! Authenticates once per batch, then uploads records through a bounded
//! worker pool. One record failing never stops the others; an
//! authentication failure aborts the whole batch before any upload starts.

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use rf_core::{Error, Result};

use crate::batch::{BatchQueue, PublishRecord};
use crate::config::UploadDetails;

/// A video hosting backend. Production talks to the YouTube data API via
/// [`TubeClient`]; tests substitute fakes.
#[async_trait]
pub trait HostingApi: Send + Sync {
    type Session: Clone + Send + Sync + 'static;

    /// Establish a session valid for one batch.
    async fn authenticate(&self) -> Result<Self::Session>;

    /// Upload one artifact, returning its public URL.
    async fn upload(&self, session: &Self::Session, path: &Path, details: &UploadDetails)
        -> Result<String>;
}

/// Outcome for one record, in queue order.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub record: PublishRecord,
    pub result: Result<String>,
}

pub struct Dispatcher<A> {
    api: Arc<A>,
    workers: usize,
    keep_local: bool,
}

impl<A: HostingApi + 'static> Dispatcher<A> {
    pub fn new(api: A) -> Self {
        Self {
            api: Arc::new(api),
            workers: 4,
            keep_local: true,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// When false, successfully published artifacts are removed from disk.
    pub fn with_keep_local(mut self, keep_local: bool) -> Self {
        self.keep_local = keep_local;
        self
    }

    /// Drain `queue` and publish everything in it. Failed records are
    /// written back to the queue for the next dispatch.
    pub async fn dispatch_queue(&self, queue: &BatchQueue) -> Result<Vec<DispatchOutcome>> {
        let records = queue.take_all()?;
        if records.is_empty() {
            tracing::info!("publish queue is empty, nothing to dispatch");
            return Ok(Vec::new());
        }
        let outcomes = match self.dispatch(records.clone()).await {
            Ok(outcomes) => outcomes,
            Err(err) => {
                // Auth never consumed any record; put the batch back intact.
                queue.save(&records)?;
                return Err(err);
            }
        };

        let failed: Vec<PublishRecord> = outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.record.clone())
            .collect();
        if !failed.is_empty() {
            queue.save(&failed)?;
        }
        Ok(outcomes)
    }

    /// Publish `records`, returning one outcome per record in order.
    pub async fn dispatch(&self, records: Vec<PublishRecord>) -> Result<Vec<DispatchOutcome>> {
        let session = self.api.authenticate().await?;
        tracing::info!(records = records.len(), "dispatching publish batch");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(records.len());

        for record in records {
            let permit = semaphore.clone();
            let api = self.api.clone();
            let session = session.clone();
            let keep_local = self.keep_local;
            let fallback = record.clone();

            let handle = tokio::spawn(async move {
                let _permit = match permit.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return DispatchOutcome {
                            result: Err(Error::invalid("worker pool closed")),
                            record,
                        }
                    }
                };
                let result = publish_one(api.as_ref(), &session, &record, keep_local).await;
                DispatchOutcome { record, result }
            });
            handles.push((fallback, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (fallback, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                // A panicked worker fails its own record only.
                Err(err) => outcomes.push(DispatchOutcome {
                    record: fallback,
                    result: Err(Error::invalid(format!("upload task failed: {err}"))),
                }),
            }
        }

        let (ok, failed): (Vec<_>, Vec<_>) = outcomes.iter().partition(|o| o.result.is_ok());
        tracing::info!(published = ok.len(), failed = failed.len(), "dispatch finished");
        for outcome in &failed {
            tracing::warn!(
                title = %outcome.record.details.title,
                error = %outcome.result.as_ref().err().map(|e| e.to_string()).unwrap_or_default(),
                "record failed to publish"
            );
        }
        Ok(outcomes)
    }
}

async fn publish_one<A: HostingApi>(
    api: &A,
    session: &A::Session,
    record: &PublishRecord,
    keep_local: bool,
) -> Result<String> {
    if record.details.title.is_empty() {
        return Err(Error::invalid("upload title must not be empty"));
    }
    let meta = std::fs::metadata(&record.artifact_path).map_err(|_| Error::NotFound {
        entity: "artifact".into(),
        id: record.artifact_path.display().to_string(),
    })?;
    if meta.len() == 0 {
        return Err(Error::invalid(format!(
            "artifact {} is empty",
            record.artifact_path.display()
        )));
    }

    let url = api
        .upload(session, &record.artifact_path, &record.details)
        .await?;
    tracing::info!(title = %record.details.title, %url, "published");

    if !keep_local {
        if let Err(err) = std::fs::remove_file(&record.artifact_path) {
            tracing::warn!(
                artifact = %record.artifact_path.display(),
                error = %err,
                "could not remove published artifact"
            );
        }
    }
    Ok(url)
}

/// YouTube data API client using the two-step resumable upload.
pub struct TubeClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

/// Bearer token validated for the current batch.
#[derive(Clone)]
pub struct TubeSession {
    token: String,
}

impl TubeClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1800))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn snippet(details: &UploadDetails) -> serde_json::Value {
        json!({
            "snippet": {
                "title": details.title,
                "description": details.description,
                "categoryId": details.category,
            },
            "status": {
                "privacyStatus": details.privacy,
                "publishAt": details.publish_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        })
    }
}

#[async_trait]
impl HostingApi for TubeClient {
    type Session = TubeSession;

    async fn authenticate(&self) -> Result<TubeSession> {
        let token = self
            .token
            .clone()
            .ok_or_else(|| Error::Auth("no API token configured".into()))?;

        let url = format!("{}/youtube/v3/channels?part=id&mine=true", self.api_base);
        let response = self.client.get(&url).bearer_auth(&token).send().await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("API token rejected".into()));
        }
        response.error_for_status()?;
        Ok(TubeSession { token })
    }

    async fn upload(
        &self,
        session: &TubeSession,
        path: &Path,
        details: &UploadDetails,
    ) -> Result<String> {
        let start_url = format!(
            "{}/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status",
            self.api_base
        );
        let response = self
            .client
            .post(&start_url)
            .bearer_auth(&session.token)
            .json(&Self::snippet(details))
            .send()
            .await?
            .error_for_status()?;

        let upload_url = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::invalid("upload session response missing Location header"))?;

        let body = tokio::fs::read(path).await?;
        let response = self
            .client
            .put(&upload_url)
            .bearer_auth(&session.token)
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        let uploaded: serde_json::Value = response.json().await?;
        let id = uploaded
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::invalid("upload response missing video id"))?;
        Ok(format!("https://youtu.be/{id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeApi {
        auth_calls: AtomicUsize,
        auth_fails: bool,
        /// Titles whose upload fails.
        broken: Vec<String>,
        /// Titles whose upload panics.
        panicking: Vec<String>,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                auth_calls: AtomicUsize::new(0),
                auth_fails: false,
                broken: Vec::new(),
                panicking: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl HostingApi for FakeApi {
        type Session = ();

        async fn authenticate(&self) -> Result<()> {
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            if self.auth_fails {
                return Err(Error::Auth("bad credentials".into()));
            }
            Ok(())
        }

        async fn upload(&self, _session: &(), _path: &Path, details: &UploadDetails) -> Result<String> {
            if self.panicking.contains(&details.title) {
                panic!("upload worker crashed");
            }
            if self.broken.contains(&details.title) {
                return Err(Error::tool("api", "upload rejected"));
            }
            Ok(format!("https://youtu.be/{}", details.episode))
        }
    }

    fn record(dir: &Path, name: &str, title: &str, episode: u64) -> PublishRecord {
        let artifact = dir.join(name);
        std::fs::write(&artifact, b"video").unwrap();
        PublishRecord {
            artifact_path: artifact,
            details: UploadDetails {
                title: title.into(),
                description: "desc".into(),
                category: "24".into(),
                privacy: "private".into(),
                episode,
                duration_seconds: 600,
                publish_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record(dir.path(), "a.mp4", "A", 1),
            record(dir.path(), "b.mp4", "B", 2),
            record(dir.path(), "c.mp4", "C", 3),
        ];
        let mut api = FakeApi::new();
        api.broken = vec!["B".into()];
        let dispatcher = Dispatcher::new(api).with_workers(2);

        let outcomes = dispatcher.dispatch(records).await.unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(outcomes[2].result.is_ok());
        assert_eq!(dispatcher.api.auth_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicked_worker_fails_only_its_record() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record(dir.path(), "a.mp4", "A", 1),
            record(dir.path(), "b.mp4", "B", 2),
            record(dir.path(), "c.mp4", "C", 3),
        ];
        let mut api = FakeApi::new();
        api.panicking = vec!["B".into()];
        let dispatcher = Dispatcher::new(api).with_workers(2);

        let outcomes = dispatcher.dispatch(records).await.unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert_eq!(outcomes[1].record.details.title, "B");
        assert!(outcomes[2].result.is_ok());
    }

    #[tokio::test]
    async fn auth_failure_aborts_before_any_upload() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(dir.path(), "a.mp4", "A", 1)];
        let mut api = FakeApi::new();
        api.auth_fails = true;
        let dispatcher = Dispatcher::new(api);

        let err = dispatcher.dispatch(records).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        // The artifact was never consumed.
        assert!(dir.path().join("a.mp4").exists());
    }

    #[tokio::test]
    async fn missing_artifact_fails_only_its_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = vec![record(dir.path(), "a.mp4", "A", 1)];
        records.push(PublishRecord {
            artifact_path: PathBuf::from("/nonexistent/b.mp4"),
            details: records[0].details.clone(),
        });
        let dispatcher = Dispatcher::new(FakeApi::new());

        let outcomes = dispatcher.dispatch(records).await.unwrap();
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn keep_local_false_removes_published_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(dir.path(), "a.mp4", "A", 1)];
        let dispatcher = Dispatcher::new(FakeApi::new()).with_keep_local(false);

        dispatcher.dispatch(records).await.unwrap();
        assert!(!dir.path().join("a.mp4").exists());
    }

    #[tokio::test]
    async fn failed_records_are_requeued() {
        let dir = tempfile::tempdir().unwrap();
        let queue = BatchQueue::new(dir.path().join("batch_upload.json"));
        queue.enqueue(record(dir.path(), "a.mp4", "A", 1)).unwrap();
        queue.enqueue(record(dir.path(), "b.mp4", "B", 2)).unwrap();

        let mut api = FakeApi::new();
        api.broken = vec!["B".into()];
        let dispatcher = Dispatcher::new(api);

        let outcomes = dispatcher.dispatch_queue(&queue).await.unwrap();
        assert_eq!(outcomes.len(), 2);

        let remaining = queue.load().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].details.title, "B");
    }
}
