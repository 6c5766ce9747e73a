//! Compilation building.
//!
//! Takes a folder of harvested clips and produces a single compilation:
//! clips are normalized to the canonical encode profile (concurrently,
//! skipping clips already in profile), captioned with their original
//! titles, and concatenated with stream copy. Clips that fail any stage
//! are dropped; only a folder with no surviving clips fails the run.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

use rf_av::{overlay, EncodeProfile, StreamInfo, Tool};
use rf_core::{Error, Result};

use crate::manifest::Manifest;
use crate::store::{object_key, ObjectStore};

/// The encode operations the engine drives. Production uses ffmpeg via
/// [`FfmpegTranscoder`]; tests substitute counting fakes.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<StreamInfo>;
    async fn reencode(&self, src: &Path, dest: &Path, profile: &EncodeProfile) -> Result<()>;
    async fn overlay(&self, src: &Path, dest: &Path, text: &str) -> Result<()>;
    async fn concat(&self, clips: &[PathBuf], dest: &Path) -> Result<()>;
}

pub struct FfmpegTranscoder {
    ffmpeg: Tool,
    ffprobe: Tool,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg: Tool, ffprobe: Tool) -> Self {
        Self { ffmpeg, ffprobe }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe(&self, path: &Path) -> Result<StreamInfo> {
        rf_av::probe(&self.ffprobe, path).await
    }

    async fn reencode(&self, src: &Path, dest: &Path, profile: &EncodeProfile) -> Result<()> {
        rf_av::reencode(&self.ffmpeg, src, dest, profile).await
    }

    async fn overlay(&self, src: &Path, dest: &Path, text: &str) -> Result<()> {
        overlay::overlay_caption(&self.ffmpeg, src, dest, text).await
    }

    async fn concat(&self, clips: &[PathBuf], dest: &Path) -> Result<()> {
        rf_av::concat(&self.ffmpeg, clips, dest).await
    }
}

pub struct TransformEngine<T> {
    transcoder: Arc<T>,
    profile: EncodeProfile,
    workers: usize,
    store: Option<(Arc<dyn ObjectStore>, PathBuf)>,
}

impl<T: Transcoder + 'static> TransformEngine<T> {
    pub fn new(transcoder: T) -> Self {
        Self {
            transcoder: Arc::new(transcoder),
            profile: EncodeProfile::default(),
            workers: 4,
            store: None,
        }
    }

    pub fn with_profile(mut self, profile: EncodeProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Archive finished compilations to `store` under a key relative to
    /// `output_root`. Archive failures never fail the compile.
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>, output_root: impl Into<PathBuf>) -> Self {
        self.store = Some((store, output_root.into()));
        self
    }

    /// Build `folder`'s compilation, returning the path of the finished
    /// artifact (`result/result.mp4` inside the folder).
    pub async fn compile(&self, folder: &Path) -> Result<PathBuf> {
        let clips = list_clips(folder)?;
        if clips.is_empty() {
            return Err(Error::NoValidClips {
                folder: folder.to_path_buf(),
            });
        }
        let manifest = Manifest::load(folder)?;

        let converted_dir = folder.join("converted");
        let result_dir = folder.join("result");
        std::fs::create_dir_all(&converted_dir)?;
        std::fs::create_dir_all(&result_dir)?;

        let normalized = self.normalize_all(&clips, &converted_dir).await;
        if normalized.is_empty() {
            return Err(Error::NoValidClips {
                folder: folder.to_path_buf(),
            });
        }

        let captioned = self.caption_all(&normalized, &manifest, &result_dir).await;
        if captioned.is_empty() {
            return Err(Error::NoValidClips {
                folder: folder.to_path_buf(),
            });
        }

        let artifact = result_dir.join("result.mp4");
        self.transcoder.concat(&captioned, &artifact).await?;
        tracing::info!(artifact = %artifact.display(), clips = captioned.len(), "compilation built");

        if let Some((store, output_root)) = &self.store {
            match object_key(output_root, &artifact) {
                Ok(key) => {
                    if let Err(err) = store.put(&key, &artifact).await {
                        tracing::warn!(%key, error = %err, "artifact archive failed");
                    }
                }
                Err(err) => tracing::warn!(error = %err, "artifact outside output root, not archived"),
            }
        }

        Ok(artifact)
    }

    /// Normalize every clip concurrently, bounded by the worker count.
    /// Clips already in profile are copied through without reencoding;
    /// clips that fail are dropped. Output order is by clip filename, not
    /// completion order.
    async fn normalize_all(&self, clips: &[PathBuf], converted_dir: &Path) -> Vec<PathBuf> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(clips.len());

        for clip in clips {
            let permit = semaphore.clone();
            let transcoder = self.transcoder.clone();
            let profile = self.profile.clone();
            let src = clip.clone();
            let dest = converted_dir.join(src.file_name().unwrap_or_default());

            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.ok()?;
                match normalize_one(transcoder.as_ref(), &src, &dest, &profile).await {
                    Ok(()) => Some(dest),
                    Err(err) => {
                        tracing::warn!(clip = %src.display(), error = %err, "clip dropped during normalize");
                        None
                    }
                }
            }));
        }

        let mut normalized = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(path)) => normalized.push(path),
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "normalize task panicked"),
            }
        }
        sort_by_clip_number(&mut normalized);
        normalized
    }

    /// Burn each clip's original title in sequentially, dropping clips
    /// whose overlay fails.
    async fn caption_all(
        &self,
        normalized: &[PathBuf],
        manifest: &Manifest,
        result_dir: &Path,
    ) -> Vec<PathBuf> {
        let mut captioned = Vec::with_capacity(normalized.len());
        for clip in normalized {
            let filename = clip
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let title = manifest.title_for(&filename);
            let dest = result_dir.join(format!("captioned_{filename}"));
            match self.transcoder.overlay(clip, &dest, title).await {
                Ok(()) => captioned.push(dest),
                Err(err) => {
                    tracing::warn!(clip = %clip.display(), error = %err, "clip dropped during caption");
                }
            }
        }
        captioned
    }
}

async fn normalize_one<T: Transcoder + ?Sized>(
    transcoder: &T,
    src: &Path,
    dest: &Path,
    profile: &EncodeProfile,
) -> Result<()> {
    let info = transcoder.probe(src).await?;
    if profile.matches(&info) {
        tracing::debug!(clip = %src.display(), "clip already in profile, copying through");
        std::fs::copy(src, dest)?;
        Ok(())
    } else {
        transcoder.reencode(src, dest, profile).await
    }
}

/// The `.mp4` files directly inside `folder`, ordered by clip number.
fn list_clips(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(Error::NotFound {
            entity: "harvest folder".into(),
            id: folder.display().to_string(),
        });
    }
    let mut clips = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "mp4") {
            clips.push(path);
        }
    }
    sort_by_clip_number(&mut clips);
    Ok(clips)
}

/// Sort by the numeric file stem so `10.mp4` follows `9.mp4`, falling back
/// to lexicographic order for non-numeric names.
fn sort_by_clip_number(paths: &mut [PathBuf]) {
    paths.sort_by_key(|path| {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        (stem.parse::<u64>().ok(), stem)
    });
}
