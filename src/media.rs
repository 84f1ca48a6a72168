use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::ImageFormat;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory relative preview paths are resolved against.
    pub base_dir: Option<PathBuf>,
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: None,
            workers: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewInfo {
    pub path: PathBuf,
    pub format: Option<ImageFormat>,
    /// `None` when this build has no decoder for the format (AVIF).
    pub dimensions: Option<(u32, u32)>,
    pub size_bytes: u64,
}

/// Outcome of one probe. `info` is `None` when the display should fall back
/// to a placeholder.
#[derive(Debug)]
pub struct ResultEntry {
    pub item_id: String,
    pub info: Option<PreviewInfo>,
    pub error: Option<anyhow::Error>,
}

struct Job {
    item_id: String,
    preview: String,
}

struct Inner {
    cfg: Config,
    results: Sender<ResultEntry>,
}

/// Reads preview image headers on background threads. Results come back on a
/// channel that the UI drains between events.
pub struct Manager {
    jobs: Sender<Job>,
    stop: Sender<()>,
    results: Receiver<ResultEntry>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl Manager {
    pub fn new(cfg: Config) -> Result<Self> {
        let mut cfg = cfg;
        if cfg.workers == 0 {
            cfg.workers = 2;
        }

        let (job_tx, job_rx) = unbounded::<Job>();
        let (stop_tx, stop_rx) = unbounded::<()>();
        let (result_tx, result_rx) = unbounded();
        let inner = Arc::new(Inner {
            cfg,
            results: result_tx,
        });

        let mut handles = Vec::new();
        for worker in 0..inner.cfg.workers {
            let rx_jobs = job_rx.clone();
            let rx_stop = stop_rx.clone();
            let worker_inner = inner.clone();
            let handle = thread::Builder::new()
                .name(format!("preview-{worker}"))
                .spawn(move || worker_inner.worker(rx_jobs, rx_stop))
                .context("media: spawn preview worker")?;
            handles.push(handle);
        }

        Ok(Self {
            jobs: job_tx,
            stop: stop_tx,
            results: result_rx,
            handles,
        })
    }

    pub fn handle(&self) -> Handle {
        Handle {
            jobs: self.jobs.clone(),
            results: self.results.clone(),
        }
    }

    fn shutdown(&mut self) {
        for _ in &self.handles {
            let _ = self.stop.send(());
        }
        while let Some(handle) = self.handles.pop() {
            let _ = handle.join();
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Clone)]
pub struct Handle {
    jobs: Sender<Job>,
    results: Receiver<ResultEntry>,
}

impl Handle {
    /// Queues a probe. Fire-and-forget: a closed pool just drops the request.
    pub fn enqueue(&self, item_id: &str, preview: &str) {
        let _ = self.jobs.send(Job {
            item_id: item_id.to_string(),
            preview: preview.to_string(),
        });
    }

    pub fn try_recv(&self) -> Option<ResultEntry> {
        self.results.try_recv().ok()
    }
}

impl Inner {
    fn worker(&self, jobs: Receiver<Job>, stop: Receiver<()>) {
        loop {
            crossbeam_channel::select! {
                recv(stop) -> _ => break,
                recv(jobs) -> msg => {
                    match msg {
                        Ok(job) => self.process(job),
                        Err(_) => break,
                    }
                }
            }
        }
    }

    fn process(&self, job: Job) {
        let result = match probe(self.cfg.base_dir.as_deref(), &job.preview) {
            Ok(info) => ResultEntry {
                item_id: job.item_id,
                info: Some(info),
                error: None,
            },
            Err(err) => {
                tracing::debug!(item = %job.item_id, error = %err, "preview probe failed");
                ResultEntry {
                    item_id: job.item_id,
                    info: None,
                    error: Some(err),
                }
            }
        };
        let _ = self.results.send(result);
    }
}

/// Resolves `preview` and reads its format, file size and, when the format can
/// be decoded here, its pixel size without decoding the whole image.
pub fn probe(base_dir: Option<&Path>, preview: &str) -> Result<PreviewInfo> {
    if preview.trim().is_empty() {
        return Err(anyhow!("media: preview path required"));
    }
    if is_remote(preview) {
        return Err(anyhow!("media: remote previews are not fetched"));
    }
    let path = resolve(base_dir, preview);
    let meta = fs::metadata(&path)
        .with_context(|| format!("media: stat {}", path.display()))?;
    let format = ImageFormat::from_path(&path)
        .with_context(|| format!("media: unrecognised image format {}", path.display()))?;
    let dimensions = if format.reading_enabled() {
        Some(
            image::image_dimensions(&path)
                .with_context(|| format!("media: read dimensions of {}", path.display()))?,
        )
    } else {
        tracing::trace!(path = %path.display(), ?format, "no decoder, keeping file info only");
        None
    };
    Ok(PreviewInfo {
        path,
        format: Some(format),
        dimensions,
        size_bytes: meta.len(),
    })
}

pub fn resolve(base_dir: Option<&Path>, preview: &str) -> PathBuf {
    let candidate = PathBuf::from(preview);
    match base_dir {
        Some(base) if candidate.is_relative() => base.join(candidate),
        _ => candidate,
    }
}

fn is_remote(preview: &str) -> bool {
    let lower = preview.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:")
}

pub fn format_label(format: Option<ImageFormat>) -> &'static str {
    match format {
        Some(ImageFormat::Avif) => "AVIF",
        Some(ImageFormat::Png) => "PNG",
        Some(ImageFormat::Jpeg) => "JPEG",
        Some(ImageFormat::WebP) => "WebP",
        Some(ImageFormat::Gif) => "GIF",
        _ => "image",
    }
}
