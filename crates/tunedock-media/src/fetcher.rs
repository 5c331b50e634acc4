//! Media fetcher - source download and MP3 transcoding via yt-dlp

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tunedock_core::models::BitrateTier;
use uuid::Uuid;

/// Why a fetch failed. Causes are kept distinct because each maps to a
/// different client-facing message and some (network, timeout) are worth
/// retrying by resubmission while others never will be.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Source requires sign-in: {0}")]
    SignInRequired(String),

    #[error("Source is age-restricted: {0}")]
    AgeRestricted(String),

    #[error("Network failure while fetching source: {0}")]
    Network(String),

    #[error("Fetch timed out after {0} seconds")]
    Timeout(u64),

    #[error("Fetch tool not found: {0}")]
    ToolUnavailable(String),

    #[error("Transcoder (ffmpeg) not available: {0}")]
    TranscoderUnavailable(String),

    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("Failed to parse source metadata: {0}")]
    Metadata(String),

    #[error("I/O failure during fetch: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Message safe to store on the job and show to clients. Raw stderr is
    /// logged by the caller, never surfaced here.
    pub fn client_message(&self) -> &'static str {
        match self {
            FetchError::Unavailable(_) => "The source media is unavailable or private",
            FetchError::SignInRequired(_) => {
                "The source requires sign-in and cannot be downloaded"
            }
            FetchError::AgeRestricted(_) => {
                "The source is age-restricted and cannot be downloaded"
            }
            FetchError::Network(_) => "A network error occurred while fetching the source",
            FetchError::Timeout(_) => "The download timed out",
            FetchError::ToolUnavailable(_) | FetchError::TranscoderUnavailable(_) => {
                "Audio conversion tooling is unavailable on the server"
            }
            FetchError::TranscodeFailed(_) => "Audio conversion failed",
            FetchError::Metadata(_) => "The source metadata could not be read",
            FetchError::Io(_) => "Downloading the source failed",
        }
    }
}

/// Classify a nonzero yt-dlp exit by its stderr text.
///
/// Ordering matters: the missing-ffmpeg message mentions postprocessing, and
/// YouTube's age gate says "sign in to confirm your age", so the more
/// specific patterns are checked first.
fn classify_stderr(stderr: &str) -> FetchError {
    let lowered = stderr.to_lowercase();
    let summary = first_error_line(stderr);

    if lowered.contains("ffmpeg not found")
        || (lowered.contains("ffprobe") && lowered.contains("not found"))
    {
        FetchError::TranscoderUnavailable(summary)
    } else if lowered.contains("age-restricted")
        || lowered.contains("age restricted")
        || lowered.contains("confirm your age")
    {
        FetchError::AgeRestricted(summary)
    } else if lowered.contains("sign in") || lowered.contains("login required") {
        FetchError::SignInRequired(summary)
    } else if lowered.contains("video unavailable")
        || lowered.contains("private video")
        || lowered.contains("has been removed")
        || lowered.contains("no longer available")
    {
        FetchError::Unavailable(summary)
    } else if lowered.contains("unable to download")
        || lowered.contains("network")
        || lowered.contains("getaddrinfo")
        || lowered.contains("timed out")
        || lowered.contains("connection refused")
        || lowered.contains("temporary failure")
    {
        FetchError::Network(summary)
    } else {
        FetchError::TranscodeFailed(summary)
    }
}

/// First `ERROR:` line of stderr, or the first non-empty line as fallback.
fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .find(|line| line.trim_start().starts_with("ERROR"))
        .or_else(|| stderr.lines().find(|line| !line.trim().is_empty()))
        .unwrap_or("no output")
        .trim()
        .to_string()
}

/// What a fetch needs to know. `dest_dir` is the job's scratch directory.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub source_url: String,
    pub bitrate_tier: BitrateTier,
    pub dest_dir: PathBuf,
    pub job_id: Uuid,
}

/// A fetched, transcoded artifact plus the metadata yt-dlp reported for it.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub artifact_path: PathBuf,
    pub title: Option<String>,
    pub thumbnail_ref: Option<String>,
    pub duration_seconds: Option<i32>,
}

/// Downloads a source URL and transcodes it to MP3 in one step.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch_and_transcode(&self, request: &FetchRequest)
        -> Result<FetchedMedia, FetchError>;
}

/// Subset of the JSON document yt-dlp emits with `--print-json`.
#[derive(Debug, Deserialize, Default)]
struct YtDlpMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

/// MediaFetcher backed by the yt-dlp CLI.
pub struct YtDlpFetcher {
    ytdlp_path: String,
    ffmpeg_path: Option<String>,
    timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(ytdlp_path: String, ffmpeg_path: Option<String>, timeout: Duration) -> Self {
        Self {
            ytdlp_path,
            ffmpeg_path,
            timeout,
        }
    }

    fn build_args(&self, request: &FetchRequest) -> Vec<String> {
        let quality = format!("{}K", request.bitrate_tier.kbps());
        let postprocessor = format!(
            "FFmpegExtractAudio:-b:a {}k -ar 44100 -ac 2",
            request.bitrate_tier.kbps()
        );
        let output_template = request
            .dest_dir
            .join(format!("{}.%(ext)s", request.job_id))
            .to_string_lossy()
            .to_string();

        let mut args = vec![
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            quality,
            "--postprocessor-args".to_string(),
            postprocessor,
            "-o".to_string(),
            output_template,
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--print-json".to_string(),
        ];

        if let Some(ref ffmpeg) = self.ffmpeg_path {
            args.extend_from_slice(&["--ffmpeg-location".to_string(), ffmpeg.clone()]);
        }

        args.push(request.source_url.clone());
        args
    }

    fn parse_metadata(stdout: &str) -> Result<YtDlpMetadata, FetchError> {
        // --print-json emits one JSON object per downloaded entry; with
        // --no-playlist that is a single line, but warnings can precede it.
        let json_line = stdout
            .lines()
            .rev()
            .find(|line| line.trim_start().starts_with('{'))
            .ok_or_else(|| FetchError::Metadata("no JSON document in output".to_string()))?;

        serde_json::from_str(json_line).map_err(|e| FetchError::Metadata(e.to_string()))
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    #[tracing::instrument(skip(self, request), fields(job_id = %request.job_id))]
    async fn fetch_and_transcode(
        &self,
        request: &FetchRequest,
    ) -> Result<FetchedMedia, FetchError> {
        tokio::fs::create_dir_all(&request.dest_dir).await?;

        let args = self.build_args(request);
        let start = std::time::Instant::now();

        let child = Command::new(&self.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FetchError::ToolUnavailable(self.ytdlp_path.clone()),
                _ => FetchError::Io(e),
            })?;

        // Dropping the wait future on timeout kills the child via kill_on_drop.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    url = %request.source_url,
                    timeout_secs = self.timeout.as_secs(),
                    "yt-dlp timed out, killing process"
                );
                return Err(FetchError::Timeout(self.timeout.as_secs()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(
                url = %request.source_url,
                exit_code = output.status.code(),
                stderr = %stderr,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "yt-dlp failed"
            );
            return Err(classify_stderr(&stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let metadata = Self::parse_metadata(&stdout)?;

        let artifact_path = request
            .dest_dir
            .join(format!("{}.mp3", request.job_id));
        if !tokio::fs::try_exists(&artifact_path).await.unwrap_or(false) {
            return Err(FetchError::TranscodeFailed(
                "yt-dlp exited cleanly but produced no MP3 artifact".to_string(),
            ));
        }

        tracing::info!(
            url = %request.source_url,
            artifact = %artifact_path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Fetch and transcode successful"
        );

        Ok(FetchedMedia {
            artifact_path,
            title: metadata.title,
            thumbnail_ref: metadata.thumbnail,
            duration_seconds: metadata.duration.map(|d| d.round() as i32),
        })
    }
}
