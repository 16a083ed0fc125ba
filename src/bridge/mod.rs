//! Conversion of animated WebP sources into GIF through a remote web service.
//!
//! The service is driven by a three step protocol that was reverse engineered from its web
//! form: a multipart upload answered by a redirect to a job page, an AJAX trigger on that job
//! page, and a download of the link scraped from the trigger's HTML. All HTTP goes through the
//! [`Transport`] trait so the protocol can be exercised without a network.

use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use regex::Regex;
use reqwest::Url;

use crate::config::BridgeConfig;
use crate::foundation::error::{StickerError, StickerResult};

/// HTTP transport backed by `reqwest`.
pub mod http;

pub use http::HttpTransport;

/// Protocol step, used to attribute transport failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeStep {
    Upload,
    Trigger,
    Download,
}

impl fmt::Display for BridgeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upload => "upload",
            Self::Trigger => "trigger",
            Self::Download => "download",
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("upload rejected (HTTP {status})")]
    UploadRejected { status: u16 },

    #[error("trigger failed (HTTP {status})")]
    TriggerFailed { status: u16 },

    #[error("save link not found in trigger response")]
    SaveLinkNotFound,

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("{step} timed out")]
    Timeout { step: BridgeStep },

    #[error("{step} request failed: {msg}")]
    Transport { step: BridgeStep, msg: String },
}

impl BridgeError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// A rejected upload or a response without a save link is a definitive answer from the
    /// service and is never retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::UploadRejected { .. } | Self::SaveLinkNotFound)
    }
}

/// Status and headers of a non-streamed response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

/// A response whose body is read incrementally.
pub struct HttpStream {
    pub status: u16,
    pub body: Box<dyn Read + Send>,
}

/// The three kinds of request the protocol needs.
pub trait Transport: Send + Sync {
    /// Multipart POST of `file` under the form field `field`. Redirects are not followed.
    fn upload(&self, url: &Url, field: &str, file: &Path) -> Result<HttpReply, BridgeError>;

    /// Form-encoded POST with extra query parameters.
    fn post_form(
        &self,
        url: &Url,
        query: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<HttpReply, BridgeError>;

    /// GET with a streamed body.
    fn get(&self, url: &Url) -> Result<HttpStream, BridgeError>;
}

/// Converts an animated source into the intermediate frame-sequence format.
pub trait FormatBridge: Send + Sync {
    fn convert(&self, src: &Path, dst: &Path) -> Result<(), BridgeError>;
}

/// [`FormatBridge`] for the remote webp-to-gif service.
pub struct RemoteFormatBridge<T = HttpTransport> {
    transport: T,
    upload_url: Url,
    upload_field: String,
    save_link: Regex,
    chunk_size: usize,
}

impl RemoteFormatBridge<HttpTransport> {
    pub fn from_config(cfg: &BridgeConfig) -> StickerResult<Self> {
        Self::with_transport(cfg, HttpTransport::new(cfg.timeout())?)
    }
}

impl<T: Transport> RemoteFormatBridge<T> {
    pub fn with_transport(cfg: &BridgeConfig, transport: T) -> StickerResult<Self> {
        let upload_url = Url::parse(&cfg.upload_url)
            .map_err(|e| StickerError::config(format!("bridge.upload_url is invalid: {e}")))?;
        let save_link = Regex::new(&cfg.save_link_pattern).map_err(|e| {
            StickerError::config(format!("bridge.save_link_pattern does not compile: {e}"))
        })?;
        Ok(Self {
            transport,
            upload_url,
            upload_field: cfg.upload_field.clone(),
            save_link,
            chunk_size: cfg.chunk_size.max(1),
        })
    }

    /// Step 1: upload the source; the service answers with a redirect to the job page.
    fn upload(&self, src: &Path) -> Result<Url, BridgeError> {
        let reply = self
            .transport
            .upload(&self.upload_url, &self.upload_field, src)?;
        if reply.status != 302 {
            return Err(BridgeError::UploadRejected {
                status: reply.status,
            });
        }
        let location = reply
            .location
            .as_deref()
            .ok_or(BridgeError::UploadRejected {
                status: reply.status,
            })?;
        self.upload_url
            .join(location)
            .map_err(|e| BridgeError::Transport {
                step: BridgeStep::Upload,
                msg: format!("bad job location '{location}': {e}"),
            })
    }

    /// Step 2: start the conversion and return the save link from the result HTML.
    fn trigger(&self, job: &Url) -> Result<Url, BridgeError> {
        let token = job_token(job).ok_or_else(|| BridgeError::Transport {
            step: BridgeStep::Trigger,
            msg: format!("job url '{job}' has no file token"),
        })?;
        let reply = self
            .transport
            .post_form(job, &[("ajax", "true")], &[("file", token)])?;
        if reply.status != 200 {
            return Err(BridgeError::TriggerFailed {
                status: reply.status,
            });
        }
        let link =
            find_save_link(&self.save_link, &reply.body).ok_or(BridgeError::SaveLinkNotFound)?;
        Url::parse(link).map_err(|e| BridgeError::Transport {
            step: BridgeStep::Trigger,
            msg: format!("bad save link '{link}': {e}"),
        })
    }

    /// Step 3: stream the converted file to `dst`, one chunk at a time.
    fn download(&self, link: &Url, dst: &Path) -> Result<u64, BridgeError> {
        let stream = self.transport.get(link)?;
        if !(200..300).contains(&stream.status) {
            return Err(BridgeError::DownloadFailed(format!(
                "HTTP {} for '{link}'",
                stream.status
            )));
        }

        let written = copy_in_chunks(stream.body, dst, self.chunk_size);
        if written.is_err() {
            let _ = std::fs::remove_file(dst);
        }
        written
    }
}

impl<T: Transport> FormatBridge for RemoteFormatBridge<T> {
    #[tracing::instrument(level = "debug", skip_all, fields(src = %src.display()))]
    fn convert(&self, src: &Path, dst: &Path) -> Result<(), BridgeError> {
        let job = self.upload(src)?;
        tracing::debug!(job = %job, "upload accepted");
        let link = self.trigger(&job)?;
        tracing::debug!(link = %link, "save link found");
        let bytes = self.download(&link, dst)?;
        tracing::info!(bytes, dst = %dst.display(), "intermediate downloaded");
        Ok(())
    }
}

/// File token of a job page: its last non-empty path segment.
pub fn job_token(job: &Url) -> Option<&str> {
    job.path_segments()?.rev().find(|s| !s.is_empty())
}

/// First match of the save-link pattern in `html`.
pub fn find_save_link<'a>(pattern: &Regex, html: &'a str) -> Option<&'a str> {
    pattern.find(html).map(|m| m.as_str())
}

fn copy_in_chunks(
    mut body: Box<dyn Read + Send>,
    dst: &Path,
    chunk_size: usize,
) -> Result<u64, BridgeError> {
    let io_err = |e: std::io::Error| {
        if e.kind() == std::io::ErrorKind::TimedOut {
            BridgeError::Timeout {
                step: BridgeStep::Download,
            }
        } else {
            BridgeError::DownloadFailed(e.to_string())
        }
    };

    let mut file = File::create(dst).map_err(|e| {
        BridgeError::DownloadFailed(format!("create '{}': {e}", dst.display()))
    })?;
    let mut buf = vec![0u8; chunk_size];
    let mut total = 0u64;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_err(e)),
        };
        file.write_all(&buf[..n]).map_err(io_err)?;
        total += n as u64;
    }
    file.flush().map_err(io_err)?;
    if total == 0 {
        return Err(BridgeError::DownloadFailed(
            "service returned an empty file".to_string(),
        ));
    }
    Ok(total)
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/mod.rs"]
mod tests;
