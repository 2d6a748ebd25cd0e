use std::io::{Read, Write};

use thiserror::Error;

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

const CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed while streaming the response body: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches a URL into a writer.
pub trait Downloader: Send {
    /// Streams the body of `url` into `out` and returns the byte count.
    fn fetch(
        &self,
        url: &str,
        out: &mut dyn Write,
        progress: Option<&ProgressFn>,
    ) -> Result<u64, DownloadError>;
}

/// Plain blocking HTTP GET. Non-2xx responses are errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn fetch(
        &self,
        url: &str,
        out: &mut dyn Write,
        progress: Option<&ProgressFn>,
    ) -> Result<u64, DownloadError> {
        let mut response = reqwest::blocking::get(url).and_then(|r| r.error_for_status())?;
        let total = response.content_length().unwrap_or(0);
        let mut downloaded: u64 = 0;

        // Stream in chunks; the bz2 model is ~60MB.
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = response.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
            downloaded += n as u64;
            if let Some(cb) = progress {
                cb(downloaded, total);
            }
        }

        Ok(downloaded)
    }
}
