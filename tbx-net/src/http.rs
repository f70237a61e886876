use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use tbx_common::error::{Result, TbxError};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::validation::{parse_checksum_file, verify_checksum};

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "tbx dependency toolbox (Rust)";

pub fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| TbxError::HttpError(format!("Failed to build HTTP client: {e}")))
}

/// GETs a small text resource. A 404 is `Ok(None)`.
pub async fn fetch_text(client: &Client, url: &str) -> Result<Option<String>> {
    debug!("Fetching {}", url);
    let response = client.get(url).send().await.map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        TbxError::HttpError(format!("HTTP request failed for {url}: {e}"))
    })?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        debug!("Not found: {}", url);
        return Ok(None);
    }
    if !status.is_success() {
        return Err(TbxError::HttpError(format!("HTTP error {status} for URL {url}")));
    }
    let text = response
        .text()
        .await
        .map_err(|e| TbxError::HttpError(format!("Failed to read response body of {url}: {e}")))?;
    Ok(Some(text))
}

/// Published sha256 of `url`, when the repository carries one.
pub async fn fetch_sha256(client: &Client, url: &str) -> Option<String> {
    match fetch_text(client, &format!("{url}.sha256")).await {
        Ok(Some(content)) => parse_checksum_file(&content),
        Ok(None) => None,
        Err(e) => {
            debug!("Could not fetch checksum for {}: {}", url, e);
            None
        }
    }
}

/// Downloads `url` next to `final_path` and moves it into place once the
/// optional checksum matches. A 404 is reported as `TbxError::NotFound`.
pub async fn download_and_verify(
    client: &Client,
    url: &str,
    final_path: &Path,
    sha256_expected: Option<&str>,
) -> Result<PathBuf> {
    let file_name = final_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp_path = final_path.with_file_name(format!(".{file_name}.download"));
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent)?;
    }
    debug!("Downloading to temporary path: {}", temp_path.display());
    if temp_path.exists() {
        if let Err(e) = fs::remove_file(&temp_path) {
            tracing::warn!(
                "Could not remove existing temporary file {}: {}",
                temp_path.display(),
                e
            );
        }
    }

    let response = client.get(url).send().await.map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        TbxError::HttpError(format!("HTTP request failed for {url}: {e}"))
    })?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);

    if !status.is_success() {
        return match status {
            StatusCode::NOT_FOUND => Err(TbxError::NotFound(url.to_string())),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Err(TbxError::DownloadError(
                file_name,
                url.to_string(),
                format!("Access denied ({status})"),
            )),
            _ => Err(TbxError::HttpError(format!("HTTP error {status} for URL {url}"))),
        };
    }

    let mut temp_file = TokioFile::create(&temp_path).await?;
    let content = response
        .bytes()
        .await
        .map_err(|e| TbxError::HttpError(format!("Failed to read response body bytes: {e}")))?;
    temp_file.write_all(&content).await?;
    temp_file.flush().await?;
    drop(temp_file);

    match sha256_expected {
        Some(expected) => {
            if let Err(e) = verify_checksum(&temp_path, expected) {
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
            debug!("Checksum verified for {}", temp_path.display());
        }
        None => debug!("No checksum published for {}", url),
    }

    fs::rename(&temp_path, final_path).map_err(|e| {
        TbxError::DownloadError(
            file_name.clone(),
            url.to_string(),
            format!(
                "Failed to move temp file {} to {}: {}",
                temp_path.display(),
                final_path.display(),
                e
            ),
        )
    })?;
    debug!("Moved verified file to final location: {}", final_path.display());
    Ok(final_path.to_path_buf())
}
