//! URL input reading and normalization.

use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

/// Maximum URL length accepted from the input.
const MAX_URL_LENGTH: usize = 2048;

pub(crate) type InputLines = Lines<BufReader<Box<dyn AsyncRead + Unpin + Send>>>;

/// Opens the URL list; `-` reads stdin.
pub(crate) async fn open_input(path: &Path) -> Result<InputLines> {
    let reader: Box<dyn AsyncRead + Unpin + Send> = if path.as_os_str() == "-" {
        log::info!("Reading URLs from stdin");
        Box::new(tokio::io::stdin())
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open input file {}", path.display()))?;
        Box::new(file)
    };
    Ok(BufReader::new(reader).lines())
}

/// Normalizes one input line into a URL to send.
///
/// Blank lines and `#` comments are skipped silently. A missing scheme defaults
/// to `http://`. Overlong URLs and non-HTTP schemes are skipped with a warning.
pub(crate) fn normalize_url(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let normalized = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    if normalized.len() > MAX_URL_LENGTH {
        warn!(
            "Skipping URL exceeding maximum length ({} > {}): {}...",
            normalized.len(),
            MAX_URL_LENGTH,
            normalized.chars().take(50).collect::<String>()
        );
        return None;
    }

    match url::Url::parse(&normalized) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Some(normalized),
        Ok(_) => {
            warn!("Skipping unsupported scheme for URL: {trimmed}");
            None
        }
        Err(e) => {
            warn!("Skipping invalid URL {trimmed}: {e}");
            None
        }
    }
}
