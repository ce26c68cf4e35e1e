//! Document text extraction.
//!
//! [`TesseractExtractor`] shells out to the `tesseract` binary. [`PlainTextExtractor`]
//! reads the file as UTF-8 text; it is used when OCR is disabled in configuration (for
//! documents uploaded as text) and in tests.

use crate::config::settings::OcrConfig;
use crate::errors::{Error, Result};
use futures::future::BoxFuture;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Extracts text from a stored document.
pub trait TextExtractor: Send + Sync {
    /// Returns the raw text found in the file at `path`.
    fn extract<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>>;
}

/// Runs `tesseract <file> stdout -l <lang>`, killing it after `timeout`
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    binary: String,
    language: String,
    timeout: Duration,
}

impl TesseractExtractor {
    /// Creates an extractor using the given binary, language pack and time limit.
    #[must_use]
    pub const fn new(binary: String, language: String, timeout: Duration) -> Self {
        Self {
            binary,
            language,
            timeout,
        }
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let run = Command::new(&self.binary)
                .arg(path)
                .arg("stdout")
                .arg("-l")
                .arg(&self.language)
                .kill_on_drop(true)
                .output();
            let output = tokio::time::timeout(self.timeout, run)
                .await
                .map_err(|_| Error::Ocr {
                    message: format!("{} timed out after {:?}", self.binary, self.timeout),
                })?
                .map_err(|e| Error::Ocr {
                    message: format!("failed to run {}: {e}", self.binary),
                })?;

            if !output.status.success() {
                return Err(Error::Ocr {
                    message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        })
    }
}

/// Reads documents as UTF-8 text
#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let bytes = tokio::fs::read(path).await?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        })
    }
}

/// Picks the extractor implementation for the configuration.
#[must_use]
pub fn extractor_from_config(config: &OcrConfig) -> Arc<dyn TextExtractor> {
    if config.enabled {
        Arc::new(TesseractExtractor::new(
            config.tesseract_bin.clone(),
            config.language.clone(),
            Duration::from_secs(config.timeout_secs),
        ))
    } else {
        Arc::new(PlainTextExtractor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_extractor_reads_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pan.txt");
        std::fs::write(&path, "INCOME TAX DEPARTMENT\nABCDE1234F")?;

        let text = PlainTextExtractor.extract(&path).await?;
        assert!(text.contains("ABCDE1234F"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_tesseract_binary_is_ocr_error() {
        let extractor = TesseractExtractor::new(
            "/nonexistent/tesseract-binary".to_string(),
            "eng".to_string(),
            Duration::from_secs(5),
        );
        let result = extractor.extract(Path::new("whatever.png")).await;
        assert!(matches!(result, Err(Error::Ocr { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_extractor_is_killed_after_timeout() -> Result<()> {
        // `sh <script> stdout -l eng` runs the script, which never finishes in time
        let dir = tempfile::tempdir()?;
        let script = dir.path().join("hang.sh");
        std::fs::write(&script, "sleep 30\n")?;
        let extractor = TesseractExtractor::new(
            "sh".to_string(),
            "eng".to_string(),
            Duration::from_millis(200),
        );

        let started = std::time::Instant::now();
        let result = extractor.extract(&script).await;
        assert!(started.elapsed() < Duration::from_secs(10));
        match result {
            Err(Error::Ocr { message }) => assert!(message.contains("timed out")),
            other => panic!("expected OCR timeout, got {other:?}"),
        }
        Ok(())
    }
}
