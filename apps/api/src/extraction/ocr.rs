//! OCR fallback for images, via the `tesseract` binary.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use super::{EngineOutput, ExtractError, ExtractionEngine, ExtractionMetadata};

pub struct TesseractEngine {
    binary: String,
    timeout_secs: u64,
}

impl TesseractEngine {
    pub fn new(binary: &str, timeout_secs: u64) -> Self {
        Self {
            binary: binary.to_string(),
            timeout_secs,
        }
    }

    async fn run(&self, image: &NamedTempFile) -> Result<String, ExtractError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(image.path()).arg("stdout").kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| ExtractError::Timeout(self.timeout_secs))?
            .map_err(|e| ExtractError::Unavailable(format!("failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Failed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ExtractionEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn extract(
        &self,
        bytes: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<EngineOutput, ExtractError> {
        if bytes.is_empty() {
            return Err(ExtractError::Failed("cannot OCR an empty image".to_string()));
        }

        let mut tmpfile = tempfile::Builder::new()
            .suffix(image_suffix(mime_type))
            .tempfile()?;
        tmpfile.write_all(bytes)?;
        tmpfile.flush()?;

        debug!(filename, binary = %self.binary, "Running OCR");
        let text = self.run(&tmpfile).await?;

        Ok(EngineOutput {
            text,
            metadata: ExtractionMetadata {
                pages: Some(1),
                tables: None,
            },
        })
    }
}

fn image_suffix(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/tiff" => ".tif",
        _ => ".img",
    }
}
