use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;

#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Overall engine confidence, 0-100, when the engine reports one.
    pub confidence: Option<f64>,
}

/// Opaque text recognizer. `progress` receives percentages in 0..=100.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap availability check run before the first recognition.
    fn probe(&self) -> anyhow::Result<()>;

    fn recognize(&self, image: &Path, progress: &mut dyn FnMut(u8)) -> anyhow::Result<Recognition>;
}

/// Runs an external recognizer (tesseract by default) as
/// `<program> <image> stdout -l <language>` and reads text from stdout.
#[derive(Debug, Clone)]
pub struct CommandOcrEngine {
    program: String,
    language: String,
}

impl CommandOcrEngine {
    pub fn new(program: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let program = cfg
            .get("ocr.command")
            .unwrap_or_else(|| "tesseract".to_string());
        let language = cfg.get("ocr.language").unwrap_or_else(|| "eng".to_string());
        debug!(%program, %language, "configured ocr engine");
        Self::new(program, language)
    }
}

impl OcrEngine for CommandOcrEngine {
    fn name(&self) -> &str {
        &self.program
    }

    #[instrument(skip(self), fields(program = %self.program))]
    fn probe(&self) -> anyhow::Result<()> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to run ocr engine {}", self.program))?;

        if !output.status.success() {
            return Err(anyhow!(
                "ocr engine {} exited with status {}",
                self.program,
                output
                    .status
                    .code()
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ));
        }
        Ok(())
    }

    #[instrument(skip(self, progress), fields(program = %self.program, image = %image.display()))]
    fn recognize(&self, image: &Path, progress: &mut dyn FnMut(u8)) -> anyhow::Result<Recognition> {
        info!("running ocr engine");
        progress(10);

        let output = Command::new(&self.program)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to run ocr engine {}", self.program))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            if !stderr.is_empty() {
                warn!(stderr = %stderr, "ocr engine failed");
            }
            return Err(anyhow!(
                "ocr engine {} failed on {}",
                self.program,
                image.display()
            ));
        }
        if !stderr.is_empty() {
            debug!(stderr = %stderr, "ocr engine wrote stderr");
        }

        progress(100);
        Ok(Recognition {
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
            confidence: None,
        })
    }
}
