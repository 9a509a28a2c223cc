pub mod demo;
pub mod engine;
pub mod heuristics;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Instant;

use anyhow::anyhow;
use chrono::{Local, Timelike};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::task::ContextId;
use engine::OcrEngine;
use heuristics::CandidateHeuristic;

pub const NO_TEXT_DETECTED: &str = "No text detected in image";

/// A provisional task read from an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCandidate {
    pub text: String,
    pub confidence: f64,
    #[serde(default)]
    pub context: Option<ContextId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub candidates: Vec<ExtractedCandidate>,
    pub raw_text: String,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub engine_confidence: Option<f64>,
    /// Set when the engine failed and the candidates are stand-ins.
    #[serde(default)]
    pub engine_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionEvent {
    Progress(u8),
    Finished(ExtractionResult),
    Failed(String),
}

pub struct Extractor<E> {
    engine: E,
    heuristic: CandidateHeuristic,
    seed: Option<u64>,
    hour: Option<u32>,
}

impl<E: OcrEngine> Extractor<E> {
    pub fn new(engine: E, seed: Option<u64>) -> anyhow::Result<Self> {
        Ok(Self {
            engine,
            heuristic: CandidateHeuristic::new()?,
            seed,
            hour: None,
        })
    }

    /// Pins the local hour the stand-in generator sees.
    pub fn with_hour(mut self, hour: u32) -> Self {
        self.hour = Some(hour);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Recognizes `image` and derives candidates. Engine failures degrade
    /// to generated stand-in text; only an unreadable image is an error.
    #[instrument(skip(self, progress), fields(image = %image.display(), engine = self.engine.name()))]
    pub fn extract(
        &self,
        image: &Path,
        progress: &mut dyn FnMut(u8),
    ) -> anyhow::Result<ExtractionResult> {
        let started = Instant::now();
        let metadata = std::fs::metadata(image)
            .map_err(|err| anyhow!("cannot read image {}: {err}", image.display()))?;
        if !metadata.is_file() {
            return Err(anyhow!("{} is not a file", image.display()));
        }

        let mut rng = self.rng();
        let result = match self.engine.recognize(image, progress) {
            Ok(recognition) => {
                let candidates = self.heuristic.extract(&recognition.text, &mut rng);
                let raw_text = if recognition.text.trim().is_empty() {
                    NO_TEXT_DETECTED.to_string()
                } else {
                    recognition.text
                };
                ExtractionResult {
                    candidates,
                    raw_text,
                    processing_time_ms: elapsed_ms(started),
                    engine_confidence: recognition.confidence,
                    engine_error: None,
                }
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "ocr failed, generating stand-in candidates");
                let file_name = image
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let hour = self.hour.unwrap_or_else(|| Local::now().hour());
                let text = demo::generate(&file_name, hour, &mut rng);
                let candidates = self.heuristic.extract(&text, &mut rng);
                let raw_text = format!(
                    "Extracted from image ({}KB): {} tasks identified\n\n{text}",
                    metadata.len().div_ceil(1024),
                    candidates.len()
                );
                ExtractionResult {
                    candidates,
                    raw_text,
                    processing_time_ms: elapsed_ms(started),
                    engine_confidence: None,
                    engine_error: Some(format!("{err:#}")),
                }
            }
        };

        progress(100);
        info!(
            candidates = result.candidates.len(),
            ms = result.processing_time_ms,
            "extraction finished"
        );
        Ok(result)
    }
}

impl<E: OcrEngine + 'static> Extractor<E> {
    /// Runs [`Extractor::extract`] on a worker thread. Progress arrives in
    /// order and never decreases; the last event is `Finished` or `Failed`.
    pub fn spawn(self: Arc<Self>, image: PathBuf) -> Receiver<ExtractionEvent> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut last = 0u8;
            let progress_tx = tx.clone();
            let mut report = |percent: u8| {
                let percent = percent.min(100);
                if percent < last {
                    return;
                }
                last = percent;
                if progress_tx.send(ExtractionEvent::Progress(percent)).is_err() {
                    debug!("extraction progress receiver gone");
                }
            };

            let event = match self.extract(&image, &mut report) {
                Ok(result) => ExtractionEvent::Finished(result),
                Err(err) => ExtractionEvent::Failed(format!("{err:#}")),
            };
            if tx.send(event).is_err() {
                debug!("extraction result receiver gone");
            }
        });
        rx
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
