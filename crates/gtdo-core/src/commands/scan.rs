use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info, instrument, warn};

use super::Session;
use crate::cli::ScanCommand;
use crate::extract::engine::{CommandOcrEngine, OcrEngine};
use crate::extract::{ExtractionEvent, Extractor};
use crate::store::Action;

#[instrument(skip(session))]
pub(super) fn cmd_scan(session: &mut Session<'_>, action: Option<ScanCommand>) -> anyhow::Result<()> {
    info!("command scan");

    match action.unwrap_or(ScanCommand::Show) {
        ScanCommand::Run { image } => return run(session, &image),
        ScanCommand::Show => {}
        ScanCommand::Toggle { n } => {
            let text = candidate_text(session, n)?;
            session.dispatch(Action::ToggleCandidate(text));
        }
        ScanCommand::SelectAll => {
            session.dispatch(Action::SelectAllCandidates);
        }
        ScanCommand::SelectNone => {
            session.dispatch(Action::DeselectAllCandidates);
        }
        ScanCommand::Edit { n, text } => {
            let original = candidate_text(session, n)?;
            let text = text.join(" ").trim().to_string();
            if text.is_empty() {
                return Err(anyhow!("candidate text cannot be empty"));
            }
            if text != original
                && session
                    .state()
                    .image
                    .candidates
                    .iter()
                    .any(|c| c.text == text)
            {
                return Err(anyhow!("another candidate already reads {text:?}"));
            }
            session.dispatch(Action::EditCandidate { original, text });
        }
        ScanCommand::Context { n, context } => {
            let text = candidate_text(session, n)?;
            let context = session.context(&context)?;
            session.dispatch(Action::SetCandidateContext { text, context });
        }
        ScanCommand::Import => return import(session),
        ScanCommand::Clear => {
            session.dispatch(Action::ClearImageResults);
            session.dispatch(Action::ClearImageError);
            println!("Scan results cleared.");
            return Ok(());
        }
    }

    let state = session.state();
    session
        .renderer
        .print_candidates(&state.image, &state.custom_contexts.contexts)
}

/// Candidate `n`, counted from 1 as listed by `gtdo scan show`.
fn candidate_text(session: &Session<'_>, n: usize) -> anyhow::Result<String> {
    let candidates = &session.state().image.candidates;
    if candidates.is_empty() {
        return Err(anyhow!("no scan results to review; run `gtdo scan run <image>`"));
    }
    n.checked_sub(1)
        .and_then(|idx| candidates.get(idx))
        .map(|c| c.text.clone())
        .ok_or_else(|| anyhow!("no candidate {n}; pick 1-{}", candidates.len()))
}

fn run(session: &mut Session<'_>, image: &Path) -> anyhow::Result<()> {
    let engine = CommandOcrEngine::from_config(session.cfg);

    session.dispatch(Action::ImageServiceInitializing);
    match engine.probe() {
        Ok(()) => {
            session.dispatch(Action::ImageServiceReady);
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "ocr engine unavailable");
            session.dispatch(Action::ImageServiceFailed(format!("{err:#}")));
        }
    }

    let seed = session.cfg.get_u64("extract.seed")?;
    let extractor = Arc::new(Extractor::new(engine, seed)?);

    session.dispatch(Action::ExtractionStarted);
    let request = session.state().image.active_request;
    debug!(request, image = %image.display(), "extraction requested");

    let mut failure = None;
    for event in extractor.spawn(image.to_path_buf()) {
        match event {
            ExtractionEvent::Progress(percent) => {
                let state = session.dispatch(Action::ExtractionProgress { request, percent });
                let shown = state.image.progress;
                session.renderer.print_progress(shown)?;
            }
            ExtractionEvent::Finished(result) => {
                session.dispatch(Action::ExtractionFinished { request, result });
            }
            ExtractionEvent::Failed(error) => {
                session.dispatch(Action::ExtractionFailed {
                    request,
                    error: error.clone(),
                });
                failure = Some(error);
            }
        }
    }
    eprintln!();

    if session.state().image.is_processing {
        let error = "extraction stopped without a result".to_string();
        session.dispatch(Action::ExtractionFailed {
            request,
            error: error.clone(),
        });
        failure = Some(error);
    }
    if let Some(error) = failure {
        return Err(anyhow!("scan failed: {error}"));
    }

    let state = session.state();

    if let Some(result) = &state.image.last_result {
        println!(
            "Found {} candidate(s) in {} ms.",
            result.candidates.len(),
            result.processing_time_ms
        );
    }
    session
        .renderer
        .print_candidates(&state.image, &state.custom_contexts.contexts)?;
    println!("Review with `gtdo scan toggle <n>`, then `gtdo scan import`.");
    Ok(())
}

fn import(session: &mut Session<'_>) -> anyhow::Result<()> {
    let picked = session.state().image.selected_for_import();
    if picked.is_empty() {
        println!("Nothing selected to import.");
        return Ok(());
    }

    let first_id = session.state().todos.next_id;
    session.dispatch(Action::ImportSelectedCandidates);
    for (offset, (text, context)) in picked.iter().enumerate() {
        println!(
            "Created task {} '{text}' in {}.",
            first_id + offset as u64,
            session.context_label(context)
        );
    }
    println!("Imported {} task(s).", picked.len());
    Ok(())
}
