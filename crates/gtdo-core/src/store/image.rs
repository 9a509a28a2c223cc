use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::{ExtractedCandidate, ExtractionResult};
use crate::task::ContextId;

/// Candidates above this confidence start out selected.
pub const PRESELECT_CONFIDENCE: f64 = 0.6;

/// State of the image-to-task extraction flow. Selection is keyed by
/// candidate text; the extractor collapses duplicate texts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProcessingState {
    pub is_processing: bool,
    pub is_initialized: bool,
    pub error: Option<String>,
    pub last_result: Option<ExtractionResult>,
    pub candidates: Vec<ExtractedCandidate>,
    pub selected: Vec<String>,
    pub progress: u8,
    /// Sequence number of the newest extraction request.
    pub active_request: u64,
}

impl ImageProcessingState {
    pub fn has_pending_review(&self) -> bool {
        !self.candidates.is_empty()
    }

    pub fn is_selected(&self, text: &str) -> bool {
        self.selected.iter().any(|s| s == text)
    }

    pub fn initializing(&mut self) {
        self.is_processing = true;
        self.error = None;
    }

    pub fn initialized(&mut self) {
        self.is_processing = false;
        self.is_initialized = true;
        self.error = None;
    }

    pub fn initialization_failed(&mut self, error: &str) {
        self.is_processing = false;
        self.is_initialized = false;
        self.error = Some(error.to_string());
    }

    /// Starts a new request, superseding any still in flight.
    pub fn begin(&mut self) -> u64 {
        self.active_request += 1;
        self.is_processing = true;
        self.error = None;
        self.progress = 0;
        self.active_request
    }

    fn is_current(&self, request: u64) -> bool {
        if request == self.active_request && self.is_processing {
            true
        } else {
            debug!(
                request,
                active = self.active_request,
                "dropping event from superseded extraction"
            );
            false
        }
    }

    pub fn report_progress(&mut self, request: u64, percent: u8) {
        if self.is_current(request) {
            self.progress = self.progress.max(percent.min(100));
        }
    }

    pub fn fulfill(&mut self, request: u64, result: &ExtractionResult) {
        if !self.is_current(request) {
            return;
        }
        self.is_processing = false;
        self.candidates = result.candidates.clone();
        self.selected = result
            .candidates
            .iter()
            .filter(|c| c.confidence > PRESELECT_CONFIDENCE)
            .map(|c| c.text.clone())
            .collect();
        self.error = result.engine_error.clone();
        self.progress = 100;
        self.last_result = Some(result.clone());
    }

    /// Earlier candidates survive a failed request.
    pub fn reject(&mut self, request: u64, error: &str) {
        if !self.is_current(request) {
            return;
        }
        self.is_processing = false;
        self.error = Some(error.to_string());
        self.progress = 0;
    }

    pub fn toggle(&mut self, text: &str) {
        if let Some(idx) = self.selected.iter().position(|s| s == text) {
            self.selected.remove(idx);
        } else {
            self.selected.push(text.to_string());
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.candidates.iter().map(|c| c.text.clone()).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    pub fn edit(&mut self, original: &str, text: &str) {
        let Some(candidate) = self.candidates.iter_mut().find(|c| c.text == original) else {
            debug!(original, "edit on unknown candidate ignored");
            return;
        };
        candidate.text = text.to_string();
        if let Some(slot) = self.selected.iter_mut().find(|s| *s == original) {
            *slot = text.to_string();
        }
    }

    pub fn set_context(&mut self, text: &str, context: &ContextId) {
        match self.candidates.iter_mut().find(|c| c.text == text) {
            Some(candidate) => candidate.context = Some(context.clone()),
            None => debug!(text, "context change on unknown candidate ignored"),
        }
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn clear_results(&mut self) {
        self.last_result = None;
        self.candidates.clear();
        self.selected.clear();
        self.progress = 0;
    }

    /// Selected candidates in selection order, with the category each
    /// should be filed under.
    pub fn selected_for_import(&self) -> Vec<(String, ContextId)> {
        self.selected
            .iter()
            .map(|text| {
                let context = self
                    .candidates
                    .iter()
                    .find(|c| &c.text == text)
                    .and_then(|c| c.context.clone())
                    .unwrap_or_default();
                (text.clone(), context)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, confidence: f64) -> ExtractedCandidate {
        ExtractedCandidate {
            text: text.to_string(),
            confidence,
            context: None,
        }
    }

    fn result(candidates: Vec<ExtractedCandidate>) -> ExtractionResult {
        ExtractionResult {
            candidates,
            raw_text: "raw".to_string(),
            processing_time_ms: 5,
            engine_confidence: None,
            engine_error: None,
        }
    }

    #[test]
    fn fulfilled_request_preselects_confident_candidates() {
        let mut state = ImageProcessingState::default();
        let req = state.begin();
        state.report_progress(req, 30);
        state.fulfill(
            req,
            &result(vec![candidate("a", 0.9), candidate("b", 0.6), candidate("c", 0.61)]),
        );
        assert!(!state.is_processing);
        assert_eq!(state.progress, 100);
        assert_eq!(state.selected, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn progress_never_moves_backwards() {
        let mut state = ImageProcessingState::default();
        let req = state.begin();
        state.report_progress(req, 50);
        state.report_progress(req, 20);
        state.report_progress(req, 250);
        assert_eq!(state.progress, 100);
    }

    #[test]
    fn rejection_keeps_previous_candidates() {
        let mut state = ImageProcessingState::default();
        let first = state.begin();
        state.fulfill(first, &result(vec![candidate("keep me", 0.9)]));

        let second = state.begin();
        state.report_progress(second, 40);
        state.reject(second, "image unreadable");
        assert_eq!(state.progress, 0);
        assert_eq!(state.error.as_deref(), Some("image unreadable"));
        assert_eq!(state.candidates.len(), 1);
    }

    #[test]
    fn superseded_request_results_are_dropped() {
        let mut state = ImageProcessingState::default();
        let stale = state.begin();
        let fresh = state.begin();
        state.fulfill(stale, &result(vec![candidate("old", 0.9)]));
        assert!(state.candidates.is_empty());
        assert!(state.is_processing);

        state.fulfill(fresh, &result(vec![candidate("new", 0.9)]));
        assert_eq!(state.candidates[0].text, "new");
    }

    #[test]
    fn edit_follows_selection() {
        let mut state = ImageProcessingState::default();
        let req = state.begin();
        state.fulfill(req, &result(vec![candidate("by milk", 0.9), candidate("x", 0.2)]));
        state.edit("by milk", "buy milk");
        assert_eq!(state.candidates[0].text, "buy milk");
        assert_eq!(state.selected, vec!["buy milk".to_string()]);

        state.edit("x", "call bank");
        assert!(!state.is_selected("call bank"));
    }

    #[test]
    fn toggle_and_bulk_selection() {
        let mut state = ImageProcessingState::default();
        let req = state.begin();
        state.fulfill(req, &result(vec![candidate("a", 0.2), candidate("b", 0.2)]));
        state.toggle("b");
        assert_eq!(state.selected, vec!["b".to_string()]);
        state.toggle("b");
        assert!(state.selected.is_empty());
        state.select_all();
        assert_eq!(state.selected.len(), 2);
        state.deselect_all();
        assert!(state.selected.is_empty());
    }

    #[test]
    fn import_order_follows_selection_and_defaults_to_inbox() {
        let mut state = ImageProcessingState::default();
        let req = state.begin();
        let mut calls = candidate("call bank", 0.2);
        calls.context = Some(ContextId::from("calls"));
        state.fulfill(req, &result(vec![candidate("a", 0.2), calls]));
        state.toggle("call bank");
        state.toggle("a");
        assert_eq!(
            state.selected_for_import(),
            vec![
                ("call bank".to_string(), ContextId::from("calls")),
                ("a".to_string(), ContextId::inbox()),
            ]
        );
    }
}
