//! Turns recognized text into candidate tasks.
//!
//! Nothing here is exact: each pattern pass guesses at task boundaries
//! and every guess gets a confidence score. The only source of
//! nondeterminism is the jitter drawn from the caller's RNG.

use std::collections::HashSet;

use anyhow::anyhow;
use rand::Rng;
use regex::Regex;
use tracing::{debug, trace};

use super::ExtractedCandidate;
use crate::task::ContextId;

const BASE_CONFIDENCE: f64 = 0.6;
const MIN_CONFIDENCE: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.95;
const JITTER: f64 = 0.1;

/// Short or noisy text gets the fallback set instead of pattern passes.
pub const MIN_TEXT_LEN: usize = 50;

const ACCEPT_WORDS: &[&str] = &[
    "buy", "call", "schedule", "meet", "email", "send", "fix", "clean", "write", "read", "book",
    "order", "visit", "contact", "prepare", "finish", "complete",
];

const SCORING_WORDS: &[&str] = &[
    "buy", "call", "email", "write", "read", "finish", "complete", "start", "review", "update",
    "fix", "create", "send", "schedule", "meet", "discuss", "prepare", "draft", "research",
    "test", "organize", "plan", "book", "pay",
];

/// First matching row wins.
const CONTEXT_KEYWORDS: &[(&[&str], &str)] = &[
    (&["call", "phone", "contact"], "calls"),
    (&["buy", "shop", "store", "pick up"], "errands"),
    (&["computer", "email", "code", "website"], "computer"),
    (&["meeting", "office", "work", "report"], "office"),
    (&["home", "clean", "organize"], "home"),
    (&["wait", "follow up", "response"], "waiting-for"),
];

/// `(text, confidence, context, trigger keywords)`
const FALLBACK_SET: &[(&str, f64, &str, &[&str])] = &[
    ("buy coffee", 0.8, "errands", &["buy", "coffee"]),
    ("call emergency", 0.7, "calls", &["call", "emergency"]),
    ("schedule meeting", 0.8, "office", &["schedule", "meeting"]),
];

const LINE_PATTERNS: &[(&str, &str)] = &[
    ("bullet", r"(?m)^\s*[*•\-x]\s*(.+)"),
    ("numbered", r"(?m)^\s*\d+[.)]\s*(.+)"),
    ("checkbox", r"(?m)^\s*\[\s*[x ]\s*\]\s*(.+)"),
    (
        "action-verb",
        r"(?im)^\s*(?:buy|call|schedule|meet|email|send|fix|clean|write|read|book|order)\s+(.+)",
    ),
    (
        "urgency",
        r"(?im)^\s*(.+?)\s*(?:today|tomorrow|urgent|asap|important)",
    ),
    ("explicit", r"(?im)^\s*(?:todo|task|do):\s*(.+)"),
    ("any-line", r"(?m)^\s*(.{5,50})"),
];

pub struct CandidateHeuristic {
    passes: Vec<(&'static str, Regex)>,
    specific_details: Regex,
    well_formatted: Regex,
}

impl CandidateHeuristic {
    pub fn new() -> anyhow::Result<Self> {
        let passes = LINE_PATTERNS
            .iter()
            .map(|(name, pattern)| {
                Regex::new(pattern)
                    .map(|re| (*name, re))
                    .map_err(|e| anyhow!("internal regex compile failure ({name}): {e}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let specific_details = Regex::new(
            r"(?i)\b(next week|tomorrow|today|monday|tuesday|wednesday|thursday|friday|saturday|sunday|\d+|\$|%|meeting|appointment|report|project)\b",
        )
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

        let well_formatted = Regex::new(r"^[-•*\d+.\[\]]\s*[A-Z]")
            .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

        Ok(Self {
            passes,
            specific_details,
            well_formatted,
        })
    }

    pub fn extract<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Vec<ExtractedCandidate> {
        if text.chars().count() < MIN_TEXT_LEN || is_low_quality(text) {
            debug!(len = text.len(), "low quality text, reconstructing from fallback set");
            return fallback_candidates(text);
        }

        let mut found = Vec::new();
        for (name, pass) in &self.passes {
            for caps in pass.captures_iter(text) {
                let Some(raw) = caps.get(1) else {
                    continue;
                };
                let candidate = raw.as_str().trim();
                let len = candidate.chars().count();
                if len <= 2 || len >= 100 {
                    continue;
                }

                let confidence = self.confidence(candidate, rng);
                if confidence > 0.3 || contains_action_word(candidate) {
                    trace!(pass = name, candidate, confidence, "pattern match");
                    found.push(ExtractedCandidate {
                        text: candidate.to_string(),
                        confidence,
                        context: Some(infer_context(candidate)),
                    });
                }
            }
        }

        let unique = dedupe(found);
        debug!(count = unique.len(), "extracted candidates");
        unique
    }

    pub fn confidence<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> f64 {
        let mut confidence = BASE_CONFIDENCE;
        let lower = text.to_lowercase();

        if SCORING_WORDS.iter().any(|w| lower.contains(w)) {
            confidence += 0.25;
        }
        if self.specific_details.is_match(text) {
            confidence += 0.15;
        }
        if self.well_formatted.is_match(text.trim()) {
            confidence += 0.1;
        }

        let len = text.chars().count();
        if len < 10 {
            confidence -= 0.1;
        }
        if len > 80 {
            confidence -= 0.15;
        }

        confidence += (rng.r#gen::<f64>() - 0.5) * JITTER;
        confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }
}

pub fn contains_action_word(text: &str) -> bool {
    let lower = text.to_lowercase();
    ACCEPT_WORDS.iter().any(|w| lower.contains(w))
}

/// Many symbols or very few words usually means the engine read noise.
pub fn is_low_quality(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return true;
    }
    let fragmented = text
        .chars()
        .filter(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace())
        .count();
    let ratio = fragmented as f64 / total as f64;
    ratio > 0.3 || text.split(' ').count() < 3
}

pub fn infer_context(text: &str) -> ContextId {
    let lower = text.to_lowercase();
    CONTEXT_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, id)| ContextId::from(*id))
        .unwrap_or_default()
}

/// Fallback entries whose keywords occur in `text`, or the whole set
/// when none do. Never empty.
pub fn fallback_candidates(text: &str) -> Vec<ExtractedCandidate> {
    let lower = text.to_lowercase();
    let to_candidate = |(text, confidence, context, _): &(&str, f64, &str, &[&str])| {
        ExtractedCandidate {
            text: text.to_string(),
            confidence: *confidence,
            context: Some(ContextId::from(*context)),
        }
    };

    let matched: Vec<ExtractedCandidate> = FALLBACK_SET
        .iter()
        .filter(|(_, _, _, triggers)| triggers.iter().any(|t| lower.contains(t)))
        .map(to_candidate)
        .collect();

    if matched.is_empty() {
        FALLBACK_SET.iter().map(to_candidate).collect()
    } else {
        matched
    }
}

fn dedupe(candidates: Vec<ExtractedCandidate>) -> Vec<ExtractedCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.text.trim().to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    const NOTES: &str = "Weekly planning notes\n\
        - Review quarterly report with finance\n\
        2. Email the design team about the launch\n\
        [ ] Clean the garage this weekend\n\
        TODO: book dentist appointment\n\
        Call the landlord about the heating today\n";

    #[test]
    fn short_text_uses_only_fallback_set() {
        let heuristic = CandidateHeuristic::new().expect("patterns compile");
        let fallback: Vec<&str> = FALLBACK_SET.iter().map(|f| f.0).collect();

        for text in ["", "buy ☕", "mtg sched", "x"] {
            let got = heuristic.extract(text, &mut rng());
            assert!(!got.is_empty(), "no candidates for {text:?}");
            assert!(got.iter().all(|c| fallback.contains(&c.text.as_str())));
        }
    }

    #[test]
    fn fallback_matches_keywords_or_returns_everything() {
        let got = fallback_candidates("need to buy something");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text, "buy coffee");

        let got = fallback_candidates("zzz");
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn pattern_passes_find_list_items() {
        let heuristic = CandidateHeuristic::new().expect("patterns compile");
        let got = heuristic.extract(NOTES, &mut rng());
        let texts: Vec<&str> = got.iter().map(|c| c.text.as_str()).collect();

        assert!(texts.contains(&"Review quarterly report with finance"));
        assert!(texts.contains(&"Email the design team about the launch"));
        assert!(texts.contains(&"Clean the garage this weekend"));
        assert!(texts.contains(&"book dentist appointment"));
    }

    #[test]
    fn checkbox_pass_takes_only_ticked_or_open_boxes() {
        let heuristic = CandidateHeuristic::new().expect("patterns compile");
        let (_, checkbox) = heuristic
            .passes
            .iter()
            .find(|(name, _)| *name == "checkbox")
            .expect("checkbox pass");
        let items: Vec<&str> = checkbox
            .captures_iter("[x] done item\n[ ] open item\n[] bare item\n[X] upper item")
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();
        assert_eq!(items, vec!["done item", "open item"]);
    }

    #[test]
    fn duplicates_collapse_case_insensitively_keeping_first() {
        let heuristic = CandidateHeuristic::new().expect("patterns compile");
        let got = heuristic.extract(NOTES, &mut rng());
        let mut keys: Vec<String> = got.iter().map(|c| c.text.trim().to_lowercase()).collect();
        let before = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }

    #[test]
    fn confidence_stays_in_bounds_and_is_seed_stable() {
        let heuristic = CandidateHeuristic::new().expect("patterns compile");
        let a = heuristic.extract(NOTES, &mut rng());
        let b = heuristic.extract(NOTES, &mut rng());
        assert_eq!(a, b);
        assert!(
            a.iter()
                .all(|c| (MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&c.confidence))
        );
    }

    #[test]
    fn action_and_detail_words_raise_confidence() {
        let heuristic = CandidateHeuristic::new().expect("patterns compile");
        let plain = heuristic.confidence("the weather is nice", &mut rng());
        let strong = heuristic.confidence("review the project budget", &mut rng());
        assert!(strong > plain + 0.3);
    }

    #[test]
    fn context_inference_uses_first_matching_row() {
        assert_eq!(infer_context("Call the bank").as_str(), "calls");
        assert_eq!(infer_context("pick up parcel").as_str(), "errands");
        assert_eq!(infer_context("fix website footer").as_str(), "computer");
        assert_eq!(infer_context("write report").as_str(), "office");
        assert_eq!(infer_context("organize closet").as_str(), "home");
        assert_eq!(infer_context("follow up with Sam").as_str(), "waiting-for");
        assert_eq!(infer_context("ponder").as_str(), "inbox");
    }

    #[test]
    fn symbol_heavy_text_is_low_quality() {
        assert!(is_low_quality("#$%^ &*() !!@@ ~~ ;; ::: <<>> ||| ??? ``` ,,, ..."));
        assert!(!is_low_quality("buy milk and eggs on the way home tonight please"));
    }
}
