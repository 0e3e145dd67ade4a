//! Parsing of the detailed recognition payload produced by the speech
//! assessment service.
//!
//! Only the best hypothesis (`NBest[0]`) is read. Scores come from its
//! `PronunciationAssessment` block: `AccuracyScore` is the coarse score the
//! acceptance thresholds look at and `PronScore` is the aggregate reported to
//! the learner. When the hypothesis carries no error classification, one is
//! derived from the per-word assessments.

use nutq_attempt::RecognizedSpeech;
use nutq_eval::{NO_ERROR_SENTINEL, VendorAssessment};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct DetailedResult {
    #[serde(rename = "DisplayText")]
    display_text: Option<String>,
    #[serde(rename = "NBest", default)]
    n_best: Vec<Hypothesis>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Hypothesis {
    display: Option<String>,
    pronunciation_assessment: Option<Assessment>,
    #[serde(default)]
    words: Vec<WordResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WordResult {
    pronunciation_assessment: Option<Assessment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Assessment {
    accuracy_score: Option<f64>,
    pron_score: Option<f64>,
    error_type: Option<String>,
}

/// Build a [`RecognizedSpeech`] from a detailed result.
///
/// `text` is the plain recognized text, used when the payload has no display
/// text or cannot be parsed at all. A malformed payload yields no scores.
pub fn parse_detailed_result(json: &str, text: &str) -> RecognizedSpeech {
    let raw: serde_json::Value = match serde_json::from_str(json) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(error = %e, "detailed result is not JSON");
            return plain(text);
        }
    };

    let detailed = match DetailedResult::deserialize(&raw) {
        Ok(detailed) => detailed,
        Err(e) => {
            tracing::debug!(error = %e, "unexpected detailed result shape");
            return RecognizedSpeech {
                raw: Some(raw),
                ..plain(text)
            };
        }
    };

    let best = detailed.n_best.into_iter().next();
    let display = best
        .as_ref()
        .and_then(|h| h.display.clone())
        .or(detailed.display_text)
        .unwrap_or_else(|| text.to_string());
    let assessment = best.map(hypothesis_assessment).unwrap_or_default();

    RecognizedSpeech {
        text: display,
        assessment,
        raw: Some(raw),
    }
}

fn plain(text: &str) -> RecognizedSpeech {
    RecognizedSpeech {
        text: text.to_string(),
        ..RecognizedSpeech::default()
    }
}

fn hypothesis_assessment(hypothesis: Hypothesis) -> VendorAssessment {
    let summary = hypothesis.pronunciation_assessment.unwrap_or_default();
    let error_type = summary
        .error_type
        .or_else(|| word_error_type(&hypothesis.words));

    VendorAssessment {
        score: summary.accuracy_score.or(summary.pron_score),
        pronunciation_score: summary.pron_score,
        error_type,
    }
}

/// First word-level error, or the no-error sentinel when every word is clean.
fn word_error_type(words: &[WordResult]) -> Option<String> {
    let mut types = words
        .iter()
        .map(|w| w.pronunciation_assessment.as_ref()?.error_type.as_deref())
        .peekable();
    types.peek()?;

    let mut clean = true;
    for error_type in types {
        match error_type {
            Some(NO_ERROR_SENTINEL) => {}
            Some(other) => return Some(other.to_string()),
            None => clean = false,
        }
    }
    clean.then(|| NO_ERROR_SENTINEL.to_string())
}
