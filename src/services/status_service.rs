use serde::Serialize;

use crate::models::stage::{Stage, StageVocabulary};

/// Outcome of reading a stored status string.
///
/// Unknown text never fails: it falls back to the vocabulary's first stage,
/// but the fallback stays visible so bad rows can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusResolution {
    Recognized { stage: Stage },
    Defaulted { raw: String, stage: Stage },
}

impl StatusResolution {
    pub fn stage(&self) -> Stage {
        match self {
            StatusResolution::Recognized { stage } => *stage,
            StatusResolution::Defaulted { stage, .. } => *stage,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, StatusResolution::Defaulted { .. })
    }
}

/// Trim, upper-case and join whitespace runs with a single underscore.
pub fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Map free status text from an order row onto a stage of `vocabulary`.
pub fn normalize_status(vocabulary: &StageVocabulary, raw: Option<&str>) -> StatusResolution {
    let raw = raw.unwrap_or_default();
    let key = normalize_key(raw);

    match vocabulary.lookup(&key) {
        Some(stage) => StatusResolution::Recognized { stage },
        None => {
            tracing::warn!(status = raw, "Unrecognized order status, using first stage");
            StatusResolution::Defaulted {
                raw: raw.to_string(),
                stage: vocabulary.first(),
            }
        }
    }
}
