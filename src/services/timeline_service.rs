use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::{
    order::TimelineEntry,
    stage::{Stage, StageVocabulary},
};

/// Days assumed between issue and delivery when no delivery date is stored
pub const DEFAULT_LEAD_TIME_DAYS: i64 = 30;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a stored order date: `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_order_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn format_order_date(date: DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Reconstruct the production timeline of an order.
///
/// Returns one entry per stage of the vocabulary's sequence, in order.
/// Issue and delivery dates are copied verbatim onto their anchor stages;
/// other completed stages get a date interpolated between the two anchors.
/// A blank anchor counts as absent.
pub fn build_timeline(
    vocabulary: &StageVocabulary,
    current: Stage,
    order_issued: Option<&str>,
    delivery_date: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<TimelineEntry> {
    let order_issued = order_issued.map(str::trim).filter(|s| !s.is_empty());
    let delivery_date = delivery_date.map(str::trim).filter(|s| !s.is_empty());

    let current_rank = vocabulary.rank(current).unwrap_or_else(|| {
        tracing::warn!(stage = %current, "Stage is not part of the active vocabulary");
        0
    });

    let order_date = order_issued.and_then(parse_order_date).unwrap_or(now);
    let delivery = delivery_date
        .and_then(parse_order_date)
        .unwrap_or_else(|| order_date + Duration::days(DEFAULT_LEAD_TIME_DAYS));
    let span_ms = (delivery - order_date).num_milliseconds();

    let sequence = vocabulary.sequence();
    let last_index = sequence.len().saturating_sub(1);

    sequence
        .iter()
        .enumerate()
        .map(|(index, &stage)| {
            let completed = index <= current_rank;

            let date = if index == 0 && order_issued.is_some() {
                order_issued.map(str::to_string)
            } else if vocabulary.is_delivery_anchored(stage) && delivery_date.is_some() {
                delivery_date.map(str::to_string)
            } else if completed {
                let position = if last_index == 0 {
                    0.0
                } else {
                    index as f64 / last_index as f64
                };
                let offset = Duration::milliseconds((position * span_ms as f64).round() as i64);
                Some(format_order_date(order_date + offset))
            } else {
                None
            };

            TimelineEntry {
                stage,
                date,
                completed,
            }
        })
        .collect()
}
