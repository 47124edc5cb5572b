use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    models::stage::{Stage, StageVocabulary},
    services::{status_service::normalize_status, timeline_service::build_timeline},
};

/// Row of the `carpet_orders` table, as written by the administrator
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderRecord {
    pub id: String,
    pub order_number: String,
    pub client_code: String,
    pub design: String,
    pub size: String,
    pub status: Option<String>,
    pub order_issued: Option<String>,
    pub delivery_date: Option<String>,
    pub has_delay: bool,
    pub delay_reason: Option<String>,
    pub last_edit: DateTime<Utc>,
}

/// One stage on an order's timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub stage: Stage,
    pub date: Option<String>,
    pub completed: bool,
}

/// Order as presented to clients, derived from an [`OrderRecord`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub client_code: String,
    pub order_number: String,
    pub carpet_name: String,
    pub dimensions: String,
    pub status: Stage,
    pub raw_status: Option<String>,
    pub status_defaulted: bool,
    pub has_delay: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_reason: Option<String>,
    pub timeline: Vec<TimelineEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<String>,
    pub last_edit: DateTime<Utc>,
}

impl Order {
    pub fn from_record(record: OrderRecord, vocabulary: &StageVocabulary, now: DateTime<Utc>) -> Self {
        let resolution = normalize_status(vocabulary, record.status.as_deref());
        let status = resolution.stage();
        let timeline = build_timeline(
            vocabulary,
            status,
            record.order_issued.as_deref(),
            record.delivery_date.as_deref(),
            now,
        );

        Self {
            id: record.id,
            client_code: record.client_code,
            order_number: record.order_number,
            carpet_name: record.design,
            dimensions: record.size,
            status,
            raw_status: record.status,
            status_defaulted: resolution.is_defaulted(),
            has_delay: record.has_delay,
            delay_reason: record.delay_reason,
            timeline,
            estimated_completion: record.delivery_date,
            last_edit: record.last_edit,
        }
    }

    /// Case-insensitive match on order number and design name, and on the
    /// client code when `include_client` is set.
    pub fn matches_query(&self, query: &str, include_client: bool) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.order_number.to_lowercase().contains(&query)
            || self.carpet_name.to_lowercase().contains(&query)
            || (include_client && self.client_code.to_lowercase().contains(&query))
    }
}

/// Timeline entry with display text, for the order detail view
#[derive(Debug, Clone, Serialize)]
pub struct TimelineStep {
    pub stage: Stage,
    pub label: &'static str,
    pub description: &'static str,
    pub date: Option<String>,
    pub completed: bool,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub status_label: &'static str,
    pub steps: Vec<TimelineStep>,
}

impl From<Order> for OrderDetail {
    fn from(order: Order) -> Self {
        let steps = order
            .timeline
            .iter()
            .map(|entry| TimelineStep {
                stage: entry.stage,
                label: entry.stage.label(),
                description: entry.stage.description(),
                date: entry.date.clone(),
                completed: entry.completed,
                current: entry.stage == order.status,
            })
            .collect();

        Self {
            status_label: order.status.label(),
            order,
            steps,
        }
    }
}

/// Dashboard counters over a set of orders
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub total: usize,
    pub delayed: usize,
    pub defaulted_status: usize,
    pub by_stage: BTreeMap<String, usize>,
}

impl OrderSummary {
    pub fn from_orders(orders: &[Order]) -> Self {
        let mut summary = Self {
            total: orders.len(),
            ..Self::default()
        };
        for order in orders {
            if order.has_delay {
                summary.delayed += 1;
            }
            if order.status_defaulted {
                summary.defaulted_status += 1;
            }
            *summary
                .by_stage
                .entry(order.status.code().to_string())
                .or_default() += 1;
        }
        summary
    }
}

/// Order fields accepted from the administrator on create and update
#[derive(Debug, Clone, Deserialize)]
pub struct OrderInput {
    pub order_number: String,
    pub client_code: String,
    #[serde(default)]
    pub design: String,
    #[serde(default)]
    pub size: String,
    pub status: String,
    pub order_issued: Option<String>,
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub has_delay: bool,
    pub delay_reason: Option<String>,
}

/// Query string of the order listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    pub q: Option<String>,
    pub status: Option<String>,
}

/// Order deletion message structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDeletionData {
    pub order_number: String,
    pub client_code: String,
    pub deleted: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(status: Option<&str>) -> OrderRecord {
        OrderRecord {
            id: "7f1c".to_string(),
            order_number: "RM-2024-003".to_string(),
            client_code: "RM".to_string(),
            design: "Valley Sunset".to_string(),
            size: "9' x 12'".to_string(),
            status: status.map(str::to_string),
            order_issued: Some("2024-01-01".to_string()),
            delivery_date: Some("2024-03-01".to_string()),
            has_delay: true,
            delay_reason: Some("Special color blend development".to_string()),
            last_edit: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn derives_stage_and_timeline() {
        let order = Order::from_record(record(Some("dyeing")), &StageVocabulary::production(), now());
        assert_eq!(order.status, Stage::Dyeing);
        assert!(!order.status_defaulted);
        assert_eq!(order.timeline.len(), 10);
        assert_eq!(order.estimated_completion.as_deref(), Some("2024-03-01"));
        assert_eq!(order.carpet_name, "Valley Sunset");
    }

    #[test]
    fn keeps_raw_status_when_defaulted() {
        let order = Order::from_record(record(Some("lost")), &StageVocabulary::production(), now());
        assert_eq!(order.status, Stage::OrderApproval);
        assert!(order.status_defaulted);
        assert_eq!(order.raw_status.as_deref(), Some("lost"));
    }

    #[test]
    fn query_matching() {
        let order = Order::from_record(record(Some("DYEING")), &StageVocabulary::production(), now());
        assert!(order.matches_query("valley", false));
        assert!(order.matches_query("2024-003", false));
        assert!(order.matches_query("", false));
        assert!(!order.matches_query("mountain", true));

        let mut other = record(Some("DYEING"));
        other.client_code = "WAYNE".to_string();
        let order = Order::from_record(other, &StageVocabulary::production(), now());
        assert!(!order.matches_query("wayne", false));
        assert!(order.matches_query("wayne", true));
    }

    #[test]
    fn summary_counts() {
        let vocabulary = StageVocabulary::production();
        let orders = vec![
            Order::from_record(record(Some("DYEING")), &vocabulary, now()),
            Order::from_record(record(Some("dyeing")), &vocabulary, now()),
            Order::from_record(record(None), &vocabulary, now()),
        ];
        let summary = OrderSummary::from_orders(&orders);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.delayed, 3);
        assert_eq!(summary.defaulted_status, 1);
        assert_eq!(summary.by_stage.get("DYEING"), Some(&2));
        assert_eq!(summary.by_stage.get("ORDER_APPROVAL"), Some(&1));
    }

    #[test]
    fn detail_marks_current_step() {
        let order = Order::from_record(record(Some("ONLOOM")), &StageVocabulary::production(), now());
        let detail = OrderDetail::from(order);
        assert_eq!(detail.status_label, "On Loom");
        let current: Vec<Stage> = detail.steps.iter().filter(|s| s.current).map(|s| s.stage).collect();
        assert_eq!(current, vec![Stage::Onloom]);
    }
}
