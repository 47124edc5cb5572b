use std::sync::Arc;

use chrono::Utc;

use crate::{
    db::order_store::OrderStore,
    error::{AppError, Result},
    models::{
        order::{Order, OrderInput, OrderQuery, OrderRecord, OrderSummary},
        stage::StageVocabulary,
        user::Claims,
    },
    services::{
        status_service::{normalize_status, StatusResolution},
        timeline_service::parse_order_date,
    },
};

/// An updated order and the client it belonged to before the update
#[derive(Debug, Clone)]
pub struct UpdatedOrder {
    pub order: Order,
    pub previous_client_code: String,
}

/// Order reads scoped to the caller and validated admin writes
#[derive(Clone)]
pub struct OrderService {
    store: OrderStore,
    vocabulary: Arc<StageVocabulary>,
}

impl OrderService {
    pub fn new(store: OrderStore, vocabulary: Arc<StageVocabulary>) -> Self {
        Self { store, vocabulary }
    }

    pub fn vocabulary(&self) -> &StageVocabulary {
        &self.vocabulary
    }

    /// Derive the client view of a stored row as of now
    pub fn to_order(&self, record: OrderRecord) -> Order {
        Order::from_record(record, &self.vocabulary, Utc::now())
    }

    /// Orders the caller may see, filtered by search text and stage
    pub async fn list_orders(&self, claims: &Claims, query: &OrderQuery) -> Result<Vec<Order>> {
        let scope = if claims.is_admin() {
            None
        } else {
            match claims.client_code.as_deref() {
                Some(code) => Some(code),
                None => return Ok(Vec::new()),
            }
        };

        let status_filter = match query.status.as_deref().map(str::trim) {
            None | Some("") | Some("ALL") => None,
            Some(raw) => match normalize_status(&self.vocabulary, Some(raw)) {
                StatusResolution::Recognized { stage } => Some(stage),
                StatusResolution::Defaulted { .. } => {
                    return Err(AppError::BadRequest(format!("Unknown status filter: {}", raw)));
                }
            },
        };
        let search = query.q.as_deref().unwrap_or_default();

        let orders = self
            .store
            .list_orders(scope)
            .await?
            .into_iter()
            .map(|record| self.to_order(record))
            .filter(|order| status_filter.is_none_or(|stage| order.status == stage))
            .filter(|order| order.matches_query(search, claims.is_admin()))
            .collect();

        Ok(orders)
    }

    pub async fn summary(&self, claims: &Claims) -> Result<OrderSummary> {
        let orders = self.list_orders(claims, &OrderQuery::default()).await?;
        Ok(OrderSummary::from_orders(&orders))
    }

    /// Single order; orders of other clients look like missing ones
    pub async fn get_order(&self, claims: &Claims, order_number: &str) -> Result<Order> {
        let record = self.store.get_order_by_number(order_number).await?;
        if !claims.can_view(&record.client_code) {
            return Err(AppError::OrderNotFound);
        }
        Ok(self.to_order(record))
    }

    pub async fn create_order(&self, input: OrderInput) -> Result<Order> {
        let input = self.validate(input)?;
        let record = self.store.create_order(&input).await?;
        tracing::info!(order_number = %record.order_number, status = ?record.status, "Order created");
        Ok(self.to_order(record))
    }

    pub async fn update_order(&self, order_number: &str, input: OrderInput) -> Result<UpdatedOrder> {
        let input = self.validate(input)?;
        if input.order_number != order_number {
            return Err(AppError::BadRequest(
                "order_number cannot be changed".to_string(),
            ));
        }
        let previous = self.store.get_order_by_number(order_number).await?;
        let record = self.store.update_order(order_number, &input).await?;
        tracing::info!(order_number, status = ?record.status, "Order updated");
        Ok(UpdatedOrder {
            order: self.to_order(record),
            previous_client_code: previous.client_code,
        })
    }

    pub async fn delete_order(&self, order_number: &str) -> Result<OrderRecord> {
        let record = self.store.delete_order(order_number).await?;
        tracing::info!(order_number, "Order deleted");
        Ok(record)
    }

    pub async fn client_codes(&self) -> Result<Vec<String>> {
        self.store.client_codes().await
    }

    /// Trim fields, store the canonical stage code and reject unreadable
    /// statuses or dates.
    pub fn validate(&self, mut input: OrderInput) -> Result<OrderInput> {
        input.order_number = input.order_number.trim().to_string();
        input.client_code = input.client_code.trim().to_uppercase();
        input.design = input.design.trim().to_string();
        input.size = input.size.trim().to_string();

        if input.order_number.is_empty() {
            return Err(AppError::BadRequest("order_number is required".to_string()));
        }
        if input.client_code.is_empty() {
            return Err(AppError::BadRequest("client_code is required".to_string()));
        }

        input.status = match normalize_status(&self.vocabulary, Some(&input.status)) {
            StatusResolution::Recognized { stage } => stage.code().to_string(),
            StatusResolution::Defaulted { raw, .. } => {
                return Err(AppError::BadRequest(format!("Unknown status: {}", raw)));
            }
        };

        input.order_issued = check_date("order_issued", input.order_issued)?;
        input.delivery_date = check_date("delivery_date", input.delivery_date)?;
        input.delay_reason = input
            .delay_reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());

        Ok(input)
    }
}

fn check_date(field: &str, value: Option<String>) -> Result<Option<String>> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(date) if parse_order_date(&date).is_some() => Ok(Some(date)),
        Some(date) => Err(AppError::BadRequest(format!(
            "{} is not a valid date: {}",
            field, date
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;

    async fn service() -> OrderService {
        let pool = init_memory_pool().await.unwrap();
        OrderService::new(OrderStore::new(pool), Arc::new(StageVocabulary::production()))
    }

    fn input(order_number: &str, status: &str) -> OrderInput {
        OrderInput {
            order_number: order_number.to_string(),
            client_code: " ws ".to_string(),
            design: "Himalayan Bloom".to_string(),
            size: "8' x 10'".to_string(),
            status: status.to_string(),
            order_issued: Some("2024-01-01".to_string()),
            delivery_date: Some(" ".to_string()),
            has_delay: false,
            delay_reason: Some("".to_string()),
        }
    }

    #[tokio::test]
    async fn validate_canonicalizes_fields() {
        let service = service().await;
        let input = service.validate(input(" WS-2024-001 ", "on loom progress")).unwrap();
        assert_eq!(input.order_number, "WS-2024-001");
        assert_eq!(input.client_code, "WS");
        assert_eq!(input.status, "ONLOOM_PROGRESS");
        assert_eq!(input.delivery_date, None);
        assert_eq!(input.delay_reason, None);
    }

    #[tokio::test]
    async fn validate_rejects_unknown_status_and_bad_dates() {
        let service = service().await;
        assert!(matches!(
            service.validate(input("WS-1", "lost in transit")),
            Err(AppError::BadRequest(_))
        ));

        let mut bad_date = input("WS-1", "DYEING");
        bad_date.order_issued = Some("31/12/2024".to_string());
        assert!(matches!(service.validate(bad_date), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn order_number_cannot_be_renamed() {
        let service = service().await;
        service.create_order(input("WS-1", "DYEING")).await.unwrap();
        let result = service.update_order("WS-1", input("WS-2", "DYEING")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn update_reports_previous_client_code() {
        let service = service().await;
        service.create_order(input("WS-1", "DYEING")).await.unwrap();

        let mut moved = input("WS-1", "FINISHING");
        moved.client_code = "ld".to_string();
        let updated = service.update_order("WS-1", moved).await.unwrap();

        assert_eq!(updated.previous_client_code, "WS");
        assert_eq!(updated.order.client_code, "LD");
        assert_eq!(updated.order.status, crate::models::stage::Stage::Finishing);
    }
}
