use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, Result},
    models::order::{OrderInput, OrderRecord},
};

/// Store for the `carpet_orders` table
#[derive(Clone)]
pub struct OrderStore {
    pool: DbPool,
}

impl OrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// All orders, or only those of `client_code`, ordered by order number
    pub async fn list_orders(&self, client_code: Option<&str>) -> Result<Vec<OrderRecord>> {
        let orders = match client_code {
            Some(code) => {
                sqlx::query_as::<_, OrderRecord>(
                    "SELECT * FROM carpet_orders WHERE client_code = ? COLLATE NOCASE ORDER BY order_number",
                )
                .bind(code)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, OrderRecord>("SELECT * FROM carpet_orders ORDER BY order_number")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(AppError::Database)?;

        Ok(orders)
    }

    pub async fn find_order_by_number(&self, order_number: &str) -> Result<Option<OrderRecord>> {
        let order = sqlx::query_as::<_, OrderRecord>("SELECT * FROM carpet_orders WHERE order_number = ?")
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(order)
    }

    pub async fn get_order_by_number(&self, order_number: &str) -> Result<OrderRecord> {
        self.find_order_by_number(order_number)
            .await?
            .ok_or(AppError::OrderNotFound)
    }

    /// Insert a new order; the order number must be unused
    pub async fn create_order(&self, input: &OrderInput) -> Result<OrderRecord> {
        sqlx::query(
            r#"
            INSERT INTO carpet_orders
                (id, order_number, client_code, design, size, status,
                 order_issued, delivery_date, has_delay, delay_reason, last_edit)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&input.order_number)
        .bind(&input.client_code)
        .bind(&input.design)
        .bind(&input.size)
        .bind(&input.status)
        .bind(&input.order_issued)
        .bind(&input.delivery_date)
        .bind(input.has_delay)
        .bind(&input.delay_reason)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::from_insert(e, || format!("Order {} already exists", input.order_number))
        })?;

        self.get_order_by_number(&input.order_number).await
    }

    /// Overwrite every field of an order except its number
    pub async fn update_order(&self, order_number: &str, input: &OrderInput) -> Result<OrderRecord> {
        let result = sqlx::query(
            r#"
            UPDATE carpet_orders
            SET client_code = ?, design = ?, size = ?, status = ?,
                order_issued = ?, delivery_date = ?, has_delay = ?,
                delay_reason = ?, last_edit = ?
            WHERE order_number = ?
            "#,
        )
        .bind(&input.client_code)
        .bind(&input.design)
        .bind(&input.size)
        .bind(&input.status)
        .bind(&input.order_issued)
        .bind(&input.delivery_date)
        .bind(input.has_delay)
        .bind(&input.delay_reason)
        .bind(Utc::now())
        .bind(order_number)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::OrderNotFound);
        }

        self.get_order_by_number(order_number).await
    }

    /// Delete an order, returning the removed row
    pub async fn delete_order(&self, order_number: &str) -> Result<OrderRecord> {
        let existing = self.get_order_by_number(order_number).await?;

        sqlx::query("DELETE FROM carpet_orders WHERE order_number = ?")
            .bind(&existing.order_number)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(existing)
    }

    /// Distinct buyer codes present in the order table
    pub async fn client_codes(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT UPPER(client_code) FROM carpet_orders ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(|(code,)| code).collect())
    }
}
