//! Order stage service
//!
//! Applies the stage signals emitted by quote negotiation to the local order
//! projection. Always runs inside the caller's transaction.

use chrono::Utc;
use rust_decimal::Decimal;
use shared::{OrderStage, OrderStageSignal};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Order stage transitions driven by quotes
pub struct OrderStageService;

impl OrderStageService {
    /// Move an order into vendor negotiation when its first quote is created.
    ///
    /// Orders not yet known locally are registered on the way.
    pub async fn mark_negotiating(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        order_id: Uuid,
        changed_by: Option<Uuid>,
    ) -> AppResult<()> {
        match Self::lock_stage(conn, tenant_id, order_id).await? {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO orders (id, tenant_id, stage)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(order_id)
                .bind(tenant_id)
                .bind(OrderStage::VendorNegotiation.as_str())
                .execute(&mut *conn)
                .await?;

                Self::record(
                    conn,
                    order_id,
                    OrderStage::VendorSourcing,
                    OrderStage::VendorNegotiation,
                    "First vendor quote created",
                    changed_by,
                )
                .await
            }
            Some(OrderStage::VendorSourcing) => {
                Self::set_stage(conn, order_id, OrderStage::VendorNegotiation, None).await?;
                Self::record(
                    conn,
                    order_id,
                    OrderStage::VendorSourcing,
                    OrderStage::VendorNegotiation,
                    "Vendor quote created",
                    changed_by,
                )
                .await
            }
            Some(_) => Ok(()),
        }
    }

    /// Apply a signal; returns the stage the order ended up in
    pub async fn apply(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        order_id: Uuid,
        signal: &OrderStageSignal,
        changed_by: Option<Uuid>,
    ) -> AppResult<Option<OrderStage>> {
        let Some(current) = Self::lock_stage(conn, tenant_id, order_id).await? else {
            tracing::warn!(%order_id, "Order stage signal for unknown order ignored");
            return Ok(None);
        };

        let target = signal.target_stage();
        let (prices, reason) = match signal {
            OrderStageSignal::AdvanceToCustomerQuote {
                vendor_quoted_price,
                quotation_amount,
            } => (
                Some((*vendor_quoted_price, *quotation_amount)),
                "Vendor quote accepted",
            ),
            OrderStageSignal::RevertToVendorSourcing => (None, "All vendor quotes rejected"),
        };

        Self::set_stage(conn, order_id, target, prices).await?;
        if current != target {
            Self::record(conn, order_id, current, target, reason, changed_by).await?;
        }

        tracing::info!(%order_id, from = %current.as_str(), to = %target.as_str(), "Order stage updated");
        Ok(Some(target))
    }

    async fn lock_stage(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<OrderStage>> {
        let stage: Option<String> = sqlx::query_scalar(
            "SELECT stage FROM orders WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(order_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        stage
            .map(|s| {
                OrderStage::from_str(&s)
                    .ok_or_else(|| AppError::Internal(format!("Unknown order stage '{}'", s)))
            })
            .transpose()
    }

    async fn set_stage(
        conn: &mut PgConnection,
        order_id: Uuid,
        stage: OrderStage,
        prices: Option<(Decimal, Decimal)>,
    ) -> AppResult<()> {
        let (vendor_quoted_price, quotation_amount) = prices.unzip();
        sqlx::query(
            r#"
            UPDATE orders
            SET stage = $1,
                vendor_quoted_price = COALESCE($2, vendor_quoted_price),
                quotation_amount = COALESCE($3, quotation_amount),
                updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(stage.as_str())
        .bind(vendor_quoted_price)
        .bind(quotation_amount)
        .bind(Utc::now())
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn record(
        conn: &mut PgConnection,
        order_id: Uuid,
        from: OrderStage,
        to: OrderStage,
        reason: &str,
        changed_by: Option<Uuid>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_stage_history (id, order_id, from_stage, to_stage, reason, changed_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(reason)
        .bind(changed_by)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
