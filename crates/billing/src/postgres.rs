//! PostgreSQL implementation of [`BillingStore`]

use async_trait::async_trait;
use billtrack_shared::{
    AiReport, Invoice, InvoiceId, InvoicePatch, NewInvoice, NewNotification, Notification,
    NotificationId, ReportId, ReportKind, TrackerResult, User, UserId, UserSettingsPatch,
    MAX_MONEY,
};
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;

use crate::settlement::{self, Settlement};
use crate::store::BillingStore;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_invoice(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &Invoice,
) -> Result<Invoice, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO invoices (
            id, user_id, payee, description, amount, due_date, status, paid_amount,
            recurrence_type, total_installments, current_installment, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(invoice.id)
    .bind(invoice.user_id)
    .bind(&invoice.payee)
    .bind(&invoice.description)
    .bind(invoice.amount)
    .bind(invoice.due_date)
    .bind(invoice.status)
    .bind(invoice.paid_amount)
    .bind(invoice.recurrence_type)
    .bind(invoice.total_installments)
    .bind(invoice.current_installment)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .fetch_one(&mut **tx)
    .await
}

#[async_trait]
impl BillingStore for PgStore {
    async fn ping(&self) -> TrackerResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn ensure_user(&self, user_id: UserId, email: Option<&str>) -> TrackerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> TrackerResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_user_settings(
        &self,
        user_id: UserId,
        patch: &UserSettingsPatch,
    ) -> TrackerResult<Option<User>> {
        let user = sqlx::query_as(
            r#"
            UPDATE users SET
                language = COALESCE($2, language),
                currency = COALESCE($3, currency),
                notifications_enabled = COALESCE($4, notifications_enabled),
                balance = COALESCE($5, balance),
                nickname = COALESCE($6, nickname),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&patch.language)
        .bind(&patch.currency)
        .bind(patch.notifications_enabled)
        .bind(patch.balance)
        .bind(&patch.nickname)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_invoices(&self, user_id: UserId) -> TrackerResult<Vec<Invoice>> {
        let invoices = sqlx::query_as(
            "SELECT * FROM invoices WHERE user_id = $1 ORDER BY due_date ASC, created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invoices)
    }

    async fn get_invoice(&self, user_id: UserId, id: InvoiceId) -> TrackerResult<Option<Invoice>> {
        let invoice = sqlx::query_as("SELECT * FROM invoices WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    async fn create_invoice(&self, user_id: UserId, invoice: NewInvoice) -> TrackerResult<Invoice> {
        let row = invoice.into_invoice(user_id, OffsetDateTime::now_utc());
        let mut tx = self.pool.begin().await?;
        let created = insert_invoice(&mut tx, &row).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update_invoice(
        &self,
        user_id: UserId,
        id: InvoiceId,
        patch: &InvoicePatch,
    ) -> TrackerResult<Option<Settlement>> {
        let mut tx = self.pool.begin().await?;

        // Row lock: a concurrent mark-paid waits here and then sees `paid`
        let prior: Option<Invoice> =
            sqlx::query_as("SELECT * FROM invoices WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(prior) = prior else {
            return Ok(None);
        };

        let plan = settlement::plan(&prior, patch, OffsetDateTime::now_utc())?;
        let updated = &plan.updated;

        let invoice: Invoice = sqlx::query_as(
            r#"
            UPDATE invoices SET
                payee = $3,
                description = $4,
                amount = $5,
                due_date = $6,
                status = $7,
                paid_amount = $8,
                recurrence_type = $9,
                total_installments = $10,
                current_installment = $11,
                updated_at = $12
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&updated.payee)
        .bind(&updated.description)
        .bind(updated.amount)
        .bind(updated.due_date)
        .bind(updated.status)
        .bind(updated.paid_amount)
        .bind(updated.recurrence_type)
        .bind(updated.total_installments)
        .bind(updated.current_installment)
        .bind(updated.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(debit) = plan.wallet_debit {
            // The owner row exists (foreign key), so no match means the limit
            let debited = sqlx::query(
                r#"
                UPDATE users SET balance = balance - $2, updated_at = NOW()
                WHERE id = $1 AND balance - $2 >= $3
                "#,
            )
            .bind(user_id)
            .bind(debit)
            .bind(-MAX_MONEY)
            .execute(&mut *tx)
            .await?;

            if debited.rows_affected() == 0 {
                return Err(settlement::wallet_limit());
            }
        }

        let successor = match plan.successor {
            Some(next) => {
                let row = next.into_invoice(user_id, updated.updated_at);
                Some(insert_invoice(&mut tx, &row).await?)
            }
            None => None,
        };

        tx.commit().await?;

        Ok(Some(Settlement {
            invoice,
            wallet_debit: plan.wallet_debit,
            successor,
        }))
    }

    async fn delete_invoice(&self, user_id: UserId, id: InvoiceId) -> TrackerResult<bool> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn credit_balance(&self, user_id: UserId) -> TrackerResult<i32> {
        let balance: Option<(i32,)> =
            sqlx::query_as("SELECT balance FROM credits WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(balance.map(|(b,)| b).unwrap_or(0))
    }

    async fn add_credits(&self, user_id: UserId, amount: i32) -> TrackerResult<i32> {
        let (balance,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO credits (user_id, balance)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                balance = credits.balance + EXCLUDED.balance,
                updated_at = NOW()
            RETURNING balance
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(balance)
    }

    async fn deduct_credits(&self, user_id: UserId, amount: i32) -> TrackerResult<Option<i32>> {
        let balance: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE credits SET
                balance = balance - $2,
                updated_at = NOW()
            WHERE user_id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;
        Ok(balance.map(|(b,)| b))
    }

    async fn charge_and_store_report(
        &self,
        user_id: UserId,
        cost: i32,
        kind: ReportKind,
        content: &serde_json::Value,
    ) -> TrackerResult<Option<AiReport>> {
        let mut tx = self.pool.begin().await?;

        let charged: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE credits SET
                balance = balance - $2,
                updated_at = NOW()
            WHERE user_id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(user_id)
        .bind(cost)
        .fetch_optional(&mut *tx)
        .await?;

        if charged.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let report: AiReport = sqlx::query_as(
            r#"
            INSERT INTO ai_reports (id, user_id, report_type, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(ReportId::new())
        .bind(user_id)
        .bind(kind)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(report))
    }

    async fn list_reports(&self, user_id: UserId) -> TrackerResult<Vec<AiReport>> {
        let reports =
            sqlx::query_as("SELECT * FROM ai_reports WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(reports)
    }

    async fn get_report(&self, user_id: UserId, id: ReportId) -> TrackerResult<Option<AiReport>> {
        let report = sqlx::query_as("SELECT * FROM ai_reports WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(report)
    }

    async fn list_notifications(&self, user_id: UserId) -> TrackerResult<Vec<Notification>> {
        let notifications = sqlx::query_as(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn create_notification(
        &self,
        user_id: UserId,
        notification: NewNotification,
    ) -> TrackerResult<Notification> {
        let created = sqlx::query_as(
            r#"
            INSERT INTO notifications (id, user_id, title, message)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(NotificationId::new())
        .bind(user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn mark_notification_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> TrackerResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billtrack_shared::{InvoiceStatus, RecurrenceKind};
    use rust_decimal::Decimal;

    async fn test_store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = billtrack_shared::create_pool(&url, 2)
            .await
            .expect("Failed to create pool");
        billtrack_shared::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        PgStore::new(pool)
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_settlement_is_applied_once() {
        let store = test_store().await;
        let user_id = UserId::new();
        store.ensure_user(user_id, None).await.unwrap();

        let invoice = store
            .create_invoice(
                user_id,
                NewInvoice {
                    payee: "Gym".to_string(),
                    description: None,
                    amount: Decimal::new(3000, 2),
                    due_date: OffsetDateTime::now_utc(),
                    status: InvoiceStatus::Unpaid,
                    paid_amount: Decimal::ZERO,
                    recurrence_type: RecurrenceKind::Monthly,
                    total_installments: None,
                    current_installment: None,
                },
            )
            .await
            .unwrap();

        let patch = InvoicePatch {
            status: Some(InvoiceStatus::Paid),
            ..Default::default()
        };
        let first = store.update_invoice(user_id, invoice.id, &patch).await.unwrap().unwrap();
        let second = store.update_invoice(user_id, invoice.id, &patch).await.unwrap().unwrap();

        assert!(first.successor.is_some());
        assert!(second.successor.is_none());

        let user = store.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.balance, Decimal::new(-3000, 2));
        assert_eq!(store.list_invoices(user_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_conditional_deduct() {
        let store = test_store().await;
        let user_id = UserId::new();
        store.ensure_user(user_id, None).await.unwrap();

        assert_eq!(store.deduct_credits(user_id, 1).await.unwrap(), None);
        assert_eq!(store.add_credits(user_id, 2).await.unwrap(), 2);
        assert_eq!(store.deduct_credits(user_id, 1).await.unwrap(), Some(1));
        assert_eq!(store.credit_balance(user_id).await.unwrap(), 1);
    }
}
