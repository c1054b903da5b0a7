//! PostgreSQL implementation of SubscriptionLedger.
//!
//! Each ledger transaction wraps one `sqlx::Transaction`. Per-user reads take
//! a transaction-scoped advisory lock keyed on the user id, and reads by
//! provider id lock the row with `FOR UPDATE`, so concurrent deliveries for
//! the same user serialize inside Postgres.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::billing::{CoinbaseSubscription, Coupon, Plan, Subscription};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{LedgerTransaction, SubscriptionLedger};

const SUBSCRIPTION_ID_CONSTRAINT: &str = "subscriptions_subscription_id_key";
const COUPON_CODE_CONSTRAINT: &str = "coupons_code_key";

/// PostgreSQL implementation of the SubscriptionLedger port.
#[derive(Clone)]
pub struct PostgresSubscriptionLedger {
    pool: PgPool,
}

impl PostgresSubscriptionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionLedger for PostgresSubscriptionLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("start transaction", e))?;

        Ok(Box::new(PostgresLedgerTransaction { tx }))
    }
}

/// An open ledger transaction. Dropping it rolls back.
pub struct PostgresLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PostgresLedgerTransaction {
    async fn lock_user(&mut self, user_id: UserId) -> Result<(), DomainError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(user_id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DomainError::database("lock user", e))?;
        Ok(())
    }
}

/// Database row representation of a Paddle subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: i64,
    subscription_id: String,
    plan: String,
    cancel_url: String,
    update_url: String,
    next_bill_date: NaiveDate,
    event_time: DateTime<Utc>,
    cancelled: bool,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let plan = Plan::parse(&row.plan).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid plan value: {}", row.plan),
            )
        })?;

        Ok(Subscription {
            user_id: UserId::new(row.user_id),
            subscription_id: row.subscription_id,
            plan,
            cancel_url: row.cancel_url,
            update_url: row.update_url,
            next_bill_date: row.next_bill_date,
            event_time: Timestamp::from_datetime(row.event_time),
            cancelled: row.cancelled,
        })
    }
}

/// Database row representation of a Coinbase subscription.
#[derive(Debug, sqlx::FromRow)]
struct CoinbaseRow {
    user_id: i64,
    end_at: DateTime<Utc>,
    code: String,
}

impl From<CoinbaseRow> for CoinbaseSubscription {
    fn from(row: CoinbaseRow) -> Self {
        CoinbaseSubscription {
            user_id: UserId::new(row.user_id),
            end_at: Timestamp::from_datetime(row.end_at),
            code: row.code,
        }
    }
}

/// Maps a unique violation on `constraint` to `SubscriptionConflict`.
fn map_write_error(err: sqlx::Error, constraint: &str, operation: &str) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.constraint() == Some(constraint) {
            return DomainError::new(
                ErrorCode::SubscriptionConflict,
                format!("Failed to {}: {} already exists", operation, constraint),
            );
        }
    }
    DomainError::database(operation, err)
}

#[async_trait]
impl LedgerTransaction for PostgresLedgerTransaction {
    async fn get_by_user(&mut self, user_id: UserId) -> Result<Option<Subscription>, DomainError> {
        self.lock_user(user_id).await?;

        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT user_id, subscription_id, plan, cancel_url, update_url,
                   next_bill_date, event_time, cancelled
            FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("load subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn get_by_subscription_id(
        &mut self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT user_id, subscription_id, plan, cancel_url, update_url,
                   next_bill_date, event_time, cancelled
            FROM subscriptions
            WHERE subscription_id = $1
            FOR UPDATE
            "#,
        )
        .bind(subscription_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("load subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn upsert(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                user_id, subscription_id, plan, cancel_url, update_url,
                next_bill_date, event_time, cancelled
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE SET
                subscription_id = EXCLUDED.subscription_id,
                plan = EXCLUDED.plan,
                cancel_url = EXCLUDED.cancel_url,
                update_url = EXCLUDED.update_url,
                next_bill_date = EXCLUDED.next_bill_date,
                event_time = EXCLUDED.event_time,
                cancelled = EXCLUDED.cancelled,
                updated_at = NOW()
            "#,
        )
        .bind(subscription.user_id.as_i64())
        .bind(&subscription.subscription_id)
        .bind(subscription.plan.as_str())
        .bind(&subscription.cancel_url)
        .bind(&subscription.update_url)
        .bind(subscription.next_bill_date)
        .bind(subscription.event_time.as_datetime())
        .bind(subscription.cancelled)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, SUBSCRIPTION_ID_CONSTRAINT, "upsert subscription"))?;

        Ok(())
    }

    async fn delete(&mut self, subscription_id: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE subscription_id = $1")
            .bind(subscription_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DomainError::database("delete subscription", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_coinbase_by_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<CoinbaseSubscription>, DomainError> {
        self.lock_user(user_id).await?;

        let row = sqlx::query_as::<_, CoinbaseRow>(
            r#"
            SELECT user_id, end_at, code
            FROM coinbase_subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("load coinbase subscription", e))?;

        Ok(row.map(CoinbaseSubscription::from))
    }

    async fn upsert_coinbase(&mut self, subscription: &CoinbaseSubscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO coinbase_subscriptions (user_id, end_at, code)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                end_at = EXCLUDED.end_at,
                code = EXCLUDED.code,
                updated_at = NOW()
            "#,
        )
        .bind(subscription.user_id.as_i64())
        .bind(subscription.end_at.as_datetime())
        .bind(&subscription.code)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("upsert coinbase subscription", e))?;

        Ok(())
    }

    async fn insert_coupon(&mut self, coupon: &Coupon) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO coupons (code, comment, expires_date)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&coupon.code)
        .bind(&coupon.comment)
        .bind(coupon.expires_date.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, COUPON_CODE_CONSTRAINT, "insert coupon"))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| DomainError::database("commit transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DomainError::database("roll back transaction", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SubscriptionTerms;
    use std::sync::Arc;
    use std::time::Duration;

    fn row(plan: &str) -> SubscriptionRow {
        SubscriptionRow {
            user_id: 7,
            subscription_id: "sub_1".to_string(),
            plan: plan.to_string(),
            cancel_url: "c".to_string(),
            update_url: "u".to_string(),
            next_bill_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            event_time: Utc::now(),
            cancelled: true,
        }
    }

    #[test]
    fn subscription_row_converts() {
        let sub = Subscription::try_from(row("yearly")).unwrap();
        assert_eq!(sub.user_id, UserId::new(7));
        assert_eq!(sub.plan, Plan::Yearly);
        assert!(sub.cancelled);
    }

    #[test]
    fn subscription_row_with_unknown_plan_is_database_error() {
        let err = Subscription::try_from(row("weekly")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn non_constraint_errors_map_to_database_error() {
        let err = map_write_error(sqlx::Error::RowNotFound, COUPON_CODE_CONSTRAINT, "insert coupon");
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.starts_with("Failed to insert coupon"));
    }

    // ══════════════════════════════════════════════════════════════
    // Live Database Tests
    // ══════════════════════════════════════════════════════════════
    //
    // These need a disposable PostgreSQL instance:
    //   DATABASE_URL=postgres://localhost/alias_billing_test cargo test -- --ignored

    async fn live_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        pool
    }

    async fn insert_user(pool: &PgPool) -> UserId {
        let email = format!("{}@ledger.test", uuid::Uuid::new_v4());
        let id: i64 = sqlx::query_scalar("INSERT INTO users (email) VALUES ($1) RETURNING id")
            .bind(email)
            .fetch_one(pool)
            .await
            .unwrap();
        UserId::new(id)
    }

    async fn delete_user(pool: &PgPool, user_id: UserId) {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id.as_i64())
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore] // Run with: cargo test -- --ignored
    async fn concurrent_charges_for_one_user_all_apply() {
        const CHARGES: u32 = 8;
        let pool = live_pool().await;
        let user_id = insert_user(&pool).await;
        let ledger = Arc::new(PostgresSubscriptionLedger::new(pool.clone()));
        let now = Timestamp::from_unix_secs(1_704_067_200); // 2024-01-01

        let tasks: Vec<_> = (0..CHARGES)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    let code = format!("C{}", i);
                    let mut tx = ledger.begin().await.unwrap();
                    let sub = match tx.get_coinbase_by_user(user_id).await.unwrap() {
                        Some(mut sub) => {
                            sub.apply_charge(&code, now);
                            sub
                        }
                        None => CoinbaseSubscription::start(user_id, code, now),
                    };
                    tx.upsert_coinbase(&sub).await.unwrap();
                    tx.commit().await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let mut tx = ledger.begin().await.unwrap();
        let stored = tx.get_coinbase_by_user(user_id).await.unwrap().unwrap();
        tx.commit().await.unwrap();
        delete_user(&pool, user_id).await;

        assert_eq!(stored.end_at, now.add_years(CHARGES));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ignore] // Run with: cargo test -- --ignored
    async fn read_by_subscription_id_waits_for_the_holder_to_commit() {
        let pool = live_pool().await;
        let user_id = insert_user(&pool).await;
        let ledger = Arc::new(PostgresSubscriptionLedger::new(pool.clone()));
        let subscription_id = format!("sub_{}", uuid::Uuid::new_v4());
        let now = Timestamp::from_unix_secs(1_704_067_200);

        let mut seed = ledger.begin().await.unwrap();
        let terms = SubscriptionTerms {
            plan: Plan::Monthly,
            cancel_url: "c".to_string(),
            update_url: "u".to_string(),
            next_bill_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        };
        seed.upsert(&Subscription::start(user_id, &subscription_id, terms, now))
            .await
            .unwrap();
        seed.commit().await.unwrap();

        let mut holder = ledger.begin().await.unwrap();
        let mut sub = holder
            .get_by_subscription_id(&subscription_id)
            .await
            .unwrap()
            .unwrap();

        let waiter = tokio::spawn({
            let ledger = ledger.clone();
            let subscription_id = subscription_id.clone();
            async move {
                let mut tx = ledger.begin().await.unwrap();
                let seen = tx.get_by_subscription_id(&subscription_id).await.unwrap();
                tx.commit().await.unwrap();
                seen
            }
        });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!waiter.is_finished());

        sub.cancel(now);
        holder.upsert(&sub).await.unwrap();
        holder.commit().await.unwrap();

        let seen = waiter.await.unwrap().unwrap();
        delete_user(&pool, user_id).await;

        assert!(seen.cancelled);
    }
}
