use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::future::Future;
use std::time::{Duration, Instant};

use crate::db::LedgerStore;
use crate::models::{
    range_bounds, AccountingEntry, BankTransaction, DateRange, Match, NewMatch, RecordStatus,
};

const TRANSACTION_COLUMNS: &str = r#"
    id, bank_account_id, amount, transaction_date AS date,
    description, reference, status
"#;

const ENTRY_COLUMNS: &str = r#"
    id, company_id, amount, entry_date AS date, description, reference,
    document_type, direction, status
"#;

const MATCH_COLUMNS: &str = r#"
    id, bank_transaction_id, accounting_entry_id, bank_account_id,
    match_type, confidence, notes, created_at
"#;

/// PostgreSQL 记录存储
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    write_timeout: Duration,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool, write_timeout: Duration) -> Self {
        Self { pool, write_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 写操作加超时控制
    async fn with_timeout<T, F>(&self, op: &str, fut: F) -> Result<T, sqlx::Error>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        let start_time = Instant::now();
        match tokio::time::timeout(self.write_timeout, fut).await {
            Ok(Ok(value)) => {
                tracing::debug!("✓ {} 执行成功, 耗时: {:?}", op, start_time.elapsed());
                Ok(value)
            }
            Ok(Err(e)) => {
                tracing::error!("✗ {} 执行失败, 耗时: {:?}, 错误: {:?}", op, start_time.elapsed(), e);
                Err(e)
            }
            Err(_) => {
                tracing::error!("✗ {} 操作超时 (>{:?})!", op, self.write_timeout);
                Err(sqlx::Error::PoolTimedOut)
            }
        }
    }
}

/// 把一条记录的状态从 from 改为 to; 未命中视为并发冲突
async fn flip_status(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    id: i64,
    from: RecordStatus,
    to: RecordStatus,
) -> Result<(), sqlx::Error> {
    let sql = format!("UPDATE {} SET status = $1 WHERE id = $2 AND status = $3", table);
    let result = sqlx::query(&sql)
        .bind(to.as_str())
        .bind(id)
        .bind(from.as_str())
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() != 1 {
        tracing::warn!("{} {} 状态不是 {}, 回滚", table, id, from.as_str());
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn company_for_account(&self, bank_account_id: i64) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT company_id FROM bank_accounts WHERE id = $1")
            .bind(bank_account_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn unmatched_transactions(
        &self,
        bank_account_id: i64,
        range: Option<&DateRange>,
    ) -> Result<Vec<BankTransaction>, sqlx::Error> {
        let (start, end) = range_bounds(range);
        let sql = format!(
            r#"
            SELECT {}
            FROM bank_transactions
            WHERE bank_account_id = $1
              AND status = 'pending'
              AND ($2::date IS NULL OR transaction_date >= $2)
              AND ($3::date IS NULL OR transaction_date <= $3)
            ORDER BY transaction_date, id
            "#,
            TRANSACTION_COLUMNS
        );

        sqlx::query_as::<_, BankTransaction>(&sql)
            .bind(bank_account_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
    }

    async fn unmatched_entries(
        &self,
        company_id: i64,
        range: Option<&DateRange>,
    ) -> Result<Vec<AccountingEntry>, sqlx::Error> {
        let (start, end) = range_bounds(range);
        let sql = format!(
            r#"
            SELECT {}
            FROM accounting_entries
            WHERE company_id = $1
              AND status = 'pending'
              AND ($2::date IS NULL OR entry_date >= $2)
              AND ($3::date IS NULL OR entry_date <= $3)
            ORDER BY entry_date, id
            "#,
            ENTRY_COLUMNS
        );

        sqlx::query_as::<_, AccountingEntry>(&sql)
            .bind(company_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
    }

    async fn transaction(&self, id: i64) -> Result<Option<BankTransaction>, sqlx::Error> {
        let sql = format!("SELECT {} FROM bank_transactions WHERE id = $1", TRANSACTION_COLUMNS);
        sqlx::query_as::<_, BankTransaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn entry(&self, id: i64) -> Result<Option<AccountingEntry>, sqlx::Error> {
        let sql = format!("SELECT {} FROM accounting_entries WHERE id = $1", ENTRY_COLUMNS);
        sqlx::query_as::<_, AccountingEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_match(&self, id: i64) -> Result<Option<Match>, sqlx::Error> {
        let sql = format!("SELECT {} FROM reconciliation_matches WHERE id = $1", MATCH_COLUMNS);
        sqlx::query_as::<_, Match>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn insert_match(&self, new_match: &NewMatch) -> Result<Match, sqlx::Error> {
        self.with_timeout("INSERT match", async {
            let mut tx = self.pool.begin().await?;

            let sql = format!(
                r#"
                INSERT INTO reconciliation_matches (
                    bank_transaction_id, accounting_entry_id, bank_account_id,
                    match_type, confidence, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {}
                "#,
                MATCH_COLUMNS
            );
            let created = sqlx::query_as::<_, Match>(&sql)
                .bind(new_match.bank_transaction_id)
                .bind(new_match.accounting_entry_id)
                .bind(new_match.bank_account_id)
                .bind(new_match.match_type.as_str())
                .bind(new_match.confidence)
                .bind(new_match.notes.as_deref())
                .fetch_one(&mut *tx)
                .await?;

            flip_status(
                &mut tx,
                "bank_transactions",
                new_match.bank_transaction_id,
                RecordStatus::Pending,
                RecordStatus::Reconciled,
            )
            .await?;
            flip_status(
                &mut tx,
                "accounting_entries",
                new_match.accounting_entry_id,
                RecordStatus::Pending,
                RecordStatus::Reconciled,
            )
            .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(created)
        })
        .await
    }

    async fn remove_match(&self, existing: &Match) -> Result<(), sqlx::Error> {
        self.with_timeout("DELETE match", async {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query("DELETE FROM reconciliation_matches WHERE id = $1")
                .bind(existing.id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() != 1 {
                return Err(sqlx::Error::RowNotFound);
            }

            flip_status(
                &mut tx,
                "bank_transactions",
                existing.bank_transaction_id,
                RecordStatus::Reconciled,
                RecordStatus::Pending,
            )
            .await?;
            flip_status(
                &mut tx,
                "accounting_entries",
                existing.accounting_entry_id,
                RecordStatus::Reconciled,
                RecordStatus::Pending,
            )
            .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(())
        })
        .await
    }

    async fn list_matches(&self, bank_account_id: i64) -> Result<Vec<Match>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM reconciliation_matches WHERE bank_account_id = $1 ORDER BY created_at, id",
            MATCH_COLUMNS
        );
        sqlx::query_as::<_, Match>(&sql)
            .bind(bank_account_id)
            .fetch_all(&self.pool)
            .await
    }
}
