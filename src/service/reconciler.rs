use bigdecimal::{BigDecimal, Zero};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::db::LedgerStore;
use crate::error::{ReconcileError, ReconcileResult};
use crate::models::{
    AccountingEntry, BankTransaction, DateRange, Match, MatchMethod, MatchSummary, RecordStatus,
};
use crate::service::matcher::{MatchOptions, MultiPassMatcher};
use crate::service::scorer::{ConfidenceScorer, MAX_SCORE};
use crate::service::writer;

/// 自动对账请求; 未给出的容差取服务默认值
#[derive(Debug, Clone, Default)]
pub struct AutoReconcileRequest {
    pub bank_account_id: Option<i64>,
    pub date_range: Option<DateRange>,
    pub tolerance_days: Option<i64>,
    pub amount_tolerance: Option<BigDecimal>,
}

impl AutoReconcileRequest {
    pub fn for_account(bank_account_id: i64) -> Self {
        Self {
            bank_account_id: Some(bank_account_id),
            ..Self::default()
        }
    }
}

/// 对账服务: 自动对账、人工匹配、撤销、评分预览
///
/// 分录按公司归属, 同一公司 (含其下所有银行账户) 的写操作通过公司锁串行执行。
pub struct ReconcileService<S: LedgerStore> {
    store: Arc<S>,
    defaults: MatchOptions,
    company_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl<S: LedgerStore> ReconcileService<S> {
    pub fn new(store: Arc<S>, defaults: MatchOptions) -> Self {
        Self {
            store,
            defaults,
            company_locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        self.store.as_ref()
    }

    fn company_lock(&self, company_id: i64) -> Arc<Mutex<()>> {
        self.company_locks
            .entry(company_id)
            .or_default()
            .value()
            .clone()
    }

    fn resolve_options(&self, request: &AutoReconcileRequest) -> ReconcileResult<MatchOptions> {
        let options = MatchOptions {
            tolerance_days: request.tolerance_days.unwrap_or(self.defaults.tolerance_days),
            amount_tolerance: request
                .amount_tolerance
                .clone()
                .unwrap_or_else(|| self.defaults.amount_tolerance.clone()),
        };

        if options.tolerance_days < 0 {
            return Err(ReconcileError::Validation(format!(
                "tolerance_days must not be negative, got {}",
                options.tolerance_days
            )));
        }
        if options.amount_tolerance < BigDecimal::zero() {
            return Err(ReconcileError::Validation(format!(
                "amount_tolerance must not be negative, got {}",
                options.amount_tolerance
            )));
        }
        if let Some(range) = &request.date_range {
            if range.is_inverted() {
                return Err(ReconcileError::Validation(format!(
                    "date range start {} is after end {}",
                    range.start, range.end
                )));
            }
        }

        Ok(options)
    }

    /// 自动对账: 读取两边未匹配记录, 依次执行四轮匹配, 返回本次新建的匹配
    pub async fn auto_reconcile(&self, request: AutoReconcileRequest) -> ReconcileResult<Vec<Match>> {
        let bank_account_id = request
            .bank_account_id
            .ok_or_else(|| ReconcileError::Validation("bank_account_id is required".to_string()))?;
        let options = self.resolve_options(&request)?;

        let company_id = self.require_company(bank_account_id).await?;
        let lock = self.company_lock(company_id);
        let _guard = lock.lock().await;

        let start_time = Instant::now();
        let transactions = self
            .store
            .unmatched_transactions(bank_account_id, request.date_range.as_ref())
            .await?;
        let entries = self
            .store
            .unmatched_entries(company_id, request.date_range.as_ref())
            .await?;

        tracing::info!(
            "账户 {} 开始自动对账: 未匹配流水 {} 条, 未匹配分录 {} 条, 日期容差 {} 天, 金额容差 {}",
            bank_account_id,
            transactions.len(),
            entries.len(),
            options.tolerance_days,
            options.amount_tolerance
        );

        let matcher = MultiPassMatcher::new(self.store.as_ref(), options);
        let matches = matcher.run(&transactions, &entries).await?;

        let summary = MatchSummary::from_matches(&matches);
        tracing::info!(
            "账户 {} 自动对账完成: 新增匹配 {} 条 (exact {}, date_amount {}, amount_range {}, fuzzy {}), 耗时: {:?}",
            bank_account_id,
            summary.total,
            summary.count(MatchMethod::Exact),
            summary.count(MatchMethod::DateAmount),
            summary.count(MatchMethod::AmountRange),
            summary.count(MatchMethod::Fuzzy),
            start_time.elapsed()
        );

        Ok(matches)
    }

    /// 人工匹配: 跳过四轮匹配, 置信度 100
    pub async fn create_manual_match(
        &self,
        transaction_id: i64,
        entry_id: i64,
        notes: Option<String>,
    ) -> ReconcileResult<Match> {
        let transaction = self.require_transaction(transaction_id).await?;
        let bank_account_id = transaction.bank_account_id.ok_or_else(|| {
            ReconcileError::NotFound(format!("bank account for bank transaction {}", transaction_id))
        })?;

        let company_id = self.require_company(bank_account_id).await?;

        let lock = self.company_lock(company_id);
        let _guard = lock.lock().await;

        // 加锁后重新读取状态
        let transaction = self.require_transaction(transaction_id).await?;
        let entry = self.require_entry(entry_id).await?;

        if entry.company_id != company_id {
            tracing::warn!(
                "拒绝人工匹配: 分录 {} 不属于账户 {} 所在公司",
                entry_id,
                bank_account_id
            );
            return Err(ReconcileError::Validation(format!(
                "accounting entry {} does not belong to the company of bank account {}",
                entry_id, bank_account_id
            )));
        }
        if transaction.status != RecordStatus::Pending || entry.status != RecordStatus::Pending {
            tracing::warn!(
                "拒绝人工匹配: 流水 {} ({}) / 分录 {} ({}) 已对账",
                transaction_id,
                transaction.status.as_str(),
                entry_id,
                entry.status.as_str()
            );
            return Err(ReconcileError::Validation(format!(
                "bank transaction {} and accounting entry {} must both be pending",
                transaction_id, entry_id
            )));
        }

        let created = writer::create_match(
            self.store.as_ref(),
            transaction_id,
            entry_id,
            MatchMethod::Manual,
            MAX_SCORE,
            notes,
        )
        .await?;

        tracing::info!(
            "人工匹配 {} 已创建: 流水 {} <-> 分录 {}",
            created.id,
            transaction_id,
            entry_id
        );
        Ok(created)
    }

    /// 撤销匹配, 两边记录恢复为 pending
    pub async fn undo_match(&self, match_id: i64) -> ReconcileResult<()> {
        let existing = self
            .store
            .find_match(match_id)
            .await?
            .ok_or_else(|| ReconcileError::NotFound(format!("match {}", match_id)))?;

        let _guard = match self.company_for_match(&existing).await? {
            Some(company_id) => Some(self.company_lock(company_id).lock_owned().await),
            None => {
                tracing::warn!("匹配 {} 无法确定所属公司, 不加锁撤销", match_id);
                None
            }
        };

        writer::delete_match(self.store.as_ref(), match_id).await?;
        tracing::info!("匹配 {} 已撤销", match_id);
        Ok(())
    }

    /// 评分预览 (默认金额容差)
    pub fn score_candidate(&self, transaction: &BankTransaction, entry: &AccountingEntry) -> i32 {
        ConfidenceScorer::new(self.defaults.amount_tolerance.clone()).score(transaction, entry)
    }

    /// 按 ID 读取两条记录后评分
    pub async fn preview_score(&self, transaction_id: i64, entry_id: i64) -> ReconcileResult<i32> {
        let transaction = self.require_transaction(transaction_id).await?;
        let entry = self.require_entry(entry_id).await?;
        Ok(self.score_candidate(&transaction, &entry))
    }

    pub async fn list_matches(&self, bank_account_id: i64) -> ReconcileResult<Vec<Match>> {
        Ok(self.store.list_matches(bank_account_id).await?)
    }

    async fn require_company(&self, bank_account_id: i64) -> ReconcileResult<i64> {
        self.store
            .company_for_account(bank_account_id)
            .await?
            .ok_or_else(|| ReconcileError::NotFound(format!("bank account {}", bank_account_id)))
    }

    /// 匹配所属公司: 先看匹配上的银行账户, 历史数据为空时退回流水的账户, 再退回分录的公司
    async fn company_for_match(&self, existing: &Match) -> ReconcileResult<Option<i64>> {
        let bank_account_id = match existing.bank_account_id {
            Some(id) => Some(id),
            None => self
                .store
                .transaction(existing.bank_transaction_id)
                .await?
                .and_then(|t| t.bank_account_id),
        };
        if let Some(id) = bank_account_id {
            if let Some(company_id) = self.store.company_for_account(id).await? {
                return Ok(Some(company_id));
            }
        }
        Ok(self
            .store
            .entry(existing.accounting_entry_id)
            .await?
            .map(|e| e.company_id))
    }

    async fn require_transaction(&self, id: i64) -> ReconcileResult<BankTransaction> {
        self.store
            .transaction(id)
            .await?
            .ok_or_else(|| ReconcileError::NotFound(format!("bank transaction {}", id)))
    }

    async fn require_entry(&self, id: i64) -> ReconcileResult<AccountingEntry> {
        self.store
            .entry(id)
            .await?
            .ok_or_else(|| ReconcileError::NotFound(format!("accounting entry {}", id)))
    }
}
