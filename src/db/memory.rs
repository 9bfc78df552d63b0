//! 内存记录存储, 用于测试和本地开发

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::db::LedgerStore;
use crate::models::{
    AccountingEntry, BankTransaction, DateRange, Match, NewMatch, RecordStatus,
};

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<i64, i64>, // 银行账户 -> 公司
    transactions: IndexMap<i64, BankTransaction>,
    entries: IndexMap<i64, AccountingEntry>,
    matches: IndexMap<i64, Match>,
    next_match_id: i64,
    inserts: usize,
    fail_insert_at: Option<usize>,
    fail_next_remove: bool,
}

/// 内存实现, 与 PostgreSQL 实现保持相同的唯一性与状态检查
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

fn in_range(date: chrono::NaiveDate, range: Option<&DateRange>) -> bool {
    range.map_or(true, |r| r.contains(date))
}

fn injected(message: String) -> sqlx::Error {
    sqlx::Error::Protocol(message)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, sqlx::Error> {
        self.inner
            .read()
            .map_err(|_| injected("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, sqlx::Error> {
        self.inner
            .write()
            .map_err(|_| injected("memory store lock poisoned".to_string()))
    }

    /// 登记银行账户及其所属公司
    pub fn add_account(&self, bank_account_id: i64, company_id: i64) {
        if let Ok(mut inner) = self.write() {
            inner.accounts.insert(bank_account_id, company_id);
        }
    }

    pub fn add_transaction(&self, transaction: BankTransaction) {
        if let Ok(mut inner) = self.write() {
            inner.transactions.insert(transaction.id, transaction);
        }
    }

    pub fn add_entry(&self, entry: AccountingEntry) {
        if let Ok(mut inner) = self.write() {
            inner.entries.insert(entry.id, entry);
        }
    }

    /// 导入已有匹配 (如迁移前的历史数据), 两边记录置为 reconciled
    pub fn add_match(&self, existing: Match) {
        if let Ok(mut inner) = self.write() {
            inner.next_match_id = inner.next_match_id.max(existing.id);
            if let Some(t) = inner.transactions.get_mut(&existing.bank_transaction_id) {
                t.status = RecordStatus::Reconciled;
            }
            if let Some(e) = inner.entries.get_mut(&existing.accounting_entry_id) {
                e.status = RecordStatus::Reconciled;
            }
            inner.matches.insert(existing.id, existing);
        }
    }

    /// 第 n 次 (从 0 计) insert_match 调用失败
    pub fn fail_insert_at(&self, n: usize) {
        if let Ok(mut inner) = self.write() {
            inner.fail_insert_at = Some(n);
        }
    }

    /// 下一次 remove_match 调用失败
    pub fn fail_next_remove(&self) {
        if let Ok(mut inner) = self.write() {
            inner.fail_next_remove = true;
        }
    }

    pub fn transaction_status(&self, id: i64) -> Option<RecordStatus> {
        self.read().ok()?.transactions.get(&id).map(|t| t.status)
    }

    pub fn entry_status(&self, id: i64) -> Option<RecordStatus> {
        self.read().ok()?.entries.get(&id).map(|e| e.status)
    }

    pub fn match_count(&self) -> usize {
        self.read().map(|inner| inner.matches.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn company_for_account(&self, bank_account_id: i64) -> Result<Option<i64>, sqlx::Error> {
        Ok(self.read()?.accounts.get(&bank_account_id).copied())
    }

    async fn unmatched_transactions(
        &self,
        bank_account_id: i64,
        range: Option<&DateRange>,
    ) -> Result<Vec<BankTransaction>, sqlx::Error> {
        let inner = self.read()?;
        let mut found: Vec<BankTransaction> = inner
            .transactions
            .values()
            .filter(|t| t.bank_account_id == Some(bank_account_id))
            .filter(|t| t.status == RecordStatus::Pending && in_range(t.date, range))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn unmatched_entries(
        &self,
        company_id: i64,
        range: Option<&DateRange>,
    ) -> Result<Vec<AccountingEntry>, sqlx::Error> {
        let inner = self.read()?;
        let mut found: Vec<AccountingEntry> = inner
            .entries
            .values()
            .filter(|e| e.company_id == company_id)
            .filter(|e| e.status == RecordStatus::Pending && in_range(e.date, range))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn transaction(&self, id: i64) -> Result<Option<BankTransaction>, sqlx::Error> {
        Ok(self.read()?.transactions.get(&id).cloned())
    }

    async fn entry(&self, id: i64) -> Result<Option<AccountingEntry>, sqlx::Error> {
        Ok(self.read()?.entries.get(&id).cloned())
    }

    async fn find_match(&self, id: i64) -> Result<Option<Match>, sqlx::Error> {
        Ok(self.read()?.matches.get(&id).cloned())
    }

    async fn insert_match(&self, new_match: &NewMatch) -> Result<Match, sqlx::Error> {
        let mut inner = self.write()?;

        let attempt = inner.inserts;
        inner.inserts += 1;
        if inner.fail_insert_at == Some(attempt) {
            return Err(injected(format!("injected failure on insert #{}", attempt)));
        }

        // 唯一约束: 一条记录最多参与一个匹配
        let duplicate = inner.matches.values().any(|m| {
            m.bank_transaction_id == new_match.bank_transaction_id
                || m.accounting_entry_id == new_match.accounting_entry_id
        });
        if duplicate {
            return Err(injected(format!(
                "duplicate active match for transaction {} / entry {}",
                new_match.bank_transaction_id, new_match.accounting_entry_id
            )));
        }

        let tx_pending = inner
            .transactions
            .get(&new_match.bank_transaction_id)
            .map_or(false, |t| t.status == RecordStatus::Pending);
        let entry_pending = inner
            .entries
            .get(&new_match.accounting_entry_id)
            .map_or(false, |e| e.status == RecordStatus::Pending);
        if !tx_pending || !entry_pending {
            return Err(sqlx::Error::RowNotFound);
        }

        inner.next_match_id += 1;
        let created = Match {
            id: inner.next_match_id,
            bank_transaction_id: new_match.bank_transaction_id,
            accounting_entry_id: new_match.accounting_entry_id,
            bank_account_id: Some(new_match.bank_account_id),
            match_type: new_match.match_type,
            confidence: new_match.confidence,
            notes: new_match.notes.clone(),
            created_at: Utc::now(),
        };
        inner.matches.insert(created.id, created.clone());

        if let Some(t) = inner.transactions.get_mut(&new_match.bank_transaction_id) {
            t.status = RecordStatus::Reconciled;
        }
        if let Some(e) = inner.entries.get_mut(&new_match.accounting_entry_id) {
            e.status = RecordStatus::Reconciled;
        }

        Ok(created)
    }

    async fn remove_match(&self, existing: &Match) -> Result<(), sqlx::Error> {
        let mut inner = self.write()?;

        if inner.fail_next_remove {
            inner.fail_next_remove = false;
            return Err(injected(format!("injected failure removing match {}", existing.id)));
        }

        if inner.matches.shift_remove(&existing.id).is_none() {
            return Err(sqlx::Error::RowNotFound);
        }
        if let Some(t) = inner.transactions.get_mut(&existing.bank_transaction_id) {
            t.status = RecordStatus::Pending;
        }
        if let Some(e) = inner.entries.get_mut(&existing.accounting_entry_id) {
            e.status = RecordStatus::Pending;
        }

        Ok(())
    }

    async fn list_matches(&self, bank_account_id: i64) -> Result<Vec<Match>, sqlx::Error> {
        Ok(self
            .read()?
            .matches
            .values()
            .filter(|m| m.bank_account_id == Some(bank_account_id))
            .cloned()
            .collect())
    }
}
