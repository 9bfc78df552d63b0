use async_trait::async_trait;

use crate::models::{AccountingEntry, BankTransaction, DateRange, Match, NewMatch};

/// 记录存储抽象
///
/// 对账引擎只通过这些操作访问两本账和匹配表, 生产环境为 PostgreSQL,
/// 测试使用内存实现。
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// 银行账户所属公司
    async fn company_for_account(&self, bank_account_id: i64) -> Result<Option<i64>, sqlx::Error>;

    /// 账户下状态为 pending 的银行流水 (按日期、ID 稳定排序)
    async fn unmatched_transactions(
        &self,
        bank_account_id: i64,
        range: Option<&DateRange>,
    ) -> Result<Vec<BankTransaction>, sqlx::Error>;

    /// 公司下状态为 pending 的会计分录
    async fn unmatched_entries(
        &self,
        company_id: i64,
        range: Option<&DateRange>,
    ) -> Result<Vec<AccountingEntry>, sqlx::Error>;

    async fn transaction(&self, id: i64) -> Result<Option<BankTransaction>, sqlx::Error>;

    async fn entry(&self, id: i64) -> Result<Option<AccountingEntry>, sqlx::Error>;

    async fn find_match(&self, id: i64) -> Result<Option<Match>, sqlx::Error>;

    /// 写入匹配并把两条记录置为 reconciled, 三步在同一事务内完成。
    /// 任一记录不是 pending 时整体失败。
    async fn insert_match(&self, new_match: &NewMatch) -> Result<Match, sqlx::Error>;

    /// 删除匹配并把两条记录恢复为 pending, 同一事务
    async fn remove_match(&self, existing: &Match) -> Result<(), sqlx::Error>;

    /// 账户下的现有匹配, 按创建顺序
    async fn list_matches(&self, bank_account_id: i64) -> Result<Vec<Match>, sqlx::Error>;
}
