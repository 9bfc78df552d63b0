use crate::db::LedgerStore;
use crate::error::{ReconcileError, ReconcileResult};
use crate::models::{Match, MatchMethod, NewMatch};

/// 写入一条匹配
///
/// 先查流水所属银行账户 (流水、分录不存在或流水缺少账户时报 NotFound),
/// 再由存储层在同一事务内写入匹配并把两边状态置为 reconciled。
pub async fn create_match<S: LedgerStore + ?Sized>(
    store: &S,
    transaction_id: i64,
    entry_id: i64,
    method: MatchMethod,
    confidence: i32,
    notes: Option<String>,
) -> ReconcileResult<Match> {
    let transaction = store
        .transaction(transaction_id)
        .await?
        .ok_or_else(|| ReconcileError::NotFound(format!("bank transaction {}", transaction_id)))?;

    let bank_account_id = transaction.bank_account_id.ok_or_else(|| {
        ReconcileError::NotFound(format!(
            "bank account for bank transaction {}",
            transaction_id
        ))
    })?;

    if store.entry(entry_id).await?.is_none() {
        return Err(ReconcileError::NotFound(format!("accounting entry {}", entry_id)));
    }

    let new_match = NewMatch {
        bank_transaction_id: transaction_id,
        accounting_entry_id: entry_id,
        bank_account_id,
        match_type: method,
        confidence,
        notes,
    };

    let created = store.insert_match(&new_match).await?;
    tracing::debug!(
        "匹配 {} 已写入: 流水 {} <-> 分录 {} ({}, {})",
        created.id,
        transaction_id,
        entry_id,
        method.as_str(),
        confidence
    );
    Ok(created)
}

/// 撤销匹配; 失败时匹配记录保持不变
pub async fn delete_match<S: LedgerStore + ?Sized>(store: &S, match_id: i64) -> ReconcileResult<Match> {
    let existing = store
        .find_match(match_id)
        .await?
        .ok_or_else(|| ReconcileError::NotFound(format!("match {}", match_id)))?;

    store.remove_match(&existing).await?;
    tracing::debug!(
        "匹配 {} 已撤销: 流水 {} / 分录 {} 恢复为 pending",
        match_id,
        existing.bank_transaction_id,
        existing.accounting_entry_id
    );
    Ok(existing)
}
