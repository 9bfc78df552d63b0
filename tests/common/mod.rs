//! 集成测试公共工具

use bank_recon_rust::models::{AccountingEntry, BankTransaction, Direction, DocumentType, RecordStatus};
use bank_recon_rust::service::MatchOptions;
use bank_recon_rust::{MemoryStore, ReconcileService};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;
use std::sync::{Arc, Once};

pub const ACCOUNT: i64 = 1;
pub const COMPANY: i64 = 100;

static INIT: Once = Once::new();

/// 初始化测试日志 (只执行一次)
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,bank_recon_rust=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn tx(id: i64, amount: &str, on: &str, description: &str, reference: Option<&str>) -> BankTransaction {
    BankTransaction {
        id,
        bank_account_id: Some(ACCOUNT),
        amount: dec(amount),
        date: date(on),
        description: description.to_string(),
        reference: reference.map(str::to_string),
        status: RecordStatus::Pending,
    }
}

pub fn entry(id: i64, amount: &str, on: &str, description: &str, reference: Option<&str>) -> AccountingEntry {
    AccountingEntry {
        id,
        company_id: COMPANY,
        amount: dec(amount),
        date: date(on),
        description: description.to_string(),
        reference: reference.map(str::to_string),
        document_type: DocumentType::Invoice,
        direction: Direction::Received,
        status: RecordStatus::Pending,
    }
}

/// 建好一个账户 (ACCOUNT -> COMPANY) 的内存存储
pub fn store_with(transactions: Vec<BankTransaction>, entries: Vec<AccountingEntry>) -> Arc<MemoryStore> {
    init_tracing();
    let store = MemoryStore::new();
    store.add_account(ACCOUNT, COMPANY);
    for t in transactions {
        store.add_transaction(t);
    }
    for e in entries {
        store.add_entry(e);
    }
    Arc::new(store)
}

pub fn service(store: &Arc<MemoryStore>) -> ReconcileService<MemoryStore> {
    ReconcileService::new(store.clone(), MatchOptions::default())
}
