use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::RecordStatus;

/// 银行流水 (bank_transactions)
///
/// 金额带符号: 正数为入账, 负数为出账。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: i64,
    pub bank_account_id: Option<i64>, // 历史数据可能缺失
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: RecordStatus,
}

impl BankTransaction {
    /// 去除空白后的参考号, 空串视为无
    pub fn trimmed_reference(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}
