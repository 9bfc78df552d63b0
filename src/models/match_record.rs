use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

use super::TagParseError;

/// 匹配方式: 自动匹配的四轮 + 人工匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    DateAmount,
    AmountRange,
    Fuzzy,
    Manual,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Exact => "exact",
            MatchMethod::DateAmount => "date_amount",
            MatchMethod::AmountRange => "amount_range",
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::Manual => "manual",
        }
    }

    /// 写入 notes 的说明文字
    pub fn note(&self) -> &'static str {
        match self {
            MatchMethod::Exact => "auto: exact reference",
            MatchMethod::DateAmount => "auto: exact date and amount",
            MatchMethod::AmountRange => "auto: amount within date tolerance",
            MatchMethod::Fuzzy => "auto: fuzzy score",
            MatchMethod::Manual => "manual",
        }
    }
}

impl TryFrom<String> for MatchMethod {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "exact" => Ok(MatchMethod::Exact),
            "date_amount" => Ok(MatchMethod::DateAmount),
            "amount_range" => Ok(MatchMethod::AmountRange),
            "fuzzy" => Ok(MatchMethod::Fuzzy),
            "manual" => Ok(MatchMethod::Manual),
            _ => Err(TagParseError { kind: "match_type", value }),
        }
    }
}

/// 对账匹配记录 (reconciliation_matches)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub bank_transaction_id: i64,
    pub accounting_entry_id: i64,
    pub bank_account_id: Option<i64>, // 历史匹配回填失败时为空
    #[sqlx(try_from = "String")]
    pub match_type: MatchMethod,
    pub confidence: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 待写入的匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub bank_transaction_id: i64,
    pub accounting_entry_id: i64,
    pub bank_account_id: i64,
    pub match_type: MatchMethod,
    pub confidence: i32,
    pub notes: Option<String>,
}

/// 匹配统计信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub total: usize,
    pub by_method: BTreeMap<MatchMethod, usize>,
    pub average_confidence: f64,
}

impl MatchSummary {
    pub fn from_matches(matches: &[Match]) -> Self {
        let mut by_method = BTreeMap::new();
        let mut confidence_sum = 0i64;
        for m in matches {
            *by_method.entry(m.match_type).or_insert(0) += 1;
            confidence_sum += i64::from(m.confidence);
        }

        let average_confidence = if matches.is_empty() {
            0.0
        } else {
            confidence_sum as f64 / matches.len() as f64
        };

        Self {
            total: matches.len(),
            by_method,
            average_confidence,
        }
    }

    pub fn count(&self, method: MatchMethod) -> usize {
        self.by_method.get(&method).copied().unwrap_or(0)
    }
}
