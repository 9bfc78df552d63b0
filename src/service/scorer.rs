//! 置信度评分
//!
//! 先做金额容差闸门, 通过后再按符号、金额、日期、摘要/参考号四项累加,
//! 最终截断到 [0, 100]。

use bigdecimal::{BigDecimal, Zero};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::{AccountingEntry, BankTransaction};
use crate::service::normalize::{day_difference, percent, relative_difference, same_sign};

pub const MAX_SCORE: i32 = 100;

/// 第四轮 (模糊匹配) 接受的最低分
pub const FUZZY_MIN_SCORE: i32 = 70;

const SIGN_MATCH: i32 = 20;
const SIGN_MISMATCH: i32 = -40;

/// (相对差上限 %, 加分)
const AMOUNT_TIERS: [(i64, i32); 5] = [(1, 45), (3, 40), (5, 35), (10, 25), (20, 15)];
const AMOUNT_EXACT: i32 = 50;

/// (天数上限, 加分), 超出后统一 +5
const DATE_TIERS: [(i64, i32); 5] = [(0, 30), (3, 25), (7, 20), (14, 15), (30, 10)];
const DATE_FALLBACK: i32 = 5;

const REFERENCE_EQUAL: i32 = 20;
const REFERENCE_CONTAINED: i32 = 15;
const SHARED_NUMBER: i32 = 10;
const SHARED_KEYWORD: i32 = 5;

/// 业务关键词 (英文 + 西班牙文)
const KEYWORDS: [&str; 14] = [
    "invoice",
    "payment",
    "transfer",
    "deposit",
    "charge",
    "purchase",
    "sale",
    "factura",
    "pago",
    "transferencia",
    "deposito",
    "cargo",
    "compra",
    "venta",
];

static NUMERIC_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4,}").expect("numeric token pattern is valid"));

/// 置信度评分器, 无副作用
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    amount_tolerance: BigDecimal,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(percent(1))
    }
}

impl ConfidenceScorer {
    pub fn new(amount_tolerance: BigDecimal) -> Self {
        Self { amount_tolerance }
    }

    pub fn amount_tolerance(&self) -> &BigDecimal {
        &self.amount_tolerance
    }

    /// 相对差是否在容差内 (第四轮候选过滤与评分闸门共用)
    pub fn within_tolerance(&self, relative_diff: &BigDecimal) -> bool {
        relative_diff <= &self.amount_tolerance
    }

    /// 返回 0..=100; 金额差超出容差直接返回 0
    pub fn score(&self, transaction: &BankTransaction, entry: &AccountingEntry) -> i32 {
        let mut total = if same_sign(&transaction.amount, &entry.amount) {
            SIGN_MATCH
        } else {
            SIGN_MISMATCH
        };

        let relative_diff = relative_difference(&transaction.amount, &entry.amount);
        if !self.within_tolerance(&relative_diff) {
            return 0;
        }

        total += amount_points(&relative_diff);
        total += date_points(day_difference(transaction.date, entry.date));
        total += text_points(transaction, entry);

        total.clamp(0, MAX_SCORE)
    }
}

fn amount_points(relative_diff: &BigDecimal) -> i32 {
    if relative_diff.is_zero() {
        return AMOUNT_EXACT;
    }
    AMOUNT_TIERS
        .iter()
        .find(|(limit, _)| *relative_diff <= percent(*limit))
        .map_or(0, |(_, points)| *points)
}

fn date_points(days: i64) -> i32 {
    DATE_TIERS
        .iter()
        .find(|(limit, _)| days <= *limit)
        .map_or(DATE_FALLBACK, |(_, points)| *points)
}

/// 摘要/参考号相似度, 命中第一条规则即返回
fn text_points(transaction: &BankTransaction, entry: &AccountingEntry) -> i32 {
    let tx_ref = transaction.trimmed_reference().map(str::to_lowercase);
    let entry_ref = entry.trimmed_reference().map(str::to_lowercase);
    let tx_desc = transaction.description.to_lowercase();
    let entry_desc = entry.description.to_lowercase();

    if let (Some(a), Some(b)) = (&tx_ref, &entry_ref) {
        if a == b {
            return REFERENCE_EQUAL;
        }
    }

    let refs_overlap = matches!(
        (&tx_ref, &entry_ref),
        (Some(a), Some(b)) if a.contains(b.as_str()) || b.contains(a.as_str())
    );
    let ref_in_description = tx_ref.as_deref().map_or(false, |r| entry_desc.contains(r))
        || entry_ref.as_deref().map_or(false, |r| tx_desc.contains(r));
    if refs_overlap || ref_in_description {
        return REFERENCE_CONTAINED;
    }

    let tx_text = combined_text(&tx_desc, tx_ref.as_deref());
    let entry_text = combined_text(&entry_desc, entry_ref.as_deref());

    let tx_numbers = numeric_tokens(&tx_text);
    if numeric_tokens(&entry_text).iter().any(|n| tx_numbers.contains(n)) {
        return SHARED_NUMBER;
    }

    if KEYWORDS
        .iter()
        .any(|k| tx_text.contains(k) && entry_text.contains(k))
    {
        return SHARED_KEYWORD;
    }

    0
}

fn combined_text(description: &str, reference: Option<&str>) -> String {
    match reference {
        Some(r) => format!("{} {}", description, r),
        None => description.to_string(),
    }
}

fn numeric_tokens(text: &str) -> HashSet<&str> {
    NUMERIC_TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}
