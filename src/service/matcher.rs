use bigdecimal::BigDecimal;
use indexmap::IndexSet;

use crate::db::LedgerStore;
use crate::error::ReconcileResult;
use crate::models::{AccountingEntry, BankTransaction, Match, MatchMethod};
use crate::service::normalize::{abs_equal, day_difference, percent, relative_difference};
use crate::service::scorer::{ConfidenceScorer, FUZZY_MIN_SCORE};
use crate::service::writer;

pub const EXACT_REFERENCE_CONFIDENCE: i32 = 100;
pub const DATE_AMOUNT_CONFIDENCE: i32 = 95;
pub const AMOUNT_RANGE_CONFIDENCE: i32 = 85;

/// 单次运行的容差参数
#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub tolerance_days: i64,
    pub amount_tolerance: BigDecimal,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            tolerance_days: 7,
            amount_tolerance: percent(1),
        }
    }
}

/// 单次运行内已匹配的流水/分录, 不跨运行共享
#[derive(Debug, Default)]
pub struct RunState {
    matched_transactions: IndexSet<i64>,
    matched_entries: IndexSet<i64>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_transaction_matched(&self, id: i64) -> bool {
        self.matched_transactions.contains(&id)
    }

    pub fn is_entry_matched(&self, id: i64) -> bool {
        self.matched_entries.contains(&id)
    }

    pub fn mark(&mut self, transaction_id: i64, entry_id: i64) {
        self.matched_transactions.insert(transaction_id);
        self.matched_entries.insert(entry_id);
    }

    pub fn matched_count(&self) -> usize {
        self.matched_transactions.len()
    }
}

/// 匹配轮次, 严格按声明顺序执行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    ExactReference,
    DateAmount,
    AmountRange,
    Fuzzy,
}

pub const PASSES: [Pass; 4] = [
    Pass::ExactReference,
    Pass::DateAmount,
    Pass::AmountRange,
    Pass::Fuzzy,
];

impl Pass {
    pub fn method(&self) -> MatchMethod {
        match self {
            Pass::ExactReference => MatchMethod::Exact,
            Pass::DateAmount => MatchMethod::DateAmount,
            Pass::AmountRange => MatchMethod::AmountRange,
            Pass::Fuzzy => MatchMethod::Fuzzy,
        }
    }

    /// 为一条流水挑选分录, 返回 (分录, 置信度)
    pub fn select<'a>(
        &self,
        transaction: &BankTransaction,
        entries: &'a [AccountingEntry],
        state: &RunState,
        options: &MatchOptions,
        scorer: &ConfidenceScorer,
    ) -> Option<(&'a AccountingEntry, i32)> {
        match self {
            Pass::ExactReference => select_exact_reference(transaction, entries, state)
                .map(|e| (e, EXACT_REFERENCE_CONFIDENCE)),
            Pass::DateAmount => select_date_amount(transaction, entries, state)
                .map(|e| (e, DATE_AMOUNT_CONFIDENCE)),
            Pass::AmountRange => {
                select_amount_range(transaction, entries, state, options.tolerance_days)
                    .map(|e| (e, AMOUNT_RANGE_CONFIDENCE))
            }
            Pass::Fuzzy => select_fuzzy(transaction, entries, state, scorer),
        }
    }
}

/// 第一轮: 参考号完全相同, 或分录参考号出现在流水摘要中; 取第一个
pub fn select_exact_reference<'a>(
    transaction: &BankTransaction,
    entries: &'a [AccountingEntry],
    state: &RunState,
) -> Option<&'a AccountingEntry> {
    let tx_ref = transaction.trimmed_reference();
    entries
        .iter()
        .filter(|e| !state.is_entry_matched(e.id))
        .find(|e| match e.trimmed_reference() {
            Some(entry_ref) => {
                tx_ref == Some(entry_ref) || transaction.description.contains(entry_ref)
            }
            None => false,
        })
}

/// 第二轮: 金额绝对值相等且同一天; 取第一个
pub fn select_date_amount<'a>(
    transaction: &BankTransaction,
    entries: &'a [AccountingEntry],
    state: &RunState,
) -> Option<&'a AccountingEntry> {
    entries
        .iter()
        .filter(|e| !state.is_entry_matched(e.id))
        .find(|e| abs_equal(&transaction.amount, &e.amount) && transaction.date == e.date)
}

/// 第三轮: 金额绝对值相等且日期差在容差内, 取日期最近者 (并列取先出现的)
pub fn select_amount_range<'a>(
    transaction: &BankTransaction,
    entries: &'a [AccountingEntry],
    state: &RunState,
    tolerance_days: i64,
) -> Option<&'a AccountingEntry> {
    let mut best: Option<(&AccountingEntry, i64)> = None;
    for e in entries.iter().filter(|e| !state.is_entry_matched(e.id)) {
        if !abs_equal(&transaction.amount, &e.amount) {
            continue;
        }
        let days = day_difference(transaction.date, e.date);
        if days > tolerance_days {
            continue;
        }
        if best.map_or(true, |(_, best_days)| days < best_days) {
            best = Some((e, days));
        }
    }
    best.map(|(e, _)| e)
}

/// 第四轮: 金额在容差内的候选逐一评分, 取不低于 70 分的最高分 (并列取先出现的)
pub fn select_fuzzy<'a>(
    transaction: &BankTransaction,
    entries: &'a [AccountingEntry],
    state: &RunState,
    scorer: &ConfidenceScorer,
) -> Option<(&'a AccountingEntry, i32)> {
    let mut best: Option<(&AccountingEntry, i32)> = None;
    for e in entries.iter().filter(|e| !state.is_entry_matched(e.id)) {
        let relative_diff = relative_difference(&transaction.amount, &e.amount);
        if !scorer.within_tolerance(&relative_diff) {
            continue;
        }
        let score = scorer.score(transaction, e);
        if score < FUZZY_MIN_SCORE {
            continue;
        }
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((e, score));
        }
    }
    best
}

/// 多轮贪心匹配
///
/// 每条流水在每一轮中只取本轮的候选, 一旦选中立即写库, 后续轮次不再考虑。
/// 这是按流水、按轮次优先级的贪心过程, 而非全局最优分配。
pub struct MultiPassMatcher<'a, S: LedgerStore + ?Sized> {
    store: &'a S,
    options: MatchOptions,
    scorer: ConfidenceScorer,
}

impl<'a, S: LedgerStore + ?Sized> MultiPassMatcher<'a, S> {
    pub fn new(store: &'a S, options: MatchOptions) -> Self {
        let scorer = ConfidenceScorer::new(options.amount_tolerance.clone());
        Self {
            store,
            options,
            scorer,
        }
    }

    /// 依次执行四轮; 任一写入失败即中止, 已写入的匹配保留
    pub async fn run(
        &self,
        transactions: &[BankTransaction],
        entries: &[AccountingEntry],
    ) -> ReconcileResult<Vec<Match>> {
        let mut state = RunState::new();
        let mut created: Vec<Match> = Vec::new();

        for pass in PASSES {
            let before = created.len();

            for tx in transactions {
                if state.is_transaction_matched(tx.id) {
                    continue;
                }
                let Some((entry, confidence)) =
                    pass.select(tx, entries, &state, &self.options, &self.scorer)
                else {
                    continue;
                };

                let method = pass.method();
                tracing::debug!(
                    "{:?}: 流水 {} -> 分录 {}, 置信度 {}",
                    pass, tx.id, entry.id, confidence
                );

                let m = match writer::create_match(
                    self.store,
                    tx.id,
                    entry.id,
                    method,
                    confidence,
                    Some(method.note().to_string()),
                )
                .await
                {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::error!(
                            "写入匹配失败 (流水 {} / 分录 {}), 中止本次运行, 已写入 {} 条: {}",
                            tx.id,
                            entry.id,
                            created.len(),
                            e
                        );
                        return Err(e);
                    }
                };

                state.mark(tx.id, entry.id);
                created.push(m);
            }

            tracing::info!(
                "{:?} 完成: 新增 {} 条, 累计 {}/{}",
                pass,
                created.len() - before,
                state.matched_count(),
                transactions.len()
            );
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, DocumentType, RecordStatus};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn tx(id: i64, amount: &str, date: &str, description: &str, reference: Option<&str>) -> BankTransaction {
        BankTransaction {
            id,
            bank_account_id: Some(1),
            amount: BigDecimal::from_str(amount).unwrap(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: description.to_string(),
            reference: reference.map(str::to_string),
            status: RecordStatus::Pending,
        }
    }

    fn entry(id: i64, amount: &str, date: &str, reference: Option<&str>) -> AccountingEntry {
        AccountingEntry {
            id,
            company_id: 1,
            amount: BigDecimal::from_str(amount).unwrap(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: String::new(),
            reference: reference.map(str::to_string),
            document_type: DocumentType::Invoice,
            direction: Direction::Received,
            status: RecordStatus::Pending,
        }
    }

    #[test]
    fn exact_reference_takes_first_candidate() {
        let t = tx(1, "-100", "2024-03-10", "", Some(" F1023 "));
        let entries = vec![
            entry(10, "-999", "2024-01-01", Some("F1023")),
            entry(11, "-100", "2024-03-10", Some("F1023")),
        ];
        let found = select_exact_reference(&t, &entries, &RunState::new());
        assert_eq!(found.map(|e| e.id), Some(10));
    }

    #[test]
    fn exact_reference_in_description() {
        let t = tx(1, "-100", "2024-03-10", "SEPA transfer F1023 acme", None);
        let entries = vec![
            entry(10, "-100", "2024-03-10", None),
            entry(11, "-100", "2024-03-10", Some("  ")),
            entry(12, "-100", "2024-03-10", Some("F1023")),
        ];
        let found = select_exact_reference(&t, &entries, &RunState::new());
        assert_eq!(found.map(|e| e.id), Some(12));
    }

    #[test]
    fn excluded_entries_are_skipped() {
        let t = tx(1, "50", "2024-03-01", "", None);
        let entries = vec![
            entry(10, "50", "2024-03-01", None),
            entry(11, "-50", "2024-03-01", None),
        ];
        let mut state = RunState::new();
        state.mark(99, 10);
        let found = select_date_amount(&t, &entries, &state);
        assert_eq!(found.map(|e| e.id), Some(11));
    }

    #[test]
    fn amount_range_picks_closest_date() {
        let t = tx(1, "5000", "2024-03-01", "", None);
        let entries = vec![
            entry(10, "5000", "2024-03-06", None),
            entry(11, "5000", "2024-02-28", None),
            entry(12, "5000", "2024-03-03", None),
            entry(13, "5000", "2024-03-20", None),
        ];
        let found = select_amount_range(&t, &entries, &RunState::new(), 7);
        assert_eq!(found.map(|e| e.id), Some(11));
    }

    #[test]
    fn amount_range_respects_tolerance() {
        let t = tx(1, "5000", "2024-03-01", "", None);
        let entries = vec![entry(10, "5000", "2024-03-09", None)];
        assert!(select_amount_range(&t, &entries, &RunState::new(), 7).is_none());
        assert!(select_amount_range(&t, &entries, &RunState::new(), 8).is_some());
    }

    #[test]
    fn fuzzy_requires_minimum_score() {
        let scorer = ConfidenceScorer::default();
        let t = tx(1, "1000", "2024-03-01", "", None);
        // 20 + 45 + 5 = 70, 刚好达标
        let entries = vec![entry(10, "995", "2024-05-01", None)];
        let found = select_fuzzy(&t, &entries, &RunState::new(), &scorer);
        assert_eq!(found.map(|(e, s)| (e.id, s)), Some((10, 70)));

        // 反向金额: -40 + 45 + 30 = 35
        let entries = vec![entry(10, "-995", "2024-03-01", None)];
        assert!(select_fuzzy(&t, &entries, &RunState::new(), &scorer).is_none());
    }

    #[test]
    fn fuzzy_keeps_first_of_equal_scores() {
        let scorer = ConfidenceScorer::default();
        let t = tx(1, "1000", "2024-03-10", "", None);
        let entries = vec![
            entry(10, "995", "2024-03-12", None),
            entry(11, "1005", "2024-03-08", None),
            entry(12, "1300", "2024-03-10", None),
        ];
        let found = select_fuzzy(&t, &entries, &RunState::new(), &scorer);
        assert_eq!(found.map(|(e, s)| (e.id, s)), Some((10, 90)));
    }
}
