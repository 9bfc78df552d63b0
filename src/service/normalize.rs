use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use std::str::FromStr;

/// p% 的十进制表示, 例如 percent(1) == 0.01
pub fn percent(p: i64) -> BigDecimal {
    BigDecimal::from(p) / BigDecimal::from(100)
}

/// 相对金额差 |(|tx| - |entry|) / |tx||, 流水金额为 0 时分母按 1 处理
pub fn relative_difference(tx_amount: &BigDecimal, entry_amount: &BigDecimal) -> BigDecimal {
    let tx_abs = tx_amount.abs();
    let diff = (&tx_abs - entry_amount.abs()).abs();
    let denominator = if tx_abs.is_zero() { BigDecimal::from(1) } else { tx_abs };
    diff / denominator
}

/// 两个自然日之间相差的天数 (绝对值)
pub fn day_difference(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

/// 同为正数或同为负数; 0 与任何数都不算同号
pub fn same_sign(a: &BigDecimal, b: &BigDecimal) -> bool {
    let zero = BigDecimal::zero();
    (a > &zero && b > &zero) || (a < &zero && b < &zero)
}

pub fn abs_equal(a: &BigDecimal, b: &BigDecimal) -> bool {
    a.abs() == b.abs()
}

/// 浮点容差转十进制, 取最短十进制表示 (0.01 -> 0.01)
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}
