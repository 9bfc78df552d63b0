use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 标签字段解析失败 (数据库中出现未知取值)
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct TagParseError {
    pub kind: &'static str,
    pub value: String,
}

/// 对账状态 (银行流水与会计分录共用)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Reconciled,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Reconciled => "reconciled",
        }
    }
}

impl TryFrom<String> for RecordStatus {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(RecordStatus::Pending),
            "reconciled" => Ok(RecordStatus::Reconciled),
            _ => Err(TagParseError { kind: "status", value }),
        }
    }
}

/// 日期窗口 (闭区间, 按自然日)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// 把可选窗口拆成 SQL 参数
pub fn range_bounds(range: Option<&DateRange>) -> (Option<NaiveDate>, Option<NaiveDate>) {
    match range {
        Some(r) => (Some(r.start), Some(r.end)),
        None => (None, None),
    }
}
