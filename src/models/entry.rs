use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{RecordStatus, TagParseError};

/// 单据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    CreditNote,
    DebitNote,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::CreditNote => "credit_note",
            DocumentType::DebitNote => "debit_note",
            DocumentType::Other => "other",
        }
    }
}

impl TryFrom<String> for DocumentType {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "invoice" => Ok(DocumentType::Invoice),
            "credit_note" => Ok(DocumentType::CreditNote),
            "debit_note" => Ok(DocumentType::DebitNote),
            "other" => Ok(DocumentType::Other),
            _ => Err(TagParseError { kind: "document_type", value }),
        }
    }
}

/// 开具方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Issued,
    Received,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Issued => "issued",
            Direction::Received => "received",
        }
    }
}

impl TryFrom<String> for Direction {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "issued" => Ok(Direction::Issued),
            "received" => Ok(Direction::Received),
            _ => Err(TagParseError { kind: "direction", value }),
        }
    }
}

/// 会计分录 (accounting_entries)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccountingEntry {
    pub id: i64,
    pub company_id: i64,
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    #[sqlx(try_from = "String")]
    pub document_type: DocumentType,
    #[sqlx(try_from = "String")]
    pub direction: Direction,
    #[sqlx(try_from = "String")]
    pub status: RecordStatus,
}

impl AccountingEntry {
    pub fn trimmed_reference(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}
