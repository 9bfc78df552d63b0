pub mod common;
pub mod entry;
pub mod match_record;
pub mod transaction;

pub use common::{range_bounds, DateRange, RecordStatus, TagParseError};
pub use entry::{AccountingEntry, Direction, DocumentType};
pub use match_record::{Match, MatchMethod, MatchSummary, NewMatch};
pub use transaction::BankTransaction;
