use crate::models::Match;
use std::io::Write;

const HEADER: [&str; 8] = [
    "id",
    "bank_transaction_id",
    "accounting_entry_id",
    "bank_account_id",
    "match_type",
    "confidence",
    "notes",
    "created_at",
];

/// 导出匹配记录为 CSV (PostgreSQL COPY 兼容格式, 带表头)
pub fn write_csv<W: Write>(matches: &[Match], out: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADER)?;

    for m in matches {
        writer.write_record(&[
            m.id.to_string(),
            m.bank_transaction_id.to_string(),
            m.accounting_entry_id.to_string(),
            m.bank_account_id.map(|id| id.to_string()).unwrap_or_default(),
            m.match_type.as_str().to_string(),
            m.confidence.to_string(),
            m.notes.clone().unwrap_or_default(),
            m.created_at.to_rfc3339(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// 导出到内存缓冲区, 供 HTTP 下载
pub fn to_csv_bytes(matches: &[Match]) -> Result<Vec<u8>, csv::Error> {
    let mut buf = Vec::new();
    write_csv(matches, &mut buf)?;
    Ok(buf)
}
