use std::io::Write;

use serde::Serialize;

use super::domain::{BillingPlanLineItem, LineStatus};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write billing plan csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush billing plan csv: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct CsvRow<'a> {
    billing_date: String,
    item_category: &'a str,
    amount: String,
    description: &'a str,
    prorated: bool,
    status: &'static str,
}

fn status_code(status: LineStatus) -> &'static str {
    match status {
        LineStatus::Pending => "PENDING",
        LineStatus::Confirmed => "CONFIRMED",
        LineStatus::Invoiced => "INVOICED",
        LineStatus::Cancelled => "CANCELLED",
    }
}

/// Write items as CSV with a header row.
pub fn write_csv<W: Write>(items: &[BillingPlanLineItem], writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for item in items {
        csv_writer.serialize(CsvRow {
            billing_date: item.billing_date.format("%Y-%m-%d").to_string(),
            item_category: item.item_category.code(),
            amount: item.amount.normalize().to_string(),
            description: &item.description,
            prorated: item.is_prorated,
            status: status_code(item.status),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}
