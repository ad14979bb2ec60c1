//! Human-readable reference numbers
//!
//! Format: `<Company><MM>-<YYYY>-CR<serial>`, e.g. `BKR03-2025-CR701`.

use chrono::{Datelike, Local, NaiveDate};

use crate::error::DocfillError;
use crate::serial::SerialCounter;

/// Company code used when none is configured
pub const DEFAULT_COMPANY_CODE: &str = "BKR";

/// Generate a reference number for today's date
pub fn generate_reference(
    counter: &dyn SerialCounter,
    company_code: &str,
) -> Result<String, DocfillError> {
    generate_reference_on(counter, company_code, Local::now().date_naive())
}

/// Generate a reference number for an explicit date
pub fn generate_reference_on(
    counter: &dyn SerialCounter,
    company_code: &str,
    date: NaiveDate,
) -> Result<String, DocfillError> {
    let serial = counter.next_serial()?;
    Ok(format_reference(company_code, date, serial))
}

pub fn format_reference(company_code: &str, date: NaiveDate, serial: u64) -> String {
    format!(
        "{}{:02}-{:04}-CR{}",
        company_code,
        date.month(),
        date.year(),
        serial
    )
}
