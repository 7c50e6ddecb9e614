use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::domain::{BillingPlanLineItem, ItemCategory, LineStatus};

/// Recurring fees charged for a deployed worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    /// Monthly service fee for each contract year; the last entry covers later years.
    pub service_fee_by_year: Vec<Decimal>,
    #[serde(default)]
    pub dormitory_fee: Option<Decimal>,
    /// Resident certificate fee charged at entry and on each anniversary.
    #[serde(default)]
    pub arc_fee: Option<Decimal>,
}

impl FeeSchedule {
    /// Statutory service-fee ceilings (1,800 / 1,700 / 1,500) with the yearly ARC fee.
    pub fn standard() -> Self {
        Self {
            service_fee_by_year: vec![
                Decimal::from(1800),
                Decimal::from(1700),
                Decimal::from(1500),
            ],
            dormitory_fee: None,
            arc_fee: Some(Decimal::from(1000)),
        }
    }

    fn service_fee_for_month(&self, month_index: u32) -> Option<Decimal> {
        let year = (month_index / 12) as usize;
        self.service_fee_by_year
            .get(year)
            .or_else(|| self.service_fee_by_year.last())
            .copied()
    }
}

/// The contract a billing plan is generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentContract {
    pub worker_id: String,
    pub entry_date: NaiveDate,
    pub term_months: u32,
    pub fees: FeeSchedule,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("contract term must cover at least one month")]
    EmptyTerm,
    #[error("fee schedule needs at least one service fee")]
    MissingServiceFee,
    #[error("billing date overflows the calendar")]
    DateOverflow,
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn days_in_month(date: NaiveDate) -> Result<u32, ScheduleError> {
    let start = first_of_month(date);
    let next = start
        .checked_add_months(Months::new(1))
        .ok_or(ScheduleError::DateOverflow)?;
    Ok((next - start).num_days() as u32)
}

/// Share of a monthly fee owed when billing starts mid-month, in whole currency units.
pub fn prorate(monthly_fee: Decimal, start: NaiveDate) -> Result<Decimal, ScheduleError> {
    let days = days_in_month(start)?;
    let remaining = days - start.day() + 1;
    if remaining == days {
        return Ok(monthly_fee);
    }
    let share = monthly_fee * Decimal::from(remaining) / Decimal::from(days);
    Ok(share.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
}

/// Generate the pending billing plan items for a contract, ordered by date then category.
pub fn generate_plan(
    contract: &DeploymentContract,
) -> Result<Vec<BillingPlanLineItem>, ScheduleError> {
    if contract.term_months == 0 {
        return Err(ScheduleError::EmptyTerm);
    }
    if contract.fees.service_fee_by_year.is_empty() {
        return Err(ScheduleError::MissingServiceFee);
    }

    let entry = contract.entry_date;
    let entry_month = first_of_month(entry);
    let mut items = Vec::new();

    for month_index in 0..contract.term_months {
        let month_start = entry_month
            .checked_add_months(Months::new(month_index))
            .ok_or(ScheduleError::DateOverflow)?;
        let (billing_date, first_month) = if month_index == 0 {
            (entry, entry.day() != 1)
        } else {
            (month_start, false)
        };
        let period = month_start.format("%Y-%m");

        if let Some(fee) = contract.fees.service_fee_for_month(month_index) {
            let amount = if first_month { prorate(fee, entry)? } else { fee };
            items.push(line(
                billing_date,
                ItemCategory::ServiceFee,
                amount,
                format!("Service fee {period} (year {})", month_index / 12 + 1),
                first_month,
            ));
        }

        if let Some(fee) = contract.fees.dormitory_fee {
            let amount = if first_month { prorate(fee, entry)? } else { fee };
            items.push(line(
                billing_date,
                ItemCategory::DormitoryFee,
                amount,
                format!("Dormitory fee {period}"),
                first_month,
            ));
        }
    }

    if let Some(fee) = contract.fees.arc_fee {
        let term_end = entry
            .checked_add_months(Months::new(contract.term_months))
            .ok_or(ScheduleError::DateOverflow)?;
        let mut year = 0;
        loop {
            let due = entry
                .checked_add_months(Months::new(year * 12))
                .ok_or(ScheduleError::DateOverflow)?;
            if due >= term_end {
                break;
            }
            items.push(line(
                due,
                ItemCategory::ArcFee,
                fee,
                format!("ARC fee (year {})", year + 1),
                false,
            ));
            year += 1;
        }
    }

    items.sort_by(|a, b| {
        (a.billing_date, &a.item_category).cmp(&(b.billing_date, &b.item_category))
    });
    Ok(items)
}

fn line(
    billing_date: NaiveDate,
    item_category: ItemCategory,
    amount: Decimal,
    description: String,
    is_prorated: bool,
) -> BillingPlanLineItem {
    BillingPlanLineItem {
        billing_date,
        item_category,
        amount,
        description,
        is_prorated,
        status: LineStatus::Pending,
    }
}
