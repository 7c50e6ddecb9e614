use crate::infra::InMemoryBackend;
use chrono::{Datelike, Local, NaiveDate};
use clap::Args;
use placement_admin::error::AppError;
use placement_admin::workflows::billing::{
    write_csv, BillingPlanId, BillingReviewService, ConfirmReceipt, DeploymentContract,
    FeeSchedule, LineChange, LineView, ReviewSnapshot, ScheduleError,
};
use placement_admin::workflows::leads::{
    ConversionResult, ConvertLeadForm, IndustryType, LeadConversionService, LeadId,
};
use rust_decimal::Decimal;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_PLAN: &str = "BP-DEMO-1";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Worker entry date (YYYY-MM-DD). Defaults to the 15th of the current month.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) entry_date: Option<NaiveDate>,
    /// Contract length in months.
    #[arg(long, default_value_t = 12)]
    pub(crate) term_months: u32,
    /// Write the confirmed schedule as CSV to this path.
    #[arg(long)]
    pub(crate) csv_out: Option<PathBuf>,
    /// Accept every suggested change before confirming.
    #[arg(long)]
    pub(crate) accept_all: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let entry_date = args.entry_date.unwrap_or_else(default_entry_date);
    let backend = Arc::new(InMemoryBackend::default());
    let plan_id = seed_review_plan(&backend, entry_date, args.term_months)?;

    let review = BillingReviewService::new(backend.clone());
    let snapshot = review.open(&plan_id).await?;
    render_review(&snapshot);

    let snapshot = if args.accept_all {
        review.accept_all(&plan_id)?
    } else {
        snapshot
    };
    println!(
        "\nConfirming with {} accepted change(s), resolved total {}",
        snapshot.lines.iter().filter(|line| line.accepted).count(),
        snapshot.resolved_total
    );

    let receipt = review.confirm(&plan_id).await?;
    render_receipt(&receipt);

    if let Some(path) = args.csv_out {
        let items = backend
            .plan(&plan_id)
            .map(|plan| plan.items)
            .unwrap_or_default();
        write_csv(&items, File::create(&path)?)?;
        println!("Schedule written to {}", path.display());
    }

    let leads = LeadConversionService::new(backend);
    let conversion = leads
        .convert(&LeadId("LEAD-DEMO-1".to_string()), sample_lead())
        .await?;
    render_conversion(&conversion);

    Ok(())
}

/// Store the demo contract and amend it so the plan is flagged for review.
pub(crate) fn seed_review_plan(
    backend: &InMemoryBackend,
    entry_date: NaiveDate,
    term_months: u32,
) -> Result<BillingPlanId, ScheduleError> {
    let plan_id = backend.insert_contract(
        BillingPlanId(DEMO_PLAN.to_string()),
        DeploymentContract {
            worker_id: "W-DEMO".to_string(),
            entry_date,
            term_months,
            fees: FeeSchedule::standard(),
        },
    )?;
    backend.amend_contract(&plan_id, |contract| {
        if let Some(first_year) = contract.fees.service_fee_by_year.first_mut() {
            *first_year = Decimal::from(1700);
        }
        contract.fees.dormitory_fee = Some(Decimal::from(2500));
    });
    Ok(plan_id)
}

pub(crate) fn default_entry_date() -> NaiveDate {
    let today = Local::now().date_naive();
    today.with_day(15).unwrap_or(today)
}

fn sample_lead() -> ConvertLeadForm {
    ConvertLeadForm {
        tax_id: "24536806".to_string(),
        company_name: Some("Hsinchu Precision Metalworks".to_string()),
        industry_type: IndustryType::Manufacturing,
        factory_address: Some("No. 12, Gongye Rd, Hsinchu".to_string()),
        avg_domestic_workers: Some(125),
        base_rate: Some(Decimal::new(15, 2)),
        extra_rate: Some(Decimal::new(5, 2)),
        apply_extra: true,
    }
}

fn render_review(snapshot: &ReviewSnapshot) {
    println!(
        "Billing plan {} ({:?}, {:?})",
        snapshot.plan_id, snapshot.review_status, snapshot.mode
    );
    if let Some(banner) = &snapshot.banner {
        println!("! {banner}");
    }

    println!(
        "{:<28} {:>10} {:>10} {:>10}  {}",
        "line", "existing", "suggested", "delta", "change"
    );
    for line in &snapshot.lines {
        render_line(line);
    }
}

fn render_line(line: &LineView) {
    let (existing, suggested, kind) = match line.change {
        LineChange::Unchanged { amount } => (amount.to_string(), amount.to_string(), "unchanged"),
        LineChange::Changed {
            existing,
            suggested,
        } => (existing.to_string(), suggested.to_string(), "changed"),
        LineChange::New { suggested } => ("-".to_string(), suggested.to_string(), "new"),
    };
    let marker = if line.accepted { "[x]" } else { "[ ]" };

    println!(
        "{:<28} {:>10} {:>10} {:>10}  {kind} {}",
        line.key.to_string(),
        existing,
        suggested,
        line.delta,
        if line.change.is_different() { marker } else { "" }
    );
}

fn render_receipt(receipt: &ConfirmReceipt) {
    println!(
        "Confirmed plan {}: {} item(s), total {}",
        receipt.plan_id, receipt.submitted_items, receipt.submitted_total
    );
    if let Some(reloaded) = &receipt.reloaded {
        println!(
            "Reloaded plan is {:?} with {} line(s)",
            reloaded.review_status,
            reloaded.stored_items.len()
        );
    }
}

fn render_conversion(conversion: &ConversionResult) {
    let employer = &conversion.employer;
    println!(
        "\nLead converted to employer {} (tax id {})",
        employer.id, employer.tax_id
    );
    match &conversion.quota_preview {
        Some(preview) => println!(
            "- quota: {} workers at rate {} ({} domestic)",
            preview.quota, preview.allocation_rate, preview.domestic_worker_count
        ),
        None => println!("- no headcount quota for this industry"),
    }
}
