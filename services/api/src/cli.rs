use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use placement_admin::error::AppError;
use placement_admin::workflows::quota::{
    AllocationTier, QuotaCalculation, QuotaRounding, RateComposition,
};
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(
    name = "Placement Admin",
    about = "Quota allocation, lead conversion, and billing plan review for a placement agency",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute a foreign-worker quota from domestic headcount
    Quota(QuotaArgs),
    /// Walk through a billing plan review against the in-memory backend
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override BACKEND_BASE_URL
    #[arg(long)]
    pub(crate) backend_url: Option<String>,
    /// Serve against an in-memory backend instead of the remote one
    #[arg(long)]
    pub(crate) in_memory: bool,
}

#[derive(Args, Debug)]
pub(crate) struct QuotaArgs {
    /// Average domestic headcount
    #[arg(long)]
    pub(crate) domestic_workers: i64,
    /// Base allocation rate, e.g. 0.15
    #[arg(long, conflicts_with = "tier", required_unless_present = "tier")]
    pub(crate) base_rate: Option<Decimal>,
    /// Industry tier (A+, A, B, C, D) supplying the base rate
    #[arg(long)]
    pub(crate) tier: Option<AllocationTier>,
    /// Extra allocation rate, only counted with --apply-extra
    #[arg(long)]
    pub(crate) extra_rate: Option<Decimal>,
    #[arg(long)]
    pub(crate) apply_extra: bool,
    /// Rounding policy: first-decimal-digit (default) or any-remainder
    #[arg(long, default_value = "first-decimal-digit")]
    pub(crate) rounding: QuotaRounding,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Quota(args) => run_quota(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

pub(crate) fn run_quota(args: QuotaArgs) -> Result<(), AppError> {
    let calculation = quota_for(&args)?;
    let source = match args.tier {
        Some(tier) => format!("tier {}", tier.label()),
        None => "explicit base rate".to_string(),
    };

    println!("Quota calculation ({source})");
    println!("- domestic workers: {}", calculation.domestic_worker_count);
    println!("- allocation rate:  {}", calculation.allocation_rate);
    println!("- raw quota:        {}", calculation.raw_quota);
    println!("- quota:            {}", calculation.quota);
    Ok(())
}

fn quota_for(args: &QuotaArgs) -> Result<QuotaCalculation, AppError> {
    let base_rate = args
        .base_rate
        .or_else(|| args.tier.map(AllocationTier::base_rate))
        .unwrap_or(Decimal::ZERO);
    let composition = RateComposition::new(
        base_rate,
        args.extra_rate.unwrap_or(Decimal::ZERO),
        args.apply_extra,
    );
    Ok(QuotaCalculation::compute(
        args.domestic_workers,
        &composition,
        args.rounding,
    )?)
}
