use chrono::NaiveDate;
use clap::Args;
use timebudget_core::{AllocationReport, BudgetService, Config, DateRange};

use super::{date_arg, open_db, print_json, today, CmdResult};

#[derive(Args)]
pub struct AllocateArgs {
    /// First day (YYYY-MM-DD, default: today)
    #[arg(long, value_parser = date_arg)]
    pub start: Option<NaiveDate>,
    /// Last day, inclusive (default: same as start)
    #[arg(long, value_parser = date_arg)]
    pub end: Option<NaiveDate>,
    /// Routine title counted as sleep (default: from config)
    #[arg(long)]
    pub sleep_label: Option<String>,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: AllocateArgs) -> CmdResult {
    let config = Config::load()?;
    let db = open_db(&config)?;

    let start = args.start.unwrap_or_else(today);
    let end = args.end.unwrap_or(start);
    let sleep_label = args
        .sleep_label
        .unwrap_or_else(|| config.allocation.sleep_label.clone());

    let report = BudgetService::new(&db, &db)
        .with_sleep_label(sleep_label)
        .allocate(DateRange::new(start, end))?;

    if args.json {
        return print_json(&report);
    }
    print!("{}", render(&report, config.display.decimals as usize));
    Ok(())
}

fn render(report: &AllocationReport, decimals: usize) -> String {
    let mut out = format!(
        "{} .. {} ({} day{}, {}h)\n",
        report.start,
        report.end,
        report.days,
        if report.days == 1 { "" } else { "s" },
        report.days * 24
    );
    if !report.calendar_available {
        out.push_str(&format!(
            "warning: calendar '{}' unavailable, Schedule counted as 0h\n",
            report.calendar_source
        ));
    }
    let shares = report.allocation.proportions();
    for ((category, hours), (_, share)) in report.allocation.categories().iter().zip(&shares) {
        out.push_str(&format!(
            "{:<10} {:>10.prec$}h {:>6.1}%\n",
            category.label(),
            hours,
            share * 100.0,
            prec = decimals
        ));
    }
    if report.efficiency != 1.0 {
        out.push_str(&format!("task hours divided by efficiency {:.2}\n", report.efficiency));
    }
    out
}
