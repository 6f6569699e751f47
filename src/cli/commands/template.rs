//! `cockpit template` command - Print fill-in import templates

use chrono::{Datelike, Local, NaiveDate};
use console::style;
use miette::Result;

use crate::core::Config;
use crate::import::dates::parse_date;
use crate::import::template::{TemplateGenerator, TemplateKind, TemplateOptions};

#[derive(clap::Args, Debug)]
pub struct TemplateArgs {
    /// Template to print (schedule, resources)
    pub kind: TemplateKind,

    /// First day of the planned schedule (default: next Monday)
    #[arg(long)]
    pub start: Option<String>,

    /// Number of weeks the example covers
    #[arg(long, default_value_t = 4)]
    pub weeks: usize,
}

pub fn run(args: TemplateArgs) -> Result<()> {
    let config = Config::load();

    let start = match &args.start {
        Some(raw) => parse_date(raw, config.date_order())
            .ok_or_else(|| miette::miette!("Invalid start date: '{}'", raw))?,
        None => next_monday(Local::now().date_naive()),
    };

    let generator = TemplateGenerator::new().map_err(|e| miette::miette!("{}", e))?;
    let text = generator
        .generate(
            args.kind,
            &TemplateOptions {
                start,
                weeks: args.weeks,
                delimiter: config.delimiter(),
            },
        )
        .map_err(|e| miette::miette!("{}", e))?;

    // Template to stdout, hint to stderr so redirection stays clean
    print!("{}", text);
    eprintln!();
    eprintln!(
        "{} Template generated. Redirect to file: cockpit template {} > {}.tsv",
        style("→").blue(),
        args.kind,
        args.kind
    );

    Ok(())
}

fn next_monday(today: NaiveDate) -> NaiveDate {
    let offset = (7 - today.weekday().num_days_from_monday()) % 7;
    today + chrono::Duration::days(i64::from(offset))
}
