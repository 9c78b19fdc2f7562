use chrono::NaiveDate;
use clap::Parser;
use emi::loan::{generate_schedule, AmortizationResult, LoanInput};
use log::{error, LevelFilter};
use simple_logger::SimpleLogger;
use std::process;

/// Prints the EMI amortization schedule of a loan
#[derive(Parser, Debug)]
#[command(name = "emi", version, about)]
struct Cli {
    /// Loan amount
    #[arg(long)]
    principal: f64,

    /// Annual interest rate in percent (e.g. 10.5)
    #[arg(long)]
    rate: f64,

    /// Loan tenure in months
    #[arg(long)]
    tenure: u32,

    /// Lump sum paid off in the first month
    #[arg(long, default_value_t = 0.)]
    prepayment: f64,

    /// Due date of the first installment (YYYY-MM-DD)
    #[arg(long)]
    first_payment_date: Option<NaiveDate>,

    /// error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Print the schedule as JSON
    #[cfg(feature = "serde")]
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn loan_input(&self) -> LoanInput {
        let input = LoanInput::new(self.principal, self.rate, self.tenure)
            .with_prepayment(self.prepayment);
        match self.first_payment_date {
            Some(date) => input.with_first_payment_date(date),
            None => input,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = SimpleLogger::new().with_level(cli.log_level).init() {
        eprintln!("logger: {}", err);
    }

    let result = match generate_schedule(&cli.loan_input()) {
        Ok(result) => result,
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    };

    if !print_json(&cli, &result) {
        println!(
            "emi ${:.2} over {} months, total interest ${:.2}",
            result.emi,
            result.tenure_months,
            result.total_interest()
        );
        result.show_amortization();
    }
}

#[cfg(feature = "serde")]
fn print_json(cli: &Cli, result: &AmortizationResult) -> bool {
    if !cli.json {
        return false;
    }
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    }
    true
}

#[cfg(not(feature = "serde"))]
fn print_json(_cli: &Cli, _result: &AmortizationResult) -> bool {
    false
}

// public types must stay Send + Sync so callers can share results across threads
#[cfg(test)]
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<LoanInput>();
    is_normal::<AmortizationResult>();
    is_normal::<emi::loan::MonthlyPayment>();
    is_normal::<emi::LoanError>();
}

#[test]
fn cli_builds_loan_input() {
    let cli = Cli::try_parse_from([
        "emi",
        "--principal",
        "100000",
        "--rate",
        "10",
        "--tenure",
        "12",
        "--first-payment-date",
        "2024-04-01",
    ])
    .unwrap();

    assert_eq!(cli.log_level, LevelFilter::Info);
    assert_eq!(
        cli.loan_input(),
        LoanInput::new(100000., 10., 12)
            .with_first_payment_date(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap())
    );
}

#[test]
fn cli_parses_log_level() {
    let base = ["emi", "--principal", "1000", "--rate", "5", "--tenure", "12"];

    let cli = Cli::try_parse_from(base.into_iter().chain(["--log-level", "debug"])).unwrap();
    assert_eq!(cli.log_level, LevelFilter::Debug);

    assert!(Cli::try_parse_from(base.into_iter().chain(["--log-level", "verbose"])).is_err());
}

#[test]
fn cli_requires_tenure() {
    assert!(Cli::try_parse_from(["emi", "--principal", "1000", "--rate", "5"]).is_err());
}
