use chrono::{Months, NaiveDate};
use log::{debug, info, trace, warn};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{LoanError, LoanResult};

pub const DEC_PLACES: f64 = 2.;

// policy limit, 100 years
pub const MAX_TENURE_MONTHS: u32 = 1200;

// annual_rate is a percentage (10.5 means 10.5% a year)
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct LoanInput {
    #[cfg_attr(feature = "serde", serde(rename = "loanAmount"))]
    pub principal: f64,
    #[cfg_attr(feature = "serde", serde(rename = "interestRate"))]
    pub annual_rate: f64,
    #[cfg_attr(feature = "serde", serde(rename = "loanTenureMonths"))]
    pub tenure_months: u32,
    #[cfg_attr(feature = "serde", serde(rename = "prepaymentAmount", default))]
    pub prepayment: f64,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub first_payment_date: Option<NaiveDate>,
}

impl LoanInput {
    pub fn new(principal: f64, annual_rate: f64, tenure_months: u32) -> Self {
        Self {
            principal,
            annual_rate,
            tenure_months,
            prepayment: 0.,
            first_payment_date: None,
        }
    }

    pub fn with_prepayment(mut self, prepayment: f64) -> Self {
        self.prepayment = prepayment;
        self
    }

    pub fn with_first_payment_date(mut self, first_payment_date: NaiveDate) -> Self {
        self.first_payment_date = Some(first_payment_date);
        self
    }

    pub fn validate(&self) -> LoanResult<()> {
        if !self.principal.is_finite() || self.principal <= 0. {
            return Err(LoanError::invalid(
                "principal",
                format!("must be a finite amount greater than 0, got {}", self.principal),
            ));
        }
        if !self.annual_rate.is_finite() || self.annual_rate < 0. {
            return Err(LoanError::invalid(
                "annual_rate",
                format!("must be a finite percentage of at least 0, got {}", self.annual_rate),
            ));
        }
        if self.tenure_months == 0 || self.tenure_months > MAX_TENURE_MONTHS {
            return Err(LoanError::invalid(
                "tenure_months",
                format!(
                    "must be between 1 and {} months, got {}",
                    MAX_TENURE_MONTHS, self.tenure_months
                ),
            ));
        }
        if !self.prepayment.is_finite() || self.prepayment < 0. {
            return Err(LoanError::invalid(
                "prepayment",
                format!("must be a finite amount of at least 0, got {}", self.prepayment),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct MonthlyPayment {
    pub month: u32,
    pub emi_paid: f64,
    pub interest_paid: f64,
    pub principal_paid: f64,
    pub prepayment: f64,
    pub remaining_balance: f64,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub due_date: Option<NaiveDate>,
}

impl MonthlyPayment {
    pub fn new(
        month: u32,
        emi_paid: f64,
        interest_paid: f64,
        principal_paid: f64,
        prepayment: f64,
        remaining_balance: f64,
        due_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            month,
            emi_paid,
            interest_paid,
            principal_paid,
            prepayment,
            remaining_balance,
            due_date,
        }
    }
}

impl fmt::Display for MonthlyPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "month {}, emi ${:.2}, interest paid ${:.2}, principal paid ${:.2}, prepayment ${:.2}, remaining balance ${:.2}",
            self.month,
            self.emi_paid,
            self.interest_paid,
            self.principal_paid,
            self.prepayment,
            self.remaining_balance
        )?;
        if let Some(due_date) = self.due_date {
            write!(f, ", due {}", due_date)?;
        }
        Ok(())
    }
}

// tenure_months counts the emitted payments, not the requested tenure
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct AmortizationResult {
    pub loan_amount: f64,
    pub interest_rate: f64,
    #[cfg_attr(feature = "serde", serde(rename = "loanTenureMonths"))]
    pub tenure_months: u32,
    pub emi: f64,
    #[cfg_attr(feature = "serde", serde(rename = "prepaymentAmount"))]
    pub prepayment: f64,
    #[cfg_attr(feature = "serde", serde(rename = "monthWisePayments"))]
    pub schedule: Vec<MonthlyPayment>,
}

impl AmortizationResult {
    pub fn get_pmt_count(&self) -> usize {
        self.schedule.len()
    }

    // month is 1-based
    pub fn get_pmt_detail(&self, month: usize) -> Option<&MonthlyPayment> {
        month.checked_sub(1).and_then(|idx| self.schedule.get(idx))
    }

    pub fn get_pmt_info(&self, month: usize) -> String {
        match self.get_pmt_detail(month) {
            Some(pmt) => pmt.to_string(),
            None => "No payment information.".to_string(),
        }
    }

    pub fn total_interest(&self) -> f64 {
        round(
            self.schedule.iter().map(|pmt| pmt.interest_paid).sum(),
            DEC_PLACES,
        )
    }

    // installments plus the prepayment
    pub fn total_paid(&self) -> f64 {
        round(
            self.schedule
                .iter()
                .map(|pmt| pmt.emi_paid + pmt.prepayment)
                .sum(),
            DEC_PLACES,
        )
    }

    pub fn show_amortization(&self) {
        for pmt in &self.schedule {
            println!("{}", pmt);
        }
    }
}

// the stored loan record: requested terms plus the balance after month 1
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct LoanSummary {
    pub loan_amount: f64,
    pub interest_rate: f64,
    pub loan_tenure_months: u32,
    pub emi: f64,
    pub prepayment_amount: Option<f64>,
    pub remaining_balance: f64,
}

impl LoanSummary {
    pub fn from_schedule(input: &LoanInput, result: &AmortizationResult) -> Self {
        let remaining_balance = result
            .get_pmt_detail(1)
            .map_or(round(input.principal, DEC_PLACES), |pmt| {
                pmt.remaining_balance
            });
        Self {
            loan_amount: round(input.principal, DEC_PLACES),
            interest_rate: round(input.annual_rate, DEC_PLACES),
            loan_tenure_months: input.tenure_months,
            emi: result.emi,
            prepayment_amount: (result.prepayment > 0.).then_some(result.prepayment),
            remaining_balance,
        }
    }
}

fn round(amt: f64, dec: f64) -> f64 {
    if amt == 0. {
        0.
    } else {
        (amt * 10_f64.powf(dec)).round() / 10_f64.powf(dec)
    }
}

fn get_monthly_rate(annual_rate: f64) -> f64 {
    annual_rate / 12. / 100.
}

// inputs are not validated here
pub fn get_emi(principal: f64, annual_rate: f64, tenure_months: u32) -> f64 {
    let monthly_rate = get_monthly_rate(annual_rate);
    let total_pmts = tenure_months as f64;

    if monthly_rate == 0. {
        return principal / total_pmts;
    }

    // r * f / (f - 1) == r / (1 - f^-n), with ln_1p/exp_m1 so tiny rates keep
    // their precision instead of rounding (1 + r) to 1
    let discount = -(-total_pmts * monthly_rate.ln_1p()).exp_m1();
    principal * monthly_rate / discount
}

fn check_finite(value: f64, step: &str, month: u32) -> LoanResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LoanError::computation(
            format!("{} (month {})", step, month),
            format!("value {} is not finite", value),
        ))
    }
}

// first_payment_date + (month - 1) months, counted from the first date so that
// end-of-month clamping never accumulates
fn get_due_date(first_payment_date: &NaiveDate, month: u32) -> LoanResult<NaiveDate> {
    first_payment_date
        .checked_add_months(Months::new(month - 1))
        .ok_or_else(|| {
            LoanError::computation(
                format!("due date (month {})", month),
                format!(
                    "{} plus {} months is outside the calendar",
                    first_payment_date,
                    month - 1
                ),
            )
        })
}

// interest accrues on the current balance, principal is emi - interest; the
// month 1 prepayment (clamped to the balance) comes off before the principal
pub fn generate_schedule(input: &LoanInput) -> LoanResult<AmortizationResult> {
    input.validate()?;

    let emi = get_emi(input.principal, input.annual_rate, input.tenure_months);
    if !emi.is_finite() || emi <= 0. {
        return Err(LoanError::computation(
            "emi",
            format!(
                "installment {} for {}% over {} months is not a positive finite amount",
                emi, input.annual_rate, input.tenure_months
            ),
        ));
    }
    debug!(
        "emi {} for principal {}, rate {}%, tenure {} months",
        emi, input.principal, input.annual_rate, input.tenure_months
    );

    let monthly_rate = get_monthly_rate(input.annual_rate);
    let mut schedule: Vec<MonthlyPayment> = Vec::with_capacity(input.tenure_months as usize);
    let mut balance = input.principal;
    let mut applied_prepayment = 0.;
    let mut month = 1;

    while balance > 0. && month <= input.tenure_months {
        let interest = check_finite(balance * monthly_rate, "interest", month)?;
        let principal_paid = check_finite(emi - interest, "principal", month)?;

        let mut prepayment = 0.;
        if month == 1 && input.prepayment > 0. {
            prepayment = input.prepayment.min(balance);
            if prepayment < input.prepayment {
                warn!(
                    "prepayment {} exceeds outstanding balance {}, applying {}",
                    input.prepayment, balance, prepayment
                );
            }
            balance -= prepayment;
            applied_prepayment = prepayment;
        }

        balance = check_finite(balance - principal_paid, "balance", month)?;

        let due_date = match &input.first_payment_date {
            Some(first) => Some(get_due_date(first, month)?),
            None => None,
        };

        trace!(
            "month {}, interest {}, principal {}, prepayment {}, end bal {}",
            month,
            interest,
            principal_paid,
            prepayment,
            balance
        );

        schedule.push(MonthlyPayment::new(
            month,
            round(emi, DEC_PLACES),
            round(interest, DEC_PLACES),
            round(principal_paid, DEC_PLACES),
            round(prepayment, DEC_PLACES),
            round(balance.max(0.), DEC_PLACES),
            due_date,
        ));

        if balance <= 0. {
            break;
        }
        month += 1;
    }

    // at extreme rates the installment can round down to the interest alone
    if balance > 0. && round(balance, DEC_PLACES) > 0. {
        return Err(LoanError::computation(
            "balance",
            format!(
                "{} still owed after {} months, installment {} does not amortize the loan at {}%",
                balance, input.tenure_months, emi, input.annual_rate
            ),
        ));
    }

    let tenure_months = schedule.len() as u32;
    if tenure_months < input.tenure_months {
        info!(
            "loan of {} paid off after {} of {} months",
            input.principal, tenure_months, input.tenure_months
        );
    } else {
        info!(
            "loan of {} amortized over {} months",
            input.principal, tenure_months
        );
    }

    Ok(AmortizationResult {
        loan_amount: input.principal,
        interest_rate: input.annual_rate,
        tenure_months,
        emi: round(emi, DEC_PLACES),
        prepayment: round(applied_prepayment, DEC_PLACES),
        schedule,
    })
}
