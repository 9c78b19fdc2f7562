pub mod error;
pub mod loan;

pub use error::{LoanError, LoanResult};
