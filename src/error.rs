use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoanError {
    #[error("invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("computation failed at {step}: {reason}")]
    Computation { step: String, reason: String },
}

impl LoanError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        LoanError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn computation(step: impl Into<String>, reason: impl Into<String>) -> Self {
        LoanError::Computation {
            step: step.into(),
            reason: reason.into(),
        }
    }
}

pub type LoanResult<T> = Result<T, LoanError>;

#[cfg(test)]
mod tests {
    use super::LoanError;

    #[test]
    fn test_error_messages() {
        let err = LoanError::invalid("principal", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "invalid input: principal must be greater than 0"
        );

        let err = LoanError::computation("interest (month 3)", "value is not finite");
        assert_eq!(
            err.to_string(),
            "computation failed at interest (month 3): value is not finite"
        );
    }
}
