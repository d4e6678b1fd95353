use thiserror::Error;

/// Domain rule violations. These surface to clients as 422 responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("discount must be between 0 and 100, got {0}")]
    DiscountOutOfRange(i32),

    #[error("tax rate must be greater than zero, got {0}")]
    NonPositiveTax(i32),

    #[error("{0} must not be negative")]
    Negative(&'static str),

    #[error("{0} must not exceed {1}")]
    TooLarge(&'static str, i64),

    #[error("amount is too large to compute")]
    AmountOverflow,

    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("cannot derive a slug from {0:?}")]
    EmptySlug(String),

    #[error("unknown order status {0:?}")]
    UnknownStatus(String),

    #[error("unknown payment method {0:?}")]
    UnknownPaymentMethod(String),

    #[error("credit card details are required for credit card payments")]
    MissingCreditCard,

    #[error("invalid credit card {0}")]
    InvalidCreditCard(&'static str),
}

pub fn non_negative<T>(field: &'static str, value: T) -> Result<T, ValidationError>
where
    T: PartialOrd + Default,
{
    if value < T::default() {
        return Err(ValidationError::Negative(field));
    }
    Ok(value)
}

pub fn not_blank(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }
    if trimmed.len() == value.len() {
        Ok(value)
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_values_are_rejected() {
        assert_eq!(non_negative("quantity", 0), Ok(0));
        assert_eq!(non_negative("shipping_cost", 15_i64), Ok(15));
        assert_eq!(
            non_negative("quantity", -1),
            Err(ValidationError::Negative("quantity"))
        );
    }

    #[test]
    fn blank_strings_are_rejected_and_others_trimmed() {
        assert_eq!(
            not_blank("city", "   ".to_string()),
            Err(ValidationError::Blank("city"))
        );
        assert_eq!(not_blank("city", " Tashkent ".to_string()), Ok("Tashkent".into()));
    }
}
