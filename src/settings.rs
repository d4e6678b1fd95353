use serde::Serialize;
use utoipa::ToSchema;

use crate::validation::ValidationError;

/// Store-wide settings. Built once from configuration and carried in the
/// application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SiteSettings {
    tax: i32,
}

impl SiteSettings {
    /// `tax` is a percentage and must be greater than zero.
    pub fn new(tax: i32) -> Result<Self, ValidationError> {
        if tax <= 0 {
            return Err(ValidationError::NonPositiveTax(tax));
        }
        Ok(Self { tax })
    }

    pub fn tax(&self) -> i32 {
        self.tax
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_must_be_positive() {
        assert_eq!(SiteSettings::new(12).map(|s| s.tax()), Ok(12));
        assert_eq!(SiteSettings::new(0), Err(ValidationError::NonPositiveTax(0)));
        assert_eq!(SiteSettings::new(-5), Err(ValidationError::NonPositiveTax(-5)));
    }
}
