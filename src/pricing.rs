//! Price arithmetic shared by the cart, checkout and order views.
//!
//! Amounts are integers in the minor currency unit. Nothing is cached or
//! snapshotted: callers load live product rows and recompute on every read,
//! so an order reprices when its products change.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{settings::SiteSettings, validation::ValidationError};

pub const MAX_DISCOUNT: i32 = 100;

/// Upper bound for a stored price or shipping cost.
pub const MAX_PRICE: i64 = 1_000_000_000_000;

/// Upper bound for the quantity of a single cart line.
pub const MAX_LINE_QUANTITY: i32 = 1_000_000;

/// Accepts a price or shipping cost in `0..=MAX_PRICE`.
pub fn price_in_range(field: &'static str, value: i64) -> Result<i64, ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative(field));
    }
    if value > MAX_PRICE {
        return Err(ValidationError::TooLarge(field, MAX_PRICE));
    }
    Ok(value)
}

/// Discount percentage in `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Discount(i32);

impl Discount {
    pub fn new(percent: i32) -> Result<Self, ValidationError> {
        if !(0..=MAX_DISCOUNT).contains(&percent) {
            return Err(ValidationError::DiscountOutOfRange(percent));
        }
        Ok(Self(percent))
    }

    pub fn percent(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Discount {
    type Error = ValidationError;

    fn try_from(percent: i32) -> Result<Self, Self::Error> {
        Self::new(percent)
    }
}

/// Price after discount: `floor(price * (100 - discount) / 100)`.
pub fn current_price(price: i64, discount: Discount) -> Result<i64, ValidationError> {
    price
        .checked_mul(i64::from(MAX_DISCOUNT - discount.0))
        .map(|scaled| scaled.div_euclid(100))
        .ok_or(ValidationError::AmountOverflow)
}

/// One cart or order line as seen by the pricing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLine {
    pub price: i64,
    pub discount: Discount,
    pub shipping_cost: i64,
    pub quantity: i64,
}

impl PriceLine {
    /// Builds a line from raw column values.
    pub fn new(
        price: i64,
        discount: i32,
        shipping_cost: i64,
        quantity: i32,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            price,
            discount: Discount::new(discount)?,
            shipping_cost,
            quantity: i64::from(quantity),
        })
    }

    pub fn unit_price(&self) -> Result<i64, ValidationError> {
        current_price(self.price, self.discount)
    }

    pub fn amount(&self) -> Result<i64, ValidationError> {
        self.quantity
            .checked_mul(self.unit_price()?)
            .ok_or(ValidationError::AmountOverflow)
    }
}

/// Aggregated cart or order figures.
///
/// Shipping is charged once per line, whatever the quantity on that line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Totals {
    pub subtotal: i64,
    pub shipping_total: i64,
    pub total: i64,
    pub count: i64,
}

impl Totals {
    /// Adds one line. On overflow the totals are left as they were.
    pub fn push(&mut self, line: &PriceLine) -> Result<(), ValidationError> {
        let subtotal = checked_sum(self.subtotal, line.amount()?)?;
        let shipping_total = checked_sum(self.shipping_total, line.shipping_cost)?;
        let count = checked_sum(self.count, line.quantity)?;
        let total = checked_sum(subtotal, shipping_total)?;
        *self = Totals {
            subtotal,
            shipping_total,
            total,
            count,
        };
        Ok(())
    }

    pub fn from_lines<'a>(
        lines: impl IntoIterator<Item = &'a PriceLine>,
    ) -> Result<Self, ValidationError> {
        let mut totals = Totals::default();
        for line in lines {
            totals.push(line)?;
        }
        Ok(totals)
    }

    /// Attaches the store tax for display. The tax is not part of `total`.
    pub fn with_tax(self, settings: &SiteSettings) -> Result<TaxedTotals, ValidationError> {
        let tax = settings.tax();
        let scaled = (i128::from(self.subtotal) * i128::from(tax)).div_euclid(100);
        let tax_amount = i64::try_from(scaled).map_err(|_| ValidationError::AmountOverflow)?;
        Ok(TaxedTotals {
            subtotal: self.subtotal,
            shipping_total: self.shipping_total,
            total: self.total,
            count: self.count,
            tax,
            tax_amount,
        })
    }
}

fn checked_sum(a: i64, b: i64) -> Result<i64, ValidationError> {
    a.checked_add(b).ok_or(ValidationError::AmountOverflow)
}

/// Totals plus the informational tax figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct TaxedTotals {
    pub subtotal: i64,
    pub shipping_total: i64,
    /// `subtotal + shipping_total`; tax excluded.
    pub total: i64,
    pub count: i64,
    /// Tax rate in percent.
    pub tax: i32,
    pub tax_amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: i64, discount: i32, shipping_cost: i64, quantity: i32) -> PriceLine {
        PriceLine::new(price, discount, shipping_cost, quantity).expect("valid line")
    }

    fn price(price: i64, discount: i32) -> i64 {
        current_price(price, Discount::new(discount).unwrap()).unwrap()
    }

    #[test]
    fn current_price_floors_the_discounted_amount() {
        assert_eq!(price(1000, 10), 900);
        assert_eq!(price(999, 33), 669);
        assert_eq!(price(1000, 0), 1000);
        assert_eq!(price(1000, 100), 0);
    }

    #[test]
    fn discount_above_hundred_is_rejected() {
        assert_eq!(Discount::new(101), Err(ValidationError::DiscountOutOfRange(101)));
        assert_eq!(Discount::new(-1), Err(ValidationError::DiscountOutOfRange(-1)));
        assert!(PriceLine::new(100, 150, 0, 1).is_err());
    }

    #[test]
    fn subtotal_sums_quantity_times_current_price() {
        let totals = Totals::from_lines(&[line(1000, 0, 0, 2), line(500, 20, 0, 1)]).unwrap();

        assert_eq!(totals.subtotal, 2400);
        assert_eq!(totals.count, 3);
        assert_eq!(totals.total, 2400);
    }

    #[test]
    fn shipping_is_charged_per_line_not_per_unit() {
        let totals = Totals::from_lines(&[line(100, 0, 50, 5), line(200, 0, 50, 1)]).unwrap();

        assert_eq!(totals.shipping_total, 100);
        assert_eq!(totals.subtotal, 700);
        assert_eq!(totals.total, 800);
    }

    #[test]
    fn tax_is_reported_but_not_added_to_total() {
        let settings = SiteSettings::new(12).unwrap();
        let taxed = Totals::from_lines(&[line(1000, 0, 50, 1)])
            .unwrap()
            .with_tax(&settings)
            .unwrap();

        assert_eq!(taxed.tax, 12);
        assert_eq!(taxed.tax_amount, 120);
        assert_eq!(taxed.total, 1050);
    }

    #[test]
    fn empty_collection_has_zero_totals() {
        assert_eq!(Totals::from_lines(&[] as &[PriceLine]).unwrap(), Totals::default());
    }

    #[test]
    fn oversized_amounts_fail_instead_of_overflowing() {
        let ten = Discount::new(10).unwrap();
        assert_eq!(
            current_price(i64::MAX / 50, ten),
            Err(ValidationError::AmountOverflow)
        );
        assert_eq!(
            line(i64::MAX / 200, 0, 0, 1000).amount(),
            Err(ValidationError::AmountOverflow)
        );

        let mut totals = Totals::default();
        totals.push(&line(i64::MAX / 100, 0, 0, 60)).unwrap();
        let before = totals;
        assert_eq!(
            totals.push(&line(i64::MAX / 100, 0, 0, 60)),
            Err(ValidationError::AmountOverflow)
        );
        assert_eq!(totals, before);
    }

    #[test]
    fn largest_storable_line_still_prices() {
        let max = line(MAX_PRICE, 0, MAX_PRICE, MAX_LINE_QUANTITY);
        assert_eq!(max.amount(), Ok(MAX_PRICE * i64::from(MAX_LINE_QUANTITY)));

        let totals = Totals::from_lines(&[max]).unwrap();
        let settings = SiteSettings::new(12).unwrap();
        assert!(totals.with_tax(&settings).is_ok());
    }

    #[test]
    fn prices_are_bounded_on_write() {
        assert_eq!(price_in_range("price", MAX_PRICE), Ok(MAX_PRICE));
        assert_eq!(
            price_in_range("price", MAX_PRICE + 1),
            Err(ValidationError::TooLarge("price", MAX_PRICE))
        );
        assert_eq!(
            price_in_range("shipping_cost", -1),
            Err(ValidationError::Negative("shipping_cost"))
        );
    }
}
