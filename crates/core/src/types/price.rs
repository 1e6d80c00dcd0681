//! Monetary amounts in minor units.

use core::fmt;
use core::iter::Sum;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount in minor units (USD cents).
///
/// Stored and transmitted as a plain integer; `Display` renders the value in
/// major units (`Price::from_cents(1999)` formats as `$19.99`). Cart subtotal
/// and savings arithmetic run on this type, so amounts never pass through
/// floating point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Create a price from an amount in cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount in cents.
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Add two prices, saturating at `i64::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtract `other`, clamping at zero.
    ///
    /// Savings lines use this: a compare-at price below the selling price
    /// contributes nothing rather than a negative amount.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        let diff = self.0.saturating_sub(other.0);
        if diff < 0 { Self::ZERO } else { Self(diff) }
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", Decimal::new(self.0, 2))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let cents = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(cents))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats_major_units() {
        assert_eq!(Price::from_cents(1999).to_string(), "$19.99");
        assert_eq!(Price::from_cents(1500).to_string(), "$15.00");
        assert_eq!(Price::from_cents(5).to_string(), "$0.05");
        assert_eq!(Price::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_sum_of_line_prices() {
        let subtotal: Price = [Price::from_cents(1000), Price::from_cents(500)]
            .into_iter()
            .sum();
        assert_eq!(subtotal, Price::from_cents(1500));
    }

    #[test]
    fn test_saturating_sub_clamps_at_zero() {
        let compare_at = Price::from_cents(1500);
        let price = Price::from_cents(1000);
        assert_eq!(compare_at.saturating_sub(price), Price::from_cents(500));
        assert_eq!(price.saturating_sub(compare_at), Price::ZERO);
    }

    #[test]
    fn test_serde_as_bare_integer() {
        let price = Price::from_cents(1299);
        assert_eq!(serde_json::to_string(&price).unwrap(), "1299");
        let back: Price = serde_json::from_str("1299").unwrap();
        assert_eq!(back, price);
    }

    #[test]
    fn test_ordering() {
        assert!(Price::from_cents(1500) > Price::from_cents(1000));
    }
}
