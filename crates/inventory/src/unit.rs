//! Units of measure and conversion lookups.
//!
//! Fabric is bought by the roll or bale and sold by the meter or yard, so every
//! item has a stock unit and document lines may be entered in another unit.

use core::str::FromStr;
use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loomerp_core::{DomainError, DomainResult};

/// Unit symbol (upper-cased, e.g. `MTR`, `YRD`, `ROLL`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitCode(String);

impl UnitCode {
    pub fn new(value: impl AsRef<str>) -> DomainResult<Self> {
        let code = value.as_ref().trim();
        if code.is_empty() {
            return Err(DomainError::validation("unit code cannot be empty"));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::validation(format!(
                "unit code must be alphanumeric: {code}"
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for UnitCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UnitCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UnitCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitCode> for String {
    fn from(value: UnitCode) -> Self {
        value.0
    }
}

/// `1 from = factor × to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConversion {
    pub from: UnitCode,
    pub to: UnitCode,
    pub factor: Decimal,
}

/// Smallest accepted conversion factor.
pub const MIN_CONVERSION_FACTOR: Decimal = Decimal::from_parts(1, 0, 0, false, 6);
/// Largest accepted conversion factor. Bounding both ends keeps the inverse in range too.
pub const MAX_CONVERSION_FACTOR: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

impl UnitConversion {
    pub fn new(from: UnitCode, to: UnitCode, factor: Decimal) -> DomainResult<Self> {
        if factor <= Decimal::ZERO {
            return Err(DomainError::validation("conversion factor must be positive"));
        }
        if factor < MIN_CONVERSION_FACTOR || factor > MAX_CONVERSION_FACTOR {
            return Err(DomainError::validation(format!(
                "conversion factor must be between {MIN_CONVERSION_FACTOR} \
                 and {MAX_CONVERSION_FACTOR}"
            )));
        }
        if from == to {
            return Err(DomainError::validation(
                "conversion must be between two different units",
            ));
        }
        Ok(Self { from, to, factor })
    }
}

/// Lookup table over registered conversions.
///
/// Each pair is stored once; the inverse direction is derived on lookup.
#[derive(Debug, Clone, Default)]
pub struct UnitConversionTable {
    factors: HashMap<(UnitCode, UnitCode), Decimal>,
}

impl UnitConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_conversions(conversions: impl IntoIterator<Item = UnitConversion>) -> Self {
        let mut table = Self::new();
        for c in conversions {
            table.insert(c);
        }
        table
    }

    /// Register (or replace) a conversion.
    pub fn insert(&mut self, conversion: UnitConversion) {
        // Drop a previously stored inverse so lookups never see two answers.
        self.factors
            .remove(&(conversion.to.clone(), conversion.from.clone()));
        self.factors
            .insert((conversion.from, conversion.to), conversion.factor);
    }

    /// Multiplier taking a quantity in `from` to a quantity in `to`.
    pub fn factor(&self, from: &UnitCode, to: &UnitCode) -> DomainResult<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        if let Some(f) = self.factors.get(&(from.clone(), to.clone())) {
            return Ok(*f);
        }
        if let Some(f) = self.factors.get(&(to.clone(), from.clone())) {
            return Decimal::ONE.checked_div(*f).ok_or_else(|| {
                DomainError::validation(format!("conversion from {to} to {from} has no inverse"))
            });
        }
        Err(DomainError::validation(format!(
            "no conversion from {from} to {to}"
        )))
    }

    /// Convert `quantity`; a result outside the decimal range is a validation error.
    pub fn convert(
        &self,
        quantity: Decimal,
        from: &UnitCode,
        to: &UnitCode,
    ) -> DomainResult<Decimal> {
        let factor = self.factor(from, to)?;
        quantity
            .checked_mul(factor)
            .map(|q| q.normalize())
            .ok_or_else(|| {
                DomainError::validation(format!("{quantity} {from} is out of range in {to}"))
            })
    }

    pub fn conversions(&self) -> Vec<UnitConversion> {
        let mut out: Vec<_> = self
            .factors
            .iter()
            .map(|((from, to), factor)| UnitConversion {
                from: from.clone(),
                to: to.clone(),
                factor: *factor,
            })
            .collect();
        out.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn unit(s: &str) -> UnitCode {
        UnitCode::new(s).unwrap()
    }

    fn table() -> UnitConversionTable {
        UnitConversionTable::from_conversions([
            UnitConversion::new(unit("roll"), unit("mtr"), dec!(50)).unwrap(),
            UnitConversion::new(unit("yrd"), unit("mtr"), dec!(0.9144)).unwrap(),
        ])
    }

    #[test]
    fn unit_codes_are_upper_cased() {
        assert_eq!(unit(" mtr ").as_str(), "MTR");
        assert!(UnitCode::new("").is_err());
        assert!(UnitCode::new("m t").is_err());
    }

    #[test]
    fn identity_direct_and_inverse_lookups() {
        let t = table();
        assert_eq!(t.factor(&unit("MTR"), &unit("MTR")).unwrap(), Decimal::ONE);
        assert_eq!(t.convert(dec!(3), &unit("ROLL"), &unit("MTR")).unwrap(), dec!(150));
        assert_eq!(t.convert(dec!(100), &unit("MTR"), &unit("ROLL")).unwrap(), dec!(2));
    }

    #[test]
    fn missing_conversion_is_a_validation_error() {
        let err = table().factor(&unit("ROLL"), &unit("YRD")).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("no conversion from ROLL to YRD")
        );
    }

    #[test]
    fn inserting_the_inverse_replaces_the_pair() {
        let mut t = table();
        t.insert(UnitConversion::new(unit("MTR"), unit("ROLL"), dec!(0.025)).unwrap());
        assert_eq!(t.convert(dec!(80), &unit("MTR"), &unit("ROLL")).unwrap(), dec!(2));
        assert_eq!(t.convert(dec!(2), &unit("ROLL"), &unit("MTR")).unwrap(), dec!(80));
        assert_eq!(t.conversions().len(), 2);
    }

    #[test]
    fn factor_must_be_positive_and_units_distinct() {
        assert!(UnitConversion::new(unit("ROLL"), unit("MTR"), Decimal::ZERO).is_err());
        assert!(UnitConversion::new(unit("MTR"), unit("MTR"), dec!(1)).is_err());
    }

    #[test]
    fn factor_is_bounded() {
        assert!(UnitConversion::new(unit("BALE"), unit("MTR"), MAX_CONVERSION_FACTOR).is_ok());
        assert!(UnitConversion::new(unit("BALE"), unit("MTR"), MIN_CONVERSION_FACTOR).is_ok());
        assert!(UnitConversion::new(unit("BALE"), unit("MTR"), dec!(1000000000)).is_err());
        assert!(UnitConversion::new(unit("BALE"), unit("MTR"), dec!(0.0000001)).is_err());
    }

    #[test]
    fn out_of_range_conversion_is_a_validation_error() {
        let t = UnitConversionTable::from_conversions([UnitConversion::new(
            unit("BALE"),
            unit("MTR"),
            MAX_CONVERSION_FACTOR,
        )
        .unwrap()]);

        let err = t
            .convert(dec!(100000000000000000000000), &unit("BALE"), &unit("MTR"))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
