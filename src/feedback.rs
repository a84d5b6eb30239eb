//! Fixed-point feedback value codec.
//!
//! On-chain, a reputation score is an `int128` plus a decimal exponent:
//! `display = raw / 10^exponent`. The codec keeps decimals exact end to
//! end via [`rust_decimal::Decimal`]; floats never touch the wire format.

use rust_decimal::Decimal;

use crate::error::FeedbackError;

/// Default exponent used when encoding, matching the registry's
/// convention. `encode(88.5)` yields `(88_500_000, 6)`.
pub const DEFAULT_VALUE_DECIMALS: u8 = 6;

/// Largest exponent the decimal representation can carry.
const MAX_VALUE_DECIMALS: u8 = 28;

/// Encode a display value as `(raw, exponent)`.
///
/// Uses [`DEFAULT_VALUE_DECIMALS`] unless the value carries more
/// fractional digits, in which case the exponent grows to fit so the
/// round trip stays lossless for anything this encoder produced.
pub fn encode(value: Decimal) -> Result<(i128, u8), FeedbackError> {
    let scale = value.scale();
    let exponent = scale.max(DEFAULT_VALUE_DECIMALS as u32);
    if exponent > MAX_VALUE_DECIMALS as u32 {
        return Err(FeedbackError::Unrepresentable(value.to_string()));
    }
    let mut rescaled = value;
    rescaled.rescale(exponent);
    if rescaled.scale() != exponent {
        // rescale silently reduces precision when the mantissa would not
        // fit; that would make the round trip lossy, so refuse instead.
        return Err(FeedbackError::Unrepresentable(value.to_string()));
    }
    Ok((rescaled.mantissa(), exponent as u8))
}

/// Decode `(raw, exponent)` back to a display value.
///
/// Counterparties choose their own exponents; anything beyond what the
/// decimal type can hold is rejected rather than approximated.
pub fn decode(raw: i128, exponent: u8) -> Result<Decimal, FeedbackError> {
    if exponent > MAX_VALUE_DECIMALS {
        return Err(FeedbackError::Undecodable { raw, exponent });
    }
    Decimal::try_from_i128_with_scale(raw, exponent as u32)
        .map_err(|_| FeedbackError::Undecodable { raw, exponent })
}

/// Aggregate reputation state for one agent, as read from the registry.
///
/// The raw sum and its exponent are the source of truth; the average is
/// only ever computed at the display boundary so repeated reads at
/// different exponents cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackSummary {
    pub count: u64,
    pub raw_summary: i128,
    pub exponent: u8,
}

impl FeedbackSummary {
    /// Sum of all feedback values as a display decimal.
    pub fn total(&self) -> Result<Decimal, FeedbackError> {
        decode(self.raw_summary, self.exponent)
    }

    /// Average feedback value, or `None` when no feedback exists.
    pub fn average(&self) -> Result<Option<Decimal>, FeedbackError> {
        if self.count == 0 {
            return Ok(None);
        }
        let total = self.total()?;
        Ok(Some(total / Decimal::from(self.count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn default_exponent_encoding() {
        let (raw, exponent) = encode(dec!(88.5)).unwrap();
        assert_eq!(raw, 88_500_000);
        assert_eq!(exponent, 6);
        assert_eq!(decode(raw, exponent).unwrap(), dec!(88.5));
    }

    #[test]
    fn integer_values_use_default_exponent() {
        let (raw, exponent) = encode(dec!(90)).unwrap();
        assert_eq!(raw, 90_000_000);
        assert_eq!(exponent, 6);
    }

    #[test]
    fn high_precision_grows_the_exponent() {
        let value = dec!(0.123456789);
        let (raw, exponent) = encode(value).unwrap();
        assert_eq!(exponent, 9);
        assert_eq!(raw, 123_456_789);
        assert_eq!(decode(raw, exponent).unwrap(), value);
    }

    #[test]
    fn negative_values_round_trip() {
        let value = dec!(-12.25);
        let (raw, exponent) = encode(value).unwrap();
        assert_eq!(raw, -12_250_000);
        assert_eq!(decode(raw, exponent).unwrap(), value);
    }

    #[test]
    fn counterparty_exponent_is_honored() {
        // Exponent 2 chosen by someone else still decodes exactly.
        assert_eq!(decode(8850, 2).unwrap(), dec!(88.50));
    }

    #[test]
    fn absurd_exponent_is_rejected() {
        let err = decode(1, 200).unwrap_err();
        assert!(matches!(err, FeedbackError::Undecodable { exponent: 200, .. }));
    }

    #[test]
    fn summary_average_is_computed_at_the_boundary() {
        let summary = FeedbackSummary {
            count: 4,
            raw_summary: 354_000_000, // 88.5 + 90 + 87.5 + 88 at exponent 6
            exponent: 6,
        };
        assert_eq!(summary.total().unwrap(), dec!(354));
        assert_eq!(summary.average().unwrap(), Some(dec!(88.5)));
    }

    #[test]
    fn empty_summary_has_no_average() {
        let summary = FeedbackSummary { count: 0, raw_summary: 0, exponent: 6 };
        assert_eq!(summary.average().unwrap(), None);
    }
}
