//! Field element decoding.
//!
//! Proof instances are elements of a prime field encoding signed fixed-point
//! numbers. Values above `2^128 - 1` are the field's representation of
//! negatives (`x - p`), and every value carries `scale_exponent` fractional
//! bits.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, ToPrimitive, Zero};
use once_cell::sync::Lazy;

use crate::error::SpinError;
use crate::types::DecodedVector;

/// Fixed-point scale used by the rotation circuit.
pub const DEFAULT_SCALE_EXPONENT: u32 = 14;

/// BN254 scalar field modulus, hex encoded.
pub const BN254_MODULUS_HEX: &str =
    "30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001";

static BN254_MODULUS: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(BN254_MODULUS_HEX.as_bytes(), 16).expect("valid BN254 modulus")
});

/// Largest numeral still read as a non-negative value.
static NEGATIVE_THRESHOLD: Lazy<BigUint> = Lazy::new(|| (BigUint::one() << 128u32) - 1u32);

/// The BN254 scalar field modulus.
pub fn bn254_modulus() -> &'static BigUint {
    &BN254_MODULUS
}

/// Decode a single numeral. See [`FieldDecoder::decode`].
pub fn decode(numeral: &str, modulus: &BigUint, scale_exponent: u32) -> Result<f64, SpinError> {
    let x = parse_numeral(numeral)?;
    if &x >= modulus {
        return Err(SpinError::MalformedNumeral(format!(
            "{} is not below the field modulus",
            numeral.trim()
        )));
    }

    let signed = if x > *NEGATIVE_THRESHOLD {
        BigInt::from_biguint(Sign::Plus, x) - BigInt::from_biguint(Sign::Plus, modulus.clone())
    } else {
        BigInt::from_biguint(Sign::Plus, x)
    };

    let value = signed
        .to_f64()
        .ok_or_else(|| SpinError::MalformedNumeral(format!("{} overflows f64", numeral.trim())))?;

    Ok(value / 2f64.powi(scale_exponent as i32))
}

/// Decimal or `0x`-prefixed hexadecimal, no sign.
fn parse_numeral(numeral: &str) -> Result<BigUint, SpinError> {
    let trimmed = numeral.trim();
    let (digits, radix) = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(SpinError::MalformedNumeral(format!("{:?}", numeral)));
    }

    BigUint::parse_bytes(digits.as_bytes(), radix)
        .ok_or_else(|| SpinError::MalformedNumeral(format!("{:?}", numeral)))
}

/// Decoder bound to one field and scale.
#[derive(Clone, Debug)]
pub struct FieldDecoder {
    modulus: BigUint,
    scale_exponent: u32,
}

impl FieldDecoder {
    pub fn new(modulus: BigUint, scale_exponent: u32) -> Self {
        Self {
            modulus,
            scale_exponent,
        }
    }

    /// Decoder over the BN254 scalar field.
    pub fn bn254(scale_exponent: u32) -> Self {
        Self::new(bn254_modulus().clone(), scale_exponent)
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn scale_exponent(&self) -> u32 {
        self.scale_exponent
    }

    /// Convert a field numeral into a signed real.
    ///
    /// Fails with [`SpinError::MalformedNumeral`] when the numeral does not
    /// parse or is not below the modulus.
    pub fn decode(&self, numeral: &str) -> Result<f64, SpinError> {
        decode(numeral, &self.modulus, self.scale_exponent)
    }

    /// Decode the last four instances of a proof into the next orientation.
    pub fn decode_tail(&self, instances: &[String]) -> Result<DecodedVector, SpinError> {
        if instances.len() < 4 {
            return Err(SpinError::MalformedResponse(format!(
                "expected at least 4 instances, got {}",
                instances.len()
            )));
        }

        let tail = &instances[instances.len() - 4..];
        Ok(DecodedVector([
            self.decode(&tail[0])?,
            self.decode(&tail[1])?,
            self.decode(&tail[2])?,
            self.decode(&tail[3])?,
        ]))
    }

    /// Encode a real as the field numeral the circuit would emit for it.
    pub fn encode(&self, value: f64) -> String {
        let scaled = (value * 2f64.powi(self.scale_exponent as i32)).round();
        let magnitude = BigUint::from(scaled.abs() as u128);
        if scaled < 0.0 && !magnitude.is_zero() {
            (&self.modulus - magnitude).to_string()
        } else {
            magnitude.to_string()
        }
    }
}

impl Default for FieldDecoder {
    fn default() -> Self {
        Self::bn254(DEFAULT_SCALE_EXPONENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p() -> BigUint {
        bn254_modulus().clone()
    }

    #[test]
    fn test_positive_values_are_descaled() {
        let decoder = FieldDecoder::default();
        assert_eq!(decoder.decode("16384").unwrap(), 1.0);
        assert_eq!(decoder.decode("8192").unwrap(), 0.5);
        assert_eq!(decoder.decode("0").unwrap(), 0.0);
    }

    #[test]
    fn test_hex_numerals() {
        let decoder = FieldDecoder::default();
        assert_eq!(decoder.decode("0x4000").unwrap(), 1.0);
        assert_eq!(decoder.decode("0X2000").unwrap(), 0.5);
    }

    #[test]
    fn test_negative_values_wrap_around_modulus() {
        let decoder = FieldDecoder::default();
        let minus_one = (p() - 16384u32).to_string();
        assert_eq!(decoder.decode(&minus_one).unwrap(), -1.0);
    }

    #[test]
    fn test_threshold_boundary() {
        let threshold = (BigUint::one() << 128u32) - 1u32;
        let at = decode(&threshold.to_string(), &p(), 0).unwrap();
        assert!(at > 0.0);

        let above = decode(&(threshold + 1u32).to_string(), &p(), 0).unwrap();
        assert!(above < 0.0);
    }

    #[test]
    fn test_rejects_malformed() {
        let decoder = FieldDecoder::default();
        for bad in ["", "abc", "-5", "1.5", "0x", "12a", " "] {
            assert!(
                matches!(decoder.decode(bad), Err(SpinError::MalformedNumeral(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_rejects_values_outside_field() {
        let decoder = FieldDecoder::default();
        assert!(decoder.decode(&p().to_string()).is_err());
        assert!(decoder.decode(&(p() + 1u32).to_string()).is_err());
    }

    #[test]
    fn test_encode_matches_circuit_rounding() {
        let decoder = FieldDecoder::default();
        assert_eq!(decoder.encode(1.0), "16384");
        assert_eq!(decoder.encode(0.707), "11583");
        assert_eq!(decoder.encode(-1.0), (p() - 16384u32).to_string());
        assert_eq!(decoder.encode(-0.0), "0");
        assert_eq!(decoder.decode(&decoder.encode(-0.707)).unwrap(), -11583.0 / 16384.0);
    }

    #[test]
    fn test_decode_tail_uses_last_four() {
        let decoder = FieldDecoder::default();
        let instances: Vec<String> = ["999", "16384", "8192", "0", "4096"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let decoded = decoder.decode_tail(&instances).unwrap();
        assert_eq!(decoded.0, [1.0, 0.5, 0.0, 0.25]);
    }

    #[test]
    fn test_decode_tail_requires_four() {
        let decoder = FieldDecoder::default();
        let instances = vec!["1".to_string(); 3];
        assert!(matches!(
            decoder.decode_tail(&instances),
            Err(SpinError::MalformedResponse(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_small_values_keep_sign(x in any::<u128>(), s in 0u32..32) {
            let decoded = decode(&x.to_string(), &p(), s).unwrap();
            prop_assert!(decoded >= 0.0);
            prop_assert_eq!(decoded, (x as f64) / 2f64.powi(s as i32));
        }

        #[test]
        fn prop_large_values_are_negative(offset in 1u128..u128::MAX, s in 0u32..32) {
            // p - offset lies above the threshold for every u128 offset
            let x = p() - BigUint::from(offset);
            let decoded = decode(&x.to_string(), &p(), s).unwrap();
            prop_assert!(decoded < 0.0);
            prop_assert_eq!(decoded, -(offset as f64) / 2f64.powi(s as i32));
        }
    }
}
