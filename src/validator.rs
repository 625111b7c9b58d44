use crate::value::PrefValue;
use std::fmt::Debug;

/// Optional per-entry constraint applied when a new value is committed.
pub trait ValueValidator: Debug {
    fn is_valid(&self, value: &PrefValue) -> bool;

    /// Closest acceptable value to `value`.
    fn fallback(&self, value: &PrefValue) -> PrefValue;

    fn ensure_valid(&self, value: PrefValue) -> PrefValue {
        if self.is_valid(&value) {
            value
        } else {
            self.fallback(&value)
        }
    }
}

/// Accepts floats within `[min, max]`; anything else is replaced by the default.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatValidator {
    pub default: f64,
    pub min: f64,
    pub max: f64,
}

impl FloatValidator {
    pub fn new(default: f64) -> Self {
        Self::with_range(default, 0.0, f64::from(f32::MAX))
    }

    pub fn with_range(default: f64, min: f64, max: f64) -> Self {
        Self { default, min, max }
    }
}

impl ValueValidator for FloatValidator {
    fn is_valid(&self, value: &PrefValue) -> bool {
        matches!(value, PrefValue::Float(v) if *v >= self.min && *v <= self.max)
    }

    fn fallback(&self, _value: &PrefValue) -> PrefValue {
        PrefValue::Float(self.default)
    }
}

/// Clamps integers into `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntRangeValidator {
    pub min: i64,
    pub max: i64,
}

impl IntRangeValidator {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

impl ValueValidator for IntRangeValidator {
    fn is_valid(&self, value: &PrefValue) -> bool {
        matches!(value, PrefValue::Integer(v) if (self.min..=self.max).contains(v))
    }

    fn fallback(&self, value: &PrefValue) -> PrefValue {
        match value {
            PrefValue::Integer(v) => PrefValue::Integer((*v).clamp(self.min, self.max)),
            _ => PrefValue::Integer(self.min),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FloatValidator, IntRangeValidator, ValueValidator};
    use crate::value::PrefValue;

    #[test]
    fn float_validator_falls_back_to_default() {
        let v = FloatValidator::with_range(1.0, 1.0, 100.0);
        assert_eq!(v.ensure_valid(PrefValue::Float(5.0)), PrefValue::Float(5.0));
        assert_eq!(v.ensure_valid(PrefValue::Float(0.5)), PrefValue::Float(1.0));
        assert_eq!(v.ensure_valid(PrefValue::Float(500.0)), PrefValue::Float(1.0));
        assert_eq!(
            v.ensure_valid(PrefValue::String("x".into())),
            PrefValue::Float(1.0)
        );
    }

    #[test]
    fn default_float_range_rejects_negatives() {
        let v = FloatValidator::new(2.0);
        assert!(v.is_valid(&PrefValue::Float(0.0)));
        assert!(!v.is_valid(&PrefValue::Float(-0.1)));
    }

    #[test]
    fn int_range_validator_clamps() {
        let v = IntRangeValidator::new(0, 10);
        assert_eq!(v.ensure_valid(PrefValue::Integer(42)), PrefValue::Integer(10));
        assert_eq!(v.ensure_valid(PrefValue::Integer(-3)), PrefValue::Integer(0));
        assert_eq!(v.ensure_valid(PrefValue::Integer(7)), PrefValue::Integer(7));
    }
}
