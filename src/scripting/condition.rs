//! Scalar predicates: `>N`, `<N`, `N1-N2` (inclusive) or a bare `N` (equal
//! within 0.001). Text that does not parse as a number matches everything.

use serde_json::Value;

use crate::world::view::AttachedData;

const EQUALITY_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarPredicate {
    Any,
    Greater(f64),
    Less(f64),
    Range { min: f64, max: f64 },
    Equal(f64),
}

impl ScalarPredicate {
    pub fn parse(text: Option<&str>) -> Self {
        let Some(text) = text.map(str::trim).filter(|text| !text.is_empty()) else {
            return ScalarPredicate::Any;
        };
        let parsed = if let Some(rest) = text.strip_prefix('>') {
            parse_number(rest).map(ScalarPredicate::Greater)
        } else if let Some(rest) = text.strip_prefix('<') {
            parse_number(rest).map(ScalarPredicate::Less)
        } else if text.contains('-') {
            let mut parts = text.split('-');
            let min = parts.next().and_then(parse_number);
            let max = parts.next().and_then(parse_number);
            match (min, max) {
                (Some(min), Some(max)) => Some(ScalarPredicate::Range { min, max }),
                _ => None,
            }
        } else {
            parse_number(text).map(ScalarPredicate::Equal)
        };
        parsed.unwrap_or(ScalarPredicate::Any)
    }

    pub fn matches(self, value: f64) -> bool {
        match self {
            ScalarPredicate::Any => true,
            ScalarPredicate::Greater(threshold) => value > threshold,
            ScalarPredicate::Less(threshold) => value < threshold,
            ScalarPredicate::Range { min, max } => value >= min && value <= max,
            ScalarPredicate::Equal(expected) => (value - expected).abs() < EQUALITY_TOLERANCE,
        }
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn matches_scalar(value: f64, predicate: Option<&str>) -> bool {
    ScalarPredicate::parse(predicate).matches(value)
}

/// Subset match: every key of `predicate` must be present in `candidate`
/// with the same rendered value. Nested values are compared whole.
pub fn matches_structured(candidate: Option<&AttachedData>, predicate: &AttachedData) -> bool {
    if predicate.is_empty() {
        return true;
    }
    let Some(candidate) = candidate else {
        return false;
    };
    predicate.iter().all(|(key, expected)| {
        candidate
            .get(key)
            .map_or(false, |actual| render_value(actual) == render_value(expected))
    })
}

/// Canonical text form of a data value. Integral floats render like
/// integers so `3` and `3.0` compare equal.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                int.to_string()
            } else if let Some(uint) = number.as_u64() {
                uint.to_string()
            } else {
                let float = number.as_f64().unwrap_or(f64::NAN);
                if float.is_finite() && float.fract() == 0.0 && float.abs() < 1e15 {
                    (float as i64).to_string()
                } else {
                    float.to_string()
                }
            }
        }
        Value::String(text) => text.clone(),
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", rendered.join(","))
        }
        Value::Object(map) => {
            let rendered: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{}:{}", key, render_value(value)))
                .collect();
            format!("{{{}}}", rendered.join(","))
        }
    }
}

pub fn matches_block_name(candidate: &str, predicate: Option<&str>) -> bool {
    match predicate.filter(|predicate| !predicate.is_empty()) {
        None => true,
        Some(predicate) => {
            candidate.contains(predicate) || candidate.eq_ignore_ascii_case(predicate)
        }
    }
}

pub fn matches_entity_name(candidate: &str, predicate: Option<&str>) -> bool {
    predicate
        .filter(|predicate| !predicate.is_empty())
        .map_or(true, |predicate| candidate == predicate)
}

pub fn matches_material(candidate: &str, predicate: Option<&str>) -> bool {
    predicate
        .filter(|predicate| !predicate.is_empty())
        .map_or(true, |predicate| candidate.eq_ignore_ascii_case(predicate))
}
