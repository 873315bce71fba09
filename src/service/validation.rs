//! Request validation from per-field rules.

use crate::error::AppError;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Email,
    Uuid,
    Timestamp,
}

/// Constraints for one body field. Built as consts next to each model.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValidationRule {
    pub required: bool,
    pub format: Option<Format>,
    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
    pub pattern: Option<&'static str>,
    pub allowed: Option<&'static [&'static str]>,
}

impl ValidationRule {
    pub const fn optional() -> Self {
        ValidationRule {
            required: false,
            format: None,
            max_length: None,
            min_length: None,
            pattern: None,
            allowed: None,
        }
    }

    pub const fn required() -> Self {
        ValidationRule {
            required: true,
            ..Self::optional()
        }
    }

    pub const fn max_length(self, n: usize) -> Self {
        ValidationRule {
            max_length: Some(n),
            ..self
        }
    }

    pub const fn min_length(self, n: usize) -> Self {
        ValidationRule {
            min_length: Some(n),
            ..self
        }
    }

    pub const fn format(self, f: Format) -> Self {
        ValidationRule { format: Some(f), ..self }
    }

    pub const fn pattern(self, p: &'static str) -> Self {
        ValidationRule {
            pattern: Some(p),
            ..self
        }
    }

    pub const fn allowed(self, values: &'static [&'static str]) -> Self {
        ValidationRule {
            allowed: Some(values),
            ..self
        }
    }
}

pub type Rules = &'static [(&'static str, ValidationRule)];

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against per-field rules. All required fields must be present.
    pub fn validate(body: &Map<String, Value>, rules: Rules) -> Result<(), AppError> {
        for (field, rule) in rules {
            let val = body.get(*field);
            if rule.required && val.map(is_blank).unwrap_or(true) {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
            if let Some(v) = val {
                validate_field(field, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for updates). Required fields may be
    /// omitted but not blanked.
    pub fn validate_partial(body: &Map<String, Value>, rules: Rules) -> Result<(), AppError> {
        for (field, v) in body {
            if let Some((_, rule)) = rules.iter().find(|(name, _)| *name == field.as_str()) {
                if rule.required && is_blank(v) {
                    return Err(AppError::Validation(format!("{} cannot be empty", field)));
                }
                validate_field(field, v, rule)?;
            }
        }
        Ok(())
    }
}

/// Keep only keys that have a rule. Unknown fields never reach the store.
pub fn retain_known(body: &mut Map<String, Value>, rules: Rules) {
    body.retain(|k, _| rules.iter().any(|(name, _)| *name == k.as_str()));
}

/// Trim surrounding whitespace from every string value.
pub fn trim_strings(body: &mut Map<String, Value>) {
    for v in body.values_mut() {
        if let Value::String(s) = v {
            let t = s.trim();
            if t.len() != s.len() {
                *s = t.to_string();
            }
        }
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn validate_field(field: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    let Some(s) = v.as_str() else {
        return Err(AppError::Validation(format!("{} must be a string", field)));
    };
    if let Some(format) = rule.format {
        validate_format(field, s, format)?;
    }
    if let Some(max) = rule.max_length {
        if s.chars().count() > max {
            return Err(AppError::Validation(format!(
                "{} must be at most {} characters",
                field, max
            )));
        }
    }
    if let Some(min) = rule.min_length {
        if s.chars().count() < min {
            return Err(AppError::Validation(format!(
                "{} must be at least {} characters",
                field, min
            )));
        }
    }
    if let Some(pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| AppError::Internal(format!("invalid pattern for {}", field)))?;
        if !re.is_match(s) {
            return Err(AppError::Validation(format!("{} does not match required pattern", field)));
        }
    }
    if let Some(allowed) = rule.allowed {
        if !allowed.contains(&s) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {}",
                field,
                allowed.join(", ")
            )));
        }
    }
    Ok(())
}

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

fn validate_format(field: &str, s: &str, format: Format) -> Result<(), AppError> {
    let ok = match format {
        Format::Email => email_regex().is_some_and(|re| re.is_match(s)),
        Format::Uuid => uuid::Uuid::parse_str(s).is_ok(),
        Format::Timestamp => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
    };
    if ok {
        Ok(())
    } else {
        let what = match format {
            Format::Email => "a valid email",
            Format::Uuid => "a valid id",
            Format::Timestamp => "an RFC 3339 timestamp",
        };
        Err(AppError::Validation(format!("{} must be {}", field, what)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: Rules = &[
        ("name", ValidationRule::required().max_length(5)),
        ("email", ValidationRule::optional().format(Format::Email)),
        ("role", ValidationRule::optional().allowed(&["user", "admin"])),
        ("postalcode", ValidationRule::optional().pattern(r"^\d+$")),
    ];

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn required_and_lengths() {
        assert!(RequestValidator::validate(&obj(json!({"name": "abc"})), RULES).is_ok());
        assert!(RequestValidator::validate(&obj(json!({})), RULES).is_err());
        assert!(RequestValidator::validate(&obj(json!({"name": "   "})), RULES).is_err());
        assert!(RequestValidator::validate(&obj(json!({"name": "abcdef"})), RULES).is_err());
    }

    #[test]
    fn formats_and_enums() {
        assert!(RequestValidator::validate(&obj(json!({"name": "a", "email": "nope"})), RULES).is_err());
        assert!(RequestValidator::validate(&obj(json!({"name": "a", "email": "a@b.co"})), RULES).is_ok());
        assert!(RequestValidator::validate(&obj(json!({"name": "a", "role": "root"})), RULES).is_err());
        assert!(RequestValidator::validate(&obj(json!({"name": "a", "postalcode": "12a"})), RULES).is_err());
        assert!(RequestValidator::validate(&obj(json!({"name": 7})), RULES).is_err());
    }

    #[test]
    fn email_pattern_is_compiled_once() {
        let first = email_regex().unwrap() as *const Regex;
        let second = email_regex().unwrap() as *const Regex;
        assert_eq!(first, second);
    }

    #[test]
    fn partial_skips_missing_but_rejects_blank() {
        assert!(RequestValidator::validate_partial(&obj(json!({"email": "a@b.co"})), RULES).is_ok());
        assert!(RequestValidator::validate_partial(&obj(json!({"name": ""})), RULES).is_err());
    }

    #[test]
    fn retain_and_trim() {
        let mut body = obj(json!({"name": "  x  ", "$where": "1", "other": 1}));
        retain_known(&mut body, RULES);
        trim_strings(&mut body);
        assert_eq!(Value::Object(body), json!({"name": "x"}));
    }
}
