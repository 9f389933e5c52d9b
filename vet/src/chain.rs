//! The per-key validation chain.
//!
//! A [Validator](Validator) is a thin stateful handle over one slot of the
//! request's shared [ValueBag](crate::ValueBag). Each chain method either
//! asserts something about the current value or replaces it with a coerced
//! form; the first failing assertion ends the chain with a
//! [ValidationError](ValidationError).
//!
//! Everything is layered on a small core: [check](Validator::check),
//! [check_not](Validator::check_not), [check_pred](Validator::check_pred),
//! [check_not_pred](Validator::check_not_pred), [tap](Validator::tap) and
//! its infallible sibling [apply](Validator::apply). The optional-state
//! guard sits in front of every chain method except
//! [optional](Validator::optional) and [required](Validator::required)
//! themselves, so `.optional()` on a missing value silently skips the rest
//! of the chain.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::Regex;

use crate::error::{Error, ValidationError};
use crate::predicates::{self, UuidVersion};
use crate::value::{Value, ValueBag};

// The uniform optional-state guard: gated methods no-op while the chain is
// optional. Applied at the top of every gated method body.
macro_rules! gated {
    ($self:ident) => {
        if $self.is_optional() {
            return Ok($self);
        }
    };
    ($self:ident, infallible) => {
        if $self.is_optional() {
            return $self;
        }
    };
}

/// The chain object for one key of one request.
///
/// Instances are memoized per key by the [Binding](crate::Binding), handed
/// out as `Rc`, and alias the request's shared bag: a write through any
/// reference for a key is immediately visible to every other reference.
/// `C` is the enclosing request context, passed by reference into every
/// user-supplied predicate and transform.
pub struct Validator<C> {
    ctx: Weak<C>,
    key: String,
    vals: Rc<RefCell<ValueBag>>,
    optional: Cell<bool>,
}

impl<C> std::fmt::Debug for Validator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("key", &self.key)
            .field("vals", &self.vals)
            .field("optional", &self.optional)
            .finish()
    }
}

impl<C> Validator<C> {
    /// Create a chain for `key`, immediately writing `initial` into the
    /// shared bag so the key is observably present even when the value is
    /// undefined.
    pub fn new(
        ctx: Weak<C>,
        key: impl Into<String>,
        initial: Value,
        vals: Rc<RefCell<ValueBag>>,
    ) -> Self {
        let key = key.into();
        vals.borrow_mut().insert(key.clone(), initial);
        Validator {
            ctx,
            key,
            vals,
            optional: Cell::new(false),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value for the key, read live from the shared bag. Never
    /// cached, so external writes between chain calls are observed.
    pub fn val(&self) -> Value {
        self.vals.borrow().value(&self.key)
    }

    /// Replace the bag entry for the key.
    pub fn set(&self, value: impl Into<Value>) -> &Self {
        self.vals.borrow_mut().insert(self.key.clone(), value);
        self
    }

    fn request(&self) -> Rc<C> {
        // The registry holding this validator lives inside the request
        // binding, which also owns the context, so an upgrade can only fail
        // after the request is gone.
        self.ctx
            .upgrade()
            .expect("request context dropped while validating")
    }

    fn fail(&self, tip: Option<&str>) -> ValidationError {
        let message = match tip {
            Some(tip) => tip.to_string(),
            None => format!("Invalid value for {}", self.key),
        };
        ValidationError::new(self.key.clone(), message)
    }

    /// Arm the optional state when no usable value was supplied: undefined,
    /// or a string that trims to nothing. A blank string also removes the
    /// key from the bag entirely.
    pub fn optional(&self) -> &Self {
        match self.val() {
            Value::String(s) if s.trim().is_empty() => {
                self.vals.borrow_mut().remove(&self.key);
                self.optional.set(true);
            }
            Value::Undefined => self.optional.set(true),
            _ => {}
        }
        self
    }

    /// Whether the chain is currently skipping gated methods.
    ///
    /// Re-evaluated on every read, not latched: the state flips back to
    /// active as soon as the value is observed defined and non-blank, even
    /// if the write came from another reference to the same key.
    pub fn is_optional(&self) -> bool {
        if self.optional.get() {
            match self.val() {
                Value::String(s) if s.trim().is_empty() => {}
                Value::Undefined => {}
                _ => self.optional.set(false),
            }
        }
        self.optional.get()
    }

    ////////////////////////////////////////////////////////////
    // Core methods.
    //
    // Everything below the fold is built on top of these.
    ////////////////////////////////////////////////////////////

    /// Fail the chain unless `result` holds.
    pub fn check(&self, result: bool, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        if !result {
            return Err(self.fail(tip));
        }
        Ok(self)
    }

    /// Inverse of [check](Self::check): fail if `result` holds.
    pub fn check_not(&self, result: bool, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        if result {
            return Err(self.fail(tip));
        }
        Ok(self)
    }

    /// Pipe the current value through `pred`; the chain fails unless it
    /// returns true. The request context rides along for predicates that
    /// need ambient state.
    pub fn check_pred<F>(&self, pred: F, tip: Option<&str>) -> Result<&Self, ValidationError>
    where
        F: FnOnce(&C, &Value) -> bool,
    {
        gated!(self);
        let ctx = self.request();
        let value = self.val();
        self.check(pred(&ctx, &value), tip)
    }

    /// Fail if `pred` returns true for the current value.
    pub fn check_not_pred<F>(&self, pred: F, tip: Option<&str>) -> Result<&Self, ValidationError>
    where
        F: FnOnce(&C, &Value) -> bool,
    {
        gated!(self);
        let ctx = self.request();
        let value = self.val();
        self.check_not(pred(&ctx, &value), tip)
    }

    /// Arbitrarily transform the current value; whatever the closure
    /// returns becomes the new value.
    ///
    /// A [Validation](Error::Validation) failure inside the closure is
    /// re-raised as a fresh error for this chain's key and tip; the inner
    /// message is discarded. Anything else propagates unchanged as
    /// [Fatal](Error::Fatal).
    pub fn tap<F>(&self, f: F, tip: Option<&str>) -> Result<&Self, Error>
    where
        F: FnOnce(&C, Value) -> Result<Value, Error>,
    {
        gated!(self);
        let ctx = self.request();
        match f(&ctx, self.val()) {
            Ok(value) => {
                self.set(value);
                Ok(self)
            }
            Err(Error::Validation(_)) => Err(Error::Validation(self.fail(tip))),
            Err(err) => Err(err),
        }
    }

    /// [tap](Self::tap) for transforms that cannot fail.
    pub fn apply<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&C, Value) -> Value,
    {
        gated!(self, infallible);
        let ctx = self.request();
        let value = f(&ctx, self.val());
        self.set(value);
        self
    }

    ////////////////////////////////////////////////////////////
    // General built-in methods.
    ////////////////////////////////////////////////////////////

    /// The value cannot be undefined. Defined-but-falsy values pass.
    pub fn required(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        let default = format!("{} is required", self.key);
        let tip = tip.unwrap_or(&default);
        self.check_not_pred(|_, v| v.is_undefined(), Some(tip))
    }

    /// Membership in `options` under strict value equality.
    pub fn is_in<I, T>(&self, options: I, tip: Option<&str>) -> Result<&Self, ValidationError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let options: Vec<Value> = options.into_iter().map(Into::into).collect();
        self.check_pred(move |_, v| options.contains(v), tip)
    }

    /// The value must not be one of `options`.
    pub fn is_not_in<I, T>(&self, options: I, tip: Option<&str>) -> Result<&Self, ValidationError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let options: Vec<Value> = options.into_iter().map(Into::into).collect();
        self.check_not_pred(move |_, v| options.contains(v), tip)
    }

    pub fn is_array(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        let default = format!("{} must be an array", self.key);
        let tip = tip.unwrap_or(&default);
        self.check_pred(|_, v| v.is_array(), Some(tip))
    }

    /// Strict equality with `other`.
    pub fn equals(&self, other: impl Into<Value>, tip: Option<&str>) -> Result<&Self, ValidationError> {
        let other = other.into();
        self.check_pred(move |_, v| *v == other, tip)
    }

    /// The numeric value must exceed `other`. Both sides being numbers is a
    /// caller precondition.
    pub fn gt(&self, other: f64, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        debug_assert!(self.val().is_number());
        self.check_pred(move |_, v| v.as_number().is_some_and(|n| n > other), tip)
    }

    pub fn gte(&self, other: f64, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        debug_assert!(self.val().is_number());
        self.check_pred(move |_, v| v.as_number().is_some_and(|n| n >= other), tip)
    }

    pub fn lt(&self, other: f64, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        debug_assert!(self.val().is_number());
        self.check_pred(move |_, v| v.as_number().is_some_and(|n| n < other), tip)
    }

    pub fn lte(&self, other: f64, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        debug_assert!(self.val().is_number());
        self.check_pred(move |_, v| v.as_number().is_some_and(|n| n <= other), tip)
    }

    /// Length (characters for strings, elements for arrays) within
    /// `min..=max` inclusive. `min <= max` is a caller precondition.
    pub fn is_length(
        &self,
        min: usize,
        max: usize,
        tip: Option<&str>,
    ) -> Result<&Self, ValidationError> {
        gated!(self);
        debug_assert!(min <= max);
        debug_assert!(self.val().length().is_some());
        let default = format!("{} must be {}-{} characters long", self.key, min, max);
        let tip = tip.unwrap_or(&default);
        self.check_pred(|_, v| v.length().is_some_and(|len| len >= min), Some(tip))?;
        self.check_pred(|_, v| v.length().is_some_and(|len| len <= max), Some(tip))?;
        Ok(self)
    }

    /// Fill in `value` when the current value is undefined. Optionality is
    /// not re-examined afterwards.
    pub fn default_to(&self, value: impl Into<Value>) -> &Self {
        gated!(self, infallible);
        if self.val().is_undefined() {
            self.set(value);
        }
        self
    }

    /// Like [default_to](Self::default_to), computing the fallback from the
    /// request context.
    pub fn default_to_with<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&C) -> Value,
    {
        gated!(self, infallible);
        if self.val().is_undefined() {
            let ctx = self.request();
            let value = f(&ctx);
            self.set(value);
        }
        self
    }

    pub fn is_string(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        let default = format!("{} must be a string", self.key);
        let tip = tip.unwrap_or(&default);
        self.check_pred(|_, v| v.is_string(), Some(tip))
    }

    /// The value must already be an integral number within the safe range.
    pub fn is_int(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        let integral = format!("{} must be an integer", self.key);
        self.check_pred(
            |_, v| v.as_number().is_some_and(predicates::is_integer),
            Some(tip.unwrap_or(&integral)),
        )?;
        let range = format!("{} is out of integer range", self.key);
        self.check_pred(
            |_, v| v.as_number().is_some_and(predicates::in_safe_range),
            Some(tip.unwrap_or(&range)),
        )?;
        Ok(self)
    }

    /// Parse the value as a full integer literal and replace it with the
    /// parsed number.
    ///
    /// Stricter than a lenient numeric parse: `"5abc"` is rejected even
    /// though a prefix parse would yield 5, and the result must lie within
    /// the safe-integer range.
    pub fn to_int(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        let default = format!("{} must be an integer", self.key);
        self.check_pred(
            |_, v| predicates::is_int_string(v),
            Some(tip.unwrap_or(&default)),
        )?;
        let range = format!("{} is out of integer range", self.key);
        let parsed = match predicates::parse_int(&self.val()) {
            Some(n) => n,
            None => return Err(self.fail(Some(tip.unwrap_or(&range)))),
        };
        self.check(predicates::in_safe_range(parsed), Some(tip.unwrap_or(&range)))?;
        self.set(parsed);
        Ok(self)
    }

    /// A finite number: NaN, the infinities and non-numbers all fail.
    pub fn is_finite_number(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        let default = format!("{} must be a number", self.key);
        let tip = tip.unwrap_or(&default);
        self.check_pred(|_, v| v.as_number().is_some_and(f64::is_finite), Some(tip))
    }

    /// Wrap the value in a singleton array unless it already is one; an
    /// undefined value becomes the empty array. Idempotent, never fails.
    pub fn to_array(&self) -> &Self {
        gated!(self, infallible);
        self.default_to(Value::Array(Vec::new()));
        self.apply(|_, v| match v {
            Value::Array(_) => v,
            other => Value::Array(vec![other]),
        })
    }

    /// Coerce to an array, then parse every element as a safe-range
    /// integer. One bad element fails the whole operation.
    pub fn to_ints(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        self.to_array();
        let default = format!("{} must be an array of integers", self.key);
        self.check_pred(
            |_, v| match v {
                Value::Array(items) => items.iter().all(predicates::is_int_string),
                _ => false,
            },
            Some(tip.unwrap_or(&default)),
        )?;
        let parsed: Option<Vec<f64>> = match self.val() {
            Value::Array(items) => items.iter().map(predicates::parse_int).collect(),
            _ => None,
        };
        let parsed = match parsed {
            Some(numbers) => numbers,
            None => return Err(self.fail(Some(tip.unwrap_or(&default)))),
        };
        let range = format!("{} must not contain numbers out of integer range", self.key);
        self.check(
            parsed.iter().copied().all(predicates::in_safe_range),
            Some(tip.unwrap_or(&range)),
        )?;
        self.set(Value::Array(parsed.into_iter().map(Value::Number).collect()));
        Ok(self)
    }

    /// Drop duplicate elements, keeping first occurrences. An array value
    /// is a caller precondition.
    pub fn uniq(&self) -> &Self {
        gated!(self, infallible);
        debug_assert!(self.val().is_array());
        self.apply(|_, v| match v {
            Value::Array(items) => {
                let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Value::Array(unique)
            }
            other => other,
        })
    }

    /// Unconditional truthiness coercion; never fails.
    pub fn to_boolean(&self) -> &Self {
        self.apply(|_, v| Value::Bool(v.truthy()))
    }

    /// Parse a plain decimal numeral. Exponents and the literal infinities
    /// are rejected; use [to_float](Self::to_float) to accept them.
    pub fn to_decimal(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        let default = format!("{} must be a decimal number", self.key);
        let tip = tip.unwrap_or(&default);
        self.check_pred(|_, v| predicates::is_decimal_string(v), Some(tip))?;
        match predicates::parse_float(&self.val()) {
            Some(n) => {
                self.set(n);
                Ok(self)
            }
            None => Err(self.fail(Some(tip))),
        }
    }

    /// Parse anything a float parse would fully consume, including
    /// scientific notation and `Infinity`/`-Infinity`. Trailing garbage
    /// still fails: `"5.67abc"` is rejected, not truncated to 5.67.
    pub fn to_float(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        let default = format!("{} must be a float", self.key);
        let tip = tip.unwrap_or(&default);
        self.check_pred(|_, v| predicates::is_float_string(v), Some(tip))?;
        match predicates::parse_float(&self.val()) {
            Some(n) => {
                self.set(n);
                Ok(self)
            }
            None => Err(self.fail(Some(tip))),
        }
    }

    /// [to_float](Self::to_float) followed by
    /// [is_finite_number](Self::is_finite_number).
    pub fn to_finite_float(&self) -> Result<&Self, ValidationError> {
        self.to_float(None)?.is_finite_number(None)
    }

    /// Replace the value with its string form; falsy values become the
    /// empty string. Never fails.
    pub fn stringify(&self) -> &Self {
        self.apply(|_, v| {
            if v.truthy() {
                Value::String(v.to_string())
            } else {
                Value::String(String::new())
            }
        })
    }

    /// Strip leading and trailing whitespace. A string value is a caller
    /// precondition.
    pub fn trim(&self) -> &Self {
        gated!(self, infallible);
        debug_assert!(self.val().is_string());
        self.apply(|_, v| match v {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        })
    }

    /// The string value must match `pattern`.
    pub fn is_match(&self, pattern: &Regex, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        debug_assert!(self.val().is_string());
        self.check_pred(|_, v| v.as_str().is_some_and(|s| pattern.is_match(s)), tip)
    }

    /// The string value must not match `pattern`.
    pub fn not_match(&self, pattern: &Regex, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        debug_assert!(self.val().is_string());
        self.check_not_pred(|_, v| v.as_str().is_some_and(|s| pattern.is_match(s)), tip)
    }

    /// Parse the string value as JSON, replacing it with the parsed value.
    pub fn from_json(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        debug_assert!(self.val().is_string());
        let default = format!("Invalid JSON for {}", self.key);
        let tip = tip.unwrap_or(&default);
        let text = match self.val() {
            Value::String(s) => s,
            _ => return Err(self.fail(Some(tip))),
        };
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(parsed) => {
                self.set(Value::from(parsed));
                Ok(self)
            }
            Err(_) => Err(self.fail(Some(tip))),
        }
    }

    /// Like [from_json](Self::from_json) but only verifies parseability;
    /// the value is left untouched.
    pub fn is_json(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        let default = format!("{} must be JSON", self.key);
        let tip = tip.unwrap_or(&default);
        self.is_string(Some(tip))?;
        let parses = self
            .val()
            .as_str()
            .is_some_and(|s| serde_json::from_str::<serde_json::Value>(s).is_ok());
        self.check(parses, Some(tip))
    }

    ////////////////////////////////////////////////////////////
    // Format-specific methods.
    ////////////////////////////////////////////////////////////

    /// Letters only over the whole string; the empty string passes.
    pub fn is_alpha(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        let default = format!("{} must only contain letters a-z", self.key);
        let tip = tip.unwrap_or(&default);
        self.is_string(Some(tip))?;
        self.check_pred(|_, v| v.as_str().is_some_and(predicates::is_alpha), Some(tip))
    }

    /// Letters and digits only; the empty string passes.
    pub fn is_alphanumeric(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        let default = format!("{} must be alphanumeric (a-z, 0-9)", self.key);
        let tip = tip.unwrap_or(&default);
        self.is_string(Some(tip))?;
        self.check_pred(
            |_, v| v.as_str().is_some_and(predicates::is_alphanumeric),
            Some(tip),
        )
    }

    /// Digits only; the empty string passes.
    pub fn is_numeric(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        let default = format!("{} must only contain numbers", self.key);
        let tip = tip.unwrap_or(&default);
        self.is_string(Some(tip))?;
        self.check_pred(|_, v| v.as_str().is_some_and(predicates::is_numeric), Some(tip))
    }

    /// ASCII only; the empty string passes.
    pub fn is_ascii(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        let default = format!("{} must contain only ASCII characters", self.key);
        let tip = tip.unwrap_or(&default);
        self.is_string(Some(tip))?;
        self.check_pred(|_, v| v.as_str().is_some_and(predicates::is_ascii), Some(tip))
    }

    /// Standard-alphabet base64; the empty string passes trivially.
    pub fn is_base64(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        let default = format!("{} must be base64 encoded", self.key);
        let tip = tip.unwrap_or(&default);
        self.is_string(Some(tip))?;
        self.check_pred(|_, v| v.as_str().is_some_and(predicates::is_base64), Some(tip))
    }

    /// A plausible email address; the empty string fails.
    pub fn is_email(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        let default = format!("{} must be a valid email address", self.key);
        let tip = tip.unwrap_or(&default);
        self.is_string(Some(tip))?;
        self.check_pred(|_, v| v.as_str().is_some_and(predicates::is_email), Some(tip))
    }

    /// Three- or six-digit hex color, `#` optional.
    pub fn is_hex_color(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        let default = format!("{} must be a hex color", self.key);
        let tip = tip.unwrap_or(&default);
        self.is_string(Some(tip))?;
        self.check_pred(
            |_, v| v.as_str().is_some_and(predicates::is_hex_color),
            Some(tip),
        )
    }

    /// RFC-4122 UUID in the requested version, case-insensitive.
    pub fn is_uuid(
        &self,
        version: UuidVersion,
        tip: Option<&str>,
    ) -> Result<&Self, ValidationError> {
        let default = format!("{} must be a UUID{}", self.key, version.suffix());
        let tip = tip.unwrap_or(&default);
        self.is_string(Some(tip))?;
        self.check_pred(
            move |_, v| v.as_str().is_some_and(|s| predicates::is_uuid(s, version)),
            Some(tip),
        )
    }

    /// Base64-encode the string value.
    pub fn encode_base64(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        self.is_string(tip)?;
        self.apply(|_, v| match v {
            Value::String(s) => Value::String(BASE64.encode(s.as_bytes())),
            other => other,
        });
        Ok(self)
    }

    /// Decode the base64 string value back to text; the empty string passes
    /// through unchanged.
    pub fn decode_base64(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        gated!(self);
        let default = format!("{} must be base64 encoded", self.key);
        let tip = tip.unwrap_or(&default);
        self.is_string(Some(tip))?;
        if self.val().as_str().is_some_and(str::is_empty) {
            return Ok(self);
        }
        self.is_base64(Some(tip))?;
        let text = match self.val() {
            Value::String(s) => s,
            _ => return Err(self.fail(Some(tip))),
        };
        match BASE64.decode(text.as_bytes()) {
            Ok(bytes) => {
                self.set(Value::String(String::from_utf8_lossy(&bytes).into_owned()));
                Ok(self)
            }
            Err(_) => Err(self.fail(Some(tip))),
        }
    }

    /// Pin the numeric value into `min..=max`. A numeric value and
    /// `min <= max` are caller preconditions.
    pub fn clamp(&self, min: f64, max: f64) -> &Self {
        gated!(self, infallible);
        debug_assert!(self.val().is_number());
        debug_assert!(min <= max);
        self.apply(|_, v| match v {
            Value::Number(n) if n < min => Value::Number(min),
            other => other,
        });
        self.apply(|_, v| match v {
            Value::Number(n) if n > max => Value::Number(max),
            other => other,
        })
    }
}
