//! Fractional order keys for relation lists
//!
//! Relation positions are `{int, frac}` pairs. `int` is the insert timestamp;
//! `frac` is a base-62 fractional-index key that keeps entries sharing an
//! `int` ordered without renumbering siblings.
//!
//! Keys are an integer part (a head character encoding its own length plus
//! that many base-62 digits) followed by an optional fraction with no
//! trailing zero. `"a0"` is the first key, `"a1"` follows it, `"a0V"` sits
//! between them. Plain byte comparison orders keys correctly.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::models::{RelationPosition, FIRST_FRACTIONAL_KEY};

const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ZERO: u8 = b'0';
const SMALLEST_INTEGER: &str = "A00000000000000000000000000";

/// Invalid input to key generation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderKeyError {
    #[error("Invalid order key: {0}")]
    InvalidKey(String),

    #[error("Order keys out of order: {0} >= {1}")]
    OutOfOrder(String, String),

    #[error("Order key space exhausted")]
    Exhausted,
}

fn digit_index(digit: u8) -> Result<usize, OrderKeyError> {
    DIGITS
        .iter()
        .position(|d| *d == digit)
        .ok_or_else(|| OrderKeyError::InvalidKey((digit as char).to_string()))
}

fn integer_length(head: u8) -> Result<usize, OrderKeyError> {
    match head {
        b'a'..=b'z' => Ok((head - b'a') as usize + 2),
        b'A'..=b'Z' => Ok((b'Z' - head) as usize + 2),
        _ => Err(OrderKeyError::InvalidKey((head as char).to_string())),
    }
}

fn integer_part(key: &str) -> Result<&str, OrderKeyError> {
    let head = *key
        .as_bytes()
        .first()
        .ok_or_else(|| OrderKeyError::InvalidKey(key.to_string()))?;
    let len = integer_length(head)?;
    if len > key.len() {
        return Err(OrderKeyError::InvalidKey(key.to_string()));
    }
    Ok(&key[..len])
}

fn validate_key(key: &str) -> Result<(), OrderKeyError> {
    if !key.is_ascii() || key == SMALLEST_INTEGER {
        return Err(OrderKeyError::InvalidKey(key.to_string()));
    }
    let integer = integer_part(key)?;
    for digit in key.bytes() {
        digit_index(digit)?;
    }
    let fraction = &key[integer.len()..];
    if fraction.as_bytes().last() == Some(&ZERO) {
        return Err(OrderKeyError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Key strictly between the fractions `a` and `b` (`None` = unbounded above)
fn midpoint(a: &str, b: Option<&str>) -> Result<String, OrderKeyError> {
    let b = b.filter(|b| !b.is_empty());
    if let Some(b) = b {
        if a >= b {
            return Err(OrderKeyError::OutOfOrder(a.to_string(), b.to_string()));
        }
    }
    if a.as_bytes().last() == Some(&ZERO) || b.and_then(|b| b.as_bytes().last()) == Some(&ZERO) {
        return Err(OrderKeyError::InvalidKey(format!("{a}|{}", b.unwrap_or(""))));
    }

    if let Some(b) = b {
        // shared prefix, padding `a` with zeros
        let a_bytes = a.as_bytes();
        let b_bytes = b.as_bytes();
        let mut n = 0;
        while n < b_bytes.len() && a_bytes.get(n).copied().unwrap_or(ZERO) == b_bytes[n] {
            n += 1;
        }
        if n > 0 {
            let rest_a = if n < a.len() { &a[n..] } else { "" };
            return Ok(format!("{}{}", &b[..n], midpoint(rest_a, Some(&b[n..]))?));
        }
    }

    let digit_a = match a.as_bytes().first() {
        Some(d) => digit_index(*d)?,
        None => 0,
    };
    let digit_b = match b.and_then(|b| b.as_bytes().first()) {
        Some(d) => digit_index(*d)?,
        None => DIGITS.len(),
    };

    if digit_b - digit_a > 1 {
        let mid = (digit_a + digit_b + 1) / 2;
        Ok((DIGITS[mid] as char).to_string())
    } else if let Some(b) = b.filter(|b| b.len() > 1) {
        Ok(b[..1].to_string())
    } else {
        let rest_a = if a.is_empty() { "" } else { &a[1..] };
        Ok(format!("{}{}", DIGITS[digit_a] as char, midpoint(rest_a, None)?))
    }
}

fn increment_integer(x: &str) -> Result<Option<String>, OrderKeyError> {
    let bytes = x.as_bytes();
    let head = bytes[0];
    let mut digits: Vec<u8> = bytes[1..].to_vec();

    let mut carry = true;
    for digit in digits.iter_mut().rev() {
        let d = digit_index(*digit)? + 1;
        if d == DIGITS.len() {
            *digit = ZERO;
        } else {
            *digit = DIGITS[d];
            carry = false;
            break;
        }
    }

    if !carry {
        let mut out = vec![head];
        out.extend(digits);
        return Ok(Some(String::from_utf8_lossy(&out).into_owned()));
    }
    if head == b'Z' {
        return Ok(Some(format!("a{}", ZERO as char)));
    }
    if head == b'z' {
        return Ok(None);
    }
    let next_head = head + 1;
    if next_head > b'a' {
        digits.push(ZERO);
    } else {
        digits.pop();
    }
    let mut out = vec![next_head];
    out.extend(digits);
    Ok(Some(String::from_utf8_lossy(&out).into_owned()))
}

fn decrement_integer(x: &str) -> Result<Option<String>, OrderKeyError> {
    let bytes = x.as_bytes();
    let head = bytes[0];
    let mut digits: Vec<u8> = bytes[1..].to_vec();
    let max_digit = DIGITS[DIGITS.len() - 1];

    let mut borrow = true;
    for digit in digits.iter_mut().rev() {
        let d = digit_index(*digit)?;
        if d == 0 {
            *digit = max_digit;
        } else {
            *digit = DIGITS[d - 1];
            borrow = false;
            break;
        }
    }

    if !borrow {
        let mut out = vec![head];
        out.extend(digits);
        return Ok(Some(String::from_utf8_lossy(&out).into_owned()));
    }
    if head == b'a' {
        return Ok(Some(format!("Z{}", max_digit as char)));
    }
    if head == b'A' {
        return Ok(None);
    }
    let prev_head = head - 1;
    if prev_head < b'Z' {
        digits.push(max_digit);
    } else {
        digits.pop();
    }
    let mut out = vec![prev_head];
    out.extend(digits);
    Ok(Some(String::from_utf8_lossy(&out).into_owned()))
}

/// Generate a key sorting strictly between `a` and `b`
///
/// `None` bounds are open ends of the list.
///
/// # Examples
/// ```
/// use mew_clipper_core::operations::fractional_ordering::key_between;
///
/// assert_eq!(key_between(None, None).unwrap(), "a0");
/// assert_eq!(key_between(Some("a0"), None).unwrap(), "a1");
/// assert_eq!(key_between(Some("a0"), Some("a1")).unwrap(), "a0V");
/// ```
pub fn key_between(a: Option<&str>, b: Option<&str>) -> Result<String, OrderKeyError> {
    if let Some(a) = a {
        validate_key(a)?;
    }
    if let Some(b) = b {
        validate_key(b)?;
    }

    match (a, b) {
        (None, None) => Ok(FIRST_FRACTIONAL_KEY.to_string()),
        (None, Some(b)) => {
            let int_b = integer_part(b)?;
            let frac_b = &b[int_b.len()..];
            if int_b == SMALLEST_INTEGER {
                return Ok(format!("{}{}", int_b, midpoint("", Some(frac_b))?));
            }
            if int_b < b {
                return Ok(int_b.to_string());
            }
            decrement_integer(int_b)?.ok_or(OrderKeyError::Exhausted)
        }
        (Some(a), None) => {
            let int_a = integer_part(a)?;
            let frac_a = &a[int_a.len()..];
            match increment_integer(int_a)? {
                Some(next) => Ok(next),
                None => Ok(format!("{}{}", int_a, midpoint(frac_a, None)?)),
            }
        }
        (Some(a), Some(b)) => {
            if a >= b {
                return Err(OrderKeyError::OutOfOrder(a.to_string(), b.to_string()));
            }
            let int_a = integer_part(a)?;
            let frac_a = &a[int_a.len()..];
            let int_b = integer_part(b)?;
            let frac_b = &b[int_b.len()..];
            if int_a == int_b {
                return Ok(format!("{}{}", int_a, midpoint(frac_a, Some(frac_b))?));
            }
            let next = increment_integer(int_a)?.ok_or(OrderKeyError::Exhausted)?;
            if next.as_str() < b {
                Ok(next)
            } else {
                Ok(format!("{}{}", int_a, midpoint(frac_a, None)?))
            }
        }
    }
}

/// Tracked lists beyond which stale entries are dropped
const PRUNE_THRESHOLD: usize = 64;

/// Hands out append positions per relation list
///
/// The first insert into a list at a given millisecond gets `{now, "a0"}`.
/// Further inserts into the same list within that millisecond get
/// successively larger fractional keys, so rapid sequential inserts stay
/// distinct and ordered. A clock that reads earlier than the last position
/// handed out for a list is treated as the same millisecond.
///
/// Only lists whose last position is at or after the current millisecond
/// affect the next result, so older entries are dropped once more than a
/// handful of lists are tracked.
#[derive(Debug, Default)]
pub struct PositionAllocator {
    last_by_list: Mutex<HashMap<String, RelationPosition>>,
}

impl PositionAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next append position in the relation list owned by `list_owner_id`
    pub fn next_position(&self, list_owner_id: &str, now_millis: i64) -> RelationPosition {
        let mut last_by_list = self
            .last_by_list
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let position = match last_by_list.get(list_owner_id) {
            Some(last) if now_millis <= last.int => {
                // keys produced here are always valid, so only exhaustion can fail
                match key_between(Some(&last.frac), None) {
                    Ok(frac) => RelationPosition { int: last.int, frac },
                    Err(_) => RelationPosition::first(last.int + 1),
                }
            }
            _ => RelationPosition::first(now_millis),
        };

        last_by_list.insert(list_owner_id.to_string(), position.clone());
        if last_by_list.len() > PRUNE_THRESHOLD {
            last_by_list.retain(|_, last| last.int >= now_millis);
        }
        position
    }

    /// Number of lists currently tracked
    pub fn tracked_lists(&self) -> usize {
        self.last_by_list
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Forget every list
    pub fn reset(&self) {
        self.last_by_list
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}
