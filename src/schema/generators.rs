//! Per-primitive value synthesis honoring schema constraints

use chrono::{SecondsFormat, Utc};
use fake::faker::internet::en::{DomainSuffix, IPv4, IPv6, SafeEmail};
use fake::faker::lorem::en::Word;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use std::ops::RangeInclusive;

use super::pattern::generate_from_pattern;
use super::{ExclusiveBound, PrimitiveKind, SchemaNode};

/// Default `minLength` when a string schema omits it
pub const DEFAULT_MIN_LENGTH: u64 = 0;
/// Default `maxLength` when a string schema omits it
pub const DEFAULT_MAX_LENGTH: u64 = 10;
/// Hard cap on synthesized text length for unbounded schemas
pub const MAX_TEXT_LENGTH: u64 = 4096;
/// Width of the default numeric range when one or both bounds are missing
pub const DEFAULT_NUMERIC_SPAN: f64 = 1000.0;
/// Format draws tried before building a value sized to the length bounds
const MAX_FORMAT_ATTEMPTS: usize = 8;

static LOREM_WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit",
    "sed", "do", "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore",
    "magna", "aliqua", "enim", "ad", "minim", "veniam", "quis", "nostrud",
    "exercitation", "ullamco", "laboris", "nisi", "aliquip", "ex", "ea", "commodo",
];

/// Synthesize a value for a leaf kind. Objects and arrays are handled by the
/// compiler; asking for them here yields an empty container.
pub fn generate_leaf<R: Rng + ?Sized>(kind: PrimitiveKind, node: &SchemaNode, rng: &mut R) -> Value {
    match kind {
        PrimitiveKind::String => Value::String(generate_string(node, rng)),
        PrimitiveKind::Number => generate_number(node, rng),
        PrimitiveKind::Integer => generate_integer(node, rng),
        PrimitiveKind::Boolean => Value::Bool(rng.gen_bool(0.5)),
        PrimitiveKind::Null => Value::Null,
        PrimitiveKind::Object => json!({}),
        PrimitiveKind::Array => json!([]),
    }
}

/// Strings: format first, then pattern, then length-bounded text. Every
/// branch honors `minLength`/`maxLength`.
pub fn generate_string<R: Rng + ?Sized>(node: &SchemaNode, rng: &mut R) -> String {
    let explicit = explicit_length_bounds(node);

    if let Some(value) = node
        .format
        .as_deref()
        .and_then(|f| generate_sized_format(f, explicit.clone(), rng))
    {
        return value;
    }
    if let Some(pattern) = &node.pattern {
        return generate_from_pattern(pattern, explicit, rng);
    }

    let (min, max) = length_bounds(node);
    let len = rng.gen_range(min..=max);
    random_text(len, rng)
}

/// Inclusive `[minLength, maxLength]` with defaults applied
pub fn length_bounds(node: &SchemaNode) -> (usize, usize) {
    let min = node.min_length.unwrap_or(DEFAULT_MIN_LENGTH);
    let max = node
        .max_length
        .unwrap_or_else(|| min.max(DEFAULT_MAX_LENGTH))
        .min(min.max(MAX_TEXT_LENGTH))
        .max(min);
    (min as usize, max as usize)
}

/// Only the bounds the schema states; no default maximum
fn explicit_length_bounds(node: &SchemaNode) -> RangeInclusive<usize> {
    let min = node.min_length.unwrap_or(DEFAULT_MIN_LENGTH) as usize;
    let max = node.max_length.map_or(usize::MAX, |m| m as usize).max(min);
    min..=max
}

/// Lorem text of exactly `len` characters with no leading or trailing space
pub fn random_text<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    let mut text = String::with_capacity(len + 16);
    while text.len() < len {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(LOREM_WORDS[rng.gen_range(0..LOREM_WORDS.len())]);
    }
    text.truncate(len);
    if text.ends_with(' ') {
        text.pop();
        text.push('s');
    }
    text
}

/// Format-specific synthesis; `None` for formats without a generator
pub fn generate_format<R: Rng + ?Sized>(format: &str, rng: &mut R) -> Option<String> {
    let value = match format.to_ascii_lowercase().as_str() {
        "uuid" => uuid::Builder::from_random_bytes(rng.gen()).into_uuid().to_string(),
        "email" | "idn-email" => SafeEmail().fake_with_rng::<String, _>(rng),
        "date-time" => random_instant(rng).to_rfc3339_opts(SecondsFormat::Secs, true),
        "date" => random_instant(rng).format("%Y-%m-%d").to_string(),
        "time" => random_instant(rng).format("%H:%M:%S").to_string(),
        "uri" | "url" | "uri-reference" | "iri" => {
            let host: String = Word().fake_with_rng(rng);
            let suffix: String = DomainSuffix().fake_with_rng(rng);
            let path: String = Word().fake_with_rng(rng);
            format!("https://{}.{}/{}", host, suffix, path)
        }
        "hostname" | "idn-hostname" => {
            let host: String = Word().fake_with_rng(rng);
            let suffix: String = DomainSuffix().fake_with_rng(rng);
            format!("{}.{}", host, suffix)
        }
        "ipv4" => IPv4().fake_with_rng::<String, _>(rng),
        "ipv6" => IPv6().fake_with_rng::<String, _>(rng),
        "phone" => PhoneNumber().fake_with_rng::<String, _>(rng),
        "password" => (0..12).map(|_| char::from(rng.sample(Alphanumeric))).collect(),
        _ => return None,
    };
    Some(value)
}

/// A format value whose length falls inside `length`. Redraws first, then
/// builds a value to size for formats with a free-form shape. `None` when
/// the format is unknown or cannot fit.
pub fn generate_sized_format<R: Rng + ?Sized>(
    format: &str,
    length: RangeInclusive<usize>,
    rng: &mut R,
) -> Option<String> {
    for _ in 0..MAX_FORMAT_ATTEMPTS {
        let value = generate_format(format, rng)?;
        if length.contains(&value.chars().count()) {
            return Some(value);
        }
    }

    let format = format.to_ascii_lowercase();
    // Shortest value each buildable format allows: a@b.c and b.c
    let floor = match format.as_str() {
        "email" | "idn-email" => 5,
        "hostname" | "idn-hostname" => 3,
        "password" => 0,
        _ => return None,
    };
    let lo = (*length.start()).max(floor);
    let hi = (*length.end()).min(lo.saturating_add(16));
    if lo > hi {
        return None;
    }

    let target = rng.gen_range(lo..=hi);
    let value = match format.as_str() {
        "email" | "idn-email" => {
            let host_len = ((target - 1) / 2).max(3);
            let local = random_label(target - 1 - host_len, rng);
            format!("{}@{}", local, sized_hostname(host_len, rng))
        }
        "hostname" | "idn-hostname" => sized_hostname(target, rng),
        _ => (0..target).map(|_| char::from(rng.sample(Alphanumeric))).collect(),
    };
    Some(value)
}

/// `label.tld` of exactly `len` characters; `len` must be at least 3
fn sized_hostname<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    let tld_len = if len >= 6 { 3 } else { 1 };
    let label = random_label(len - 1 - tld_len, rng);
    format!("{}.{}", label, random_label(tld_len, rng))
}

fn random_label<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    (0..len).map(|_| char::from(rng.gen_range(b'a'..=b'z'))).collect()
}

fn random_instant<R: Rng + ?Sized>(rng: &mut R) -> chrono::DateTime<Utc> {
    let offset = rng.gen_range(0..365 * 24 * 3600);
    Utc::now() - chrono::Duration::seconds(offset)
}

/// Effective numeric range after merging draft-4 and draft-6 exclusivity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericBounds {
    pub min: f64,
    pub min_exclusive: bool,
    pub max: f64,
    pub max_exclusive: bool,
}

impl NumericBounds {
    pub fn from_node(node: &SchemaNode) -> Self {
        let (lower, min_exclusive) = merge_bound(node.minimum, node.exclusive_minimum, f64::max);
        let (upper, max_exclusive) = merge_bound(node.maximum, node.exclusive_maximum, f64::min);

        let (min, max) = match (lower, upper) {
            (Some(lo), Some(hi)) => (lo, hi),
            (Some(lo), None) => (lo, lo + DEFAULT_NUMERIC_SPAN),
            (None, Some(hi)) if hi > 0.0 => (0.0, hi),
            (None, Some(hi)) => (hi - DEFAULT_NUMERIC_SPAN, hi),
            (None, None) => (0.0, DEFAULT_NUMERIC_SPAN),
        };

        Self {
            min,
            min_exclusive,
            max,
            max_exclusive,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        let above = if self.min_exclusive { value > self.min } else { value >= self.min };
        let below = if self.max_exclusive { value < self.max } else { value <= self.max };
        above && below
    }
}

/// Combine `minimum`/`maximum` with its exclusive counterpart. `tighter`
/// picks whichever bound is more restrictive when both are numeric.
fn merge_bound(
    inclusive: Option<f64>,
    exclusive: Option<ExclusiveBound>,
    tighter: fn(f64, f64) -> f64,
) -> (Option<f64>, bool) {
    match exclusive {
        Some(ExclusiveBound::Flag(true)) => (inclusive, inclusive.is_some()),
        Some(ExclusiveBound::Value(v)) => match inclusive {
            Some(i) if tighter(i, v) == i && i != v => (Some(i), false),
            _ => (Some(v), true),
        },
        _ => (inclusive, false),
    }
}

/// Uniform draw from the numeric range, nudged off excluded boundaries and
/// snapped to `multipleOf` when present
pub fn generate_number<R: Rng + ?Sized>(node: &SchemaNode, rng: &mut R) -> Value {
    let bounds = NumericBounds::from_node(node);

    if let Some(step) = node.multiple_of.filter(|m| *m > 0.0) {
        let mut k_lo = (bounds.min / step).ceil();
        if !bounds.contains(k_lo * step) {
            k_lo += 1.0;
        }
        let mut k_hi = (bounds.max / step).floor();
        if !bounds.contains(k_hi * step) {
            k_hi -= 1.0;
        }
        if k_lo > k_hi {
            return json!(bounds.min);
        }
        let k = rng.gen_range(k_lo as i64..=k_hi as i64) as f64;
        return json!(round_to(k * step, decimals_of(step)));
    }

    if bounds.min >= bounds.max {
        return json!(bounds.min);
    }

    // Interpolate so the width never has to be representable
    let t: f64 = rng.gen();
    let mut value = (bounds.min * (1.0 - t) + bounds.max * t).clamp(bounds.min, bounds.max);
    let nudge = bounds.max / 1000.0 - bounds.min / 1000.0;
    if bounds.min_exclusive && value <= bounds.min {
        value = bounds.min + nudge;
    }
    if bounds.max_exclusive && value >= bounds.max {
        value = bounds.max - nudge;
    }

    let rounded = round_to(value, 2);
    if bounds.contains(rounded) {
        json!(rounded)
    } else {
        json!(value)
    }
}

/// Whole number from the integer-adjusted range, aligned to `multipleOf`
pub fn generate_integer<R: Rng + ?Sized>(node: &SchemaNode, rng: &mut R) -> Value {
    let bounds = NumericBounds::from_node(node);
    let lo = if bounds.min_exclusive {
        bounds.min.floor() as i64 + 1
    } else {
        bounds.min.ceil() as i64
    };
    let hi = if bounds.max_exclusive {
        bounds.max.ceil() as i64 - 1
    } else {
        bounds.max.floor() as i64
    };

    if let Some(step) = node.multiple_of.filter(|m| *m >= 1.0 && m.fract() == 0.0) {
        let step = step as i64;
        let k_lo = (lo as f64 / step as f64).ceil() as i64;
        let k_hi = (hi as f64 / step as f64).floor() as i64;
        if k_lo > k_hi {
            return json!(lo);
        }
        return json!(rng.gen_range(k_lo..=k_hi) * step);
    }

    if lo >= hi {
        return json!(lo);
    }
    json!(rng.gen_range(lo..=hi))
}

fn decimals_of(step: f64) -> i32 {
    let mut decimals = 0;
    let mut scaled = step;
    while scaled.fract().abs() > 1e-9 && decimals < 10 {
        scaled *= 10.0;
        decimals += 1;
    }
    decimals
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
