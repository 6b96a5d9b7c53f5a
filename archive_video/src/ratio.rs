//! Exact rational numbers for aspect ratios and frame rates.
//!
//! ffprobe reports these as `"16:9"`, `"30000/1001"`, `"1.778"` or a bare
//! number. Every [`Ratio`] is reduced to the best rational approximation with
//! a denominator of at most [`MAX_DENOMINATOR`], so `"1920:1080"` and
//! `"1.7777777777777777"` both come out as 16/9.

use shared_utils::{ArchiveError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const MAX_DENOMINATOR: i64 = 10_000;

/// Parsed numerators/denominators above this are rejected rather than risk
/// overflow while approximating.
const MAGNITUDE_LIMIT: i128 = 10i128.pow(28);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ratio {
    numerator: i64,
    denominator: i64,
    rounded: i64,
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// `floor(n/d + 1/2)` for `d > 0`, computed exactly.
fn round_half_up(n: i128, d: i128) -> i128 {
    (2 * n + d).div_euclid(2 * d)
}

/// Best approximation of `n/d` (lowest terms, `d > 0`) with denominator at
/// most `max`, by walking the continued fraction convergents and checking the
/// last semiconvergent.
fn limit_denominator(n: i128, d: i128, max: i128) -> (i128, i128) {
    if d <= max {
        return (n, d);
    }
    let (mut p0, mut q0, mut p1, mut q1) = (0i128, 1i128, 1i128, 0i128);
    let (mut num, mut den) = (n, d);
    loop {
        let a = num.div_euclid(den);
        let q2 = q0 + a * q1;
        if q2 > max {
            break;
        }
        (p0, q0, p1, q1) = (p1, q1, p0 + a * p1, q2);
        (num, den) = (den, num - a * den);
    }
    let k = (max - q0) / q1;
    let (semi_p, semi_q) = (p0 + k * p1, q0 + k * q1);

    // |p1/q1 - n/d| <= |semi - n/d|, cross-multiplied by d * q1 * semi_q
    let conv_err = (p1 * d - n * q1).abs() * semi_q;
    let semi_err = (semi_p * d - n * semi_q).abs() * q1;
    if conv_err <= semi_err {
        (p1, q1)
    } else {
        (semi_p, semi_q)
    }
}

fn digits(s: &str) -> Option<i128> {
    if s.is_empty() || s.len() > 30 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn pow10(exp: u32) -> Option<i128> {
    10i128.checked_pow(exp)
}

/// Exact value of `"[+-]int/int"` or `"[+-]decimal[e[+-]exp]"` as an
/// unreduced fraction. `Err` carries the reason.
fn parse_exact(s: &str) -> std::result::Result<(i128, i128), &'static str> {
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (num, den) = if let Some((n, d)) = body.split_once('/') {
        let n = digits(n).ok_or("not a ratio")?;
        let d = digits(d).ok_or("not a ratio")?;
        (n, d)
    } else {
        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(i) => (&body[..i], Some(&body[i + 1..])),
            None => (body, None),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err("not a number");
        }
        let all_digits = format!("{}{}", int_part, frac_part);
        let mut n = digits(&all_digits).ok_or("not a number")?;
        let mut d = pow10(frac_part.len() as u32).ok_or("out of range")?;

        if let Some(exp) = exponent {
            let (exp_negative, exp_digits) = match exp.as_bytes().first() {
                Some(b'-') => (true, &exp[1..]),
                Some(b'+') => (false, &exp[1..]),
                _ => (false, exp),
            };
            let e: u32 = digits(exp_digits)
                .and_then(|e| u32::try_from(e).ok())
                .ok_or("not a number")?;
            let scale = pow10(e).ok_or("out of range")?;
            if exp_negative {
                d = d.checked_mul(scale).ok_or("out of range")?;
            } else {
                n = n.checked_mul(scale).ok_or("out of range")?;
            }
        }
        (n, d)
    };

    if den == 0 {
        return Err("division by zero");
    }
    if num > MAGNITUDE_LIMIT || den > MAGNITUDE_LIMIT {
        return Err("out of range");
    }
    Ok((if negative { -num } else { num }, den))
}

impl Ratio {
    fn from_exact(input: &str, num: i128, den: i128) -> Result<Self> {
        let g = gcd(num, den).max(1);
        let (num, den) = (num / g, den / g);
        let (num, den) = limit_denominator(num, den, MAX_DENOMINATOR as i128);
        let numerator =
            i64::try_from(num).map_err(|_| ArchiveError::parse(input, "out of range"))?;
        let denominator =
            i64::try_from(den).map_err(|_| ArchiveError::parse(input, "out of range"))?;
        let rounded = i64::try_from(round_half_up(num, den))
            .map_err(|_| ArchiveError::parse(input, "out of range"))?;
        Ok(Ratio {
            numerator,
            denominator,
            rounded,
        })
    }

    /// `numerator / denominator`, reduced and bounded.
    pub fn new(numerator: i64, denominator: i64) -> Result<Self> {
        let input = format!("{}/{}", numerator, denominator);
        if denominator == 0 {
            return Err(ArchiveError::parse(input, "division by zero"));
        }
        let (n, d) = if denominator < 0 {
            (-(numerator as i128), -(denominator as i128))
        } else {
            (numerator as i128, denominator as i128)
        };
        Self::from_exact(&input, n, d)
    }

    /// Parse `"16:9"`, `"16/9"`, `"16x9"`, `"1.778"`, `"25"` and the like.
    pub fn parse(input: &str) -> Result<Self> {
        let normalized: String = input
            .chars()
            .map(|c| match c {
                'x' | 'X' | ':' => '/',
                other => other,
            })
            .collect();
        let (num, den) =
            parse_exact(normalized.trim()).map_err(|reason| ArchiveError::parse(input, reason))?;
        Self::from_exact(input, num, den)
    }

    /// From a numeric value, e.g. a bare number in probe JSON.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(ArchiveError::parse(value.to_string(), "not a finite number"));
        }
        // Display gives the shortest round-tripping decimal, never an exponent.
        let text = value.to_string();
        let (num, den) = parse_exact(&text).map_err(|reason| ArchiveError::parse(&text, reason))?;
        Self::from_exact(&text, num, den)
    }

    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    /// Value rounded half-up to an integer.
    pub fn rounded(&self) -> i64 {
        self.rounded
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    pub fn is_one(&self) -> bool {
        self.numerator == self.denominator
    }

    /// `round(k * self)`
    pub fn mul_round(&self, k: i64) -> i64 {
        round_half_up(k as i128 * self.numerator as i128, self.denominator as i128) as i64
    }

    /// `round(k / self)`, `None` when `self` is zero.
    pub fn div_round(&self, k: i64) -> Option<i64> {
        if self.numerator == 0 {
            return None;
        }
        let (mut n, mut d) = (k as i128 * self.denominator as i128, self.numerator as i128);
        if d < 0 {
            n = -n;
            d = -d;
        }
        Some(round_half_up(n, d) as i64)
    }

    /// `"N:D"`, the form ffmpeg's `-aspect` expects.
    pub fn as_aspect(&self) -> String {
        format!("{}:{}", self.numerator, self.denominator)
    }

    pub fn to_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl FromStr for Ratio {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        Ratio::parse(s)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl Ord for Ratio {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.numerator as i128 * other.denominator as i128;
        let rhs = other.numerator as i128 * self.denominator as i128;
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Ratio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
