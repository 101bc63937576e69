// 2.0: checked fixed-point arithmetic over i128. every formula downstream is
// written in terms of these primitives. overflow and division by zero abort
// the computation with a MathError; nothing wraps or saturates silently.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("arithmetic overflow during {0}")]
    Overflow(&'static str),

    #[error("division by zero")]
    DivisionByZero,
}

pub fn add(a: i128, b: i128) -> Result<i128, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow("add"))
}

pub fn sub(a: i128, b: i128) -> Result<i128, MathError> {
    a.checked_sub(b).ok_or(MathError::Overflow("sub"))
}

pub fn mul(a: i128, b: i128) -> Result<i128, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow("mul"))
}

// truncates toward zero, matching the venue's integer division
pub fn div(a: i128, b: i128) -> Result<i128, MathError> {
    if b == 0 {
        return Err(MathError::DivisionByZero);
    }
    a.checked_div(b).ok_or(MathError::Overflow("div"))
}

// 2.1: quotient plus the remainder's sign-adjusted round-up (toward +infinity)
pub fn div_ceil(a: i128, b: i128) -> Result<i128, MathError> {
    let q = div(a, b)?;
    let r = a % b;
    if r != 0 && (a < 0) == (b < 0) {
        add(q, 1)
    } else {
        Ok(q)
    }
}

// rounds half away from zero
pub fn div_round(a: i128, b: i128) -> Result<i128, MathError> {
    if b == 0 {
        return Err(MathError::DivisionByZero);
    }
    let q = a / b;
    let r = a % b;
    if r.unsigned_abs() * 2 >= b.unsigned_abs() {
        let bump = if (a < 0) == (b < 0) { 1 } else { -1 };
        add(q, bump)
    } else {
        Ok(q)
    }
}

pub fn mul_div(a: i128, b: i128, denominator: i128) -> Result<i128, MathError> {
    div(mul(a, b)?, denominator)
}

pub fn ten_pow(exp: u32) -> Result<i128, MathError> {
    10i128.checked_pow(exp).ok_or(MathError::Overflow("pow"))
}

// 2.2: integer square root (Newton). feeds the size-premium weight curve.
pub fn sqrt(value: u128) -> u128 {
    if value < 2 {
        return value;
    }
    let mut x = value;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }
    x
}

// 2.3: round toward zero to a multiple of step, returning the signed remainder.
// the remainder keeps the sign of the input, so carry accumulation stays exact.
pub fn standardize(amount: i128, step: i128) -> Result<(i128, i128), MathError> {
    if step <= 0 {
        return Err(MathError::DivisionByZero);
    }
    let remainder = amount % step;
    Ok((amount - remainder, remainder))
}

pub fn clamp(value: i128, lo: i128, hi: i128) -> i128 {
    value.max(lo).min(hi)
}
