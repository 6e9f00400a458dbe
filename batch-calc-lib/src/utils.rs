//! Utility functions for turning user input into requests.
//!
//! Expressions have the shape `<int> <op> <int>`, spaces optional. The
//! operator is taken verbatim, so `9 % 2` parses fine and is rejected later by
//! the registry as an unknown operator.

use crate::error::CalcError;
use crate::types::PendingRequest;

/// Parse one expression into a request.
///
/// # Arguments
///
/// * `index` - Sequence index to assign to the request
/// * `text` - Expression such as `"7 + 3"`, `"7+3"` or `"-4 * -2"`
///
/// # Returns
///
/// The parsed `PendingRequest`, or `CalcError::InvalidExpression`.
pub fn parse_expression(index: usize, text: &str) -> Result<PendingRequest, CalcError> {
    let input = text.trim();
    if input.is_empty() {
        return Err(CalcError::invalid_expression(text, "expression cannot be empty"));
    }

    let (a, rest) = take_integer(input)
        .map_err(|reason| CalcError::invalid_expression(input, format!("left operand: {}", reason)))?;

    let rest = rest.trim_start();
    let operator = rest
        .chars()
        .next()
        .ok_or_else(|| CalcError::invalid_expression(input, "missing operator"))?;
    if operator.is_ascii_digit() {
        return Err(CalcError::invalid_expression(input, "missing operator"));
    }

    let (b, rest) = take_integer(&rest[operator.len_utf8()..])
        .map_err(|reason| CalcError::invalid_expression(input, format!("right operand: {}", reason)))?;

    if !rest.trim().is_empty() {
        return Err(CalcError::invalid_expression(
            input,
            format!("unexpected trailing input '{}'", rest.trim()),
        ));
    }

    Ok(PendingRequest::new(index, a, operator, b))
}

/// Parse a list of expressions.
///
/// Valid expressions get dense indices in input order; invalid ones are
/// returned separately so the caller can report them and continue.
pub fn parse_expressions(inputs: &[String]) -> (Vec<PendingRequest>, Vec<CalcError>) {
    let mut requests = Vec::new();
    let mut errors = Vec::new();

    for input in inputs {
        match parse_expression(requests.len(), input) {
            Ok(request) => requests.push(request),
            Err(e) => errors.push(e),
        }
    }

    (requests, errors)
}

/// Read an optionally signed integer from the start of `s`.
fn take_integer(s: &str) -> Result<(i64, &str), &'static str> {
    let s = s.trim_start();
    let sign_len = if s.starts_with(|c| c == '+' || c == '-') {
        1
    } else {
        0
    };
    let digits = s[sign_len..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();

    if digits == 0 {
        return Err("expected an integer");
    }

    let end = sign_len + digits;
    let value = s[..end]
        .parse::<i64>()
        .map_err(|_| "integer out of range")?;

    Ok((value, &s[end..]))
}
