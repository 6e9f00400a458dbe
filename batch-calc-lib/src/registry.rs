//! Operation registry mapping operator symbols to arithmetic operations.
//!
//! The operator set is closed: `+`, `-`, `*` and `/`. The registry is built
//! once, shared read-only between units (`Arc<OperationRegistry>`) and never
//! mutated afterwards, so lookups need no locking.

use crate::error::CalcError;
use crate::types::SENTINEL_RESULT;
use std::collections::HashMap;

/// Canonical symbol order, used for display and random selection.
const STANDARD_SYMBOLS: [char; 4] = ['+', '-', '*', '/'];

/// One of the four binary integer operations.
///
/// Arithmetic wraps on overflow (two's complement), so every pair of `i64`
/// operands has a defined result except division by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    /// Map an operator symbol to its operation.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
        }
    }

    /// Reduce two operands to one value.
    ///
    /// # Errors
    ///
    /// Returns `CalcError::DivisionByZero` for `Divide` with `b == 0`.
    /// Division truncates toward zero.
    pub fn compute(&self, a: i64, b: i64) -> Result<i64, CalcError> {
        match self {
            Self::Add => Ok(a.wrapping_add(b)),
            Self::Subtract => Ok(a.wrapping_sub(b)),
            Self::Multiply => Ok(a.wrapping_mul(b)),
            Self::Divide => {
                if b == 0 {
                    Err(CalcError::division_by_zero(a))
                } else {
                    Ok(a.wrapping_div(b))
                }
            }
        }
    }

    /// Nominal-result path: like `compute`, but yields `SENTINEL_RESULT`
    /// when the operation cannot be performed.
    pub fn compute_or_sentinel(&self, a: i64, b: i64) -> i64 {
        self.compute(a, b).unwrap_or(SENTINEL_RESULT)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Symbol → operation lookup table.
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    operations: HashMap<char, Operation>,
}

impl OperationRegistry {
    /// Build the registry holding the four standard operations.
    pub fn new() -> Self {
        let operations = STANDARD_SYMBOLS
            .iter()
            .filter_map(|&symbol| Operation::from_symbol(symbol).map(|op| (symbol, op)))
            .collect();

        Self { operations }
    }

    /// Find the operation for a symbol.
    ///
    /// `None` for an unknown symbol is an ordinary outcome; callers report it
    /// and move on.
    pub fn lookup(&self, symbol: char) -> Option<Operation> {
        self.operations.get(&symbol).copied()
    }

    /// Like `lookup`, but as a `Result` carrying `UnknownOperator`.
    pub fn resolve(&self, symbol: char) -> Result<Operation, CalcError> {
        self.lookup(symbol)
            .ok_or_else(|| CalcError::unknown_operator(symbol))
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.operations.contains_key(&symbol)
    }

    /// Registered symbols in canonical order.
    pub fn symbols(&self) -> Vec<char> {
        STANDARD_SYMBOLS
            .iter()
            .copied()
            .filter(|symbol| self.contains(*symbol))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
