//! Operation registry: named reductions over a job's integer payload.

use serde::{Deserialize, Serialize};

/// A registered operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Wrapping sum, starting from 0.
    Sum,
    /// Wrapping running subtraction, starting from 0.
    Sub,
}

impl Operation {
    /// All registered operations.
    pub const ALL: [Operation; 2] = [Operation::Sum, Operation::Sub];

    /// Look up an operation by name, ignoring case.
    ///
    /// Returns `None` for unknown names; callers decide what that means.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Sum => "sum",
            Operation::Sub => "sub",
        }
    }

    /// Reduce `data` left to right. 32-bit overflow wraps.
    pub fn apply(&self, data: &[i32]) -> i32 {
        match self {
            Operation::Sum => data.iter().fold(0i32, |acc, v| acc.wrapping_add(*v)),
            Operation::Sub => data.iter().fold(0i32, |acc, v| acc.wrapping_sub(*v)),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unregistered operation name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("this action is not allowed: {0}")]
pub struct UnknownOperation(pub String);

impl std::str::FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::parse(s).ok_or_else(|| UnknownOperation(s.to_string()))
    }
}
