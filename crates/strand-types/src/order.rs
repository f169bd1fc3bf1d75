use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a message inside a thread.
///
/// `order` separates independent exchanges (one per prompt), `step_order`
/// separates the steps produced in response to that prompt. The derived
/// ordering compares `order` first, then `step_order`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderKey {
    pub order: u64,
    pub step_order: u64,
}

impl OrderKey {
    pub fn new(order: u64, step_order: u64) -> Self {
        Self { order, step_order }
    }

    /// Next step within the same exchange.
    pub fn next_step(self) -> Self {
        Self {
            order: self.order,
            step_order: self.step_order + 1,
        }
    }

    /// First step of the following exchange.
    pub fn next_order(self) -> Self {
        Self {
            order: self.order + 1,
            step_order: 0,
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.order, self.step_order)
    }
}

impl FromStr for OrderKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (order, step) = s
            .split_once('.')
            .ok_or_else(|| format!("invalid order key: {}", s))?;
        let order = order
            .parse()
            .map_err(|_| format!("invalid order in key: {}", s))?;
        let step_order = step
            .parse()
            .map_err(|_| format!("invalid step order in key: {}", s))?;
        Ok(Self { order, step_order })
    }
}
