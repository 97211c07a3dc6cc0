//! The caller-supplied model: domain sizes plus function scopes.

use crate::errors::{OrderError, Result};
use crate::{log_domain_size, Node};

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Problem {
    domain_sizes: Vec<u64>,
    scopes: Vec<Vec<Node>>,
}

impl Problem {
    /// Validates that there is at least one variable and that every scope
    /// only mentions ids in `0..domain_sizes.len()`.
    pub fn new(domain_sizes: Vec<u64>, scopes: Vec<Vec<Node>>) -> Result<Problem> {
        validate(&domain_sizes, &scopes)?;
        Ok(Problem {
            domain_sizes,
            scopes,
        })
    }

    pub fn num_variables(&self) -> usize {
        self.domain_sizes.len()
    }

    pub fn domain_sizes(&self) -> &[u64] {
        &self.domain_sizes
    }

    pub fn scopes(&self) -> &[Vec<Node>] {
        &self.scopes
    }

    /// log10 of the domain size of `v`, zero for unknown ids.
    pub fn log_domain(&self, v: Node) -> f64 {
        self.domain_sizes
            .get(v as usize)
            .map_or(0.0, |&size| log_domain_size(size))
    }
}

pub(crate) fn validate(domain_sizes: &[u64], scopes: &[Vec<Node>]) -> Result<()> {
    let n = domain_sizes.len();
    if n == 0 {
        return Err(OrderError::MalformedInput("problem has no variables".into()));
    }
    if n > Node::MAX as usize {
        return Err(OrderError::MalformedInput(format!(
            "{} variables exceed the id range",
            n
        )));
    }
    for (f, scope) in scopes.iter().enumerate() {
        if let Some(&v) = scope.iter().find(|&&v| v as usize >= n) {
            return Err(OrderError::MalformedInput(format!(
                "scope {} mentions variable {} but there are only {}",
                f, v, n
            )));
        }
    }
    Ok(())
}
