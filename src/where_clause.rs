// src/where_clause.rs
use crate::error::ConfigError;
use crate::variables::{ParsedLine, VarRef};

/// Token that separates AND-chains in a where clause
pub const OR_TOKEN: &str = "OR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `var=value` (expect_equal) or `var!=value`
    Test {
        var: String,
        value: String,
        expect_equal: bool,
    },
    Or,
}

impl Condition {
    pub fn test(var: impl Into<String>, value: impl Into<String>, expect_equal: bool) -> Self {
        Condition::Test {
            var: var.into(),
            value: value.into(),
            expect_equal,
        }
    }

    /// Parse `var=value`, `var!=value` or the literal `OR`.
    /// The value is everything after the first `=`.
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        if token == OR_TOKEN {
            return Ok(Condition::Or);
        }
        let (var, value) = token
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidWhere(token.to_string()))?;
        let (var, expect_equal) = match var.strip_suffix('!') {
            Some(var) => (var, false),
            None => (var, true),
        };
        if var.is_empty() {
            return Err(ConfigError::MissingWhereVariable);
        }
        Ok(Condition::test(var, value, expect_equal))
    }
}

/// Evaluation state while walking the conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainState {
    /// Inside an AND-chain; false once any test in it has failed
    InChain(bool),
    /// An OR has just restarted the chain after a failure
    JustReset,
}

/// Ordered tests and OR markers, evaluated left to right.
///
/// An OR does not open an alternative branch: reaching it with the chain
/// still true selects the line at once, without looking at what follows.
/// Reaching it after a failure starts a fresh chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhereClause {
    conditions: Vec<Condition>,
}

impl WhereClause {
    pub fn new(conditions: Vec<Condition>) -> Self {
        WhereClause { conditions }
    }

    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, ConfigError> {
        let conditions = tokens
            .iter()
            .map(|token| Condition::parse(token.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WhereClause { conditions })
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// True selects the line, false drops it.
    pub fn evaluate(&self, line: &ParsedLine) -> bool {
        let mut state = ChainState::InChain(true);
        for condition in &self.conditions {
            state = match (condition, state) {
                (Condition::Or, ChainState::InChain(true) | ChainState::JustReset) => {
                    return true;
                }
                (Condition::Or, ChainState::InChain(false)) => ChainState::JustReset,
                (
                    Condition::Test {
                        var,
                        value,
                        expect_equal,
                    },
                    state,
                ) => {
                    let acc = !matches!(state, ChainState::InChain(false));
                    // A bound but absent value differs from every value
                    let met = line
                        .binding(&VarRef::parse(var))
                        .is_some_and(|bound| (bound == Some(value.as_str())) == *expect_equal);
                    ChainState::InChain(acc && met)
                }
            };
        }
        !matches!(state, ChainState::InChain(false))
    }
}
