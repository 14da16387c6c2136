use core::{fmt, str::FromStr, time::Duration};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Upper confidence bound over win/visit counts.
    Ucb,
    /// Exponential weights with a uniform exploration floor.
    Exp3,
}

#[derive(Debug, Error)]
#[error("unknown policy \"{0}\" (expected ucb or exp3)")]
pub struct ParsePolicyError(String);

impl FromStr for PolicyKind {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ucb" | "uct" => Ok(Self::Ucb),
            "exp3" | "regret" => Ok(Self::Exp3),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Ucb => "ucb",
            Self::Exp3 => "exp3",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub threads: usize,
    pub budget: Duration,
    pub policy: PolicyKind,
    pub exploration: f32,
    pub gamma: f32,
    pub bank_bytes: usize,
    pub banks: usize,
    pub max_turn: u32,
    pub opening_turns: u32,
    pub seed: Option<u64>,
}

pub static SEARCH_PARAMS: SearchParams = SearchParams {
    threads: 4,
    budget: Duration::from_millis(1900),
    policy: PolicyKind::Ucb,
    exploration: core::f32::consts::SQRT_2,
    gamma: 0.1,
    bank_bytes: 256 << 20,
    banks: 4,
    max_turn: 400,
    opening_turns: 13,
    seed: None,
};

impl Default for SearchParams {
    fn default() -> Self {
        SEARCH_PARAMS.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("ucb", PolicyKind::Ucb)]
    #[case("UCT", PolicyKind::Ucb)]
    #[case("exp3", PolicyKind::Exp3)]
    #[case("regret", PolicyKind::Exp3)]
    fn parses_policy(#[case] input: &str, #[case] expected: PolicyKind) {
        assert_eq!(input.parse::<PolicyKind>().unwrap(), expected);
        assert_eq!(expected.to_string().parse::<PolicyKind>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!("minimax".parse::<PolicyKind>().is_err());
    }
}
