//! RangeSpec codec.
//!
//! The classifier asks the engine for link indices as compact range lists
//! such as `"10-20, 3, 90"`. Token order is relevance order, so decoding
//! preserves it exactly: `"2,0-1"` means 2, then 0, then 1.

use std::fmt;
use std::str::FromStr;

use crate::error::RangeSpecError;

/// One token of a range list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeToken {
    /// A single index `n`
    Single(usize),

    /// An inclusive ascending span `a-b`
    Span(usize, usize),
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Span(a, b) => write!(f, "{a}-{b}"),
        }
    }
}

/// A decoded range list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSpec {
    tokens: Vec<RangeToken>,
}

impl RangeSpec {
    /// Decode a range list. An empty (or all-whitespace) list is valid.
    pub fn parse(input: &str) -> Result<Self, RangeSpecError> {
        let tokens = input
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(parse_token)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tokens })
    }

    /// Canonical encoding of an index sequence: consecutive ascending runs
    /// become spans, everything else stays a single.
    pub fn encode(indices: &[usize]) -> Self {
        let mut tokens = Vec::new();
        let mut iter = indices.iter().copied();

        let Some(first) = iter.next() else {
            return Self::default();
        };
        let (mut start, mut end) = (first, first);

        for n in iter {
            if end.checked_add(1) == Some(n) {
                end = n;
            } else {
                tokens.push(run_token(start, end));
                start = n;
                end = n;
            }
        }
        tokens.push(run_token(start, end));

        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Expand to indices in token order, dropping any `>= bound`.
    ///
    /// Spans are clipped before expansion, so `"0-4000000000"` against a
    /// bound of 10 costs ten steps.
    pub fn indices(&self, bound: usize) -> Vec<usize> {
        let mut out = Vec::new();
        for token in &self.tokens {
            match *token {
                RangeToken::Single(n) if n < bound => out.push(n),
                RangeToken::Single(_) => {}
                RangeToken::Span(a, b) if a < bound => out.extend(a..=b.min(bound - 1)),
                RangeToken::Span(..) => {}
            }
        }
        out
    }
}

impl FromStr for RangeSpec {
    type Err = RangeSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

fn parse_token(token: &str) -> Result<RangeToken, RangeSpecError> {
    let invalid = || RangeSpecError::InvalidToken {
        token: token.to_string(),
    };

    match token.split_once('-') {
        Some((a, b)) => {
            let start: usize = a.trim().parse().map_err(|_| invalid())?;
            let end: usize = b.trim().parse().map_err(|_| invalid())?;
            if start > end {
                return Err(RangeSpecError::DescendingRange { start, end });
            }
            Ok(RangeToken::Span(start, end))
        }
        None => token.parse().map(RangeToken::Single).map_err(|_| invalid()),
    }
}

fn run_token(start: usize, end: usize) -> RangeToken {
    if start == end {
        RangeToken::Single(start)
    } else {
        RangeToken::Span(start, end)
    }
}
