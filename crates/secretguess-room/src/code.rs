//! Secret codes and guess scoring.

use std::fmt;
use std::str::FromStr;

/// Number of symbols in a code.
pub const CODE_LEN: usize = 4;

/// Returns `true` if `s` is a well-formed code: exactly four characters,
/// each `1`-`9`, no character repeated.
///
/// Secrets and guesses are checked by the same rule.
pub fn is_valid_code(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == CODE_LEN
        && bytes.iter().all(|b| (b'1'..=b'9').contains(b))
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| !bytes[..i].contains(b))
}

/// The input wasn't four distinct digits from 1 to 9.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0:?} is not a valid code (four different digits from 1 to 9)")]
pub struct CodeError(pub String);

/// A validated code. Only constructible through [`Code::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code([u8; CODE_LEN]);

impl Code {
    /// Validates and wraps `s`.
    ///
    /// # Errors
    /// Returns [`CodeError`] unless [`is_valid_code`] accepts `s`.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        if !is_valid_code(s) {
            return Err(CodeError(s.to_string()));
        }
        let mut digits = [0u8; CODE_LEN];
        digits.copy_from_slice(s.as_bytes());
        Ok(Self(digits))
    }

    /// The code's ASCII digits in order.
    pub fn digits(&self) -> &[u8; CODE_LEN] {
        &self.0
    }
}

impl FromStr for Code {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &d in &self.0 {
            write!(f, "{}", d as char)?;
        }
        Ok(())
    }
}

/// How close a guess came.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    /// Right digit, right position.
    pub exact: u8,
    /// Right digit, wrong position.
    pub misplaced: u8,
}

impl Feedback {
    /// All four digits in place.
    pub fn is_win(&self) -> bool {
        usize::from(self.exact) == CODE_LEN
    }
}

/// Scores `guess` against `secret`.
///
/// Counts each guessed digit once: exact if it sits in the same position,
/// misplaced if the secret holds it elsewhere. This is only correct because
/// codes never repeat a digit. If repeats are ever allowed, replace it with
/// multiset pegging (misplaced = sum over digits of min(count in secret,
/// count in guess) minus exact).
pub fn score(secret: &Code, guess: &Code) -> Feedback {
    let mut exact = 0;
    let mut misplaced = 0;
    for (i, g) in guess.0.iter().enumerate() {
        if secret.0[i] == *g {
            exact += 1;
        } else if secret.0.contains(g) {
            misplaced += 1;
        }
    }
    Feedback { exact, misplaced }
}
