use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;

/// Alphabet for generated tokens: upper, lower, digits.
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Default inclusive bounds for generated token length.
const DEFAULT_MIN_LEN: usize = 12;
const DEFAULT_MAX_LEN: usize = 20;

/// Upper bound on rejection-sampling retries before a token request is
/// declared unsatisfiable. Keeps generation from stalling when the caller
/// asks for more unique values than the configured lengths can provide.
const MAX_RETRIES_PER_TOKEN: usize = 1000;

/// Errors that can occur while generating unique random tokens.
#[derive(Error, Debug)]
pub enum TokenError {
    /// The uniqueness retry budget was exhausted; the requested count likely
    /// exceeds the practically available space for the configured lengths.
    #[error("token space exhausted after {attempts} attempts ({emitted} tokens already emitted)")]
    SpaceExhausted { attempts: usize, emitted: usize },
}

/// Produces unique random alphanumeric identifier strings of bounded length.
///
/// Uniqueness is enforced within one generator instance via a rejection loop
/// against the set of previously emitted values. The emitted set is private
/// to the instance; a fresh generator starts a fresh uniqueness session.
#[derive(Debug)]
pub struct TokenGenerator {
    min_len: usize,
    max_len: usize,
    emitted: HashSet<String>,
}

impl TokenGenerator {
    /// Creates a generator with the default 12..=20 length bounds.
    pub fn new() -> Self {
        Self::with_bounds(DEFAULT_MIN_LEN, DEFAULT_MAX_LEN)
    }

    /// Creates a generator with custom inclusive length bounds.
    /// Bounds are swapped if given in the wrong order.
    pub fn with_bounds(min_len: usize, max_len: usize) -> Self {
        let (min_len, max_len) = if min_len <= max_len {
            (min_len, max_len)
        } else {
            (max_len, min_len)
        };
        Self {
            min_len: min_len.max(1),
            max_len: max_len.max(1),
            emitted: HashSet::new(),
        }
    }

    /// Returns the next unique token, or `TokenError::SpaceExhausted` when
    /// the retry budget runs out.
    pub fn next_token<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<String, TokenError> {
        for _ in 0..MAX_RETRIES_PER_TOKEN {
            let length = rng.random_range(self.min_len..=self.max_len);
            let candidate: String = (0..length)
                .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
                .collect();
            if self.emitted.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }
        Err(TokenError::SpaceExhausted {
            attempts: MAX_RETRIES_PER_TOKEN,
            emitted: self.emitted.len(),
        })
    }

    /// Returns exactly `count` distinct tokens.
    pub fn take<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<String>, TokenError> {
        (0..count).map(|_| self.next_token(rng)).collect()
    }

    /// Number of tokens emitted so far in this session.
    pub fn emitted_count(&self) -> usize {
        self.emitted.len()
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}
