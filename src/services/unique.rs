//! Collision resolution by numeric suffixing.
//!
//! The probe and the eventual write are separate steps, so two writers in the
//! same scope can both be handed the same "first free" slug. Callers that
//! need a hard guarantee put a UNIQUE constraint on the column and retry the
//! whole resolve-and-persist sequence when it fires (see `SqliteTable::save`).

use crate::error::{SlugError, SlugResult};
use crate::services::slug::truncate;

/// A base slug plus the suffix state of one resolution.
#[derive(Debug)]
struct Candidate<'a> {
    base: String,
    count: u64,
    suffix: String,
    separator: &'a str,
    max_length: Option<usize>,
}

impl<'a> Candidate<'a> {
    fn new(base: &str, separator: &'a str, max_length: Option<usize>) -> Self {
        Self {
            base: base.to_string(),
            count: 0,
            suffix: String::new(),
            separator,
            max_length,
        }
    }

    fn value(&self) -> String {
        format!("{}{}", self.base, self.suffix)
    }

    /// Moves to the next suffix, shortening the base when the suffixed slug
    /// would exceed the maximum length.
    fn advance(&mut self) -> SlugResult<()> {
        self.count += 1;
        self.suffix = format!("{}{}", self.separator, self.count);

        let Some(max) = self.max_length else {
            return Ok(());
        };

        if self.suffix.chars().count() > max {
            // The separator no longer fits; fall back to bare digits.
            self.suffix = self.count.to_string();
            if self.suffix.len() > max {
                return Err(SlugError::InvalidInput(format!(
                    "no free slug of at most {} characters for '{}'",
                    max, self.base
                )));
            }
        }

        let suffix_len = self.suffix.chars().count();
        if self.base.chars().count() + suffix_len > max {
            self.base = truncate(&self.base, Some(max - suffix_len));
        }
        Ok(())
    }
}

/// Returns the first of `base`, `base-1`, `base-2`, ... for which `exists`
/// reports no match. Errors from `exists` are returned as-is.
pub fn resolve<F>(
    base: &str,
    separator: &str,
    max_length: Option<usize>,
    mut exists: F,
) -> SlugResult<String>
where
    F: FnMut(&str) -> SlugResult<bool>,
{
    let mut candidate = Candidate::new(base, separator, max_length);
    let mut value = candidate.value();

    while exists(&value)? {
        candidate.advance()?;
        tracing::debug!(
            "Slug '{}' is taken, trying suffix {}",
            value,
            candidate.count
        );
        value = candidate.value();
    }

    Ok(value)
}
