// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tri-state result for steps that may legitimately produce nothing

/// Result of a geometry step that is allowed to come back empty.
///
/// `Skipped` means the input did not support the step (too few points);
/// `Failed` means the step ran and a primitive could not produce a value.
/// Callers decide whether either one ends their loop; neither aborts the
/// whole operation the way [`crate::Error`] does.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Skipped(String),
    Failed(String),
}

impl<T> Outcome<T> {
    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    /// Converts to `Option`, discarding the reason
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Ok(value) => Outcome::Ok(f(value)),
            Outcome::Skipped(reason) => Outcome::Skipped(reason),
            Outcome::Failed(cause) => Outcome::Failed(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_preserves_variant() {
        let ok: Outcome<u32> = Outcome::Ok(2);
        assert_eq!(ok.map(|v| v * 2), Outcome::Ok(4));

        let skipped: Outcome<u32> = Outcome::Skipped("few points".into());
        assert_eq!(skipped.map(|v| v * 2), Outcome::Skipped("few points".into()));

        let failed: Outcome<u32> = Outcome::Failed("degenerate".into());
        assert!(!failed.is_ok());
        assert_eq!(failed.ok(), None);
    }
}
