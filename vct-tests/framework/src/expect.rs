// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accumulating expected-versus-actual comparisons into a single verdict.
//!
//! Checks that compare several fields record every comparison before
//! failing, so one run reports all mismatches rather than the first.

use std::fmt::{Debug, Display};

use tracing::info;

/// The result of comparing one actual value against its expectation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comparison {
    pub description: String,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
}

impl Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: expected {}, actual {}",
            self.description, self.expected, self.actual
        )
    }
}

#[derive(Debug, Default)]
pub struct Expectations {
    summary: String,
    comparisons: Vec<Comparison>,
}

impl Expectations {
    /// Creates an empty set of expectations. `summary` heads the error
    /// returned by [`Expectations::finish`] if any comparison fails.
    pub fn new(summary: impl Into<String>) -> Self {
        Self { summary: summary.into(), comparisons: Vec::new() }
    }

    /// Records whether `actual` equals `expected`.
    pub fn equal<T>(&mut self, description: &str, expected: T, actual: T) -> bool
    where
        T: PartialEq + Debug,
    {
        let passed = expected == actual;
        self.record(Comparison {
            description: description.to_string(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
            passed,
        })
    }

    /// Records a comparison whose outcome the caller has already decided,
    /// e.g. a containment or presence test.
    pub fn check(
        &mut self,
        description: &str,
        expected: impl Display,
        actual: impl Display,
        passed: bool,
    ) -> bool {
        self.record(Comparison {
            description: description.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            passed,
        })
    }

    fn record(&mut self, comparison: Comparison) -> bool {
        if comparison.passed {
            info!(
                check = %comparison.description,
                value = %comparison.actual,
                "expectation met"
            );
        } else {
            info!(
                check = %comparison.description,
                expected = %comparison.expected,
                actual = %comparison.actual,
                "expectation not met"
            );
        }

        let passed = comparison.passed;
        self.comparisons.push(comparison);
        passed
    }

    pub fn comparisons(&self) -> &[Comparison] {
        &self.comparisons
    }

    pub fn failures(&self) -> impl Iterator<Item = &Comparison> {
        self.comparisons.iter().filter(|c| !c.passed)
    }

    /// Returns `Ok` if every recorded comparison passed, or an error listing
    /// each failed comparison.
    pub fn finish(self) -> anyhow::Result<()> {
        let failures: Vec<String> =
            self.failures().map(|c| format!("    {c}")).collect();
        if failures.is_empty() {
            info!(
                comparisons = self.comparisons.len(),
                "all expectations met"
            );
            Ok(())
        } else {
            anyhow::bail!("{}\n{}", self.summary, failures.join("\n"))
        }
    }
}
