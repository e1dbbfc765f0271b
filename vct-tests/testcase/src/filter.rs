// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::TestCase;

/// Selects test cases by name and by marker.
///
/// A test is selected if (a) its fully qualified name includes every string
/// in `must_include` and none in `must_exclude`, and (b) it carries every
/// marker in `markers` and none in `excluded_markers`.
#[derive(Clone, Copy, Debug)]
pub struct TestCaseFilter<'a> {
    pub must_include: &'a [String],
    pub must_exclude: &'a [String],
    pub markers: &'a [String],
    pub excluded_markers: &'a [String],
}

impl<'a> TestCaseFilter<'a> {
    pub fn check(&self, tc: &TestCase) -> bool {
        self.check_name(&tc.fully_qualified_name())
            && self.check_markers(|m| tc.metadata().has_marker(m))
    }

    fn check_name(&self, name: &str) -> bool {
        self.must_include.iter().all(|inc| name.contains(inc.as_str()))
            && self.must_exclude.iter().all(|exc| !name.contains(exc.as_str()))
    }

    fn check_markers(&self, has_marker: impl Fn(&str) -> bool) -> bool {
        self.markers.iter().all(|m| has_marker(m))
            && self.excluded_markers.iter().all(|m| !has_marker(m))
    }
}
