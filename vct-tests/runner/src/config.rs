// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use vct_tests::vct_testcase::TestCaseFilter;

#[derive(Debug, Subcommand)]
pub enum Command {
    Run(RunOptions),
    List(ListOptions),
}

/// Runtime configuration options for the runner.
#[derive(Debug, Parser)]
#[clap(verbatim_doc_comment)]
pub struct ProcessArgs {
    #[clap(subcommand)]
    pub command: Command,

    /// Suppress emission of terminal control codes in the runner's log output.
    #[clap(long, conflicts_with = "emit_bunyan")]
    pub disable_ansi: bool,

    /// Emit Bunyan-formatted logs.
    #[clap(long)]
    pub emit_bunyan: bool,
}

/// Options that select which registered tests a command applies to.
#[derive(Args, Debug, Default)]
pub struct SelectionOptions {
    /// Only select tests whose fully-qualified names contain this string.
    /// Can be specified multiple times.
    #[clap(long, value_parser)]
    pub include_filter: Vec<String>,

    /// Only select tests whose fully-qualified names do not contain this
    /// string. Can be specified multiple times.
    #[clap(long, value_parser)]
    pub exclude_filter: Vec<String>,

    /// Only select tests carrying this marker (e.g. `esxi`, `vsan_ndc`).
    /// Can be specified multiple times; a test must carry all of them.
    #[clap(long = "marker", value_parser)]
    pub markers: Vec<String>,

    /// Skip tests carrying this marker. Can be specified multiple times.
    #[clap(long = "exclude-marker", value_parser)]
    pub excluded_markers: Vec<String>,
}

impl SelectionOptions {
    pub fn filter(&self) -> TestCaseFilter<'_> {
        TestCaseFilter {
            must_include: &self.include_filter,
            must_exclude: &self.exclude_filter,
            markers: &self.markers,
            excluded_markers: &self.excluded_markers,
        }
    }
}

#[derive(Args, Debug)]
#[clap(verbatim_doc_comment)]
pub struct RunOptions {
    /// The path to a TOML file describing the devices under test.
    #[clap(long, value_parser)]
    pub testbed: Utf8PathBuf,

    /// The path to a TOML file holding each test's expected values and the
    /// devices it runs against.
    ///
    /// Selected tests without an entry in this file are skipped.
    #[clap(long, value_parser)]
    pub testcase_data: Utf8PathBuf,

    /// If set, write a JSON report of every execution to this path.
    #[clap(long, value_parser)]
    pub report_path: Option<Utf8PathBuf>,

    #[clap(flatten)]
    pub selection: SelectionOptions,
}

#[derive(Args, Debug)]
#[clap(verbatim_doc_comment)]
pub struct ListOptions {
    #[clap(flatten)]
    pub selection: SelectionOptions,
}
