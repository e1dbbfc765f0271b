// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod config;
mod execute;
mod report;

use anyhow::Context;
use clap::Parser;
use config::{ListOptions, ProcessArgs, RunOptions};
use tracing::{debug, info};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};
use vct_framework::FrameworkParameters;
use vct_tests::vct_testcase::{filtered_test_cases, Framework};

use crate::execute::ExecutionStats;

fn main() -> anyhow::Result<()> {
    let runner_args = ProcessArgs::parse();
    set_tracing_subscriber(&runner_args)?;

    info!(?runner_args);

    match &runner_args.command {
        config::Command::Run(opts) => {
            let exit_code = run_tests(opts)?.tests_failed;
            debug!(exit_code);
            std::process::exit(i32::try_from(exit_code).unwrap_or(i32::MAX));
        }
        config::Command::List(opts) => list_tests(opts),
    }

    Ok(())
}

fn run_tests(run_opts: &RunOptions) -> anyhow::Result<ExecutionStats> {
    let params = FrameworkParameters {
        testbed_path: run_opts.testbed.clone(),
        testcase_data_path: run_opts.testcase_data.clone(),
    };
    let framework = Framework::new(&params)
        .context("failed to set up the test framework")?;
    info!(
        devices = framework.testbed.device_names().count(),
        records = framework.testcase_data.len(),
        "loaded testbed and testcase data"
    );

    // Run the tests and print results.
    let filter = run_opts.selection.filter();
    let execution_stats = execute::run_tests_with_ctx(
        &framework,
        filtered_test_cases(&filter),
    );
    if !execution_stats.failed_executions.is_empty() {
        println!("\nfailures:");
        for label in &execution_stats.failed_executions {
            println!("    {label}");
        }
        println!();
    }

    println!(
        "test result: {}. {} passed; {} failed; {} skipped; {} not run; \
        finished in {:.2}s\n",
        if execution_stats.tests_failed != 0 { "FAILED" } else { "ok" },
        execution_stats.tests_passed,
        execution_stats.tests_failed,
        execution_stats.tests_skipped,
        execution_stats.tests_not_run,
        execution_stats.duration.as_secs_f64()
    );

    if let Some(path) = &run_opts.report_path {
        execution_stats.report.write_to(path)?;
        info!(%path, "wrote run report");
    }

    Ok(execution_stats)
}

fn list_tests(list_opts: &ListOptions) {
    println!("Tests enabled after applying filters:\n");

    let filter = list_opts.selection.filter();
    let mut count = 0;
    for tc in filtered_test_cases(&filter) {
        let metadata = tc.metadata();
        println!(
            "    {} ({} v{}; {})",
            tc.fully_qualified_name(),
            metadata.testcase_id,
            metadata.version,
            metadata.markers.join(", ")
        );
        count += 1
    }

    println!("\n{} test(s) selected", count);
}

fn set_tracing_subscriber(args: &ProcessArgs) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into());
    let subscriber = Registry::default().with(filter.from_env_lossy());
    if args.emit_bunyan {
        let bunyan_layer =
            BunyanFormattingLayer::new("vct-runner".into(), std::io::stdout);
        let subscriber = subscriber.with(JsonStorageLayer).with(bunyan_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let stdout_log = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_ansi(!args.disable_ansi);
        let subscriber = subscriber.with(stdout_log);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
