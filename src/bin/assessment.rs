//! Assessment command line tool
//!
//! Streams attribute-sorted result lists through every configured
//! pruner-filter strategy and writes the aggregated performance report as
//! JSON. Lists come either from files given as positional arguments (one
//! list per file, read until EOF) or from stdin (a line with the number of
//! lists, then each list preceded by its item count).

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};

use rapid_filtering::assessment::{self, parse_parameter_list, AssessmentConfig};
use rapid_filtering::errors::{FilteringError, Result};
use rapid_filtering::io::{read_results_list, ResultsList};
use rapid_filtering::metric::MetricKind;

#[derive(Parser, Debug)]
#[command(
    name = "assessment",
    version,
    about = "Tests the filtering strategies and prints the performance results"
)]
struct Args {
    /// Search quality metric to use: dcg or dcglz
    #[arg(short, long, default_value = "dcg")]
    metric: String,

    /// Truncate all lists to the first n elements, if n is greater than zero
    #[arg(short = 'n', long = "n-cut-list", default_value = "0,10000")]
    n_cut_list: String,

    /// Maximum number of elements to return
    #[arg(short = 'k', long = "k-list", default_value = "50,100")]
    k_list: String,

    /// Target approximation factors
    #[arg(short = 'e', long = "epsilon-list", default_value = "0.1,0.01")]
    epsilon_list: String,

    /// Skip the lists shorter than n elements
    #[arg(short = 's', long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    skip_shorter_lists: bool,

    /// Number of times each test must be repeated
    #[arg(short = 'r', long, default_value_t = 5)]
    num_runs: u32,

    /// Pin the process to the given CPU (-1 leaves it unpinned)
    #[arg(short = 'a', long, default_value_t = -1)]
    cpu_affinity: i32,

    /// Check all solutions
    #[arg(short = 'c', long)]
    check_solutions: bool,

    /// Show the computation progress
    #[arg(short = 'p', long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    show_progress: bool,

    /// Write the report to FILE instead of standard output
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Test the cutoff-opt strategy
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    test_cutoff: bool,

    /// Test the topk-opt strategy
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    test_topk: bool,

    /// Test the epsilon filtering strategy
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    test_epsfiltering: bool,

    /// Input list files; stdin is used when none are given
    files: Vec<PathBuf>,
}

fn build_config(args: &Args) -> Result<AssessmentConfig> {
    let mut config = AssessmentConfig {
        metric: args.metric.parse::<MetricKind>()?,
        n_cut_list: parse_parameter_list(&args.n_cut_list)?,
        k_list: parse_parameter_list(&args.k_list)?,
        epsilon_list: parse_parameter_list(&args.epsilon_list)?,
        skip_shorter_lists: args.skip_shorter_lists,
        check_solutions: args.check_solutions,
        num_runs: args.num_runs,
        test_cutoff: args.test_cutoff,
        test_topk: args.test_topk,
        test_epsfiltering: args.test_epsfiltering,
    };
    config.validate()?;
    Ok(config)
}

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>7}/{len:7} {elapsed_precise}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// Check the files up front so a typo fails before hours of measurement.
fn check_input_files(files: &[PathBuf]) -> Result<()> {
    for path in files {
        if path.is_dir() {
            return Err(FilteringError::resource(format!(
                "the following file is a directory: {}",
                path.display()
            )));
        }
        File::open(path).map_err(|err| {
            FilteringError::resource(format!("unable to open the file {}: {err}", path.display()))
        })?;
    }
    Ok(())
}

fn file_lists(files: Vec<PathBuf>) -> impl Iterator<Item = Result<(String, ResultsList)>> {
    files.into_iter().map(|path| -> Result<(String, ResultsList)> {
        let file = File::open(&path).map_err(|err| {
            FilteringError::resource(format!("unable to open the file {}: {err}", path.display()))
        })?;
        let mut reader = BufReader::new(file);
        let list = read_results_list(&mut reader, false)?;
        Ok((path.display().to_string(), list))
    })
}

fn stdin_lists(
    mut reader: impl BufRead + 'static,
) -> Result<(usize, impl Iterator<Item = Result<(String, ResultsList)>>)> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(FilteringError::input_format(
            "unable to extract the number of lists",
        ));
    }
    let num_lists: usize = line.trim().parse().map_err(|_| {
        FilteringError::input_format(format!(
            "unable to extract the number of lists from '{}'",
            line.trim()
        ))
    })?;

    let iterator = (0..num_lists)
        .map(move |i| read_results_list(&mut reader, true).map(|list| (i.to_string(), list)));
    Ok((num_lists, iterator))
}

fn run(mut args: Args) -> Result<()> {
    let config = build_config(&args)?;
    let output = args.output.take();
    let files = std::mem::take(&mut args.files);

    if args.cpu_affinity > -1 {
        let core = core_affinity::CoreId {
            id: args.cpu_affinity as usize,
        };
        if !core_affinity::set_for_current(core) {
            return Err(FilteringError::resource(format!(
                "unable to set the cpu affinity to core {}",
                args.cpu_affinity
            )));
        }
    }

    let report = if files.is_empty() {
        let (num_lists, lists) = stdin_lists(BufReader::new(io::stdin()))?;
        let bar = args.show_progress.then(|| progress_bar(num_lists as u64));
        let bar_tick = bar.clone();
        let lists = lists.inspect(move |_| {
            if let Some(bar) = &bar_tick {
                bar.inc(1);
            }
        });
        let report = assessment::run(&config, lists)?;
        if let Some(bar) = bar {
            bar.finish();
        }
        report
    } else {
        check_input_files(&files)?;
        let bar = args.show_progress.then(|| progress_bar(files.len() as u64));
        let bar_tick = bar.clone();
        let lists = file_lists(files).inspect(move |_| {
            if let Some(bar) = &bar_tick {
                bar.inc(1);
            }
        });
        let report = assessment::run(&config, lists)?;
        if let Some(bar) = bar {
            bar.finish();
        }
        report
    };

    match output {
        Some(path) => {
            let mut file = File::create(&path).map_err(|err| {
                FilteringError::resource(format!(
                    "unable to open the output file {}: {err}",
                    path.display()
                ))
            })?;
            serde_json::to_writer_pretty(&mut file, &report)?;
            writeln!(file)?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, &report)?;
            writeln!(handle)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}.");
            ExitCode::FAILURE
        }
    }
}
