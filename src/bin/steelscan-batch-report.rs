//! Developer utility to aggregate a labels directory and print the batch report.

use std::path::PathBuf;

use steelscan::batch::{HISTOGRAM_BINS, aggregate_dir_with};

struct CliOptions {
    labels_dir: PathBuf,
    output_dir: Option<PathBuf>,
    histogram: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let stats = aggregate_dir_with(&options.labels_dir, |skipped| {
        eprintln!("warning: {skipped}");
    })
    .map_err(|err| err.to_string())?;

    let output_dir = options.output_dir.unwrap_or_else(|| {
        options
            .labels_dir
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| options.labels_dir.clone())
    });
    print!("{}", steelscan::batch::render_report(&stats, &output_dir));

    if options.histogram {
        println!();
        println!("Confidence histogram:");
        for (bin, count) in stats.confidence_histogram().iter().enumerate() {
            let low = bin as f64 / HISTOGRAM_BINS as f64;
            let high = (bin + 1) as f64 / HISTOGRAM_BINS as f64;
            println!("  {low:.1}-{high:.1}: {count}");
        }
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut labels_dir: Option<PathBuf> = None;
    let mut output_dir: Option<PathBuf> = None;
    let mut histogram = false;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--output" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--output requires a value".to_string())?;
                output_dir = Some(PathBuf::from(value));
            }
            "--histogram" => histogram = true,
            flag if flag.starts_with('-') => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            path => {
                if labels_dir.is_some() {
                    return Err(format!("Unexpected extra path: {path}\n\n{}", help_text()));
                }
                labels_dir = Some(PathBuf::from(path));
            }
        }
        idx += 1;
    }

    let Some(labels_dir) = labels_dir else {
        return Err(format!("A labels directory is required\n\n{}", help_text()));
    };
    Ok(Some(CliOptions {
        labels_dir,
        output_dir,
        histogram,
    }))
}

fn help_text() -> String {
    [
        "steelscan-batch-report",
        "",
        "Usage:",
        "  steelscan-batch-report <labels-dir> [--output <result-dir>] [--histogram]",
    ]
    .join("\n")
}
