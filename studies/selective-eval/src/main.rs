use std::{ fs, io::Read, sync::mpsc, thread };

use anyhow::{ anyhow, Context, Result };
use clap::Parser;
use selective_eval::{
    config::{ Cli, Command, EvalArgs, InspectArgs },
    data::{ ClassMap, CsvPathsReader, FilenameForm, Predictions, Reader },
    evaluate::{ evaluate, EvalReport },
    logging,
};
use tracing::{ info, warn };

fn main() -> Result<()> {
    let cli = Cli::parse();

    // the dashboard owns the terminal, keep logs quiet unless asked for
    let dashboard = matches!(&cli.command, Command::Eval(args) if args.dashboard);
    let default_level = match (&cli.log_level, dashboard) {
        (Some(level), _) => level.as_str(),
        (None, true) => "off",
        (None, false) => "info",
    };
    logging::init_tracing(default_level)?;

    match cli.command {
        Command::Eval(args) => eval(args),
        Command::Inspect(args) => inspect(args),
    }
}

fn eval(args: EvalArgs) -> Result<()> {
    let predictions = Predictions::load(&args.predictions).with_context(||
        format!("failed to load predictions from {}", args.predictions.display())
    )?;
    let options = args.options();

    let report = if args.dashboard {
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || evaluate(&predictions, &options, Some(&tx)));

        ui::run_dashboard(rx).map_err(|err| anyhow!("dashboard failed: {err}"))?;

        worker
            .join()
            .map_err(|_| anyhow!("evaluation thread panicked"))??
    } else {
        evaluate(&predictions, &options, None)?
    };

    for line in report.summary() {
        println!("{line}");
    }

    if let Some(path) = &args.results_file {
        write_results(&report, path)?;
        info!(path = %path.display(), "wrote results");
    }
    Ok(())
}

fn write_results(report: &EvalReport, path: &std::path::Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn inspect(args: InspectArgs) -> Result<()> {
    let class_map = ClassMap::load(&args.class_map).with_context(||
        format!("failed to load class map {}", args.class_map.display())
    )?;
    let reader = CsvPathsReader::new(&args.images_dir, &args.samples, &class_map)?;
    let form = FilenameForm::from(args.form);

    info!(samples = reader.len(), classes = class_map.len(), "reader ready");

    let limit = args.limit.unwrap_or(reader.len()).min(reader.len());
    for index in 0..limit {
        let filename = reader.filename(index, form)?;
        let (label, bytes) = reader
            .with_item(index, |file, label| {
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes).map(|_| (label, bytes))
            })
            .with_context(|| format!("failed to open sample {index}"))??;

        let size = match image::load_from_memory(&bytes) {
            Ok(img) => format!("{}x{}", img.width(), img.height()),
            Err(err) => {
                warn!(index, error = %err, "sample is not a decodable image");
                "-".to_string()
            }
        };

        println!("{index}\t{}\t{label}\t{}\t{size}", filename.display(), bytes.len());
    }
    Ok(())
}
