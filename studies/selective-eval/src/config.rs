use std::path::PathBuf;

use clap::{ Args, Parser, Subcommand, ValueEnum };

use crate::data::FilenameForm;
use crate::evaluate::EvalOptions;
use crate::metrics::EVAL_VERIFICATION_RATES;

#[derive(Parser, Debug)]
#[command(
    name = "selective-eval",
    version,
    about = "Top-k and selective prediction accuracy over dumped model outputs"
)]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. `debug`, `selective_eval=trace`)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the metrics over a predictions csv
    Eval(EvalArgs),
    /// Load a samples table and open its first samples
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EvalArgs {
    /// csv with a `target` column and one score column per class
    #[arg(long)]
    pub predictions: PathBuf,

    #[arg(long, default_value_t = 256)]
    pub batch_size: usize,

    #[arg(long, value_delimiter = ',', default_values_t = [1usize, 5])]
    pub topk: Vec<usize>,

    /// Fractions of least confident predictions assumed to be verified
    #[arg(
        long,
        value_delimiter = ',',
        value_parser = parse_rate,
        default_values_t = EVAL_VERIFICATION_RATES
    )]
    pub verification_rates: Vec<f64>,

    /// Write the report as json
    #[arg(long)]
    pub results_file: Option<PathBuf>,

    /// Show the terminal dashboard while evaluating
    #[arg(long)]
    pub dashboard: bool,
}

impl EvalArgs {
    pub fn options(&self) -> EvalOptions {
        EvalOptions {
            batch_size: self.batch_size,
            topk: self.topk.clone(),
            verification_rates: self.verification_rates.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub images_dir: PathBuf,

    /// csv with `filename` and `label` columns
    #[arg(long)]
    pub samples: PathBuf,

    /// .txt (one class per line) or .json (`{"label": id}`)
    #[arg(long)]
    pub class_map: PathBuf,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, value_enum, default_value_t = FormArg::Relative)]
    pub form: FormArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormArg {
    Basename,
    Absolute,
    Relative,
}

impl From<FormArg> for FilenameForm {
    fn from(form: FormArg) -> Self {
        match form {
            FormArg::Basename => FilenameForm::Basename,
            FormArg::Absolute => FilenameForm::Absolute,
            FormArg::Relative => FilenameForm::RelativeToRoot,
        }
    }
}

fn parse_rate(value: &str) -> Result<f64, String> {
    let rate: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("verification rate {rate} is outside [0, 1]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_defaults() {
        let cli = Cli::try_parse_from(["selective-eval", "eval", "--predictions", "p.csv"]).unwrap();
        let Command::Eval(args) = cli.command else {
            panic!("expected eval");
        };

        assert_eq!(args.batch_size, 256);
        assert_eq!(args.topk, vec![1, 5]);
        assert_eq!(args.verification_rates, EVAL_VERIFICATION_RATES.to_vec());
        assert!(!args.dashboard);
    }

    #[test]
    fn comma_separated_lists() {
        let cli = Cli::try_parse_from([
            "selective-eval",
            "eval",
            "--predictions",
            "p.csv",
            "--topk",
            "1,3",
            "--verification-rates",
            "0,0.5,1",
        ]).unwrap();
        let Command::Eval(args) = cli.command else {
            panic!("expected eval");
        };

        assert_eq!(args.topk, vec![1, 3]);
        assert_eq!(args.verification_rates, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn rejects_rates_outside_unit_interval() {
        let result = Cli::try_parse_from([
            "selective-eval",
            "eval",
            "--predictions",
            "p.csv",
            "--verification-rates",
            "0.1,1.5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn inspect_form_maps_to_filename_form() {
        let cli = Cli::try_parse_from([
            "selective-eval",
            "inspect",
            "--images-dir",
            "imgs",
            "--samples",
            "s.csv",
            "--class-map",
            "c.txt",
            "--form",
            "basename",
        ]).unwrap();
        let Command::Inspect(args) = cli.command else {
            panic!("expected inspect");
        };

        assert_eq!(FilenameForm::from(args.form), FilenameForm::Basename);
        assert_eq!(FilenameForm::from(FormArg::Relative), FilenameForm::RelativeToRoot);
    }
}
