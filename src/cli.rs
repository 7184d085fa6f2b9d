use crate::bp_class::{ClassSpec, DEFAULT_CLASS_TYPES};
use crate::errors::{AppError, Result};
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};

pub const USAGE_NOTE: &str = "ROI file should be a tab-delimited list of [chrom, start, stop, annotation] \
where start and stop are both 1-based chromosomal loci, e.g. \"20\t44429404\t44429608\tELMO2\". \
The ROI file *must* be sorted by chromosome/contig names.";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "calc_roi_covg",
    about = "Counts bases with sufficient read depth in regions of interest within two BAMs",
    after_help = USAGE_NOTE
)]
struct CliArgs {
    #[arg(value_name = "BAM1")]
    bam1: Option<String>,
    #[arg(value_name = "BAM2")]
    bam2: Option<String>,
    #[arg(value_name = "ROI_FILE")]
    roi_file: Option<String>,
    #[arg(value_name = "REF_SEQ_FASTA")]
    ref_fasta: Option<String>,
    #[arg(value_name = "OUTPUT_FILE")]
    output_file: Option<String>,
    #[arg(short = 'q', default_value = "20")]
    min_mapq: String,
    #[arg(short = 'n', default_value = "6")]
    min_depth_bam1: String,
    #[arg(short = 't', default_value = "8")]
    min_depth_bam2: String,
    #[arg(short = 'c', default_value = DEFAULT_CLASS_TYPES)]
    bp_class_types: String,
    #[arg(long = "threads", default_value = "1")]
    threads: String,
    #[arg(long = "progress", action = ArgAction::SetTrue)]
    progress: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalcRoiCovgArgs {
    pub bam1: String,
    pub bam2: String,
    pub roi_file: String,
    pub ref_fasta: String,
    pub output: String,
    pub min_mapq: u8,
    pub min_depth_bam1: u32,
    pub min_depth_bam2: u32,
    pub classes: ClassSpec,
    pub threads: usize,
    pub progress: bool,
}

impl Default for CalcRoiCovgArgs {
    fn default() -> Self {
        Self {
            bam1: String::new(),
            bam2: String::new(),
            roi_file: String::new(),
            ref_fasta: String::new(),
            output: "-".to_string(),
            min_mapq: 20,
            min_depth_bam1: 6,
            min_depth_bam2: 8,
            classes: ClassSpec::default(),
            threads: 1,
            progress: false,
        }
    }
}

impl CalcRoiCovgArgs {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("<bam1>", &self.bam1),
            ("<bam2>", &self.bam2),
            ("<roi_file>", &self.roi_file),
            ("<ref_seq_fasta>", &self.ref_fasta),
            ("<output_file>", &self.output),
        ] {
            if value.is_empty() {
                return Err(AppError::MissingRequired {
                    field: field.to_string(),
                });
            }
        }
        if self.threads == 0 {
            return Err(AppError::InvalidValue {
                flag: "--threads".to_string(),
                value: "0".to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }
        Ok(())
    }
}

pub fn parse_from_env() -> Result<CalcRoiCovgArgs> {
    parse_args(std::env::args())
}

pub fn parse_args<I, S>(args: I) -> Result<CalcRoiCovgArgs>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tokens: Vec<String> = args.into_iter().map(Into::into).collect();
    if tokens.is_empty() {
        tokens.push("calc_roi_covg".to_string());
    }

    let cli = CliArgs::try_parse_from(tokens).map_err(map_clap_error)?;

    let parsed = CalcRoiCovgArgs {
        bam1: cli.bam1.unwrap_or_default(),
        bam2: cli.bam2.unwrap_or_default(),
        roi_file: cli.roi_file.unwrap_or_default(),
        ref_fasta: cli.ref_fasta.unwrap_or_default(),
        output: cli.output_file.unwrap_or_default(),
        min_mapq: parse_u8("-q", &cli.min_mapq)?,
        min_depth_bam1: parse_u32("-n", &cli.min_depth_bam1)?,
        min_depth_bam2: parse_u32("-t", &cli.min_depth_bam2)?,
        classes: ClassSpec::parse(&cli.bp_class_types)?,
        threads: parse_usize("--threads", &cli.threads)?,
        progress: cli.progress,
    };

    parsed.validate()?;
    Ok(parsed)
}

fn map_clap_error(error: clap::Error) -> AppError {
    let kind = error.kind();
    let rendered = error.to_string();
    match kind {
        ErrorKind::UnknownArgument => AppError::UnsupportedArgument {
            arg: first_quoted_token(&rendered).unwrap_or(rendered),
        },
        ErrorKind::TooFewValues | ErrorKind::WrongNumberOfValues | ErrorKind::InvalidValue
            if rendered.contains("a value is required") =>
        {
            AppError::MissingValue {
                flag: first_quoted_token(&rendered).unwrap_or_else(|| "argument".to_string()),
            }
        }
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => AppError::ParseError {
            message: rendered,
        },
        _ => AppError::ParseError {
            message: clap_error_message(&rendered),
        },
    }
}

fn first_quoted_token(message: &str) -> Option<String> {
    let start = message.find('\'')?;
    let end = message[start + 1..].find('\'')?;
    Some(message[start + 1..start + 1 + end].to_string())
}

fn clap_error_message(message: &str) -> String {
    message
        .lines()
        .find_map(|line| line.strip_prefix("error: "))
        .or_else(|| message.lines().next())
        .unwrap_or("failed to parse arguments")
        .to_string()
}

fn parse_u8(flag: &str, value: &str) -> Result<u8> {
    value.parse::<u8>().map_err(|_| AppError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
        reason: "must be an integer between 0 and 255".to_string(),
    })
}

fn parse_u32(flag: &str, value: &str) -> Result<u32> {
    value.parse::<u32>().map_err(|_| AppError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
        reason: "must be a non-negative integer".to_string(),
    })
}

fn parse_usize(flag: &str, value: &str) -> Result<usize> {
    value.parse::<usize>().map_err(|_| AppError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
        reason: "must be a positive integer".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::parse_args;
    use crate::bp_class::ClassSpec;
    use crate::errors::AppError;

    const POSITIONAL: [&str; 6] = [
        "calc_roi_covg",
        "normal.bam",
        "tumor.bam",
        "roi.tsv",
        "ref.fa",
        "out.tsv",
    ];

    fn with_flags(flags: &[&'static str]) -> Vec<&'static str> {
        let mut args = vec![POSITIONAL[0]];
        args.extend_from_slice(flags);
        args.extend_from_slice(&POSITIONAL[1..]);
        args
    }

    #[test]
    fn parses_positionals_with_defaults() {
        let args = parse_args(POSITIONAL).expect("expected parse success");
        assert_eq!(args.bam1, "normal.bam");
        assert_eq!(args.bam2, "tumor.bam");
        assert_eq!(args.roi_file, "roi.tsv");
        assert_eq!(args.ref_fasta, "ref.fa");
        assert_eq!(args.output, "out.tsv");
        assert_eq!(args.min_mapq, 20);
        assert_eq!(args.min_depth_bam1, 6);
        assert_eq!(args.min_depth_bam2, 8);
        assert_eq!(args.classes, ClassSpec::default());
        assert_eq!(args.threads, 1);
        assert!(!args.progress);
    }

    #[test]
    fn parses_thresholds_and_classes() {
        let args = parse_args(with_flags(&[
            "-q", "30", "-n", "10", "-t", "12", "-c", "TpC,CpG,AT",
        ]))
        .expect("expected parse success");
        assert_eq!(args.min_mapq, 30);
        assert_eq!(args.min_depth_bam1, 10);
        assert_eq!(args.min_depth_bam2, 12);
        assert_eq!(
            args.classes.labels().collect::<Vec<_>>(),
            vec!["TpC", "CpG", "AT"]
        );
    }

    #[test]
    fn parses_threads_and_progress() {
        let args = parse_args(with_flags(&["--threads", "4", "--progress"]))
            .expect("expected parse success");
        assert_eq!(args.threads, 4);
        assert!(args.progress);
    }

    #[test]
    fn rejects_missing_positionals() {
        let result = parse_args(["calc_roi_covg", "normal.bam", "tumor.bam"]);
        assert!(matches!(result, Err(AppError::MissingRequired { .. })));
    }

    #[test]
    fn rejects_bad_class_types() {
        let result = parse_args(with_flags(&["-c", "AT,CGTA"]));
        assert!(matches!(result, Err(AppError::InvalidValue { .. })));
    }

    #[test]
    fn rejects_non_numeric_thresholds() {
        assert!(parse_args(with_flags(&["-q", "high"])).is_err());
        assert!(parse_args(with_flags(&["-n", "-1"])).is_err());
        assert!(parse_args(with_flags(&["--threads", "0"])).is_err());
    }

    #[test]
    fn rejects_unknown_flags() {
        let result = parse_args(with_flags(&["-x", "1"]));
        assert!(matches!(result, Err(AppError::UnsupportedArgument { .. })));
    }
}
