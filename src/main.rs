use std::path::PathBuf;
use std::process::ExitCode;

use clip_preprocess_rs::utils::array::write_npy;
use clip_preprocess_rs::{ImagePreprocessor, ProcessorConfig, Result};
use ndarray::Axis;
use tracing::{error, info};

const USAGE: &str = "usage: clip-preprocess-rs <image> [preprocessor_config.json] [out.npy]";

#[derive(Debug, PartialEq)]
struct Args {
    image: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Option<Args> {
    if args.is_empty() || args.len() > 3 {
        return None;
    }
    Some(Args {
        image: PathBuf::from(&args[0]),
        config: args.get(1).map(PathBuf::from),
        output: args.get(2).map(PathBuf::from),
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let Some(args) = parse_args(&raw) else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(p) => ProcessorConfig::from_file(p)?,
        None => ProcessorConfig::default(),
    };
    let processor = ImagePreprocessor::new(config)?;

    let image = image::open(&args.image)?;
    let output = processor.process_image(&image)?;
    info!("Output shape: {:?}", output.shape());

    for (c, plane) in output.axis_iter(Axis(0)).enumerate() {
        info!("channel {} mean: {:.6}", c, plane.mean().unwrap_or(f32::NAN));
    }

    if let Some(out_path) = &args.output {
        write_npy(&output, out_path)?;
        info!("Wrote {}", out_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_requires_image() {
        assert_eq!(parse_args(&[]), None);
        assert_eq!(parse_args(&strings(&["a", "b", "c", "d"])), None);
    }

    #[test]
    fn test_parse_args_optional_paths() {
        let args = parse_args(&strings(&["cat.jpg"])).unwrap();
        assert_eq!(args.image, PathBuf::from("cat.jpg"));
        assert!(args.config.is_none() && args.output.is_none());

        let args = parse_args(&strings(&["cat.jpg", "preprocessor_config.json", "out.npy"])).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("preprocessor_config.json")));
        assert_eq!(args.output, Some(PathBuf::from("out.npy")));
    }
}
