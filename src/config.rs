use clap::Parser;
use image::ImageFormat;
use std::path::PathBuf;
use std::thread;

use crate::model::ModelPaths;

#[derive(Parser, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Image file or directory of images to triage.
    pub input: PathBuf,

    #[arg(default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub detection_model: PathBuf,

    #[arg(long)]
    pub classification_model: PathBuf,

    #[arg(long)]
    pub segmentation_model: PathBuf,

    #[arg(short, long, default_value = "png", value_parser = check_format)]
    pub format: String,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    #[arg(
        short, long, default_value_t = thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    )]
    pub num_threads: usize,
}

impl Config {
    pub fn model_paths(&self) -> ModelPaths {
        ModelPaths {
            detection: self.detection_model.clone(),
            classification: self.classification_model.clone(),
            segmentation: self.segmentation_model.clone(),
        }
    }
}

fn check_format(s: &str) -> Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.writing_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_formats_are_accepted() {
        assert_eq!(check_format("png").unwrap(), "png");
        assert_eq!(check_format("jpg").unwrap(), "jpg");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(check_format("nope").is_err());
    }
}
