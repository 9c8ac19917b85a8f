use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use image::ImageFormat;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::{prelude::*, ThreadPoolBuilder};
use walkdir::WalkDir;

use tumor_triage_rs::{Config, ModelRegistry, Pipeline, PipelineResult};

fn main() -> Result<()> {
    let config = Config::parse();

    ensure!(
        config.detection_model.exists(),
        "Detection model path does not exist"
    );
    ensure!(
        config.classification_model.exists(),
        "Classification model path does not exist"
    );
    ensure!(
        config.segmentation_model.exists(),
        "Segmentation model path does not exist"
    );
    ensure!(config.input.exists(), "Input path does not exist");

    // All three models load up front; a broken artifact aborts here instead
    // of surfacing mid-run.
    let registry = ModelRegistry::load(&config.model_paths(), config.device_id)
        .context("Failed to load model artifacts")?;
    let pipeline = Pipeline::from_registry(registry);

    ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()?;

    let image_paths = collect_inputs(&config.input);
    ensure!(
        !image_paths.is_empty(),
        "No image files found under {}",
        config.input.display()
    );

    let progress_bar = ProgressBar::new(image_paths.len() as u64);
    progress_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec} {eta})",
        )?
        .progress_chars("#>-"),
    );

    image_paths
        .par_iter()
        .progress_with(progress_bar.clone())
        .try_for_each(|path| -> Result<()> {
            let result = pipeline
                .run_on_path(path)
                .with_context(|| format!("Pipeline failed for {}", path.display()))?;
            progress_bar.println(report(path, &result));

            let output_path = construct_output_path(path, &config)?;
            result
                .overlay
                .save(&output_path)
                .with_context(|| format!("Failed to save overlay: {}", output_path.display()))
        })?;

    progress_bar.finish();

    Ok(())
}

fn collect_inputs(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    WalkDir::new(input)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| ImageFormat::from_path(e.path()).is_ok())
        .map(|e| e.into_path())
        .collect()
}

fn report(path: &Path, result: &PipelineResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", path.display());
    let _ = writeln!(out, "  has tumor      : {}", result.has_tumor());
    let _ = writeln!(
        out,
        "  detection prob : {:.4}",
        result.detection_probability
    );
    match &result.findings {
        None => {
            let _ = writeln!(out, "  no tumor detected, overlay is the original image");
        }
        Some(findings) => {
            let _ = writeln!(
                out,
                "  predicted type : {}",
                findings.classification.label
            );
            for (class, p) in findings.classification.probabilities() {
                let _ = writeln!(out, "    {:<10} : {:.4}", class, p);
            }
            let _ = writeln!(
                out,
                "  mask coverage  : {:.1}%",
                findings.mask.coverage() * 100.0
            );
        }
    }
    out
}

fn construct_output_path(path: &Path, config: &Config) -> Result<PathBuf> {
    let base = if config.input.is_file() {
        config.input.parent().unwrap_or(Path::new("."))
    } else {
        config.input.as_path()
    };
    let relative = path
        .strip_prefix(base)
        .with_context(|| format!("Input file outside input directory: {}", path.display()))?;

    let output_path = config.output_dir.join(relative).with_extension(&config.format);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(output_path)
}
