use clap::Parser;
use std::path::PathBuf;

use crate::errors::{DetectError, Result};

/// Batch object detection with a pretrained SSD512 network.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Directory with the images to annotate
    #[arg(default_value = "inputs/images")]
    pub input_dir: PathBuf,

    /// Directory the annotated images are written to, must already exist
    #[arg(default_value = "outputs/images")]
    pub output_dir: PathBuf,

    /// SSD512 weights exported to ONNX
    #[arg(
        short,
        long,
        default_value = "weights/VGG_VOC0712Plus_SSD_512x512_ft_iter_160000.onnx"
    )]
    pub weights: PathBuf,

    /// Font file for the label text; the built-in DejaVu Sans when omitted
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Detections at or below this confidence are not drawn
    #[arg(short, long, default_value_t = 0.5, value_parser = check_confidence)]
    pub confidence: f32,

    /// GPU to run on; CPU when omitted
    #[arg(short, long)]
    pub device_id: Option<i32>,
}

impl Config {
    /// Checks the startup artifacts exist before anything expensive is built.
    pub fn validate(&self) -> Result<()> {
        check_confidence_range(self.confidence).map_err(|message| DetectError::Configuration {
            message,
        })?;
        if !self.weights.is_file() {
            return Err(DetectError::Configuration {
                message: format!("weights file {} does not exist", self.weights.display()),
            });
        }
        if let Some(font) = &self.font {
            if !font.is_file() {
                return Err(DetectError::Configuration {
                    message: format!("font file {} does not exist", font.display()),
                });
            }
        }
        Ok(())
    }
}

fn check_confidence(s: &str) -> std::result::Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|e| format!("`{s}` is not a number: {e}"))?;
    check_confidence_range(value)?;
    Ok(value)
}

fn check_confidence_range(value: f32) -> std::result::Result<(), String> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("confidence must be within 0.0..=1.0, got {value}"))
    }
}
