use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use shared::domain::WizardStep;
use tracing::{info, warn};
use wizard_core::{
    screens::{
        results::{self, ResultsView, REPORT_SUCCESS_MESSAGE},
        ConfirmationScreen, MaskEditorScreen, MaskMode, UploadScreen,
    },
    HttpAnalysisApi, Tool, UploadedFile, WizardController,
};

/// Runs one renal ultrasound analysis session against the analysis backend.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    server_url: String,
    /// Ultrasound image (.png, .jpg).
    #[arg(long)]
    image: Option<PathBuf>,
    /// Segmentation mask in MATLAB .mat format.
    #[arg(long, conflicts_with = "auto_mask")]
    mask: Option<PathBuf>,
    /// Ask the backend to generate the mask instead.
    #[arg(long)]
    auto_mask: bool,
    #[arg(long)]
    model: Option<String>,
    /// Point of a mask-editor stroke as `x,y`; repeat to draw a line.
    #[arg(long = "stroke", value_parser = parse_point)]
    strokes: Vec<(f32, f32)>,
    #[arg(long, value_enum, default_value_t = ToolArg::Brush)]
    tool: ToolArg,
    #[arg(long, default_value_t = wizard_core::mask::DEFAULT_BRUSH_SIZE)]
    brush_size: u32,
    /// Request a PDF report once results are shown.
    #[arg(long)]
    report: bool,
    /// Write the edited mask PNG here.
    #[arg(long)]
    mask_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ToolArg {
    Brush,
    Eraser,
}

impl From<ToolArg> for Tool {
    fn from(tool: ToolArg) -> Self {
        match tool {
            ToolArg::Brush => Tool::Brush,
            ToolArg::Eraser => Tool::Eraser,
        }
    }
}

fn parse_point(raw: &str) -> Result<(f32, f32), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{raw}'"))?;
    let x = x.trim().parse::<f32>().map_err(|e| format!("invalid x: {e}"))?;
    let y = y.trim().parse::<f32>().map_err(|e| format!("invalid y: {e}"))?;
    Ok((x, y))
}

fn print_step(controller: &WizardController) {
    let step = controller.current_step();
    println!(
        "== {} ({}/{}, {:.0}%)",
        step.title(),
        step.index() + 1,
        WizardStep::ALL.len(),
        controller.progress_percent()
    );
}

fn print_warnings(controller: &WizardController) {
    for warning in controller.warnings() {
        println!("   ! {warning}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let api = HttpAnalysisApi::new(args.server_url.clone());
    let mut controller = WizardController::new();
    info!(server_url = %api.server_url(), "wizard session starting");

    print_step(&controller);
    let mut upload = UploadScreen::new();
    if let Some(path) = &args.image {
        match UploadedFile::from_path(path) {
            Ok(file) => upload.select_image(&mut controller, file),
            Err(error) => {
                warn!(path = %path.display(), %error, "image could not be read");
                upload.image_read_failed(&mut controller, &path.display().to_string());
            }
        }
    }
    if args.auto_mask {
        upload.set_mask_mode(MaskMode::AutoGenerate);
        upload.request_auto_mask(&api, &mut controller).await;
    } else if let Some(path) = &args.mask {
        match UploadedFile::from_path(path) {
            Ok(file) => upload.select_mask(&mut controller, file),
            Err(error) => warn!(path = %path.display(), %error, "mask could not be read"),
        }
    }
    print_warnings(&controller);
    upload.advance(&mut controller);

    print_step(&controller);
    let mut editor = MaskEditorScreen::open(&mut controller);
    editor.set_tool(args.tool.into());
    editor.set_brush_size(args.brush_size);
    if !args.strokes.is_empty() {
        editor.stroke(&args.strokes);
    }
    print_warnings(&controller);
    editor.advance(&mut controller);
    if let Some(path) = &args.mask_out {
        let png = editor.canvas().to_png()?;
        std::fs::write(path, png)
            .with_context(|| format!("failed to write mask to {}", path.display()))?;
        println!("   mask written to {}", path.display());
    }

    print_step(&controller);
    let confirmation = ConfirmationScreen::open(&api).await;
    if let Some(model) = &args.model {
        confirmation.select_model(&mut controller, model);
    }
    print_warnings(&controller);
    let outcome = confirmation.classify(&api, &mut controller).await;
    info!(?outcome, "classification step finished");

    print_step(&controller);
    let view = ResultsView::from_controller(&controller);
    println!("   {} (confidence {})", view.headline, view.confidence_percent);
    println!("   model: {}", view.model_name);
    println!("   {}", view.interpretation);
    if let Some(url) = &view.gradcam_url {
        println!("   grad-cam: {url}");
    }
    for (label, value) in &view.metric_rows {
        println!("   {label}: {value}");
    }
    for warning in &view.warnings {
        println!("   ! {warning}");
    }

    if args.report {
        match results::request_report(&api, &controller).await {
            Ok(report) => {
                println!("   {REPORT_SUCCESS_MESSAGE}");
                println!("   {} -> {}", report.filename, report.pdf_url);
            }
            Err(alert) => println!("   ALERT: {alert}"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_parse_with_optional_spaces() {
        assert_eq!(parse_point("10,20.5"), Ok((10.0, 20.5)));
        assert_eq!(parse_point(" 3 , 4 "), Ok((3.0, 4.0)));
        assert!(parse_point("10").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn cli_accepts_repeated_strokes() {
        let args = Args::try_parse_from([
            "renal_wizard",
            "--image",
            "photo.png",
            "--mask",
            "mask.mat",
            "--stroke",
            "1,2",
            "--stroke",
            "30,40",
            "--tool",
            "eraser",
            "--report",
        ])
        .expect("args");
        assert_eq!(args.strokes, vec![(1.0, 2.0), (30.0, 40.0)]);
        assert!(matches!(args.tool, ToolArg::Eraser));
        assert!(args.report);
    }

    #[test]
    fn mask_and_auto_mask_conflict() {
        let result = Args::try_parse_from(["renal_wizard", "--mask", "m.mat", "--auto-mask"]);
        assert!(result.is_err());
    }
}
