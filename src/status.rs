// System status display: report database, model artifact, geocoder.

use std::path::Path;

use anyhow::Result;

use crate::classifier::SvmModel;
use crate::config::Config;
use crate::report::ReportSink;

/// Display system status to the terminal.
pub async fn show(config: &Config, sink: Option<&dyn ReportSink>) -> Result<()> {
    match sink {
        None => {
            println!("Database: not initialized");
            println!("  Run `crossmatch init` to set up the report database.");
        }
        Some(sink) => {
            let file_size = std::fs::metadata(&config.db_path)
                .map(|m| format_bytes(m.len()))
                .unwrap_or_else(|_| "unknown".to_string());
            println!("Database: {} ({})", config.db_path, file_size);

            let sheets = sink.sheets().await?;
            if sheets.is_empty() {
                println!("Report sheets: none yet");
                println!("  Run `crossmatch compare` or `crossmatch batch` to add rows");
            } else {
                println!("Report sheets:");
                for sheet in &sheets {
                    println!("  {} ({} rows)", sheet.sheet, sheet.rows);
                }
            }
        }
    }

    model_status(&config.model_path);

    if config.has_geocoder() {
        println!("Geocoder: Google Maps ({})", config.maps_api_url);
    } else {
        println!("Geocoder: not configured (distances will be -1.0)");
        println!("  Set GOOGLE_MAPS_API_KEY to resolve locations");
    }

    println!(
        "Segments: {} x {} days, top {} keywords",
        config.segments, config.segment_days, config.top_keywords
    );
    println!("Profiles: {}", config.profile_dir.display());

    Ok(())
}

fn model_status(path: &Path) {
    if !path.exists() {
        println!("Model: not found at {}", path.display());
        println!("  Set CROSSMATCH_MODEL_PATH to a trained libsvm model");
        return;
    }
    match SvmModel::load(path) {
        Ok(model) => println!(
            "Model: {} ({:?} kernel, {} support vectors, labels {:?})",
            path.display(),
            model.kernel(),
            model.support_vector_count(),
            model.labels()
        ),
        Err(e) => println!("Model: {} is unusable: {e}", path.display()),
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
