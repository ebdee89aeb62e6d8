use std::path::Path;

use verdant_storage::HistoryLog;

use crate::{print_json, OutputFormat};

pub(crate) async fn cmd_history(
    path: &Path,
    limit: usize,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let records = HistoryLog::new(path)
        .list(limit)
        .await
        .map_err(|e| format!("error: {}", e))?;

    match output {
        OutputFormat::Json => match serde_json::to_value(&records) {
            Ok(v) => print_json(&v),
            Err(e) => return Err(format!("error: {}", e)),
        },
        OutputFormat::Text => {
            if records.is_empty() && !quiet {
                println!("No diagnoses recorded.");
            }
            for r in &records {
                println!(
                    "#{} {} {} disease {} at {:.1}%{}",
                    r.id,
                    r.recorded_at,
                    r.user_name,
                    r.disease_id,
                    r.confidence * 100.0,
                    r.notes
                        .as_deref()
                        .map(|n| format!(" ({})", n))
                        .unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}
