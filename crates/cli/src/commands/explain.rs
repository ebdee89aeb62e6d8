use std::path::Path;

use serde_json::{json, Value};
use tracing::{debug, warn};
use verdant_eval::{
    explain, infer, Combination, EngineError, Explanation, FactSet, KbMetadata, Trace,
};
use verdant_storage::DiseaseId;

use super::{engine_config, load_knowledge_base};
use crate::{print_json, OutputFormat, SourceArgs};

/// The trace to explain and the context needed to replay it.
struct Session {
    trace: Trace,
    combination: Combination,
    disease_name: Option<String>,
}

/// Explain a disease from a saved `diagnose --output json` session, or by
/// re-running inference over `source` when no session file is given.
pub(crate) async fn cmd_explain(
    source: Option<&SourceArgs>,
    config: Option<&Path>,
    symptoms: &[u32],
    trace_file: Option<&Path>,
    disease: u32,
    output: OutputFormat,
    _quiet: bool,
) -> Result<(), String> {
    let disease_id = DiseaseId(disease);
    let session = match (trace_file, source) {
        (Some(path), _) => load_session(path, disease_id, config).await?,
        (None, Some(source)) => rerun_session(source, symptoms, disease_id).await?,
        (None, None) => return Err("error: either --trace or --catalog is required".to_string()),
    };

    let entries = explain(disease_id, &session.trace).map_err(|e| format!("error: {}", e))?;
    let explanation = Explanation::replay(disease_id, entries, session.combination);
    let consistent = explanation.is_consistent();
    if !consistent {
        warn!(disease = %disease_id, "replayed certainty differs from the recorded trace");
    }
    let disease_name = session
        .disease_name
        .unwrap_or_else(|| format!("Disease {}", disease_id));

    match output {
        OutputFormat::Json => {
            print_json(&json!({
                "disease_name": disease_name,
                "consistent": consistent,
                "explanation": explanation,
                "entries": entries,
            }));
        }
        OutputFormat::Text => {
            print!("{}", explanation.render(&disease_name));
        }
    }
    Ok(())
}

/// Read a saved session. Accepts the full `diagnose --output json`
/// document or a bare trace object.
async fn load_session(
    path: &Path,
    disease_id: DiseaseId,
    config: Option<&Path>,
) -> Result<Session, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("error: could not read trace file {}: {}", path.display(), e))?;
    let mut value: Value = serde_json::from_str(&text)
        .map_err(|e| format!("error: invalid trace file {}: {}", path.display(), e))?;

    let metadata = match value.get("metadata") {
        Some(m) => Some(
            serde_json::from_value::<KbMetadata>(m.clone())
                .map_err(|e| format!("error: invalid session metadata: {}", e))?,
        ),
        None => None,
    };
    let combination = match metadata {
        Some(m) => m.combination,
        None => engine_config(config)?.combination,
    };

    let wanted = u64::from(disease_id.0);
    let disease_name = value
        .get("conclusions")
        .and_then(Value::as_array)
        .and_then(|rows| {
            rows.iter()
                .find(|row| row.get("disease_id").and_then(Value::as_u64) == Some(wanted))
        })
        .and_then(|row| row.get("disease_name"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let trace_value = if value.get("trace").is_some() {
        value["trace"].take()
    } else {
        value
    };
    let trace = Trace::from_json(trace_value)
        .map_err(|e| format!("error: invalid trace in {}: {}", path.display(), e))?;

    debug!(
        trace_file = %path.display(),
        diseases = trace.len(),
        combination = combination.name(),
        "replaying saved trace"
    );
    Ok(Session {
        trace,
        combination,
        disease_name,
    })
}

/// Re-run inference against the current catalog. The result reflects the
/// catalog as it is now, not as it was when the diagnosis was made.
async fn rerun_session(
    source: &SourceArgs,
    symptoms: &[u32],
    disease_id: DiseaseId,
) -> Result<Session, String> {
    let (_store, kb) = load_knowledge_base(source).await?;
    let disease_name = kb
        .disease(disease_id)
        .map(|d| d.name.clone())
        .ok_or_else(|| format!("error: {}", EngineError::UnknownDisease { disease_id }))?;

    let facts: FactSet = symptoms.iter().copied().collect();
    let result = infer(&kb, &facts);
    Ok(Session {
        trace: result.trace,
        combination: result.metadata.combination,
        disease_name: Some(disease_name),
    })
}
