use std::path::Path;

use serde_json::json;
use verdant_eval::{history_record, infer, rank, FactSet};
use verdant_storage::KnowledgeStore;

use super::load_knowledge_base;
use crate::{print_json, OutputFormat, SourceArgs};

pub(crate) async fn cmd_diagnose(
    source: &SourceArgs,
    symptoms: &[u32],
    record: Option<&Path>,
    user: &str,
    show_skipped: bool,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let (store, kb) = load_knowledge_base(source).await?;
    let facts: FactSet = symptoms.iter().copied().collect();

    let result = infer(&kb, &facts);
    let ranked = rank(&result);

    // Only the top conclusion goes into history.
    let recorded = match (record, ranked.first()) {
        (Some(path), Some(top)) => {
            let store = store.with_history(path);
            let entry = history_record(&result, top, &facts, user);
            let id = store
                .insert_diagnosis(entry)
                .await
                .map_err(|e| format!("error: could not record diagnosis: {}", e))?;
            Some(id)
        }
        _ => None,
    };

    match output {
        OutputFormat::Json => {
            print_json(&json!({
                "metadata": result.metadata,
                "conclusions": ranked,
                "skipped": result.skipped,
                "excluded": result.excluded,
                "trace": result.trace,
                "recorded_id": recorded,
            }));
        }
        OutputFormat::Text => {
            if !quiet {
                let meta = kb.metadata();
                println!(
                    "Knowledge base v{}: {} combination, {} matching",
                    meta.version,
                    meta.combination.name(),
                    meta.policy.name()
                );
                let observed: Vec<String> = facts.iter().map(|id| kb.symptom_name(id)).collect();
                if observed.is_empty() {
                    println!("Observed: (none)");
                } else {
                    println!("Observed: {}", observed.join(", "));
                }
            }

            if ranked.is_empty() {
                println!("No disease matched the observed symptoms.");
            }
            for r in &ranked {
                println!(
                    "{:>2}. {} (#{}): {:.1}% from {} rule(s)",
                    r.rank, r.disease_name, r.disease_id, r.certainty_percentage, r.rules_fired
                );
                if let Some(text) = &r.top_explanation {
                    println!("    {}", text);
                }
            }

            if show_skipped {
                for s in &result.skipped {
                    println!(
                        "skipped rule {} ({}): missing {}",
                        s.rule_id,
                        s.disease_name,
                        s.missing_symptom_names.join(", ")
                    );
                }
            }

            if !quiet {
                if !result.excluded.is_empty() {
                    println!("{} rule(s) excluded as malformed", result.excluded.len());
                }
                match (recorded, record) {
                    (Some(id), _) => println!("Recorded diagnosis #{}", id),
                    (None, Some(_)) => println!("Nothing to record."),
                    (None, None) => {}
                }
            }
        }
    }
    Ok(())
}
