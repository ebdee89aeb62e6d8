use serde_json::json;
use verdant_eval::{infer, resolve_report, DiseaseReport, FactSet};
use verdant_storage::DiseaseId;

use super::load_knowledge_base;
use crate::{print_json, OutputFormat, SourceArgs};

async fn report(source: &SourceArgs, disease: u32) -> Result<DiseaseReport, String> {
    let (store, kb) = load_knowledge_base(source).await?;
    resolve_report(&kb, &store, DiseaseId(disease))
        .await
        .map_err(|e| format!("error: {}", e))
}

pub(crate) async fn cmd_treatments(
    source: &SourceArgs,
    disease: u32,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let report = report(source, disease).await?;
    match output {
        OutputFormat::Json => print_json(&json!({
            "disease": report.disease,
            "treatments": report.treatments,
        })),
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "Treatments for {} (#{}):",
                    report.disease.name, report.disease.id
                );
            }
            if report.treatments.is_empty() {
                println!("  (none)");
            }
            for t in &report.treatments {
                match &t.description {
                    Some(d) => println!("  - {} [{}]: {}", t.label(), t.treatment_type, d),
                    None => println!("  - {} [{}]", t.label(), t.treatment_type),
                }
            }
        }
    }
    Ok(())
}

pub(crate) async fn cmd_preventions(
    source: &SourceArgs,
    disease: u32,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let report = report(source, disease).await?;
    match output {
        OutputFormat::Json => print_json(&json!({
            "disease": report.disease,
            "preventions": report.preventions,
        })),
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "Preventions for {} (#{}):",
                    report.disease.name, report.disease.id
                );
            }
            if report.preventions.is_empty() {
                println!("  (none)");
            }
            for p in &report.preventions {
                println!(
                    "  - [{}] {}",
                    p.prevention_type,
                    p.description.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

pub(crate) async fn cmd_rules(
    source: &SourceArgs,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let (_store, kb) = load_knowledge_base(source).await?;
    // Exclusions do not depend on the facts, so an empty fact set
    // reports all of them.
    let excluded = infer(&kb, &FactSet::new()).excluded;

    let disease_name = |id: DiseaseId| {
        kb.disease(id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    };

    match output {
        OutputFormat::Json => {
            let rules: Vec<serde_json::Value> = kb
                .rules()
                .iter()
                .map(|r| {
                    let condition_names: Vec<String> =
                        r.conditions.iter().map(|s| kb.symptom_name(*s)).collect();
                    json!({
                        "id": r.id,
                        "disease_id": r.disease_id,
                        "disease_name": disease_name(r.disease_id),
                        "certainty": r.certainty,
                        "conditions": r.conditions,
                        "condition_names": condition_names,
                        "explanation": r.explanation,
                    })
                })
                .collect();
            print_json(&json!({
                "metadata": kb.metadata(),
                "rules": rules,
                "excluded": excluded,
            }));
        }
        OutputFormat::Text => {
            if !quiet {
                println!("{} active rule(s):", kb.rules().len());
            }
            for r in kb.rules() {
                let conditions: Vec<String> =
                    r.conditions.iter().map(|s| kb.symptom_name(*s)).collect();
                println!(
                    "rule {} -> {} (cf {:.2}): {}",
                    r.id,
                    disease_name(r.disease_id),
                    r.certainty,
                    if conditions.is_empty() {
                        "(no conditions)".to_string()
                    } else {
                        conditions.join(" + ")
                    }
                );
            }
            if !excluded.is_empty() {
                println!("Excluded:");
                for e in &excluded {
                    println!("  rule {}: {}", e.rule_id, e.reason.name());
                }
            }
        }
    }
    Ok(())
}
