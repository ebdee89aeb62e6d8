//! verdant diagnosis engine -- accepts a knowledge base snapshot + observed
//! symptoms, produces ranked disease conclusions with a replayable trace.
//!
//! The engine loads the catalog once per call (or takes an injected or
//! cached `KnowledgeBase`), evaluates every rule with certainty factor
//! combination, and returns conclusions, per-disease traces, skipped
//! rules and excluded rules. Persisting anything is left to the caller.

pub mod certainty;
pub mod config;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod present;
pub mod trace;

pub use certainty::{clamp_cf, combine_signed, combine_simple, replay, Combination, CF_BOUND};
pub use config::{read_config, EngineConfig, MatchPolicy};
pub use engine::{
    infer, Conclusion, ExcludedRule, ExclusionReason, FactSet, Inference, SkippedRule,
};
pub use error::EngineError;
pub use knowledge::{KbMetadata, KbRule, KnowledgeBase, KnowledgeBaseBuilder, KnowledgeCache};
pub use present::{
    certainty_percentage, history_record, rank, resolve_report, DiseaseReport, RankedDiagnosis,
};
pub use trace::{explain, Explanation, ExplanationStep, Trace, TraceEntry};

use verdant_storage::KnowledgeStore;

/// Load the knowledge base from `store` and run inference over `facts`.
///
/// This is the one-shot entry point. Long-running callers should hold a
/// `KnowledgeCache` and call `infer` on the snapshot it returns.
///
/// Fails only when the store cannot produce a catalog.
pub async fn diagnose<S>(
    store: &S,
    config: &EngineConfig,
    facts: &FactSet,
) -> Result<Inference, EngineError>
where
    S: KnowledgeStore + ?Sized,
{
    let kb = KnowledgeBase::load(store, config).await?;
    Ok(infer(&kb, facts))
}

// ──────────────────────────────────────────────
// Integration tests
// ──────────────────────────────────────────────
