pub(crate) mod catalog;
pub(crate) mod diagnose;
pub(crate) mod explain;
pub(crate) mod history;

use std::path::Path;

use tracing::debug;
use verdant_eval::{read_config, EngineConfig, KnowledgeBase};
use verdant_storage::JsonFileStore;

use crate::SourceArgs;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "verdant.toml";

pub(crate) fn engine_config(config: Option<&Path>) -> Result<EngineConfig, String> {
    match config {
        Some(path) => {
            if !path.exists() {
                return Err(format!("error: config file not found: {}", path.display()));
            }
            read_config(path).map_err(|e| format!("error: {}", e))
        }
        None => read_config(Path::new(DEFAULT_CONFIG)).map_err(|e| format!("error: {}", e)),
    }
}

/// Open the catalog and take one knowledge base snapshot from it.
pub(crate) async fn load_knowledge_base(
    source: &SourceArgs,
) -> Result<(JsonFileStore, KnowledgeBase), String> {
    let config = engine_config(source.config.as_deref())?;
    let store = JsonFileStore::new(&source.catalog);
    let kb = KnowledgeBase::load(&store, &config)
        .await
        .map_err(|e| format!("error: {}", e))?;
    debug!(
        catalog = %source.catalog.display(),
        rules = kb.rules().len(),
        "catalog loaded"
    );
    Ok((store, kb))
}
