//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration and indexes are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, SitewiseError};
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing requires an API key for embeddings.
    Index,
    /// Querying agents requires an API key and the document collections.
    Query,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_api_key()?;
    if let Operation::Query = operation {
        check_collection(&settings.collection_dir(&settings.index.enviro_collection))?;
        check_collection(&settings.collection_dir(&settings.index.planning_collection))?;
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(SitewiseError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(SitewiseError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check that a collection directory exists.
pub fn check_collection(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(SitewiseError::IndexNotFound(format!(
            "{} (build it with: sitewise index <pdf_dir> --output {})",
            dir.display(),
            dir.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_collection_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_collection(dir.path()).is_ok());

        let result = check_collection(&dir.path().join("enviro_ns"));
        assert!(matches!(
            result,
            Err(SitewiseError::IndexNotFound(msg)) if msg.contains("sitewise index")
        ));
    }
}
