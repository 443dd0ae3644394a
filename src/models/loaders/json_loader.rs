use crate::error::{AppError, AppResult, ConfigError};
use crate::models::catalog::QuestionCatalog;
use std::path::Path;
use tokio::fs;

/// 从 JSON 文件加载双语题目文本
pub async fn load_catalog(path: &Path) -> AppResult<QuestionCatalog> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let catalog: QuestionCatalog =
        serde_json::from_str(&content).map_err(|source| ConfigError::CatalogParseFailed {
            path: path.display().to_string(),
            source,
        })?;

    tracing::info!("✓ 已加载题目文本: {}", path.display());
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::fixtures::CATALOG_JSON;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG_JSON.as_bytes()).unwrap();
        let catalog = load_catalog(file.path()).await.unwrap();
        assert_eq!(catalog.final_questions.family_income.options.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_section_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"introduction": {"english": "a", "bengali": "b"}}"#)
            .unwrap();
        let err = load_catalog(file.path()).await.unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::CatalogParseFailed { .. })));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = load_catalog(Path::new("/nonexistent/questions.json")).await.unwrap_err();
        assert!(matches!(err, AppError::File(_)));
    }
}
