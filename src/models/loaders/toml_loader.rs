use crate::config::Settings;
use crate::error::{AppError, AppResult, ConfigError};
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载设置
///
/// 文件不存在时使用全部默认值
pub async fn load_settings(path: &Path) -> AppResult<Settings> {
    if !path.exists() {
        tracing::warn!("⚠️ 设置文件不存在，使用默认设置: {}", path.display());
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let settings: Settings = toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
        path: path.display().to_string(),
        source,
    })?;

    if settings.form.key_label_prefix.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            name: "form.key_label_prefix".to_string(),
            reason: "不能为空".to_string(),
        }
        .into());
    }
    settings.fallbacks.validate()?;

    tracing::info!("✓ 已加载设置: {}", path.display());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(settings.retry.attempts, 3);
    }

    #[tokio::test]
    async fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retry\nattempts = ").unwrap();
        let err = load_settings(file.path()).await.unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::TomlParseFailed { .. })));
    }

    #[tokio::test]
    async fn test_empty_fallbacks_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[fallbacks]\ncaste_options = []").unwrap();
        let err = load_settings(file.path()).await.unwrap_err();
        match err {
            AppError::Config(ConfigError::InvalidValue { name, .. }) => {
                assert_eq!(name, "fallbacks.caste_options");
            }
            other => panic!("应为 InvalidValue: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_columns_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[excel.columns.mla_p2]
ac_number = "AC No"
candidate_name = "Candidate"
party_affiliation = "Party"

[form]
form_title_prefix = "Assam Survey"
"#
        )
        .unwrap();
        let settings = load_settings(file.path()).await.unwrap();
        assert_eq!(settings.excel.columns.assembly_candidates.key, "AC No");
        assert_eq!(settings.form.title_prefix, "Assam Survey");
        assert_eq!(settings.excel.columns.caste_data.key, "A");
    }
}
