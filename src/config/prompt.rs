use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::Arc;
use log::info;
use thiserror::Error;

/// Persona prepended to every model call unless `SYSTEM_PROMPT_PATH` replaces it.
pub const SYSTEM_PROMPT: &str = include_str!("../../prompts/system_prompt.md");

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to read system prompt file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("System prompt file '{0}' is empty")]
    Empty(PathBuf),
}

/// Returns the built-in prompt, or the contents of `path` when one is configured.
pub fn load_system_prompt(path: Option<&Path>) -> Result<Arc<str>, PromptError> {
    let Some(path) = path else {
        return Ok(Arc::from(SYSTEM_PROMPT.trim()));
    };

    let content = fs::read_to_string(path).map_err(|source| PromptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(PromptError::Empty(path.to_path_buf()));
    }

    info!("Loaded system prompt from {} ({} chars)", path.display(), trimmed.len());
    Ok(Arc::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_prompt_is_the_cooking_persona() {
        let prompt = load_system_prompt(None).unwrap();
        assert!(prompt.starts_with("You are a warm, patient, and knowledgeable cooking assistant"));
        assert!(prompt.contains("Use only metric units"));
        assert_eq!(prompt.trim(), &*prompt);
    }

    #[test]
    fn file_overrides_builtin_prompt() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\n  You only talk about bread.  \n").unwrap();

        let prompt = load_system_prompt(Some(file.path())).unwrap();
        assert_eq!(&*prompt, "You only talk about bread.");
    }

    #[test]
    fn missing_or_blank_files_fail() {
        let err = load_system_prompt(Some(Path::new("/definitely/not/here.md"))).unwrap_err();
        assert!(matches!(err, PromptError::Io { .. }));

        let file = tempfile::NamedTempFile::new().unwrap();
        let err = load_system_prompt(Some(file.path())).unwrap_err();
        assert!(matches!(err, PromptError::Empty(_)));
    }
}
