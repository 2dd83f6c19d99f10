use std::path::Path;

use crate::error::{Error, Result};
use crate::loader::{ContentLoader, MatchPolicy, mime};

/// Loads files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileLoader;

impl LocalFileLoader {
    pub fn new() -> Self {
        Self
    }
}

fn is_file(candidate: &str) -> bool {
    !candidate.is_empty() && Path::new(candidate).is_file()
}

/// Strip one pair of matching quotes, as left behind by drag-and-drop into a terminal.
fn unquote(input: &str) -> Option<&str> {
    let first = input.chars().next()?;
    let last = input.chars().next_back()?;
    if input.len() < 2 || first != last || !matches!(first, '"' | '\'') {
        return None;
    }
    Some(&input[1..input.len() - 1])
}

#[cfg(windows)]
fn translate_posix_path(path: &str) -> Option<String> {
    let output = std::process::Command::new("cygpath")
        .arg("-w")
        .arg(path)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let translated = String::from_utf8(output.stdout).ok()?;
    Some(translated.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(not(windows))]
fn translate_posix_path(_: &str) -> Option<String> {
    None
}

#[async_trait::async_trait]
impl ContentLoader for LocalFileLoader {
    fn name(&self) -> &'static str {
        "local"
    }

    fn validate(&self, input: &str) -> Option<String> {
        let trimmed = input.trim();
        if is_file(trimmed) {
            return Some(trimmed.to_string());
        }
        if let Some(unquoted) = unquote(trimmed)
            && is_file(unquoted)
        {
            return Some(unquoted.to_string());
        }
        translate_posix_path(trimmed).filter(|translated| is_file(translated))
    }

    async fn mimetype(&self, identifier: &str) -> Result<Option<String>> {
        Ok(mime::guess_from_path(Path::new(identifier)).map(str::to_string))
    }

    async fn load(&self, identifier: &str) -> Result<Vec<u8>> {
        tokio::fs::read(identifier)
            .await
            .map_err(|e| Error::io(format!("could not read {identifier}"), e))
    }

    fn policy(&self) -> MatchPolicy {
        MatchPolicy::FamilyPrefix
    }
}
