use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

pub const TOKEN_ENV: &str = "RIOT_API_TOKEN";

/// Resolves the API token: `RIOT_API_TOKEN` wins, otherwise the token file.
pub fn load_api_token(path: &Path) -> Result<String> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        let token = token.trim();
        if !token.is_empty() {
            log::debug!("Using API token from {TOKEN_ENV}");
            return Ok(token.to_string());
        }
    }
    read_token_file(path)
}

pub fn read_token_file(path: &Path) -> Result<String> {
    log::info!("Reading Riot API token from {}", path.display());
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading api token from {}", path.display()))?;
    let token = raw.trim_end_matches(['\n', '\r']).trim();
    if token.is_empty() {
        return Err(anyhow!("api token file {} is empty", path.display()));
    }
    Ok(token.to_string())
}
