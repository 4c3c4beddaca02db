//! Subcommand execution

use crate::cli::{Cli, CliError, Commands};
use crate::proxy::{Proxy, ResponseSource};
use fetchcache_cache::{Cache, CacheConfig, ListedEntry};
use fetchcache_fetch::HttpFetcher;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Open the cache and run the selected command
///
/// # Errors
///
/// Returns the first failure, already mapped to a [`CliError`]
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let fetch_config = cli.fetch_config()?;
    let config = CacheConfig::resolve(cli.cache_dir.clone())?;
    let cache = Cache::initialize(&config).await?;

    match cli.command {
        Commands::Get { url, output } => {
            let proxy = Proxy::new(cache, HttpFetcher::new(&fetch_config)?);
            get(&proxy, &url, output.as_deref()).await
        }
        Commands::Contents { json } => {
            let entries = cache.list().await;
            contents(&entries, json)
        }
    }
}

async fn get(proxy: &Proxy<HttpFetcher>, url: &str, output: Option<&Path>) -> Result<(), CliError> {
    let response = proxy.get_url(url).await?;
    info!(
        url,
        source = match response.source {
            ResponseSource::Cache => "cache",
            ResponseSource::Origin => "origin",
        },
        status = response.status_code,
        bytes = response.body.len(),
        "Served"
    );

    write_body(&response.body, output)?;

    if !(200..300).contains(&response.status_code) {
        return Err(CliError::Upstream {
            url: url.to_string(),
            status_code: response.status_code,
        });
    }
    Ok(())
}

fn write_body(body: &[u8], output: Option<&Path>) -> Result<(), CliError> {
    match output {
        Some(path) => std::fs::write(path, body).map_err(|source| CliError::Output {
            source,
            path: Some(PathBuf::from(path)),
        }),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(body)
                .and_then(|()| stdout.flush())
                .map_err(|source| CliError::Output { source, path: None })
        }
    }
}

fn contents(entries: &[ListedEntry], json: bool) -> Result<(), CliError> {
    let rendered = render_contents(entries, json)?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .map_err(|source| CliError::Output { source, path: None })
}

fn render_contents(entries: &[ListedEntry], json: bool) -> Result<String, CliError> {
    if json {
        let mut out = serde_json::to_string_pretty(entries)
            .map_err(|e| CliError::config(format!("Failed to serialize contents: {e}")))?;
        out.push('\n');
        return Ok(out);
    }
    Ok(entries
        .iter()
        .map(|e| format!("{:>12}  {}\n", e.byte_size, e.url))
        .collect())
}
