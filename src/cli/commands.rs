//! CLI command implementations.
//!
//! Contains the business logic for each CLI command: wiring configuration
//! into the pipeline, the graph linker, and the retriever, and rendering
//! their results. Exit-code policy lives in [`crate::error::CommandError`].

use std::sync::Arc;

use tracing::info;

use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::embedding::{HttpEmbedder, HttpReranker};
use crate::error::{CommandError, CommandResult, ConfigError, EmbedError};
use crate::graph::GraphLinker;
use crate::index::Pipeline;
use crate::scanner::IgnoreMatcher;
use crate::search::{HybridRetriever, SearchHit, SearchRequest};
use crate::store::EsClient;

/// Executes the CLI command and returns its printable output.
///
/// # Errors
///
/// Returns [`CommandError`] carrying the exit-code policy: configuration
/// errors exit 1, fatal startup checks (missing ignore file, embedding
/// dimension mismatch) exit 2, runtime failures exit 1.
pub async fn execute(cli: Cli) -> CommandResult<String> {
    match cli.command {
        Commands::Build {
            root,
            ignore_file,
            workers,
        } => cmd_build(root, ignore_file, workers).await,
        Commands::GraphLink => cmd_graph_link().await,
        Commands::Search {
            question,
            path_prefix,
            top_n,
            symbols,
            rerank,
            line_numbers,
        } => {
            let request = SearchRequest {
                question,
                path_prefix,
                top_n: usize::from(top_n),
                symbols,
                use_reranker: rerank,
            };
            cmd_search(&request, &cli.format, line_numbers).await
        }
    }
}

/// Builds configuration for commands that never invoke the LLM.
///
/// The API key is only required by the splitter, so query-side commands
/// accept an absent key.
fn config_for_query() -> Result<Config, ConfigError> {
    let key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    Config::builder().from_env().anthropic_api_key(key).build()
}

/// Maps a probe failure to the exit-code policy: a dimension mismatch is
/// fatal (exit 2), transport problems are runtime errors (exit 1).
fn probe_error(err: EmbedError) -> CommandError {
    match err {
        EmbedError::DimensionMismatch { .. } => CommandError::Fatal(err.to_string()),
        other => CommandError::Runtime(other.into()),
    }
}

/// `build`: one incremental pass over the repository root.
async fn cmd_build(
    root: Option<std::path::PathBuf>,
    ignore_file: Option<std::path::PathBuf>,
    workers: Option<usize>,
) -> CommandResult<String> {
    let mut builder = Config::builder().from_env();
    if let Some(root) = root {
        builder = builder.repos_root(root);
    }
    if let Some(ignore_file) = ignore_file {
        builder = builder.ignore_file(ignore_file);
    }
    if let Some(workers) = workers {
        builder = builder.file_workers(workers);
    }
    let config = builder.build()?;

    if !config.repos_root.is_dir() {
        return Err(ConfigError::RootMissing {
            path: config.repos_root.clone(),
        }
        .into());
    }
    let matcher = IgnoreMatcher::load(&config.ignore_file)?;

    let embed_model = config.embed_model.clone();
    let pipeline =
        Pipeline::new(config).map_err(|err| CommandError::Runtime(err.into()))?;
    pipeline.probe_dimension().await.map_err(probe_error)?;
    info!(model = %embed_model, "embedding dimension verified");

    let summary = pipeline
        .build(&matcher)
        .await
        .map_err(|err| CommandError::Runtime(err.into()))?;
    Ok(summary.to_string())
}

/// `graph-link`: one-shot Q/A graph pass over the current chunk set.
async fn cmd_graph_link() -> CommandResult<String> {
    let config = config_for_query()?;
    let store = Arc::new(
        EsClient::new(config.es_url(), config.store_timeout, config.bulk_timeout)
            .map_err(|err| CommandError::Runtime(err.into()))?,
    );
    let embedder = Arc::new(
        HttpEmbedder::new(config.embed_url.clone(), config.store_timeout)
            .map_err(|err| CommandError::Runtime(err.into()))?,
    );
    embedder.probe_dimension().await.map_err(probe_error)?;

    let linker = GraphLinker::new(
        store,
        embedder,
        config.chunk_index.clone(),
        config.max_links_per_chunk,
        config.qa_similarity_threshold,
    );
    let summary = linker
        .run()
        .await
        .map_err(|err| CommandError::Runtime(err.into()))?;
    Ok(summary.to_string())
}

/// `search`: one hybrid retrieval, rendered as text or JSON.
async fn cmd_search(
    request: &SearchRequest,
    format: &str,
    line_numbers: bool,
) -> CommandResult<String> {
    let config = config_for_query()?;
    let store = Arc::new(
        EsClient::new(config.es_url(), config.store_timeout, config.bulk_timeout)
            .map_err(|err| CommandError::Runtime(err.into()))?,
    );
    let embedder = Arc::new(
        HttpEmbedder::new(config.embed_url.clone(), config.store_timeout)
            .map_err(|err| CommandError::Runtime(err.into()))?,
    );
    let reranker = HttpReranker::new(config.rerank_url.clone(), config.store_timeout)
        .map_err(|err| CommandError::Runtime(err.into()))?;
    if request.use_reranker {
        info!(model = %config.rerank_model, "reranking enabled");
    }

    let retriever = HybridRetriever::new(store, embedder, reranker, config.chunk_index.clone());
    let hits = retriever
        .search(request)
        .await
        .map_err(|err| CommandError::Runtime(err.into()))?;

    if format == "json" {
        serde_json::to_string_pretty(&hits)
            .map_err(|err| CommandError::Runtime(err.into()))
    } else {
        Ok(render_hits_text(&hits, line_numbers))
    }
}

/// Renders hits the way operators read them: a compact header line per
/// chunk followed by the chunk text.
#[must_use]
pub fn render_hits_text(hits: &[SearchHit], line_numbers: bool) -> String {
    if hits.is_empty() {
        return "no results".to_string();
    }
    let mut blocks = Vec::with_capacity(hits.len());
    for hit in hits {
        let header = format!(
            "{} L:{}-{}/{} kind:{} lang:{} mime:{}",
            hit.chunk_id, hit.start_line, hit.end_line, hit.file_lines, hit.kind, hit.lang, hit.mime
        );
        let text = if line_numbers {
            hit.text
                .split('\n')
                .enumerate()
                .map(|(i, line)| {
                    format!("{:4} | {line}", hit.start_line + u32::try_from(i).unwrap_or(0))
                })
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            hit.text.clone()
        };
        blocks.push(format!("{header}:\n{text}"));
    }
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(chunk_id: &str, text: &str, start_line: u32) -> SearchHit {
        SearchHit {
            chunk_id: chunk_id.to_string(),
            text: text.to_string(),
            path: "demo/main.py".to_string(),
            start_line,
            end_line: start_line + u32::try_from(text.split('\n').count()).unwrap_or(1) - 1,
            title: "t".to_string(),
            symbols: Vec::new(),
            lang: "python".to_string(),
            mime: "text/x-python".to_string(),
            file_lines: 42,
            kind: "function".to_string(),
            links_in: Vec::new(),
            links_out: Vec::new(),
            chunks: 3,
        }
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_hits_text(&[], false), "no results");
    }

    #[test]
    fn test_render_header_and_text() {
        let rendered = render_hits_text(&[hit("demo/main.py#1/3", "def main():\n    pass", 1)], false);
        assert!(rendered.starts_with("demo/main.py#1/3 L:1-2/42 kind:function lang:python"));
        assert!(rendered.contains("def main():\n    pass"));
    }

    #[test]
    fn test_render_line_numbers_start_at_block() {
        let rendered = render_hits_text(&[hit("demo/main.py#2/3", "a\nb", 11)], true);
        assert!(rendered.contains("  11 | a"));
        assert!(rendered.contains("  12 | b"));
    }

    #[test]
    fn test_render_separates_hits() {
        let rendered = render_hits_text(
            &[hit("a#1/1", "x", 1), hit("b#1/1", "y", 1)],
            false,
        );
        assert_eq!(rendered.matches("\n\n").count(), 1);
    }
}
