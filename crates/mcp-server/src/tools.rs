use crate::app::AppState;
use crate::error::AppError;
use crate::resolve::resolve_tree;
use eidetic_indexer::{collection_name, IndexOptions};
use eidetic_search::Query as SearchQuery;
use eidetic_vectorstore::SymbolQuery;
use serde::Deserialize;
use std::collections::BTreeMap;

/// 1-based default offset, 5000-line default window capped at 10000
/// (spec.md §6 `read_file`).
const READ_FILE_DEFAULT_LIMIT: usize = 5000;
const READ_FILE_MAX_LIMIT: usize = 10_000;
const READ_FILE_MAX_BYTES: u64 = 10 * 1024 * 1024;

const BROWSE_STRUCTURE_DEFAULT_MAX_TOKENS: usize = 4000;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IndexCodebaseParams {
    pub path: Option<String>,
    pub project: Option<String>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub custom_extensions: Vec<String>,
    #[serde(default)]
    pub custom_ignore_patterns: Vec<String>,
}

pub async fn index_codebase(state: &AppState, params: IndexCodebaseParams) -> Result<String, AppError> {
    let tree = resolve_tree(state, params.path.as_deref(), params.project.as_deref())?;

    if params.dry_run {
        let files = eidetic_indexer::scan_files(std::path::Path::new(&tree), &params.custom_extensions, &params.custom_ignore_patterns);
        return Ok(format!("dry run: {} file(s) would be scanned for {tree}", files.len()));
    }

    state.registry.register_project(&tree);

    let options = IndexOptions {
        force: params.force,
        custom_extensions: params.custom_extensions,
        custom_ignore_patterns: params.custom_ignore_patterns,
    };
    let result = state.indexer.index(&tree, options, |_pct, _msg| {}).await?;

    Ok(format!(
        "indexed {tree}: {} total file(s), {} chunk(s), added={}, modified={}, removed={}, skipped={}, \
         parse failures={}, est. tokens={}, est. cost=${:.4}, {}ms",
        result.total_files,
        result.total_chunks,
        result.added,
        result.modified,
        result.removed,
        result.skipped,
        result.parse_failures.len(),
        result.est_tokens,
        result.est_cost_usd,
        result.duration_ms,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCodeParams {
    pub path: Option<String>,
    pub project: Option<String>,
    pub query: String,
    pub limit: Option<usize>,
    pub extension_filter: Option<Vec<String>>,
    #[serde(default)]
    pub compact: bool,
}

pub async fn search_code(state: &AppState, params: SearchCodeParams) -> Result<String, AppError> {
    let tree = resolve_tree(state, params.path.as_deref(), params.project.as_deref())?;
    let results = state
        .searcher
        .search(
            &tree,
            SearchQuery {
                query: params.query,
                limit: params.limit,
                extension_filter: params.extension_filter,
            },
        )
        .await?;

    if results.is_empty() {
        return Ok("No results.".to_string());
    }

    let mut out = String::new();
    for (rank, result) in results.iter().enumerate() {
        if params.compact {
            out.push_str(&format!(
                "{}. {}:{}-{} (score {:.4})\n",
                rank + 1,
                result.file_path,
                result.start_line,
                result.end_line,
                result.score
            ));
        } else {
            let symbol = result
                .symbol_name
                .as_deref()
                .map(|name| format!(" [{name}]"))
                .unwrap_or_default();
            out.push_str(&format!(
                "{}. {}:{}-{}{} (score {:.4})\n{}\n\n",
                rank + 1,
                result.file_path,
                result.start_line,
                result.end_line,
                symbol,
                result.score,
                result.content
            ));
        }
    }
    Ok(out.trim_end().to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeOnlyParams {
    pub path: Option<String>,
    pub project: Option<String>,
}

pub async fn clear_index(state: &AppState, params: TreeOnlyParams) -> Result<String, AppError> {
    let tree = resolve_tree(state, params.path.as_deref(), params.project.as_deref())?;
    state.indexer.clear_index(&tree).await?;
    Ok(format!("cleared {tree}"))
}

pub async fn get_indexing_status(state: &AppState, params: TreeOnlyParams) -> Result<String, AppError> {
    let tree = resolve_tree(state, params.path.as_deref(), params.project.as_deref())?;
    match state.states.get(&tree) {
        Some(run_state) => Ok(format!("{tree}: {}", describe_run_state(&run_state))),
        None => {
            let collection = collection_name(&tree);
            if state.store.has_collection(&collection).await {
                Ok(format!("{tree}: indexed, unknown timestamp"))
            } else {
                Err(eidetic_indexer::IndexerError::NotIndexed.into())
            }
        }
    }
}

fn describe_run_state(run_state: &eidetic_protocol::RunState) -> String {
    use eidetic_protocol::RunStateKind;
    match run_state.kind {
        RunStateKind::Idle => "idle".to_string(),
        RunStateKind::Indexing => format!(
            "indexing, {}% ({})",
            run_state.progress,
            run_state.progress_message.as_deref().unwrap_or("in progress")
        ),
        RunStateKind::Indexed => format!(
            "indexed, {} file(s), {} chunk(s)",
            run_state.total_files.unwrap_or_default(),
            run_state.total_chunks.unwrap_or_default()
        ),
        RunStateKind::Error => format!("error: {}", run_state.error.as_deref().unwrap_or("unknown error")),
    }
}

pub async fn list_indexed(state: &AppState) -> String {
    let projects = state.registry.list_projects();
    if projects.is_empty() {
        return "No codebases indexed.".to_string();
    }
    let mut out = String::new();
    for (name, path) in projects {
        let collection = collection_name(&path);
        let indexed = state.store.has_collection(&collection).await;
        out.push_str(&format!("{name} -> {path} ({})\n", if indexed { "indexed" } else { "not indexed" }));
    }
    out.trim_end().to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileParams {
    pub path: String,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub line_numbers: bool,
}

pub async fn read_file(params: ReadFileParams) -> Result<String, AppError> {
    let metadata = tokio::fs::metadata(&params.path).await?;
    if metadata.len() > READ_FILE_MAX_BYTES {
        return Err(AppError::InvalidRequest(format!(
            "{} is {} bytes, over the 10MB read limit",
            params.path,
            metadata.len()
        )));
    }

    let bytes = tokio::fs::read(&params.path).await?;
    if bytes.contains(&0) {
        return Err(AppError::InvalidRequest(format!(
            "{} looks like a binary file (contains a NUL byte)",
            params.path
        )));
    }
    let content = String::from_utf8(bytes)
        .map_err(|_| AppError::InvalidRequest(format!("{} is not valid UTF-8", params.path)))?;

    let offset = params.offset.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(READ_FILE_DEFAULT_LIMIT).min(READ_FILE_MAX_LIMIT);

    let mut out = String::new();
    for (line_number, line) in content.lines().enumerate().skip(offset - 1).take(limit) {
        if params.line_numbers {
            out.push_str(&format!("{:>6}\t{line}\n", line_number + 1));
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseStructureParams {
    pub path: Option<String>,
    pub project: Option<String>,
    pub path_filter: Option<String>,
    pub kind: Option<String>,
    pub max_tokens: Option<usize>,
}

pub async fn browse_structure(state: &AppState, params: BrowseStructureParams) -> Result<String, AppError> {
    let tree = resolve_tree(state, params.path.as_deref(), params.project.as_deref())?;
    let collection = collection_name(&tree);
    if !state.store.has_collection(&collection).await {
        return Err(eidetic_indexer::IndexerError::NotIndexed.into());
    }

    let rows = state
        .store
        .list_symbols(
            &collection,
            SymbolQuery {
                path_filter: params.path_filter,
                kind_filter: params.kind,
            },
        )
        .await?;

    let mut by_file: BTreeMap<String, Vec<&eidetic_vectorstore::SymbolRow>> = BTreeMap::new();
    for row in &rows {
        by_file.entry(row.relative_path.clone()).or_default().push(row);
    }

    let char_budget = params.max_tokens.unwrap_or(BROWSE_STRUCTURE_DEFAULT_MAX_TOKENS) * 4;
    let mut out = String::new();
    let mut truncated = false;
    'files: for (file, mut symbols) in by_file {
        symbols.sort_by_key(|s| s.start_line);
        let line = format!("{file}\n");
        if out.len() + line.len() > char_budget {
            truncated = true;
            break 'files;
        }
        out.push_str(&line);
        for symbol in symbols {
            let signature = symbol.signature.as_deref().unwrap_or(&symbol.name);
            let parent = symbol.parent_name.as_deref().map(|p| format!(" (in {p})")).unwrap_or_default();
            let line = format!("  {}:{} {} {}\n", symbol.start_line, symbol.kind, signature, parent);
            if out.len() + line.len() > char_budget {
                truncated = true;
                break 'files;
            }
            out.push_str(&line);
        }
    }
    if truncated {
        out.push_str("... (truncated to fit maxTokens)\n");
    }
    if out.is_empty() {
        return Ok("No structure found.".to_string());
    }
    Ok(out.trim_end().to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSymbolsParams {
    pub path: Option<String>,
    pub project: Option<String>,
    pub path_filter: Option<String>,
    pub kind: Option<String>,
    pub name_filter: Option<String>,
}

pub async fn list_symbols(state: &AppState, params: ListSymbolsParams) -> Result<String, AppError> {
    let tree = resolve_tree(state, params.path.as_deref(), params.project.as_deref())?;
    let collection = collection_name(&tree);
    if !state.store.has_collection(&collection).await {
        return Err(eidetic_indexer::IndexerError::NotIndexed.into());
    }

    let rows = state
        .store
        .list_symbols(
            &collection,
            SymbolQuery {
                path_filter: params.path_filter,
                kind_filter: params.kind,
            },
        )
        .await?;

    let name_filter = params.name_filter.map(|f| f.to_ascii_lowercase());
    let matches_name_filter = |row: &&eidetic_vectorstore::SymbolRow| match &name_filter {
        Some(filter) => row.name.to_ascii_lowercase().contains(filter.as_str()),
        None => true,
    };
    let mut out = String::new();
    for row in rows.iter().filter(matches_name_filter) {
        let parent = row.parent_name.as_deref().map(|p| format!(" (in {p})")).unwrap_or_default();
        out.push_str(&format!("{} {} {}:{}{}\n", row.kind, row.name, row.relative_path, row.start_line, parent));
    }
    if out.is_empty() {
        return Ok("No symbols found.".to_string());
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn read_file_applies_offset_and_limit() {
        let file = write_temp("one\ntwo\nthree\nfour\n");
        let out = read_file(ReadFileParams {
            path: file.path().to_string_lossy().to_string(),
            offset: Some(2),
            limit: Some(2),
            line_numbers: false,
        })
        .await
        .unwrap();
        assert_eq!(out, "two\nthree\n");
    }

    #[tokio::test]
    async fn read_file_rejects_binary_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x41, 0x00, 0x42]).unwrap();
        let err = read_file(ReadFileParams {
            path: file.path().to_string_lossy().to_string(),
            offset: None,
            limit: None,
            line_numbers: false,
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn read_file_can_prefix_line_numbers() {
        let file = write_temp("alpha\nbeta\n");
        let out = read_file(ReadFileParams {
            path: file.path().to_string_lossy().to_string(),
            offset: None,
            limit: None,
            line_numbers: true,
        })
        .await
        .unwrap();
        assert!(out.starts_with("     1\talpha"));
    }
}
