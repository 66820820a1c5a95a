use crate::language::Language;
use eidetic_protocol::Chunk;
use tree_sitter::{Node, Parser};

/// Chunks above this size are re-packed by the line-based refinement pass
/// (spec.md §4.2).
pub const MAX_CHUNK_CHARS: usize = 2500;

/// Maximum length of a symbol's signature line before truncation
/// (spec.md §4.2).
const MAX_SIGNATURE_CHARS: usize = 200;

/// Split `content` into chunks, using the AST splitter when the language
/// has a wired tree-sitter grammar and falling back to the line splitter
/// otherwise, or when parsing fails (spec.md §4.2 "parser failure policy").
pub fn split(content: &str, language: Language, file_path: &str) -> Vec<Chunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let chunks = if language.supports_ast() {
        split_ast(content, language, file_path).unwrap_or_default()
    } else {
        Vec::new()
    };

    let chunks = if chunks.is_empty() {
        split_lines(content, language, file_path)
    } else {
        chunks
    };

    chunks
        .into_iter()
        .flat_map(|chunk| refine(chunk))
        .filter(|chunk| !chunk.is_blank())
        .collect()
}

/// Depth-first AST walk: every splittable node becomes its own chunk. A
/// container node (`impl`/`trait`/`mod`/`class`/`interface`) additionally
/// emits a whole-body chunk for itself, then recurses into its children
/// with `parentSymbol` set to its own identifier (spec.md §4.2: "a class
/// emits one chunk for the class plus method chunks with
/// parentSymbol = ClassName").
///
/// Returns `None` on parser initialization or parse failure so the caller
/// falls through to the line splitter.
fn split_ast(content: &str, language: Language, file_path: &str) -> Option<Vec<Chunk>> {
    let ts_language = language.tree_sitter_language().ok()?;
    let mut parser = Parser::new();
    parser.set_language(&ts_language).ok()?;
    let tree = parser.parse(content, None)?;
    let root = tree.root_node();
    if root.has_error() && root.child_count() == 0 {
        return None;
    }

    let bytes = content.as_bytes();
    let mut out = Vec::new();
    walk(root, bytes, language, file_path, None, &mut out);
    Some(out)
}

fn walk(
    node: Node,
    source: &[u8],
    language: Language,
    file_path: &str,
    parent_symbol: Option<&str>,
    out: &mut Vec<Chunk>,
) {
    let kind = node.kind();
    let is_container = language.container_node_kinds().contains(&kind);
    let is_splittable = language.splittable_node_kinds().contains(&kind);

    if is_splittable && !is_container {
        if let Some(chunk) = node_to_chunk(node, source, language, file_path, parent_symbol) {
            out.push(chunk);
        }
        // Splittable non-container nodes are not descended into further;
        // their body is captured whole in the chunk above.
        return;
    }

    if is_container {
        let symbol_name = node_identifier(node, source, language);
        if let Some(chunk) = node_to_chunk(node, source, language, file_path, parent_symbol) {
            out.push(chunk);
        }
        let next_parent = symbol_name.as_deref().or(parent_symbol);
        for child in node.named_children(&mut node.walk()) {
            walk(child, source, language, file_path, next_parent, out);
        }
        return;
    }

    for child in node.named_children(&mut node.walk()) {
        walk(child, source, language, file_path, parent_symbol, out);
    }
}

fn node_to_chunk(
    node: Node,
    source: &[u8],
    language: Language,
    file_path: &str,
    parent_symbol: Option<&str>,
) -> Option<Chunk> {
    let text = node.utf8_text(source).ok()?.to_string();
    if text.trim().is_empty() {
        return None;
    }
    let symbol_name = node_identifier(node, source, language);
    let signature = text.lines().next().map(|line| truncate_signature(line));

    Some(Chunk {
        content: text,
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
        language: language.as_str().to_string(),
        file_path: file_path.to_string(),
        symbol_name,
        symbol_kind: Some(node.kind().to_string()),
        symbol_signature: signature,
        parent_symbol: parent_symbol.map(str::to_string),
    })
}

fn node_identifier(node: Node, source: &[u8], language: Language) -> Option<String> {
    node.child_by_field_name(language.identifier_field(node.kind()))
        .and_then(|id| id.utf8_text(source).ok())
        .map(str::to_string)
}

fn truncate_signature(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.chars().count() <= MAX_SIGNATURE_CHARS {
        trimmed.to_string()
    } else {
        let truncated: String = trimmed.chars().take(MAX_SIGNATURE_CHARS).collect();
        format!("{truncated}...")
    }
}

/// Line-based fallback splitter: packs consecutive lines into chunks no
/// larger than `MAX_CHUNK_CHARS`, carrying no symbol metadata
/// (spec.md §4.2 "line fallback").
fn split_lines(content: &str, language: Language, file_path: &str) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut start_line = 1usize;
    let mut current_line = 1usize;

    for line in &lines {
        let candidate_len = buf.len() + line.len() + 1;
        if !buf.is_empty() && candidate_len > MAX_CHUNK_CHARS {
            chunks.push(line_chunk(&buf, start_line, current_line - 1, language, file_path));
            buf.clear();
            start_line = current_line;
        }
        if !buf.is_empty() {
            buf.push('\n');
        }
        buf.push_str(line);
        current_line += 1;
    }
    if !buf.trim().is_empty() {
        chunks.push(line_chunk(&buf, start_line, current_line - 1, language, file_path));
    }
    chunks
}

fn line_chunk(
    content: &str,
    start_line: usize,
    end_line: usize,
    language: Language,
    file_path: &str,
) -> Chunk {
    Chunk {
        content: content.to_string(),
        start_line,
        end_line,
        language: language.as_str().to_string(),
        file_path: file_path.to_string(),
        symbol_name: None,
        symbol_kind: None,
        symbol_signature: None,
        parent_symbol: None,
    }
}

/// Greedy line-packing refinement: any AST chunk over `MAX_CHUNK_CHARS` is
/// broken into smaller sub-chunks along line boundaries, keeping symbol
/// metadata on every sub-chunk. A single line longer than the limit becomes
/// its own over-long sub-chunk rather than being split mid-line
/// (spec.md §4.2 "refinement").
fn refine(chunk: Chunk) -> Vec<Chunk> {
    if chunk.content.len() <= MAX_CHUNK_CHARS {
        return vec![chunk];
    }

    let lines: Vec<&str> = chunk.content.lines().collect();
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut start_line = chunk.start_line;
    let mut current_line = chunk.start_line;

    for line in &lines {
        let candidate_len = buf.len() + line.len() + 1;
        if !buf.is_empty() && candidate_len > MAX_CHUNK_CHARS {
            out.push(sub_chunk(&chunk, &buf, start_line, current_line - 1));
            buf.clear();
            start_line = current_line;
        }
        if !buf.is_empty() {
            buf.push('\n');
        }
        buf.push_str(line);
        current_line += 1;
    }
    if !buf.trim().is_empty() {
        out.push(sub_chunk(&chunk, &buf, start_line, current_line - 1));
    }
    if out.is_empty() {
        vec![chunk]
    } else {
        out
    }
}

fn sub_chunk(original: &Chunk, content: &str, start_line: usize, end_line: usize) -> Chunk {
    Chunk {
        content: content.to_string(),
        start_line,
        end_line,
        language: original.language.clone(),
        file_path: original.file_path.clone(),
        symbol_name: original.symbol_name.clone(),
        symbol_kind: original.symbol_kind.clone(),
        symbol_signature: original.symbol_signature.clone(),
        parent_symbol: original.parent_symbol.clone(),
    }
}
