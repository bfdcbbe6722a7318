//! Document loading by format.
//!
//! The chunker only ever sees extracted text. A [`LoaderRegistry`] maps each
//! [`DocumentFormat`] to a [`DocumentLoader`] that turns raw bytes into that
//! text. Plain text, Markdown and HTML are built in; PDF extraction is left
//! to callers, who can [`register`](LoaderRegistry::register) their own.

use crate::types::{AppError, Result};
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Html,
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from a file extension. Unknown extensions are read
    /// as plain text; a path without one is rejected.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Cannot detect document format of '{}': no file extension",
                    path.display()
                ))
            })?
            .to_ascii_lowercase();

        Ok(match ext.as_str() {
            "md" | "markdown" => DocumentFormat::Markdown,
            "html" | "htm" => DocumentFormat::Html,
            "pdf" => DocumentFormat::Pdf,
            _ => DocumentFormat::PlainText,
        })
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentFormat::PlainText => "text",
            DocumentFormat::Markdown => "markdown",
            DocumentFormat::Html => "html",
            DocumentFormat::Pdf => "pdf",
        };
        f.write_str(name)
    }
}

/// Extracts text from the raw bytes of one document format.
pub trait DocumentLoader: Send + Sync {
    fn format(&self) -> DocumentFormat;

    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// UTF-8 text, decoded lossily.
pub struct TextLoader {
    format: DocumentFormat,
}

impl TextLoader {
    pub fn plain() -> Self {
        Self {
            format: DocumentFormat::PlainText,
        }
    }

    /// Markdown is chunked as written; markup is not stripped.
    pub fn markdown() -> Self {
        Self {
            format: DocumentFormat::Markdown,
        }
    }
}

impl DocumentLoader for TextLoader {
    fn format(&self) -> DocumentFormat {
        self.format
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Text of an HTML page, one block per line.
///
/// Block elements become a line each. Text sitting directly in containers
/// such as `div` or `section` becomes a line of its own, with inline markup
/// (`span`, `a`, `em`, ...) folded into the surrounding text.
pub struct HtmlLoader {
    roots: Vec<Selector>,
}

impl HtmlLoader {
    pub fn new() -> Result<Self> {
        let roots = ["article", "main", "body"]
            .into_iter()
            .map(|s| {
                Selector::parse(s)
                    .map_err(|e| AppError::Internal(format!("Bad selector '{}': {:?}", s, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { roots })
    }

    fn pick_root<'a>(&self, document: &'a Html) -> ElementRef<'a> {
        self.roots
            .iter()
            .find_map(|selector| document.select(selector).next())
            .unwrap_or_else(|| document.root_element())
    }
}

fn is_skipped(tag: &str) -> bool {
    matches!(
        tag,
        "script" | "style" | "template" | "noscript" | "svg" | "nav" | "head"
    )
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "li" | "blockquote" | "pre" | "td" | "th"
    )
}

fn is_inline(tag: &str) -> bool {
    matches!(
        tag,
        "a" | "abbr" | "b" | "cite" | "code" | "em" | "i" | "kbd" | "label" | "mark" | "q"
            | "s" | "samp" | "small" | "span" | "strong" | "sub" | "sup" | "time" | "u"
            | "var"
    )
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn flush(run: &mut String, blocks: &mut Vec<String>) {
    let text = collapse_whitespace(run);
    if !text.is_empty() {
        blocks.push(text);
    }
    run.clear();
}

fn collect_blocks(element: ElementRef<'_>, blocks: &mut Vec<String>, run: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => run.push_str(text),
            Node::Element(el) => {
                let tag = el.name();
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_skipped(tag) {
                    continue;
                }
                if is_inline(tag) {
                    run.extend(child.text());
                } else if is_block(tag) {
                    flush(run, blocks);
                    run.extend(child.text());
                    flush(run, blocks);
                } else {
                    flush(run, blocks);
                    collect_blocks(child, blocks, run);
                    flush(run, blocks);
                }
            }
            _ => {}
        }
    }
}

impl DocumentLoader for HtmlLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Html
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let decoded = String::from_utf8_lossy(bytes);
        let document = Html::parse_document(&decoded);
        let root = self.pick_root(&document);

        let mut blocks = Vec::new();
        let mut run = String::new();
        collect_blocks(root, &mut blocks, &mut run);
        flush(&mut run, &mut blocks);
        Ok(blocks.join("\n"))
    }
}

/// Text extracted from one file.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub source: String,
    pub format: DocumentFormat,
    pub text: String,
}

/// Loaders keyed by format, plus the size cap applied before reading.
#[derive(Clone)]
pub struct LoaderRegistry {
    loaders: HashMap<DocumentFormat, Arc<dyn DocumentLoader>>,
    max_document_bytes: usize,
}

impl LoaderRegistry {
    /// Registry with the built-in text, Markdown and HTML loaders.
    pub fn new(max_document_bytes: usize) -> Result<Self> {
        if max_document_bytes == 0 {
            return Err(AppError::Validation(
                "max_document_bytes must be greater than 0".to_string(),
            ));
        }

        let mut registry = Self {
            loaders: HashMap::new(),
            max_document_bytes,
        };
        registry.register(Arc::new(TextLoader::plain()));
        registry.register(Arc::new(TextLoader::markdown()));
        registry.register(Arc::new(HtmlLoader::new()?));
        Ok(registry)
    }

    /// Add or replace the loader for `loader.format()`.
    pub fn register(&mut self, loader: Arc<dyn DocumentLoader>) {
        self.loaders.insert(loader.format(), loader);
    }

    pub fn supports(&self, format: DocumentFormat) -> bool {
        self.loaders.contains_key(&format)
    }

    pub fn max_document_bytes(&self) -> usize {
        self.max_document_bytes
    }

    /// Extract text from in-memory bytes of a known format.
    pub fn extract(&self, format: DocumentFormat, bytes: &[u8]) -> Result<String> {
        if bytes.len() > self.max_document_bytes {
            return Err(AppError::Validation(format!(
                "Document is {} bytes, the limit is {}",
                bytes.len(),
                self.max_document_bytes
            )));
        }
        let loader = self.loaders.get(&format).ok_or_else(|| {
            AppError::Validation(format!("No loader registered for {} documents", format))
        })?;

        let text = loader.extract(bytes)?;
        if text.trim().is_empty() {
            return Err(AppError::Validation("Document contains no text".to_string()));
        }
        Ok(text)
    }

    /// Read and extract a document from disk.
    ///
    /// Oversized files are refused before they are read.
    pub async fn load_document(&self, path: &Path) -> Result<LoadedDocument> {
        let format = DocumentFormat::from_path(path)?;
        if !self.supports(format) {
            return Err(AppError::Validation(format!(
                "No loader registered for {} documents ('{}')",
                format,
                path.display()
            )));
        }

        let metadata = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(format!("Document '{}'", path.display()))
            }
            _ => AppError::Io(e),
        })?;
        if !metadata.is_file() {
            return Err(AppError::Validation(format!(
                "'{}' is not a file",
                path.display()
            )));
        }
        if metadata.len() > self.max_document_bytes as u64 {
            return Err(AppError::Validation(format!(
                "'{}' is {} bytes, the limit is {}",
                path.display(),
                metadata.len(),
                self.max_document_bytes
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        let text = self.extract(format, &bytes)?;
        debug!(path = %path.display(), %format, bytes = bytes.len(), "Document loaded");

        Ok(LoadedDocument {
            source: path.display().to_string(),
            format,
            text,
        })
    }
}
