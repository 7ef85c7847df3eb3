//! Text extraction for ingestion.
//!
//! Plain text and markdown are read directly. PDF text comes from the page
//! content streams; DOCX text from the runs in `word/document.xml`.
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "text" => Some(DocumentFormat::PlainText),
            "md" | "markdown" => Some(DocumentFormat::Markdown),
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }

    pub fn is_readable(&self) -> bool {
        matches!(self, DocumentFormat::PlainText | DocumentFormat::Markdown | DocumentFormat::Pdf | DocumentFormat::Docx)
    }
}

pub fn extract_text(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::Validation(format!("file does not exist: {}", path.display())));
    }
    let text = match DocumentFormat::from_path(path) {
        Some(DocumentFormat::PlainText | DocumentFormat::Markdown) => read_file_content(path)?,
        Some(DocumentFormat::Pdf) => read_pdf(path)?,
        Some(DocumentFormat::Docx) => read_docx(path)?,
        None => return Err(Error::UnsupportedFormat(format!("unsupported file format: {}", path.display()))),
    };
    debug!(path = %path.display(), chars = text.chars().count(), "extracted text");
    Ok(text)
}

fn normalize(text: &str) -> String { text.replace("\r\n", "\n").trim().to_string() }

fn read_file_content(path: &Path) -> Result<String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => String::from_utf8_lossy(&fs::read(path)?).to_string(),
    };
    Ok(normalize(&content))
}

fn read_pdf(path: &Path) -> Result<String> {
    let unreadable = |e: lopdf::Error| Error::UnsupportedFormat(format!("cannot read pdf {}: {e}", path.display()));
    let doc = lopdf::Document::load(path).map_err(unreadable)?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Ok(String::new());
    }
    let text = doc.extract_text(&pages).map_err(unreadable)?;
    Ok(normalize(&text))
}

fn read_docx(path: &Path) -> Result<String> {
    let unreadable = |e: String| Error::UnsupportedFormat(format!("cannot read docx {}: {e}", path.display()));
    let mut archive = zip::ZipArchive::new(fs::File::open(path)?).map_err(|e| unreadable(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| unreadable(e.to_string()))?
        .read_to_string(&mut xml)?;
    Ok(normalize(&docx_text(&xml).map_err(unreadable)?))
}

/// Text of every `w:t` run; paragraphs end in a newline.
fn docx_text(xml: &str) -> std::result::Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_run_text = false;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => out.push_str(&t.unescape().map_err(|e| e.to_string())?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// Every readable document under `root`, sorted for a stable ingest order.
pub fn list_documents(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| DocumentFormat::from_path(p).is_some_and(|f| f.is_readable()))
        .collect();
    files.sort();
    files
}
