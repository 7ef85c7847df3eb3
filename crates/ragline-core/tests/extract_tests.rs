use std::fs;
use std::io::Write;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

use ragline_core::extract::{extract_text, list_documents, DocumentFormat};
use ragline_core::ErrorKind;

#[test]
fn plain_text_is_read_and_trimmed() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("a.txt");
    fs::write(&path, "  line one\r\nline two\n\n").unwrap();
    assert_eq!(extract_text(&path).unwrap(), "line one\nline two");
}

#[test]
fn invalid_utf8_falls_back_to_lossy() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("b.md");
    fs::write(&path, [b'o', b'k', 0xff, b'!']).unwrap();
    let text = extract_text(&path).unwrap();
    assert!(text.starts_with("ok"));
    assert!(text.ends_with('!'));
}

fn write_pdf(path: &Path, line: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![100.into(), 600.into()]),
            Operation::new("Tj", vec![Object::string_literal(line)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn write_docx(path: &Path, document_xml: &str) {
    let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default()).unwrap();
    zip.write_all(document_xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

#[test]
fn pdf_text_is_extracted() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("manual.pdf");
    write_pdf(&path, "Threads share one heap");
    let text = extract_text(&path).unwrap();
    assert!(text.contains("Threads share one heap"), "got {text:?}");
}

#[test]
fn docx_runs_and_paragraphs_are_extracted() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("notes.docx");
    let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>Executors </w:t></w:r><w:r><w:t>reuse threads</w:t></w:r></w:p><w:p><w:r><w:t>Locks &amp; latches</w:t><w:tab/><w:t>differ</w:t></w:r></w:p></w:body></w:document>"#;
    write_docx(&path, xml);
    assert_eq!(extract_text(&path).unwrap(), "Executors reuse threads\nLocks & latches\tdiffer");
}

#[test]
fn docx_without_document_part_is_unsupported() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("empty.docx");
    let mut zip = zip::ZipWriter::new(fs::File::create(&path).unwrap());
    zip.start_file("word/styles.xml", zip::write::SimpleFileOptions::default()).unwrap();
    zip.write_all(b"<w:styles/>").unwrap();
    zip.finish().unwrap();
    assert_eq!(extract_text(&path).unwrap_err().kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn corrupt_and_unknown_formats_are_unsupported() {
    let tmp = TempDir::new().unwrap();
    for name in ["doc.pdf", "doc.docx", "image.png"] {
        let path = tmp.path().join(name);
        fs::write(&path, b"\x00\x01").unwrap();
        assert_eq!(extract_text(&path).unwrap_err().kind(), ErrorKind::UnsupportedFormat, "{name}");
    }
}

#[test]
fn missing_file_is_a_validation_error() {
    let tmp = TempDir::new().unwrap();
    let err = extract_text(&tmp.path().join("nope.txt")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[test]
fn list_documents_finds_readable_files_sorted() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("nested")).unwrap();
    fs::write(tmp.path().join("b.txt"), "b").unwrap();
    fs::write(tmp.path().join("nested/a.md"), "a").unwrap();
    fs::write(tmp.path().join("c.pdf"), "c").unwrap();
    fs::write(tmp.path().join("d.docx"), "d").unwrap();
    fs::write(tmp.path().join("e.png"), "e").unwrap();
    let files = list_documents(tmp.path());
    assert_eq!(files.len(), 4);
    assert!(files.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(DocumentFormat::from_path(&files[0]).map(|f| f.is_readable()), Some(true));
}
