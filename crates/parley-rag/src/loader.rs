use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::RagError;

/// A document read from the retrieval directory, reduced to plain text.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    /// File name (no directory component), kept as retrieval metadata.
    pub name: String,
    pub text: String,
}

/// Names of all regular files directly inside `dir`, sorted.
///
/// This is the change-detection key for the retrieval index: if the listing
/// differs from the one recorded at indexing time, the index is stale.
pub fn scan_file_names(dir: &Path) -> Result<Vec<String>, RagError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| RagError::ScanDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort_unstable();
    Ok(names)
}

/// Load one file as plain text, dispatching on its extension.
///
/// Returns `Ok(None)` for formats without a loader; the caller decides
/// whether skipping is worth a log line.
pub fn load_file(path: &Path) -> Result<Option<DocumentFile>, RagError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let text = match extension.as_str() {
        "txt" | "md" | "markdown" => read_lossy(path)?,
        "csv" => flatten_csv(&read_lossy(path)?),
        "html" | "htm" => strip_html_tags(&read_lossy(path)?),
        "ipynb" => notebook_sources(path)?,
        _ => return Ok(None),
    };

    Ok(Some(DocumentFile { name, text }))
}

/// Load every supported file directly inside `dir`.
pub fn load_directory(dir: &Path) -> Result<Vec<DocumentFile>, RagError> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| RagError::ScanDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        match load_file(entry.path())? {
            Some(doc) => documents.push(doc),
            None => {
                debug!(path = %entry.path().display(), "no loader for file; skipping");
            }
        }
    }
    Ok(documents)
}

fn read_lossy(path: &Path) -> Result<String, RagError> {
    let bytes = std::fs::read(path).map_err(|source| RagError::ReadDocument {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Flatten CSV records into readable lines: fields trimmed and joined with
/// a comma+space. Quoting is not interpreted; the output feeds an embedding
/// model, not a parser.
fn flatten_csv(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split(',')
                .map(|field| field.trim().trim_matches('"'))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop markup from an HTML document, keeping its text content.
fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                // Tag boundaries separate words in rendered text.
                out.push(' ');
            }
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    // Collapse the whitespace runs left behind by removed markup.
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the source text of every markdown and code cell in a notebook.
fn notebook_sources(path: &Path) -> Result<String, RagError> {
    let raw = read_lossy(path)?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|source| RagError::ParseNotebook {
            path: path.to_path_buf(),
            source,
        })?;

    let mut sections = Vec::new();
    if let Some(cells) = value.get("cells").and_then(|c| c.as_array()) {
        for cell in cells {
            let cell_type = cell.get("cell_type").and_then(|t| t.as_str());
            if !matches!(cell_type, Some("markdown") | Some("code")) {
                continue;
            }
            let source = match cell.get("source") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Array(lines)) => lines
                    .iter()
                    .filter_map(|l| l.as_str())
                    .collect::<String>(),
                _ => continue,
            };
            if !source.trim().is_empty() {
                sections.push(source);
            }
        }
    }
    Ok(sections.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("parley-loader-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn strips_html_markup() {
        let html = "<html><body><h1>Title</h1><p>Hello &amp; welcome</p></body></html>";
        assert_eq!(strip_html_tags(html), "Title Hello & welcome");
    }

    #[test]
    fn flattens_csv_records() {
        let csv = "name,age\n\"Ada\", 36\n\nGrace,45\n";
        assert_eq!(flatten_csv(csv), "name, age\nAda, 36\nGrace, 45");
    }

    #[test]
    fn extracts_notebook_cells() {
        let dir = scratch_dir("nb");
        let path = dir.join("demo.ipynb");
        std::fs::write(
            &path,
            r##"{"cells":[
                {"cell_type":"markdown","source":["# Notes\n","about things"]},
                {"cell_type":"code","source":"print(1)"},
                {"cell_type":"raw","source":"ignored"}
            ]}"##,
        )
        .unwrap();

        let text = notebook_sources(&path).unwrap();
        assert!(text.contains("# Notes\nabout things"));
        assert!(text.contains("print(1)"));
        assert!(!text.contains("ignored"));
    }

    #[test]
    fn loads_supported_files_and_skips_the_rest() {
        let dir = scratch_dir("mixed");
        std::fs::write(dir.join("a.txt"), "plain text").unwrap();
        std::fs::write(dir.join("b.md"), "# heading").unwrap();
        std::fs::write(dir.join("c.bin"), [0u8, 159, 146, 150]).unwrap();
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested").join("d.txt"), "too deep").unwrap();

        let docs = load_directory(&dir).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["a.txt", "b.md"]);
        assert_eq!(docs[0].text, "plain text");
    }

    #[test]
    fn scan_lists_all_files_sorted() {
        let dir = scratch_dir("scan");
        std::fs::write(dir.join("z.txt"), "z").unwrap();
        std::fs::write(dir.join("a.pdf"), "not loadable but listed").unwrap();

        let names = scan_file_names(&dir).unwrap();
        assert_eq!(names, ["a.pdf", "z.txt"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = std::env::temp_dir().join("parley-loader-definitely-missing");
        assert!(scan_file_names(&dir).is_err());
    }
}
