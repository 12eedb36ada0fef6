//! Text summary builder for CLI output.
//!
//! Formats the manifest of a finished run as human-readable lines for text mode.

use crate::backend::BackendClient;
use crate::model::ResultFile;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from a run id and its manifest. URLs are made absolute
/// against the backend so they can be opened directly.
pub(crate) fn build_text_summary(
    run_id: Option<&str>,
    files: &[ResultFile],
    client: &BackendClient,
) -> TextSummary {
    let mut lines = Vec::new();

    match run_id {
        Some(id) => lines.push(format!("Run: {id}")),
        None => lines.push("Run: finished without a results signal".to_string()),
    }

    let documents: Vec<&ResultFile> = files.iter().filter(|f| f.kind.is_document()).collect();
    let downloads: Vec<&ResultFile> = files.iter().filter(|f| f.kind.is_download()).collect();
    let other = files.len() - documents.len() - downloads.len();

    if files.is_empty() {
        lines.push("Results: none".to_string());
    } else {
        lines.push(format!(
            "Results: {} document(s), {} download(s)",
            documents.len(),
            downloads.len()
        ));
    }
    for f in documents {
        lines.push(format!("  [{}] {}: {}", f.kind, f.label, client.resolve(&f.url)));
    }
    for f in downloads {
        lines.push(format!("  [{}] {}: {}", f.kind, f.label, client.resolve(&f.url)));
    }
    if other > 0 {
        lines.push(format!("  ({other} other file(s) not shown)"));
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResultKind;

    fn file(label: &str, url: &str, kind: ResultKind) -> ResultFile {
        ResultFile {
            label: label.into(),
            url: url.into(),
            kind,
            name: None,
        }
    }

    #[test]
    fn lists_documents_before_downloads_with_absolute_urls() {
        let client = BackendClient::new("http://models.local:8000", None).unwrap();
        let files = vec![
            file("Export: out.xlsx", "/results/r1/out.xlsx", ResultKind::Xlsx),
            file("Network Map 2030", "/results/r1/Network_Graph_2030.html", ResultKind::Html),
            file("notes", "/results/r1/notes.txt", ResultKind::Other("txt".into())),
        ];
        let summary = build_text_summary(Some("r1"), &files, &client);
        assert_eq!(
            summary.lines,
            vec![
                "Run: r1",
                "Results: 1 document(s), 1 download(s)",
                "  [html] Network Map 2030: http://models.local:8000/results/r1/Network_Graph_2030.html",
                "  [xlsx] Export: out.xlsx: http://models.local:8000/results/r1/out.xlsx",
                "  (1 other file(s) not shown)",
            ]
        );
    }

    #[test]
    fn empty_manifest_is_reported() {
        let client = BackendClient::new("http://localhost:8000", None).unwrap();
        let summary = build_text_summary(None, &[], &client);
        assert_eq!(
            summary.lines,
            vec!["Run: finished without a results signal", "Results: none"]
        );
    }
}
