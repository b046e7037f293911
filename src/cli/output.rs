use std::fmt::Write as FmtWrite;

use console::style;
use serde_json::json;

use crate::models::SearchHit;
use crate::services::TrainReport;

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Machine-parseable JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {s}")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

pub trait Formatter {
    fn format_query_results(&self, results: &QueryResults) -> String;
    fn format_train_report(&self, dataset: &str, report: &TrainReport, duration_ms: u64)
    -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct QueryResults {
    pub dataset: String,
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub vector_store_driver: String,
    pub vector_store_url: String,
    pub vector_store_connected: bool,
    pub datasets: Vec<String>,
    pub datasets_dir: String,
    pub embedding_model: String,
}

pub struct TextFormatter;

fn preview(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        format!("{head}...")
    } else {
        head
    }
}

impl Formatter for TextFormatter {
    fn format_query_results(&self, results: &QueryResults) -> String {
        if results.hits.is_empty() {
            return format!(
                "No results in {} for: {}\n",
                results.dataset, results.query
            );
        }

        let mut output = String::new();
        let _ = writeln!(
            output,
            "Results for {} in {}",
            style(format!("\"{}\"", results.query)).bold(),
            style(&results.dataset).cyan()
        );
        let _ = writeln!(
            output,
            "Found {} results in {}ms\n",
            results.hits.len(),
            results.duration_ms
        );

        for (i, hit) in results.hits.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {}",
                i + 1,
                style(format!("[Score: {:.3}]", hit.score)).green()
            );
            for line in preview(&hit.text).lines() {
                let _ = writeln!(output, "   {line}");
            }
            let _ = writeln!(output);
        }

        output
    }

    fn format_train_report(
        &self,
        dataset: &str,
        report: &TrainReport,
        duration_ms: u64,
    ) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Training Complete: {}", style(dataset).cyan());
        let _ = writeln!(output, "-----------------");
        let _ = writeln!(output, "Files read: {}", report.files_read);
        let _ = writeln!(output, "Chunks stored: {}", report.chunks);
        let _ = writeln!(output, "Dimension: {}", report.dimension);
        let _ = writeln!(output, "Duration: {duration_ms}ms");
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Status");
        let _ = writeln!(output, "------");

        let vector_status = if status.vector_store_connected {
            style("[CONNECTED]").green()
        } else {
            style("[DISCONNECTED]").red()
        };
        let _ = writeln!(
            output,
            "Vector Store:  {} ({})",
            status.vector_store_driver, vector_status
        );
        let _ = writeln!(output, "  URL:         {}", status.vector_store_url);
        let _ = writeln!(output, "Embedding:     {}", status.embedding_model);
        let _ = writeln!(output, "Datasets dir:  {}", status.datasets_dir);

        if status.vector_store_connected {
            if status.datasets.is_empty() {
                let _ = writeln!(output, "Trained:       none");
            } else {
                let _ = writeln!(output, "Trained:       {}", status.datasets.join(", "));
            }
        }

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{message}\n")
    }

    fn format_error(&self, error: &str) -> String {
        format!("{} {error}\n", style("Error:").red().bold())
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &serde_json::Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        let mut out = rendered.unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string());
        out.push('\n');
        out
    }
}

impl Formatter for JsonFormatter {
    fn format_query_results(&self, results: &QueryResults) -> String {
        self.render(&json!({
            "dataset": results.dataset,
            "query": results.query,
            "results": results.hits,
            "duration_ms": results.duration_ms,
        }))
    }

    fn format_train_report(
        &self,
        dataset: &str,
        report: &TrainReport,
        duration_ms: u64,
    ) -> String {
        self.render(&json!({
            "dataset": dataset,
            "files_read": report.files_read,
            "chunks": report.chunks,
            "dimension": report.dimension,
            "duration_ms": duration_ms,
        }))
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(&json!({
            "vector_store": {
                "driver": status.vector_store_driver,
                "url": status.vector_store_url,
                "connected": status.vector_store_connected,
                "datasets": status.datasets,
            },
            "embedding_model": status.embedding_model,
            "datasets_dir": status.datasets_dir,
        }))
    }

    fn format_message(&self, message: &str) -> String {
        self.render(&json!({ "message": message }))
    }

    fn format_error(&self, error: &str) -> String {
        self.render(&json!({ "error": error }))
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
