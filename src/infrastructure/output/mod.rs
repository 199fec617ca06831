pub mod json_history_exporter;

pub use json_history_exporter::JsonHistoryExporter;
