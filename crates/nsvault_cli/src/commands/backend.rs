//! Backend command implementation.

use crate::Format;
use nsvault_core::NamespaceRegistry;
use serde::Serialize;
use std::collections::BTreeMap;

/// Backend description as printed by the command.
#[derive(Debug, Serialize)]
pub struct BackendReport {
    /// Namespace key.
    pub namespace: String,
    /// Selected backend.
    pub backend: String,
    /// Backend-specific details.
    pub details: BTreeMap<String, String>,
}

/// Shows which backend serves a namespace.
pub async fn run(
    registry: &NamespaceRegistry,
    namespace: Option<&str>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let adapter = registry.get_or_create(namespace).await?;
    let info = adapter.backend_info()?;
    let report = BackendReport {
        namespace: info.namespace,
        backend: info.kind.to_string(),
        details: info.details,
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => {
            println!("Namespace: {}", report.namespace);
            println!("Backend:   {}", report.backend);
            for (key, value) in &report.details {
                println!("  {key}: {value}");
            }
        }
    }
    Ok(())
}
