//! Credential commands.

use nsvault_core::NamespaceRegistry;
use std::path::Path;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Prints the credential names of a namespace.
pub async fn list(registry: &NamespaceRegistry, namespace: Option<&str>) -> CommandResult {
    let adapter = registry.get_or_create(namespace).await?;
    for name in adapter.list_credentials().await? {
        println!("{name}");
    }
    Ok(())
}

/// Writes one credential to a JSON file.
pub async fn export(
    registry: &NamespaceRegistry,
    namespace: Option<&str>,
    name: &str,
    output: Option<&Path>,
) -> CommandResult {
    let adapter = registry.get_or_create(namespace).await?;
    if !adapter.export_credential(name, output).await? {
        return Err(format!("No credential named {name} in {}", adapter.namespace()).into());
    }
    println!("Exported {name}");
    Ok(())
}

/// Stores a JSON file as a credential.
pub async fn import(
    registry: &NamespaceRegistry,
    namespace: Option<&str>,
    path: &Path,
    name: Option<&str>,
) -> CommandResult {
    let adapter = registry.get_or_create(namespace).await?;
    if !adapter.import_credential(path, name).await? {
        return Err(format!("Backend refused {}", path.display()).into());
    }
    println!("Imported {}", path.display());
    Ok(())
}
