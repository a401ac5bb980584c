//! Schema file emission.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::printer::print_schema;
use crate::config::PrintSchemaOptions;
use crate::error::SchemaError;
use crate::schema::GraphSchema;

/// Banner heading every emitted schema document.
pub const GENERATED_BANNER: &str = "\
# -------------------------------------------------------
# !!! THIS FILE WAS GENERATED BY TYPEGRAPH-SCHEMA !!!
# !!!     DO NOT MODIFY THIS FILE BY YOURSELF     !!!
# -------------------------------------------------------
";

/// Renders the banner followed by the SDL of `schema`.
#[must_use]
pub fn render_document(schema: &GraphSchema, options: &PrintSchemaOptions) -> String {
    format!("{GENERATED_BANNER}\n{}\n", print_schema(schema, options))
}

/// Writes the schema document to `path`.
///
/// Missing parent directories are created. The document goes to a temporary
/// file next to the target which is then renamed over it, so readers see
/// either the previous file or the complete new one.
///
/// # Errors
///
/// Returns `SchemaError::Emit` naming `path` if any filesystem step fails.
pub fn emit_schema_definition_file_sync(
    path: impl AsRef<Path>,
    schema: &GraphSchema,
    options: &PrintSchemaOptions,
) -> Result<(), SchemaError> {
    let document = render_document(schema, options);
    write_atomically(path.as_ref(), &document)
}

/// Async variant of [`emit_schema_definition_file_sync`]; the write runs on
/// the blocking thread pool.
///
/// # Errors
///
/// Returns `SchemaError::Emit` naming `path` if any filesystem step fails.
pub async fn emit_schema_definition_file(
    path: impl AsRef<Path>,
    schema: &GraphSchema,
    options: &PrintSchemaOptions,
) -> Result<(), SchemaError> {
    let path = path.as_ref().to_path_buf();
    let document = render_document(schema, options);

    let target = path.clone();
    tokio::task::spawn_blocking(move || write_atomically(&target, &document))
        .await
        .map_err(|e| SchemaError::Emit {
            path,
            source: io::Error::other(e),
        })?
}

/// Writes the schema document to `writer`.
///
/// # Errors
///
/// Returns `SchemaError::Emit` if the writer fails. The reported path is
/// `-`, the conventional name of standard output.
pub fn emit_to_writer<W: Write>(
    mut writer: W,
    schema: &GraphSchema,
    options: &PrintSchemaOptions,
) -> Result<(), SchemaError> {
    let document = render_document(schema, options);
    let emit_error = |source| SchemaError::Emit {
        path: PathBuf::from("-"),
        source,
    };

    writer.write_all(document.as_bytes()).map_err(emit_error)?;
    writer.flush().map_err(emit_error)?;
    debug!(bytes = document.len(), "Emitted schema document");
    Ok(())
}

fn write_atomically(path: &Path, document: &str) -> Result<(), SchemaError> {
    let emit_error = |source| SchemaError::Emit {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(emit_error)?;

    let mut file = NamedTempFile::new_in(dir).map_err(emit_error)?;
    file.write_all(document.as_bytes()).map_err(emit_error)?;
    file.as_file().sync_all().map_err(emit_error)?;
    file.persist(path).map_err(|e| emit_error(e.error))?;

    info!(path = %path.display(), bytes = document.len(), "Schema file written");
    Ok(())
}
