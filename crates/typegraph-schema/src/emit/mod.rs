//! SDL printing and schema file emission.
//!
//! ## Components
//!
//! - [`print_schema`] - Renders a [`GraphSchema`](crate::GraphSchema) as SDL
//! - [`emit_schema_definition_file_sync`] - Atomic write of the banner and SDL
//! - [`emit_schema_definition_file`] - The same write on the blocking pool
//! - [`emit_to_writer`] - The same document to any writer, e.g. stdout

mod printer;
mod writer;

pub use printer::print_schema;
pub use writer::{
    GENERATED_BANNER, emit_schema_definition_file, emit_schema_definition_file_sync,
    emit_to_writer, render_document,
};
