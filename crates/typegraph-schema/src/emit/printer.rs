//! SDL printer.
//!
//! Output follows the layout of graphql-js `printSchema`: types separated by
//! one blank line, two-space indentation, descriptions as block strings and
//! no `schema { ... }` block since root types always carry their default
//! names.

use std::cmp::Ordering;
use std::fmt::Write;

use serde_json::Value;
use typegraph_metadata::TypeKind;

use crate::config::PrintSchemaOptions;
use crate::schema::{GraphSchema, ResolvedArgument, ResolvedField, ResolvedType, ResolvedTypeRef};

/// Reason graphql-js assumes for a bare `@deprecated`.
const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

/// Descriptions longer than this print on their own lines.
const MAX_SINGLE_LINE_DESCRIPTION: usize = 70;

/// Renders `schema` as SDL, without a trailing newline.
#[must_use]
pub fn print_schema(schema: &GraphSchema, options: &PrintSchemaOptions) -> String {
    let printer = Printer {
        schema,
        sorted: options.sorted_schema,
    };

    let mut types: Vec<&ResolvedType> = schema
        .types()
        .map(|(_, resolved)| resolved)
        .filter(|resolved| !resolved.builtin)
        .collect();
    if printer.sorted {
        types.sort_by(|a, b| a.name.cmp(&b.name));
    }

    let blocks: Vec<String> = types.into_iter().map(|ty| printer.print_type(ty)).collect();
    blocks.join("\n\n")
}

struct Printer<'a> {
    schema: &'a GraphSchema,
    sorted: bool,
}

impl Printer<'_> {
    fn ordered<'t, T>(
        &self,
        items: impl Iterator<Item = &'t T>,
        cmp: impl Fn(&T, &T) -> Ordering,
    ) -> Vec<&'t T>
    where
        T: 't,
    {
        let mut items: Vec<&T> = items.collect();
        if self.sorted {
            items.sort_by(|a, b| cmp(*a, *b));
        }
        items
    }

    fn print_type(&self, ty: &ResolvedType) -> String {
        let mut sdl = String::new();
        print_description(&mut sdl, ty.description.as_deref(), "", true);

        match ty.kind {
            TypeKind::Scalar => {
                write!(sdl, "scalar {}", ty.name).ok();
            }
            TypeKind::Object | TypeKind::Interface => {
                let keyword = if ty.kind == TypeKind::Object {
                    "type"
                } else {
                    "interface"
                };
                write!(sdl, "{keyword} {}", ty.name).ok();
                self.print_implements(&mut sdl, ty);
                self.print_fields(&mut sdl, ty);
            }
            TypeKind::InputObject | TypeKind::Args => {
                write!(sdl, "input {}", ty.name).ok();
                self.print_fields(&mut sdl, ty);
            }
            TypeKind::Enum => {
                write!(sdl, "enum {} {{", ty.name).ok();
                let values = self.ordered(ty.enum_values.iter(), |a, b| a.name.cmp(&b.name));
                for (i, value) in values.into_iter().enumerate() {
                    sdl.push('\n');
                    print_description(&mut sdl, value.description.as_deref(), "  ", i == 0);
                    write!(sdl, "  {}", value.name).ok();
                    print_deprecated(&mut sdl, value.deprecation_reason.as_deref());
                }
                sdl.push_str("\n}");
            }
            TypeKind::Union => {
                write!(sdl, "union {}", ty.name).ok();
                let mut members: Vec<&str> = ty
                    .possible_types
                    .iter()
                    .map(|&member| self.schema.type_name(member))
                    .collect();
                if self.sorted {
                    members.sort_unstable();
                }
                if !members.is_empty() {
                    write!(sdl, " = {}", members.join(" | ")).ok();
                }
            }
        }

        sdl
    }

    fn print_implements(&self, sdl: &mut String, ty: &ResolvedType) {
        let mut interfaces: Vec<&str> = ty
            .interfaces
            .iter()
            .map(|&interface| self.schema.type_name(interface))
            .collect();
        if interfaces.is_empty() {
            return;
        }
        if self.sorted {
            interfaces.sort_unstable();
        }
        write!(sdl, " implements {}", interfaces.join(" & ")).ok();
    }

    fn print_fields(&self, sdl: &mut String, ty: &ResolvedType) {
        sdl.push_str(" {");
        let fields = self.ordered(ty.fields.values(), |a, b| a.name.cmp(&b.name));
        for (i, field) in fields.into_iter().enumerate() {
            sdl.push('\n');
            self.print_field(sdl, field, i == 0);
        }
        sdl.push_str("\n}");
    }

    fn print_field(&self, sdl: &mut String, field: &ResolvedField, first: bool) {
        print_description(sdl, field.description.as_deref(), "  ", first);
        write!(sdl, "  {}", field.name).ok();
        self.print_args(sdl, field);
        write!(sdl, ": {}", field.type_ref.display(self.schema)).ok();
        if let Some(default) = &field.default_value {
            write!(sdl, " = {}", self.literal(&field.type_ref, default)).ok();
        }
        print_deprecated(sdl, field.deprecation_reason.as_deref());
    }

    fn print_args(&self, sdl: &mut String, field: &ResolvedField) {
        if field.args.is_empty() {
            return;
        }
        let args = self.ordered(field.args.values(), |a, b| a.name.cmp(&b.name));

        if args.iter().all(|arg| arg.description.is_none()) {
            let inline: Vec<String> = args.iter().map(|arg| self.input_value(arg)).collect();
            write!(sdl, "({})", inline.join(", ")).ok();
            return;
        }

        sdl.push('(');
        for (i, arg) in args.into_iter().enumerate() {
            sdl.push('\n');
            print_description(sdl, arg.description.as_deref(), "    ", i == 0);
            write!(sdl, "    {}", self.input_value(arg)).ok();
        }
        sdl.push_str("\n  )");
    }

    fn input_value(&self, arg: &ResolvedArgument) -> String {
        let mut printed = format!("{}: {}", arg.name, arg.type_ref.display(self.schema));
        if let Some(default) = &arg.default_value {
            write!(printed, " = {}", self.literal(&arg.type_ref, default)).ok();
        }
        printed
    }

    /// Prints a default value as a GraphQL literal of the given type.
    fn literal(&self, type_ref: &ResolvedTypeRef, value: &Value) -> String {
        let named = self.schema.named_type(type_ref);
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) if named.is_some_and(|ty| ty.kind == TypeKind::Enum) => s.clone(),
            Value::String(s) => string_literal(s),
            Value::Array(items) => {
                let items: Vec<String> = items
                    .iter()
                    .map(|item| self.literal(type_ref, item))
                    .collect();
                format!("[{}]", items.join(", "))
            }
            Value::Object(entries) => {
                let fields: Vec<String> = entries
                    .iter()
                    .map(|(key, item)| {
                        let printed = match named.and_then(|ty| ty.field(key)) {
                            Some(field) => self.literal(&field.type_ref, item),
                            None => untyped_literal(item),
                        };
                        format!("{key}: {printed}")
                    })
                    .collect();
                format!("{{{}}}", fields.join(", "))
            }
        }
    }
}

/// Prints a literal with no type information; strings stay quoted.
fn untyped_literal(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(untyped_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(entries) => {
            let fields: Vec<String> = entries
                .iter()
                .map(|(key, item)| format!("{key}: {}", untyped_literal(item)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
        Value::String(s) => string_literal(s),
        other => other.to_string(),
    }
}

fn string_literal(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn print_deprecated(sdl: &mut String, reason: Option<&str>) {
    match reason {
        None => {}
        Some(DEFAULT_DEPRECATION_REASON) => sdl.push_str(" @deprecated"),
        Some(reason) => {
            write!(sdl, " @deprecated(reason: {})", string_literal(reason)).ok();
        }
    }
}

/// Writes a description block followed by a newline. Described items after
/// the first in a block are separated by a blank line.
fn print_description(sdl: &mut String, description: Option<&str>, indentation: &str, first: bool) {
    let Some(description) = description else {
        return;
    };
    if !indentation.is_empty() && !first {
        sdl.push('\n');
    }

    let block = block_string(description);
    sdl.push_str(indentation);
    sdl.push_str(&block.replace('\n', &format!("\n{indentation}")));
    sdl.push('\n');
}

fn block_string(value: &str) -> String {
    let escaped = value.replace("\"\"\"", "\\\"\"\"");
    let lines: Vec<&str> = escaped.lines().collect();
    let single_line = lines.len() <= 1 && !escaped.contains('\n');
    let leading_whitespace = value.starts_with([' ', '\t']);
    let force_leading_newline = lines.len() > 1
        && lines[1..]
            .iter()
            .all(|line| line.is_empty() || line.starts_with([' ', '\t']));
    let force_trailing_newline = value.ends_with('"') || value.ends_with('\\');
    let multiple_lines = !single_line
        || value.len() > MAX_SINGLE_LINE_DESCRIPTION
        || force_trailing_newline
        || force_leading_newline;

    let mut block = String::from("\"\"\"");
    if (multiple_lines && !(single_line && leading_whitespace)) || force_leading_newline {
        block.push('\n');
    }
    block.push_str(&escaped);
    if multiple_lines {
        block.push('\n');
    }
    block.push_str("\"\"\"");
    block
}
