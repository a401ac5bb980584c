//! Conversion of a [`GraphSchema`] into an executable `async-graphql`
//! dynamic schema.
//!
//! Fields bound to a handler call it. Every other field reads the property of
//! the same name from the parent value, so plain data objects returned by a
//! root handler resolve without further wiring.

use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, InputObject, InputValue, Interface, InterfaceField,
    Object, Scalar, Schema, Subscription, SubscriptionField, TypeRef, Union,
};
use async_graphql::{Name, Value};
use tracing::debug;
use typegraph_metadata::{OperationType, TypeKind};

use super::graph::{GraphSchema, ResolvedArgument, ResolvedField, ResolvedType, ResolvedTypeRef};
use crate::config::RuntimeConfig;
use crate::error::SchemaError;

impl GraphSchema {
    /// Builds an executable schema with the given runtime limits.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Runtime` if a subscription field has no stream
    /// handler, a default value cannot be converted, or `async-graphql`
    /// rejects the schema.
    pub fn to_dynamic(&self, config: &RuntimeConfig) -> Result<Schema, SchemaError> {
        debug!(types = self.len(), "Starting executable schema build");

        let mutation = self.mutation_type().map(|root| root.name.as_str());
        let subscription = self.subscription_type().map(|root| root.name.as_str());
        let mut builder = Schema::build(&self.query_type().name, mutation, subscription);

        for (id, resolved) in self.types() {
            if resolved.builtin {
                continue;
            }
            if Some(id) == self.root(OperationType::Subscription) {
                builder = builder.register(self.subscription_object(resolved)?);
                continue;
            }

            builder = match resolved.kind {
                TypeKind::Object => builder.register(self.object(resolved)?),
                TypeKind::Interface => builder.register(self.interface(resolved)?),
                TypeKind::InputObject => builder.register(self.input_object(resolved)?),
                TypeKind::Enum => builder.register(enumeration(resolved)),
                TypeKind::Union => builder.register(self.union(resolved)),
                TypeKind::Scalar => builder.register(scalar(resolved)),
                // Never part of a built schema.
                TypeKind::Args => builder,
            };
        }

        let mut builder = builder
            .limit_depth(config.max_depth)
            .limit_complexity(config.max_complexity);
        if !config.introspection {
            builder = builder.disable_introspection();
        }

        let schema = builder
            .finish()
            .map_err(|e| SchemaError::Runtime(e.to_string()))?;

        debug!("Executable schema build complete");
        Ok(schema)
    }

    fn type_ref(&self, type_ref: &ResolvedTypeRef) -> TypeRef {
        match type_ref {
            ResolvedTypeRef::Named(id) => TypeRef::Named(self.type_name(*id).to_string().into()),
            ResolvedTypeRef::List(inner) => TypeRef::List(Box::new(self.type_ref(inner))),
            ResolvedTypeRef::NonNull(inner) => TypeRef::NonNull(Box::new(self.type_ref(inner))),
        }
    }

    /// Converts a stored default value, turning strings into enum values
    /// where the target type is an enum.
    fn input_default(
        &self,
        type_ref: &ResolvedTypeRef,
        value: &serde_json::Value,
    ) -> Result<Value, SchemaError> {
        let is_enum = self
            .named_type(type_ref)
            .is_some_and(|named| named.kind == TypeKind::Enum);
        Ok(enum_literals(
            Value::from_json(value.clone()).map_err(|e| SchemaError::Runtime(e.to_string()))?,
            is_enum,
        ))
    }

    fn input_value(&self, argument: &ResolvedArgument) -> Result<InputValue, SchemaError> {
        let mut input = InputValue::new(&argument.name, self.type_ref(&argument.type_ref));
        if let Some(description) = &argument.description {
            input = input.description(description);
        }
        if let Some(default) = &argument.default_value {
            input = input.default_value(self.input_default(&argument.type_ref, default)?);
        }
        Ok(input)
    }

    fn output_field(&self, field: &ResolvedField) -> Result<Field, SchemaError> {
        let type_ref = self.type_ref(&field.type_ref);
        let mut output = match field.binding.as_ref().and_then(|b| b.field_handler()) {
            Some(handler) => {
                let handler = handler.clone();
                Field::new(&field.name, type_ref, move |ctx| handler(ctx))
            }
            None => property_field(&field.name, type_ref),
        };

        for argument in field.args.values() {
            output = output.argument(self.input_value(argument)?);
        }
        if let Some(description) = &field.description {
            output = output.description(description);
        }
        Ok(output.deprecation(field.deprecation_reason.as_deref()))
    }

    fn object(&self, resolved: &ResolvedType) -> Result<Object, SchemaError> {
        let mut object = Object::new(&resolved.name);
        if let Some(description) = &resolved.description {
            object = object.description(description);
        }
        for interface in &resolved.interfaces {
            object = object.implement(self.type_name(*interface));
        }
        for field in resolved.fields.values() {
            object = object.field(self.output_field(field)?);
        }
        Ok(object)
    }

    fn interface(&self, resolved: &ResolvedType) -> Result<Interface, SchemaError> {
        let mut interface = Interface::new(&resolved.name);
        if let Some(description) = &resolved.description {
            interface = interface.description(description);
        }
        for parent in &resolved.interfaces {
            interface = interface.implement(self.type_name(*parent));
        }
        for field in resolved.fields.values() {
            let mut declared = InterfaceField::new(&field.name, self.type_ref(&field.type_ref));
            for argument in field.args.values() {
                declared = declared.argument(self.input_value(argument)?);
            }
            if let Some(description) = &field.description {
                declared = declared.description(description);
            }
            interface = interface.field(declared.deprecation(field.deprecation_reason.as_deref()));
        }
        Ok(interface)
    }

    fn input_object(&self, resolved: &ResolvedType) -> Result<InputObject, SchemaError> {
        let mut input = InputObject::new(&resolved.name);
        if let Some(description) = &resolved.description {
            input = input.description(description);
        }
        for field in resolved.fields.values() {
            let mut value = InputValue::new(&field.name, self.type_ref(&field.type_ref));
            if let Some(description) = &field.description {
                value = value.description(description);
            }
            if let Some(default) = &field.default_value {
                value = value.default_value(self.input_default(&field.type_ref, default)?);
            }
            input = input.field(value);
        }
        Ok(input)
    }

    fn union(&self, resolved: &ResolvedType) -> Union {
        let mut union = Union::new(&resolved.name);
        if let Some(description) = &resolved.description {
            union = union.description(description);
        }
        for member in &resolved.possible_types {
            union = union.possible_type(self.type_name(*member));
        }
        union
    }

    fn subscription_object(&self, resolved: &ResolvedType) -> Result<Subscription, SchemaError> {
        let mut subscription = Subscription::new(&resolved.name);
        if let Some(description) = &resolved.description {
            subscription = subscription.description(description);
        }

        for field in resolved.fields.values() {
            let Some(handler) = field
                .binding
                .as_ref()
                .and_then(|binding| binding.subscription_handler())
                .cloned()
            else {
                return Err(SchemaError::Runtime(format!(
                    "Subscription field `{}` has no stream handler",
                    field.name
                )));
            };

            let mut declared = SubscriptionField::new(
                &field.name,
                self.type_ref(&field.type_ref),
                move |ctx| handler(ctx),
            );
            for argument in field.args.values() {
                declared = declared.argument(self.input_value(argument)?);
            }
            if let Some(description) = &field.description {
                declared = declared.description(description);
            }
            subscription =
                subscription.field(declared.deprecation(field.deprecation_reason.as_deref()));
        }
        Ok(subscription)
    }
}

fn enumeration(resolved: &ResolvedType) -> Enum {
    let mut enumeration = Enum::new(&resolved.name);
    if let Some(description) = &resolved.description {
        enumeration = enumeration.description(description);
    }
    for value in &resolved.enum_values {
        let mut item = EnumItem::new(&value.name);
        if let Some(description) = &value.description {
            item = item.description(description);
        }
        enumeration = enumeration.item(item.deprecation(value.deprecation_reason.as_deref()));
    }
    enumeration
}

fn scalar(resolved: &ResolvedType) -> Scalar {
    let mut scalar = Scalar::new(&resolved.name);
    if let Some(description) = &resolved.description {
        scalar = scalar.description(description);
    }
    scalar
}

/// Resolves a field by reading the property of the same name from the
/// parent object.
fn property_field(field_name: &str, type_ref: TypeRef) -> Field {
    let property = field_name.to_string();

    Field::new(field_name, type_ref, move |ctx| {
        let property = property.clone();
        FieldFuture::new(async move {
            if let Some(parent) = ctx.parent_value.as_value()
                && let Value::Object(obj) = parent
                && let Some(value) = obj.get(&Name::new(&property))
            {
                return Ok(Some(value.clone()));
            }
            Ok(None)
        })
    })
}

fn enum_literals(value: Value, is_enum: bool) -> Value {
    match value {
        Value::String(literal) if is_enum => Value::Enum(Name::new(literal)),
        Value::List(items) => Value::List(
            items
                .into_iter()
                .map(|item| enum_literals(item, is_enum))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use typegraph_metadata::{
        ConstructId, FieldFragment, MetadataRegistry, Scalar as BuiltinScalar, TypeFragment,
        TypeReference,
    };

    use super::*;
    use crate::config::BuildSchemaOptions;
    use crate::schema::SchemaBuilder;

    fn recipe_schema() -> GraphSchema {
        let registry = MetadataRegistry::new();
        let recipe = ConstructId::named("Recipe");
        registry.register(TypeFragment::object(recipe.clone(), "Recipe"));
        registry.register(FieldFragment::property(recipe.clone(), "title", BuiltinScalar::String));
        registry.register(
            FieldFragment::query(
                ConstructId::named("RecipeResolver"),
                "recipe",
                TypeReference::new(recipe),
            )
            .handler(|_ctx| {
                FieldFuture::new(async {
                    let recipe = Value::from_json(serde_json::json!({ "title": "Pancakes" }))?;
                    Ok(Some(recipe))
                })
            }),
        );

        let snapshot = registry.snapshot();
        SchemaBuilder::new(&snapshot, &BuildSchemaOptions::default())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_executes_bound_and_property_fields() {
        let schema = recipe_schema().to_dynamic(&RuntimeConfig::default()).unwrap();

        let response = schema.execute("{ recipe { title } }").await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            serde_json::json!({ "recipe": { "title": "Pancakes" } })
        );
    }

    #[tokio::test]
    async fn test_introspection_can_be_disabled() {
        let config = RuntimeConfig {
            introspection: false,
            ..RuntimeConfig::default()
        };
        let schema = recipe_schema().to_dynamic(&config).unwrap();

        let response = schema.execute("{ __schema { queryType { name } } }").await;

        let introspected = response.errors.is_empty()
            && response.data.into_json().unwrap()["__schema"].is_object();
        assert!(!introspected);
    }

    #[test]
    fn test_subscription_without_stream_handler() {
        let registry = MetadataRegistry::new();
        let resolver = ConstructId::named("EventResolver");
        registry.register(FieldFragment::query(resolver.clone(), "ping", BuiltinScalar::String));
        registry.register(FieldFragment::subscription(resolver, "events", BuiltinScalar::String));
        let snapshot = registry.snapshot();
        let schema = SchemaBuilder::new(&snapshot, &BuildSchemaOptions::default())
            .build()
            .unwrap();

        let err = schema.to_dynamic(&RuntimeConfig::default()).unwrap_err();

        assert_eq!(err.error_code(), "RUNTIME_REJECTED");
    }

    #[test]
    fn test_enum_defaults_become_enum_values() {
        let value = enum_literals(Value::from_json(serde_json::json!(["RED"])).unwrap(), true);
        assert_eq!(value, Value::List(vec![Value::Enum(Name::new("RED"))]));
    }
}
