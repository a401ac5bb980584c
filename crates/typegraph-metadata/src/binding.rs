//! Resolver bindings.
//!
//! A binding ties a computed field to the resolver construct and method that
//! serve it. The optional handler is the function the execution runtime will
//! call; this crate only stores it.

use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::{FieldFuture, ResolverContext, SubscriptionFieldFuture};

use crate::construct::ConstructId;

/// Handler computing a query, mutation or object field.
pub type FieldHandler = Arc<dyn for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync>;

/// Handler producing the event stream of a subscription field.
pub type SubscriptionHandler =
    Arc<dyn for<'a> Fn(ResolverContext<'a>) -> SubscriptionFieldFuture<'a> + Send + Sync>;

/// Runtime function behind a binding.
#[derive(Clone)]
pub enum Handler {
    Field(FieldHandler),
    Subscription(SubscriptionHandler),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(_) => f.write_str("Handler::Field(..)"),
            Self::Subscription(_) => f.write_str("Handler::Subscription(..)"),
        }
    }
}

/// Associates a resolver construct and method with the field it computes.
#[derive(Debug, Clone)]
pub struct ResolverBinding {
    /// The resolver construct servicing the field.
    pub resolver: ConstructId,
    /// Name of the servicing method.
    pub method: String,
    /// Function called by the runtime, if one was supplied.
    pub handler: Option<Handler>,
}

impl ResolverBinding {
    /// Creates a binding without a runtime handler.
    #[must_use]
    pub fn new(resolver: ConstructId, method: impl Into<String>) -> Self {
        Self {
            resolver,
            method: method.into(),
            handler: None,
        }
    }

    /// Attaches a field handler.
    #[must_use]
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static,
    {
        self.handler = Some(Handler::Field(Arc::new(handler)));
        self
    }

    /// Attaches a subscription stream handler.
    #[must_use]
    pub fn with_subscription_handler<F>(mut self, handler: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> SubscriptionFieldFuture<'a> + Send + Sync + 'static,
    {
        self.handler = Some(Handler::Subscription(Arc::new(handler)));
        self
    }

    /// The field handler, if the binding carries one.
    #[must_use]
    pub fn field_handler(&self) -> Option<&FieldHandler> {
        match &self.handler {
            Some(Handler::Field(handler)) => Some(handler),
            _ => None,
        }
    }

    /// The subscription handler, if the binding carries one.
    #[must_use]
    pub fn subscription_handler(&self) -> Option<&SubscriptionHandler> {
        match &self.handler {
            Some(Handler::Subscription(handler)) => Some(handler),
            _ => None,
        }
    }
}

/// Bindings compare by resolver and method; handlers have no identity.
impl PartialEq for ResolverBinding {
    fn eq(&self, other: &Self) -> bool {
        self.resolver == other.resolver && self.method == other.method
    }
}

impl Eq for ResolverBinding {}

#[cfg(test)]
mod tests {
    use async_graphql::Value;

    use super::*;

    #[test]
    fn test_binding_equality_ignores_handler() {
        let plain = ResolverBinding::new(ConstructId::named("RecipeResolver"), "recipes");
        let handled = ResolverBinding::new(ConstructId::named("RecipeResolver"), "recipes")
            .with_handler(|_ctx| FieldFuture::new(async { Ok(Some(Value::Null)) }));

        assert_eq!(plain, handled);
        assert!(plain.field_handler().is_none());
        assert!(handled.field_handler().is_some());
        assert!(handled.subscription_handler().is_none());
    }
}
