//! Route controllers.
//!
//! Every controller is a plain function over [`AppState`](crate::AppState)
//! returning `FaultResult<Reply>`; [`catch_fault`](pathway_middleware::catch_fault)
//! turns it into an endpoint. Controllers never write responses themselves.

pub mod auth;
pub mod favorites;
pub mod paths;
pub mod subscriptions;
pub mod topics;

use pathway_core::{Fault, FaultResult, Principal, ResourceId};
use pathway_middleware::MiddlewareContext;
use serde::Serialize;
use serde_json::{Map, Value};

/// Serializes a document for a reply's `data`.
pub(crate) fn to_data<T: Serialize>(value: &T) -> FaultResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// The `:id` route parameter. The id guard has already checked its shape.
pub(crate) fn path_id(ctx: &MiddlewareContext) -> FaultResult<ResourceId> {
    ResourceId::parse_field("id", ctx.param("id").unwrap_or_default())
}

/// The session principal. Routes behind the auth gate always have one.
pub(crate) fn current_principal(ctx: &MiddlewareContext) -> FaultResult<Principal> {
    ctx.principal().cloned().ok_or_else(Fault::unauthorized)
}

/// Copies only the listed fields out of a request body.
pub(crate) fn pick(body: &Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|field| body.get(*field).map(|value| ((*field).to_string(), value.clone())))
        .collect()
}

/// A body field that must name a document, e.g. `path` on a subscription.
pub(crate) fn body_id(ctx: &MiddlewareContext, field: &str) -> FaultResult<ResourceId> {
    match ctx.body().get(field) {
        Some(Value::String(value)) => ResourceId::parse_field(field, value),
        _ => Err(Fault::malformed_id(field, "Invalid ID format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pick_keeps_listed_fields_only() {
        let body = json!({ "title": "Rust", "author": "someone", "level": "beginner" });
        let picked = pick(body.as_object().unwrap(), &["title", "level", "category"]);
        assert_eq!(Value::Object(picked), json!({ "title": "Rust", "level": "beginner" }));
    }

    #[test]
    fn test_missing_principal_is_unauthorized() {
        let ctx = MiddlewareContext::new();
        let fault = current_principal(&ctx).unwrap_err();
        assert_eq!(fault.classify().message, "Unauthorized");
    }

    #[test]
    fn test_body_id() {
        let mut ctx = MiddlewareContext::new();
        let id = ResourceId::new();
        ctx.set_body(json!({ "path": id.to_string(), "user": 7 }).as_object().cloned().unwrap());

        assert_eq!(body_id(&ctx, "path").unwrap(), id);
        assert_eq!(body_id(&ctx, "user").unwrap_err().classify().message, "Invalid Data");
    }
}
