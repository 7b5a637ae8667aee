//! Learning path controllers under `/api/path`.

use pathway_core::{Fault, FaultResult};
use pathway_middleware::{BoxFuture, MiddlewareContext, Reply};
use serde_json::Value;
use tracing::info;

use super::{current_principal, path_id, pick, to_data};
use crate::state::AppState;

const WRITABLE: &[&str] = &["title", "shortDesc", "level", "category"];

/// `POST /api/path/create`. The session user becomes the author.
pub fn create<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let author = current_principal(ctx)?.user_id;
        let mut fields = pick(ctx.body(), WRITABLE);
        fields.insert("author".into(), Value::String(author.to_string()));

        let path = state.paths.create(fields).await?;
        info!(path_id = %path.id, %author, "path created");
        Ok(Reply::created("Path created successfully").with_data(to_data(&path)?))
    })
}

/// `PUT /api/path/:id`
pub fn update<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let mut fields: Vec<&str> = WRITABLE.to_vec();
        fields.push("topics");

        let path = state
            .paths
            .update(&path_id(ctx)?, pick(ctx.body(), &fields))
            .await?
            .ok_or_else(|| Fault::not_found("path"))?;
        Ok(Reply::accepted("Path updated successfully").with_data(to_data(&path)?))
    })
}

/// `DELETE /api/path/:id`
pub fn delete<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let path = state
            .paths
            .delete(&path_id(ctx)?)
            .await?
            .ok_or_else(|| Fault::not_found("path"))?;
        info!(path_id = %path.id, "path deleted");
        Ok(Reply::ok("Path deleted successfully").with_data(to_data(&path)?))
    })
}

/// `GET /api/path`
pub fn list<'a>(state: &'a AppState, _ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move { Ok(Reply::ok("All paths retrieved").with_data(to_data(&state.paths.list().await?)?)) })
}

/// `GET /api/path/:id`
pub fn get<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let path = state
            .paths
            .find_by_id(&path_id(ctx)?)
            .await?
            .ok_or_else(|| Fault::not_found("path"))?;
        Ok(Reply::ok("Path retrieved").with_data(to_data(&path)?))
    })
}
