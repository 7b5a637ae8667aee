//! Topic controllers under `/api/topic`.
//!
//! A topic created with a `path` is appended to that path's `topics`, and
//! removed from it again when the topic is deleted.

use pathway_core::{Fault, FaultResult};
use pathway_middleware::{BoxFuture, MiddlewareContext, Reply};
use serde_json::Value;
use tracing::{debug, info};

use super::{body_id, path_id, pick, to_data};
use crate::state::AppState;

const WRITABLE: &[&str] = &["title", "objective", "duration", "content"];

/// `POST /api/topic/create`
pub fn create<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let mut fields = pick(ctx.body(), WRITABLE);
        let parent = match ctx.body().get("path") {
            None | Some(Value::Null) => None,
            Some(_) => Some(body_id(ctx, "path")?),
        };
        if let Some(parent) = &parent {
            if state.paths.find_by_id(parent).await?.is_none() {
                return Err(Fault::not_found("path"));
            }
            fields.insert("path".into(), Value::String(parent.to_string()));
        }

        let topic = state.topics.create(fields).await?;
        if let Some(parent) = &parent {
            if state.paths.push(parent, "topics", to_data(&topic.id)?).await?.is_none() {
                debug!(path_id = %parent, "topic parent no longer exists");
            }
        }
        info!(topic_id = %topic.id, "topic created");
        Ok(Reply::created("Topic created successfully").with_data(to_data(&topic)?))
    })
}

/// `PUT /api/topic/:id`. The parent path cannot be changed here.
pub fn update<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let topic = state
            .topics
            .update(&path_id(ctx)?, pick(ctx.body(), WRITABLE))
            .await?
            .ok_or_else(|| Fault::not_found("topic"))?;
        Ok(Reply::accepted("Topic updated successfully").with_data(to_data(&topic)?))
    })
}

/// `PUT /api/topic/:id/content`
pub fn update_content<'a>(
    state: &'a AppState,
    ctx: &'a mut MiddlewareContext,
) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let topic = state
            .topics
            .update(&path_id(ctx)?, pick(ctx.body(), &["content"]))
            .await?
            .ok_or_else(|| Fault::not_found("topic"))?;
        Ok(Reply::accepted("Topic content updated successfully").with_data(to_data(&topic)?))
    })
}

/// `DELETE /api/topic/:id`
pub fn delete<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let topic = state
            .topics
            .delete(&path_id(ctx)?)
            .await?
            .ok_or_else(|| Fault::not_found("topic"))?;
        if let Some(parent) = &topic.path {
            if state.paths.pull(parent, "topics", &to_data(&topic.id)?).await?.is_none() {
                debug!(path_id = %parent, "topic parent no longer exists");
            }
        }
        info!(topic_id = %topic.id, "topic deleted");
        Ok(Reply::ok("Topic deleted successfully").with_data(to_data(&topic)?))
    })
}

/// `GET /api/topic`
pub fn list<'a>(state: &'a AppState, _ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move { Ok(Reply::ok("All topics retrieved").with_data(to_data(&state.topics.list().await?)?)) })
}

/// `GET /api/topic/:id`
pub fn get<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let topic = state
            .topics
            .find_by_id(&path_id(ctx)?)
            .await?
            .ok_or_else(|| Fault::not_found("topic"))?;
        Ok(Reply::ok("Topic retrieved").with_data(to_data(&topic)?))
    })
}
