//! Subscription controllers under `/api/subs`.

use pathway_core::{Fault, FaultResult};
use pathway_middleware::{BoxFuture, MiddlewareContext, Reply};
use pathway_store::Subscription;
use tracing::info;

use super::{body_id, current_principal, path_id, to_data};
use crate::state::AppState;

/// `POST /api/subs/create`: subscribes the session user to `path`.
pub fn create<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let user = current_principal(ctx)?.user_id;
        let path = body_id(ctx, "path")?;
        if state.paths.find_by_id(&path).await?.is_none() {
            return Err(Fault::not_found("path"));
        }

        let subscription = state.subscriptions.insert(Subscription::new(user, path)).await?;
        info!(subscription_id = %subscription.id, %user, %path, "subscribed");
        Ok(Reply::created("Subscription created successfully").with_data(to_data(&subscription)?))
    })
}

/// `DELETE /api/subs/:id`. Only the subscriber may remove it.
pub fn delete<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let id = path_id(ctx)?;
        let owner = state
            .subscriptions
            .find_by_id(&id)
            .await?
            .ok_or_else(|| Fault::not_found("subscription"))?
            .user;
        if owner != current_principal(ctx)?.user_id {
            return Err(Fault::unauthorized_with("You can only remove your own subscriptions"));
        }

        let subscription = state
            .subscriptions
            .delete(&id)
            .await?
            .ok_or_else(|| Fault::not_found("subscription"))?;
        Ok(Reply::ok("Subscription deleted successfully").with_data(to_data(&subscription)?))
    })
}

/// `GET /api/subs`
pub fn list<'a>(state: &'a AppState, _ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let subscriptions = state.subscriptions.list().await?;
        Ok(Reply::ok("All subscriptions retrieved").with_data(to_data(&subscriptions)?))
    })
}

/// `GET /api/subs/:id`
pub fn get<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let subscription = state
            .subscriptions
            .find_by_id(&path_id(ctx)?)
            .await?
            .ok_or_else(|| Fault::not_found("subscription"))?;
        Ok(Reply::ok("Subscription retrieved").with_data(to_data(&subscription)?))
    })
}
