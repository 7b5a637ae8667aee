//! Favorite controllers under `/api/favs`.

use pathway_core::{Fault, FaultResult};
use pathway_middleware::{BoxFuture, MiddlewareContext, Reply};
use pathway_store::Favorite;
use tracing::info;

use super::{body_id, current_principal, path_id, to_data};
use crate::state::AppState;

/// `POST /api/favs/create`
pub fn create<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let user = current_principal(ctx)?.user_id;
        let path = body_id(ctx, "path")?;
        if state.paths.find_by_id(&path).await?.is_none() {
            return Err(Fault::not_found("path"));
        }

        let favorite = state.favorites.insert(Favorite::new(user, path)).await?;
        info!(favorite_id = %favorite.id, %user, %path, "favorite added");
        Ok(Reply::created("Favorite created successfully").with_data(to_data(&favorite)?))
    })
}

/// `DELETE /api/favs/:id`
pub fn delete<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let id = path_id(ctx)?;
        let owner = state
            .favorites
            .find_by_id(&id)
            .await?
            .ok_or_else(|| Fault::not_found("favorite"))?
            .user;
        if owner != current_principal(ctx)?.user_id {
            return Err(Fault::unauthorized_with("You can only remove your own favorites"));
        }

        let favorite = state
            .favorites
            .delete(&id)
            .await?
            .ok_or_else(|| Fault::not_found("favorite"))?;
        Ok(Reply::ok("Favorite deleted successfully").with_data(to_data(&favorite)?))
    })
}

/// `GET /api/favs`
pub fn list<'a>(state: &'a AppState, _ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move { Ok(Reply::ok("All favorites retrieved").with_data(to_data(&state.favorites.list().await?)?)) })
}

/// `GET /api/favs/:id`
pub fn get<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let favorite = state
            .favorites
            .find_by_id(&path_id(ctx)?)
            .await?
            .ok_or_else(|| Fault::not_found("favorite"))?;
        Ok(Reply::ok("Favorite retrieved").with_data(to_data(&favorite)?))
    })
}
