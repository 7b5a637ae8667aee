//! Account controllers under `/auth`.

use pathway_auth::{link_profile, AuthError, AuthOutcome, Credentials};
use pathway_core::{Fault, FaultResult, Principal};
use pathway_middleware::{BoxFuture, MiddlewareContext, Reply};
use pathway_store::User;
use serde_json::Value;
use tracing::{debug, info};

use super::{current_principal, path_id, pick, to_data};
use crate::state::AppState;

/// Fields a user may change on their own profile.
const EDITABLE: &[&str] = &[
    "email",
    "username",
    "name",
    "image",
    "suscribers",
    "paths",
    "suscriptions",
    "favorites",
];

fn session_for(user: &User) -> Principal {
    Principal::new(user.id, user.username.clone())
}

/// `POST /auth/signup`
pub fn signup<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let password = ctx.body_str("password").unwrap_or_default().to_string();
        let mut fields = pick(ctx.body(), &["username", "email", "name", "image"]);
        fields.insert("password".into(), Value::String(state.hasher.hash(&password).await?));

        let user = state.users.create(fields).await?;
        info!(user_id = %user.id, username = %user.username, "user signed up");
        Ok(Reply::created("User created successfully").with_data(to_data(&user.redacted())?))
    })
}

/// `POST /auth/login`
pub fn login<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let credentials = Credentials::new(
            ctx.body_str("username").unwrap_or_default(),
            ctx.body_str("password").unwrap_or_default(),
        );

        match state.identity.authenticate(credentials).await? {
            AuthOutcome::Ok(user) => {
                ctx.establish_session(session_for(&user));
                info!(user_id = %user.id, "login succeeded");
                Ok(Reply::ok("Login successful").with_data(to_data(&user.redacted())?))
            }
            AuthOutcome::Fail(failure) => {
                debug!(request_id = %ctx.request_id(), reason = failure.reason(), "login refused");
                Err(Fault::unauthorized_with("Authentication failed"))
            }
        }
    })
}

/// `GET /auth/current-user`: the session user, or `null`.
pub fn current_user<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let user = match ctx.principal() {
            Some(principal) => state.users.find_by_id(&principal.user_id).await?.map(User::redacted),
            None => None,
        };
        Ok(Reply::ok("Current user").with_data(to_data(&user)?))
    })
}

/// `GET /auth/logout`
pub fn logout<'a>(_state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        if let Some(principal) = ctx.principal() {
            info!(user_id = %principal.user_id, "logout");
        }
        ctx.end_session();
        Ok(Reply::ok("Logout successful"))
    })
}

/// `PUT /auth/edit/:id`
pub fn edit<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let id = path_id(ctx)?;
        if current_principal(ctx)?.user_id != id {
            return Err(Fault::unauthorized_with("You can only edit your own profile"));
        }

        let user = state
            .users
            .update(&id, pick(ctx.body(), EDITABLE))
            .await?
            .ok_or_else(|| Fault::not_found("user"))?;
        Ok(Reply::accepted("User updated successfully").with_data(to_data(&user.redacted())?))
    })
}

/// `GET /auth/profile`
pub fn profile<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let principal = current_principal(ctx)?;
        let user = state
            .users
            .find_by_id(&principal.user_id)
            .await?
            .ok_or_else(|| Fault::not_found("user"))?;
        Ok(Reply::ok("Profile retrieved").with_data(to_data(&user.redacted())?))
    })
}

/// `GET /auth/user`
pub fn list_users<'a>(state: &'a AppState, _ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let users: Vec<User> = state.users.list().await?.into_iter().map(User::redacted).collect();
        Ok(Reply::ok("All users retrieved").with_data(to_data(&users)?))
    })
}

/// `GET /auth/user/:id`
pub fn get_user<'a>(state: &'a AppState, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let user = state
            .users
            .find_by_id(&path_id(ctx)?)
            .await?
            .ok_or_else(|| Fault::not_found("user"))?;
        Ok(Reply::ok("User retrieved").with_data(to_data(&user.redacted())?))
    })
}

/// `GET /auth/google`: redirect to the consent page.
pub fn google_init<'a>(state: &'a AppState, _ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let provider = state.google.as_ref().ok_or(AuthError::NotConfigured("google"))?;
        let pending = state.oauth_states.issue();
        Ok(Reply::redirect(provider.authorize_url(&pending)))
    })
}

/// `GET /auth/google/callback`
///
/// Consumes the one-time `state`, exchanges the code, links or creates the
/// user and establishes a session before redirecting to `/`.
pub fn google_callback<'a>(
    state: &'a AppState,
    ctx: &'a mut MiddlewareContext,
) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let provider = state.google.as_ref().ok_or(AuthError::NotConfigured("google"))?;

        let query = ctx.query();
        if let Some(error) = query.get("error") {
            return Err(Fault::auth_token(format!("provider returned `{error}`")));
        }
        let code = query
            .get("code")
            .cloned()
            .ok_or_else(|| Fault::auth_token("missing authorization code"))?;
        let returned = query.get("state").cloned().unwrap_or_default();

        state.oauth_states.consume(&returned)?;
        let profile = provider.exchange(&code).await?;
        let user = link_profile(state.users.as_ref(), &profile).await?;

        ctx.establish_session(session_for(&user));
        info!(user_id = %user.id, provider = provider.name(), "oauth login succeeded");
        Ok(Reply::redirect("/"))
    })
}
