//! The route table.
//!
//! Every route is a chain of optional per-route stages in front of a
//! wrapped controller, always in this order:
//!
//! ```text
//! id guard → validator → auth gate → controller
//! ```

use std::sync::Arc;

use http::Method;
use pathway_middleware::{catch_fault, Action, AuthGate, FieldRule, IdGuard, RouteChain, ValidationMiddleware};
use pathway_router::RouteConflict;
use pathway_server::RouteTable;

use crate::controllers::{auth, favorites, paths, subscriptions, topics};
use crate::state::AppState;

/// Builder for one route's chain.
struct Route {
    state: Arc<AppState>,
    action: Action<AppState>,
    id_guard: bool,
    rules: Vec<FieldRule>,
    authenticated: bool,
}

impl Route {
    fn new(state: &Arc<AppState>, action: Action<AppState>) -> Self {
        Self {
            state: Arc::clone(state),
            action,
            id_guard: false,
            rules: Vec::new(),
            authenticated: false,
        }
    }

    fn id(mut self) -> Self {
        self.id_guard = true;
        self
    }

    fn validate(mut self, rules: Vec<FieldRule>) -> Self {
        self.rules = rules;
        self
    }

    fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    fn chain(self) -> RouteChain {
        let mut chain = RouteChain::new(Arc::new(catch_fault(self.state, self.action)));
        if self.id_guard {
            chain = chain.stage(IdGuard::new(["id"]));
        }
        if !self.rules.is_empty() {
            chain = chain.stage(ValidationMiddleware::new(self.rules));
        }
        if self.authenticated {
            chain = chain.stage(AuthGate::new());
        }
        chain
    }
}

fn signup_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::body("email")
            .is_email("Must be a valid email address")
            .normalize_email(),
        FieldRule::body("username")
            .not_empty("Username is required")
            .trim()
            .escape(),
        FieldRule::body("password").length(6, None, "Password must be at least 6 characters long"),
        FieldRule::body("name").optional().trim().escape(),
    ]
}

fn login_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::body("username")
            .not_empty("Username is required")
            .trim()
            .escape(),
        FieldRule::body("password").not_empty("Password is required"),
    ]
}

fn edit_user_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::body("email")
            .optional()
            .is_email("Must be a valid email address")
            .normalize_email(),
        FieldRule::body("username")
            .optional()
            .not_empty("Username cannot be empty")
            .trim()
            .escape(),
        FieldRule::body("name").optional().trim().escape(),
    ]
}

fn path_create_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::body("title").not_empty("Title is required").trim(),
        FieldRule::body("shortDesc")
            .not_empty("Short description is required")
            .trim(),
    ]
}

fn path_update_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::body("title").optional().not_empty("Title cannot be empty").trim(),
        FieldRule::body("shortDesc")
            .optional()
            .not_empty("Short description cannot be empty")
            .trim(),
    ]
}

fn topic_create_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::body("title").not_empty("Title is required").trim(),
        FieldRule::body("objective").not_empty("Objective is required").trim(),
        FieldRule::body("path").optional().is_resource_id("Invalid Path ID"),
    ]
}

fn topic_update_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::body("title").optional().not_empty("Title cannot be empty").trim(),
        FieldRule::body("objective")
            .optional()
            .not_empty("Objective cannot be empty")
            .trim(),
    ]
}

fn membership_rules() -> Vec<FieldRule> {
    vec![FieldRule::body("path").is_resource_id("Invalid Path ID")]
}

/// Registers every `/auth` and `/api` route.
///
/// # Errors
///
/// Returns [`RouteConflict`] if two routes share a method and path.
pub fn route_table(state: &Arc<AppState>) -> Result<RouteTable, RouteConflict> {
    let route = |action: Action<AppState>| Route::new(state, action);
    let mut table = RouteTable::new();

    // Accounts
    table.add(Method::POST, "/auth/signup", route(auth::signup).validate(signup_rules()).chain())?;
    table.add(Method::POST, "/auth/login", route(auth::login).validate(login_rules()).chain())?;
    table.add(Method::GET, "/auth/current-user", route(auth::current_user).chain())?;
    table.add(Method::GET, "/auth/logout", route(auth::logout).authenticated().chain())?;
    table.add(
        Method::PUT,
        "/auth/edit/:id",
        route(auth::edit).id().validate(edit_user_rules()).authenticated().chain(),
    )?;
    table.add(Method::GET, "/auth/profile", route(auth::profile).authenticated().chain())?;
    table.add(Method::GET, "/auth/user", route(auth::list_users).chain())?;
    table.add(Method::GET, "/auth/user/:id", route(auth::get_user).id().chain())?;
    table.add(Method::GET, "/auth/google", route(auth::google_init).chain())?;
    table.add(Method::GET, "/auth/google/callback", route(auth::google_callback).chain())?;

    // Learning paths
    table.add(
        Method::POST,
        "/api/path/create",
        route(paths::create).validate(path_create_rules()).authenticated().chain(),
    )?;
    table.add(
        Method::PUT,
        "/api/path/:id",
        route(paths::update).id().validate(path_update_rules()).authenticated().chain(),
    )?;
    table.add(Method::DELETE, "/api/path/:id", route(paths::delete).id().authenticated().chain())?;
    table.add(Method::GET, "/api/path", route(paths::list).chain())?;
    table.add(Method::GET, "/api/path/:id", route(paths::get).id().chain())?;

    // Topics
    table.add(
        Method::POST,
        "/api/topic/create",
        route(topics::create).validate(topic_create_rules()).authenticated().chain(),
    )?;
    table.add(
        Method::PUT,
        "/api/topic/:id",
        route(topics::update).id().validate(topic_update_rules()).authenticated().chain(),
    )?;
    table.add(
        Method::PUT,
        "/api/topic/:id/content",
        route(topics::update_content)
            .id()
            .validate(vec![FieldRule::body("content").not_empty("Content is required")])
            .authenticated()
            .chain(),
    )?;
    table.add(Method::DELETE, "/api/topic/:id", route(topics::delete).id().authenticated().chain())?;
    table.add(Method::GET, "/api/topic", route(topics::list).chain())?;
    table.add(Method::GET, "/api/topic/:id", route(topics::get).id().chain())?;

    // Subscriptions
    table.add(
        Method::POST,
        "/api/subs/create",
        route(subscriptions::create).validate(membership_rules()).authenticated().chain(),
    )?;
    table.add(
        Method::DELETE,
        "/api/subs/:id",
        route(subscriptions::delete).id().authenticated().chain(),
    )?;
    table.add(Method::GET, "/api/subs", route(subscriptions::list).chain())?;
    table.add(Method::GET, "/api/subs/:id", route(subscriptions::get).id().chain())?;

    // Favorites
    table.add(
        Method::POST,
        "/api/favs/create",
        route(favorites::create).validate(membership_rules()).authenticated().chain(),
    )?;
    table.add(Method::DELETE, "/api/favs/:id", route(favorites::delete).id().authenticated().chain())?;
    table.add(Method::GET, "/api/favs", route(favorites::list).chain())?;
    table.add(Method::GET, "/api/favs/:id", route(favorites::get).id().chain())?;

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathway_auth::PasswordHasher;
    use pathway_store::MemoryStore;

    fn table() -> RouteTable {
        let store = MemoryStore::open();
        let state = Arc::new(AppState::new(&store, PasswordHasher::new(4).unwrap()));
        route_table(&state).unwrap()
    }

    #[test]
    fn test_stage_order() {
        let table = table();
        let edit = table.match_route(&Method::PUT, "/auth/edit/65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        assert_eq!(edit.value.stage_names(), ["id_guard", "validation", "auth_gate"]);

        let signup = table.match_route(&Method::POST, "/auth/signup").unwrap();
        assert_eq!(signup.value.stage_names(), ["validation"]);
    }

    #[test]
    fn test_topic_content_route_is_separate() {
        let table = table();
        assert!(table.match_route(&Method::PUT, "/api/topic/65a1f0c2e4b0a1b2c3d4e5f6").is_some());
        assert!(table
            .match_route(&Method::PUT, "/api/topic/65a1f0c2e4b0a1b2c3d4e5f6/content")
            .is_some());
    }

    #[test]
    fn test_every_resource_router_is_registered() {
        let table = table();
        for prefix in ["/api/path", "/api/topic", "/api/subs", "/api/favs"] {
            assert!(table.match_route(&Method::GET, prefix).is_some(), "{prefix}");
            assert!(
                table.match_route(&Method::POST, &format!("{prefix}/create")).is_some(),
                "{prefix}/create"
            );
        }
    }
}
