//! Route groups.
//!
//! Each group only knows its own handlers and the shared [`AppState`]; the
//! assembler in [`crate::app`] decides where a group is mounted.

pub mod health;
pub mod loans;
pub mod metrics;
pub mod stats;

use axum::routing::MethodRouter;

use crate::state::AppState;

/// A named set of handlers, mountable under a path prefix.
pub struct RouteGroup {
    name: &'static str,
    routes: Vec<(&'static str, MethodRouter<AppState>)>,
}

impl RouteGroup {
    pub fn new(name: &'static str) -> Self {
        Self { name, routes: Vec::new() }
    }

    pub fn route(mut self, path: &'static str, method_router: MethodRouter<AppState>) -> Self {
        self.routes.push((path, method_router));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.iter().map(|(path, _)| *path)
    }

    pub(crate) fn into_routes(self) -> Vec<(&'static str, MethodRouter<AppState>)> {
        self.routes
    }
}
