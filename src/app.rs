//! Application assembly.
//!
//! Groups are mounted once, in order, before the router is handed to the
//! server. Every conflict is reported here as an [`AssemblyError`]; nothing is
//! left for axum to discover (and panic on) at request time.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{AssemblyError, StartupError};
use crate::observability::metrics::Metrics;
use crate::routes::{self, RouteGroup};
use crate::state::AppState;

/// Where a group ended up, and the full paths it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedGroup {
    pub name: &'static str,
    pub prefix: String,
    pub routes: Vec<String>,
}

/// A fully wired application, ready to be served.
pub struct App {
    state: AppState,
    router: Router,
    mounted: Vec<MountedGroup>,
}

impl App {
    pub fn builder(state: AppState) -> AppBuilder {
        AppBuilder::new(state)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn mounted_groups(&self) -> &[MountedGroup] {
        &self.mounted
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

pub struct AppBuilder {
    state: AppState,
    router: Router<AppState>,
    mounted: Vec<MountedGroup>,
    owners: Vec<(String, &'static str)>,
}

impl AppBuilder {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            router: Router::new(),
            mounted: Vec::new(),
            owners: Vec::new(),
        }
    }

    /// Mounts `group` under `prefix` ("" for the root namespace).
    pub fn mount(mut self, group: RouteGroup, prefix: &str) -> Result<Self, AssemblyError> {
        let name = group.name();
        validate_prefix(name, prefix)?;

        if self.mounted.iter().any(|m| m.name == name) {
            return Err(AssemblyError::DuplicateGroup(name.to_string()));
        }
        if group.paths().next().is_none() {
            return Err(AssemblyError::EmptyGroup(name.to_string()));
        }

        let mut full_paths: Vec<String> = Vec::new();
        for path in group.paths() {
            validate_path(name, path)?;
            let full = join_path(prefix, path);
            let clash = self
                .owners
                .iter()
                .find(|(owned, _)| routes_overlap(owned, &full))
                .map(|(_, owner)| *owner)
                .or_else(|| full_paths.iter().any(|p| routes_overlap(p, &full)).then_some(name));
            if let Some(existing) = clash {
                return Err(AssemblyError::RouteConflict {
                    path: full,
                    existing: existing.to_string(),
                    incoming: name.to_string(),
                });
            }
            full_paths.push(full);
        }

        let tag = GroupTag {
            group: name,
            metrics: Arc::clone(&self.state.metrics),
        };
        let mut group_router = Router::new();
        for (full, (_, method_router)) in full_paths.iter().zip(group.into_routes()) {
            group_router = group_router.route(full, method_router);
        }
        let group_router = group_router.route_layer(middleware::from_fn_with_state(tag, track_requests));

        self.router = self.router.merge(group_router);
        self.owners.extend(full_paths.iter().map(|p| (p.clone(), name)));
        tracing::debug!(group = name, prefix, routes = ?full_paths, "route group mounted");
        self.mounted.push(MountedGroup {
            name,
            prefix: prefix.to_string(),
            routes: full_paths,
        });
        Ok(self)
    }

    pub fn build(self) -> App {
        let router = self
            .router
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone());
        App {
            state: self.state,
            router,
            mounted: self.mounted,
        }
    }
}

/// Builds the application from the process environment.
pub fn create_app() -> Result<App, StartupError> {
    let config = Config::from_env()?;
    let metrics = Arc::new(Metrics::new(&config.metrics_namespace)?);
    Ok(assemble(config, metrics)?)
}

/// Mounts metrics and health at the root and loans and stats under the API prefix.
pub fn assemble(config: Config, metrics: Arc<Metrics>) -> Result<App, AssemblyError> {
    let api_prefix = config.api_prefix.clone();
    let state = AppState::new(config, metrics);

    let app = App::builder(state)
        .mount(routes::metrics::group(), "")?
        .mount(routes::health::group(), "")?
        .mount(routes::loans::group(), &api_prefix)?
        .mount(routes::stats::group(), &api_prefix)?
        .build();

    tracing::info!(
        groups = app.mounted_groups().len(),
        api_prefix = %api_prefix,
        "application assembled"
    );
    Ok(app)
}

#[derive(Clone)]
struct GroupTag {
    group: &'static str,
    metrics: Arc<Metrics>,
}

async fn track_requests(State(tag): State<GroupTag>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    tag.metrics
        .http_requests_total
        .with_label_values(&[tag.group, method.as_str(), status.as_str()])
        .inc();
    tag.metrics
        .http_request_duration_seconds
        .with_label_values(&[tag.group])
        .observe(start.elapsed().as_secs_f64());

    response
}

fn validate_prefix(group: &str, prefix: &str) -> Result<(), AssemblyError> {
    if prefix.is_empty() {
        return Ok(());
    }
    let reason = if !prefix.starts_with('/') {
        "must start with '/'"
    } else if prefix.ends_with('/') {
        "must not end with '/'"
    } else if prefix.chars().any(char::is_whitespace) {
        "must not contain whitespace"
    } else {
        return Ok(());
    };
    Err(AssemblyError::InvalidPrefix {
        group: group.to_string(),
        prefix: prefix.to_string(),
        reason,
    })
}

fn join_path(prefix: &str, path: &str) -> String {
    if path == "/" && !prefix.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}{path}")
    }
}

fn validate_path(group: &str, path: &str) -> Result<(), AssemblyError> {
    let segments: Vec<&str> = path.split('/').skip(1).collect();
    let reason = if !path.starts_with('/') {
        "must start with '/'"
    } else if segments.iter().any(|s| (s.starts_with(':') || s.starts_with('*')) && s.len() == 1) {
        "parameters must be named"
    } else if segments
        .iter()
        .rev()
        .skip(1)
        .any(|s| s.starts_with('*'))
    {
        "a catch-all must be the last segment"
    } else {
        return Ok(());
    };
    Err(AssemblyError::InvalidPath {
        group: group.to_string(),
        path: path.to_string(),
        reason,
    })
}

/// Whether the router would refuse to hold both paths at once.
///
/// A literal may sit beside a `:param` at the same position, but never beside a
/// catch-all. Two params at one position must share a name, and a catch-all
/// overlaps any other wildcard there.
fn routes_overlap(a: &str, b: &str) -> bool {
    let mut left = a.split('/');
    let mut right = b.split('/');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (None, Some(_)) | (Some(_), None) => return false,
            (Some(x), Some(y)) => {
                let x_wild = x.starts_with(':') || x.starts_with('*');
                let y_wild = y.starts_with(':') || y.starts_with('*');
                match (x_wild, y_wild) {
                    (false, false) if x == y => continue,
                    (false, false) => return false,
                    (true, true) => {
                        if x.starts_with('*') || y.starts_with('*') || x != y {
                            return true;
                        }
                    }
                    _ => return x.starts_with('*') || y.starts_with('*'),
                }
            }
        }
    }
}
