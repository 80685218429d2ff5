//! Route lookup against an operator's endpoint table.
//!
//! # Responsibilities
//! - Resolve an inbound URL and method to an endpoint, or a 404/405 miss
//! - Select the downstream connection serving a fan-out target
//!
//! # Design Decisions
//! - Linear scan in table order; the first endpoint matching URL and method wins
//! - 405 only when some endpoint matched the URL but none supports the method
//! - Explicit miss variants rather than a silent default

use std::sync::Arc;

use crate::model::{Endpoint, HttpMethod, HttpStatus};
use crate::net::{Connection, Port};
use crate::routing::matcher::{Matcher, MethodMatcher, RouteMatcher, UrlMatcher};

/// Outcome of a route lookup.
#[derive(Debug, Clone)]
pub enum RouteMatch {
    Found(Arc<Endpoint>),
    NotFound,
    MethodNotAllowed,
}

impl RouteMatch {
    /// Status to report for a miss; `None` when a route was found.
    pub fn miss_status(&self) -> Option<HttpStatus> {
        match self {
            RouteMatch::Found(_) => None,
            RouteMatch::NotFound => Some(HttpStatus::NotFound),
            RouteMatch::MethodNotAllowed => Some(HttpStatus::MethodNotAllowed),
        }
    }
}

/// Look up `url` + `method` in `endpoints`.
pub fn resolve(endpoints: &[Arc<Endpoint>], url: &str, method: HttpMethod) -> RouteMatch {
    let url_matcher = UrlMatcher::new(url);
    let method_matcher = MethodMatcher::new(method);
    let mut url_seen = false;

    for endpoint in endpoints {
        if !url_matcher.matches(endpoint) {
            continue;
        }
        url_seen = true;
        if method_matcher.matches(endpoint) {
            return RouteMatch::Found(endpoint.clone());
        }
    }

    if url_seen {
        RouteMatch::MethodNotAllowed
    } else {
        RouteMatch::NotFound
    }
}

/// First connection on `port` whose peer operator advertises `target`.
pub fn select_connection(port: &Port, target: &Endpoint) -> Option<Connection> {
    let matcher = RouteMatcher::new(target);
    port.connections().into_iter().find(|connection| {
        connection
            .other_port(port)
            .ok()
            .and_then(|peer| peer.parent())
            .map(|operator| operator.available_endpoints().iter().any(|e| matcher.matches(e)))
            .unwrap_or(false)
    })
}
