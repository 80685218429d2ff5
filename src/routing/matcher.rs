//! Endpoint matching logic.
//!
//! # Responsibilities
//! - Match an endpoint's URL (exact, case-sensitive)
//! - Match a supported method
//! - Match a whole route (URL plus method-set equality)
//!
//! # Design Decisions
//! - No prefix or pattern matching: simulated URLs are compared verbatim
//! - Method sets compare as sets, order does not matter

use crate::model::{Endpoint, HttpMethod};

/// Trait for matching endpoints against a condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the endpoint matches this condition.
    fn matches(&self, endpoint: &Endpoint) -> bool;
}

/// Matches the endpoint URL.
#[derive(Debug, Clone)]
pub struct UrlMatcher<'a> {
    url: &'a str,
}

impl<'a> UrlMatcher<'a> {
    pub fn new(url: &'a str) -> Self {
        Self { url }
    }
}

impl Matcher for UrlMatcher<'_> {
    fn matches(&self, endpoint: &Endpoint) -> bool {
        endpoint.url == self.url
    }
}

/// Matches endpoints supporting a method.
#[derive(Debug, Clone, Copy)]
pub struct MethodMatcher {
    method: HttpMethod,
}

impl MethodMatcher {
    pub fn new(method: HttpMethod) -> Self {
        Self { method }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, endpoint: &Endpoint) -> bool {
        endpoint.supports(self.method)
    }
}

/// Matches endpoints that are the same route as `target`.
#[derive(Debug, Clone)]
pub struct RouteMatcher<'a> {
    target: &'a Endpoint,
}

impl<'a> RouteMatcher<'a> {
    pub fn new(target: &'a Endpoint) -> Self {
        Self { target }
    }
}

impl Matcher for RouteMatcher<'_> {
    fn matches(&self, endpoint: &Endpoint) -> bool {
        self.target.same_route(endpoint)
    }
}
