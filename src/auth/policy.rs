//! Declarative route policy: which roles may call which route.

use crate::models::Role;
use axum::http::Method;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Authenticated, with a role from this allow-list.
    Roles(&'static [Role]),
}

const ANY_ROLE: Access = Access::Roles(&[Role::User, Role::Admin]);
const ADMIN: Access = Access::Roles(&[Role::Admin]);

#[derive(Clone, Debug)]
pub struct PolicyEntry {
    pub method: Method,
    /// Route pattern as registered with the router, relative to the API prefix.
    pub path: &'static str,
    pub access: Access,
}

#[derive(Clone, Debug)]
pub struct RoutePolicy {
    entries: Vec<PolicyEntry>,
}

impl RoutePolicy {
    pub fn new(entries: Vec<PolicyEntry>) -> Self {
        Self { entries }
    }

    /// The policy for every route the API mounts.
    pub fn standard() -> Self {
        use Access::Public;
        let rule = |method: Method, path: &'static str, access: Access| PolicyEntry { method, path, access };
        Self::new(vec![
            rule(Method::GET, "/hospitals", Public),
            rule(Method::POST, "/hospitals", ADMIN),
            rule(Method::GET, "/hospitals/:id", Public),
            rule(Method::PUT, "/hospitals/:id", ADMIN),
            rule(Method::DELETE, "/hospitals/:id", ADMIN),
            rule(Method::GET, "/hospitals/:id/appointments", ANY_ROLE),
            rule(Method::POST, "/hospitals/:id/appointments", ANY_ROLE),
            rule(Method::GET, "/appointments", ANY_ROLE),
            rule(Method::POST, "/appointments", ANY_ROLE),
            rule(Method::GET, "/appointments/:id", ANY_ROLE),
            rule(Method::PUT, "/appointments/:id", ANY_ROLE),
            rule(Method::DELETE, "/appointments/:id", ANY_ROLE),
            rule(Method::POST, "/auth/register", Public),
            rule(Method::POST, "/auth/login", Public),
            rule(Method::GET, "/auth/me", ANY_ROLE),
            rule(Method::GET, "/auth/logout", Public),
        ])
    }

    /// `path` is the matched route pattern; a leading `prefix` is ignored. HEAD is looked up as GET.
    pub fn lookup(&self, method: &Method, path: &str, prefix: &str) -> Option<Access> {
        let path = path.strip_prefix(prefix).unwrap_or(path);
        let method = if *method == Method::HEAD { &Method::GET } else { method };
        self.entries
            .iter()
            .find(|e| e.method == *method && e.path == path)
            .map(|e| e.access)
    }

    pub fn entries(&self) -> &[PolicyEntry] {
        &self.entries
    }
}

/// Second gate: the identity's role must be on the route's allow-list.
pub fn authorize(access: Access, role: Role) -> bool {
    match access {
        Access::Public => true,
        Access::Roles(allowed) => allowed.contains(&role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hospital_writes_are_admin_only() {
        let policy = RoutePolicy::standard();
        let access = policy.lookup(&Method::POST, "/api/v1/hospitals", "/api/v1").unwrap();
        assert!(authorize(access, Role::Admin));
        assert!(!authorize(access, Role::User));
        let access = policy.lookup(&Method::GET, "/hospitals/:id", "/api/v1").unwrap();
        assert_eq!(access, Access::Public);
    }

    #[test]
    fn head_follows_get_and_unknown_routes_have_no_policy() {
        let policy = RoutePolicy::standard();
        assert_eq!(policy.lookup(&Method::HEAD, "/hospitals", ""), Some(Access::Public));
        assert_eq!(policy.lookup(&Method::PATCH, "/hospitals/:id", ""), None);
        assert_eq!(policy.lookup(&Method::GET, "/nope", ""), None);
    }

    #[test]
    fn no_duplicate_entries() {
        let policy = RoutePolicy::standard();
        for (i, a) in policy.entries().iter().enumerate() {
            for b in &policy.entries()[i + 1..] {
                assert!(!(a.method == b.method && a.path == b.path), "{} {}", a.method, a.path);
            }
        }
    }
}
