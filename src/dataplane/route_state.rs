//! Applied route bindings
//!
//! The tracker is the only place that decides whether an advertised
//! prefix needs the route collaborator to run.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::net::Ipv6Addr;

use crate::protocol::ipv6::mask_prefix;

/// A prefix reachable through a router on an interface
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    /// Network address, host bits cleared
    pub prefix: Ipv6Addr,
    pub prefix_length: u8,
    pub router: Ipv6Addr,
    pub interface: String,
}

impl Binding {
    pub fn new(
        prefix: Ipv6Addr,
        prefix_length: u8,
        router: Ipv6Addr,
        interface: impl Into<String>,
    ) -> Self {
        let prefix_length = prefix_length.min(128);
        Self {
            prefix: mask_prefix(&prefix, prefix_length),
            prefix_length,
            router,
            interface: interface.into(),
        }
    }

    pub fn key(&self) -> RouteKey {
        RouteKey {
            prefix: self.prefix,
            prefix_length: self.prefix_length,
            interface: self.interface.clone(),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} via {} dev {}",
            self.prefix, self.prefix_length, self.router, self.interface
        )
    }
}

/// Identity of an applied route: the router is the value, not part of the key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub prefix: Ipv6Addr,
    pub prefix_length: u8,
    pub interface: String,
}

/// An applied binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub prefix: Ipv6Addr,
    pub prefix_length: u8,
    pub router: Ipv6Addr,
    pub interface: String,
    pub first_applied: DateTime<Utc>,
    pub last_applied: DateTime<Utc>,
}

/// Outcome of [`RouteStateTracker::decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No route for this key yet
    New,
    /// Same router as the recorded route
    Unchanged,
    /// Known prefix, different router
    RouterChanged { previous: Ipv6Addr },
}

impl Decision {
    /// Whether the collaborator must run for this decision
    pub fn needs_apply(&self) -> bool {
        !matches!(self, Decision::Unchanged)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::New => write!(f, "new"),
            Decision::Unchanged => write!(f, "unchanged"),
            Decision::RouterChanged { previous } => write!(f, "router changed from {}", previous),
        }
    }
}

/// Owns the map of applied routes
#[derive(Debug, Default)]
pub struct RouteStateTracker {
    routes: HashMap<RouteKey, Route>,
}

impl RouteStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `binding` and record it when it is new or re-homed.
    pub fn decide(&mut self, binding: &Binding) -> Decision {
        self.decide_at(binding, Utc::now())
    }

    fn decide_at(&mut self, binding: &Binding, now: DateTime<Utc>) -> Decision {
        match self.routes.entry(binding.key()) {
            Entry::Vacant(entry) => {
                entry.insert(Route {
                    prefix: binding.prefix,
                    prefix_length: binding.prefix_length,
                    router: binding.router,
                    interface: binding.interface.clone(),
                    first_applied: now,
                    last_applied: now,
                });
                Decision::New
            }
            Entry::Occupied(mut entry) => {
                let route = entry.get_mut();
                if route.router == binding.router {
                    return Decision::Unchanged;
                }
                let previous = route.router;
                route.router = binding.router;
                route.last_applied = now;
                Decision::RouterChanged { previous }
            }
        }
    }

    /// Drop the record for `key` so the next advertisement is treated as new
    pub fn forget(&mut self, key: &RouteKey) -> Option<Route> {
        self.routes.remove(key)
    }

    pub fn get(&self, key: &RouteKey) -> Option<&Route> {
        self.routes.get(key)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn binding(prefix: &str, len: u8, router: &str) -> Binding {
        Binding::new(prefix.parse().unwrap(), len, router.parse().unwrap(), "eth0")
    }

    #[test]
    fn test_new_then_unchanged() {
        let mut tracker = RouteStateTracker::new();
        let b = binding("fd00:1::", 64, "fe80::1");

        assert_eq!(tracker.decide(&b), Decision::New);
        assert_eq!(tracker.decide(&b), Decision::Unchanged);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_router_change() {
        let mut tracker = RouteStateTracker::new();
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(30);

        tracker.decide_at(&binding("fd00:1::", 64, "fe80::1"), t0);
        let decision = tracker.decide_at(&binding("fd00:1::", 64, "fe80::2"), t1);
        assert_eq!(
            decision,
            Decision::RouterChanged {
                previous: "fe80::1".parse().unwrap()
            }
        );

        let route = tracker.get(&binding("fd00:1::", 64, "fe80::2").key()).unwrap();
        assert_eq!(route.router, "fe80::2".parse::<Ipv6Addr>().unwrap());
        assert_eq!(route.first_applied, t0);
        assert_eq!(route.last_applied, t1);
        assert_eq!(tracker.len(), 1);

        // Back to the first router is a change again
        assert!(matches!(
            tracker.decide(&binding("fd00:1::", 64, "fe80::1")),
            Decision::RouterChanged { .. }
        ));
    }

    #[test]
    fn test_key_normalizes_host_bits() {
        let mut tracker = RouteStateTracker::new();

        assert_eq!(
            tracker.decide(&binding("fd00:1::", 64, "fe80::1")),
            Decision::New
        );
        assert_eq!(
            tracker.decide(&binding("fd00:1::abcd", 64, "fe80::1")),
            Decision::Unchanged
        );
    }

    #[test]
    fn test_prefix_length_and_interface_are_part_of_key() {
        let mut tracker = RouteStateTracker::new();
        let router: Ipv6Addr = "fe80::1".parse().unwrap();

        tracker.decide(&binding("fd00:1::", 64, "fe80::1"));
        assert_eq!(
            tracker.decide(&binding("fd00:1::", 48, "fe80::1")),
            Decision::New
        );
        assert_eq!(
            tracker.decide(&Binding::new("fd00:1::".parse().unwrap(), 64, router, "wpan0")),
            Decision::New
        );
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_forget() {
        let mut tracker = RouteStateTracker::new();
        let b = binding("fd00:1::", 64, "fe80::1");

        tracker.decide(&b);
        assert!(tracker.forget(&b.key()).is_some());
        assert!(tracker.is_empty());
        assert_eq!(tracker.decide(&b), Decision::New);
    }

    #[test]
    fn test_decision_needs_apply() {
        assert!(Decision::New.needs_apply());
        assert!(!Decision::Unchanged.needs_apply());
        assert!(
            Decision::RouterChanged {
                previous: Ipv6Addr::UNSPECIFIED
            }
            .needs_apply()
        );
    }

    #[test]
    fn test_binding_display() {
        assert_eq!(
            binding("fd00:abcd::1", 64, "fe80::1").to_string(),
            "fd00:abcd::/64 via fe80::1 dev eth0"
        );
    }
}
