//! Round-robin selection over collector addresses.
//!
//! Every worker owns one [`EndpointSelector`]. Cursors start at a random
//! index so that workers do not hit the addresses in lockstep. The cursor is
//! advanced before every attempt, including the first, and there is no
//! health tracking: a failing address is still used on its turn.

use std::sync::Arc;

use rand::Rng;

/// Per-worker rotation cursor over the configured addresses.
#[derive(Debug, Clone)]
pub struct EndpointSelector {
    addresses: Arc<[String]>,
    cursor: usize,
}

impl EndpointSelector {
    /// Creates a selector whose cursor starts at `start` (modulo the address
    /// count).
    ///
    /// # Panics
    ///
    /// Panics if `addresses` is empty. Output configuration validation
    /// rejects that before any selector is built.
    pub fn new(addresses: Arc<[String]>, start: usize) -> Self {
        assert!(!addresses.is_empty(), "endpoint selector needs at least one address");
        let cursor = start % addresses.len();
        Self { addresses, cursor }
    }

    /// Creates a selector starting at a uniformly random index.
    pub fn with_random_start(addresses: Arc<[String]>) -> Self {
        let start = rand::rng().random_range(0..addresses.len().max(1));
        Self::new(addresses, start)
    }

    /// Moves to the next address and returns it.
    pub fn advance(&mut self) -> &str {
        self.cursor = (self.cursor + 1) % self.addresses.len();
        &self.addresses[self.cursor]
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of addresses in rotation.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Always false; selectors are never built without addresses.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn addresses(items: &[&str]) -> Arc<[String]> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn rotation_advances_before_first_use() {
        let mut selector = EndpointSelector::new(addresses(&["h1:80", "h2:80", "h3:80"]), 0);

        assert_eq!(selector.advance(), "h2:80");
        assert_eq!(selector.advance(), "h3:80");
        assert_eq!(selector.advance(), "h1:80");
    }

    #[test]
    fn six_attempts_visit_each_of_three_addresses_twice() {
        let mut selector = EndpointSelector::new(addresses(&["h1:80", "h2:80", "h3:80"]), 2);

        let used: Vec<String> = (0..6).map(|_| selector.advance().to_string()).collect();

        assert_eq!(used, ["h1:80", "h2:80", "h3:80", "h1:80", "h2:80", "h3:80"]);
    }

    #[test]
    fn single_address_is_always_selected() {
        let mut selector = EndpointSelector::with_random_start(addresses(&["only:80"]));
        for _ in 0..3 {
            assert_eq!(selector.advance(), "only:80");
        }
        assert_eq!(selector.cursor(), 0);
    }

    #[test]
    fn start_index_wraps() {
        let selector = EndpointSelector::new(addresses(&["a:1", "b:2"]), 5);
        assert_eq!(selector.cursor(), 1);
    }

    proptest! {
        #[test]
        fn random_start_is_within_bounds(count in 1usize..16) {
            let list: Arc<[String]> = (0..count).map(|i| format!("h{i}:80")).collect();
            let selector = EndpointSelector::with_random_start(list);
            prop_assert!(selector.cursor() < count);
        }

        #[test]
        fn full_cycles_use_every_address_equally(
            count in 1usize..8,
            start in 0usize..64,
            cycles in 1usize..5,
        ) {
            let list: Arc<[String]> = (0..count).map(|i| format!("h{i}:80")).collect();
            let mut selector = EndpointSelector::new(list, start);
            let mut hits = vec![0usize; count];

            for _ in 0..count * cycles {
                selector.advance();
                hits[selector.cursor()] += 1;
            }

            prop_assert!(hits.iter().all(|&h| h == cycles));
        }
    }
}
