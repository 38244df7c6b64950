//! Reputation scoring engine.

use crate::config::{Config, ResolutionFailurePolicy, ScoringConfig};
use crate::resolver::{GeoResolver, ResolutionError};
use crate::rules::RuleCollection;
use crate::schema::AttributeBag;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Error from a scoring request.
#[derive(Debug)]
pub enum ReputationError {
    /// Geolocation resolution failed, so no score can be computed.
    Unavailable(ResolutionError),
    /// A blacklist mutation was given an empty IP string.
    EmptyAddress,
}

impl std::fmt::Display for ReputationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReputationError::Unavailable(e) => write!(f, "reputation unavailable: {}", e),
            ReputationError::EmptyAddress => {
                write!(f, "IP address must be a non-empty string")
            }
        }
    }
}

impl std::error::Error for ReputationError {}

/// Rule-based reputation scoring engine.
///
/// Owns a blacklist and a rule collection, both read-mostly: scoring takes
/// a snapshot of the rules, so a concurrent [`reload_rules`](Self::reload_rules)
/// is never observed mid-iteration.
pub struct ReputationEngine {
    scoring: ScoringConfig,
    resolver: Arc<dyn GeoResolver>,
    rules: RwLock<Arc<RuleCollection>>,
    blacklist: RwLock<HashSet<String>>,
}

impl ReputationEngine {
    /// Create a new engine with an explicit rule collection.
    pub fn new(
        resolver: Arc<dyn GeoResolver>,
        rules: RuleCollection,
        scoring: ScoringConfig,
    ) -> Self {
        Self {
            scoring,
            resolver,
            rules: RwLock::new(Arc::new(rules)),
            blacklist: RwLock::new(HashSet::new()),
        }
    }

    /// Create an engine from configuration, loading the configured rule
    /// file and seeding the blacklist.
    pub fn from_config(config: &Config, resolver: Arc<dyn GeoResolver>) -> anyhow::Result<Self> {
        let rules = match &config.rules_file {
            Some(path) => RuleCollection::load_from_file(path)?,
            None => RuleCollection::new(),
        };

        let engine = Self::new(resolver, rules, config.scoring.clone());
        for ip in &config.blacklist {
            engine.add_to_blacklist(ip)?;
        }

        info!(
            rules = engine.rules().len(),
            blacklist = engine.blacklist_len(),
            resolver = engine.resolver.name(),
            "Reputation engine initialized"
        );

        Ok(engine)
    }

    /// Whether an IP is blacklisted (exact string membership).
    pub fn is_blacklisted(&self, ip: &str) -> bool {
        self.blacklist.read().map(|b| b.contains(ip)).unwrap_or(false)
    }

    /// Add an IP to the blacklist.
    ///
    /// Only non-emptiness is validated; IP syntax is the resolver's concern.
    pub fn add_to_blacklist(&self, ip: &str) -> Result<(), ReputationError> {
        if ip.trim().is_empty() {
            return Err(ReputationError::EmptyAddress);
        }
        if let Ok(mut blacklist) = self.blacklist.write() {
            blacklist.insert(ip.to_string());
        }
        Ok(())
    }

    /// Remove an IP from the blacklist. Returns whether it was present.
    pub fn remove_from_blacklist(&self, ip: &str) -> bool {
        self.blacklist
            .write()
            .map(|mut b| b.remove(ip))
            .unwrap_or(false)
    }

    /// Number of blacklisted IPs.
    pub fn blacklist_len(&self) -> usize {
        self.blacklist.read().map(|b| b.len()).unwrap_or(0)
    }

    /// Replace the rule collection atomically.
    ///
    /// In-flight scoring calls keep the snapshot they started with.
    pub fn reload_rules(&self, rules: RuleCollection) {
        let count = rules.len();
        if let Ok(mut current) = self.rules.write() {
            *current = Arc::new(rules);
        }
        info!(rules = count, "Rule collection reloaded");
    }

    /// Snapshot of the current rule collection.
    pub fn rules(&self) -> Arc<RuleCollection> {
        self.rules
            .read()
            .map(|r| Arc::clone(&r))
            .unwrap_or_else(|_| Arc::new(RuleCollection::new()))
    }

    /// Sum the points of every rule matching the bag.
    ///
    /// Pure computation; the result is independent of rule order.
    pub fn evaluate(&self, bag: &AttributeBag) -> i64 {
        let rules = self.rules();
        rules
            .iter()
            .filter(|rule| rule.matches(bag, self.scoring.value_comparison))
            .map(|rule| rule.points())
            .sum()
    }

    fn clamp(&self, score: i64) -> i64 {
        match &self.scoring.clamp {
            Some(range) => range.apply(score),
            None => score,
        }
    }

    /// Compute the reputation score for an IP address.
    ///
    /// Blacklisted IPs score 0 without a geolocation lookup. Resolution
    /// failures surface as [`ReputationError::Unavailable`] unless the
    /// configured policy opts into a neutral score.
    pub async fn reputation(&self, ip: &str) -> Result<i64, ReputationError> {
        // Blacklist is absolute and checked before any lookup
        if self.is_blacklisted(ip) {
            debug!(ip = %ip, "IP is blacklisted");
            return Ok(0);
        }

        let bag = match self.resolver.resolve(ip).await {
            Ok(bag) => bag,
            Err(e) => {
                warn!(
                    ip = %ip,
                    resolver = self.resolver.name(),
                    error = %e,
                    "Geolocation resolution failed"
                );
                return match self.scoring.on_resolution_failure {
                    ResolutionFailurePolicy::Error => Err(ReputationError::Unavailable(e)),
                    ResolutionFailurePolicy::Neutral(score) => Ok(self.clamp(score)),
                };
            }
        };

        let score = self.clamp(self.evaluate(&bag));
        debug!(ip = %ip, score, "Reputation computed");
        Ok(score)
    }
}
