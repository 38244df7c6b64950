//! Rule-based IP reputation scoring.
//!
//! Combines geolocation attributes from a lookup service with a
//! user-defined point rule set to produce a numeric trust score per IP.
//!
//! # Features
//!
//! - **Point Rules** - Award (or deduct) points per geolocation attribute,
//!   by exact value or wildcard, built through a fluent builder
//! - **Rule Documents** - Persist rule collections to JSON, with optional
//!   named groups for organization
//! - **Blacklist** - Blacklisted IPs score 0 without a geolocation lookup
//! - **Pluggable Resolution** - Geolocation behind an async trait, with an
//!   ipwho.is client included
//! - **Explicit Failure Policy** - Resolution failures surface as errors
//!   unless a neutral score is explicitly configured
//!
//! # Example Rule Document
//!
//! ```json
//! {
//!   "rules": [
//!     { "attribute": "country", "value": "US", "points": 10 },
//!     { "attribute": "country", "any": true, "points": 2 }
//!   ],
//!   "groups": {
//!     "providers": [
//!       { "attribute": "isp", "value": "ISP1", "points": 15 }
//!     ]
//!   }
//! }
//! ```

pub mod config;
pub mod engine;
pub mod resolver;
pub mod rules;
pub mod schema;

pub use config::Config;
pub use engine::{ReputationEngine, ReputationError};
pub use resolver::{ipwhois::IpWhoisResolver, GeoResolver, ResolutionError};
pub use rules::{Rule, RuleBuilder, RuleCollection, RuleError, ValueMatch};
pub use schema::{is_valid_attribute, Attribute, AttributeBag};
