//! Structured query engine over cached sessions and activities: filter
//! operators with dot-path existential matching, projection with
//! wildcard/exclusion, computed fields, and cursor pagination.

mod engine;
mod filter;
mod projection;

pub use engine::{Domain, Include, IncludeActivities, IncludeSession, JulesQuery, Order, QueryEngine};
pub use filter::{FieldMatcher, WhereClause};
pub use projection::project;
