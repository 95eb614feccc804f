//! Value and time-unit types the mapping layer parses column strings into.
//!
//! These are deliberately small: the abstraction layer that consumes
//! propositions owns the full value algebra and granularity arithmetic.

pub mod literal;
pub mod time;
pub mod value;

pub use literal::SqlLiteral;
pub use time::{Granularity, Interval, PositionParseError, PositionParser};
pub use value::{InequalityComparator, Value, ValueType};
