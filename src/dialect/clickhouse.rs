use super::{quote_text, SqlDialect};
use crate::connection::ConnectionMetadata;
use crate::values::SqlLiteral;

const MIN_MAJOR_VERSION: u32 = 21;

/// ClickHouse over HTTP. Schemas are databases, so `schema.table` is
/// already `database.table`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickHouseDialect;

impl SqlDialect for ClickHouseDialect {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn driver_name(&self) -> &'static str {
        "clickhouse-rs"
    }

    fn check_compatibility(&self, metadata: &ConnectionMetadata) -> bool {
        metadata.product_name.eq_ignore_ascii_case("clickhouse")
            && metadata.product_major_version >= MIN_MAJOR_VERSION
    }

    fn quote_literal(&self, literal: &SqlLiteral) -> String {
        match literal {
            SqlLiteral::Boolean(b) => b.to_string(),
            SqlLiteral::Integer(i) => i.to_string(),
            SqlLiteral::Decimal(d) => d.to_string(),
            SqlLiteral::Text(s) => quote_text(&s.replace('\\', "\\\\")),
            SqlLiteral::Timestamp(_) => format!("toDateTime64({}, 3)", quote_text(&literal.raw())),
        }
    }

    fn paginate(&self, statement: String, limit: u64) -> String {
        format!("{} LIMIT {}", statement, limit)
    }
}
