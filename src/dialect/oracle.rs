use super::{quote_text, SqlDialect};
use crate::connection::ConnectionMetadata;
use crate::values::SqlLiteral;

/// ORA-01795: at most 1000 expressions in a list.
const MAX_IN_LIST_SIZE: usize = 1000;
const MIN_MAJOR_VERSION: u32 = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl SqlDialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn driver_name(&self) -> &'static str {
        "oracle"
    }

    fn check_compatibility(&self, metadata: &ConnectionMetadata) -> bool {
        metadata.product_name.to_ascii_lowercase().contains("oracle")
            && metadata.product_major_version >= MIN_MAJOR_VERSION
    }

    fn max_in_list_size(&self) -> Option<usize> {
        Some(MAX_IN_LIST_SIZE)
    }

    fn quote_literal(&self, literal: &SqlLiteral) -> String {
        match literal {
            SqlLiteral::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            SqlLiteral::Integer(i) => i.to_string(),
            SqlLiteral::Decimal(d) => d.to_string(),
            SqlLiteral::Text(s) => quote_text(s),
            SqlLiteral::Timestamp(_) => format!("TIMESTAMP {}", quote_text(&literal.raw())),
        }
    }

    fn paginate(&self, statement: String, limit: u64) -> String {
        format!("select * from ({}) where rownum <= {}", statement, limit)
    }
}
