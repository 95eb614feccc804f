use super::{quote_text, SqlDialect};
use crate::connection::ConnectionMetadata;
use crate::values::SqlLiteral;

const MIN_MAJOR_VERSION: u32 = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn driver_name(&self) -> &'static str {
        "mysql"
    }

    fn check_compatibility(&self, metadata: &ConnectionMetadata) -> bool {
        let product = metadata.product_name.to_ascii_lowercase();
        (product.contains("mysql") || product.contains("mariadb"))
            && metadata.product_major_version >= MIN_MAJOR_VERSION
    }

    fn quote_literal(&self, literal: &SqlLiteral) -> String {
        match literal {
            SqlLiteral::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            SqlLiteral::Integer(i) => i.to_string(),
            SqlLiteral::Decimal(d) => d.to_string(),
            // MySQL also treats backslash as an escape inside string literals
            SqlLiteral::Text(s) => quote_text(&s.replace('\\', "\\\\")),
            SqlLiteral::Timestamp(_) => quote_text(&literal.raw()),
        }
    }

    fn paginate(&self, statement: String, limit: u64) -> String {
        format!("{} limit {}", statement, limit)
    }
}
