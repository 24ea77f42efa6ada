use super::identifier::Identifier;

/// System catalog view listing every table and view on the host.
const SYSTEM_TABLES: &str = "QSYS2.SYSTABLES";

/// SQL text plus the values bound to its `?` markers, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    pub query: String,
    pub params: Vec<String>,
}

impl SqlStatement {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), params: Vec::new() }
    }

    fn bind(mut self, value: impl Into<String>) -> Self {
        self.params.push(value.into());
        self
    }
}

/// Row cap for one query shape: `default` when unspecified, always within `[1, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    pub default: u32,
    pub max: u32,
}

impl LimitPolicy {
    pub fn clamp(&self, requested: Option<i64>) -> u32 {
        match requested {
            None => self.default,
            Some(n) => n.clamp(1, self.max as i64) as u32,
        }
    }
}

pub const SCHEMA_LIMIT: LimitPolicy = LimitPolicy { default: 20, max: 100 };
pub const TABLE_LIMIT: LimitPolicy = LimitPolicy { default: 20, max: 50 };
pub const ROW_LIMIT: LimitPolicy = LimitPolicy { default: 200, max: 5000 };

/// Map the client wildcards `*` and `?` onto SQL `LIKE` metacharacters.
///
/// Literal `%` and `_` already present pass through untouched and keep
/// their `LIKE` meaning.
pub fn translate_wildcards(pattern: &str) -> String {
    pattern.replace('*', "%").replace('?', "_")
}

/// A normalized search pattern, only ever bound as a query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern(String);

impl WildcardPattern {
    /// Trim, uppercase and translate. Blank input means "no filter".
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let trimmed = raw?.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(translate_wildcards(&trimmed.to_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Builds the only statements the gateway ever sends to the remote host.
pub struct CatalogQueryBuilder;

impl CatalogQueryBuilder {
    /// Connectivity probe used at login.
    pub fn probe() -> SqlStatement {
        SqlStatement::new("VALUES(1)")
    }

    pub fn list_schemas(pattern: Option<&WildcardPattern>, limit: u32) -> SqlStatement {
        let mut where_clause = String::from("1=1");
        if pattern.is_some() {
            where_clause.push_str(" AND TABLE_SCHEMA LIKE ?");
        }

        let statement = SqlStatement::new(format!(
            "SELECT DISTINCT TABLE_SCHEMA FROM {} WHERE {} ORDER BY TABLE_SCHEMA FETCH FIRST {} ROWS ONLY",
            SYSTEM_TABLES, where_clause, limit
        ));

        match pattern {
            Some(p) => statement.bind(p.as_str()),
            None => statement,
        }
    }

    /// `schemas` must be non-empty; callers resolve it with `resolve_libraries`.
    pub fn list_tables(schemas: &[Identifier], pattern: Option<&WildcardPattern>, limit: u32) -> SqlStatement {
        let schema_list = schemas
            .iter()
            .map(Identifier::to_literal)
            .collect::<Vec<_>>()
            .join(",");

        let mut where_clause = format!("TABLE_SCHEMA IN ({})", schema_list);
        if pattern.is_some() {
            where_clause.push_str(" AND TABLE_NAME LIKE ?");
        }

        let statement = SqlStatement::new(format!(
            "SELECT TABLE_SCHEMA, TABLE_NAME FROM {} WHERE {} ORDER BY TABLE_SCHEMA, TABLE_NAME FETCH FIRST {} ROWS ONLY",
            SYSTEM_TABLES, where_clause, limit
        ));

        match pattern {
            Some(p) => statement.bind(p.as_str()),
            None => statement,
        }
    }

    pub fn extract_rows(schema: &Identifier, table: &Identifier, limit: u32) -> SqlStatement {
        SqlStatement::new(format!(
            "SELECT * FROM {}.{} FETCH FIRST {} ROWS ONLY",
            schema, table, limit
        ))
    }
}
