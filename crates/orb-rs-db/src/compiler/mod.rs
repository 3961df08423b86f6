//! SQL compilation.
//!
//! [`SqlCompiler`] turns [`Lookup`]s, filter trees, and [`Record`]s into
//! parameterized SQL for one [`Dialect`]. Every call builds a fresh
//! [`CompileContext`], so a compiler is freely shareable and compiling the
//! same input twice yields identical text and parameters.
//!
//! Placeholders are named (`%(key0)s`, `%(key1)s`, ...) and every bound value
//! appears in the statement's [`Params`] under its key.

mod builder;
mod columns;
mod context;
mod ddl;
mod delete;
mod expand;
mod insert;
mod predicate;
mod select;
mod statement;
mod update;

#[cfg(test)]
pub(crate) mod fixtures;

pub use context::{CompileContext, CompileOptions};
pub use statement::{CompiledStatement, Params};

use orb_rs_core::logging::compile_span;
use orb_rs_core::OrbResult;

use crate::dialect::Dialect;
use crate::query::{Lookup, QueryNode, Record};
use crate::schema::SchemaRegistry;

/// Compiles statements against the schemas of one registry.
///
/// # Examples
///
/// ```
/// use orb_rs_db::compiler::SqlCompiler;
/// use orb_rs_db::dialect::PostgreSql;
/// use orb_rs_db::query::{Lookup, Query};
/// use orb_rs_db::schema::{Column, ColumnType, Schema, SchemaRegistry};
///
/// let registry = SchemaRegistry::new().with(
///     Schema::new("User")
///         .column(Column::id())
///         .column(Column::new("username", ColumnType::String)),
/// );
/// let dialect = PostgreSql::new();
/// let compiler = SqlCompiler::new(&registry, &dialect);
///
/// let statement = compiler
///     .compile_select("User", &Lookup::new().filter(Query::new("username").is("john.doe")))
///     .unwrap()
///     .unwrap();
/// assert_eq!(
///     statement.sql,
///     "SELECT \"user\".\"id\" AS \"id\", \"user\".\"username\" AS \"username\" \
///      FROM \"user\" WHERE \"user\".\"username\" = %(key0)s"
/// );
/// assert_eq!(statement.params.len(), 1);
/// ```
pub struct SqlCompiler<'a> {
    registry: &'a SchemaRegistry,
    dialect: &'a dyn Dialect,
    options: CompileOptions,
}

impl<'a> SqlCompiler<'a> {
    /// Creates a compiler with default options.
    pub fn new(registry: &'a SchemaRegistry, dialect: &'a dyn Dialect) -> Self {
        Self::with_options(registry, dialect, CompileOptions::default())
    }

    pub fn with_options(
        registry: &'a SchemaRegistry,
        dialect: &'a dyn Dialect,
        options: CompileOptions,
    ) -> Self {
        Self {
            registry,
            dialect,
            options,
        }
    }

    pub const fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub const fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    fn context(&self) -> CompileContext<'_> {
        CompileContext::new(self.registry, self.dialect, &self.options)
    }

    /// Compiles a SELECT of `table`.
    ///
    /// Returns `Ok(None)` when the filter can never match, in which case the
    /// caller should treat the result as empty without querying.
    pub fn compile_select(&self, table: &str, lookup: &Lookup) -> OrbResult<Option<CompiledStatement>> {
        let _span = compile_span("select", table).entered();
        let schema = self.registry.get(table)?;
        let mut ctx = self.context();
        let statement = select::compile_select(&mut ctx, schema, lookup)?;
        log_compiled(statement.as_ref());
        Ok(statement)
    }

    /// Compiles `SELECT COUNT(*)` over the rows `lookup` selects.
    pub fn compile_count(&self, table: &str, lookup: &Lookup) -> OrbResult<Option<CompiledStatement>> {
        let _span = compile_span("count", table).entered();
        let schema = self.registry.get(table)?;
        let mut ctx = self.context();
        let statement = select::compile_count(&mut ctx, schema, lookup)?;
        log_compiled(statement.as_ref());
        Ok(statement)
    }

    /// Compiles a standalone WHERE fragment (without the keyword).
    ///
    /// The SQL is empty when the filter places no constraint, and the result
    /// is `Ok(None)` when it can never match.
    pub fn compile_where(&self, table: &str, filter: &QueryNode) -> OrbResult<Option<CompiledStatement>> {
        let _span = compile_span("where", table).entered();
        let schema = self.registry.get(table)?;
        let mut ctx = self.context();
        let statement = select::compile_where(&mut ctx, schema, filter)?;
        log_compiled(statement.as_ref());
        Ok(statement)
    }

    /// Compiles the INSERT statements for `records`: the base rows, then one
    /// statement per record and locale for translated values.
    pub fn compile_insert(&self, table: &str, records: &[Record]) -> OrbResult<Vec<CompiledStatement>> {
        let _span = compile_span("insert", table).entered();
        let schema = self.registry.get(table)?;
        let mut ctx = self.context();
        let statements = insert::compile_insert(&mut ctx, schema, records)?;
        tracing::debug!(statements = statements.len(), records = records.len(), "compiled insert");
        Ok(statements)
    }

    /// Compiles one UPDATE per record, keyed by its primary key, plus the
    /// translation upserts.
    pub fn compile_update(&self, table: &str, records: &[Record]) -> OrbResult<Vec<CompiledStatement>> {
        let _span = compile_span("update", table).entered();
        let schema = self.registry.get(table)?;
        let mut ctx = self.context();
        let statements = update::compile_update(&mut ctx, schema, records)?;
        tracing::debug!(statements = statements.len(), records = records.len(), "compiled update");
        Ok(statements)
    }

    /// Compiles a DELETE of the rows matching `filter`, or of every row.
    pub fn compile_delete(
        &self,
        table: &str,
        filter: Option<&QueryNode>,
    ) -> OrbResult<Option<CompiledStatement>> {
        let _span = compile_span("delete", table).entered();
        let schema = self.registry.get(table)?;
        let mut ctx = self.context();
        let statement = delete::compile_delete(&mut ctx, schema, filter)?;
        log_compiled(statement.as_ref());
        Ok(statement)
    }

    pub fn compile_create_table(&self, table: &str) -> OrbResult<Vec<CompiledStatement>> {
        let _span = compile_span("create_table", table).entered();
        let schema = self.registry.get(table)?;
        let statements = ddl::compile_create_table(&self.context(), schema)?;
        tracing::debug!(statements = statements.len(), "compiled create table");
        Ok(statements)
    }

    pub fn compile_add_columns(&self, table: &str, columns: &[String]) -> OrbResult<Vec<CompiledStatement>> {
        let _span = compile_span("add_columns", table).entered();
        let schema = self.registry.get(table)?;
        let statements = ddl::compile_add_columns(&self.context(), schema, columns)?;
        tracing::debug!(statements = statements.len(), "compiled add columns");
        Ok(statements)
    }
}

fn log_compiled(statement: Option<&CompiledStatement>) {
    match statement {
        Some(statement) => tracing::debug!(sql = %statement.sql, params = statement.params.len(), "compiled"),
        None => tracing::debug!("compiled to nothing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, PostgreSql};
    use crate::query::{Locale, Query};
    use crate::value::Value;
    use orb_rs_core::OrbError;

    #[test]
    fn test_unknown_table() {
        let reg = fixtures::registry();
        let pg = PostgreSql::new();
        let compiler = SqlCompiler::new(&reg, &pg);
        assert!(matches!(
            compiler.compile_select("Nope", &Lookup::new()),
            Err(OrbError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_fresh_context_per_call() {
        let reg = fixtures::registry();
        let pg = PostgreSql::new();
        let compiler = SqlCompiler::new(&reg, &pg);
        let lookup = Lookup::new()
            .columns(["id"])
            .filter(Query::new("age").greater_than(30));
        let first = compiler.compile_select("User", &lookup).unwrap().unwrap();
        let second = compiler.compile_select("User", &lookup).unwrap().unwrap();
        assert_eq!(first, second);
        assert!(second.sql.contains("%(key0)s"));
    }

    #[test]
    fn test_options_locale_applies() {
        let reg = fixtures::registry();
        let my = MySql::new();
        let options = CompileOptions::default().locale(Locale::Code("fr_FR".into()));
        let compiler = SqlCompiler::with_options(&reg, &my, options);
        let out = compiler
            .compile_select("Role", &Lookup::new().columns(["title"]))
            .unwrap()
            .unwrap();
        assert!(out.sql.contains("`role_i18n_default`"));
        assert_eq!(out.params.get("key0"), Some(&Value::from("fr_FR")));
    }

    #[test]
    fn test_delete_and_ddl_surface() {
        let reg = fixtures::registry();
        let pg = PostgreSql::new();
        let compiler = SqlCompiler::new(&reg, &pg);
        assert_eq!(
            compiler.compile_delete("Group", None).unwrap().unwrap().sql,
            "DELETE FROM \"group\""
        );
        let ddl = compiler.compile_create_table("User").unwrap();
        assert!(ddl[0].sql.starts_with("CREATE TABLE IF NOT EXISTS \"user\" ("));
        assert!(ddl[1].sql.starts_with("CREATE TABLE IF NOT EXISTS \"user_i18n\" ("));
    }
}
