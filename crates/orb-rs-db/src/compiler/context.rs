//! Per-call compilation state.
//!
//! A [`CompileContext`] is created fresh for every top-level compile call and
//! threaded by `&mut` through every recursive step. It owns the parameter
//! map, the parameter-key and alias counters, and the recursion-depth guard.
//! A [`Scope`] holds the state of one SELECT level (the base schema, its
//! alias, emitted joins, and already-satisfied computed columns).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use orb_rs_core::{OrbError, OrbResult, Settings};

use super::columns::Translations;
use super::statement::Params;
use crate::dialect::Dialect;
use crate::query::Locale;
use crate::schema::{Column, Schema, SchemaRegistry};
use crate::value::Value;

/// Options that apply to every statement compiled by one compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// The locale translated columns are read in, unless a lookup overrides it.
    pub locale: Locale,
    /// The fallback locale for missing translations.
    pub default_locale: String,
    /// Maximum nesting of sub-selects, compounds, and expansions.
    pub max_depth: usize,
    /// Namespace for schemas that do not declare one.
    pub namespace: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            locale: Locale::Code("en_US".to_string()),
            default_locale: "en_US".to_string(),
            max_depth: 32,
            namespace: None,
        }
    }
}

impl CompileOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            locale: Locale::parse(&settings.locale),
            default_locale: settings.default_locale.clone(),
            max_depth: settings.max_compile_depth,
            namespace: settings.namespace.clone(),
        }
    }

    #[must_use]
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Mutable state of one top-level compile call.
pub struct CompileContext<'a> {
    registry: &'a SchemaRegistry,
    dialect: &'a dyn Dialect,
    options: &'a CompileOptions,
    locale: Locale,
    params: Params,
    next_key: usize,
    next_alias: usize,
    depth: usize,
}

impl<'a> CompileContext<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        dialect: &'a dyn Dialect,
        options: &'a CompileOptions,
    ) -> Self {
        Self {
            registry,
            dialect,
            options,
            locale: options.locale.clone(),
            params: Params::new(),
            next_key: 0,
            next_alias: 0,
            depth: 0,
        }
    }

    pub const fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    pub const fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    pub fn default_locale(&self) -> &'a str {
        &self.options.default_locale
    }

    pub const fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// The locale code writes go to when none is given explicitly.
    pub fn write_locale(&self) -> String {
        match &self.locale {
            Locale::Code(code) => code.clone(),
            Locale::All => self.options.default_locale.clone(),
        }
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    // ── Parameters ──────────────────────────────────────────────────

    /// Marshals `value` through the dialect's store, binds it under a fresh
    /// key, and returns its placeholder.
    pub fn bind(&mut self, column: Option<&Column>, value: &Value) -> OrbResult<String> {
        let stored = self.dialect.store().store(column, value)?;
        let key = format!("key{}", self.next_key);
        self.next_key += 1;
        let placeholder = self.dialect.placeholder(&key);
        self.params.push(key, stored);
        Ok(placeholder)
    }

    pub fn params_len(&self) -> usize {
        self.params.len()
    }

    /// Drops parameters bound after `len`. Keys are not reused.
    pub fn rollback_params(&mut self, len: usize) {
        self.params.truncate(len);
    }

    /// Hands over the parameters bound so far, leaving the key counter intact
    /// so later statements of the same call never reuse a key.
    pub fn take_params(&mut self) -> Params {
        std::mem::take(&mut self.params)
    }

    // ── Names ───────────────────────────────────────────────────────

    /// A fresh alias, `{prefix}_{n}`.
    pub fn alias(&mut self, prefix: &str) -> String {
        let alias = format!("{prefix}_{}", self.next_alias);
        self.next_alias += 1;
        alias
    }

    pub fn quote(&self, ident: &str) -> String {
        self.dialect.quote(ident)
    }

    pub fn column_ref(&self, alias: &str, field: &str) -> String {
        self.dialect.column_ref(alias, field)
    }

    fn namespace_of<'s>(&'s self, schema: &'s Schema) -> Option<&'s str> {
        schema
            .namespace
            .as_deref()
            .or(self.options.namespace.as_deref())
    }

    pub fn table_ref(&self, schema: &Schema) -> String {
        self.dialect
            .table_ref(self.namespace_of(schema), schema.table_name())
    }

    pub fn i18n_table_ref(&self, schema: &Schema) -> String {
        self.dialect
            .table_ref(self.namespace_of(schema), &schema.i18n_table_name())
    }

    /// `table AS "alias"`, or just the table when the alias is redundant.
    pub fn from_clause(&self, schema: &Schema, alias: &str) -> String {
        self.aliased(self.table_ref(schema), alias)
    }

    /// [`from_clause`](Self::from_clause) for the schema's translation table.
    pub fn i18n_from_clause(&self, schema: &Schema, alias: &str) -> String {
        self.aliased(self.i18n_table_ref(schema), alias)
    }

    fn aliased(&self, table: String, alias: &str) -> String {
        let quoted = self.quote(alias);
        if table == quoted {
            table
        } else {
            format!("{table} AS {quoted}")
        }
    }

    // ── Recursion ───────────────────────────────────────────────────

    /// Runs `f` one level deeper, failing with
    /// [`OrbError::ExpansionTooDeep`] past the configured limit.
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> OrbResult<T>) -> OrbResult<T> {
        let depth = self.depth + 1;
        if depth > self.options.max_depth {
            return Err(OrbError::ExpansionTooDeep {
                depth,
                limit: self.options.max_depth,
            });
        }
        self.depth = depth;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

/// The state of one SELECT level.
#[derive(Debug, Clone)]
pub(crate) struct Scope<'a> {
    pub schema: &'a Schema,
    pub alias: String,
    /// Computed columns already satisfied by a planned join, by logical name.
    pub fields: BTreeMap<String, String>,
    /// Joins that keep one row per base row (computed columns, translations).
    pub planned: Vec<String>,
    /// Traversal joins emitted by filter predicates.
    pub joins: Vec<String>,
    /// Traversal path to join alias.
    pub join_aliases: HashMap<String, String>,
    /// Schemas reached through traversal joins.
    pub implicated: BTreeSet<String>,
    pub translations: Option<Translations>,
    /// Whether the SELECT aggregates and therefore needs GROUP BY.
    pub grouped: bool,
}

impl<'a> Scope<'a> {
    pub fn new(schema: &'a Schema, alias: impl Into<String>) -> Self {
        Self {
            schema,
            alias: alias.into(),
            fields: BTreeMap::new(),
            planned: Vec::new(),
            joins: Vec::new(),
            join_aliases: HashMap::new(),
            implicated: BTreeSet::new(),
            translations: None,
            grouped: false,
        }
    }

    /// The base schema's primary-key references.
    pub fn primary_refs(&self, ctx: &CompileContext<'_>) -> Vec<String> {
        self.schema
            .primary_columns()
            .iter()
            .map(|c| ctx.column_ref(&self.alias, &c.field))
            .collect()
    }

    /// The GROUP BY list: primary keys plus computed join values.
    pub fn group_by(&self, ctx: &CompileContext<'_>) -> Vec<String> {
        if !self.grouped {
            return Vec::new();
        }
        let mut group = self.primary_refs(ctx);
        group.extend(self.fields.values().cloned());
        group
    }
}
