//! A small SELECT fragment builder.
//!
//! Planning fills the pieces; [`SelectBuilder::render`] turns them into
//! text as a last step, so parameter bookkeeping never interleaves with
//! string assembly.

use crate::dialect::Dialect;

#[derive(Debug, Clone, Default)]
pub(crate) struct SelectBuilder {
    pub distinct: bool,
    /// A rendered `DISTINCT ON (...)` modifier; takes precedence over `distinct`.
    pub distinct_on: Option<String>,
    /// `(expression, output alias)`.
    pub columns: Vec<(String, Option<String>)>,
    pub from: String,
    pub joins: Vec<String>,
    pub filter: Option<String>,
    pub group_by: Vec<String>,
    pub order_by: Vec<String>,
    pub start: Option<usize>,
    pub limit: Option<usize>,
}

impl SelectBuilder {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..Self::default()
        }
    }

    pub fn column(&mut self, expr: impl Into<String>, alias: Option<String>) -> &mut Self {
        self.columns.push((expr.into(), alias));
        self
    }

    /// Adds a GROUP BY expression once.
    pub fn group(&mut self, expr: impl Into<String>) -> &mut Self {
        let expr = expr.into();
        if !self.group_by.contains(&expr) {
            self.group_by.push(expr);
        }
        self
    }

    /// Sets the filter; an empty fragment means no WHERE clause.
    pub fn filter(&mut self, filter: String) -> &mut Self {
        self.filter = if filter.is_empty() { None } else { Some(filter) };
        self
    }

    pub fn render(&self, dialect: &dyn Dialect) -> String {
        let mut sql = String::from("SELECT ");
        if let Some(on) = &self.distinct_on {
            sql.push_str(on);
            sql.push(' ');
        } else if self.distinct {
            sql.push_str("DISTINCT ");
        }

        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|(expr, alias)| match alias {
                Some(alias) => format!("{expr} AS {}", dialect.quote(alias)),
                None => expr.clone(),
            })
            .collect();
        sql.push_str(&columns.join(", "));

        sql.push_str(&format!(" FROM {}", self.from));
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if let Some(filter) = &self.filter {
            sql.push_str(&format!(" WHERE {filter}"));
        }

        if !self.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", self.group_by.join(", ")));
        }

        if !self.order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", self.order_by.join(", ")));
        }

        if let Some(page) = dialect.limit_clause(self.start, self.limit) {
            sql.push(' ');
            sql.push_str(&page);
        }

        sql
    }
}
