//! Schemas shared by the compiler unit tests.

use crate::query::OrderBy;
use crate::schema::{Aggregator, Column, ColumnType, Joiner, Pipe, ReverseLookup, Schema, SchemaRegistry};

pub(crate) fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            Schema::new("User")
                .column(Column::id())
                .column(Column::new("username", ColumnType::String).unique().required())
                .column(Column::new("email", ColumnType::Email))
                .column(Column::new("age", ColumnType::Integer))
                .column(Column::new("active", ColumnType::Bool))
                .column(Column::new("bio", ColumnType::Text).translatable())
                .column(Column::reference("role", "Role"))
                .column(Column::reference("address", "Address"))
                .column(Column::aggregate(
                    "orderCount",
                    ColumnType::Integer,
                    Aggregator::count("Order", "user"),
                ))
                .column(Column::joined(
                    "lastOrder",
                    ColumnType::Date,
                    Joiner::new("Order", "user", "placed"),
                ))
                .column(Column::proxy("displayName", ColumnType::String))
                .pipe(Pipe::new("groups", "UserGroup", "user", "group", "Group"))
                .reverse_lookup(ReverseLookup::new("orders", "Order", "user"))
                .order_by(OrderBy::asc("username")),
        )
        .with(
            Schema::new("Role")
                .column(Column::id())
                .column(Column::new("name", ColumnType::String))
                .column(Column::new("title", ColumnType::String).translatable()),
        )
        .with(
            Schema::new("Address")
                .column(Column::id())
                .column(Column::new("city", ColumnType::String))
                .column(Column::new("zip", ColumnType::String)),
        )
        .with(
            Schema::new("Order")
                .column(Column::id())
                .column(Column::reference("user", "User"))
                .column(Column::new("total", ColumnType::Decimal))
                .column(Column::new("placed", ColumnType::Date))
                .column(Column::new("status", ColumnType::String))
                .order_by(OrderBy::desc("placed")),
        )
        .with(
            Schema::new("Group")
                .column(Column::id())
                .column(Column::new("name", ColumnType::String)),
        )
        .with(
            Schema::new("UserGroup")
                .column(Column::id())
                .column(Column::reference("user", "User"))
                .column(Column::reference("group", "Group")),
        )
}
