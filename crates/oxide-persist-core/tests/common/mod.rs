#![allow(dead_code)]

use oxide_persist_core::ast::{BooleanExpr, NumberExpr};
use oxide_persist_core::catalog::{EntityReference, Site};
use oxide_persist_core::dialect::{GenericDialect, Unparse};
use oxide_persist_core::identifier::{ColumnName, TableName};
use oxide_persist_core::{Dependents, Ref};
use oxide_persist_derive::Storable;

#[derive(Debug, Clone, PartialEq, Storable)]
#[table(name = "points")]
pub struct Point {
    #[column(primary_key)]
    pub x: i32,
    #[column(primary_key)]
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Storable)]
#[table(name = "pairs")]
pub struct Pair {
    pub name: String,
    pub age: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Storable)]
pub struct Segment {
    pub start: Point,
    pub end: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Storable)]
#[table(name = "owners")]
pub struct Owner {
    #[column(primary_key)]
    pub id: i64,
    #[column(unique, sql_type = "string64")]
    pub name: String,
}

pub fn non_negative(column: &ColumnName) -> BooleanExpr {
    NumberExpr::column(column.clone()).gt_eq(NumberExpr::integer(0))
}

#[derive(Debug, Clone, PartialEq, Storable)]
#[table(name = "pets")]
pub struct Pet {
    #[column(primary_key)]
    pub id: i64,
    #[column(on_delete = "cascade")]
    pub owner: Ref<Owner>,
    #[column(name = "nick")]
    pub nickname: Option<String>,
    #[column(default = 0, check = non_negative)]
    pub legs: i16,
}

#[derive(Debug, Clone, PartialEq, Storable)]
#[table(name = "routes")]
pub struct Route {
    #[column(primary_key)]
    pub id: i64,
    pub label: String,
    pub stops: Dependents<Point>,
}

#[derive(Debug, Clone, PartialEq, Storable)]
#[table(name = "wide")]
pub struct Wide {
    #[column(primary_key)]
    pub id: i64,
    pub flag: bool,
    pub tiny: i8,
    pub small: i16,
    pub big: i128,
    pub ratio: f32,
    pub precise: f64,
    pub initial: char,
    pub digest: [u8; 16],
    pub payload: Vec<u8>,
}

pub fn tenant() -> Site {
    Site::default().with_entity(EntityReference {
        table: TableName::new("accounts").unwrap(),
        column: ColumnName::new("id").unwrap(),
        key: 7,
    })
}

pub fn render(node: &impl Unparse, site: &Site) -> String {
    node.to_sql(&GenericDialect, site).unwrap().sql
}
