//! [`Unparse`] implementations for every AST node.

use super::{unsupported, BinaryForm, Dialect, SqlBuilder, Unparse, VariadicForm};
use crate::ast::{
    CheckConstraint, ColumnDef, CreateTable, Delete, DropTable, Expr, ForeignKeyConstraint,
    Insert, InsertSource, Node, OrderBy, PrimaryKeyConstraint, Projection, Select, Sort,
    Statement, TableConstraint, UnaryNotation, UniqueConstraint, Update,
};
use crate::catalog::Site;
use crate::error::{PersistError, Result};
use crate::identifier::ColumnName;

fn parenthesized(
    node: &Node,
    dialect: &dyn Dialect,
    site: &Site,
    out: &mut SqlBuilder,
) -> Result<()> {
    out.push('(');
    node.unparse(dialect, site, out)?;
    out.push(')');
    Ok(())
}

fn push_columns(dialect: &dyn Dialect, columns: &[ColumnName], out: &mut SqlBuilder) {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        dialect.push_identifier(column.as_str(), out);
    }
}

fn push_where(
    predicate: Option<&impl Unparse>,
    dialect: &dyn Dialect,
    site: &Site,
    out: &mut SqlBuilder,
) -> Result<()> {
    if let Some(predicate) = predicate {
        out.push_str(" WHERE ");
        predicate.unparse(dialect, site, out)?;
    }
    Ok(())
}

impl Unparse for Node {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        match self {
            Self::Literal(literal) => dialect.push_literal(literal, out)?,
            Self::Parameter(sql_type) => out.push_param(*sql_type),
            Self::Column(column) => dialect.push_column(column, out),
            Self::Unary { op, child } => {
                let form = dialect
                    .unary_form(*op)
                    .ok_or_else(|| unsupported(dialect, format!("unary {}", op.symbol())))?;
                match form.notation {
                    UnaryNotation::Prefix => {
                        out.push_str(form.symbol);
                        out.push(' ');
                        parenthesized(child, dialect, site, out)?;
                    }
                    UnaryNotation::Postfix => {
                        parenthesized(child, dialect, site, out)?;
                        out.push(' ');
                        out.push_str(form.symbol);
                    }
                    UnaryNotation::Function => {
                        out.push_str(form.symbol);
                        out.push('(');
                        child.unparse(dialect, site, out)?;
                        out.push(')');
                    }
                }
            }
            Self::Binary { op, left, right } => {
                let form = dialect
                    .binary_form(*op)
                    .ok_or_else(|| unsupported(dialect, format!("binary {}", op.symbol())))?;
                match form {
                    BinaryForm::Infix(symbol) => {
                        parenthesized(left, dialect, site, out)?;
                        out.push(' ');
                        out.push_str(symbol);
                        out.push(' ');
                        parenthesized(right, dialect, site, out)?;
                    }
                    BinaryForm::Function(name) => {
                        out.push_str(name);
                        out.push('(');
                        left.unparse(dialect, site, out)?;
                        out.push_str(", ");
                        right.unparse(dialect, site, out)?;
                        out.push(')');
                    }
                    BinaryForm::Cast { symbol, target } => {
                        out.push_str("CAST(");
                        parenthesized(left, dialect, site, out)?;
                        out.push(' ');
                        out.push_str(symbol);
                        out.push(' ');
                        parenthesized(right, dialect, site, out)?;
                        out.push_str(" AS ");
                        out.push_str(target);
                        out.push(')');
                    }
                }
            }
            Self::Variadic { op, children } => {
                if children.is_empty() {
                    return Err(PersistError::MalformedNode(format!(
                        "{} requires at least one operand",
                        op.symbol()
                    )));
                }
                let form = dialect
                    .variadic_form(*op, children.len())
                    .ok_or_else(|| unsupported(dialect, format!("variadic {}", op.symbol())))?;
                match form {
                    VariadicForm::Function(name) => {
                        out.push_str(name);
                        out.push('(');
                        out.push_iter(children.iter(), ", ", |out, child| {
                            child.unparse(dialect, site, out)
                        })?;
                        out.push(')');
                    }
                    VariadicForm::Infix(symbol) => {
                        let sep = format!(" {symbol} ");
                        out.push_iter(children.iter(), &sep, |out, child| {
                            parenthesized(child, dialect, site, out)
                        })?;
                    }
                    VariadicForm::Operand => match &**children {
                        [only] => parenthesized(only, dialect, site, out)?,
                        _ => {
                            return Err(unsupported(
                                dialect,
                                format!("{} over {} operands", op.symbol(), children.len()),
                            ))
                        }
                    },
                }
            }
            Self::Aggregate { op, column } => {
                let name = dialect
                    .aggregate_name(*op)
                    .ok_or_else(|| unsupported(dialect, format!("aggregate {}", op.symbol())))?;
                out.push_str(name);
                out.push('(');
                match column {
                    Some(column) => dialect.push_column(column, out),
                    None => out.push('*'),
                }
                out.push(')');
            }
        }
        Ok(())
    }
}

impl<S: Sort> Unparse for Expr<S> {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        self.node().unparse(dialect, site, out)
    }
}

impl Unparse for ColumnDef {
    fn unparse(&self, dialect: &dyn Dialect, _site: &Site, out: &mut SqlBuilder) -> Result<()> {
        dialect.push_identifier(self.name.as_str(), out);
        out.push(' ');
        out.push_str(dialect.require_type_name(self.sql_type)?);
        if self.not_null {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            out.push_str(" DEFAULT ");
            dialect.push_literal(default, out)?;
        }
        Ok(())
    }
}

impl Unparse for PrimaryKeyConstraint {
    fn unparse(&self, dialect: &dyn Dialect, _site: &Site, out: &mut SqlBuilder) -> Result<()> {
        out.push_str("PRIMARY KEY (");
        push_columns(dialect, self.columns(), out);
        out.push(')');
        Ok(())
    }
}

impl Unparse for UniqueConstraint {
    fn unparse(&self, dialect: &dyn Dialect, _site: &Site, out: &mut SqlBuilder) -> Result<()> {
        out.push_str("UNIQUE (");
        push_columns(dialect, self.columns(), out);
        out.push(')');
        Ok(())
    }
}

impl Unparse for ForeignKeyConstraint {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        out.push_str("FOREIGN KEY (");
        push_columns(dialect, self.columns(), out);
        out.push_str(") REFERENCES ");
        dialect.push_table(site, self.reference(), out)?;
        out.push_str(" (");
        push_columns(dialect, self.reference_columns(), out);
        out.push(')');
        if let Some(action) = self.on_delete {
            out.push_str(" ON DELETE ");
            out.push_str(action.as_sql());
        }
        if let Some(action) = self.on_update {
            out.push_str(" ON UPDATE ");
            out.push_str(action.as_sql());
        }
        Ok(())
    }
}

impl Unparse for CheckConstraint {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        out.push_str("CHECK (");
        self.predicate().unparse(dialect, site, out)?;
        out.push(')');
        Ok(())
    }
}

impl Unparse for TableConstraint {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        match self {
            Self::PrimaryKey(c) => c.unparse(dialect, site, out),
            Self::Unique(c) => c.unparse(dialect, site, out),
            Self::ForeignKey(c) => c.unparse(dialect, site, out),
            Self::Check(c) => c.unparse(dialect, site, out),
        }
    }
}

impl Unparse for CreateTable {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        out.push_str("CREATE TABLE ");
        if self.is_if_not_exists() {
            out.push_str("IF NOT EXISTS ");
        }
        dialect.push_table(site, self.table(), out)?;
        out.push_str(" (");
        out.push_iter(self.columns(), ", ", |out, column| {
            column.unparse(dialect, site, out)
        })?;
        for constraint in self.constraints() {
            out.push_str(", ");
            constraint.unparse(dialect, site, out)?;
        }
        out.push(')');
        Ok(())
    }
}

impl Unparse for DropTable {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        if self.cascade && !dialect.supports_drop_cascade() {
            return Err(unsupported(dialect, String::from("DROP TABLE ... CASCADE")));
        }
        out.push_str("DROP TABLE ");
        if self.if_exists {
            out.push_str("IF EXISTS ");
        }
        dialect.push_table(site, &self.table, out)?;
        if self.cascade {
            out.push_str(" CASCADE");
        }
        Ok(())
    }
}

impl Unparse for Insert {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        out.push_str("INSERT INTO ");
        dialect.push_table(site, self.table(), out)?;
        out.push_str(" (");
        push_columns(dialect, self.columns(), out);
        out.push(')');
        match self.source() {
            InsertSource::Values(rows) => {
                out.push_str(" VALUES ");
                out.push_iter(rows, ", ", |out, row| {
                    out.push('(');
                    out.push_iter(row, ", ", |out, value| value.unparse(dialect, site, out))?;
                    out.push(')');
                    Ok(())
                })?;
            }
            InsertSource::Select(select) => {
                out.push(' ');
                select.unparse(dialect, site, out)?;
            }
        }
        Ok(())
    }
}

impl Unparse for Update {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        out.push_str("UPDATE ");
        dialect.push_table(site, self.table(), out)?;
        out.push_str(" SET ");
        out.push_iter(self.assignments(), ", ", |out, assignment| {
            dialect.push_identifier(assignment.column.as_str(), out);
            out.push_str(" = ");
            assignment.value.unparse(dialect, site, out)
        })?;
        push_where(self.predicate(), dialect, site, out)
    }
}

impl Unparse for Delete {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        out.push_str("DELETE FROM ");
        dialect.push_table(site, &self.table, out)?;
        push_where(self.where_clause.as_ref(), dialect, site, out)
    }
}

impl Unparse for Projection {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        self.expr.unparse(dialect, site, out)?;
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            dialect.push_identifier(alias.as_str(), out);
        }
        Ok(())
    }
}

impl Unparse for OrderBy {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        self.expr.unparse(dialect, site, out)?;
        out.push(' ');
        out.push_str(self.direction.as_str());
        Ok(())
    }
}

impl Unparse for Select {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        out.push_str("SELECT ");
        if self.projection.is_empty() {
            out.push('*');
        } else {
            out.push_iter(&self.projection, ", ", |out, p| p.unparse(dialect, site, out))?;
        }
        out.push_str(" FROM ");
        dialect.push_table(site, &self.table, out)?;
        push_where(self.where_clause.as_ref(), dialect, site, out)?;
        if !self.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            out.push_iter(&self.order_by, ", ", |out, o| o.unparse(dialect, site, out))?;
        }
        Ok(())
    }
}

impl Unparse for Statement {
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()> {
        match self {
            Self::CreateTable(s) => s.unparse(dialect, site, out),
            Self::DropTable(s) => s.unparse(dialect, site, out),
            Self::Insert(s) => s.unparse(dialect, site, out),
            Self::Update(s) => s.unparse(dialect, site, out),
            Self::Delete(s) => s.unparse(dialect, site, out),
            Self::Select(s) => s.unparse(dialect, site, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        Assignment, BooleanExpr, ForeignKeyAction, NumberExpr, OrderDirection, SqlType, StringExpr,
    };
    use std::sync::Arc;

    use crate::dialect::GenericDialect;
    use crate::identifier::{Alias, QualifiedColumnName, TableName};

    fn col(name: &str) -> ColumnName {
        ColumnName::new(name).unwrap()
    }

    fn table(name: &str) -> TableName {
        TableName::new(name).unwrap()
    }

    fn render(node: &impl Unparse) -> (String, Vec<SqlType>) {
        let rendered = node.to_sql(&GenericDialect, &Site::default()).unwrap();
        (rendered.sql, rendered.parameters)
    }

    #[test]
    fn test_create_points_table() {
        let create = CreateTable::new(
            table("points"),
            vec![
                ColumnDef::new(col("x"), SqlType::Integer32).not_null(),
                ColumnDef::new(col("y"), SqlType::Integer32).not_null(),
            ],
        )
        .unwrap()
        .constraint(TableConstraint::PrimaryKey(
            PrimaryKeyConstraint::new(vec![col("x"), col("y")]).unwrap(),
        ));
        let (sql, params) = render(&create);
        assert_eq!(
            sql,
            "CREATE TABLE points (x INTEGER NOT NULL, y INTEGER NOT NULL, PRIMARY KEY (x, y))"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_insert_points() {
        let insert = Insert::parameterized(
            table("points"),
            &[(col("x"), SqlType::Integer32), (col("y"), SqlType::Integer32)],
            1,
        )
        .unwrap();
        let (sql, params) = render(&insert);
        assert_eq!(sql, "INSERT INTO points (x, y) VALUES (?, ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_update_points() {
        let x = NumberExpr::column(col("x"));
        let y = NumberExpr::column(col("y"));
        let update = Update::new(
            table("points"),
            vec![Assignment {
                column: col("x"),
                value: x.add(NumberExpr::integer(1)).into_node(),
            }],
        )
        .unwrap()
        .where_clause(y.eq(NumberExpr::parameter(SqlType::Integer32).unwrap()));
        let (sql, params) = render(&update);
        assert_eq!(sql, "UPDATE points SET x = (x) + (1) WHERE (y) = (?)");
        assert_eq!(params, vec![SqlType::Integer32]);
    }

    #[test]
    fn test_delete_without_where_omits_keyword() {
        let (sql, params) = render(&Delete::new(table("points")));
        assert_eq!(sql, "DELETE FROM points");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_parameter_order() {
        let select = Select::new(table("people"))
            .project(
                StringExpr::parameter(SqlType::String).unwrap(),
                Some(Alias::new("tag").unwrap()),
            )
            .column(col("name"))
            .where_clause(
                NumberExpr::column(col("age")).gt(NumberExpr::parameter(SqlType::Integer16).unwrap()),
            )
            .order_by(
                NumberExpr::column(col("age")).add(NumberExpr::parameter(SqlType::Integer64).unwrap()),
                OrderDirection::Desc,
            );
        let (sql, params) = render(&select);
        assert_eq!(
            sql,
            "SELECT ? AS tag, name FROM people WHERE (age) > (?) ORDER BY (age) + (?) DESC"
        );
        assert_eq!(
            params,
            vec![SqlType::String, SqlType::Integer16, SqlType::Integer64]
        );
        assert_eq!(params.len(), select.parameter_count());
    }

    #[test]
    fn test_select_star() {
        let (sql, _) = render(&Select::new(table("points")));
        assert_eq!(sql, "SELECT * FROM points");
    }

    #[test]
    fn test_insert_from_select() {
        let select = Select::new(table("old_points"))
            .column(col("x"))
            .where_clause(BooleanExpr::boolean(true));
        let insert = Insert::from_select(table("points"), vec![col("x")], select).unwrap();
        let (sql, _) = render(&insert);
        assert_eq!(
            sql,
            "INSERT INTO points (x) SELECT x FROM old_points WHERE TRUE"
        );
    }

    #[test]
    fn test_foreign_key_and_check() {
        let fk = ForeignKeyConstraint::new(vec![col("owner")], table("people"), vec![col("id")])
            .unwrap()
            .on_delete(ForeignKeyAction::Cascade)
            .on_update(ForeignKeyAction::NoAction);
        let check = CheckConstraint::new(NumberExpr::column(col("age")).gt_eq(NumberExpr::integer(0)))
            .unwrap();
        let create = CreateTable::new(
            table("pets"),
            vec![ColumnDef::new(col("owner"), SqlType::Integer64)],
        )
        .unwrap()
        .if_not_exists()
        .constraint(TableConstraint::ForeignKey(fk))
        .constraint(TableConstraint::Check(check));
        let (sql, _) = render(&create);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS pets (owner BIGINT, \
             FOREIGN KEY (owner) REFERENCES people (id) ON DELETE CASCADE ON UPDATE NO ACTION, \
             CHECK ((age) >= (0)))"
        );
    }

    #[test]
    fn test_site_qualifies_tables() {
        let site = Site::named("tenant").unwrap();
        let rendered = Delete::new(table("points"))
            .to_sql(&GenericDialect, &site)
            .unwrap();
        assert_eq!(rendered.sql, "DELETE FROM tenant.points");
    }

    #[test]
    fn test_unary_and_variadic_forms() {
        let name = StringExpr::column(col("name"));
        let predicate = name
            .clone()
            .upper()
            .like(StringExpr::text("A%"))
            .and(name.clone().is_not_null())
            .not();
        let (sql, _) = render(&predicate);
        assert_eq!(
            sql,
            "NOT (((UPPER(name)) LIKE ('A%')) AND ((name) IS NOT NULL))"
        );

        let concat = StringExpr::concat(vec![name, StringExpr::text("!")]).unwrap();
        let (sql, _) = render(&concat);
        assert_eq!(sql, "CONCAT(name, '!')");
    }

    #[test]
    fn test_empty_variadic_is_malformed() {
        let empty = Node::Variadic {
            op: crate::ast::VariadicOperator::Coalesce,
            children: Arc::from([]),
        };
        assert!(matches!(
            empty.to_sql(&GenericDialect, &Site::default()),
            Err(PersistError::MalformedNode(_))
        ));
    }

    #[test]
    fn test_aggregates() {
        let qualified = QualifiedColumnName::new(Some(table("t")), col("x")).unwrap();
        let select = Select::new(table("t"))
            .project(NumberExpr::count_all(), None)
            .project(
                NumberExpr::aggregate(crate::ast::AggregateOperator::Max, Some(qualified)),
                None,
            );
        let (sql, _) = render(&select);
        assert_eq!(sql, "SELECT COUNT(*), MAX(t.x) FROM t");
    }

    #[test]
    fn test_empty_type_is_unsupported() {
        let create = CreateTable::new(table("t"), vec![ColumnDef::new(col("x"), SqlType::Empty)])
            .unwrap();
        assert!(matches!(
            create.to_sql(&GenericDialect, &Site::default()),
            Err(crate::error::PersistError::UnsupportedNode { .. })
        ));
    }

    #[test]
    fn test_drop_table() {
        let (sql, _) = render(&DropTable::new(table("t")).if_exists().cascade());
        assert_eq!(sql, "DROP TABLE IF EXISTS t CASCADE");
    }
}
