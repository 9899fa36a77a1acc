use common::sql::literal::{quote_ident, render_value};

use crate::events::change_event::{ChangeEvent, RowImage};

/// Renders a change event as executable SQL, one statement per row, values
/// as literals. No trailing semicolon; the journal writer adds it.
pub fn render(event: &ChangeEvent) -> Vec<String> {
    match event {
        ChangeEvent::Ddl { sql, .. } => vec![sql.clone()],
        ChangeEvent::Insert {
            database,
            table,
            rows,
        } => rows
            .iter()
            .map(|row| render_insert(database, table, row))
            .collect(),
        ChangeEvent::Update {
            database,
            table,
            rows,
        } => rows
            .iter()
            .map(|row| render_update(database, table, &row.before, &row.after))
            .collect(),
        ChangeEvent::Delete {
            database,
            table,
            rows,
        } => rows
            .iter()
            .map(|row| render_delete(database, table, row))
            .collect(),
    }
}

fn qualified(database: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(database), quote_ident(table))
}

fn render_insert(database: &str, table: &str, row: &RowImage) -> String {
    let columns = row
        .iter()
        .map(|(name, _)| quote_ident(name))
        .collect::<Vec<String>>()
        .join(", ");
    let values = row
        .iter()
        .map(|(_, value)| render_value(value.as_ref()))
        .collect::<Vec<String>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified(database, table),
        columns,
        values
    )
}

fn render_update(database: &str, table: &str, before: &RowImage, after: &RowImage) -> String {
    let assignments = after
        .iter()
        .map(|(name, value)| format!("{} = {}", quote_ident(name), render_value(value.as_ref())))
        .collect::<Vec<String>>()
        .join(", ");

    format!(
        "UPDATE {} SET {} WHERE {}",
        qualified(database, table),
        assignments,
        render_where(before)
    )
}

fn render_delete(database: &str, table: &str, row: &RowImage) -> String {
    format!(
        "DELETE FROM {} WHERE {}",
        qualified(database, table),
        render_where(row)
    )
}

/// All before-image columns; NULL compares with IS NULL.
fn render_where(row: &RowImage) -> String {
    row.iter()
        .map(|(name, value)| match value {
            None => format!("{} IS NULL", quote_ident(name)),
            Some(v) => format!("{} = {}", quote_ident(name), render_value(Some(v))),
        })
        .collect::<Vec<String>>()
        .join(" AND ")
}

#[cfg(test)]
mod test {
    use common::binlog::column_value::ColumnValue;

    use crate::events::change_event::{ChangeEvent, UpdateRow};

    use super::render;

    fn row(id: u32, name: Option<&str>) -> Vec<(String, Option<ColumnValue>)> {
        vec![
            ("id".to_string(), Some(ColumnValue::Int(id))),
            (
                "name".to_string(),
                name.map(|n| ColumnValue::String(n.to_string())),
            ),
        ]
    }

    #[test]
    fn test_insert() {
        let event = ChangeEvent::Insert {
            database: "shop".to_string(),
            table: "users".to_string(),
            rows: vec![row(1, Some("a")), row(2, Some("b"))],
        };

        let sql = render(&event);
        assert_eq!(sql.len(), 2);
        assert_eq!(
            sql[0],
            "INSERT INTO `shop`.`users` (`id`, `name`) VALUES (1, 'a')"
        );
    }

    #[test]
    fn test_update() {
        let event = ChangeEvent::Update {
            database: "shop".to_string(),
            table: "users".to_string(),
            rows: vec![UpdateRow {
                before: row(2, Some("b")),
                after: row(2, Some("c")),
            }],
        };

        let sql = render(&event);
        assert_eq!(
            sql[0],
            "UPDATE `shop`.`users` SET `id` = 2, `name` = 'c' WHERE `id` = 2 AND `name` = 'b'"
        );
    }

    #[test]
    fn test_delete_with_null() {
        let event = ChangeEvent::Delete {
            database: "shop".to_string(),
            table: "users".to_string(),
            rows: vec![row(2, None)],
        };

        let sql = render(&event);
        assert_eq!(
            sql[0],
            "DELETE FROM `shop`.`users` WHERE `id` = 2 AND `name` IS NULL"
        );
    }

    #[test]
    fn test_ddl_verbatim() {
        let event = ChangeEvent::Ddl {
            database: "shop".to_string(),
            sql: "ALTER TABLE users ADD COLUMN age INT".to_string(),
        };
        assert_eq!(render(&event), vec!["ALTER TABLE users ADD COLUMN age INT"]);
    }
}
