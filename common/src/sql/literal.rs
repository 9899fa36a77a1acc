use crate::binlog::column_value::ColumnValue;

/// Renders one value as a SQL literal. Absent values render as NULL.
pub fn render_value(value: Option<&ColumnValue>) -> String {
    let value = match value {
        None => return "NULL".to_string(),
        Some(v) => v,
    };

    match value {
        ColumnValue::TinyInt(v) => v.to_string(),
        ColumnValue::SmallInt(v) => v.to_string(),
        ColumnValue::MediumInt(v) => v.to_string(),
        ColumnValue::Int(v) => v.to_string(),
        ColumnValue::BigInt(v) => v.to_string(),
        ColumnValue::Float(v) => v.to_string(),
        ColumnValue::Double(v) => v.to_string(),
        ColumnValue::Decimal(v) => v.clone(),
        ColumnValue::String(v) => quote_string(v),
        ColumnValue::Bit(bits) => {
            let mut n: u64 = 0;
            for bit in bits {
                n = (n << 1) | (*bit as u64);
            }
            n.to_string()
        }
        ColumnValue::Enum(v) => v.to_string(),
        ColumnValue::Set(v) => v.to_string(),
        ColumnValue::Blob(bytes) => {
            if bytes.is_empty() {
                "''".to_string()
            } else {
                let mut hex = String::with_capacity(2 + bytes.len() * 2);
                hex.push_str("0x");
                for b in bytes {
                    hex.push_str(&format!("{:02x}", b));
                }
                hex
            }
        }
        ColumnValue::Year(v) => v.to_string(),
        ColumnValue::Date(d) => {
            format!("'{:04}-{:02}-{:02}'", d.year, d.month, d.day)
        }
        ColumnValue::Time(t) => {
            if t.millis > 0 {
                format!("'{:02}:{:02}:{:02}.{:03}'", t.hour, t.minute, t.second, t.millis)
            } else {
                format!("'{:02}:{:02}:{:02}'", t.hour, t.minute, t.second)
            }
        }
        ColumnValue::DateTime(d) => {
            if d.millis > 0 {
                format!(
                    "'{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}'",
                    d.year, d.month, d.day, d.hour, d.minute, d.second, d.millis
                )
            } else {
                format!(
                    "'{:04}-{:02}-{:02} {:02}:{:02}:{:02}'",
                    d.year, d.month, d.day, d.hour, d.minute, d.second
                )
            }
        }
        ColumnValue::Timestamp(millis) => {
            // Rendered in the session timezone discipline: UTC.
            format!("FROM_UNIXTIME({}.{:03})", millis / 1000, millis % 1000)
        }
    }
}

/// Boolean columns surface as tinyint: render as 1/0.
pub fn render_bool(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Single-quoted string literal with `\`, `'`, newline, CR and tab escaped.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Backtick-quoted identifier, inner backticks doubled.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
mod test {
    use crate::binlog::column_value::{ColumnValue, Date};

    use super::{quote_ident, quote_string, render_value};

    #[test]
    fn test_null() {
        assert_eq!(render_value(None), "NULL");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(render_value(Some(&ColumnValue::Int(7))), "7");
        assert_eq!(render_value(Some(&ColumnValue::Decimal("3.14".to_string()))), "3.14");
    }

    #[test]
    fn test_string_escaping() {
        let v = ColumnValue::String("a'b\\c\nd\re\tf".to_string());
        assert_eq!(render_value(Some(&v)), "'a\\'b\\\\c\\nd\\re\\tf'");
        assert_eq!(quote_string("plain"), "'plain'");
    }

    #[test]
    fn test_blob_hex() {
        let v = ColumnValue::Blob(vec![0xde, 0xad]);
        assert_eq!(render_value(Some(&v)), "0xdead");
        assert_eq!(render_value(Some(&ColumnValue::Blob(vec![]))), "''");
    }

    #[test]
    fn test_temporal() {
        let v = ColumnValue::Date(Date {
            year: 2024,
            month: 3,
            day: 9,
        });
        assert_eq!(render_value(Some(&v)), "'2024-03-09'");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "`users`");
        assert_eq!(quote_ident("we`ird"), "`we``ird`");
    }
}
