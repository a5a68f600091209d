//! Column-name canonicalization for query results.
//!
//! Pre-aggregated views and their base-table fallbacks do not agree on
//! column spellings (`YEAR` vs `year` vs `plan_year`, `PROJECT_COUNT` vs
//! `cnt`). Every query result is read through [`query_canonical`], which
//! maps each accepted spelling onto a single [`CanonicalField`] so the
//! typed readers never look at raw column names.

use std::collections::BTreeMap;

use duckdb::types::Value;

/// The fields any dataset query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalField {
    ItemNo,
    District,
    County,
    Route,
    Year,
    TypeOfWork,
    Awarded,
    Description,
    BeginMp,
    EndMp,
    EstCost,
    Category,
    DisplayName,
    DistrictName,
    Count,
    AwardedCount,
    CurrentCount,
}

impl CanonicalField {
    /// Resolves a result column name to its canonical field.
    ///
    /// Matching ignores case, underscores, and spaces. Returns `None` for
    /// columns no reader consumes.
    #[must_use]
    pub fn from_column(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != ' ')
            .flat_map(char::to_lowercase)
            .collect();

        Some(match normalized.as_str() {
            "itemno" | "item" | "itemnumber" => Self::ItemNo,
            "district" | "districtnumber" | "dist" => Self::District,
            "county" | "countyname" => Self::County,
            "route" | "routelabel" => Self::Route,
            "year" | "planyear" | "fy" => Self::Year,
            "typeofwork" | "typework" | "worktype" | "rawcode" => Self::TypeOfWork,
            "awarded" | "isawarded" => Self::Awarded,
            "description" | "desc" => Self::Description,
            "beginmp" | "bmp" => Self::BeginMp,
            "endmp" | "emp" => Self::EndMp,
            "estcost" | "cost" => Self::EstCost,
            "category" | "standardcategory" => Self::Category,
            "displayname" | "categoryname" => Self::DisplayName,
            "districtname" => Self::DistrictName,
            "count" | "cnt" | "projectcount" | "total" => Self::Count,
            "awardedcount" | "numawarded" => Self::AwardedCount,
            "currentcount" | "current" | "notawarded" | "numcurrent" => Self::CurrentCount,
            _ => return None,
        })
    }
}

/// One result row keyed by canonical field.
#[derive(Debug, Clone, Default)]
pub struct CanonicalRow {
    values: BTreeMap<CanonicalField, Value>,
}

impl CanonicalRow {
    /// Reads a field as text. Numbers are rendered; nulls are `None`.
    #[must_use]
    pub fn text(&self, field: CanonicalField) -> Option<String> {
        match self.values.get(&field)? {
            Value::Text(s) => Some(s.clone()),
            other => int_value(other)
                .map(|n| n.to_string())
                .or_else(|| float_value(other).map(|n| n.to_string())),
        }
    }

    /// Reads a field as an integer.
    #[must_use]
    pub fn int(&self, field: CanonicalField) -> Option<i64> {
        let value = self.values.get(&field)?;
        int_value(value).or_else(|| match value {
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Reads a field as a non-negative count. Negative or missing values
    /// read as zero.
    #[must_use]
    pub fn count(&self, field: CanonicalField) -> u64 {
        self.int(field)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0)
    }

    /// Reads a field as a float.
    #[must_use]
    pub fn float(&self, field: CanonicalField) -> Option<f64> {
        let value = self.values.get(&field)?;
        float_value(value).or_else(|| match value {
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Reads a field as a flag. Integers are truthy when non-zero and
    /// text accepts the usual yes/no spellings.
    #[must_use]
    pub fn flag(&self, field: CanonicalField) -> Option<bool> {
        match self.values.get(&field)? {
            Value::Boolean(b) => Some(*b),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            other => int_value(other).map(|n| n != 0),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn int_value(value: &Value) -> Option<i64> {
    Some(match value {
        Value::TinyInt(n) => i64::from(*n),
        Value::SmallInt(n) => i64::from(*n),
        Value::Int(n) => i64::from(*n),
        Value::BigInt(n) => *n,
        Value::HugeInt(n) => i64::try_from(*n).ok()?,
        Value::UTinyInt(n) => i64::from(*n),
        Value::USmallInt(n) => i64::from(*n),
        Value::UInt(n) => i64::from(*n),
        Value::UBigInt(n) => i64::try_from(*n).ok()?,
        Value::Double(n) if n.fract() == 0.0 => *n as i64,
        Value::Float(n) if n.fract() == 0.0 => *n as i64,
        _ => return None,
    })
}

#[allow(clippy::cast_precision_loss)]
fn float_value(value: &Value) -> Option<f64> {
    Some(match value {
        Value::Float(n) => f64::from(*n),
        Value::Double(n) => *n,
        other => int_value(other)? as f64,
    })
}

/// Runs a read-only query and canonicalizes each row.
///
/// # Errors
///
/// Returns the underlying `DuckDB` error if the statement cannot be
/// prepared (e.g. a missing view) or execution fails.
pub fn query_canonical<P>(
    conn: &duckdb::Connection,
    sql: &str,
    params: P,
) -> Result<Vec<CanonicalRow>, duckdb::Error>
where
    P: duckdb::Params,
{
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;

    let mut columns: Option<Vec<Option<CanonicalField>>> = None;
    let mut out = Vec::new();

    while let Some(row) = rows.next()? {
        let columns = columns.get_or_insert_with(|| {
            row.as_ref()
                .column_names()
                .iter()
                .map(|name| CanonicalField::from_column(name))
                .collect()
        });

        let mut canonical = CanonicalRow::default();
        for (idx, field) in columns.iter().enumerate() {
            let Some(field) = field else {
                continue;
            };
            let value: Value = row.get(idx)?;
            // First spelling wins when a query returns two aliases of the
            // same field.
            canonical.values.entry(*field).or_insert(value);
        }
        out.push(canonical);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_spellings_collapse() {
        for name in ["YEAR", "Year", "year", "plan_year", "PLAN_YEAR", "PlanYear"] {
            assert_eq!(
                CanonicalField::from_column(name),
                Some(CanonicalField::Year),
                "{name}"
            );
        }
    }

    #[test]
    fn count_spellings_collapse() {
        for name in ["cnt", "COUNT", "project_count", "PROJECT_COUNT", "total"] {
            assert_eq!(
                CanonicalField::from_column(name),
                Some(CanonicalField::Count),
                "{name}"
            );
        }
    }

    #[test]
    fn unknown_columns_are_dropped() {
        assert_eq!(CanonicalField::from_column("geometry"), None);
        assert_eq!(CanonicalField::from_column(""), None);
    }

    #[test]
    fn reads_mixed_case_aliases_from_duckdb() {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        let rows = query_canonical(
            &conn,
            "SELECT 2024 AS \"YEAR\", CAST(3 AS BIGINT) AS cnt, 'x' AS ignored_column",
            [],
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].int(CanonicalField::Year), Some(2024));
        assert_eq!(rows[0].count(CanonicalField::Count), 3);
    }

    #[test]
    fn flags_accept_integers_and_text() {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        let rows = query_canonical(
            &conn,
            "SELECT 1 AS awarded UNION ALL SELECT 0 UNION ALL SELECT NULL",
            [],
        )
        .unwrap();

        let flags: Vec<Option<bool>> = rows
            .iter()
            .map(|r| r.flag(CanonicalField::Awarded))
            .collect();
        assert!(flags.contains(&Some(true)));
        assert!(flags.contains(&Some(false)));
        assert!(flags.contains(&None));
    }

    #[test]
    fn negative_counts_read_as_zero() {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        let rows = query_canonical(&conn, "SELECT -4 AS cnt", []).unwrap();
        assert_eq!(rows[0].count(CanonicalField::Count), 0);
    }
}
