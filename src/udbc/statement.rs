use crate::error::DbError;
use crate::udbc::value::Value;

/// A statement handle: SQL text with `?` placeholders, the values bound to
/// them and, optionally, the columns whose generated values should be
/// returned.
///
/// Parameter indices are 1-based, matching placeholder positions in the SQL.
/// Binding is purely client-side; nothing touches the database until the
/// statement is executed.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    sql: String,
    params: Vec<Option<Value>>,
    generated_keys: Option<Vec<String>>,
}

impl PreparedStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let placeholders = count_placeholders(&sql);
        Self {
            sql,
            params: vec![None; placeholders],
            generated_keys: None,
        }
    }

    /// Builds a statement and binds `values` in order. The number of values
    /// must equal the number of placeholders.
    pub fn with_params(sql: impl Into<String>, values: Vec<Value>) -> Result<Self, DbError> {
        let mut stmt = Self::new(sql);
        if values.len() != stmt.params.len() {
            return Err(DbError::Binding(format!(
                "statement has {} placeholder(s) but {} value(s) were supplied: {}",
                stmt.params.len(),
                values.len(),
                stmt.sql
            )));
        }
        stmt.params = values.into_iter().map(Some).collect();
        Ok(stmt)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn placeholder_count(&self) -> usize {
        self.params.len()
    }

    /// Binds `value` to the placeholder at `index` (1-based), replacing any
    /// previous binding.
    pub fn bind(&mut self, index: usize, value: impl Into<Value>) -> Result<&mut Self, DbError> {
        let count = self.params.len();
        let slot = index
            .checked_sub(1)
            .and_then(|i| self.params.get_mut(i))
            .ok_or_else(|| {
                DbError::Binding(format!(
                    "parameter index {index} out of range 1..={count}"
                ))
            })?;
        *slot = Some(value.into());
        Ok(self)
    }

    /// Asks the driver to return generated keys. With no column names the
    /// driver's native mechanism (e.g. the auto-increment id) is used.
    pub fn return_generated_keys<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generated_keys = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn returns_generated_keys(&self) -> bool {
        self.generated_keys.is_some()
    }

    pub fn generated_key_columns(&self) -> &[String] {
        self.generated_keys.as_deref().unwrap_or(&[])
    }

    /// Fails with [`DbError::Binding`] naming every placeholder left unbound.
    pub fn check_bindings(&self) -> Result<(), DbError> {
        let missing: Vec<String> = self
            .params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(i, _)| (i + 1).to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DbError::Binding(format!(
                "{} of {} parameter(s) unbound (index {}): {}",
                missing.len(),
                self.params.len(),
                missing.join(", "),
                self.sql
            )))
        }
    }

    /// The bound values in placeholder order.
    pub fn bound_params(&self) -> Result<Vec<&Value>, DbError> {
        self.check_bindings()?;
        Ok(self.params.iter().flatten().collect())
    }
}

/// Counts parameters, skipping quoted strings, quoted identifiers and
/// comments.
///
/// A bare `?` takes the index after the largest seen so far; `?NNN` names
/// index `NNN` explicitly, so a repeated `?1` is one parameter. The result
/// is the largest index. Named parameters (`:name`, `$1`) are not supported.
pub fn count_placeholders(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'?' => {
                let digits = bytes[i + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
                match sql[i + 1..i + 1 + digits].parse::<usize>() {
                    Ok(index) => count = count.max(index),
                    Err(_) => count += 1,
                }
                i += 1 + digits;
            }
            quote @ (b'\'' | b'"' | b'`') => i = skip_quoted(bytes, i + 1, quote),
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line(bytes, i + 2),
            b'#' => i = skip_line(bytes, i + 1),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = match sql[i + 2..].find("*/") {
                    Some(end) => i + 2 + end + 2,
                    None => bytes.len(),
                };
            }
            _ => i += 1,
        }
    }
    count
}

fn skip_quoted(bytes: &[u8], mut i: usize, quote: u8) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote != b'`' => i += 2,
            b if b == quote => {
                // a doubled quote is an escaped quote
                if bytes.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return i + 1;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_line(bytes: &[u8], i: usize) -> usize {
    bytes[i..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| i + p + 1)
}
