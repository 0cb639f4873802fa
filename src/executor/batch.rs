use crate::error::DbError;
use crate::udbc::statement::PreparedStatement;

/// Supplies the parameters of each batch entry.
///
/// `set_values` is called once per entry, for `index` in `0..batch_size()`,
/// on a fresh copy of the statement with nothing bound.
pub trait BatchSetter {
    fn set_values(&self, ps: &mut PreparedStatement, index: usize) -> Result<(), DbError>;

    fn batch_size(&self) -> usize;
}

/// [`BatchSetter`] backed by a closure; see [`batch_setter`].
pub struct FnBatchSetter<F> {
    size: usize,
    set: F,
}

impl<F> BatchSetter for FnBatchSetter<F>
where
    F: Fn(&mut PreparedStatement, usize) -> Result<(), DbError>,
{
    fn set_values(&self, ps: &mut PreparedStatement, index: usize) -> Result<(), DbError> {
        (self.set)(ps, index)
    }

    fn batch_size(&self) -> usize {
        self.size
    }
}

pub fn batch_setter<F>(size: usize, set: F) -> FnBatchSetter<F>
where
    F: Fn(&mut PreparedStatement, usize) -> Result<(), DbError>,
{
    FnBatchSetter { size, set }
}

/// Builds one statement per entry of `setter`, validating every binding.
pub(crate) fn build_entries<B>(sql: &str, setter: &B) -> Result<Vec<PreparedStatement>, DbError>
where
    B: BatchSetter + ?Sized,
{
    let template = PreparedStatement::new(sql);
    let mut entries = Vec::with_capacity(setter.batch_size());
    for index in 0..setter.batch_size() {
        let mut ps = template.clone();
        setter.set_values(&mut ps, index)?;
        ps.check_bindings().map_err(|e| match e {
            DbError::Binding(msg) => DbError::Binding(format!("batch entry {index}: {msg}")),
            other => other,
        })?;
        entries.push(ps);
    }
    Ok(entries)
}
