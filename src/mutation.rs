//! Row level changes. Each operation takes the whole store and returns a new one.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::ValidationError;
use crate::record::{IdGenerator, Record, RecordId};

/// Prepend a new record built from `fields`.
pub fn add(records: &[Record], fields: HashMap<String, String>, ids: &mut IdGenerator) -> Vec<Record> {
    let record = Record::new(ids.mint(), fields);
    debug!("Adding record {}", record.id());
    std::iter::once(record)
        .chain(records.iter().cloned())
        .collect()
}

/// Replace the record with the same id. An unknown id leaves the store as it is.
pub fn edit(records: &[Record], edited: Record) -> Vec<Record> {
    records
        .iter()
        .map(|r| {
            if r.id() == edited.id() {
                edited.clone()
            } else {
                r.clone()
            }
        })
        .collect()
}

pub fn delete_one(records: &[Record], id: RecordId) -> Vec<Record> {
    records.iter().filter(|r| r.id() != id).cloned().collect()
}

pub fn delete_many(records: &[Record], selected: &HashSet<RecordId>) -> Result<Vec<Record>, ValidationError> {
    if selected.is_empty() {
        return Err(ValidationError::NothingSelected);
    }
    debug!("Deleting {} records", selected.len());
    Ok(records
        .iter()
        .filter(|r| !selected.contains(&r.id()))
        .cloned()
        .collect())
}

/// Copy every selected record under a new id. The copies keep the store order of their
/// originals and go in front of the store as one block.
pub fn duplicate_many(
    records: &[Record],
    selected: &HashSet<RecordId>,
    ids: &mut IdGenerator,
) -> Result<Vec<Record>, ValidationError> {
    if selected.is_empty() {
        return Err(ValidationError::NothingSelected);
    }
    let copies: Vec<Record> = records
        .iter()
        .filter(|r| selected.contains(&r.id()))
        .map(|r| r.with_id(ids.mint()))
        .collect();
    debug!("Duplicated {} records", copies.len());
    Ok(copies.into_iter().chain(records.iter().cloned()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ids: &mut IdGenerator, names: &[&str]) -> Vec<Record> {
        names
            .iter()
            .map(|n| Record::new(ids.mint(), HashMap::from([("NAME".to_string(), n.to_string())])))
            .collect()
    }

    fn names(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.get("NAME").unwrap_or("")).collect()
    }

    #[test]
    fn add_prepends() {
        let mut ids = IdGenerator::default();
        let records = store(&mut ids, &["a", "b"]);
        let fields = HashMap::from([("NAME".to_string(), "new".to_string())]);
        let records = add(&records, fields, &mut ids);
        assert_eq!(names(&records), vec!["new", "a", "b"]);
    }

    #[test]
    fn add_then_edit_updates_in_place() {
        let mut ids = IdGenerator::default();
        let records = store(&mut ids, &["a", "b"]);
        let records = add(&records, HashMap::new(), &mut ids);
        let mut edited = records[0].clone();
        edited.set("NAME", "edited");
        let after = edit(&records, edited);
        assert_eq!(after.len(), records.len());
        assert_eq!(names(&after), vec!["edited", "a", "b"]);
        assert_eq!(after[0].id(), records[0].id());
    }

    #[test]
    fn edit_of_unknown_id_is_a_no_op() {
        let mut ids = IdGenerator::default();
        let records = store(&mut ids, &["a"]);
        let stray = Record::new(ids.mint(), HashMap::new());
        assert_eq!(edit(&records, stray), records);
    }

    #[test]
    fn delete_one_removes_only_that_record() {
        let mut ids = IdGenerator::default();
        let records = store(&mut ids, &["a", "b", "c"]);
        let after = delete_one(&records, records[1].id());
        assert_eq!(names(&after), vec!["a", "c"]);
    }

    #[test]
    fn bulk_actions_need_a_selection() {
        let mut ids = IdGenerator::default();
        let records = store(&mut ids, &["a"]);
        let none = HashSet::new();
        assert_eq!(delete_many(&records, &none), Err(ValidationError::NothingSelected));
        assert_eq!(
            duplicate_many(&records, &none, &mut ids),
            Err(ValidationError::NothingSelected)
        );
    }

    #[test]
    fn duplicates_go_first_in_original_order() {
        let mut ids = IdGenerator::default();
        let records = store(&mut ids, &["a", "b", "c", "d"]);
        let selected = HashSet::from([records[3].id(), records[1].id()]);
        let after = duplicate_many(&records, &selected, &mut ids).unwrap();
        assert_eq!(names(&after), vec!["b", "d", "a", "b", "c", "d"]);

        let all_ids: HashSet<RecordId> = after.iter().map(Record::id).collect();
        assert_eq!(all_ids.len(), after.len());
    }

    #[test]
    fn duplicate_then_delete_copies_restores_store() {
        let mut ids = IdGenerator::default();
        let records = store(&mut ids, &["a", "b", "c"]);
        let selected = HashSet::from([records[0].id(), records[2].id()]);
        let duplicated = duplicate_many(&records, &selected, &mut ids).unwrap();

        let copies: HashSet<RecordId> = duplicated[..2].iter().map(Record::id).collect();
        let restored = delete_many(&duplicated, &copies).unwrap();
        assert_eq!(restored, records);
    }
}
