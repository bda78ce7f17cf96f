// src/process/join.rs

use std::collections::{HashMap, VecDeque};

use tracing::trace;

use super::table::{JoinedRecord, LongTable};

/// Left join application numbers to amounts on (identifier values, year),
/// keeping only rows where both values are present.
///
/// Amount records sharing a key are consumed in order, one per identifier
/// record, so no amount is used twice and the result is never larger than
/// either input.
pub fn join_long_tables(app_nos: &LongTable, amounts: &LongTable) -> Vec<JoinedRecord> {
    debug_assert_eq!(app_nos.id_columns, amounts.id_columns);

    let mut lookup: HashMap<(&[Option<String>], &str), VecDeque<Option<&str>>> =
        HashMap::with_capacity(amounts.len());
    for rec in &amounts.records {
        lookup
            .entry((rec.ids.as_slice(), rec.year.as_str()))
            .or_default()
            .push_back(rec.value.as_deref());
    }

    let mut joined = Vec::new();
    for rec in &app_nos.records {
        let amt = lookup
            .get_mut(&(rec.ids.as_slice(), rec.year.as_str()))
            .and_then(VecDeque::pop_front)
            .flatten();

        match (rec.value.as_deref(), amt) {
            (Some(app_no), Some(amt)) => joined.push(JoinedRecord {
                ids: rec.ids.clone(),
                year: rec.year.clone(),
                app_no: app_no.to_string(),
                amt: amt.to_string(),
            }),
            _ => trace!(year = %rec.year, "no filing for year"),
        }
    }
    joined
}
