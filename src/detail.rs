//! Detail view addressing. Resolving never fails hard: a malformed or unknown
//! identifier becomes a message for the user.

use std::fmt;

use tracing::debug;

use crate::dataset::Provider;
use crate::format::format_timestamp;
use crate::record::Record;

pub const ADDRESS_PREFIX: &str = "/details/";

pub fn address(id: u64) -> String {
    format!("{ADDRESS_PREFIX}{id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Found(Record),
    InvalidId(String),
    NotFound(i64),
}

impl DetailOutcome {
    pub fn title(&self) -> String {
        match self {
            DetailOutcome::Found(record) => record.name.clone(),
            DetailOutcome::InvalidId(_) => "Invalid ID".to_string(),
            DetailOutcome::NotFound(_) => "Item not found".to_string(),
        }
    }

    /// Field lines shown below the title.
    pub fn lines(&self) -> Vec<String> {
        match self {
            DetailOutcome::Found(record) => vec![
                format!("ID: {}", record.id),
                format!("Status: {}", record.status.as_str()),
                format!("Type: {}", record.item_type.as_str()),
                format!("Last Updated: {}", format_timestamp(&record.last_updated)),
                format!("Address: {}", address(record.id)),
            ],
            DetailOutcome::InvalidId(param) => vec![format!("\"{param}\" is not a valid id")],
            DetailOutcome::NotFound(id) => vec![format!("No item with id {id}")],
        }
    }
}

impl fmt::Display for DetailOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title())?;
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Accepts a bare id (`"42"`) or a full address (`"/details/42"`).
pub fn resolve(param: &str, provider: &dyn Provider) -> DetailOutcome {
    let trimmed = param.trim();
    let raw_id = trimmed.strip_prefix(ADDRESS_PREFIX).unwrap_or(trimmed);
    let outcome = match raw_id.parse::<i64>() {
        Err(_) => DetailOutcome::InvalidId(param.to_string()),
        Ok(id) if id < 1 => DetailOutcome::NotFound(id),
        Ok(id) => match provider.get_by_id(id as u64) {
            Some(record) => DetailOutcome::Found(record),
            None => DetailOutcome::NotFound(id),
        },
    };
    debug!("Resolved detail \"{}\" => {}", param, outcome.title());
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Generator;

    #[test]
    fn id_past_the_dataset_is_not_found() {
        let g = Generator::new(50_000);
        assert_eq!(resolve("50001", &g), DetailOutcome::NotFound(50_001));
        assert_eq!(resolve("50001", &g).title(), "Item not found");
    }

    #[test]
    fn non_numeric_id_is_invalid() {
        let g = Generator::new(10);
        let outcome = resolve("abc", &g);
        assert_eq!(outcome, DetailOutcome::InvalidId("abc".to_string()));
        assert_eq!(outcome.title(), "Invalid ID");
    }

    #[test]
    fn overflowing_id_is_invalid() {
        let g = Generator::new(10);
        assert!(matches!(
            resolve("99999999999999999999999", &g),
            DetailOutcome::InvalidId(_)
        ));
    }

    #[test]
    fn zero_and_negative_are_not_found() {
        let g = Generator::new(10);
        assert_eq!(resolve("0", &g), DetailOutcome::NotFound(0));
        assert_eq!(resolve("-3", &g), DetailOutcome::NotFound(-3));
    }

    #[test]
    fn address_round_trips_to_the_record() {
        let g = Generator::new(10);
        match resolve(&address(7), &g) {
            DetailOutcome::Found(record) => assert_eq!(record.id, 7),
            other => panic!("unexpected {other:?}"),
        }
        let text = resolve(" 8 ", &g).to_string();
        assert!(text.starts_with("Item 8\n"));
        assert!(text.contains("Status: Active"));
    }
}
