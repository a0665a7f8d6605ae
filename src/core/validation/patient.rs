//! Rules for inbound patient rows

use super::{require, RowRules};
use crate::domain::patient::provided;
use crate::domain::{PatientRecord, Violation};
use chrono::Utc;
use std::collections::HashMap;

impl RowRules for PatientRecord {
    fn check_row(&self, row_index: usize, violations: &mut Vec<Violation>) {
        require(Some(self.identifier.as_str()), row_index, "Identifier", violations);
        require(Some(self.first_name.as_str()), row_index, "FirstName", violations);
        require(Some(self.last_name.as_str()), row_index, "LastName", violations);

        if let Some(identifier) = provided(Some(self.identifier.as_str())) {
            if identifier.contains('|') {
                violations.push(Violation::new(
                    row_index,
                    "Identifier",
                    format!("'{identifier}' must not contain '|'"),
                ));
            }
        }

        match self.birth_date {
            None => violations.push(Violation::new(
                row_index,
                "BirthDate",
                "'BirthDate' must not be empty",
            )),
            Some(date) if date > Utc::now().date_naive() => violations.push(Violation::new(
                row_index,
                "BirthDate",
                format!("'BirthDate' {date} is in the future"),
            )),
            Some(_) => {}
        }

        if let Some(email) = provided(self.email.as_deref()) {
            if !is_plausible_email(email) {
                violations.push(Violation::new(
                    row_index,
                    "Email",
                    format!("'{email}' is not a valid email address"),
                ));
            }
        }
    }

    fn check_batch(rows: &[Self], violations: &mut Vec<Violation>) {
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        for (row_index, row) in rows.iter().enumerate() {
            let Some(identifier) = row.identifier() else {
                continue;
            };
            match first_seen.get(identifier) {
                Some(first) => violations.push(Violation::new(
                    row_index,
                    "Identifier",
                    format!("duplicate identifier '{identifier}', first used in row {first}"),
                )),
                None => {
                    first_seen.insert(identifier, row_index);
                }
            }
        }
    }
}

fn is_plausible_email(value: &str) -> bool {
    let mut parts = value.split('@');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    )
}
