use crate::cycles::{CycleSet, EnergeticsOutput};
use serde::{ser::SerializeMap, Serialize, Serializer};

/// The cycle set handed back to callers, optionally keyed by condition and subject.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Flat(CycleSet),
    Condition {
        condition: String,
        result: CycleSet,
    },
    Subject {
        subject: String,
        result: CycleSet,
    },
    ConditionSubject {
        condition: String,
        subject: String,
        result: CycleSet,
    },
}

impl Report {
    /// Package the band-filtered subset when a band was applied, else every cycle.
    pub fn assemble(
        output: EnergeticsOutput,
        condition: Option<String>,
        subject: Option<String>,
    ) -> Self {
        let result = output.valid.unwrap_or(output.cycles);
        match (condition, subject) {
            (None, None) => Report::Flat(result),
            (Some(condition), None) => Report::Condition { condition, result },
            (None, Some(subject)) => Report::Subject { subject, result },
            (Some(condition), Some(subject)) => Report::ConditionSubject {
                condition,
                subject,
                result,
            },
        }
    }

    pub fn result(&self) -> &CycleSet {
        match self {
            Report::Flat(result)
            | Report::Condition { result, .. }
            | Report::Subject { result, .. }
            | Report::ConditionSubject { result, .. } => result,
        }
    }
}

struct Keyed<'a, T: Serialize>(&'a str, &'a T);

impl<T: Serialize> Serialize for Keyed<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, self.1)?;
        map.end()
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Report::Flat(result) => result.serialize(serializer),
            Report::Condition { condition, result } => {
                Keyed(condition, result).serialize(serializer)
            }
            Report::Subject { subject, result } => Keyed(subject, result).serialize(serializer),
            Report::ConditionSubject {
                condition,
                subject,
                result,
            } => Keyed(condition, &Keyed(subject, result)).serialize(serializer),
        }
    }
}
