mod parser;

use std::io::Read;

use serde::{Deserialize, Serialize};

use super::domain::{AllocationInput, DemandInput, PersonInput, ProjectInput, TeamInput};
use parser::{parse_rows, AllocationRow, DemandRow, PersonRow, ProjectRow, TeamRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    People,
    Teams,
    Projects,
    Demands,
    Allocations,
}

impl ImportKind {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Teams,
            Self::People,
            Self::Projects,
            Self::Demands,
            Self::Allocations,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::People => "people",
            Self::Teams => "teams",
            Self::Projects => "projects",
            Self::Demands => "demands",
            Self::Allocations => "allocations",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.as_str() == value)
    }
}

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidValue {
        line: u64,
        field: &'static str,
        value: String,
    },
}

impl ImportError {
    pub(crate) fn invalid(line: u64, field: &'static str, value: &str) -> Self {
        Self::InvalidValue {
            line,
            field,
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read CSV import: {}", err),
            ImportError::Csv(err) => write!(f, "invalid CSV data: {}", err),
            ImportError::InvalidValue { line, field, value } => {
                write!(f, "line {}: invalid {} value '{}'", line, field, value)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidValue { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Parsed rows of one import file, each tagged with its source line.
#[derive(Debug)]
pub enum ImportBatch {
    People(Vec<(u64, PersonInput)>),
    Teams(Vec<(u64, TeamInput)>),
    Projects(Vec<(u64, ProjectInput)>),
    Demands(Vec<(u64, DemandInput)>),
    Allocations(Vec<(u64, AllocationInput)>),
}

impl ImportBatch {
    pub fn parse<R: Read>(kind: ImportKind, reader: R) -> Result<Self, ImportError> {
        Ok(match kind {
            ImportKind::People => {
                Self::People(convert(parse_rows(reader)?, PersonRow::into_input)?)
            }
            ImportKind::Teams => Self::Teams(convert(parse_rows(reader)?, TeamRow::into_input)?),
            ImportKind::Projects => {
                Self::Projects(convert(parse_rows(reader)?, ProjectRow::into_input)?)
            }
            ImportKind::Demands => {
                Self::Demands(convert(parse_rows(reader)?, DemandRow::into_input)?)
            }
            ImportKind::Allocations => {
                Self::Allocations(convert(parse_rows(reader)?, AllocationRow::into_input)?)
            }
        })
    }

    pub fn kind(&self) -> ImportKind {
        match self {
            Self::People(_) => ImportKind::People,
            Self::Teams(_) => ImportKind::Teams,
            Self::Projects(_) => ImportKind::Projects,
            Self::Demands(_) => ImportKind::Demands,
            Self::Allocations(_) => ImportKind::Allocations,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::People(rows) => rows.len(),
            Self::Teams(rows) => rows.len(),
            Self::Projects(rows) => rows.len(),
            Self::Demands(rows) => rows.len(),
            Self::Allocations(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn convert<Row, Input>(
    rows: Vec<(u64, Row)>,
    into_input: fn(Row, u64) -> Result<Input, ImportError>,
) -> Result<Vec<(u64, Input)>, ImportError> {
    rows.into_iter()
        .map(|(line, row)| Ok((line, into_input(row, line)?)))
        .collect()
}

/// Outcome of a completed import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub kind: ImportKind,
    pub created: Vec<i64>,
}
