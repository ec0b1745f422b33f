//! File info projection
//!
//! Renders the most recent query result as rows, keeping, dropping or
//! reformatting fields as requested. Tokens:
//!
//! - `field` or `+field` keeps a field; once any field is kept only kept
//!   fields are shown, in the order they were named
//! - `-field` drops a field
//! - `field:format` reformats a field and keeps it
//!
//! With no tokens every field is shown in its default order.

use std::str::FromStr;

use crate::error::QueryError;
use crate::query::listing::{EntryInfo, Listing};

const SEPARATOR: &str = "|";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Path,
    Type,
    Size,
    Extension,
    Created,
    Modified,
}

impl Field {
    const ALL: [Field; 7] = [
        Field::Name,
        Field::Path,
        Field::Type,
        Field::Size,
        Field::Extension,
        Field::Created,
        Field::Modified,
    ];

    fn default_format(&self) -> FieldFormat {
        match self {
            Field::Size => FieldFormat::Bytes,
            Field::Created | Field::Modified => FieldFormat::Rfc3339,
            _ => FieldFormat::Plain,
        }
    }

    fn accepts(&self, format: FieldFormat) -> bool {
        match self {
            Field::Size => matches!(
                format,
                FieldFormat::Bytes | FieldFormat::Kilobytes | FieldFormat::Megabytes | FieldFormat::Human
            ),
            Field::Created | Field::Modified => matches!(
                format,
                FieldFormat::Rfc3339 | FieldFormat::Date | FieldFormat::Unix
            ),
            _ => format == FieldFormat::Plain,
        }
    }
}

impl FromStr for Field {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Field::Name),
            "path" => Ok(Field::Path),
            "type" => Ok(Field::Type),
            "size" => Ok(Field::Size),
            "ext" | "extension" => Ok(Field::Extension),
            "created" | "creation" => Ok(Field::Created),
            "modified" => Ok(Field::Modified),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Plain,
    Bytes,
    Kilobytes,
    Megabytes,
    Human,
    Rfc3339,
    Date,
    Unix,
}

impl FromStr for FieldFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(FieldFormat::Plain),
            "bytes" => Ok(FieldFormat::Bytes),
            "kb" => Ok(FieldFormat::Kilobytes),
            "mb" => Ok(FieldFormat::Megabytes),
            "human" => Ok(FieldFormat::Human),
            "rfc3339" => Ok(FieldFormat::Rfc3339),
            "date" => Ok(FieldFormat::Date),
            "unix" => Ok(FieldFormat::Unix),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modification {
    Keep(Field),
    Drop(Field),
    Format(Field, FieldFormat),
}

impl FromStr for Modification {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        let unknown = || QueryError::UnknownModification(s.to_string());

        if let Some(field) = token.strip_prefix('-') {
            return field.parse().map(Modification::Drop).map_err(|_| unknown());
        }

        let token = token.strip_prefix('+').unwrap_or(&token);
        match token.split_once(':') {
            Some((field, format)) => {
                let field: Field = field.parse().map_err(|_| unknown())?;
                let format: FieldFormat = format.parse().map_err(|_| unknown())?;
                if !field.accepts(format) {
                    return Err(unknown());
                }
                Ok(Modification::Format(field, format))
            }
            None => token.parse().map(Modification::Keep).map_err(|_| unknown()),
        }
    }
}

/// A resolved set of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoFilter {
    columns: Vec<(Field, FieldFormat)>,
}

impl Default for InfoFilter {
    fn default() -> Self {
        Self {
            columns: Field::ALL.iter().map(|f| (*f, f.default_format())).collect(),
        }
    }
}

impl InfoFilter {
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, QueryError> {
        let modifications = tokens
            .iter()
            .map(|t| t.as_ref().parse())
            .collect::<Result<Vec<Modification>, _>>()?;
        Ok(Self::from_modifications(&modifications))
    }

    pub fn from_modifications(modifications: &[Modification]) -> Self {
        let keeps_any = modifications
            .iter()
            .any(|m| matches!(m, Modification::Keep(_) | Modification::Format(..)));

        let mut filter = if keeps_any {
            Self { columns: Vec::new() }
        } else {
            Self::default()
        };

        for modification in modifications {
            match *modification {
                Modification::Keep(field) => filter.upsert(field, None),
                Modification::Format(field, format) => filter.upsert(field, Some(format)),
                Modification::Drop(_) => {}
            }
        }
        for modification in modifications {
            if let Modification::Drop(field) = modification {
                filter.columns.retain(|(f, _)| f != field);
            }
        }
        filter
    }

    fn upsert(&mut self, field: Field, format: Option<FieldFormat>) {
        match self.columns.iter_mut().find(|(f, _)| *f == field) {
            Some(column) => {
                if let Some(format) = format {
                    column.1 = format;
                }
            }
            None => self
                .columns
                .push((field, format.unwrap_or_else(|| field.default_format()))),
        }
    }

    pub fn render(&self, entry: &EntryInfo) -> String {
        self.columns
            .iter()
            .map(|(field, format)| render_field(entry, *field, *format))
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    pub fn apply(&self, listing: &Listing) -> Vec<String> {
        listing.entries.iter().map(|e| self.render(e)).collect()
    }
}

fn render_field(entry: &EntryInfo, field: Field, format: FieldFormat) -> String {
    match field {
        Field::Name => entry.name.clone(),
        Field::Path => entry.path.clone(),
        Field::Type => entry.node_type.as_str().to_string(),
        Field::Extension => entry.extension.clone().unwrap_or_else(|| "-".to_string()),
        Field::Size => format_size(entry.size, format),
        Field::Created => format_time(entry.created, format),
        Field::Modified => format_time(entry.modified, format),
    }
}

fn format_size(bytes: u64, format: FieldFormat) -> String {
    const KB: f64 = 1024.0;
    let value = bytes as f64;
    match format {
        FieldFormat::Kilobytes => format!("{:.1}KB", value / KB),
        FieldFormat::Megabytes => format!("{:.1}MB", value / (KB * KB)),
        FieldFormat::Human => {
            if value < KB {
                format!("{bytes}B")
            } else if value < KB * KB {
                format!("{:.1}KB", value / KB)
            } else if value < KB * KB * KB {
                format!("{:.1}MB", value / (KB * KB))
            } else {
                format!("{:.1}GB", value / (KB * KB * KB))
            }
        }
        _ => bytes.to_string(),
    }
}

fn format_time(at: chrono::DateTime<chrono::Utc>, format: FieldFormat) -> String {
    match format {
        FieldFormat::Date => at.format("%Y-%m-%d").to_string(),
        FieldFormat::Unix => at.timestamp().to_string(),
        _ => at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    }
}
