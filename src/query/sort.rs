//! Multi-key sorting of listings.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::QueryError;
use crate::query::listing::EntryInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(QueryError::UnknownOrder(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Size,
    Created,
    Modified,
    Extension,
}

impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "size" => Ok(SortKey::Size),
            "created" | "creation" | "date" => Ok(SortKey::Created),
            "modified" => Ok(SortKey::Modified),
            "ext" | "extension" => Ok(SortKey::Extension),
            other => Err(QueryError::UnknownCriterion(other.to_string())),
        }
    }
}

impl SortKey {
    fn compare(&self, a: &EntryInfo, b: &EntryInfo) -> Ordering {
        match self {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Size => a.size.cmp(&b.size),
            SortKey::Created => a.created.cmp(&b.created),
            SortKey::Modified => a.modified.cmp(&b.modified),
            SortKey::Extension => a.extension.cmp(&b.extension),
        }
    }
}

/// Parse an order token and a list of criteria tokens.
pub fn parse_sort<S: AsRef<str>>(
    order: &str,
    criteria: &[S],
) -> Result<(SortOrder, Vec<SortKey>), QueryError> {
    let order = order.parse()?;
    let keys = criteria
        .iter()
        .map(|c| c.as_ref().parse())
        .collect::<Result<Vec<SortKey>, _>>()?;
    Ok((order, keys))
}

/// Stable sort by `keys` left to right, then by name. `order` flips every key.
pub fn sort_entries(entries: &mut [EntryInfo], order: SortOrder, keys: &[SortKey]) {
    entries.sort_by(|a, b| {
        let ordering = keys
            .iter()
            .fold(Ordering::Equal, |acc, key| acc.then_with(|| key.compare(a, b)))
            .then_with(|| SortKey::Name.compare(a, b));

        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}
