//! Processing order of configuration sections.
//!
//! Sections that declare an integer `order` key come first, ascending.
//! Sections without one follow, sorted by name.

use super::error::ConfigError;
use super::source::SectionReader;
use std::cmp::Ordering;

pub const ORDER_KEY: &str = "order";

/// A section name together with its declared `order`, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionKey {
    pub name: String,
    pub order: Option<i64>,
}

impl SectionKey {
    pub fn new(name: impl Into<String>, order: Option<i64>) -> Self {
        Self {
            name: name.into(),
            order,
        }
    }

    /// Read the section's `order` key. A value that is not an integer is fatal.
    pub fn read(reader: &SectionReader<'_>, name: &str) -> Result<Self, ConfigError> {
        if !reader.has_option(name, ORDER_KEY) {
            return Ok(Self::new(name, None));
        }

        let value = reader.get(name, ORDER_KEY)?;
        let order = value
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::MalformedOrderValue {
                section: name.to_string(),
                value,
            })?;
        Ok(Self::new(name, Some(order)))
    }
}

/// Compare two sections for processing order.
pub fn compare_sections(a: &SectionKey, b: &SectionKey) -> Ordering {
    match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (None, None) => a.name.cmp(&b.name),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
    }
}

/// Sort section names for processing. The sort is stable, so sections with
/// equal `order` keep their relative input order.
pub fn order_sections<'s, I>(reader: &SectionReader<'_>, names: I) -> Result<Vec<String>, ConfigError>
where
    I: IntoIterator<Item = &'s str>,
{
    let mut keys = names
        .into_iter()
        .map(|name| SectionKey::read(reader, name))
        .collect::<Result<Vec<_>, _>>()?;

    keys.sort_by(compare_sections);

    Ok(keys.into_iter().map(|key| key.name).collect())
}
