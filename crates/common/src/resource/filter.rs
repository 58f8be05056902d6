//! Collection query parsing
//!
//! Turns decoded query pairs into typed filter conditions, using the
//! `filter` column of the resource's field table. Parameters that do not
//! name a filterable field are ignored; malformed range or boolean values
//! skip the filter instead of failing the request.

use super::{ApiResource, FilterKind, PropertySelection};
use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Gt(i64),
    Gte(i64),
    Lt(i64),
    Lte(i64),
    Between(i64, i64),
}

impl RangeBound {
    fn parse(operator: &str, raw: &str) -> Option<Self> {
        let number = |s: &str| s.trim().parse::<i64>().ok();
        match operator {
            "gt" => number(raw).map(RangeBound::Gt),
            "gte" => number(raw).map(RangeBound::Gte),
            "lt" => number(raw).map(RangeBound::Lt),
            "lte" => number(raw).map(RangeBound::Lte),
            "between" => {
                let (low, high) = raw.split_once("..")?;
                Some(RangeBound::Between(number(low)?, number(high)?))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCondition<P> {
    /// Value contains `term`
    Partial { property: P, term: String },
    Range { property: P, bound: RangeBound },
    Boolean { property: P, value: bool },
}

/// Parsed query of a collection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery<P> {
    /// 1-based page number
    pub page: u64,
    pub filters: Vec<FilterCondition<P>>,
    pub properties: Option<PropertySelection>,
}

impl<P> Default for CollectionQuery<P> {
    fn default() -> Self {
        Self {
            page: 1,
            filters: Vec::new(),
            properties: None,
        }
    }
}

/// Split `value[gt]` into `("value", Some("gt"))`
fn split_key(key: &str) -> (&str, Option<&str>) {
    match key.split_once('[') {
        Some((name, rest)) => (name, rest.strip_suffix(']')),
        None => (key, None),
    }
}

fn parse_page(raw: &str, last_page: u64) -> Result<u64> {
    let invalid = |message: String| AppError::Validation {
        message,
        field: Some("page".to_string()),
    };

    match raw.parse::<u64>() {
        Ok(page) if page > last_page => Err(invalid(format!("Page should not be greater than {}", last_page))),
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(invalid("Page should not be less than 1".to_string())),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

impl<P: Copy + 'static> CollectionQuery<P> {
    pub fn parse<R>(pairs: &[(String, String)]) -> Result<Self>
    where
        R: ApiResource<Property = P>,
    {
        let mut query = Self::default();

        // row offsets have to fit a signed 64-bit integer
        let last_page = i64::MAX as u64 / R::metadata().items_per_page.max(1);

        if R::metadata().property_filter {
            query.properties = PropertySelection::from_query(pairs);
        }

        for (key, raw) in pairs {
            if key == "page" {
                query.page = parse_page(raw, last_page)?;
                continue;
            }

            let (name, operator) = split_key(key);
            let Some((property, kind)) = R::fields()
                .iter()
                .find(|f| f.name == name && f.filter.is_some())
                .and_then(|f| f.filter.map(|kind| (f.property, kind)))
            else {
                continue;
            };

            let condition = match (kind, operator) {
                (FilterKind::SearchPartial, None) if !raw.is_empty() => Some(FilterCondition::Partial {
                    property,
                    term: raw.clone(),
                }),
                (FilterKind::Range, Some(op)) => RangeBound::parse(op, raw)
                    .map(|bound| FilterCondition::Range { property, bound }),
                (FilterKind::Boolean, None) => {
                    parse_bool(raw).map(|value| FilterCondition::Boolean { property, value })
                }
                _ => None,
            };

            match condition {
                Some(condition) => query.filters.push(condition),
                None => tracing::warn!(
                    parameter = %key,
                    value = %raw,
                    "Ignoring malformed filter parameter"
                ),
            }
        }

        Ok(query)
    }

    /// Zero-based page index for paginators
    pub fn page_index(&self) -> u64 {
        self.page - 1
    }
}
