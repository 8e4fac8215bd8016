// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Derived views over fetched collections.
//!
//! [`compute_visible_rows`] narrows a collection with a [`FilterState`] and
//! orders it with a [`SortState`]. It never mutates its input and never
//! fails: missing numbers compare as zero, missing text as the empty string,
//! and missing timestamps never satisfy an active date range.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::SortDirection;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Option<f64>),
    Bool(bool),
    Timestamp(Option<OffsetDateTime>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Number(Some(value)) => format_number(*value),
            Self::Number(None) => String::new(),
            Self::Bool(true) => "yes".to_owned(),
            Self::Bool(false) => "no".to_owned(),
            Self::Timestamp(Some(value)) => value.to_offset(UtcOffset::UTC).date().to_string(),
            Self::Timestamp(None) => String::new(),
        }
    }

    /// Numeric view of the value. Absent numbers count as zero.
    pub fn number(&self) -> f64 {
        match self {
            Self::Number(value) => value.unwrap_or(0.0),
            Self::Bool(value) => f64::from(u8::from(*value)),
            Self::Text(value) => value.trim().parse().unwrap_or(0.0),
            Self::Timestamp(_) => 0.0,
        }
    }

    /// Normalized key used for categorical membership.
    pub fn selection_key(&self) -> String {
        match self {
            Self::Bool(value) => value.to_string(),
            Self::Number(_) => format_number(self.number()),
            _ => normalize_key(&self.display()),
        }
    }

    fn is_unset_timestamp(&self) -> bool {
        matches!(self, Self::Timestamp(None))
    }

    pub fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(_), Self::Number(_)) => self.number().total_cmp(&other.number()),
            (Self::Bool(left), Self::Bool(right)) => left.cmp(right),
            (Self::Timestamp(left), Self::Timestamp(right)) => left.cmp(right),
            (Self::Text(left), Self::Text(right)) => {
                left.to_lowercase().cmp(&right.to_lowercase())
            }
            _ => self
                .display()
                .to_lowercase()
                .cmp(&other.display().to_lowercase()),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A row the engine can filter and sort.
pub trait Record {
    type Field: Copy + Ord + fmt::Debug;

    fn id(&self) -> i64;

    fn value(&self, field: Self::Field) -> FieldValue;

    /// Concatenation of the fields free-text search looks at.
    fn search_text(&self) -> String;
}

/// Categorical restriction for one field.
///
/// There is no way to hold an empty `OneOf`: building a selection from an
/// empty set, or toggling its last value off, yields [`Selection::Any`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    Any,
    OneOf(BTreeSet<String>),
}

static ANY_SELECTION: Selection = Selection::Any;

impl Selection {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = values
            .into_iter()
            .map(|value| normalize_key(value.as_ref()))
            .filter(|value| !value.is_empty())
            .collect::<BTreeSet<String>>();
        if set.is_empty() {
            Self::Any
        } else {
            Self::OneOf(set)
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::Any => false,
            Self::OneOf(set) => set.contains(&normalize_key(value)),
        }
    }

    pub fn toggle(&mut self, value: &str) {
        let key = normalize_key(value);
        if key.is_empty() {
            return;
        }
        match self {
            Self::Any => {
                *self = Self::OneOf(BTreeSet::from([key]));
            }
            Self::OneOf(set) => {
                if !set.remove(&key) {
                    set.insert(key);
                }
                if set.is_empty() {
                    *self = Self::Any;
                }
            }
        }
    }

    pub fn matches(&self, value: &FieldValue) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(set) => set.contains(&value.selection_key()),
        }
    }
}

/// Inclusive numeric bounds; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub const fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_unset(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Missing values are compared as zero.
    pub fn contains(&self, value: Option<f64>) -> bool {
        let value = value.unwrap_or(0.0);
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    /// Parses `min..max`, where either side may be blank.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }
        let Some((min, max)) = raw.split_once("..") else {
            bail!("invalid range {raw:?}; use min..max, ..max, or min..");
        };
        let range = Self {
            min: parse_bound(min)?,
            max: parse_bound(max)?,
        };
        if let (Some(min), Some(max)) = (range.min, range.max)
            && min > max
        {
            bail!("range minimum {min} is above maximum {max}");
        }
        Ok(range)
    }
}

fn parse_bound(raw: &str) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .with_context(|| format!("invalid number {raw:?} in range"))?;
    if !value.is_finite() {
        bail!("range bound {raw:?} must be a finite number");
    }
    Ok(Some(value))
}

/// Inclusive calendar-day bounds.
///
/// `from` covers its whole day from midnight and `to` covers its whole day up
/// to the next midnight, both in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl DateRange {
    pub const fn new(from: Option<Date>, to: Option<Date>) -> Self {
        Self { from, to }
    }

    pub fn is_unset(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, value: Option<OffsetDateTime>) -> bool {
        if self.is_unset() {
            return true;
        }
        let Some(value) = value else {
            return false;
        };
        let value = value.to_offset(UtcOffset::UTC);

        if let Some(from) = self.from
            && value < from.midnight().assume_utc()
        {
            return false;
        }
        if let Some(to) = self.to
            && let Some(next_day) = to.next_day()
            && value >= next_day.midnight().assume_utc()
        {
            return false;
        }
        true
    }

    /// Parses `YYYY-MM-DD..YYYY-MM-DD`, where either side may be blank.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }
        let Some((from, to)) = raw.split_once("..") else {
            bail!("invalid date range {raw:?}; use YYYY-MM-DD..YYYY-MM-DD");
        };
        let range = Self {
            from: parse_day(from)?,
            to: parse_day(to)?,
        };
        if let (Some(from), Some(to)) = (range.from, range.to)
            && to < from
        {
            bail!("date range ends ({to}) before it starts ({from})");
        }
        Ok(range)
    }
}

fn parse_day(raw: &str) -> Result<Option<Date>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let date = Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid date {raw:?}; use YYYY-MM-DD"))?;
    Ok(Some(date))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFilter<F> {
    pub field: F,
    pub range: DateRange,
}

/// Active predicates for one list view. Every predicate is opt-in narrowing.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState<F: Ord> {
    query: String,
    selections: BTreeMap<F, Selection>,
    ranges: BTreeMap<F, NumericRange>,
    date_range: Option<DateFilter<F>>,
}

impl<F: Ord> Default for FilterState<F> {
    fn default() -> Self {
        Self {
            query: String::new(),
            selections: BTreeMap::new(),
            ranges: BTreeMap::new(),
            date_range: None,
        }
    }
}

impl<F: Ord + Copy> FilterState<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn selection(&self, field: F) -> &Selection {
        self.selections.get(&field).unwrap_or(&ANY_SELECTION)
    }

    pub fn set_selection(&mut self, field: F, selection: Selection) {
        if selection.is_any() {
            self.selections.remove(&field);
        } else {
            self.selections.insert(field, selection);
        }
    }

    pub fn toggle_value(&mut self, field: F, value: &str) {
        let mut selection = self.selection(field).clone();
        selection.toggle(value);
        self.set_selection(field, selection);
    }

    pub fn range(&self, field: F) -> NumericRange {
        self.ranges.get(&field).copied().unwrap_or_default()
    }

    pub fn set_range(&mut self, field: F, range: NumericRange) {
        if range.is_unset() {
            self.ranges.remove(&field);
        } else {
            self.ranges.insert(field, range);
        }
    }

    pub fn date_range(&self) -> Option<&DateFilter<F>> {
        self.date_range.as_ref()
    }

    pub fn set_date_range(&mut self, filter: Option<DateFilter<F>>) {
        self.date_range = filter.filter(|filter| !filter.range.is_unset());
    }

    pub fn active_count(&self) -> usize {
        usize::from(!self.query.trim().is_empty())
            + self.selections.len()
            + self.ranges.len()
            + usize::from(self.date_range.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn matches<R>(&self, record: &R) -> bool
    where
        R: Record<Field = F>,
    {
        let needle = self.query.trim().to_lowercase();
        if !needle.is_empty() && !record.search_text().to_lowercase().contains(&needle) {
            return false;
        }

        let selections_pass = self
            .selections
            .iter()
            .all(|(field, selection)| selection.matches(&record.value(*field)));
        if !selections_pass {
            return false;
        }

        let ranges_pass = self.ranges.iter().all(|(field, range)| {
            let value = match record.value(*field) {
                FieldValue::Number(value) => value,
                other => Some(other.number()),
            };
            range.contains(value)
        });
        if !ranges_pass {
            return false;
        }

        match &self.date_range {
            Some(filter) => match record.value(filter.field) {
                FieldValue::Timestamp(value) => filter.range.contains(value),
                _ => filter.range.contains(None),
            },
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<F> {
    pub field: F,
    pub direction: SortDirection,
}

/// At most one active sort column. Without one, input order is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<F> {
    spec: Option<SortSpec<F>>,
}

impl<F> Default for SortState<F> {
    fn default() -> Self {
        Self { spec: None }
    }
}

impl<F: Copy + PartialEq> SortState<F> {
    pub fn by(field: F, direction: SortDirection) -> Self {
        Self {
            spec: Some(SortSpec { field, direction }),
        }
    }

    pub fn spec(&self) -> Option<SortSpec<F>> {
        self.spec
    }

    /// Flips direction when `field` is already sorted, otherwise sorts it
    /// ascending.
    pub fn toggle(&mut self, field: F) -> SortSpec<F> {
        let direction = match self.spec {
            Some(spec) if spec.field == field => match spec.direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            },
            _ => SortDirection::Asc,
        };
        let spec = SortSpec { field, direction };
        self.spec = Some(spec);
        spec
    }

    pub fn clear(&mut self) {
        self.spec = None;
    }
}

fn compare_for_sort(left: &FieldValue, right: &FieldValue, direction: SortDirection) -> Ordering {
    let left_unset = left.is_unset_timestamp();
    let right_unset = right.is_unset_timestamp();
    match (left_unset, right_unset) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match direction {
            SortDirection::Asc => left.cmp_value(right),
            SortDirection::Desc => left.cmp_value(right).reverse(),
        },
    }
}

/// Positions in `records` of the rows to display, in display order.
pub fn visible_indices<R: Record>(
    records: &[R],
    filters: &FilterState<R::Field>,
    sort: &SortState<R::Field>,
) -> Vec<usize> {
    let indices = records
        .iter()
        .enumerate()
        .filter(|(_, record)| filters.matches(*record))
        .map(|(index, _)| index)
        .collect::<Vec<usize>>();

    let Some(spec) = sort.spec() else {
        return indices;
    };

    let keys = indices
        .iter()
        .map(|index| records[*index].value(spec.field))
        .collect::<Vec<FieldValue>>();
    let mut order = (0..indices.len()).collect::<Vec<usize>>();
    // `sort_by` is stable, so equal keys keep their input order.
    order.sort_by(|left, right| compare_for_sort(&keys[*left], &keys[*right], spec.direction));
    order.into_iter().map(|position| indices[position]).collect()
}

pub fn compute_visible_rows<'a, R: Record>(
    records: &'a [R],
    filters: &FilterState<R::Field>,
    sort: &SortState<R::Field>,
) -> Vec<&'a R> {
    visible_indices(records, filters, sort)
        .into_iter()
        .map(|index| &records[index])
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
struct CacheKey<F: Ord> {
    generation: u64,
    filters: FilterState<F>,
    sort: SortState<F>,
}

/// Memoized [`visible_indices`], keyed on the data generation, the filters,
/// and the sort together.
#[derive(Debug, Clone)]
pub struct ViewCache<F: Ord> {
    key: Option<CacheKey<F>>,
    indices: Vec<usize>,
    recomputations: u64,
}

impl<F: Ord> Default for ViewCache<F> {
    fn default() -> Self {
        Self {
            key: None,
            indices: Vec::new(),
            recomputations: 0,
        }
    }
}

impl<F: Ord + Copy> ViewCache<F> {
    pub fn indices<R>(
        &mut self,
        generation: u64,
        records: &[R],
        filters: &FilterState<F>,
        sort: &SortState<F>,
    ) -> &[usize]
    where
        R: Record<Field = F>,
    {
        let fresh = self.key.as_ref().is_some_and(|key| {
            key.generation == generation && &key.filters == filters && &key.sort == sort
        });
        if !fresh {
            self.indices = visible_indices(records, filters, sort);
            self.key = Some(CacheKey {
                generation,
                filters: filters.clone(),
                sort: *sort,
            });
            self.recomputations += 1;
        }
        &self.indices
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}
