//! Typed location handles into the entity graph.
//!
//! Every entity kind declares its addressable fields once, through the
//! [`addressable!`] table. Path resolution then walks [`SlotRef`] (shared) or
//! [`Slot`] (mutable) handles one [`Step`] at a time, so a resolved location
//! always knows what kind of storage it points at.

use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::Value;

/// One step along a path, after the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'s> {
    /// Field name, map key, or entity key inside a record list.
    Field(&'s str),
    /// Position inside a sequence.
    Index(usize),
}

/// Errors raised when a value does not fit a typed location.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SlotError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{value} is out of range for {expected}")]
    OutOfRange { value: f64, expected: &'static str },

    #[error("'{value}' is not one of {expected:?}")]
    UnknownVariant {
        value: String,
        expected: &'static [&'static str],
    },

    #[error("cannot build record: {0}")]
    InvalidRecord(String),

    #[error("record has no field '{0}'")]
    UnknownField(String),

    #[error("key '{0}' is already taken")]
    DuplicateKey(String),
}

impl SlotError {
    fn mismatch(expected: &'static str, found: &Value) -> Self {
        SlotError::TypeMismatch {
            expected,
            found: found.kind(),
        }
    }
}

/// A record whose fields can be addressed by name.
pub trait Addressable {
    /// Addressable field names, in declaration order.
    fn field_names(&self) -> &'static [&'static str];

    fn field(&self, name: &str) -> Option<SlotRef<'_>>;

    fn field_mut(&mut self, name: &str) -> Option<Slot<'_>>;

    /// Key used for lookup inside a record list (usually the `id`).
    fn key(&self) -> Option<&str> {
        None
    }

    /// Name of the field that holds [`Addressable::key`].
    fn key_field(&self) -> Option<&'static str> {
        None
    }

    /// Snapshot the record as a map value.
    fn to_value(&self) -> Value {
        Value::Map(
            self.field_names()
                .iter()
                .filter_map(|name| self.field(name).map(|slot| (name.to_string(), slot.to_value())))
                .collect(),
        )
    }
}

/// A text-spelled enum field (statuses, seasons).
pub trait Keyword {
    fn as_str(&self) -> &'static str;

    fn variants(&self) -> &'static [&'static str];

    /// Set from its spelling; returns `false` if the spelling is unknown.
    fn set_str(&mut self, raw: &str) -> bool;
}

/// An ordered list of records of one entity kind.
pub trait RecordList {
    fn len(&self) -> usize;

    fn record(&self, index: usize) -> Option<&dyn Addressable>;

    fn record_mut(&mut self, index: usize) -> Option<&mut dyn Addressable>;

    /// Check that `value` would build a record whose key is not yet taken.
    fn check_value(&self, value: &Value) -> Result<(), SlotError>;

    /// Check that `values` would build a list of valid records with
    /// distinct keys.
    fn check_values(&self, values: &[Value]) -> Result<(), SlotError>;

    fn push_value(&mut self, value: &Value) -> Result<(), SlotError>;

    /// Replace the whole list; nothing changes if any item is invalid.
    fn replace_values(&mut self, values: &[Value]) -> Result<(), SlotError>;

    fn remove_at(&mut self, index: usize);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear scan for the record whose key equals `key`.
    fn position_of(&self, key: &str) -> Option<usize> {
        (0..self.len()).find(|&i| self.record(i).and_then(|r| r.key()) == Some(key))
    }

    fn to_value(&self) -> Value {
        Value::List(
            (0..self.len())
                .filter_map(|i| self.record(i).map(|r| r.to_value()))
                .collect(),
        )
    }
}

fn build_record<T: DeserializeOwned>(value: &Value) -> Result<T, SlotError> {
    serde_json::from_value(value.to_json()).map_err(|e| SlotError::InvalidRecord(e.to_string()))
}

fn build_records<T>(values: &[Value]) -> Result<Vec<T>, SlotError>
where
    T: Addressable + DeserializeOwned,
{
    let records = values
        .iter()
        .map(build_record::<T>)
        .collect::<Result<Vec<T>, _>>()?;
    {
        let mut seen = BTreeSet::new();
        for key in records.iter().filter_map(|r| r.key()) {
            if !seen.insert(key) {
                return Err(SlotError::DuplicateKey(key.to_string()));
            }
        }
    }
    Ok(records)
}

impl<T> RecordList for Vec<T>
where
    T: Addressable + DeserializeOwned,
{
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn record(&self, index: usize) -> Option<&dyn Addressable> {
        self.get(index).map(|r| r as &dyn Addressable)
    }

    fn record_mut(&mut self, index: usize) -> Option<&mut dyn Addressable> {
        self.get_mut(index).map(|r| r as &mut dyn Addressable)
    }

    fn check_value(&self, value: &Value) -> Result<(), SlotError> {
        let record = build_record::<T>(value)?;
        match record.key() {
            Some(key) if self.position_of(key).is_some() => Err(SlotError::DuplicateKey(key.to_string())),
            _ => Ok(()),
        }
    }

    fn check_values(&self, values: &[Value]) -> Result<(), SlotError> {
        build_records::<T>(values).map(|_| ())
    }

    fn push_value(&mut self, value: &Value) -> Result<(), SlotError> {
        self.check_value(value)?;
        self.push(build_record(value)?);
        Ok(())
    }

    fn replace_values(&mut self, values: &[Value]) -> Result<(), SlotError> {
        *self = build_records(values)?;
        Ok(())
    }

    fn remove_at(&mut self, index: usize) {
        if index < Vec::len(self) {
            self.remove(index);
        }
    }
}

/// How `remove` picks the element to drop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Match<'m> {
    /// Element equal to the value.
    Equals(&'m Value),
    /// Record whose field `key` equals `value`.
    FieldEquals { key: &'m str, value: &'m Value },
}

/// Shared handle to one location.
#[derive(Clone, Copy)]
pub enum SlotRef<'a> {
    Record(&'a dyn Addressable),
    Records(&'a dyn RecordList),
    Numbers(&'a BTreeMap<String, f64>),
    Flags(&'a BTreeMap<String, bool>),
    Texts(&'a Vec<String>),
    Ids(&'a BTreeSet<String>),
    Number(&'a f64),
    Count(&'a u64),
    Flag(&'a bool),
    Text(&'a String),
    OptText(&'a Option<String>),
    Keyword(&'a dyn Keyword),
    Value(&'a Value),
}

impl<'a> SlotRef<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            SlotRef::Record(_) => "record",
            SlotRef::Records(_) => "record list",
            SlotRef::Numbers(_) => "number map",
            SlotRef::Flags(_) => "flag map",
            SlotRef::Texts(_) => "text list",
            SlotRef::Ids(_) => "id set",
            SlotRef::Number(_) | SlotRef::Count(_) => "number",
            SlotRef::Flag(_) => "bool",
            SlotRef::Text(_) | SlotRef::OptText(_) | SlotRef::Keyword(_) => "text",
            SlotRef::Value(v) => v.kind(),
        }
    }

    /// Descend one step; `None` if the step does not exist here.
    pub fn step(self, step: Step<'_>) -> Option<SlotRef<'a>> {
        match (self, step) {
            (SlotRef::Record(r), Step::Field(name)) => r.field(name),
            (SlotRef::Records(list), Step::Index(i)) => list.record(i).map(SlotRef::Record),
            (SlotRef::Records(list), Step::Field(key)) => list
                .position_of(key)
                .and_then(|i| list.record(i))
                .map(SlotRef::Record),
            (SlotRef::Numbers(map), Step::Field(key)) => map.get(key).map(SlotRef::Number),
            (SlotRef::Flags(map), Step::Field(key)) => map.get(key).map(SlotRef::Flag),
            (SlotRef::Texts(items), Step::Index(i)) => items.get(i).map(SlotRef::Text),
            (SlotRef::Value(Value::Map(map)), Step::Field(key)) => map.get(key).map(SlotRef::Value),
            (SlotRef::Value(Value::List(items)), Step::Field(key)) => {
                items.iter().find(|v| v.has_id(key)).map(SlotRef::Value)
            }
            (SlotRef::Value(Value::List(items)), Step::Index(i)) => items.get(i).map(SlotRef::Value),
            _ => None,
        }
    }

    /// Read the location as a value.
    pub fn to_value(&self) -> Value {
        match self {
            SlotRef::Record(r) => r.to_value(),
            SlotRef::Records(list) => list.to_value(),
            SlotRef::Numbers(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::Number(*v)))
                    .collect(),
            ),
            SlotRef::Flags(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::Bool(*v)))
                    .collect(),
            ),
            SlotRef::Texts(items) => Value::List(items.iter().map(|s| Value::Text(s.clone())).collect()),
            SlotRef::Ids(ids) => Value::List(ids.iter().map(|s| Value::Text(s.clone())).collect()),
            SlotRef::Number(n) => Value::Number(**n),
            SlotRef::Count(c) => Value::Number(**c as f64),
            SlotRef::Flag(b) => Value::Bool(**b),
            SlotRef::Text(s) => Value::Text((*s).clone()),
            SlotRef::OptText(s) => match &**s {
                Some(text) => Value::Text(text.clone()),
                None => Value::Null,
            },
            SlotRef::Keyword(k) => Value::Text(k.as_str().to_string()),
            SlotRef::Value(v) => (*v).clone(),
        }
    }

    /// Current numeric value, if this location holds a number.
    pub fn number(&self) -> Option<f64> {
        match self {
            SlotRef::Number(n) => Some(**n),
            SlotRef::Count(c) => Some(**c as f64),
            SlotRef::Value(v) => v.as_number(),
            _ => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            SlotRef::Records(_) | SlotRef::Texts(_) | SlotRef::Ids(_) | SlotRef::Value(Value::List(_))
        )
    }

    /// Check that `value` may replace this location.
    pub fn check_assign(&self, value: &Value) -> Result<(), SlotError> {
        match self {
            SlotRef::Record(r) => {
                let map = value.as_map().ok_or_else(|| SlotError::mismatch("map", value))?;
                for (key, item) in map {
                    let field = r
                        .field(key)
                        .ok_or_else(|| SlotError::UnknownField(key.clone()))?;
                    field.check_assign(item)?;
                }
                Ok(())
            }
            SlotRef::Records(list) => {
                let items = value.as_list().ok_or_else(|| SlotError::mismatch("list", value))?;
                list.check_values(items)
            }
            SlotRef::Numbers(_) => match value {
                Value::Map(map) if map.values().all(|v| v.as_number().is_some()) => Ok(()),
                _ => Err(SlotError::mismatch("map of numbers", value)),
            },
            SlotRef::Flags(_) => match value {
                Value::Map(map) if map.values().all(|v| v.as_bool().is_some()) => Ok(()),
                _ => Err(SlotError::mismatch("map of bools", value)),
            },
            SlotRef::Texts(_) | SlotRef::Ids(_) => match value {
                Value::List(items) if items.iter().all(|v| v.as_text().is_some()) => Ok(()),
                _ => Err(SlotError::mismatch("list of text", value)),
            },
            SlotRef::Number(_) | SlotRef::Count(_) => {
                let n = value.as_number().ok_or_else(|| SlotError::mismatch("number", value))?;
                self.check_number(n)
            }
            SlotRef::Flag(_) => value
                .as_bool()
                .map(|_| ())
                .ok_or_else(|| SlotError::mismatch("bool", value)),
            SlotRef::Text(_) => value
                .as_text()
                .map(|_| ())
                .ok_or_else(|| SlotError::mismatch("text", value)),
            SlotRef::OptText(_) => match value {
                Value::Text(_) | Value::Null => Ok(()),
                _ => Err(SlotError::mismatch("text or null", value)),
            },
            SlotRef::Keyword(k) => {
                let raw = value.as_text().ok_or_else(|| SlotError::mismatch("text", value))?;
                if k.variants().iter().any(|v| *v == raw) {
                    Ok(())
                } else {
                    Err(SlotError::UnknownVariant {
                        value: raw.to_string(),
                        expected: k.variants(),
                    })
                }
            }
            SlotRef::Value(_) => Ok(()),
        }
    }

    /// Check that the number `n` may be stored here.
    pub fn check_number(&self, n: f64) -> Result<(), SlotError> {
        match self {
            SlotRef::Number(_) => Ok(()),
            SlotRef::Count(_) => {
                if n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 {
                    Ok(())
                } else {
                    Err(SlotError::OutOfRange {
                        value: n,
                        expected: "non-negative whole number",
                    })
                }
            }
            SlotRef::Value(Value::Number(_)) => Ok(()),
            other => Err(SlotError::TypeMismatch {
                expected: "number",
                found: other.kind(),
            }),
        }
    }

    /// Check that `value` may be appended here.
    pub fn check_push(&self, value: &Value) -> Result<(), SlotError> {
        match self {
            SlotRef::Texts(_) | SlotRef::Ids(_) => value
                .as_text()
                .map(|_| ())
                .ok_or_else(|| SlotError::mismatch("text", value)),
            SlotRef::Records(list) => list.check_value(value),
            SlotRef::Value(Value::List(_)) => Ok(()),
            other => Err(SlotError::TypeMismatch {
                expected: "sequence",
                found: other.kind(),
            }),
        }
    }

    /// Position of the first element selected by `m`.
    pub fn position(&self, m: Match<'_>) -> Result<Option<usize>, SlotError> {
        let text_eq = |s: &String| match m {
            Match::Equals(Value::Text(t)) => s == t,
            _ => false,
        };
        match self {
            SlotRef::Texts(items) => Ok(items.iter().position(text_eq)),
            SlotRef::Ids(ids) => Ok(ids.iter().position(text_eq)),
            SlotRef::Records(list) => Ok((0..list.len()).find(|&i| {
                list.record(i).is_some_and(|r| match m {
                    Match::Equals(v) => r.to_value() == *v,
                    Match::FieldEquals { key, value } => {
                        r.field(key).map(|f| f.to_value()).as_ref() == Some(value)
                    }
                })
            })),
            SlotRef::Value(Value::List(items)) => Ok(items.iter().position(|item| match m {
                Match::Equals(v) => item == v,
                Match::FieldEquals { key, value } => {
                    item.as_map().and_then(|map| map.get(key)) == Some(value)
                }
            })),
            other => Err(SlotError::TypeMismatch {
                expected: "sequence",
                found: other.kind(),
            }),
        }
    }
}

/// Mutable handle to one location.
pub enum Slot<'a> {
    Record(&'a mut dyn Addressable),
    Records(&'a mut dyn RecordList),
    Numbers(&'a mut BTreeMap<String, f64>),
    Flags(&'a mut BTreeMap<String, bool>),
    Texts(&'a mut Vec<String>),
    Ids(&'a mut BTreeSet<String>),
    Number(&'a mut f64),
    Count(&'a mut u64),
    Flag(&'a mut bool),
    Text(&'a mut String),
    OptText(&'a mut Option<String>),
    Keyword(&'a mut dyn Keyword),
    Value(&'a mut Value),
}

impl<'a> Slot<'a> {
    pub fn view(&self) -> SlotRef<'_> {
        match self {
            Slot::Record(r) => SlotRef::Record(&**r),
            Slot::Records(list) => SlotRef::Records(&**list),
            Slot::Numbers(map) => SlotRef::Numbers(&**map),
            Slot::Flags(map) => SlotRef::Flags(&**map),
            Slot::Texts(items) => SlotRef::Texts(&**items),
            Slot::Ids(ids) => SlotRef::Ids(&**ids),
            Slot::Number(n) => SlotRef::Number(&**n),
            Slot::Count(c) => SlotRef::Count(&**c),
            Slot::Flag(b) => SlotRef::Flag(&**b),
            Slot::Text(s) => SlotRef::Text(&**s),
            Slot::OptText(s) => SlotRef::OptText(&**s),
            Slot::Keyword(k) => SlotRef::Keyword(&**k),
            Slot::Value(v) => SlotRef::Value(&**v),
        }
    }

    /// Descend one step; `None` if the step does not exist here.
    pub fn step(self, step: Step<'_>) -> Option<Slot<'a>> {
        match (self, step) {
            (Slot::Record(r), Step::Field(name)) => r.field_mut(name),
            (Slot::Records(list), Step::Index(i)) => list.record_mut(i).map(Slot::Record),
            (Slot::Records(list), Step::Field(key)) => {
                let i = list.position_of(key)?;
                list.record_mut(i).map(Slot::Record)
            }
            (Slot::Numbers(map), Step::Field(key)) => map.get_mut(key).map(Slot::Number),
            (Slot::Flags(map), Step::Field(key)) => map.get_mut(key).map(Slot::Flag),
            (Slot::Texts(items), Step::Index(i)) => items.get_mut(i).map(Slot::Text),
            (Slot::Value(v), step) => match (v, step) {
                (Value::Map(map), Step::Field(key)) => map.get_mut(key).map(Slot::Value),
                (Value::List(items), Step::Field(key)) => {
                    items.iter_mut().find(|v| v.has_id(key)).map(Slot::Value)
                }
                (Value::List(items), Step::Index(i)) => items.get_mut(i).map(Slot::Value),
                _ => None,
            },
            _ => None,
        }
    }

    /// Replace the location with `value`; nothing changes on error.
    pub fn assign(&mut self, value: &Value) -> Result<(), SlotError> {
        self.view().check_assign(value)?;
        match self {
            Slot::Record(r) => {
                if let Value::Map(map) = value {
                    for (key, item) in map {
                        if let Some(mut field) = r.field_mut(key) {
                            field.assign(item)?;
                        }
                    }
                }
            }
            Slot::Records(list) => {
                if let Value::List(items) = value {
                    list.replace_values(items)?;
                }
            }
            Slot::Numbers(map) => {
                if let Value::Map(entries) = value {
                    **map = entries
                        .iter()
                        .filter_map(|(k, v)| v.as_number().map(|n| (k.clone(), n)))
                        .collect();
                }
            }
            Slot::Flags(map) => {
                if let Value::Map(entries) = value {
                    **map = entries
                        .iter()
                        .filter_map(|(k, v)| v.as_bool().map(|b| (k.clone(), b)))
                        .collect();
                }
            }
            Slot::Texts(items) => {
                if let Value::List(values) = value {
                    **items = values
                        .iter()
                        .filter_map(|v| v.as_text().map(str::to_string))
                        .collect();
                }
            }
            Slot::Ids(ids) => {
                if let Value::List(values) = value {
                    **ids = values
                        .iter()
                        .filter_map(|v| v.as_text().map(str::to_string))
                        .collect();
                }
            }
            Slot::Number(_) | Slot::Count(_) => {
                if let Some(n) = value.as_number() {
                    self.store_number(n)?;
                }
            }
            Slot::Flag(b) => {
                if let Some(flag) = value.as_bool() {
                    **b = flag;
                }
            }
            Slot::Text(s) => {
                if let Some(text) = value.as_text() {
                    **s = text.to_string();
                }
            }
            Slot::OptText(s) => **s = value.as_text().map(str::to_string),
            Slot::Keyword(k) => {
                if let Some(raw) = value.as_text() {
                    k.set_str(raw);
                }
            }
            Slot::Value(v) => **v = value.clone(),
        }
        Ok(())
    }

    /// Store a number into a numeric location.
    pub fn store_number(&mut self, n: f64) -> Result<(), SlotError> {
        self.view().check_number(n)?;
        match self {
            Slot::Number(x) => **x = n,
            Slot::Count(c) => **c = n as u64,
            Slot::Value(v) => **v = Value::Number(n),
            other => {
                return Err(SlotError::TypeMismatch {
                    expected: "number",
                    found: other.view().kind(),
                })
            }
        }
        Ok(())
    }

    /// Append `value` to a sequence location.
    ///
    /// Returns `false` when the location did not change, which only happens
    /// for an id already present in an id set.
    pub fn push(&mut self, value: &Value) -> Result<bool, SlotError> {
        self.view().check_push(value)?;
        match self {
            Slot::Texts(items) => {
                if let Some(text) = value.as_text() {
                    items.push(text.to_string());
                }
            }
            Slot::Ids(ids) => {
                return Ok(value.as_text().is_some_and(|text| ids.insert(text.to_string())));
            }
            Slot::Records(list) => list.push_value(value)?,
            Slot::Value(v) => {
                if let Value::List(items) = &mut **v {
                    items.push(value.clone());
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Remove the first element selected by `m`; `Ok(false)` if none matched.
    pub fn remove_first(&mut self, m: Match<'_>) -> Result<bool, SlotError> {
        let Some(index) = self.view().position(m)? else {
            return Ok(false);
        };
        match self {
            Slot::Texts(items) => {
                items.remove(index);
            }
            Slot::Ids(ids) => {
                if let Some(id) = ids.iter().nth(index).cloned() {
                    ids.remove(&id);
                }
            }
            Slot::Records(list) => list.remove_at(index),
            Slot::Value(v) => {
                if let Value::List(items) = &mut **v {
                    items.remove(index);
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Declare the addressable field table of a record type.
macro_rules! addressable {
    ($ty:ty $(, key = $key:ident)? { $($name:literal => $field:ident: $kind:ident),+ $(,)? }) => {
        impl $crate::value::Addressable for $ty {
            fn field_names(&self) -> &'static [&'static str] {
                &[$($name),+]
            }

            fn field(&self, name: &str) -> Option<$crate::value::SlotRef<'_>> {
                match name {
                    $($name => Some($crate::value::SlotRef::$kind(&self.$field)),)+
                    _ => None,
                }
            }

            fn field_mut(&mut self, name: &str) -> Option<$crate::value::Slot<'_>> {
                match name {
                    $($name => Some($crate::value::Slot::$kind(&mut self.$field)),)+
                    _ => None,
                }
            }

            $(
                fn key(&self) -> Option<&str> {
                    Some(self.$key.as_str())
                }

                fn key_field(&self) -> Option<&'static str> {
                    Some(stringify!($key))
                }
            )?
        }
    };
}

/// Implement [`Keyword`] for a unit-only enum.
macro_rules! keyword {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $crate::value::Keyword for $ty {
            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            fn variants(&self) -> &'static [&'static str] {
                &[$($name),+]
            }

            fn set_str(&mut self, raw: &str) -> bool {
                match raw {
                    $($name => {
                        *self = Self::$variant;
                        true
                    })+
                    _ => false,
                }
            }
        }
    };
}

pub(crate) use addressable;
pub(crate) use keyword;
