use std::fmt;

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

use super::entities::CategoryId;

/// Accumulated seconds per category.
///
/// Insertion order is part of the observable behavior: [dominant_category] breaks ties in
/// favour of the category that was seen first. A day has a handful of categories, so a vector
/// is enough.
///
/// [dominant_category]: super::aggregate::dominant_category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Totals {
    entries: Vec<(CategoryId, i64)>,
}

impl Totals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `seconds` to the category, registering it at the end if it's new.
    pub fn add(&mut self, id: &CategoryId, seconds: i64) {
        match self.entries.iter_mut().find(|(key, _)| key == id) {
            Some((_, value)) => *value += seconds,
            None => self.entries.push((id.clone(), seconds)),
        }
    }

    pub fn get(&self, id: &CategoryId) -> Option<i64> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CategoryId, i64)> {
        self.entries.iter().map(|(key, value)| (key, *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sum(&self) -> i64 {
        self.entries.iter().map(|(_, value)| value).sum()
    }
}

impl FromIterator<(CategoryId, i64)> for Totals {
    fn from_iter<T: IntoIterator<Item = (CategoryId, i64)>>(iter: T) -> Self {
        let mut totals = Totals::new();
        for (id, seconds) in iter {
            totals.add(&id, seconds);
        }
        totals
    }
}

impl Serialize for Totals {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Totals {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TotalsVisitor;

        impl<'de> Visitor<'de> for TotalsVisitor {
            type Value = Totals;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of category ids to seconds")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut totals = Totals::new();
                // Keeps document order, which serde_json hands out as-is.
                while let Some((key, value)) = access.next_entry::<CategoryId, i64>()? {
                    totals.add(&key, value);
                }
                Ok(totals)
            }
        }

        deserializer.deserialize_map(TotalsVisitor)
    }
}
