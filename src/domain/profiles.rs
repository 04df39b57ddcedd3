//! Device profiles (printers) advertised by the conversion service.

use std::collections::HashMap;
use std::fmt;

use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a device profile, e.g. `anycubic_m3`.
///
/// The id is opaque: a persisted id is kept as-is even when the current
/// catalog no longer lists it, and the server decides whether it is valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    /// Returns `None` for an empty id, which means "nothing selected".
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        (!raw.is_empty()).then_some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Geometry record of a target device. Only displayed, never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: String,
    /// Label shown when choosing a profile.
    pub web_name: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub d_x: f64,
    pub d_y: f64,
}

/// Profiles keyed by id, in the order the service listed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileCatalog {
    entries: Vec<(ProfileId, DeviceProfile)>,
    index: HashMap<ProfileId, usize>,
}

impl ProfileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a profile. A repeated id keeps its first position and takes the new value.
    pub fn insert(&mut self, id: ProfileId, profile: DeviceProfile) {
        match self.index.get(&id) {
            Some(&position) => self.entries[position].1 = profile,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, profile));
            }
        }
    }

    pub fn get(&self, id: &ProfileId) -> Option<&DeviceProfile> {
        self.index
            .get(id)
            .map(|&position| &self.entries[position].1)
    }

    pub fn contains(&self, id: &ProfileId) -> bool {
        self.index.contains_key(id)
    }

    pub fn first_id(&self) -> Option<&ProfileId> {
        self.entries.first().map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProfileId, &DeviceProfile)> {
        self.entries.iter().map(|(id, profile)| (id, profile))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(ProfileId, DeviceProfile)> for ProfileCatalog {
    fn from_iter<T: IntoIterator<Item = (ProfileId, DeviceProfile)>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for (id, profile) in iter {
            catalog.insert(id, profile);
        }
        catalog
    }
}

/// Decoded through an insertion-ordered `serde_json::Map` so the listing
/// keeps the order of the response body.
impl<'de> Deserialize<'de> for ProfileCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| {
                let id = ProfileId::new(key)
                    .ok_or_else(|| D::Error::custom("profile id must not be empty"))?;
                let profile = DeviceProfile::deserialize(value).map_err(D::Error::custom)?;
                Ok::<_, D::Error>((id, profile))
            })
            .collect()
    }
}

impl Serialize for ProfileCatalog {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, profile) in &self.entries {
            map.serialize_entry(id, profile)?;
        }
        map.end()
    }
}
