//! Named screen objects.
//!
//! The registry is plain data owned by the caller. Mutations go through
//! [`ObjectRegistry::insert`], which enforces the naming rules; the runner only
//! reads it through [`ObjectRegistry::resolve`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::models::{ObjectDef, ObjectKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("object name cannot be empty")]
    EmptyName,

    #[error("an object named '{0}' already exists")]
    Duplicate(String),
}

/// Result of looking up a step's object reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    /// The name exists in the registry.
    Bound(&'a str, &'a ObjectDef),
    /// The step carries no object reference (global or control step).
    Unbound,
    /// The step names an object the registry does not contain.
    Unknown(&'a str),
}

/// Mapping from object name to definition. Serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ObjectRegistry {
    objects: BTreeMap<String, ObjectDef>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. Empty names and name collisions are rejected.
    pub fn insert(&mut self, name: impl Into<String>, def: ObjectDef) -> Result<(), RegistryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.objects.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.objects.insert(name, def);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, def: ObjectDef) -> Result<Self, RegistryError> {
        self.insert(name, def)?;
        Ok(self)
    }

    pub fn remove(&mut self, name: &str) -> Option<ObjectDef> {
        self.objects.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ObjectDef> {
        self.objects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn resolve<'a>(&'a self, object_ref: Option<&'a str>) -> Resolved<'a> {
        match object_ref {
            None => Resolved::Unbound,
            Some(name) => match self.objects.get_key_value(name) {
                Some((key, def)) => Resolved::Bound(key.as_str(), def),
                None => Resolved::Unknown(name),
            },
        }
    }

    /// Names of all objects, optionally filtered by kind, in sorted order.
    pub fn names_of_kind(&self, kind: Option<ObjectKind>) -> Vec<&str> {
        self.objects
            .iter()
            .filter(|(_, def)| kind.is_none_or(|k| def.kind() == k))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObjectDef)> {
        self.objects.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut ObjectDef)> {
        self.objects.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::{PixelObject, Point, Rect, RegionObject, Rgb};

    fn region() -> ObjectDef {
        ObjectDef::Region(RegionObject {
            coords: Rect::new(0, 0, 10, 10),
            mode: None,
        })
    }

    fn pixel() -> ObjectDef {
        ObjectDef::Pixel(PixelObject {
            coords: Point(1, 1),
            rgb: Rgb(0, 0, 0),
        })
    }

    #[test]
    fn insert_rejects_empty_and_duplicate_names() {
        let mut reg = ObjectRegistry::new();
        assert_eq!(reg.insert("", region()), Err(RegistryError::EmptyName));
        assert_eq!(reg.insert("   ", region()), Err(RegistryError::EmptyName));
        reg.insert("button", region()).unwrap();
        assert_eq!(
            reg.insert("button", pixel()),
            Err(RegistryError::Duplicate("button".into()))
        );
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("button").unwrap().kind(), ObjectKind::Region);
    }

    #[test]
    fn resolve_distinguishes_unbound_and_unknown() {
        let reg = ObjectRegistry::new().with("a", region()).unwrap();
        assert!(matches!(reg.resolve(None), Resolved::Unbound));
        assert!(matches!(reg.resolve(Some("zzz")), Resolved::Unknown("zzz")));
        assert!(matches!(reg.resolve(Some("a")), Resolved::Bound("a", _)));
    }

    #[test]
    fn names_filtered_by_kind() {
        let reg = ObjectRegistry::new()
            .with("r1", region())
            .and_then(|r| r.with("p1", pixel()))
            .and_then(|r| r.with("r2", region()))
            .unwrap();
        assert_eq!(reg.names_of_kind(None), vec!["p1", "r1", "r2"]);
        assert_eq!(reg.names_of_kind(Some(ObjectKind::Region)), vec!["r1", "r2"]);
        assert!(reg.names_of_kind(Some(ObjectKind::Image)).is_empty());
    }
}
