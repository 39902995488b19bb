//! Core traits for the migration framework.
//!
//! A migration upgrades a payload by exactly one schema step. Transforms
//! receive a shared borrow of their input and return a newly built value, so
//! the input can never be modified in place.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single schema step operating on the JSON payload.
pub trait Migration: Send + Sync + fmt::Debug {
    /// Returns the source version this migration starts from.
    fn from_version(&self) -> u32;

    /// Returns the target version this migration produces.
    fn to_version(&self) -> u32;

    /// Returns a short, stable name used in logs and error messages.
    fn name(&self) -> &str;

    /// Builds the upgraded payload from `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not have the shape this step
    /// expects. The runner reports it as a migration failure for this step.
    fn transform(&self, data: &Value) -> Result<Value>;
}

/// Migration between two concrete payload types.
///
/// Wrap an implementation in [`Typed`] to register it.
pub trait TypedMigration: Send + Sync + fmt::Debug {
    type From: DeserializeOwned;
    type To: Serialize;

    fn from_version(&self) -> u32;

    fn to_version(&self) -> u32;

    fn name(&self) -> &str;

    /// Executes the migration, transforming data from the source to target format.
    fn migrate(&self, from: &Self::From) -> Result<Self::To>;
}

/// Adapter exposing a [`TypedMigration`] as a JSON-level [`Migration`].
#[derive(Debug)]
pub struct Typed<M>(pub M);

impl<M: TypedMigration> Migration for Typed<M> {
    fn from_version(&self) -> u32 {
        self.0.from_version()
    }

    fn to_version(&self) -> u32 {
        self.0.to_version()
    }

    fn name(&self) -> &str {
        self.0.name()
    }

    fn transform(&self, data: &Value) -> Result<Value> {
        let from = <M::From as Deserialize>::deserialize(data)?;
        let to = self.0.migrate(&from)?;
        Ok(serde_json::to_value(to)?)
    }
}

type TransformFn = dyn Fn(&Value) -> Result<Value> + Send + Sync;

/// Migration backed by a closure.
///
/// Handy for small steps that do not warrant their own type.
pub struct FnMigration {
    from_version: u32,
    to_version: u32,
    name: String,
    transform: Box<TransformFn>,
}

impl FnMigration {
    pub fn new<F>(from_version: u32, to_version: u32, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            from_version,
            to_version,
            name: name.into(),
            transform: Box::new(transform),
        }
    }
}

impl fmt::Debug for FnMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMigration")
            .field("from_version", &self.from_version)
            .field("to_version", &self.to_version)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Migration for FnMigration {
    fn from_version(&self) -> u32 {
        self.from_version
    }

    fn to_version(&self) -> u32 {
        self.to_version
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, data: &Value) -> Result<Value> {
        (self.transform)(data)
    }
}
