//! Buckets and the scopes they live in.

use std::fmt;

/// The owner of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    App,
    User(String),
    Group(String),
    Thing(String),
}

impl Scope {
    /// Writes the path segment selecting this scope, empty for the application scope.
    fn write_segment(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::App => Ok(()),
            Scope::User(id) => write!(f, "users/{id}/"),
            Scope::Group(id) => write!(f, "groups/{id}/"),
            Scope::Thing(id) => write!(f, "things/{id}/"),
        }
    }

    pub(crate) fn id(&self) -> Option<&str> {
        match self {
            Scope::App => None,
            Scope::User(id) | Scope::Group(id) | Scope::Thing(id) => Some(id),
        }
    }
}

/// A named object container owned by a [`Scope`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bucket {
    scope: Scope,
    name: String,
}

impl Bucket {
    pub fn new<S: Into<String>>(scope: Scope, name: S) -> Self {
        Self { scope, name: name.into() }
    }

    #[inline]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The path of the bucket's objects below the application, without a leading slash.
    pub(crate) fn objects_path<'a>(&'a self, app_id: &'a str) -> ObjectsPath<'a> {
        ObjectsPath { app_id, bucket: self, object_id: None }
    }
}

pub(crate) struct ObjectsPath<'a> {
    app_id: &'a str,
    bucket: &'a Bucket,
    object_id: Option<&'a str>,
}

impl<'a> ObjectsPath<'a> {
    pub(crate) fn object(mut self, object_id: &'a str) -> Self {
        self.object_id = Some(object_id);
        self
    }
}

impl fmt::Display for ObjectsPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "api/apps/{}/", self.app_id)?;
        self.bucket.scope.write_segment(f)?;
        write!(f, "buckets/{}/objects", self.bucket.name)?;
        match self.object_id {
            Some(id) => write!(f, "/{id}"),
            None => Ok(()),
        }
    }
}
