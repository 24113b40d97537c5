//! Identification keys.
//!
//! [`ClassKey`] identifies a runtime type (a view class, a presenter
//! class, a factory). [`Tag`] and [`PresenterType`] together form the
//! [`StoreKey`] under which a presenter instance is retained.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies a Rust type at runtime.
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for
/// diagnostics and for naming binders.
///
/// # Examples
/// ```
/// use hafiz_core::key::ClassKey;
///
/// struct HomeScreen;
///
/// let key = ClassKey::of::<HomeScreen>();
/// assert!(key.type_name().ends_with("HomeScreen"));
/// assert_eq!(key, ClassKey::of::<HomeScreen>());
/// ```
#[derive(Clone, Copy)]
pub struct ClassKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl ClassKey {
    /// Creates a key for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for ClassKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassKey {}

impl Hash for ClassKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassKey({})", self.type_name)
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Logical category of a presenter.
///
/// Partitions the tag namespace independently of the presenter class:
/// the same tag under two different types names two different entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresenterType {
    /// Owned by one view lifecycle.
    ///
    /// The default params holder namespaces local presenters by the
    /// session tag, so two unrelated views never share one.
    #[default]
    Local,

    /// Shared by every view that produces the same tag.
    Global,

    /// Retained only while some view still refers to it.
    ///
    /// Eviction is decided outside this crate; for resolution it
    /// behaves like [`PresenterType::Global`].
    Weak,
}

impl PresenterType {
    /// Returns `true` if the default tag is namespaced by the session tag.
    #[inline]
    pub fn is_session_bound(&self) -> bool {
        matches!(self, PresenterType::Local)
    }
}

impl fmt::Display for PresenterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenterType::Local => write!(f, "Local"),
            PresenterType::Global => write!(f, "Global"),
            PresenterType::Weak => write!(f, "Weak"),
        }
    }
}

/// Deterministic identity of a presenter instance within its
/// [`PresenterType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key of one entry in the [`PresenterStore`](crate::store::PresenterStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub presenter_type: PresenterType,
    pub tag: Tag,
}

impl StoreKey {
    pub fn new(presenter_type: PresenterType, tag: Tag) -> Self {
        Self { presenter_type, tag }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.presenter_type, self.tag)
    }
}
