//! Resolved presenters.
//!
//! Presenters are opaque to this crate: any `Send + Sync + 'static`
//! value qualifies. A [`PresenterHandle`] carries one together with the
//! identity it was stamped with at construction.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::key::{ClassKey, PresenterType, StoreKey, Tag};

/// A type-erased, shared presenter instance.
pub type PresenterInstance = Arc<dyn Any + Send + Sync>;

/// Supplies a fresh presenter for a field, as declared by its binder.
pub type DefaultInstance = Arc<dyn Fn() -> PresenterInstance + Send + Sync>;

/// A presenter with its class, logical type and tag.
///
/// Cloning a handle clones the `Arc`, never the presenter.
#[derive(Clone)]
pub struct PresenterHandle {
    instance: PresenterInstance,
    class: ClassKey,
    presenter_type: PresenterType,
    tag: Tag,
}

impl PresenterHandle {
    /// Stamps a freshly constructed presenter.
    pub(crate) fn stamp(
        instance: PresenterInstance,
        class: ClassKey,
        presenter_type: PresenterType,
        tag: Tag,
    ) -> Self {
        Self {
            instance,
            class,
            presenter_type,
            tag,
        }
    }

    /// Typed access to the presenter.
    ///
    /// Returns `None` if the presenter is not a `P`.
    pub fn downcast<P: Any + Send + Sync>(&self) -> Option<Arc<P>> {
        Arc::clone(&self.instance).downcast::<P>().ok()
    }

    pub fn instance(&self) -> &PresenterInstance {
        &self.instance
    }

    /// Class the presenter was resolved as.
    pub fn class(&self) -> ClassKey {
        self.class
    }

    pub fn presenter_type(&self) -> PresenterType {
        self.presenter_type
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn store_key(&self) -> StoreKey {
        StoreKey::new(self.presenter_type, self.tag.clone())
    }

    /// `true` if both handles point at the same presenter instance.
    pub fn ptr_eq(&self, other: &PresenterHandle) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl fmt::Debug for PresenterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenterHandle")
            .field("class", &self.class)
            .field("presenter_type", &self.presenter_type)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}
