//! Error types for presenter resolution.
//!
//! Every variant is fatal for the call that produced it: a resolution
//! either binds every declared field or binds none. A missing binder and
//! a store miss are normal outcomes and never surface here.

use std::fmt;

use crate::key::{ClassKey, PresenterType, Tag};

/// Boxed source error returned by user-supplied constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Hafiz operations.
#[derive(Debug, thiserror::Error)]
pub enum HafizError {
    /// A binder is registered for a view class but could not be built.
    #[error("{}", .0)]
    BinderInstantiation(BinderInstantiationError),

    /// A presenter factory could not be built.
    #[error("Can not instantiate presenter factory {factory}: {source}")]
    FactoryInstantiation {
        factory: ClassKey,
        #[source]
        source: BoxError,
    },

    /// A params holder could not be built.
    #[error("Can not instantiate params holder {holder}: {source}")]
    HolderInstantiation {
        holder: ClassKey,
        #[source]
        source: BoxError,
    },

    /// A factory failed to construct a presenter.
    #[error("Failed to construct presenter {presenter} (tag {tag:?}): {source}")]
    PresenterConstruction {
        presenter: ClassKey,
        tag: Tag,
        #[source]
        source: BoxError,
    },

    /// A params holder expected the view to provide params, but it did not.
    #[error(
        "View {view} provides no params for field `{field}`\n  Hint: implement ParamsProvider for the view and return params for this field"
    )]
    MissingParams { view: ClassKey, field: &'static str },

    /// A binder could not reach or write its field on the view.
    #[error("{}", .0)]
    FieldBinding(FieldBindingError),

    /// The store key is already held by a presenter of another class.
    #[error("{}", .0)]
    PresenterTypeMismatch(PresenterTypeMismatchError),

    /// A binder for this view class was already registered.
    #[error(
        "Binder already registered: {binder}\n  Hint: enable allow_override to replace it explicitly"
    )]
    AlreadyRegistered { binder: String },
}

/// Error when a registered binder fails to construct.
///
/// This means the binder registration and the view type disagree, not
/// that the view simply declares no presenters.
#[derive(Debug)]
pub struct BinderInstantiationError {
    /// The view class level whose binder failed
    pub view_class: ClassKey,
    /// The binder name derived from the class name
    pub binder: String,
    pub source: BoxError,
}

impl fmt::Display for BinderInstantiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Can not instantiate binder {} for {}: {}",
            self.binder, self.view_class, self.source
        )?;
        write!(
            f,
            "\n  Hint: the binder registration does not match the view type"
        )
    }
}

/// Error when a resolved presenter can not be written into its field.
#[derive(Debug)]
pub struct FieldBindingError {
    /// The view class level declaring the field
    pub view_class: ClassKey,
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for FieldBindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Can not bind field `{}` on {}: {}",
            self.field, self.view_class, self.reason
        )?;
        write!(
            f,
            "\n  Hint: View::level_mut must return the part of the view that owns this field"
        )
    }
}

/// Error when a store entry holds a presenter of a different class than
/// the one requested.
#[derive(Debug)]
pub struct PresenterTypeMismatchError {
    pub presenter_type: PresenterType,
    pub tag: Tag,
    pub expected: ClassKey,
    pub found: ClassKey,
}

impl fmt::Display for PresenterTypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Presenter {}:{} is a {}, expected {}",
            self.presenter_type, self.tag, self.found, self.expected
        )?;
        write!(
            f,
            "\n  Hint: two presenter classes produce the same tag; give them distinct params"
        )
    }
}

/// Convenient Result type for Hafiz operations.
pub type Result<T> = std::result::Result<T, HafizError>;
