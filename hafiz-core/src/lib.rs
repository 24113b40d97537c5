//! Core presenter retention for Hafiz.
//!
//! Resolves the presenter fields a view declares, keeping each presenter
//! alive across view recreation and rebinding it instead of rebuilding.

pub mod binder;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod key;
pub mod params;
pub mod presenter;
pub mod processor;
pub mod store;
pub mod view;

pub use context::{RetentionContext, global};
pub use error::{HafizError, Result};
pub use key::{ClassKey, PresenterType, Tag};
pub use presenter::PresenterHandle;

pub mod prelude {
    pub use crate::binder::{BinderRegistration, PresenterBinder, PresenterField, TypedBinder};
    pub use crate::config::HafizConfig;
    pub use crate::context::{RetentionContext, RetentionContextBuilder, global};
    pub use crate::error::{BoxError, HafizError, Result};
    pub use crate::factory::{DefaultPresenterFactory, FactoryRef, HolderRef, PresenterFactory};
    pub use crate::key::{ClassKey, PresenterType, Tag};
    pub use crate::params::{DefaultParamsHolder, Params, ParamsHolder, ProvidedParamsHolder};
    pub use crate::presenter::{PresenterHandle, PresenterInstance};
    pub use crate::view::{ParamsProvider, View, ViewClass, generate_session_tag};
}
