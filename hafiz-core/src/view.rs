//! Views: the containers whose presenter fields get resolved.
//!
//! Rust has no class inheritance, so a view describes its ancestry with
//! a chain of [`ViewClass`] values and embeds the state of each ancestor
//! level by composition. [`View::level_mut`] hands a binder the part of
//! the view that owns the fields of one level.
//!
//! # Examples
//! ```
//! use std::any::Any;
//! use hafiz_core::key::ClassKey;
//! use hafiz_core::view::{View, ViewClass};
//! use once_cell::sync::Lazy;
//!
//! #[derive(Default)]
//! struct BaseScreen;
//!
//! #[derive(Default)]
//! struct HomeScreen {
//!     base: BaseScreen,
//! }
//!
//! static BASE_SCREEN: Lazy<ViewClass> = Lazy::new(ViewClass::of::<BaseScreen>);
//! static HOME_SCREEN: Lazy<ViewClass> =
//!     Lazy::new(|| ViewClass::extending::<HomeScreen>(&BASE_SCREEN));
//!
//! impl View for BaseScreen {
//!     fn view_class(&self) -> &'static ViewClass {
//!         &BASE_SCREEN
//!     }
//!
//!     fn level_mut(&mut self, class: &ClassKey) -> Option<&mut dyn Any> {
//!         (*class == ClassKey::of::<Self>()).then_some(self as &mut dyn Any)
//!     }
//! }
//!
//! impl View for HomeScreen {
//!     fn view_class(&self) -> &'static ViewClass {
//!         &HOME_SCREEN
//!     }
//!
//!     fn level_mut(&mut self, class: &ClassKey) -> Option<&mut dyn Any> {
//!         if *class == ClassKey::of::<Self>() {
//!             return Some(self);
//!         }
//!         self.base.level_mut(class)
//!     }
//! }
//!
//! let home = HomeScreen::default();
//! assert_eq!(home.view_class().ancestors().count(), 2);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use hafiz_support::rendering::{render_chain, shorten_type_name};

use crate::binder::PresenterField;
use crate::key::ClassKey;
use crate::params::Params;

/// Runtime class descriptor of a view: its identity and its parent.
///
/// The chain ends at the root, which is simply "no parent"; the root
/// itself never contributes presenter fields.
pub struct ViewClass {
    key: ClassKey,
    parent: Option<&'static ViewClass>,
}

impl ViewClass {
    /// A view class without ancestors.
    pub fn of<V: 'static>() -> Self {
        Self {
            key: ClassKey::of::<V>(),
            parent: None,
        }
    }

    /// A view class whose direct ancestor is `parent`.
    pub fn extending<V: 'static>(parent: &'static ViewClass) -> Self {
        Self {
            key: ClassKey::of::<V>(),
            parent: Some(parent),
        }
    }

    #[inline]
    pub fn key(&self) -> ClassKey {
        self.key
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.key.type_name()
    }

    #[inline]
    pub fn parent(&self) -> Option<&'static ViewClass> {
        self.parent
    }

    /// This class followed by every ancestor, most-derived first.
    pub fn ancestors(&self) -> impl Iterator<Item = &ViewClass> {
        std::iter::successors(Some(self), |class| {
            class.parent.map(|parent| parent as &ViewClass)
        })
    }

    /// Short names of the chain joined with arrows, for diagnostics.
    pub fn render_chain(&self) -> String {
        let names: Vec<String> = self
            .ancestors()
            .map(|class| shorten_type_name(class.name()))
            .collect();
        render_chain(&names)
    }
}

impl fmt::Debug for ViewClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewClass")
            .field("key", &self.key)
            .field("parent", &self.parent.map(|p| p.key))
            .finish()
    }
}

/// A container of presenter fields.
pub trait View: Send {
    /// The runtime class of this value.
    fn view_class(&self) -> &'static ViewClass;

    /// The part of this value that owns the fields declared at `class`.
    ///
    /// Return `self` for the own class and delegate to the embedded
    /// ancestor for the others. The answer for a class must not change
    /// between calls.
    fn level_mut(&mut self, class: &ClassKey) -> Option<&mut dyn Any>;

    /// Runtime params for custom params holders.
    fn params_provider(&self) -> Option<&dyn ParamsProvider> {
        None
    }
}

/// Implemented by views that compute presenter params at runtime.
///
/// Consulted by [`ProvidedParamsHolder`](crate::params::ProvidedParamsHolder).
pub trait ParamsProvider {
    fn provide_params(&self, field: &PresenterField) -> Option<Params>;
}

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates a process-unique session tag such as `HomeScreen$3`.
///
/// Callers that already own a unique per-view identifier can pass that
/// instead; resolution treats session tags as opaque strings.
pub fn generate_session_tag(class: &ViewClass) -> String {
    let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}${n}", shorten_type_name(class.name()))
}
