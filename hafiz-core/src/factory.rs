//! Presenter factories and the store that caches them.
//!
//! Fields refer to their factory and params holder through a
//! [`FactoryRef`] / [`HolderRef`]: a class identity plus a constructor.
//! The [`FactoryStore`] builds each class once, on first use, and hands
//! out the same instance forever after.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::{BoxError, HafizError, Result};
use crate::key::{ClassKey, Tag};
use crate::params::{DefaultParamsHolder, Params, ParamsHolder};
use crate::presenter::{DefaultInstance, PresenterInstance};

/// Identifies and constructs presenters of one family.
pub trait PresenterFactory: Send + Sync {
    /// Tag of the presenter of `class` built from `params`.
    ///
    /// Must be a pure function of its inputs.
    fn create_tag(&self, class: &ClassKey, params: &Params) -> Tag;

    /// Builds a new presenter.
    fn create_presenter(
        &self,
        default_instance: &DefaultInstance,
        class: &ClassKey,
        params: &Params,
    ) -> std::result::Result<PresenterInstance, BoxError>;
}

/// The factory used when a field names none.
///
/// Tags:
/// - with entries: `class["k"="v",...]`, ignoring the session
/// - with only a session: `class@session`
/// - otherwise: `class`
///
/// Presenters come from the field's default-instance supplier.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPresenterFactory;

impl PresenterFactory for DefaultPresenterFactory {
    fn create_tag(&self, class: &ClassKey, params: &Params) -> Tag {
        if !params.is_empty() {
            let entries: Vec<String> = params
                .entries()
                .map(|(key, value)| format!("{key:?}={value:?}"))
                .collect();
            return Tag::new(format!("{}[{}]", class.type_name(), entries.join(",")));
        }

        match params.session() {
            Some(session) => Tag::new(format!("{}@{session}", class.type_name())),
            None => Tag::new(class.type_name()),
        }
    }

    fn create_presenter(
        &self,
        default_instance: &DefaultInstance,
        _class: &ClassKey,
        _params: &Params,
    ) -> std::result::Result<PresenterInstance, BoxError> {
        Ok(default_instance())
    }
}

type Constructor<T> = Arc<dyn Fn() -> std::result::Result<Arc<T>, BoxError> + Send + Sync>;

/// A class identity plus a way to construct it.
pub struct ClassRef<T: ?Sized> {
    key: ClassKey,
    construct: Constructor<T>,
}

/// Reference to a [`PresenterFactory`] class.
pub type FactoryRef = ClassRef<dyn PresenterFactory>;

/// Reference to a [`ParamsHolder`] class.
pub type HolderRef = ClassRef<dyn ParamsHolder>;

impl<T: ?Sized> ClassRef<T> {
    #[inline]
    pub fn key(&self) -> ClassKey {
        self.key
    }

    fn construct(&self) -> std::result::Result<Arc<T>, BoxError> {
        (self.construct)()
    }
}

impl<T: ?Sized> Clone for ClassRef<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            construct: Arc::clone(&self.construct),
        }
    }
}

impl<T: ?Sized> fmt::Debug for ClassRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassRef").field(&self.key).finish()
    }
}

impl FactoryRef {
    /// Refers to factory `F`, built with `Default`.
    pub fn of<F: PresenterFactory + Default + 'static>() -> Self {
        Self::with::<F>(|| Ok(F::default()))
    }

    /// Refers to factory `F`, built by a fallible constructor.
    pub fn with<F: PresenterFactory + 'static>(
        construct: impl Fn() -> std::result::Result<F, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: ClassKey::of::<F>(),
            construct: Arc::new(move || {
                construct().map(|factory| Arc::new(factory) as Arc<dyn PresenterFactory>)
            }),
        }
    }
}

impl Default for FactoryRef {
    fn default() -> Self {
        Self::of::<DefaultPresenterFactory>()
    }
}

impl HolderRef {
    /// Refers to holder `H`, built with `Default`.
    pub fn of<H: ParamsHolder + Default + 'static>() -> Self {
        Self::with::<H>(|| Ok(H::default()))
    }

    /// Refers to holder `H`, built by a fallible constructor.
    pub fn with<H: ParamsHolder + 'static>(
        construct: impl Fn() -> std::result::Result<H, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: ClassKey::of::<H>(),
            construct: Arc::new(move || {
                construct().map(|holder| Arc::new(holder) as Arc<dyn ParamsHolder>)
            }),
        }
    }
}

impl Default for HolderRef {
    fn default() -> Self {
        Self::of::<DefaultParamsHolder>()
    }
}

type Slot<T> = Arc<OnceCell<Arc<T>>>;

/// Construct-once, cache-forever lookup of factories and params holders.
///
/// Keyed by class identity. A failed construction is reported and not
/// cached, so the next lookup tries again.
#[derive(Default)]
pub struct FactoryStore {
    factories: DashMap<ClassKey, Slot<dyn PresenterFactory>>,
    holders: DashMap<ClassKey, Slot<dyn ParamsHolder>>,
}

impl FactoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared factory for `factory`'s class.
    pub fn factory(&self, factory: &FactoryRef) -> Result<Arc<dyn PresenterFactory>> {
        get_or_construct(&self.factories, factory).map_err(|source| {
            HafizError::FactoryInstantiation {
                factory: factory.key(),
                source,
            }
        })
    }

    /// The shared params holder for `holder`'s class.
    pub fn params_holder(&self, holder: &HolderRef) -> Result<Arc<dyn ParamsHolder>> {
        get_or_construct(&self.holders, holder).map_err(|source| {
            HafizError::HolderInstantiation {
                holder: holder.key(),
                source,
            }
        })
    }

    /// Installs a prebuilt factory; ignored if the class is already cached.
    pub fn preload_factory<F: PresenterFactory + 'static>(&self, factory: F) -> bool {
        let slot = self.factories.entry(ClassKey::of::<F>()).or_default().clone();
        slot.set(Arc::new(factory)).is_ok()
    }

    /// Number of factories built so far.
    pub fn factory_count(&self) -> usize {
        self.factories.iter().filter(|slot| slot.value().get().is_some()).count()
    }

    /// Number of params holders built so far.
    pub fn holder_count(&self) -> usize {
        self.holders.iter().filter(|slot| slot.value().get().is_some()).count()
    }
}

impl fmt::Debug for FactoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryStore")
            .field("factories", &self.factory_count())
            .field("holders", &self.holder_count())
            .finish()
    }
}

fn get_or_construct<T: ?Sized>(
    slots: &DashMap<ClassKey, Slot<T>>,
    class: &ClassRef<T>,
) -> std::result::Result<Arc<T>, BoxError> {
    // Clone the slot out so the shard lock is not held while constructing.
    let slot = slots.entry(class.key()).or_default().clone();
    slot.get_or_try_init(|| {
        debug!(class = %class.key(), "Constructing");
        class.construct()
    })
    .cloned()
}
