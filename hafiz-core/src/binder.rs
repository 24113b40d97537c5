//! Binders: per-class-level presenter field declarations.
//!
//! A [`PresenterBinder`] lists the presenter fields one view class level
//! declares and knows how to write a resolved presenter into each of
//! them. Binders are registered under a name derived from the view class
//! name, and [`BinderRegistry::discover`] walks a view's ancestor chain
//! to collect them into a cached [`BindingPlan`].
//!
//! # Examples
//! ```rust,ignore
//! let binder = TypedBinder::<HomeScreen>::new()
//!     .field(PresenterField::new::<FeedPresenter>("feed"), |screen, p: Arc<FeedPresenter>| {
//!         screen.feed = Some(p)
//!     });
//!
//! let context = RetentionContext::builder()
//!     .bind_view(&HOME_SCREEN, binder)
//!     .build()?;
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, instrument, trace, warn};

use crate::error::{BinderInstantiationError, BoxError, HafizError, Result};
use crate::factory::{FactoryRef, HolderRef};
use crate::key::{ClassKey, PresenterType};
use crate::params::Params;
use crate::presenter::{DefaultInstance, PresenterHandle, PresenterInstance};
use crate::view::ViewClass;

// ============================================================
// PresenterField
// ============================================================

/// Static description of one declared presenter field.
#[derive(Clone)]
pub struct PresenterField {
    name: &'static str,
    presenter_class: ClassKey,
    presenter_type: PresenterType,
    factory: FactoryRef,
    params_holder: HolderRef,
    params: Params,
    default_instance: DefaultInstance,
}

impl PresenterField {
    /// A field holding a `P`, built with `P::default()` by the default
    /// factory.
    pub fn new<P: Default + Send + Sync + 'static>(name: &'static str) -> Self {
        Self::supplied_by(name, P::default)
    }

    /// A field holding a `P`, built by `supplier`.
    ///
    /// `supplier` runs while the presenter's store key is locked. It must
    /// not resolve a field with the same type and tag, or it waits on
    /// itself forever.
    pub fn supplied_by<P: Send + Sync + 'static>(
        name: &'static str,
        supplier: impl Fn() -> P + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            presenter_class: ClassKey::of::<P>(),
            presenter_type: PresenterType::default(),
            factory: FactoryRef::default(),
            params_holder: HolderRef::default(),
            params: Params::new(),
            default_instance: Arc::new(move || Arc::new(supplier()) as PresenterInstance),
        }
    }

    pub fn with_type(mut self, presenter_type: PresenterType) -> Self {
        self.presenter_type = presenter_type;
        self
    }

    pub fn with_factory(mut self, factory: FactoryRef) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_params_holder(mut self, holder: HolderRef) -> Self {
        self.params_holder = holder;
        self
    }

    /// Adds a declared param.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key, value);
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params.without_session();
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn presenter_class(&self) -> ClassKey {
        self.presenter_class
    }

    pub fn presenter_type(&self) -> PresenterType {
        self.presenter_type
    }

    pub fn factory(&self) -> &FactoryRef {
        &self.factory
    }

    pub fn params_holder(&self) -> &HolderRef {
        &self.params_holder
    }

    /// Params declared with the field.
    pub fn declared_params(&self) -> &Params {
        &self.params
    }

    pub fn default_instance(&self) -> &DefaultInstance {
        &self.default_instance
    }
}

impl fmt::Debug for PresenterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenterField")
            .field("name", &self.name)
            .field("presenter_class", &self.presenter_class)
            .field("presenter_type", &self.presenter_type)
            .field("factory", &self.factory.key())
            .field("params_holder", &self.params_holder.key())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// ============================================================
// PresenterBinder
// ============================================================

/// The presenter fields of one view class level.
///
/// Binders keep no per-view state; one instance serves every view of
/// its class.
///
/// Resolution checks [`accepts`](Self::accepts) and
/// [`accepts_presenter`](Self::accepts_presenter) for every field of every
/// level before it writes anything. Writing itself can not fail: a binder
/// must reject in those checks whatever [`set_presenter`](Self::set_presenter)
/// could not write.
pub trait PresenterBinder: Send + Sync {
    /// Declared fields, in declaration order.
    fn presenter_fields(&self) -> &[PresenterField];

    /// `true` if `target` is the level value this binder writes into.
    fn accepts(&self, target: &dyn Any) -> bool;

    /// `true` if `presenter` can be written into field number `index`.
    fn accepts_presenter(&self, index: usize, presenter: &PresenterHandle) -> bool;

    /// Writes `presenter` into field number `index` of `target`.
    ///
    /// Only called once both checks above passed for these arguments.
    fn set_presenter(&self, target: &mut dyn Any, index: usize, presenter: &PresenterHandle);
}

type Setter<V> = Box<dyn Fn(&mut V, &PresenterHandle) -> bool + Send + Sync>;

/// A [`PresenterBinder`] for level type `V` built from typed setters.
pub struct TypedBinder<V> {
    fields: Vec<PresenterField>,
    presenter_types: Vec<TypeId>,
    setters: Vec<Setter<V>>,
}

impl<V: Any> TypedBinder<V> {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            presenter_types: Vec::new(),
            setters: Vec::new(),
        }
    }

    /// Declares `field`, written with `set` once resolved.
    pub fn field<P: Any + Send + Sync>(
        mut self,
        field: PresenterField,
        set: impl Fn(&mut V, Arc<P>) + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(field);
        self.presenter_types.push(TypeId::of::<P>());
        self.setters.push(Box::new(move |view: &mut V, handle: &PresenterHandle| match handle.downcast::<P>() {
            Some(presenter) => {
                set(view, presenter);
                true
            }
            None => false,
        }));
        self
    }
}

impl<V: Any> Default for TypedBinder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Any> PresenterBinder for TypedBinder<V> {
    fn presenter_fields(&self) -> &[PresenterField] {
        &self.fields
    }

    fn accepts(&self, target: &dyn Any) -> bool {
        target.is::<V>()
    }

    fn accepts_presenter(&self, index: usize, presenter: &PresenterHandle) -> bool {
        let instance: &dyn Any = &**presenter.instance();
        self.presenter_types
            .get(index)
            .is_some_and(|expected| instance.type_id() == *expected)
    }

    fn set_presenter(&self, target: &mut dyn Any, index: usize, presenter: &PresenterHandle) {
        let (Some(field), Some(setter)) = (self.fields.get(index), self.setters.get(index)) else {
            warn!(index, "No presenter field at index");
            return;
        };

        let Some(view) = target.downcast_mut::<V>() else {
            warn!(field = field.name(), "Target rejected after checks");
            return;
        };

        if setter(view, presenter) {
            trace!(field = field.name(), tag = %presenter.tag(), "Bound presenter");
        } else {
            warn!(field = field.name(), class = %presenter.class(), "Presenter rejected after checks");
        }
    }
}

impl<V> fmt::Debug for TypedBinder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedBinder")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

// ============================================================
// Static registration
// ============================================================

/// Constructor of a binder, as stored in the registry.
pub type BinderFactory =
    Arc<dyn Fn() -> std::result::Result<Arc<dyn PresenterBinder>, BoxError> + Send + Sync>;

/// A binder registered at link time with `inventory::submit!`.
///
/// Collected by
/// [`RetentionContextBuilder::with_registered_binders`](crate::context::RetentionContextBuilder::with_registered_binders).
///
/// ```rust,ignore
/// fn home_screen() -> &'static ViewClass { &HOME_SCREEN }
/// fn home_binder() -> Result<Arc<dyn PresenterBinder>, BoxError> {
///     Ok(Arc::new(TypedBinder::<HomeScreen>::new().field(..)))
/// }
///
/// inventory::submit! {
///     BinderRegistration { view: home_screen, binder: home_binder }
/// }
/// ```
pub struct BinderRegistration {
    pub view: fn() -> &'static ViewClass,
    pub binder: fn() -> std::result::Result<Arc<dyn PresenterBinder>, BoxError>,
}

inventory::collect!(BinderRegistration);

// ============================================================
// BindingPlan
// ============================================================

/// One view class level that has a binder.
#[derive(Clone)]
pub struct BoundLevel {
    pub class: ClassKey,
    pub binder: Arc<dyn PresenterBinder>,
}

impl fmt::Debug for BoundLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundLevel")
            .field("class", &self.class)
            .field("fields", &self.binder.presenter_fields().len())
            .finish()
    }
}

/// Every binder of a view class's ancestor chain, most-derived first.
#[derive(Debug, Default)]
pub struct BindingPlan {
    levels: Vec<BoundLevel>,
}

impl BindingPlan {
    pub fn levels(&self) -> &[BoundLevel] {
        &self.levels
    }

    /// `true` when no level of the chain has a binder.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Total number of declared fields.
    pub fn field_count(&self) -> usize {
        self.levels
            .iter()
            .map(|level| level.binder.presenter_fields().len())
            .sum()
    }
}

// ============================================================
// BinderRegistry
// ============================================================

/// Binders by name, plus the binding plans computed from them.
///
/// Names follow `<view class name><suffix>`. Registration happens while
/// the context is being built; plans are computed on first discovery and
/// reused for every later view of the same class.
pub struct BinderRegistry {
    suffix: String,
    binders: HashMap<String, BinderFactory>,
    plans: DashMap<ClassKey, Arc<BindingPlan>>,
}

impl BinderRegistry {
    pub(crate) fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            binders: HashMap::new(),
            plans: DashMap::new(),
        }
    }

    /// Registers the binder constructor for `class`.
    ///
    /// # Errors
    /// [`HafizError::AlreadyRegistered`] if `class` already has a binder
    /// and `allow_override` is false.
    pub(crate) fn register(
        &mut self,
        class: &ViewClass,
        factory: BinderFactory,
        allow_override: bool,
    ) -> Result<()> {
        let name = self.binder_name(class);

        if !allow_override && self.binders.contains_key(&name) {
            return Err(HafizError::AlreadyRegistered { binder: name });
        }

        debug!(binder = %name, "Registered binder");
        self.binders.insert(name, factory);
        self.plans.clear();
        Ok(())
    }

    /// Name under which the binder of `class` is registered.
    pub fn binder_name(&self, class: &ViewClass) -> String {
        format!("{}{}", class.name(), self.suffix)
    }

    pub fn contains(&self, class: &ViewClass) -> bool {
        self.binders.contains_key(&self.binder_name(class))
    }

    /// Number of registered binders.
    pub fn len(&self) -> usize {
        self.binders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }

    /// The binding plan of `class`, walking its ancestor chain on first use.
    ///
    /// Levels without a binder are skipped silently.
    ///
    /// # Errors
    /// [`HafizError::BinderInstantiation`] if a registered binder fails to
    /// construct. Nothing is cached in that case.
    #[instrument(skip(self, class), fields(view = %class.name()), name = "binder_discovery")]
    pub fn discover(&self, class: &ViewClass) -> Result<Arc<BindingPlan>> {
        if let Some(plan) = self.plans.get(&class.key()) {
            trace!("Using cached binding plan");
            return Ok(Arc::clone(plan.value()));
        }

        let mut levels = Vec::new();
        for level in class.ancestors() {
            let name = self.binder_name(level);
            let Some(factory) = self.binders.get(&name) else {
                trace!(level = %level.name(), "No binder for level");
                continue;
            };

            let binder = factory().map_err(|source| {
                HafizError::BinderInstantiation(BinderInstantiationError {
                    view_class: level.key(),
                    binder: name.clone(),
                    source,
                })
            })?;

            levels.push(BoundLevel {
                class: level.key(),
                binder,
            });
        }

        let plan = Arc::new(BindingPlan { levels });
        debug!(
            chain = %class.render_chain(),
            levels = plan.levels().len(),
            fields = plan.field_count(),
            "Computed binding plan"
        );

        self.plans.insert(class.key(), Arc::clone(&plan));
        Ok(plan)
    }
}

impl fmt::Debug for BinderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinderRegistry")
            .field("suffix", &self.suffix)
            .field("binders", &self.binders.len())
            .field("plans", &self.plans.len())
            .finish()
    }
}
