//! Presenter resolution.
//!
//! [`RetentionContext::resolve_all`] is the entry point a view calls when
//! its lifecycle starts. It finds every presenter field along the view's
//! ancestor chain, reuses the retained presenter for each (or creates it
//! exactly once) and writes it into the field.
//!
//! # Examples
//! ```rust,ignore
//! let session = generate_session_tag(screen.view_class());
//! let presenters = context.resolve_all(&mut screen, &session)?;
//!
//! // screen recreated: same session, same presenters
//! let mut recreated = HomeScreen::default();
//! let again = context.resolve_all(&mut recreated, &session)?;
//! assert!(presenters[0].ptr_eq(&again[0]));
//! ```

use tracing::{debug, instrument, trace};

use crate::binder::{BoundLevel, PresenterField};
use crate::context::RetentionContext;
use crate::error::{FieldBindingError, HafizError, Result};
use crate::presenter::PresenterHandle;
use crate::view::View;

impl RetentionContext {
    /// Resolves the presenter for one field of `view`.
    ///
    /// 1. params from the field's params holder
    /// 2. tag from the field's factory
    /// 3. the stored presenter for (type, tag), returned as stored
    /// 4. otherwise a new presenter, stamped and stored
    ///
    /// Steps 3 and 4 run as one critical section per key, so a key is
    /// constructed at most once.
    ///
    /// # Errors
    /// - [`HafizError::HolderInstantiation`] / [`HafizError::FactoryInstantiation`]
    /// - [`HafizError::MissingParams`] from a provider-backed holder
    /// - [`HafizError::PresenterConstruction`] if the factory fails
    /// - [`HafizError::PresenterTypeMismatch`] if the key holds another class
    #[instrument(skip_all, fields(field = field.name(), session = session_tag))]
    pub fn resolve_one(
        &self,
        field: &PresenterField,
        view: &dyn View,
        session_tag: &str,
    ) -> Result<PresenterHandle> {
        let holder = self.factories.params_holder(field.params_holder())?;
        let mut params = holder.params(field, view, session_tag)?;
        if !self.config.session_namespacing {
            params = params.without_session();
        }

        let factory = self.factories.factory(field.factory())?;
        let class = field.presenter_class();
        let presenter_type = field.presenter_type();
        let tag = factory.create_tag(&class, &params);
        trace!(%presenter_type, %tag, "Computed tag");

        self.store.get_or_try_insert(presenter_type, &tag, &class, || {
            let instance = factory
                .create_presenter(field.default_instance(), &class, &params)
                .map_err(|source| HafizError::PresenterConstruction {
                    presenter: class,
                    tag: tag.clone(),
                    source,
                })?;

            debug!(presenter = %class, %presenter_type, %tag, "Created presenter");
            Ok(PresenterHandle::stamp(instance, class, presenter_type, tag.clone()))
        })
    }

    /// Resolves and binds every presenter field of `view`.
    ///
    /// Returns the presenters most-derived level first, then in
    /// declaration order. A view without any binder in its chain gets an
    /// empty list and leaves the factory and presenter stores untouched.
    ///
    /// Every presenter is resolved and every target and presenter checked
    /// against its binder before the first field is written: on error, no
    /// field of `view` has changed. Writing relies on [`View::level_mut`]
    /// answering the same way for both phases.
    ///
    /// # Errors
    /// Any error of binder discovery or [`resolve_one`](Self::resolve_one),
    /// and [`HafizError::FieldBinding`] if a binder can not reach its
    /// field.
    #[instrument(
        skip_all,
        fields(view = %view.view_class().name(), session = session_tag),
        name = "resolve_presenters"
    )]
    pub fn resolve_all(&self, view: &mut dyn View, session_tag: &str) -> Result<Vec<PresenterHandle>> {
        let plan = self.binders.discover(view.view_class())?;
        if plan.is_empty() {
            trace!("No presenter fields declared");
            return Ok(Vec::new());
        }

        let mut resolved: Vec<(&BoundLevel, usize, PresenterHandle)> =
            Vec::with_capacity(plan.field_count());

        for level in plan.levels() {
            check_target(view, level)?;

            for (index, field) in level.binder.presenter_fields().iter().enumerate() {
                let handle = self.resolve_one(field, &*view, session_tag)?;
                if !level.binder.accepts_presenter(index, &handle) {
                    return Err(binding_error(
                        level,
                        field.name(),
                        format!("presenter {} does not fit the field", handle.class()),
                    ));
                }
                resolved.push((level, index, handle));
            }
        }

        let mut presenters = Vec::with_capacity(resolved.len());
        for (level, index, handle) in resolved {
            let target = view.level_mut(&level.class).ok_or_else(|| {
                binding_error(level, "*", "level disappeared while binding".to_owned())
            })?;
            level.binder.set_presenter(target, index, &handle);
            presenters.push(handle);
        }

        debug!(presenters = presenters.len(), "Bound presenters");
        Ok(presenters)
    }
}

fn check_target(view: &mut dyn View, level: &BoundLevel) -> Result<()> {
    let target = view.level_mut(&level.class).ok_or_else(|| {
        binding_error(level, "*", "view does not expose this level".to_owned())
    })?;

    if !level.binder.accepts(&*target) {
        return Err(binding_error(
            level,
            "*",
            "level target is of another type".to_owned(),
        ));
    }
    Ok(())
}

fn binding_error(level: &BoundLevel, field: &'static str, reason: String) -> HafizError {
    HafizError::FieldBinding(FieldBindingError {
        view_class: level.class,
        field,
        reason,
    })
}
