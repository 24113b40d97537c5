//! # The retention context
//!
//! Owns everything presenter resolution needs: the binder registry, the
//! factory store and the presenter store. Passing a context explicitly
//! keeps independent registries apart (one per test, one per window);
//! [`global`] offers a lazily built process-wide one.
//!
//! # Architecture
//! ```text
//! RetentionContextBuilder ──build()──> RetentionContext
//!                                        │
//!                              resolve_all(view, session)
//!                                        │
//!             ┌──────────────────────────┼──────────────────────┐
//!             ▼                          ▼                      ▼
//!       BinderRegistry              FactoryStore           PresenterStore
//!       (binding plans)        (factories, holders)     (type, tag) → presenter
//! ```

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::binder::{BinderFactory, BinderRegistration, BinderRegistry, PresenterBinder};
use crate::config::HafizConfig;
use crate::error::{BoxError, Result};
use crate::factory::FactoryStore;
use crate::store::PresenterStore;
use crate::view::ViewClass;

// ============================================================
// RetentionContextBuilder
// ============================================================

enum BinderSource {
    Explicit(&'static ViewClass, BinderFactory),
    Inventory,
}

/// Builds a [`RetentionContext`].
///
/// Binders are collected first and registered on
/// [`build()`](RetentionContextBuilder::build), once the configured
/// binder suffix is known.
///
/// # Examples
/// ```rust,ignore
/// let context = RetentionContext::builder()
///     .config(HafizConfig::from_env())
///     .bind_view(&HOME_SCREEN, home_binder())
///     .with_registered_binders()
///     .build()?;
/// ```
pub struct RetentionContextBuilder {
    config: HafizConfig,
    sources: Vec<BinderSource>,
}

impl RetentionContextBuilder {
    fn new() -> Self {
        Self {
            config: HafizConfig::default(),
            sources: Vec::new(),
        }
    }

    pub fn config(mut self, config: HafizConfig) -> Self {
        self.config = config;
        self
    }

    /// Allow a later binder for the same view class to replace an earlier one.
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.config.allow_override = allow;
        self
    }

    /// Registers `binder` for the view class `class`.
    pub fn bind_view(self, class: &'static ViewClass, binder: impl PresenterBinder + 'static) -> Self {
        let binder: Arc<dyn PresenterBinder> = Arc::new(binder);
        self.bind_view_with(class, move || Ok(Arc::clone(&binder)))
    }

    /// Registers a binder constructor for `class`.
    ///
    /// The constructor runs on first discovery. If it fails, resolution
    /// of every view whose chain contains `class` fails.
    pub fn bind_view_with(
        mut self,
        class: &'static ViewClass,
        construct: impl Fn() -> std::result::Result<Arc<dyn PresenterBinder>, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.sources
            .push(BinderSource::Explicit(class, Arc::new(construct)));
        self
    }

    /// Registers every binder submitted with `inventory::submit!`.
    pub fn with_registered_binders(mut self) -> Self {
        self.sources.push(BinderSource::Inventory);
        self
    }

    /// Builds the context.
    ///
    /// # Errors
    /// [`HafizError::AlreadyRegistered`](crate::error::HafizError::AlreadyRegistered)
    /// if two binders target one view class and overriding is disabled.
    #[instrument(skip(self), name = "context_build")]
    pub fn build(self) -> Result<RetentionContext> {
        let mut binders = BinderRegistry::new(self.config.binder_suffix.clone());

        for source in self.sources {
            match source {
                BinderSource::Explicit(class, factory) => {
                    binders.register(class, factory, self.config.allow_override)?;
                }
                BinderSource::Inventory => {
                    for registration in inventory::iter::<BinderRegistration> {
                        let construct = registration.binder;
                        binders.register(
                            (registration.view)(),
                            Arc::new(construct),
                            self.config.allow_override,
                        )?;
                    }
                }
            }
        }

        info!(binders = binders.len(), "Retention context built ✓");
        Ok(RetentionContext {
            config: self.config,
            binders,
            factories: FactoryStore::new(),
            store: PresenterStore::new(),
        })
    }
}

// ============================================================
// RetentionContext
// ============================================================

/// Thread-safe owner of binders, factories and retained presenters.
///
/// Created by [`RetentionContextBuilder::build()`]. Resolution lives in
/// [`processor`](crate::processor).
pub struct RetentionContext {
    pub(crate) config: HafizConfig,
    pub(crate) binders: BinderRegistry,
    pub(crate) factories: FactoryStore,
    pub(crate) store: PresenterStore,
}

impl RetentionContext {
    /// Create a new builder.
    pub fn builder() -> RetentionContextBuilder {
        RetentionContextBuilder::new()
    }

    pub fn config(&self) -> &HafizConfig {
        &self.config
    }

    pub fn binders(&self) -> &BinderRegistry {
        &self.binders
    }

    pub fn factories(&self) -> &FactoryStore {
        &self.factories
    }

    /// The retained presenters.
    ///
    /// Eviction is up to the caller: see [`PresenterStore::remove`].
    pub fn store(&self) -> &PresenterStore {
        &self.store
    }
}

impl fmt::Debug for RetentionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetentionContext")
            .field("binders", &self.binders.len())
            .field("factories", &self.factories)
            .field("presenters", &self.store.len())
            .finish()
    }
}

static GLOBAL: OnceCell<RetentionContext> = OnceCell::new();

/// The process-wide context, built on first call from
/// [`HafizConfig::from_env`] and all `inventory` registrations.
///
/// A failed build is returned and retried on the next call.
pub fn global() -> Result<&'static RetentionContext> {
    GLOBAL.get_or_try_init(|| {
        debug!("Building global retention context");
        RetentionContext::builder()
            .config(HafizConfig::from_env())
            .with_registered_binders()
            .build()
    })
}
