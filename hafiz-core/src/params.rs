//! Construction params and the holders that produce them.
//!
//! A [`ParamsHolder`] turns a field declaration (and optionally the view)
//! into [`Params`]; the field's factory then turns the params into a tag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::binder::PresenterField;
use crate::error::{HafizError, Result};
use crate::view::View;

/// Construction params of one presenter.
///
/// Entries are kept sorted so that equal params always render the same
/// way. The session namespace is kept apart from the entries: it scopes
/// a presenter to one view lifecycle but does not parameterize it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Params {
    #[serde(default)]
    entries: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Params::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets an entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `true` when there are no distinguishing entries.
    ///
    /// The session namespace does not count.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn with_session(mut self, session_tag: impl Into<String>) -> Self {
        self.session = Some(session_tag.into());
        self
    }

    pub fn without_session(mut self) -> Self {
        self.session = None;
        self
    }

    /// `self` layered over `defaults`: entries of `self` win.
    pub fn merged_over(self, defaults: &Params) -> Self {
        let mut entries = defaults.entries.clone();
        entries.extend(self.entries);
        Self {
            entries,
            session: self.session.or_else(|| defaults.session.clone()),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            session: None,
        }
    }
}

/// Produces the params of a presenter field.
///
/// Holders are looked up once per holder type and then shared, so they
/// must not keep per-view state.
pub trait ParamsHolder: Send + Sync {
    fn params(&self, field: &PresenterField, view: &dyn View, session_tag: &str) -> Result<Params>;
}

/// Returns the params declared on the field.
///
/// Needs nothing from the view. Local presenters are additionally
/// namespaced by the session tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultParamsHolder;

impl ParamsHolder for DefaultParamsHolder {
    fn params(&self, field: &PresenterField, _view: &dyn View, session_tag: &str) -> Result<Params> {
        Ok(namespaced(field.declared_params().clone(), field, session_tag))
    }
}

/// Asks the view's [`ParamsProvider`](crate::view::ParamsProvider) for
/// params computed at runtime, layered over the declared ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProvidedParamsHolder;

impl ParamsHolder for ProvidedParamsHolder {
    fn params(&self, field: &PresenterField, view: &dyn View, session_tag: &str) -> Result<Params> {
        let provided = view
            .params_provider()
            .and_then(|provider| provider.provide_params(field))
            .ok_or_else(|| HafizError::MissingParams {
                view: view.view_class().key(),
                field: field.name(),
            })?;

        trace!(field = field.name(), entries = provided.len(), "View provided params");
        let params = provided.without_session().merged_over(field.declared_params());
        Ok(namespaced(params, field, session_tag))
    }
}

fn namespaced(params: Params, field: &PresenterField, session_tag: &str) -> Params {
    if field.presenter_type().is_session_bound() {
        params.with_session(session_tag)
    } else {
        params
    }
}
