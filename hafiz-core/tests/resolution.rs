//! End-to-end presenter resolution against a three-level view hierarchy.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use hafiz_core::prelude::*;
use once_cell::sync::Lazy;

// === Presenters ===

#[derive(Default)]
struct ToolbarPresenter;

#[derive(Default)]
struct ListPresenter;

#[derive(Default)]
struct SearchPresenter;

#[derive(Default)]
struct ProfilePresenter;

// === Views: SearchScreen → ListScreen → BaseScreen ===

#[derive(Default)]
struct BaseScreen {
    toolbar: Option<Arc<ToolbarPresenter>>,
}

#[derive(Default)]
struct ListScreen {
    base: BaseScreen,
    list: Option<Arc<ListPresenter>>,
}

#[derive(Default)]
struct SearchScreen {
    base: ListScreen,
    search: Option<Arc<SearchPresenter>>,
}

static BASE_SCREEN: Lazy<ViewClass> = Lazy::new(ViewClass::of::<BaseScreen>);
static LIST_SCREEN: Lazy<ViewClass> = Lazy::new(|| ViewClass::extending::<ListScreen>(&BASE_SCREEN));
static SEARCH_SCREEN: Lazy<ViewClass> =
    Lazy::new(|| ViewClass::extending::<SearchScreen>(&LIST_SCREEN));

impl View for BaseScreen {
    fn view_class(&self) -> &'static ViewClass {
        &BASE_SCREEN
    }

    fn level_mut(&mut self, class: &ClassKey) -> Option<&mut dyn Any> {
        (*class == ClassKey::of::<Self>()).then_some(self as &mut dyn Any)
    }
}

impl View for ListScreen {
    fn view_class(&self) -> &'static ViewClass {
        &LIST_SCREEN
    }

    fn level_mut(&mut self, class: &ClassKey) -> Option<&mut dyn Any> {
        if *class == ClassKey::of::<Self>() {
            return Some(self);
        }
        self.base.level_mut(class)
    }
}

impl View for SearchScreen {
    fn view_class(&self) -> &'static ViewClass {
        &SEARCH_SCREEN
    }

    fn level_mut(&mut self, class: &ClassKey) -> Option<&mut dyn Any> {
        if *class == ClassKey::of::<Self>() {
            return Some(self);
        }
        self.base.level_mut(class)
    }
}

// A view with no binder anywhere in its chain.
#[derive(Default)]
struct SplashScreen;

static SPLASH_SCREEN: Lazy<ViewClass> = Lazy::new(ViewClass::of::<SplashScreen>);

impl View for SplashScreen {
    fn view_class(&self) -> &'static ViewClass {
        &SPLASH_SCREEN
    }

    fn level_mut(&mut self, class: &ClassKey) -> Option<&mut dyn Any> {
        (*class == ClassKey::of::<Self>()).then_some(self as &mut dyn Any)
    }
}

// A single-level view with a parameterized presenter.
#[derive(Default)]
struct ProfileScreen {
    profile: Option<Arc<ProfilePresenter>>,
}

static PROFILE_SCREEN: Lazy<ViewClass> = Lazy::new(ViewClass::of::<ProfileScreen>);

impl View for ProfileScreen {
    fn view_class(&self) -> &'static ViewClass {
        &PROFILE_SCREEN
    }

    fn level_mut(&mut self, class: &ClassKey) -> Option<&mut dyn Any> {
        (*class == ClassKey::of::<Self>()).then_some(self as &mut dyn Any)
    }
}

// === Binders ===

fn base_binder() -> TypedBinder<BaseScreen> {
    TypedBinder::<BaseScreen>::new().field(
        PresenterField::new::<ToolbarPresenter>("toolbar"),
        |screen, p: Arc<ToolbarPresenter>| screen.toolbar = Some(p),
    )
}

fn list_binder() -> TypedBinder<ListScreen> {
    TypedBinder::<ListScreen>::new().field(
        PresenterField::new::<ListPresenter>("list"),
        |screen, p: Arc<ListPresenter>| screen.list = Some(p),
    )
}

fn search_binder() -> TypedBinder<SearchScreen> {
    TypedBinder::<SearchScreen>::new().field(
        PresenterField::new::<SearchPresenter>("search"),
        |screen, p: Arc<SearchPresenter>| screen.search = Some(p),
    )
}

fn profile_binder(field: PresenterField) -> TypedBinder<ProfileScreen> {
    TypedBinder::<ProfileScreen>::new()
        .field(field, |screen, p: Arc<ProfilePresenter>| screen.profile = Some(p))
}

fn hierarchy_context() -> RetentionContext {
    let _ = hafiz_support::logging::init("hafiz_core=debug");

    RetentionContext::builder()
        .bind_view(&BASE_SCREEN, base_binder())
        .bind_view(&LIST_SCREEN, list_binder())
        .bind_view(&SEARCH_SCREEN, search_binder())
        .build()
        .unwrap()
}

// === Tests ===

#[test]
fn ancestor_fields_most_derived_first() {
    let context = hierarchy_context();
    let mut screen = SearchScreen::default();

    let presenters = context.resolve_all(&mut screen, "s1").unwrap();

    let classes: Vec<ClassKey> = presenters.iter().map(PresenterHandle::class).collect();
    assert_eq!(
        classes,
        vec![
            ClassKey::of::<SearchPresenter>(),
            ClassKey::of::<ListPresenter>(),
            ClassKey::of::<ToolbarPresenter>(),
        ]
    );

    assert!(screen.search.is_some());
    assert!(screen.base.list.is_some());
    assert!(screen.base.base.toolbar.is_some());
}

#[test]
fn bound_fields_hold_returned_presenters() {
    let context = hierarchy_context();
    let mut screen = SearchScreen::default();

    let presenters = context.resolve_all(&mut screen, "s1").unwrap();

    let search = presenters[0].downcast::<SearchPresenter>().unwrap();
    assert!(Arc::ptr_eq(&search, screen.search.as_ref().unwrap()));
}

#[test]
fn recreated_view_reattaches_same_presenters() {
    let context = hierarchy_context();

    let mut first = SearchScreen::default();
    let before = context.resolve_all(&mut first, "s1").unwrap();
    drop(first);

    let mut recreated = SearchScreen::default();
    let after = context.resolve_all(&mut recreated, "s1").unwrap();

    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert!(a.ptr_eq(b));
        assert_eq!(a.tag(), b.tag());
    }
    assert_eq!(context.store().len(), 3);
}

#[test]
fn screen_a_scenario() {
    let context = hierarchy_context();

    let mut first = BaseScreen::default();
    let p1 = context.resolve_all(&mut first, "s1").unwrap().remove(0);

    let mut second = BaseScreen::default();
    let p2 = context.resolve_all(&mut second, "s2").unwrap().remove(0);
    assert!(!p1.ptr_eq(&p2));
    assert_ne!(p1.tag(), p2.tag());

    let again = context.resolve_all(&mut first, "s1").unwrap().remove(0);
    assert!(again.ptr_eq(&p1));
}

#[test]
fn same_params_share_presenter_across_sessions() {
    let field = PresenterField::new::<ProfilePresenter>("profile").with_param("user", "42");
    let context = RetentionContext::builder()
        .bind_view(&PROFILE_SCREEN, profile_binder(field))
        .build()
        .unwrap();

    let mut a = ProfileScreen::default();
    let mut b = ProfileScreen::default();
    let pa = context.resolve_all(&mut a, "s1").unwrap();
    let pb = context.resolve_all(&mut b, "s2").unwrap();

    assert!(pa[0].ptr_eq(&pb[0]));
    assert!(Arc::ptr_eq(a.profile.as_ref().unwrap(), b.profile.as_ref().unwrap()));
}

#[test]
fn distinct_params_never_share_presenter() {
    let context = RetentionContext::builder().build().unwrap();
    let view = ProfileScreen::default();

    let alice = PresenterField::new::<ProfilePresenter>("profile").with_param("user", "alice");
    let bob = PresenterField::new::<ProfilePresenter>("profile").with_param("user", "bob");

    let pa = context.resolve_one(&alice, &view, "s1").unwrap();
    let pb = context.resolve_one(&bob, &view, "s1").unwrap();

    assert!(!pa.ptr_eq(&pb));
    assert_ne!(pa.tag(), pb.tag());
    assert_eq!(context.store().len(), 2);
}

#[test]
fn view_without_binders_touches_nothing() {
    let context = hierarchy_context();
    let mut splash = SplashScreen;

    let presenters = context.resolve_all(&mut splash, "s1").unwrap();

    assert!(presenters.is_empty());
    assert!(context.store().is_empty());
    assert_eq!(context.factories().factory_count(), 0);
    assert_eq!(context.factories().holder_count(), 0);
}

#[test]
fn concurrent_resolution_constructs_once() {
    const THREADS: usize = 16;
    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    let field = PresenterField::supplied_by("profile", || {
        CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        ProfilePresenter
    })
    .with_param("user", "shared");

    let context = RetentionContext::builder()
        .bind_view(&PROFILE_SCREEN, profile_binder(field))
        .build()
        .unwrap();
    let barrier = Barrier::new(THREADS);

    let handles: Vec<PresenterHandle> = thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|i| {
                let context = &context;
                let barrier = &barrier;
                scope.spawn(move || {
                    let mut screen = ProfileScreen::default();
                    barrier.wait();
                    let mut resolved = context
                        .resolve_all(&mut screen, &format!("session-{i}"))
                        .unwrap();
                    assert!(screen.profile.is_some());
                    resolved.remove(0)
                })
            })
            .collect();

        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
    assert!(handles.iter().all(|h| h.ptr_eq(&handles[0])));
    assert_eq!(context.store().len(), 1);
}

#[test]
fn broken_binder_aborts_without_binding() {
    let context = RetentionContext::builder()
        .bind_view(&BASE_SCREEN, base_binder())
        .bind_view_with(&LIST_SCREEN, || Err("generated binder is out of date".into()))
        .bind_view(&SEARCH_SCREEN, search_binder())
        .build()
        .unwrap();

    let mut screen = SearchScreen::default();
    let result = context.resolve_all(&mut screen, "s1");

    match result {
        Err(HafizError::BinderInstantiation(err)) => {
            assert_eq!(err.view_class, ClassKey::of::<ListScreen>());
            assert!(format!("{err}").contains("out of date"));
        }
        other => panic!("Expected BinderInstantiation, got: {other:?}"),
    }
    assert!(screen.search.is_none());
    assert!(screen.base.base.toolbar.is_none());
    assert!(context.store().is_empty());
}

#[test]
fn failing_ancestor_factory_leaves_view_untouched() {
    #[derive(Default)]
    struct RefusingFactory;

    impl PresenterFactory for RefusingFactory {
        fn create_tag(&self, class: &ClassKey, _params: &Params) -> Tag {
            Tag::new(class.type_name())
        }

        fn create_presenter(
            &self,
            _default_instance: &hafiz_core::presenter::DefaultInstance,
            _class: &ClassKey,
            _params: &Params,
        ) -> std::result::Result<PresenterInstance, BoxError> {
            Err("backend unavailable".into())
        }
    }

    let toolbar = TypedBinder::<BaseScreen>::new().field(
        PresenterField::new::<ToolbarPresenter>("toolbar")
            .with_factory(FactoryRef::of::<RefusingFactory>()),
        |screen, p: Arc<ToolbarPresenter>| screen.toolbar = Some(p),
    );

    let context = RetentionContext::builder()
        .bind_view(&BASE_SCREEN, toolbar)
        .bind_view(&LIST_SCREEN, list_binder())
        .bind_view(&SEARCH_SCREEN, search_binder())
        .build()
        .unwrap();

    let mut screen = SearchScreen::default();
    let result = context.resolve_all(&mut screen, "s1");

    assert!(matches!(result, Err(HafizError::PresenterConstruction { .. })));
    // the two derived levels resolved, but nothing was written
    assert!(screen.search.is_none());
    assert!(screen.base.list.is_none());
    assert!(screen.base.base.toolbar.is_none());
}

#[test]
fn unconstructible_factory_is_fatal() {
    let field = PresenterField::new::<ProfilePresenter>("profile")
        .with_factory(FactoryRef::with::<DefaultPresenterFactory>(|| Err("no access".into())));
    let context = RetentionContext::builder()
        .bind_view(&PROFILE_SCREEN, profile_binder(field))
        .build()
        .unwrap();

    let mut screen = ProfileScreen::default();
    let result = context.resolve_all(&mut screen, "s1");

    match result {
        Err(HafizError::FactoryInstantiation { factory, .. }) => {
            assert_eq!(factory, ClassKey::of::<DefaultPresenterFactory>());
        }
        other => panic!("Expected FactoryInstantiation, got: {other:?}"),
    }
    assert!(screen.profile.is_none());
}

#[test]
fn evicted_presenter_is_recreated() {
    let context = hierarchy_context();

    let mut screen = BaseScreen::default();
    let first = context.resolve_all(&mut screen, "s1").unwrap().remove(0);

    let evicted = context.store().remove(first.presenter_type(), first.tag()).unwrap();
    assert!(evicted.ptr_eq(&first));

    let mut recreated = BaseScreen::default();
    let second = context.resolve_all(&mut recreated, "s1").unwrap().remove(0);
    assert!(!second.ptr_eq(&first));
    assert_eq!(second.tag(), first.tag());
}

#[test]
fn generated_session_tags_separate_views() {
    let context = hierarchy_context();

    let mut a = BaseScreen::default();
    let mut b = BaseScreen::default();
    let session_a = generate_session_tag(a.view_class());
    let session_b = generate_session_tag(b.view_class());

    let pa = context.resolve_all(&mut a, &session_a).unwrap();
    let pb = context.resolve_all(&mut b, &session_b).unwrap();
    assert!(!pa[0].ptr_eq(&pb[0]));
}

// Declares the toolbar field but only takes presenters it was built for.
struct PickyToolbarBinder {
    fields: Vec<PresenterField>,
    wanted: ClassKey,
}

impl PresenterBinder for PickyToolbarBinder {
    fn presenter_fields(&self) -> &[PresenterField] {
        &self.fields
    }

    fn accepts(&self, target: &dyn Any) -> bool {
        target.is::<BaseScreen>()
    }

    fn accepts_presenter(&self, _index: usize, presenter: &PresenterHandle) -> bool {
        presenter.class() == self.wanted
    }

    fn set_presenter(&self, target: &mut dyn Any, _index: usize, presenter: &PresenterHandle) {
        if let (Some(screen), Some(toolbar)) = (
            target.downcast_mut::<BaseScreen>(),
            presenter.downcast::<ToolbarPresenter>(),
        ) {
            screen.toolbar = Some(toolbar);
        }
    }
}

#[test]
fn hand_written_binder_rejecting_ancestor_field_leaves_view_untouched() {
    let picky = PickyToolbarBinder {
        fields: vec![PresenterField::new::<ToolbarPresenter>("toolbar")],
        wanted: ClassKey::of::<ProfilePresenter>(),
    };

    let context = RetentionContext::builder()
        .bind_view(&BASE_SCREEN, picky)
        .bind_view(&LIST_SCREEN, list_binder())
        .bind_view(&SEARCH_SCREEN, search_binder())
        .build()
        .unwrap();

    let mut screen = SearchScreen::default();
    let result = context.resolve_all(&mut screen, "s1");

    match result {
        Err(HafizError::FieldBinding(err)) => {
            assert_eq!(err.view_class, ClassKey::of::<BaseScreen>());
            assert_eq!(err.field, "toolbar");
        }
        other => panic!("Expected FieldBinding, got: {other:?}"),
    }
    assert!(screen.search.is_none());
    assert!(screen.base.list.is_none());
    assert!(screen.base.base.toolbar.is_none());
}

#[test]
fn hand_written_binder_binds_when_checks_pass() {
    let picky = PickyToolbarBinder {
        fields: vec![PresenterField::new::<ToolbarPresenter>("toolbar")],
        wanted: ClassKey::of::<ToolbarPresenter>(),
    };

    let context = RetentionContext::builder()
        .bind_view(&BASE_SCREEN, picky)
        .bind_view(&LIST_SCREEN, list_binder())
        .build()
        .unwrap();

    let mut screen = ListScreen::default();
    let presenters = context.resolve_all(&mut screen, "s1").unwrap();

    assert_eq!(presenters.len(), 2);
    assert!(screen.list.is_some());
    assert!(screen.base.toolbar.is_some());
}
