use std::time::Duration;

use super::*;

use crate::{
    error::PersistenceError,
    session::{MemorySessionStore, USER_KEY},
    test_support::{options, router_for, Call, TestStore},
    views::{
        ACTIVE_ICON_CLASS, BILLS_TITLE, DASHBOARD_TITLE, LOADING_TEXT, NEW_BILL_TITLE,
        UNAUTHORIZED_ACTION,
    },
};

fn employee() -> Option<User> {
    Some(User::employee("a@a"))
}

fn admin() -> Option<User> {
    Some(User::admin("admin@a"))
}

fn fixture_router(user: Option<User>) -> Arc<Router> {
    router_for(user, Arc::new(TestStore::fixtures()), RecordUpdateMode::Detached)
}

#[tokio::test]
async fn start_lands_on_role_home() {
    for (user, expected) in [
        (None, Route::Login),
        (employee(), Route::Bills),
        (admin(), Route::Dashboard),
    ] {
        let router = fixture_router(user.clone());
        router.start(&Location::root()).await;

        let origin = Url::parse("http://localhost:8080").expect("origin");
        let history = router.context().history().await;
        assert_eq!(
            history.current(),
            origin.join(expected.path()).ok().as_ref(),
            "{user:?}"
        );
        assert_eq!(router.home(), expected);
    }
}

#[tokio::test]
async fn start_without_user_shows_login() {
    let router = fixture_router(None);
    router.start(&Location::root()).await;

    assert_eq!(router.screen().await.view(), &View::Login);
    assert!(router.login_controller().await.is_some());
}

#[tokio::test]
async fn start_honours_recognised_fragment() {
    let store = Arc::new(TestStore::fixtures());
    let router = router_for(employee(), Arc::clone(&store), RecordUpdateMode::Detached);

    router
        .start(&Location::new("/", Route::NewBill.path()))
        .await;

    assert!(router.screen().await.contains_text(NEW_BILL_TITLE));
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn start_with_unknown_fragment_falls_back_home() {
    let router = fixture_router(admin());

    router.start(&Location::new("/", "#nowhere")).await;

    assert!(router.screen().await.contains_text(DASHBOARD_TITLE));
}

#[tokio::test]
async fn new_bill_refuses_non_employees_without_fetching() {
    for user in [None, admin()] {
        let store = Arc::new(TestStore::fixtures());
        let router = router_for(user, Arc::clone(&store), RecordUpdateMode::Detached);

        router.navigate(Route::NewBill).await;

        let screen = router.screen().await;
        assert_eq!(
            screen.view(),
            &View::Error {
                route: Route::NewBill,
                kind: ErrorKind::Unauthorized,
            }
        );
        assert!(screen.contains_text(UNAUTHORIZED_ACTION));
        assert!(store.calls().await.is_empty());
        assert!(router.new_bill_controller().await.is_none());
    }
}

#[tokio::test]
async fn employee_new_bill_shows_form_with_mail_icon() {
    let router = fixture_router(employee());

    router.navigate(Route::NewBill).await;

    let screen = router.screen().await;
    assert!(screen.contains_text(NEW_BILL_TITLE));
    assert_eq!(screen.form().map(|form| form.error_message.as_str()), Some(""));
    assert!(screen.icons().mail_active);
    assert!(!screen.icons().window_active);
}

#[tokio::test]
async fn bills_refuse_admin_after_fetch() {
    let store = Arc::new(TestStore::fixtures());
    let router = router_for(admin(), Arc::clone(&store), RecordUpdateMode::Detached);

    router.navigate(Route::Bills).await;

    assert!(router.screen().await.contains_text(UNAUTHORIZED_ACTION));
    assert_eq!(store.calls().await, vec![Call::List]);
    assert!(router.bills_controller().await.is_none());
}

#[tokio::test]
async fn bills_without_session_user_are_refused() {
    let store = Arc::new(TestStore::fixtures());
    let router = router_for(None, Arc::clone(&store), RecordUpdateMode::Detached);

    router.navigate(Route::Bills).await;

    assert!(router.screen().await.contains_text(UNAUTHORIZED_ACTION));
}

#[tokio::test]
async fn employee_bills_light_window_icon() {
    let router = fixture_router(employee());

    router.navigate(Route::Bills).await;

    let screen = router.screen().await;
    assert!(screen.contains_text(BILLS_TITLE));
    assert!(screen.icons().window_active);
    assert!(!screen.icons().mail_active);
    assert!(screen.render().contains(ACTIVE_ICON_CLASS));
}

#[tokio::test]
async fn list_failure_renders_error_and_router_recovers() {
    for status in [404, 500] {
        let store = Arc::new(TestStore::fixtures());
        let router = router_for(employee(), Arc::clone(&store), RecordUpdateMode::Detached);
        store.fail_next_list(PersistenceError::status(status)).await;

        router.navigate(Route::Bills).await;

        let screen = router.screen().await;
        let expected = format!("Erreur {status}");
        assert_eq!(
            screen.view(),
            &View::Error {
                route: Route::Bills,
                kind: ErrorKind::FetchFailed(expected.clone()),
            }
        );
        assert!(screen.contains_text(&expected));

        router.navigate(Route::Bills).await;
        assert!(router.screen().await.contains_text(BILLS_TITLE));
    }
}

#[tokio::test]
async fn dashboard_lists_every_users_bills_for_admin() {
    let router = fixture_router(admin());

    router.navigate(Route::Dashboard).await;

    let screen = router.screen().await;
    let View::Dashboard(bills) = screen.view() else {
        panic!("expected dashboard, got {:?}", screen.view());
    };
    assert_eq!(bills.len(), 5);
    assert_eq!(bills[0].date, "2005-05-05");
    assert!(screen.contains_text(DASHBOARD_TITLE));
    assert!(router.dashboard_controller().await.is_some());
}

#[tokio::test]
async fn dashboard_refuses_employee() {
    let router = fixture_router(employee());

    router.navigate(Route::Dashboard).await;

    assert!(router.screen().await.contains_text(UNAUTHORIZED_ACTION));
    assert!(router.dashboard_controller().await.is_none());
}

#[tokio::test]
async fn navigation_records_history_without_repeats() {
    let router = fixture_router(employee());

    router.navigate(Route::Bills).await;
    router.navigate(Route::Bills).await;
    router.navigate(Route::NewBill).await;

    let history = router.context().history().await;
    let entries: Vec<&str> = history.entries().iter().map(|url| url.as_str()).collect();
    assert_eq!(
        entries,
        vec![
            "http://localhost:8080/#employee/bills",
            "http://localhost:8080/#employee/bill/new",
        ]
    );
}

#[tokio::test]
async fn pop_state_prefers_previous_location() {
    let router = fixture_router(employee());
    router.context().set_previous_location(Some(Route::NewBill)).await;

    router.pop_state().await;

    assert!(router.screen().await.contains_text(NEW_BILL_TITLE));
}

#[tokio::test]
async fn pop_state_without_previous_location_goes_home() {
    let router = fixture_router(employee());
    router.navigate(Route::NewBill).await;

    router.pop_state().await;

    assert!(router.screen().await.contains_text(BILLS_TITLE));
}

#[tokio::test]
async fn sign_in_stores_user_and_moves_home() {
    let router = fixture_router(None);
    router.start(&Location::root()).await;
    let login = router.login_controller().await.expect("login controller");

    let home = login.sign_in(&User::employee("a@a")).await.expect("sign in");

    assert_eq!(home, Route::Bills);
    assert_eq!(router.current_user(), employee());
    assert_eq!(router.context().previous_location().await, Some(Route::Bills));
    assert!(router.screen().await.contains_text(BILLS_TITLE));
}

#[tokio::test]
async fn logout_clears_session_and_shows_login() {
    let router = fixture_router(employee());
    router.navigate(Route::Bills).await;

    router.logout().await.expect("logout");

    assert_eq!(router.current_user(), None);
    assert_eq!(router.screen().await.view(), &View::Login);
    assert_eq!(router.home(), Route::Login);
}

#[tokio::test]
async fn slow_fetch_does_not_overwrite_newer_screen() {
    let store = Arc::new(TestStore::fixtures().slow_list(Duration::from_millis(100)));
    let router = router_for(employee(), Arc::clone(&store), RecordUpdateMode::Detached);

    let background = {
        let router = Arc::clone(&router);
        tokio::spawn(async move { router.navigate(Route::Bills).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(router.screen().await.contains_text(LOADING_TEXT));

    router.navigate(Route::NewBill).await;
    background.await.expect("bills navigation");

    let screen = router.screen().await;
    assert!(screen.contains_text(NEW_BILL_TITLE));
    assert!(router.new_bill_controller().await.is_some());
}

#[tokio::test]
async fn double_encoded_session_user_is_recognised() {
    let session = MemorySessionStore::new();
    let inner = serde_json::to_string(&User::employee("a@a")).expect("encode");
    let outer = serde_json::to_string(&inner).expect("encode");
    session.set_item(USER_KEY, &outer).expect("seed session");
    let router = Router::new(
        Arc::new(session),
        Arc::new(TestStore::fixtures()),
        options(RecordUpdateMode::Detached),
    );

    router.start(&Location::root()).await;

    assert_eq!(router.current_user(), employee());
    assert!(router.screen().await.contains_text(BILLS_TITLE));
}

#[tokio::test]
async fn undecodable_session_user_counts_as_signed_out() {
    let session = MemorySessionStore::new();
    session.set_item(USER_KEY, "{not json").expect("seed session");
    let router = Router::new(
        Arc::new(session),
        Arc::new(TestStore::fixtures()),
        options(RecordUpdateMode::Detached),
    );

    router.start(&Location::root()).await;

    assert_eq!(router.screen().await.view(), &View::Login);
}

#[tokio::test]
async fn controller_for_a_replaced_render_is_not_bound() {
    let router = fixture_router(employee());
    router.navigate(Route::Bills).await;
    let stale = router.screen().await.generation();
    router.navigate(Route::NewBill).await;

    let bound = router
        .activate(
            stale,
            ActiveController::Bills(BillsController::new(
                Arc::clone(router.context()),
                Arc::new(TestStore::fixtures()),
                BillScope::All,
                stale,
            )),
        )
        .await;

    assert!(!bound);
    assert!(router.new_bill_controller().await.is_some());
    assert!(router.bills_controller().await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_navigations_bind_the_controller_on_screen() {
    for _ in 0..50 {
        let router = fixture_router(employee());
        let bills = {
            let router = Arc::clone(&router);
            tokio::spawn(async move { router.navigate(Route::Bills).await })
        };
        let new_bill = {
            let router = Arc::clone(&router);
            tokio::spawn(async move { router.navigate(Route::NewBill).await })
        };
        bills.await.expect("bills navigation");
        new_bill.await.expect("new bill navigation");

        let screen = router.screen().await;
        match router.active_controller().await {
            ActiveController::Bills(_) => assert!(matches!(screen.view(), View::Bills(_))),
            ActiveController::NewBill(_) => assert!(screen.form().is_some()),
            ActiveController::None => {}
            _ => panic!("unexpected controller for {:?}", screen.view()),
        }
    }
}
