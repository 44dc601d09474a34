use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};

use voice_memo::clock::{Clock, ManualClock};
use voice_memo::config::AssistantConfig;
use voice_memo::error::{SearchError, UserError};
use voice_memo::router::Router;
use voice_memo::search::{UrlOpener, WebSearch};
use voice_memo::store::{load_data, Store, TIMESTAMP_FORMAT};

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
}

fn open(dir: &tempfile::TempDir, clock: Arc<ManualClock>) -> Store {
    Store::open(
        dir.path().join("data").join("assistant_data.json"),
        clock,
        &AssistantConfig::default(),
    )
}

#[test]
fn trash_in_five_minutes() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(at("2024-01-01 10:00:00")));
    let store = open(&dir, clock);

    assert_eq!(
        store.add("take out trash", "in 5 minutes").unwrap(),
        "I'll remind you to take out trash in 5 minutes"
    );
    assert_eq!(store.list()[0].when, "2024-01-01 10:05:00");
}

#[test]
fn yesterday_is_rejected_without_touching_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(at("2024-01-01 10:00:00")));
    let store = open(&dir, clock);
    store.add("existing", "in 1 hour").unwrap();
    let before = load_data(store.path()).unwrap();

    assert_eq!(store.add("call mom", "yesterday"), Err(UserError::PastTime));
    assert_eq!(store.snapshot(), before);
    assert_eq!(load_data(store.path()).unwrap(), before);
}

#[test]
fn two_due_reminders_clear_in_one_scan() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(at("2024-01-01 10:00:00")));
    let store = open(&dir, clock.clone());
    store.add("one", "in 1 second").unwrap();
    store.add("two", "in 2 seconds").unwrap();

    clock.set(at("2024-01-01 10:00:02"));
    let scan = store.take_due(clock.now());
    assert_eq!(scan.fired.len(), 2);
    assert!(store.list().is_empty());
    assert!(load_data(store.path()).unwrap().reminders.is_empty());
}

#[test]
fn reminders_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(at("2024-01-01 10:00:00")));
    let store = open(&dir, clock.clone());
    store.add("dentist", "friday at 3pm").unwrap();
    store.add("standup", "tomorrow at 9:30am").unwrap();
    store.add("standup", "tomorrow at 9:30am").unwrap();

    let reopened = open(&dir, clock);
    assert_eq!(reopened.list(), store.list());
    assert_eq!(reopened.list().len(), 3);
}

#[test]
fn router_reports_calendar_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(at("2024-01-01 10:00:00")));
    let store = Arc::new(open(&dir, clock.clone()));
    let router = Router::new(store.clone(), clock);

    let say = |command: &str| router.handle(command).unwrap().text;

    assert_eq!(say("show my reminders"), "You have no reminders set");
    assert_eq!(
        say("remind me yesterday to call mom"),
        "That time has already passed! Please set a future reminder."
    );
    assert_eq!(
        say("remind me whenever to call mom"),
        "Sorry, I didn't understand that time format"
    );
    assert_eq!(
        say("remind me to stretch at 5pm"),
        "Reminder set for 05:00 PM on Monday to stretch"
    );
    assert_eq!(
        say("remind me tomorrow at 9am to pay rent"),
        "Reminder set for 09:00 AM on Tuesday to pay rent"
    );
    assert_eq!(
        say("what's on my calendar for tomorrow"),
        "Events for 2024-01-02:\n- 09:00 AM: pay rent"
    );
    assert_eq!(say("show calendar"), "Events for 2024-01-01:\n- 05:00 PM: stretch");
    assert_eq!(
        say("calendar for someday"),
        "I couldn't understand the date you said."
    );
    assert_eq!(
        store.for_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()).len(),
        1
    );
    assert!(router.handle("   ").is_none());
}

#[derive(Default)]
struct Browser(Mutex<Vec<String>>);

impl UrlOpener for Browser {
    fn open(&self, url: &url::Url) -> Result<(), SearchError> {
        self.0.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

#[test]
fn spoken_search_opens_the_engine_url() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(at("2024-01-01 10:00:00")));
    let store = Arc::new(open(&dir, clock.clone()));
    let browser = Arc::new(Browser::default());
    let router = Router::new(store, clock.clone()).with_search(WebSearch::new(
        "https://www.google.com/search",
        browser.clone(),
    ));

    assert_eq!(
        router.handle("Search for weather in Paris").unwrap().text,
        "Searching the web for weather in paris"
    );
    assert_eq!(
        router.handle("search").unwrap().text,
        "What should I search for?"
    );
    assert_eq!(
        browser.0.lock().unwrap().as_slice(),
        ["https://www.google.com/search?q=weather+in+paris"]
    );

    let offline = Router::new(Arc::new(open(&dir, clock.clone())), clock);
    assert_eq!(
        offline.handle("search rust").unwrap().text,
        "Web search is not available"
    );
}
