//! Behavioural tests of the validation engine through its public API.

use std::sync::{Arc, Barrier};

use chrono::{DateTime, TimeDelta, Utc};
use turnstile_core::{
    AccessWindow, Admin, CatalogSync, Clock, Config, Direction, EntryFilter, EntryRecord, Event,
    EventId, Group, GroupId, ManualClock, MasterKey, MasterKeys, MemoryStorage, NewGroup,
    NewTerminal, ResultCode, Storage, SyncBatch, Terminal, Ticket, TurnstileError, Validator,
};

struct Venue {
    storage: Arc<MemoryStorage>,
    clock: Arc<ManualClock>,
    admin: Admin,
    validator: Arc<Validator>,
    terminal: Terminal,
    other_terminal: Terminal,
    start: DateTime<Utc>,
}

fn ticket(ticket_id: i64, barcode: &str) -> Ticket {
    Ticket {
        ticket_id,
        event_id: 10,
        barcode: barcode.to_string(),
        sector: "Parterre".to_string(),
        price: 1500.0,
        title: "Swan Lake".to_string(),
        source: String::new(),
        last_update: None,
    }
}

/// Event 10 at building 603 hall 1 starting now, two terminals in one group,
/// tickets `T1` and `T2`.
fn venue_with(config: &Config) -> Venue {
    let start = Utc::now();
    let storage = Arc::new(MemoryStorage::new());
    let shared: Arc<dyn Storage> = storage.clone();
    let clock = Arc::new(ManualClock::new(start));
    let keys = Arc::new(MasterKeys::new());
    let admin = Admin::new(Arc::clone(&shared), Arc::clone(&keys));

    let group = admin
        .add_group(NewGroup {
            name: "Opera".to_string(),
            building_id: 603,
            exclude_halls: vec![],
        })
        .unwrap();
    let terminal = admin
        .add_terminal(NewTerminal {
            name: "North gate".to_string(),
            groups: vec![group.id],
        })
        .unwrap();
    let other_terminal = admin
        .add_terminal(NewTerminal {
            name: "South gate".to_string(),
            groups: vec![group.id],
        })
        .unwrap();

    CatalogSync::new(Arc::clone(&shared), AccessWindow::from_config(&config.window))
        .apply(
            SyncBatch {
                event: Event {
                    id: 10,
                    title: "Swan Lake".to_string(),
                    venue_title: "Opera".to_string(),
                    scheduled_at: start,
                    venue_id: 603,
                    hall_id: 1,
                    tickets_cached: 0,
                    last_update: None,
                },
                tickets: vec![ticket(1, "T1"), ticket(2, "T2")],
                source: "box-office".to_string(),
            },
            start,
        )
        .unwrap();

    let validator = Arc::new(Validator::new(
        shared,
        keys,
        Arc::clone(&clock) as Arc<dyn Clock>,
        config,
    ));

    Venue {
        storage,
        clock,
        admin,
        validator,
        terminal,
        other_terminal,
        start,
    }
}

fn venue() -> Venue {
    venue_with(&Config::default())
}

impl Venue {
    fn scan(&self, barcode: &str, direction: Direction) -> ResultCode {
        self.validator
            .register(barcode, &self.terminal, direction)
            .unwrap()
            .result
    }

    fn records(&self, barcode: &str) -> usize {
        self.storage
            .entries(&EntryFilter::barcode(barcode))
            .unwrap()
            .len()
    }
}

#[test]
fn test_entry_then_exit_after_lock_expiry() {
    let v = venue();
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Accept);
    v.clock.advance(TimeDelta::seconds(11));
    assert_eq!(v.scan("T1", Direction::Exit), ResultCode::Accept);
    v.clock.advance(TimeDelta::seconds(11));
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Accept);
}

#[test]
fn test_second_entry_is_reentry() {
    let v = venue();
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Accept);
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Reentry);
    // state alone refuses it once the lock is gone
    v.clock.advance(TimeDelta::minutes(5));
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Reentry);
}

#[test]
fn test_lock_refuses_even_a_permitted_direction() {
    let v = venue();
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Accept);
    v.clock.advance(TimeDelta::seconds(2));
    assert_eq!(v.scan("T1", Direction::Exit), ResultCode::Reentry);
}

#[test]
fn test_lock_is_per_barcode() {
    let v = venue();
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Accept);
    assert_eq!(v.scan("T2", Direction::Entry), ResultCode::Accept);
}

#[test]
fn test_not_found_writes_no_record() {
    let v = venue();
    assert_eq!(v.scan("NOPE", Direction::Entry), ResultCode::NotFound);
    assert_eq!(v.records("NOPE"), 0);
}

#[test]
fn test_every_decision_writes_exactly_one_matching_record() {
    let v = venue();
    let expected = [
        (Direction::Exit, ResultCode::Reentry),
        (Direction::Entry, ResultCode::Accept),
        (Direction::Entry, ResultCode::Reentry),
    ];
    for (i, (direction, result)) in expected.iter().enumerate() {
        assert_eq!(v.scan("T1", *direction), *result);
        let records = v.storage.entries(&EntryFilter::barcode("T1")).unwrap();
        assert_eq!(records.len(), i + 1);
        let last = records.last().unwrap();
        assert_eq!(last.result, *result);
        assert_eq!(last.direction, *direction);
        assert_eq!(last.event_id, 10);
        assert_eq!(last.terminal_id, v.terminal.id);
        assert_eq!(last.recorded_at, v.clock.now());
    }
}

#[test]
fn test_block_after_reentry_window_from_first_entry() {
    let v = venue();
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Accept);

    v.clock.set(v.start + TimeDelta::hours(1));
    assert_eq!(v.scan("T1", Direction::Exit), ResultCode::Accept);

    // exactly at the window boundary the ticket still moves
    v.clock.set(v.start + TimeDelta::hours(2));
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Accept);

    // measured from the first entry, not the latest passage
    v.clock.set(v.start + TimeDelta::hours(2) + TimeDelta::minutes(1));
    assert_eq!(v.scan("T1", Direction::Exit), ResultCode::Reentry);
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Reentry);
}

#[test]
fn test_block_window_needs_a_first_entry() {
    let v = venue();
    // no accepted passage yet, so elapsed time never blocks
    v.clock.set(v.start + TimeDelta::hours(10));
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Accept);
}

#[test]
fn test_event_outside_window_is_not_found() {
    let v = venue();
    v.clock.set(v.start + TimeDelta::hours(16));
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::NotFound);
    v.clock.set(v.start - TimeDelta::hours(1));
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::NotFound);
    assert_eq!(v.records("T1"), 0);
}

#[test]
fn test_terminal_outside_scope_is_not_found() {
    let v = venue();
    let stranger = v
        .admin
        .add_terminal(NewTerminal {
            name: "Annex gate".to_string(),
            groups: vec![],
        })
        .unwrap();
    let outcome = v
        .validator
        .register("T1", &stranger, Direction::Entry)
        .unwrap();
    assert_eq!(outcome.result, ResultCode::NotFound);
    assert_eq!(outcome.barcode, "T1");
}

#[test]
fn test_master_key_always_accepted() {
    let v = venue();
    v.admin
        .add_master_key(MasterKey {
            barcode: "STAFF-1".to_string(),
            title: None,
        })
        .unwrap();

    for direction in [Direction::Entry, Direction::Entry, Direction::Exit] {
        for terminal in [&v.terminal, &v.other_terminal] {
            let outcome = v.validator.register("STAFF-1", terminal, direction).unwrap();
            assert_eq!(outcome.result, ResultCode::Accept);
            assert_eq!(outcome.entry, direction == Direction::Entry);
            assert_eq!(outcome.exit, direction == Direction::Exit);
        }
    }
    v.clock.set(v.start + TimeDelta::days(30));
    assert_eq!(v.scan("STAFF-1", Direction::Entry), ResultCode::Accept);
    assert_eq!(v.records("STAFF-1"), 0);
}

#[test]
fn test_concurrent_entries_have_one_winner() {
    for _ in 0..20 {
        let v = venue();
        let barrier = Arc::new(Barrier::new(2));
        let terminals = [v.terminal.clone(), v.other_terminal.clone()];

        let results: Vec<ResultCode> = std::thread::scope(|s| {
            let handles: Vec<_> = terminals
                .iter()
                .map(|terminal| {
                    let validator = Arc::clone(&v.validator);
                    let barrier = Arc::clone(&barrier);
                    s.spawn(move || {
                        barrier.wait();
                        validator
                            .register("T1", terminal, Direction::Entry)
                            .unwrap()
                            .result
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let accepted = results.iter().filter(|r| **r == ResultCode::Accept).count();
        let refused = results.iter().filter(|r| **r == ResultCode::Reentry).count();
        assert_eq!((accepted, refused), (1, 1));
        assert_eq!(v.records("T1"), 2);
    }
}

#[test]
fn test_lock_ttl_is_configurable() {
    let mut config = Config::default();
    config.anti_passback.lock_ttl_secs = 60;
    let v = venue_with(&config);
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Accept);
    v.clock.advance(TimeDelta::seconds(30));
    assert_eq!(v.scan("T1", Direction::Exit), ResultCode::Reentry);
    v.clock.advance(TimeDelta::seconds(31));
    assert_eq!(v.scan("T1", Direction::Exit), ResultCode::Accept);
}

#[test]
fn test_worked_example() {
    let v = venue();
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Accept);
    assert_eq!(v.scan("T1", Direction::Entry), ResultCode::Reentry);
    v.clock.advance(TimeDelta::seconds(10));
    assert_eq!(v.scan("T1", Direction::Exit), ResultCode::Accept);
}

#[test]
fn test_feed_barcode_with_punctuation_is_scannable() {
    let v = venue();
    CatalogSync::new(
        Arc::clone(&v.storage) as Arc<dyn Storage>,
        AccessWindow::default(),
    )
    .apply(
        SyncBatch {
            event: v.storage.events().unwrap().remove(0),
            tickets: vec![ticket(1, "T1"), ticket(2, "T2"), ticket(3, "4601234/567+89")],
            source: "box-office".to_string(),
        },
        v.start,
    )
    .unwrap();

    assert_eq!(v.scan("4601234/567+89", Direction::Entry), ResultCode::Accept);
    assert_eq!(v.records("4601234/567+89"), 1);
}

#[test]
fn test_unscannable_barcode_is_not_found() {
    let v = venue();
    for barcode in ["", "bad barcode"] {
        let result = v
            .validator
            .register(barcode, &v.terminal, Direction::Entry)
            .unwrap();
        assert_eq!(result.result, ResultCode::NotFound);
        assert_eq!(v.records(barcode), 0);
    }
}

/// Serves reads from memory and rejects every ledger append.
struct FullDisk(MemoryStorage);

impl Storage for FullDisk {
    fn events(&self) -> turnstile_core::Result<Vec<Event>> {
        self.0.events()
    }
    fn upsert_event(&self, event: &Event) -> turnstile_core::Result<()> {
        self.0.upsert_event(event)
    }
    fn find_ticket(
        &self,
        barcode: &str,
        event_ids: Option<&[EventId]>,
    ) -> turnstile_core::Result<Option<Ticket>> {
        self.0.find_ticket(barcode, event_ids)
    }
    fn count_tickets(&self, event_id: EventId) -> turnstile_core::Result<u64> {
        self.0.count_tickets(event_id)
    }
    fn upsert_tickets(&self, tickets: &[Ticket]) -> turnstile_core::Result<()> {
        self.0.upsert_tickets(tickets)
    }
    fn remove_stale_tickets(
        &self,
        event_id: EventId,
        source: &str,
        older_than: DateTime<Utc>,
    ) -> turnstile_core::Result<usize> {
        self.0.remove_stale_tickets(event_id, source, older_than)
    }
    fn groups(&self) -> turnstile_core::Result<Vec<Group>> {
        self.0.groups()
    }
    fn insert_group(&self, group: &Group) -> turnstile_core::Result<()> {
        self.0.insert_group(group)
    }
    fn upsert_group(&self, group: &Group) -> turnstile_core::Result<()> {
        self.0.upsert_group(group)
    }
    fn remove_group(&self, id: GroupId) -> turnstile_core::Result<bool> {
        self.0.remove_group(id)
    }
    fn terminals(&self) -> turnstile_core::Result<Vec<Terminal>> {
        self.0.terminals()
    }
    fn insert_terminal(&self, terminal: &Terminal) -> turnstile_core::Result<()> {
        self.0.insert_terminal(terminal)
    }
    fn update_terminal(&self, terminal: &Terminal) -> turnstile_core::Result<bool> {
        self.0.update_terminal(terminal)
    }
    fn master_keys(&self) -> turnstile_core::Result<Vec<MasterKey>> {
        self.0.master_keys()
    }
    fn insert_master_key(&self, key: &MasterKey) -> turnstile_core::Result<()> {
        self.0.insert_master_key(key)
    }
    fn entries(&self, filter: &EntryFilter<'_>) -> turnstile_core::Result<Vec<EntryRecord>> {
        self.0.entries(filter)
    }
    fn append_entry(&self, _record: &EntryRecord) -> turnstile_core::Result<()> {
        Err(TurnstileError::CannotWrite("no space left on device".to_string()))
    }
}

#[test]
fn test_failed_ledger_append_fails_the_scan() {
    let start = Utc::now();
    let inner = MemoryStorage::new();
    inner
        .insert_group(&Group {
            id: 1,
            name: "Opera".to_string(),
            building_id: 603,
            exclude_halls: vec![],
        })
        .unwrap();
    inner
        .upsert_event(&Event {
            id: 10,
            title: "Swan Lake".to_string(),
            venue_title: String::new(),
            scheduled_at: start,
            venue_id: 603,
            hall_id: 1,
            tickets_cached: 2,
            last_update: None,
        })
        .unwrap();
    inner.upsert_tickets(&[ticket(1, "T1")]).unwrap();
    let terminal = Terminal {
        id: 1,
        name: "North gate".to_string(),
        secret: String::new(),
        groups: vec![1],
    };

    let validator = Validator::new(
        Arc::new(FullDisk(inner)),
        Arc::new(MasterKeys::new()),
        Arc::new(ManualClock::new(start)),
        &Config::default(),
    );

    let err = validator
        .register("T1", &terminal, Direction::Entry)
        .unwrap_err();
    assert!(matches!(err, TurnstileError::CannotWrite(_)));
    assert!(err.is_retryable());

    // NOT_FOUND never reaches the ledger, so it is unaffected
    let outcome = validator
        .register("NOPE", &terminal, Direction::Entry)
        .unwrap();
    assert_eq!(outcome.result, ResultCode::NotFound);
}
