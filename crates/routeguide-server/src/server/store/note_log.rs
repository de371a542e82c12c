use parking_lot::Mutex;
use routeguide_core::proto::{Point, RouteNote};
use std::collections::HashMap;

/// Exact location a note was left at.
type LocationKey = (i32, i32);

/// Rewrites every `ack=0` in `message` to `ack=1`.
///
/// Plain substring replacement; applying it twice is the same as once.
pub fn acknowledge(message: &str) -> String {
    message.replace("ack=0", "ack=1")
}

/// Append-only history of route notes, keyed by exact location.
///
/// The whole map sits behind one [`Mutex`]. [`append_and_snapshot`] holds it
/// for the append and the copy of that location's history, so a concurrent
/// `RouteChat` on the same location can never slip a note in between. The
/// snapshot is sent after the lock is released.
///
/// Entries are kept for the lifetime of the process.
///
/// [`append_and_snapshot`]: RouteNoteLog::append_and_snapshot
#[derive(Debug, Default)]
pub struct RouteNoteLog {
    notes: Mutex<HashMap<LocationKey, Vec<RouteNote>>>,
}

impl RouteNoteLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledges `note`, appends it to its location's history and returns
    /// that whole history in insertion order, `note` last.
    pub fn append_and_snapshot(&self, mut note: RouteNote) -> Vec<RouteNote> {
        note.message = acknowledge(&note.message);
        let key = note.location.as_ref().map_or((0, 0), Point::key);

        let mut notes = self.notes.lock();
        let history = notes.entry(key).or_default();
        history.push(note);
        history.clone()
    }

    /// Number of notes recorded at exactly `location`.
    #[cfg(test)]
    pub fn count_at(&self, location: &Point) -> usize {
        self.notes.lock().get(&location.key()).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread::scope;

    fn note(lat: i32, lon: i32, message: &str) -> RouteNote {
        RouteNote {
            location: Some(Point::new(lat, lon)),
            message: message.to_string(),
        }
    }

    fn messages(notes: &[RouteNote]) -> Vec<&str> {
        notes.iter().map(|n| n.message.as_str()).collect()
    }

    #[test]
    fn acknowledge_rewrites_every_occurrence() {
        assert_eq!(acknowledge("ack=0 and ack=0"), "ack=1 and ack=1");
        assert_eq!(acknowledge("no marker"), "no marker");
        assert_eq!(acknowledge("ack=10"), "ack=10");
    }

    #[test]
    fn acknowledge_is_idempotent() {
        for message in ["ack=0", "x ack=0 y ack=1", "ack=ack=00", ""] {
            let once = acknowledge(message);
            assert_eq!(acknowledge(&once), once);
        }
    }

    #[test]
    fn snapshot_contains_history_in_arrival_order() {
        let log = RouteNoteLog::new();

        let first = log.append_and_snapshot(note(1, 1, "n1 ack=0"));
        assert_eq!(messages(&first), ["n1 ack=1"]);

        let second = log.append_and_snapshot(note(1, 1, "n2 ack=0"));
        assert_eq!(messages(&second), ["n1 ack=1", "n2 ack=1"]);
    }

    #[test]
    fn locations_do_not_leak_into_each_other() {
        let log = RouteNoteLog::new();
        log.append_and_snapshot(note(1, 1, "here"));
        let other = log.append_and_snapshot(note(2, 1, "there"));

        assert_eq!(messages(&other), ["there"]);
        assert_eq!(log.count_at(&Point::new(1, 1)), 1);
        assert_eq!(log.count_at(&Point::new(2, 1)), 1);
        assert_eq!(log.count_at(&Point::new(9, 9)), 0);
    }

    #[test]
    fn missing_location_is_keyed_at_origin() {
        let log = RouteNoteLog::new();
        log.append_and_snapshot(RouteNote {
            location: None,
            message: "nowhere".to_string(),
        });
        let snapshot = log.append_and_snapshot(note(0, 0, "origin"));
        assert_eq!(messages(&snapshot), ["nowhere", "origin"]);
    }

    #[test]
    fn concurrent_appends_see_consistent_prefixes() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 250;

        let log = Arc::new(RouteNoteLog::new());
        let snapshots = scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let log = Arc::clone(&log);
                    s.spawn(move || {
                        (0..PER_THREAD)
                            .map(|i| {
                                log.append_and_snapshot(note(7, 7, &format!("{t}-{i}")))
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });

        let total = THREADS * PER_THREAD;
        assert_eq!(log.count_at(&Point::new(7, 7)), total);

        // Every append saw a distinct history length, and each snapshot is a
        // prefix of the final history.
        let mut lengths: Vec<_> = snapshots.iter().map(Vec::len).collect();
        lengths.sort_unstable();
        assert_eq!(lengths, (1..=total).collect::<Vec<_>>());

        let full = snapshots.iter().max_by_key(|s| s.len()).unwrap();
        for snapshot in &snapshots {
            assert_eq!(snapshot[..], full[..snapshot.len()]);
        }
    }
}
