use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use tokio::sync::OwnedMutexGuard;

use appointment_cell::models::{AppointmentStatus, NewAppointment, SchedulingError, TimeSlot};
use appointment_cell::services::{InMemorySnapshotStore, SchedulingStore, SnapshotStore, StorageError, StoreSnapshot};
use doctor_cell::DoctorDirectory;
use shared_utils::test_utils::TestDates;

fn slot(label: &str) -> TimeSlot {
    label.parse().unwrap()
}

fn candidate(directory: &DoctorDirectory, user_id: &str, doctor_id: &str, date: NaiveDate, time: &str) -> NewAppointment {
    let doctor = directory.find_doctor(doctor_id).unwrap();
    NewAppointment::for_doctor(user_id, doctor, date, slot(time))
}

async fn setup() -> (Arc<SchedulingStore>, Arc<InMemorySnapshotStore>) {
    let persistence = Arc::new(InMemorySnapshotStore::new());
    let store = SchedulingStore::load(Arc::new(DoctorDirectory::clinic_default()), persistence.clone())
        .await
        .unwrap();
    (Arc::new(store), persistence)
}

/// Accepts saves until switched off, then fails every write.
#[derive(Default)]
struct FlakySnapshotStore {
    inner: InMemorySnapshotStore,
    failing: AtomicBool,
}

#[async_trait]
impl SnapshotStore for FlakySnapshotStore {
    async fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.load().await
    }

    async fn save(&self, snapshot: &[u8]) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.inner.save(snapshot).await
    }

    async fn lock_for_commit(&self) -> OwnedMutexGuard<()> {
        self.inner.lock_for_commit().await
    }
}

#[derive(Default)]
struct UnreadableSnapshotStore {
    commit: Arc<tokio::sync::Mutex<()>>,
}

#[async_trait]
impl SnapshotStore for UnreadableSnapshotStore {
    async fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        )))
    }

    async fn save(&self, _snapshot: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }

    async fn lock_for_commit(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.commit).lock_owned().await
    }
}

#[tokio::test]
async fn test_booking_removes_slot_from_availability() {
    let (store, _) = setup().await;
    let monday = TestDates::reference_monday();

    assert_eq!(store.get_available_times("1", monday).await.len(), TimeSlot::COUNT);

    let booked = store
        .add_appointment(candidate(store.directory(), "user-1", "1", monday, "09:00 AM"))
        .await
        .unwrap();

    assert_eq!(booked.status, AppointmentStatus::Upcoming);
    assert_eq!(booked.doctor_name, "Dr. Sarah Johnson");
    assert_eq!(booked.specialty, "General Medicine");

    let times = store.get_available_times("1", monday).await;
    assert_eq!(times.len(), 11);
    assert!(!times.contains(&slot("09:00 AM")));
    assert_eq!(times[0], slot("09:30 AM"));
}

#[tokio::test]
async fn test_second_booking_of_same_slot_conflicts() {
    let (store, _) = setup().await;
    let monday = TestDates::reference_monday();

    store
        .add_appointment(candidate(store.directory(), "user-1", "1", monday, "09:00 AM"))
        .await
        .unwrap();

    let result = store
        .add_appointment(candidate(store.directory(), "user-2", "1", monday, "09:00 AM"))
        .await;

    assert_matches!(result, Err(SchedulingError::SlotConflict { ref doctor_id, .. }) if doctor_id == "1");
    assert_eq!(store.appointment_count().await, 1);
}

#[tokio::test]
async fn test_same_time_with_other_doctor_or_date_is_free() {
    let (store, _) = setup().await;
    let monday = TestDates::reference_monday();

    store
        .add_appointment(candidate(store.directory(), "user-1", "1", monday, "10:00 AM"))
        .await
        .unwrap();

    // Dr. Chen also works Mondays
    store
        .add_appointment(candidate(store.directory(), "user-2", "2", monday, "10:00 AM"))
        .await
        .unwrap();

    let tuesday = monday + Duration::days(1);
    store
        .add_appointment(candidate(store.directory(), "user-2", "1", tuesday, "10:00 AM"))
        .await
        .unwrap();

    assert_eq!(store.appointment_count().await, 3);
}

#[tokio::test]
async fn test_racing_commits_have_exactly_one_winner() {
    let (store, _) = setup().await;
    let monday = TestDates::reference_monday();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let apt = candidate(store.directory(), &format!("user-{}", i), "1", monday, "02:00 PM");
                store.add_appointment(apt).await
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let winners = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(SchedulingError::SlotConflict { .. }))))
        .count();

    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(store.get_available_times("1", monday).await.len(), 11);
}

#[tokio::test]
async fn test_cancelled_slot_becomes_bookable_again() {
    let (store, _) = setup().await;
    let monday = TestDates::reference_monday();

    let first = store
        .add_appointment(candidate(store.directory(), "user-1", "1", monday, "11:30 AM"))
        .await
        .unwrap();

    let cancelled = store.cancel_appointment(first.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(store.get_available_times("1", monday).await.contains(&slot("11:30 AM")));

    let second = store
        .add_appointment(candidate(store.directory(), "user-2", "1", monday, "11:30 AM"))
        .await
        .unwrap();
    assert_ne!(first.id, second.id);

    // Cancelled record is retained
    assert_eq!(store.appointment_count().await, 2);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let (store, persistence) = setup().await;
    let monday = TestDates::reference_monday();

    let apt = store
        .add_appointment(candidate(store.directory(), "user-1", "1", monday, "09:30 AM"))
        .await
        .unwrap();

    store.cancel_appointment(apt.id).await.unwrap();
    let snapshot = persistence.contents().await;

    let again = store.cancel_appointment(apt.id).await.unwrap();
    assert_eq!(again.status, AppointmentStatus::Cancelled);
    assert_eq!(persistence.contents().await, snapshot);
}

#[tokio::test]
async fn test_cancel_unknown_id_is_not_found() {
    let (store, _) = setup().await;
    let id = uuid::Uuid::new_v4();

    assert_eq!(store.cancel_appointment(id).await, Err(SchedulingError::NotFound(id)));
}

#[tokio::test]
async fn test_complete_then_cancel() {
    let (store, _) = setup().await;
    let monday = TestDates::reference_monday();

    let apt = store
        .add_appointment(candidate(store.directory(), "user-1", "1", monday, "03:00 PM"))
        .await
        .unwrap();

    let completed = store.complete_appointment(apt.id).await.unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);
    // A completed visit still holds its slot
    assert!(!store.get_available_times("1", monday).await.contains(&slot("03:00 PM")));

    let cancelled = store.cancel_appointment(apt.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    assert_matches!(
        store.complete_appointment(apt.id).await,
        Err(SchedulingError::InvalidStatusTransition {
            from: AppointmentStatus::Cancelled,
            to: AppointmentStatus::Completed
        })
    );
}

#[tokio::test]
async fn test_rejects_day_doctor_does_not_work() {
    let (store, _) = setup().await;
    // Dr. Brown works Mon/Tue/Thu
    let wednesday = TestDates::reference_monday() + Duration::days(2);

    let result = store
        .add_appointment(candidate(store.directory(), "user-1", "4", wednesday, "09:00 AM"))
        .await;

    assert_matches!(result, Err(SchedulingError::OutOfWindow(msg)) if msg.contains("Wednesday"));
    assert_eq!(store.appointment_count().await, 0);
}

#[tokio::test]
async fn test_rejects_unknown_doctor_and_non_upcoming_status() {
    let (store, _) = setup().await;
    let monday = TestDates::reference_monday();

    let mut unknown = candidate(store.directory(), "user-1", "1", monday, "09:00 AM");
    unknown.doctor_id = "99".to_string();
    assert_matches!(
        store.add_appointment(unknown).await,
        Err(SchedulingError::DoctorNotFound(id)) if id == "99"
    );

    let mut completed = candidate(store.directory(), "user-1", "1", monday, "09:00 AM");
    completed.status = AppointmentStatus::Completed;
    assert_matches!(store.add_appointment(completed).await, Err(SchedulingError::ValidationError(_)));

    let anonymous = candidate(store.directory(), "  ", "1", monday, "09:00 AM");
    assert_matches!(store.add_appointment(anonymous).await, Err(SchedulingError::ValidationError(_)));
}

#[tokio::test]
async fn test_user_appointments_split_upcoming_and_past() {
    let (store, _) = setup().await;
    let monday = TestDates::reference_monday();

    let a = store
        .add_appointment(candidate(store.directory(), "user-1", "1", monday, "09:00 AM"))
        .await
        .unwrap();
    let b = store
        .add_appointment(candidate(store.directory(), "user-1", "2", monday, "09:00 AM"))
        .await
        .unwrap();
    store
        .add_appointment(candidate(store.directory(), "user-2", "1", monday, "10:00 AM"))
        .await
        .unwrap();

    store.cancel_appointment(b.id).await.unwrap();

    let all = store.get_user_appointments("user-1").await;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, a.id);

    let summary = store.get_user_appointment_summary("user-1").await;
    assert_eq!(summary.upcoming.len(), 1);
    assert_eq!(summary.upcoming[0].id, a.id);
    assert_eq!(summary.past.len(), 1);
    assert_eq!(summary.past[0].id, b.id);

    assert!(store.get_user_appointments("nobody").await.is_empty());
}

#[tokio::test]
async fn test_state_survives_reload() {
    let (store, persistence) = setup().await;
    let monday = TestDates::reference_monday();

    let kept = store
        .add_appointment(candidate(store.directory(), "user-1", "3", monday + Duration::days(1), "04:30 PM"))
        .await
        .unwrap();
    let dropped = store
        .add_appointment(candidate(store.directory(), "user-1", "1", monday, "04:30 PM"))
        .await
        .unwrap();
    store.cancel_appointment(dropped.id).await.unwrap();

    let bytes = persistence.contents().await.unwrap();
    let reloaded = SchedulingStore::load(
        Arc::new(DoctorDirectory::clinic_default()),
        Arc::new(InMemorySnapshotStore::with_snapshot(bytes)),
    )
    .await
    .unwrap();

    assert_eq!(reloaded.get_appointment(kept.id).await.unwrap(), kept);
    assert_eq!(
        reloaded.get_appointment(dropped.id).await.unwrap().status,
        AppointmentStatus::Cancelled
    );
    assert!(!reloaded
        .get_available_times("3", monday + Duration::days(1))
        .await
        .contains(&slot("04:30 PM")));
}

#[tokio::test]
async fn test_malformed_snapshot_starts_empty() {
    for bytes in [
        b"not json".to_vec(),
        br#"{"version": 99, "appointments": []}"#.to_vec(),
        br#"[1, 2, 3]"#.to_vec(),
    ] {
        let store = SchedulingStore::load(
            Arc::new(DoctorDirectory::clinic_default()),
            Arc::new(InMemorySnapshotStore::with_snapshot(bytes)),
        )
        .await
        .unwrap();

        assert_eq!(store.appointment_count().await, 0);
    }
}

#[tokio::test]
async fn test_double_booked_snapshot_is_discarded() {
    let (store, persistence) = setup().await;
    let monday = TestDates::reference_monday();

    let apt = store
        .add_appointment(candidate(store.directory(), "user-1", "1", monday, "09:00 AM"))
        .await
        .unwrap();

    let mut twin = apt.clone();
    twin.id = uuid::Uuid::new_v4();
    let bytes = StoreSnapshot::encode(&[apt, twin]).unwrap();
    assert!(StoreSnapshot::decode(&bytes).is_err());

    let reloaded = SchedulingStore::load(
        Arc::new(DoctorDirectory::clinic_default()),
        Arc::new(InMemorySnapshotStore::with_snapshot(bytes)),
    )
    .await
    .unwrap();
    assert_eq!(reloaded.appointment_count().await, 0);

    // The live store's own snapshot still decodes
    let own = persistence.contents().await.unwrap();
    assert_eq!(StoreSnapshot::decode(&own).unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreadable_storage_fails_load() {
    let result = SchedulingStore::load(
        Arc::new(DoctorDirectory::clinic_default()),
        Arc::new(UnreadableSnapshotStore::default()),
    )
    .await;

    assert_matches!(result, Err(SchedulingError::PersistenceError(_)));
}

#[tokio::test]
async fn test_failed_save_rolls_back() {
    let persistence = Arc::new(FlakySnapshotStore::default());
    let store = SchedulingStore::load(Arc::new(DoctorDirectory::clinic_default()), persistence.clone())
        .await
        .unwrap();
    let monday = TestDates::reference_monday();

    let apt = store
        .add_appointment(candidate(store.directory(), "user-1", "1", monday, "09:00 AM"))
        .await
        .unwrap();

    persistence.failing.store(true, Ordering::SeqCst);

    let result = store
        .add_appointment(candidate(store.directory(), "user-1", "1", monday, "09:30 AM"))
        .await;
    assert_matches!(result, Err(SchedulingError::PersistenceError(_)));
    assert_eq!(store.appointment_count().await, 1);
    assert!(store.get_available_times("1", monday).await.contains(&slot("09:30 AM")));

    assert_matches!(store.cancel_appointment(apt.id).await, Err(SchedulingError::PersistenceError(_)));
    assert_eq!(store.get_appointment(apt.id).await.unwrap().status, AppointmentStatus::Upcoming);

    persistence.failing.store(false, Ordering::SeqCst);
    store.cancel_appointment(apt.id).await.unwrap();
}

async fn open_shared(persistence: &Arc<InMemorySnapshotStore>) -> Arc<SchedulingStore> {
    let store = SchedulingStore::load(Arc::new(DoctorDirectory::clinic_default()), persistence.clone())
        .await
        .unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn test_stores_sharing_storage_see_each_others_bookings() {
    let persistence = Arc::new(InMemorySnapshotStore::new());
    let first = open_shared(&persistence).await;
    let second = open_shared(&persistence).await;
    let monday = TestDates::reference_monday();

    let kept = first
        .add_appointment(candidate(first.directory(), "u1", "1", monday, "09:00 AM"))
        .await
        .unwrap();

    let result = second
        .add_appointment(candidate(second.directory(), "u2", "1", monday, "09:00 AM"))
        .await;
    assert_matches!(result, Err(SchedulingError::SlotConflict { .. }));
    assert!(!second.get_available_times("1", monday).await.contains(&slot("09:00 AM")));

    let reopened = open_shared(&persistence).await;
    assert_eq!(reopened.appointment_count().await, 1);
    assert_eq!(reopened.get_user_appointments("u1").await, vec![kept.clone()]);

    // A cancel made through one store frees the slot for the other
    second.cancel_appointment(kept.id).await.unwrap();
    assert_eq!(first.get_appointment(kept.id).await.unwrap().status, AppointmentStatus::Cancelled);
    first
        .add_appointment(candidate(first.directory(), "u2", "1", monday, "09:00 AM"))
        .await
        .unwrap();
    assert_eq!(reopened.appointment_count().await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_commits_across_stores_have_one_winner() {
    let persistence = Arc::new(InMemorySnapshotStore::new());
    let stores = vec![open_shared(&persistence).await, open_shared(&persistence).await];
    let monday = TestDates::reference_monday();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&stores[i % stores.len()]);
            tokio::spawn(async move {
                let apt = candidate(store.directory(), &format!("user-{}", i), "2", monday, "03:30 PM");
                store.add_appointment(apt).await
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let winners = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    assert_eq!(winners, 1);

    let saved = StoreSnapshot::decode(&persistence.contents().await.unwrap()).unwrap();
    assert_eq!(saved.len(), 1);
}
