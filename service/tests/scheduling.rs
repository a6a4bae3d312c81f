//! Integration tests driving the scheduling and ledger commands against the
//! in-memory database.

use std::{sync::Arc, time::Duration};

use common::{credits, operations::Insert, DateTime, Handler as _};
use service::{
    command::{
        add_credits, cancel_session, deduct_credits, end_session,
        schedule_session, settle_session, start_session, AddCredits,
        CancelSession, DeductCredits, EndSession, ScheduleSession,
        SettleSession, StartSession,
    },
    domain::{matching, session, skill, user, Match, User},
    infra::{reminders, video, InMemory},
    query, read, Config, Service,
};

fn at(mins_from_now: i64) -> DateTime {
    if mins_from_now < 0 {
        DateTime::now()
            - Duration::from_secs(mins_from_now.unsigned_abs() * 60)
    } else {
        DateTime::now()
            + Duration::from_secs(mins_from_now.unsigned_abs() * 60)
    }
}

fn amount(v: i64) -> credits::Amount {
    credits::Amount::new(v).unwrap()
}

fn new_user(name: &str, balance: i64) -> User {
    User {
        id: user::Id::new(),
        name: user::Name::new(name).unwrap(),
        balance: credits::Balance::new(balance).unwrap(),
        skill_points: 0.into(),
        sessions_taught: 0.into(),
        sessions_completed: 0.into(),
        created_at: DateTime::now().coerce(),
    }
}

/// Seeds a teacher with an empty balance, a student with 100 credits and an
/// accepted `Match` between them.
async fn fixture() -> (Service<InMemory>, User, User, Match) {
    let db = InMemory::new();

    let teacher = new_user("Alice", 0);
    let student = new_user("Bob", 100);
    let matching = Match {
        id: matching::Id::new(),
        teacher_id: teacher.id,
        student_id: student.id,
        skill_id: skill::Id::new(),
        status: matching::Status::Accepted,
        created_at: DateTime::now().coerce(),
    };

    db.execute(Insert(teacher.clone())).await.unwrap();
    db.execute(Insert(student.clone())).await.unwrap();
    db.execute(Insert(matching.clone())).await.unwrap();

    let service = Service::new(
        Config::default(),
        db,
        Arc::new(video::Local),
        Arc::new(reminders::LogOnly),
    );
    (service, teacher, student, matching)
}

async fn balance_of(
    service: &Service<InMemory>,
    user_id: user::Id,
) -> credits::Balance {
    service
        .execute(query::user::Balance { user_id })
        .await
        .unwrap()
}

async fn ledger_sum(service: &Service<InMemory>, user_id: user::Id) -> i64 {
    service
        .execute(query::transaction::History::by(
            read::transaction::History {
                user_id,
                limit: None,
            },
        ))
        .await
        .unwrap()
        .iter()
        .map(|tx| tx.amount.get())
        .sum()
}

#[tokio::test]
async fn schedules_session_and_escrows_credits() {
    let (service, teacher, student, matching) = fixture().await;

    let session = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(60).coerce(),
            scheduled_end: at(120).coerce(),
            credits: amount(10),
        })
        .await
        .unwrap();

    assert_eq!(session.status, session::Status::Scheduled);
    assert_eq!(session.teacher_id, teacher.id);
    assert_eq!(session.student_id, student.id);
    assert_eq!(balance_of(&service, student.id).await.get(), 90);

    let history = service
        .execute(query::transaction::History::by(
            read::transaction::History {
                user_id: student.id,
                limit: None,
            },
        ))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount.get(), -10);
    assert_eq!(history[0].session_id, Some(session.id));
}

#[tokio::test]
async fn rejects_unknown_and_unaccepted_matches() {
    let (service, teacher, student, _) = fixture().await;

    let err = service
        .execute(ScheduleSession {
            match_id: matching::Id::new(),
            scheduled_start: at(60).coerce(),
            scheduled_end: at(120).coerce(),
            credits: amount(10),
        })
        .await
        .unwrap_err();
    let e: &schedule_session::ExecutionError = err.as_ref();
    assert!(matches!(
        e,
        schedule_session::ExecutionError::MatchNotExists(_),
    ));

    let pending = Match {
        id: matching::Id::new(),
        teacher_id: teacher.id,
        student_id: student.id,
        skill_id: skill::Id::new(),
        status: matching::Status::Pending,
        created_at: DateTime::now().coerce(),
    };
    service
        .database()
        .execute(Insert(pending.clone()))
        .await
        .unwrap();

    let err = service
        .execute(ScheduleSession {
            match_id: pending.id,
            scheduled_start: at(60).coerce(),
            scheduled_end: at(120).coerce(),
            credits: amount(10),
        })
        .await
        .unwrap_err();
    let e: &schedule_session::ExecutionError = err.as_ref();
    assert!(matches!(
        e,
        schedule_session::ExecutionError::MatchNotAccepted(_),
    ));
}

#[tokio::test]
async fn rejects_invalid_schedules() {
    let (service, _, _, matching) = fixture().await;

    for (start, end) in [
        (at(-30), at(30)),  // starts in the past
        (at(60), at(60)),   // empty window
        (at(60), at(70)),   // shorter than 15 minutes
        (at(60), at(301)),  // longer than 240 minutes
    ] {
        let err = service
            .execute(ScheduleSession {
                match_id: matching.id,
                scheduled_start: start.coerce(),
                scheduled_end: end.coerce(),
                credits: amount(10),
            })
            .await
            .unwrap_err();
        let e: &schedule_session::ExecutionError = err.as_ref();
        assert!(matches!(
            e,
            schedule_session::ExecutionError::InvalidSchedule(_),
        ));
    }
}

#[tokio::test]
async fn rejects_overlapping_bookings_but_allows_adjacent() {
    let (service, _, student, matching) = fixture().await;

    service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(60).coerce(),
            scheduled_end: at(120).coerce(),
            credits: amount(10),
        })
        .await
        .unwrap();

    let err = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(90).coerce(),
            scheduled_end: at(150).coerce(),
            credits: amount(10),
        })
        .await
        .unwrap_err();
    let e: &schedule_session::ExecutionError = err.as_ref();
    assert!(matches!(
        e,
        schedule_session::ExecutionError::ScheduleConflict(_),
    ));

    // The escrow of the rejected booking must not have been taken.
    assert_eq!(balance_of(&service, student.id).await.get(), 90);

    // Back-to-back sessions share a boundary instant and don't conflict.
    service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(120).coerce(),
            scheduled_end: at(180).coerce(),
            credits: amount(10),
        })
        .await
        .unwrap();
    assert_eq!(balance_of(&service, student.id).await.get(), 80);
}

#[tokio::test]
async fn rejects_booking_with_insufficient_credits() {
    let (service, _, student, matching) = fixture().await;

    let err = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(60).coerce(),
            scheduled_end: at(120).coerce(),
            credits: amount(1000),
        })
        .await
        .unwrap_err();
    let e: &schedule_session::ExecutionError = err.as_ref();
    assert!(matches!(
        e,
        schedule_session::ExecutionError::InsufficientCredits { .. },
    ));

    assert_eq!(balance_of(&service, student.id).await.get(), 100);
    assert_eq!(ledger_sum(&service, student.id).await, 0);
}

#[tokio::test]
async fn completion_settles_escrow_with_teacher_reward_and_student_bonus() {
    let (service, teacher, student, matching) = fixture().await;

    let session = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(10).coerce(),
            scheduled_end: at(40).coerce(),
            credits: amount(20),
        })
        .await
        .unwrap();
    assert_eq!(balance_of(&service, student.id).await.get(), 80);

    let started = service
        .execute(StartSession {
            session_id: session.id,
        })
        .await
        .unwrap();
    assert_eq!(started.session.status, session::Status::InProgress);
    assert!(started.session.video_room.is_some());
    assert!(started.session.actual_start.is_some());

    let completed = service
        .execute(EndSession {
            session_id: session.id,
            notes: session::Notes::new("went well"),
        })
        .await
        .unwrap();
    assert_eq!(completed.status, session::Status::Completed);
    assert!(completed.actual_end.is_some());
    assert!(completed.settled_at.is_some());

    // Teacher earns the full escrow, the student gets a 20% bonus.
    assert_eq!(balance_of(&service, teacher.id).await.get(), 20);
    assert_eq!(balance_of(&service, student.id).await.get(), 84);

    let teacher = service
        .execute(query::user::ById::by(teacher.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(i64::from(teacher.skill_points), 20);
    assert_eq!(i32::from(teacher.sessions_taught), 1);

    let student = service
        .execute(query::user::ById::by(student.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(i64::from(student.skill_points), 4);
    assert_eq!(i32::from(student.sessions_completed), 1);
}

#[tokio::test]
async fn settlement_is_idempotent() {
    let (service, teacher, student, matching) = fixture().await;

    let session = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(10).coerce(),
            scheduled_end: at(40).coerce(),
            credits: amount(20),
        })
        .await
        .unwrap();
    service
        .execute(StartSession {
            session_id: session.id,
        })
        .await
        .unwrap();
    service
        .execute(EndSession {
            session_id: session.id,
            notes: None,
        })
        .await
        .unwrap();

    // Retrying the settlement must not pay out twice.
    service
        .execute(SettleSession {
            session_id: session.id,
        })
        .await
        .unwrap();

    assert_eq!(balance_of(&service, teacher.id).await.get(), 20);
    assert_eq!(balance_of(&service, student.id).await.get(), 84);
    assert_eq!(ledger_sum(&service, teacher.id).await, 20);
    assert_eq!(ledger_sum(&service, student.id).await, -16);
}

#[tokio::test]
async fn settlement_rejects_a_cancelled_session_without_paying_out() {
    let (service, teacher, student, matching) = fixture().await;

    let session = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(25 * 60).coerce(),
            scheduled_end: at(26 * 60).coerce(),
            credits: amount(20),
        })
        .await
        .unwrap();
    service
        .execute(CancelSession {
            session_id: session.id,
            reason: None,
        })
        .await
        .unwrap();

    let err = service
        .execute(SettleSession {
            session_id: session.id,
        })
        .await
        .unwrap_err();
    let e: &settle_session::ExecutionError = err.as_ref();
    assert!(matches!(
        e,
        settle_session::ExecutionError::WrongStatus {
            actual: session::Status::Cancelled,
            ..
        },
    ));

    assert_eq!(balance_of(&service, teacher.id).await.get(), 0);
    assert_eq!(balance_of(&service, student.id).await.get(), 100);
}

#[tokio::test]
async fn cancellation_refunds_by_notice_tier() {
    // More than 24 hours of notice: full refund.
    let (service, _, student, matching) = fixture().await;
    let session = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(25 * 60).coerce(),
            scheduled_end: at(26 * 60).coerce(),
            credits: amount(20),
        })
        .await
        .unwrap();
    let cancelled = service
        .execute(CancelSession {
            session_id: session.id,
            reason: session::Notes::new("sick"),
        })
        .await
        .unwrap();
    assert_eq!(cancelled.status, session::Status::Cancelled);
    assert_eq!(balance_of(&service, student.id).await.get(), 100);

    // Between 2 and 24 hours of notice: half refund, rounded down.
    let (service, _, student, matching) = fixture().await;
    let session = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(3 * 60).coerce(),
            scheduled_end: at(4 * 60).coerce(),
            credits: amount(25),
        })
        .await
        .unwrap();
    service
        .execute(CancelSession {
            session_id: session.id,
            reason: None,
        })
        .await
        .unwrap();
    assert_eq!(balance_of(&service, student.id).await.get(), 87);

    // Less than 2 hours of notice: the escrow is forfeited.
    let (service, _, student, matching) = fixture().await;
    let session = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(60).coerce(),
            scheduled_end: at(120).coerce(),
            credits: amount(20),
        })
        .await
        .unwrap();
    service
        .execute(CancelSession {
            session_id: session.id,
            reason: None,
        })
        .await
        .unwrap();
    assert_eq!(balance_of(&service, student.id).await.get(), 80);
    assert_eq!(ledger_sum(&service, student.id).await, -20);
}

#[tokio::test]
async fn cannot_cancel_running_or_finished_sessions() {
    let (service, _, _, matching) = fixture().await;

    let session = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(10).coerce(),
            scheduled_end: at(40).coerce(),
            credits: amount(10),
        })
        .await
        .unwrap();
    service
        .execute(StartSession {
            session_id: session.id,
        })
        .await
        .unwrap();

    let err = service
        .execute(CancelSession {
            session_id: session.id,
            reason: None,
        })
        .await
        .unwrap_err();
    let e: &cancel_session::ExecutionError = err.as_ref();
    assert!(matches!(
        e,
        cancel_session::ExecutionError::WrongStatus {
            actual: session::Status::InProgress,
            ..
        },
    ));
}

#[tokio::test]
async fn start_is_limited_to_the_window_around_scheduled_start() {
    let (service, _, _, matching) = fixture().await;

    let session = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(2 * 60).coerce(),
            scheduled_end: at(3 * 60).coerce(),
            credits: amount(10),
        })
        .await
        .unwrap();

    let err = service
        .execute(StartSession {
            session_id: session.id,
        })
        .await
        .unwrap_err();
    let e: &start_session::ExecutionError = err.as_ref();
    assert!(matches!(
        e,
        start_session::ExecutionError::OutsideStartWindow(_),
    ));
}

#[tokio::test]
async fn end_requires_a_running_session() {
    let (service, _, _, matching) = fixture().await;

    let session = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(60).coerce(),
            scheduled_end: at(120).coerce(),
            credits: amount(10),
        })
        .await
        .unwrap();

    let err = service
        .execute(EndSession {
            session_id: session.id,
            notes: None,
        })
        .await
        .unwrap_err();
    let e: &end_session::ExecutionError = err.as_ref();
    assert!(matches!(
        e,
        end_session::ExecutionError::WrongStatus {
            actual: session::Status::Scheduled,
            ..
        },
    ));
}

#[tokio::test]
async fn ledger_mutations_keep_balance_in_sync() {
    let (service, _, student, _) = fixture().await;

    service
        .execute(AddCredits {
            user_id: student.id,
            amount: amount(50),
            description: None,
        })
        .await
        .unwrap();
    service
        .execute(DeductCredits {
            user_id: student.id,
            amount: amount(30),
            description: None,
        })
        .await
        .unwrap();

    assert_eq!(balance_of(&service, student.id).await.get(), 120);
    assert_eq!(ledger_sum(&service, student.id).await, 20);

    let err = service
        .execute(DeductCredits {
            user_id: student.id,
            amount: amount(1000),
            description: None,
        })
        .await
        .unwrap_err();
    let e: &deduct_credits::ExecutionError = err.as_ref();
    assert!(matches!(
        e,
        deduct_credits::ExecutionError::InsufficientCredits { .. },
    ));
    assert_eq!(balance_of(&service, student.id).await.get(), 120);

    let err = service
        .execute(AddCredits {
            user_id: user::Id::new(),
            amount: amount(10),
            description: None,
        })
        .await
        .unwrap_err();
    let e: &add_credits::ExecutionError = err.as_ref();
    assert!(matches!(e, add_credits::ExecutionError::UserNotExists(_)));
}

#[tokio::test]
async fn upcoming_and_history_queries_split_by_terminality() {
    let (service, _, student, matching) = fixture().await;

    let upcoming = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(60).coerce(),
            scheduled_end: at(120).coerce(),
            credits: amount(10),
        })
        .await
        .unwrap();
    let cancelled = service
        .execute(ScheduleSession {
            match_id: matching.id,
            scheduled_start: at(25 * 60).coerce(),
            scheduled_end: at(26 * 60).coerce(),
            credits: amount(10),
        })
        .await
        .unwrap();
    service
        .execute(CancelSession {
            session_id: cancelled.id,
            reason: None,
        })
        .await
        .unwrap();

    let listed = service
        .execute(query::session::Upcoming::by(read::session::Upcoming {
            user_id: student.id,
            after: DateTime::now().coerce(),
        }))
        .await
        .unwrap();
    assert_eq!(
        listed.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![upcoming.id],
    );

    let history = service
        .execute(query::session::History::by(read::session::History {
            user_id: student.id,
        }))
        .await
        .unwrap();
    assert_eq!(
        history.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![cancelled.id],
    );
}
