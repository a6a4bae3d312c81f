//! [`Session`] definitions.

use std::time::Duration;

use common::{credits, define_kind, unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Match;
use crate::domain::{matching, skill, user};

/// Scheduled skill-exchange appointment between a teacher and a student.
#[derive(Clone, Debug)]
pub struct Session {
    /// ID of this [`Session`].
    pub id: Id,

    /// ID of the accepted [`Match`] this [`Session`] was booked against.
    pub match_id: matching::Id,

    /// ID of the teaching [`User`].
    ///
    /// [`User`]: crate::domain::User
    pub teacher_id: user::Id,

    /// ID of the learning [`User`].
    ///
    /// [`User`]: crate::domain::User
    pub student_id: user::Id,

    /// ID of the skill being exchanged.
    pub skill_id: skill::Id,

    /// [`DateTime`] when this [`Session`] is scheduled to start.
    pub scheduled_start: ScheduledStartDateTime,

    /// [`DateTime`] when this [`Session`] is scheduled to end.
    pub scheduled_end: ScheduledEndDateTime,

    /// [`DateTime`] when this [`Session`] actually started.
    pub actual_start: Option<ActualStartDateTime>,

    /// [`DateTime`] when this [`Session`] actually ended.
    pub actual_end: Option<ActualEndDateTime>,

    /// Current [`Status`] of this [`Session`].
    pub status: Status,

    /// Credits escrowed from the student for this [`Session`].
    pub credits: credits::Amount,

    /// ID of the video room allocated for this [`Session`], if any.
    pub video_room: Option<RoomId>,

    /// Free-text notes, carrying the cancellation reason among others.
    pub notes: Option<Notes>,

    /// [`DateTime`] when this [`Session`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when the escrow of this [`Session`] was settled.
    ///
    /// Guards settlement against double-payment: a [`Session`] with this
    /// field set is never paid out again.
    pub settled_at: Option<SettlementDateTime>,
}

impl Session {
    /// Returns whether this [`Session`] has reached a terminal [`Status`].
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self.status {
            Status::Completed | Status::Cancelled => true,
            Status::Scheduled | Status::InProgress => false,
        }
    }

    /// Returns whether this [`Session`] still occupies its time slot.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns IDs of both participants of this [`Session`].
    #[must_use]
    pub fn participants(&self) -> [user::Id; 2] {
        [self.teacher_id, self.student_id]
    }

    /// Checks whether the scheduled window of this [`Session`] overlaps the
    /// provided half-open `[start, end)` window.
    #[must_use]
    pub fn overlaps(
        &self,
        start: ScheduledStartDateTime,
        end: ScheduledEndDateTime,
    ) -> bool {
        self.scheduled_start.coerce::<()>() < end.coerce()
            && start.coerce::<()>() < self.scheduled_end.coerce()
    }

    /// Appends the provided note to the [`Session::notes`].
    pub fn append_note(&mut self, note: Notes) {
        self.notes = Some(match self.notes.take() {
            Some(existing) => existing.appended(&note),
            None => note,
        });
    }
}

/// ID of a [`Session`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Status of a [`Session`]."]
    enum Status {
        #[doc = "The [`Session`] is booked and awaits its start."]
        Scheduled = 1,

        #[doc = "The [`Session`] is currently running."]
        InProgress = 2,

        #[doc = "The [`Session`] has finished. Terminal."]
        Completed = 3,

        #[doc = "The [`Session`] was cancelled before running. Terminal."]
        Cancelled = 4,
    }
}

/// Validated scheduled window of a [`Session`].
///
/// Construction enforces all booking-time invariants of the window: the
/// start lies in the future, the end follows the start, and the duration
/// fits [`Schedule::MIN_DURATION`]..=[`Schedule::MAX_DURATION`].
#[derive(Clone, Copy, Debug)]
pub struct Schedule {
    /// [`DateTime`] when the [`Session`] starts.
    pub start: ScheduledStartDateTime,

    /// [`DateTime`] when the [`Session`] ends.
    pub end: ScheduledEndDateTime,
}

impl Schedule {
    /// Minimum allowed duration of a [`Session`].
    pub const MIN_DURATION: Duration = Duration::from_secs(15 * 60);

    /// Maximum allowed duration of a [`Session`].
    pub const MAX_DURATION: Duration = Duration::from_secs(240 * 60);

    /// Creates a new [`Schedule`] if the provided window is bookable at the
    /// provided `now` moment.
    ///
    /// # Errors
    ///
    /// See [`InvalidSchedule`] for the possible violations.
    pub fn new(
        start: ScheduledStartDateTime,
        end: ScheduledEndDateTime,
        now: DateTime,
    ) -> Result<Self, InvalidSchedule> {
        use InvalidSchedule as E;

        if start.coerce() < now {
            return Err(E::StartInPast);
        }
        if end.coerce::<()>() <= start.coerce() {
            return Err(E::EndNotAfterStart);
        }

        let duration = end.coerce::<()>() - start.coerce();
        if duration < Self::MIN_DURATION {
            return Err(E::TooShort);
        }
        if duration > Self::MAX_DURATION {
            return Err(E::TooLong);
        }

        Ok(Self { start, end })
    }

    /// Returns the duration of this [`Schedule`].
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end.coerce::<()>() - self.start.coerce()
    }
}

/// Violation of a [`Schedule`] invariant.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum InvalidSchedule {
    /// The scheduled start has already passed.
    #[display("`scheduled_start` is in the past")]
    StartInPast,

    /// The scheduled end does not follow the scheduled start.
    #[display("`scheduled_end` must be after `scheduled_start`")]
    EndNotAfterStart,

    /// The window is shorter than [`Schedule::MIN_DURATION`].
    #[display("`Session` duration is shorter than 15 minutes")]
    TooShort,

    /// The window is longer than [`Schedule::MAX_DURATION`].
    #[display("`Session` duration is longer than 240 minutes")]
    TooLong,
}

/// Window around [`Session::scheduled_start`] in which the [`Session`] is
/// allowed to be started.
#[derive(Clone, Copy, Debug)]
pub struct StartWindow {
    /// How long before the scheduled start the [`Session`] may start.
    pub early: Duration,

    /// How long after the scheduled start the [`Session`] may still start.
    pub late: Duration,
}

impl Default for StartWindow {
    fn default() -> Self {
        Self {
            early: Duration::from_secs(15 * 60),
            late: Duration::from_secs(30 * 60),
        }
    }
}

impl StartWindow {
    /// Checks whether the provided `now` moment falls into this
    /// [`StartWindow`] around the provided scheduled start.
    #[must_use]
    pub fn contains(
        &self,
        scheduled_start: ScheduledStartDateTime,
        now: DateTime,
    ) -> bool {
        let start = scheduled_start.coerce::<()>();
        now >= start - self.early && now <= start + self.late
    }
}

/// Refund tier applied when a [`Session`] is cancelled, depending on the
/// notice given before its scheduled start.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefundTier {
    /// Cancelled 24 hours or more in advance: full refund.
    Full,

    /// Cancelled between 2 and 24 hours in advance: half refund,
    /// rounded down.
    Half,

    /// Cancelled less than 2 hours in advance: escrow is forfeited.
    Forfeit,
}

impl RefundTier {
    /// Returns the [`RefundTier`] for the provided (possibly negative)
    /// notice before the scheduled start.
    #[must_use]
    pub fn on_notice(notice: time::Duration) -> Self {
        if notice >= time::Duration::hours(24) {
            Self::Full
        } else if notice >= time::Duration::hours(2) {
            Self::Half
        } else {
            Self::Forfeit
        }
    }

    /// Returns the refund of the provided escrowed [`credits::Amount`]
    /// under this [`RefundTier`].
    ///
    /// [`None`] means nothing is refunded.
    #[must_use]
    pub fn refund(self, escrowed: credits::Amount) -> Option<credits::Amount> {
        match self {
            Self::Full => Some(escrowed),
            Self::Half => escrowed.percent(50),
            Self::Forfeit => None,
        }
    }
}

/// Free-text notes of a [`Session`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Notes(String);

impl Notes {
    /// Creates new [`Notes`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Returns a copy of these [`Notes`] with the provided ones appended on
    /// a new line.
    #[must_use]
    pub fn appended(&self, other: &Self) -> Self {
        Self(format!("{}\n{}", self.0, other.0))
    }

    /// Checks whether the given `text` is valid [`Notes`] content.
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        !text.trim().is_empty() && text.len() <= 2048
    }
}

impl FromStr for Notes {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Notes`")
    }
}

/// ID of a video room allocated for a [`Session`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, Into, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct RoomId(String);

/// Token granting access to the video room of a [`Session`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, Into, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
pub struct AccessToken(String);

/// Marker type indicating the scheduled start of a [`Session`].
#[derive(Clone, Copy, Debug)]
pub struct ScheduledStart;

/// Marker type indicating the scheduled end of a [`Session`].
#[derive(Clone, Copy, Debug)]
pub struct ScheduledEnd;

/// Marker type indicating the actual start of a [`Session`].
#[derive(Clone, Copy, Debug)]
pub struct ActualStart;

/// Marker type indicating the actual end of a [`Session`].
#[derive(Clone, Copy, Debug)]
pub struct ActualEnd;

/// Marker type indicating the escrow settlement of a [`Session`].
#[derive(Clone, Copy, Debug)]
pub struct Settlement;

/// [`DateTime`] when a [`Session`] is scheduled to start.
pub type ScheduledStartDateTime = DateTimeOf<(Session, ScheduledStart)>;

/// [`DateTime`] when a [`Session`] is scheduled to end.
pub type ScheduledEndDateTime = DateTimeOf<(Session, ScheduledEnd)>;

/// [`DateTime`] when a [`Session`] actually started.
pub type ActualStartDateTime = DateTimeOf<(Session, ActualStart)>;

/// [`DateTime`] when a [`Session`] actually ended.
pub type ActualEndDateTime = DateTimeOf<(Session, ActualEnd)>;

/// [`DateTime`] when a [`Session`] was created.
pub type CreationDateTime = DateTimeOf<(Session, unit::Creation)>;

/// [`DateTime`] when the escrow of a [`Session`] was settled.
pub type SettlementDateTime = DateTimeOf<(Session, Settlement)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{credits, DateTime};

    use super::{
        InvalidSchedule, RefundTier, Schedule, ScheduledEndDateTime,
        ScheduledStartDateTime, StartWindow,
    };

    fn at(now: DateTime, mins_from_now: u64) -> DateTime {
        now + Duration::from_secs(mins_from_now * 60)
    }

    fn amount(v: i64) -> credits::Amount {
        credits::Amount::new(v).unwrap()
    }

    #[test]
    fn schedule_validates_window() {
        let now = DateTime::now();
        let start: ScheduledStartDateTime = at(now, 60).coerce();

        assert!(Schedule::new(start, at(now, 120).coerce(), now).is_ok());

        assert_eq!(
            Schedule::new(
                (now - Duration::from_secs(60)).coerce(),
                at(now, 120).coerce(),
                now,
            )
            .unwrap_err(),
            InvalidSchedule::StartInPast,
        );
        assert_eq!(
            Schedule::new(start, at(now, 60).coerce(), now).unwrap_err(),
            InvalidSchedule::EndNotAfterStart,
        );
        assert_eq!(
            Schedule::new(start, at(now, 30).coerce(), now).unwrap_err(),
            InvalidSchedule::EndNotAfterStart,
        );
        assert_eq!(
            Schedule::new(start, at(now, 70).coerce(), now).unwrap_err(),
            InvalidSchedule::TooShort,
        );
        assert_eq!(
            Schedule::new(start, at(now, 60 + 241).coerce(), now)
                .unwrap_err(),
            InvalidSchedule::TooLong,
        );

        // Boundary durations are allowed.
        assert!(Schedule::new(start, at(now, 75).coerce(), now).is_ok());
        assert!(Schedule::new(start, at(now, 60 + 240).coerce(), now).is_ok());
    }

    #[test]
    fn start_window_brackets_scheduled_start() {
        let window = StartWindow::default();
        let now = DateTime::now();
        let start: ScheduledStartDateTime = at(now, 10).coerce();

        assert!(window.contains(start, now));
        assert!(window.contains(start, now + Duration::from_secs(35 * 60)));
        assert!(!window.contains(start, now + Duration::from_secs(45 * 60)));

        let far: ScheduledStartDateTime = at(now, 60).coerce();
        assert!(!window.contains(far, now));
    }

    #[test]
    fn refund_tiers() {
        assert_eq!(
            RefundTier::on_notice(time::Duration::hours(30)),
            RefundTier::Full,
        );
        assert_eq!(
            RefundTier::on_notice(time::Duration::hours(24)),
            RefundTier::Full,
        );
        assert_eq!(
            RefundTier::on_notice(time::Duration::hours(10)),
            RefundTier::Half,
        );
        assert_eq!(
            RefundTier::on_notice(time::Duration::hours(1)),
            RefundTier::Forfeit,
        );
        assert_eq!(
            RefundTier::on_notice(time::Duration::hours(-1)),
            RefundTier::Forfeit,
        );

        assert_eq!(RefundTier::Full.refund(amount(10)), Some(amount(10)));
        assert_eq!(RefundTier::Half.refund(amount(20)), Some(amount(10)));
        assert_eq!(RefundTier::Half.refund(amount(21)), Some(amount(10)));
        assert_eq!(RefundTier::Half.refund(amount(1)), None);
        assert_eq!(RefundTier::Forfeit.refund(amount(100)), None);
    }

    #[test]
    fn overlap_is_half_open() {
        use crate::domain::{matching, skill, user};

        let now = DateTime::now();
        let session = super::Session {
            id: super::Id::new(),
            match_id: matching::Id::new(),
            teacher_id: user::Id::new(),
            student_id: user::Id::new(),
            skill_id: skill::Id::new(),
            scheduled_start: at(now, 0).coerce(),
            scheduled_end: at(now, 60).coerce(),
            actual_start: None,
            actual_end: None,
            status: super::Status::Scheduled,
            credits: amount(10),
            video_room: None,
            notes: None,
            created_at: now.coerce(),
            settled_at: None,
        };

        // Overlapping window.
        assert!(session.overlaps(at(now, 30).coerce(), at(now, 90).coerce()));
        // Fully containing window.
        assert!(session.overlaps(at(now, 0).coerce(), at(now, 60).coerce()));
        // Adjacent windows do not overlap.
        assert!(
            !session.overlaps(at(now, 60).coerce(), at(now, 120).coerce()),
        );
        let end: ScheduledEndDateTime = at(now, 0).coerce();
        assert!(!session
            .overlaps((now - Duration::from_secs(3600)).coerce(), end));
    }
}
