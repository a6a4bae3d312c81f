//! [`Session`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{session, Session},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `sessions` table, in the order [`decode()`] expects.
const COLUMNS: &str = "\
    id, match_id, teacher_id, student_id, skill_id, \
    scheduled_start, scheduled_end, actual_start, actual_end, \
    status, credits, video_room, notes, created_at, settled_at";

/// Decodes a [`Session`] out of the provided [`Row`].
fn decode(row: &Row) -> Session {
    Session {
        id: row.get("id"),
        match_id: row.get("match_id"),
        teacher_id: row.get("teacher_id"),
        student_id: row.get("student_id"),
        skill_id: row.get("skill_id"),
        scheduled_start: row.get("scheduled_start"),
        scheduled_end: row.get("scheduled_end"),
        actual_start: row.get("actual_start"),
        actual_end: row.get("actual_end"),
        status: row.get("status"),
        credits: row.get("credits"),
        video_room: row.get("video_room"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        settled_at: row.get("settled_at"),
    }
}

impl<C> Database<Select<By<Option<Session>, session::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Session>, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1::UUID");
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| decode(&row)))
    }
}

impl<C> Database<Select<By<Vec<Session>, read::session::Overlapping>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Session>, read::session::Overlapping>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::session::Overlapping {
            user_id,
            start,
            end,
            exclude,
        } = by.into_inner();

        // Half-open `[start, end)` windows: adjacent sessions don't clash.
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM sessions \
             WHERE (teacher_id = $1::UUID OR student_id = $1::UUID) \
               AND status IN ({scheduled}, {in_progress}) \
               AND scheduled_start < $3::TIMESTAMPTZ \
               AND $2::TIMESTAMPTZ < scheduled_end \
               AND ($4::UUID IS NULL OR id != $4::UUID)",
            scheduled = session::Status::Scheduled.u8(),
            in_progress = session::Status::InProgress.u8(),
        );
        Ok(self
            .query(&sql, &[&user_id, &start, &end, &exclude])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(decode)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Session>, read::session::Upcoming>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Session>, read::session::Upcoming>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::session::Upcoming { user_id, after } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM sessions \
             WHERE (teacher_id = $1::UUID OR student_id = $1::UUID) \
               AND status IN ({scheduled}, {in_progress}) \
               AND scheduled_start > $2::TIMESTAMPTZ \
             ORDER BY scheduled_start ASC",
            scheduled = session::Status::Scheduled.u8(),
            in_progress = session::Status::InProgress.u8(),
        );
        Ok(self
            .query(&sql, &[&user_id, &after])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(decode)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Session>, read::session::History>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Session>, read::session::History>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::session::History { user_id } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM sessions \
             WHERE (teacher_id = $1::UUID OR student_id = $1::UUID) \
               AND status IN ({completed}, {cancelled}) \
             ORDER BY created_at DESC",
            completed = session::Status::Completed.u8(),
            cancelled = session::Status::Cancelled.u8(),
        );
        Ok(self
            .query(&sql, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(decode)
            .collect())
    }
}

impl<C> Database<Insert<Session>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Session>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(session): Insert<Session>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(session))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Session>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(session): Update<Session>,
    ) -> Result<Self::Ok, Self::Err> {
        let Session {
            id,
            match_id,
            teacher_id,
            student_id,
            skill_id,
            scheduled_start,
            scheduled_end,
            actual_start,
            actual_end,
            status,
            credits,
            video_room,
            notes,
            created_at,
            settled_at,
        } = session;

        const SQL: &str = "\
            INSERT INTO sessions (\
                id, match_id, teacher_id, student_id, skill_id, \
                scheduled_start, scheduled_end, actual_start, actual_end, \
                status, credits, video_room, notes, created_at, settled_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, $5::UUID, \
                $6::TIMESTAMPTZ, $7::TIMESTAMPTZ, \
                $8::TIMESTAMPTZ, $9::TIMESTAMPTZ, \
                $10::INT2, $11::INT8, $12::VARCHAR, $13::VARCHAR, \
                $14::TIMESTAMPTZ, $15::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET actual_start = EXCLUDED.actual_start, \
                actual_end = EXCLUDED.actual_end, \
                status = EXCLUDED.status, \
                video_room = EXCLUDED.video_room, \
                notes = EXCLUDED.notes, \
                settled_at = EXCLUDED.settled_at";
        self.exec(
            SQL,
            &[
                &id,
                &match_id,
                &teacher_id,
                &student_id,
                &skill_id,
                &scheduled_start,
                &scheduled_end,
                &actual_start,
                &actual_end,
                &status,
                &credits,
                &video_room,
                &notes,
                &created_at,
                &settled_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Session, session::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Session, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: session::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO sessions_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        const LOCK_SQL: &str = "\
            SELECT id \
            FROM sessions_lock \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(LOCK_SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
