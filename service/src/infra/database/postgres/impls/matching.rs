//! [`Match`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{matching, Match},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<Match>, matching::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Match>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Match>, matching::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, teacher_id, student_id, skill_id, status, created_at \
            FROM matches \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Match {
                id: row.get("id"),
                teacher_id: row.get("teacher_id"),
                student_id: row.get("student_id"),
                skill_id: row.get("skill_id"),
                status: row.get("status"),
                created_at: row.get("created_at"),
            }))
    }
}

impl<C> Database<Insert<Match>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(matching): Insert<Match>,
    ) -> Result<Self::Ok, Self::Err> {
        let Match {
            id,
            teacher_id,
            student_id,
            skill_id,
            status,
            created_at,
        } = matching;

        const SQL: &str = "\
            INSERT INTO matches (\
                id, teacher_id, student_id, skill_id, status, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::INT2, $6::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status";
        self.exec(
            SQL,
            &[&id, &teacher_id, &student_id, &skill_id, &status, &created_at],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
