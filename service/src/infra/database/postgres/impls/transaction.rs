//! [`Transaction`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::Transaction,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl<C> Database<Select<By<Vec<Transaction>, read::transaction::History>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Transaction>, read::transaction::History>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::transaction::History { user_id, limit } = by.into_inner();
        let limit = limit.map(i64::from);

        const SQL: &str = "\
            SELECT id, user_id, amount, kind, \
                   description, session_id, created_at \
            FROM transactions \
            WHERE user_id = $1::UUID \
            ORDER BY created_at DESC, id DESC \
            LIMIT $2::INT8";
        Ok(self
            .query(SQL, &[&user_id, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| Transaction {
                id: row.get("id"),
                user_id: row.get("user_id"),
                amount: row.get("amount"),
                kind: row.get("kind"),
                description: row.get("description"),
                session_id: row.get("session_id"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

impl<C> Database<Insert<Transaction>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(tx): Insert<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        let Transaction {
            id,
            user_id,
            amount,
            kind,
            description,
            session_id,
            created_at,
        } = tx;

        const SQL: &str = "\
            INSERT INTO transactions (\
                id, user_id, amount, kind, \
                description, session_id, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT8, $4::INT2, \
                $5::VARCHAR, $6::UUID, $7::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &amount,
                &kind,
                &description,
                &session_id,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
