//! In-memory [`Database`] implementation.

use std::{
    cmp::Reverse,
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Update,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{matching, session, user, Match, Session, Transaction, User},
    infra::{database, Database},
    read,
};

/// In-memory [`Database`] client.
///
/// Transactions take an exclusive hold over the whole [`State`] and mutate
/// a scratch copy of it, published on [`Commit`] and discarded on drop.
#[derive(Clone, Debug, Default)]
pub struct InMemory<C = Shared>(C);

impl InMemory {
    /// Creates a new empty [`InMemory`] client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Whole state of an [`InMemory`] client.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// All the stored [`User`]s.
    users: HashMap<user::Id, User>,

    /// All the stored [`Match`]es.
    matches: HashMap<matching::Id, Match>,

    /// All the stored [`Session`]s.
    sessions: HashMap<session::Id, Session>,

    /// All the stored [`Transaction`]s, in insertion order.
    transactions: Vec<Transaction>,
}

/// Non-transactional handle to a [`State`] shared between clones of an
/// [`InMemory`] client.
#[derive(Clone, Debug, Default)]
pub struct Shared(Arc<Mutex<State>>);

/// Transactional handle to a [`State`].
#[derive(Debug)]
pub struct Tx {
    /// Hold over the shared [`State`], keeping other transactions out.
    shared: StdMutex<OwnedMutexGuard<State>>,

    /// Scratch copy of the [`State`] this transaction mutates.
    scratch: StdMutex<State>,
}

/// Access to a [`State`] behind an [`InMemory`] handle.
trait Access {
    /// Runs the provided function over the accessed [`State`].
    async fn with<R>(&self, f: impl FnOnce(&mut State) -> R + Send) -> R;
}

impl Access for Shared {
    async fn with<R>(&self, f: impl FnOnce(&mut State) -> R + Send) -> R {
        f(&mut *self.0.lock().await)
    }
}

impl Access for Tx {
    async fn with<R>(&self, f: impl FnOnce(&mut State) -> R + Send) -> R {
        f(&mut *self
            .scratch
            .lock()
            .unwrap_or_else(PoisonError::into_inner))
    }
}

impl Database<Transact> for InMemory<Shared> {
    type Ok = InMemory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let guard = Arc::clone(&self.0 .0).lock_owned().await;
        let scratch = guard.clone();
        Ok(InMemory(Tx {
            shared: StdMutex::new(guard),
            scratch: StdMutex::new(scratch),
        }))
    }
}

impl Database<Commit> for InMemory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let scratch = self
            .0
            .scratch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        **self
            .0
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = scratch;
        Ok(())
    }
}

// Locks are no-ops: the transaction already holds the whole `State`
// exclusively.

impl<C: Access> Database<Lock<By<User, user::Id>>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl<C: Access> Database<Lock<By<Session, session::Id>>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Session, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl<C: Access> Database<Select<By<Option<Match>, matching::Id>>>
    for InMemory<C>
{
    type Ok = Option<Match>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Match>, matching::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.0.with(move |s| s.matches.get(&id).cloned()).await)
    }
}

impl<C: Access, IDs> Database<Select<By<HashMap<user::Id, User>, IDs>>>
    for InMemory<C>
where
    IDs: AsRef<[user::Id]> + Send,
{
    type Ok = HashMap<user::Id, User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<user::Id, User>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        Ok(self
            .0
            .with(move |s| {
                ids.as_ref()
                    .iter()
                    .filter_map(|id| {
                        s.users.get(id).map(|u| (*id, u.clone()))
                    })
                    .collect()
            })
            .await)
    }
}

impl<C: Access> Database<Select<By<Option<User>, user::Id>>> for InMemory<C> {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.0.with(move |s| s.users.get(&id).cloned()).await)
    }
}

impl<C: Access> Database<Select<By<Option<Session>, session::Id>>>
    for InMemory<C>
{
    type Ok = Option<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Session>, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.0.with(move |s| s.sessions.get(&id).cloned()).await)
    }
}

impl<C: Access> Database<Select<By<Vec<Session>, read::session::Overlapping>>>
    for InMemory<C>
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
        Ok(self
            .0
            .with(move |s| {
                s.sessions
                    .values()
                    .filter(|session| {
                        session.is_active()
                            && session.participants().contains(&user_id)
                            && Some(session.id) != exclude
                            && session.overlaps(start, end)
                    })
                    .cloned()
                    .collect()
            })
            .await)
    }
}

impl<C: Access> Database<Select<By<Vec<Session>, read::session::Upcoming>>>
    for InMemory<C>
{
    type Ok = Vec<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Session>, read::session::Upcoming>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::session::Upcoming { user_id, after } = by.into_inner();
        Ok(self
            .0
            .with(move |s| {
                let mut sessions = s
                    .sessions
                    .values()
                    .filter(|session| {
                        session.is_active()
                            && session.participants().contains(&user_id)
                            && session.scheduled_start > after
                    })
                    .cloned()
                    .collect::<Vec<_>>();
                sessions.sort_unstable_by_key(|session| {
                    session.scheduled_start
                });
                sessions
            })
            .await)
    }
}

impl<C: Access> Database<Select<By<Vec<Session>, read::session::History>>>
    for InMemory<C>
{
    type Ok = Vec<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Session>, read::session::History>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::session::History { user_id } = by.into_inner();
        Ok(self
            .0
            .with(move |s| {
                let mut sessions = s
                    .sessions
                    .values()
                    .filter(|session| {
                        session.is_terminal()
                            && session.participants().contains(&user_id)
                    })
                    .cloned()
                    .collect::<Vec<_>>();
                sessions.sort_unstable_by_key(|session| {
                    Reverse(session.created_at)
                });
                sessions
            })
            .await)
    }
}

impl<C: Access>
    Database<Select<By<Vec<Transaction>, read::transaction::History>>>
    for InMemory<C>
{
    type Ok = Vec<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Transaction>, read::transaction::History>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::transaction::History { user_id, limit } = by.into_inner();
        Ok(self
            .0
            .with(move |s| {
                let mut txs = s
                    .transactions
                    .iter()
                    .filter(|tx| tx.user_id == user_id)
                    .cloned()
                    .collect::<Vec<_>>();
                txs.reverse();
                if let Some(limit) = limit {
                    txs.truncate(
                        usize::try_from(limit).unwrap_or(usize::MAX),
                    );
                }
                txs
            })
            .await)
    }
}

impl<C: Access> Database<Insert<User>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |s| drop(s.users.insert(user.id, user)))
            .await)
    }
}

impl<C: Access> Database<Update<User>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Insert(user)).await
    }
}

impl<C: Access> Database<Insert<Match>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(matching): Insert<Match>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |s| drop(s.matches.insert(matching.id, matching)))
            .await)
    }
}

impl<C: Access> Database<Insert<Session>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(session): Insert<Session>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .with(move |s| drop(s.sessions.insert(session.id, session)))
            .await)
    }
}

impl<C: Access> Database<Update<Session>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(session): Update<Session>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Insert(session)).await
    }
}

impl<C: Access> Database<Insert<Transaction>> for InMemory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(tx): Insert<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.0.with(move |s| s.transactions.push(tx)).await)
    }
}
