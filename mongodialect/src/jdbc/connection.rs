//! Connection facade over a [`mongodb::sync::Client`].
//!
//! One connection owns at most one client session. The session and its
//! transaction start lazily: disabling autocommit only records intent, and
//! the transaction begins on the first statement execution after that. This
//! keeps connection pools cheap when a unit of work never touches the
//! database.

use super::statement::{MongoPreparedStatement, MongoStatement};
use super::{map_driver_error, Error, Result};
use crate::Translation;
use log::debug;
use mongodb::sync::{Client, ClientSession, Database};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSetType {
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

impl ResultSetType {
    pub fn name(&self) -> &'static str {
        match self {
            ResultSetType::ForwardOnly => "TYPE_FORWARD_ONLY",
            ResultSetType::ScrollInsensitive => "TYPE_SCROLL_INSENSITIVE",
            ResultSetType::ScrollSensitive => "TYPE_SCROLL_SENSITIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSetConcurrency {
    ReadOnly,
    Updatable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSetHoldability {
    CloseCursorsAtCommit,
    HoldCursorsOverCommit,
}

pub(crate) struct ConnectionState {
    pub database: Database,
    pub session: Option<ClientSession>,
    pub auto_commit: bool,
    pub transaction_active: bool,
    pub closed: bool,
    client: Client,
}

impl ConnectionState {
    pub fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed("connection"))
        } else {
            Ok(())
        }
    }

    /// Starts the session and transaction if autocommit is off and no
    /// transaction is active yet. Called before every statement execution.
    pub fn ensure_transaction(&mut self) -> Result<()> {
        if self.auto_commit || self.transaction_active {
            return Ok(());
        }
        if self.session.is_none() {
            let session = self.client.start_session().run().map_err(map_driver_error)?;
            self.session = Some(session);
        }
        match self.session.as_mut() {
            Some(session) => {
                session.start_transaction().run().map_err(map_driver_error)?;
                self.transaction_active = true;
                debug!("started transaction on database {}", self.database.name());
                Ok(())
            }
            None => unreachable!("session was just created"),
        }
    }

    /// Commits the active transaction if any. The transaction is considered
    /// finished even when the commit fails.
    pub fn commit_transaction(&mut self) -> Result<()> {
        if !self.transaction_active {
            return Ok(());
        }
        self.transaction_active = false;
        match self.session.as_mut() {
            Some(session) => session
                .commit_transaction()
                .run()
                .map_err(map_driver_error),
            None => unreachable!("an active transaction always has a session"),
        }
    }

    pub fn abort_transaction(&mut self) -> Result<()> {
        if !self.transaction_active {
            return Ok(());
        }
        self.transaction_active = false;
        match self.session.as_mut() {
            Some(session) => session
                .abort_transaction()
                .run()
                .map_err(map_driver_error),
            None => unreachable!("an active transaction always has a session"),
        }
    }
}

pub struct MongoConnection {
    state: Rc<RefCell<ConnectionState>>,
}

impl MongoConnection {
    pub fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).map_err(map_driver_error)?;
        Ok(Self::new(client, database))
    }

    pub fn new(client: Client, database: &str) -> Self {
        let database = client.database(database);
        Self {
            state: Rc::new(RefCell::new(ConnectionState {
                database,
                session: None,
                auto_commit: true,
                transaction_active: false,
                closed: false,
                client,
            })),
        }
    }

    /// Prepares a parameterized command with the default (forward-only,
    /// read-only) result-set characteristics. Parse errors surface here, not
    /// at execution.
    pub fn prepare(&self, text: &str) -> Result<MongoPreparedStatement> {
        self.state.borrow().check_open()?;
        MongoPreparedStatement::new(Rc::clone(&self.state), text, vec![], vec![])
    }

    pub fn prepare_with(
        &self,
        text: &str,
        result_set_type: ResultSetType,
        concurrency: ResultSetConcurrency,
        holdability: ResultSetHoldability,
    ) -> Result<MongoPreparedStatement> {
        self.state.borrow().check_open()?;
        if result_set_type != ResultSetType::ForwardOnly {
            return Err(Error::UnsupportedCursor(result_set_type.name()));
        }
        if concurrency != ResultSetConcurrency::ReadOnly {
            return Err(Error::UnsupportedCursor("CONCUR_UPDATABLE"));
        }
        if holdability == ResultSetHoldability::HoldCursorsOverCommit {
            return Err(Error::UnsupportedCursor("HOLD_CURSORS_OVER_COMMIT"));
        }
        self.prepare(text)
    }

    /// Prepares a [`Translation`] directly: its implicit limit/offset
    /// parameters are pre-bound at the placeholder positions the translator
    /// recorded, and its select order labels the result-set columns.
    pub fn prepare_translation(
        &self,
        translation: &Translation,
    ) -> Result<MongoPreparedStatement> {
        self.state.borrow().check_open()?;
        MongoPreparedStatement::new(
            Rc::clone(&self.state),
            &translation.text,
            translation.implicit_parameters.clone(),
            translation.select_order.clone(),
        )
    }

    /// A plain statement for parameterless command text.
    pub fn create_statement(&self) -> Result<MongoStatement> {
        self.state.borrow().check_open()?;
        Ok(MongoStatement::new(Rc::clone(&self.state)))
    }

    pub fn auto_commit(&self) -> Result<bool> {
        let state = self.state.borrow();
        state.check_open()?;
        Ok(state.auto_commit)
    }

    /// Enabling autocommit while a transaction is active commits it first,
    /// per JDBC semantics. The mode switch sticks even when that commit
    /// fails; the commit error still surfaces. Setting the current value is
    /// a no-op.
    pub fn set_auto_commit(&mut self, auto_commit: bool) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check_open()?;
        if state.auto_commit == auto_commit {
            return Ok(());
        }
        state.auto_commit = auto_commit;
        if auto_commit {
            return state.commit_transaction();
        }
        Ok(())
    }

    /// Commits the active transaction. A no-op when no transaction has
    /// started; an error under autocommit.
    pub fn commit(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check_open()?;
        if state.auto_commit {
            return Err(Error::AutoCommitViolation("commit"));
        }
        state.commit_transaction()
    }

    pub fn rollback(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check_open()?;
        if state.auto_commit {
            return Err(Error::AutoCommitViolation("rollback"));
        }
        state.abort_transaction()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    /// Closing aborts any in-flight transaction. Idempotent: a second close
    /// is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        let aborted = state.abort_transaction();
        state.session = None;
        aborted
    }
}

impl Drop for MongoConnection {
    fn drop(&mut self) {
        // best effort: abort errors have nowhere to go during drop
        let _ = self.close();
    }
}
