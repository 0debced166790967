//! The boundary to the real database.

use asupersync::{Cx, Outcome};
use sqlmodel_core::{
    DataReader, DbCommand, DbConnection, DbTransaction, Error, IsolationLevel, Result, Value,
};
use std::future::Future;

/// Performs the actual I/O for a [`RelationalConnection`](crate::RelationalConnection).
///
/// A driver knows nothing about diagnostics: it is only called once the
/// "about to" announcement went through and no interceptor suppressed it.
///
/// Every operation has a blocking and a `Cx`-taking async form. The async
/// defaults run the blocking call, so drivers without native async support
/// only implement the blocking methods.
pub trait Driver: Send + Sync {
    fn open(&self, connection: &DbConnection) -> Result<()>;

    fn close(&self, connection: &DbConnection) -> Result<()>;

    fn execute_reader(&self, command: &DbCommand) -> Result<DataReader>;

    fn execute_scalar(&self, command: &DbCommand) -> Result<Value>;

    /// Returns the number of rows affected.
    fn execute_non_query(&self, command: &DbCommand) -> Result<u64>;

    fn begin(&self, connection: &DbConnection, isolation_level: IsolationLevel) -> Result<()>;

    fn commit(&self, transaction: &DbTransaction) -> Result<()>;

    fn rollback(&self, transaction: &DbTransaction) -> Result<()>;

    fn open_async(
        &self,
        cx: &Cx,
        connection: &DbConnection,
    ) -> impl Future<Output = Outcome<(), Error>> + Send {
        let _ = cx;
        std::future::ready(to_outcome(self.open(connection)))
    }

    fn close_async(
        &self,
        cx: &Cx,
        connection: &DbConnection,
    ) -> impl Future<Output = Outcome<(), Error>> + Send {
        let _ = cx;
        std::future::ready(to_outcome(self.close(connection)))
    }

    fn execute_reader_async(
        &self,
        cx: &Cx,
        command: &DbCommand,
    ) -> impl Future<Output = Outcome<DataReader, Error>> + Send {
        let _ = cx;
        std::future::ready(to_outcome(self.execute_reader(command)))
    }

    fn execute_scalar_async(
        &self,
        cx: &Cx,
        command: &DbCommand,
    ) -> impl Future<Output = Outcome<Value, Error>> + Send {
        let _ = cx;
        std::future::ready(to_outcome(self.execute_scalar(command)))
    }

    fn execute_non_query_async(
        &self,
        cx: &Cx,
        command: &DbCommand,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let _ = cx;
        std::future::ready(to_outcome(self.execute_non_query(command)))
    }

    fn begin_async(
        &self,
        cx: &Cx,
        connection: &DbConnection,
        isolation_level: IsolationLevel,
    ) -> impl Future<Output = Outcome<(), Error>> + Send {
        let _ = cx;
        std::future::ready(to_outcome(self.begin(connection, isolation_level)))
    }

    fn commit_async(
        &self,
        cx: &Cx,
        transaction: &DbTransaction,
    ) -> impl Future<Output = Outcome<(), Error>> + Send {
        let _ = cx;
        std::future::ready(to_outcome(self.commit(transaction)))
    }

    fn rollback_async(
        &self,
        cx: &Cx,
        transaction: &DbTransaction,
    ) -> impl Future<Output = Outcome<(), Error>> + Send {
        let _ = cx;
        std::future::ready(to_outcome(self.rollback(transaction)))
    }
}

fn to_outcome<T>(result: Result<T>) -> Outcome<T, Error> {
    match result {
        Ok(value) => Outcome::Ok(value),
        Err(e) => Outcome::Err(e),
    }
}
