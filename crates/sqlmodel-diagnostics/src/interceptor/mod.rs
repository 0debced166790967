//! Interceptor contracts, chains and per-scope resolution.
//!
//! An interceptor observes database operations and may veto or replace their
//! outcome. There is one trait per role:
//!
//! - [`CommandInterceptor`] - creating and executing commands, reading results
//! - [`ConnectionInterceptor`] - opening and closing connections
//! - [`TransactionInterceptor`] - beginning, committing and rolling back
//!
//! Every method has a default that passes its input through unchanged, so an
//! implementation only overrides the events it cares about. Several
//! interceptors of one role are combined into a chain that threads the result
//! through each of them in registration order.

mod command;
mod connection;
mod resolve;
mod transaction;

pub use command::{CommandInterceptor, CommandInterceptorChain};
pub use connection::{ConnectionInterceptor, ConnectionInterceptorChain};
pub use resolve::{InterceptorRegistry, InterceptorSource, Interceptors};
pub use transaction::{TransactionInterceptor, TransactionInterceptorChain};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by the async interceptor methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A registered interceptor of any role.
#[derive(Clone)]
pub enum Interceptor {
    Command(Arc<dyn CommandInterceptor>),
    Connection(Arc<dyn ConnectionInterceptor>),
    Transaction(Arc<dyn TransactionInterceptor>),
}

impl Interceptor {
    pub fn command(interceptor: impl CommandInterceptor + 'static) -> Self {
        Interceptor::Command(Arc::new(interceptor))
    }

    pub fn connection(interceptor: impl ConnectionInterceptor + 'static) -> Self {
        Interceptor::Connection(Arc::new(interceptor))
    }

    pub fn transaction(interceptor: impl TransactionInterceptor + 'static) -> Self {
        Interceptor::Transaction(Arc::new(interceptor))
    }

    /// Name of the wrapped interceptor, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Interceptor::Command(i) => i.name(),
            Interceptor::Connection(i) => i.name(),
            Interceptor::Transaction(i) => i.name(),
        }
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match self {
            Interceptor::Command(_) => "Command",
            Interceptor::Connection(_) => "Connection",
            Interceptor::Transaction(_) => "Transaction",
        };
        f.debug_tuple(role).field(&self.name()).finish()
    }
}

/// A future that is already complete.
pub(crate) fn ready<'a, T: Send + 'a>(value: T) -> BoxFuture<'a, T> {
    Box::pin(std::future::ready(value))
}
