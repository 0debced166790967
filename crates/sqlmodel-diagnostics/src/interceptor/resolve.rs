//! Per-scope resolution of the effective interceptor for each role.

use super::{
    CommandInterceptor, CommandInterceptorChain, ConnectionInterceptor,
    ConnectionInterceptorChain, Interceptor, TransactionInterceptor, TransactionInterceptorChain,
};
use sqlmodel_core::{ConfigError, Error, Result};
use std::sync::{Arc, Mutex, PoisonError};

/// Supplies the interceptors registered with the application.
///
/// Resolution asks the source once per scope. Returning an error reports a
/// misconfiguration; it surfaces as [`Error::Config`] from whichever
/// [`Interceptors`] accessor triggered resolution.
pub trait InterceptorSource: Send + Sync {
    fn interceptors(&self) -> Result<Vec<Interceptor>>;
}

/// A fixed list of interceptors.
#[derive(Debug, Clone, Default)]
pub struct InterceptorRegistry {
    interceptors: Vec<Interceptor>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interceptor (builder pattern).
    #[must_use]
    pub fn with(mut self, interceptor: Interceptor) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn register(&mut self, interceptor: Interceptor) {
        self.interceptors.push(interceptor);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl InterceptorSource for InterceptorRegistry {
    fn interceptors(&self) -> Result<Vec<Interceptor>> {
        Ok(self.interceptors.clone())
    }
}

#[derive(Clone, Default)]
struct Resolved {
    command: Option<Arc<dyn CommandInterceptor>>,
    connection: Option<Arc<dyn ConnectionInterceptor>>,
    transaction: Option<Arc<dyn TransactionInterceptor>>,
}

impl Resolved {
    fn from_list(interceptors: Vec<Interceptor>) -> Self {
        let mut command = Vec::new();
        let mut connection = Vec::new();
        let mut transaction = Vec::new();

        for interceptor in interceptors {
            match interceptor {
                Interceptor::Command(i) => command.push(i),
                Interceptor::Connection(i) => connection.push(i),
                Interceptor::Transaction(i) => transaction.push(i),
            }
        }

        Self {
            command: aggregate(command, |list| {
                Arc::new(CommandInterceptorChain::new(list)) as Arc<dyn CommandInterceptor>
            }),
            connection: aggregate(connection, |list| {
                Arc::new(ConnectionInterceptorChain::new(list)) as Arc<dyn ConnectionInterceptor>
            }),
            transaction: aggregate(transaction, |list| {
                Arc::new(TransactionInterceptorChain::new(list)) as Arc<dyn TransactionInterceptor>
            }),
        }
    }
}

/// None, the single interceptor itself, or a chain over all of them.
fn aggregate<I: ?Sized>(
    mut list: Vec<Arc<I>>,
    chain: impl FnOnce(Vec<Arc<I>>) -> Arc<I>,
) -> Option<Arc<I>> {
    match list.len() {
        0 => None,
        1 => list.pop(),
        _ => Some(chain(list)),
    }
}

/// The interceptors in effect for one scope.
///
/// Registered interceptors come from an [`InterceptorSource`]; an optional
/// configured interceptor (the one set directly on the session options) is
/// appended after them, so it runs last and has the final word on every
/// result. The source is consulted lazily, at most once per scope, the first
/// time any role is requested; the per-role results are then cached.
pub struct Interceptors {
    source: Arc<dyn InterceptorSource>,
    configured: Option<Interceptor>,
    resolved: Mutex<Option<Resolved>>,
}

impl Interceptors {
    pub fn new(source: Arc<dyn InterceptorSource>, configured: Option<Interceptor>) -> Self {
        Self {
            source,
            configured,
            resolved: Mutex::new(None),
        }
    }

    /// A scope with no interceptors at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Arc::new(InterceptorRegistry::new()), None)
    }

    /// Effective command interceptor, if any.
    pub fn command(&self) -> Result<Option<Arc<dyn CommandInterceptor>>> {
        Ok(self.resolve()?.command)
    }

    /// Effective connection interceptor, if any.
    pub fn connection(&self) -> Result<Option<Arc<dyn ConnectionInterceptor>>> {
        Ok(self.resolve()?.connection)
    }

    /// Effective transaction interceptor, if any.
    pub fn transaction(&self) -> Result<Option<Arc<dyn TransactionInterceptor>>> {
        Ok(self.resolve()?.transaction)
    }

    /// Resolve every role now instead of on first use.
    pub fn resolve_all(&self) -> Result<()> {
        self.resolve().map(|_| ())
    }

    /// Whether resolution has already happened.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn resolve(&self) -> Result<Resolved> {
        let mut guard = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(resolved) = guard.as_ref() {
            return Ok(resolved.clone());
        }

        let mut interceptors = self.source.interceptors().map_err(|e| match e {
            Error::Config(_) => e,
            other => Error::Config(ConfigError {
                message: format!("failed to resolve interceptors: {other}"),
                source: Some(Box::new(other)),
            }),
        })?;

        if let Some(configured) = &self.configured {
            interceptors.push(configured.clone());
        }

        tracing::debug!(
            count = interceptors.len(),
            configured = self.configured.is_some(),
            "Resolved interceptors"
        );
        for interceptor in &interceptors {
            tracing::trace!(interceptor = ?interceptor, "Interceptor in effect");
        }

        let resolved = Resolved::from_list(interceptors);
        *guard = Some(resolved.clone());
        Ok(resolved)
    }
}

impl Default for Interceptors {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptors")
            .field("configured", &self.configured)
            .field("resolved", &self.is_resolved())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl CommandInterceptor for Noop {}
    impl ConnectionInterceptor for Noop {}

    struct Named;
    impl CommandInterceptor for Named {
        fn name(&self) -> &'static str {
            "Named"
        }
    }

    struct Broken;
    impl InterceptorSource for Broken {
        fn interceptors(&self) -> Result<Vec<Interceptor>> {
            Err(Error::Custom("no interceptor container".to_string()))
        }
    }

    #[test]
    fn empty_source_resolves_to_none() {
        let interceptors = Interceptors::empty();
        assert!(!interceptors.is_resolved());
        assert!(interceptors.command().unwrap().is_none());
        assert!(interceptors.connection().unwrap().is_none());
        assert!(interceptors.transaction().unwrap().is_none());
        assert!(interceptors.is_resolved());
    }

    #[test]
    fn single_interceptor_is_used_directly() {
        let registry = InterceptorRegistry::new().with(Interceptor::command(Named));
        let interceptors = Interceptors::new(Arc::new(registry), None);
        let command = interceptors.command().unwrap().unwrap();
        assert_eq!(command.name(), "Named");
    }

    #[test]
    fn several_interceptors_become_a_chain() {
        let registry = InterceptorRegistry::new()
            .with(Interceptor::command(Noop))
            .with(Interceptor::connection(Noop));
        let interceptors = Interceptors::new(Arc::new(registry), Some(Interceptor::command(Named)));

        let command = interceptors.command().unwrap().unwrap();
        assert_eq!(command.name(), "CommandInterceptorChain");
        let connection = interceptors.connection().unwrap().unwrap();
        assert_ne!(connection.name(), "ConnectionInterceptorChain");
    }

    #[test]
    fn configured_alone_is_used_directly() {
        let interceptors = Interceptors::new(
            Arc::new(InterceptorRegistry::new()),
            Some(Interceptor::command(Named)),
        );
        assert_eq!(interceptors.command().unwrap().unwrap().name(), "Named");
    }

    #[test]
    fn failing_source_is_a_config_error() {
        let interceptors = Interceptors::new(Arc::new(Broken), None);
        let err = interceptors.resolve_all().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("no interceptor container"));
        assert!(!interceptors.is_resolved());
    }
}
