//! The suppressible result threaded through "about to" interceptor calls.

/// Outcome of an "about to X" interception.
///
/// A fresh, non-suppressed value is created for every announcement and moved
/// through each interceptor in turn. An interceptor that wants to stop the
/// real operation returns a suppressed result; when the operation produces a
/// value (a reader, a scalar, a row count, a command) the suppressed result
/// carries the substitute the caller uses instead.
///
/// ```rust,ignore
/// fn reader_executing(
///     &self,
///     command: &mut DbCommand,
///     event: &CommandEventData,
///     result: InterceptionResult<DataReader>,
/// ) -> Result<InterceptionResult<DataReader>> {
///     if let Some(cached) = self.cache.get(&command.sql) {
///         return Ok(InterceptionResult::suppress_with_result(cached.clone()));
///     }
///     Ok(result)
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct InterceptionResult<T = ()> {
    suppressed: bool,
    result: Option<T>,
}

impl<T> Default for InterceptionResult<T> {
    fn default() -> Self {
        Self {
            suppressed: false,
            result: None,
        }
    }
}

impl<T> InterceptionResult<T> {
    /// A result that lets the real operation run.
    pub fn none() -> Self {
        Self::default()
    }

    /// Suppress the operation and supply `value` as its result.
    pub fn suppress_with_result(value: T) -> Self {
        Self {
            suppressed: true,
            result: Some(value),
        }
    }

    /// Whether an interceptor suppressed the operation.
    #[must_use]
    pub const fn has_result(&self) -> bool {
        self.suppressed
    }

    /// The substitute result, if one was supplied.
    #[must_use]
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// Consume into the substitute result.
    #[must_use]
    pub fn into_result(self) -> Option<T> {
        self.result
    }
}

impl InterceptionResult {
    /// Suppress an operation that has no result value.
    pub fn suppress() -> Self {
        Self {
            suppressed: true,
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_suppressed() {
        let result: InterceptionResult<u64> = InterceptionResult::default();
        assert!(!result.has_result());
        assert_eq!(result.result(), None);
        assert_eq!(result, InterceptionResult::none());
    }

    #[test]
    fn suppress_unit() {
        let result = InterceptionResult::suppress();
        assert!(result.has_result());
        assert_eq!(result.result(), None);
    }

    #[test]
    fn suppress_with_value() {
        let result = InterceptionResult::suppress_with_result(7_u64);
        assert!(result.has_result());
        assert_eq!(result.result(), Some(&7));
        assert_eq!(result.into_result(), Some(7));
    }

    #[test]
    fn equality_is_by_field() {
        assert_eq!(
            InterceptionResult::suppress_with_result("a"),
            InterceptionResult::suppress_with_result("a")
        );
        assert_ne!(
            InterceptionResult::suppress_with_result("a"),
            InterceptionResult::suppress_with_result("b")
        );
        assert_ne!(
            InterceptionResult::<&str>::none(),
            InterceptionResult::suppress_with_result("a")
        );
    }
}
