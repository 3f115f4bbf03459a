//! Error types for the resq core pipeline.

use thiserror::Error;

use crate::request::Method;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, parsing or executing a request.
///
/// Syntax, binding and type errors are raised during parsing/resolution,
/// before any provider is invoked. Operation aborts are raised exactly at
/// the orchestrator/provider boundary and wrap the provider's failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed request input that could not be tokenized.
    #[error("syntax error: {message}")]
    Syntax {
        /// Description of what was malformed.
        message: String,
    },

    /// A member reference did not match any member of the resource.
    #[error("unknown member '{member}' in resource '{resource}'")]
    UnknownMember {
        /// The member name as given in the request.
        member: String,
        /// The resource the lookup ran against.
        resource: String,
    },

    /// A member reference matched several members case-insensitively with
    /// no exact-case match to disambiguate.
    #[error("ambiguous member '{member}' in resource '{resource}', candidates: {}", candidates.join(", "))]
    AmbiguousMember {
        /// The member name as given in the request.
        member: String,
        /// The resource the lookup ran against.
        resource: String,
        /// All case-insensitive matches, in declaration order.
        candidates: Vec<String>,
    },

    /// A condition used an operator token outside the fixed set, or one
    /// that the bound property's type forbids.
    #[error("invalid operator in condition '{condition}', allowed: {allowed}")]
    InvalidOperator {
        /// The offending condition text.
        condition: String,
        /// Display form of the operators permitted here.
        allowed: String,
    },

    /// A condition's value literal could not be coerced to the bound
    /// property's declared type.
    #[error("cannot parse '{literal}' as {expected} for member '{member}'")]
    InvalidValueLiteral {
        /// The raw value literal.
        literal: String,
        /// The declared kind of the bound property.
        expected: String,
        /// The member the condition is bound to.
        member: String,
    },

    /// An attempt was made to write a member without a setter.
    #[error("member '{member}' is read-only")]
    ReadOnlyMember {
        /// The member that rejected the write.
        member: String,
    },

    /// A non-equality operator was used against the null literal.
    #[error("operator '{operator}' is not valid for comparison with null")]
    NullComparison {
        /// Display form of the operator.
        operator: String,
    },

    /// A post-filter condition references a member that the requested
    /// projection removes or renames away.
    #[error("condition on '{member}' cannot be evaluated against the projected output of resource '{resource}'")]
    PostFilterUnresolvable {
        /// The member the condition is bound to.
        member: String,
        /// The resource the request targets.
        resource: String,
    },

    /// A mutation matched more entities than it is allowed to touch.
    #[error("ambiguous match in resource '{resource}': {count} entities matched; use unsafe to mutate multiple entities")]
    AmbiguousMatch {
        /// The resource the operation targets.
        resource: String,
        /// How many entities matched.
        count: usize,
    },

    /// A PATCH found nothing to update.
    #[error("no entity matched the given conditions in resource '{resource}'")]
    NoMatch {
        /// The resource the operation targets.
        resource: String,
    },

    /// An entity failed its validation hook before insert/update.
    #[error("invalid entity for resource '{resource}': {reason}")]
    FailedValidation {
        /// The resource the entity belongs to.
        resource: String,
        /// Reason returned by the validation hook.
        reason: String,
    },

    /// The request body held more entities than the governed maximum.
    #[error("input count {count} exceeds the limit of {limit} for resource '{resource}'")]
    InvalidInputCount {
        /// Number of entities in the body.
        count: usize,
        /// Governed maximum.
        limit: usize,
        /// The resource the operation targets.
        resource: String,
    },

    /// The request body does not fit the requested method.
    #[error("method {method} is not valid here: {message}")]
    MethodNotAllowed {
        /// The requested method.
        method: Method,
        /// Why it was rejected.
        message: String,
    },

    /// A provider delegate failed. The original cause is attached.
    #[error("aborted {method} on resource '{resource}': {source}")]
    Aborted {
        /// The method whose provider delegate failed.
        method: Method,
        /// The resource the operation targeted.
        resource: String,
        /// The provider's failure.
        #[source]
        source: Box<Error>,
    },

    /// A self-referential resource definition caused unbounded recursion.
    ///
    /// This signals a configuration bug, not an operational failure, and
    /// is never wrapped in an [`Error::Aborted`] envelope.
    #[error("infinite loop detected in resource '{resource}'")]
    InfiniteLoop {
        /// The self-referential resource.
        resource: String,
    },

    /// A provider-side failure with no more specific category.
    #[error("provider error: {message}")]
    Provider {
        /// Description from the provider.
        message: String,
    },
}

impl Error {
    /// Shorthand for a syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Error::Syntax {
            message: message.into(),
        }
    }

    /// Shorthand for a provider-side failure.
    pub fn provider(message: impl Into<String>) -> Self {
        Error::Provider {
            message: message.into(),
        }
    }

    /// Wraps a provider failure in the operation-abort envelope.
    ///
    /// The infinite-loop sentinel passes through unwrapped so that a
    /// configuration bug is never reported as an operational failure.
    pub(crate) fn abort(self, method: Method, resource: &str) -> Self {
        match self {
            err @ Error::InfiniteLoop { .. } => err,
            other => Error::Aborted {
                method,
                resource: resource.to_string(),
                source: Box::new(other),
            },
        }
    }
}
