//! Error types for privacy accounting and pipeline operations.

/// Boxed error returned by external collaborators (data store, selection, recoding).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while accounting for or spending a privacy budget.
#[derive(Debug, thiserror::Error)]
pub enum DpError {
    /// Malformed epsilon, delta, sensitivity or composition count.
    #[error("invalid privacy parameter `{param}` = {value}: {reason}")]
    InvalidPrivacyParameter {
        /// Name of the offending parameter.
        param: &'static str,
        /// The rejected value.
        value: f64,
        /// Which precondition was violated.
        reason: &'static str,
    },

    /// A rho budget that is negative or not finite.
    #[error("invalid rho budget {value}: must be finite and >= 0")]
    InvalidBudget {
        /// The rejected budget.
        value: f64,
    },

    /// A stage ratio that is negative, not finite, or a ratio set summing to zero.
    #[error("invalid {stage} ratio {value}: ratios must be finite, >= 0 and not all zero")]
    InvalidRatio {
        /// Stage whose ratio was rejected (`binning`, `selection`, `publish` or `sum`).
        stage: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A negative attribute count handed to the sigma calibrator.
    #[error("invalid attribute count {count}: must be >= 0")]
    InvalidAttributeCount {
        /// The rejected count.
        count: i64,
    },

    /// A sensitivity that is not strictly positive and finite.
    #[error("invalid sensitivity {value}: must be finite and > 0")]
    InvalidSensitivity {
        /// The rejected sensitivity.
        value: f64,
    },

    /// Stage allocations that do not add back up to the total budget.
    #[error("rho budget not conserved (total={total:.12}, allocated={allocated:.12})")]
    BudgetNotConserved {
        /// Total rho that was split.
        total: f64,
        /// Sum of the stage allocations.
        allocated: f64,
    },

    /// Numerical computation error.
    #[error("numerical error: {msg}")]
    NumericalError {
        /// Human-readable error description.
        msg: String,
    },

    /// Opaque failure raised by an external collaborator.
    #[error("collaborator failed: {source}")]
    CollaboratorFailure {
        /// The collaborator's own error, surfaced unchanged.
        #[source]
        source: BoxError,
    },
}

/// Discriminant of [`DpError`], for matching the documented error kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DpErrorKind {
    /// See [`DpError::InvalidPrivacyParameter`].
    InvalidPrivacyParameter,
    /// See [`DpError::InvalidBudget`].
    InvalidBudget,
    /// See [`DpError::InvalidRatio`].
    InvalidRatio,
    /// See [`DpError::InvalidAttributeCount`].
    InvalidAttributeCount,
    /// See [`DpError::InvalidSensitivity`].
    InvalidSensitivity,
    /// See [`DpError::BudgetNotConserved`].
    BudgetNotConserved,
    /// See [`DpError::NumericalError`].
    Numerical,
    /// See [`DpError::CollaboratorFailure`].
    CollaboratorFailure,
}

/// Result type for DP operations.
pub type Result<T> = std::result::Result<T, DpError>;

impl DpError {
    /// Create an invalid privacy parameter error.
    pub fn invalid_param(param: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidPrivacyParameter {
            param,
            value,
            reason,
        }
    }

    /// Create a numerical error.
    pub fn numerical<S: Into<String>>(msg: S) -> Self {
        Self::NumericalError { msg: msg.into() }
    }

    /// Wrap a collaborator error without altering it.
    pub fn collaborator<E: Into<BoxError>>(source: E) -> Self {
        Self::CollaboratorFailure {
            source: source.into(),
        }
    }

    /// The documented kind of this error.
    pub fn kind(&self) -> DpErrorKind {
        match self {
            Self::InvalidPrivacyParameter { .. } => DpErrorKind::InvalidPrivacyParameter,
            Self::InvalidBudget { .. } => DpErrorKind::InvalidBudget,
            Self::InvalidRatio { .. } => DpErrorKind::InvalidRatio,
            Self::InvalidAttributeCount { .. } => DpErrorKind::InvalidAttributeCount,
            Self::InvalidSensitivity { .. } => DpErrorKind::InvalidSensitivity,
            Self::BudgetNotConserved { .. } => DpErrorKind::BudgetNotConserved,
            Self::NumericalError { .. } => DpErrorKind::Numerical,
            Self::CollaboratorFailure { .. } => DpErrorKind::CollaboratorFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn collaborator_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "flows.csv missing");
        let err = DpError::collaborator(io);
        assert_eq!(err.kind(), DpErrorKind::CollaboratorFailure);
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "flows.csv missing");
    }

    #[test]
    fn invalid_param_names_the_parameter() {
        let err = DpError::invalid_param("delta", 1.0, "must be in (0, 1)");
        assert!(err.to_string().contains("`delta`"));
        assert_eq!(err.kind(), DpErrorKind::InvalidPrivacyParameter);
    }
}
