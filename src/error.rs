//! Error types for service resolution

use thiserror::Error;

/// Errors raised while resolving, constructing or registering services
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// Requested service id has no definition, even after autowiring
    #[error("service instance \"{id}\" not found")]
    NotFound { id: String },

    /// Write attempted on a read-only container or store
    #[error("write to readonly container with \"{id}\"")]
    Readonly { id: String },

    /// A service depends on itself somewhere in the construction chain
    #[error("dependency loop detected for \"{id}\"")]
    CircularDependency { id: String },

    /// A required, untyped parameter has no supplied value
    #[error("parameter \"{name}\" not matched")]
    ParameterMismatch { name: String },

    /// Auto-resolution cannot produce an instance of the declared type
    #[error("unknown dependent class or interface \"{class}\"")]
    UnknownDependency { class: String },

    /// A method or hook entry is neither callable nor a resolvable method
    #[error("bad callable \"{what}\" found")]
    BadCallable { what: String },
}

impl DiError {
    /// Create a NotFound error for a service id
    #[inline]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a Readonly error
    #[inline]
    pub fn readonly(id: impl Into<String>) -> Self {
        Self::Readonly { id: id.into() }
    }

    /// Create a CircularDependency error
    #[inline]
    pub fn circular(id: impl Into<String>) -> Self {
        Self::CircularDependency { id: id.into() }
    }

    /// Create a ParameterMismatch error
    #[inline]
    pub fn parameter_mismatch(name: impl Into<String>) -> Self {
        Self::ParameterMismatch { name: name.into() }
    }

    /// Create an UnknownDependency error
    #[inline]
    pub fn unknown_dependency(class: impl Into<String>) -> Self {
        Self::UnknownDependency { class: class.into() }
    }

    /// Create a BadCallable error
    #[inline]
    pub fn bad_callable(what: impl Into<String>) -> Self {
        Self::BadCallable { what: what.into() }
    }
}

/// Result type alias for resolution operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DiError::not_found("cache").to_string(),
            "service instance \"cache\" not found"
        );
        assert_eq!(
            DiError::circular("logger").to_string(),
            "dependency loop detected for \"logger\""
        );
        assert_eq!(
            DiError::parameter_mismatch("driver").to_string(),
            "parameter \"driver\" not matched"
        );
    }

    #[test]
    fn test_error_clone() {
        let err = DiError::unknown_dependency("DriverInterface");
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
