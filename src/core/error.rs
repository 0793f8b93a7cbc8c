use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    // ------------------------------------------------------------------
    // Registration (process initialization)
    // ------------------------------------------------------------------
    #[error("Resource type '{0}' is already registered")]
    DuplicateType(String),

    #[error("Resource type '{resource}' references unregistered type '{target}'")]
    UnknownReference { resource: String, target: String },

    #[error("Invalid resource '{resource}': {reason}")]
    InvalidResource { resource: String, reason: String },

    #[error("Field '{field}' of resource '{resource}' has unsupported kind {kind}")]
    UnsupportedField {
        resource: String,
        field: String,
        kind: String,
    },

    // ------------------------------------------------------------------
    // Statement building (before any I/O)
    // ------------------------------------------------------------------
    #[error("Unknown resource type '{0}'")]
    UnknownResource(String),

    #[error("Column '{column}' not found in resource '{resource}'")]
    UnknownColumn { resource: String, column: String },

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Resource type '{resource}' is bound to {registered}, not {requested}")]
    RuntimeTypeMismatch {
        resource: String,
        registered: &'static str,
        requested: &'static str,
    },

    // ------------------------------------------------------------------
    // Constraint errors, reclassified with resource context
    // ------------------------------------------------------------------
    #[error("Duplicate resource '{resource}': {detail}")]
    DuplicateResource { resource: String, detail: String },

    #[error("Related resource of '{resource}' does not exist or is still referenced: {detail}")]
    RelatedResourceMissing { resource: String, detail: String },

    // ------------------------------------------------------------------
    // Raw constraint errors reported by a backend
    // ------------------------------------------------------------------
    #[error("Unique violation: {0}")]
    UniqueViolation(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    // ------------------------------------------------------------------
    // Transport / execution
    // ------------------------------------------------------------------
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store is closed")]
    StoreClosed,
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    /// True for the two reclassified constraint errors.
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            Self::DuplicateResource { .. }
                | Self::RelatedResourceMissing { .. }
                | Self::UniqueViolation(_)
                | Self::ForeignKeyViolation(_)
        )
    }

    /// Attaches resource context to a raw constraint error reported by the
    /// backend. Other errors pass through unchanged.
    pub fn classify(self, resource: &str) -> Self {
        match self {
            Self::UniqueViolation(detail) => Self::DuplicateResource {
                resource: resource.to_string(),
                detail,
            },
            Self::ForeignKeyViolation(detail) => Self::RelatedResourceMissing {
                resource: resource.to_string(),
                detail,
            },
            other => other,
        }
    }
}
