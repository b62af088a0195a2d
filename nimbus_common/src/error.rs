use ::std::fmt::{self, Display};

use ::anyhow::anyhow;

pub type Result<T> = std::result::Result<T, NimbusError>;

/// Kinds of failure surfaced by the Nimbus tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NimbusErrorType {
    NotFound,
    MissingField,
    AlreadyExists,
    IOError,
    /// Request to a remote service failed, with the response status if there was one.
    HttpError(Option<u16>),
    DeserializeError,
    FailToLoadConfig,
    FailToProvision,
    FailToStartSession,
    Timeout,
}

impl Display for NimbusErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Not found"),
            Self::MissingField => write!(f, "Missing field"),
            Self::AlreadyExists => write!(f, "Already exists"),
            Self::IOError => write!(f, "IO error"),
            Self::HttpError(Some(status)) => write!(f, "HTTP error {}", status),
            Self::HttpError(None) => write!(f, "HTTP error"),
            Self::DeserializeError => write!(f, "Deserialize error"),
            Self::FailToLoadConfig => write!(f, "Fail to load config"),
            Self::FailToProvision => write!(f, "Fail to provision"),
            Self::FailToStartSession => write!(f, "Fail to start session"),
            Self::Timeout => write!(f, "Timeout"),
        }
    }
}

#[derive(Debug)]
pub struct NimbusError {
    error_type: NimbusErrorType,
    source: anyhow::Error,
}

macro_rules! define_constructor {
    ($name: ident, $error_type: expr) => {
        pub fn $name<E: Into<anyhow::Error>>(e: E) -> Self {
            Self::new($error_type, e)
        }
    };
}

impl NimbusError {
    fn new<E: Into<anyhow::Error>>(error_type: NimbusErrorType, e: E) -> Self {
        Self {
            error_type,
            source: e.into(),
        }
    }

    pub fn get_error_type(&self) -> NimbusErrorType {
        self.error_type
    }

    define_constructor!(not_found, NimbusErrorType::NotFound);
    define_constructor!(missing_field, NimbusErrorType::MissingField);
    define_constructor!(already_exists, NimbusErrorType::AlreadyExists);
    define_constructor!(io_error, NimbusErrorType::IOError);
    define_constructor!(deserialize_error, NimbusErrorType::DeserializeError);
    define_constructor!(fail_to_load_config, NimbusErrorType::FailToLoadConfig);
    define_constructor!(fail_to_provision, NimbusErrorType::FailToProvision);
    define_constructor!(fail_to_start_session, NimbusErrorType::FailToStartSession);
    define_constructor!(timeout, NimbusErrorType::Timeout);

    pub fn http_error<E: Into<anyhow::Error>>(status: Option<u16>, e: E) -> Self {
        Self::new(NimbusErrorType::HttpError(status), e)
    }

    pub fn cluster_not_found(name: &str) -> Self {
        Self::not_found(anyhow!("Cluster {} not found", name))
    }

    pub fn cluster_already_exists(name: &str) -> Self {
        Self::already_exists(anyhow!("Cluster {} already exists", name))
    }

    pub fn field_missing(field: &str) -> Self {
        Self::missing_field(anyhow!("Field `{}` is required", field))
    }
}

impl Display for NimbusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.source)
    }
}

impl std::error::Error for NimbusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

impl From<std::io::Error> for NimbusError {
    fn from(value: std::io::Error) -> Self {
        Self::io_error(value)
    }
}

impl From<serde_json::Error> for NimbusError {
    fn from(value: serde_json::Error) -> Self {
        Self::deserialize_error(value)
    }
}

impl From<reqwest::Error> for NimbusError {
    fn from(value: reqwest::Error) -> Self {
        let status = value.status().map(|s| s.as_u16());
        Self::http_error(status, value)
    }
}
