pub type ServiceResult<T, E = ServiceError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
}
impl From<trove_storage::Error> for ServiceError {
	fn from(err: trove_storage::Error) -> Self {
		match err {
			trove_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			trove_storage::Error::SerdeJson(inner) => Self::Storage { message: inner.to_string() },
			trove_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			trove_storage::Error::NotFound(message) => Self::NotFound { message },
			trove_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}
impl From<trove_providers::Error> for ServiceError {
	fn from(err: trove_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
