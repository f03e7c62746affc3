use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: anyhow::Error,
}

impl AppError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self { status: StatusCode::NOT_FOUND, inner: anyhow::anyhow!("{what} not found") }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, inner: err }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        anyhow::Error::new(err).into()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        anyhow::Error::new(err).into()
    }
}

impl From<crate::catalog::CatalogError> for AppError {
    fn from(err: crate::catalog::CatalogError) -> Self {
        anyhow::Error::new(err).into()
    }
}

impl From<crate::accounts::AccountError> for AppError {
    fn from(err: crate::accounts::AccountError) -> Self {
        anyhow::Error::new(err).into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = ?self.inner, "request failed");
        }
        let body = crate::templates::error_page(self.status, self.to_string());
        (self.status, Html(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
