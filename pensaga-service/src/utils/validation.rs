use axum::{
    extract::{FromRequest, Request, rejection::JsonRejection},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use service_core::error::AppError;
use validator::Validate;

/// JSON body that has passed `validator` checks.
///
/// Malformed JSON keeps axum's status (400 for syntax, 415 for a wrong
/// content type, 422 for missing or mistyped fields). Failed validation is 422.
pub struct ValidatedJson<T>(pub T);

fn rejection_response(rejection: JsonRejection) -> Response {
    let status = rejection.status();
    (
        status,
        Json(json!({
            "error": "Requête invalide",
            "details": rejection.body_text(),
        })),
    )
        .into_response()
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_response)?;

        value
            .validate()
            .map_err(|e| AppError::from(e).into_response())?;

        Ok(ValidatedJson(value))
    }
}
