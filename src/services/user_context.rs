use actix_web::{Error as ActixError, FromRequest, HttpRequest, dev::Payload, web::Data};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use crate::AppState;
use crate::database::models::UserProfile;
use crate::error::AppError;
use crate::services::auth::Claims;

/// The authenticated caller, resolved against the identity directory.
/// Extracting it fails with 401 when the token is missing, invalid or
/// names a user the directory does not know.
#[derive(Debug, Clone)]
pub struct UserContext(pub UserProfile);

impl UserContext {
    pub fn user_id(&self) -> Uuid {
        self.0.id
    }

    pub fn profile(&self) -> &UserProfile {
        &self.0
    }

    pub fn is_manager_or_admin(&self) -> bool {
        self.0.is_manager_or_admin()
    }
}

impl FromRequest for UserContext {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let claims = Claims::from_request(req, payload).into_inner();
        let state = req.app_data::<Data<AppState>>().cloned();

        Box::pin(async move {
            let claims = claims?;
            let state = state.ok_or_else(|| {
                AppError::internal_server_error_message("Application state not configured")
            })?;

            let user = state.auth_service.actor(&claims).await?;
            Ok(UserContext(user))
        })
    }
}
