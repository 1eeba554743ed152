use axum::{extract::Request, middleware::Next, response::Response};
use std::future::Future;
use std::pin::Pin;

use crate::database::models::Role;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;

/// Role gate layered on top of the route guard. Rejects with 403 when the
/// resolved identity's role is outside the allowed set; the payload names
/// both the required set and the actual role.
///
/// Usage: `.layer(middleware::from_fn(require_role(&[Role::GlobalAdmin])))`
/// on routes already guarded by `require_auth`.
pub fn require_role(
    allowed: &'static [Role],
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Result<Response, ApiError>> + Send>>
       + Clone
       + Send {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let user = request
                .extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or(ApiError::NoToken)?;

            if !allowed.contains(&user.role) {
                return Err(ApiError::InsufficientPermissions {
                    required: allowed.to_vec(),
                    actual: user.role,
                });
            }

            Ok(next.run(request).await)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app(role: Role, allowed: &'static [Role]) -> Router {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "admin@test.com".to_string(),
            role,
            institution_id: None,
            institution_name: None,
        };

        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(middleware::from_fn(require_role(allowed)))
            // Outermost layer runs first and plays the part of require_auth
            .layer(middleware::from_fn(
                move |mut request: Request, next: Next| {
                    let user = user.clone();
                    async move {
                        request.extensions_mut().insert(user);
                        next.run(request).await
                    }
                },
            ))
    }

    #[tokio::test]
    async fn allows_member_of_role_set() {
        let app = app(Role::GlobalAdmin, &[Role::GlobalAdmin, Role::InstitutionAdmin]);
        let response = app
            .oneshot(HttpRequest::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_role_outside_set() {
        let app = app(Role::Buyer, &[Role::GlobalAdmin]);
        let response = app
            .oneshot(HttpRequest::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let app = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(middleware::from_fn(require_role(&[Role::GlobalAdmin])));
        let response = app
            .oneshot(HttpRequest::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
