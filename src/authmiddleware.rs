use std::future::{ready, Ready};
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::Error;
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Admin session claims. Token issuance belongs to the auth collaborator;
/// this service only verifies the gate.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Bearer-token gate for the admin routes. Requests without a valid,
/// unexpired HS256 token are rejected with 401 before reaching a handler.
#[derive(Clone)]
pub struct AdminAuth {
    jwt_secret: String,
}

impl AdminAuth {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AdminAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthMiddleware {
            service,
            jwt_secret: self.jwt_secret.clone(),
        }))
    }
}

pub struct AdminAuthMiddleware<S> {
    service: S,
    jwt_secret: String,
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|s| s.to_string());

        let verified = token.ok_or(()).and_then(|token| {
            decode::<Claims>(
                &token,
                &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
                &Validation::new(Algorithm::HS256),
            )
            .map(|_| ())
            .map_err(|_| ())
        });

        if verified.is_err() {
            let (req, _) = req.into_parts();
            let response = actix_web::HttpResponse::Unauthorized()
                .json(serde_json::json!({ "message": "Not authorized, token failed" }))
                .map_into_right_body();
            return Box::pin(async move { Ok(ServiceResponse::new(req, response)) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(secret: &str, exp: usize) -> String {
        let claims = Claims {
            sub: "admin".to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    async fn guarded() -> HttpResponse {
        HttpResponse::Ok().body("ok")
    }

    #[actix_web::test]
    async fn rejects_missing_token() {
        let app = test::init_service(
            App::new()
                .wrap(AdminAuth::new(SECRET.to_string()))
                .route("/", web::get().to(guarded)),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 401);
    }

    #[actix_web::test]
    async fn rejects_garbage_token() {
        let app = test::init_service(
            App::new()
                .wrap(AdminAuth::new(SECRET.to_string()))
                .route("/", web::get().to(guarded)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("Authorization", "Bearer not.a.jwt"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 401);
    }

    #[actix_web::test]
    async fn rejects_token_signed_with_other_secret() {
        let app = test::init_service(
            App::new()
                .wrap(AdminAuth::new(SECRET.to_string()))
                .route("/", web::get().to(guarded)),
        )
        .await;

        let far_future = (chrono::Utc::now().timestamp() as usize) + 3600;
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((
                "Authorization",
                format!("Bearer {}", token("wrong-secret", far_future)),
            ))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 401);
    }

    #[actix_web::test]
    async fn passes_valid_token_through() {
        let app = test::init_service(
            App::new()
                .wrap(AdminAuth::new(SECRET.to_string()))
                .route("/", web::get().to(guarded)),
        )
        .await;

        let far_future = (chrono::Utc::now().timestamp() as usize) + 3600;
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((
                "Authorization",
                format!("Bearer {}", token(SECRET, far_future)),
            ))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);
    }
}
