use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;

use crate::db::OrderRepo;
use crate::error::OrderError;
use crate::mailer::{spawn_order_notification, Mailer};
use crate::models::{CreateOrderRequest, UpdateStatusRequest};

/// Customer-facing order codes are 5-7 decimal digits; anything else is
/// treated as an internal id.
pub fn is_order_code(id: &str) -> bool {
    (5..=7).contains(&id.len()) && id.chars().all(|c| c.is_ascii_digit())
}

pub async fn get_stats(repo: web::Data<OrderRepo>) -> impl Responder {
    match repo.dashboard_stats().await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => {
            tracing::error!(error = %e, "failed to compute dashboard stats");
            HttpResponse::InternalServerError().json(json!({ "message": "Server Error" }))
        }
    }
}

pub async fn list_orders(repo: web::Data<OrderRepo>) -> impl Responder {
    match repo.list_all().await {
        Ok(orders) => HttpResponse::Ok().json(orders),
        Err(e) => {
            tracing::error!(error = %e, "failed to list orders");
            HttpResponse::InternalServerError().json(json!({ "message": "Server Error" }))
        }
    }
}

pub async fn get_order(repo: web::Data<OrderRepo>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();

    let result = if is_order_code(&id) {
        repo.find_by_code(&id).await
    } else {
        match Uuid::parse_str(&id) {
            Ok(uuid) => repo.find_by_id(uuid).await,
            // malformed internal ids read as "no such order"
            Err(_) => {
                return HttpResponse::NotFound().json(json!({ "message": "Order not found" }))
            }
        }
    };

    match result {
        Ok(order) => HttpResponse::Ok().json(order),
        Err(sqlx::Error::RowNotFound) => {
            HttpResponse::NotFound().json(json!({ "message": "Order not found" }))
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to fetch order");
            HttpResponse::InternalServerError().json(json!({ "message": "Server Error" }))
        }
    }
}

pub async fn create_order(
    repo: web::Data<OrderRepo>,
    mailer: web::Data<Option<Arc<Mailer>>>,
    req: web::Json<CreateOrderRequest>,
) -> impl Responder {
    match repo.create(&req).await {
        Ok(order) => {
            spawn_order_notification(mailer.get_ref().clone(), order.clone());
            HttpResponse::Created().json(order)
        }
        Err(OrderError::EmptyCart) => {
            HttpResponse::BadRequest().json(json!({ "message": "Cart is empty" }))
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to create order");
            HttpResponse::InternalServerError().json(json!({ "message": "Server Error" }))
        }
    }
}

pub async fn update_status(
    repo: web::Data<OrderRepo>,
    path: web::Path<Uuid>,
    req: web::Json<UpdateStatusRequest>,
) -> impl Responder {
    let id = path.into_inner();
    match repo.update_status(id, req.status.clone()).await {
        Ok(order) => HttpResponse::Ok().json(order),
        Err(sqlx::Error::RowNotFound) => {
            HttpResponse::NotFound().json(json!({ "message": "Order not found" }))
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to update order status");
            HttpResponse::InternalServerError().json(json!({ "message": "Server Error" }))
        }
    }
}

pub async fn delete_order(repo: web::Data<OrderRepo>, path: web::Path<Uuid>) -> impl Responder {
    let id = path.into_inner();
    match repo.delete(id).await {
        Ok(rows) if rows > 0 => HttpResponse::Ok().json(json!({ "message": "Order removed" })),
        Ok(_) => HttpResponse::NotFound().json(json!({ "message": "Order not found" })),
        Err(e) => {
            tracing::error!(error = %e, "failed to delete order");
            HttpResponse::InternalServerError().json(json!({ "message": "Server Error" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use sqlx::postgres::PgPoolOptions;

    #[::std::prelude::v1::test]
    fn order_code_shape_is_five_to_seven_digits() {
        assert!(is_order_code("10000"));
        assert!(is_order_code("123456"));
        assert!(is_order_code("9999999"));

        assert!(!is_order_code("1234"));
        assert!(!is_order_code("12345678"));
        assert!(!is_order_code("12a456"));
        assert!(!is_order_code(""));
        assert!(!is_order_code("6f9619ff-8b86-d011-b42d-00c04fc964ff"));
    }

    // A lazy pool never opens a connection, so the paths that short-circuit
    // before any query can be exercised without a database.
    fn detached_repo() -> web::Data<OrderRepo> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap();
        web::Data::new(OrderRepo::new(pool))
    }

    #[actix_web::test]
    async fn empty_cart_is_rejected_without_persisting() {
        let app = test::init_service(
            App::new()
                .app_data(detached_repo())
                .app_data(web::Data::new(Option::<Arc<Mailer>>::None))
                .route("/api/orders", web::post().to(create_order)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .set_json(serde_json::json!({
                "customerDetails": { "firstName": "Ayesha", "phone": "0171" },
                "cartItems": [],
                "total": 0.0,
                "paymentInfo": { "paymentMethod": "Cash-on-delivery" }
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["message"], "Cart is empty");
    }

    #[actix_web::test]
    async fn malformed_internal_id_maps_to_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(detached_repo())
                .route("/api/orders/{id}", web::get().to(get_order)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/orders/definitely-not-an-id")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 404);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["message"], "Order not found");
    }
}
