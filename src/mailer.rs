use std::sync::Arc;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;
use crate::error::MailError;
use crate::models::{Order, PaymentMethod};

const MAX_SEND_ATTEMPTS: u32 = 3;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Sends the fixed new-order notification to the operator's own mailbox.
/// Delivery is best-effort; the order flow never waits on it.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    mailbox: String,
}

impl Mailer {
    pub fn new(cfg: &MailConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)?
            .credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            mailbox: cfg.username.clone(),
        })
    }

    async fn send_order_notification(&self, order: &Order) -> Result<(), MailError> {
        let from: Mailbox = format!("\"SAZO | Order Desk\" <{}>", self.mailbox).parse()?;
        let to: Mailbox = self.mailbox.parse()?;
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(format!("New Order #{}", order.order_code))
            .header(ContentType::TEXT_HTML)
            .body(render_order_email(order))?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Hand the notification to a detached task with bounded backoff retry.
/// Exhausted retries are logged and dropped; a missing mailer config means
/// the notification is skipped outright.
pub fn spawn_order_notification(mailer: Option<Arc<Mailer>>, order: Order) {
    let Some(mailer) = mailer else {
        tracing::debug!(order_code = %order.order_code, "mail not configured, skipping notification");
        return;
    };

    tokio::spawn(async move {
        let mut delay = INITIAL_RETRY_DELAY;
        for attempt in 1..=MAX_SEND_ATTEMPTS {
            match mailer.send_order_notification(&order).await {
                Ok(()) => {
                    tracing::info!(order_code = %order.order_code, "admin notified of new order");
                    return;
                }
                Err(e) if attempt < MAX_SEND_ATTEMPTS => {
                    tracing::warn!(
                        order_code = %order.order_code,
                        attempt,
                        error = %e,
                        "order notification failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    tracing::error!(
                        order_code = %order.order_code,
                        error = %e,
                        "order notification dropped after all attempts"
                    );
                }
            }
        }
    });
}

fn payment_display(method: &PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Online => "Online Advance",
        PaymentMethod::CashOnDelivery => "COD",
    }
}

/// Fixed HTML template for the operator mail: customer block, one row per
/// cart item, then subtotal / delivery charge / total payable.
pub fn render_order_email(order: &Order) -> String {
    let subtotal: f64 = order
        .cart_items
        .iter()
        .map(|item| item.price * item.quantity as f64)
        .sum();

    let items_html: String = order
        .cart_items
        .iter()
        .map(|item| {
            format!(
                r#"<tr>
      <td style="padding: 12px; border-bottom: 1px solid #eee;"><img src="{image}" width="50" style="border-radius: 4px;" /></td>
      <td style="padding: 12px; border-bottom: 1px solid #eee;">
        <div style="font-weight: bold; font-size: 14px;">{name}</div>
        <div style="font-size: 12px; color: #666;">Size: {size} | Qty: {qty}</div>
      </td>
      <td style="padding: 12px; border-bottom: 1px solid #eee; text-align: right; font-weight: bold;">&#2547;{line_total}</td>
    </tr>"#,
                image = item.image,
                name = item.name,
                size = item.size,
                qty = item.quantity,
                line_total = item.price * item.quantity as f64,
            )
        })
        .collect();

    let note_html = if order.note.is_empty() {
        String::new()
    } else {
        format!(
            "<strong>Note:</strong> <i style=\"color: #666;\">{}</i>",
            order.note
        )
    };

    format!(
        r#"<div style="font-family: sans-serif; max-width: 600px; margin: auto; border: 1px solid #eee; border-radius: 12px; overflow: hidden;">
      <div style="background: #db2777; padding: 20px; color: white; text-align: center;">
        <h1 style="margin:0;">New Order!</h1>
        <p style="margin:5px 0 0 0; opacity: 0.8;">ID: #{code}</p>
      </div>
      <div style="padding: 20px;">
        <h3 style="color: #db2777; border-bottom: 1px solid #eee; padding-bottom: 10px;">Customer Details</h3>
        <p style="line-height: 1.6;">
            <strong>Name:</strong> {first_name}<br>
            <strong>Phone:</strong> {phone}<br>
            <strong>Address:</strong> {address}<br>
            <strong>City/District:</strong> {city}<br>
            <strong>Payment:</strong> {payment}<br>
            {note}
        </p>

        <h3 style="color: #db2777; border-bottom: 1px solid #eee; padding-bottom: 10px; margin-top: 20px;">Order Items</h3>
        <table width="100%" cellspacing="0" cellpadding="0">{items}</table>

        <div style="text-align: right; padding: 20px; background: #fdf2f8; margin-top: 20px; border-radius: 8px;">
          <div style="margin-bottom: 5px; color: #666; font-size: 14px;">
            Subtotal: &#2547;{subtotal}
          </div>
          <div style="margin-bottom: 10px; color: #666; font-size: 14px;">
            Delivery Charge: &#2547;{shipping}
          </div>
          <div style="font-size: 18px; font-weight: bold; color: #db2777; border-top: 1px solid #f9a8d4; margin-top: 5px;">
            Total Payable: &#2547;{total}
          </div>
        </div>
      </div>
      <div style="background: #f9f9f9; padding: 15px; text-align: center; color: #999; font-size: 12px;">
        SAZO Admin Portal &copy; 2026
      </div>
    </div>"#,
        code = order.order_code,
        first_name = order.first_name,
        phone = order.phone,
        address = order.address,
        city = if order.city.is_empty() { "N/A" } else { &order.city },
        payment = payment_display(&order.payment_method),
        note = note_html,
        items = items_html,
        subtotal = subtotal,
        shipping = order.shipping_charge,
        total = order.total,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CartItem, OrderStatus};
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn sample_order() -> Order {
        Order {
            id: Uuid::new_v4(),
            order_code: "123456".to_string(),
            first_name: "Ayesha".to_string(),
            last_name: String::new(),
            email: String::new(),
            phone: "01712345678".to_string(),
            address: "12 Road, Dhanmondi".to_string(),
            city: "Dhaka".to_string(),
            note: "Deliver after 6pm".to_string(),
            cart_items: Json(vec![
                CartItem {
                    id: "a".into(),
                    name: "Silk Scarf".into(),
                    image: String::new(),
                    size: "M".into(),
                    price: 100.0,
                    quantity: 2,
                },
                CartItem {
                    id: "b".into(),
                    name: "Lip Tint".into(),
                    image: String::new(),
                    size: String::new(),
                    price: 50.0,
                    quantity: 1,
                },
            ]),
            shipping_charge: 60.0,
            total: 310.0,
            computed_total: 310.0,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_details: String::new(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn email_carries_order_code_and_customer_block() {
        let html = render_order_email(&sample_order());
        assert!(html.contains("ID: #123456"));
        assert!(html.contains("Ayesha"));
        assert!(html.contains("01712345678"));
        assert!(html.contains("12 Road, Dhanmondi"));
        assert!(html.contains("Dhaka"));
        assert!(html.contains("Deliver after 6pm"));
    }

    #[test]
    fn email_lists_every_cart_item_with_money_lines() {
        let html = render_order_email(&sample_order());
        assert!(html.contains("Silk Scarf"));
        assert!(html.contains("Lip Tint"));
        assert!(html.contains("Subtotal: &#2547;250"));
        assert!(html.contains("Delivery Charge: &#2547;60"));
        assert!(html.contains("Total Payable: &#2547;310"));
    }

    #[test]
    fn email_renders_cod_display_name() {
        let html = render_order_email(&sample_order());
        assert!(html.contains("Payment:</strong> COD"));

        let mut online = sample_order();
        online.payment_method = PaymentMethod::Online;
        let html = render_order_email(&online);
        assert!(html.contains("Payment:</strong> Online Advance"));
    }

    #[test]
    fn empty_city_and_note_fall_back_cleanly() {
        let mut order = sample_order();
        order.city = String::new();
        order.note = String::new();
        let html = render_order_email(&order);
        assert!(html.contains("City/District:</strong> N/A"));
        assert!(!html.contains("Note:"));
    }
}
