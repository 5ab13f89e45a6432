//! Invoice rendering and dispatch.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Method;
use serde_json::json;
use storage::{BookingId, Money, PaymentId, UserId};

use crate::error::{Result, SagaError};
use crate::services::outbound::{OutboundCall, OutboundRequest};

const SERVICE: &str = "notification";

/// Subject line of every invoice message.
pub const INVOICE_SUBJECT: &str = "Your EcoDrive Invoice";

/// An invoice for a committed payment.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub to: String,
    pub user_id: UserId,
    /// Absent for membership purchases.
    pub booking_id: Option<BookingId>,
    pub payment_id: PaymentId,
    pub total: Money,
    pub payment_method: String,
    /// Start of the rental or of the membership validity, already formatted.
    pub period_start: String,
    pub period_end: String,
    pub membership_level: Option<String>,
}

impl Invoice {
    pub fn subject(&self) -> &'static str {
        INVOICE_SUBJECT
    }

    pub fn attachment_name(&self) -> String {
        format!("Invoice_{}.txt", self.payment_id)
    }

    /// Renders the HTML message body.
    pub fn html_body(&self) -> String {
        let mut items = Vec::new();
        if let Some(booking_id) = self.booking_id {
            items.push(format!("<li>Booking ID: {booking_id}</li>"));
        }
        if let Some(level) = &self.membership_level {
            items.push(format!("<li>Membership: {level}</li>"));
        }
        items.push(format!("<li>Payment ID: {}</li>", self.payment_id));
        items.push(format!("<li>Total Price: {}</li>", self.total));

        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"><title>Invoice</title></head>\n<body>\n\
             <p>Dear User,</p>\n\
             <p>Thank you for using EcoDrive! Attached is your invoice for the recent transaction.</p>\n\
             <p>Details:</p>\n<ul>\n{}\n</ul>\n\
             <p>Best regards,<br>The EcoDrive Team</p>\n</body>\n</html>\n",
            items.join("\n")
        )
    }

    /// Renders the attached invoice document.
    pub fn document(&self) -> String {
        let mut lines = vec!["EcoDrive Invoice".to_string(), String::new()];
        if let Some(booking_id) = self.booking_id {
            lines.push(format!("Booking ID: {booking_id}"));
        }
        if let Some(level) = &self.membership_level {
            lines.push(format!("Membership Level: {level}"));
        }
        lines.push(format!("Payment ID: {}", self.payment_id));
        lines.push(format!("User ID: {}", self.user_id));
        lines.push(format!("Total Price: {}", self.total));
        lines.push(format!("Payment Method: {}", self.payment_method));
        lines.push(format!("Start Date: {}", self.period_start));
        lines.push(format!("End Date: {}", self.period_end));
        lines.push(String::new());
        lines.push("Thank you for choosing EcoDrive. Drive safe!".to_string());
        lines.join("\n")
    }
}

/// Trait for dispatching invoices.
#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn send_invoice(&self, invoice: &Invoice) -> Result<()>;
}

/// Posts rendered invoices to a mail gateway.
#[derive(Clone)]
pub struct HttpNotificationEmitter {
    caller: Arc<dyn OutboundCall>,
    url: String,
}

impl HttpNotificationEmitter {
    pub fn new(caller: Arc<dyn OutboundCall>, url: &str) -> Self {
        Self {
            caller,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl NotificationEmitter for HttpNotificationEmitter {
    #[tracing::instrument(skip(self, invoice), fields(payment_id = %invoice.payment_id))]
    async fn send_invoice(&self, invoice: &Invoice) -> Result<()> {
        let response = self
            .caller
            .call(OutboundRequest {
                service: SERVICE,
                method: Method::POST,
                url: self.url.clone(),
                body: json!({
                    "to": invoice.to,
                    "subject": invoice.subject(),
                    "html_body": invoice.html_body(),
                    "attachment_name": invoice.attachment_name(),
                    "attachment_base64": STANDARD.encode(invoice.document()),
                }),
            })
            .await
            .map_err(|e| SagaError::Notification(e.to_string()))?;

        if !response.is_success() {
            return Err(SagaError::Notification(format!(
                "mail gateway responded with status {}",
                response.status
            )));
        }
        Ok(())
    }
}

/// Logs invoices instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationEmitter;

#[async_trait]
impl NotificationEmitter for LogNotificationEmitter {
    async fn send_invoice(&self, invoice: &Invoice) -> Result<()> {
        tracing::info!(
            to = %invoice.to,
            payment_id = %invoice.payment_id,
            attachment = %invoice.attachment_name(),
            "invoice dispatched to log"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<Invoice>,
    fail_on_send: bool,
}

/// In-memory notification emitter for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationEmitter {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the emitter to fail every send.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns the invoices sent so far.
    pub fn sent(&self) -> Vec<Invoice> {
        self.state.read().unwrap().sent.clone()
    }
}

#[async_trait]
impl NotificationEmitter for InMemoryNotificationEmitter {
    async fn send_invoice(&self, invoice: &Invoice) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_send {
            return Err(SagaError::Notification("mail transport unavailable".to_string()));
        }
        state.sent.push(invoice.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::outbound::RecordingCaller;

    fn invoice() -> Invoice {
        Invoice {
            to: "rider@example.com".to_string(),
            user_id: UserId::new(2),
            booking_id: Some(BookingId::new(11)),
            payment_id: PaymentId::new(21),
            total: Money::from_cents(4050),
            payment_method: "Card".to_string(),
            period_start: "2025-08-20 10:00:00".to_string(),
            period_end: "2025-08-20 12:00:00".to_string(),
            membership_level: None,
        }
    }

    #[test]
    fn test_rendering() {
        let invoice = invoice();
        assert_eq!(invoice.attachment_name(), "Invoice_21.txt");

        let html = invoice.html_body();
        assert!(html.contains("<li>Booking ID: 11</li>"));
        assert!(html.contains("<li>Payment ID: 21</li>"));
        assert!(html.contains("<li>Total Price: $40.50</li>"));

        let document = invoice.document();
        assert!(document.starts_with("EcoDrive Invoice"));
        assert!(document.contains("Start Date: 2025-08-20 10:00:00"));
    }

    #[tokio::test]
    async fn test_http_emitter_encodes_attachment() {
        let caller = RecordingCaller::new();
        let emitter = HttpNotificationEmitter::new(Arc::new(caller.clone()), "http://mail/send");

        emitter.send_invoice(&invoice()).await.unwrap();

        let body = &caller.requests()[0].body;
        assert_eq!(body["subject"], INVOICE_SUBJECT);
        let encoded = body["attachment_base64"].as_str().unwrap();
        let decoded = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded, invoice().document());
    }

    #[tokio::test]
    async fn test_http_emitter_failure_is_notification_error() {
        let caller = RecordingCaller::new();
        caller.respond(SERVICE, 502, serde_json::Value::Null);
        let emitter = HttpNotificationEmitter::new(Arc::new(caller), "http://mail/send");

        let err = emitter.send_invoice(&invoice()).await.unwrap_err();
        assert!(matches!(err, SagaError::Notification(_)));
    }

    #[tokio::test]
    async fn test_in_memory_emitter_failure_switch() {
        let emitter = InMemoryNotificationEmitter::new();
        emitter.send_invoice(&invoice()).await.unwrap();

        emitter.set_fail_on_send(true);
        assert!(emitter.send_invoice(&invoice()).await.is_err());
        assert_eq!(emitter.sent().len(), 1);
    }
}
