#![allow(dead_code)]

use async_trait::async_trait;
use checkout_client::checkout::{CheckoutFailure, CheckoutOptions, CheckoutSuccess};
use checkout_client::flow::EventInfo;
use checkout_client::registration::Attendee;
use checkout_client::{
    CheckoutInitiator, CheckoutOutcome, HostedCheckout, InMemoryRegistrationStore, PaymentsApi,
    RegistrationCheckout,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_KEY_ID: &str = "rzp_test_key_id";
pub const ORDER_ID: &str = "order_test_1";
pub const PAYMENT_ID: &str = "pay_test_1";
pub const VALID_SIGNATURE: &str = "valid_signature";

/// What the payer does in the hosted checkout, one entry per attempt.
#[derive(Debug, Clone)]
pub enum Script {
    Pay { signature: String },
    PayForOrder { order_id: String, signature: String },
    Decline,
    Close,
    Hang,
    Unavailable,
}

impl Script {
    pub fn pay() -> Self {
        Script::Pay {
            signature: VALID_SIGNATURE.to_string(),
        }
    }
}

#[derive(Default)]
pub struct ScriptedCheckout {
    scripts: Mutex<VecDeque<Script>>,
    opened: Mutex<Vec<CheckoutOptions>>,
    held: Mutex<Vec<oneshot::Sender<CheckoutOutcome>>>,
}

impl ScriptedCheckout {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            ..Default::default()
        })
    }

    pub fn opened(&self) -> Vec<CheckoutOptions> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostedCheckout for ScriptedCheckout {
    async fn open(
        &self,
        options: CheckoutOptions,
    ) -> Result<oneshot::Receiver<CheckoutOutcome>, CheckoutFailure> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("no script left for this checkout");
        let order_id = options.order_id.clone();
        self.opened.lock().unwrap().push(options);

        let (tx, rx) = oneshot::channel();
        match script {
            Script::Pay { signature } => {
                let _ = tx.send(CheckoutOutcome::Success(CheckoutSuccess {
                    razorpay_order_id: order_id,
                    razorpay_payment_id: PAYMENT_ID.to_string(),
                    razorpay_signature: signature,
                }));
            }
            Script::PayForOrder {
                order_id,
                signature,
            } => {
                let _ = tx.send(CheckoutOutcome::Success(CheckoutSuccess {
                    razorpay_order_id: order_id,
                    razorpay_payment_id: PAYMENT_ID.to_string(),
                    razorpay_signature: signature,
                }));
            }
            Script::Decline => {
                let _ = tx.send(CheckoutOutcome::Failed(CheckoutFailure {
                    code: "BAD_REQUEST_ERROR".to_string(),
                    description: "Payment declined by bank".to_string(),
                }));
            }
            Script::Close => drop(tx),
            Script::Hang => self.held.lock().unwrap().push(tx),
            Script::Unavailable => {
                return Err(CheckoutFailure {
                    code: "SCRIPT_LOAD_FAILED".to_string(),
                    description: "Failed to load Razorpay checkout".to_string(),
                })
            }
        }

        Ok(rx)
    }
}

/// Stands in for the payment service.
pub struct PaymentServiceMock {
    pub server: MockServer,
}

impl PaymentServiceMock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub async fn accept_orders(&self, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/api/payments/create-order"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "order": {
                    "id": ORDER_ID,
                    "amount": 50000,
                    "currency": "INR",
                    "receipt": "event_evt_1_1700000000000"
                }
            })))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    pub async fn reject_orders(&self) {
        Mock::given(method("POST"))
            .and(path("/api/payments/create-order"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": "Failed to create order",
                "details": "Authentication failed"
            })))
            .mount(&self.server)
            .await;
    }

    /// Only `VALID_SIGNATURE` verifies; anything else gets the service's 400.
    /// The first mounted mock wins when both match.
    pub async fn verify_signatures(&self) {
        Mock::given(method("POST"))
            .and(path("/api/payments/verify-payment"))
            .and(body_partial_json(json!({ "razorpay_signature": VALID_SIGNATURE })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Payment verified successfully",
                "paymentId": PAYMENT_ID
            })))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/payments/verify-payment"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "error": "Invalid payment signature"
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn requests_to(&self, endpoint: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == endpoint)
            .count()
    }

    pub async fn verify_calls(&self) -> usize {
        self.requests_to("/api/payments/verify-payment").await
    }
}

pub fn event() -> EventInfo {
    EventInfo {
        id: "evt_1".to_string(),
        title: "RustConf Meetup".to_string(),
        fee: Some(500),
        currency: "INR".to_string(),
    }
}

pub fn attendee() -> Attendee {
    Attendee {
        event_id: "evt_1".to_string(),
        user_id: Some("user_1".to_string()),
        name: "Asha".to_string(),
        email: "asha@example.com".to_string(),
        phone: "9999999999".to_string(),
    }
}

pub struct TestFlow {
    pub service: PaymentServiceMock,
    pub hosted: Arc<ScriptedCheckout>,
    pub store: Arc<InMemoryRegistrationStore>,
    pub flow: RegistrationCheckout,
}

impl TestFlow {
    pub async fn spawn(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self::spawn_with_timeout(scripts, None).await
    }

    pub async fn spawn_with_timeout(
        scripts: impl IntoIterator<Item = Script>,
        ui_timeout: Option<Duration>,
    ) -> Self {
        let service = PaymentServiceMock::start().await;
        let hosted = ScriptedCheckout::new(scripts);
        let store = Arc::new(InMemoryRegistrationStore::new());

        let initiator =
            CheckoutInitiator::new(PaymentsApi::new(service.uri()), hosted.clone(), TEST_KEY_ID);
        let flow = RegistrationCheckout::new(
            store.clone(),
            initiator,
            "Event Registration System",
            ui_timeout,
        );

        Self {
            service,
            hosted,
            store,
            flow,
        }
    }
}
