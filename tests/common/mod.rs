#![allow(dead_code)]

use order_recon::domain::cart::{CartSnapshot, LineItem};
use order_recon::domain::error::OrderError;
use order_recon::domain::id::{PaymentId, PaymentRef};
use order_recon::domain::ledger::{AmountConflict, LedgerEntry, LedgerInsert};
use order_recon::domain::money::{Currency, MoneyAmount};
use order_recon::domain::order::{Address, CustomerIdentity, Order, OrderStatus};
use order_recon::domain::provider::{
    BoxFuture, CartService, PaymentGateway, PaymentIntent, ReceiptNotifier,
};
use order_recon::domain::signature;
use order_recon::domain::store::{
    LedgerStore, OrderInsert, OrderQuery, OrderStore, StatusUpdate,
};
use order_recon::infra::memory::{MemoryCart, MemoryLedgerStore, MemoryOrderStore};
use order_recon::services::commit::SplitCheckoutWriter;
use order_recon::services::order_service::{
    CompletionRequest, OrderService, OrderServiceDeps, PaymentProof, SigningSecrets,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use uuid::Uuid;

pub const KEY_SECRET: &[u8] = b"test_key_secret";
pub const WEBHOOK_SECRET: &[u8] = b"test_webhook_secret";
pub const BUYER: &str = "buyer-1";

// ── Fakes ──────────────────────────────────────────────────────────────────

/// Hands out `pi_test_<n>` references for whatever amount is asked.
#[derive(Default)]
pub struct MockGateway {
    next: AtomicU32,
}

impl PaymentGateway for MockGateway {
    fn create_intent(
        &self,
        amount: MoneyAmount,
        _currency: Currency,
    ) -> BoxFuture<'_, Result<PaymentIntent, OrderError>> {
        Box::pin(async move {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            Ok(PaymentIntent {
                external_payment_ref: PaymentRef::new(format!("pi_test_{n}"))?,
                amount,
            })
        })
    }
}

/// Memory cart whose `clear` can be made to fail.
#[derive(Default)]
pub struct RecordingCart {
    pub inner: MemoryCart,
    pub fail_clear: AtomicBool,
    pub clears: AtomicU32,
}

impl CartService for RecordingCart {
    fn load<'a>(&'a self, buyer: &'a str) -> BoxFuture<'a, Result<CartSnapshot, OrderError>> {
        self.inner.load(buyer)
    }

    fn clear<'a>(&'a self, buyer: &'a str) -> BoxFuture<'a, Result<(), OrderError>> {
        Box::pin(async move {
            self.clears.fetch_add(1, Ordering::SeqCst);
            if self.fail_clear.load(Ordering::SeqCst) {
                return Err(OrderError::Store("cart service unavailable".into()));
            }
            self.inner.clear(buyer).await
        })
    }
}

/// Forwards every receipt request to a channel, then optionally fails.
pub struct RecordingNotifier {
    sent: mpsc::UnboundedSender<Order>,
    pub fail: AtomicBool,
}

impl ReceiptNotifier for RecordingNotifier {
    fn send_receipt(&self, order: Order) -> BoxFuture<'_, Result<(), OrderError>> {
        Box::pin(async move {
            let _ = self.sent.send(order);
            if self.fail.load(Ordering::SeqCst) {
                return Err(OrderError::Store("smtp down".into()));
            }
            Ok(())
        })
    }
}

/// Memory ledger whose inserts can be made to fail.
#[derive(Default)]
pub struct FlakyLedger {
    pub inner: MemoryLedgerStore,
    pub fail_inserts: AtomicBool,
}

impl LedgerStore for FlakyLedger {
    fn insert_if_absent<'a>(
        &'a self,
        entry: &'a LedgerEntry,
    ) -> BoxFuture<'a, Result<LedgerInsert, OrderError>> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Box::pin(async { Err(OrderError::Store("ledger unavailable".into())) });
        }
        self.inner.insert_if_absent(entry)
    }

    fn find_by_reference<'a>(
        &'a self,
        reference: &'a PaymentRef,
    ) -> BoxFuture<'a, Result<Vec<LedgerEntry>, OrderError>> {
        self.inner.find_by_reference(reference)
    }

    fn list_credits(&self) -> BoxFuture<'_, Result<Vec<LedgerEntry>, OrderError>> {
        self.inner.list_credits()
    }

    fn record_conflict<'a>(
        &'a self,
        conflict: &'a AmountConflict,
    ) -> BoxFuture<'a, Result<bool, OrderError>> {
        self.inner.record_conflict(conflict)
    }

    fn list_conflicts(&self) -> BoxFuture<'_, Result<Vec<AmountConflict>, OrderError>> {
        self.inner.list_conflicts()
    }
}

/// Order store whose first listing stalls after reading its rows until
/// `resume` is notified. Lets a test commit a checkout in the middle of a
/// reconciliation sweep.
pub struct PausingOrders {
    pub inner: Arc<MemoryOrderStore>,
    armed: AtomicBool,
    pub paused: Notify,
    pub resume: Notify,
}

impl PausingOrders {
    pub fn new(inner: Arc<MemoryOrderStore>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(true),
            paused: Notify::new(),
            resume: Notify::new(),
        }
    }
}

impl OrderStore for PausingOrders {
    fn insert_if_absent<'a>(
        &'a self,
        order: &'a Order,
    ) -> BoxFuture<'a, Result<OrderInsert, OrderError>> {
        self.inner.insert_if_absent(order)
    }

    fn get(&self, id: Uuid) -> BoxFuture<'_, Result<Option<Order>, OrderError>> {
        self.inner.get(id)
    }

    fn find_by_payment_ref<'a>(
        &'a self,
        reference: &'a PaymentRef,
    ) -> BoxFuture<'a, Result<Option<Order>, OrderError>> {
        self.inner.find_by_payment_ref(reference)
    }

    fn compare_and_set_status<'a>(
        &'a self,
        expected: OrderStatus,
        updated: &'a Order,
    ) -> BoxFuture<'a, Result<StatusUpdate, OrderError>> {
        self.inner.compare_and_set_status(expected, updated)
    }

    fn list<'a>(&'a self, query: &'a OrderQuery) -> BoxFuture<'a, Result<Vec<Order>, OrderError>> {
        Box::pin(async move {
            let orders = self.inner.list(query).await?;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.paused.notify_one();
                self.resume.notified().await;
            }
            Ok(orders)
        })
    }
}

// ── Harness ────────────────────────────────────────────────────────────────

pub struct Harness {
    pub service: Arc<OrderService>,
    pub orders: Arc<MemoryOrderStore>,
    pub ledger: Arc<FlakyLedger>,
    pub cart: Arc<RecordingCart>,
    pub notifier: Arc<RecordingNotifier>,
    pub receipts: mpsc::UnboundedReceiver<Order>,
}

impl Harness {
    /// Next receipt handed to the notifier, or `None` if none arrives soon.
    pub async fn next_receipt(&mut self) -> Option<Order> {
        tokio::time::timeout(Duration::from_secs(1), self.receipts.recv())
            .await
            .ok()
            .flatten()
    }
}

/// Service over memory stores, split checkout writer, mock gateway.
pub fn harness() -> Harness {
    harness_with_order_reads(|orders| orders as Arc<dyn OrderStore>)
}

/// Like [`harness`], but the service reads orders through `reads`. Checkout
/// writes still go straight to the memory store.
pub fn harness_with_order_reads(
    reads: impl FnOnce(Arc<MemoryOrderStore>) -> Arc<dyn OrderStore>,
) -> Harness {
    let orders = Arc::new(MemoryOrderStore::new());
    let ledger = Arc::new(FlakyLedger::default());
    let cart = Arc::new(RecordingCart::default());
    let (sent, receipts) = mpsc::unbounded_channel();
    let notifier = Arc::new(RecordingNotifier {
        sent,
        fail: AtomicBool::new(false),
    });

    let order_store: Arc<dyn OrderStore> = orders.clone();
    let ledger_store: Arc<dyn LedgerStore> = ledger.clone();
    let writer = Arc::new(SplitCheckoutWriter::new(order_store, ledger_store.clone()));

    let service = Arc::new(OrderService::new(OrderServiceDeps {
        orders: reads(orders.clone()),
        ledger: ledger_store,
        writer,
        gateway: Arc::new(MockGateway::default()),
        cart: cart.clone(),
        notifier: notifier.clone(),
        secrets: SigningSecrets {
            key_secret: KEY_SECRET.to_vec(),
            webhook_secret: WEBHOOK_SECRET.to_vec(),
        },
        currency: Currency::Usd,
        reconcile_settle: Duration::ZERO,
    }));

    Harness {
        service,
        orders,
        ledger,
        cart,
        notifier,
        receipts,
    }
}

// ── Builders ───────────────────────────────────────────────────────────────

pub fn amount(minor: i64) -> MoneyAmount {
    MoneyAmount::new(minor).unwrap()
}

pub fn item(product_ref: &str, unit_price: i64, quantity: u32) -> LineItem {
    LineItem {
        product_ref: product_ref.to_string(),
        name: format!("Product {product_ref}"),
        quantity,
        size: "M".to_string(),
        unit_price: amount(unit_price),
        image_ref: None,
    }
}

/// 500 × 2 + 300 × 1 = 1300.
pub fn sample_cart() -> CartSnapshot {
    CartSnapshot::new(vec![item("sku-a", 500, 2), item("sku-b", 300, 1)])
}

pub fn customer() -> CustomerIdentity {
    CustomerIdentity {
        name: "Ada Buyer".to_string(),
        email: "ada@example.com".to_string(),
    }
}

pub fn address() -> Address {
    Address {
        line1: "1 Market St".to_string(),
        line2: None,
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        postal_code: "62701".to_string(),
        country: "US".to_string(),
    }
}

pub fn sign_completion(order_ref: &str, payment_id: &str) -> String {
    let payload = signature::completion_payload(
        &PaymentRef::new(order_ref).unwrap(),
        &PaymentId::new(payment_id).unwrap(),
    );
    signature::sign(&payload, KEY_SECRET)
}

/// Correctly signed completion for `BUYER`.
pub fn completion(order_ref: &str, payment_id: &str, cart: CartSnapshot) -> CompletionRequest {
    completion_with_signature(order_ref, payment_id, cart, sign_completion(order_ref, payment_id))
}

pub fn completion_with_signature(
    order_ref: &str,
    payment_id: &str,
    cart: CartSnapshot,
    signature: String,
) -> CompletionRequest {
    CompletionRequest {
        proof: PaymentProof {
            payment_id: PaymentId::new(payment_id).unwrap(),
            order_ref: PaymentRef::new(order_ref).unwrap(),
            signature,
        },
        buyer: BUYER.to_string(),
        cart,
        customer: customer(),
        address: address(),
        category: Some("apparel".to_string()),
    }
}

/// Gateway webhook body, serialized once. Sign these exact bytes.
pub fn webhook_body(event: &str, payment_id: &str, order_ref: &str, amount: i64) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "event": event,
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_ref,
                    "amount": amount,
                    "currency": "usd",
                }
            }
        }
    }))
    .unwrap()
}

pub fn sign_webhook(body: &[u8]) -> String {
    signature::sign(body, WEBHOOK_SECRET)
}
