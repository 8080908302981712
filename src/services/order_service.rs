use {
    super::{
        gateway_event::{EventKind, GatewayEvent, WebhookAck},
        listing_cache::OrderListCache,
    },
    crate::domain::{
        cart::CartSnapshot,
        error::OrderError,
        id::{PaymentId, PaymentRef},
        ledger::{AmountConflict, EntrySource, LedgerEntry, LedgerInsert},
        money::{Currency, MoneyAmount},
        order::{Address, CustomerIdentity, NewOrderParams, Order, OrderStatus, PaymentStatus},
        provider::{CartService, PaymentGateway, PaymentIntent, ReceiptNotifier},
        reconciliation::{ReconciliationReport, reconcile},
        signature,
        store::{CheckoutWriter, LedgerStore, OrderInsert, OrderQuery, OrderStore, StatusUpdate},
    },
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::{sync::Arc, time::Duration},
    uuid::Uuid,
};

pub const CHECKOUT_ACTOR: &str = "checkout";

/// HMAC secrets shared with the gateway.
#[derive(Clone)]
pub struct SigningSecrets {
    /// Signs `order_ref|payment_id` on the client-completion path.
    pub key_secret: Vec<u8>,
    /// Signs raw webhook bodies.
    pub webhook_secret: Vec<u8>,
}

pub struct OrderServiceDeps {
    pub orders: Arc<dyn OrderStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub writer: Arc<dyn CheckoutWriter>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub cart: Arc<dyn CartService>,
    pub notifier: Arc<dyn ReceiptNotifier>,
    pub secrets: SigningSecrets,
    pub currency: Currency,
    /// Sweeps only judge records older than this.
    pub reconcile_settle: Duration,
}

/// Client-reported proof that the gateway accepted a payment.
#[derive(Debug, Clone)]
pub struct PaymentProof {
    pub payment_id: PaymentId,
    pub order_ref: PaymentRef,
    pub signature: String,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub proof: PaymentProof,
    /// Authenticated buyer whose cart gets cleared.
    pub buyer: String,
    pub cart: CartSnapshot,
    pub customer: CustomerIdentity,
    pub address: Address,
    pub category: Option<String>,
}

/// Non-fatal problems that did not stop the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutWarning {
    CartNotCleared { reason: String },
    LedgerCreditPending,
    LedgerAmountDiffers { ledger_amount: MoneyAmount },
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// False when the completion was a replay of one already committed.
    pub created: bool,
    pub warnings: Vec<CheckoutWarning>,
}

/// Orchestrates payment initiation, completion, webhook reconciliation and
/// fulfillment transitions.
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    ledger: Arc<dyn LedgerStore>,
    writer: Arc<dyn CheckoutWriter>,
    gateway: Arc<dyn PaymentGateway>,
    cart: Arc<dyn CartService>,
    notifier: Arc<dyn ReceiptNotifier>,
    secrets: SigningSecrets,
    currency: Currency,
    reconcile_settle: Duration,
    listings: OrderListCache,
}

impl OrderService {
    pub fn new(deps: OrderServiceDeps) -> Self {
        Self {
            orders: deps.orders,
            ledger: deps.ledger,
            writer: deps.writer,
            gateway: deps.gateway,
            cart: deps.cart,
            notifier: deps.notifier,
            secrets: deps.secrets,
            currency: deps.currency,
            reconcile_settle: deps.reconcile_settle,
            listings: OrderListCache::new(),
        }
    }

    pub fn cart(&self) -> &Arc<dyn CartService> {
        &self.cart
    }

    /// Ask the gateway for a payment intent. Writes nothing locally: the
    /// buyer may never pay.
    pub async fn initiate_payment(
        &self,
        cart: &CartSnapshot,
        amount: MoneyAmount,
    ) -> Result<PaymentIntent, OrderError> {
        if amount.is_zero() {
            return Err(OrderError::Validation("amount must be positive".into()));
        }
        let cart_total = cart.total()?;
        if cart_total != amount {
            return Err(OrderError::Validation(format!(
                "amount {amount} does not match cart total {cart_total}"
            )));
        }

        let intent = self.gateway.create_intent(amount, self.currency).await?;
        tracing::info!(
            reference = %intent.external_payment_ref,
            amount = %intent.amount,
            currency = %self.currency,
            "payment intent created"
        );
        Ok(intent)
    }

    /// Verify the client's proof, then persist the order with its ledger
    /// credit. Cart clearing and the receipt are best-effort and never undo
    /// a committed order.
    pub async fn complete_payment(
        &self,
        request: CompletionRequest,
    ) -> Result<CheckoutOutcome, OrderError> {
        let CompletionRequest {
            proof,
            buyer,
            cart,
            customer,
            address,
            category,
        } = request;

        let payload = signature::completion_payload(&proof.order_ref, &proof.payment_id);
        if !signature::verify(&payload, &proof.signature, &self.secrets.key_secret) {
            tracing::warn!(
                security_event = true,
                reference = %proof.order_ref,
                payment_id = %proof.payment_id,
                buyer = %buyer,
                "payment proof signature mismatch"
            );
            return Err(OrderError::PaymentVerificationFailed);
        }

        let amount = cart.total()?;
        let customer = customer.snapshot(address)?;
        let now = Utc::now();

        let order = Order::place(NewOrderParams {
            customer,
            items: cart.items,
            amount,
            payment_status: PaymentStatus::Paid,
            external_payment_ref: proof.order_ref.clone(),
            category,
            actor: CHECKOUT_ACTOR.to_string(),
            at: now,
        });
        let credit = LedgerEntry::credit(
            proof.order_ref,
            Some(proof.payment_id),
            amount,
            EntrySource::Checkout,
            now,
        );

        let commit = self.writer.commit_paid_order(&order, &credit).await?;
        self.listings.invalidate();

        let order_amount = commit.order.order().amount();
        let mut warnings = Vec::new();
        match &commit.credit {
            None => warnings.push(CheckoutWarning::LedgerCreditPending),
            Some(LedgerInsert::Duplicate(existing)) if existing.amount != order_amount => {
                tracing::warn!(
                    reference = %credit.reference,
                    order_amount = %order_amount,
                    ledger_amount = %existing.amount,
                    "ledger credit already recorded with a different amount"
                );
                warnings.push(CheckoutWarning::LedgerAmountDiffers {
                    ledger_amount: existing.amount,
                });
            }
            Some(_) => {}
        }

        let order = match commit.order {
            OrderInsert::Existing(existing) => {
                if existing.amount() != amount {
                    tracing::warn!(
                        order_id = %existing.id(),
                        stored_amount = %existing.amount(),
                        replayed_amount = %amount,
                        "replayed completion carried a different cart total"
                    );
                }
                tracing::info!(
                    order_id = %existing.id(),
                    reference = %existing.external_payment_ref(),
                    "completion replayed, returning existing order"
                );
                return Ok(CheckoutOutcome {
                    order: existing,
                    created: false,
                    warnings,
                });
            }
            OrderInsert::Inserted(order) => order,
        };

        tracing::info!(
            order_id = %order.id(),
            reference = %order.external_payment_ref(),
            amount = %order.amount(),
            "order placed"
        );

        if let Err(e) = self.cart.clear(&buyer).await {
            tracing::warn!(order_id = %order.id(), buyer = %buyer, error = %e, "cart clear failed");
            warnings.push(CheckoutWarning::CartNotCleared {
                reason: e.to_string(),
            });
        }

        self.dispatch_receipt(order.clone());

        Ok(CheckoutOutcome {
            order,
            created: true,
            warnings,
        })
    }

    fn dispatch_receipt(&self, order: Order) {
        let notifier = Arc::clone(&self.notifier);
        let order_id = order.id();
        tokio::spawn(async move {
            match notifier.send_receipt(order).await {
                Ok(()) => tracing::debug!(%order_id, "receipt sent"),
                Err(e) => tracing::warn!(%order_id, error = %e, "receipt send failed"),
            }
        });
    }

    /// Verify and record a gateway notification. A credit that already
    /// exists for the reference, from either channel, is acknowledged
    /// without a second write.
    #[tracing::instrument(
        name = "webhook",
        skip_all,
        fields(event = tracing::field::Empty, reference = tracing::field::Empty)
    )]
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookAck, OrderError> {
        let Some(provided) = signature_header else {
            tracing::warn!(security_event = true, "webhook without signature header");
            return Err(OrderError::WebhookSignature(
                "missing signature header".into(),
            ));
        };
        if !signature::verify(raw_body, provided, &self.secrets.webhook_secret) {
            tracing::warn!(
                security_event = true,
                body_len = raw_body.len(),
                "webhook signature mismatch"
            );
            return Err(OrderError::WebhookSignature("signature mismatch".into()));
        }

        let event = GatewayEvent::parse(raw_body)?;
        tracing::Span::current().record("event", tracing::field::display(&event.event));

        if event.kind() == EventKind::Unknown {
            tracing::info!("unhandled event type, acknowledged");
            return Ok(WebhookAck::Ignored { event: event.event });
        }

        let payment = match event.reported_payment() {
            Ok(p) => p,
            Err(OrderError::Validation(msg)) => {
                tracing::warn!("skipping invalid payment data: {msg}");
                return Ok(WebhookAck::IgnoredInvalidData);
            }
            Err(e) => return Err(e),
        };
        tracing::Span::current().record("reference", tracing::field::display(&payment.reference));

        let entry = LedgerEntry::credit(
            payment.reference,
            Some(payment.payment_id),
            payment.amount,
            EntrySource::Webhook,
            Utc::now(),
        );

        match self.ledger.insert_if_absent(&entry).await? {
            LedgerInsert::Inserted(recorded) => {
                tracing::info!(amount = %recorded.amount, "ledger credit recorded");
                Ok(WebhookAck::Recorded {
                    reference: recorded.reference,
                })
            }
            LedgerInsert::Duplicate(existing) => {
                if existing.amount != entry.amount {
                    let conflict = AmountConflict::between(&existing, &entry);
                    let first_report = self.ledger.record_conflict(&conflict).await?;
                    tracing::warn!(
                        ledger_amount = %existing.amount,
                        reported_amount = %entry.amount,
                        first_report,
                        "duplicate credit reported with a different amount"
                    );
                } else {
                    tracing::info!("duplicate notification, already recorded");
                }
                Ok(WebhookAck::Duplicate {
                    reference: existing.reference,
                })
            }
        }
    }

    /// Staff-requested fulfillment step. Compare-and-swap on the status that
    /// was read, so of two racing requests at most one lands.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor: &str,
    ) -> Result<Order, OrderError> {
        let current = self
            .orders
            .get(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let updated = current.transition(new_status, actor, Utc::now())?;

        match self
            .orders
            .compare_and_set_status(current.status(), &updated)
            .await?
        {
            StatusUpdate::Applied(order) => {
                self.listings.invalidate();
                tracing::info!(
                    %order_id,
                    from = %current.status(),
                    to = %order.status(),
                    actor,
                    "order status changed"
                );
                Ok(order)
            }
            StatusUpdate::Conflict { current: now } => {
                tracing::warn!(
                    %order_id,
                    expected = %current.status(),
                    found = %now,
                    requested = %new_status,
                    "concurrent status change, rejected"
                );
                Err(OrderError::StatusConflict {
                    expected: current.status(),
                    found: now,
                })
            }
            StatusUpdate::NotFound => Err(OrderError::OrderNotFound(order_id)),
        }
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .get(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    pub async fn list_orders(&self, query: &OrderQuery) -> Result<Arc<Vec<Order>>, OrderError> {
        let (cached, generation) = self.listings.lookup(query);
        if let Some(orders) = cached {
            return Ok(orders);
        }
        let orders = self.orders.list(query).await?;
        Ok(self.listings.store(query.clone(), generation, orders))
    }

    /// Compare paid orders with ledger credits. Reads straight from the
    /// stores, never from the listing cache. The cutoff is fixed before the
    /// first read; checkouts committing during the reads are judged next time.
    pub async fn reconcile(&self) -> Result<ReconciliationReport, OrderError> {
        let cutoff = self.sweep_cutoff(Utc::now());
        let orders = self.orders.list(&OrderQuery::paid()).await?;
        let credits = self.ledger.list_credits().await?;
        let conflicts = self.ledger.list_conflicts().await?;
        let report = reconcile(&orders, &credits, &conflicts, cutoff, Utc::now());

        if report.is_clean() {
            tracing::info!(
                orders = report.orders_checked,
                credits = report.credits_checked,
                "reconciliation clean"
            );
        } else {
            tracing::warn!(
                orders = report.orders_checked,
                credits = report.credits_checked,
                discrepancies = report.discrepancies.len(),
                "reconciliation found discrepancies"
            );
        }
        Ok(report)
    }

    fn sweep_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.reconcile_settle)
            .ok()
            .and_then(|settle| now.checked_sub_signed(settle))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
