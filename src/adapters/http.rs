use {
    super::{
        api_errors::ApiError,
        auth::{Buyer, Staff},
    },
    crate::{
        AppState,
        domain::{
            cart::{CartSnapshot, LineItem},
            id::{PaymentId, PaymentRef},
            money::MoneyAmount,
            order::{Address, CustomerIdentity, Order, OrderStatus},
            provider::PaymentIntent,
            reconciliation::ReconciliationReport,
            store::OrderQuery,
        },
        services::{
            gateway_event::WebhookAck,
            order_service::{CheckoutWarning, CompletionRequest, PaymentProof},
        },
    },
    axum::{
        Json, Router,
        body::Bytes,
        extract::{DefaultBodyLimit, Path, Query, State},
        http::{HeaderMap, StatusCode},
        routing::{get, patch, post},
    },
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

pub const SIGNATURE_HEADER: &str = "x-payment-signature";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/payments/initiate", post(initiate_payment))
        .route("/payments/complete", post(complete_payment))
        .route("/payments/webhook", post(payment_webhook))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", patch(update_status))
        .route("/admin/reconciliation", get(reconciliation_report))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    pub amount: i64,
    /// Falls back to the buyer's stored cart when absent.
    #[serde(default)]
    pub cart_items: Option<Vec<LineItem>>,
}

pub async fn initiate_payment(
    State(state): State<AppState>,
    buyer: Buyer,
    Json(req): Json<InitiateRequest>,
) -> Result<Json<PaymentIntent>, ApiError> {
    let amount = MoneyAmount::new(req.amount)?;
    let cart = match req.cart_items {
        Some(items) => CartSnapshot::new(items),
        None => state.service.cart().load(&buyer.id).await?,
    };
    let intent = state.service.initiate_payment(&cart, amount).await?;
    Ok(Json(intent))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub payment_id: String,
    pub order_ref: String,
    pub signature: String,
    pub cart_items: Vec<LineItem>,
    pub address: Address,
    pub customer: CustomerIdentity,
    #[serde(default)]
    pub category: Option<String>,
    // Accepted for older clients; the server sets both itself.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: &'static str,
    pub order: Order,
    pub warnings: Vec<CheckoutWarning>,
}

pub async fn complete_payment(
    State(state): State<AppState>,
    buyer: Buyer,
    Json(req): Json<CompleteRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    if req.status.is_some() || req.date.is_some() {
        tracing::debug!(buyer = %buyer.id, "ignoring client-supplied status/date");
    }

    let request = CompletionRequest {
        proof: PaymentProof {
            payment_id: PaymentId::new(req.payment_id)?,
            order_ref: PaymentRef::new(req.order_ref)?,
            signature: req.signature,
        },
        buyer: buyer.id,
        cart: CartSnapshot::new(req.cart_items),
        customer: req.customer,
        address: req.address,
        category: req.category,
    };

    let outcome = state.service.complete_payment(request).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(CheckoutResponse {
            message: "order placed successfully",
            order: outcome.order,
            warnings: outcome.warnings,
        }),
    ))
}

/// Raw body on purpose: the signature covers the exact bytes sent.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let ack = state.service.handle_webhook(&body, signature).await?;
    Ok(Json(ack))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let status = OrderStatus::try_from(req.status.as_str())?;
    let order = state
        .service
        .update_status(id, status, &staff.actor())
        .await?;
    Ok(Json(order))
}

pub async fn list_orders(
    State(state): State<AppState>,
    _staff: Staff,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = state.service.list_orders(&query).await?;
    Ok(Json(Vec::clone(&orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    _staff: Staff,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.service.get_order(id).await?))
}

pub async fn reconciliation_report(
    State(state): State<AppState>,
    _staff: Staff,
) -> Result<Json<ReconciliationReport>, ApiError> {
    Ok(Json(state.service.reconcile().await?))
}
