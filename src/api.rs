//! HTTP surface over forms, checkout quotes and orders

use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::domain::aggregates::{CheckoutSession, Customer, DisplayStyle, Economics, Form, FormDraft, FormError, Order, OrderError};
use crate::domain::events::DomainEvent;
use crate::domain::services::PriceQuote;
use crate::domain::settings::{PaymentMethod, PixelConfig, ShippingMethod, TrackingPage};
use crate::domain::value_objects::Attributes;
use crate::pixel::DispatchTiming;
use crate::store::{DocumentStore, FORMS, ORDERS};
use crate::StorefrontError;

#[derive(Clone)]
pub struct AppState {
    pub store: DocumentStore,
    pub nats: Option<async_nats::Client>,
    /// Handed to storefronts with each pixel plan so their dispatchers use the configured delays.
    pub pixel_timing: DispatchTiming,
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-forms"})) }))
        .route("/api/v1/forms", get(list_forms).post(create_form))
        .route("/api/v1/forms/:id", get(get_form).put(save_form).delete(delete_form))
        .route("/api/v1/forms/:id/options", post(add_option))
        .route("/api/v1/forms/:id/options/:option_id", put(update_option).delete(remove_option))
        .route("/api/v1/forms/:id/combinations", put(update_combination))
        .route("/api/v1/forms/:id/combinations/all", put(apply_to_all))
        .route("/api/v1/forms/:id/quote", post(quote))
        .route("/api/v1/forms/:id/orders", post(place_order))
        .route("/api/v1/forms/:id/pixels", get(pixel_configs))
        .route("/api/v1/orders/:id", get(get_order))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

fn reject(e: impl Into<StorefrontError>) -> (StatusCode, String) {
    let e = e.into();
    let status = match &e {
        StorefrontError::FormNotFound | StorefrontError::OrderNotFound => StatusCode::NOT_FOUND,
        StorefrontError::Form(FormError::OptionNotFound(_) | FormError::CombinationNotFound(_)) => StatusCode::NOT_FOUND,
        StorefrontError::Form(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StorefrontError::Order(OrderError::SelectionUnavailable) => StatusCode::CONFLICT,
        StorefrontError::Order(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StorefrontError::Storage(err) => {
            tracing::error!(error = %err, "document store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

fn invalid(e: validator::ValidationErrors) -> (StatusCode, String) { (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()) }

async fn load_form(s: &AppState, id: &str) -> ApiResult<Form> {
    s.store.get::<Form>(FORMS, id).await.map_err(reject)?.ok_or_else(|| reject(StorefrontError::FormNotFound))
}

/// Validate and write back the whole draft. Nothing is written when the form
/// is not ready to save.
async fn persist_form(s: &AppState, form: &mut Form) -> ApiResult<()> {
    form.validate_for_save().map_err(reject)?;
    s.store.put(FORMS, form.id(), form).await.map_err(reject)?;
    for event in form.take_events() {
        tracing::debug!(?event, "form event");
    }
    tracing::info!(form_id = form.id(), combinations = form.variant_combinations().len(), "form saved");
    Ok(())
}

async fn publish(s: &AppState, events: Vec<DomainEvent>) {
    let Some(nats) = &s.nats else { return };
    for event in events {
        let DomainEvent::Order(event) = event else { continue };
        match serde_json::to_vec(&event) {
            Ok(payload) => {
                if let Err(e) = nats.publish(event.subject().to_string(), payload.into()).await {
                    tracing::warn!(error = %e, subject = event.subject(), "failed to publish order event");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode order event"),
        }
    }
}

async fn list_forms(State(s): State<AppState>) -> ApiResult<Json<Vec<Form>>> {
    Ok(Json(s.store.get_all::<Form>(FORMS).await.map_err(reject)?))
}

#[derive(Debug, Deserialize, Validate)] pub struct CreateFormRequest { #[validate(length(min = 1, max = 200))] pub title: String }

async fn create_form(State(s): State<AppState>, Json(r): Json<CreateFormRequest>) -> ApiResult<(StatusCode, Json<Form>)> {
    r.validate().map_err(invalid)?;
    let mut form = Form::create(r.title.trim());
    persist_form(&s, &mut form).await?;
    Ok((StatusCode::CREATED, Json(form)))
}

async fn get_form(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Form>> {
    Ok(Json(load_form(&s, &id).await?))
}

async fn save_form(State(s): State<AppState>, Path(id): Path<String>, Json(draft): Json<FormDraft>) -> ApiResult<Json<Form>> {
    let mut form = load_form(&s, &id).await?;
    form.apply_draft(draft).map_err(reject)?;
    persist_form(&s, &mut form).await?;
    Ok(Json(form))
}

async fn delete_form(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    if s.store.delete(FORMS, &id).await.map_err(reject)? { Ok(StatusCode::NO_CONTENT) } else { Err(reject(StorefrontError::FormNotFound)) }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddOptionRequest {
    #[validate(length(min = 1, max = 60))]
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub display_style: DisplayStyle,
}

async fn add_option(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<AddOptionRequest>) -> ApiResult<(StatusCode, Json<Form>)> {
    r.validate().map_err(invalid)?;
    let mut form = load_form(&s, &id).await?;
    form.add_option(&r.name, r.values, r.display_style).map_err(reject)?;
    persist_form(&s, &mut form).await?;
    Ok((StatusCode::CREATED, Json(form)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptionRequest {
    pub name: Option<String>,
    pub values: Option<Vec<String>>,
    pub display_style: Option<DisplayStyle>,
    pub position: Option<usize>,
}

async fn update_option(State(s): State<AppState>, Path((id, option_id)): Path<(String, u32)>, Json(r): Json<UpdateOptionRequest>) -> ApiResult<Json<Form>> {
    let mut form = load_form(&s, &id).await?;
    // rename first so the new values land on the re-keyed rows
    if let Some(name) = r.name { form.rename_option(option_id, &name).map_err(reject)?; }
    if let Some(values) = r.values { form.set_option_values(option_id, values).map_err(reject)?; }
    if let Some(style) = r.display_style { form.set_display_style(option_id, style).map_err(reject)?; }
    if let Some(position) = r.position { form.move_option(option_id, position).map_err(reject)?; }
    persist_form(&s, &mut form).await?;
    Ok(Json(form))
}

async fn remove_option(State(s): State<AppState>, Path((id, option_id)): Path<(String, u32)>) -> ApiResult<Json<Form>> {
    let mut form = load_form(&s, &id).await?;
    form.remove_option(option_id).map_err(reject)?;
    persist_form(&s, &mut form).await?;
    Ok(Json(form))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCombinationRequest { pub attributes: Attributes, #[serde(flatten)] pub economics: Economics }

async fn update_combination(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<UpdateCombinationRequest>) -> ApiResult<Json<Form>> {
    let mut form = load_form(&s, &id).await?;
    form.update_combination(&r.attributes, r.economics).map_err(reject)?;
    persist_form(&s, &mut form).await?;
    Ok(Json(form))
}

async fn apply_to_all(State(s): State<AppState>, Path(id): Path<String>, Json(economics): Json<Economics>) -> ApiResult<Json<Form>> {
    let mut form = load_form(&s, &id).await?;
    form.apply_to_all_combinations(economics).map_err(reject)?;
    persist_form(&s, &mut form).await?;
    Ok(Json(form))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuoteRequest { pub selections: Attributes, pub shipping: Option<ShippingMethod>, pub payment: Option<PaymentMethod> }

#[derive(Debug, Serialize)]
pub struct QuoteResponse { pub session: CheckoutSession, pub quote: PriceQuote }

async fn quote(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<QuoteRequest>) -> ApiResult<Json<QuoteResponse>> {
    let form = load_form(&s, &id).await?;
    let session = CheckoutSession::with_choices(&form, r.selections, r.shipping, r.payment);
    let quote = session.quote(&form);
    Ok(Json(QuoteResponse { session, quote }))
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest { #[serde(flatten)] pub choice: QuoteRequest, pub customer: Customer }

async fn place_order(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<PlaceOrderRequest>) -> ApiResult<(StatusCode, Json<Order>)> {
    let form = load_form(&s, &id).await?;
    let session = CheckoutSession::with_choices(&form, r.choice.selections, r.choice.shipping, r.choice.payment);
    let mut order = Order::place(&form, &session, r.customer).map_err(reject)?;
    let assigned = {
        let mut rng = rand::thread_rng();
        order.complete(&form.thank_you_page().cs_assignment, &mut rng).map_err(reject)?.map(str::to_string)
    };
    s.store.put(ORDERS, order.id(), &order).await.map_err(reject)?;
    tracing::info!(order_id = order.id(), form_id = form.id(), total = %order.breakdown().total, cs_agent_id = ?assigned, "order placed");
    publish(&s, order.take_events()).await;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Order>> {
    s.store.get::<Order>(ORDERS, &id).await.map_err(reject)?.map(Json).ok_or_else(|| reject(StorefrontError::OrderNotFound))
}

#[derive(Debug, Deserialize)] pub struct PixelQuery { #[serde(default)] pub page: TrackingPage }

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelPlan { pub page: TrackingPage, pub configs: Vec<PixelConfig>, pub platform_delay_ms: u64, pub event_delay_ms: u64 }

fn millis(d: std::time::Duration) -> u64 { u64::try_from(d.as_millis()).unwrap_or(u64::MAX) }

async fn pixel_configs(State(s): State<AppState>, Path(id): Path<String>, Query(q): Query<PixelQuery>) -> ApiResult<Json<PixelPlan>> {
    let form = load_form(&s, &id).await?;
    Ok(Json(PixelPlan {
        page: q.page,
        configs: form.tracking_settings().page_configs(q.page),
        platform_delay_ms: millis(s.pixel_timing.platform_delay),
        event_delay_ms: millis(s.pixel_timing.event_delay),
    }))
}
