//! Contact and order form handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Form;
use serde::Deserialize;

use super::super::identity::ClientIdentity;
use super::super::template_structs::{ContactPage, OrderPage, PlatformOption, SubmittedPage};
use super::super::AppState;
use super::helpers::{render_page, with_retry_after};
use crate::faults::ErrorKind;
use crate::models::format_price;
use crate::services::{
    ContactInput, FieldErrors, OrderInput, PageOutcome, Rejection, SubmitOutcome,
};

fn contact_form(
    state: &AppState,
    status: StatusCode,
    input: &ContactInput,
    errors: &FieldErrors,
    banner: Option<&str>,
) -> Response {
    render_page(
        status,
        &ContactPage {
            site_name: &state.site.name,
            title: "Contact",
            input,
            errors,
            has_banner: banner.is_some(),
            banner: banner.unwrap_or(""),
        },
    )
}

fn order_form(
    state: &AppState,
    status: StatusCode,
    input: &OrderInput,
    errors: &FieldErrors,
    template_name: Option<&str>,
    banner: Option<&str>,
) -> Response {
    render_page(
        status,
        &OrderPage {
            site_name: &state.site.name,
            title: "Order",
            input,
            errors,
            platforms: PlatformOption::all(&input.payment_platform),
            has_template: template_name.is_some(),
            template_name: template_name.unwrap_or(""),
            has_banner: banner.is_some(),
            banner: banner.unwrap_or(""),
        },
    )
}

pub async fn contact_page(State(state): State<AppState>) -> Response {
    contact_form(
        &state,
        StatusCode::OK,
        &ContactInput::default(),
        &FieldErrors::new(),
        None,
    )
}

pub async fn contact_submit(
    State(state): State<AppState>,
    ClientIdentity(identity): ClientIdentity,
    Form(input): Form<ContactInput>,
) -> Response {
    let none = FieldErrors::new();

    match state.contact.submit(&input, &identity).await {
        SubmitOutcome::Success(()) => render_page(
            StatusCode::OK,
            &SubmittedPage {
                site_name: &state.site.name,
                title: "Message sent",
                message: "Thanks for reaching out. We will reply by email shortly.",
                has_receipt: false,
                reference: "",
                amount: "",
                platform: "",
            },
        ),
        SubmitOutcome::Rejected(Rejection::Invalid(errors)) => {
            contact_form(&state, StatusCode::BAD_REQUEST, &input, &errors, None)
        }
        SubmitOutcome::Rejected(Rejection::RateLimited { retry_after }) => with_retry_after(
            contact_form(
                &state,
                StatusCode::TOO_MANY_REQUESTS,
                &input,
                &none,
                Some(ErrorKind::RateLimited.user_message()),
            ),
            retry_after,
        ),
        SubmitOutcome::Failed(error) => contact_form(
            &state,
            error.status_code(),
            &input,
            &none,
            Some(&error.user_message),
        ),
    }
}

/// `/order?template=slug` prefills the form from the catalog.
#[derive(Debug, Default, Deserialize)]
pub struct OrderParams {
    pub template: Option<String>,
}

pub async fn order_page(
    State(state): State<AppState>,
    Query(params): Query<OrderParams>,
) -> Response {
    let mut input = OrderInput::default();
    let mut template_name = None;

    if let Some(slug) = params.template.as_deref() {
        if let PageOutcome::Content(detail) = state.catalog.template_detail(slug).await {
            input.template = detail.template.slug.clone();
            input.amount = detail.template.price_input();
            template_name = Some(detail.template.name);
        }
    }

    order_form(
        &state,
        StatusCode::OK,
        &input,
        &FieldErrors::new(),
        template_name.as_deref(),
        None,
    )
}

pub async fn order_submit(
    State(state): State<AppState>,
    ClientIdentity(identity): ClientIdentity,
    Form(input): Form<OrderInput>,
) -> Response {
    let none = FieldErrors::new();

    match state.orders.submit(&input, &identity).await {
        SubmitOutcome::Success(receipt) => {
            let amount = format_price(receipt.amount_cents, &receipt.currency);
            render_page(
                StatusCode::OK,
                &SubmittedPage {
                    site_name: &state.site.name,
                    title: "Order received",
                    message: "Thank you. We will confirm your payment and contact you to get started.",
                    has_receipt: true,
                    reference: &receipt.reference,
                    amount: &amount,
                    platform: receipt.payment_platform.label(),
                },
            )
        }
        SubmitOutcome::Rejected(Rejection::Invalid(errors)) => {
            order_form(&state, StatusCode::BAD_REQUEST, &input, &errors, None, None)
        }
        SubmitOutcome::Rejected(Rejection::RateLimited { retry_after }) => with_retry_after(
            order_form(
                &state,
                StatusCode::TOO_MANY_REQUESTS,
                &input,
                &none,
                None,
                Some(ErrorKind::RateLimited.user_message()),
            ),
            retry_after,
        ),
        SubmitOutcome::Failed(error) => order_form(
            &state,
            error.status_code(),
            &input,
            &none,
            None,
            Some(&error.user_message),
        ),
    }
}
