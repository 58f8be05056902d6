//! Extractors whose rejections use the API error envelope

use axum::extract::{FromRequest, FromRequestParts};
use hoard_common::AppError;

/// `axum::Json` rejecting with `AppError::InvalidFormat`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
