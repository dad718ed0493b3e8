use axum::extract::FromRequest;

use crate::error::ApiError;

/// JSON request body whose rejections render through [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
