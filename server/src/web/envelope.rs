// bazaar/server/src/web/envelope.rs

//! The `{ "error": ..., "data": ... }` wrapper every response body uses.

use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
  pub error: Option<String>,
  pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
  pub fn success(data: T) -> Self {
    Self {
      error: None,
      data: Some(data),
    }
  }
}

impl Envelope<()> {
  pub fn empty() -> Self {
    Self { error: None, data: None }
  }

  pub fn failure(message: impl Into<String>) -> Self {
    Self {
      error: Some(message.into()),
      data: None,
    }
  }
}

/// 200 with `data` set.
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
  HttpResponse::Ok().json(Envelope::success(data))
}

/// 200 with `data: null`.
pub fn ok_empty() -> HttpResponse {
  HttpResponse::Ok().json(Envelope::empty())
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
  HttpResponse::Created().json(Envelope::success(data))
}
