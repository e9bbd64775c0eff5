use rocket::{http::Status, serde::json::Json};
use serde::Serialize;

/// Outcome marker carried by every JSON response.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The request was carried out.
    Success,
    /// The request was refused because of something the client did.
    Fail,
    /// The server failed unexpectedly.
    Error,
}

/// The common response body: `{status, message?, ...payload}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

/// A response with its status code.
pub type Reply<T> = (Status, Json<Envelope<T>>);

/// Payload wrapper placing the body under `data`.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

/// Payload wrapper placing a number under `count`.
#[derive(Debug, Serialize)]
pub struct Count {
    pub count: u64,
}

/// No payload.
#[derive(Debug, Serialize)]
pub struct Empty {}

impl<T> Envelope<T> {
    pub fn success(payload: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: None,
            payload,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Respond with `200 OK`.
    pub fn ok(self) -> Reply<T> {
        (Status::Ok, Json(self))
    }

    /// Respond with `201 Created`.
    pub fn created(self) -> Reply<T> {
        (Status::Created, Json(self))
    }
}

impl<T> Envelope<Data<T>> {
    /// A successful response with the given body under `data`.
    pub fn data(data: T) -> Self {
        Self::success(Data { data })
    }
}

impl Envelope<Empty> {
    /// A successful response carrying only a message.
    pub fn done(message: impl Into<String>) -> Self {
        Self::success(Empty {}).message(message)
    }

    /// A client-caused failure.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Fail,
            message: Some(message.into()),
            payload: Empty {},
        }
    }

    /// An unexpected server-side failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(message.into()),
            payload: Empty {},
        }
    }
}
