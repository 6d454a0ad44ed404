//! Status-code error taxonomy.

use std::fmt;

use crate::exchange::Exchange;
use crate::response::BodyObject;

/// Broad class of an error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 4xx
    Client,
    /// 5xx
    Server,
    /// Anything else that is not 2xx.
    Other,
}

macro_rules! http_error_kinds {
    ($($variant:ident = $status:literal,)*) => {
        /// One kind per well-known error status, plus generic fallbacks.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HttpErrorKind {
            $($variant,)*
            /// A 4xx status without a dedicated kind.
            ClientError(u16),
            /// A 5xx status without a dedicated kind.
            ServerError(u16),
            /// Any other status outside 2xx.
            Other(u16),
        }

        impl HttpErrorKind {
            /// The error kind for a status. 2xx statuses are not errors.
            pub fn from_status(status: u16) -> Option<Self> {
                match status {
                    200..=299 => None,
                    $($status => Some(HttpErrorKind::$variant),)*
                    400..=499 => Some(HttpErrorKind::ClientError(status)),
                    500..=599 => Some(HttpErrorKind::ServerError(status)),
                    _ => Some(HttpErrorKind::Other(status)),
                }
            }

            pub fn status(&self) -> u16 {
                match self {
                    $(HttpErrorKind::$variant => $status,)*
                    HttpErrorKind::ClientError(status)
                    | HttpErrorKind::ServerError(status)
                    | HttpErrorKind::Other(status) => *status,
                }
            }
        }
    };
}

http_error_kinds! {
    BadRequest400 = 400,
    Unauthorized401 = 401,
    PaymentRequired402 = 402,
    Forbidden403 = 403,
    NotFound404 = 404,
    MethodNotAllowed405 = 405,
    NotAcceptable406 = 406,
    ProxyAuthenticationRequired407 = 407,
    RequestTimeout408 = 408,
    Conflict409 = 409,
    Gone410 = 410,
    LengthRequired411 = 411,
    PreconditionFailed412 = 412,
    PayloadTooLarge413 = 413,
    UriTooLong414 = 414,
    UnsupportedMediaType415 = 415,
    RangeNotSatisfiable416 = 416,
    ExpectationFailed417 = 417,
    ImATeapot418 = 418,
    MisdirectedRequest421 = 421,
    UnprocessableEntity422 = 422,
    Locked423 = 423,
    FailedDependency424 = 424,
    UpgradeRequired426 = 426,
    PreconditionRequired428 = 428,
    TooManyRequests429 = 429,
    RequestHeaderFieldsTooLarge431 = 431,
    UnavailableForLegalReasons451 = 451,
    InternalServerError500 = 500,
    NotImplemented501 = 501,
    BadGateway502 = 502,
    ServiceUnavailable503 = 503,
    GatewayTimeout504 = 504,
    HttpVersionNotSupported505 = 505,
    VariantAlsoNegotiates506 = 506,
    InsufficientStorage507 = 507,
    LoopDetected508 = 508,
    NotExtended510 = 510,
    NetworkAuthenticationRequired511 = 511,
}

impl HttpErrorKind {
    pub fn class(&self) -> StatusClass {
        match self.status() {
            400..=499 => StatusClass::Client,
            500..=599 => StatusClass::Server,
            _ => StatusClass::Other,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.class() == StatusClass::Client
    }

    pub fn is_server_error(&self) -> bool {
        self.class() == StatusClass::Server
    }
}

/// A non-2xx response. Carries the exchange and whatever could be made of
/// the response body.
#[derive(Debug)]
pub struct HttpError {
    kind: HttpErrorKind,
    exchange: Exchange,
    response_object: BodyObject,
}

impl HttpError {
    pub fn new(kind: HttpErrorKind, exchange: Exchange) -> Self {
        // an unparseable error body is still worth reporting as text
        let response_object = exchange
            .body_object(false)
            .unwrap_or_else(|_| BodyObject::Text(exchange.response().body.clone()));
        Self {
            kind,
            exchange,
            response_object,
        }
    }

    pub fn kind(&self) -> HttpErrorKind {
        self.kind
    }

    pub fn status(&self) -> u16 {
        self.exchange.response().status
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    pub fn into_exchange(self) -> Exchange {
        self.exchange
    }

    pub fn response_object(&self) -> &BodyObject {
        &self.response_object
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error calling operation {}:\n{}",
            self.exchange.operation(),
            self.exchange.response().body
        )
    }
}

impl std::error::Error for HttpError {}
