//! The fixed, total mapping from invocation error codes to HTTP statuses.

use http::StatusCode;
use typed_actions_core::ErrorCode;

/// Map an [`ErrorCode`] to its HTTP status.
///
/// The table is total over the closed code set; codes without a more
/// specific status (including anything unrecognized at the serialization
/// boundary) fall to 500.
#[must_use]
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InputParseError => StatusCode::BAD_REQUEST,
        ErrorCode::UnprocessableContent => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::NotAuthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::PaymentRequired | ErrorCode::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::MethodNotSupported => StatusCode::METHOD_NOT_ALLOWED,
        ErrorCode::Timeout => StatusCode::REQUEST_TIMEOUT,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
        ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        // 499 Client Closed Request is nginx vocabulary; `http` has no
        // constant for it.
        ErrorCode::ClientClosedRequest => {
            StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        },
        ErrorCode::OutputParseError | ErrorCode::Error | ErrorCode::InternalServerError => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
    }
}
