//! Result type alias for FhirBridge

use super::errors::BridgeError;

/// Result type alias for FhirBridge operations
///
/// # Examples
///
/// ```
/// use fhirbridge::domain::result::Result;
/// use fhirbridge::domain::errors::BridgeError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(BridgeError::NotFound("Patient PAT0001".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, BridgeError>;
