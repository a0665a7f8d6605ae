//! FHIR R4 REST client
//!
//! Implements [`FhirStore`] over the FHIR RESTful API: searches return
//! `searchset` Bundles, reads return the bare resource, creates and updates
//! send `application/fhir+json` and ask for the stored representation back.
//!
//! Reads, updates and deletes are idempotent and are retried on any transient
//! failure. A create (POST) that may have reached the server is never resent,
//! since a second POST would store a duplicate resource.

use super::models::{Bundle, FHIR_JSON};
use super::store::{FhirStore, StoreResult};
use crate::config::{AuthType, FhirConfig};
use crate::core::transform::request_medications;
use crate::domain::resource::OperationOutcome;
use crate::domain::{
    BridgeError, BusinessIdentifier, Coding, Medication, MedicationRequest, Observation,
    Organization, Patient, ResourceId, Result, StoreError, StoreErrorKind,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Upper bound on pages fetched for one paginated search
const MAX_SEARCH_PAGES: usize = 50;

/// FHIR server client
///
/// Construct once at startup and share behind an `Arc`. Construction fails
/// on an unusable configuration; [`FhirClient::check_connection`] verifies
/// the server answers before a run starts.
///
/// # Example
///
/// ```no_run
/// use fhirbridge::adapters::fhir::FhirClient;
/// use fhirbridge::config::FhirConfig;
///
/// # async fn example() -> fhirbridge::domain::Result<()> {
/// let client = FhirClient::new(FhirConfig::default())?;
/// client.check_connection().await?;
/// # Ok(())
/// # }
/// ```
pub struct FhirClient {
    /// Base URL without trailing slash
    base_url: String,

    /// HTTP client for making requests
    client: Client,

    config: FhirConfig,
}

/// One logical store call, replayable across retries
struct Call<'a> {
    operation: &'static str,
    identifier: &'a str,
    method: Method,
    url: String,
    query: Vec<(&'static str, String)>,
    body: Option<Vec<u8>>,
    /// Map 404 to `Ok(None)` instead of an error
    missing_is_none: bool,
}

impl Call<'_> {
    fn error(&self, kind: StoreErrorKind, message: impl Into<String>) -> StoreError {
        StoreError::new(self.operation, self.identifier, kind, message)
    }

    /// POST is the only method whose repetition changes the outcome
    fn idempotent(&self) -> bool {
        self.method != Method::POST
    }
}

impl FhirClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: FhirConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(30)));

        if !config.tls_verify {
            tracing::warn!(base_url = %base_url, "TLS certificate verification is disabled");
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            BridgeError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            base_url,
            client,
            config,
        })
    }

    /// Base URL of the FHIR server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// System URI used for business identifiers
    pub fn identifier_system(&self) -> &str {
        &self.config.identifier_system
    }

    /// Reads the server's CapabilityStatement
    ///
    /// # Errors
    ///
    /// Returns the store error if the server is unreachable, rejects the
    /// credentials, or answers with something other than a CapabilityStatement.
    pub async fn check_connection(&self) -> StoreResult<()> {
        let call = Call {
            operation: "check_connection",
            identifier: &self.base_url,
            method: Method::GET,
            url: self.url("metadata"),
            query: Vec::new(),
            body: None,
            missing_is_none: false,
        };

        let statement: serde_json::Value = self.send(&call).await.and_then(|v| required(&call, v))?;
        match statement.get("resourceType").and_then(|t| t.as_str()) {
            Some("CapabilityStatement") => {
                tracing::info!(
                    base_url = %self.base_url,
                    fhir_version = statement.get("fhirVersion").and_then(|v| v.as_str()).unwrap_or("unknown"),
                    "Connected to FHIR server"
                );
                Ok(())
            }
            other => Err(call.error(
                StoreErrorKind::InvalidResponse,
                format!("expected CapabilityStatement, got {}", other.unwrap_or("no resourceType")),
            )),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Build authorization header value
    fn auth_header_value(&self) -> Option<String> {
        match self.config.auth_type {
            AuthType::None => None,
            AuthType::Basic => {
                let username = self.config.username.as_deref()?;
                let password = self.config.password.as_ref()?;
                let credentials = format!("{}:{}", username, password.expose_secret().as_str());
                let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                Some(format!("Basic {encoded}"))
            }
            AuthType::Bearer => self
                .config
                .token
                .as_ref()
                .map(|token| format!("Bearer {}", token.expose_secret().as_str())),
        }
    }

    /// Retry a request with exponential backoff
    ///
    /// Only transient failures are retried; a 4xx or an undecodable body is
    /// returned on first sight. A non-idempotent request is resent only when
    /// the server certainly did not process it.
    async fn retry_request<F, T, Fut>(&self, idempotent: bool, operation: F) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = StoreResult<T>>,
    {
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if !e.is_transient() || attempt > retry.max_retries {
                        return Err(e);
                    }
                    if !idempotent && !e.is_safe_to_resend() {
                        tracing::warn!(
                            operation = e.operation,
                            identifier = %e.identifier,
                            kind = %e.kind,
                            "Outcome of non-idempotent request unknown, not resending"
                        );
                        return Err(e);
                    }

                    let factor = retry.backoff_multiplier.powi((attempt - 1) as i32);
                    let delay_ms = ((retry.initial_delay_ms as f64) * factor)
                        .min(retry.max_delay_ms as f64) as u64;

                    tracing::debug!(delay_ms = delay_ms, "Backing off before retry");
                    crate::log_retry_attempt!(attempt, retry.max_retries, e);

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    async fn send<T: DeserializeOwned>(&self, call: &Call<'_>) -> StoreResult<Option<T>> {
        self.retry_request(call.idempotent(), || self.send_once(call))
            .await
    }

    async fn send_once<T: DeserializeOwned>(&self, call: &Call<'_>) -> StoreResult<Option<T>> {
        let mut request = self
            .client
            .request(call.method.clone(), &call.url)
            .header(ACCEPT, FHIR_JSON);

        if !call.query.is_empty() {
            request = request.query(&call.query);
        }

        if let Some(body) = &call.body {
            request = request
                .header(CONTENT_TYPE, FHIR_JSON)
                .header("Prefer", "return=representation")
                .body(body.clone());
        }

        if let Some(auth) = self.auth_header_value() {
            request = request.header(AUTHORIZATION, auth);
        }

        tracing::debug!(
            operation = call.operation,
            method = %call.method,
            url = %call.url,
            "Sending FHIR request"
        );

        let resp = request
            .send()
            .await
            .map_err(|e| call.error(transport_kind(&e), e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND && call.missing_is_none {
            return Ok(None);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(call.error(
                StoreErrorKind::Status(status.as_u16()),
                outcome_message(status, &body),
            ));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| call.error(transport_kind(&e), e.to_string()))?;

        if bytes.is_empty() {
            if call.method == Method::DELETE {
                return Ok(None);
            }
            return Err(call.error(StoreErrorKind::InvalidResponse, "empty response body"));
        }

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            call.error(
                StoreErrorKind::InvalidResponse,
                format!("undecodable response body: {e}"),
            )
        })
    }

    /// Fetches every page of a search, following `next` links
    ///
    /// Stops with a warning after [`MAX_SEARCH_PAGES`] pages.
    async fn for_each_page<F>(&self, mut call: Call<'_>, mut on_page: F) -> StoreResult<()>
    where
        F: FnMut(&Bundle) -> std::result::Result<(), serde_json::Error>,
    {
        for _ in 0..MAX_SEARCH_PAGES {
            let bundle: Bundle = self.send(&call).await.and_then(|b| required(&call, b))?;
            on_page(&bundle)
                .map_err(|e| call.error(StoreErrorKind::InvalidResponse, e.to_string()))?;

            match bundle.next_link() {
                Some(next) => {
                    // the next link already carries the search parameters
                    call.url = next.to_string();
                    call.query.clear();
                }
                None => return Ok(()),
            }
        }

        tracing::warn!(
            operation = call.operation,
            identifier = call.identifier,
            pages = MAX_SEARCH_PAGES,
            "Search truncated at page limit"
        );
        Ok(())
    }

    fn write_call<'a, R: Serialize>(
        &self,
        operation: &'static str,
        identifier: &'a str,
        method: Method,
        url: String,
        resource: &R,
    ) -> StoreResult<Call<'a>> {
        let body = serde_json::to_vec(resource).map_err(|e| {
            StoreError::new(
                operation,
                identifier,
                StoreErrorKind::InvalidResponse,
                format!("cannot encode resource: {e}"),
            )
        })?;

        Ok(Call {
            operation,
            identifier,
            method,
            url,
            query: Vec::new(),
            body: Some(body),
            missing_is_none: false,
        })
    }
}

fn required<T>(call: &Call<'_>, value: Option<T>) -> StoreResult<T> {
    value.ok_or_else(|| call.error(StoreErrorKind::InvalidResponse, "resource not returned"))
}

fn transport_kind(e: &reqwest::Error) -> StoreErrorKind {
    if e.is_timeout() {
        StoreErrorKind::Timeout
    } else if e.is_connect() {
        StoreErrorKind::Connection
    } else if e.is_decode() {
        StoreErrorKind::InvalidResponse
    } else {
        StoreErrorKind::Interrupted
    }
}

/// Error text for a non-2xx response, preferring OperationOutcome diagnostics
fn outcome_message(status: StatusCode, body: &str) -> String {
    if let Some(diagnostics) = serde_json::from_str::<OperationOutcome>(body)
        .ok()
        .and_then(|o| o.primary_diagnostics().map(str::to_string))
    {
        return diagnostics;
    }

    let body = body.trim();
    if body.is_empty() {
        status.to_string()
    } else {
        body.chars().take(200).collect()
    }
}

/// Identifier label for a resource in error reports
fn label(resource_id: Option<&str>, fallback: &'static str) -> String {
    resource_id.unwrap_or(fallback).to_string()
}

#[async_trait]
impl FhirStore for FhirClient {
    async fn find_patient_by_identifier(
        &self,
        identifier: &BusinessIdentifier,
    ) -> StoreResult<Option<Patient>> {
        let call = Call {
            operation: "find_patient_by_identifier",
            identifier: identifier.as_str(),
            method: Method::GET,
            url: self.url("Patient"),
            query: vec![(
                "identifier",
                format!("{}|{}", self.config.identifier_system, identifier),
            )],
            body: None,
            missing_is_none: false,
        };

        let bundle: Bundle = self.send(&call).await.and_then(|b| required(&call, b))?;
        let mut patients: Vec<Patient> = bundle
            .matches("Patient")
            .map_err(|e| call.error(StoreErrorKind::InvalidResponse, e.to_string()))?;

        if patients.len() > 1 {
            tracing::warn!(
                identifier = %identifier,
                matches = patients.len(),
                "Identifier matches several patients, using the first"
            );
        }

        Ok(if patients.is_empty() {
            None
        } else {
            Some(patients.swap_remove(0))
        })
    }

    async fn get_patient(&self, id: &ResourceId) -> StoreResult<Option<Patient>> {
        let call = Call {
            operation: "get_patient",
            identifier: id.as_str(),
            method: Method::GET,
            url: self.url(&format!("Patient/{id}")),
            query: Vec::new(),
            body: None,
            missing_is_none: true,
        };

        self.send(&call).await
    }

    async fn create_patient(&self, patient: &Patient) -> StoreResult<Patient> {
        let identifier = patient
            .identifier_value(Some(self.config.identifier_system.as_str()))
            .unwrap_or("new patient");
        let call = self.write_call(
            "create_patient",
            identifier,
            Method::POST,
            self.url("Patient"),
            patient,
        )?;

        let created = self.send(&call).await.and_then(|p| required(&call, p))?;
        tracing::debug!(identifier = %identifier, "Patient created");
        Ok(created)
    }

    async fn update_patient(&self, id: &ResourceId, patient: &Patient) -> StoreResult<Patient> {
        let mut body = patient.clone();
        body.id = Some(id.to_string());

        let call = self.write_call(
            "update_patient",
            id.as_str(),
            Method::PUT,
            self.url(&format!("Patient/{id}")),
            &body,
        )?;

        self.send(&call).await.and_then(|p| required(&call, p))
    }

    async fn delete_patient(&self, id: &ResourceId) -> StoreResult<()> {
        let call = Call {
            operation: "delete_patient",
            identifier: id.as_str(),
            method: Method::DELETE,
            url: self.url(&format!("Patient/{id}")),
            query: Vec::new(),
            body: None,
            missing_is_none: true,
        };

        // some servers answer a delete with an OperationOutcome, others with nothing
        self.send::<serde_json::Value>(&call).await?;
        tracing::debug!(resource_id = %id, "Patient deleted");
        Ok(())
    }

    async fn list_patients(&self, page_size: usize) -> StoreResult<Vec<Patient>> {
        let call = Call {
            operation: "list_patients",
            identifier: "*",
            method: Method::GET,
            url: self.url("Patient"),
            query: vec![("_count", page_size.to_string())],
            body: None,
            missing_is_none: false,
        };

        let bundle: Bundle = self.send(&call).await.and_then(|b| required(&call, b))?;
        bundle
            .matches("Patient")
            .map_err(|e| call.error(StoreErrorKind::InvalidResponse, e.to_string()))
    }

    async fn search_observations(
        &self,
        patient: &ResourceId,
        code: Option<&Coding>,
    ) -> StoreResult<Vec<Observation>> {
        let mut query = vec![("subject", format!("Patient/{patient}"))];
        if let Some(coding) = code {
            query.push(("code", coding.search_token()));
        }

        let call = Call {
            operation: "search_observations",
            identifier: patient.as_str(),
            method: Method::GET,
            url: self.url("Observation"),
            query,
            body: None,
            missing_is_none: false,
        };

        let mut observations = Vec::new();
        self.for_each_page(call, |bundle| {
            observations.extend(bundle.matches::<Observation>("Observation")?);
            Ok(())
        })
        .await?;
        Ok(observations)
    }

    async fn create_observation(&self, observation: &Observation) -> StoreResult<Observation> {
        let subject = observation
            .subject
            .as_ref()
            .and_then(|s| s.reference.clone());
        let identifier = label(subject.as_deref(), "new observation");

        let call = self.write_call(
            "create_observation",
            &identifier,
            Method::POST,
            self.url("Observation"),
            observation,
        )?;

        self.send(&call).await.and_then(|o| required(&call, o))
    }

    async fn search_medications(&self, patient: &ResourceId) -> StoreResult<Vec<Medication>> {
        let call = Call {
            operation: "search_medications",
            identifier: patient.as_str(),
            method: Method::GET,
            url: self.url("MedicationRequest"),
            query: vec![
                ("subject", format!("Patient/{patient}")),
                ("_include", "MedicationRequest:medication".to_string()),
            ],
            body: None,
            missing_is_none: false,
        };

        let mut requests = Vec::new();
        let mut included = Vec::new();
        self.for_each_page(call, |bundle| {
            requests.extend(bundle.matches::<MedicationRequest>("MedicationRequest")?);
            included.extend(bundle.included::<Medication>("Medication")?);
            Ok(())
        })
        .await?;

        Ok(request_medications(&requests, &included))
    }

    async fn find_organization_by_identifier(
        &self,
        identifier: &BusinessIdentifier,
    ) -> StoreResult<Option<Organization>> {
        let call = Call {
            operation: "find_organization_by_identifier",
            identifier: identifier.as_str(),
            method: Method::GET,
            url: self.url("Organization"),
            query: vec![(
                "identifier",
                format!("{}|{}", self.config.organization_identifier_system, identifier),
            )],
            body: None,
            missing_is_none: false,
        };

        let bundle: Bundle = self.send(&call).await.and_then(|b| required(&call, b))?;
        let organizations: Vec<Organization> = bundle
            .matches("Organization")
            .map_err(|e| call.error(StoreErrorKind::InvalidResponse, e.to_string()))?;

        Ok(organizations.into_iter().next())
    }

    async fn create_organization(&self, organization: &Organization) -> StoreResult<Organization> {
        let identifier = organization
            .identifier_value(Some(self.config.organization_identifier_system.as_str()))
            .unwrap_or("new organization");
        let call = self.write_call(
            "create_organization",
            identifier,
            Method::POST,
            self.url("Organization"),
            organization,
        )?;

        self.send(&call).await.and_then(|o| required(&call, o))
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
