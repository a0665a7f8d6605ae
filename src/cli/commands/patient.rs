//! Patient commands: single lookups, the first page of patients, marital
//! status changes and deletion.

use super::{citizenships_or_report, connect_or_report, exit_code, load_or_report, print_json};
use crate::core::service::PatientService;
use crate::domain::{BusinessIdentifier, ResourceId};
use clap::{Args, Subcommand};

/// Patient subcommands
#[derive(Subcommand, Debug)]
pub enum PatientCommand {
    /// Show one patient
    Get(GetArgs),

    /// List the first page of patients
    List(ListArgs),

    /// Replace the marital status of a patient
    SetMaritalStatus(SetMaritalStatusArgs),

    /// Delete the patient carrying a business identifier
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct GetArgs {
    /// Business identifier, e.g. PAT0001
    #[arg(long)]
    pub identifier: Option<String>,

    /// Id assigned by the FHIR server
    #[arg(long)]
    pub resource_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Number of patients to fetch
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=1000))]
    pub page_size: Option<u16>,
}

#[derive(Args, Debug)]
pub struct SetMaritalStatusArgs {
    /// Id assigned by the FHIR server
    #[arg(long)]
    pub resource_id: String,

    /// HL7 v3 marital status code, e.g. M
    #[arg(long)]
    pub code: String,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Business identifier, e.g. PAT0001
    #[arg(long)]
    pub identifier: String,
}

impl PatientCommand {
    /// Execute the patient command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let citizenships = match citizenships_or_report(&config) {
            Ok(t) => t,
            Err(code) => return Ok(code),
        };
        let store = match connect_or_report(&config).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let service = PatientService::new(store, citizenships, config.fhir.identifier_system.clone());

        match self {
            PatientCommand::Get(args) => args.run(&service).await,
            PatientCommand::List(args) => {
                let page_size = args.page_size.map(usize::from).or(Some(config.fhir.page_size));
                let patients = service.list(page_size).await?;
                println!("📋 {} patient(s)", patients.len());
                print_json(&patients)?;
                Ok(exit_code::SUCCESS)
            }
            PatientCommand::SetMaritalStatus(args) => args.run(&service).await,
            PatientCommand::Delete(args) => args.run(&service).await,
        }
    }
}

impl GetArgs {
    async fn run(&self, service: &PatientService) -> anyhow::Result<i32> {
        let found = match (&self.identifier, &self.resource_id) {
            (Some(identifier), _) => {
                let identifier = match BusinessIdentifier::new(identifier.as_str()) {
                    Ok(i) => i,
                    Err(e) => {
                        println!("❌ {e}");
                        return Ok(exit_code::INVALID_INPUT);
                    }
                };
                service.get_by_identifier(&identifier).await?
            }
            (None, Some(resource_id)) => {
                let id = match ResourceId::new(resource_id.as_str()) {
                    Ok(i) => i,
                    Err(e) => {
                        println!("❌ {e}");
                        return Ok(exit_code::INVALID_INPUT);
                    }
                };
                service.get_by_resource_id(&id).await?
            }
            (None, None) => return Ok(exit_code::INVALID_INPUT),
        };

        match found {
            Some(detail) => {
                print_json(&detail)?;
                Ok(exit_code::SUCCESS)
            }
            None => {
                println!("⚠️  Patient not found");
                Ok(exit_code::COMPLETED_WITH_ERRORS)
            }
        }
    }
}

impl SetMaritalStatusArgs {
    async fn run(&self, service: &PatientService) -> anyhow::Result<i32> {
        let id = match ResourceId::new(self.resource_id.as_str()) {
            Ok(i) => i,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code::INVALID_INPUT);
            }
        };

        match service.update_marital_status(&id, &self.code).await {
            Ok(detail) => {
                println!("✅ Marital status updated");
                print_json(&detail)?;
                Ok(exit_code::SUCCESS)
            }
            Err(crate::domain::BridgeError::NotFound(what)) => {
                println!("⚠️  Not found: {what}");
                Ok(exit_code::COMPLETED_WITH_ERRORS)
            }
            Err(crate::domain::BridgeError::Validation(violations)) => {
                for violation in &violations {
                    println!("❌ {}: {}", violation.field, violation.message);
                }
                Ok(exit_code::INVALID_INPUT)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl DeleteArgs {
    async fn run(&self, service: &PatientService) -> anyhow::Result<i32> {
        let identifier = match BusinessIdentifier::new(self.identifier.as_str()) {
            Ok(i) => i,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code::INVALID_INPUT);
            }
        };

        match service.delete_by_identifier(&identifier).await {
            Ok(id) => {
                println!("✅ Patient {identifier} deleted (resource id {id})");
                Ok(exit_code::SUCCESS)
            }
            Err(crate::domain::BridgeError::NotFound(what)) => {
                println!("⚠️  Not found: {what}");
                Ok(exit_code::COMPLETED_WITH_ERRORS)
            }
            Err(e) => Err(e.into()),
        }
    }
}
