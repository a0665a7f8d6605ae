//! Organization commands: creation and lookup by business identifier

use super::{connect_or_report, exit_code, load_or_report, print_json};
use crate::core::service::OrganizationService;
use crate::domain::{BridgeError, BusinessIdentifier};
use clap::{Args, Subcommand};

/// Organization subcommands
#[derive(Subcommand, Debug)]
pub enum OrganizationCommand {
    /// Create an organization
    Add(AddArgs),

    /// Show the organization carrying a business identifier
    Get(GetArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Business identifier, e.g. ORG0001
    #[arg(long)]
    pub identifier: String,

    #[arg(long)]
    pub name: String,

    /// Work phone number
    #[arg(long)]
    pub phone: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Business identifier, e.g. ORG0001
    #[arg(long)]
    pub identifier: String,
}

impl OrganizationCommand {
    /// Execute the organization command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let raw = match self {
            OrganizationCommand::Add(args) => &args.identifier,
            OrganizationCommand::Get(args) => &args.identifier,
        };
        let identifier = match BusinessIdentifier::new(raw.as_str()) {
            Ok(i) => i,
            Err(e) => {
                println!("❌ {e}");
                return Ok(exit_code::INVALID_INPUT);
            }
        };

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let store = match connect_or_report(&config).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let service =
            OrganizationService::new(store, config.fhir.organization_identifier_system.clone());

        match self {
            OrganizationCommand::Add(args) => {
                match service.add(&identifier, &args.name, &args.phone).await {
                    Ok(detail) => {
                        println!("✅ Organization created");
                        print_json(&detail)?;
                        Ok(exit_code::SUCCESS)
                    }
                    Err(BridgeError::Validation(violations)) => {
                        for violation in &violations {
                            println!("❌ {}: {}", violation.field, violation.message);
                        }
                        Ok(exit_code::INVALID_INPUT)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            OrganizationCommand::Get(_) => match service.get_by_identifier(&identifier).await? {
                Some(detail) => {
                    print_json(&detail)?;
                    Ok(exit_code::SUCCESS)
                }
                None => {
                    println!("⚠️  Organization not found");
                    Ok(exit_code::COMPLETED_WITH_ERRORS)
                }
            },
        }
    }
}
