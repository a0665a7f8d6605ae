//! Observation commands for the blood count measurements

use super::{connect_or_report, exit_code, load_or_report, print_json};
use crate::core::service::ObservationService;
use crate::domain::{ObservationKind, ResourceId};
use clap::{Args, Subcommand};

/// Observation subcommands
#[derive(Subcommand, Debug)]
pub enum ObservationsCommand {
    /// List observations of a patient
    List(ListArgs),

    /// Record a new measurement for a patient
    Add(AddArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Id of the patient on the FHIR server
    #[arg(long)]
    pub patient_id: String,

    /// Only this kind (hemoglobin, rbc, wbc)
    #[arg(long)]
    pub kind: Option<ObservationKind>,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Id of the patient on the FHIR server
    #[arg(long)]
    pub patient_id: String,

    /// Measurement kind (hemoglobin, rbc, wbc)
    #[arg(long)]
    pub kind: ObservationKind,

    /// Measured value in the kind's unit
    #[arg(long, allow_negative_numbers = true)]
    pub value: f64,
}

impl ObservationsCommand {
    /// Execute the observations command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let patient_id = match self {
            ObservationsCommand::List(args) => &args.patient_id,
            ObservationsCommand::Add(args) => &args.patient_id,
        };
        let patient = match ResourceId::new(patient_id.as_str()) {
            Ok(id) => id,
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
        let service = ObservationService::new(store);

        match self {
            ObservationsCommand::List(args) => {
                let records = service.for_patient(&patient, args.kind).await?;
                println!("📋 {} observation(s)", records.len());
                print_json(&records)?;
                Ok(exit_code::SUCCESS)
            }
            ObservationsCommand::Add(args) => {
                match service.add(&patient, args.kind, args.value).await {
                    Ok(record) => {
                        println!("✅ Observation created");
                        print_json(&record)?;
                        Ok(exit_code::SUCCESS)
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
    }
}
