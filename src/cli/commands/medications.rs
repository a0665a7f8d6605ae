//! Medication commands

use super::{connect_or_report, exit_code, load_or_report, print_json};
use crate::core::service::MedicationService;
use crate::domain::ResourceId;
use clap::{Args, Subcommand};

/// Medication subcommands
#[derive(Subcommand, Debug)]
pub enum MedicationsCommand {
    /// List the drugs prescribed to a patient
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Id of the patient on the FHIR server
    #[arg(long)]
    pub patient_id: String,
}

impl MedicationsCommand {
    /// Execute the medications command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let MedicationsCommand::List(args) = self;
        let patient = match ResourceId::new(args.patient_id.as_str()) {
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

        let records = MedicationService::new(store).for_patient(&patient).await?;
        println!("💊 {} medication(s)", records.len());
        print_json(&records)?;
        Ok(exit_code::SUCCESS)
    }
}
