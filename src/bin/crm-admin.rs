//! Operator utilities for the CRM backend

use std::fs;

use anyhow::{anyhow, bail, Context};
use clap::{Arg, ArgMatches, Command};
use log::info;

use crm_admin_client::claims::Identity;
use crm_admin_client::csv::{self, CsvRecord};
use crm_admin_client::models::{ApiResponse, ClientRecord, CustomerRecord, SpecialNumber};
use crm_admin_client::CrmAdmin;

fn dataset_arg() -> Arg<'static> {
    Arg::new("dataset")
        .help("Which list to use")
        .possible_values(["clients", "customers", "special"])
        .required(true)
}

fn file_arg() -> Arg<'static> {
    Arg::new("file").help("CSV file path").required(true)
}

fn cli() -> Command<'static> {
    Command::new("crm-admin")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Maintenance commands for the call-center CRM backend")
        .subcommand_required(true)
        .subcommand(Command::new("health").about("Check that the backend is reachable"))
        .subcommand(Command::new("init-db").about("Ask the backend to initialize its database"))
        .subcommand(Command::new("reset-counters").about("Zero every agent's daily call counter"))
        .subcommand(Command::new("claims").about("List numbers currently claimed"))
        .subcommand(
            Command::new("export")
                .about("Write a contact list to CSV")
                .arg(dataset_arg())
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("import")
                .about("Load a contact list from CSV")
                .arg(dataset_arg())
                .arg(file_arg()),
        )
}

fn unwrap_response<T>(response: ApiResponse<T>) -> anyhow::Result<T> {
    response.into_result().map_err(|e| anyhow!(e))
}

fn write_csv<T: CsvRecord>(path: &str, records: &[T]) -> anyhow::Result<()> {
    fs::write(path, csv::export(records)).with_context(|| format!("writing {path}"))?;
    println!("Exported {} records to {}", records.len(), path);
    Ok(())
}

fn read_csv<T: CsvRecord>(path: &str) -> anyhow::Result<Vec<T>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let records = csv::import(&text);
    if records.is_empty() {
        bail!("{path} contains no importable rows");
    }
    Ok(records)
}

async fn export(admin: &CrmAdmin, args: &ArgMatches) -> anyhow::Result<()> {
    let dataset = args.value_of("dataset").unwrap_or_default();
    let path = args.value_of("file").unwrap_or_default();
    let service = admin.service();
    match dataset {
        "clients" => write_csv(path, &unwrap_response(service.get_clients().await)?),
        "customers" => write_csv(path, &unwrap_response(service.get_customers().await)?),
        "special" => write_csv(path, &unwrap_response(service.get_special_database().await)?),
        other => bail!("unknown dataset {other}"),
    }
}

async fn import(admin: &CrmAdmin, args: &ArgMatches) -> anyhow::Result<()> {
    let dataset = args.value_of("dataset").unwrap_or_default();
    let path = args.value_of("file").unwrap_or_default();
    let service = admin.service();
    let imported = match dataset {
        "clients" => unwrap_response(service.import_clients(&read_csv::<ClientRecord>(path)?).await)?,
        "customers" => unwrap_response(service.import_customers(&read_csv::<CustomerRecord>(path)?).await)?,
        "special" => unwrap_response(service.import_special_numbers(&read_csv::<SpecialNumber>(path)?).await)?,
        other => bail!("unknown dataset {other}"),
    };
    println!("Imported {imported} records from {path}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let matches = cli().get_matches();
    let admin = CrmAdmin::from_env().context("loading configuration")?;
    info!("Using backend at {}", admin.options.api_url);

    match matches.subcommand() {
        Some(("health", _)) => {
            let health = unwrap_response(admin.service().health_check().await)?;
            println!("status: {}", health.status);
            if let Some(database) = health.database {
                println!("database: {database}");
            }
        }
        Some(("init-db", _)) => {
            unwrap_response(admin.service().initialize_database().await)?;
            println!("Database initialized");
        }
        Some(("reset-counters", _)) => {
            unwrap_response(admin.session().reset_all_counters().await)?;
            println!("All counters reset");
        }
        Some(("claims", _)) => {
            let claims = admin.claims_for(Identity::new("crm-admin-cli", Some("crm-admin")));
            if !claims.refresh().await {
                bail!("could not fetch number claims");
            }
            for claim in claims.active_claims() {
                println!(
                    "{}\t{}\texpires {}",
                    claim.phone_number,
                    claim.claimed_by_name.as_deref().unwrap_or(&claim.claimed_by),
                    claim.expires_at.to_rfc3339()
                );
            }
        }
        Some(("export", args)) => export(&admin, args).await?,
        Some(("import", args)) => import(&admin, args).await?,
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}
