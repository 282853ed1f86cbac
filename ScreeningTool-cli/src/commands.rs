use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use screening_tool_data::repository::{read_rows, LoginStateFile};
use screening_tool_domain::auth::logging::log_data_export;
use screening_tool_domain::auth::AuthSession;
use screening_tool_domain::entities::{
    BloodPressure, BloodPressureEntry, FastingStatus, PatientRecord, RegisterPatientRequest, Sex,
    VisualAcuity, VisualAcuityEntry,
};
use screening_tool_domain::services::{departments, RecordListing, ScreeningServiceTrait};
use screening_tool_domain::ScreeningError;

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "screening_tool")]
#[command(about = "Clinic screening data entry")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register a new patient
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        middle_name: Option<String>,
        #[arg(long)]
        last_name: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: NaiveDate,
        /// Male, Female or Other
        #[arg(long)]
        sex: Sex,
        /// Department name as listed by `departments`
        #[arg(long)]
        department: String,
        #[arg(long)]
        job_title: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Record a blood pressure reading, e.g. `bp ASPH0001 120/80`
    Bp {
        code: String,
        /// Combined reading "systolic/diastolic"
        reading: Option<String>,
        #[arg(long, conflicts_with = "reading", requires = "diastolic")]
        systolic: Option<u16>,
        #[arg(long, conflicts_with = "reading", requires = "systolic")]
        diastolic: Option<u16>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record weight (kg) and height (m)
    Bmi {
        code: String,
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        height: f64,
    },
    /// Record blood glucose in mmol/L
    Glucose {
        code: String,
        #[arg(long)]
        value: f64,
        /// Fasting, Random or Non-fasting
        #[arg(long)]
        status: String,
    },
    /// Record visual acuity in Snellen notation (e.g. 6/6)
    Vision {
        code: String,
        #[arg(long)]
        right: Option<String>,
        #[arg(long)]
        left: Option<String>,
        #[arg(long)]
        right_corrected: Option<String>,
        #[arg(long)]
        left_corrected: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Save clinical notes
    Notes { code: String, text: String },
    /// Refer a patient onward
    Refer {
        code: String,
        #[arg(long)]
        details: Option<String>,
    },
    /// Search by name or unique code
    Search { term: String },
    /// Show one record
    Show { code: String },
    /// Flag risk factors for a record
    Assess { code: String },
    /// List all records
    List,
    /// Export all records as CSV (login required)
    Export {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long)]
        user: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// List department names
    Departments,
}

/// Run one command, printing results to `out`.
///
/// Input mistakes and unknown codes are printed as warnings and are not
/// errors. A failed save is retried once before being reported.
pub async fn run<S>(
    command: Commands,
    service: &S,
    config: &AppConfig,
    out: &mut dyn Write,
) -> anyhow::Result<()>
where
    S: ScreeningServiceTrait + Sync,
{
    let result = execute(command, service, config, out).await;

    let err = match result {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };

    match err.downcast_ref::<ScreeningError>() {
        Some(screening) if screening.is_recoverable() => {
            writeln!(out, "Warning: {}", screening)?;
            Ok(())
        }
        Some(ScreeningError::PersistenceFailure(reason)) => {
            error!("Change not written to {}: {}", config.data_path().display(), reason);
            match service.retry_save().await {
                Ok(()) => {
                    info!("Data file written on retry");
                    writeln!(out, "Saved after retrying the write to {}", config.data_path().display())?;
                    Ok(())
                }
                Err(retry_err) => Err(anyhow::Error::new(retry_err).context(format!(
                    "The change was not saved. Check that {} is writable and run the command again",
                    config.data_path().display()
                ))),
            }
        }
        _ => Err(err),
    }
}

async fn execute<S>(
    command: Commands,
    service: &S,
    config: &AppConfig,
    out: &mut dyn Write,
) -> anyhow::Result<()>
where
    S: ScreeningServiceTrait + Sync,
{
    match command {
        Commands::Register {
            first_name,
            middle_name,
            last_name,
            dob,
            sex,
            department,
            job_title,
            email,
            phone,
        } => {
            let request = RegisterPatientRequest {
                first_name,
                middle_name,
                last_name,
                date_of_birth: dob,
                sex,
                department,
                job_title,
                email,
                phone_number: phone,
            };
            let record = service.register_patient(request).await?;
            writeln!(
                out,
                "Registered {} with code {} (age {})",
                record.full_name(),
                record.unique_code,
                record.age
            )?;
        }
        Commands::Bp {
            code,
            reading,
            systolic,
            diastolic,
            notes,
        } => {
            let reading = match (reading, systolic, diastolic) {
                (Some(text), None, None) => text.parse::<BloodPressure>()?,
                (None, Some(systolic), Some(diastolic)) => BloodPressure::new(systolic, diastolic),
                _ => {
                    return Err(ScreeningError::InvalidInput(
                        "Give the reading as 120/80 or with --systolic and --diastolic".to_string(),
                    )
                    .into())
                }
            };
            let record = service
                .record_blood_pressure(&code, BloodPressureEntry { reading, notes })
                .await?;
            writeln!(out, "Blood pressure {} saved for {}", reading, record.unique_code)?;
        }
        Commands::Bmi {
            code,
            weight,
            height,
        } => {
            let record = service.record_bmi(&code, weight, height).await?;
            if let (Some(bmi), Some(class)) = (record.bmi, record.bmi_classification) {
                writeln!(out, "BMI {:.2} ({}) saved for {}", bmi, class, record.unique_code)?;
            }
        }
        Commands::Glucose {
            code,
            value,
            status,
        } => {
            let status: FastingStatus = status.parse()?;
            let record = service.record_glucose(&code, value, status).await?;
            writeln!(
                out,
                "Blood glucose {} mmol/L ({}) saved for {}",
                value, status, record.unique_code
            )?;
        }
        Commands::Vision {
            code,
            right,
            left,
            right_corrected,
            left_corrected,
            notes,
        } => {
            let entry = VisualAcuityEntry {
                acuity: VisualAcuity {
                    right,
                    left,
                    right_corrected,
                    left_corrected,
                },
                notes,
            };
            let record = service.record_visual_acuity(&code, entry).await?;
            writeln!(out, "Visual acuity saved for {}", record.unique_code)?;
        }
        Commands::Notes { code, text } => {
            let record = service.save_clinical_notes(&code, text).await?;
            writeln!(out, "Clinical notes saved for {}", record.unique_code)?;
        }
        Commands::Refer { code, details } => {
            let record = service.refer_patient(&code, details).await?;
            writeln!(out, "{} marked as referred", record.unique_code)?;
        }
        Commands::Search { term } => {
            let listing = service.search(&term).await?;
            writeln!(out, "Found {} record(s)", listing.records.len())?;
            for record in &listing.records {
                write_summary(out, record)?;
            }
            write_unreadable(out, &listing)?;
        }
        Commands::Show { code } => {
            let record = service.find(&code).await?;
            write_details(out, &record)?;
        }
        Commands::Assess { code } => {
            let assessment = service.assess(&code).await?;
            if assessment.has_risk() {
                writeln!(
                    out,
                    "{}: {}",
                    assessment.unique_code,
                    assessment.labels().join(", ")
                )?;
            } else {
                writeln!(out, "{}: no risk factors identified", assessment.unique_code)?;
            }
        }
        Commands::List => {
            let listing = service.list_records().await?;
            if listing.records.is_empty() && listing.unreadable.is_empty() {
                writeln!(out, "No patients registered.")?;
            }
            for record in &listing.records {
                write_summary(out, record)?;
            }
            write_unreadable(out, &listing)?;
        }
        Commands::Export {
            output,
            user,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };

            let mut session = AuthSession::new(
                config.credentials(),
                LoginStateFile::new(config.login_state_path()),
            );
            session.login(&user, &password)?;
            let username = session.require_authenticated("export")?.to_string();

            let bytes = service.export_csv().await?;
            let count = read_rows(bytes.as_slice())?.len();

            match &output {
                Some(path) => {
                    std::fs::write(path, &bytes)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    log_data_export(&username, &path.display().to_string(), count);
                    writeln!(out, "Exported {} record(s) to {}", count, path.display())?;
                }
                None => {
                    out.write_all(&bytes)?;
                    log_data_export(&username, "stdout", count);
                }
            }
            session.logout();
        }
        Commands::Departments => {
            for name in departments() {
                writeln!(out, "{}", name)?;
            }
        }
    }

    Ok(())
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn write_summary(out: &mut dyn Write, record: &PatientRecord) -> io::Result<()> {
    writeln!(
        out,
        "{:<10} {:<30} {:<28} {}",
        record.unique_code,
        record.full_name(),
        record.department,
        record.registration_date
    )
}

fn write_unreadable(out: &mut dyn Write, listing: &RecordListing) -> io::Result<()> {
    for message in &listing.unreadable {
        writeln!(out, "Warning: {}", message)?;
    }
    Ok(())
}

fn write_details(out: &mut dyn Write, record: &PatientRecord) -> io::Result<()> {
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    writeln!(out, "{} {}", record.unique_code, record.full_name())?;
    if let Some(middle) = &record.middle_name {
        writeln!(out, "  Middle name:     {}", middle)?;
    }
    writeln!(out, "  Date of birth:   {} (age {})", record.date_of_birth, record.age)?;
    writeln!(out, "  Sex:             {}", record.sex)?;
    writeln!(out, "  Department:      {}", record.department)?;
    writeln!(out, "  Job title:       {}", text(&record.job_title))?;
    writeln!(out, "  Email:           {}", text(&record.email))?;
    writeln!(out, "  Phone:           {}", text(&record.phone_number))?;
    writeln!(out, "  Registered:      {}", record.registration_date)?;

    if let Some(bp) = record.blood_pressure {
        writeln!(out, "  Blood pressure:  {} mmHg {}", bp, text(&record.bp_notes))?;
    }
    if let (Some(bmi), Some(class)) = (record.bmi, record.bmi_classification) {
        writeln!(out, "  BMI:             {:.2} ({})", bmi, class)?;
    }
    if let (Some(glucose), Some(status)) = (record.blood_glucose, record.fasting_status) {
        writeln!(out, "  Blood glucose:   {} mmol/L ({})", glucose, status)?;
    }
    if !record.visual_acuity.is_empty() {
        let va = &record.visual_acuity;
        writeln!(
            out,
            "  Visual acuity:   R {} L {} (corrected R {} L {})",
            text(&va.right),
            text(&va.left),
            text(&va.right_corrected),
            text(&va.left_corrected)
        )?;
    }
    if let Some(notes) = &record.clinical_notes {
        writeln!(out, "  Clinical notes:  {}", notes)?;
    }
    if record.referred {
        writeln!(out, "  Referred:        {}", text(&record.referral_details))?;
    }
    Ok(())
}
