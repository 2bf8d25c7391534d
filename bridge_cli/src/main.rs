//! # Bridgeform CLI
//!
//! Command-line front end for the bridge input engine. Every check the form
//! runs is available as a subcommand; `--json` switches the output to JSON
//! for scripting.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bridge_core::client::GeometryValidationResponse;
use bridge_core::config::FormConfig;
use bridge_core::custom_params::{validate_rows, CustomParamRow};
use bridge_core::form::{FormSession, FormSnapshot, GirderLayout};
use bridge_core::geometry::{check, solve, GeometryField, GeometryInputs, GeometrySolution};
use bridge_core::materials::{ConcreteGrade, SteelGrade};
use bridge_core::resolver::LocationResolver;
use bridge_core::sync::{self, GeometryAutoCheck};
use bridge_core::validation::{validate_carriageway_width, validate_skew_angle, validate_span, FieldCheck};
use bridge_core::{ApiResponse, BackendClient, BridgeConfig, BridgeError, BridgeResult, LocationTable};

#[derive(Parser)]
#[command(name = "bridge_cli", version, about = "Preliminary highway bridge design inputs")]
struct Cli {
    /// Configuration file (defaults to ./bridgeform.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Never contact the backend
    #[arg(long, global = true)]
    offline: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a span length (m).
    Span { value: String },
    /// Check a carriageway width (m).
    Width { value: String },
    /// Check a skew angle (degrees).
    Skew {
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Infer and check a girder layout.
    Geometry {
        /// Carriageway width (m)
        #[arg(long)]
        width: Option<f64>,
        /// Girder spacing (m)
        #[arg(long)]
        spacing: Option<f64>,
        /// Deck overhang width (m)
        #[arg(long, allow_hyphen_values = true)]
        overhang: Option<f64>,
        /// Number of girders
        #[arg(long)]
        girders: Option<u32>,
        /// Field just edited: spacing, overhang or girders
        #[arg(long)]
        changed: Option<String>,
        /// Also ask the backend to check the layout (after `form.debounce_ms`)
        #[arg(long)]
        remote: bool,
    },
    /// List the states and districts of the reference table.
    Locations {
        /// Only districts of this state id
        #[arg(long)]
        state: Option<String>,
    },
    /// Look up environmental data for a district.
    Location { state: String, district: String },
    /// Validate custom loading rows given as wind,zone,factor,min,max.
    Custom {
        #[arg(required = true, allow_hyphen_values = true)]
        rows: Vec<String>,
    },
    /// List steel and concrete grades.
    Materials,
    /// Check whether the backend is reachable.
    Probe,
    /// Validate a saved form (JSON) and submit it.
    Submit {
        file: PathBuf,
        /// Print the payload instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bridge_cli=info,bridge_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::from(2);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error [{}]: {}", e.error_code(), e);
            ExitCode::from(2)
        }
    }
}

/// Ok(false) means the input was checked and rejected
async fn run(cli: Cli) -> BridgeResult<bool> {
    let config = BridgeConfig::load(cli.config.as_deref())?;
    let out = Output { json: cli.json };

    let backend = if cli.offline {
        None
    } else {
        Some(BackendClient::new(&config.api)?)
    };

    match cli.command {
        Commands::Span { value } => Ok(out.field_check("Span", &value, validate_span(value.as_str()))),
        Commands::Width { value } => Ok(out.field_check(
            "Carriageway Width",
            &value,
            validate_carriageway_width(value.as_str()),
        )),
        Commands::Skew { value } => Ok(out.field_check("Skew Angle", &value, validate_skew_angle(value.as_str()))),
        Commands::Geometry {
            width,
            spacing,
            overhang,
            girders,
            changed,
            remote,
        } => {
            let inputs = GeometryInputs {
                carriageway_width_m: width,
                spacing_m: spacing,
                overhang_m: overhang,
                girder_count: girders,
            };
            geometry(&out, backend.as_ref().filter(|_| remote), &config.form, inputs, changed.as_deref()).await
        }
        Commands::Locations { state } => {
            let table = config.location_table()?;
            locations(&out, &table, state.as_deref())
        }
        Commands::Location { state, district } => {
            let table = config.location_table()?;
            let resolver = LocationResolver::new(&table, backend.as_ref());
            let resolved = resolver.resolve(&state, &district).await?;
            if out.json {
                out.print_json(&resolved)?;
            } else {
                let r = &resolved.record;
                header(&format!("{}, {}", r.district_name, r.state_name));
                println!("  Basic wind speed: {:.1} m/s", r.wind_speed_mps);
                println!("  Seismic zone:     {}", r.seismic_zone.display_name());
                println!("  Seismic factor:   {:.2}", r.seismic_factor);
                println!("  Temperature:      {:.1} to {:.1} °C", r.min_temp_c, r.max_temp_c);
                println!("  Source:           {}", resolved.source);
                if let Some(warning) = &resolved.warning {
                    println!();
                    println!("[WARN] Backend lookup failed: {}", warning);
                }
            }
            Ok(true)
        }
        Commands::Custom { rows } => custom(&out, backend.as_ref(), &rows).await,
        Commands::Materials => {
            let (options, source) = sync::load_material_options(backend.as_ref()).await;
            if out.json {
                out.print_json(&serde_json::json!({ "source": source, "options": options }))?;
            } else {
                header(&format!("MATERIALS ({})", source));
                println!("Steel:");
                for grade in options.steel_grades() {
                    println!("  {:<18} fy = {:.0} MPa", grade.display_name(), grade.yield_stress_mpa());
                }
                println!("Concrete:");
                for grade in options.concrete_grades() {
                    println!("  {:<18} fck = {:.0} MPa", grade.display_name(), grade.fck_mpa());
                }
                println!();
                println!(
                    "Defaults: girder {}, cross bracing {}, deck {}",
                    SteelGrade::default(),
                    SteelGrade::default(),
                    ConcreteGrade::default()
                );
            }
            Ok(true)
        }
        Commands::Probe => {
            let Some(backend) = backend else {
                println!("[SKIP] Offline mode, backend not contacted");
                return Ok(true);
            };
            let status = backend.check_connection().await;
            if out.json {
                out.print_json(&status)?;
            } else if status.connected {
                println!("[OK] {} ({})", status.message, backend.base_url());
            } else {
                println!(
                    "[FAIL] {}: {}",
                    status.message,
                    status.error.as_deref().unwrap_or("unknown error")
                );
            }
            Ok(status.connected)
        }
        Commands::Submit { file, dry_run } => submit(&out, backend.as_ref(), &file, dry_run).await,
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn print_json<T: Serialize>(&self, value: &T) -> BridgeResult<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn field_check(&self, label: &str, value: &str, check: FieldCheck) -> bool {
        if self.json {
            // FieldCheck always serializes
            if let Ok(text) = serde_json::to_string_pretty(&check) {
                println!("{}", text);
            }
        } else if check.is_valid {
            println!("[OK] {} = {}", label, value);
        } else {
            println!("[FAIL] {} = {}: {}", label, value, check.message);
        }
        check.is_valid
    }
}

fn header(title: &str) {
    println!("═══════════════════════════════════════");
    println!("  {}", title);
    println!("═══════════════════════════════════════");
}

fn format_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string())
}

async fn geometry(
    out: &Output,
    backend: Option<&BackendClient>,
    form: &FormConfig,
    inputs: GeometryInputs,
    changed: Option<&str>,
) -> BridgeResult<bool> {
    let changed = match changed {
        Some(name) => Some(
            GeometryField::from_str_flexible(name)
                .ok_or_else(|| BridgeError::unknown_option("geometry field", name))?,
        ),
        None => None,
    };

    let solution = match changed {
        Some(field) => solve(&inputs, field),
        None => GeometrySolution {
            inputs,
            inferred: None,
            report: check(&inputs),
        },
    };

    let remote = match backend {
        Some(backend) => remote_check(backend, form, &solution.inputs).await,
        None => None,
    };

    if out.json {
        out.print_json(&serde_json::json!({ "solution": solution, "remote": remote }))?;
        return Ok(solution.report.is_valid());
    }

    header("GIRDER LAYOUT");
    let i = &solution.inputs;
    println!("  Carriageway width: {}", format_opt(i.carriageway_width_m));
    println!("  Overall width:     {}", format_opt(solution.report.overall_width_m));
    println!("  Girder spacing:    {}", format_opt(i.spacing_m));
    println!("  Deck overhang:     {}", format_opt(i.overhang_m));
    println!(
        "  No. of girders:    {}",
        i.girder_count.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
    );
    if let Some(field) = solution.inferred {
        println!();
        println!("  Inferred: {}", field.display_name());
    }
    println!();

    if solution.report.is_valid() {
        println!("[OK] Geometry is consistent");
    } else {
        for error in &solution.report.errors {
            println!("[FAIL] {}", error);
        }
    }

    if let Some(response) = remote {
        match response.into_result() {
            Ok(verdict) if verdict.valid => println!("[OK] Backend: geometry valid"),
            Ok(verdict) => {
                for error in verdict.errors {
                    println!("[FAIL] Backend: {}", error);
                }
            }
            Err(e) => println!("[WARN] Backend check unavailable: {}", e),
        }
    }

    Ok(solution.report.is_valid())
}

/// Cross-check a complete layout with the backend, after the form's
/// configured quiet period
async fn remote_check(
    backend: &BackendClient,
    form: &FormConfig,
    inputs: &GeometryInputs,
) -> Option<ApiResponse<GeometryValidationResponse>> {
    let mut snapshot = FormSnapshot::default();
    snapshot.geometry.carriageway_width = inputs.carriageway_width_m.into();
    snapshot.geometry.layout = GirderLayout {
        spacing_m: inputs.spacing_m,
        overhang_m: inputs.overhang_m,
        girder_count: inputs.girder_count,
    };
    let mut session = FormSession::with_snapshot(snapshot);
    let pending = session.pending_geometry_check()?;

    sync::probe_backend(&mut session, backend).await;
    let Some(backend) = sync::usable_backend(&session, Some(backend)) else {
        return Some(ApiResponse::failed("Backend unavailable", "Geometry validation skipped"));
    };
    let (_, response) = GeometryAutoCheck::new(form).schedule_pending(pending).run(backend).await?;
    Some(response)
}

fn locations(out: &Output, table: &LocationTable, state: Option<&str>) -> BridgeResult<bool> {
    let states: Vec<_> = match state {
        Some(id) => vec![table
            .state(id)
            .ok_or_else(|| BridgeError::unknown_option("state", id))?],
        None => table.states.iter().collect(),
    };

    if out.json {
        out.print_json(&states)?;
        return Ok(true);
    }

    for state in states {
        println!("{} ({})", state.name, state.id);
        for d in &state.districts {
            println!(
                "  {:<22} {:<20} wind {:>4.0} m/s  zone {:<4} temp {:>5.1} to {:>4.1} °C",
                d.name, d.id, d.basic_wind_speed, d.seismic_zone.numeral(), d.min_temp, d.max_temp
            );
        }
    }
    Ok(true)
}

async fn custom(out: &Output, backend: Option<&BackendClient>, rows: &[String]) -> BridgeResult<bool> {
    let rows = rows
        .iter()
        .enumerate()
        .map(|(i, line)| CustomParamRow::parse_csv(i as u32 + 1, line))
        .collect::<BridgeResult<Vec<_>>>()?;

    let accepted = match validate_rows(&rows) {
        Ok(accepted) => accepted,
        Err(errors) => {
            if out.json {
                out.print_json(&errors)?;
            } else {
                for cell in &errors.cells {
                    println!("[FAIL] row {} {}: {}", cell.row_id, cell.field.display_name(), cell.message);
                }
                if let Some(aggregate) = &errors.aggregate {
                    println!("[FAIL] {}", aggregate);
                }
            }
            return Ok(false);
        }
    };

    let saved = match backend {
        Some(backend) => Some(sync::persist_custom_rows(backend, &accepted).await),
        None => None,
    };

    if out.json {
        out.print_json(&serde_json::json!({ "accepted": accepted, "saved": saved }))?;
        return Ok(true);
    }

    let r = &accepted.active;
    println!("[OK] {} row(s) accepted, row {} active", accepted.rows.len(), accepted.active_row_id);
    println!(
        "  wind {:.1} m/s, {}, factor {:.2}, {:.1} to {:.1} °C",
        r.wind_speed_mps,
        r.seismic_zone.display_name(),
        r.seismic_factor,
        r.min_temp_c,
        r.max_temp_c
    );
    match saved {
        Some(response) if response.success => println!("  {}", response.message),
        Some(response) => println!(
            "[WARN] {}: {}",
            response.message,
            response.error.as_deref().unwrap_or("unknown error")
        ),
        None => {}
    }
    Ok(true)
}

async fn submit(out: &Output, backend: Option<&BackendClient>, file: &Path, dry_run: bool) -> BridgeResult<bool> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| BridgeError::invalid_input("file", file.display().to_string(), e.to_string()))?;
    let session = FormSession::with_snapshot(FormSnapshot::from_json(&text)?);

    let submission = match session.prepare_submission() {
        Ok(submission) => submission,
        Err(errors) => {
            if out.json {
                out.print_json(&errors)?;
            } else {
                for message in errors.fields.values().chain(errors.geometry.iter()).chain(errors.location.iter()) {
                    println!("[FAIL] {}", message);
                }
            }
            return Ok(false);
        }
    };

    let backend = match backend {
        Some(backend) if !dry_run => backend,
        _ => {
            out.print_json(&submission)?;
            return Ok(true);
        }
    };

    // revalidated inside; the form already passed above
    let response = match sync::submit(&session, backend).await {
        Ok(response) => response,
        Err(errors) => return Err(BridgeError::invalid_input("form", file.display().to_string(), errors.to_string())),
    };
    if out.json {
        out.print_json(&response)?;
    } else if response.success {
        println!("[OK] {}", response.message);
    } else {
        println!(
            "[FAIL] {}: {}",
            response.message,
            response.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(response.success)
}
