use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::info;
use pedalcom_lib::{
    config::{read_study_config, EnergeticsInput},
    cycles::CycleField,
    detectors::crank::{detect_crank_peaks, DEFAULT_BUFFER_HEIGHT},
    io::{
        export::write_stacked_csv_file,
        kinematics::{read_kinematics_tsv, KinematicColumns},
        text::{parse_sensor_stream, read_sensor_stream, SensorStream},
    },
    plot::{figure_from_cycles, Figure, PlotBackend, Series},
    Report,
};
use plotters::prelude::*;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "pedalcom",
    version,
    about = "Per-revolution center-of-mass energetics for cycling motion capture"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect crank-cycle peaks in newline-delimited angle samples (stdin or --angle)
    Peaks {
        #[arg(long)]
        angle: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_BUFFER_HEIGHT)]
        buffer_height: f64,
    },
    /// Compute per-cycle COM energetics and print the report as JSON
    Energetics {
        #[command(flatten)]
        ride: RideArgs,
        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Write one per-cycle field as CSV (one row per cycle)
    Export {
        #[command(flatten)]
        ride: RideArgs,
        /// Field name, e.g. comTotalEnergy or power
        #[arg(long)]
        field: CycleField,
        #[arg(long)]
        out: PathBuf,
    },
    /// Render one per-cycle field to a PNG via plotters
    Plot {
        #[command(flatten)]
        ride: RideArgs,
        #[arg(long)]
        field: CycleField,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct RideArgs {
    /// Tab-delimited kinematics export with time and center_of_mass_X/Y/Z columns
    #[arg(long)]
    kinematics: PathBuf,
    /// Newline-delimited crank angle, one sample per kinematics row
    #[arg(long)]
    angle: Option<PathBuf>,
    /// Read the crank angle from this kinematics column instead
    #[arg(long, conflicts_with = "angle")]
    angle_column: Option<String>,
    /// Newline-delimited pedal force, one sample per kinematics row
    #[arg(long)]
    force: Option<PathBuf>,
    /// Read the pedal force from this kinematics column instead
    #[arg(long, conflicts_with = "force")]
    force_column: Option<String>,
    /// TOML study config; flags given here take precedence
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    subject_mass: Option<f64>,
    #[arg(long)]
    crank_length: Option<f64>,
    #[arg(long)]
    target_power: Option<f64>,
    #[arg(long)]
    target_cadence: Option<f64>,
    /// power_low,power_high,cadence_low,cadence_high
    #[arg(long, value_delimiter = ',')]
    buffers: Option<Vec<f64>>,
    #[arg(long)]
    condition: Option<String>,
    #[arg(long)]
    subject: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();
    match cli.command {
        Commands::Peaks {
            angle,
            buffer_height,
        } => cmd_peaks(angle.as_deref(), buffer_height)?,
        Commands::Energetics { ride, pretty } => cmd_energetics(&ride, pretty)?,
        Commands::Export { ride, field, out } => cmd_export(&ride, field, &out)?,
        Commands::Plot { ride, field, out } => cmd_plot(&ride, field, &out)?,
    }
    Ok(())
}

fn read_angle(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => read_sensor_stream(path, SensorStream::CrankAngle),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            parse_sensor_stream(&buf, SensorStream::CrankAngle)
        }
    }
}

fn cmd_peaks(angle: Option<&Path>, buffer_height: f64) -> Result<()> {
    let samples = read_angle(angle)?;
    let events = detect_crank_peaks(&samples, buffer_height)?;
    println!("{}", serde_json::to_string(&events)?);
    Ok(())
}

fn load_input(ride: &RideArgs) -> Result<EnergeticsInput> {
    let columns = KinematicColumns {
        angle: ride.angle_column.clone(),
        force: ride.force_column.clone(),
        ..Default::default()
    };
    let table = read_kinematics_tsv(&ride.kinematics, &columns)?;
    info!(
        "read {} kinematic rows from {}",
        table.time.len(),
        ride.kinematics.display()
    );
    let angle_data = match (&ride.angle, table.angle) {
        (Some(path), _) => Some(read_sensor_stream(path, SensorStream::CrankAngle)?),
        (None, column) => column,
    };
    let force_data = match (&ride.force, table.force) {
        (Some(path), _) => Some(read_sensor_stream(path, SensorStream::PedalForce)?),
        (None, column) => column,
    };
    let mut input = EnergeticsInput {
        subject_mass: ride.subject_mass,
        time: Some(table.time),
        com_pos_x: Some(table.com_pos_x),
        com_pos_y: Some(table.com_pos_y),
        com_pos_z: Some(table.com_pos_z),
        angle_data,
        force_data,
        target_power: ride.target_power,
        target_cadence: ride.target_cadence,
        buffers: ride.buffers.clone(),
        condition_name: ride.condition.clone(),
        subject_name: ride.subject.clone(),
        crank_length: ride.crank_length,
    };
    if let Some(path) = &ride.config {
        read_study_config(path)?.fill(&mut input);
    }
    Ok(input)
}

fn compute_report(ride: &RideArgs) -> Result<Report> {
    let input = load_input(ride)?;
    let report = pedalcom_lib::run(input).context("computing cycle energetics")?;
    Ok(report)
}

fn cmd_energetics(ride: &RideArgs, pretty: bool) -> Result<()> {
    let report = compute_report(ride)?;
    let js = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", js);
    Ok(())
}

fn cmd_export(ride: &RideArgs, field: CycleField, out: &Path) -> Result<()> {
    let report = compute_report(ride)?;
    write_stacked_csv_file(out, report.result(), field)
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}

fn cmd_plot(ride: &RideArgs, field: CycleField, out: &Path) -> Result<()> {
    let report = compute_report(ride)?;
    let fig = figure_from_cycles(report.result(), field)
        .ok_or_else(|| anyhow!("{} was not computed (no force data)", field))?;
    let mut backend = PngBackend {
        path: out.to_path_buf(),
        size: (800, 480),
    };
    backend.draw(&fig)
}

struct PngBackend {
    path: PathBuf,
    size: (u32, u32),
}

impl PlotBackend for PngBackend {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        let (x_min, x_max, y_min, y_max) = fig
            .bounds()
            .ok_or_else(|| anyhow!("no cycles to plot"))?;
        let (y_min, y_max) = if y_min == y_max {
            (y_min - 1.0, y_max + 1.0)
        } else {
            (y_min, y_max)
        };
        let root = BitMapBackend::new(&self.path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                fig.title.clone().unwrap_or_else(|| "Plot".into()),
                ("sans-serif", 24),
            )
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
        chart
            .configure_mesh()
            .x_desc(fig.x.label.clone().unwrap_or_default())
            .y_desc(fig.y.label.clone().unwrap_or_default())
            .draw()?;
        for series in &fig.series {
            match series {
                Series::Line(line) => {
                    chart.draw_series(LineSeries::new(
                        line.points.iter().map(|p| (p[0], p[1])),
                        &RGBColor(
                            ((line.style.color.0 >> 16) & 0xFF) as u8,
                            ((line.style.color.0 >> 8) & 0xFF) as u8,
                            (line.style.color.0 & 0xFF) as u8,
                        ),
                    ))?;
                }
            }
        }
        root.present()?;
        Ok(())
    }
}
