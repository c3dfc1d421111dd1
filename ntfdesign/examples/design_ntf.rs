use std::{
    f64::consts::PI,
    path::PathBuf,
};

use clap::{
    Parser,
    ValueEnum,
};
use color_eyre::eyre::Error;
use ntfdesign::{
    Normalization,
    WeightingOptions,
    Weighting,
    ZeroOptimizerOptions,
    ZeroPlacement,
    Zpk,
    config,
    ntf_fir_weighting,
    synthesize_ntf1,
};
use serde::Deserialize;

fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let options: Options = match &args.options {
        Some(path) => config::from_path(path)?,
        None => Options::default(),
    };
    tracing::debug!(?options, "options");

    let ntf = match args.method {
        Method::Classical => {
            let placement = ZeroPlacement::from(args.placement);
            let design = synthesize_ntf1(
                args.order,
                args.osr,
                &placement,
                args.h_inf,
                args.f0,
                &options.zero_optimizer,
            )?;
            for warning in &design.warnings {
                println!("warning: {warning}");
            }
            design.ntf
        }
        Method::Convex => {
            // noise is weighted by a butterworth lowpass of the signal band
            let cutoff = 0.5 / args.osr;
            let order = args.order as i32;
            let weighting = Weighting::function(move |f: f64| {
                1.0 / (1.0 + ((PI * f).tan() / (PI * cutoff).tan()).powi(2 * order))
            });
            ntf_fir_weighting(
                args.order,
                weighting,
                args.h_inf,
                Normalization::Auto,
                &options.weighting,
            )?
        }
    };

    print_ntf(&ntf, args.osr, args.f0);

    Ok(())
}

fn print_ntf(ntf: &Zpk, osr: f64, f0: f64) {
    println!("zeros:");
    for z in &ntf.zeros {
        println!("  {z:.6}  |z| = {:.6}", z.norm());
    }
    println!("poles:");
    for p in &ntf.poles {
        println!("  {p:.6}  |p| = {:.6}", p.norm());
    }
    println!("peak gain: {:.4}", ntf.peak_gain(4096));
    let (f1, f2) = if f0 == 0.0 {
        (0.0, 0.5 / osr)
    }
    else {
        (f0 - 0.25 / osr, f0 + 0.25 / osr)
    };
    let noise = ntfdesign::poly::rms_gain(ntf, f1, f2, 100);
    println!("in-band rms gain: {:.2} dB", ntfdesign::util::dbv(noise));
}

#[derive(Debug, Parser)]
struct Args {
    #[clap(long, default_value = "classical")]
    method: Method,

    #[clap(short, long, default_value = "5")]
    order: usize,

    #[clap(long, default_value = "64")]
    osr: f64,

    #[clap(long, default_value = "1.5")]
    h_inf: f64,

    #[clap(long, default_value = "0")]
    f0: f64,

    /// Zero placement code for the classical method (0 to 4).
    #[clap(long, default_value = "1")]
    placement: u8,

    /// TOML file with solver options.
    #[clap(long)]
    options: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Method {
    Classical,
    Convex,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Options {
    weighting: WeightingOptions,
    zero_optimizer: ZeroOptimizerOptions,
}
