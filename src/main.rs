// Copyright 2020 TwoCookingMice

use millefeuille::io::exr_utils;
use millefeuille::io::job_loader::load_job;
use millefeuille::io::png_utils;
use millefeuille::renderers::progressive::{ ProgressiveRenderer, Renderer };

use console::style;
use std::env;
use std::process;
use std::str::FromStr;
use std::sync::Arc;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <job.xml> <output.exr> [--spp N] [--threads N] [--seed N] [--png out.png]", program);
    process::exit(1);
}

fn fail(message: String) -> ! {
    eprintln!("{} {}", style("error:").red().bold(), message);
    process::exit(1);
}

fn flag_value<T: FromStr>(flag: &str, value: Option<&String>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("missing value for {}", flag))?;
    value.parse::<T>()
        .map_err(|_| format!("invalid value for {}: {:?}", flag, value))
}

fn main() {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage(&args[0]);
    }

    let input_path = &args[1];
    let output_path = &args[2];
    let mut spp_override: Option<u32> = None;
    let mut threads_override: Option<usize> = None;
    let mut seed_override: Option<u64> = None;
    let mut png_path: Option<String> = None;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--spp" => {
                i += 1;
                spp_override = Some(flag_value::<u32>("--spp", args.get(i)).unwrap_or_else(|e| fail(e)));
            }
            "--threads" => {
                i += 1;
                threads_override = Some(flag_value::<usize>("--threads", args.get(i)).unwrap_or_else(|e| fail(e)));
            }
            "--seed" => {
                i += 1;
                seed_override = Some(flag_value::<u64>("--seed", args.get(i)).unwrap_or_else(|e| fail(e)));
            }
            "--png" => {
                i += 1;
                png_path = Some(args.get(i).cloned()
                    .unwrap_or_else(|| fail(String::from("missing value for --png"))));
            }
            other => {
                log::warn!("Ignoring unknown argument: {}.", other);
            }
        }
        i += 1;
    }

    let loaded = load_job(input_path)
        .unwrap_or_else(|e| fail(format!("failed to load {}: {}", input_path, e)));

    let mut job = loaded.job;
    if let Some(spp) = spp_override {
        job.samples_per_pixel = spp;
    }
    if let Some(threads) = threads_override {
        job.thread_count = Some(threads);
    }
    if let Some(seed) = seed_override {
        job.seed = seed;
    }

    let mut renderer = ProgressiveRenderer::new();
    if let Err(e) = renderer.initialize(job, Arc::new(loaded.scene)) {
        fail(format!("{}", e));
    }
    let image = renderer.render().unwrap_or_else(|e| fail(format!("{}", e)));

    if let Err(e) = exr_utils::write_exr_to_file(&image, output_path) {
        fail(format!("failed to write {}: {}", output_path, e));
    }
    if let Some(png_path) = png_path {
        if let Err(e) = png_utils::write_png_to_file(&image, &png_path) {
            fail(format!("failed to write {}: {}", png_path, e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value_parses() {
        assert_eq!(flag_value::<u32>("--spp", Some(&String::from("16"))), Ok(16));
        assert_eq!(flag_value::<u64>("--seed", Some(&String::from("7"))), Ok(7));
    }

    #[test]
    fn test_flag_value_rejects_malformed_and_missing() {
        let err = flag_value::<u32>("--spp", Some(&String::from("abc"))).unwrap_err();
        assert!(err.contains("--spp") && err.contains("abc"));
        assert!(flag_value::<usize>("--threads", Some(&String::from("-2"))).is_err());
        let err = flag_value::<u64>("--seed", None).unwrap_err();
        assert!(err.contains("missing value for --seed"));
    }
}
