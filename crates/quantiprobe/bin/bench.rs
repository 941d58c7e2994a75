//! quantiprobe-bench: drive a producer/consumer probe and print the results.
//!
//! usage: quantiprobe-bench [capacity] [events] [spin|yield|backoff]
//!
//! Built with the `cli` feature, which pulls in the `env_logger` backend.

use quantiprobe::{probe, CycleClock, IdleStrategy, ProbeConfig};
use std::env;
use std::process;

fn parse_config() -> Result<ProbeConfig, String> {
    let mut config = ProbeConfig::default();
    let mut args = env::args().skip(1);

    if let Some(arg) = args.next() {
        let capacity = arg
            .parse()
            .map_err(|e| format!("invalid capacity {arg:?}: {e}"))?;
        config = config.with_capacity(capacity);
    }
    if let Some(arg) = args.next() {
        let events = arg
            .parse()
            .map_err(|e| format!("invalid event count {arg:?}: {e}"))?;
        config = config.with_events(events);
    }
    if let Some(arg) = args.next() {
        let idle: IdleStrategy = arg.parse().map_err(|e| format!("{e}"))?;
        config = config.with_idle(idle);
    }
    if args.next().is_some() {
        return Err("too many arguments".to_owned());
    }

    Ok(config)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match parse_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("usage: quantiprobe-bench [capacity] [events] [spin|yield|backoff]");
            process::exit(2);
        }
    };

    println!("\nquantiprobe benchmark");
    println!("=====================");
    println!("Capacity     : {}", config.capacity);
    println!("Idle         : {}", config.idle);
    println!("Counter      : {:.3} MHz\n", CycleClock::frequency() as f64 / 1e6);

    match probe::run(&config) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(if e.is_config_error() { 2 } else { 1 });
        }
    }
}
