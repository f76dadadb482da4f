use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};

use levelgate_core::{
    ContextOverride, FilterRegistry, OverrideResolver, StrategyFilter, Verdict, context,
};

mod cli;
mod input;

use cli::Args;
use input::LogLine;

/// Filter names, in the order they are consulted
const CONTEXT_FILTER: &str = "context";
const OVERRIDE_FILTER: &str = "overrides";

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args);

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// Per-run verdict tallies
#[derive(Debug, Default)]
struct Tally {
    accepted: u64,
    denied: u64,
    neutral: u64,
    unparsed: u64,
}

fn run(args: Args) -> Result<()> {
    let resolver = Arc::new(OverrideResolver::new(args.root));
    for spec in &args.overrides {
        resolver.set_override(spec.prefix.clone(), spec.level);
    }
    if let Some(gate) = args.gate.build() {
        resolver.set_gate(gate);
    }

    let registry = FilterRegistry::new();
    let mut chain = Vec::new();
    if let Some(key) = &args.context_key {
        let strategy = Arc::new(ContextOverride::new(key.clone()));
        registry.register(Arc::new(
            StrategyFilter::new(CONTEXT_FILTER).with_strategy(strategy),
        ))?;
        chain.push(CONTEXT_FILTER);
    }
    registry.register(Arc::new(
        StrategyFilter::new(OVERRIDE_FILTER).with_strategy(resolver.clone()),
    ))?;
    chain.push(OVERRIDE_FILTER);

    if args.dump_overrides {
        let table = serde_json::to_string_pretty(&resolver.overrides())
            .context("Failed to serialize override table")?;
        eprintln!("{}", table);
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let tally = filter_lines(&mut stdin.lock(), &mut stdout.lock(), &registry, &chain, &args)?;

    debug!(?tally, cached = resolver.cache_len(), "Finished");
    Ok(())
}

/// Apply verdicts to every input line, writing the kept lines to `out`
fn filter_lines(
    input: &mut impl BufRead,
    out: &mut impl Write,
    registry: &FilterRegistry,
    chain: &[&str],
    args: &Args,
) -> Result<Tally> {
    let mut tally = Tally::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).context("Failed to read input")? == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }

        // Lines that are not UTF-8 are passed through byte for byte
        let Ok(line) = std::str::from_utf8(&buf) else {
            let lossy = String::from_utf8_lossy(&buf);
            warn!(line = %lossy, "Undecodable log line, passing through");
            tally.unparsed += 1;
            out.write_all(&buf)?;
            out.write_all(b"\n")?;
            continue;
        };

        let Some(parsed) = LogLine::parse(line) else {
            warn!(line = %line, "Unrecognized log line, passing through");
            tally.unparsed += 1;
            writeln!(out, "{}", line)?;
            continue;
        };

        let verdict = decide(registry, chain, args, &parsed)
            .with_context(|| format!("Override decision failed for '{}'", parsed.logger))?;

        let keep = match verdict {
            Verdict::Accept => {
                tally.accepted += 1;
                true
            }
            Verdict::Deny => {
                tally.denied += 1;
                false
            }
            Verdict::Neutral => {
                tally.neutral += 1;
                parsed.level.is_at_least(args.threshold)
            }
        };

        if args.verdicts {
            writeln!(out, "{}\t{}", verdict, line)?;
        } else if keep {
            writeln!(out, "{}", line)?;
        }
    }

    out.flush()?;
    Ok(tally)
}

/// Consult each filter in turn, the first non-neutral verdict wins
fn decide(
    registry: &FilterRegistry,
    chain: &[&str],
    args: &Args,
    line: &LogLine<'_>,
) -> Result<Verdict> {
    // Scope any per-line level override to this decision
    let _guard = args
        .context_key
        .as_deref()
        .and_then(|key| line.field(key).map(|value| context::insert(key, value)));

    for name in chain {
        let verdict = registry.get(name)?.decide(line.logger, line.level)?;
        if !verdict.is_neutral() {
            return Ok(verdict);
        }
    }
    Ok(Verdict::Neutral)
}
