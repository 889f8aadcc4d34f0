use std::fs::File;
use std::io::{BufReader, BufWriter};

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use log::info;
use mazeroute::autoroute::observer::EmptyAutorouterObserver;
use mazeroute::autoroute::{BatchAutorouter, RouteOptimizer};
use mazeroute::board::statistics::BoardStatistics;
use mazeroute::board::{BoardDescription, RoutingBoard};
use mazeroute::settings::RouterSettings;

pub mod cli;

fn main() -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();

    let board_file = File::open(&args.board)
        .with_context(|| format!("could not open board file {}", args.board.display()))?;
    let description: BoardDescription = serde_json::from_reader(BufReader::new(board_file))
        .context("could not parse board description")?;
    let board = RoutingBoard::from_description(description).context("invalid board")?;

    let mut settings = match &args.settings {
        Some(path) => RouterSettings::from_json_file(path)
            .with_context(|| format!("could not load settings from {}", path.display()))?,
        None => RouterSettings::for_board(&board),
    };

    if let Some(max_passes) = args.max_passes {
        settings.stop_pass_no = settings.start_pass_no + max_passes.saturating_sub(1);
    }

    let mut autorouter = BatchAutorouter::new(board, settings.clone());
    let completed = autorouter.autoroute_passes(false, &mut EmptyAutorouterObserver)?;
    let status = autorouter.status();
    let pass_no = autorouter.pass_no();
    let mut board = autorouter.into_board();

    if args.optimize && completed {
        let mut optimizer = RouteOptimizer::new(board, settings.clone());
        optimizer.optimize(&mut EmptyAutorouterObserver)?;
        board = optimizer.into_board();
    }

    let statistics = BoardStatistics::new(&board);
    info!(
        "{:?} after pass {}: {} of {} connections incomplete, {} clearance violations, score {:.2}",
        status,
        pass_no,
        statistics.connections.incomplete_count,
        statistics.connections.maximum_count,
        statistics.clearance_violations,
        statistics.normalized_score(&settings.scoring)
    );

    let output = args
        .output
        .unwrap_or_else(|| args.board.with_extension("routed.json"));
    let output_file = File::create(&output)
        .with_context(|| format!("could not create {}", output.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(output_file), &board.to_description())?;

    Ok(())
}
